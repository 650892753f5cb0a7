//! Boundary input of a simulation run and its validation.

use serde::{Deserialize, Serialize};
use voucher_core::config::SimulationLimits;

use crate::orchestrator::SimulationParams;
use crate::scheduler::StrategyRegistry;

/// Rejected simulation input. Raised before any allocator state exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Client count was zero or negative.
    #[error("total_clients must be positive, got {value}")]
    NonPositiveClients {
        /// Submitted value
        value: i64,
    },

    /// Voucher count was zero or negative.
    #[error("total_vouchers must be positive, got {value}")]
    NonPositiveVouchers {
        /// Submitted value
        value: i64,
    },

    /// Client count exceeds the configured ceiling.
    #[error("total_clients {value} exceeds the limit of {max}")]
    TooManyClients {
        /// Submitted value
        value: i64,
        /// Configured ceiling
        max: u32,
    },

    /// Policy name is not registered.
    #[error("unknown policy '{policy}', expected one of: {}", available.join(", "))]
    UnknownPolicy {
        /// Submitted policy name
        policy: String,
        /// Registered policy names
        available: Vec<&'static str>,
    },
}

/// A request to run one simulation, as received from a caller.
///
/// Counts are signed so that negative input reaches validation instead of
/// failing deserialization with a less helpful message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Number of clients to generate
    pub total_clients: i64,
    /// Number of slots available
    pub total_vouchers: i64,
    /// Workload seed; a random one is chosen when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Registered strategy name
    pub policy: String,
}

impl SimulationRequest {
    /// Validates the request into orchestrator parameters.
    ///
    /// # Errors
    ///
    /// - `ValidationError::NonPositiveClients` - `total_clients <= 0`
    /// - `ValidationError::NonPositiveVouchers` - `total_vouchers <= 0`
    /// - `ValidationError::TooManyClients` - population above `limits.max_clients`
    /// - `ValidationError::UnknownPolicy` - policy missing from `registry`
    pub fn into_params(
        self,
        registry: &StrategyRegistry,
        limits: &SimulationLimits,
    ) -> Result<SimulationParams, ValidationError> {
        if self.total_clients <= 0 {
            return Err(ValidationError::NonPositiveClients {
                value: self.total_clients,
            });
        }
        if self.total_vouchers <= 0 {
            return Err(ValidationError::NonPositiveVouchers {
                value: self.total_vouchers,
            });
        }

        let total_clients = u32::try_from(self.total_clients)
            .ok()
            .filter(|clients| *clients <= limits.max_clients)
            .ok_or(ValidationError::TooManyClients {
                value: self.total_clients,
                max: limits.max_clients,
            })?;

        if !registry.contains(&self.policy) {
            return Err(ValidationError::UnknownPolicy {
                policy: self.policy,
                available: registry.names(),
            });
        }

        Ok(SimulationParams {
            seed: self.seed.unwrap_or_else(|| u64::from(rand::random::<u32>())),
            total_clients,
            total_vouchers: self.total_vouchers.unsigned_abs(),
            policy: self.policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(total_clients: i64, total_vouchers: i64, policy: &str) -> SimulationRequest {
        SimulationRequest {
            total_clients,
            total_vouchers,
            seed: Some(42),
            policy: policy.to_string(),
        }
    }

    fn validate(request: SimulationRequest) -> Result<SimulationParams, ValidationError> {
        request.into_params(&StrategyRegistry::with_builtin(), &SimulationLimits::default())
    }

    #[test]
    fn test_valid_request() {
        let params = validate(request(100, 10, "hybrid")).unwrap();
        assert_eq!(
            params,
            SimulationParams {
                seed: 42,
                total_clients: 100,
                total_vouchers: 10,
                policy: "hybrid".to_string(),
            }
        );
    }

    #[test]
    fn test_non_positive_counts() {
        assert_eq!(
            validate(request(0, 10, "fifo")),
            Err(ValidationError::NonPositiveClients { value: 0 })
        );
        assert_eq!(
            validate(request(5, -1, "fifo")),
            Err(ValidationError::NonPositiveVouchers { value: -1 })
        );
    }

    #[test]
    fn test_population_ceiling() {
        let limits = SimulationLimits { max_clients: 50 };
        let result = request(51, 1, "fifo").into_params(&StrategyRegistry::with_builtin(), &limits);
        assert_eq!(
            result,
            Err(ValidationError::TooManyClients { value: 51, max: 50 })
        );

        let huge = validate(request(i64::MAX, 1, "fifo"));
        assert!(matches!(huge, Err(ValidationError::TooManyClients { .. })));
    }

    #[test]
    fn test_default_population_ceiling() {
        use voucher_core::config::DEFAULT_MAX_CLIENTS;

        let at_ceiling = validate(request(i64::from(DEFAULT_MAX_CLIENTS), 1, "hybrid")).unwrap();
        assert_eq!(at_ceiling.total_clients, 5_000);

        assert_eq!(
            validate(request(i64::from(DEFAULT_MAX_CLIENTS) + 1, 1, "hybrid")),
            Err(ValidationError::TooManyClients {
                value: 5_001,
                max: 5_000
            })
        );
    }

    #[test]
    fn test_unknown_policy_lists_available() {
        let error = validate(request(1, 1, "round_robin")).unwrap_err();
        assert_eq!(
            error.to_string(),
            "unknown policy 'round_robin', expected one of: fifo, hybrid, lottery, priority"
        );
    }

    #[test]
    fn test_missing_seed_is_filled() {
        let mut input = request(3, 3, "priority");
        input.seed = None;

        let params = validate(input).unwrap();
        assert!(params.seed <= u64::from(u32::MAX));
    }

    #[test]
    fn test_deserialize_without_seed() {
        let input: SimulationRequest = serde_json::from_str(
            r#"{"total_clients": 10, "total_vouchers": 2, "policy": "lottery"}"#,
        )
        .unwrap();
        assert_eq!(input.seed, None);
        assert_eq!(input.policy, "lottery");
    }
}
