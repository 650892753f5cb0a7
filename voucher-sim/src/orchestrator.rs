//! Runs one simulation end to end.
//!
//! A run resolves its strategy, initializes a fresh slot counter, generates
//! the workload, schedules it, and replays every decision against the
//! counter. Replay never stops at the first rejection so the timeline shows
//! the full contention picture. Any allocator failure aborts the run; no
//! partial timeline is returned.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use voucher_core::allocator::{AllocatorError, SlotAllocator};
use voucher_core::domain::{Action, Decision, Event, Simulation, SimulationId, SimulationResult};

use crate::scheduler::StrategyRegistry;
use crate::workload::generate_workload;

/// Validated parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Workload seed
    pub seed: u64,
    /// Number of clients to generate
    pub total_clients: u32,
    /// Slot capacity; zero is a valid degenerate configuration
    pub total_vouchers: u64,
    /// Registered strategy name
    pub policy: String,
}

/// Errors that abort a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Policy does not resolve to a registered strategy
    #[error("Invalid policy: {policy}")]
    InvalidPolicy {
        /// Requested policy name
        policy: String,
    },

    /// Slot counter store failed
    #[error("Allocator failure: {0}")]
    Allocator(#[from] AllocatorError),

    /// Workload generation or scheduling panicked or was cancelled
    #[error("Scheduling task failed: {0}")]
    Scheduling(#[from] tokio::task::JoinError),
}

/// Wires workload generation, scheduling and slot allocation together.
#[derive(Clone)]
pub struct SimulationOrchestrator {
    allocator: Arc<dyn SlotAllocator>,
    registry: Arc<StrategyRegistry>,
}

impl SimulationOrchestrator {
    /// Creates orchestrator over a slot store and a strategy registry.
    pub fn new(allocator: Arc<dyn SlotAllocator>, registry: Arc<StrategyRegistry>) -> Self {
        Self {
            allocator,
            registry,
        }
    }

    /// Strategies this orchestrator can run.
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Runs one simulation and returns its complete timeline.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidPolicy` - If `params.policy` is not registered;
    ///   raised before any allocator state is created
    /// - `SimulationError::Allocator` - If the slot store fails at any step
    /// - `SimulationError::Scheduling` - If the blocking scheduling task fails
    pub async fn run(&self, params: SimulationParams) -> Result<SimulationResult, SimulationError> {
        let strategy = self.registry.get(&params.policy).ok_or_else(|| {
            SimulationError::InvalidPolicy {
                policy: params.policy.clone(),
            }
        })?;

        let id = SimulationId::generate();
        let created_at = Utc::now();

        tracing::info!(
            simulation_id = %id,
            policy = strategy.name(),
            seed = params.seed,
            clients = params.total_clients,
            vouchers = params.total_vouchers,
            "Starting simulation"
        );

        self.allocator.init(id, params.total_vouchers).await?;

        // Scheduling is CPU bound; keep it off the async workers
        let seed = params.seed;
        let total_clients = params.total_clients;
        let scheduler = Arc::clone(&strategy);
        let planned = tokio::task::spawn_blocking(move || {
            let workload = generate_workload(seed, total_clients);
            let decisions = scheduler.schedule(&workload.requests, seed);
            (workload, decisions)
        })
        .await;

        let (workload, decisions) = match planned {
            Ok(planned) => planned,
            Err(error) => return Err(self.abort(id, error.into()).await),
        };
        tracing::debug!(
            simulation_id = %id,
            decisions = decisions.len(),
            "Schedule complete"
        );

        let events = match self.replay(id, params.total_vouchers, &decisions).await {
            Ok(events) => events,
            Err(error) => return Err(self.abort(id, error.into()).await),
        };

        self.allocator.clear(id).await?;

        let result = SimulationResult {
            simulation: Simulation {
                id,
                policy: strategy.name().to_string(),
                slots: params.total_vouchers,
                total_requests: workload.requests.len(),
                seed: params.seed,
                created_at,
            },
            arrival_order: workload.arrival_order,
            events,
        };

        tracing::info!(
            simulation_id = %id,
            allocated = result.allocated_count(),
            rejected = result.rejected_count(),
            "Simulation complete"
        );

        Ok(result)
    }

    /// Makes one best-effort attempt to drop the counter of a failed run.
    async fn abort(&self, id: SimulationId, error: SimulationError) -> SimulationError {
        tracing::error!(simulation_id = %id, %error, "Simulation aborted");
        if let Err(clear_error) = self.allocator.clear(id).await {
            tracing::warn!(
                simulation_id = %id,
                error = %clear_error,
                "Failed to clear slot counter after abort"
            );
        }
        error
    }

    async fn replay(
        &self,
        id: SimulationId,
        capacity: u64,
        decisions: &[Decision],
    ) -> Result<Vec<Event>, AllocatorError> {
        let mut events = Vec::with_capacity(decisions.len());
        let mut allocated: u64 = 0;

        for decision in decisions {
            let action = if self.allocator.try_acquire(id, 1).await?.is_granted() {
                allocated += 1;
                Action::Allocated
            } else {
                Action::Rejected
            };

            tracing::trace!(
                tick = decision.tick,
                request_id = %decision.request.id,
                client_id = %decision.request.client_id,
                score = decision.score,
                %action,
                "Replayed decision"
            );
            events.push(Event::from_decision(decision, action));
        }

        let expected = i64::try_from(capacity.saturating_sub(allocated)).unwrap_or(i64::MAX);
        match self.allocator.remaining(id).await? {
            Some(remaining) if remaining == expected => {}
            observed => tracing::error!(
                simulation_id = %id,
                expected,
                ?observed,
                "Slot counter disagrees with replayed events"
            ),
        }

        Ok(events)
    }
}

impl std::fmt::Debug for SimulationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationOrchestrator")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
