//! Weighted score combining priority, aging and per-client debt.

use std::collections::HashMap;

use voucher_core::domain::{ClientId, Decision, Request};

use super::Strategy;
use super::queue::{run_tick_loop, select_max_by};

/// Coefficients of the hybrid score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridWeights {
    /// Priority coefficient
    pub alpha: f64,
    /// Wait time coefficient
    pub beta: f64,
    /// Debt penalty coefficient
    pub gamma: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            alpha: 10.0,
            beta: 1.0,
            gamma: 2.0,
        }
    }
}

/// Scores each queued request as
/// `priority * alpha + waited * beta - debt[client] * gamma`
/// and serves the maximum.
///
/// A client's debt grows by one every time one of its requests wins and lives
/// for a single `schedule` call.
#[derive(Debug, Clone, Default)]
pub struct HybridStrategy {
    weights: HybridWeights,
}

impl HybridStrategy {
    /// Creates a hybrid strategy with custom coefficients.
    pub fn new(weights: HybridWeights) -> Self {
        Self { weights }
    }

    /// Coefficients in use.
    pub fn weights(&self) -> HybridWeights {
        self.weights
    }

    /// Score of a request with the given priority, wait and client debt.
    pub fn score(&self, priority: u8, waited: u64, debt: f64) -> f64 {
        f64::from(priority) * self.weights.alpha + waited as f64 * self.weights.beta
            - debt * self.weights.gamma
    }
}

impl Strategy for HybridStrategy {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn schedule(&self, requests: &[Request], _seed: u64) -> Vec<Decision> {
        let mut debt: HashMap<ClientId, f64> = HashMap::new();

        run_tick_loop(requests, |tick, queue| {
            let selection = select_max_by(queue, |entry| {
                let client_debt = debt.get(&entry.request.client_id).copied().unwrap_or(0.0);
                self.score(entry.request.priority, entry.waited(tick), client_debt)
            })?;

            let winner = queue[selection.index].request.client_id;
            *debt.entry(winner).or_insert(0.0) += 1.0;
            Some(selection)
        })
    }
}
