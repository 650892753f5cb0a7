//! Invariant checks over a finished simulation timeline.

use std::collections::HashSet;
use std::fmt;

use voucher_core::domain::{Action, SimulationResult};

/// Violation of a timeline invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Detailed description of the violation
    pub description: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated: {}",
            self.invariant, self.description
        )
    }
}

impl std::error::Error for InvariantViolation {}

/// Trait for checking invariants of a completed run.
pub trait TimelineInvariant: Send + Sync {
    /// Checks if invariant holds for the given result.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the invariant condition is not met.
    fn check(&self, result: &SimulationResult) -> Result<(), InvariantViolation>;

    /// Returns name of this invariant.
    fn name(&self) -> &str;

    /// Builds a violation attributed to this invariant.
    fn violation(&self, description: String) -> InvariantViolation {
        InvariantViolation {
            invariant: self.name().to_string(),
            description,
        }
    }
}

/// Ensures allocated events never exceed the slot capacity.
pub struct CapacityInvariant;

impl TimelineInvariant for CapacityInvariant {
    fn check(&self, result: &SimulationResult) -> Result<(), InvariantViolation> {
        let allocated = result.allocated_count() as u64;
        if allocated > result.simulation.slots {
            return Err(self.violation(format!(
                "{allocated} events allocated against {} slots",
                result.simulation.slots
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Capacity"
    }
}

/// Ensures ticks strictly increase, so no tick carries two decisions.
pub struct TickOrderInvariant;

impl TimelineInvariant for TickOrderInvariant {
    fn check(&self, result: &SimulationResult) -> Result<(), InvariantViolation> {
        for pair in result.events.windows(2) {
            if pair[1].tick <= pair[0].tick {
                return Err(self.violation(format!(
                    "request {} at tick {} follows request {} at tick {}",
                    pair[1].request_id, pair[1].tick, pair[0].request_id, pair[0].tick
                )));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "TickOrder"
    }
}

/// Ensures arrival order lists each client once, by non-decreasing first tick.
pub struct ArrivalOrderInvariant;

impl TimelineInvariant for ArrivalOrderInvariant {
    fn check(&self, result: &SimulationResult) -> Result<(), InvariantViolation> {
        let mut seen = HashSet::with_capacity(result.arrival_order.len());
        for arrival in &result.arrival_order {
            if !seen.insert(arrival.client_id) {
                return Err(self.violation(format!(
                    "client {} appears more than once",
                    arrival.client_id
                )));
            }
        }

        for pair in result.arrival_order.windows(2) {
            if pair[1].first_tick < pair[0].first_tick {
                return Err(self.violation(format!(
                    "client {} (tick {}) listed after client {} (tick {})",
                    pair[1].client_id, pair[1].first_tick, pair[0].client_id, pair[0].first_tick
                )));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "ArrivalOrder"
    }
}

/// Ensures that once a request is rejected, no later request is allocated.
///
/// Holds for any run whose counter only shrinks during replay.
pub struct ExhaustionInvariant;

impl TimelineInvariant for ExhaustionInvariant {
    fn check(&self, result: &SimulationResult) -> Result<(), InvariantViolation> {
        let first_rejection = result
            .events
            .iter()
            .position(|event| event.action == Action::Rejected);

        if let Some(position) = first_rejection
            && let Some(late) = result.events[position..]
                .iter()
                .find(|event| event.action == Action::Allocated)
        {
            return Err(self.violation(format!(
                "request {} allocated at tick {} after capacity ran out",
                late.request_id, late.tick
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Exhaustion"
    }
}

/// Runs the standard invariant set, collecting every violation.
pub fn check_timeline(result: &SimulationResult) -> Vec<InvariantViolation> {
    let invariants: [&dyn TimelineInvariant; 4] = [
        &CapacityInvariant,
        &TickOrderInvariant,
        &ArrivalOrderInvariant,
        &ExhaustionInvariant,
    ];

    invariants
        .iter()
        .filter_map(|invariant| invariant.check(result).err())
        .collect()
}
