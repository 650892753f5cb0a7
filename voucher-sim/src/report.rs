//! Summary statistics of a finished run.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use serde::Serialize;
use voucher_core::domain::{Action, ClientClass, SimulationResult};

/// Allocations per client class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassBreakdown {
    /// Slots granted to VIP clients
    pub vip: usize,
    /// Slots granted to paid clients
    pub paid: usize,
    /// Slots granted to free clients
    pub free: usize,
}

impl ClassBreakdown {
    fn record(&mut self, class: ClientClass) {
        match class {
            ClientClass::Vip => self.vip += 1,
            ClientClass::Paid => self.paid += 1,
            ClientClass::Free => self.free += 1,
        }
    }
}

/// Aggregated view of a simulation timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineStats {
    /// Events granted a slot
    pub allocated: usize,
    /// Events turned away
    pub rejected: usize,
    /// Distinct clients that won at least one slot
    pub clients_served: usize,
    /// Distinct clients in the run
    pub total_clients: usize,
    /// Allocations by client class
    pub allocated_by_class: ClassBreakdown,
    /// Tick of the first rejection, if capacity ran out
    pub first_rejection_tick: Option<u64>,
    /// Tick of the last decision
    pub last_tick: Option<u64>,
}

impl TimelineStats {
    /// Computes statistics for `result`.
    pub fn from_result(result: &SimulationResult) -> Self {
        let classes: HashMap<_, _> = result
            .arrival_order
            .iter()
            .map(|arrival| (arrival.client_id, arrival.class))
            .collect();

        let mut allocated_by_class = ClassBreakdown::default();
        let mut served = HashSet::new();
        let mut allocated = 0;
        let mut first_rejection_tick = None;

        for event in &result.events {
            match event.action {
                Action::Allocated => {
                    allocated += 1;
                    served.insert(event.client_id);
                    if let Some(class) = classes.get(&event.client_id) {
                        allocated_by_class.record(*class);
                    }
                }
                Action::Rejected => {
                    first_rejection_tick.get_or_insert(event.tick);
                }
            }
        }

        Self {
            allocated,
            rejected: result.events.len() - allocated,
            clients_served: served.len(),
            total_clients: result.arrival_order.len(),
            allocated_by_class,
            first_rejection_tick,
            last_tick: result.events.last().map(|event| event.tick),
        }
    }

    /// Human-readable multi-line summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Allocated: {}  Rejected: {}",
            self.allocated, self.rejected
        );
        let _ = writeln!(
            out,
            "Clients served: {}/{}",
            self.clients_served, self.total_clients
        );
        let _ = writeln!(
            out,
            "By class: vip={} paid={} free={}",
            self.allocated_by_class.vip, self.allocated_by_class.paid, self.allocated_by_class.free
        );
        match self.first_rejection_tick {
            Some(tick) => {
                let _ = write!(out, "Capacity exhausted at tick {tick}");
            }
            None => {
                let _ = write!(out, "Capacity never exhausted");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use voucher_core::domain::{
        ClientArrival, ClientId, Event, RequestId, Simulation, SimulationId,
    };

    use super::*;

    fn event(tick: u64, request: u32, client: u32, action: Action) -> Event {
        Event {
            tick,
            request_id: RequestId::new(request),
            client_id: ClientId::new(client),
            priority: 1,
            score: 0.0,
            action,
        }
    }

    fn sample() -> SimulationResult {
        SimulationResult {
            simulation: Simulation {
                id: SimulationId::generate(),
                policy: "hybrid".to_string(),
                slots: 3,
                total_requests: 5,
                seed: 9,
                created_at: Utc::now(),
            },
            arrival_order: vec![
                ClientArrival {
                    client_id: ClientId::new(1),
                    class: ClientClass::Vip,
                    first_tick: 40,
                },
                ClientArrival {
                    client_id: ClientId::new(2),
                    class: ClientClass::Free,
                    first_tick: 41,
                },
                ClientArrival {
                    client_id: ClientId::new(3),
                    class: ClientClass::Paid,
                    first_tick: 45,
                },
            ],
            events: vec![
                event(40, 1, 1, Action::Allocated),
                event(41, 3, 2, Action::Allocated),
                event(42, 2, 1, Action::Allocated),
                event(45, 4, 3, Action::Rejected),
                event(46, 5, 2, Action::Rejected),
            ],
        }
    }

    #[test]
    fn test_stats_from_result() {
        let stats = TimelineStats::from_result(&sample());

        assert_eq!(stats.allocated, 3);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.clients_served, 2);
        assert_eq!(stats.total_clients, 3);
        assert_eq!(
            stats.allocated_by_class,
            ClassBreakdown {
                vip: 2,
                paid: 0,
                free: 1
            }
        );
        assert_eq!(stats.first_rejection_tick, Some(45));
        assert_eq!(stats.last_tick, Some(46));
    }

    #[test]
    fn test_summary_text() {
        let summary = TimelineStats::from_result(&sample()).summary();
        assert_eq!(
            summary,
            "Allocated: 3  Rejected: 2\n\
             Clients served: 2/3\n\
             By class: vip=2 paid=0 free=1\n\
             Capacity exhausted at tick 45"
        );
    }

    #[test]
    fn test_empty_timeline() {
        let mut result = sample();
        result.events.clear();

        let stats = TimelineStats::from_result(&result);
        assert_eq!(stats.allocated, 0);
        assert_eq!(stats.last_tick, None);
        assert!(stats.summary().ends_with("Capacity never exhausted"));
    }
}
