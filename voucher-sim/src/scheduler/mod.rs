//! Tick-driven scheduling strategies.
//!
//! Every strategy models the same single-server discrete-time queue: requests
//! enter the queue when their arrival tick is reached, exactly one queued
//! request is selected per non-empty tick, and the clock then advances. The
//! strategies differ only in how they pick from the queue.

mod fifo;
mod hybrid;
mod lottery;
mod priority;
mod queue;
mod registry;

pub use fifo::FifoStrategy;
pub use hybrid::{HybridStrategy, HybridWeights};
pub use lottery::{LOTTERY_STREAM_OFFSET, LotteryStrategy};
pub use priority::PriorityStrategy;
pub use queue::{RuntimeRequest, Selection, run_tick_loop, select_max_by};
pub use registry::StrategyRegistry;

use voucher_core::domain::{Decision, Request};

/// Turns a request list into the per-tick decision sequence of one run.
///
/// Implementations are total over any request list, including an empty one,
/// and must be deterministic for a given `(requests, seed)` pair.
pub trait Strategy: Send + Sync {
    /// Registry name of this strategy.
    fn name(&self) -> &'static str;

    /// Produces one decision per tick in which the queue is non-empty.
    ///
    /// `seed` is the simulation seed; strategies without randomness ignore it.
    fn schedule(&self, requests: &[Request], seed: u64) -> Vec<Decision>;
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::strategy::Strategy as _;
    use voucher_core::domain::{ClientId, RequestId};

    use super::{
        FifoStrategy, HybridStrategy, LotteryStrategy, PriorityStrategy, Request, Strategy,
    };

    fn arb_requests() -> impl proptest::strategy::Strategy<Value = Vec<Request>> {
        prop::collection::vec((1u32..20, 1u8..=3, 0u64..40), 0..60).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(index, (client, priority, arrival_tick))| Request {
                    id: RequestId::new(index as u32 + 1),
                    client_id: ClientId::new(client),
                    priority,
                    arrival_tick,
                })
                .collect()
        })
    }

    fn builtin() -> Vec<Box<dyn Strategy>> {
        vec![
            Box::new(FifoStrategy),
            Box::new(PriorityStrategy),
            Box::new(LotteryStrategy),
            Box::new(HybridStrategy::default()),
        ]
    }

    proptest! {
        #[test]
        fn every_request_decided_exactly_once(requests in arb_requests(), seed in any::<u64>()) {
            for strategy in builtin() {
                let decisions = strategy.schedule(&requests, seed);
                prop_assert_eq!(decisions.len(), requests.len());

                let mut decided: Vec<RequestId> = decisions.iter().map(|d| d.request.id).collect();
                decided.sort_unstable();
                let mut expected: Vec<RequestId> = requests.iter().map(|r| r.id).collect();
                expected.sort_unstable();
                prop_assert_eq!(decided, expected);
            }
        }

        #[test]
        fn ticks_strictly_increase(requests in arb_requests(), seed in any::<u64>()) {
            for strategy in builtin() {
                let decisions = strategy.schedule(&requests, seed);
                for pair in decisions.windows(2) {
                    prop_assert!(pair[0].tick < pair[1].tick, "{}", strategy.name());
                }
            }
        }

        #[test]
        fn never_decided_before_arrival(requests in arb_requests(), seed in any::<u64>()) {
            for strategy in builtin() {
                for decision in strategy.schedule(&requests, seed) {
                    prop_assert!(decision.request.arrival_tick <= decision.tick);
                }
            }
        }

        #[test]
        fn schedules_are_reproducible(requests in arb_requests(), seed in any::<u64>()) {
            for strategy in builtin() {
                prop_assert_eq!(
                    strategy.schedule(&requests, seed),
                    strategy.schedule(&requests, seed)
                );
            }
        }

        #[test]
        fn hybrid_score_ages(priority in 1u8..=3, debt in 0.0f64..50.0, wait in 0u64..1000) {
            let strategy = HybridStrategy::default();
            let older = strategy.score(priority, wait + 1, debt);
            prop_assert!(older > strategy.score(priority, wait, debt));
        }
    }
}
