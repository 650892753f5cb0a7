use voucher_core::domain::{Decision, Request};

use super::Strategy;
use super::queue::{Selection, run_tick_loop};

/// Serves requests strictly in arrival order.
///
/// The recorded score is the number of ticks the request waited.
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoStrategy;

impl Strategy for FifoStrategy {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn schedule(&self, requests: &[Request], _seed: u64) -> Vec<Decision> {
        run_tick_loop(requests, |tick, queue| {
            queue.first().map(|head| Selection {
                index: 0,
                score: head.waited(tick) as f64,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use voucher_core::domain::{ClientId, RequestId};

    use super::*;

    fn request(id: u32, priority: u8, arrival_tick: u64) -> Request {
        Request {
            id: RequestId::new(id),
            client_id: ClientId::new(id),
            priority,
            arrival_tick,
        }
    }

    #[test]
    fn test_serves_in_arrival_order() {
        let requests = vec![
            request(3, 1, 2),
            request(1, 3, 0),
            request(2, 2, 0),
            request(4, 1, 2),
        ];
        let decisions = FifoStrategy.schedule(&requests, 0);

        let order: Vec<u32> = decisions.iter().map(|d| d.request.id.as_u32()).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);

        let scores: Vec<f64> = decisions.iter().map(|d| d.score).collect();
        assert_eq!(scores, vec![0.0, 1.0, 0.0, 1.0]);
    }
}
