use voucher_core::domain::{Decision, LOWEST_PRIORITY, Request};

use super::Strategy;
use super::queue::{run_tick_loop, select_max_by};

/// Strict priority: always serves the most important queued request.
///
/// Priority 1 goes first; equal priorities are served by ascending request
/// id. The recorded score is `4 - priority`, so VIP decisions score 3.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityStrategy;

impl PriorityStrategy {
    /// Score of a request with the given priority.
    pub fn score(priority: u8) -> f64 {
        f64::from(LOWEST_PRIORITY + 1) - f64::from(priority)
    }
}

impl Strategy for PriorityStrategy {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn schedule(&self, requests: &[Request], _seed: u64) -> Vec<Decision> {
        run_tick_loop(requests, |_, queue| {
            select_max_by(queue, |entry| Self::score(entry.request.priority))
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
    fn test_vip_first_then_id() {
        let requests = vec![
            request(1, 3, 0),
            request(2, 2, 0),
            request(3, 1, 0),
            request(4, 2, 0),
        ];
        let decisions = PriorityStrategy.schedule(&requests, 0);

        let order: Vec<u32> = decisions.iter().map(|d| d.request.id.as_u32()).collect();
        assert_eq!(order, vec![3, 2, 4, 1]);
        assert_eq!(decisions[0].score, 3.0);
        assert_eq!(decisions[3].score, 1.0);
    }

    #[test]
    fn test_late_vip_overtakes_waiting_free() {
        let requests = vec![request(1, 3, 0), request(2, 3, 0), request(3, 1, 1)];
        let decisions = PriorityStrategy.schedule(&requests, 0);

        let order: Vec<u32> = decisions.iter().map(|d| d.request.id.as_u32()).collect();
        assert_eq!(order, vec![1, 3, 2]);
    }
}
