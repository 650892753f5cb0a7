use voucher_core::domain::{Decision, LOWEST_PRIORITY, Request};

use super::Strategy;
use super::queue::{Selection, run_tick_loop};
use crate::deterministic::DeterministicRng;

/// Offset of the lottery stream seed from the simulation seed.
///
/// Keeps draws independent of the client (`seed`) and request (`seed + 1`)
/// streams.
pub const LOTTERY_STREAM_OFFSET: u64 = 2;

/// Weighted lottery over the queue.
///
/// Each queued request holds `4 - priority` tickets (VIP 3, paid 2, free 1).
/// The recorded score is the winner's share of the tickets in play.
#[derive(Debug, Clone, Copy, Default)]
pub struct LotteryStrategy;

impl LotteryStrategy {
    /// Tickets held by a request with the given priority.
    pub fn tickets(priority: u8) -> f64 {
        f64::from((LOWEST_PRIORITY + 1).saturating_sub(priority))
    }
}

impl Strategy for LotteryStrategy {
    fn name(&self) -> &'static str {
        "lottery"
    }

    fn schedule(&self, requests: &[Request], seed: u64) -> Vec<Decision> {
        let mut rng = DeterministicRng::from_seed(seed.wrapping_add(LOTTERY_STREAM_OFFSET));

        run_tick_loop(requests, |_, queue| {
            let tickets: Vec<f64> = queue
                .iter()
                .map(|entry| Self::tickets(entry.request.priority))
                .collect();
            let total: f64 = tickets.iter().sum();

            // Out-of-range priorities hold no tickets; fall back to the head
            let index = rng.choose_weighted(&tickets).unwrap_or(0);
            let score = if total > 0.0 {
                tickets[index] / total
            } else {
                0.0
            };
            Some(Selection { index, score })
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
    fn test_tickets_by_priority() {
        assert_eq!(LotteryStrategy::tickets(1), 3.0);
        assert_eq!(LotteryStrategy::tickets(2), 2.0);
        assert_eq!(LotteryStrategy::tickets(3), 1.0);
        assert_eq!(LotteryStrategy::tickets(9), 0.0);
    }

    #[test]
    fn test_single_entry_wins_everything() {
        let requests = vec![request(1, 2, 0), request(2, 3, 5)];
        let decisions = LotteryStrategy.schedule(&requests, 17);

        assert_eq!(decisions.len(), 2);
        assert!(decisions.iter().all(|d| d.score == 1.0));
    }

    #[test]
    fn test_vip_usually_wins_contested_tick() {
        let requests = vec![request(1, 3, 0), request(2, 1, 0)];

        let vip_first = (0..400u64)
            .filter(|seed| {
                LotteryStrategy.schedule(&requests, *seed)[0].request.id == RequestId::new(2)
            })
            .count();

        // Expected share 3/4
        assert!((240..360).contains(&vip_first), "vip first {vip_first}");
    }

    #[test]
    fn test_score_is_ticket_share() {
        let requests = vec![request(1, 1, 0), request(2, 3, 0)];
        let decisions = LotteryStrategy.schedule(&requests, 5);

        let expected = if decisions[0].request.id == RequestId::new(1) {
            0.75
        } else {
            0.25
        };
        assert_eq!(decisions[0].score, expected);
    }

    #[test]
    fn test_zero_ticket_queue_falls_back_to_head() {
        let requests = vec![request(1, 7, 0), request(2, 8, 0)];
        let decisions = LotteryStrategy.schedule(&requests, 1);

        let order: Vec<u32> = decisions.iter().map(|d| d.request.id.as_u32()).collect();
        assert_eq!(order, vec![1, 2]);
        assert_eq!(decisions[0].score, 0.0);
    }
}
