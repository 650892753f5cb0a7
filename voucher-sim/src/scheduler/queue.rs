//! Shared tick loop and selection helpers.

use std::cmp::Ordering;

use voucher_core::domain::{Decision, Request};

/// A request waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeRequest {
    /// The queued request
    pub request: Request,
    /// Tick at which the request became eligible for selection
    pub enqueue_tick: u64,
}

impl RuntimeRequest {
    /// Ticks spent in the queue as of `tick`.
    pub fn waited(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.enqueue_tick)
    }
}

/// A strategy's pick for one tick: a queue index and the score that won.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    /// Index into the queue slice handed to the selector
    pub index: usize,
    /// Score recorded on the resulting decision
    pub score: f64,
}

/// Runs the single-server tick loop, delegating each pick to `select`.
///
/// Requests are admitted in `(arrival_tick, id)` order once the clock reaches
/// their arrival tick. Ticks with an empty queue are skipped by jumping to the
/// next arrival, so they never produce a decision. The selected entry is
/// removed and the remainder keeps its admission order.
pub fn run_tick_loop<F>(requests: &[Request], mut select: F) -> Vec<Decision>
where
    F: FnMut(u64, &[RuntimeRequest]) -> Option<Selection>,
{
    let mut pending = requests.to_vec();
    pending.sort_by_key(|request| (request.arrival_tick, request.id));

    let mut decisions = Vec::with_capacity(pending.len());
    let mut queue: Vec<RuntimeRequest> = Vec::new();
    let mut cursor = 0;
    let mut tick = 0;

    loop {
        while let Some(request) = pending.get(cursor)
            && request.arrival_tick <= tick
        {
            queue.push(RuntimeRequest {
                request: request.clone(),
                enqueue_tick: tick,
            });
            cursor += 1;
        }

        if queue.is_empty() {
            match pending.get(cursor) {
                Some(next) => {
                    tick = next.arrival_tick;
                    continue;
                }
                None => break,
            }
        }

        let Some(selection) = select(tick, &queue).filter(|s| s.index < queue.len()) else {
            tracing::error!(tick, queued = queue.len(), "Selector returned no valid pick");
            break;
        };

        let selected = queue.remove(selection.index);
        decisions.push(Decision {
            tick,
            request: selected.request,
            score: selection.score,
        });
        tick += 1;
    }

    decisions
}

/// Picks the highest-scoring queued request, ties going to the lowest id.
pub fn select_max_by<F>(queue: &[RuntimeRequest], mut score: F) -> Option<Selection>
where
    F: FnMut(&RuntimeRequest) -> f64,
{
    queue
        .iter()
        .enumerate()
        .map(|(index, entry)| (index, score(entry), entry.request.id))
        .max_by(|a, b| match a.1.total_cmp(&b.1) {
            Ordering::Equal => b.2.cmp(&a.2),
            other => other,
        })
        .map(|(index, score, _)| Selection { index, score })
}

#[cfg(test)]
mod tests {
    use voucher_core::domain::{ClientId, RequestId};

    use super::*;

    fn request(id: u32, arrival_tick: u64) -> Request {
        Request {
            id: RequestId::new(id),
            client_id: ClientId::new(id),
            priority: 2,
            arrival_tick,
        }
    }

    fn queued(id: u32) -> RuntimeRequest {
        RuntimeRequest {
            request: request(id, 0),
            enqueue_tick: 0,
        }
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let decisions = run_tick_loop(&[], |_, _| Some(Selection { index: 0, score: 0.0 }));
        assert!(decisions.is_empty());
    }

    #[test]
    fn test_idle_ticks_are_skipped() {
        let requests = vec![request(1, 10), request(2, 10), request(3, 30)];
        let decisions = run_tick_loop(&requests, |_, _| Some(Selection { index: 0, score: 0.0 }));

        let ticks: Vec<u64> = decisions.iter().map(|d| d.tick).collect();
        assert_eq!(ticks, vec![10, 11, 30]);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let sorted = vec![request(1, 3), request(2, 3), request(3, 5)];
        let shuffled = vec![request(3, 5), request(2, 3), request(1, 3)];
        let first = |_: u64, _: &[RuntimeRequest]| Some(Selection { index: 0, score: 1.0 });

        assert_eq!(run_tick_loop(&sorted, first), run_tick_loop(&shuffled, first));
    }

    #[test]
    fn test_enqueue_tick_matches_arrival() {
        let requests = vec![request(1, 0), request(2, 0), request(3, 1), request(4, 7)];
        run_tick_loop(&requests, |tick, queue| {
            for entry in queue {
                assert_eq!(entry.enqueue_tick, entry.request.arrival_tick);
                assert!(entry.enqueue_tick <= tick);
            }
            Some(Selection { index: 0, score: 0.0 })
        });
    }

    #[test]
    fn test_remainder_keeps_order() {
        let requests = vec![request(1, 0), request(2, 0), request(3, 0)];
        let mut seen = Vec::new();
        let decisions = run_tick_loop(&requests, |_, queue| {
            seen.push(queue.iter().map(|e| e.request.id.as_u32()).collect::<Vec<_>>());
            Some(Selection {
                index: queue.len() / 2,
                score: 0.0,
            })
        });

        assert_eq!(seen, vec![vec![1, 2, 3], vec![1, 3], vec![1]]);
        let order: Vec<u32> = decisions.iter().map(|d| d.request.id.as_u32()).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn test_invalid_selection_stops_loop() {
        let requests = vec![request(1, 0), request(2, 0)];
        let decisions = run_tick_loop(&requests, |_, _| Some(Selection { index: 9, score: 0.0 }));
        assert!(decisions.is_empty());
    }

    #[test]
    fn test_select_max_ties_to_lowest_id() {
        let queue = vec![queued(5), queued(2), queued(9)];
        let selection = select_max_by(&queue, |_| 1.0).unwrap();
        assert_eq!(selection.index, 1);

        let selection = select_max_by(&queue, |e| f64::from(e.request.id.as_u32())).unwrap();
        assert_eq!(selection.index, 2);
        assert_eq!(selection.score, 9.0);

        assert!(select_max_by(&[], |_| 0.0).is_none());
    }

    #[test]
    fn test_waited() {
        let entry = RuntimeRequest {
            request: request(1, 4),
            enqueue_tick: 4,
        };
        assert_eq!(entry.waited(4), 0);
        assert_eq!(entry.waited(9), 5);
    }
}
