//! Deterministic workload synthesis.
//!
//! Clients are drawn from the simulation seed; their requests are drawn from
//! a second stream seeded with `seed + 1`, so the two sequences never share
//! random numbers and the client population does not depend on how many
//! requests were generated.

use std::collections::{HashMap, HashSet};

use voucher_core::domain::{Client, ClientArrival, ClientClass, ClientId, Request, RequestId};

use crate::deterministic::DeterministicRng;

/// Rolls below this become VIP clients (10%).
pub const VIP_THRESHOLD: f64 = 0.10;

/// Rolls below this (and above the VIP cut) become paid clients (30%).
pub const PAID_THRESHOLD: f64 = 0.40;

/// Offset of the request stream seed from the simulation seed.
pub const REQUEST_STREAM_OFFSET: u64 = 1;

/// Requests issued per client are uniform in `1..=MAX_REQUESTS_PER_CLIENT`.
pub const MAX_REQUESTS_PER_CLIENT: u64 = 3;

/// Center of the arrival burst, in ticks.
pub const ARRIVAL_MEAN_TICK: f64 = 50.0;

/// Spread of the arrival burst, in ticks.
pub const ARRIVAL_STD_DEV: f64 = 10.0;

/// Complete generated workload of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Workload {
    /// Client population in generation order
    pub clients: Vec<Client>,
    /// Requests sorted by `(arrival_tick, id)`
    pub requests: Vec<Request>,
    /// Clients by first appearance in arrival order
    pub arrival_order: Vec<ClientArrival>,
}

/// Maps a uniform roll in `[0, 1)` onto a client class.
pub fn classify(roll: f64) -> ClientClass {
    if roll < VIP_THRESHOLD {
        ClientClass::Vip
    } else if roll < PAID_THRESHOLD {
        ClientClass::Paid
    } else {
        ClientClass::Free
    }
}

/// Generates `total_clients` clients, advancing the stream once per client.
pub fn generate_clients(seed: u64, total_clients: u32) -> Vec<Client> {
    let mut rng = DeterministicRng::from_seed(seed);

    (0..total_clients)
        .map(|index| {
            let class = classify(rng.random_f64());
            Client::new(ClientId::new(index + 1), class)
        })
        .collect()
}

/// Generates 1-3 requests per client and the resulting client arrival order.
///
/// Arrival ticks follow a normal burst around tick 50, truncated to whole
/// ticks and clamped at zero. The returned requests are sorted by
/// `(arrival_tick, id)`, which is the admission order schedulers rely on.
pub fn generate_requests(clients: &[Client], seed: u64) -> (Vec<Request>, Vec<ClientArrival>) {
    let mut rng = DeterministicRng::from_seed(seed.wrapping_add(REQUEST_STREAM_OFFSET));
    let mut requests = Vec::with_capacity(clients.len() * 2);
    let mut next_id = 1;

    for client in clients {
        let count = rng.random_inclusive(1, MAX_REQUESTS_PER_CLIENT);
        for _ in 0..count {
            requests.push(Request {
                id: RequestId::new(next_id),
                client_id: client.id,
                priority: client.class.priority(),
                arrival_tick: draw_arrival_tick(&mut rng),
            });
            next_id += 1;
        }
    }

    requests.sort_by_key(|request| (request.arrival_tick, request.id));

    let arrival_order = build_arrival_order(clients, &requests);
    (requests, arrival_order)
}

/// Generates clients, requests and arrival order in one step.
pub fn generate_workload(seed: u64, total_clients: u32) -> Workload {
    let clients = generate_clients(seed, total_clients);
    let (requests, arrival_order) = generate_requests(&clients, seed);

    tracing::debug!(
        seed,
        clients = clients.len(),
        requests = requests.len(),
        "Generated workload"
    );

    Workload {
        clients,
        requests,
        arrival_order,
    }
}

fn draw_arrival_tick(rng: &mut DeterministicRng) -> u64 {
    // Truncates toward zero; negative draws clamp to tick 0
    let tick = rng.normal(ARRIVAL_MEAN_TICK, ARRIVAL_STD_DEV) as i64;
    tick.max(0) as u64
}

fn build_arrival_order(clients: &[Client], sorted_requests: &[Request]) -> Vec<ClientArrival> {
    let classes: HashMap<ClientId, ClientClass> =
        clients.iter().map(|client| (client.id, client.class)).collect();
    let mut seen = HashSet::with_capacity(clients.len());

    sorted_requests
        .iter()
        .filter(|request| seen.insert(request.client_id))
        .filter_map(|request| {
            classes.get(&request.client_id).map(|class| ClientArrival {
                client_id: request.client_id,
                class: *class,
                first_tick: request.arrival_tick,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(0.0), ClientClass::Vip);
        assert_eq!(classify(0.099), ClientClass::Vip);
        assert_eq!(classify(0.10), ClientClass::Paid);
        assert_eq!(classify(0.399), ClientClass::Paid);
        assert_eq!(classify(0.40), ClientClass::Free);
        assert_eq!(classify(0.999), ClientClass::Free);
    }

    #[test]
    fn test_clients_are_deterministic() {
        let first = generate_clients(42, 200);
        let second = generate_clients(42, 200);

        assert_eq!(first, second);
        assert_eq!(first.len(), 200);
        assert_ne!(first, generate_clients(43, 200));
    }

    #[test]
    fn test_client_prefix_is_stable() {
        // One draw per client: a larger population extends a smaller one
        let small = generate_clients(7, 10);
        let large = generate_clients(7, 50);
        assert_eq!(small[..], large[..10]);
    }

    #[test]
    fn test_client_ids_and_weights() {
        let clients = generate_clients(1, 25);
        for (index, client) in clients.iter().enumerate() {
            assert_eq!(client.id, ClientId::new(index as u32 + 1));
            assert_eq!(client.weight, client.class.weight());
        }
    }

    #[test]
    fn test_class_distribution_roughly_matches() {
        let clients = generate_clients(2024, 10_000);
        let vip = clients.iter().filter(|c| c.class == ClientClass::Vip).count();
        let paid = clients.iter().filter(|c| c.class == ClientClass::Paid).count();

        assert!((800..1200).contains(&vip), "vip {vip}");
        assert!((2700..3300).contains(&paid), "paid {paid}");
    }

    #[test]
    fn test_requests_per_client_and_priority() {
        let clients = generate_clients(11, 100);
        let (requests, _) = generate_requests(&clients, 11);

        for client in &clients {
            let issued: Vec<_> = requests
                .iter()
                .filter(|r| r.client_id == client.id)
                .collect();
            assert!((1..=3).contains(&issued.len()));
            assert!(issued.iter().all(|r| r.priority == client.class.priority()));
        }
    }

    #[test]
    fn test_requests_sorted_by_arrival_then_id() {
        let clients = generate_clients(5, 300);
        let (requests, _) = generate_requests(&clients, 5);

        for pair in requests.windows(2) {
            assert!((pair[0].arrival_tick, pair[0].id) < (pair[1].arrival_tick, pair[1].id));
        }
    }

    #[test]
    fn test_request_ids_are_unique_and_dense() {
        let clients = generate_clients(9, 40);
        let (requests, _) = generate_requests(&clients, 9);

        let mut ids: Vec<u32> = requests.iter().map(|r| r.id.as_u32()).collect();
        ids.sort_unstable();
        let expected: Vec<u32> = (1..=requests.len() as u32).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_arrival_order_one_entry_per_client() {
        let clients = generate_clients(13, 80);
        let (requests, arrival_order) = generate_requests(&clients, 13);

        assert_eq!(arrival_order.len(), clients.len());

        let unique: HashSet<_> = arrival_order.iter().map(|a| a.client_id).collect();
        assert_eq!(unique.len(), clients.len());

        for arrival in &arrival_order {
            let first = requests
                .iter()
                .find(|r| r.client_id == arrival.client_id)
                .unwrap();
            assert_eq!(arrival.first_tick, first.arrival_tick);
        }

        for pair in arrival_order.windows(2) {
            assert!(pair[0].first_tick <= pair[1].first_tick);
        }
    }

    #[test]
    fn test_empty_population() {
        let workload = generate_workload(1, 0);
        assert!(workload.clients.is_empty());
        assert!(workload.requests.is_empty());
        assert!(workload.arrival_order.is_empty());
    }
}
