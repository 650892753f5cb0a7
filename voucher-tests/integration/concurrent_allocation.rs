//! Racing acquisitions on one counter never exceed its capacity

use std::sync::Arc;
use std::time::Duration;

use voucher_core::allocator::{InMemorySlotStore, RespSlotStore, SlotAllocator};
use voucher_core::domain::SimulationId;
use voucher_sim::{SimulationOrchestrator, SimulationParams, StrategyRegistry};

use crate::fake_resp::FakeRespServer;

async fn race(stores: Vec<Arc<dyn SlotAllocator>>, id: SimulationId, attempts: usize) -> usize {
    let mut handles = Vec::new();
    for index in 0..attempts {
        let store = stores[index % stores.len()].clone();
        handles.push(tokio::spawn(async move {
            store.try_acquire(id, 1).await.unwrap().is_granted()
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            granted += 1;
        }
    }
    granted
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_memory_grants_bounded() {
    let store: Arc<dyn SlotAllocator> = Arc::new(InMemorySlotStore::new());
    let id = SimulationId::generate();
    store.init(id, 50).await.unwrap();

    let granted = race(vec![store.clone()], id, 400).await;

    assert_eq!(granted, 50);
    assert_eq!(store.remaining(id).await.unwrap(), Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resp_grants_bounded_across_connections() {
    let server = FakeRespServer::start().await;
    let stores: Vec<Arc<dyn SlotAllocator>> = (0..4)
        .map(|_| {
            Arc::new(RespSlotStore::new(
                server.address.clone(),
                Duration::from_secs(5),
                None,
            )) as Arc<dyn SlotAllocator>
        })
        .collect();

    let id = SimulationId::generate();
    stores[0].init(id, 25).await.unwrap();

    let granted = race(stores.clone(), id, 120).await;

    assert_eq!(granted, 25);
    assert_eq!(stores[1].remaining(id).await.unwrap(), Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_are_isolated() {
    let store = Arc::new(InMemorySlotStore::new());
    let orchestrator = SimulationOrchestrator::new(
        store.clone(),
        Arc::new(StrategyRegistry::with_builtin()),
    );

    let mut handles = Vec::new();
    for seed in 0..8u64 {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator
                .run(SimulationParams {
                    seed,
                    total_clients: 50,
                    total_vouchers: 10,
                    policy: "hybrid".to_string(),
                })
                .await
                .unwrap()
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.allocated_count(), 10);
    }
    assert_eq!(store.counter_count(), 0);
}
