//! Redis-protocol slot store against the in-process fake server

use std::sync::Arc;
use std::time::Duration;

use voucher_core::allocator::{
    AcquireOutcome, AllocatorError, RespSlotStore, SlotAllocator, connect_allocator, slot_key,
};
use voucher_core::config::{StoreBackend, StoreConfig};
use voucher_core::domain::{Action, SimulationId};
use voucher_sim::{SimulationOrchestrator, SimulationParams, StrategyRegistry};

use crate::fake_resp::FakeRespServer;

fn store(server: &FakeRespServer) -> RespSlotStore {
    RespSlotStore::new(
        server.address.clone(),
        Duration::from_secs(2),
        Some(Duration::from_secs(60)),
    )
}

#[tokio::test]
async fn test_counter_lifecycle() {
    let server = FakeRespServer::start().await;
    let store = store(&server);
    let id = SimulationId::generate();

    store.init(id, 2).await.unwrap();
    assert_eq!(store.remaining(id).await.unwrap(), Some(2));

    assert_eq!(store.try_acquire(id, 1).await.unwrap(), AcquireOutcome::Granted);
    assert_eq!(store.try_acquire(id, 1).await.unwrap(), AcquireOutcome::Granted);
    assert_eq!(store.try_acquire(id, 1).await.unwrap(), AcquireOutcome::Denied);
    // Overdraw was rolled back
    assert_eq!(server.value(&slot_key(id)), Some(0));

    store.release(id, 1).await.unwrap();
    assert_eq!(store.remaining(id).await.unwrap(), Some(1));

    store.clear(id).await.unwrap();
    assert_eq!(store.remaining(id).await.unwrap(), None);
    assert_eq!(server.key_count(), 0);
}

#[tokio::test]
async fn test_init_is_set_if_absent_with_ttl() {
    let server = FakeRespServer::start().await;
    let store = store(&server);
    let id = SimulationId::generate();

    store.init(id, 5).await.unwrap();
    let error = store.init(id, 9).await.unwrap_err();
    assert!(matches!(error, AllocatorError::AlreadyInitialized { id: dup } if dup == id));
    assert_eq!(server.value(&slot_key(id)), Some(5));

    let set = server
        .commands()
        .into_iter()
        .find(|command| command[0] == "SET")
        .unwrap();
    assert_eq!(
        set,
        vec![
            "SET".to_string(),
            slot_key(id),
            "5".to_string(),
            "NX".to_string(),
            "PX".to_string(),
            "60000".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_zero_capacity_denies() {
    let server = FakeRespServer::start().await;
    let store = store(&server);
    let id = SimulationId::generate();

    store.init(id, 0).await.unwrap();
    assert_eq!(store.try_acquire(id, 1).await.unwrap(), AcquireOutcome::Denied);
    assert_eq!(store.remaining(id).await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_missing_counter_is_created_by_server() {
    let server = FakeRespServer::start().await;
    let store = store(&server);
    let id = SimulationId::generate();

    // Unlike the in-memory store, the server creates the key on DECRBY
    assert_eq!(store.try_acquire(id, 1).await.unwrap(), AcquireOutcome::Denied);
    assert_eq!(server.value(&slot_key(id)), Some(0));

    store.release(id, 2).await.unwrap();
    assert_eq!(store.remaining(id).await.unwrap(), Some(2));

    store.clear(id).await.unwrap();
    assert_eq!(server.key_count(), 0);
}

#[tokio::test]
async fn test_connect_allocator_pings_server() {
    let server = FakeRespServer::start().await;
    let config = StoreConfig {
        backend: StoreBackend::Redis,
        address: server.address.clone(),
        operation_timeout: Duration::from_secs(1),
        counter_ttl: None,
    };

    connect_allocator(&config).await.unwrap();
    assert_eq!(server.commands(), vec![vec!["PING".to_string()]]);
}

#[tokio::test]
async fn test_unresponsive_server_times_out() {
    // Accepted by the kernel backlog but never answered
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let store = RespSlotStore::new(address, Duration::from_millis(100), None);
    let error = store.ping().await.unwrap_err();

    assert!(matches!(error, AllocatorError::Timeout { operation: "PING", .. }));
    assert!(error.is_store_failure());
    drop(listener);
}

#[tokio::test]
async fn test_full_simulation_over_resp() {
    let server = FakeRespServer::start().await;
    let orchestrator = SimulationOrchestrator::new(
        Arc::new(store(&server)),
        Arc::new(StrategyRegistry::with_builtin()),
    );

    let result = orchestrator
        .run(SimulationParams {
            seed: 7,
            total_clients: 30,
            total_vouchers: 12,
            policy: "hybrid".to_string(),
        })
        .await
        .unwrap();

    let allocated = result
        .events
        .iter()
        .filter(|event| event.action == Action::Allocated)
        .count();
    assert_eq!(allocated, 12);
    assert_eq!(server.key_count(), 0);
}
