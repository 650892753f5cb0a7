//! Slot allocation against a shared counter store.
//!
//! A simulation's capacity is a single integer counter keyed by its
//! [`SimulationId`]. Every store implements the same bounded counting
//! semaphore contract: a grant is an atomic decrement, and a decrement that
//! overdraws the counter is immediately compensated by an atomic increment
//! and reported as denied. The store's atomicity, not client-side locking,
//! keeps grants within capacity when callers race on the same id.

mod memory;
mod resp;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
pub use memory::InMemorySlotStore;
pub use resp::{RespSlotStore, slot_key};

use crate::config::{StoreBackend, StoreConfig};
use crate::domain::SimulationId;

/// Errors raised by slot counter stores.
#[derive(Debug, thiserror::Error)]
pub enum AllocatorError {
    /// Counter already exists for this simulation
    #[error("Slot counter already initialized for simulation {id}")]
    AlreadyInitialized {
        /// Simulation whose counter collided
        id: SimulationId,
    },

    /// Counter was never created or has been cleared
    #[error("Slot counter not initialized for simulation {id}")]
    NotInitialized {
        /// Simulation whose counter is missing
        id: SimulationId,
    },

    /// Store did not answer within the configured bound
    #[error("Store operation {operation} timed out after {timeout:?}")]
    Timeout {
        /// Store command that timed out
        operation: &'static str,
        /// Bound that was exceeded
        timeout: Duration,
    },

    /// Store could not be reached
    #[error("Store unavailable: {reason}")]
    Unavailable {
        /// Underlying connection failure
        reason: String,
    },

    /// Store answered with something the client did not expect
    #[error("Store protocol error: {reason}")]
    Protocol {
        /// Description of the unexpected reply
        reason: String,
    },
}

impl AllocatorError {
    /// Whether the error means the backing store itself is unhealthy.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            AllocatorError::Timeout { .. } | AllocatorError::Unavailable { .. }
        )
    }
}

/// Result of a single acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Granted,
    Denied,
}

impl AcquireOutcome {
    pub fn is_granted(self) -> bool {
        self == AcquireOutcome::Granted
    }
}

/// Bounded counting semaphore scoped by simulation id.
#[async_trait]
pub trait SlotAllocator: Send + Sync {
    /// Creates the counter set to `capacity` if it does not exist yet.
    ///
    /// # Errors
    ///
    /// - `AllocatorError::AlreadyInitialized` - If the counter already exists
    /// - `AllocatorError::Timeout` / `AllocatorError::Unavailable` - If the store cannot be reached
    async fn init(&self, id: SimulationId, capacity: u64) -> Result<(), AllocatorError>;

    /// Atomically takes `n` slots, rolling back if that would overdraw.
    ///
    /// Only the in-memory store detects a missing counter. The Redis store
    /// follows `DECRBY` semantics: a missing key is created at zero without an
    /// expiry, the overdraw is rolled back and the call reports `Denied`.
    /// Callers must `init` first and `clear` afterwards.
    ///
    /// # Errors
    ///
    /// - `AllocatorError::NotInitialized` - If the counter does not exist (in-memory store)
    /// - `AllocatorError::Timeout` / `AllocatorError::Unavailable` - If the store cannot be reached
    async fn try_acquire(&self, id: SimulationId, n: u64)
    -> Result<AcquireOutcome, AllocatorError>;

    /// Atomically returns `n` previously granted slots.
    ///
    /// On the Redis store a missing key is created holding `n`, without an
    /// expiry.
    ///
    /// # Errors
    ///
    /// - `AllocatorError::NotInitialized` - If the counter does not exist (in-memory store)
    /// - `AllocatorError::Timeout` / `AllocatorError::Unavailable` - If the store cannot be reached
    async fn release(&self, id: SimulationId, n: u64) -> Result<(), AllocatorError>;

    /// Current committed counter value, `None` if the counter does not exist.
    ///
    /// # Errors
    ///
    /// - `AllocatorError::Timeout` / `AllocatorError::Unavailable` - If the store cannot be reached
    /// - `AllocatorError::Protocol` - If the stored value is not an integer
    async fn remaining(&self, id: SimulationId) -> Result<Option<i64>, AllocatorError>;

    /// Deletes the counter, ending the allocator lifecycle of the run.
    ///
    /// # Errors
    ///
    /// - `AllocatorError::Timeout` / `AllocatorError::Unavailable` - If the store cannot be reached
    async fn clear(&self, id: SimulationId) -> Result<(), AllocatorError>;
}

/// Builds the store selected by `config`.
///
/// The Redis-protocol store is probed with `PING` before it is handed out so
/// an unreachable server fails at startup rather than on the first run.
///
/// # Errors
///
/// - `AllocatorError::Timeout` / `AllocatorError::Unavailable` - If the Redis server cannot be reached
pub async fn connect_allocator(
    config: &StoreConfig,
) -> Result<Arc<dyn SlotAllocator>, AllocatorError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory slot store");
            Ok(Arc::new(InMemorySlotStore::new()))
        }
        StoreBackend::Redis => {
            let store = RespSlotStore::new(
                config.address.clone(),
                config.operation_timeout,
                config.counter_ttl,
            );
            store.ping().await?;
            tracing::info!(address = %config.address, "Connected to Redis slot store");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_memory_store() {
        let config = StoreConfig::default();
        let store = connect_allocator(&config).await.unwrap();

        let id = SimulationId::generate();
        store.init(id, 1).await.unwrap();
        assert_eq!(store.remaining(id).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_connect_unreachable_redis_fails() {
        let config = StoreConfig {
            backend: StoreBackend::Redis,
            // Port 1 on loopback is never a Redis server
            address: "127.0.0.1:1".to_string(),
            operation_timeout: Duration::from_millis(200),
            counter_ttl: None,
        };

        let error = connect_allocator(&config).await.err().unwrap();
        assert!(error.is_store_failure());
    }
}
