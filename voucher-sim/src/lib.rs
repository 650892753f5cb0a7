//! Voucher Simulation Engine - Deterministic admission-control replay.

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! This crate reproduces a contention scenario from a seed: many clients
//! draw against a small pool of slots, a scheduling strategy picks one
//! request per tick, and every pick is tested against an atomic slot
//! counter. The same seed and parameters always yield the same timeline.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use voucher_core::InMemorySlotStore;
//! use voucher_sim::{SimulationOrchestrator, SimulationParams, StrategyRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = SimulationOrchestrator::new(
//!     Arc::new(InMemorySlotStore::new()),
//!     Arc::new(StrategyRegistry::with_builtin()),
//! );
//!
//! let result = orchestrator
//!     .run(SimulationParams {
//!         seed: 42,
//!         total_clients: 50,
//!         total_vouchers: 10,
//!         policy: "hybrid".to_string(),
//!     })
//!     .await?;
//! println!("{} of {} requests served", result.allocated_count(), result.events.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Workload Generator**: seed → clients → requests, on two independent streams
//! - **Strategies**: tick-driven single-server queue with pluggable selection
//! - **Orchestrator**: wires generator, strategy and slot allocator together
//! - **Timeline checks**: invariants and statistics over a finished run

pub mod deterministic;
pub mod invariants;
pub mod orchestrator;
pub mod report;
pub mod request;
pub mod scheduler;
pub mod workload;

pub use deterministic::DeterministicRng;
pub use invariants::{
    ArrivalOrderInvariant, CapacityInvariant, ExhaustionInvariant, InvariantViolation,
    TickOrderInvariant, TimelineInvariant, check_timeline,
};
pub use orchestrator::{SimulationError, SimulationOrchestrator, SimulationParams};
pub use report::{ClassBreakdown, TimelineStats};
pub use request::{SimulationRequest, ValidationError};
pub use scheduler::{
    FifoStrategy, HybridStrategy, HybridWeights, LotteryStrategy, PriorityStrategy, Strategy,
    StrategyRegistry,
};
pub use workload::{Workload, generate_clients, generate_requests, generate_workload};
