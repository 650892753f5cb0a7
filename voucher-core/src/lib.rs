//! Voucher Core - Shared building blocks for the contention simulator
//!
//! This crate provides the domain model of a simulation run (clients,
//! requests, decisions, events), the slot allocator capability with its
//! in-memory and Redis-protocol stores, configuration, and tracing setup.

pub mod allocator;
pub mod config;
pub mod domain;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use allocator::{
    AcquireOutcome, AllocatorError, InMemorySlotStore, RespSlotStore, SlotAllocator,
    connect_allocator,
};
pub use config::VoucherConfig;
pub use domain::{
    Action, Client, ClientArrival, ClientClass, ClientId, Decision, Event, Request, RequestId,
    Simulation, SimulationId, SimulationResult,
};
