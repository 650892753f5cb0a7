//! Integration tests for the voucher simulator
//!
//! These tests drive the engine across crate boundaries: validation into the
//! orchestrator, the HTTP router end to end, the Redis-protocol store against
//! an in-process server, and concurrent acquisition on a shared counter.

#[path = "integration/fake_resp.rs"]
mod fake_resp;

#[path = "integration/concurrent_allocation.rs"]
mod concurrent_allocation;
#[path = "integration/http_api.rs"]
mod http_api;
#[path = "integration/resp_store.rs"]
mod resp_store;
#[path = "integration/scenarios.rs"]
mod scenarios;
