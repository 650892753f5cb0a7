//! Voucher Web - JSON API Server

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Exposes the simulation engine over HTTP: `POST /simulate` runs one
//! simulation, `GET /policies` lists registered strategies and
//! `GET /health` reports liveness. Every error uses the same
//! `{ "code", "message" }` envelope.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod server;

// Re-export main types
pub use error::ApiError;
pub use server::{AppState, ServerError, build_router, run_server};
