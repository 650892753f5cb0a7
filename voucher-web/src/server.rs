//! HTTP server wiring for the simulator API
//!
//! Builds the shared application state once per process and exposes the
//! simulation, policy listing and health endpoints behind CORS, request
//! tracing and an optional global rate limit.

use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use voucher_core::allocator::{AllocatorError, SlotAllocator, connect_allocator};
use voucher_core::config::{SimulationLimits, VoucherConfig};
use voucher_sim::{SimulationOrchestrator, StrategyRegistry};

use crate::handlers::{health, policies, simulate};
use crate::rate_limit::{RateLimiter, rate_limit};

/// Errors that stop the server from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Slot store could not be reached at startup
    #[error("Failed to connect slot store: {0}")]
    Store(#[from] AllocatorError),

    /// Listener could not be bound or the server loop failed
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Runs simulations against the configured slot store
    pub orchestrator: SimulationOrchestrator,
    /// Input ceilings applied during validation
    pub limits: SimulationLimits,
    /// Global limiter, present when rate limiting is enabled
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

impl AppState {
    /// Creates state over an allocator and registry using `config`.
    pub fn new(
        allocator: Arc<dyn SlotAllocator>,
        registry: Arc<StrategyRegistry>,
        config: &VoucherConfig,
    ) -> Self {
        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::new(&config.rate_limit)));

        Self {
            orchestrator: SimulationOrchestrator::new(allocator, registry),
            limits: config.limits.clone(),
            rate_limiter,
        }
    }
}

/// Builds the API router with all middleware attached.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let mut router = Router::new()
        .route("/simulate", post(simulate))
        .route("/policies", get(policies))
        .route("/health", get(health));

    if let Some(limiter) = state.rate_limiter.clone() {
        router = router.layer(middleware::from_fn_with_state(limiter, rate_limit));
    }

    router
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Connects the configured store and serves the API until Ctrl-C.
///
/// # Errors
///
/// - `ServerError::Store` - If the slot store is unreachable
/// - `ServerError::Io` - If the listener cannot be bound
pub async fn run_server(config: VoucherConfig) -> Result<(), ServerError> {
    let allocator = connect_allocator(&config.store).await?;
    let registry = Arc::new(StrategyRegistry::with_builtin());
    let state = AppState::new(allocator, registry, &config);
    let app = build_router(state, &config.server.allowed_origins);

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        store = ?config.store.backend,
        rate_limit = config.rate_limit.enabled,
        "Voucher simulator API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
