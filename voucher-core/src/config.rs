//! Centralized configuration for the voucher simulator.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::time::Duration;

/// Central configuration for all voucher components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct VoucherConfig {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub store: StoreConfig,
    pub limits: SimulationLimits,
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Origins allowed by CORS (empty = permissive)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            allowed_origins: Vec::new(),
        }
    }
}

/// Process-wide request rate limiting.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Sustained requests per second
    pub requests_per_second: u64,
    /// Short-term burst allowance
    pub burst: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 10,
            burst: 20,
        }
    }
}

/// Which backing store holds the slot counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Counters live in process memory
    Memory,
    /// Counters live in a Redis-compatible server
    Redis,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            _ => Err(format!("Invalid store backend: {s}")),
        }
    }
}

/// Slot counter store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Address of the Redis-compatible server
    pub address: String,
    /// Upper bound for each store round trip
    pub operation_timeout: Duration,
    /// Expiry applied to counters so crashed runs do not leave them behind
    pub counter_ttl: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            address: "127.0.0.1:6379".to_string(),
            operation_timeout: Duration::from_secs(2),
            counter_ttl: Some(Duration::from_secs(3600)), // 1 hour
        }
    }
}

/// Default population ceiling for one run.
///
/// Every strategy scans the whole queue once per tick, and arrivals cluster
/// around a single tick, so scheduling cost grows with the square of the
/// request count.
pub const DEFAULT_MAX_CLIENTS: u32 = 5_000;

/// Bounds on accepted simulation parameters.
#[derive(Debug, Clone)]
pub struct SimulationLimits {
    /// Largest client population a single run may generate
    pub max_clients: u32,
}

impl Default for SimulationLimits {
    fn default() -> Self {
        Self {
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }
}

impl VoucherConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("VOUCHER_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("VOUCHER_PORT")
            && let Ok(port) = port.parse::<u16>()
        {
            config.server.port = port;
        }

        if let Ok(origins) = std::env::var("VOUCHER_ALLOWED_ORIGINS") {
            config.server.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }

        // Rate limiting
        if let Ok(enabled) = std::env::var("VOUCHER_RATE_LIMIT_ENABLED") {
            config.rate_limit.enabled = enabled.parse().unwrap_or(false);
        }

        if let Ok(rps) = std::env::var("VOUCHER_RATE_LIMIT_RPS")
            && let Ok(rps) = rps.parse::<u64>()
        {
            config.rate_limit.requests_per_second = rps;
        }

        if let Ok(burst) = std::env::var("VOUCHER_RATE_LIMIT_BURST")
            && let Ok(burst) = burst.parse::<u64>()
        {
            config.rate_limit.burst = burst;
        }

        // Counter store
        if let Ok(backend) = std::env::var("VOUCHER_STORE")
            && let Ok(backend) = backend.parse::<StoreBackend>()
        {
            config.store.backend = backend;
        }

        if let Ok(address) = std::env::var("VOUCHER_REDIS_ADDR") {
            config.store.address = address;
        }

        if let Ok(timeout) = std::env::var("VOUCHER_STORE_TIMEOUT_MS")
            && let Ok(millis) = timeout.parse::<u64>()
        {
            config.store.operation_timeout = Duration::from_millis(millis);
        }

        if let Ok(ttl) = std::env::var("VOUCHER_COUNTER_TTL_SECS")
            && let Ok(seconds) = ttl.parse::<u64>()
        {
            config.store.counter_ttl = (seconds > 0).then(|| Duration::from_secs(seconds));
        }

        if let Ok(max_clients) = std::env::var("VOUCHER_MAX_CLIENTS")
            && let Ok(max_clients) = max_clients.parse::<u32>()
        {
            config.limits.max_clients = max_clients;
        }

        config
    }

    /// Creates a configuration optimized for testing.
    pub fn for_testing() -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Memory,
                operation_timeout: Duration::from_millis(500),
                counter_ttl: None,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
