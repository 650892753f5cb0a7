//! CLI command implementations

use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use voucher_core::allocator::connect_allocator;
use voucher_core::config::{StoreBackend, VoucherConfig};
use voucher_core::domain::SimulationResult;
use voucher_sim::{
    SimulationOrchestrator, SimulationRequest, StrategyRegistry, TimelineStats, check_timeline,
};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run one simulation and print its outcome
    Simulate {
        /// Number of competing clients
        #[arg(short, long)]
        clients: i64,
        /// Number of available slots
        #[arg(short, long)]
        vouchers: i64,
        /// Workload seed (random when omitted)
        #[arg(short, long)]
        seed: Option<u64>,
        /// Scheduling policy
        #[arg(short, long, default_value = "hybrid")]
        policy: String,
        /// Use a Redis-compatible store at this address instead of memory
        #[arg(long)]
        redis: Option<String>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the HTTP API server
    Server {
        /// Host to bind to (overrides VOUCHER_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides VOUCHER_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List registered scheduling policies
    Policies,
}

/// Handle the CLI command
///
/// # Errors
/// Returns the error of the command that failed
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Simulate {
            clients,
            vouchers,
            seed,
            policy,
            redis,
            json,
        } => {
            let request = SimulationRequest {
                total_clients: clients,
                total_vouchers: vouchers,
                seed,
                policy,
            };
            run_simulation(request, redis, json).await
        }
        Commands::Server { host, port } => start_server(host, port).await,
        Commands::Policies => {
            list_policies();
            Ok(())
        }
    }
}

async fn run_simulation(
    request: SimulationRequest,
    redis: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = VoucherConfig::from_env();
    match redis {
        Some(address) => {
            config.store.backend = StoreBackend::Redis;
            config.store.address = address;
        }
        None => config.store.backend = StoreBackend::Memory,
    }

    let registry = Arc::new(StrategyRegistry::with_builtin());
    let params = request
        .into_params(&registry, &config.limits)
        .context("Invalid simulation parameters")?;

    let allocator = connect_allocator(&config.store)
        .await
        .context("Failed to connect slot store")?;
    let orchestrator = SimulationOrchestrator::new(allocator, registry);
    let result = orchestrator.run(params).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn print_summary(result: &SimulationResult) {
    let simulation = &result.simulation;
    println!("Simulation {}", simulation.id);
    println!(
        "  Policy: {}  Seed: {}  Slots: {}  Requests: {}",
        simulation.policy, simulation.seed, simulation.slots, simulation.total_requests
    );

    for line in TimelineStats::from_result(result).summary().lines() {
        println!("  {line}");
    }

    let violations = check_timeline(result);
    if violations.is_empty() {
        println!("  Invariants: all hold");
    } else {
        for violation in violations {
            println!("  {violation}");
        }
    }
}

async fn start_server(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = VoucherConfig::from_env();
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    voucher_web::run_server(config).await?;
    Ok(())
}

fn list_policies() {
    for name in StrategyRegistry::with_builtin().names() {
        println!("{name}");
    }
}
