//! lb-proxy: HTTP load balancer with per-client rate limiting.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                      LB-PROXY                         │
//!                     │                                                       │
//!  Client Request     │  ┌──────────┐   ┌────────────┐   ┌───────────────┐   │
//!  ───────────────────┼─▶│  http    │──▶│ rate limit │──▶│ backend pool  │───┼──▶ Backend
//!                     │  │ server   │   │  (clients) │   │ round robin + │   │    Servers
//!                     │  └────┬─────┘   └────────────┘   │   failover    │   │
//!                     │       │                          └───────▲───────┘   │
//!  Operator           │       ▼                                  │           │
//!  ───────────────────┼─▶ /clients, /backends (admin)      health monitor    │
//!                     │                                                       │
//!                     │  config · observability · lifecycle (signals/drain)   │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use lb_proxy::config::load_config;
use lb_proxy::lifecycle::startup;
use lb_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "lb-proxy")]
#[command(about = "HTTP load balancer with per-client rate limiting", long_about = None)]
struct Args {
    /// Path to the TOML or YAML configuration file.
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    logging::init(config.env, &config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        env = ?config.env,
        bind_address = %config.listener.bind_address,
        backends = ?config.backends.addresses,
        "lb-proxy starting"
    );

    if let Err(e) = startup::run(config).await {
        tracing::error!(error = %e, "lb-proxy failed");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
