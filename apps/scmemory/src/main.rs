//! # scmemory - Semantic Memory Client
//!
//! Command-line front end for `scmemory-core`.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/scmemory (THE BINARY)         │
//! │                                               │
//! │  ┌───────────┐   ┌──────────┐   ┌──────────┐  │
//! │  │   CLI     │   │  Config  │   │ WebSocket│  │
//! │  │  (clap)   │   │  (toml)  │   │(tungsten)│  │
//! │  └─────┬─────┘   └────┬─────┘   └────┬─────┘  │
//! │        └──────────────┼──────────────┘        │
//! │                       ▼                       │
//! │               ┌───────────────┐               │
//! │               │ scmemory-core │               │
//! │               │ (THE PROTOCOL)│               │
//! │               └───────────────┘               │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! scmemory create-node -t node-const-class
//! scmemory create-link -k int 42
//! scmemory create-edge -t access-const-pos-perm -s 12 -g 14
//! scmemory search nen -f 12 -e access-const-pos-perm -n node-const-class
//! scmemory --json-mode get-content -k int 14
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // SCMEMORY_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("SCMEMORY_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scmemory=info,scmemory_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
