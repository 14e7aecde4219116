//! # aeonconf
//!
//! Resolves build options for a target platform into a requirement
//! manifest and a build variable table.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            apps/aeonconf (THE BINARY)        │
//! │                                              │
//! │  ┌─────────────┐      ┌──────────────────┐   │
//! │  │    CLI      │      │  config loading  │   │
//! │  │   (clap)    │      │  (toml, files)   │   │
//! │  └──────┬──────┘      └────────┬─────────┘   │
//! │         └───────────┬──────────┘             │
//! │                     ▼                        │
//! │             ┌───────────────┐                │
//! │             │ aeonconf-core │                │
//! │             │  (THE LOGIC)  │                │
//! │             └───────────────┘                │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! aeonconf resolve --os windows -o shared=true
//! aeonconf variables --format cmake --profile release.toml > init.cmake
//! aeonconf lock --output aeonconf.lock
//! aeonconf verify -i aeonconf.lock
//! ```

use aeonconf::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // AEONCONF_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("AEONCONF_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "aeonconf=info,aeonconf_core=warn".into());

    // Logs go to stderr; stdout carries the command output.
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

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
