// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keepr - a gated-membership engine for token-gated chat groups.
//!
//! This is the binary entry point for the Keepr engine.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;
mod status;

/// Keepr - a gated-membership engine for token-gated chat groups.
#[derive(Parser, Debug)]
#[command(name = "keepr", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the engine until SIGINT/SIGTERM.
    Serve,
    /// Show queue, watchlist, and per-vault sync state.
    Status {
        /// Output structured JSON for scripting.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match keepr_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            keepr_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        None => {
            println!("keepr: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("keepr: {e}");
        std::process::exit(1);
    }
}
