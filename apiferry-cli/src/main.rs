//! apiferry Unified CLI
//!
//! A local forwarding proxy for LLM API traffic.

// Use mimalloc as the global allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod commands;
mod credentials;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "apiferry",
    author,
    version,
    about = "Local forwarding proxy for LLM API traffic",
    long_about = "apiferry is a local HTTP proxy that sits between a coding-assistant\n\
                  client and a remote LLM API, injecting credentials and headers on the way.\n\n\
                  It can be used as a CLI tool or embedded directly into your applications.",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the forwarding proxy
    Serve(commands::serve::ServeArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
