//! Binary crate for the postal code validation gateway.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and environment variables
//! - Wiring configuration, telemetry and the HTTP server

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
