//! Binary crate for the `krishi` command.
//!
//! This crate focuses on:
//! - The axum HTTP API (`krishi serve`)
//! - Interactive provider configuration
//! - One-shot weather, market and advisor lookups printed as JSON

use clap::Parser;

mod app;
mod cli;
mod error;
mod extractors;
mod routes;
mod telemetry;

use app::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
