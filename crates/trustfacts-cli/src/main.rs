// SPDX-License-Identifier: Apache-2.0

//! Trustfacts - trust metrics for open-source packages.
//!
//! Reads a metric request document and prints the aggregated metrics as JSON.

mod cli;
mod commands;
mod errors;
mod logging;
mod provider;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use trustfacts_core::config;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = config::load_config().context("Failed to load configuration")?;
    debug!("Configuration loaded successfully");

    match commands::run(cli.command, &config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let formatted = errors::format_error(&e);
            eprintln!("Error: {formatted}");
            std::process::exit(1);
        }
    }
}
