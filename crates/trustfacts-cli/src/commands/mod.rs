// SPDX-License-Identifier: Apache-2.0

//! Command handlers for the Trustfacts CLI.

pub mod collect;
pub mod quota;

use anyhow::Result;
use trustfacts_core::AppConfig;

use crate::cli::Commands;

/// Dispatch to the appropriate command handler.
pub async fn run(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Collect { request, pretty } => {
            let output = collect::run(&request, config).await?;
            println!("{}", collect::render(&output, pretty)?);
            Ok(())
        }
        Commands::Quota => {
            let status = quota::run(config).await?;
            println!("{}", status.message());
            if status.is_low() {
                eprintln!("Warning: GitHub core quota is running low.");
            }
            Ok(())
        }
    }
}
