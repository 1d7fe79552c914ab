// SPDX-License-Identifier: Apache-2.0

//! Command-line interface definition for Trustfacts.
//!
//! Uses clap's derive API for declarative CLI parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Trustfacts - trust metrics for open-source packages.
///
/// Collects contributor, release, issue, dependency, and popularity metrics
/// about a package from GitHub, Libraries.io, and Stack Overflow.
#[derive(Parser)]
#[command(name = "trustfacts")]
#[command(version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Enable verbose output (info-level logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Collect the metrics named in a request document
    Collect {
        /// Request document path, or `-` for stdin
        #[arg(long, short = 'r', default_value = "-")]
        request: PathBuf,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },

    /// Show the remaining GitHub API budgets
    Quota,
}
