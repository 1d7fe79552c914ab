// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for the Trustfacts CLI.
//!
//! Uses `tracing` with `tracing-subscriber` for structured logging. Logs go
//! to stderr so stdout carries only the JSON result.
//!
//! # Examples
//!
//! ```bash
//! # Default: warnings only
//! trustfacts collect --request request.json
//!
//! # Every fetch and quota refresh
//! RUST_LOG=trustfacts=debug trustfacts collect --request request.json
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "trustfacts=warn,reqwest=error";

/// Filter used with `--verbose` when `RUST_LOG` is unset.
const VERBOSE_FILTER: &str = "trustfacts=info,reqwest=warn";

/// Initialize the logging subsystem.
///
/// `RUST_LOG` takes precedence over the `verbose` flag.
pub fn init_logging(verbose: bool) {
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let default_filter = if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    };
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
