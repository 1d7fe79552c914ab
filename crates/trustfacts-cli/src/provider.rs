// SPDX-License-Identifier: Apache-2.0

//! CLI-specific `TokenProvider` implementation.
//!
//! Resolves API credentials from environment variables.

use secrecy::SecretString;
use tracing::debug;
use trustfacts_core::TokenProvider;

/// Environment variables checked for a GitHub token, in order.
const GITHUB_TOKEN_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// Environment variable holding the Libraries.io API key.
const LIBRARIES_TOKEN_VAR: &str = "LIBRARIES_TOKEN";

/// CLI implementation of `TokenProvider`.
///
/// Resolves credentials from:
/// - GitHub: `GITHUB_TOKEN`, then `GH_TOKEN`
/// - Libraries.io: `LIBRARIES_TOKEN`
pub struct EnvTokenProvider;

fn env_secret(name: &str) -> Option<SecretString> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(SecretString::from(value)),
        _ => None,
    }
}

impl TokenProvider for EnvTokenProvider {
    fn github_token(&self) -> Option<SecretString> {
        let token = GITHUB_TOKEN_VARS.iter().find_map(|name| {
            let token = env_secret(name)?;
            debug!(source = name, "Resolved GitHub token from environment");
            Some(token)
        });
        if token.is_none() {
            debug!("No GitHub token found, using anonymous access");
        }
        token
    }

    fn libraries_token(&self) -> Option<SecretString> {
        let token = env_secret(LIBRARIES_TOKEN_VAR);
        if token.is_some() {
            debug!("Resolved Libraries.io API key from environment");
        } else {
            debug!("No Libraries.io API key found in environment");
        }
        token
    }
}
