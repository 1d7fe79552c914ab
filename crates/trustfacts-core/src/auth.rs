// SPDX-License-Identifier: Apache-2.0

//! Token provider abstraction for credential resolution.
//!
//! The engine never reads environment variables or credential stores itself;
//! each front end implements [`TokenProvider`] over its own sources.

use secrecy::SecretString;

/// Provides GitHub and Libraries.io credentials for API calls.
///
/// Implementations should return `None` if a credential is not available.
/// Anonymous GitHub access works with a much smaller quota.
pub trait TokenProvider: Send + Sync {
    /// Retrieves the GitHub API token.
    fn github_token(&self) -> Option<SecretString>;

    /// Retrieves the Libraries.io API key.
    fn libraries_token(&self) -> Option<SecretString>;
}

/// A [`TokenProvider`] holding fixed credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    /// GitHub API token.
    pub github: Option<SecretString>,
    /// Libraries.io API key.
    pub libraries: Option<SecretString>,
}

impl TokenProvider for StaticTokens {
    fn github_token(&self) -> Option<SecretString> {
        self.github.clone()
    }

    fn libraries_token(&self) -> Option<SecretString> {
        self.libraries.clone()
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_static_tokens() {
        let provider = StaticTokens {
            github: Some(SecretString::new("gh_token".to_string().into())),
            libraries: None,
        };

        assert_eq!(
            provider.github_token().unwrap().expose_secret(),
            "gh_token"
        );
        assert!(provider.libraries_token().is_none());
    }

    #[test]
    fn test_static_tokens_default_is_anonymous() {
        let provider = StaticTokens::default();

        assert!(provider.github_token().is_none());
        assert!(provider.libraries_token().is_none());
    }
}
