//! Session credential lookup
//!
//! Every remote call carries a bearer credential. The provider is a trait so
//! the token source (config file, environment, a future refresh flow) stays
//! out of the service clients, and so multiple clients can read the current
//! token concurrently without coordination.

use crate::config::ServiceConfig;

/// Environment variable checked when no API key is configured.
pub const API_KEY_ENV: &str = "MEDIVOICE_API_KEY";

/// Read-only access to the current bearer credential.
///
/// Implementations must be idempotent and side-effect free: the transcription,
/// enhancement, and generation clients all call this per request.
pub trait SessionProvider: Send + Sync {
    /// The current bearer token, if any is available.
    fn bearer_token(&self) -> Option<String>;
}

/// Session provider backed by a fixed token from config or environment.
pub struct StaticSession {
    token: Option<String>,
}

impl StaticSession {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// Resolve the token from config, falling back to `MEDIVOICE_API_KEY`.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let token = config
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|t| !t.trim().is_empty());
        Self { token }
    }
}

impl SessionProvider for StaticSession {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token_returned_repeatedly() {
        let session = StaticSession::new(Some("tok-123".to_string()));
        assert_eq!(session.bearer_token(), Some("tok-123".to_string()));
        assert_eq!(session.bearer_token(), Some("tok-123".to_string()));
    }

    #[test]
    fn test_missing_token() {
        let session = StaticSession::new(None);
        assert_eq!(session.bearer_token(), None);
    }
}
