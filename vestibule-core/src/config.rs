//! Client configuration

use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, VestibuleError, VestibuleResult};

/// Canonical storage key for the bearer credential
///
/// The product historically used two different keys in different views; the
/// client treats that as a defect and persists under a single key.
pub const CREDENTIAL_KEY: &str = "token";

/// Storage key for the cached principal profile
pub const PRINCIPAL_CACHE_KEY: &str = "user.json";

/// Namespace for all persisted client state, to avoid collisions with
/// unrelated data in the same storage substrate
pub const STORAGE_NAMESPACE: &str = "vestibule";

/// Configuration for the account service API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the account service
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3002".to_string(),
            timeout_seconds: 30,
            user_agent: format!("vestibule/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    /// Create a configuration for a specific base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from the environment
    ///
    /// Honors `VESTIBULE_API_URL` and `VESTIBULE_TIMEOUT_SECONDS`, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> VestibuleResult<Self> {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("VESTIBULE_API_URL") {
            if base_url.trim().is_empty() {
                return Err(VestibuleError::Config {
                    message: "VESTIBULE_API_URL is set but empty".to_string(),
                    context: ErrorContext::new("api_config").with_operation("from_env"),
                });
            }
            config.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("VESTIBULE_TIMEOUT_SECONDS") {
            config.timeout_seconds = timeout.parse().map_err(|_| VestibuleError::Config {
                message: format!("invalid VESTIBULE_TIMEOUT_SECONDS: {timeout}"),
                context: ErrorContext::new("api_config").with_operation("from_env"),
            })?;
        }

        Ok(config)
    }

    /// Join an endpoint path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
