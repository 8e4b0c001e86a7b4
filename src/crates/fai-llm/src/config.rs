//! Configuration for the remote inference backend.

use std::time::Duration;

use fai_core::BackendError;
use serde::{Deserialize, Serialize};

/// Configuration for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteBackendConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    ///
    /// Examples:
    /// - OpenAI: "https://api.openai.com/v1"
    /// - Deepseek: "https://api.deepseek.com"
    /// - OpenRouter: "https://openrouter.ai/api/v1"
    pub base_url: String,

    /// Request timeout duration.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Rounds of tool calls allowed within a single agent call.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl RemoteBackendConfig {
    /// Create a new remote backend configuration.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout: default_timeout(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }

    /// Create configuration from an environment variable holding the API key.
    pub fn from_env(env_var: &str, base_url: impl Into<String>) -> Result<Self, BackendError> {
        let api_key = std::env::var(env_var).map_err(|_| {
            BackendError::Configuration(format!("environment variable not set: {env_var}"))
        })?;
        Ok(Self::new(api_key, base_url))
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the tool-call round budget.
    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_tool_rounds() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_var_is_a_configuration_error() {
        let err = RemoteBackendConfig::from_env("FAI_TEST_KEY_THAT_IS_NOT_SET", "http://x")
            .unwrap_err();
        assert!(matches!(err, BackendError::Configuration(_)));
    }

    #[test]
    fn defaults_apply() {
        let config = RemoteBackendConfig::new("sk-test", "https://api.openai.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_tool_rounds, 8);
    }
}
