//! LLM configuration: trait and env-based implementation.

use anyhow::{Context, Result};
use std::env;

use crate::openai_llm::DEFAULT_MODEL;

/// LLM configuration interface for OpenAI-compatible APIs.
pub trait LlmConfig: Send + Sync {
    fn api_key(&self) -> &str;
    fn base_url(&self) -> &str;
    fn model(&self) -> &str;
}

/// LLM config loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvLlmConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub llm_model: String,
}

impl LlmConfig for EnvLlmConfig {
    fn api_key(&self) -> &str {
        &self.openai_api_key
    }
    fn base_url(&self) -> &str {
        &self.openai_base_url
    }
    fn model(&self) -> &str {
        &self.llm_model
    }
}

impl EnvLlmConfig {
    /// Load from `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `MODEL`.
    pub fn from_env() -> Result<Self> {
        let openai_api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;
        let openai_base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let llm_model = env::var("MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self {
            openai_api_key,
            openai_base_url,
            llm_model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn from_env_applies_defaults() {
        env::set_var("OPENAI_API_KEY", "test_key");
        env::remove_var("OPENAI_BASE_URL");
        env::remove_var("MODEL");

        let config = EnvLlmConfig::from_env().unwrap();
        assert_eq!(config.api_key(), "test_key");
        assert_eq!(config.base_url(), "https://api.openai.com/v1");
        assert_eq!(config.model(), DEFAULT_MODEL);
    }

    #[test]
    #[serial]
    fn from_env_requires_api_key() {
        env::remove_var("OPENAI_API_KEY");
        assert!(EnvLlmConfig::from_env().is_err());
    }
}
