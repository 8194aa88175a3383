//! Application configuration, loaded from environment variables.

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use coach_memory::MemoryConfig;
use llm_client::EnvLlmConfig;

/// `coachmem` configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_file: String,
    /// `None` when `OPENAI_API_KEY` is unset; only compaction needs it.
    pub llm: Option<EnvLlmConfig>,
    pub memory: MemoryConfig,
}

impl AppConfig {
    /// Loads from `MEMORY_DATABASE_URL`, `LOG_FILE`, the LLM variables read by
    /// [`EnvLlmConfig::from_env`] and the `MEMORY_*` tunables. The memory config is validated.
    pub fn load() -> Result<Self> {
        let database_url =
            env::var("MEMORY_DATABASE_URL").unwrap_or_else(|_| "./data/coach_memory.db".to_string());
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/coachmem.log".to_string());
        let llm = EnvLlmConfig::from_env().ok();

        let mut memory = MemoryConfig::default();
        let compaction = &mut memory.compaction;
        compaction.window_limit = env_or("MEMORY_WINDOW_LIMIT", compaction.window_limit)?;
        compaction.retained_tail = env_or("MEMORY_RETAINED_TAIL", compaction.retained_tail)?;
        compaction.min_summary_chars =
            env_or("MEMORY_MIN_SUMMARY_CHARS", compaction.min_summary_chars)?;
        let timeout_secs: u64 = env_or(
            "MEMORY_SUMMARY_TIMEOUT_SECS",
            compaction.summary_timeout_ms / 1000,
        )?;
        compaction.summary_timeout_ms = timeout_secs.checked_mul(1000).with_context(|| {
            format!("MEMORY_SUMMARY_TIMEOUT_SECS is too large: {timeout_secs}")
        })?;
        memory.packet_lookahead = env_or("MEMORY_PACKET_LOOKAHEAD", memory.packet_lookahead)?;
        memory.max_append_attempts =
            env_or("MEMORY_MAX_APPEND_ATTEMPTS", memory.max_append_attempts)?;
        memory.validate().context("Invalid memory configuration")?;

        Ok(Self {
            database_url,
            log_file,
            llm,
            memory,
        })
    }
}

/// Parses `name` if set, otherwise returns `default`. A set but unparsable value is an error.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 11] = [
        "MEMORY_DATABASE_URL",
        "LOG_FILE",
        "OPENAI_API_KEY",
        "OPENAI_BASE_URL",
        "MODEL",
        "MEMORY_WINDOW_LIMIT",
        "MEMORY_RETAINED_TAIL",
        "MEMORY_PACKET_LOOKAHEAD",
        "MEMORY_SUMMARY_TIMEOUT_SECS",
        "MEMORY_MIN_SUMMARY_CHARS",
        "MEMORY_MAX_APPEND_ATTEMPTS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_load_config_with_defaults() {
        clear_env();

        let config = AppConfig::load().unwrap();

        assert_eq!(config.database_url, "./data/coach_memory.db");
        assert_eq!(config.log_file, "logs/coachmem.log");
        assert!(config.llm.is_none());
        assert_eq!(config.memory, MemoryConfig::default());
        assert_eq!(config.memory.compaction.summary_timeout_ms, 8000);
    }

    #[test]
    #[serial]
    fn test_load_config_with_custom_values() {
        clear_env();
        env::set_var("MEMORY_DATABASE_URL", "/tmp/coach.db");
        env::set_var("OPENAI_API_KEY", "custom_key");
        env::set_var("MODEL", "gpt-4o");
        env::set_var("MEMORY_WINDOW_LIMIT", "20");
        env::set_var("MEMORY_RETAINED_TAIL", "4");
        env::set_var("MEMORY_PACKET_LOOKAHEAD", "5");
        env::set_var("MEMORY_SUMMARY_TIMEOUT_SECS", "15");
        env::set_var("MEMORY_MAX_APPEND_ATTEMPTS", "7");

        let config = AppConfig::load().unwrap();

        assert_eq!(config.database_url, "/tmp/coach.db");
        let llm = config.llm.unwrap();
        assert_eq!(llm.openai_api_key, "custom_key");
        assert_eq!(llm.llm_model, "gpt-4o");
        assert_eq!(config.memory.compaction.window_limit, 20);
        assert_eq!(config.memory.compaction.retained_tail, 4);
        assert_eq!(config.memory.compaction.summary_timeout_ms, 15_000);
        assert_eq!(config.memory.packet_lookahead, 5);
        assert_eq!(config.memory.max_append_attempts, 7);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_config_rejects_bad_values() {
        clear_env();
        env::set_var("MEMORY_WINDOW_LIMIT", "ten");
        assert!(AppConfig::load().is_err());

        env::set_var("MEMORY_WINDOW_LIMIT", "4");
        env::set_var("MEMORY_RETAINED_TAIL", "4");
        assert!(AppConfig::load().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_config_rejects_overflowing_timeout() {
        clear_env();
        env::set_var("MEMORY_SUMMARY_TIMEOUT_SECS", u64::MAX.to_string());

        let err = AppConfig::load().unwrap_err();
        assert!(err.to_string().contains("MEMORY_SUMMARY_TIMEOUT_SECS"));

        env::set_var("MEMORY_SUMMARY_TIMEOUT_SECS", (u64::MAX / 1000).to_string());
        let config = AppConfig::load().unwrap();
        assert_eq!(config.memory.compaction.summary_timeout_ms, u64::MAX / 1000 * 1000);
        clear_env();
    }
}
