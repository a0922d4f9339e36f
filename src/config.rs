use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::database::SqliteQuestionSource;
use crate::question_bank::StaticQuestionBank;
use crate::question_source::{NoQuestionSource, QuestionSource, RestQuestionSource};

// Import logging macros
use crate::{log_system_event, log_validation};

/// Largest batch a caller may ask for.
pub const BATCH_SIZE_LIMIT: usize = 50;

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Rest,
    Sqlite,
    Static,
    None,
}

/// Where stored questions come from
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub table: String,
    pub timeout_secs: u64,
}

/// SQLite question bank location
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    pub default_size: usize,
    pub max_size: usize,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .and_then(|value| value.trim().parse::<bool>().ok())
        .unwrap_or(default)
}

fn number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow!("Invalid {} value: '{}'", key, value)),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");
        let config = Self::from_lookup(env_lookup)?;
        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();
        Ok(config)
    }

    /// Builds the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Config {
            source: SourceConfig::from_lookup(&lookup)?,
            database: DatabaseConfig::from_lookup(&lookup),
            server: ServerConfig::from_lookup(&lookup)?,
            batch: BatchConfig::from_lookup(&lookup)?,
            logging: LoggingConfig::from_lookup(&lookup),
        })
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            question_source = ?self.source.kind,
            source_url = ?self.source.url,
            source_key_masked = %self.source.api_key.as_deref().map(mask_sensitive_data).unwrap_or_default(),
            database_url_masked = %mask_sensitive_data(&self.database.url),
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            default_batch_size = self.batch.default_size,
            max_batch_size = self.batch.max_size,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.batch.max_size == 0 || self.batch.max_size > BATCH_SIZE_LIMIT {
            return Err(anyhow!(
                "MAX_BATCH_SIZE must be between 1 and {}",
                BATCH_SIZE_LIMIT
            ));
        }
        if self.batch.default_size == 0 || self.batch.default_size > self.batch.max_size {
            return Err(anyhow!(
                "DEFAULT_BATCH_SIZE must be between 1 and MAX_BATCH_SIZE ({})",
                self.batch.max_size
            ));
        }

        match self.source.kind {
            SourceKind::Rest => {
                if self.source.url.as_deref().is_none_or(str::is_empty) {
                    return Err(anyhow!("QUESTION_SOURCE_URL is required for the rest source"));
                }
                if self.source.api_key.as_deref().is_none_or(str::is_empty) {
                    return Err(anyhow!("QUESTION_SOURCE_KEY is required for the rest source"));
                }
            }
            SourceKind::Sqlite => {
                if !self.database.url.starts_with("sqlite:") {
                    return Err(anyhow!("DATABASE_URL must start with 'sqlite:'"));
                }
            }
            SourceKind::Static | SourceKind::None => {}
        }

        if self.source.timeout_secs == 0 {
            warn!("QUESTION_SOURCE_TIMEOUT_SECS is 0 - every fetch will time out");
        }

        // Validate log level
        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|level| self.logging.level.to_lowercase().starts_with(level))
        {
            warn!("Invalid log level '{}', using 'info' as fallback", self.logging.level);
        }

        log_validation!(
            success,
            "configuration",
            "Configuration validation completed successfully"
        );
        Ok(())
    }

    /// Instantiates the configured question source.
    pub async fn build_source(&self) -> Result<Arc<dyn QuestionSource>> {
        let source: Arc<dyn QuestionSource> = match self.source.kind {
            SourceKind::Rest => {
                let url = self
                    .source
                    .url
                    .as_deref()
                    .ok_or_else(|| anyhow!("QUESTION_SOURCE_URL is not set"))?;
                let key = self
                    .source
                    .api_key
                    .as_deref()
                    .ok_or_else(|| anyhow!("QUESTION_SOURCE_KEY is not set"))?;
                Arc::new(RestQuestionSource::new(
                    url,
                    key,
                    &self.source.table,
                    self.source.timeout(),
                )?)
            }
            SourceKind::Sqlite => Arc::new(SqliteQuestionSource::new(&self.database.url).await?),
            SourceKind::Static => Arc::new(StaticQuestionBank::built_in()?),
            SourceKind::None => Arc::new(NoQuestionSource),
        };
        info!(question_source = source.name(), "Question source initialized");
        Ok(source)
    }
}

impl SourceConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let kind_str = lookup("QUESTION_SOURCE").unwrap_or_else(|| "none".to_string());
        let kind = match kind_str.trim().to_lowercase().as_str() {
            "rest" | "supabase" | "postgrest" => SourceKind::Rest,
            "sqlite" | "database" | "db" => SourceKind::Sqlite,
            "static" | "builtin" => SourceKind::Static,
            "none" | "" => SourceKind::None,
            _ => {
                info!("Unknown question source '{}', generating all questions locally", kind_str);
                SourceKind::None
            }
        };

        Ok(SourceConfig {
            kind,
            url: lookup("QUESTION_SOURCE_URL").filter(|value| !value.trim().is_empty()),
            api_key: lookup("QUESTION_SOURCE_KEY").filter(|value| !value.trim().is_empty()),
            table: lookup("QUESTION_SOURCE_TABLE").unwrap_or_else(|| "questions".to_string()),
            timeout_secs: number(lookup, "QUESTION_SOURCE_TIMEOUT_SECS", 5)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DatabaseConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let url = lookup("DATABASE_URL").unwrap_or_else(|| "sqlite:practice_arena.db".to_string());
        DatabaseConfig { url }
    }
}

impl ServerConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port_str = lookup("PORT").unwrap_or_else(|| "3000".to_string());
        let port = port_str.parse::<u16>().map_err(|_| {
            anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str)
        })?;

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }
}

impl BatchConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(BatchConfig {
            default_size: number(lookup, "DEFAULT_BATCH_SIZE", 10)?,
            max_size: number(lookup, "MAX_BATCH_SIZE", BATCH_SIZE_LIMIT)?,
        })
    }
}

impl LoggingConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        LoggingConfig {
            level: lookup("RUST_LOG").unwrap_or_else(|| "info,practice_arena=debug".to_string()),
            file_enabled: flag(lookup, "LOG_FILE_ENABLED", true),
            console_enabled: flag(lookup, "LOG_CONSOLE_ENABLED", true),
            log_directory: lookup("LOG_DIRECTORY").unwrap_or_else(|| "logs".to_string()),
        }
    }
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}
