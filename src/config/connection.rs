use crate::core::ConfigProvider;
use crate::utils::error::{PluginError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
/// Upstream default `limit` for list endpoints.
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConnectionFile {
    #[serde(default)]
    connection: ConnectionConfig,
}

/// Settings for talking to the upstream API, usually read from the
/// `[connection]` table of a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub base_url: String,
    pub page_size: usize,
    pub timeout_seconds: u64,
    pub concurrency: usize,
    pub user_agent: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            concurrency: DEFAULT_CONCURRENCY,
            user_agent: format!("pokemon-location/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ConnectionConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PluginError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let file: ConnectionFile =
            toml::from_str(&processed_content).map_err(|e| PluginError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        Ok(file.connection)
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PluginError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for ConnectionConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("connection.base_url", &self.base_url)?;
        validation::validate_range("connection.page_size", self.page_size, 1, MAX_PAGE_SIZE)?;
        validation::validate_positive_number("connection.concurrency", self.concurrency, 1)?;
        validation::validate_positive_number(
            "connection.timeout_seconds",
            self.timeout_seconds as usize,
            1,
        )?;
        validation::validate_non_empty_string("connection.user_agent", &self.user_agent)?;
        Ok(())
    }
}

impl ConfigProvider for ConnectionConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
