use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::types::SchemaMap;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("check_scope.schemas and check_scope.tables are both empty; nothing to compare")]
    EmptyScope,
}

/// One connection's worth of settings. `password` may reference an
/// environment variable as `${VAR_NAME}`, expanded at load time the same
/// way `mantis::config::connection` expands its own secrets.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    /// Path to the vendor JDBC driver the original checker shelled out to;
    /// unused by this crate's native drivers but accepted so existing
    /// `config.yml` files don't need editing to be loaded.
    #[serde(default)]
    pub driver_jar: Option<String>,
}

impl ConnectionConfig {
    fn expand_secrets(mut self) -> Self {
        self.password = expand_env_vars(&self.password);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabasesConfig {
    pub src: ConnectionConfig,
    pub tgt: ConnectionConfig,
}

fn default_thread_count() -> usize {
    4
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        PerformanceConfig {
            thread_count: default_thread_count(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckScopeConfig {
    #[serde(default)]
    pub schema_mapping: HashMap<String, String>,
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub exclude_tables: Vec<String>,
    #[serde(default)]
    pub custom_sqls: Vec<CustomSql>,
}

/// One ad-hoc query from `check_scope.custom_sqls`; `name` becomes the
/// `CUSTOM:<name>` TaskKey suffix.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomSql {
    pub name: String,
    pub sql: String,
}

impl CheckScopeConfig {
    pub fn schema_map(&self) -> SchemaMap {
        SchemaMap::new(
            self.schema_mapping
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        )
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

/// The full, deserialized shape of `config.yml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub databases: DatabasesConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    pub check_scope: CheckScopeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RunConfig {
    /// Parse and validate a `config.yml`-shaped file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: RunConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        config.databases.src = config.databases.src.expand_secrets();
        config.databases.tgt = config.databases.tgt.expand_secrets();

        if config.check_scope.schemas.is_empty() && config.check_scope.tables.is_empty() {
            return Err(ConfigError::EmptyScope);
        }

        Ok(config)
    }
}

/// Replaces every `${VAR_NAME}` occurrence with the named environment
/// variable's value, left as-is (including the braces) if the variable
/// isn't set.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var_name = &after[..end];
                match std::env::var(var_name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => out.push_str(&format!("${{{var_name}}}")),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
