//! Configuration management for toolgate

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::router::{KeywordRoute, RouteTable};

/// Default config directory (~/.config/toolgate)
fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("toolgate")
}

/// Get the default configuration file path
pub fn get_config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Retry a keyword-routed call without arguments when they do not fit
    #[serde(default = "default_fallback_on_mismatch")]
    pub fallback_on_mismatch: bool,

    /// Row cap appended to SQL statements without a LIMIT clause
    #[serde(default = "default_sql_max_limit")]
    pub sql_max_limit: u64,

    /// Disk usage percentage at which the disk check warns
    #[serde(default = "default_disk_warning_percent")]
    pub disk_warning_percent: f64,

    /// Connection string for the postgres tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgres_url: Option<String>,

    /// Extra keyword routes, layered over the builtin table
    #[serde(default)]
    pub routes: Vec<KeywordRoute>,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_fallback_on_mismatch() -> bool {
    true
}

fn default_sql_max_limit() -> u64 {
    1000
}

fn default_disk_warning_percent() -> f64 {
    80.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            fallback_on_mismatch: default_fallback_on_mismatch(),
            sql_max_limit: default_sql_max_limit(),
            disk_warning_percent: default_disk_warning_percent(),
            postgres_url: None,
            routes: Vec::new(),
        }
    }
}

impl Config {
    /// Load config from file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Load from `path` (or the default location), then apply environment
    /// overrides (`TOOLGATE_BIND`, `TOOLGATE_POSTGRES_URL`)
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
        let mut config = Self::load(&path)?;

        if let Ok(bind) = std::env::var("TOOLGATE_BIND") {
            config.bind = bind;
        }
        if let Ok(url) = std::env::var("TOOLGATE_POSTGRES_URL") {
            config.postgres_url = Some(url);
        }

        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Builtin routes plus the configured ones
    pub fn route_table(&self) -> RouteTable {
        RouteTable::with_overrides(self.routes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::ArgumentShape;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind, "127.0.0.1:8000");
        assert!(config.fallback_on_mismatch);
        assert_eq!(config.sql_max_limit, 1000);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "fallback_on_mismatch": false,
                "routes": [
                    {"keyword": "pg", "tool": "postgres_query",
                     "shape": "remainder", "param": "sql"}
                ]
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.fallback_on_mismatch);
        assert_eq!(config.bind, "127.0.0.1:8000");

        let table = config.route_table();
        assert_eq!(
            table.lookup("pg").unwrap().shape,
            ArgumentShape::Remainder { param: "sql".to_string() }
        );
        assert!(table.lookup("psql").is_some());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            sql_max_limit: 50,
            postgres_url: Some("postgres://localhost/app".to_string()),
            ..Config::default()
        };
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_config_path() {
        assert!(get_config_path().ends_with("toolgate/config.json"));
    }
}
