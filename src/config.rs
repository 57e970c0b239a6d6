//! Runtime configuration resolved from environment variables.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `BLOOMWELL_DB` | Path of the SQLite database | `bloomwell.db` in the platform data dir |
//! | `BLOOMWELL_PORT` | Port for the HTTP API | `3000` |
//! | `BLOOMWELL_API_KEY` | Bearer token required by the API | none (auth disabled) |
//! | `BLOOMWELL_CORS_ORIGINS` | Comma-separated allowed origins | permissive |
//! | `BLOOMWELL_RATE_LIMIT` | Requests per minute per client, only with an API key | `100` |
//! | `BLOOMWELL_TRUST_PROXY` | Count clients by `X-Forwarded-For` instead of the peer address | off |

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::api::SecurityConfig;

const APP_NAME: &str = "bloomwell";
const DATABASE_FILE: &str = "bloomwell.db";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit database path. `None` means the platform default.
    pub database_path: Option<PathBuf>,
    pub port: u16,
    pub security: SecurityConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_path = lookup("BLOOMWELL_DB")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let port = match lookup("BLOOMWELL_PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid BLOOMWELL_PORT {:?}", raw);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        Self {
            database_path,
            port,
            security: SecurityConfig::from_lookup(&lookup),
        }
    }

    /// The configured database path, falling back to the platform default.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => default_database_path(),
        }
    }
}

/// `bloomwell.db` inside the platform's per-user data directory.
pub fn default_database_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join(DATABASE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config(&[]);
        assert!(config.database_path.is_none());
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.security.api_key.is_none());
        assert!(config.security.rate_limiter.is_none());
    }

    #[test]
    fn reads_database_path_and_port() {
        let config = config(&[("BLOOMWELL_DB", "/tmp/garden.db"), ("BLOOMWELL_PORT", "8088")]);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/garden.db")));
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/garden.db"));
        assert_eq!(config.port, 8088);
    }

    #[test]
    fn invalid_port_falls_back_to_default() {
        assert_eq!(config(&[("BLOOMWELL_PORT", "garden")]).port, DEFAULT_PORT);
    }

    #[test]
    fn api_key_enables_rate_limiting() {
        let config = config(&[("BLOOMWELL_API_KEY", "s3cret"), ("BLOOMWELL_RATE_LIMIT", "5")]);
        assert_eq!(config.security.api_key.as_deref(), Some("s3cret"));
        assert!(config.security.rate_limiter.is_some());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = config(&[(
            "BLOOMWELL_CORS_ORIGINS",
            "https://app.bloomwell.test, https://admin.bloomwell.test",
        )]);
        assert_eq!(
            config.security.cors_origins,
            Some(vec![
                "https://app.bloomwell.test".to_string(),
                "https://admin.bloomwell.test".to_string(),
            ])
        );
    }
}
