//! Daemon configuration, read from `TABULA_*` environment variables

use anyhow::{Context, Result};
use std::str::FromStr;
use tabula_api_rpc::RpcServerConfig;
use tabula_core::application::IngestionConfig;

const DEFAULT_DB_PATH: &str = "~/.tabula/tabula.db";

/// Log output selected by `TABULA_LOG_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    pub rpc: RpcServerConfig,
    pub ingestion: IngestionConfig,
    pub log_format: LogFormat,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rpc_defaults = RpcServerConfig::default();
        let ingestion_defaults = IngestionConfig::default();

        let db_path = lookup("TABULA_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = shellexpand::tilde(&db_path).into_owned();

        let log_format = match lookup("TABULA_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            db_path,
            rpc: RpcServerConfig {
                host: lookup("TABULA_RPC_HOST").unwrap_or(rpc_defaults.host),
                port: parse_or(&lookup, "TABULA_RPC_PORT", rpc_defaults.port)?,
            },
            ingestion: IngestionConfig {
                max_concurrent_jobs: parse_or(
                    &lookup,
                    "TABULA_MAX_CONCURRENT_JOBS",
                    ingestion_defaults.max_concurrent_jobs,
                )?,
                queue_capacity: parse_or(
                    &lookup,
                    "TABULA_QUEUE_CAPACITY",
                    ingestion_defaults.queue_capacity,
                )?,
                store_retry_attempts: parse_or(
                    &lookup,
                    "TABULA_STORE_RETRY_ATTEMPTS",
                    ingestion_defaults.store_retry_attempts,
                )?,
                store_retry_base_delay_ms: parse_or(
                    &lookup,
                    "TABULA_STORE_RETRY_BASE_DELAY_MS",
                    ingestion_defaults.store_retry_base_delay_ms,
                )?,
            },
            log_format,
        })
    }

    /// sqlx connection url for `db_path`
    pub fn database_url(&self) -> String {
        if self.db_path.starts_with("sqlite:") {
            self.db_path.clone()
        } else {
            format!("sqlite://{}", self.db_path)
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<DaemonConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.rpc.port, 9630);
        assert_eq!(config.rpc.host, "127.0.0.1");
        assert_eq!(config.ingestion, IngestionConfig::default());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.db_path.ends_with(".tabula/tabula.db"));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("TABULA_DB_PATH", "sqlite::memory:"),
            ("TABULA_RPC_PORT", "9999"),
            ("TABULA_MAX_CONCURRENT_JOBS", "8"),
            ("TABULA_LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.rpc.port, 9999);
        assert_eq!(config.ingestion.max_concurrent_jobs, 8);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_url(), "sqlite::memory:");
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = config(&[("TABULA_QUEUE_CAPACITY", "lots")]).unwrap_err();
        assert!(err.to_string().contains("TABULA_QUEUE_CAPACITY"));
    }

    #[test]
    fn test_file_path_becomes_url() {
        let config = config(&[("TABULA_DB_PATH", "/var/lib/tabula/tabula.db")]).unwrap();
        assert_eq!(config.database_url(), "sqlite:///var/lib/tabula/tabula.db");
    }
}
