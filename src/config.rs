//! Environment configuration
//!
//! Reads config from env vars (a `.env` file is honoured when present):
//!   GB_CHAIN_ID               - ledger chain id (required)
//!   GB_RPC_URL                - JSON-RPC endpoint (required)
//!   GB_WS_URL                 - subscription endpoint (required)
//!   GB_PRIVATE_KEY            - account key, 64 hex digits (required)
//!   STUDIO_DATABASE_URL       - collection store (default: sqlite:data/app.db)
//!   STUDIO_DATABASE_POOL_SIZE - store pool size (default: 5)
//!   STUDIO_BIND_ADDR          - listen address (default: 0.0.0.0:3000)
//!   STUDIO_RPC_TIMEOUT_SECS   - ledger request timeout (default: 30)

use std::fmt;
use std::time::Duration;

use sha2::{Digest, Sha256};
use url::Url;

use crate::database::DatabaseConfig;
use crate::error::ConfigError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/app.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Account key material. Never printed; `Debug` shows a fingerprint only.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    /// Parse 32 bytes of hex, with or without a `0x` prefix
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|e| ConfigError::Invalid {
            name: "GB_PRIVATE_KEY",
            reason: e.to_string(),
        })?;
        if bytes.len() != 32 {
            return Err(ConfigError::Invalid {
                name: "GB_PRIVATE_KEY",
                reason: format!("expected 32 bytes, got {}", bytes.len()),
            });
        }
        Ok(Self(bytes))
    }

    /// Short SHA-256 fingerprint, safe to log
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.0);
        hex::encode(&digest[..6])
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(fp:{})", self.fingerprint())
    }
}

/// Everything needed to reach the remote ledger
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub chain_id: u64,
    pub rpc_url: Url,
    pub ws_url: Url,
    pub private_key: PrivateKey,
    pub request_timeout: Duration,
}

impl LedgerConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let chain_id = required(lookup, "GB_CHAIN_ID")?;
        let chain_id = chain_id
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::Invalid {
                name: "GB_CHAIN_ID",
                reason: e.to_string(),
            })?;

        let rpc_url = parse_url(
            "GB_RPC_URL",
            &required(lookup, "GB_RPC_URL")?,
            &["http", "https"],
        )?;
        let ws_url = parse_url("GB_WS_URL", &required(lookup, "GB_WS_URL")?, &["ws", "wss"])?;
        let private_key = PrivateKey::parse(&required(lookup, "GB_PRIVATE_KEY")?)?;

        let timeout_secs = optional_number(lookup, "STUDIO_RPC_TIMEOUT_SECS", 30)?;

        Ok(Self {
            chain_id,
            rpc_url,
            ws_url,
            private_key,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Full process configuration
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub ledger: LedgerConfig,
    pub database: DatabaseConfig,
    pub bind_addr: String,
}

impl StudioConfig {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ledger = LedgerConfig::from_lookup(&lookup)?;
        let database = database_from_lookup(&lookup)?;
        let bind_addr = lookup("STUDIO_BIND_ADDR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Ok(Self {
            ledger,
            database,
            bind_addr,
        })
    }
}

/// Store settings alone; the seed tool's `--collections-only` mode needs no ledger
pub fn database_from_lookup<F>(lookup: &F) -> Result<DatabaseConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let database_url = lookup("STUDIO_DATABASE_URL")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
    let pool_size = optional_number(lookup, "STUDIO_DATABASE_POOL_SIZE", 5)?;
    let max_connections = u32::try_from(pool_size).map_err(|e| ConfigError::Invalid {
        name: "STUDIO_DATABASE_POOL_SIZE",
        reason: e.to_string(),
    })?;

    Ok(DatabaseConfig {
        database_url,
        max_connections,
        ..DatabaseConfig::default()
    })
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional_number<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) if !v.trim().is_empty() => {
            v.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

fn parse_url(name: &'static str, raw: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn complete() -> HashMap<String, String> {
        env(&[
            ("GB_CHAIN_ID", "60138453025"),
            ("GB_RPC_URL", "https://kaolin.holesky.golemdb.io/rpc"),
            ("GB_WS_URL", "wss://kaolin.holesky.golemdb.io/rpc/ws"),
            ("GB_PRIVATE_KEY", KEY),
        ])
    }

    #[test]
    fn loads_complete_environment_with_defaults() {
        let vars = complete();
        let config = StudioConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.ledger.chain_id, 60138453025);
        assert_eq!(config.ledger.ws_url.scheme(), "wss");
        assert_eq!(config.database.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.ledger.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn every_ledger_variable_is_required() {
        for name in ["GB_CHAIN_ID", "GB_RPC_URL", "GB_WS_URL", "GB_PRIVATE_KEY"] {
            let mut vars = complete();
            vars.remove(name);
            let err = StudioConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
            assert_eq!(err, ConfigError::Missing(name));
        }
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut vars = complete();
        vars.insert("GB_RPC_URL".into(), "  ".into());
        let err = StudioConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::Missing("GB_RPC_URL"));
    }

    #[test]
    fn rejects_wrong_url_scheme() {
        let mut vars = complete();
        vars.insert("GB_WS_URL".into(), "https://example.org".into());
        let err = StudioConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "GB_WS_URL", .. }));
    }

    #[test]
    fn pool_size_must_fit_u32() {
        let too_big = env(&[("STUDIO_DATABASE_POOL_SIZE", "4294967296")]);
        let err = database_from_lookup(&|k: &str| too_big.get(k).cloned()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "STUDIO_DATABASE_POOL_SIZE",
                ..
            }
        ));

        let max = env(&[("STUDIO_DATABASE_POOL_SIZE", "4294967295")]);
        let config = database_from_lookup(&|k: &str| max.get(k).cloned()).unwrap();
        assert_eq!(config.max_connections, u32::MAX);
    }

    #[test]
    fn private_key_accepts_prefix_and_rejects_short_keys() {
        assert!(PrivateKey::parse(&format!("0x{KEY}")).is_ok());
        assert!(PrivateKey::parse("abcd").is_err());
        assert!(PrivateKey::parse("zz").is_err());
    }

    #[test]
    fn private_key_debug_hides_material() {
        let key = PrivateKey::parse(KEY).unwrap();
        let shown = format!("{:?}", key);
        assert!(!shown.contains(KEY));
        assert_eq!(key.fingerprint().len(), 12);
    }
}
