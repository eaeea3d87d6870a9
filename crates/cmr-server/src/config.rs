use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use cmr_store::SyncMode;
use cmr_types::{Validator, DEFAULT_MAX_COMPONENT_SUPPLY};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};
use crate::retry::RetryPolicy;
use crate::service::RegisterPolicy;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Store connection string, e.g. `memory://` or `file:///var/lib/cmr/records.jsonl`.
    pub store_uri: String,
    /// `fsync` every appended record.
    pub sync_writes: bool,
    pub max_component_supply: u32,
    /// Enables `/all-cars` and `/delete-all`. Never set in production.
    pub debug_endpoints: bool,
    pub admin_token: Option<String>,
    /// Reject registering a tuple that already has a record.
    pub unique_tuples: bool,
    pub retry: RetryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            store_uri: "memory://".into(),
            sync_writes: false,
            max_component_supply: DEFAULT_MAX_COMPONENT_SUPPLY,
            debug_endpoints: false,
            admin_token: None,
            unique_tuples: false,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 50,
            max_delay_ms: 1000,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(c: &RetryConfig) -> Self {
        Self {
            max_attempts: c.max_attempts.max(1),
            base_delay: Duration::from_millis(c.base_delay_ms),
            max_delay: Duration::from_millis(c.max_delay_ms),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> ServerResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ServerError::Config(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> ServerResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ServerError::Config(format!("{key}: {e}")))
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Defaults, then the optional TOML file, then process environment.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        base.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `DB_URI`, `BIND_ADDR`, `PORT`,
    /// `MAX_COMPONENT_SUPPLY`, `ADMIN_TOKEN`, `DEBUG_ENDPOINTS`,
    /// `UNIQUE_TUPLES` and `SYNC_WRITES`.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        if let Some(v) = lookup("DB_URI") {
            self.store_uri = v;
        }
        if let Some(v) = lookup("BIND_ADDR") {
            self.bind_addr = parse_num("BIND_ADDR", &v)?;
        }
        if let Some(v) = lookup("PORT") {
            self.bind_addr.set_port(parse_num("PORT", &v)?);
        }
        if let Some(v) = lookup("MAX_COMPONENT_SUPPLY") {
            self.max_component_supply = parse_num("MAX_COMPONENT_SUPPLY", &v)?;
        }
        if let Some(v) = lookup("ADMIN_TOKEN") {
            self.admin_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Some(v) = lookup("DEBUG_ENDPOINTS") {
            self.debug_endpoints = parse_bool("DEBUG_ENDPOINTS", &v)?;
        }
        if let Some(v) = lookup("UNIQUE_TUPLES") {
            self.unique_tuples = parse_bool("UNIQUE_TUPLES", &v)?;
        }
        if let Some(v) = lookup("SYNC_WRITES") {
            self.sync_writes = parse_bool("SYNC_WRITES", &v)?;
        }
        Ok(self)
    }

    pub fn validator(&self) -> Validator {
        Validator::new(self.max_component_supply)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }

    pub fn register_policy(&self) -> RegisterPolicy {
        if self.unique_tuples {
            RegisterPolicy::RejectDuplicates
        } else {
            RegisterPolicy::AllowDuplicates
        }
    }

    pub fn sync_mode(&self) -> SyncMode {
        if self.sync_writes {
            SyncMode::EveryWrite
        } else {
            SyncMode::OsDefault
        }
    }
}
