//! Configuration system for Ticket.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $TICKET_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/ticket/config.toml
//!   3. ~/.config/ticket/config.toml
//!
//! Everything the acceptance handler and resolver need to derive URLs and
//! hints lives here, passed in at construction time. Call sites never read
//! the environment directly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketConfig {
    pub service: ServiceConfig,
    pub accept: AcceptSettings,
    pub resolver: ResolverSettings,
    pub worker: WorkerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL used to derive status locations and artifact references.
    pub base_url: String,
    /// TCP port the HTTP API binds on 127.0.0.1.
    pub api_port: u16,
    /// Queue name accepted in the submit path.
    pub queue_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptSettings {
    /// Retry-After on the 202 acceptance when the caller gave no estimate.
    pub default_retry_after_secs: u64,
    /// Maximum serialized payload size accepted.
    pub max_payload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Retry-After on pending polls. Fixed, not adaptive.
    pub retry_after_secs: u64,
    /// First wait of the synchronous-mode backoff schedule.
    pub sync_initial_ms: u64,
    /// The schedule stops once the next doubled wait would exceed this.
    pub sync_ceiling_ms: u64,
    /// Streaming an artifact above this size logs a warning.
    pub max_stream_bytes: u64,
    /// Lifetime of a scoped artifact read reference.
    pub scoped_ref_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// How often the driver polls the queue for ready messages.
    pub poll_interval_ms: u64,
    /// Lease window for a dequeued message.
    pub visibility_timeout_ms: u64,
    /// Deliveries beyond this count are dead-lettered, not retried.
    pub max_redeliveries: u32,
    /// Max concurrent deliveries in flight. 0 = num_cpus.
    pub max_concurrent: u32,
    /// Artificial processing delay for the default echo processor. 0 = none.
    pub simulate_work_ms: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            accept: AcceptSettings::default(),
            resolver: ResolverSettings::default(),
            worker: WorkerSettings::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9410".to_string(),
            api_port: 9410,
            queue_name: "requests".to_string(),
        }
    }
}

impl Default for AcceptSettings {
    fn default() -> Self {
        Self {
            default_retry_after_secs: 5,
            max_payload_bytes: 262_144, // 256 KB
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            retry_after_secs: 2,
            sync_initial_ms: 250,
            sync_ceiling_ms: 64_000,
            max_stream_bytes: 1_048_576, // 1 MB
            scoped_ref_ttl_secs: 300,
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            visibility_timeout_ms: 30_000,
            max_redeliveries: 5,
            max_concurrent: 0,
            simulate_work_ms: 0,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("ticket")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl TicketConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            TicketConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("TICKET_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&TicketConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply TICKET_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TICKET_SERVICE__BASE_URL") {
            self.service.base_url = v;
        }
        if let Ok(v) = std::env::var("TICKET_SERVICE__API_PORT") {
            if let Ok(p) = v.parse() {
                self.service.api_port = p;
            }
        }
        if let Ok(v) = std::env::var("TICKET_SERVICE__QUEUE_NAME") {
            self.service.queue_name = v;
        }
        if let Ok(v) = std::env::var("TICKET_RESOLVER__RETRY_AFTER_SECS") {
            if let Ok(n) = v.parse() {
                self.resolver.retry_after_secs = n;
            }
        }
        if let Ok(v) = std::env::var("TICKET_WORKER__MAX_REDELIVERIES") {
            if let Ok(n) = v.parse() {
                self.worker.max_redeliveries = n;
            }
        }
        if let Ok(v) = std::env::var("TICKET_WORKER__SIMULATE_WORK_MS") {
            if let Ok(n) = v.parse() {
                self.worker.simulate_work_ms = n;
            }
        }
    }
}
