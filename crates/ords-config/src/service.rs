use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typed view of the merged config. Unknown keys are rejected so a typo in an
/// overlay fails the boot instead of being silently ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub postgres: PostgresConfig,
    pub kafka: KafkaConfig,
    pub http_server: HttpServerConfig,
    pub cache: CacheConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostgresConfig {
    /// NAME of the env var holding the connection URL (never the URL itself).
    pub url_env: String,
    pub max_connections: u32,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url_env: "ORDS_DATABASE_URL".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KafkaConfig {
    /// Comma-separated bootstrap servers.
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    /// "earliest" | "latest"
    pub auto_offset_reset: String,
    pub session_timeout_ms: u32,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topic: "orders".to_string(),
            group_id: "order-service".to_string(),
            auto_offset_reset: "earliest".to_string(),
            session_timeout_ms: 6000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpServerConfig {
    pub address: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8081".to_string(),
            timeout_secs: 4,
        }
    }
}

impl HttpServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.address
            .parse()
            .with_context(|| format!("http_server.address is not a socket address: {}", self.address))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of orders held in memory.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Pause after a transient receive error before reading again.
    pub recv_error_pause_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recv_error_pause_ms: 1000,
        }
    }
}

impl IngestConfig {
    pub fn recv_error_pause(&self) -> Duration {
        Duration::from_millis(self.recv_error_pause_ms)
    }
}

impl ServiceConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: ServiceConfig =
            serde_json::from_value(config_json.clone()).context("config does not match schema")?;
        cfg.check()?;
        Ok(cfg)
    }

    fn check(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            bail!("CONFIG_INVALID cache.capacity must be >= 1");
        }
        if self.postgres.url_env.trim().is_empty() {
            bail!("CONFIG_INVALID postgres.url_env must name an env var");
        }
        if self.kafka.brokers.trim().is_empty() || self.kafka.topic.trim().is_empty() {
            bail!("CONFIG_INVALID kafka.brokers and kafka.topic are required");
        }
        if self.kafka.group_id.trim().is_empty() {
            bail!("CONFIG_INVALID kafka.group_id is required (offsets are committed per group)");
        }
        match self.kafka.auto_offset_reset.as_str() {
            "earliest" | "latest" => {}
            other => bail!(
                "CONFIG_INVALID kafka.auto_offset_reset '{}'; expected earliest | latest",
                other
            ),
        }
        self.http_server.socket_addr()?;
        Ok(())
    }
}
