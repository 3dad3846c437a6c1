use crate::error::StileError;
use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub access_log: AccessLogConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Identity of the instrumented service, stamped on every record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Free-form instance id. Empty means "not configured".
    #[serde(default)]
    pub id: String,
}

/// Kafka producer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// When false, no producer is created and publishing is a no-op.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_brokers")]
    pub brokers: Vec<String>,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_acks")]
    pub required_acks: RequiredAcks,
    #[serde(default = "default_compression")]
    pub compression: Compression,
    /// Batched flush: whichever of the interval or the message count is hit first.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_flush_messages")]
    pub flush_messages: usize,
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,
    /// Records whose request path starts with this prefix never reach the broker.
    #[serde(default = "default_public_storage_prefix")]
    pub public_storage_prefix: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequiredAcks {
    None,
    Leader,
    All,
}

impl RequiredAcks {
    pub fn as_kafka_str(&self) -> &'static str {
        match self {
            RequiredAcks::None => "0",
            RequiredAcks::Leader => "1",
            RequiredAcks::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl Compression {
    pub fn as_kafka_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Snappy => "snappy",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Concurrent publish slots. Submissions beyond this are dropped.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Upper bound on draining in-flight publishes at shutdown.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

/// Interceptor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogConfig {
    /// Echo every record synchronously at debug level.
    #[serde(default)]
    pub debug: bool,
    /// Paths starting with this prefix are not instrumented. Empty disables.
    #[serde(default)]
    pub ignore_prefix: String,
    /// Accepted for compatibility; not consulted by the interceptor.
    #[serde(default)]
    pub ignore_content_types: Vec<String>,
    /// Request bodies are replaced by a placeholder when any of these headers is present.
    #[serde(default)]
    pub hide_body_headers: Vec<String>,
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,
    /// Cookies holding the session id, first non-empty wins.
    #[serde(default = "default_session_cookies")]
    pub session_cookies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_addr() -> String { "0.0.0.0:8080".into() }
fn default_brokers() -> Vec<String> { vec!["localhost:9092".into()] }
fn default_topic() -> String { "http-access".into() }
fn default_acks() -> RequiredAcks { RequiredAcks::Leader }
fn default_compression() -> Compression { Compression::Snappy }
fn default_flush_interval_ms() -> u64 { 3000 }
fn default_flush_messages() -> usize { 1000 }
fn default_message_timeout_ms() -> u64 { 30_000 }
fn default_public_storage_prefix() -> String { "/dfs/public".into() }
fn default_capacity() -> usize { 60 }
fn default_shutdown_timeout_ms() -> u64 { 5000 }
fn default_request_id_header() -> String { "trace.id".into() }
fn default_session_cookies() -> Vec<String> { vec!["SESSIONID".into(), "com.zto.sessionId".into()] }
fn default_metrics_path() -> String { "/metrics".into() }

// ── Impls ─────────────────────────────────────────────────────

impl Default for StileConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            broker: BrokerConfig::default(),
            dispatcher: DispatcherConfig::default(),
            access_log: AccessLogConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            id: String::new(),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            brokers: default_brokers(),
            topic: default_topic(),
            required_acks: default_acks(),
            compression: default_compression(),
            flush_interval_ms: default_flush_interval_ms(),
            flush_messages: default_flush_messages(),
            message_timeout_ms: default_message_timeout_ms(),
            public_storage_prefix: default_public_storage_prefix(),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            ignore_prefix: String::new(),
            ignore_content_types: Vec::new(),
            hide_body_headers: Vec::new(),
            request_id_header: default_request_id_header(),
            session_cookies: default_session_cookies(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_metrics_path(),
        }
    }
}

impl ServerConfig {
    /// Port component of `addr`, as recorded on access records. Empty when
    /// the address has no `:port` suffix.
    pub fn port(&self) -> String {
        match self.addr.rsplit_once(':') {
            Some((_, port)) => port.to_string(),
            None => String::new(),
        }
    }
}

impl StileConfig {
    /// Load configuration from YAML file + env overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: StileConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("STILE_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), StileError> {
        if self.dispatcher.capacity == 0 {
            return Err(StileError::Config("dispatcher.capacity must be > 0".into()));
        }
        if self.dispatcher.capacity > u32::MAX as usize {
            return Err(StileError::Config(format!(
                "dispatcher.capacity must be <= {}",
                u32::MAX
            )));
        }
        if self.broker.enabled {
            if self.broker.brokers.is_empty() {
                return Err(StileError::Config(
                    "broker.brokers must list at least one address".into(),
                ));
            }
            if self.broker.topic.trim().is_empty() {
                return Err(StileError::Config("broker.topic must not be empty".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // ── Default values ────────────────────────────────────────────

    #[test]
    fn default_broker_config_matches_producer_policy() {
        let cfg = BrokerConfig::default();
        assert!(!cfg.enabled);
        assert_eq!(cfg.required_acks, RequiredAcks::Leader);
        assert_eq!(cfg.compression, Compression::Snappy);
        assert_eq!(cfg.flush_interval_ms, 3000);
        assert_eq!(cfg.flush_messages, 1000);
        assert_eq!(cfg.public_storage_prefix, "/dfs/public");
    }

    #[test]
    fn default_dispatcher_has_sixty_slots() {
        let cfg = DispatcherConfig::default();
        assert_eq!(cfg.capacity, 60);
        assert_eq!(cfg.shutdown_timeout_ms, 5000);
    }

    #[test]
    fn default_access_log_config() {
        let cfg = AccessLogConfig::default();
        assert!(!cfg.debug);
        assert!(cfg.ignore_prefix.is_empty());
        assert!(cfg.ignore_content_types.is_empty());
        assert_eq!(cfg.request_id_header, "trace.id");
        assert_eq!(cfg.session_cookies, ["SESSIONID", "com.zto.sessionId"]);
    }

    #[test]
    fn default_metrics_disabled() {
        let cfg = MetricsConfig::default();
        assert!(!cfg.enabled);
        assert_eq!(cfg.path, "/metrics");
    }

    #[test]
    fn server_port_is_taken_from_addr() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port(), "8080");
        let cfg = ServerConfig { addr: "localhost".into(), id: String::new() };
        assert_eq!(cfg.port(), "");
    }

    // ── Kafka string mapping ──────────────────────────────────────

    #[test]
    fn acks_map_to_kafka_values() {
        assert_eq!(RequiredAcks::None.as_kafka_str(), "0");
        assert_eq!(RequiredAcks::Leader.as_kafka_str(), "1");
        assert_eq!(RequiredAcks::All.as_kafka_str(), "all");
    }

    #[test]
    fn compression_serializes_lowercase() {
        let json = serde_json::to_string(&Compression::Snappy).unwrap();
        assert_eq!(json, "\"snappy\"");
        assert_eq!(Compression::Zstd.as_kafka_str(), "zstd");
    }

    // ── validate() ────────────────────────────────────────────────

    #[test]
    fn validate_rejects_zero_capacity() {
        let mut cfg = StileConfig::default();
        cfg.dispatcher.capacity = 0;
        assert!(matches!(cfg.validate(), Err(StileError::Config(_))));
    }

    #[test]
    fn validate_rejects_capacity_beyond_semaphore_range() {
        let mut cfg = StileConfig::default();
        cfg.dispatcher.capacity = u32::MAX as usize + 1;
        assert!(matches!(cfg.validate(), Err(StileError::Config(_))));

        cfg.dispatcher.capacity = 1024;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_enabled_broker_without_topic() {
        let mut cfg = StileConfig::default();
        cfg.broker.enabled = true;
        cfg.broker.topic = "  ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_ignores_disabled_broker_settings() {
        let mut cfg = StileConfig::default();
        cfg.broker.brokers.clear();
        assert!(cfg.validate().is_ok());
    }

    // ── StileConfig::load() ───────────────────────────────────────

    #[test]
    fn load_from_valid_yaml_overrides_defaults() {
        let yaml = r#"
server:
  addr: "0.0.0.0:9000"
  id: "orders-1"
broker:
  enabled: true
  brokers: ["kafka-1:9092", "kafka-2:9092"]
  topic: "access"
dispatcher:
  capacity: 8
access_log:
  debug: true
  ignore_prefix: "/health"
  session_cookies: ["sid"]
"#;
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "{yaml}").unwrap();
        let cfg = StileConfig::load(tmpfile.path()).unwrap();
        assert_eq!(cfg.server.port(), "9000");
        assert_eq!(cfg.server.id, "orders-1");
        assert!(cfg.broker.enabled);
        assert_eq!(cfg.broker.brokers.len(), 2);
        assert_eq!(cfg.broker.topic, "access");
        // Unspecified broker fields keep their defaults
        assert_eq!(cfg.broker.flush_messages, 1000);
        assert_eq!(cfg.dispatcher.capacity, 8);
        assert!(cfg.access_log.debug);
        assert_eq!(cfg.access_log.ignore_prefix, "/health");
        assert_eq!(cfg.access_log.session_cookies, ["sid"]);
    }

    #[test]
    fn load_rejects_invalid_capacity() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "dispatcher:\n  capacity: 0\n").unwrap();
        assert!(StileConfig::load(tmpfile.path()).is_err());
    }
}
