//! Configuration for proxy construction
//!
//! The proxy only consumes resolved values: which backend to build, the
//! opaque argument map handed to its factory, whether the persistent
//! adapter memoizes, and how often the maintenance loop purges.
//! Resolution itself happens here, either through the builder or from
//! the environment (`.env` files are honored).
//!
//! Backend args arrive as a JSON object, optionally base64-wrapped so
//! they survive shells and process managers that mangle quotes.

use std::env;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::backend::EPHEMERAL_BACKEND;

/// Backend identifier, e.g. `ephemeral` or an application-registered id
pub const ENV_BACKEND: &str = "STRATA_CACHE_BACKEND";

/// Backend argument map as JSON, plain or base64-wrapped
pub const ENV_BACKEND_ARGS: &str = "STRATA_CACHE_BACKEND_ARGS";

/// Enables the persistent tier's in-process memoization (default on)
pub const ENV_MEMOIZE: &str = "STRATA_CACHE_MEMOIZE";

/// Maintenance purge interval in seconds
pub const ENV_PURGE_INTERVAL: &str = "STRATA_CACHE_PURGE_INTERVAL";

const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Resolved configuration consumed by proxy construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Identifier of the persistent-tier backend
    pub backend: String,

    /// Opaque arguments handed to the backend factory
    pub backend_args: Map<String, Value>,

    /// Memoize reads/writes on the persistent adapter and front a plain
    /// durable backend with an in-process layer
    pub use_memoization: bool,

    /// How often the maintenance loop purges both tiers
    pub purge_interval: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            backend: EPHEMERAL_BACKEND.to_string(),
            backend_args: Map::new(),
            use_memoization: true,
            // Hourly purge unless configured otherwise
            purge_interval: DEFAULT_PURGE_INTERVAL,
        }
    }
}

impl ProxyConfig {
    /// Create a new builder for proxy configuration
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.backend.is_empty() {
            return Err("backend identifier must not be empty".to_string());
        }

        if self.purge_interval.is_zero() {
            return Err("purge_interval must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Resolve configuration from the environment
    ///
    /// Malformed values degrade to their defaults with a warning rather
    /// than failing construction; a cache must come up even when its
    /// tuning is broken.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let backend = env::var(ENV_BACKEND)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.backend);

        let backend_args = match env::var(ENV_BACKEND_ARGS) {
            Ok(raw) => parse_backend_args(&raw),
            Err(_) => defaults.backend_args,
        };

        let use_memoization = match env::var(ENV_MEMOIZE) {
            Ok(raw) => parse_bool(&raw, defaults.use_memoization),
            Err(_) => defaults.use_memoization,
        };

        let purge_interval = match env::var(ENV_PURGE_INTERVAL) {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(value = raw.as_str(), "Ignoring invalid purge interval");
                    defaults.purge_interval
                }
            },
            Err(_) => defaults.purge_interval,
        };

        Self {
            backend,
            backend_args,
            use_memoization,
            purge_interval,
        }
    }
}

/// Preset configurations for common setups
impl ProxyConfig {
    /// Purely in-process cache, both tiers ephemeral
    ///
    /// Memoization is off since the backend already lives in memory.
    pub fn ephemeral() -> Self {
        Self {
            backend: EPHEMERAL_BACKEND.to_string(),
            use_memoization: false,
            ..Default::default()
        }
    }

    /// Defaults pointed at a named persistent backend
    pub fn with_backend(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            ..Default::default()
        }
    }
}

/// Accepts the usual spellings of a boolean environment value
fn parse_bool(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => {
            warn!(value = other, "Ignoring invalid boolean value");
            default
        }
    }
}

/// Parse the backend argument map, unwrapping base64 when present
///
/// Detection mirrors encode-after-decode equality: only strings that
/// survive the round trip are treated as wrapped.
fn parse_backend_args(raw: &str) -> Map<String, Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Map::new();
    }

    let source = match STANDARD.decode(trimmed) {
        Ok(decoded) if STANDARD.encode(&decoded) == trimmed => {
            match String::from_utf8(decoded) {
                Ok(text) => text,
                Err(_) => {
                    warn!("Backend args decoded to non-UTF-8 data, ignoring");
                    return Map::new();
                }
            }
        }
        _ => trimmed.to_string(),
    };

    match serde_json::from_str::<Value>(&source) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            warn!("Backend args must be a JSON object, ignoring");
            Map::new()
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse backend args, ignoring");
            Map::new()
        }
    }
}

/// Builder for proxy configuration
#[derive(Debug, Default)]
pub struct ProxyConfigBuilder {
    backend: Option<String>,
    backend_args: Option<Map<String, Value>>,
    use_memoization: Option<bool>,
    purge_interval: Option<Duration>,
}

impl ProxyConfigBuilder {
    /// Set the persistent-tier backend identifier
    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Replace the whole backend argument map
    pub fn backend_args(mut self, args: Map<String, Value>) -> Self {
        self.backend_args = Some(args);
        self
    }

    /// Set a single backend argument
    pub fn arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.backend_args
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Enable or disable persistent-tier memoization
    pub fn use_memoization(mut self, enable: bool) -> Self {
        self.use_memoization = Some(enable);
        self
    }

    /// Set the maintenance purge interval
    pub fn purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = Some(interval);
        self
    }

    /// Build the proxy configuration
    pub fn build(self) -> ProxyConfig {
        let defaults = ProxyConfig::default();

        ProxyConfig {
            backend: self.backend.unwrap_or(defaults.backend),
            backend_args: self.backend_args.unwrap_or(defaults.backend_args),
            use_memoization: self.use_memoization.unwrap_or(defaults.use_memoization),
            purge_interval: self.purge_interval.unwrap_or(defaults.purge_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.backend, "ephemeral");
        assert!(config.backend_args.is_empty());
        assert!(config.use_memoization);
        assert_eq!(config.purge_interval, Duration::from_secs(3600));
    }

    #[test]
    fn test_config_validation() {
        let valid_config = ProxyConfig::default();
        assert!(valid_config.validate().is_ok());

        let mut invalid_config = ProxyConfig::default();
        invalid_config.backend = String::new();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = ProxyConfig::default();
        invalid_config.purge_interval = Duration::ZERO;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ProxyConfig::builder()
            .backend("filesystem")
            .arg("path", json!("/tmp/cache"))
            .arg("depth", json!(2))
            .use_memoization(false)
            .purge_interval(Duration::from_secs(600))
            .build();

        assert_eq!(config.backend, "filesystem");
        assert_eq!(config.backend_args["path"], json!("/tmp/cache"));
        assert_eq!(config.backend_args["depth"], json!(2));
        assert!(!config.use_memoization);
        assert_eq!(config.purge_interval, Duration::from_secs(600));
    }

    #[test]
    fn test_preset_configs() {
        let ephemeral = ProxyConfig::ephemeral();
        assert_eq!(ephemeral.backend, "ephemeral");
        assert!(!ephemeral.use_memoization);

        let named = ProxyConfig::with_backend("filesystem");
        assert_eq!(named.backend, "filesystem");
        assert!(named.use_memoization);
    }

    #[test]
    fn test_parse_backend_args_plain_json() {
        let args = parse_backend_args(r#"{"path": "/tmp/cache", "depth": 2}"#);
        assert_eq!(args["path"], json!("/tmp/cache"));
        assert_eq!(args["depth"], json!(2));
    }

    #[test]
    fn test_parse_backend_args_base64_wrapped() {
        let wrapped = STANDARD.encode(r#"{"path": "/tmp/cache"}"#);
        let args = parse_backend_args(&wrapped);
        assert_eq!(args["path"], json!("/tmp/cache"));
    }

    #[test]
    fn test_parse_backend_args_degrades_to_empty() {
        assert!(parse_backend_args("").is_empty());
        assert!(parse_backend_args("not json at all").is_empty());
        assert!(parse_backend_args("[1, 2, 3]").is_empty());
    }

    #[test]
    fn test_parse_bool_spellings() {
        assert!(parse_bool("1", false));
        assert!(parse_bool("TRUE", false));
        assert!(parse_bool("yes", false));
        assert!(!parse_bool("0", true));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("maybe", true));
        assert!(!parse_bool("maybe", false));
    }

    #[test]
    fn test_from_env_round_trip() {
        env::set_var(ENV_BACKEND, "filesystem");
        env::set_var(ENV_BACKEND_ARGS, r#"{"path": "/tmp/strata"}"#);
        env::set_var(ENV_MEMOIZE, "off");
        env::set_var(ENV_PURGE_INTERVAL, "120");

        let config = ProxyConfig::from_env();
        assert_eq!(config.backend, "filesystem");
        assert_eq!(config.backend_args["path"], json!("/tmp/strata"));
        assert!(!config.use_memoization);
        assert_eq!(config.purge_interval, Duration::from_secs(120));

        env::remove_var(ENV_BACKEND);
        env::remove_var(ENV_BACKEND_ARGS);
        env::remove_var(ENV_MEMOIZE);
        env::remove_var(ENV_PURGE_INTERVAL);
    }
}
