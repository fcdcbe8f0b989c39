//! Engram configuration management
//!
//! Handles connection and collection parameters from environment variables,
//! config files, or programmatic construction, with sensible defaults for
//! development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{DistanceMethod, EngramError, Result};

/// Connection and collection parameters for the vector store.
///
/// All parameters are supplied at construction; there is no runtime
/// reconfiguration. Validation happens in [`SearchStoreConfig::validate`],
/// which every store constructor calls before opening a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchStoreConfig {
    /// Search engine host
    pub host: String,

    /// Search engine port
    pub port: u16,

    /// Basic-auth username
    pub user: Option<String>,

    /// Basic-auth password
    pub password: Option<String>,

    /// Use HTTPS for the connection
    pub use_ssl: bool,

    /// Verify TLS certificates (disable only for development clusters)
    pub verify_certs: bool,

    /// Name of the collection (backing index)
    pub collection_name: String,

    /// Vector dimensionality; must match the embedding model
    pub embedding_model_dims: usize,

    /// Distance method for the k-NN field
    pub distance_method: DistanceMethod,

    /// Per-request transport timeout in seconds
    pub request_timeout_secs: u64,

    /// Idle connections kept pooled per host
    pub pool_max_idle_per_host: usize,
}

impl Default for SearchStoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9200,
            user: None,
            password: None,
            use_ssl: false,
            verify_certs: true,
            collection_name: "engram".to_string(),
            embedding_model_dims: 1536, // OpenAI text-embedding-3-small
            distance_method: DistanceMethod::CosineSimil,
            request_timeout_secs: 30,
            pool_max_idle_per_host: 20,
        }
    }
}

impl SearchStoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("ENGRAM_SEARCH_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("ENGRAM_SEARCH_PORT") {
            config.port = port.parse().map_err(|_| {
                EngramError::Configuration(format!("Invalid ENGRAM_SEARCH_PORT: {port}"))
            })?;
        }
        if let Ok(user) = std::env::var("ENGRAM_SEARCH_USER") {
            config.user = Some(user);
        }
        if let Ok(password) = std::env::var("ENGRAM_SEARCH_PASSWORD") {
            config.password = Some(password);
        }
        if let Ok(ssl) = std::env::var("ENGRAM_SEARCH_SSL") {
            config.use_ssl = parse_bool("ENGRAM_SEARCH_SSL", &ssl)?;
        }
        if let Ok(verify) = std::env::var("ENGRAM_SEARCH_VERIFY_CERTS") {
            config.verify_certs = parse_bool("ENGRAM_SEARCH_VERIFY_CERTS", &verify)?;
        }
        if let Ok(name) = std::env::var("ENGRAM_COLLECTION") {
            config.collection_name = name;
        }
        if let Ok(dims) = std::env::var("ENGRAM_EMBEDDING_DIMS") {
            config.embedding_model_dims = dims.parse().map_err(|_| {
                EngramError::Configuration(format!("Invalid ENGRAM_EMBEDDING_DIMS: {dims}"))
            })?;
        }
        if let Ok(method) = std::env::var("ENGRAM_DISTANCE_METHOD") {
            config.distance_method = DistanceMethod::parse_or_default(&method);
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            EngramError::Configuration(format!("Failed to read {}: {e}", path.display()))
        })?;

        toml::from_str(&content).map_err(|e| {
            EngramError::Configuration(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Check required parameters. Pure validation, no retries or probing.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(EngramError::Configuration("host must not be empty".to_string()));
        }
        if self.collection_name.trim().is_empty() {
            return Err(EngramError::Configuration(
                "collection_name must not be empty".to_string(),
            ));
        }
        if self.embedding_model_dims == 0 {
            return Err(EngramError::Configuration(
                "embedding_model_dims must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the engine's REST endpoint.
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(EngramError::Configuration(format!(
            "Invalid value for {key}: {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SearchStoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 9200);
        assert_eq!(config.embedding_model_dims, 1536);
        assert_eq!(config.pool_max_idle_per_host, 20);
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let config = SearchStoreConfig {
            host: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngramError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_collection() {
        let config = SearchStoreConfig {
            collection_name: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_dims() {
        let config = SearchStoreConfig {
            embedding_model_dims: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url() {
        let config = SearchStoreConfig::default();
        assert_eq!(config.base_url(), "http://localhost:9200");

        let config = SearchStoreConfig {
            host: "search.internal".to_string(),
            port: 30070,
            use_ssl: true,
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://search.internal:30070");
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(!parse_bool("X", "no").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }
}
