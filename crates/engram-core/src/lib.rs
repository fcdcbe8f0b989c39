//! Engram Core - Domain models, errors, and configuration
//!
//! This crate defines the core abstractions used throughout the engram
//! vector store:
//! - Error taxonomy for store operations
//! - Search results and distance methods
//! - Structured filters with an explicit allow-list of filterable fields
//! - Multi-tenant routing-key derivation
//! - Configuration management

pub mod config;

pub use config::SearchStoreConfig;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for engram operations
#[derive(Error, Debug)]
pub enum EngramError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Index creation failed: {0}")]
    IndexCreation(String),

    #[error("Index {index} not ready after {waited_secs} seconds")]
    IndexCreationTimeout { index: String, waited_secs: f64 },

    #[error("Bulk write failed: {0}")]
    BulkWrite(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngramError>;

// ============================================================================
// Data Model
// ============================================================================

/// JSON metadata stored alongside each vector.
///
/// The keys `user_id`, `run_id` and `agent_id` are reserved: they carry
/// routing and filtering semantics (see [`routing_key`] and [`FilterField`]).
pub type Payload = Map<String, Value>;

/// A single record returned from search, list, or point reads.
///
/// The stored vector field is never part of `payload`; it is excluded at the
/// storage layer to keep response sizes down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Record id, unique within a collection
    pub id: String,

    /// Relevance score; semantics depend on the collection's distance
    /// method, but higher-scored results are always returned first
    pub score: f32,

    /// The record's metadata, vector field stripped
    pub payload: Payload,
}

/// Distance method for a collection's k-NN field.
///
/// Fixed at collection creation and immutable thereafter; changing it
/// requires deleting and recreating the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMethod {
    #[default]
    CosineSimil,
    L2,
    InnerProduct,
}

impl DistanceMethod {
    /// Wire name of the method, as the engine's `space_type` expects it.
    pub fn space_type(&self) -> &'static str {
        match self {
            Self::CosineSimil => "cosinesimil",
            Self::L2 => "l2",
            Self::InnerProduct => "innerproduct",
        }
    }

    /// Lenient parse: unrecognized names fall back to `CosineSimil`.
    pub fn parse_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "l2" => Self::L2,
            "innerproduct" => Self::InnerProduct,
            _ => Self::CosineSimil,
        }
    }
}

impl std::fmt::Display for DistanceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.space_type())
    }
}

// ============================================================================
// Routing
// ============================================================================

/// Partition used when a record carries no `user_id`.
pub const FALLBACK_PARTITION: &str = "general";

/// Derive the routing key for a record from its payload.
///
/// This is part of the adapter's contract: insert, search, update and delete
/// all route through this one function, so the same record always lands on
/// (and is looked up from) the same shard. `payload["user_id"]` when present
/// and a string, otherwise [`FALLBACK_PARTITION`].
pub fn routing_key(payload: &Payload) -> &str {
    payload
        .get("user_id")
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_PARTITION)
}

/// Query-side counterpart of [`routing_key`]: the first `user_id` equality
/// filter's value, otherwise [`FALLBACK_PARTITION`].
///
/// A search whose target records were inserted under a different routing key
/// will silently return fewer or no matches, because routing restricts which
/// shard is queried.
pub fn routing_for_filters(filters: &[Filter]) -> &str {
    filters
        .iter()
        .find_map(|f| match f {
            Filter::Equals {
                field: FilterField::UserId,
                value,
            } => Some(value.as_str()),
            _ => None,
        })
        .unwrap_or(FALLBACK_PARTITION)
}

// ============================================================================
// Filters
// ============================================================================

/// Allow-list of payload fields that structured filters may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    UserId,
    RunId,
    AgentId,
}

impl FilterField {
    /// Payload key the field lives under.
    pub fn payload_key(&self) -> &'static str {
        match self {
            Self::UserId => "user_id",
            Self::RunId => "run_id",
            Self::AgentId => "agent_id",
        }
    }

    /// Keyword sub-field path used in term/terms queries.
    pub fn keyword_path(&self) -> &'static str {
        match self {
            Self::UserId => "payload.user_id.keyword",
            Self::RunId => "payload.run_id.keyword",
            Self::AgentId => "payload.agent_id.keyword",
        }
    }
}

/// A structured filter clause over a record's payload.
///
/// Scalar values map to exact match, sequences to set membership; multiple
/// filters are combined with logical AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Equals { field: FilterField, value: String },
    In { field: FilterField, values: Vec<String> },
}

impl Filter {
    /// Exact-match filter on a single value.
    pub fn equals(field: FilterField, value: impl Into<String>) -> Self {
        Self::Equals {
            field,
            value: value.into(),
        }
    }

    /// Set-membership filter over a list of values.
    pub fn one_of(field: FilterField, values: Vec<String>) -> Self {
        Self::In { field, values }
    }
}

// ============================================================================
// Tests
// ============================================================================
