//! Engram Store - OpenSearch-compatible k-NN vector store adapter
//!
//! Persists high-dimensional embeddings with arbitrary JSON payloads in an
//! OpenSearch-compatible search engine and serves hybrid (vector +
//! structured filter + lexical) retrieval for a memory orchestrator.
//!
//! The adapter covers the full collection lifecycle: index creation with
//! the engine's k-NN mapping and readiness polling, bulk ingestion with
//! per-record routing, filtered k-NN search, and point CRUD by id.
//! Multi-tenant routing is derived from `payload["user_id"]` by
//! [`engram_core::routing_key`] and applied consistently across
//! operations.
//!
//! ```ignore
//! use engram_core::{Filter, FilterField, SearchStoreConfig};
//! use engram_store::{OpenSearchStore, VectorStore};
//!
//! # async fn example() -> engram_core::Result<()> {
//! let config = SearchStoreConfig {
//!     collection_name: "memories".to_string(),
//!     embedding_model_dims: 1536,
//!     ..Default::default()
//! };
//! let store = OpenSearchStore::connect(&config).await?;
//!
//! store.insert(vec![vec![0.1; 1536]], None, Some(vec!["m1".to_string()])).await?;
//! let hits = store
//!     .search("coffee", &vec![0.1; 1536], 5, &[Filter::equals(FilterField::UserId, "alice")])
//!     .await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use engram_core::{Filter, Payload, Result, SearchResult};

pub mod bulk;
pub mod client;
pub mod index;
mod query;
pub mod store;

pub use bulk::{InsertOutcome, InsertStatus};
pub use client::SearchClient;
pub use store::OpenSearchStore;

/// Vector store operations consumed by the memory orchestrator.
///
/// `insert` is an upsert: re-inserting an existing id overwrites that
/// record. `search` results come back best-first in the engine's ordering
/// for the collection's distance method.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Bulk-insert records from parallel sequences of vectors, payloads and
    /// ids. Missing ids default to positional indices, missing payloads to
    /// empty maps. Returns a per-id outcome list; only transport failure is
    /// an error.
    async fn insert(
        &self,
        vectors: Vec<Vec<f32>>,
        payloads: Option<Vec<Payload>>,
        ids: Option<Vec<String>>,
    ) -> Result<Vec<InsertOutcome>>;

    /// Hybrid k-NN search: nearest neighbors to `vector`, narrowed by
    /// structured `filters` and, when `query_text` is non-empty, a lexical
    /// match over the payload text.
    async fn search(
        &self,
        query_text: &str,
        vector: &[f32],
        limit: usize,
        filters: &[Filter],
    ) -> Result<Vec<SearchResult>>;

    /// Enumerate records matching `filters` without a query vector.
    async fn list(&self, filters: &[Filter], limit: Option<usize>) -> Result<Vec<SearchResult>>;

    /// Point read by id; `Ok(None)` when the id does not exist.
    async fn get(&self, id: &str) -> Result<Option<SearchResult>>;

    /// Partial update: omitted fields keep their stored values. No-op when
    /// neither vector nor payload is supplied.
    async fn update(&self, id: &str, vector: Option<Vec<f32>>, payload: Option<Payload>)
        -> Result<()>;

    /// Delete by id; a nonexistent id is a [`engram_core::EngramError::NotFound`].
    async fn delete(&self, id: &str) -> Result<()>;

    /// Drop and recreate the collection with its original dimensionality
    /// and distance method.
    async fn reset(&self) -> Result<()>;
}
