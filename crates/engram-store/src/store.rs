//! OpenSearch-backed vector store
//!
//! Implements [`VectorStore`](crate::VectorStore) over the engine's REST
//! API: bulk ingestion, hybrid k-NN search, point CRUD with multi-tenant
//! routing, and collection administration.

use async_trait::async_trait;
use engram_core::{
    routing_for_filters, DistanceMethod, EngramError, Filter, Payload, Result, SearchResult,
    SearchStoreConfig,
};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{info, warn};

use crate::bulk::{self, InsertOutcome};
use crate::client::{
    error_reason, extract_payload, BulkResponse, GetDocResponse, SearchClient, SearchResponse,
};
use crate::query;
use crate::{index, VectorStore};

/// Vector store backed by an OpenSearch-compatible k-NN index.
///
/// Holds only the transport handle and the collection parameters, all set
/// once at construction; concurrent calls share the underlying connection
/// pool and no in-process state.
#[derive(Debug)]
pub struct OpenSearchStore {
    client: SearchClient,
    collection_name: String,
    embedding_model_dims: usize,
    distance_method: DistanceMethod,
}

impl OpenSearchStore {
    /// Validate the configuration, build the transport, and create the
    /// collection. Blocks until the new index accepts queries or the
    /// readiness budget runs out; construction failures are fatal.
    pub async fn connect(config: &SearchStoreConfig) -> Result<Self> {
        config.validate()?;
        let client = SearchClient::new(config)?;
        index::create_collection(
            &client,
            &config.collection_name,
            config.embedding_model_dims,
            config.distance_method,
        )
        .await?;

        Ok(Self {
            client,
            collection_name: config.collection_name.clone(),
            embedding_model_dims: config.embedding_model_dims,
            distance_method: config.distance_method,
        })
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn embedding_model_dims(&self) -> usize {
        self.embedding_model_dims
    }

    pub fn distance_method(&self) -> DistanceMethod {
        self.distance_method
    }

    /// List all collections (indices) visible to this client.
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let (status, value) = self.client.send_json(Method::GET, "/_alias", &[], None).await?;
        if !status.is_success() {
            return Err(EngramError::Internal(error_reason(&value)));
        }
        Ok(value
            .as_object()
            .map(|indices| indices.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Raw index metadata for this collection.
    pub async fn collection_info(&self) -> Result<Value> {
        let path = format!("/{}", self.collection_name);
        let (status, value) = self.client.send_json(Method::GET, &path, &[], None).await?;
        if !status.is_success() {
            return Err(EngramError::Internal(error_reason(&value)));
        }
        Ok(value)
    }

    /// Delete the backing index and everything in it.
    pub async fn delete_collection(&self) -> Result<()> {
        let path = format!("/{}", self.collection_name);
        let (status, value) = self.client.send_json(Method::DELETE, &path, &[], None).await?;
        if !status.is_success() {
            return Err(EngramError::Internal(error_reason(&value)));
        }
        Ok(())
    }

    /// [`search`](VectorStore::search) collapsed to an empty result on
    /// failure (logged at warn). Callers that need to tell "no matches"
    /// from "query failed" should use `search` directly.
    pub async fn search_or_empty(
        &self,
        query_text: &str,
        vector: &[f32],
        limit: usize,
        filters: &[Filter],
    ) -> Vec<SearchResult> {
        match self.search(query_text, vector, limit, filters).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Search failed, returning no results: {e}");
                Vec::new()
            }
        }
    }

    /// [`list`](VectorStore::list) collapsed to an empty result on failure
    /// (logged at warn).
    pub async fn list_or_empty(&self, filters: &[Filter], limit: Option<usize>) -> Vec<SearchResult> {
        match self.list(filters, limit).await {
            Ok(results) => results,
            Err(e) => {
                warn!("List failed, returning no results: {e}");
                Vec::new()
            }
        }
    }

    fn check_dims(&self, vector: &[f32], id: &str) -> Result<()> {
        if vector.len() != self.embedding_model_dims {
            return Err(EngramError::Validation(format!(
                "vector for {id} has length {} but the collection expects {}",
                vector.len(),
                self.embedding_model_dims
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for OpenSearchStore {
    async fn insert(
        &self,
        vectors: Vec<Vec<f32>>,
        payloads: Option<Vec<Payload>>,
        ids: Option<Vec<String>>,
    ) -> Result<Vec<InsertOutcome>> {
        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        let ids = ids.unwrap_or_else(|| (0..vectors.len()).map(|i| i.to_string()).collect());
        let payloads = payloads.unwrap_or_else(|| vec![Payload::new(); vectors.len()]);

        if payloads.len() != vectors.len() || ids.len() != vectors.len() {
            return Err(EngramError::Validation(format!(
                "parallel inputs must have equal lengths: {} vectors, {} payloads, {} ids",
                vectors.len(),
                payloads.len(),
                ids.len()
            )));
        }
        for (vector, id) in vectors.iter().zip(&ids) {
            self.check_dims(vector, id)?;
        }

        let body = bulk::build_actions(&self.collection_name, &vectors, &payloads, &ids);
        let (status, value) = self.client.send_bulk(body).await?;
        if !status.is_success() {
            return Err(EngramError::BulkWrite(error_reason(&value)));
        }

        let response: BulkResponse = serde_json::from_value(value)
            .map_err(|e| EngramError::BulkWrite(format!("Unexpected bulk response: {e}")))?;
        Ok(bulk::outcomes_from_response(&ids, &response))
    }

    async fn search(
        &self,
        query_text: &str,
        vector: &[f32],
        limit: usize,
        filters: &[Filter],
    ) -> Result<Vec<SearchResult>> {
        self.check_dims(vector, "search query")?;

        let body = query::knn_search_body(query_text, vector, limit, filters);
        let routing = routing_for_filters(filters);
        let path = format!("/{}/_search", self.collection_name);
        let (status, value) = self
            .client
            .send_json(Method::POST, &path, &[("routing", routing)], Some(&body))
            .await?;
        if !status.is_success() {
            return Err(EngramError::Internal(error_reason(&value)));
        }

        let response: SearchResponse = serde_json::from_value(value)
            .map_err(|e| EngramError::Internal(format!("Unexpected search response: {e}")))?;
        Ok(response
            .hits
            .hits
            .into_iter()
            .map(crate::client::Hit::into_search_result)
            .collect())
    }

    async fn list(&self, filters: &[Filter], limit: Option<usize>) -> Result<Vec<SearchResult>> {
        let body = query::list_body(filters, limit);
        let path = format!("/{}/_search", self.collection_name);
        let (status, value) = self
            .client
            .send_json(Method::POST, &path, &[], Some(&body))
            .await?;
        if !status.is_success() {
            return Err(EngramError::Internal(error_reason(&value)));
        }

        let response: SearchResponse = serde_json::from_value(value)
            .map_err(|e| EngramError::Internal(format!("Unexpected search response: {e}")))?;
        Ok(response
            .hits
            .hits
            .into_iter()
            .map(crate::client::Hit::into_search_result)
            .collect())
    }

    /// Point read by id. Absence is a normal outcome (`Ok(None)`), not an
    /// error; only genuine transport faults propagate.
    ///
    /// The read does not carry a routing parameter: records inserted under
    /// a non-default routing key may be missed on multi-shard indices (see
    /// [`engram_core::routing_key`]).
    async fn get(&self, id: &str) -> Result<Option<SearchResult>> {
        if !self.client.index_exists(&self.collection_name).await? {
            info!("Index {} does not exist", self.collection_name);
            return Ok(None);
        }

        let path = format!("/{}/_doc/{id}", self.collection_name);
        let (status, value) = self.client.send_json(Method::GET, &path, &[], None).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(EngramError::Internal(error_reason(&value)));
        }

        let doc: GetDocResponse = serde_json::from_value(value)
            .map_err(|e| EngramError::Internal(format!("Unexpected document response: {e}")))?;
        if !doc.found {
            return Ok(None);
        }
        Ok(Some(SearchResult {
            id: doc.id,
            score: 1.0,
            payload: extract_payload(&doc.source),
        }))
    }

    async fn update(
        &self,
        id: &str,
        vector: Option<Vec<f32>>,
        payload: Option<Payload>,
    ) -> Result<()> {
        if vector.is_none() && payload.is_none() {
            return Ok(());
        }
        if let Some(vector) = &vector {
            self.check_dims(vector, id)?;
        }

        let body = query::update_body(vector.as_deref(), payload.as_ref());
        let path = format!("/{}/_update/{id}", self.collection_name);
        let (status, value) = self
            .client
            .send_json(Method::POST, &path, &[("retry_on_conflict", "3")], Some(&body))
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Err(EngramError::NotFound(format!("No record with id {id}")));
        }
        if !status.is_success() {
            return Err(EngramError::Internal(error_reason(&value)));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = format!("/{}/_doc/{id}", self.collection_name);
        let (status, value) = self.client.send_json(Method::DELETE, &path, &[], None).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(EngramError::NotFound(format!("No record with id {id}")));
        }
        if !status.is_success() {
            return Err(EngramError::Internal(error_reason(&value)));
        }
        Ok(())
    }

    /// Delete and recreate the backing index with the original
    /// dimensionality and distance method.
    async fn reset(&self) -> Result<()> {
        warn!("Resetting collection {}", self.collection_name);
        self.delete_collection().await?;
        index::create_collection(
            &self.client,
            &self.collection_name,
            self.embedding_model_dims,
            self.distance_method,
        )
        .await
    }
}
