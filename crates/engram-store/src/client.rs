//! HTTP transport for the OpenSearch-compatible REST API
//!
//! Wraps a pooled `reqwest::Client` bound to the resolved connection
//! settings, and defines the serde shapes of the engine's response
//! envelopes. All flow control is delegated to the engine and the client's
//! connection pool; the adapter itself holds no locks or queues.

use std::time::Duration;

use engram_core::{EngramError, Payload, Result, SearchResult, SearchStoreConfig};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;

/// Opaque client handle bound to the resolved transport settings.
///
/// Cheap to share: `reqwest::Client` is internally reference-counted and
/// safe for concurrent use.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: Client,
    base_url: String,
    user: Option<String>,
    password: Option<String>,
}

impl SearchClient {
    /// Build a client from a validated configuration.
    pub fn new(config: &SearchStoreConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host);

        if config.use_ssl && !config.verify_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(|e| {
            EngramError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(user) = &self.user {
            req = req.basic_auth(user, self.password.as_deref());
        }
        req
    }

    /// Issue a JSON request and return the response status and decoded body.
    ///
    /// Only transport and decode faults error here; non-success HTTP
    /// statuses are returned to the caller, which maps them per operation
    /// (a 404 means "absent" to `get` but "failure" to `delete`).
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.request(method, path);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| EngramError::Internal(format!("Request to {path} failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EngramError::Internal(format!("Failed to read response from {path}: {e}")))?;

        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::Null)
        };

        Ok((status, value))
    }

    /// Submit an NDJSON body to the `_bulk` endpoint.
    ///
    /// Transport failure here is fatal to the whole batch, distinct from
    /// per-item failures reported inside a successful response.
    pub async fn send_bulk(&self, body: String) -> Result<(StatusCode, Value)> {
        let response = self
            .request(Method::POST, "/_bulk")
            .header("content-type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| EngramError::BulkWrite(format!("Bulk request failed: {e}")))?;

        let status = response.status();
        let value = response
            .json()
            .await
            .map_err(|e| EngramError::BulkWrite(format!("Failed to decode bulk response: {e}")))?;

        Ok((status, value))
    }

    /// HEAD probe for index existence.
    pub async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self
            .request(Method::HEAD, &format!("/{index}"))
            .send()
            .await
            .map_err(|e| EngramError::Internal(format!("Existence check failed: {e}")))?;
        Ok(response.status().is_success())
    }
}

/// Best-effort extraction of the engine's error reason from a response body.
pub fn error_reason(body: &Value) -> String {
    body.get("error")
        .and_then(|e| {
            e.get("reason")
                .or_else(|| e.get("type"))
                .and_then(Value::as_str)
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

// ============================================================================
// Response Envelopes
// ============================================================================

/// `_search` response envelope.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: Hits,
}

#[derive(Debug, Deserialize)]
pub struct Hits {
    pub hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score")]
    pub score: Option<f32>,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

impl Hit {
    /// Convert a hit into a [`SearchResult`], extracting the stored payload.
    pub fn into_search_result(self) -> SearchResult {
        SearchResult {
            id: self.id,
            score: self.score.unwrap_or(1.0),
            payload: extract_payload(&self.source),
        }
    }
}

/// `GET /{index}/_doc/{id}` response envelope.
#[derive(Debug, Deserialize)]
pub struct GetDocResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub found: bool,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// `_bulk` response envelope with per-item outcomes.
#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItem {
    pub index: Option<BulkItemStatus>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItemStatus {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: u16,
    pub error: Option<Value>,
}

/// Pull the `payload` object out of a document source, empty if missing.
pub(crate) fn extract_payload(source: &Value) -> Payload {
    source
        .get("payload")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
