//! Bulk ingestion path
//!
//! Translates batches of (vector, payload, id) triples into NDJSON index
//! actions routed per record, and turns the engine's bulk response into a
//! per-id outcome list.

use engram_core::{routing_key, Payload};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::BulkResponse;
use crate::index::VECTOR_FIELD;

/// Outcome of one record within a bulk insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertStatus {
    Success,
    Failed,
}

/// Per-id result of a bulk insert.
///
/// Partial application is possible: the batch is atomic only to the extent
/// the backing engine makes it so, and callers must inspect this list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertOutcome {
    pub id: String,
    pub status: InsertStatus,
    /// Engine-reported error detail for failed items, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Assemble the NDJSON body for a batch of index (upsert) actions.
///
/// Each record routes by [`routing_key`] from its payload, so re-inserting
/// the same id with the same payload always lands on the same shard.
pub(crate) fn build_actions(
    index: &str,
    vectors: &[Vec<f32>],
    payloads: &[Payload],
    ids: &[String],
) -> String {
    let mut body = String::new();
    for ((vector, payload), id) in vectors.iter().zip(payloads).zip(ids) {
        let action = json!({
            "index": {
                "_index": index,
                "_id": id,
                "routing": routing_key(payload),
            }
        });
        let source = json!({
            VECTOR_FIELD: vector,
            "payload": payload,
        });
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&source.to_string());
        body.push('\n');
    }
    body
}

/// Map the engine's per-item bulk response back onto the submitted ids.
///
/// Items missing from the response (a non-conforming engine) are marked
/// failed - a documented count-based approximation, applied only as a
/// fallback.
pub(crate) fn outcomes_from_response(ids: &[String], response: &BulkResponse) -> Vec<InsertOutcome> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let item = response.items.get(i).and_then(|item| item.index.as_ref());
            match item {
                Some(detail) if detail.error.is_none() && detail.status < 300 => InsertOutcome {
                    id: id.clone(),
                    status: InsertStatus::Success,
                    error: None,
                },
                Some(detail) => InsertOutcome {
                    id: id.clone(),
                    status: InsertStatus::Failed,
                    error: detail.error.as_ref().map(ToString::to_string),
                },
                None => InsertOutcome {
                    id: id.clone(),
                    status: InsertStatus::Failed,
                    error: None,
                },
            }
        })
        .collect()
}
