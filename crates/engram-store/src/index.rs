//! Index lifecycle management
//!
//! Builds the k-NN index mapping and polls the new index until it accepts
//! queries. The backing engine initializes indices asynchronously, so a
//! successful create call does not mean the index is searchable yet.

use engram_core::{DistanceMethod, EngramError, Result};
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info};

use crate::client::{error_reason, SearchClient};

/// Name of the k-NN field inside each stored document.
pub const VECTOR_FIELD: &str = "vector_field";

const READINESS_ATTEMPTS: u32 = 180;
const READINESS_INTERVAL: Duration = Duration::from_millis(500);

/// Index body for a k-NN collection.
///
/// The `method` sub-schema is an engine-specific extension and must be sent
/// exactly in this shape for the target engine to accept it. The vector
/// field is excluded from `_source` so stored vectors never come back in
/// query results.
pub fn index_settings(dims: usize, distance: DistanceMethod) -> Value {
    json!({
        "settings": {
            "index.knn": true,
            "knn_routing": true,
        },
        "mappings": {
            "_source": {
                "excludes": [VECTOR_FIELD]
            },
            "properties": {
                VECTOR_FIELD: {
                    "type": "knn_vector",
                    "dimension": dims,
                    "method": {
                        "engine": "lvector",
                        "name": "flat",
                        "space_type": distance.space_type()
                    },
                },
                "payload": { "type": "object" }
            }
        },
    })
}

/// Create a collection (index) and block until it is ready to serve queries.
///
/// Not idempotent: creating an existing name surfaces the engine's native
/// resource-already-exists failure as [`EngramError::IndexCreation`].
pub async fn create_collection(
    client: &SearchClient,
    name: &str,
    dims: usize,
    distance: DistanceMethod,
) -> Result<()> {
    info!("Creating index {name}");
    let body = index_settings(dims, distance);
    let (status, response) = client
        .send_json(Method::PUT, &format!("/{name}"), &[], Some(&body))
        .await
        .map_err(|e| EngramError::IndexCreation(e.to_string()))?;

    if !status.is_success() {
        let reason = error_reason(&response);
        error!("Failed to create index {name}: {reason}");
        return Err(EngramError::IndexCreation(reason));
    }

    wait_for_index_ready(client, name).await
}

/// Probe the index with a match-all query at a fixed interval until it
/// responds, or give up after the attempt budget (~90s).
async fn wait_for_index_ready(client: &SearchClient, name: &str) -> Result<()> {
    let probe = json!({ "query": { "match_all": {} } });
    for _ in 0..READINESS_ATTEMPTS {
        match client
            .send_json(Method::POST, &format!("/{name}/_search"), &[], Some(&probe))
            .await
        {
            Ok((status, _)) if status.is_success() => {
                info!("Index {name} is ready");
                return Ok(());
            }
            _ => tokio::time::sleep(READINESS_INTERVAL).await,
        }
    }

    Err(EngramError::IndexCreationTimeout {
        index: name.to_string(),
        waited_secs: f64::from(READINESS_ATTEMPTS) * READINESS_INTERVAL.as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_shape() {
        let body = index_settings(1536, DistanceMethod::CosineSimil);

        assert_eq!(body["settings"]["index.knn"], true);
        assert_eq!(body["settings"]["knn_routing"], true);
        assert_eq!(body["mappings"]["_source"]["excludes"][0], "vector_field");

        let field = &body["mappings"]["properties"]["vector_field"];
        assert_eq!(field["type"], "knn_vector");
        assert_eq!(field["dimension"], 1536);
        assert_eq!(field["method"]["engine"], "lvector");
        assert_eq!(field["method"]["name"], "flat");
        assert_eq!(field["method"]["space_type"], "cosinesimil");

        assert_eq!(body["mappings"]["properties"]["payload"]["type"], "object");
    }

    #[test]
    fn test_index_settings_distance_methods() {
        let body = index_settings(4, DistanceMethod::L2);
        assert_eq!(
            body["mappings"]["properties"]["vector_field"]["method"]["space_type"],
            "l2"
        );

        let body = index_settings(4, DistanceMethod::InnerProduct);
        assert_eq!(
            body["mappings"]["properties"]["vector_field"]["method"]["space_type"],
            "innerproduct"
        );
    }
}
