//! Search request composition
//!
//! Pure builders for the engine's query bodies: the k-NN clause with
//! structured and lexical filters for `search`, and the filter-only body
//! for `list`. Keeping these as plain functions makes the composition
//! logic testable without a live engine.

use engram_core::Filter;
use serde_json::{json, Value};

use crate::index::VECTOR_FIELD;

/// Field inside the payload that the lexical match clause targets.
const TEXT_FIELD: &str = "payload.data";

/// Build the `_search` body for a hybrid k-NN query.
///
/// Structured filters and the optional lexical clause act as hard filters
/// narrowing the k-NN candidate set; no lexical relevance score is blended
/// into the returned score.
pub(crate) fn knn_search_body(
    query_text: &str,
    vector: &[f32],
    limit: usize,
    filters: &[Filter],
) -> Value {
    let mut knn_field = json!({
        "vector": vector,
        "k": limit,
    });

    let clauses = filter_clauses(query_text, filters);
    if !clauses.is_empty() {
        knn_field["filter"] = json!({ "bool": { "must": clauses } });
    }

    json!({
        "size": limit,
        "_source": { "excludes": [VECTOR_FIELD] },
        "query": {
            "knn": { VECTOR_FIELD: knn_field }
        },
    })
}

/// Build the `_search` body for a filter-only listing query.
///
/// Match-all base when no filters are supplied, sorted by score descending,
/// optionally capped at `limit`.
pub(crate) fn list_body(filters: &[Filter], limit: Option<usize>) -> Value {
    let clauses = filter_clauses("", filters);
    let query = if clauses.is_empty() {
        json!({ "match_all": {} })
    } else {
        json!({ "bool": { "must": clauses } })
    };

    let mut body = json!({
        "query": query,
        "_source": { "excludes": [VECTOR_FIELD] },
        "sort": [{ "_score": { "order": "desc" } }],
    });
    if let Some(limit) = limit {
        body["size"] = json!(limit);
    }
    body
}

/// Partial-update body for `_update`, merging only the supplied fields.
pub(crate) fn update_body(
    vector: Option<&[f32]>,
    payload: Option<&engram_core::Payload>,
) -> Value {
    let mut doc = serde_json::Map::new();
    if let Some(vector) = vector {
        doc.insert(VECTOR_FIELD.to_string(), json!(vector));
    }
    if let Some(payload) = payload {
        doc.insert("payload".to_string(), json!(payload));
    }
    json!({ "doc": doc })
}

fn filter_clauses(query_text: &str, filters: &[Filter]) -> Vec<Value> {
    let mut clauses: Vec<Value> = filters.iter().map(filter_clause).collect();
    if !query_text.is_empty() {
        clauses.push(json!({ "match": { TEXT_FIELD: query_text } }));
    }
    clauses
}

fn filter_clause(filter: &Filter) -> Value {
    match filter {
        Filter::Equals { field, value } => {
            let path = field.keyword_path();
            json!({ "term": { path: value } })
        }
        Filter::In { field, values } => {
            let path = field.keyword_path();
            json!({ "terms": { path: values } })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::FilterField;

    #[test]
    fn test_knn_body_without_filters() {
        let body = knn_search_body("", &[0.1, 0.2, 0.3], 5, &[]);

        assert_eq!(body["size"], 5);
        assert_eq!(body["_source"]["excludes"][0], "vector_field");

        let knn = &body["query"]["knn"]["vector_field"];
        assert_eq!(knn["k"], 5);
        assert_eq!(knn["vector"][1], 0.2);
        // No filter key when nothing narrows the candidate set
        assert!(knn.get("filter").is_none());
    }

    #[test]
    fn test_knn_body_with_structured_filters() {
        let filters = vec![
            Filter::equals(FilterField::UserId, "u1"),
            Filter::one_of(FilterField::RunId, vec!["r1".to_string(), "r2".to_string()]),
        ];
        let body = knn_search_body("", &[0.0; 4], 10, &filters);

        let must = &body["query"]["knn"]["vector_field"]["filter"]["bool"]["must"];
        assert_eq!(must.as_array().unwrap().len(), 2);
        assert_eq!(must[0]["term"]["payload.user_id.keyword"], "u1");
        assert_eq!(must[1]["terms"]["payload.run_id.keyword"][1], "r2");
    }

    #[test]
    fn test_knn_body_hybrid_lexical_clause() {
        let filters = vec![Filter::equals(FilterField::AgentId, "a1")];
        let body = knn_search_body("coffee preferences", &[0.0; 4], 3, &filters);

        let must = body["query"]["knn"]["vector_field"]["filter"]["bool"]["must"]
            .as_array()
            .unwrap();
        assert_eq!(must.len(), 2);
        assert_eq!(must[0]["term"]["payload.agent_id.keyword"], "a1");
        assert_eq!(must[1]["match"]["payload.data"], "coffee preferences");
    }

    #[test]
    fn test_knn_body_lexical_only() {
        let body = knn_search_body("hello", &[0.0; 4], 3, &[]);
        let must = body["query"]["knn"]["vector_field"]["filter"]["bool"]["must"]
            .as_array()
            .unwrap();
        assert_eq!(must.len(), 1);
        assert_eq!(must[0]["match"]["payload.data"], "hello");
    }

    #[test]
    fn test_list_body_match_all() {
        let body = list_body(&[], None);
        assert!(body["query"]["match_all"].is_object());
        assert_eq!(body["sort"][0]["_score"]["order"], "desc");
        assert!(body.get("size").is_none());
    }

    #[test]
    fn test_list_body_filters_and_limit() {
        let filters = vec![Filter::equals(FilterField::UserId, "u1")];
        let body = list_body(&filters, Some(20));
        assert_eq!(body["size"], 20);
        assert_eq!(
            body["query"]["bool"]["must"][0]["term"]["payload.user_id.keyword"],
            "u1"
        );
    }

    #[test]
    fn test_update_body_partial_merge() {
        let body = update_body(Some(&[0.5, 0.6]), None);
        assert_eq!(body["doc"]["vector_field"][0], 0.5);
        assert!(body["doc"].get("payload").is_none());

        let mut payload = engram_core::Payload::new();
        payload.insert("data".to_string(), serde_json::json!("updated"));
        let body = update_body(None, Some(&payload));
        assert!(body["doc"].get("vector_field").is_none());
        assert_eq!(body["doc"]["payload"]["data"], "updated");
    }
}
