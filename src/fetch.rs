//! Listing and detail retrieval for catalog objects.
//!
//! The classic API wraps a full listing in a per-type envelope key and a
//! single object in a singular key; the modern API pages listings under a
//! `results` array and returns single objects unwrapped. Both are
//! requested as JSON. Irregular shapes (patch title versions, policy
//! scopes) are traversed as `serde_json::Value` via [`value_at_path`]
//! rather than modeled as structs.

use serde_json::Value;

use crate::catalog::{ApiGeneration, ObjectType};
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};

/// One managed object as returned by a listing: identity plus name.
///
/// Identity is `(object_type, id)`. Classic ids are numeric and modern ids
/// are strings; both are carried as strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Object id, stringified.
    pub id: String,
    /// Object display name.
    pub name: String,
    /// Which collection this object came from.
    pub object_type: ObjectType,
}

/// Stringifies an id value that may arrive as a JSON number or string.
fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Retrieves the full listing of an object type.
///
/// An empty or missing collection yields an empty vector, not an error.
pub async fn list_objects(transport: &Transport, object_type: ObjectType) -> Result<Vec<Resource>> {
    let url = object_type.list_url(transport.base_url());
    let context = format!("GET {object_type} list");
    let response = transport
        .execute(ApiRequest::get(url))
        .await?
        .require_success(&context)?;

    let Some(document) = response.json::<Value>()? else {
        return Ok(Vec::new());
    };

    let list_key = object_type.descriptor().list_key;
    let mut resources = Vec::new();
    if let Some(items) = document.get(list_key).and_then(Value::as_array) {
        for item in items {
            let (Some(id), Some(name)) = (item.get("id"), item.get("name").and_then(Value::as_str))
            else {
                continue;
            };
            resources.push(Resource {
                id: id_string(id),
                name: name.to_string(),
                object_type,
            });
        }
    }
    Ok(resources)
}

/// Retrieves one object's detail document by id.
///
/// Classic responses are unwrapped from their singular envelope key;
/// modern responses are returned as-is. An empty body yields `Value::Null`.
pub async fn object_detail(
    transport: &Transport,
    object_type: ObjectType,
    id: &str,
) -> Result<Value> {
    let url = object_type.object_url(transport.base_url(), id);
    let context = format!("GET {object_type} {id}");
    let response = transport
        .execute(ApiRequest::get(url))
        .await?
        .require_success(&context)?;

    let Some(mut document) = response.json::<Value>()? else {
        return Ok(Value::Null);
    };

    let desc = object_type.descriptor();
    if desc.generation == ApiGeneration::Classic {
        if let Some(inner) = document.get_mut(desc.detail_key) {
            return Ok(inner.take());
        }
    }
    Ok(document)
}

/// Traverses a slash-separated path through a detail document.
///
/// Returns `None` when any segment is missing, mirroring the tolerant
/// lookup callers expect when a section is absent from an object.
pub fn value_at_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Looks up an object's id by display name.
///
/// Classic listings are matched case-insensitively (server-side names are
/// not case-normalized); modern listings match exactly.
pub async fn object_id_from_name(
    transport: &Transport,
    object_type: ObjectType,
    name: &str,
) -> Result<Option<String>> {
    let resources = list_objects(transport, object_type).await?;
    let generation = object_type.descriptor().generation;
    Ok(resources.into_iter().find_map(|r| {
        let matched = match generation {
            ApiGeneration::Classic => r.name.eq_ignore_ascii_case(name),
            ApiGeneration::Modern => r.name == name,
        };
        matched.then_some(r.id)
    }))
}

/// Lists all policies assigned to one category.
pub async fn policies_in_category(
    transport: &Transport,
    category: &str,
) -> Result<Vec<Resource>> {
    let url = format!(
        "{}/{}/category/{}",
        transport.base_url().trim_end_matches('/'),
        ObjectType::Policy.descriptor().path,
        category
    );
    let context = format!("GET policies in category '{category}'");
    let response = transport
        .execute(ApiRequest::get(url))
        .await?
        .require_success(&context)?;

    let Some(document) = response.json::<Value>()? else {
        return Ok(Vec::new());
    };

    let mut resources = Vec::new();
    if let Some(items) = document.get("policies").and_then(Value::as_array) {
        for item in items {
            let (Some(id), Some(name)) = (item.get("id"), item.get("name").and_then(Value::as_str))
            else {
                continue;
            };
            resources.push(Resource {
                id: id_string(id),
                name: name.to_string(),
                object_type: ObjectType::Policy,
            });
        }
    }
    Ok(resources)
}

/// Free-text search: keeps resources whose name contains any query term.
///
/// This is substring containment, deliberately distinct from the exact
/// set-membership matching the usage resolver applies.
pub fn filter_by_substring(resources: &[Resource], queries: &[String]) -> Vec<Resource> {
    let mut matches = Vec::new();
    for query in queries {
        for resource in resources {
            if resource.name.contains(query.as_str()) && !matches.contains(resource) {
                matches.push(resource.clone());
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(id: &str, name: &str) -> Resource {
        Resource {
            id: id.to_string(),
            name: name.to_string(),
            object_type: ObjectType::Package,
        }
    }

    #[test]
    fn id_string_handles_numbers_and_strings() {
        assert_eq!(id_string(&json!(42)), "42");
        assert_eq!(id_string(&json!("abc-123")), "abc-123");
    }

    #[test]
    fn value_at_path_walks_nested_documents() {
        let doc = json!({
            "scope": {
                "computer_groups": [{"name": "Testers"}],
                "all_computers": false
            }
        });
        let groups = value_at_path(&doc, "scope/computer_groups").unwrap();
        assert_eq!(groups.as_array().unwrap().len(), 1);
        assert!(value_at_path(&doc, "scope/missing/deeper").is_none());
    }

    #[test]
    fn value_at_path_empty_path_is_identity() {
        let doc = json!({"a": 1});
        assert_eq!(value_at_path(&doc, "").unwrap(), &doc);
    }

    #[test]
    fn substring_search_matches_partial_names() {
        let resources = vec![
            resource("1", "Chrome-120.pkg"),
            resource("2", "Firefox.pkg"),
            resource("3", "chrome-legacy.pkg"),
        ];
        let hits = filter_by_substring(&resources, &["Chrome".to_string()]);
        // Substring matching is case-sensitive: only the exact fragment hits.
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");
    }

    #[test]
    fn substring_search_deduplicates_across_queries() {
        let resources = vec![resource("1", "Chrome-120.pkg")];
        let hits = filter_by_substring(
            &resources,
            &["Chrome".to_string(), "pkg".to_string()],
        );
        assert_eq!(hits.len(), 1, "one resource must appear once");
    }

    #[test]
    fn substring_search_no_match_is_empty() {
        let resources = vec![resource("1", "Chrome-120.pkg")];
        assert!(filter_by_substring(&resources, &["Safari".to_string()]).is_empty());
    }
}
