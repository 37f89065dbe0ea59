//! Resource classification: find document entries by type tag.

use super::types::{LogicalId, ResourceDocument, ResourceType};
use serde_json::Value;

/// Logical IDs whose type matches exactly, in document order.
pub fn find_by_type(doc: &ResourceDocument, resource_type: ResourceType) -> Vec<LogicalId> {
    doc.resources
        .iter()
        .filter(|(_, def)| def.resource_type == resource_type)
        .map(|(id, _)| id.clone())
        .collect()
}

/// Logical IDs of a raw template whose `Type` equals `tag`, in template order.
///
/// Works on any template, including resource types this crate never emits;
/// an unknown tag matches nothing.
pub fn find_by_tag(template: &Value, tag: &str) -> Vec<LogicalId> {
    template
        .get("Resources")
        .and_then(Value::as_object)
        .map(|resources| {
            resources
                .iter()
                .filter(|(_, def)| def.get("Type").and_then(Value::as_str) == Some(tag))
                .map(|(id, _)| id.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Count of resources per type, in first-seen order.
pub fn summarize(doc: &ResourceDocument) -> Vec<(ResourceType, usize)> {
    let mut counts: indexmap::IndexMap<ResourceType, usize> = indexmap::IndexMap::new();
    for def in doc.resources.values() {
        *counts.entry(def.resource_type).or_insert(0) += 1;
    }
    counts.into_iter().collect()
}
