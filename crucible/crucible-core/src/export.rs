//! Nested export of every collection root and what it owns.

use crate::error::{ResourceError, ResourceResult};
use crate::resource::{Resource, ResourceContent};
use crate::storage::ResourceStore;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TreeNode {
    pub label: String,
    /// Symbolic type name, e.g. `RESOURCE_COLLECTION`.
    #[serde(rename = "type")]
    pub resource_type: &'static str,
    pub content: ResourceContent,
    pub children: Vec<TreeNode>,
}

/// Build one tree per collection root from a single snapshot of the store.
pub async fn resource_tree(store: &dyn ResourceStore) -> ResourceResult<Vec<TreeNode>> {
    let resources: HashMap<Uuid, Resource> =
        store.all().await?.into_iter().map(|r| (r.id, r)).collect();

    let mut roots: Vec<&Resource> = resources
        .values()
        .filter(|r| r.resource_type.is_root())
        .collect();
    roots.sort_by(|a, b| a.label.cmp(&b.label).then(a.id.cmp(&b.id)));

    let mut visited = HashSet::new();
    roots
        .into_iter()
        .map(|root| build(&resources, root, &mut visited))
        .collect()
}

fn build(
    resources: &HashMap<Uuid, Resource>,
    resource: &Resource,
    visited: &mut HashSet<Uuid>,
) -> ResourceResult<TreeNode> {
    if !visited.insert(resource.id) {
        return Err(ResourceError::integrity(format!(
            "Resource {} is reachable more than once",
            resource.id
        )));
    }
    let mut children = Vec::new();
    for id in resource.owned_children() {
        let child = resources.get(id).ok_or_else(|| {
            tracing::error!(parent = %resource.id, child = %id, "tree references a missing resource");
            ResourceError::integrity(format!("Missing child {} of {}", id, resource.id))
        })?;
        children.push(build(resources, child, visited)?);
    }
    Ok(TreeNode {
        label: resource.label.clone(),
        resource_type: resource.resource_type.as_str(),
        content: resource.content.clone(),
        children,
    })
}
