//! Recursive copy and delete over owning containers.
//!
//! Neither operation is atomic. A failure part-way leaves whatever was
//! already written in place and is logged; callers get the error.

use crate::error::{ResourceError, ResourceResult};
use crate::resource::{NewResource, Resource, ResourceUpdate};
use crate::storage::ResourceStore;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use uuid::Uuid;

/// Insert `resource`, first replacing any owned children with fresh copies.
pub async fn insert_copying_children(
    store: &dyn ResourceStore,
    mut resource: NewResource,
) -> ResourceResult<Uuid> {
    if resource.resource_type.owns_children() {
        let children = resource.content.children().unwrap_or(&[]).to_vec();
        if !children.is_empty() {
            let copies = copy_children(store, &children).await?;
            resource.content.set_children(copies);
        }
    }
    Ok(store.insert(resource).await?)
}

/// Copy each referenced subtree, returning the new root ids in input order.
pub fn copy_children<'a>(
    store: &'a dyn ResourceStore,
    ids: &'a [Uuid],
) -> BoxFuture<'a, ResourceResult<Vec<Uuid>>> {
    async move {
        let mut copies = Vec::with_capacity(ids.len());
        for &id in ids {
            copies.push(copy_subtree(store, id).await?);
        }
        Ok(copies)
    }
    .boxed()
}

/// Deep-copy one resource and everything it owns.
pub async fn copy_subtree(store: &dyn ResourceStore, id: Uuid) -> ResourceResult<Uuid> {
    let source = store
        .get_by_id(id)
        .await?
        .ok_or_else(|| ResourceError::not_found(format!("Resource {} not found", id)))?;
    let copy = insert_copying_children(store, source.to_new()).await.map_err(|e| {
        if e.is_server_fault() {
            tracing::error!(%id, "copy stopped part-way, earlier clones are orphaned: {}", e);
        }
        e
    })?;
    tracing::debug!(from = %id, to = %copy, "copied resource");
    Ok(copy)
}

/// Delete `id` and its owned descendants, detaching it from its parent
/// first. Returns the number of documents removed.
pub async fn delete_subtree(store: &dyn ResourceStore, id: Uuid) -> ResourceResult<u64> {
    let target = store
        .get_by_id(id)
        .await?
        .ok_or_else(|| ResourceError::not_found(format!("Resource {} not found", id)))?;

    let parents = store.get_parents(id).await?;
    if parents.len() > 1 {
        return Err(ResourceError::integrity(format!(
            "Resource {} has {} parents",
            id,
            parents.len()
        )));
    }
    detach(store, id, &parents).await?;

    match delete_owned(store, target).await {
        Ok(deleted) => {
            tracing::info!(%id, deleted, "deleted subtree");
            Ok(deleted)
        }
        Err(e) => {
            tracing::error!(%id, "subtree delete stopped part-way: {}", e);
            Err(e)
        }
    }
}

fn delete_owned<'a>(store: &'a dyn ResourceStore, resource: Resource) -> BoxFuture<'a, ResourceResult<u64>> {
    async move {
        let child_ids = resource.owned_children().to_vec();
        let mut deleted = 0;
        if !child_ids.is_empty() {
            let children = store.get_by_ids(&child_ids).await?;
            if children.len() < child_ids.len() {
                tracing::warn!(
                    parent = %resource.id,
                    missing = child_ids.len() - children.len(),
                    "skipping missing children"
                );
            }
            let counts = try_join_all(
                children
                    .into_iter()
                    .map(|child| delete_child(store, resource.id, child)),
            )
            .await?;
            deleted += counts.into_iter().sum::<u64>();
        }
        deleted += store.delete_by_id(resource.id).await?;
        Ok(deleted)
    }
    .boxed()
}

// Children still owned by another container are detached, not deleted.
// Smart quizzes only cache their children, so they are pruned instead.
async fn delete_child(store: &dyn ResourceStore, parent: Uuid, child: Resource) -> ResourceResult<u64> {
    let parents = store.get_parents(child.id).await?;
    if parents.iter().any(|p| p.id != parent && p.owns_children()) {
        tracing::warn!(id = %child.id, %parent, "keeping child shared with another container");
        return Ok(0);
    }
    let caches: Vec<Resource> = parents.into_iter().filter(|p| !p.owns_children()).collect();
    detach(store, child.id, &caches).await?;
    delete_owned(store, child).await
}

/// Remove `id` from each container's `children`, keeping the order of the rest.
async fn detach(store: &dyn ResourceStore, id: Uuid, containers: &[Resource]) -> ResourceResult<()> {
    for container in containers {
        store
            .update_by_id(container.id, ResourceUpdate::content(container.content.without_child(id)))
            .await?;
    }
    Ok(())
}
