//! Resolution of caller-supplied id chains into a browsable view.
//!
//! A path is a `/`-separated list of ids starting at a collection root and
//! descending through collections, optionally ending in one non-collection
//! item. Every hop must be a listed child of the hop before it.

use crate::error::{ResourceError, ResourceResult};
use crate::permission::PermissionEvaluator;
use crate::resource::{Resource, ResourceView};
use crate::storage::ResourceStore;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathResolution {
    /// Collections on the path, in path order.
    pub collections: Vec<Resource>,
    /// Children of the last collection, in display order, with lock flags.
    pub children: Vec<ResourceView>,
    /// The item the path ends on, when it is one of `children`.
    pub active_child: Option<Uuid>,
}

/// Split a raw path into ids, ignoring blank segments.
pub fn parse_path(path: &str) -> ResourceResult<Vec<Uuid>> {
    path.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| ResourceError::validation("ID invalid or could not be parsed"))
        })
        .collect()
}

pub async fn resolve_path(
    store: &dyn ResourceStore,
    evaluator: &mut PermissionEvaluator<'_>,
    ids: &[Uuid],
) -> ResourceResult<PathResolution> {
    if ids.is_empty() {
        return Ok(PathResolution::default());
    }

    // Lengths only match when every id exists and none is repeated.
    let fetched = store.get_by_ids(ids).await?;
    if fetched.len() != ids.len() {
        return Err(ResourceError::not_found(
            "Resources in path not found or invalid reference encountered",
        ));
    }
    let mut by_id: HashMap<Uuid, Resource> = fetched.into_iter().map(|r| (r.id, r)).collect();
    let mut ordered = Vec::with_capacity(ids.len());
    for id in ids {
        let resource = by_id.remove(id).ok_or_else(|| {
            ResourceError::not_found("Resources in path not found or invalid reference encountered")
        })?;
        ordered.push(resource);
    }

    let leaf = match ordered.last() {
        Some(last) if !last.is_collection() => ordered.pop(),
        _ => None,
    };
    if ordered.iter().any(|r| !r.is_collection()) {
        return Err(ResourceError::validation(
            "Intermediate resource on path is not a collection",
        ));
    }
    let collections = ordered;
    let Some(first) = collections.first() else {
        return Err(ResourceError::validation(
            "Path root is not a valid collection root resource",
        ));
    };

    // Nothing past a locked collection is reachable, so stop at the first one.
    if !evaluator.caller().is_admin() {
        for collection in &collections {
            if evaluator.is_locked(collection).await {
                tracing::debug!(id = %collection.id, "path blocked by locked collection");
                return Err(ResourceError::unauthorized(
                    "One or more resources in path require authorisation",
                ));
            }
        }
    }

    if !first.resource_type.is_root() {
        return Err(ResourceError::validation(
            "Path root is not a valid collection root resource",
        ));
    }

    for pair in collections.windows(2) {
        if !pair[0].content.contains_child(pair[1].id) {
            return Err(ResourceError::not_found("Requested resource path does not exist"));
        }
    }

    let Some(active) = collections.last() else {
        return Ok(PathResolution::default());
    };
    let child_ids: Vec<Uuid> = active.content.children().unwrap_or(&[]).to_vec();
    let fetched_children = store.get_by_ids(&child_ids).await?;
    if fetched_children.len() != child_ids.len() {
        tracing::error!(
            collection = %active.id,
            expected = child_ids.len(),
            found = fetched_children.len(),
            "active collection references missing children"
        );
        return Err(ResourceError::integrity(
            "Missing children in active collection encountered",
        ));
    }
    let mut by_id: HashMap<Uuid, Resource> =
        fetched_children.into_iter().map(|r| (r.id, r)).collect();
    let mut children = Vec::with_capacity(child_ids.len());
    for id in &child_ids {
        let child = by_id.remove(id).ok_or_else(|| {
            ResourceError::integrity("Missing children in active collection encountered")
        })?;
        children.push(child);
    }

    let active_child = leaf
        .map(|l| l.id)
        .filter(|id| child_ids.contains(id));

    let mut views = Vec::with_capacity(children.len());
    for child in children {
        views.push(evaluator.view(child).await);
    }

    Ok(PathResolution {
        collections,
        children: views,
        active_child,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CallerContext;
    use crate::resource::{ResourceContent, ResourceType, ResourceUpdate};
    use crate::storage::MemoryResourceStore;
    use crate::testing::{self, put, CountingIdentity};

    struct Fixture {
        store: MemoryResourceStore,
        root: Uuid,
        unit: Uuid,
        week: Uuid,
        video: Uuid,
        notes: Uuid,
    }

    // root -> unit -> week -> [video, notes]
    async fn fixture() -> Fixture {
        let store = MemoryResourceStore::new();
        let video = put(&store, testing::link("video")).await;
        let notes = put(&store, testing::hidden(testing::link("notes"))).await;
        let week = put(
            &store,
            testing::container(ResourceType::Collection, "week", vec![video, notes]),
        )
        .await;
        let unit = put(
            &store,
            testing::container(ResourceType::TopicBundle, "unit", vec![week]),
        )
        .await;
        let root = put(
            &store,
            testing::container(ResourceType::CollectionRoot, "root", vec![unit]),
        )
        .await;
        Fixture { store, root, unit, week, video, notes }
    }

    async fn resolve(f: &Fixture, caller: &CallerContext, ids: &[Uuid]) -> ResourceResult<PathResolution> {
        let identity = CountingIdentity::none();
        let mut evaluator = PermissionEvaluator::new(caller, &identity);
        resolve_path(&f.store, &mut evaluator, ids).await
    }

    #[test]
    fn parse_path_skips_blanks() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(parse_path(&format!("/{}// {} /", a, b)).unwrap(), vec![a, b]);
        assert!(parse_path("").unwrap().is_empty());
        assert!(matches!(parse_path("not-an-id"), Err(ResourceError::Validation(_))));
    }

    #[tokio::test]
    async fn empty_path_is_empty_result() {
        let f = fixture().await;
        let res = resolve(&f, &CallerContext::anonymous(), &[]).await.unwrap();
        assert!(res.collections.is_empty() && res.children.is_empty());
        assert!(res.active_child.is_none());
    }

    #[tokio::test]
    async fn valid_path_returns_collections_in_order() {
        let f = fixture().await;
        let res = resolve(&f, &CallerContext::anonymous(), &[f.root, f.unit, f.week])
            .await
            .unwrap();
        let ids: Vec<Uuid> = res.collections.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![f.root, f.unit, f.week]);
        let children: Vec<Uuid> = res.children.iter().map(|c| c.id).collect();
        assert_eq!(children, vec![f.video, f.notes]);
        assert!(res.active_child.is_none());
    }

    #[tokio::test]
    async fn trailing_item_becomes_active_child() {
        let f = fixture().await;
        let res = resolve(&f, &CallerContext::anonymous(), &[f.root, f.unit, f.week, f.video])
            .await
            .unwrap();
        assert_eq!(res.active_child, Some(f.video));
        assert_eq!(res.collections.len(), 3);
    }

    #[tokio::test]
    async fn trailing_item_outside_active_collection_is_ignored() {
        let f = fixture().await;
        let res = resolve(&f, &CallerContext::anonymous(), &[f.root, f.unit, f.video])
            .await
            .unwrap();
        assert!(res.active_child.is_none());
        assert_eq!(res.children.len(), 1);
    }

    #[tokio::test]
    async fn locked_children_are_redacted() {
        let f = fixture().await;
        let res = resolve(&f, &CallerContext::anonymous(), &[f.root, f.unit, f.week])
            .await
            .unwrap();
        assert!(!res.children[0].is_locked());
        assert!(matches!(res.children[0].content, ResourceContent::Link(_)));
        assert!(res.children[1].is_locked());
        assert_eq!(res.children[1].content, ResourceContent::empty());
        assert_eq!(res.children[1].label, "notes");
    }

    #[tokio::test]
    async fn broken_chain_is_not_found_anywhere() {
        let f = fixture().await;
        for ids in [vec![f.root, f.week], vec![f.root, f.unit, f.unit]] {
            let err = resolve(&f, &CallerContext::anonymous(), &ids).await.unwrap_err();
            assert!(matches!(err, ResourceError::NotFound(_)), "{:?}", ids);
        }
        let stray = put(&f.store, testing::container(ResourceType::Collection, "stray", vec![])).await;
        let err = resolve(&f, &CallerContext::anonymous(), &[f.root, f.unit, stray])
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let f = fixture().await;
        let err = resolve(&f, &CallerContext::anonymous(), &[f.root, Uuid::new_v4()])
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn path_must_start_at_root() {
        let f = fixture().await;
        let err = resolve(&f, &CallerContext::anonymous(), &[f.unit, f.week])
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Validation(_)));
        let err = resolve(&f, &CallerContext::anonymous(), &[f.video]).await.unwrap_err();
        assert!(matches!(err, ResourceError::Validation(_)));
    }

    #[tokio::test]
    async fn leaf_in_the_middle_is_rejected() {
        let f = fixture().await;
        let err = resolve(&f, &CallerContext::anonymous(), &[f.root, f.video, f.week])
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Validation(_)));
    }

    #[tokio::test]
    async fn locked_collection_stops_resolution() {
        let f = fixture().await;
        f.store
            .update_by_id(
                f.unit,
                ResourceUpdate {
                    permissions: Some(testing::hidden(testing::link("x")).permissions),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // anything below the locked hop is SSO-protected; it must never be looked up
        f.store
            .update_by_id(
                f.week,
                ResourceUpdate {
                    permissions: Some(testing::sso_locked(testing::link("x"), false).permissions),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let identity = CountingIdentity::staff();
        let caller = CallerContext::anonymous().with_sso_token("t");
        let mut evaluator = PermissionEvaluator::new(&caller, &identity);
        let err = resolve_path(&f.store, &mut evaluator, &[f.root, f.unit, f.week])
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Unauthorized(_)));
        assert_eq!(identity.calls(), 0);
    }

    #[tokio::test]
    async fn admin_passes_locked_collections() {
        let f = fixture().await;
        f.store
            .update_by_id(
                f.unit,
                ResourceUpdate {
                    permissions: Some(testing::hidden(testing::link("x")).permissions),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let res = resolve(&f, &CallerContext::admin("root"), &[f.root, f.unit, f.week])
            .await
            .unwrap();
        assert!(res.children.iter().all(|c| !c.is_locked()));
        assert!(matches!(res.children[1].content, ResourceContent::Link(_)));
    }

    #[tokio::test]
    async fn admin_still_locked_out_of_lti() {
        let f = fixture().await;
        let tool = put(&f.store, testing::sso_locked(testing::lti("tool"), false)).await;
        f.store
            .update_by_id(
                f.week,
                ResourceUpdate::content(ResourceContent::children_of(vec![f.video, tool])),
            )
            .await
            .unwrap();
        let res = resolve(&f, &CallerContext::admin("root"), &[f.root, f.unit, f.week, tool])
            .await
            .unwrap();
        assert_eq!(res.active_child, Some(tool));
        assert!(res.children[1].is_locked());
        assert_eq!(res.children[1].content, ResourceContent::empty());
    }

    #[tokio::test]
    async fn one_identity_lookup_per_resolution() {
        let f = fixture().await;
        for id in [f.root, f.unit, f.week, f.video] {
            f.store
                .update_by_id(
                    id,
                    ResourceUpdate {
                        permissions: Some(testing::sso_locked(testing::link("x"), false).permissions),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        let identity = CountingIdentity::student();
        let caller = CallerContext::anonymous().with_sso_token("t");
        let mut evaluator = PermissionEvaluator::new(&caller, &identity);
        resolve_path(&f.store, &mut evaluator, &[f.root, f.unit, f.week])
            .await
            .unwrap();
        assert_eq!(identity.calls(), 1);
    }

    #[tokio::test]
    async fn dangling_child_is_integrity_fault() {
        let f = fixture().await;
        f.store.delete_by_id(f.notes).await.unwrap();
        let err = resolve(&f, &CallerContext::anonymous(), &[f.root, f.unit, f.week])
            .await
            .unwrap_err();
        assert!(err.is_server_fault());
    }
}
