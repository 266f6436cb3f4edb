//! Caller-facing resource operations, shared by every transport.

use crate::auth::{CallerContext, IdentityProvider};
use crate::error::{ResourceError, ResourceResult};
use crate::export::{self, TreeNode};
use crate::path::{self, PathResolution};
use crate::permission::PermissionEvaluator;
use crate::quiz;
use crate::resource::{NewResource, Resource, ResourcePatch, ResourceView};
use crate::storage::ResourceStore;
use crate::tree;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use uuid::Uuid;

pub const SESSION_REQUIRED: &str = "User not authorised or user data not associated with session";

#[derive(Clone)]
pub struct ResourceService {
    store: Arc<dyn ResourceStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl ResourceService {
    pub fn new(store: Arc<dyn ResourceStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    pub fn store(&self) -> &dyn ResourceStore {
        self.store.as_ref()
    }

    fn require_admin(caller: &CallerContext) -> ResourceResult<()> {
        if caller.is_admin() {
            Ok(())
        } else {
            Err(ResourceError::unauthorized(SESSION_REQUIRED))
        }
    }

    async fn fetch(&self, id: Uuid) -> ResourceResult<Resource> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ResourceError::not_found(format!("Resource {} not found", id)))
    }

    pub async fn roots(&self) -> ResourceResult<Vec<Resource>> {
        Ok(self.store.get_collection_roots().await?)
    }

    pub async fn resource_tree(&self) -> ResourceResult<Vec<TreeNode>> {
        export::resource_tree(self.store.as_ref()).await
    }

    pub async fn get_path(&self, raw: &str, caller: &CallerContext) -> ResourceResult<PathResolution> {
        let ids = path::parse_path(raw)?;
        let mut evaluator = PermissionEvaluator::new(caller, self.identity.as_ref());
        path::resolve_path(self.store.as_ref(), &mut evaluator, &ids).await
    }

    pub async fn get_by_id(&self, id: Uuid, caller: &CallerContext) -> ResourceResult<ResourceView> {
        let resource = self.fetch(id).await?;
        let mut evaluator = PermissionEvaluator::new(caller, self.identity.as_ref());
        Ok(evaluator.view(resource).await)
    }

    /// Tagged resources, each rendered with its lock state. One evaluator
    /// serves the whole listing so identity is resolved at most once.
    pub async fn get_by_tag(&self, tag: &str, caller: &CallerContext) -> ResourceResult<Vec<ResourceView>> {
        let resources = self.store.get_by_tag(tag).await?;
        let mut evaluator = PermissionEvaluator::new(caller, self.identity.as_ref());
        let mut views = Vec::with_capacity(resources.len());
        for resource in resources {
            views.push(evaluator.view(resource).await);
        }
        Ok(views)
    }

    /// Store a new resource. Children referenced by an owning container are
    /// deep-copied, so the new resource never shares a subtree.
    pub async fn create(&self, resource: NewResource, caller: &CallerContext) -> ResourceResult<Resource> {
        Self::require_admin(caller)?;
        let id = tree::insert_copying_children(self.store.as_ref(), resource).await?;
        tracing::info!(%id, "created resource");
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ResourceError::integrity(format!("Resource {} vanished after insert", id)))
    }

    pub async fn update(
        &self,
        id: Uuid,
        patch: ResourcePatch,
        caller: &CallerContext,
    ) -> ResourceResult<Resource> {
        Self::require_admin(caller)?;
        let existing = self.fetch(id).await?;
        let update = patch.validate(existing.resource_type)?;
        let updated = self
            .store
            .update_by_id(id, update)
            .await?
            .ok_or_else(|| ResourceError::not_found(format!("Resource {} not found", id)))?;
        tracing::info!(%id, "updated resource");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid, caller: &CallerContext) -> ResourceResult<u64> {
        Self::require_admin(caller)?;
        tree::delete_subtree(self.store.as_ref(), id).await
    }

    pub async fn smart_quiz_questions(&self, id: Uuid) -> ResourceResult<Vec<Resource>> {
        let quiz = self.fetch(id).await?;
        let mut rng = StdRng::from_entropy();
        quiz::sample_questions(self.store.as_ref(), &quiz, &mut rng).await
    }
}
