use super::ResourceStore;
use crate::resource::{NewResource, Resource, ResourceType, ResourceUpdate};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// In-process store. Lock guards are never held across an await.
#[derive(Default)]
pub struct MemoryResourceStore {
    docs: RwLock<HashMap<Uuid, Resource>>,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        let docs = resources.into_iter().map(|r| (r.id, r)).collect();
        Self {
            docs: RwLock::new(docs),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.docs.read().contains_key(&id)
    }

    pub(crate) fn insert_sync(&self, resource: NewResource) -> Resource {
        let mut docs = self.docs.write();
        let mut id = Uuid::new_v4();
        while docs.contains_key(&id) {
            id = Uuid::new_v4();
        }
        let stored = resource.with_id(id);
        docs.insert(id, stored.clone());
        stored
    }

    fn update_sync(&self, id: Uuid, update: ResourceUpdate) -> Option<Resource> {
        let mut docs = self.docs.write();
        let doc = docs.get_mut(&id)?;
        doc.apply(update);
        Some(doc.clone())
    }

    /// Overwrite a document that is still present; a concurrent delete wins.
    pub(crate) fn replace_sync(&self, resource: Resource) {
        if let Some(doc) = self.docs.write().get_mut(&resource.id) {
            *doc = resource;
        }
    }

    pub(crate) fn delete_sync(&self, id: Uuid) -> u64 {
        self.docs.write().remove(&id).map_or(0, |_| 1)
    }

    fn filter(&self, pred: impl Fn(&Resource) -> bool) -> Vec<Resource> {
        self.docs.read().values().filter(|r| pred(r)).cloned().collect()
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn insert(&self, resource: NewResource) -> Result<Uuid> {
        Ok(self.insert_sync(resource).id)
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Resource>> {
        let wanted: HashSet<Uuid> = ids.iter().copied().collect();
        Ok(self.filter(|r| wanted.contains(&r.id)))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Resource>> {
        Ok(self.docs.read().get(&id).cloned())
    }

    async fn update_by_id(&self, id: Uuid, update: ResourceUpdate) -> Result<Option<Resource>> {
        Ok(self.update_sync(id, update))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<u64> {
        Ok(self.delete_sync(id))
    }

    async fn get_by_type(&self, resource_type: ResourceType) -> Result<Vec<Resource>> {
        Ok(self.filter(|r| r.resource_type == resource_type))
    }

    async fn get_by_tag(&self, tag: &str) -> Result<Vec<Resource>> {
        Ok(self.filter(|r| r.tags.iter().any(|t| t == tag)))
    }

    async fn get_parents(&self, id: Uuid) -> Result<Vec<Resource>> {
        Ok(self.filter(|r| r.is_container() && r.content.contains_child(id)))
    }

    async fn get_collection_roots(&self) -> Result<Vec<Resource>> {
        Ok(self.filter(|r| r.resource_type.is_root()))
    }

    async fn all(&self) -> Result<Vec<Resource>> {
        Ok(self.filter(|_| true))
    }
}
