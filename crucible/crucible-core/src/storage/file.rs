//! Filesystem-backed store: one JSON document per resource, loaded at startup.

use super::memory::MemoryResourceStore;
use super::ResourceStore;
use crate::resource::{NewResource, Resource, ResourceType, ResourceUpdate};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct FileResourceStore {
    dir: PathBuf,
    cache: MemoryResourceStore,
}

impl FileResourceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating data directory {}", dir.display()))?;
        let mut resources = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("json")
            {
                continue;
            }
            match Self::load(&path) {
                Ok(resource) => resources.push(resource),
                Err(e) => tracing::warn!(path = %path.display(), "skipping unreadable resource: {:#}", e),
            }
        }
        tracing::debug!(count = resources.len(), dir = %dir.display(), "loaded resources");
        Ok(Self {
            dir,
            cache: MemoryResourceStore::from_resources(resources),
        })
    }

    /// Directory where resources are persisted.
    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    fn load(path: &Path) -> Result<Resource> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    async fn save(&self, resource: &Resource) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(resource)?;
        let path = self.path(resource.id);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))
    }
}

#[async_trait]
impl ResourceStore for FileResourceStore {
    async fn insert(&self, resource: NewResource) -> Result<Uuid> {
        let stored = self.cache.insert_sync(resource);
        if let Err(e) = self.save(&stored).await {
            self.cache.delete_sync(stored.id);
            return Err(e);
        }
        Ok(stored.id)
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Resource>> {
        self.cache.get_by_ids(ids).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Resource>> {
        self.cache.get_by_id(id).await
    }

    async fn update_by_id(&self, id: Uuid, update: ResourceUpdate) -> Result<Option<Resource>> {
        let Some(mut updated) = self.cache.get_by_id(id).await? else {
            return Ok(None);
        };
        updated.apply(update);
        self.save(&updated).await?;
        self.cache.replace_sync(updated.clone());
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<u64> {
        if !self.cache.contains(id) {
            return Ok(0);
        }
        let path = self.path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("removing {}", path.display())))
            }
        }
        Ok(self.cache.delete_sync(id))
    }

    async fn get_by_type(&self, resource_type: ResourceType) -> Result<Vec<Resource>> {
        self.cache.get_by_type(resource_type).await
    }

    async fn get_by_tag(&self, tag: &str) -> Result<Vec<Resource>> {
        self.cache.get_by_tag(tag).await
    }

    async fn get_parents(&self, id: Uuid) -> Result<Vec<Resource>> {
        self.cache.get_parents(id).await
    }

    async fn get_collection_roots(&self) -> Result<Vec<Resource>> {
        self.cache.get_collection_roots().await
    }

    async fn all(&self) -> Result<Vec<Resource>> {
        self.cache.all().await
    }
}
