//! Persistence of resource documents.
//!
//! The engine only talks to the [`ResourceStore`] trait. Two backends ship
//! with the crate: an in-process map and a directory of JSON documents.

use crate::resource::{NewResource, Resource, ResourceType, ResourceUpdate};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub mod file;
pub mod memory;

#[cfg(test)]
mod tests;

pub use file::FileResourceStore;
pub use memory::MemoryResourceStore;

/// Document store holding every resource keyed by id. Each call is a single
/// round-trip and is atomic for one document only.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Insert a resource and return the freshly assigned id.
    async fn insert(&self, resource: NewResource) -> Result<Uuid>;

    /// Batch read. Returns only the documents that exist, in no particular
    /// order, with duplicate ids collapsed.
    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Resource>>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Resource>>;

    /// Apply a partial update and return the document after the update.
    async fn update_by_id(&self, id: Uuid, update: ResourceUpdate) -> Result<Option<Resource>>;

    /// Delete one document, returning the number removed.
    async fn delete_by_id(&self, id: Uuid) -> Result<u64>;

    async fn get_by_type(&self, resource_type: ResourceType) -> Result<Vec<Resource>>;

    async fn get_by_tag(&self, tag: &str) -> Result<Vec<Resource>>;

    /// Reverse reference lookup: every container listing `id` as a child,
    /// smart quizzes included.
    async fn get_parents(&self, id: Uuid) -> Result<Vec<Resource>>;

    async fn get_collection_roots(&self) -> Result<Vec<Resource>>;

    async fn all(&self) -> Result<Vec<Resource>>;
}
