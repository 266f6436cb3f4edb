pub mod auth;
pub mod error;
pub mod export;
pub mod path;
pub mod permission;
pub mod quiz;
pub mod resource;
pub mod service;
pub mod storage;
pub mod tree;

#[cfg(test)]
mod testing;

pub use error::{ResourceError, ResourceResult};
pub use service::ResourceService;
