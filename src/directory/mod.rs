//! Folder/document directory collaborator
//!
//! The directory service is external; this module holds the client for its
//! API and the short-TTL cache the viewer shell reads listings through.

mod cache;
mod client;
mod error;
mod types;

use async_trait::async_trait;

pub use cache::DirectoryCache;
pub use client::HttpDirectoryClient;
pub use error::DirectoryError;
pub use types::{DirectoryListing, FileEntry, ParentRef, SubfolderRef, UploadRequest};

/// Directory/file collaborator API
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// `GET /directories/{slug}`
    async fn get_listing(&self, slug: &str) -> Result<DirectoryListing, DirectoryError>;

    /// `POST /files/upload` (multipart: file, description, directory_slug)
    async fn upload_file(&self, slug: &str, upload: UploadRequest)
        -> Result<FileEntry, DirectoryError>;

    /// `DELETE /files/{id}`
    async fn delete_file(&self, id: &str) -> Result<(), DirectoryError>;
}
