//! Object storage for uploaded certificates and profile images.
//!
//! Handlers talk to a [`FileStore`]; production wires in [`S3FileStore`]
//! (any S3-compatible bucket), tests use [`MemoryFileStore`].

pub mod handlers;
pub mod memory;
pub mod paths;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub use memory::MemoryFileStore;
pub use paths::Folder;
pub use s3::S3FileStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object {0} not found")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError>;

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Lists every object whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError>;

    fn public_url(&self, key: &str) -> String;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Promotion {
    pub from: String,
    pub to: String,
    pub url: String,
}

/// Moves a temp object into `folder`. Paths already outside temp are returned
/// unchanged, so callers can pass every referenced path through this.
pub async fn promote(
    store: &dyn FileStore,
    user_id: Uuid,
    path: &str,
    folder: Folder,
) -> Result<Promotion, StorageError> {
    let Some(target) = paths::promoted_key(path, user_id, folder) else {
        return Ok(Promotion {
            from: path.to_string(),
            to: path.to_string(),
            url: store.public_url(path),
        });
    };

    store.copy(path, &target).await?;
    store.delete(path).await?;
    info!("Promoted {path} to {target}");

    Ok(Promotion {
        from: path.to_string(),
        url: store.public_url(&target),
        to: target,
    })
}

/// Deletes the user's temp objects, optionally only those last modified before `cutoff`.
pub async fn cleanup_temp(
    store: &dyn FileStore,
    user_id: Uuid,
    cutoff: Option<DateTime<Utc>>,
) -> Result<usize, StorageError> {
    let objects = store.list(&paths::temp_prefix(user_id)).await?;
    let mut removed = 0;
    for object in objects {
        let expired = match (cutoff, object.last_modified) {
            (None, _) => true,
            (Some(cutoff), Some(modified)) => modified < cutoff,
            (Some(_), None) => false,
        };
        if expired {
            store.delete(&object.key).await?;
            removed += 1;
        }
    }
    info!("Removed {removed} temp objects for user {user_id}");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_promote_moves_temp_object() {
        let store = MemoryFileStore::new("https://files.test");
        let user = Uuid::new_v4();
        let temp = paths::temp_key(user, "cert.pdf");
        store
            .put(&temp, Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();

        let promotion = promote(&store, user, &temp, Folder::Certificates)
            .await
            .unwrap();

        assert!(promotion.to.starts_with(&format!("{user}/certificates/")));
        assert_eq!(promotion.url, format!("https://files.test/{}", promotion.to));
        assert!(store.contains(&promotion.to));
        assert!(!store.contains(&temp));
    }

    #[tokio::test]
    async fn test_promote_passes_through_permanent_paths() {
        let store = MemoryFileStore::new("https://files.test");
        let user = Uuid::new_v4();
        let permanent = format!("{user}/certificates/cert.pdf");
        let promotion = promote(&store, user, &permanent, Folder::Certificates)
            .await
            .unwrap();
        assert_eq!(promotion.from, promotion.to);
    }

    #[tokio::test]
    async fn test_promote_missing_temp_object_fails() {
        let store = MemoryFileStore::new("https://files.test");
        let user = Uuid::new_v4();
        let temp = format!("{user}/temp/ghost.pdf");
        let result = promote(&store, user, &temp, Folder::Certificates).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cleanup_only_touches_own_temp_objects() {
        let store = MemoryFileStore::new("https://files.test");
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        for key in [
            paths::temp_key(user, "a.pdf"),
            paths::temp_key(user, "b.png"),
            format!("{user}/certificates/keep.pdf"),
            paths::temp_key(other, "c.pdf"),
        ] {
            store
                .put(&key, Bytes::from_static(b"x"), "application/pdf")
                .await
                .unwrap();
        }

        let removed = cleanup_temp(&store, user, None).await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.list(&paths::temp_prefix(user)).await.unwrap().len(), 0);
        assert_eq!(store.list(&paths::user_prefix(user)).await.unwrap().len(), 1);
        assert_eq!(store.list(&paths::temp_prefix(other)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_respects_cutoff() {
        let store = MemoryFileStore::new("https://files.test");
        let user = Uuid::new_v4();
        store
            .put(&paths::temp_key(user, "fresh.pdf"), Bytes::from_static(b"x"), "application/pdf")
            .await
            .unwrap();

        let cutoff = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(cleanup_temp(&store, user, Some(cutoff)).await.unwrap(), 0);
    }
}
