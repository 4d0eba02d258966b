use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{FileStore, StorageError, StoredObject};

#[derive(Debug, Clone)]
struct Entry {
    body: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// In-process store keyed by object key. Backs tests and local runs without a bucket.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    base_url: String,
    objects: Mutex<BTreeMap<String, Entry>>,
}

impl MemoryFileStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.lock().get(key).map(|e| e.content_type.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Entry>> {
        // A poisoned map is still structurally valid.
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.lock().insert(
            key.to_string(),
            Entry {
                body,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let mut objects = self.lock();
        let entry = objects
            .get(from)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        objects.insert(
            to.to_string(),
            Entry {
                last_modified: Utc::now(),
                ..entry
            },
        );
        Ok(())
    }

    // Idempotent, like S3 DeleteObject.
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        Ok(self
            .lock()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| StoredObject {
                key: key.clone(),
                size: entry.body.len() as u64,
                last_modified: Some(entry.last_modified),
            })
            .collect())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}
