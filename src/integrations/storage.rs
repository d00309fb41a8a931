use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::error::{AppError, AppResult};

/// Media object store. Returns the public URL of the stored object.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn store(&self, filename: &str, bytes: Vec<u8>) -> AppResult<String>;
}

/// Local-disk store served back under the media base URL. Objects are keyed
/// by a fresh UUID; only the original extension is kept.
pub struct FsObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: String) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_key(filename: &str) -> String {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
        match ext {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_lowercase()),
            None => Uuid::new_v4().to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    async fn store(&self, filename: &str, bytes: Vec<u8>) -> AppResult<String> {
        let key = Self::object_key(filename);
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create media dir: {}", e)))?;
        tokio::fs::write(self.root.join(&key), bytes)
            .await
            .map_err(|e| AppError::Internal(format!("failed to store media object: {}", e)))?;
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

pub fn from_config(config: &MediaConfig) -> Arc<dyn ObjectStorage> {
    Arc::new(FsObjectStorage::new(
        config.dir.clone(),
        config.public_base_url.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsObjectStorage::new(dir.path(), "/media".to_string());

        let url = storage.store("avatar.PNG", vec![1, 2, 3]).await.unwrap();
        assert!(url.starts_with("/media/"));
        assert!(url.ends_with(".png"));

        let key = url.rsplit_once('/').unwrap().1;
        let bytes = tokio::fs::read(dir.path().join(key)).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_object_key_rejects_odd_extensions() {
        assert!(!FsObjectStorage::object_key("x.tar.gz/../evil").contains('/'));
        assert!(!FsObjectStorage::object_key("no-extension").contains('.'));
    }
}
