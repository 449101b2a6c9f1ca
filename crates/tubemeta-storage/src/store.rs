//! Upload seam used by the API server.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Somewhere bytes can be stored and served back from a public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key` and return its public URL.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<String>;

    /// Cheap reachability probe for readiness checks.
    async fn check(&self) -> StorageResult<()>;
}

/// Build a fresh object key: `{prefix}/{uuid}.{ext}`.
///
/// The extension is derived from the content type and the prefix must be a
/// plain path segment.
pub fn object_key(prefix: &str, content_type: &str) -> StorageResult<String> {
    if prefix.is_empty()
        || !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StorageError::InvalidKey(prefix.to_string()));
    }

    let ext = match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        other => return Err(StorageError::InvalidKey(format!("unsupported content type {}", other))),
    };

    Ok(format!("{}/{}.{}", prefix, Uuid::new_v4(), ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_shape() {
        let key = object_key("headshots", "image/jpeg").unwrap();
        assert!(key.starts_with("headshots/"));
        assert!(key.ends_with(".jpg"));
        assert_ne!(key, object_key("headshots", "image/jpeg").unwrap());
    }

    #[test]
    fn test_object_key_rejects_traversal() {
        assert!(object_key("../etc", "image/png").is_err());
        assert!(object_key("a/b", "image/png").is_err());
        assert!(object_key("", "image/png").is_err());
    }

    #[test]
    fn test_object_key_rejects_unknown_type() {
        assert!(object_key("thumbnails", "text/html").is_err());
    }
}
