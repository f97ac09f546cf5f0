//! Binary object storage for uploaded photos.
//!
//! The store owns the raw bytes on disk and nothing else: metadata lives
//! in the catalog. `put` validates before it writes (nothing is ever
//! partially persisted) and `delete` is idempotent so callers can retry
//! or compensate without special-casing an already-missing object.

use rand::Rng;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Public URL prefix uploaded objects are served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unsupported file type: {0}. Please upload an image file.")]
    UnsupportedType(String),

    #[error("File is too large ({size} bytes, maximum is {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reference to a stored object: the storage key and the public path
/// it can be fetched at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub filename: String,
    pub public_path: String,
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    max_bytes: u64,
}

impl MediaStore {
    pub fn new(root: PathBuf, max_bytes: u64) -> Self {
        Self { root, max_bytes }
    }

    /// Directory objects are written to (served statically at `/uploads`).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate and durably write an uploaded object.
    ///
    /// Only `image/*` MIME types are accepted, and only up to the
    /// configured size limit; both checks run before any bytes touch
    /// disk. The generated name is time-based with a random suffix, so
    /// concurrent uploads in the same millisecond cannot collide.
    pub async fn put(&self, bytes: &[u8], mime: &str) -> Result<ObjectRef, StoreError> {
        if !mime.starts_with("image/") {
            return Err(StoreError::UnsupportedType(mime.to_string()));
        }

        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(StoreError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }

        let filename = generate_filename(mime);
        let dest = self.root.join(&filename);
        if let Err(e) = tokio::fs::write(&dest, bytes).await {
            // An interrupted write (disk full, I/O error) can leave a
            // partial file behind with no record pointing at it.
            if let Err(cleanup) = tokio::fs::remove_file(&dest).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        filename = %filename,
                        "Failed to remove partially written object: {}",
                        cleanup
                    );
                }
            }
            return Err(StoreError::Io(e));
        }

        debug!(filename = %filename, size, "Stored uploaded object");

        Ok(ObjectRef {
            public_path: format!("{}/{}", PUBLIC_PREFIX, filename),
            filename,
        })
    }

    /// Remove an object. Deleting an object that no longer exists is
    /// not an error.
    pub async fn delete(&self, filename: &str) -> Result<(), StoreError> {
        let target = self.root.join(filename);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => {
                debug!(filename = %filename, "Deleted stored object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(filename = %filename, "Object already absent on delete");
                Ok(())
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Millisecond timestamp plus a short random suffix, with the extension
/// implied by the MIME type.
fn generate_filename(mime: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: [u8; 3] = rand::rng().random();
    format!("{}-{}{}", millis, hex::encode(suffix), extension_for(mime))
}

fn extension_for(mime: &str) -> String {
    let ext = match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("bin"),
    };
    format!(".{}", ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u64 = 5 * 1024 * 1024;

    fn store() -> (tempfile::TempDir, MediaStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = MediaStore::new(tmp.path().to_path_buf(), MAX);
        (tmp, store)
    }

    fn dir_entries(path: &Path) -> usize {
        std::fs::read_dir(path).unwrap().count()
    }

    #[tokio::test]
    async fn test_put_writes_object() {
        let (tmp, store) = store();
        let obj = store.put(b"not really a jpeg", "image/jpeg").await.unwrap();

        assert!(obj.filename.ends_with(".jpg"));
        assert_eq!(obj.public_path, format!("/uploads/{}", obj.filename));
        assert!(tmp.path().join(&obj.filename).is_file());
    }

    #[tokio::test]
    async fn test_put_rejects_non_image_before_writing() {
        let (tmp, store) = store();
        let err = store.put(b"hello", "text/plain").await.unwrap_err();

        assert!(matches!(err, StoreError::UnsupportedType(_)));
        assert_eq!(dir_entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_put_rejects_oversized_before_writing() {
        let (tmp, store) = store();
        let big = vec![0u8; (MAX + 1) as usize];
        let err = store.put(&big, "image/png").await.unwrap_err();

        assert!(matches!(err, StoreError::TooLarge { .. }));
        assert_eq!(dir_entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_put_accepts_exactly_max_size() {
        let (_tmp, store) = store();
        let exact = vec![0u8; MAX as usize];
        assert!(store.put(&exact, "image/png").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (tmp, store) = store();
        let obj = store.put(b"bytes", "image/gif").await.unwrap();

        store.delete(&obj.filename).await.unwrap();
        assert!(!tmp.path().join(&obj.filename).exists());

        // Second delete of the same object is still Ok
        store.delete(&obj.filename).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_write_persists_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        // Root is a regular file, so every write under it fails
        let bogus_root = tmp.path().join("not-a-directory");
        std::fs::write(&bogus_root, b"occupied").unwrap();
        let store = MediaStore::new(bogus_root.clone(), MAX);

        let err = store.put(b"bytes", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(bogus_root.is_file());
        assert_eq!(dir_entries(tmp.path()), 1);
    }

    #[tokio::test]
    async fn test_generated_names_do_not_collide() {
        let (_tmp, store) = store();
        let a = store.put(b"a", "image/jpeg").await.unwrap();
        let b = store.put(b"b", "image/jpeg").await.unwrap();
        assert_ne!(a.filename, b.filename);
    }
}
