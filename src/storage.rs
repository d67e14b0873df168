//! File storage buckets for venue images and avatars.
//!
//! DESIGN
//! ======
//! Uploads go through [`ObjectStorage`], which returns the public URL of the
//! stored object. The bundled implementation writes under `STORAGE_DIR` and
//! the router serves that directory at `/storage`, so a URL is simply
//! `{PUBLIC_BASE_URL}/storage/{bucket}/{path}`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    VenueImages,
    Avatars,
}

impl Bucket {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VenueImages => "venue-images",
            Self::Avatars => "avatars",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),
    #[error("file too large: {0} bytes")]
    TooLarge(usize),
    #[error("empty file")]
    Empty,
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `bucket/path` and return its public URL.
    async fn upload(&self, bucket: Bucket, path: &str, bytes: &[u8]) -> Result<String, StorageError>;
}

/// Check an image upload and return the file extension to store it under.
///
/// # Errors
///
/// Rejects empty files, files over [`MAX_UPLOAD_BYTES`], and anything that is
/// not JPEG, PNG or WebP.
pub fn image_extension(content_type: &str, len: usize) -> Result<&'static str, StorageError> {
    if len == 0 {
        return Err(StorageError::Empty);
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(StorageError::TooLarge(len));
    }
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        other => Err(StorageError::UnsupportedType(other.to_owned())),
    }
}

/// `{owner}/{random}.{ext}` so objects never collide or overwrite each other.
#[must_use]
pub fn object_path(owner: Uuid, extension: &str) -> String {
    format!("{owner}/{}.{extension}", Uuid::new_v4())
}

fn safe_relative_path(path: &str) -> Result<PathBuf, StorageError> {
    let candidate = Path::new(path);
    if path.is_empty() || !candidate.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(StorageError::InvalidPath(path.to_owned()));
    }
    Ok(candidate.to_path_buf())
}

/// Local-disk buckets under a root directory.
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    #[must_use]
    pub fn new(root: PathBuf, public_base_url: &str) -> Self {
        Self { root, public_base_url: public_base_url.trim_end_matches('/').to_owned() }
    }

    #[must_use]
    pub fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!("{}/storage/{}/{path}", self.public_base_url, bucket.as_str())
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, bucket: Bucket, path: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let relative = safe_relative_path(path)?;
        let full = self.root.join(bucket.as_str()).join(relative);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;
        tracing::debug!(bucket = bucket.as_str(), path, size = bytes.len(), "stored object");
        Ok(self.public_url(bucket, path))
    }
}
