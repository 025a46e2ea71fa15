//! Upload storage
//!
//! Uploaded images land in a flat directory named
//! `<unix-millis>-<original name>`. There is no deduplication or content
//! hashing; two identical names uploaded in the same millisecond collide.

use chrono::Utc;
use std::path::{Path, PathBuf};

/// URL prefix under which stored images are served
pub const UPLOADS_URL_PREFIX: &str = "uploads";

/// Longest sanitized name kept; leaves room for the timestamp prefix
/// within the usual 255-byte file name limit
pub const MAX_SANITIZED_NAME_LEN: usize = 200;

/// Longest suffix still treated as an extension when truncating
const MAX_EXTENSION_LEN: usize = 16;

/// A file written by [`UploadStore::save`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUpload {
    /// Location on disk
    pub path: PathBuf,
    /// Reference recorded as the detection's `imageUrl`
    pub url: String,
}

/// Directory-backed image storage
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a timestamped name derived from `original_name`
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<StoredUpload> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = format!("{}-{}", Utc::now().timestamp_millis(), sanitize_file_name(original_name));
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Upload stored");

        Ok(StoredUpload {
            path,
            url: format!("{}/{}", UPLOADS_URL_PREFIX, file_name),
        })
    }

    /// Remove a stored upload; a file that is already gone is not an error
    pub async fn discard(&self, upload: &StoredUpload) -> std::io::Result<()> {
        match tokio::fs::remove_file(&upload.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Reduce a client-supplied name to a safe single path component
///
/// Only the final component survives and characters outside
/// `[A-Za-z0-9._-]` become `_`. Empty or dot-only names become `upload`.
/// Names longer than [`MAX_SANITIZED_NAME_LEN`] are shortened, keeping the
/// extension.
pub fn sanitize_file_name(original_name: &str) -> String {
    let last_component = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = last_component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        return "upload".to_string();
    }

    truncate_keeping_extension(cleaned)
}

// Input is ASCII after cleaning, so byte offsets are char boundaries
fn truncate_keeping_extension(mut name: String) -> String {
    if name.len() <= MAX_SANITIZED_NAME_LEN {
        return name;
    }

    let extension = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_LEN => name[dot..].to_string(),
        _ => String::new(),
    };

    name.truncate(MAX_SANITIZED_NAME_LEN - extension.len());
    name.push_str(&extension);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_keeps_plain_names() {
        assert_eq!(sanitize_file_name("leaf-01.jpg"), "leaf-01.jpg");
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\leaf.png"), "leaf.png");
    }

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_file_name("my leaf (1).jpg"), "my_leaf__1_.jpg");
    }

    #[test]
    fn test_sanitize_empty_and_dot_names() {
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name("photos/"), "upload");
    }

    #[test]
    fn test_sanitize_caps_long_names_keeping_extension() {
        let name = sanitize_file_name(&format!("{}.jpg", "a".repeat(300)));
        assert_eq!(name.len(), MAX_SANITIZED_NAME_LEN);
        assert!(name.ends_with("aaa.jpg"));

        let no_extension = sanitize_file_name(&"b".repeat(300));
        assert_eq!(no_extension, "b".repeat(MAX_SANITIZED_NAME_LEN));
    }

    #[tokio::test]
    async fn test_save_accepts_very_long_client_names() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path());

        let stored = store.save(&format!("{}.jpg", "a".repeat(300)), b"jpeg").await.unwrap();

        assert!(stored.path.exists());
        assert!(stored.url.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_save_writes_timestamped_file() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path().join("uploads"));

        let stored = store.save("leaf.jpg", b"jpeg-bytes").await.unwrap();

        assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"jpeg-bytes");
        let file_name = stored.path.file_name().unwrap().to_string_lossy().to_string();
        let (millis, rest) = file_name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(rest, "leaf.jpg");
        assert_eq!(stored.url, format!("uploads/{}", file_name));
    }

    #[tokio::test]
    async fn test_discard_removes_file_and_tolerates_repeat() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path());
        let stored = store.save("leaf.png", b"png").await.unwrap();

        store.discard(&stored).await.unwrap();
        assert!(!stored.path.exists());
        store.discard(&stored).await.unwrap();
    }
}
