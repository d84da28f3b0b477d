//! Artifact Store
//!
//! Hands rendered HTML from `fetch_page` to a later `summarize_page` call
//! through the filesystem, so the handoff survives process restarts.
//!
//! The default slot is one fixed file; every successful fetch overwrites it.
//! Callers may also pass a correlation key, which maps to its own slot file
//! named after a digest of the key.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ArtifactError;

/// Hex characters of the key digest used in keyed slot names
const KEY_DIGEST_LEN: usize = 16;

/// Rendered HTML read back from a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArtifact {
    pub path: PathBuf,
    pub html: String,
}

/// Filesystem-backed single-slot (plus keyed slots) page store
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    name: String,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the slot for `key`, or of the default slot when `key` is None.
    pub fn location(&self, key: Option<&str>) -> PathBuf {
        match key {
            None => self.dir.join(&self.name),
            Some(key) => self.dir.join(self.keyed_name(key)),
        }
    }

    fn keyed_name(&self, key: &str) -> String {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        let path = Path::new(&self.name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name);
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("html");
        format!("{}-{}.{}", stem, &digest[..KEY_DIGEST_LEN], ext)
    }

    /// Replace the slot's content with `html`.
    ///
    /// Written to a sibling temp file first and renamed into place, so a
    /// reader sees either the previous page or the new one.
    pub async fn save(&self, key: Option<&str>, html: &str) -> Result<PathBuf, ArtifactError> {
        let path = self.location(key);
        let write_err = |source| ArtifactError::Write {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(write_err)?;

        let staging = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&staging, html.as_bytes()).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(write_err(e));
        }
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(write_err(e));
        }

        debug!("Saved {} bytes to {}", html.len(), path.display());
        Ok(path)
    }

    /// Read the slot. A missing slot is `Ok(None)`, not an error.
    pub async fn load(&self, key: Option<&str>) -> Result<Option<PageArtifact>, ArtifactError> {
        let path = self.location(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(html) => Ok(Some(PageArtifact { path, html })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ArtifactError::Read { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (ArtifactStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path(), "page.html");
        (store, temp)
    }

    #[tokio::test]
    async fn test_load_missing_slot_is_none() {
        let (store, _temp) = store();
        assert_eq!(store.load(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_page() {
        let (store, _temp) = store();
        store.save(None, "<p>first</p>").await.unwrap();
        let path = store.save(None, "<p>second</p>").await.unwrap();

        let artifact = store.load(None).await.unwrap().unwrap();
        assert_eq!(artifact.html, "<p>second</p>");
        assert_eq!(artifact.path, path);
    }

    #[tokio::test]
    async fn test_save_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path().join("nested").join("dir"), "page.html");
        store.save(None, "<p>hi</p>").await.unwrap();
        assert!(store.location(None).exists());
    }

    #[tokio::test]
    async fn test_save_leaves_no_staging_files() {
        let (store, temp) = store();
        store.save(None, "<p>hi</p>").await.unwrap();
        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["page.html".to_string()]);
    }

    #[tokio::test]
    async fn test_keyed_slots_are_independent() {
        let (store, _temp) = store();
        store.save(Some("https://a.example"), "<p>a</p>").await.unwrap();
        store.save(Some("https://b.example"), "<p>b</p>").await.unwrap();

        let a = store.load(Some("https://a.example")).await.unwrap().unwrap();
        let b = store.load(Some("https://b.example")).await.unwrap().unwrap();
        assert_eq!(a.html, "<p>a</p>");
        assert_eq!(b.html, "<p>b</p>");
        assert_eq!(store.load(None).await.unwrap(), None);
    }

    #[test]
    fn test_keyed_location_is_stable_and_safe() {
        let store = ArtifactStore::new("/tmp", "page.html");
        let first = store.location(Some("../../etc/passwd"));
        let second = store.location(Some("../../etc/passwd"));
        assert_eq!(first, second);
        assert_eq!(first.parent(), Some(Path::new("/tmp")));

        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("page-"));
        assert!(name.ends_with(".html"));
        assert_eq!(name.len(), "page-".len() + KEY_DIGEST_LEN + ".html".len());
    }
}
