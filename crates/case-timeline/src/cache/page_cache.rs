//! Content-addressed page cache
//!
//! Maps (content hash, 1-based page number) to extracted page text. Each hash
//! gets its own directory under the cache root:
//!
//! ```text
//! <root>/<sha256>/page_1.mmd
//! <root>/<sha256>/page_2.mmd
//! <root>/<sha256>/doc.mmd      (whole-document sentinel)
//! ```
//!
//! Entries are immutable once written: the first writer wins and later writes
//! for the same key are discarded. There is no eviction.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Error, Result};

const DOCUMENT_ENTRY: &str = "doc.mmd";

/// SHA-256 of raw file bytes, lowercase hex
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// On-disk page cache
#[derive(Debug, Clone)]
pub struct PageCache {
    root: PathBuf,
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageCacheStats {
    /// Number of hash directories
    pub documents: usize,
    /// Number of cached pages across all documents
    pub pages: usize,
    /// Number of whole-document sentinels
    pub complete_documents: usize,
}

impl PageCache {
    /// Open (and create) a cache rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!("Page cache opened at {}", root.display());
        Ok(Self { root })
    }

    /// Cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up the text of one page
    pub async fn lookup(&self, hash: &str, page: u32) -> Result<Option<String>> {
        let path = self.page_path(hash, page)?;
        read_optional(&path).await
    }

    /// Store the text of one page; returns the value that is now cached
    pub async fn store(&self, hash: &str, page: u32, text: &str) -> Result<String> {
        let path = self.page_path(hash, page)?;
        self.write_once(hash, &path, text).await
    }

    /// Look up the whole-document sentinel
    pub async fn lookup_document(&self, hash: &str) -> Result<Option<String>> {
        let path = self.document_dir(hash)?.join(DOCUMENT_ENTRY);
        read_optional(&path).await
    }

    /// Store the whole-document sentinel; returns the value that is now cached
    pub async fn store_document(&self, hash: &str, text: &str) -> Result<String> {
        let path = self.document_dir(hash)?.join(DOCUMENT_ENTRY);
        self.write_once(hash, &path, text).await
    }

    /// Count cached documents and pages
    pub async fn stats(&self) -> Result<PageCacheStats> {
        let mut stats = PageCacheStats::default();
        let mut dirs = tokio::fs::read_dir(&self.root).await?;

        while let Some(dir) = dirs.next_entry().await? {
            if !dir.file_type().await?.is_dir() {
                continue;
            }
            stats.documents += 1;

            let mut entries = tokio::fs::read_dir(dir.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name == DOCUMENT_ENTRY {
                    stats.complete_documents += 1;
                } else if name.starts_with("page_") && name.ends_with(".mmd") {
                    stats.pages += 1;
                }
            }
        }

        Ok(stats)
    }

    fn document_dir(&self, hash: &str) -> Result<PathBuf> {
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::internal(format!("Invalid content hash: {:?}", hash)));
        }
        Ok(self.root.join(hash))
    }

    fn page_path(&self, hash: &str, page: u32) -> Result<PathBuf> {
        if page == 0 {
            return Err(Error::internal("Page numbers are 1-based"));
        }
        Ok(self.document_dir(hash)?.join(format!("page_{}.mmd", page)))
    }

    /// Write through a temp file and hard-link it into place. Linking fails if
    /// the target exists, which makes the first writer win without torn reads.
    async fn write_once(&self, hash: &str, target: &Path, text: &str) -> Result<String> {
        let dir = self.document_dir(hash)?;
        tokio::fs::create_dir_all(&dir).await?;

        let tmp = dir.join(format!(".{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, text).await?;

        let linked = tokio::fs::hard_link(&tmp, target).await;
        if let Err(e) = tokio::fs::remove_file(&tmp).await {
            tracing::debug!("Failed to remove temp file {}: {}", tmp.display(), e);
        }

        match linked {
            Ok(()) => Ok(text.to_string()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("Cache entry {} already present, keeping it", target.display());
                Ok(tokio::fs::read_to_string(target).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
