use crate::error::{PreviewError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// The file being previewed. Fixed for the lifetime of one previewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    path: PathBuf,
    extension: String,
}

impl FileRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(normalize_extension)
            .unwrap_or_default();

        Self { path, extension }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lower-cased and dot-prefixed, empty when the file has none.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub async fn storage_handle(&self) -> Result<StorageHandle> {
        let canonical = tokio::fs::canonicalize(&self.path)
            .await
            .map_err(|source| PreviewError::Read {
                path: self.path.clone(),
                source,
            })?;
        let metadata = tokio::fs::metadata(&canonical).await?;

        Ok(StorageHandle {
            path: canonical,
            len: metadata.len(),
            is_dir: metadata.is_dir(),
        })
    }
}

/// Resolved on-disk item handed to the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageHandle {
    pub path: PathBuf,
    pub len: u64,
    pub is_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewUri(String);

impl PreviewUri {
    pub fn from_path(path: &Path) -> Result<Self> {
        if path.as_os_str().is_empty() {
            return Err(PreviewError::InvalidPath(path.to_path_buf()));
        }

        let absolute =
            std::path::absolute(path).map_err(|_| PreviewError::InvalidPath(path.to_path_buf()))?;
        let raw = absolute.to_string_lossy().replace('\\', "/");

        let mut uri = String::with_capacity(raw.len() + 8);
        uri.push_str("file://");
        if !raw.starts_with('/') {
            uri.push('/');
        }
        for ch in raw.chars() {
            match ch {
                ' ' => uri.push_str("%20"),
                '%' => uri.push_str("%25"),
                '#' => uri.push_str("%23"),
                '?' => uri.push_str("%3F"),
                _ => uri.push(ch),
            }
        }

        Ok(Self(uri))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PreviewUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize_extension(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}
