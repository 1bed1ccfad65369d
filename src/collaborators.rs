use crate::error::{PreviewError, Result};
use crate::file::{PreviewUri, StorageHandle};
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait FileReader: Send + Sync {
    async fn read(&self, path: &Path) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub uri: PreviewUri,
    pub language: String,
    pub text: String,
}

pub trait SourcePreview: Send + Sync {
    /// `workspace` is an existing directory the preparer may write its page into.
    fn prepare(
        &self,
        text: &str,
        extension: &str,
        reformat: bool,
        workspace: &Path,
    ) -> Result<PreparedSource>;
}

pub trait MarkdownWriter: Send + Sync {
    /// Writes an HTML rendering of `markdown` into `workspace` and returns its URI.
    fn render_to_temp_file(
        &self,
        markdown: &str,
        original: &Path,
        workspace: &Path,
    ) -> Result<PreviewUri>;
}

pub trait ThemeProvider: Send + Sync {
    fn base_theme(&self) -> String;
}

pub trait Clipboard: Send + Sync {
    fn copy(&self, handle: &StorageHandle) -> Result<()>;
}

/// Must succeed when the directory is already gone.
#[async_trait]
pub trait WorkspaceCleaner: Send + Sync {
    async fn cleanup(&self, dir: &Path) -> std::io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileReader;

#[async_trait]
impl FileReader for TokioFileReader {
    async fn read(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| PreviewError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[derive(Debug, Clone)]
pub struct StaticTheme(pub String);

impl ThemeProvider for StaticTheme {
    fn base_theme(&self) -> String {
        self.0.clone()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveDirCleaner;

#[async_trait]
impl WorkspaceCleaner for RemoveDirCleaner {
    async fn cleanup(&self, dir: &Path) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}
