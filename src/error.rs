use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("preview load cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("markdown error: {0}")]
    Markdown(String),

    #[error("source preview error: {0}")]
    Source(String),

    #[error("invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("dispatcher error: {0}")]
    Dispatcher(String),

    #[error("settings error: {0}")]
    Settings(String),
}

impl PreviewError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, PreviewError>;
