use crate::collaborators::WorkspaceCleaner;
use crate::error::Result;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

static WORKSPACE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Scratch directory owned by one previewer. Created on first use, released once.
pub struct TempWorkspace {
    path: PathBuf,
    cleaner: Arc<dyn WorkspaceCleaner>,
    created: AtomicBool,
    released: AtomicBool,
}

impl TempWorkspace {
    pub fn new(root: &Path, cleaner: Arc<dyn WorkspaceCleaner>) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = WORKSPACE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{nanos}-{seq}", std::process::id());

        Self {
            path: root.join(name),
            cleaner,
            created: AtomicBool::new(false),
            released: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub async fn ensure(&self) -> Result<PathBuf> {
        if self.is_released() {
            return Err(std::io::Error::other(format!(
                "workspace {} was already released",
                self.path.display()
            ))
            .into());
        }

        tokio::fs::create_dir_all(&self.path).await?;
        self.created.store(true, Ordering::Release);
        Ok(self.path.clone())
    }

    /// Returns false when an earlier call already ran the cleanup.
    pub async fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }

        match self.cleaner.cleanup(&self.path).await {
            Ok(()) => debug!("released workspace {}", self.path.display()),
            Err(err) => warn!("failed to clean workspace {}: {err}", self.path.display()),
        }
        true
    }
}

impl Debug for TempWorkspace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempWorkspace")
            .field("path", &self.path)
            .field("created", &self.created.load(Ordering::Relaxed))
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::AcqRel) || !self.created.load(Ordering::Acquire) {
            return;
        }

        if let Err(err) = std::fs::remove_dir_all(&self.path)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            warn!(
                "failed to remove unreleased workspace {}: {err}",
                self.path.display()
            );
        }
    }
}
