use crate::error::{PreviewError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "peek-web-preview";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewSettings {
    pub source_code_wrap_text: bool,
    pub source_code_try_format: bool,
    pub base_theme: Option<String>,
    pub editor_shell: Option<PathBuf>,
    pub temp_root: Option<PathBuf>,
}

impl PreviewSettings {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(|err| PreviewError::Settings(err.to_string()))
    }

    /// Missing files yield the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json_str(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(PreviewError::Settings(format!(
                "failed to read {}: {err}",
                path.display()
            ))),
        }
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR))
    }

    /// `None` selects the bundled editor page.
    pub fn editor_shell(&self) -> Option<&Path> {
        self.editor_shell.as_deref()
    }

    pub fn base_theme(&self) -> &str {
        self.base_theme.as_deref().unwrap_or("light")
    }
}
