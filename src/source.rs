use crate::collaborators::{PreparedSource, SourcePreview};
use crate::error::{PreviewError, Result};
use crate::file::{PreviewUri, normalize_extension};
use crate::languages::LanguageCatalog;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const EDITOR_SHELL_HTML: &str = include_str!("assets/editor.html");
const EDITOR_DIR: &str = "editor";
const EDITOR_PAGE: &str = "index.html";

/// Points the renderer at the editor shell page; content arrives later as commands.
///
/// Without a configured shell, the bundled page is written into the workspace.
#[derive(Clone)]
pub struct EditorSourcePreview {
    editor_shell: Option<PathBuf>,
    languages: Arc<dyn LanguageCatalog>,
}

impl EditorSourcePreview {
    pub fn new(editor_shell: Option<PathBuf>, languages: Arc<dyn LanguageCatalog>) -> Self {
        Self {
            editor_shell,
            languages,
        }
    }

    fn shell_page(&self, workspace: &Path) -> Result<PathBuf> {
        if let Some(shell) = &self.editor_shell {
            if !shell.is_file() {
                return Err(PreviewError::Source(format!(
                    "editor shell {} does not exist",
                    shell.display()
                )));
            }
            return Ok(shell.clone());
        }

        let page = workspace.join(EDITOR_DIR).join(EDITOR_PAGE);
        if !page.is_file() {
            std::fs::create_dir_all(workspace.join(EDITOR_DIR))?;
            std::fs::write(&page, EDITOR_SHELL_HTML)?;
            debug!("wrote editor shell to {}", page.display());
        }
        Ok(page)
    }
}

impl SourcePreview for EditorSourcePreview {
    fn prepare(
        &self,
        text: &str,
        extension: &str,
        reformat: bool,
        workspace: &Path,
    ) -> Result<PreparedSource> {
        let extension = normalize_extension(extension);
        let language = self.languages.language_for(&extension).ok_or_else(|| {
            PreviewError::Source(format!("no editor language for extension '{extension}'"))
        })?;

        let text = if reformat {
            try_format(text, language)
        } else {
            text.to_string()
        };

        Ok(PreparedSource {
            uri: PreviewUri::from_path(&self.shell_page(workspace)?)?,
            language: language.to_string(),
            text,
        })
    }
}

fn try_format(text: &str, language: &str) -> String {
    match language {
        "json" => match serde_json::from_str::<serde_json::Value>(text)
            .and_then(|value| serde_json::to_string_pretty(&value))
        {
            Ok(pretty) => pretty,
            Err(err) => {
                debug!("keeping unformatted json: {err}");
                text.to_string()
            }
        },
        _ => text.to_string(),
    }
}
