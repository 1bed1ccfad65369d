use crate::file::normalize_extension;
use crate::languages::LanguageCatalog;
use serde::{Deserialize, Serialize};

const SUPPORTED_FILE_TYPES: &[&str] = &[".html", ".htm", ".pdf", ".md"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    DirectRender,
    Markdown,
    SourceEditor,
}

impl Strategy {
    pub fn is_dev_file_preview(self) -> bool {
        matches!(self, Self::SourceEditor)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DirectRender => "direct_render",
            Self::Markdown => "markdown",
            Self::SourceEditor => "source_editor",
        }
    }
}

pub fn resolve(extension: &str, catalog: &dyn LanguageCatalog) -> Strategy {
    let extension = normalize_extension(extension);
    let is_html = extension == ".html" || extension == ".htm";
    let is_markdown = extension == ".md";

    if catalog.is_supported(&extension) && !is_html && !is_markdown {
        Strategy::SourceEditor
    } else if is_markdown {
        Strategy::Markdown
    } else {
        Strategy::DirectRender
    }
}

/// Tells the host whether a web previewer should be created for this extension at all.
pub fn is_item_supported(extension: &str, catalog: &dyn LanguageCatalog) -> bool {
    let extension = normalize_extension(extension);
    SUPPORTED_FILE_TYPES.contains(&extension.as_str()) || catalog.is_supported(&extension)
}
