use crate::file::normalize_extension;

/// Extensions the code editor can show, with the editor's language-mode id.
pub trait LanguageCatalog: Send + Sync {
    fn language_for(&self, extension: &str) -> Option<&'static str>;

    fn is_supported(&self, extension: &str) -> bool {
        self.language_for(extension).is_some()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EditorLanguages;

impl LanguageCatalog for EditorLanguages {
    fn language_for(&self, extension: &str) -> Option<&'static str> {
        editor_language(&normalize_extension(extension))
    }
}

fn editor_language(extension: &str) -> Option<&'static str> {
    let language = match extension {
        ".bat" | ".cmd" => "bat",
        ".c" | ".h" => "c",
        ".cpp" | ".cc" | ".cxx" | ".hpp" | ".hh" => "cpp",
        ".cs" | ".csx" => "csharp",
        ".css" => "css",
        ".dart" => "dart",
        ".dockerfile" => "dockerfile",
        ".fs" | ".fsi" | ".fsx" => "fsharp",
        ".go" => "go",
        ".graphql" | ".gql" => "graphql",
        ".htm" | ".html" | ".xhtml" => "html",
        ".ini" | ".cfg" | ".inf" => "ini",
        ".java" => "java",
        ".js" | ".mjs" | ".cjs" | ".jsx" => "javascript",
        ".json" | ".jsonc" => "json",
        ".kt" | ".kts" => "kotlin",
        ".less" => "less",
        ".lua" => "lua",
        ".md" | ".markdown" => "markdown",
        ".m" => "objective-c",
        ".php" => "php",
        ".ps1" | ".psm1" | ".psd1" => "powershell",
        ".py" | ".pyw" => "python",
        ".r" => "r",
        ".rb" => "ruby",
        ".rs" => "rust",
        ".scss" => "scss",
        ".sh" | ".bash" | ".zsh" => "shell",
        ".sql" => "sql",
        ".swift" => "swift",
        ".toml" => "ini",
        ".ts" | ".tsx" | ".mts" | ".cts" => "typescript",
        ".txt" | ".log" => "plaintext",
        ".vb" => "vb",
        ".xml" | ".xaml" | ".csproj" | ".svg" => "xml",
        ".yaml" | ".yml" => "yaml",
        _ => return None,
    };

    Some(language)
}
