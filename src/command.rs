use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorTheme {
    Light,
    Dark,
}

impl EditorTheme {
    /// `base_theme` is the host's theme label, matched against "dark" ignoring case.
    pub fn from_base_theme(base_theme: &str) -> Self {
        if base_theme.trim().eq_ignore_ascii_case("dark") {
            Self::Dark
        } else {
            Self::Light
        }
    }

    pub fn editor_id(self) -> &'static str {
        match self {
            Self::Light => "vs",
            Self::Dark => "vs-dark",
        }
    }
}

/// Instruction for the embedded editor. Apply in enqueue order, once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RendererCommand {
    SetContent(String),
    SetLanguage(String),
    SetWordWrap(bool),
    SetTheme(EditorTheme),
}

impl RendererCommand {
    pub fn script(&self) -> String {
        match self {
            Self::SetContent(text) => {
                format!("editor.setValue(\"{}\");", escape_script_string(text))
            }
            Self::SetLanguage(language) => format!(
                "monaco.editor.setModelLanguage(editor.getModel(), \"{}\");",
                escape_script_string(language)
            ),
            Self::SetWordWrap(wrap) => format!(
                "editor.updateOptions({{\"wordWrap\": \"{}\"}});",
                if *wrap { "on" } else { "off" }
            ),
            Self::SetTheme(theme) => format!(
                "editor.updateOptions({{\"theme\": \"{}\"}});",
                theme.editor_id()
            ),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetContent(_) => "set_content",
            Self::SetLanguage(_) => "set_language",
            Self::SetWordWrap(_) => "set_word_wrap",
            Self::SetTheme(_) => "set_theme",
        }
    }
}

impl Display for RendererCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.script())
    }
}

pub fn escape_script_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn unescape_script_string(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<RendererCommand>,
}

impl CommandQueue {
    pub fn extend(&mut self, commands: impl IntoIterator<Item = RendererCommand>) {
        self.pending.extend(commands);
    }

    pub fn drain(&mut self) -> Vec<RendererCommand> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
