use crate::file::PreviewUri;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSize {
    pub monitor_size: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSnapshot {
    pub state: PreviewState,
    pub preview: Option<PreviewUri>,
    pub is_dev_file_preview: bool,
    pub pending_commands: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreviewEvent {
    StateChanged { state: PreviewState },
    PreviewChanged { uri: Option<PreviewUri> },
    DevFilePreviewChanged { enabled: bool },
    CommandsQueued { count: usize },
    Disposed,
}

impl PreviewEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "state_changed",
            Self::PreviewChanged { .. } => "preview_changed",
            Self::DevFilePreviewChanged { .. } => "dev_file_preview_changed",
            Self::CommandsQueued { .. } => "commands_queued",
            Self::Disposed => "disposed",
        }
    }
}
