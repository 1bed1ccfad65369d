pub mod collaborators;
pub mod command;
pub mod dispatcher;
pub mod error;
pub mod file;
pub mod languages;
pub mod previewer;
pub mod protocol;
pub mod render;
pub mod settings;
pub mod source;
pub mod strategy;
pub mod workspace;

pub use error::{PreviewError, Result};
pub use previewer::{Collaborators, WebBrowserPreviewer};
