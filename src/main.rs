use peek_web_preview::collaborators::Clipboard;
use peek_web_preview::file::{FileRef, StorageHandle};
use peek_web_preview::settings::PreviewSettings;
use peek_web_preview::{Collaborators, PreviewError, WebBrowserPreviewer};
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

struct NoClipboard;

impl Clipboard for NoClipboard {
    fn copy(&self, _handle: &StorageHandle) -> Result<(), PreviewError> {
        Err(PreviewError::Clipboard(String::from(
            "no clipboard available from the command line",
        )))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("peek_web_preview=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let mut settings_path: Option<PathBuf> = None;
    let mut target: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "--settings" => {
                let Some(path) = args.next() else {
                    return Err("--settings needs a file path".into());
                };
                settings_path = Some(PathBuf::from(path));
            }
            _ => target = Some(PathBuf::from(arg)),
        }
    }

    let Some(target) = target else {
        print_help();
        return Ok(());
    };

    let settings = match settings_path {
        Some(path) => PreviewSettings::load(&path)?,
        None => PreviewSettings::default(),
    };

    let file = FileRef::new(target);
    if !WebBrowserPreviewer::is_item_supported(file.extension()) {
        println!("{} is not handled by the web previewer", file.path().display());
        return Ok(());
    }

    let collaborators = Collaborators::with_defaults(&settings, Arc::new(NoClipboard));
    let previewer = WebBrowserPreviewer::new(file, settings, collaborators)?;

    previewer.load_preview(&CancellationToken::new()).await?;
    println!("{}", serde_json::to_string_pretty(&previewer.snapshot())?);
    if let Some(failure) = previewer.last_failure() {
        println!("failure: {failure}");
    }
    for command in previewer.drain_renderer_commands() {
        println!("{command}");
    }

    previewer.dispose().await;
    Ok(())
}

fn print_help() {
    println!("peek-web-preview [--settings settings.json] <path/to/file>");
    println!("Loads a web preview for the file and prints the resulting state and renderer commands.");
}
