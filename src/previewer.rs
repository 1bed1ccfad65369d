use crate::collaborators::{
    Clipboard, FileReader, MarkdownWriter, RemoveDirCleaner, SourcePreview, StaticTheme,
    ThemeProvider, TokioFileReader, WorkspaceCleaner,
};
use crate::command::{CommandQueue, EditorTheme, RendererCommand};
use crate::dispatcher::UiDispatcher;
use crate::error::{PreviewError, Result};
use crate::file::{FileRef, PreviewUri};
use crate::languages::{EditorLanguages, LanguageCatalog};
use crate::protocol::{PreviewEvent, PreviewSize, PreviewSnapshot, PreviewState};
use crate::render::HtmlMarkdownWriter;
use crate::settings::PreviewSettings;
use crate::source::EditorSourcePreview;
use crate::strategy::{self, Strategy};
use crate::workspace::TempWorkspace;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const UI_THREAD_NAME: &str = "peek-ui";

/// External services the previewer delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub reader: Arc<dyn FileReader>,
    pub source: Arc<dyn SourcePreview>,
    pub markdown: Arc<dyn MarkdownWriter>,
    pub theme: Arc<dyn ThemeProvider>,
    pub clipboard: Arc<dyn Clipboard>,
    pub languages: Arc<dyn LanguageCatalog>,
    pub cleaner: Arc<dyn WorkspaceCleaner>,
}

impl Collaborators {
    /// Built-in implementations for everything except the clipboard, which belongs to the host.
    pub fn with_defaults(settings: &PreviewSettings, clipboard: Arc<dyn Clipboard>) -> Self {
        let languages: Arc<dyn LanguageCatalog> = Arc::new(EditorLanguages);
        Self {
            reader: Arc::new(TokioFileReader),
            source: Arc::new(EditorSourcePreview::new(
                settings.editor_shell().map(Path::to_path_buf),
                languages.clone(),
            )),
            markdown: Arc::new(HtmlMarkdownWriter::default()),
            theme: Arc::new(StaticTheme(settings.base_theme().to_string())),
            clipboard,
            languages,
            cleaner: Arc::new(RemoveDirCleaner),
        }
    }
}

/// Everything a strategy produces, applied in one step once it has fully succeeded.
struct PreparedDisplay {
    uri: PreviewUri,
    commands: Vec<RendererCommand>,
}

#[derive(Debug, Default)]
struct PreviewModel {
    state: PreviewState,
    preview: Option<PreviewUri>,
    is_dev_file_preview: bool,
    commands: CommandQueue,
    last_failure: Option<String>,
}

struct PreviewerInner {
    file: FileRef,
    settings: PreviewSettings,
    collaborators: Collaborators,
    dispatcher: UiDispatcher,
    workspace: TempWorkspace,
    model: Mutex<PreviewModel>,
    events: broadcast::Sender<PreviewEvent>,
    load_gate: tokio::sync::Mutex<()>,
}

/// Previews one file through the embedded browser surface.
#[derive(Clone)]
pub struct WebBrowserPreviewer {
    inner: Arc<PreviewerInner>,
}

impl WebBrowserPreviewer {
    pub fn new(
        file: FileRef,
        settings: PreviewSettings,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let dispatcher = UiDispatcher::new(UI_THREAD_NAME)?;
        Ok(Self::with_dispatcher(
            file,
            settings,
            collaborators,
            dispatcher,
        ))
    }

    pub fn with_dispatcher(
        file: FileRef,
        settings: PreviewSettings,
        collaborators: Collaborators,
        dispatcher: UiDispatcher,
    ) -> Self {
        let workspace = TempWorkspace::new(&settings.temp_root(), collaborators.cleaner.clone());
        let (events, _receiver) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(PreviewerInner {
                file,
                settings,
                collaborators,
                dispatcher,
                workspace,
                model: Mutex::new(PreviewModel::default()),
                events,
                load_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Checks against the built-in language catalog.
    pub fn is_item_supported(extension: &str) -> bool {
        strategy::is_item_supported(extension, &EditorLanguages)
    }

    pub fn file(&self) -> &FileRef {
        &self.inner.file
    }

    pub async fn get_preview_size(&self, _cancellation: &CancellationToken) -> PreviewSize {
        PreviewSize::default()
    }

    /// Concurrent calls are serialized; each one runs to completion before the next starts.
    pub async fn load_preview(&self, cancellation: &CancellationToken) -> Result<()> {
        if cancellation.is_cancelled() {
            return Err(PreviewError::Cancelled);
        }

        let _gate = self.inner.load_gate.lock().await;
        if cancellation.is_cancelled() {
            return Err(PreviewError::Cancelled);
        }

        self.inner.set_state(PreviewState::Loading);
        let loaded = self.load_display_info(cancellation).await?;
        if cancellation.is_cancelled() {
            return Err(PreviewError::Cancelled);
        }

        if loaded {
            info!("loaded preview for {}", self.inner.file.path().display());
            self.inner.set_state(PreviewState::Loaded);
        } else {
            self.inner.set_preview(None);
            self.inner.set_dev_file_preview(false);
            self.inner.set_state(PreviewState::Error);
        }

        Ok(())
    }

    /// `Ok(false)` means the preview could not be produced; see [`Self::last_failure`].
    pub async fn load_display_info(&self, cancellation: &CancellationToken) -> Result<bool> {
        if cancellation.is_cancelled() {
            return Err(PreviewError::Cancelled);
        }

        let inner = self.inner.clone();
        let token = cancellation.clone();
        let outcome = self
            .inner
            .dispatcher
            .run(move || async move { inner.display(&token).await })
            .await
            .and_then(|result| result);

        match outcome {
            Ok(()) => {
                self.inner.model().last_failure = None;
                Ok(true)
            }
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                warn!(
                    "failed to load preview for {}: {err}",
                    self.inner.file.path().display()
                );
                self.inner.model().last_failure = Some(err.to_string());
                Ok(false)
            }
        }
    }

    pub async fn copy(&self) -> Result<()> {
        let inner = self.inner.clone();
        self.inner
            .dispatcher
            .run(move || async move {
                let handle = inner.file.storage_handle().await?;
                inner.collaborators.clipboard.copy(&handle)
            })
            .await?
    }

    /// Releases the temp workspace. Safe to call any number of times.
    pub async fn dispose(&self) {
        if self.inner.workspace.release().await {
            let _ = self.inner.events.send(PreviewEvent::Disposed);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.workspace.is_released()
    }

    pub fn state(&self) -> PreviewState {
        self.inner.model().state
    }

    pub fn preview(&self) -> Option<PreviewUri> {
        self.inner.model().preview.clone()
    }

    pub fn is_dev_file_preview(&self) -> bool {
        self.inner.model().is_dev_file_preview
    }

    pub fn is_preview_loaded(&self) -> bool {
        self.inner.model().preview.is_some()
    }

    pub fn last_failure(&self) -> Option<String> {
        self.inner.model().last_failure.clone()
    }

    pub fn snapshot(&self) -> PreviewSnapshot {
        let model = self.inner.model();
        PreviewSnapshot {
            state: model.state,
            preview: model.preview.clone(),
            is_dev_file_preview: model.is_dev_file_preview,
            pending_commands: model.commands.len(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PreviewEvent> {
        self.inner.events.subscribe()
    }

    /// Hands queued renderer commands to the host once the renderer is ready.
    pub fn drain_renderer_commands(&self) -> Vec<RendererCommand> {
        self.inner.model().commands.drain()
    }

    pub fn pending_command_count(&self) -> usize {
        self.inner.model().commands.len()
    }

    pub fn workspace_path(&self) -> &Path {
        self.inner.workspace.path()
    }
}

impl PreviewerInner {
    fn model(&self) -> MutexGuard<'_, PreviewModel> {
        self.model
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn display(&self, cancellation: &CancellationToken) -> Result<()> {
        ensure_active(cancellation)?;

        let strategy =
            strategy::resolve(self.file.extension(), self.collaborators.languages.as_ref());
        debug!(
            "previewing {} with {}",
            self.file.path().display(),
            strategy.name()
        );

        let prepared = match strategy {
            Strategy::SourceEditor => self.prepare_source(cancellation).await?,
            Strategy::Markdown => self.prepare_markdown(cancellation).await?,
            Strategy::DirectRender => PreparedDisplay {
                uri: PreviewUri::from_path(self.file.path())?,
                commands: Vec::new(),
            },
        };
        ensure_active(cancellation)?;

        self.set_dev_file_preview(strategy.is_dev_file_preview());
        self.set_preview(Some(prepared.uri));
        if !prepared.commands.is_empty() {
            self.enqueue_commands(prepared.commands);
        }
        Ok(())
    }

    async fn prepare_source(&self, cancellation: &CancellationToken) -> Result<PreparedDisplay> {
        let raw = self.collaborators.reader.read(self.file.path()).await?;
        ensure_active(cancellation)?;

        let workspace = self.workspace.ensure().await?;
        ensure_active(cancellation)?;

        let source = self.collaborators.source.prepare(
            &raw,
            self.file.extension(),
            self.settings.source_code_try_format,
            &workspace,
        )?;
        let theme = EditorTheme::from_base_theme(&self.collaborators.theme.base_theme());

        Ok(PreparedDisplay {
            uri: source.uri,
            commands: vec![
                RendererCommand::SetContent(source.text),
                RendererCommand::SetLanguage(source.language),
                RendererCommand::SetWordWrap(self.settings.source_code_wrap_text),
                RendererCommand::SetTheme(theme),
            ],
        })
    }

    async fn prepare_markdown(&self, cancellation: &CancellationToken) -> Result<PreparedDisplay> {
        let raw = self.collaborators.reader.read(self.file.path()).await?;
        ensure_active(cancellation)?;

        let workspace = self.workspace.ensure().await?;
        ensure_active(cancellation)?;

        let uri =
            self.collaborators
                .markdown
                .render_to_temp_file(&raw, self.file.path(), &workspace)?;

        Ok(PreparedDisplay {
            uri,
            commands: Vec::new(),
        })
    }

    fn set_state(&self, state: PreviewState) {
        let mut model = self.model();
        if model.state == state {
            return;
        }
        model.state = state;
        drop(model);
        let _ = self.events.send(PreviewEvent::StateChanged { state });
    }

    fn set_preview(&self, uri: Option<PreviewUri>) {
        let mut model = self.model();
        if model.preview == uri {
            return;
        }
        model.preview = uri.clone();
        drop(model);
        let _ = self.events.send(PreviewEvent::PreviewChanged { uri });
    }

    fn set_dev_file_preview(&self, enabled: bool) {
        let mut model = self.model();
        if model.is_dev_file_preview == enabled {
            return;
        }
        model.is_dev_file_preview = enabled;
        drop(model);
        let _ = self
            .events
            .send(PreviewEvent::DevFilePreviewChanged { enabled });
    }

    fn enqueue_commands(&self, commands: Vec<RendererCommand>) {
        let count = commands.len();
        self.model().commands.extend(commands);

        debug!("queued {count} renderer commands");
        let _ = self.events.send(PreviewEvent::CommandsQueued { count });
    }
}

fn ensure_active(cancellation: &CancellationToken) -> Result<()> {
    if cancellation.is_cancelled() {
        Err(PreviewError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Collaborators, WebBrowserPreviewer};
    use crate::collaborators::{
        Clipboard, FileReader, PreparedSource, RemoveDirCleaner, SourcePreview, ThemeProvider,
        TokioFileReader, WorkspaceCleaner,
    };
    use crate::command::{EditorTheme, RendererCommand, unescape_script_string};
    use crate::error::{PreviewError, Result};
    use crate::file::{FileRef, PreviewUri, StorageHandle};
    use crate::protocol::{PreviewEvent, PreviewState};
    use crate::settings::PreviewSettings;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct RecordingClipboard {
        copied: Mutex<Vec<StorageHandle>>,
    }

    impl Clipboard for RecordingClipboard {
        fn copy(&self, handle: &StorageHandle) -> Result<()> {
            self.copied.lock().expect("lock").push(handle.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingCleaner {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WorkspaceCleaner for CountingCleaner {
        async fn cleanup(&self, dir: &Path) -> std::io::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            RemoveDirCleaner.cleanup(dir).await
        }
    }

    struct BrokenSourcePreview;

    impl SourcePreview for BrokenSourcePreview {
        fn prepare(
            &self,
            _text: &str,
            _ext: &str,
            _reformat: bool,
            _workspace: &Path,
        ) -> Result<PreparedSource> {
            Err(PreviewError::Source(String::from("formatter crashed")))
        }
    }

    /// Panics the first time it is asked for a theme.
    #[derive(Default)]
    struct FlakyTheme {
        tripped: AtomicBool,
    }

    impl ThemeProvider for FlakyTheme {
        fn base_theme(&self) -> String {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                panic!("theme service unavailable");
            }
            String::from("dark")
        }
    }

    /// Cancels the load's token while the read is in flight.
    struct CancellingReader {
        token: CancellationToken,
    }

    #[async_trait]
    impl FileReader for CancellingReader {
        async fn read(&self, path: &Path) -> Result<String> {
            self.token.cancel();
            TokioFileReader.read(path).await
        }
    }

    struct Fixture {
        root: TempDir,
        settings: PreviewSettings,
        clipboard: Arc<RecordingClipboard>,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().expect("temp dir");
            let settings = PreviewSettings {
                temp_root: Some(root.path().join("workspaces")),
                ..PreviewSettings::default()
            };

            Self {
                root,
                settings,
                clipboard: Arc::new(RecordingClipboard::default()),
            }
        }

        fn write(&self, name: &str, contents: &str) -> PathBuf {
            let path = self.root.path().join(name);
            std::fs::write(&path, contents).expect("write fixture");
            path
        }

        fn collaborators(&self) -> Collaborators {
            Collaborators::with_defaults(&self.settings, self.clipboard.clone())
        }

        fn previewer(&self, path: PathBuf) -> WebBrowserPreviewer {
            self.previewer_with(path, self.collaborators())
        }

        fn previewer_with(
            &self,
            path: PathBuf,
            collaborators: Collaborators,
        ) -> WebBrowserPreviewer {
            WebBrowserPreviewer::new(FileRef::new(path), self.settings.clone(), collaborators)
                .expect("previewer")
        }
    }

    fn set_content_payload(command: &RendererCommand) -> String {
        let script = command.script();
        let escaped = script
            .strip_prefix("editor.setValue(\"")
            .and_then(|rest| rest.strip_suffix("\");"))
            .expect("set-content script shape");
        unescape_script_string(escaped)
    }

    #[tokio::test]
    async fn cancelled_load_changes_nothing() {
        let fixture = Fixture::new();
        let path = fixture.write("main.py", "print('hi')\n");
        let previewer = fixture.previewer(path);

        let token = CancellationToken::new();
        token.cancel();

        let result = previewer.load_preview(&token).await;
        assert!(matches!(result, Err(PreviewError::Cancelled)));
        assert_eq!(previewer.state(), PreviewState::Idle);
        assert_eq!(previewer.pending_command_count(), 0);
        assert!(previewer.preview().is_none());
    }

    #[tokio::test]
    async fn cancellation_during_read_commits_nothing() {
        let fixture = Fixture::new();
        let path = fixture.write("main.py", "print('hi')\n");
        let token = CancellationToken::new();
        let mut collaborators = fixture.collaborators();
        collaborators.reader = Arc::new(CancellingReader {
            token: token.clone(),
        });
        let previewer = fixture.previewer_with(path, collaborators);

        let result = previewer.load_preview(&token).await;
        assert!(matches!(result, Err(PreviewError::Cancelled)));
        assert_eq!(previewer.state(), PreviewState::Loading);
        assert_eq!(previewer.pending_command_count(), 0);
        assert!(previewer.preview().is_none());
        assert!(!previewer.is_dev_file_preview());
        assert!(previewer.last_failure().is_none());
    }

    #[tokio::test]
    async fn waiter_cancelled_behind_the_gate_changes_nothing() {
        let fixture = Fixture::new();
        let path = fixture.write("main.py", "print('hi')\n");
        let previewer = fixture.previewer(path);

        let gate = previewer.inner.load_gate.lock().await;
        let token = CancellationToken::new();
        let waiter = {
            let previewer = previewer.clone();
            let token = token.clone();
            tokio::spawn(async move { previewer.load_preview(&token).await })
        };
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        token.cancel();
        drop(gate);

        let result = waiter.await.expect("join");
        assert!(matches!(result, Err(PreviewError::Cancelled)));
        assert_eq!(previewer.state(), PreviewState::Idle);
        assert_eq!(previewer.pending_command_count(), 0);
        assert!(previewer.preview().is_none());
    }

    #[tokio::test]
    async fn panicking_collaborator_fails_one_load_only() {
        let fixture = Fixture::new();
        let path = fixture.write("tool.py", "x = 1\n");
        let mut collaborators = fixture.collaborators();
        collaborators.theme = Arc::new(FlakyTheme::default());
        let previewer = fixture.previewer_with(path, collaborators);

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("first load completes");
        assert_eq!(previewer.state(), PreviewState::Error);
        assert!(previewer.last_failure().is_some());

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("second load completes");
        assert_eq!(previewer.state(), PreviewState::Loaded);
        let commands = previewer.drain_renderer_commands();
        assert_eq!(commands.len(), 4);
        assert_eq!(commands[3], RendererCommand::SetTheme(EditorTheme::Dark));

        previewer.copy().await.expect("copy after recovery");
    }

    #[tokio::test]
    async fn html_is_rendered_directly_without_commands() {
        let fixture = Fixture::new();
        let path = fixture.write("page.html", "<script>alert(1)</script>");
        let previewer = fixture.previewer(path.clone());

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("load");

        assert_eq!(previewer.state(), PreviewState::Loaded);
        assert!(!previewer.is_dev_file_preview());
        assert_eq!(
            previewer.preview(),
            Some(PreviewUri::from_path(&path).expect("uri"))
        );
        assert!(previewer.drain_renderer_commands().is_empty());
    }

    #[tokio::test]
    async fn unknown_extension_falls_back_to_direct_render() {
        let fixture = Fixture::new();
        let path = fixture.write("data.xyz", "opaque");
        let previewer = fixture.previewer(path);

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("load");

        assert_eq!(previewer.state(), PreviewState::Loaded);
        assert!(!previewer.is_dev_file_preview());
        assert!(previewer.is_preview_loaded());
        assert_eq!(previewer.pending_command_count(), 0);
    }

    #[tokio::test]
    async fn source_file_queues_editor_commands_in_order() {
        let mut fixture = Fixture::new();
        fixture.settings.source_code_wrap_text = true;
        fixture.settings.base_theme = Some(String::from("DARK"));

        let text = "path = \"C:\\\\temp\\\\new\"\r\nprint(path)\n\tdone \\n\n";
        let path = fixture.write("script.py", text);
        let previewer = fixture.previewer(path);

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("load");

        assert_eq!(previewer.state(), PreviewState::Loaded);
        assert!(previewer.is_dev_file_preview());
        let shell = previewer.workspace_path().join("editor").join("index.html");
        assert!(shell.is_file());
        assert_eq!(
            previewer.preview(),
            Some(PreviewUri::from_path(&shell).expect("uri"))
        );

        let commands = previewer.drain_renderer_commands();
        let kinds: Vec<_> = commands.iter().map(RendererCommand::kind).collect();
        assert_eq!(
            kinds,
            ["set_content", "set_language", "set_word_wrap", "set_theme"]
        );
        assert_eq!(set_content_payload(&commands[0]), text);
        assert_eq!(commands[1], RendererCommand::SetLanguage(String::from("python")));
        assert_eq!(commands[2], RendererCommand::SetWordWrap(true));
        assert_eq!(commands[3], RendererCommand::SetTheme(EditorTheme::Dark));
        assert!(!commands[0].script().contains('\n'));

        assert!(previewer.drain_renderer_commands().is_empty());
    }

    #[tokio::test]
    async fn light_theme_and_no_wrap_by_default() {
        let fixture = Fixture::new();
        let path = fixture.write("lib.rs", "fn main() {}\n");
        let previewer = fixture.previewer(path);

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("load");

        let commands = previewer.drain_renderer_commands();
        assert_eq!(commands[1], RendererCommand::SetLanguage(String::from("rust")));
        assert_eq!(
            commands[2].script(),
            "editor.updateOptions({\"wordWrap\": \"off\"});"
        );
        assert_eq!(
            commands[3].script(),
            "editor.updateOptions({\"theme\": \"vs\"});"
        );
    }

    #[tokio::test]
    async fn markdown_is_written_into_the_workspace() {
        let fixture = Fixture::new();
        let path = fixture.write("notes.md", "# Notes\n\n<script>x()</script>\n");
        let previewer = fixture.previewer(path);

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("load");

        assert_eq!(previewer.state(), PreviewState::Loaded);
        assert!(!previewer.is_dev_file_preview());
        assert_eq!(previewer.pending_command_count(), 0);

        let workspace_uri = PreviewUri::from_path(previewer.workspace_path()).expect("uri");
        let artifact = previewer.preview().expect("artifact");
        assert!(artifact.as_str().starts_with(workspace_uri.as_str()));

        let written: Vec<_> = std::fs::read_dir(previewer.workspace_path())
            .expect("read workspace")
            .collect();
        assert_eq!(written.len(), 1);

        previewer.dispose().await;
        assert!(!previewer.workspace_path().exists());
    }

    #[tokio::test]
    async fn read_failure_ends_in_error_without_commands() {
        let fixture = Fixture::new();
        let previewer = fixture.previewer(fixture.root.path().join("missing.py"));

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("load completes");

        assert_eq!(previewer.state(), PreviewState::Error);
        assert_eq!(previewer.pending_command_count(), 0);
        assert!(previewer.preview().is_none());
        assert!(
            previewer
                .last_failure()
                .is_some_and(|failure| failure.contains("missing.py"))
        );
    }

    #[tokio::test]
    async fn conversion_failure_leaves_no_partial_queue() {
        let fixture = Fixture::new();
        let path = fixture.write("app.ts", "let x = 1;\n");
        let mut collaborators = fixture.collaborators();
        collaborators.source = Arc::new(BrokenSourcePreview);
        let previewer = fixture.previewer_with(path, collaborators);

        let loaded = previewer
            .load_display_info(&CancellationToken::new())
            .await
            .expect("faults are captured");
        assert!(!loaded);

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("load completes");
        assert_eq!(previewer.state(), PreviewState::Error);
        assert_eq!(previewer.pending_command_count(), 0);
        assert!(!previewer.is_dev_file_preview());
    }

    #[tokio::test]
    async fn failed_reload_clears_dev_file_flag() {
        let fixture = Fixture::new();
        let path = fixture.write("job.py", "run()\n");
        let previewer = fixture.previewer(path.clone());

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("first load");
        assert!(previewer.is_dev_file_preview());

        std::fs::remove_file(&path).expect("remove source");
        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("second load");
        assert_eq!(previewer.state(), PreviewState::Error);
        assert!(!previewer.is_dev_file_preview());
        assert!(previewer.preview().is_none());
    }

    #[tokio::test]
    async fn configured_editor_shell_must_exist() {
        let mut fixture = Fixture::new();
        fixture.settings.editor_shell = Some(fixture.root.path().join("no-shell.html"));
        let path = fixture.write("main.rs", "fn main() {}\n");
        let previewer = fixture.previewer(path);

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("load completes");
        assert_eq!(previewer.state(), PreviewState::Error);
        assert_eq!(previewer.pending_command_count(), 0);
        assert!(
            previewer
                .last_failure()
                .is_some_and(|failure| failure.contains("no-shell.html"))
        );
    }

    #[tokio::test]
    async fn reload_recovers_from_error() {
        let fixture = Fixture::new();
        let path = fixture.root.path().join("later.md");
        let previewer = fixture.previewer(path.clone());

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("first load");
        assert_eq!(previewer.state(), PreviewState::Error);

        std::fs::write(&path, "# ready").expect("write markdown");
        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("second load");
        assert_eq!(previewer.state(), PreviewState::Loaded);
        assert!(previewer.last_failure().is_none());
        assert!(previewer.is_preview_loaded());
    }

    #[tokio::test]
    async fn overlapping_loads_are_serialized() {
        let fixture = Fixture::new();
        let path = fixture.write("main.go", "package main\n");
        let previewer = fixture.previewer(path);

        let first = previewer.clone();
        let second = previewer.clone();
        let (a, b) = tokio::join!(
            async move { first.load_preview(&CancellationToken::new()).await },
            async move { second.load_preview(&CancellationToken::new()).await },
        );
        a.expect("first load");
        b.expect("second load");

        let kinds: Vec<_> = previewer
            .drain_renderer_commands()
            .iter()
            .map(RendererCommand::kind)
            .collect();
        assert_eq!(
            kinds,
            [
                "set_content",
                "set_language",
                "set_word_wrap",
                "set_theme",
                "set_content",
                "set_language",
                "set_word_wrap",
                "set_theme",
            ]
        );
        assert_eq!(previewer.state(), PreviewState::Loaded);
    }

    #[tokio::test]
    async fn state_changes_are_broadcast() {
        let fixture = Fixture::new();
        let path = fixture.write("index.htm", "<p>hi</p>");
        let previewer = fixture.previewer(path.clone());
        let mut events = previewer.subscribe();

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("load");

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }

        assert_eq!(
            received,
            vec![
                PreviewEvent::StateChanged {
                    state: PreviewState::Loading
                },
                PreviewEvent::PreviewChanged {
                    uri: Some(PreviewUri::from_path(&path).expect("uri"))
                },
                PreviewEvent::StateChanged {
                    state: PreviewState::Loaded
                },
            ]
        );
    }

    #[tokio::test]
    async fn dispose_cleans_up_once() {
        let fixture = Fixture::new();
        let path = fixture.write("readme.md", "hello");
        let cleaner = Arc::new(CountingCleaner::default());
        let mut collaborators = fixture.collaborators();
        collaborators.cleaner = cleaner.clone();
        let previewer = fixture.previewer_with(path, collaborators);

        previewer
            .load_preview(&CancellationToken::new())
            .await
            .expect("load");

        previewer.dispose().await;
        previewer.dispose().await;
        assert!(previewer.is_disposed());
        assert_eq!(cleaner.calls.load(Ordering::SeqCst), 1);

        drop(previewer);
        assert_eq!(cleaner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn copy_hands_the_file_to_the_clipboard() {
        let fixture = Fixture::new();
        let path = fixture.write("report.pdf", "%PDF-1.7");
        let previewer = fixture.previewer(path.clone());

        previewer.copy().await.expect("copy");

        let copied = fixture.clipboard.copied.lock().expect("lock").clone();
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].path, path.canonicalize().expect("canonical"));
    }

    #[tokio::test]
    async fn copy_failures_propagate() {
        let fixture = Fixture::new();
        let previewer = fixture.previewer(fixture.root.path().join("gone.pdf"));

        assert!(previewer.copy().await.is_err());
        assert_eq!(previewer.state(), PreviewState::Idle);
    }

    #[tokio::test]
    async fn preview_size_is_always_empty() {
        let fixture = Fixture::new();
        let previewer = fixture.previewer(fixture.root.path().join("any.html"));
        let token = CancellationToken::new();
        token.cancel();

        let size = previewer.get_preview_size(&token).await;
        assert!(size.monitor_size.is_none());
    }

    #[test]
    fn support_gate_uses_builtin_catalog() {
        assert!(WebBrowserPreviewer::is_item_supported(".pdf"));
        assert!(WebBrowserPreviewer::is_item_supported(".MD"));
        assert!(WebBrowserPreviewer::is_item_supported(".cpp"));
        assert!(!WebBrowserPreviewer::is_item_supported(".xyz"));
    }
}
