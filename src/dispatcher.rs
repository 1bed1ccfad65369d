use crate::error::{PreviewError, Result};
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use tokio::runtime::Builder;
use tokio::sync::{mpsc, oneshot};
use tokio::task::LocalSet;
use tracing::{debug, warn};

type LocalJob = Pin<Box<dyn Future<Output = ()>>>;
type Job = Box<dyn FnOnce() -> LocalJob + Send>;

/// Handle to the single UI-affinity thread. Jobs run one at a time, in submission order.
/// A job that panics fails on its own; the thread keeps serving later jobs.
#[derive(Clone)]
pub struct UiDispatcher {
    sender: mpsc::UnboundedSender<Job>,
}

impl UiDispatcher {
    pub fn new(thread_name: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| PreviewError::Dispatcher(format!("failed to start runtime: {err}")))?;
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let name = thread_name.to_string();
        std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let local = LocalSet::new();
                local.block_on(&runtime, async {
                    while let Some(job) = receiver.recv().await {
                        if let Err(err) = tokio::task::spawn_local(job()).await {
                            warn!("ui job on {name} failed: {err}");
                        }
                    }
                });
                debug!("ui dispatcher {name} stopped");
            })
            .map_err(|err| PreviewError::Dispatcher(format!("failed to spawn thread: {err}")))?;

        Ok(Self { sender })
    }

    /// Runs `job` on the UI thread and waits for its output.
    pub async fn run<F, Fut, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let boxed: Job = Box::new(move || {
            Box::pin(async move {
                let output = job().await;
                let _ = tx.send(output);
            })
        });

        self.sender
            .send(boxed)
            .map_err(|_| PreviewError::Dispatcher(String::from("ui thread is gone")))?;

        rx.await
            .map_err(|_| PreviewError::Dispatcher(String::from("ui job panicked before finishing")))
    }
}

impl Debug for UiDispatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiDispatcher")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}
