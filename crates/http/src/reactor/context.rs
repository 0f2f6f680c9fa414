use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Handle to the running reactor, passed to every scheduled task.
///
/// Only valid on the reactor thread: [`spawn`](ReactorContext::spawn) puts the future on
/// the reactor's local task set.
#[derive(Debug, Clone)]
pub struct ReactorContext {
    name: Arc<str>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl ReactorContext {
    pub(crate) fn new(name: Arc<str>, shutdown: CancellationToken) -> Self {
        Self { name, tracker: TaskTracker::new(), shutdown }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Runs `future` on this reactor; dispose waits for it to finish.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.tracker.spawn_local(future);
    }

    /// Fires when the reactor is disposed.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Spawned tasks that have not finished yet.
    pub fn task_count(&self) -> usize {
        self.tracker.len()
    }

    pub(crate) async fn close(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
