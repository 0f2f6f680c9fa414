use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tokio::runtime::Builder as TokioBuilder;
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::reactor::ReactorContext;

type Task = Box<dyn FnOnce(&ReactorContext) + Send>;

/// A single-threaded event loop with a cross-thread task queue.
///
/// Everything registered on a reactor, connections in particular, is created and used
/// on the reactor's own thread only. Other threads reach it exclusively through
/// [`schedule`](Reactor::schedule). Cloning gives another handle to the same reactor.
#[derive(Clone)]
pub struct Reactor {
    inner: Arc<Inner>,
}

struct Inner {
    name: Arc<str>,
    sender: mpsc::UnboundedSender<Task>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Task>>>,
    shutdown: CancellationToken,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Reactor {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                sender,
                receiver: Mutex::new(Some(receiver)),
                shutdown: CancellationToken::new(),
                thread: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Queues `task` to run on the reactor thread, in submission order.
    ///
    /// Callable from any thread, including the reactor's own. Returns `false` once the
    /// reactor is disposed; the task is dropped without running.
    pub fn schedule<T>(&self, task: T) -> bool
    where
        T: FnOnce(&ReactorContext) + Send + 'static,
    {
        if self.inner.shutdown.is_cancelled() {
            return false;
        }
        self.inner.sender.send(Box::new(task)).is_ok()
    }

    /// Spawns the reactor thread; tasks scheduled before this call run first.
    pub fn start(&self) -> io::Result<()> {
        let Some(receiver) = lock(&self.inner.receiver).take() else {
            return Err(io::Error::other(format!("reactor {} already started", self.inner.name)));
        };

        let name = Arc::clone(&self.inner.name);
        let shutdown = self.inner.shutdown.clone();
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || run(name, receiver, shutdown))?;
        *lock(&self.inner.thread) = Some(handle);
        Ok(())
    }

    /// Stops the loop, closes every connection it owns and waits for the thread to exit.
    ///
    /// Queued tasks that did not run yet are discarded. Called on the reactor's own
    /// thread, the loop stops once the current task returns but is not waited for.
    pub fn dispose(&self) {
        self.inner.shutdown.cancel();
        // a reactor that never started still holds its queue
        drop(lock(&self.inner.receiver).take());

        let Some(handle) = lock(&self.inner.thread).take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            error!(reactor = %self.inner.name, "reactor thread panicked");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor").field("name", &self.inner.name).field("disposed", &self.is_disposed()).finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run(name: Arc<str>, mut receiver: mpsc::UnboundedReceiver<Task>, shutdown: CancellationToken) {
    let runtime = match TokioBuilder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(reactor = %name, cause = %e, "can't build reactor runtime, reactor stopped");
            return;
        }
    };

    let context = ReactorContext::new(Arc::clone(&name), shutdown.clone());
    let local_set = LocalSet::new();
    info!(reactor = %name, "reactor started");

    runtime.block_on(local_set.run_until(async {
        loop {
            select! {
                biased;

                () = shutdown.cancelled() => break,

                task = receiver.recv() => match task {
                    Some(task) => task(&context),
                    None => break,
                },
            }
        }

        receiver.close();
        let mut discarded = 0usize;
        while receiver.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(reactor = %name, discarded, "discarded queued tasks");
        }

        // a loop that ended because every handle was dropped still closes its connections
        shutdown.cancel();
        context.close().await;
    }));

    info!(reactor = %name, "reactor stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn tasks_run_in_order_on_reactor_thread() {
        let reactor = Reactor::new("test-reactor");
        let (tx, rx) = std_mpsc::channel();

        for i in 0..3 {
            let tx = tx.clone();
            assert!(reactor.schedule(move |ctx| {
                tx.send((i, thread::current().name().map(str::to_owned), ctx.name().to_owned())).unwrap();
            }));
        }
        reactor.start().unwrap();

        for i in 0..3 {
            let (n, thread_name, ctx_name) = rx.recv_timeout(WAIT).unwrap();
            assert_eq!(n, i);
            assert_eq!(thread_name.as_deref(), Some("test-reactor"));
            assert_eq!(ctx_name, "test-reactor");
        }
        reactor.dispose();
    }

    #[test]
    fn dispose_waits_for_spawned_tasks() {
        let reactor = Reactor::new("dispose-reactor");
        reactor.start().unwrap();

        let (tx, rx) = std_mpsc::channel();
        reactor.schedule(move |ctx| {
            let token = ctx.shutdown_token();
            ctx.spawn(async move {
                token.cancelled().await;
                tx.send("closed").unwrap();
            });
        });

        // make sure the spawn ran before disposing
        let (ready_tx, ready_rx) = std_mpsc::channel();
        reactor.schedule(move |ctx| ready_tx.send(ctx.task_count()).unwrap());
        assert_eq!(ready_rx.recv_timeout(WAIT).unwrap(), 1);

        reactor.dispose();
        assert_eq!(rx.try_recv().unwrap(), "closed");
        assert!(reactor.is_disposed());
    }

    #[test]
    fn schedule_after_dispose_is_rejected() {
        let reactor = Reactor::new("disposed-reactor");
        reactor.start().unwrap();
        reactor.dispose();

        assert!(!reactor.schedule(|_| {}));
        assert!(reactor.start().is_err());
    }
}
