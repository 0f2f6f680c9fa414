use std::io;

use tracing::info;

use crate::reactor::Reactor;

/// The reactors of one server, disposed together in a fixed order.
///
/// The acceptor goes first so no new connection is handed to a worker that is about to
/// stop, then every worker closes its connections. Dropping the group disposes it.
#[derive(Debug)]
pub struct ReactorGroup {
    acceptor: Reactor,
    workers: Vec<Reactor>,
}

impl ReactorGroup {
    pub fn new(acceptor: Reactor, workers: Vec<Reactor>) -> Self {
        Self { acceptor, workers }
    }

    /// `nio-acceptor` plus `worker_count` reactors named `nio-worker-{i}`.
    pub fn with_workers(worker_count: usize) -> Self {
        let workers = (0..worker_count).map(|i| Reactor::new(format!("nio-worker-{i}"))).collect();
        Self::new(Reactor::new("nio-acceptor"), workers)
    }

    pub fn acceptor(&self) -> &Reactor {
        &self.acceptor
    }

    pub fn workers(&self) -> &[Reactor] {
        &self.workers
    }

    /// Starts the workers, then the acceptor; disposes everything on failure.
    pub fn start_all(&self) -> io::Result<()> {
        let started = self.workers.iter().chain(std::iter::once(&self.acceptor)).try_for_each(Reactor::start);
        if started.is_err() {
            self.dispose();
        }
        started
    }

    pub fn dispose(&self) {
        if self.acceptor.is_disposed() && self.workers.iter().all(Reactor::is_disposed) {
            return;
        }
        self.acceptor.dispose();
        for worker in &self.workers {
            worker.dispose();
        }
        info!(workers = self.workers.len(), "reactor group disposed");
    }
}

impl Drop for ReactorGroup {
    fn drop(&mut self) {
        self.dispose();
    }
}
