//! Background thread running the pool's periodic maintenance tasks

use crossbeam::channel::{self, Receiver, Select, Sender};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A named job run on a fixed period.
pub(crate) struct PeriodicTask {
    name: &'static str,
    period: Duration,
    run: Box<dyn FnMut() + Send>,
}

impl PeriodicTask {
    pub fn new<F>(name: &'static str, period: Duration, run: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self {
            name,
            period,
            run: Box::new(run),
        }
    }
}

/// Runs every task on one dedicated thread until cancelled.
///
/// Tasks with a zero period are skipped. Each task keeps its own fixed rate;
/// a slow run delays only the ticks that arrive while it executes.
pub(crate) struct Scheduler {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start(thread_name: String, tasks: Vec<PeriodicTask>) -> io::Result<Self> {
        let (cancel_tx, cancel_rx) = channel::bounded::<()>(0);
        let mut tasks: Vec<_> = tasks.into_iter().filter(|t| !t.period.is_zero()).collect();

        let handle = thread::Builder::new().name(thread_name).spawn(move || {
            let tickers: Vec<Receiver<_>> = tasks.iter().map(|t| channel::tick(t.period)).collect();
            let mut select = Select::new();
            let cancel_index = select.recv(&cancel_rx);
            for ticker in &tickers {
                select.recv(ticker);
            }

            loop {
                let op = select.select();
                let index = op.index();
                if index == cancel_index {
                    // cancel_tx is only ever dropped, never sent on
                    let _ = op.recv(&cancel_rx);
                    break;
                }
                let slot = index - 1;
                if op.recv(&tickers[slot]).is_err() {
                    break;
                }
                let task = &mut tasks[slot];
                tracing::trace!(task = task.name, "running periodic task");
                (task.run)();
            }
            tracing::debug!("pool scheduler stopped");
        })?;

        Ok(Self {
            cancel: Some(cancel_tx),
            handle: Some(handle),
        })
    }

    /// Signal the thread to stop without waiting for it
    pub fn cancel(&mut self) {
        self.cancel.take();
    }

    /// Signal the thread to stop and wait for the current task to finish
    pub fn shutdown(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("pool scheduler thread panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
