//! Change Watcher
//!
//! Observes a live document for structural mutations and runs a reaction
//! once each burst has settled.
//!
//! Architecture:
//! ```text
//! Tree observer → ping channel → Debouncer (pure timing) → reaction(&mut doc)
//! ```
//!
//! Notifications are never inspected: any batch means "re-scan". The reaction
//! runs with the document locked, and pings caused by the reaction's own
//! edits are drained before the lock is released, so a settled document does
//! not wake the watcher again.

mod debouncer;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dom::{Document, MutationRecord, NodeId, ObserveOptions, ObserverId};
use debouncer::Debouncer;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("root node is not attached to the document")]
    RootMissing,

    #[error("watcher is already running")]
    AlreadyRunning,

    #[error("no tokio runtime available to drive the settle timer")]
    NoRuntime,
}

struct Running {
    observer: ObserverId,
    task: JoinHandle<()>,
}

/// Debounced observer over a shared document.
pub struct ChangeWatcher<D: Document + Send + 'static> {
    doc: Arc<Mutex<D>>,
    delay: Duration,
    options: ObserveOptions,
    running: Option<Running>,
}

impl<D: Document + Send + 'static> ChangeWatcher<D> {
    pub fn new(doc: Arc<Mutex<D>>, delay: Duration) -> Self {
        Self {
            doc,
            delay,
            options: ObserveOptions::structural(),
            running: None,
        }
    }

    pub fn with_options(mut self, options: ObserveOptions) -> Self {
        self.options = options;
        self
    }

    pub const fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Run `reaction` once now, then again after every settled burst of
    /// mutations under `root`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&mut self, root: NodeId, mut reaction: F) -> Result<(), WatchError>
    where
        F: FnMut(&mut D) + Send + 'static,
    {
        if self.running.is_some() {
            return Err(WatchError::AlreadyRunning);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;

        let (ping_tx, ping_rx) = mpsc::unbounded_channel();
        let observer = {
            let mut doc = self.doc.lock();
            if !doc.contains(root) {
                return Err(WatchError::RootMissing);
            }

            // Content already present at startup
            reaction(&mut *doc);

            doc.observe(
                root,
                self.options,
                Box::new(move |_records: &[MutationRecord]| {
                    let _ = ping_tx.send(());
                }),
            )
        };

        let task = runtime.spawn(settle_loop(
            Arc::clone(&self.doc),
            Debouncer::new(self.delay),
            ping_rx,
            reaction,
        ));

        crate::debug!("watch"; "observing, settle delay {}ms", self.delay.as_millis());
        self.running = Some(Running { observer, task });
        Ok(())
    }

    /// Disconnect from the document and cancel any pending reaction.
    ///
    /// Returns `false` if the watcher was not running.
    pub fn stop(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            return false;
        };
        self.doc.lock().disconnect(running.observer);
        running.task.abort();
        crate::debug!("watch"; "stopped");
        true
    }
}

impl<D: Document + Send + 'static> Drop for ChangeWatcher<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Feed pings into the debouncer and react once the window settles.
///
/// Exits when the observer is disconnected (sender dropped).
async fn settle_loop<D, F>(
    doc: Arc<Mutex<D>>,
    mut debouncer: Debouncer,
    mut ping_rx: mpsc::UnboundedReceiver<()>,
    mut reaction: F,
) where
    D: Document + Send + 'static,
    F: FnMut(&mut D) + Send + 'static,
{
    loop {
        tokio::select! {
            biased;
            ping = ping_rx.recv() => match ping {
                Some(()) => debouncer.touch(),
                None => break,
            },
            () = tokio::time::sleep(debouncer.sleep_duration()) => {
                if debouncer.take_if_ready() {
                    let mut guard = doc.lock();
                    reaction(&mut *guard);
                    // Pings queued so far were caused by edits this pass has already seen
                    while ping_rx.try_recv().is_ok() {}
                }
            }
        }
    }
}
