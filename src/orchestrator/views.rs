//! Fire-and-forget view counting
//!
//! A fixed set of workers drains a bounded channel of article ids. Dispatch
//! never waits: a full queue drops the increment.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::metrics;
use crate::models::ArticleId;
use crate::storage::SharedArticleStore;

/// Background view-count incrementer
pub struct ViewCounter {
    sender: Mutex<Option<mpsc::Sender<ArticleId>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ViewCounter {
    /// Spawn `workers` tasks sharing a queue of `capacity` pending ids.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: SharedArticleStore, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<ArticleId>(capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let store = Arc::clone(&store);

            handles.push(tokio::spawn(async move {
                loop {
                    let id = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };

                    let Some(id) = id else {
                        break; // Channel closed
                    };

                    match store.increment_view_count(id).await {
                        Ok(true) => metrics::record_view("applied"),
                        Ok(false) => {
                            tracing::debug!(worker_id, id, "View count target no longer exists");
                        }
                        Err(e) => {
                            metrics::record_view("failed");
                            tracing::warn!(worker_id, id, error = %e, "Failed to increment view count");
                        }
                    }
                }

                tracing::debug!(worker_id, "View counter worker shutting down");
            }));
        }

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
        }
    }

    /// Queue one increment without waiting. Returns whether it was queued.
    pub fn dispatch(&self, id: ArticleId) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = sender.as_ref() else {
            tracing::debug!(id, "View counter stopped, increment ignored");
            return false;
        };

        match tx.try_send(id) {
            Ok(()) => {
                metrics::record_view("dispatched");
                true
            }
            Err(TrySendError::Full(_)) => {
                metrics::record_view("dropped");
                tracing::warn!(id, "View count queue full, increment dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(id, "View count queue closed, increment ignored");
                false
            }
        }
    }

    /// Close the queue and wait for the workers to apply what is pending
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let handles: Vec<_> = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "View counter worker panicked");
            }
        }
    }
}
