//! Background statistics resync.
//!
//! Book writes enqueue a request and return immediately. A single worker
//! task drains the queue, coalesces whatever has piled up into one full
//! recompute, and retries a failed recompute a bounded number of times.
//! Every request carries a ticket; once the completed ticket reaches a
//! caller's ticket, the index reflects every book write made before that
//! request.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::ResyncConfig;
use crate::error::{EngineError, Result};
use crate::stats::GlobalStatsIndex;
use crate::store::Store;

/// Cheap, cloneable handle to the resync worker
#[derive(Clone)]
pub struct ResyncHandle {
    tx: mpsc::UnboundedSender<u64>,
    requested: Arc<AtomicU64>,
    failed_batches: Arc<AtomicU64>,
    completed: watch::Receiver<u64>,
}

impl ResyncHandle {
    /// Queue a resync and return its ticket
    pub fn request(&self) -> Result<u64> {
        let ticket = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx
            .send(ticket)
            .map_err(|_| EngineError::ResyncUnavailable)?;
        tracing::trace!(ticket, "Queued statistics resync");
        Ok(ticket)
    }

    /// Fire-and-forget variant used after book writes
    pub fn notify(&self) {
        if let Err(e) = self.request() {
            tracing::warn!(error = %e, "Could not queue statistics resync");
        }
    }

    /// Wait until a resync covering `ticket` has succeeded
    pub async fn wait_for(&self, ticket: u64) -> Result<()> {
        let mut completed = self.completed.clone();
        let reached = completed.wait_for(|done| *done >= ticket).await.is_ok();
        if reached {
            Ok(())
        } else {
            Err(EngineError::ResyncUnavailable)
        }
    }

    /// Request a resync and wait for it
    pub async fn flush(&self) -> Result<()> {
        let ticket = self.request()?;
        self.wait_for(ticket).await
    }

    pub fn last_requested(&self) -> u64 {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn last_completed(&self) -> u64 {
        *self.completed.borrow()
    }

    /// Requests not yet covered by a successful resync
    pub fn lag(&self) -> u64 {
        self.last_requested().saturating_sub(self.last_completed())
    }

    /// Batches abandoned after exhausting their retries
    pub fn failed_batches(&self) -> u64 {
        self.failed_batches.load(Ordering::SeqCst)
    }
}

/// The task that owns the recompute loop
pub struct ResyncWorker<S> {
    index: GlobalStatsIndex<S>,
    config: ResyncConfig,
    rx: mpsc::UnboundedReceiver<u64>,
    completed: watch::Sender<u64>,
    failed_batches: Arc<AtomicU64>,
}

impl<S: Store> ResyncWorker<S> {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// The worker stops once every [`ResyncHandle`] has been dropped.
    pub fn spawn(store: Arc<S>, config: ResyncConfig) -> (ResyncHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (completed_tx, completed_rx) = watch::channel(0);
        let failed_batches = Arc::new(AtomicU64::new(0));

        let worker = Self {
            index: GlobalStatsIndex::new(store),
            config,
            rx,
            completed: completed_tx,
            failed_batches: failed_batches.clone(),
        };
        let handle = ResyncHandle {
            tx,
            requested: Arc::new(AtomicU64::new(0)),
            failed_batches,
            completed: completed_rx,
        };

        (handle, tokio::spawn(worker.run()))
    }

    async fn run(mut self) {
        while let Some(first) = self.rx.recv().await {
            let mut ticket = first;
            let mut coalesced = 0u64;
            while let Ok(next) = self.rx.try_recv() {
                ticket = ticket.max(next);
                coalesced += 1;
            }
            if coalesced > 0 {
                tracing::debug!(ticket, coalesced, "Coalesced resync requests");
            }
            self.run_batch(ticket).await;
        }
        tracing::debug!("Resync worker stopped");
    }

    async fn run_batch(&self, ticket: u64) {
        let attempts = self.config.max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.index.resync().await {
                Ok(_) => {
                    self.completed.send_modify(|done| *done = (*done).max(ticket));
                    return;
                }
                Err(e) => {
                    tracing::warn!(ticket, attempt, attempts, error = %e, "Statistics resync failed");
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                    }
                }
            }
        }
        self.failed_batches.fetch_add(1, Ordering::SeqCst);
        tracing::error!(ticket, "Giving up on statistics resync until the next request");
    }
}
