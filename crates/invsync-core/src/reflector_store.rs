//! Non-caching watch-to-queue adapter.
//!
//! A [`ReflectorStore`] is the [`Store`] a [`Reflector`](invsync_api::reflector::Reflector)
//! writes into. Instead of materializing a cache it appends each mutation to
//! an ordered queue; [`ReflectorStore::receive`] drains that queue in batches
//! and hands every object to an [`AsyncEventHandler`].
//!
//! Delivery order equals enqueue order. Handler failures are logged and the
//! batch carries on; nothing is retried here; a later relist re-delivers state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use invsync_api::reflector::Store;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::event::AsyncEventType;

/// Queue growth past the last reported peak that triggers a lag warning.
const HIGH_WATER_MARK_STEP: usize = 10;

// ── Handler ──────────────────────────────────────────────────────────

/// Consumer of the operations drained from a [`ReflectorStore`].
#[async_trait]
pub trait AsyncEventHandler<T>: Send + Sync {
    /// Handles one object. `Ok(Some(key))` contributes `key` to the key set
    /// of an enclosing sync completion; `Ok(None)` means the object was
    /// filtered out.
    async fn handle_async_event(
        &self,
        cancel: &CancellationToken,
        obj: T,
        event_type: AsyncEventType,
    ) -> Result<Option<Uuid>, CoreError>;

    /// Called once after every object of a full relist has been handled.
    async fn handle_sync_complete(
        &self,
        cancel: &CancellationToken,
        keys: Vec<Uuid>,
    ) -> Result<(), CoreError>;
}

// ── Queue ────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Operation<T> {
    Updated(T),
    Deleted(T),
    SyncComplete(Vec<T>),
}

struct Queue<T> {
    ops: Vec<Operation<T>>,
    high_water_mark: usize,
}

// ── ReflectorStore ───────────────────────────────────────────────────

pub struct ReflectorStore<T> {
    name: String,
    queue: Mutex<Queue<T>>,
    ready_tx: mpsc::Sender<()>,
    ready_rx: Mutex<Option<mpsc::Receiver<()>>>,
    has_synced: AtomicBool,
}

impl<T: Send + 'static> ReflectorStore<T> {
    pub fn new(name: impl Into<String>) -> Self {
        let (ready_tx, ready_rx) = mpsc::channel(1);
        Self {
            name: name.into(),
            queue: Mutex::new(Queue {
                ops: Vec::new(),
                high_water_mark: 0,
            }),
            ready_tx,
            ready_rx: Mutex::new(Some(ready_rx)),
            has_synced: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether at least one full listing has been received.
    pub fn has_synced(&self) -> bool {
        self.has_synced.load(Ordering::Acquire)
    }

    #[cfg(test)]
    fn high_water_mark(&self) -> usize {
        self.queue().high_water_mark
    }

    fn queue(&self) -> MutexGuard<'_, Queue<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, op: Operation<T>) {
        let depth = {
            let mut queue = self.queue();
            queue.ops.push(op);
            let depth = queue.ops.len();
            if depth >= queue.high_water_mark + HIGH_WATER_MARK_STEP {
                queue.high_water_mark = depth;
                warn!(store = %self.name, depth, "reflector store queue reached new high-water mark");
            }
            depth
        };

        // Only the empty -> non-empty transition needs to wake the receiver.
        if depth == 1 {
            let _ = self.ready_tx.try_send(());
        }
    }

    /// Drains the queue into `handler` until `cancel` fires.
    ///
    /// Only one receiver may run per store; a second call returns at once.
    pub async fn receive<H>(&self, cancel: &CancellationToken, handler: &H)
    where
        H: AsyncEventHandler<T> + ?Sized,
    {
        let Some(mut ready) = self
            .ready_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            warn!(store = %self.name, "reflector store receiver already running");
            return;
        };

        info!(store = %self.name, "reflector store receiver started");
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                signal = ready.recv() => {
                    if signal.is_none() {
                        break;
                    }
                }
            }

            let ops = std::mem::take(&mut self.queue().ops);
            debug!(store = %self.name, count = ops.len(), "draining reflector store");
            for op in ops {
                self.process(cancel, handler, op).await;
            }
        }
        debug!(store = %self.name, "reflector store receiver exiting");
    }

    async fn process<H>(&self, cancel: &CancellationToken, handler: &H, op: Operation<T>)
    where
        H: AsyncEventHandler<T> + ?Sized,
    {
        match op {
            Operation::Updated(obj) => {
                self.dispatch(cancel, handler, obj, AsyncEventType::Updated)
                    .await;
            }
            Operation::Deleted(obj) => {
                self.dispatch(cancel, handler, obj, AsyncEventType::Deleted)
                    .await;
            }
            Operation::SyncComplete(items) => {
                let total = items.len();
                let mut keys = Vec::with_capacity(total);
                for obj in items {
                    if let Some(key) = self
                        .dispatch(cancel, handler, obj, AsyncEventType::Updated)
                        .await
                    {
                        keys.push(key);
                    }
                }
                debug!(store = %self.name, total, keys = keys.len(), "sync complete");
                if let Err(e) = handler.handle_sync_complete(cancel, keys).await {
                    warn!(store = %self.name, error = %e, "sync completion handler failed");
                }
            }
        }
    }

    async fn dispatch<H>(
        &self,
        cancel: &CancellationToken,
        handler: &H,
        obj: T,
        event_type: AsyncEventType,
    ) -> Option<Uuid>
    where
        H: AsyncEventHandler<T> + ?Sized,
    {
        match handler.handle_async_event(cancel, obj, event_type).await {
            Ok(key) => key,
            Err(e) => {
                warn!(store = %self.name, event = %event_type, error = %e, "async event handler failed");
                None
            }
        }
    }
}

// ── Store ────────────────────────────────────────────────────────────

impl<T: Send + 'static> Store<T> for ReflectorStore<T> {
    fn add(&self, obj: T) {
        self.enqueue(Operation::Updated(obj));
    }

    fn update(&self, obj: T) {
        self.enqueue(Operation::Updated(obj));
    }

    fn delete(&self, obj: T) {
        self.enqueue(Operation::Deleted(obj));
    }

    fn replace(&self, items: Vec<T>, resource_version: &str) {
        info!(store = %self.name, count = items.len(), resource_version, "replace");
        self.enqueue(Operation::SyncComplete(items));
        self.has_synced.store(true, Ordering::Release);
    }

    fn resync(&self) {
        debug!(store = %self.name, "resync ignored");
    }

    fn list(&self) -> Vec<T> {
        panic!("ReflectorStore::list is not supported");
    }

    fn list_keys(&self) -> Vec<String> {
        panic!("ReflectorStore::list_keys is not supported");
    }

    fn get(&self, _obj: &T) -> Option<T> {
        panic!("ReflectorStore::get is not supported");
    }

    fn get_by_key(&self, _key: &str) -> Option<T> {
        panic!("ReflectorStore::get_by_key is not supported");
    }
}

// ── Tests ────────────────────────────────────────────────────────────
