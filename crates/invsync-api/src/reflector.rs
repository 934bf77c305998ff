//! List-then-watch loop feeding a [`Store`].
//!
//! A [`Reflector`] lists every object of one kind, hands the full listing to
//! its store as a `replace`, then watches from the listed resource version
//! and forwards each mutation. Expired versions force a relist; any other
//! failure backs off exponentially and relists.
//!
//! # Example
//!
//! ```rust,ignore
//! use invsync_api::kube::{HubClient, ManagedCluster};
//! use invsync_api::reflector::Reflector;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let reflector = Reflector::<ManagedCluster>::new("cluster-reflector", hub.clone());
//! tokio::spawn(async move { reflector.run(store.as_ref(), cancel).await });
//! ```

use std::marker::PhantomData;
use std::time::Duration;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::kube::{HubClient, Resource, WatchEvent};

// ── Store ────────────────────────────────────────────────────────────

/// Sink for the mutations observed by a [`Reflector`].
///
/// Mirrors the cache-store contract of list/watch clients. Only the write
/// side is driven by the reflector; implementations that do not keep
/// objects around may treat the read side as unsupported.
pub trait Store<K>: Send + Sync {
    fn add(&self, obj: K);
    fn update(&self, obj: K);
    fn delete(&self, obj: K);
    /// Full listing at `resource_version`.
    fn replace(&self, items: Vec<K>, resource_version: &str);
    fn resync(&self);

    fn list(&self) -> Vec<K>;
    fn list_keys(&self) -> Vec<String>;
    fn get(&self, obj: &K) -> Option<K>;
    fn get_by_key(&self, key: &str) -> Option<K>;
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for relisting after failures.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first retry. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive failures before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── Reflector ────────────────────────────────────────────────────────

/// Named list-then-watch driver for one resource kind.
pub struct Reflector<K> {
    name: String,
    client: HubClient,
    reconnect: ReconnectConfig,
    _kind: PhantomData<fn() -> K>,
}

impl<K: Resource> Reflector<K> {
    pub fn new(name: impl Into<String>, client: HubClient) -> Self {
        Self {
            name: name.into(),
            client,
            reconnect: ReconnectConfig::default(),
            _kind: PhantomData,
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Main loop: list → replace → watch → on error, backoff → relist.
    ///
    /// Returns when `cancel` fires or the retry limit is reached.
    pub async fn run<S: Store<K> + ?Sized>(&self, store: &S, cancel: CancellationToken) {
        let mut attempt: u32 = 0;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.list_and_watch(store, &cancel, &mut attempt) => {
                    match result {
                        Ok(()) => {
                            if cancel.is_cancelled() {
                                break;
                            }
                            info!(reflector = %self.name, kind = K::KIND, "relisting");
                        }
                        Err(e) => {
                            warn!(reflector = %self.name, kind = K::KIND, error = %e, attempt, "list/watch failed");

                            if let Some(max) = self.reconnect.max_retries {
                                if attempt >= max {
                                    tracing::error!(
                                        reflector = %self.name,
                                        max_retries = max,
                                        "reflector retry limit reached, giving up"
                                    );
                                    break;
                                }
                            }

                            let delay = calculate_backoff(attempt, &self.reconnect);
                            debug!(
                                reflector = %self.name,
                                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                                attempt,
                                "waiting before relist"
                            );

                            tokio::select! {
                                biased;
                                () = cancel.cancelled() => break,
                                () = tokio::time::sleep(delay) => {}
                            }

                            attempt = attempt.saturating_add(1);
                        }
                    }
                }
            }
        }

        debug!(reflector = %self.name, "reflector exiting");
    }

    /// One list followed by as many watches as the hub allows.
    ///
    /// `Ok(())` means a relist is required (expired version or cancellation).
    async fn list_and_watch<S: Store<K> + ?Sized>(
        &self,
        store: &S,
        cancel: &CancellationToken,
        attempt: &mut u32,
    ) -> Result<(), Error> {
        let listing = self.client.list::<K>().await?;
        debug!(
            reflector = %self.name,
            count = listing.items.len(),
            resource_version = %listing.resource_version,
            "listed"
        );
        let mut version = listing.resource_version;
        store.replace(listing.items, &version);
        *attempt = 0;

        loop {
            let stream = match self.client.watch::<K>(&version).await {
                Ok(stream) => stream,
                Err(e) if e.is_gone() => return Ok(()),
                Err(e) => return Err(e),
            };
            let mut stream = std::pin::pin!(stream);

            loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Ok(()),
                    next = stream.next() => next,
                };

                match next {
                    None => {
                        debug!(reflector = %self.name, resource_version = %version, "watch closed, resuming");
                        break;
                    }
                    Some(Err(e)) if e.is_gone() => return Ok(()),
                    Some(Err(e)) => return Err(e),
                    Some(Ok(event)) => match event {
                        WatchEvent::Added(obj) => {
                            advance(&mut version, &obj);
                            store.add(obj);
                        }
                        WatchEvent::Modified(obj) => {
                            advance(&mut version, &obj);
                            store.update(obj);
                        }
                        WatchEvent::Deleted(obj) => {
                            advance(&mut version, &obj);
                            store.delete(obj);
                        }
                        WatchEvent::Bookmark(bookmark) => {
                            if let Some(rv) = bookmark.metadata.resource_version {
                                version = rv;
                            }
                        }
                        WatchEvent::Error(status) => {
                            let err = Error::WatchStatus {
                                code: status.code,
                                message: status.message,
                            };
                            if err.is_gone() {
                                return Ok(());
                            }
                            return Err(err);
                        }
                    },
                }
            }
        }
    }
}

fn advance<K: Resource>(version: &mut String, obj: &K) {
    if let Some(rv) = &obj.metadata().resource_version {
        version.clone_from(rv);
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% so reflectors that failed together do not relist together.
pub fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
