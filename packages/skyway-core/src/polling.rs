//! Generic interval-based balance poller
//!
//! Polls an injected async fetch callback, exposing the last-known value and
//! an in-flight flag. A poller is tied to one set of inputs (chain, currency,
//! address); when those change the owner stops this poller and spawns a new
//! one, and any still-in-flight fetch from the old session is discarded on
//! arrival instead of being applied to state.
//!
//! Overlap policy: last-issued-wins. Every fetch carries a monotonic
//! generation token; a completion whose token is no longer the newest is
//! dropped, so a slow fetch can never overwrite the result of a later one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Default re-fetch interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Polling session configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// When false, no task is spawned and no network activity occurs.
    pub enabled: bool,
    /// Time between fetches. The first fetch is immediate.
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

type FetchFn = Arc<dyn Fn() -> BoxFuture<'static, eyre::Result<Option<String>>> + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&eyre::Report) + Send + Sync>;

struct Shared {
    value: Mutex<Option<String>>,
    loading: AtomicBool,
    generation: AtomicU64,
    stopped: AtomicBool,
}

impl Shared {
    fn set_value(&self, value: String) {
        *self
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(value);
    }
}

/// Handle to a running polling session.
///
/// Dropping the handle stops the session; an explicit [`stop`](Self::stop)
/// does the same and additionally guarantees that a fetch resolving later
/// can no longer flip `is_loading` or update the value.
pub struct BalancePoller {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
}

impl BalancePoller {
    /// Spawn a polling session over `fetch`.
    ///
    /// While enabled, performs an immediate fetch and then one per interval.
    /// Fetch failures invoke `on_error` and leave the value unchanged; the
    /// next tick retries naturally, with no backoff.
    pub fn spawn<F, E>(fetch: F, config: PollerConfig, on_error: E) -> Self
    where
        F: Fn() -> BoxFuture<'static, eyre::Result<Option<String>>> + Send + Sync + 'static,
        E: Fn(&eyre::Report) + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            value: Mutex::new(None),
            loading: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
        });
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        if config.enabled {
            let fetch: FetchFn = Arc::new(fetch);
            let on_error: ErrorFn = Arc::new(on_error);
            let task_shared = Arc::clone(&shared);
            let interval = config.interval;

            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = ticker.tick() => {
                            issue_fetch(&task_shared, &fetch, &on_error);
                        }
                    }
                }
                debug!("balance polling session stopped");
            });
        }

        Self {
            shared,
            shutdown: shutdown_tx,
        }
    }

    /// Last successfully fetched value. Survives disable/stop so the UI does
    /// not flicker back to empty.
    pub fn value(&self) -> Option<String> {
        self.shared
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True only while a fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.shared.loading.load(Ordering::SeqCst)
    }

    /// Stop polling. In-flight fetches are discarded on arrival.
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.loading.store(false, Ordering::SeqCst);
        let _ = self.shutdown.send(true);
    }
}

impl Drop for BalancePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Issue one fetch without awaiting it, tagged with a fresh generation token.
fn issue_fetch(shared: &Arc<Shared>, fetch: &FetchFn, on_error: &ErrorFn) {
    let token = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
    shared.loading.store(true, Ordering::SeqCst);

    let future = fetch();
    let shared = Arc::clone(shared);
    let on_error = Arc::clone(on_error);

    tokio::spawn(async move {
        let result = future.await;

        let is_newest = shared.generation.load(Ordering::SeqCst) == token;
        if shared.stopped.load(Ordering::SeqCst) || !is_newest {
            debug!(token, "discarding stale balance fetch result");
            return;
        }

        match result {
            Ok(Some(value)) => shared.set_value(value),
            Ok(None) => {}
            Err(error) => {
                warn!(error = %error, "balance fetch failed");
                on_error(&error);
            }
        }
        shared.loading.store(false, Ordering::SeqCst);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    async fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
        let start = tokio::time::Instant::now();
        while start.elapsed() < deadline {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        check()
    }

    #[tokio::test]
    async fn test_immediate_fetch_sets_value_and_clears_loading() {
        let poller = BalancePoller::spawn(
            || Box::pin(async { Ok(Some("42 TIA".to_string())) }),
            PollerConfig {
                enabled: true,
                interval: Duration::from_secs(3600),
            },
            |_| {},
        );

        assert!(
            wait_until(Duration::from_secs(2), || {
                poller.value() == Some("42 TIA".to_string())
            })
            .await
        );
        assert!(wait_until(Duration::from_secs(2), || !poller.is_loading()).await);
    }

    #[tokio::test]
    async fn test_disabled_poller_never_fetches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_fetch = Arc::clone(&calls);

        let poller = BalancePoller::spawn(
            move || {
                calls_in_fetch.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok(Some("1".to_string())) })
            },
            PollerConfig {
                enabled: false,
                interval: Duration::from_millis(10),
            },
            |_| {},
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(poller.value().is_none());
        assert!(!poller.is_loading());
    }

    #[tokio::test]
    async fn test_stop_mid_fetch_discards_result() {
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(Mutex::new(Some(release_rx)));

        let poller = BalancePoller::spawn(
            move || {
                let rx = release_rx.lock().unwrap().take();
                Box::pin(async move {
                    if let Some(rx) = rx {
                        let _ = rx.await;
                    }
                    Ok(Some("stale".to_string()))
                })
            },
            PollerConfig {
                enabled: true,
                interval: Duration::from_secs(3600),
            },
            |_| {},
        );

        assert!(wait_until(Duration::from_secs(2), || poller.is_loading()).await);

        poller.stop();
        let _ = release_tx.send(());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(poller.value().is_none());
        assert!(!poller.is_loading());
    }

    #[tokio::test]
    async fn test_slow_fetch_cannot_overwrite_newer_result() {
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(Mutex::new(Some(release_rx)));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_fetch = Arc::clone(&calls);

        let poller = BalancePoller::spawn(
            move || {
                let call = calls_in_fetch.fetch_add(1, Ordering::SeqCst);
                let rx = release_rx.lock().unwrap().take();
                Box::pin(async move {
                    if call == 0 {
                        // First fetch stalls until released
                        if let Some(rx) = rx {
                            let _ = rx.await;
                        }
                        Ok(Some("old".to_string()))
                    } else {
                        Ok(Some("new".to_string()))
                    }
                })
            },
            PollerConfig {
                enabled: true,
                interval: Duration::from_millis(20),
            },
            |_| {},
        );

        assert!(
            wait_until(Duration::from_secs(2), || {
                poller.value() == Some("new".to_string())
            })
            .await
        );

        // Now let the first (stale) fetch finish; it must be discarded
        let _ = release_tx.send(());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(poller.value(), Some("new".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_error_invokes_callback_and_keeps_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_fetch = Arc::clone(&calls);
        let errors = Arc::new(AtomicUsize::new(0));
        let errors_in_cb = Arc::clone(&errors);

        let poller = BalancePoller::spawn(
            move || {
                let call = calls_in_fetch.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    if call == 0 {
                        Ok(Some("kept".to_string()))
                    } else {
                        Err(eyre::eyre!("rpc unreachable"))
                    }
                })
            },
            PollerConfig {
                enabled: true,
                interval: Duration::from_millis(20),
            },
            move |_| {
                errors_in_cb.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert!(
            wait_until(Duration::from_secs(2), || {
                errors.load(Ordering::SeqCst) >= 1
            })
            .await
        );
        assert_eq!(poller.value(), Some("kept".to_string()));
        assert!(wait_until(Duration::from_secs(2), || !poller.is_loading()).await);
    }
}
