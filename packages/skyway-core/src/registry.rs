//! Wallet provider discovery registry
//!
//! Injected wallet providers announce themselves at arbitrary times; the
//! registry accumulates a set deduplicated by provider identity and notifies
//! subscribers of each new arrival. Consumers treat it as a lazily-populated,
//! continuously-updated sequence rather than a one-shot fetch.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::debug;

/// Identity and display data announced by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderInfo {
    /// Stable unique identity (e.g. a UUID or reverse-DNS name).
    pub uuid: String,
    /// Human-readable wallet name.
    pub name: String,
    /// Optional icon reference.
    pub icon_url: Option<String>,
}

struct Inner {
    providers: Vec<ProviderInfo>,
    seen: HashSet<String>,
}

/// Registry of announced wallet providers.
pub struct ProviderRegistry {
    inner: Mutex<Inner>,
    announcements: broadcast::Sender<ProviderInfo>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        let (announcements, _) = broadcast::channel(16);
        Self {
            inner: Mutex::new(Inner {
                providers: Vec::new(),
                seen: HashSet::new(),
            }),
            announcements,
        }
    }

    /// Record an announcement. Returns false for a duplicate identity;
    /// subscribers are only notified of first arrivals.
    pub fn announce(&self, info: ProviderInfo) -> bool {
        {
            let mut inner = self.lock();
            if !inner.seen.insert(info.uuid.clone()) {
                debug!(uuid = %info.uuid, "ignoring duplicate provider announcement");
                return false;
            }
            inner.providers.push(info.clone());
        }
        // No receivers is fine; late subscribers catch up via providers()
        let _ = self.announcements.send(info);
        true
    }

    /// Providers announced so far, in arrival order.
    pub fn providers(&self) -> Vec<ProviderInfo> {
        self.lock().providers.clone()
    }

    /// Subscribe to future announcements. Combine with [`providers`] for the
    /// full picture (announcements sent before subscribing are not replayed).
    pub fn subscribe(&self) -> broadcast::Receiver<ProviderInfo> {
        self.announcements.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(uuid: &str, name: &str) -> ProviderInfo {
        ProviderInfo {
            uuid: uuid.to_string(),
            name: name.to_string(),
            icon_url: None,
        }
    }

    #[test]
    fn test_announce_deduplicates_by_identity() {
        let registry = ProviderRegistry::new();
        assert!(registry.announce(provider("a", "Keplr")));
        assert!(registry.announce(provider("b", "Leap")));
        // Same identity, different display data: still a duplicate
        assert!(!registry.announce(provider("a", "Keplr v2")));

        let providers = registry.providers();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].name, "Keplr");
        assert_eq!(providers[1].name, "Leap");
    }

    #[tokio::test]
    async fn test_subscribers_see_new_announcements() {
        let registry = ProviderRegistry::new();
        registry.announce(provider("early", "Early Wallet"));

        let mut rx = registry.subscribe();
        registry.announce(provider("late", "Late Wallet"));

        let announced = rx.recv().await.unwrap();
        assert_eq!(announced.uuid, "late");
        // The pre-subscription provider is available from the accumulated set
        assert_eq!(registry.providers().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_announcement_not_broadcast() {
        let registry = ProviderRegistry::new();
        registry.announce(provider("a", "Keplr"));

        let mut rx = registry.subscribe();
        registry.announce(provider("a", "Keplr"));
        registry.announce(provider("b", "Leap"));

        // The duplicate is skipped; the first received event is "b"
        let announced = rx.recv().await.unwrap();
        assert_eq!(announced.uuid, "b");
    }
}
