//! Keyed service-instance cache
//!
//! One cached service object per `(kind, contract address)` pair, lazily
//! created. The cache is bound to the signer/provider that built the
//! instances: switching the active provider invalidates everything so the
//! next call re-derives handles from the new signer instead of reusing
//! handles bound to the old one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::error::BridgeError;

/// The kind of service a cached instance represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Erc20,
    Withdrawer,
}

struct State<T> {
    /// Identity of the provider the cached instances were derived from.
    provider_id: Option<String>,
    map: HashMap<(ServiceKind, String), Arc<T>>,
}

/// Cache of service instances keyed by kind and contract address.
pub struct ServiceCache<T> {
    state: Mutex<State<T>>,
}

impl<T> Default for ServiceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ServiceCache<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                provider_id: None,
                map: HashMap::new(),
            }),
        }
    }

    /// Fetch the cached instance for `(kind, address)`, building it with
    /// `create` on a miss.
    ///
    /// If `provider_id` differs from the provider the cache was populated
    /// under, all cached instances are dropped first.
    pub fn get_or_create(
        &self,
        kind: ServiceKind,
        address: &str,
        provider_id: &str,
        create: impl FnOnce() -> Result<T, BridgeError>,
    ) -> Result<Arc<T>, BridgeError> {
        let mut state = self.lock();

        if state.provider_id.as_deref() != Some(provider_id) {
            if state.provider_id.is_some() {
                debug!(provider_id, "provider changed, invalidating service cache");
            }
            state.map.clear();
            state.provider_id = Some(provider_id.to_string());
        }

        let key = (kind, address.to_string());
        if let Some(existing) = state.map.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let instance = Arc::new(create()?);
        state.map.insert(key, Arc::clone(&instance));
        Ok(instance)
    }

    /// Drop all cached instances.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.map.clear();
        state.provider_id = None;
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().map.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
