//! Store registry
//!
//! Hands out exactly one [`ActorStore`] per (descriptor, endpoint) pair. The
//! registry is an ordinary value: callers create it once and pass it (or the
//! stores it returns) to whatever needs them, instead of relying on a
//! process-wide singleton.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::actor::ActorStore;
use super::{ActorConnectionConfig, Network, StoreOptions};
use crate::agent::{IdentityProvider, SharedExecutor};
use crate::error::InitializationError;
use crate::interface::{DescriptorFingerprint, ServiceDescriptor};

/// Registry key: descriptor fingerprint and endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    /// Content hash of the descriptor
    pub fingerprint: DescriptorFingerprint,
    /// Endpoint the store talks to
    pub endpoint: String,
}

/// Factory and cache of actor stores
pub struct StoreRegistry {
    executor: SharedExecutor,
    network: Network,
    identity_provider: Option<Arc<dyn IdentityProvider>>,
    stores: RwLock<HashMap<StoreKey, ActorStore>>,
}

impl StoreRegistry {
    /// Create a registry whose stores call out through `executor` on `network`
    pub fn new(executor: SharedExecutor, network: Network) -> Self {
        Self {
            executor,
            network,
            identity_provider: None,
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Identity source used to initialize stores created with
    /// `initialize_on_mount`
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity_provider = Some(provider);
        self
    }

    /// Network the registry targets
    pub fn network(&self) -> Network {
        self.network
    }

    /// Return the store for `descriptor` at the endpoint selected by
    /// `options`, creating it on first use.
    ///
    /// A newly created store with `initialize_on_mount` set is initialized in
    /// the background when an identity provider is configured and a tokio
    /// runtime is available.
    pub fn get_or_create(
        &self,
        descriptor: Arc<ServiceDescriptor>,
        options: StoreOptions,
    ) -> ActorStore {
        let key = StoreKey {
            fingerprint: descriptor.fingerprint(),
            endpoint: options.endpoint(self.network),
        };

        if let Some(store) = self.stores.read().get(&key) {
            return store.clone();
        }

        let mut stores = self.stores.write();
        // another caller may have won the race between the two locks
        if let Some(store) = stores.get(&key) {
            return store.clone();
        }

        debug!(
            canister = %descriptor.canister_id,
            endpoint = %key.endpoint,
            "creating actor store"
        );
        let mount = options.initialize_on_mount;
        let store = ActorStore::new(descriptor, options, Arc::clone(&self.executor));
        stores.insert(key, store.clone());
        drop(stores);

        if mount {
            self.mount(&store);
        }
        store
    }

    /// Look up an existing store
    pub fn get(&self, descriptor: &ServiceDescriptor, endpoint: &str) -> Option<ActorStore> {
        let key = StoreKey {
            fingerprint: descriptor.fingerprint(),
            endpoint: endpoint.to_string(),
        };
        self.stores.read().get(&key).cloned()
    }

    /// Number of live stores
    pub fn len(&self) -> usize {
        self.stores.read().len()
    }

    /// True if no store was created yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mount(&self, store: &ActorStore) {
        let Some(provider) = &self.identity_provider else {
            debug!("no identity provider configured, skipping initialize on mount");
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime available, skipping initialize on mount");
            return;
        };

        let identity = match provider.init_identity(self.network.is_local()) {
            Ok(identity) => identity,
            Err(err) => {
                warn!(error = %err, "identity unavailable, initialize on mount failed");
                // waiters on the store must see the failure
                store.record_initialization_failure(InitializationError::IdentityRejected(
                    err.to_string(),
                ));
                return;
            }
        };

        let config = ActorConnectionConfig::for_network(store.options(), self.network, identity);
        let store = store.clone();
        let is_local = self.network.is_local();
        runtime.spawn(async move {
            // failures are recorded in the store state
            let _ = store.initialize(config, is_local).await;
        });
    }
}
