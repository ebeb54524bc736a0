//! One-shot actor bootstrap
//!
//! Resolves an identity for the selected network, initializes the store,
//! waits for the handshake to settle and probes the actor's `version`.

use serde_json::Value;
use tracing::info;

use super::actor::ActorStore;
use super::{ActorConnectionConfig, Network};
use crate::agent::IdentityProvider;
use crate::error::{InitializationError, Result};

/// Name of the method probed after initialization
pub const VERSION_METHOD: &str = "version";

/// Initialize `store` against `network` and return the actor's version.
///
/// Initialization failures are returned as errors instead of leaving the
/// caller waiting forever.
pub async fn load_actor(
    store: &ActorStore,
    provider: &dyn IdentityProvider,
    network: Network,
) -> Result<Value> {
    let identity = match provider.init_identity(network.is_local()) {
        Ok(identity) => identity,
        Err(err) => {
            let err = InitializationError::IdentityRejected(err.to_string());
            store.record_initialization_failure(err.clone());
            return Err(err.into());
        }
    };
    info!(principal = %identity.principal(), network = %network, "identity resolved");

    let config = ActorConnectionConfig::for_network(store.options(), network, identity);
    // a concurrent initialize is joined rather than restarted
    store.initialize(config, network.is_local()).await?;

    let version = store.call_method(VERSION_METHOD, Vec::new()).await?;
    info!(canister = %store.descriptor().canister_id, version = %version, "actor initialized");
    Ok(version)
}
