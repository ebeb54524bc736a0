//! Reactive actor-client store
//!
//! This module ties the pieces together: configuration, the [`ActorStore`]
//! itself, its immutable state snapshots, the observer registry, the
//! readiness barrier, per-method hooks, and the registry that hands out one
//! store per (descriptor, endpoint) pair.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::agent::SharedIdentity;
use crate::error::ConfigError;

pub mod actor;
pub mod bootstrap;
pub mod hook;
pub mod observer;
pub mod registry;
pub mod signal;
pub mod state;

pub use actor::{ActorStore, PendingCall};
pub use hook::{MethodHook, QueryHook, UpdateHook};
pub use observer::{ListenerId, Subscription};
pub use registry::StoreRegistry;
pub use signal::Readiness;
pub use state::{ActorState, CallState};

/// Production endpoint
pub const MAINNET_ENDPOINT: &str = "https://ic0.app";

/// Local development replica endpoint
pub const LOCAL_ENDPOINT: &str = "http://localhost:4943";

/// Network target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    /// Production network
    Mainnet,
    /// Local development replica
    Local,
}

impl Network {
    /// Select the network from a "mainnet" flag
    pub fn from_mainnet_flag(mainnet: bool) -> Self {
        if mainnet {
            Network::Mainnet
        } else {
            Network::Local
        }
    }

    /// Default endpoint of the network
    pub fn endpoint(self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_ENDPOINT,
            Network::Local => LOCAL_ENDPOINT,
        }
    }

    /// True for the local replica
    pub fn is_local(self) -> bool {
        matches!(self, Network::Local)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Local => write!(f, "local"),
        }
    }
}

/// Options a store is created with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Remote service identifier
    pub canister_id: String,

    /// Endpoint override; the network default is used when absent
    pub host: Option<String>,

    /// Log every state snapshot under the devtools target
    pub with_devtools: bool,

    /// Initialize as soon as a store is created by the registry
    pub initialize_on_mount: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            canister_id: String::new(),
            host: None,
            with_devtools: false,
            initialize_on_mount: true,
        }
    }
}

impl StoreOptions {
    /// Options for `canister_id` with defaults elsewhere
    pub fn new(canister_id: impl Into<String>) -> Self {
        Self {
            canister_id: canister_id.into(),
            ..Self::default()
        }
    }

    /// Endpoint to use on `network`
    pub fn endpoint(&self, network: Network) -> String {
        self.host
            .clone()
            .unwrap_or_else(|| network.endpoint().to_string())
    }

    /// Load options from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Connection parameters handed to [`ActorStore::initialize`]
#[derive(Clone)]
pub struct ActorConnectionConfig {
    /// Endpoint URL
    pub network_endpoint: String,
    /// Identity the session signs with
    pub identity: SharedIdentity,
    /// Enable development tooling for this session
    pub devtools_enabled: bool,
}

impl ActorConnectionConfig {
    /// Build a config for `network`, honouring the store's host override
    pub fn for_network(options: &StoreOptions, network: Network, identity: SharedIdentity) -> Self {
        Self {
            network_endpoint: options.endpoint(network),
            identity,
            devtools_enabled: options.with_devtools,
        }
    }
}

impl fmt::Debug for ActorConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorConnectionConfig")
            .field("network_endpoint", &self.network_endpoint)
            .field("principal", &self.identity.principal())
            .field("devtools_enabled", &self.devtools_enabled)
            .finish()
    }
}
