//! Call executor boundary
//!
//! A [`CallExecutor`] performs the actual network round-trips: one handshake
//! per initialization session and one request per method invocation. The
//! store treats it as opaque and only interprets its [`ExecutorError`]s.

use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

use super::identity::SharedIdentity;
use crate::error::ExecutorError;
use crate::interface::MethodDescriptor;

/// Parameters of the initial handshake
#[derive(Clone)]
pub struct HandshakeRequest {
    /// Service being connected to
    pub canister_id: String,
    /// Network endpoint
    pub endpoint: String,
    /// Identity the session is bound to
    pub identity: SharedIdentity,
    /// Fetch the replica root key (local replicas only)
    pub fetch_root_key: bool,
}

/// Result of a successful handshake
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeInfo {
    /// Whether the root key was fetched from the replica
    pub root_key_fetched: bool,
    /// Methods the remote actor exposes, when the executor can tell
    pub remote_methods: Option<Vec<String>>,
}

/// A single remote invocation
#[derive(Clone)]
pub struct CallRequest {
    /// Service being called
    pub canister_id: String,
    /// Network endpoint
    pub endpoint: String,
    /// Signing identity
    pub identity: SharedIdentity,
    /// Development tooling enabled for this session
    pub devtools_enabled: bool,
    /// Method being invoked
    pub method: MethodDescriptor,
    /// Argument tuple
    pub args: Vec<Value>,
}

/// Performs remote calls on behalf of the store
pub trait CallExecutor: Send + Sync {
    /// Establish the session: probe the endpoint and validate the identity
    fn handshake(
        &self,
        request: HandshakeRequest,
    ) -> BoxFuture<'static, Result<HandshakeInfo, ExecutorError>>;

    /// Invoke one method and decode its reply
    fn call(&self, request: CallRequest) -> BoxFuture<'static, Result<Value, ExecutorError>>;
}

/// Shared handle to a call executor
pub type SharedExecutor = Arc<dyn CallExecutor>;
