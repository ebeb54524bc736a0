//! The actor store
//!
//! Owns the lifecycle of one configured connection to one remote actor:
//! identity binding and handshake, the per-method call states, and the
//! observer registry through which every state transition is published.
//!
//! All mutations go through [`ActorStore::transition`], which swaps in a new
//! immutable snapshot and notifies observers synchronously before returning.
//! A reentrant gate serialises these rounds so snapshots reach observers in
//! the order they were produced.

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::{Mutex, ReentrantMutex};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::hook::{QueryHook, UpdateHook};
use super::observer::{Listener, Observers, Subscription};
use super::signal::{ReadySignal, Readiness};
use super::state::{ActorState, CallState, SessionId};
use super::{ActorConnectionConfig, StoreOptions};
use crate::agent::{CallRequest, HandshakeRequest, SharedExecutor, SharedIdentity};
use crate::error::{
    InitializationError, RemoteCallError, Result, StoreError, UnsupportedTypeError,
};
use crate::interface::fields::derive_method_field;
use crate::interface::{
    DynamicField, MethodDescriptor, MethodKind, ServiceDescriptor, derive_fields,
};

/// Target used for per-snapshot devtools logging
pub const DEVTOOLS_TARGET: &str = "reactor::devtools";

/// Handle to an actor store. Cloning is cheap; clones share one state.
#[derive(Clone)]
pub struct ActorStore {
    shared: Arc<Shared>,
}

struct Shared {
    descriptor: Arc<ServiceDescriptor>,
    options: StoreOptions,
    executor: SharedExecutor,
    state: Mutex<Arc<ActorState>>,
    observers: Arc<Observers<Arc<ActorState>>>,
    ready: ReadySignal,
    binding: Mutex<Option<Binding>>,
    gate: ReentrantMutex<()>,
    sequence: AtomicU64,
}

/// Connection bound by a successful initialization
#[derive(Clone)]
struct Binding {
    session: SessionId,
    endpoint: String,
    identity: SharedIdentity,
    devtools_enabled: bool,
}

impl ActorStore {
    /// Create a store for `descriptor`, calling out through `executor`.
    ///
    /// Prefer [`super::StoreRegistry::get_or_create`] when several components
    /// need to share the store for the same actor and endpoint.
    pub fn new(
        descriptor: Arc<ServiceDescriptor>,
        options: StoreOptions,
        executor: SharedExecutor,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                descriptor,
                options,
                executor,
                state: Mutex::new(Arc::new(ActorState::default())),
                observers: Arc::new(Observers::new()),
                ready: ReadySignal::new(),
                binding: Mutex::new(None),
                gate: ReentrantMutex::new(()),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    /// Service descriptor of the actor
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.shared.descriptor
    }

    /// Options the store was created with
    pub fn options(&self) -> &StoreOptions {
        &self.shared.options
    }

    /// Current snapshot
    pub fn state(&self) -> Arc<ActorState> {
        Arc::clone(&self.shared.state.lock())
    }

    /// Current readiness of the initialization session
    pub fn readiness(&self) -> Readiness {
        self.shared.ready.current()
    }

    /// Whether two handles refer to the same store
    pub fn same_store(&self, other: &ActorStore) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Register a listener called synchronously with every new snapshot.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<Arc<ActorState>>
    where
        F: Fn(&Arc<ActorState>) + Send + Sync + 'static,
    {
        let listener: Listener<Arc<ActorState>> = Arc::new(listener);
        let id = self.shared.observers.register(listener);
        Subscription::new(id, &self.shared.observers)
    }

    /// Number of registered listeners
    pub fn subscriber_count(&self) -> usize {
        self.shared.observers.len()
    }

    /// Wait until initialization settles, on success or on failure.
    pub async fn wait_until_ready(&self) -> Result<()> {
        self.shared.ready.wait().await
    }

    /// Bind `config` and run the handshake.
    ///
    /// While a handshake is in flight further calls do not start another one;
    /// they wait for the running one and report its outcome. Calling again
    /// after it settled starts a fresh session and clears all call states.
    pub async fn initialize(&self, config: ActorConnectionConfig, is_local: bool) -> Result<()> {
        let session = Uuid::new_v4();
        let principal = config.identity.principal();

        let started = self.transition(|state| {
            if state.initializing {
                return None;
            }
            state.initializing = true;
            state.initialized = false;
            state.error = None;
            state.method_state.clear();
            state.principal = Some(principal.clone());
            state.session = Some(session);
            self.shared.ready.reset();
            *self.shared.binding.lock() = None;
            Some(())
        });

        if started.is_none() {
            debug!(
                canister = %self.canister_id(),
                "initialize already in flight, awaiting outcome"
            );
            return self.wait_until_ready().await;
        }

        info!(
            canister = %self.canister_id(),
            endpoint = %config.network_endpoint,
            principal = %principal,
            local = is_local,
            "initializing actor"
        );

        // fails the session if this future is dropped before the handshake settles
        let mut guard = SessionGuard {
            store: self,
            session,
            armed: true,
        };
        let outcome = self.handshake(&config, is_local).await;
        guard.armed = false;

        match outcome {
            Ok(()) => {
                let binding = Binding {
                    session,
                    endpoint: config.network_endpoint.clone(),
                    identity: Arc::clone(&config.identity),
                    devtools_enabled: config.devtools_enabled,
                };
                self.transition(|state| {
                    if state.session != Some(session) {
                        return None;
                    }
                    state.initializing = false;
                    state.initialized = true;
                    *self.shared.binding.lock() = Some(binding);
                    self.shared.ready.resolve(Readiness::Ready);
                    Some(())
                });
                info!(canister = %self.canister_id(), "actor initialized");
                Ok(())
            }
            Err(err) => {
                warn!(canister = %self.canister_id(), error = %err, "actor initialization failed");
                self.fail_session(session, err.clone());
                Err(StoreError::Initialization(err))
            }
        }
    }

    /// Move `session` to its failed terminal state, unless a newer session
    /// replaced it.
    fn fail_session(&self, session: SessionId, err: InitializationError) {
        self.transition(|state| {
            if state.session != Some(session) || !state.initializing {
                return None;
            }
            state.initializing = false;
            state.initialized = false;
            state.error = Some(err.clone());
            self.shared.ready.resolve(Readiness::Failed(err));
            Some(())
        });
    }

    /// Record an initialization that failed before a handshake could start,
    /// e.g. because no identity was available.
    ///
    /// Ignored while another initialization is in flight.
    pub(crate) fn record_initialization_failure(&self, err: InitializationError) {
        self.transition(|state| {
            if state.initializing {
                return None;
            }
            state.initialized = false;
            state.error = Some(err.clone());
            state.method_state.clear();
            state.principal = None;
            state.session = Some(Uuid::new_v4());
            *self.shared.binding.lock() = None;
            self.shared.ready.reset();
            self.shared.ready.resolve(Readiness::Failed(err));
            Some(())
        });
    }

    async fn handshake(
        &self,
        config: &ActorConnectionConfig,
        is_local: bool,
    ) -> std::result::Result<(), InitializationError> {
        let request = HandshakeRequest {
            canister_id: self.canister_id().to_string(),
            endpoint: config.network_endpoint.clone(),
            identity: Arc::clone(&config.identity),
            fetch_root_key: is_local,
        };
        let info = self.shared.executor.handshake(request).await?;

        if is_local && !info.root_key_fetched {
            debug!(canister = %self.canister_id(), "local replica did not provide a root key");
        }

        if let Some(remote) = info.remote_methods {
            let missing: Vec<String> = self
                .shared
                .descriptor
                .method_names()
                .filter(|name| !remote.iter().any(|candidate| candidate == name))
                .map(String::from)
                .collect();
            if !missing.is_empty() {
                return Err(InitializationError::DescriptorMismatch { missing });
            }
        }
        Ok(())
    }

    /// Start a call and return a future for its reply.
    ///
    /// The preconditions are checked synchronously: a store that is not
    /// initialized yields [`StoreError::NotInitialized`] and an unknown name
    /// [`StoreError::UnknownMethod`], both without touching the state. On
    /// success the method's call state is already `loading` when this returns.
    ///
    /// The returned [`PendingCall`] must be polled for the call state to
    /// settle; a call that never completes stays `loading`.
    pub fn dispatch(&self, method: &str, args: Vec<Value>) -> Result<PendingCall> {
        let binding = {
            let state = self.shared.state.lock();
            let binding = self.shared.binding.lock().clone();
            binding.filter(|_| state.initialized)
        };
        let Some(binding) = binding else {
            return Err(StoreError::NotInitialized {
                method: method.to_string(),
            });
        };

        let descriptor = self
            .shared
            .descriptor
            .method(method)
            .cloned()
            .ok_or_else(|| StoreError::UnknownMethod {
                method: method.to_string(),
            })?;

        // allocated under the gate so sequence order matches write order
        let dispatched = self.transition(|state| {
            if state.session != Some(binding.session) {
                return None;
            }
            let sequence = self.shared.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            state
                .method_state
                .insert(method.to_string(), CallState::dispatched(sequence, args.clone()));
            Some(sequence)
        });
        let Some(sequence) = dispatched else {
            // re-initialized between the check and the dispatch
            return Err(StoreError::NotInitialized {
                method: method.to_string(),
            });
        };

        debug!(canister = %self.canister_id(), method, sequence, "dispatching call");

        let request = CallRequest {
            canister_id: self.canister_id().to_string(),
            endpoint: binding.endpoint.clone(),
            identity: Arc::clone(&binding.identity),
            devtools_enabled: binding.devtools_enabled,
            method: descriptor,
            args,
        };
        let reply = self.shared.executor.call(request);

        let store = self.clone();
        let name = method.to_string();
        let future = async move {
            let outcome = reply.await.map_err(|source| RemoteCallError {
                method: name.clone(),
                source,
            });
            store.settle(&name, sequence, outcome.clone());
            outcome
        }
        .boxed();

        Ok(PendingCall {
            method: method.to_string(),
            sequence,
            future,
        })
    }

    /// Call `method` and wait for its reply.
    pub async fn call_method(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let pending = self.dispatch(method, args)?;
        Ok(pending.await?)
    }

    fn settle(
        &self,
        method: &str,
        sequence: u64,
        outcome: std::result::Result<Value, RemoteCallError>,
    ) {
        let applied = self.transition(|state| {
            let entry = state.method_state.get_mut(method)?;
            if entry.sequence != sequence {
                return None;
            }
            entry.resolve(outcome);
            Some(())
        });
        match applied {
            Some(()) => debug!(canister = %self.canister_id(), method, sequence, "call settled"),
            None => debug!(
                canister = %self.canister_id(),
                method,
                sequence,
                "discarding stale resolution"
            ),
        }
    }

    /// Hook for a query method
    pub fn query_hook(&self, method: &str) -> Result<QueryHook> {
        let descriptor = self.method_of_kind(method, MethodKind::Query)?;
        Ok(QueryHook::new(self.clone(), descriptor))
    }

    /// Hook for an update method
    pub fn update_hook(&self, method: &str) -> Result<UpdateHook> {
        let descriptor = self.method_of_kind(method, MethodKind::Update)?;
        Ok(UpdateHook::new(self.clone(), descriptor))
    }

    fn method_of_kind(&self, method: &str, expected: MethodKind) -> Result<MethodDescriptor> {
        let descriptor = self
            .shared
            .descriptor
            .method(method)
            .ok_or_else(|| StoreError::UnknownMethod {
                method: method.to_string(),
            })?;
        if descriptor.kind != expected {
            return Err(StoreError::KindMismatch {
                method: method.to_string(),
                expected,
                actual: descriptor.kind,
            });
        }
        Ok(descriptor.clone())
    }

    /// Form descriptions for every method of the actor
    pub fn method_fields(&self) -> std::result::Result<Vec<DynamicField>, UnsupportedTypeError> {
        derive_fields(&self.shared.descriptor)
    }

    /// Form description for one method
    pub(crate) fn method_field(
        &self,
        method: &MethodDescriptor,
    ) -> std::result::Result<DynamicField, UnsupportedTypeError> {
        derive_method_field(&self.shared.descriptor, method)
    }

    fn canister_id(&self) -> &str {
        &self.shared.descriptor.canister_id
    }

    /// Apply `mutate` to a copy of the state, publish it, and notify.
    ///
    /// `mutate` returns `None` to leave the state untouched; no notification
    /// is sent in that case.
    fn transition<R>(&self, mutate: impl FnOnce(&mut ActorState) -> Option<R>) -> Option<R> {
        let _gate = self.shared.gate.lock();
        let (result, snapshot) = {
            let mut current = self.shared.state.lock();
            let mut next = ActorState::clone(&current);
            let result = mutate(&mut next)?;
            next.version += 1;
            let snapshot = Arc::new(next);
            *current = Arc::clone(&snapshot);
            (result, snapshot)
        };

        if self.devtools_enabled() {
            debug!(
                target: DEVTOOLS_TARGET,
                canister = %self.canister_id(),
                state = ?snapshot,
                "state transition"
            );
        }
        self.shared.observers.notify(&snapshot);
        Some(result)
    }

    fn devtools_enabled(&self) -> bool {
        self.shared.options.with_devtools
            || self
                .shared
                .binding
                .lock()
                .as_ref()
                .map(|binding| binding.devtools_enabled)
                .unwrap_or(false)
    }
}

struct SessionGuard<'a> {
    store: &'a ActorStore,
    session: SessionId,
    armed: bool,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(
                canister = %self.store.canister_id(),
                "initialize dropped before the handshake settled"
            );
            self.store
                .fail_session(self.session, InitializationError::Cancelled);
        }
    }
}

/// Reply future of a dispatched call
pub struct PendingCall {
    method: String,
    sequence: u64,
    future: BoxFuture<'static, std::result::Result<Value, RemoteCallError>>,
}

impl PendingCall {
    /// Method being called
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Dispatch sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Future for PendingCall {
    type Output = std::result::Result<Value, RemoteCallError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall")
            .field("method", &self.method)
            .field("sequence", &self.sequence)
            .finish()
    }
}
