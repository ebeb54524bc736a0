//! Method invocation hooks
//!
//! A hook wraps one named method of an [`ActorStore`] and exposes the
//! method's `{data, error, loading}` state plus a trigger. Hooks never write
//! to the store's state themselves; they dispatch through the store and read
//! back the method's [`CallState`].
//!
//! Query hooks may fetch on their own (e.g. once the store becomes ready) and
//! refetch with the last arguments. Update hooks only run on an explicit
//! [`MethodHook::trigger`] or [`MethodHook::call`], exactly once per invocation.

use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use super::actor::ActorStore;
use super::observer::Subscription;
use super::state::{ActorState, CallState};
use crate::error::{Result, StoreError, UnsupportedTypeError};
use crate::interface::{DynamicField, MethodDescriptor, MethodKind};

/// Shared part of query and update hooks
#[derive(Clone)]
pub struct MethodHook {
    store: ActorStore,
    method: MethodDescriptor,
}

impl MethodHook {
    fn new(store: ActorStore, method: MethodDescriptor) -> Self {
        Self { store, method }
    }

    /// Name of the wrapped method
    pub fn function_name(&self) -> &str {
        &self.method.name
    }

    /// Query or update
    pub fn kind(&self) -> MethodKind {
        self.method.kind
    }

    /// Descriptor of the wrapped method
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.method
    }

    /// Current call state (idle until the first call)
    pub fn state(&self) -> CallState {
        self.store.state().call_state(&self.method.name)
    }

    /// Last successful reply
    pub fn data(&self) -> Option<Value> {
        self.state().data
    }

    /// A call is in flight
    pub fn loading(&self) -> bool {
        self.state().loading
    }

    /// Argument shape for rendering an input form
    pub fn field(&self) -> std::result::Result<DynamicField, UnsupportedTypeError> {
        self.store.method_field(&self.method)
    }

    /// Start a call without waiting for it.
    ///
    /// Precondition failures are returned immediately, as is
    /// [`StoreError::NoRuntime`] when called outside a tokio runtime. Remote
    /// failures are not returned; they land in [`CallState::error`].
    pub fn trigger(&self, args: Vec<Value>) -> Result<JoinHandle<()>> {
        let runtime = self.runtime()?;
        let pending = self.store.dispatch(&self.method.name, args)?;
        Ok(runtime.spawn(async move {
            let _ = pending.await;
        }))
    }

    // checked before dispatch so a missing runtime never leaves a call loading
    fn runtime(&self) -> Result<Handle> {
        Handle::try_current().map_err(|_| StoreError::NoRuntime {
            method: self.method.name.clone(),
        })
    }

    /// Run a call to completion and return the resulting call state.
    ///
    /// If a newer call for the same method was dispatched in the meantime,
    /// the returned state is the newer one.
    pub async fn call(&self, args: Vec<Value>) -> Result<CallState> {
        let pending = self.store.dispatch(&self.method.name, args)?;
        if let Err(err) = pending.await {
            debug!(method = %self.method.name, error = %err, "call failed");
        }
        Ok(self.state())
    }

    /// Register a listener for this method's call state only.
    ///
    /// The listener fires when a snapshot changes this method's state, not on
    /// transitions that concern other methods or initialization.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<Arc<ActorState>>
    where
        F: Fn(&CallState) + Send + Sync + 'static,
    {
        let method = self.method.name.clone();
        let last_seen = parking_lot::Mutex::new(self.state());
        self.store.subscribe(move |snapshot| {
            let current = snapshot.call_state(&method);
            let mut last_seen = last_seen.lock();
            if *last_seen != current {
                *last_seen = current.clone();
                drop(last_seen);
                listener(&current);
            }
        })
    }
}

/// Hook around a query method
#[derive(Clone)]
pub struct QueryHook {
    hook: MethodHook,
}

impl QueryHook {
    pub(crate) fn new(store: ActorStore, method: MethodDescriptor) -> Self {
        Self {
            hook: MethodHook::new(store, method),
        }
    }

    /// Fetch once the store is ready, without an explicit trigger.
    ///
    /// The task resolves with the call state, or with the initialization
    /// error if the store fails to initialize.
    pub fn fetch_when_ready(&self, args: Vec<Value>) -> Result<JoinHandle<Result<CallState>>> {
        let runtime = self.hook.runtime()?;
        let hook = self.hook.clone();
        Ok(runtime.spawn(async move {
            hook.store.wait_until_ready().await?;
            hook.call(args).await
        }))
    }

    /// Re-run the query with the arguments of the last call (none if it was
    /// never called).
    pub async fn refetch(&self) -> Result<CallState> {
        let args = self.hook.state().last_args.unwrap_or_default();
        self.hook.call(args).await
    }
}

impl Deref for QueryHook {
    type Target = MethodHook;

    fn deref(&self) -> &MethodHook {
        &self.hook
    }
}

/// Hook around an update method
#[derive(Clone)]
pub struct UpdateHook {
    hook: MethodHook,
}

impl UpdateHook {
    pub(crate) fn new(store: ActorStore, method: MethodDescriptor) -> Self {
        Self {
            hook: MethodHook::new(store, method),
        }
    }
}

impl Deref for UpdateHook {
    type Target = MethodHook;

    fn deref(&self) -> &MethodHook {
        &self.hook
    }
}
