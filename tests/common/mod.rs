#![allow(dead_code)]

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use reactor::agent::{
    AnonymousIdentity, CallExecutor, CallRequest, HandshakeInfo, HandshakeRequest,
    IdentityProvider, Principal, SharedIdentity, SigningIdentity,
};
use reactor::error::{ExecutorError, IdentityError};
use reactor::interface::{ArgumentSpec, FieldSpec, MethodDescriptor, ServiceDescriptor, TypeSpec};
use reactor::store::LOCAL_ENDPOINT;
use reactor::{ActorConnectionConfig, ActorStore, StoreOptions};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

type HandshakeReply = Result<HandshakeInfo, ExecutorError>;
type CallReply = Result<Value, ExecutorError>;

/// Call observed by the fake executor
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub args: Vec<Value>,
    pub endpoint: String,
    pub principal: Principal,
    pub devtools_enabled: bool,
}

/// Handshake observed by the fake executor
#[derive(Debug, Clone)]
pub struct RecordedHandshake {
    pub endpoint: String,
    pub fetch_root_key: bool,
    pub principal: Principal,
}

enum HandshakeMode {
    Immediate(HandshakeReply),
    Gated,
}

struct FakeState {
    handshake_mode: HandshakeMode,
    handshakes: Vec<RecordedHandshake>,
    pending_handshakes: Vec<oneshot::Sender<HandshakeReply>>,
    replies: HashMap<String, CallReply>,
    calls: Vec<RecordedCall>,
    pending_calls: HashMap<usize, oneshot::Sender<CallReply>>,
}

/// Call executor whose replies are controlled by the test.
///
/// Handshakes succeed immediately unless the executor is gated. Calls to a
/// method with a registered reply resolve immediately; all other calls stay
/// pending until [`FakeExecutor::resolve_call`] is invoked with their index.
pub struct FakeExecutor {
    state: Mutex<FakeState>,
}

impl FakeExecutor {
    fn with_mode(handshake_mode: HandshakeMode) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                handshake_mode,
                handshakes: Vec::new(),
                pending_handshakes: Vec::new(),
                replies: HashMap::new(),
                calls: Vec::new(),
                pending_calls: HashMap::new(),
            }),
        })
    }

    pub fn new() -> Arc<Self> {
        Self::with_mode(HandshakeMode::Immediate(Ok(HandshakeInfo::default())))
    }

    pub fn gated() -> Arc<Self> {
        Self::with_mode(HandshakeMode::Gated)
    }

    pub fn failing(err: ExecutorError) -> Arc<Self> {
        Self::with_mode(HandshakeMode::Immediate(Err(err)))
    }

    pub fn reporting_methods(methods: &[&str]) -> Arc<Self> {
        Self::with_mode(HandshakeMode::Immediate(Ok(HandshakeInfo {
            root_key_fetched: true,
            remote_methods: Some(methods.iter().map(|m| m.to_string()).collect()),
        })))
    }

    pub fn reply(&self, method: &str, reply: CallReply) {
        self.state.lock().replies.insert(method.to_string(), reply);
    }

    pub fn release_handshakes(&self, reply: HandshakeReply) {
        let pending: Vec<_> = self.state.lock().pending_handshakes.drain(..).collect();
        for sender in pending {
            let _ = sender.send(reply.clone());
        }
    }

    pub fn resolve_call(&self, index: usize, reply: CallReply) {
        let sender = self
            .state
            .lock()
            .pending_calls
            .remove(&index)
            .expect("no pending call at index");
        let _ = sender.send(reply);
    }

    pub fn handshakes(&self) -> Vec<RecordedHandshake> {
        self.state.lock().handshakes.clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }
}

impl CallExecutor for FakeExecutor {
    fn handshake(&self, request: HandshakeRequest) -> BoxFuture<'static, HandshakeReply> {
        let mut state = self.state.lock();
        state.handshakes.push(RecordedHandshake {
            endpoint: request.endpoint.clone(),
            fetch_root_key: request.fetch_root_key,
            principal: request.identity.principal(),
        });

        match &state.handshake_mode {
            HandshakeMode::Immediate(reply) => {
                let reply = reply.clone();
                async move { reply }.boxed()
            }
            HandshakeMode::Gated => {
                let (sender, receiver) = oneshot::channel();
                state.pending_handshakes.push(sender);
                async move {
                    receiver
                        .await
                        .unwrap_or_else(|_| Err(ExecutorError::Transport("dropped".into())))
                }
                .boxed()
            }
        }
    }

    fn call(&self, request: CallRequest) -> BoxFuture<'static, CallReply> {
        let mut state = self.state.lock();
        let index = state.calls.len();
        state.calls.push(RecordedCall {
            method: request.method.name.clone(),
            args: request.args.clone(),
            endpoint: request.endpoint.clone(),
            principal: request.identity.principal(),
            devtools_enabled: request.devtools_enabled,
        });

        if let Some(reply) = state.replies.get(&request.method.name) {
            let reply = reply.clone();
            return async move { reply }.boxed();
        }

        let (sender, receiver) = oneshot::channel();
        state.pending_calls.insert(index, sender);
        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(ExecutorError::Transport("dropped".into())))
        }
        .boxed()
    }
}

/// Identity with a fixed principal
pub struct TestIdentity(pub &'static str);

impl SigningIdentity for TestIdentity {
    fn principal(&self) -> Principal {
        Principal::from_text(self.0)
    }

    fn sign(&self, message: &[u8]) -> Option<Vec<u8>> {
        Some(message.iter().rev().copied().collect())
    }
}

/// Provider that never has an identity
pub struct UnavailableIdentity;

impl IdentityProvider for UnavailableIdentity {
    fn init_identity(&self, use_local_network: bool) -> Result<SharedIdentity, IdentityError> {
        let network = if use_local_network { "local" } else { "mainnet" };
        Err(IdentityError::Unavailable(network))
    }
}

pub const SYSTEM_CANISTER: &str = "rwlgt-iiaaa-aaaaa-aaaaa-cai";

/// Descriptor modelled on a release-management system actor
pub fn system_descriptor() -> ServiceDescriptor {
    ServiceDescriptor::new(SYSTEM_CANISTER)
        .with_method(MethodDescriptor::query("version", vec![], TypeSpec::Text))
        .with_method(MethodDescriptor::update(
            "create_app",
            vec![
                ArgumentSpec::named("name", TypeSpec::Text),
                ArgumentSpec::named(
                    "metadata",
                    TypeSpec::vec(TypeSpec::Tuple(vec![TypeSpec::Text, TypeSpec::named("Value")])),
                ),
                ArgumentSpec::named("description", TypeSpec::Text),
            ],
            TypeSpec::named("AppId"),
        ))
        .with_method(MethodDescriptor::query(
            "get_bugs",
            vec![ArgumentSpec::named("canister_id", TypeSpec::Principal)],
            TypeSpec::vec(TypeSpec::named("Bug")),
        ))
        .with_method(MethodDescriptor::update(
            "report_bug",
            vec![ArgumentSpec::named("bug", TypeSpec::named("Bug"))],
            TypeSpec::Null,
        ))
        .with_type("AppId", TypeSpec::Text)
        .with_type(
            "Value",
            TypeSpec::Variant(vec![
                FieldSpec::new("Nat", TypeSpec::Nat),
                FieldSpec::new("Text", TypeSpec::Text),
                FieldSpec::new("Nat64", TypeSpec::Nat64),
                FieldSpec::new("Blob", TypeSpec::vec(TypeSpec::Nat8)),
            ]),
        )
        .with_type(
            "Bug",
            TypeSpec::Record(vec![
                FieldSpec::new("name", TypeSpec::Text),
                FieldSpec::new("version", TypeSpec::Text),
                FieldSpec::new("logs", TypeSpec::vec(TypeSpec::Text)),
                FieldSpec::new("description", TypeSpec::Text),
            ]),
        )
}

pub fn store_with(executor: Arc<FakeExecutor>) -> ActorStore {
    let mut options = StoreOptions::new(SYSTEM_CANISTER);
    options.initialize_on_mount = false;
    ActorStore::new(Arc::new(system_descriptor()), options, executor)
}

pub fn local_config() -> ActorConnectionConfig {
    ActorConnectionConfig {
        network_endpoint: LOCAL_ENDPOINT.to_string(),
        identity: Arc::new(AnonymousIdentity),
        devtools_enabled: false,
    }
}

pub fn config_for(principal: &'static str) -> ActorConnectionConfig {
    ActorConnectionConfig {
        network_endpoint: LOCAL_ENDPOINT.to_string(),
        identity: Arc::new(TestIdentity(principal)),
        devtools_enabled: true,
    }
}

/// Let spawned tasks on the current-thread runtime run until they block.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Initialize `store` against an executor whose handshake succeeds immediately.
pub async fn initialized_store(executor: Arc<FakeExecutor>) -> ActorStore {
    let store = store_with(executor);
    store
        .initialize(local_config(), true)
        .await
        .expect("initialize");
    store
}
