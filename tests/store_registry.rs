//! One store per descriptor and endpoint

mod common;

use common::*;
use reactor::agent::{SharedExecutor, StaticIdentityProvider};
use reactor::error::InitializationError;
use reactor::store::Readiness;
use reactor::{Network, StoreError, StoreOptions, StoreRegistry};
use std::sync::Arc;

fn options(initialize_on_mount: bool) -> StoreOptions {
    let mut options = StoreOptions::new(SYSTEM_CANISTER);
    options.initialize_on_mount = initialize_on_mount;
    options
}

#[test]
fn test_same_descriptor_and_endpoint_share_a_store() {
    let executor: SharedExecutor = FakeExecutor::new();
    let registry = StoreRegistry::new(executor, Network::Local);

    let first = registry.get_or_create(Arc::new(system_descriptor()), options(false));
    // structurally equal, separately built descriptor
    let second = registry.get_or_create(Arc::new(system_descriptor()), options(false));

    assert!(first.same_store(&second));
    assert_eq!(registry.len(), 1);
    assert!(
        registry
            .get(&system_descriptor(), "http://localhost:4943")
            .unwrap()
            .same_store(&first)
    );
}

#[test]
fn test_different_endpoints_get_different_stores() {
    let executor: SharedExecutor = FakeExecutor::new();
    let registry = StoreRegistry::new(executor, Network::Local);

    let local = registry.get_or_create(Arc::new(system_descriptor()), options(false));
    let mut remote = options(false);
    remote.host = Some("https://icp0.io".into());
    let overridden = registry.get_or_create(Arc::new(system_descriptor()), remote);

    assert!(!local.same_store(&overridden));
    assert_eq!(registry.len(), 2);
    assert!(registry.get(&system_descriptor(), "https://ic0.app").is_none());
}

#[test]
fn test_different_descriptors_get_different_stores() {
    let executor: SharedExecutor = FakeExecutor::new();
    let registry = StoreRegistry::new(executor, Network::Mainnet);

    let system = registry.get_or_create(Arc::new(system_descriptor()), options(false));
    let extended = system_descriptor().with_type("Extra", reactor::interface::TypeSpec::Nat);
    let other = registry.get_or_create(Arc::new(extended), options(false));

    assert!(!system.same_store(&other));
    assert!(registry.get(&system_descriptor(), "https://ic0.app").is_some());
}

#[test]
fn test_mount_without_runtime_leaves_store_idle() {
    let executor = FakeExecutor::new();
    let shared: SharedExecutor = executor.clone();
    let registry = StoreRegistry::new(shared, Network::Local)
        .with_identity_provider(Arc::new(StaticIdentityProvider::anonymous()));

    let store = registry.get_or_create(Arc::new(system_descriptor()), options(true));

    assert!(!store.state().initializing);
    assert!(executor.handshakes().is_empty());
}

#[tokio::test]
async fn test_initialize_on_mount() {
    let executor = FakeExecutor::new();
    let shared: SharedExecutor = executor.clone();
    let registry = StoreRegistry::new(shared, Network::Local)
        .with_identity_provider(Arc::new(StaticIdentityProvider::anonymous()));

    let store = registry.get_or_create(Arc::new(system_descriptor()), options(true));
    store.wait_until_ready().await.unwrap();

    assert!(store.state().initialized);
    assert_eq!(store.readiness(), Readiness::Ready);
    assert_eq!(executor.handshakes().len(), 1);
    assert!(executor.handshakes()[0].fetch_root_key);

    // the existing store is returned, not mounted again
    let again = registry.get_or_create(Arc::new(system_descriptor()), options(true));
    assert!(again.same_store(&store));
    settle().await;
    assert_eq!(executor.handshakes().len(), 1);
}

#[tokio::test]
async fn test_mount_without_provider_is_skipped() {
    let executor = FakeExecutor::new();
    let shared: SharedExecutor = executor.clone();
    let registry = StoreRegistry::new(shared, Network::Local);

    let store = registry.get_or_create(Arc::new(system_descriptor()), options(true));
    settle().await;

    assert!(!store.state().initialized);
    assert!(executor.handshakes().is_empty());
}

#[tokio::test]
async fn test_mount_with_missing_identity_releases_waiters() {
    let executor = FakeExecutor::new();
    let shared: SharedExecutor = executor.clone();
    let registry = StoreRegistry::new(shared, Network::Local)
        .with_identity_provider(Arc::new(UnavailableIdentity));

    let store = registry.get_or_create(Arc::new(system_descriptor()), options(true));
    let expected = InitializationError::IdentityRejected(
        "no identity available for local network".into(),
    );

    assert_eq!(
        store.wait_until_ready().await,
        Err(StoreError::Initialization(expected.clone()))
    );
    let state = store.state();
    assert!(!state.initializing);
    assert!(!state.initialized);
    assert_eq!(state.error, Some(expected.clone()));
    assert_eq!(store.readiness(), Readiness::Failed(expected.clone()));

    let fetch = store
        .query_hook("version")
        .unwrap()
        .fetch_when_ready(vec![])
        .unwrap();
    assert_eq!(
        fetch.await.unwrap().unwrap_err(),
        StoreError::Initialization(expected)
    );
    assert!(executor.handshakes().is_empty());
    assert_eq!(executor.call_count(), 0);

    // an explicit initialize still recovers the store
    store.initialize(local_config(), true).await.unwrap();
    assert!(store.state().initialized);
}
