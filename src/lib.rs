//! Reactor – a reactive client store for typed remote actors
//!
//! This crate connects to a remote actor described by a typed interface and
//! exposes it as an observable store:
//! - Identity binding and handshake with single-flight initialization
//! - Immutable state snapshots delivered synchronously to ordered observers
//! - Per-method call states with last-write-wins sequencing
//! - Query and update hooks for driving calls from a UI
//! - Descriptor-driven form field derivation for generic method forms

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// External boundaries: identities and call executors
pub mod agent;

/// Error types shared across the crate
pub mod error;

/// Service descriptor model and field derivation
pub mod interface;

/// The actor store, hooks and registry
pub mod store;

// Re-export key types for convenience
pub use error::{Result, StoreError};
pub use interface::{ServiceDescriptor, derive_fields};
pub use store::{ActorConnectionConfig, ActorStore, Network, StoreOptions, StoreRegistry};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
