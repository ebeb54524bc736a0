//! External collaborators of the store: identities and call executors.

pub mod executor;
pub mod identity;

pub use executor::{CallExecutor, CallRequest, HandshakeInfo, HandshakeRequest, SharedExecutor};
pub use identity::{
    AnonymousIdentity, IdentityProvider, Principal, SharedIdentity, SigningIdentity,
    StaticIdentityProvider,
};
