//! Identity provider boundary
//!
//! The store never creates key material itself. An [`IdentityProvider`] hands
//! out a [`SigningIdentity`] for the selected network, and the store binds it
//! for the lifetime of one initialization session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::IdentityError;

/// Textual principal identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Text form of the well-known anonymous principal
    pub const ANONYMOUS: &'static str = "2vxsx-fae";

    /// Wrap a principal in its text form
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The anonymous principal
    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    /// True for the anonymous principal
    pub fn is_anonymous(&self) -> bool {
        self.0 == Self::ANONYMOUS
    }

    /// Text form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identity able to sign requests on behalf of a principal
pub trait SigningIdentity: Send + Sync {
    /// Principal this identity signs for
    fn principal(&self) -> Principal;

    /// Signature over `message`, or `None` for unsigned (anonymous) requests
    fn sign(&self, message: &[u8]) -> Option<Vec<u8>>;
}

/// Shared handle to a signing identity
pub type SharedIdentity = Arc<dyn SigningIdentity>;

/// Supplies signing identities per network target
pub trait IdentityProvider: Send + Sync {
    /// Resolve the identity to use against the local or the production network
    fn init_identity(&self, use_local_network: bool) -> Result<SharedIdentity, IdentityError>;
}

/// Identity that never signs
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl SigningIdentity for AnonymousIdentity {
    fn principal(&self) -> Principal {
        Principal::anonymous()
    }

    fn sign(&self, _message: &[u8]) -> Option<Vec<u8>> {
        None
    }
}

/// Provider that returns one fixed identity for every network
#[derive(Clone)]
pub struct StaticIdentityProvider {
    identity: SharedIdentity,
}

impl StaticIdentityProvider {
    /// Serve `identity` for both networks
    pub fn new(identity: SharedIdentity) -> Self {
        Self { identity }
    }

    /// Serve the anonymous identity
    pub fn anonymous() -> Self {
        Self::new(Arc::new(AnonymousIdentity))
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn init_identity(&self, _use_local_network: bool) -> Result<SharedIdentity, IdentityError> {
        Ok(Arc::clone(&self.identity))
    }
}
