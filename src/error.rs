//! Error types for the actor store
//!
//! Domain errors use thiserror. Errors that end up inside state snapshots are
//! `Clone + PartialEq` so they can be stored and compared as plain data.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::interface::MethodKind;

/// Failure reported by a Call Executor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// The endpoint could not be reached
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    /// The remote side refused the signing identity
    #[error("identity rejected: {0}")]
    IdentityRejected(String),

    /// The remote actor rejected the call
    #[error("call rejected{}: {message}", .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Rejected {
        /// Reject code reported by the replica
        code: Option<String>,
        /// Reject message
        message: String,
    },

    /// The reply could not be decoded into the declared return type
    #[error("failed to decode reply: {0}")]
    Decode(String),

    /// Any other transport failure
    #[error("transport error: {0}")]
    Transport(String),
}

/// Initialization failures, terminal until `initialize` runs again
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitializationError {
    /// The endpoint could not be reached during the handshake
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    /// The identity was refused
    #[error("identity rejected: {0}")]
    IdentityRejected(String),

    /// The remote interface lacks methods the descriptor declares
    #[error("descriptor mismatch, remote actor is missing: {}", .missing.join(", "))]
    DescriptorMismatch {
        /// Declared methods absent on the remote side
        missing: Vec<String>,
    },

    /// Handshake failed for another reason
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The initializing caller gave up before the handshake settled
    #[error("initialization was cancelled before the handshake settled")]
    Cancelled,
}

impl From<ExecutorError> for InitializationError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Unreachable(detail) => InitializationError::NetworkUnreachable(detail),
            ExecutorError::IdentityRejected(detail) => {
                InitializationError::IdentityRejected(detail)
            }
            other => InitializationError::Handshake(other.to_string()),
        }
    }
}

/// Failure of a single remote invocation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("call to `{method}` failed: {source}")]
pub struct RemoteCallError {
    /// Method that was invoked
    pub method: String,
    /// Executor failure
    #[source]
    pub source: ExecutorError,
}

/// The field deriver met a type it cannot represent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported type in `{method}` argument `{argument}` at `{path}`: {reason}")]
pub struct UnsupportedTypeError {
    /// Method whose argument failed
    pub method: String,
    /// Argument label
    pub argument: String,
    /// Dotted path to the offending type inside the argument
    pub path: String,
    /// Why the type is unsupported
    pub reason: String,
}

/// Identity provider errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// No identity is available for the requested network
    #[error("no identity available for {0} network")]
    Unavailable(&'static str),

    /// Key material could not be loaded
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Config file could not be parsed
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level store error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A call was attempted before initialization succeeded
    #[error("actor is not initialized, cannot call `{method}`")]
    NotInitialized {
        /// Method that was requested
        method: String,
    },

    /// The descriptor has no such method
    #[error("unknown method `{method}`")]
    UnknownMethod {
        /// Method that was requested
        method: String,
    },

    /// A hook was requested for a method of the other kind
    #[error("method `{method}` is declared as {actual}, not {expected}")]
    KindMismatch {
        /// Method that was requested
        method: String,
        /// Kind the caller asked for
        expected: MethodKind,
        /// Kind the descriptor declares
        actual: MethodKind,
    },

    /// Initialization failed
    #[error("initialization failed: {0}")]
    Initialization(#[from] InitializationError),

    /// A remote invocation failed
    #[error(transparent)]
    Remote(#[from] RemoteCallError),

    /// A background call was requested outside a tokio runtime
    #[error("no tokio runtime available to run `{method}`")]
    NoRuntime {
        /// Method that was requested
        method: String,
    },

    /// The readiness signal was dropped with the store
    #[error("store was dropped while waiting for readiness")]
    SignalClosed,
}

/// Result type using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;
