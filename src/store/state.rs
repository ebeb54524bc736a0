//! Store state snapshots
//!
//! Every mutation of the store produces a fresh, immutable [`ActorState`]
//! snapshot; observers receive the snapshot and never the live record.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::agent::Principal;
use crate::error::{InitializationError, RemoteCallError};

/// Identifier of one initialization session
pub type SessionId = Uuid;

/// Lifecycle of a single method's most recent call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallState {
    /// A call is in flight
    pub loading: bool,
    /// Decoded reply of the last successful call
    pub data: Option<Value>,
    /// Failure of the last call
    pub error: Option<RemoteCallError>,
    /// Arguments of the last dispatched call
    pub last_args: Option<Vec<Value>>,
    /// Dispatch sequence number this state belongs to (0 = never called)
    pub sequence: u64,
    /// When this state was last written
    pub updated_at: Option<DateTime<Utc>>,
}

impl CallState {
    /// State right after a call has been dispatched
    pub(crate) fn dispatched(sequence: u64, args: Vec<Value>) -> Self {
        Self {
            loading: true,
            data: None,
            error: None,
            last_args: Some(args),
            sequence,
            updated_at: Some(Utc::now()),
        }
    }

    /// Settle with the call's outcome; exactly one of `data`/`error` is set
    pub(crate) fn resolve(&mut self, outcome: Result<Value, RemoteCallError>) {
        self.loading = false;
        match outcome {
            Ok(value) => {
                self.data = Some(value);
                self.error = None;
            }
            Err(err) => {
                self.data = None;
                self.error = Some(err);
            }
        }
        self.updated_at = Some(Utc::now());
    }

    /// True once a call has resolved and nothing newer is in flight
    pub fn is_settled(&self) -> bool {
        !self.loading && (self.data.is_some() || self.error.is_some())
    }
}

/// Observable state of one actor store
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActorState {
    /// Initialization succeeded
    pub initialized: bool,
    /// Initialization is in flight
    pub initializing: bool,
    /// Initialization failed
    pub error: Option<InitializationError>,
    /// Latest call state per method
    pub method_state: BTreeMap<String, CallState>,
    /// Principal bound by the current session
    pub principal: Option<Principal>,
    /// Current initialization session
    pub session: Option<SessionId>,
    /// Snapshot counter, bumped on every transition
    pub version: u64,
}

impl ActorState {
    /// Call state of `method`, idle if it was never called
    pub fn call_state(&self, method: &str) -> CallState {
        self.method_state.get(method).cloned().unwrap_or_default()
    }

    /// `initialized` or `error` has been reached
    pub fn is_terminal(&self) -> bool {
        self.initialized || self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutorError;

    #[test]
    fn test_call_state_lifecycle() {
        let mut state = CallState::dispatched(3, vec![Value::from("b3-wallet")]);
        assert!(state.loading);
        assert!(!state.is_settled());
        assert_eq!(state.sequence, 3);

        state.resolve(Ok(Value::from(42)));
        assert!(!state.loading);
        assert_eq!(state.data, Some(Value::from(42)));
        assert!(state.error.is_none());
        assert!(state.is_settled());
    }

    #[test]
    fn test_call_state_error_clears_data() {
        let mut state = CallState::dispatched(1, vec![]);
        state.data = Some(Value::Null);
        state.resolve(Err(RemoteCallError {
            method: "version".into(),
            source: ExecutorError::Transport("reset".into()),
        }));
        assert!(state.data.is_none());
        assert!(state.error.is_some());
    }

    #[test]
    fn test_unknown_method_is_idle() {
        let state = ActorState::default();
        let call = state.call_state("version");
        assert!(!call.loading);
        assert_eq!(call.sequence, 0);
        assert!(!state.is_terminal());
    }
}
