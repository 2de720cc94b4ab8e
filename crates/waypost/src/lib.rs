#![forbid(unsafe_code)]

//! Client-side navigation history.
//!
//! This crate models a stack of [`Location`]s and exposes push/replace/pop
//! transitions with a uniform contract regardless of which navigation
//! primitive drives it. The platform sits behind the
//! [`HistoryAdapter`] trait; a browser implementation lives in
//! `waypost-web`.
//!
//! # Architecture
//!
//! - [`transition`] holds the single optional prompt and the ordered
//!   listener registry, and runs the confirm-then-notify protocol.
//! - [`controller`] owns the current location/action, the key stack used to
//!   revert rejected back/forward moves, and the public surface
//!   ([`History`]).
//! - [`adapter`] is the contract the platform implements: read the current
//!   entry, commit a new one, move the stack pointer, and report external
//!   moves.
//!
//! # Cancellation
//!
//! A rejected push or replace has zero side effects: confirmation gates the
//! platform commit. A rejected pop has already happened at the platform
//! level, so the controller undoes it by moving the stack pointer back by
//! the key-stack delta.
//!
//! Everything is single-threaded (`Rc`/`RefCell`); the only suspension
//! point is the caller-supplied confirmation function, which may answer
//! synchronously or arbitrarily later.

use std::fmt;

pub mod adapter;
pub mod controller;
pub mod transition;

// --- Core re-exports -------------------------------------------------------

pub use waypost_core::{
    Action, DecodeError, Location, PartialLocation, State, To, create_location,
    locations_are_equal, parse_path,
};

pub use adapter::{CommitKind, ExternalMoveHandler, HistoryAdapter, RawEntry};
pub use controller::{History, HistoryOptions, Unblock, Unlisten};
pub use transition::{
    ListenerGuard, Prompt, PromptDecision, PromptGuard, TransitionCallback, TransitionManager,
    UserConfirmation,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for history operations.
///
/// Every degraded platform capability has a fallback path (full navigation,
/// delta-zero revert), so the only fatal condition is a pathname that
/// cannot be decoded.
#[derive(Debug)]
pub enum HistoryError {
    /// A pathname's percent-encoding could not be decoded.
    Decode(DecodeError),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
        }
    }
}

impl From<DecodeError> for HistoryError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

/// Standard result type for history APIs.
pub type Result<T> = std::result::Result<T, HistoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_converts_and_chains() {
        let decode = create_location(&"/bad%2".into(), None, None, None).unwrap_err();
        let err: HistoryError = decode.into();
        assert!(matches!(err, HistoryError::Decode(_)));
        assert!(std::error::Error::source(&err).is_some());
        assert!(format!("{err}").contains("/bad%2"));
    }
}
