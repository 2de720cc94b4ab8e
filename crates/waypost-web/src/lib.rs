#![forbid(unsafe_code)]

//! Browser platform adapter for `waypost`.
//!
//! [`BrowserAdapter`] implements `waypost::HistoryAdapter` over the HTML5
//! history API (`pushState`/`replaceState`/`popstate`). It only exists on
//! `wasm32`; the [`detect`] and [`state_codec`] modules are pure and compile
//! everywhere, so the quirk logic and the entry-state wire format are
//! testable natively.
//!
//! The quick path is [`browser_history`], which wires the adapter, a
//! `window.confirm` confirmation function, and the controller together.

use std::fmt;

pub mod detect;
pub mod state_codec;

#[cfg(target_arch = "wasm32")]
mod adapter;

#[cfg(target_arch = "wasm32")]
pub use adapter::{BrowserAdapter, browser_history, window_confirmation};

use waypost::HistoryError;

/// Errors specific to the browser platform.
#[derive(Debug)]
pub enum WebHistoryError {
    /// No DOM `window` is available; browser history cannot exist here.
    NoDom,
    /// The `{key, state}` payload stored with a history entry could not be
    /// serialized or deserialized.
    StateCodec(serde_json::Error),
    /// The underlying history controller failed.
    History(HistoryError),
}

impl fmt::Display for WebHistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDom => f.write_str("browser history needs a DOM"),
            Self::StateCodec(err) => write!(f, "invalid history entry state: {err}"),
            Self::History(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for WebHistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoDom => None,
            Self::StateCodec(err) => Some(err),
            Self::History(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for WebHistoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::StateCodec(err)
    }
}

impl From<HistoryError> for WebHistoryError {
    fn from(err: HistoryError) -> Self {
        Self::History(err)
    }
}
