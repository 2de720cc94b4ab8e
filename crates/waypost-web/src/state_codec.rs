#![forbid(unsafe_code)]

//! Wire format for the payload stored with each browser history entry.
//!
//! `pushState`/`replaceState` carry a small `{key, state}` object; this
//! module defines its JSON shape independently of any JS binding so the
//! format is pinned by native tests. Absent fields are omitted entirely,
//! which keeps entries written by plain `pushState(null, ...)` callers
//! readable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::WebHistoryError;

/// The `{key, state}` payload attached to one history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

/// Serialize an entry payload to its JSON text.
///
/// # Errors
///
/// [`WebHistoryError::StateCodec`] when the state value cannot be
/// serialized.
pub fn encode(entry: &EntryState) -> Result<String, WebHistoryError> {
    Ok(serde_json::to_string(entry)?)
}

/// Parse an entry payload from JSON text.
///
/// # Errors
///
/// [`WebHistoryError::StateCodec`] when the text is not a valid payload.
pub fn decode(text: &str) -> Result<EntryState, WebHistoryError> {
    Ok(serde_json::from_str(text)?)
}
