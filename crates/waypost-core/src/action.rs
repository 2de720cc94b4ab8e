#![forbid(unsafe_code)]

//! How a location became current.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of how the current [`Location`](crate::Location) changed
/// relative to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// A new entry was appended to the navigation stack.
    Push,
    /// The current entry was overwritten in place.
    Replace,
    /// The stack pointer moved to an existing entry (back/forward).
    Pop,
}

impl Action {
    /// Stable label used in logs and serialized forms.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "PUSH",
            Self::Replace => "REPLACE",
            Self::Pop => "POP",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
