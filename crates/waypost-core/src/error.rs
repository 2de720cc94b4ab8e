#![forbid(unsafe_code)]

//! Location construction errors.

use std::fmt;

/// A pathname contained percent-encoding that could not be decoded.
///
/// Raised once, at [`Location`](crate::Location) construction; decoding is
/// never retried. Covers both malformed escapes (a `%` not followed by two
/// hex digits) and escapes that decode to invalid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pathname: String,
}

impl DecodeError {
    pub(crate) fn new(pathname: &str) -> Self {
        Self {
            pathname: pathname.to_string(),
        }
    }

    /// The pathname that failed to decode, as it was given.
    #[must_use]
    pub fn pathname(&self) -> &str {
        &self.pathname
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pathname {:?} could not be decoded: invalid percent-encoding",
            self.pathname
        )
    }
}

impl std::error::Error for DecodeError {}
