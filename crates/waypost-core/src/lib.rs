#![forbid(unsafe_code)]

//! Location model for waypost.
//!
//! A [`Location`] is a normalized navigation target: an absolute, decoded
//! pathname plus `search`, `hash`, an opaque deep-comparable `state` payload,
//! and the `key` that identifies its history entry. This crate owns the rules
//! for building one — path segmentation, one-shot percent decoding, relative
//! resolution against the current location — and the equality model the rest
//! of the stack relies on.
//!
//! Nothing here touches a platform: the history controller and its adapters
//! live in the `waypost` and `waypost-web` crates.

pub mod action;
pub mod error;
pub mod location;
pub mod path;

pub use action::Action;
pub use error::DecodeError;
pub use location::{Location, PartialLocation, State, To, create_location, locations_are_equal};
pub use path::{
    ParsedPath, add_leading_slash, create_path, has_basename, parse_path, resolve_pathname,
    strip_basename, strip_leading_slash, strip_trailing_slash,
};
