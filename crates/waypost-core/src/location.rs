#![forbid(unsafe_code)]

//! The normalized navigation target and its construction rules.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;
use crate::path::{ParsedPath, create_path, decode_pathname, parse_path, resolve_pathname};

/// Opaque state payload attached to a history entry.
///
/// Compared structurally: two payloads are equal when their trees are equal,
/// regardless of where they were allocated.
pub type State = Value;

/// A normalized navigation target.
///
/// Invariants after construction through [`create_location`]:
/// - `pathname` is non-empty, absolute, and percent-decoded exactly once;
/// - `search` is empty or starts with `?`;
/// - `hash` is empty or starts with `#`;
/// - `key` uniquely identifies the underlying history entry, when known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub pathname: String,
    pub search: String,
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Location {
    /// Compose the path portion (`pathname` + `search` + `hash`).
    #[must_use]
    pub fn to_path(&self) -> String {
        create_path(&self.pathname, &self.search, &self.hash)
    }
}

/// A location with any subset of its fields present.
///
/// This is the "location-like" shape callers may pass instead of a raw path
/// string; missing fields fall back to the construction defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialLocation {
    pub pathname: Option<String>,
    pub search: Option<String>,
    pub hash: Option<String>,
    pub state: Option<State>,
    pub key: Option<String>,
}

impl PartialLocation {
    /// Compose the path portion, with missing separators supplied.
    #[must_use]
    pub fn to_path(&self) -> String {
        create_path(
            self.pathname.as_deref().unwrap_or(""),
            self.search.as_deref().unwrap_or(""),
            self.hash.as_deref().unwrap_or(""),
        )
    }
}

impl From<&Location> for PartialLocation {
    fn from(location: &Location) -> Self {
        Self {
            pathname: Some(location.pathname.clone()),
            search: Some(location.search.clone()),
            hash: Some(location.hash.clone()),
            state: location.state.clone(),
            key: location.key.clone(),
        }
    }
}

impl From<ParsedPath> for PartialLocation {
    fn from(parsed: ParsedPath) -> Self {
        Self {
            pathname: Some(parsed.pathname),
            search: Some(parsed.search),
            hash: Some(parsed.hash),
            state: None,
            key: None,
        }
    }
}

/// A navigation target: either a raw path string or a location-like value.
#[derive(Debug, Clone, PartialEq)]
pub enum To {
    /// A raw path (`"/users?tab=1#top"`), parsed on construction.
    Path(String),
    /// A structured location-like value, copied field by field.
    Partial(PartialLocation),
}

impl From<&str> for To {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for To {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<PartialLocation> for To {
    fn from(partial: PartialLocation) -> Self {
        Self::Partial(partial)
    }
}

impl From<&Location> for To {
    fn from(location: &Location) -> Self {
        Self::Partial(location.into())
    }
}

/// Build a [`Location`] from a navigation target.
///
/// - A raw path is split with [`parse_path`] and carries the `state`
///   argument.
/// - A location-like value keeps its own fields; separators are supplied for
///   non-empty `search`/`hash`, and the `state` argument applies only when
///   the value did not already carry one.
/// - The pathname is percent-decoded exactly once.
/// - `key` overwrites any key carried by the input, when provided.
/// - An empty pathname resolves to `current`'s pathname (or `/` without
///   one); a relative pathname resolves against `current.pathname`.
///
/// # Errors
///
/// [`DecodeError`] when the pathname's percent-encoding is invalid.
pub fn create_location(
    to: &To,
    state: Option<State>,
    key: Option<String>,
    current: Option<&Location>,
) -> Result<Location, DecodeError> {
    let mut location = match to {
        To::Path(raw) => {
            let parsed = parse_path(raw);
            Location {
                pathname: parsed.pathname,
                search: parsed.search,
                hash: parsed.hash,
                state,
                key: None,
            }
        }
        To::Partial(partial) => {
            let own_state = partial.state.clone();
            Location {
                pathname: partial.pathname.clone().unwrap_or_default(),
                search: with_separator(partial.search.as_deref(), '?'),
                hash: with_separator(partial.hash.as_deref(), '#'),
                state: own_state.or(state),
                key: partial.key.clone(),
            }
        }
    };

    location.pathname = decode_pathname(&location.pathname)?;

    if let Some(key) = key {
        location.key = Some(key);
    }

    match current {
        Some(current) => {
            if location.pathname.is_empty() {
                location.pathname = current.pathname.clone();
            } else if !location.pathname.starts_with('/') {
                location.pathname = resolve_pathname(&location.pathname, &current.pathname);
            }
        }
        None => {
            if location.pathname.is_empty() {
                location.pathname = String::from("/");
            }
        }
    }

    Ok(location)
}

fn with_separator(value: Option<&str>, separator: char) -> String {
    match value {
        None | Some("") => String::new(),
        Some(v) if v.starts_with(separator) => v.to_string(),
        Some(v) => format!("{separator}{v}"),
    }
}

/// Whether two locations are interchangeable.
///
/// True iff pathname, search, hash, and key are identical and the state
/// payloads are deep-equal by value.
#[must_use]
pub fn locations_are_equal(a: &Location, b: &Location) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn at(pathname: &str) -> Location {
        Location {
            pathname: pathname.to_string(),
            ..Location::default()
        }
    }

    // ── string targets ──────────────────────────────────────────────

    #[test]
    fn raw_path_is_parsed_and_state_attached() {
        let location =
            create_location(&"/a?q=1#top".into(), Some(json!({"n": 1})), None, None).unwrap();
        assert_eq!(location.pathname, "/a");
        assert_eq!(location.search, "?q=1");
        assert_eq!(location.hash, "#top");
        assert_eq!(location.state, Some(json!({"n": 1})));
        assert_eq!(location.key, None);
    }

    #[test]
    fn key_is_attached_when_provided() {
        let location = create_location(&"/a".into(), None, Some("k1".into()), None).unwrap();
        assert_eq!(location.key.as_deref(), Some("k1"));
    }

    #[test]
    fn pathname_is_decoded_once() {
        let location = create_location(&"/caf%C3%A9".into(), None, None, None).unwrap();
        assert_eq!(location.pathname, "/café");
    }

    #[test]
    fn malformed_encoding_is_fatal() {
        let err = create_location(&"/bad%2".into(), None, None, None).unwrap_err();
        assert_eq!(err.pathname(), "/bad%2");
    }

    // ── location-like targets ───────────────────────────────────────

    #[test]
    fn partial_fields_are_normalized() {
        let partial = PartialLocation {
            pathname: Some("/a".into()),
            search: Some("q=1".into()),
            hash: Some("top".into()),
            ..PartialLocation::default()
        };
        let location = create_location(&partial.into(), None, None, None).unwrap();
        assert_eq!(location.search, "?q=1");
        assert_eq!(location.hash, "#top");
    }

    #[test]
    fn own_state_wins_over_argument() {
        let partial = PartialLocation {
            pathname: Some("/a".into()),
            state: Some(json!("own")),
            ..PartialLocation::default()
        };
        let location = create_location(&partial.into(), Some(json!("arg")), None, None).unwrap();
        assert_eq!(location.state, Some(json!("own")));
    }

    #[test]
    fn state_argument_applies_when_input_carries_none() {
        let partial = PartialLocation {
            pathname: Some("/a".into()),
            ..PartialLocation::default()
        };
        let location = create_location(&partial.into(), Some(json!("arg")), None, None).unwrap();
        assert_eq!(location.state, Some(json!("arg")));
    }

    #[test]
    fn fresh_key_overwrites_carried_key() {
        let partial = PartialLocation {
            pathname: Some("/a".into()),
            key: Some("stale".into()),
            ..PartialLocation::default()
        };
        let location = create_location(&partial.into(), None, Some("fresh".into()), None).unwrap();
        assert_eq!(location.key.as_deref(), Some("fresh"));
    }

    // ── resolution ──────────────────────────────────────────────────

    #[test]
    fn empty_pathname_takes_current() {
        let partial = PartialLocation {
            search: Some("?q=1".into()),
            ..PartialLocation::default()
        };
        let location = create_location(&partial.into(), None, None, Some(&at("/here"))).unwrap();
        assert_eq!(location.pathname, "/here");
        assert_eq!(location.search, "?q=1");
    }

    #[test]
    fn empty_pathname_without_current_defaults_to_root() {
        let partial = PartialLocation::default();
        let location = create_location(&partial.into(), None, None, None).unwrap();
        assert_eq!(location.pathname, "/");
    }

    #[test]
    fn relative_pathname_resolves_against_current() {
        let location = create_location(&"sibling".into(), None, None, Some(&at("/a/b"))).unwrap();
        assert_eq!(location.pathname, "/a/sibling");

        let location = create_location(&"../up".into(), None, None, Some(&at("/a/b"))).unwrap();
        assert_eq!(location.pathname, "/up");
    }

    #[test]
    fn absolute_pathname_ignores_current() {
        let location = create_location(&"/abs".into(), None, None, Some(&at("/a/b"))).unwrap();
        assert_eq!(location.pathname, "/abs");
    }

    // ── equality ────────────────────────────────────────────────────

    #[test]
    fn equality_is_reflexive_and_symmetric() {
        let a = create_location(
            &"/a?q=1".into(),
            Some(json!({"x": [1, 2]})),
            Some("k".into()),
            None,
        )
        .unwrap();
        let b = a.clone();
        assert!(locations_are_equal(&a, &a));
        assert!(locations_are_equal(&a, &b));
        assert!(locations_are_equal(&b, &a));
    }

    #[test]
    fn deep_equal_state_by_value() {
        // Equal trees built independently compare equal.
        let a = create_location(&"/a".into(), Some(json!({"n": [1, {"m": 2}]})), None, None)
            .unwrap();
        let b = create_location(&"/a".into(), Some(json!({"n": [1, {"m": 2}]})), None, None)
            .unwrap();
        assert!(locations_are_equal(&a, &b));
    }

    #[test]
    fn deep_unequal_state_differs() {
        let a = create_location(&"/a".into(), Some(json!({"n": 1})), None, None).unwrap();
        let b = create_location(&"/a".into(), Some(json!({"n": 2})), None, None).unwrap();
        assert!(!locations_are_equal(&a, &b));
    }

    #[test]
    fn key_participates_in_equality() {
        let a = create_location(&"/a".into(), None, Some("k1".into()), None).unwrap();
        let b = create_location(&"/a".into(), None, Some("k2".into()), None).unwrap();
        assert!(!locations_are_equal(&a, &b));
    }

    // ── composition ─────────────────────────────────────────────────

    #[test]
    fn to_path_round_trips() {
        let location = create_location(&"/a?q=1#top".into(), None, None, None).unwrap();
        assert_eq!(location.to_path(), "/a?q=1#top");
    }

    #[test]
    fn partial_to_path_supplies_separators() {
        let partial = PartialLocation {
            pathname: Some("/a".into()),
            search: Some("b=1".into()),
            hash: Some("".into()),
            ..PartialLocation::default()
        };
        assert_eq!(partial.to_path(), "/a?b=1");
    }
}
