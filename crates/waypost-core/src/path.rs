#![forbid(unsafe_code)]

//! Path segmentation, composition, and relative resolution.
//!
//! A raw path splits into three components: pathname, search, hash. The hash
//! is segmented first, so a `?` inside the fragment never starts a query.
//! Composition is the inverse, with bare separators (`?`, `#`) and empty
//! components omitted.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

use crate::error::DecodeError;

/// The three components of a raw path, split by [`parse_path`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPath {
    /// Everything before the first `?`/`#`. Defaults to `/` for empty input.
    pub pathname: String,
    /// Empty, or starts with `?`.
    pub search: String,
    /// Empty, or starts with `#`.
    pub hash: String,
}

impl ParsedPath {
    /// Compose the components back into a single path string.
    #[must_use]
    pub fn to_path(&self) -> String {
        create_path(&self.pathname, &self.search, &self.hash)
    }
}

/// Split a raw path into pathname, search, and hash.
///
/// A lone `?` or `#` normalizes to an empty component; an empty input
/// defaults the pathname to `/`.
#[must_use]
pub fn parse_path(raw: &str) -> ParsedPath {
    let mut pathname = if raw.is_empty() { "/" } else { raw };
    let mut search = "";
    let mut hash = "";

    if let Some(idx) = pathname.find('#') {
        hash = &pathname[idx..];
        pathname = &pathname[..idx];
    }
    if let Some(idx) = pathname.find('?') {
        search = &pathname[idx..];
        pathname = &pathname[..idx];
    }

    ParsedPath {
        pathname: pathname.to_string(),
        search: if search == "?" { String::new() } else { search.to_string() },
        hash: if hash == "#" { String::new() } else { hash.to_string() },
    }
}

/// Compose a path from its components.
///
/// An empty pathname reads as `/`. Search and hash are appended with their
/// leading separator added when missing, and omitted entirely when empty or
/// equal to the bare separator.
#[must_use]
pub fn create_path(pathname: &str, search: &str, hash: &str) -> String {
    let mut path = if pathname.is_empty() {
        String::from("/")
    } else {
        String::from(pathname)
    };

    if !search.is_empty() && search != "?" {
        if !search.starts_with('?') {
            path.push('?');
        }
        path.push_str(search);
    }
    if !hash.is_empty() && hash != "#" {
        if !hash.starts_with('#') {
            path.push('#');
        }
        path.push_str(hash);
    }

    path
}

/// Ensure the path starts with a `/`.
#[must_use]
pub fn add_leading_slash(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    }
}

/// Remove a single leading `/`, if present.
#[must_use]
pub fn strip_leading_slash(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Remove a single trailing `/`, if present.
#[must_use]
pub fn strip_trailing_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// Whether `path` starts with `prefix` as a whole path segment.
///
/// The match is ASCII case-insensitive and the prefix must be followed by a
/// segment boundary: `/`, `?`, `#`, or end of string. `/app2` does not have
/// basename `/app`.
#[must_use]
pub fn has_basename(path: &str, prefix: &str) -> bool {
    let Some(head) = path.get(..prefix.len()) else {
        return false;
    };
    head.eq_ignore_ascii_case(prefix)
        && matches!(path[prefix.len()..].chars().next(), None | Some('/' | '?' | '#'))
}

/// Remove `prefix` from the front of `path` when it is a real basename.
///
/// Returns `path` unchanged when the prefix does not match.
#[must_use]
pub fn strip_basename(path: &str, prefix: &str) -> String {
    if has_basename(path, prefix) {
        path[prefix.len()..].to_string()
    } else {
        path.to_string()
    }
}

/// Decode a pathname's percent-encoding exactly once.
///
/// # Errors
///
/// Returns [`DecodeError`] for a malformed escape (`%` not followed by two
/// hex digits) or when the decoded bytes are not valid UTF-8.
pub fn decode_pathname(pathname: &str) -> Result<String, DecodeError> {
    let bytes = pathname.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let complete = i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !complete {
                return Err(DecodeError::new(pathname));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    match percent_decode_str(pathname).decode_utf8() {
        Ok(decoded) => Ok(decoded.into_owned()),
        Err(_) => Err(DecodeError::new(pathname)),
    }
}

/// Resolve a relative pathname against a base pathname.
///
/// Standard relative resolution: the base's last segment is replaced, `.`
/// segments collapse, `..` segments consume their parent, and `..` above an
/// absolute root is clamped. A trailing slash on the effective target is
/// preserved.
#[must_use]
pub fn resolve_pathname(to: &str, from: &str) -> String {
    let to_parts: Vec<&str> = if to.is_empty() {
        Vec::new()
    } else {
        to.split('/').collect()
    };
    let from_parts: Vec<&str> = if from.is_empty() {
        Vec::new()
    } else {
        from.split('/').collect()
    };

    let to_abs = to.starts_with('/');
    let from_abs = from.starts_with('/');
    let must_end_abs = to_abs || from_abs;

    let mut parts: Vec<String> = if to_abs {
        to_parts.iter().map(ToString::to_string).collect()
    } else if to_parts.is_empty() {
        from_parts.iter().map(ToString::to_string).collect()
    } else {
        // Base's last segment is replaced by the relative target.
        let mut base: Vec<String> = from_parts.iter().map(ToString::to_string).collect();
        base.pop();
        base.extend(to_parts.iter().map(ToString::to_string));
        base
    };

    if parts.is_empty() {
        return String::from("/");
    }

    let has_trailing_slash = matches!(parts.last().map(String::as_str), Some("." | ".." | ""));

    let mut up = 0usize;
    for i in (0..parts.len()).rev() {
        match parts[i].as_str() {
            "." => {
                parts.remove(i);
            }
            ".." => {
                parts.remove(i);
                up += 1;
            }
            _ => {
                if up > 0 {
                    parts.remove(i);
                    up -= 1;
                }
            }
        }
    }

    if !must_end_abs {
        for _ in 0..up {
            parts.insert(0, String::from(".."));
        }
    }

    if must_end_abs
        && parts.first().map(String::as_str) != Some("")
        && parts.first().is_none_or(|first| !first.starts_with('/'))
    {
        parts.insert(0, String::new());
    }

    let mut result = parts.join("/");
    if has_trailing_slash && !result.ends_with('/') {
        result.push('/');
    }
    result
}
