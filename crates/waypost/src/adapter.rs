#![forbid(unsafe_code)]

//! The platform adapter contract.
//!
//! The controller never touches a navigation primitive directly; everything
//! platform-specific sits behind [`HistoryAdapter`], injected at
//! construction. `waypost-web` implements it over the HTML5 history API;
//! tests drive the controller with an in-process fake.

use std::rc::Rc;

use waypost_core::State;

/// How a commit lands on the platform's navigation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    /// Append a new entry after the current position, discarding any
    /// forward entries (push semantics).
    Append,
    /// Overwrite the entry at the current position (replace semantics).
    Overwrite,
}

/// The platform's view of one history entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    /// Raw path, including search and hash, before basename stripping.
    pub path: String,
    /// State payload stored with the entry, if any.
    pub state: Option<State>,
    /// Entry key stored with the entry; absent for entries created outside
    /// the controller (e.g. the initial page load).
    pub key: Option<String>,
}

/// Callback invoked when the platform's stack pointer moves outside the
/// controller's own commits (back/forward, user gesture).
pub type ExternalMoveHandler = Rc<dyn Fn(RawEntry)>;

/// The navigation primitive the controller drives.
///
/// Implementations are single-threaded and re-entrant-safe: a `commit` or
/// `travel` call may synchronously invoke the subscribed handler, and the
/// handler may call back into the adapter.
pub trait HistoryAdapter {
    /// Current entry as the platform sees it.
    fn read_current(&self) -> RawEntry;

    /// Mutate the navigation stack in place.
    fn commit(&self, kind: CommitKind, href: &str, key: &str, state: Option<&State>);

    /// Move the stack pointer by a signed delta.
    fn travel(&self, delta: i32);

    /// Start delivering external-move notifications to `handler`.
    ///
    /// At most one handler is active at a time; a second `subscribe`
    /// replaces the first.
    fn subscribe(&self, handler: ExternalMoveHandler);

    /// Stop delivering external-move notifications.
    fn unsubscribe(&self);

    /// Whether the platform supports in-place stack mutation at all. When
    /// false, push/replace fall back to full navigation and state payloads
    /// are dropped.
    fn supports_stack_mutation(&self) -> bool {
        true
    }

    /// Full-reload style navigation to `href` (the fallback path and the
    /// force-refresh mode).
    fn navigate(&self, href: &str, replace: bool);

    /// Size of the platform's navigation stack.
    fn stack_len(&self) -> usize;
}
