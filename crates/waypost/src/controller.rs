#![forbid(unsafe_code)]

//! The history controller.
//!
//! [`History`] owns the current location/action, the key stack mirroring
//! the platform's navigation stack, and the public push/replace/go/listen/
//! block surface. The key stack exists for one purpose: when a back/forward
//! move (POP) is rejected by a prompt, the controller computes the signed
//! delta between the rejected entry's key and the current entry's key and
//! moves the platform pointer back by that amount. Keys unknown to the
//! stack degrade to index 0 — position recovery after a reload is
//! intentionally best-effort, not an error.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, warn};
use waypost_core::{
    Action, Location, PartialLocation, To, add_leading_slash, create_location, has_basename,
    strip_basename, strip_trailing_slash,
};

use crate::adapter::{CommitKind, HistoryAdapter, RawEntry};
use crate::transition::{Prompt, TransitionManager, UserConfirmation};
use crate::Result;

const DEFAULT_KEY_LENGTH: usize = 6;
const KEY_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Construction options for [`History`].
#[derive(Clone)]
pub struct HistoryOptions {
    /// Path prefix under which the application is mounted. Normalized to a
    /// leading slash and no trailing slash; stripped from adapter paths and
    /// prepended by [`History::create_href`].
    pub basename: String,
    /// When true, push/replace commit the entry and then perform a full
    /// navigation instead of staying in place.
    pub force_refresh: bool,
    /// Length of generated entry keys.
    pub key_length: usize,
    /// Confirmation function used when a prompt yields a message. Without
    /// one, message prompts auto-approve (with a warning).
    pub get_user_confirmation: Option<UserConfirmation>,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            basename: String::new(),
            force_refresh: false,
            key_length: DEFAULT_KEY_LENGTH,
            get_user_confirmation: None,
        }
    }
}

struct ControllerState {
    location: Location,
    action: Action,
    /// Ordered mirror of the platform stack's entry keys. `None` marks
    /// entries created outside this controller (initial load, reload).
    all_keys: Vec<Option<String>>,
    /// Set while a self-inflicted revert move is in flight; the resulting
    /// external-move notification is adopted without confirmation.
    force_next_pop: bool,
    /// Set around our own commits so an adapter that echoes them as moves
    /// does not re-enter the pop path.
    commit_in_flight: bool,
    /// listen/block registrations feeding the lazy adapter subscription.
    subscriber_count: usize,
    /// Whether a block() registration currently holds a subscription slot.
    is_blocked: bool,
}

struct HistoryInner {
    adapter: Rc<dyn HistoryAdapter>,
    transitions: TransitionManager,
    basename: String,
    force_refresh: bool,
    key_length: usize,
    confirm: Option<UserConfirmation>,
    state: RefCell<ControllerState>,
    rng: RefCell<SmallRng>,
}

/// A navigation history over an injected platform adapter.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct History {
    inner: Rc<HistoryInner>,
}

impl History {
    /// Build a history over `adapter`, deriving the initial location from
    /// the platform's current entry.
    ///
    /// # Errors
    ///
    /// [`crate::HistoryError::Decode`] when the current pathname's
    /// percent-encoding is invalid.
    pub fn new(adapter: Rc<dyn HistoryAdapter>, options: HistoryOptions) -> Result<Self> {
        let basename = normalize_basename(&options.basename);
        let initial = location_from_entry(&basename, adapter.read_current())?;
        let initial_key = initial.key.clone();

        let inner = Rc::new(HistoryInner {
            adapter,
            transitions: TransitionManager::new(),
            basename,
            force_refresh: options.force_refresh,
            key_length: if options.key_length == 0 {
                DEFAULT_KEY_LENGTH
            } else {
                options.key_length
            },
            confirm: options.get_user_confirmation,
            state: RefCell::new(ControllerState {
                location: initial,
                action: Action::Pop,
                all_keys: vec![initial_key],
                force_next_pop: false,
                commit_in_flight: false,
                subscriber_count: 0,
                is_blocked: false,
            }),
            rng: RefCell::new(SmallRng::from_os_rng()),
        });

        Ok(Self { inner })
    }

    /// Current location.
    #[must_use]
    pub fn location(&self) -> Location {
        self.inner.state.borrow().location.clone()
    }

    /// How the current location became current.
    #[must_use]
    pub fn action(&self) -> Action {
        self.inner.state.borrow().action
    }

    /// Size of the underlying platform stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.adapter.stack_len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compose the externally visible href for a target, with the basename
    /// applied. Pure; mutates nothing.
    #[must_use]
    pub fn create_href(&self, to: &PartialLocation) -> String {
        format!("{}{}", self.inner.basename, to.to_path())
    }

    /// Append a new entry.
    ///
    /// The transition runs through the confirmation gate first; a rejected
    /// push commits nothing and notifies no one.
    ///
    /// # Errors
    ///
    /// [`crate::HistoryError::Decode`] when the target pathname's
    /// percent-encoding is invalid.
    pub fn push(&self, to: impl Into<To>, state: Option<waypost_core::State>) -> Result<()> {
        self.navigate(to.into(), state, Action::Push)
    }

    /// Overwrite the current entry in place.
    ///
    /// # Errors
    ///
    /// [`crate::HistoryError::Decode`] when the target pathname's
    /// percent-encoding is invalid.
    pub fn replace(&self, to: impl Into<To>, state: Option<waypost_core::State>) -> Result<()> {
        self.navigate(to.into(), state, Action::Replace)
    }

    /// Move the platform stack pointer by `delta`.
    ///
    /// No local state changes here; the resulting move arrives later
    /// through the adapter's external-move notification and is handled as a
    /// POP.
    pub fn go(&self, delta: i32) {
        self.inner.adapter.travel(delta);
    }

    pub fn go_back(&self) {
        self.go(-1);
    }

    pub fn go_forward(&self) {
        self.go(1);
    }

    /// Register a change listener. The first active registration (listener
    /// or block) subscribes the controller to the adapter's external-move
    /// notifications; the last revocation unsubscribes.
    pub fn listen(&self, listener: impl Fn(&Location, Action) + 'static) -> Unlisten {
        let guard = self.inner.transitions.append_listener(listener);
        self.inner.check_adapter_subscription(1);
        Unlisten {
            inner: Rc::downgrade(&self.inner),
            guard,
            done: Cell::new(false),
        }
    }

    /// Install a prompt gating every transition.
    ///
    /// `Prompt::default()` vetoes everything; a message or hook asks the
    /// configured confirmation function. Like `listen`, an active block
    /// holds the adapter subscription so external moves can be gated too.
    pub fn block(&self, prompt: impl Into<Prompt>) -> Unblock {
        let guard = self.inner.transitions.set_prompt(prompt.into());

        let newly_blocked = {
            let mut state = self.inner.state.borrow_mut();
            if state.is_blocked {
                false
            } else {
                state.is_blocked = true;
                true
            }
        };
        if newly_blocked {
            self.inner.check_adapter_subscription(1);
        }

        Unblock {
            inner: Rc::downgrade(&self.inner),
            guard,
            done: Cell::new(false),
        }
    }

    fn navigate(&self, to: To, state: Option<waypost_core::State>, action: Action) -> Result<()> {
        if let To::Partial(partial) = &to
            && partial.state.is_some()
            && state.is_some()
        {
            warn!(
                action = %action,
                "separate state argument ignored: the target location already carries state"
            );
        }

        let key = self.inner.create_key();
        let current = self.inner.state.borrow().location.clone();
        let location = create_location(&to, state, Some(key), Some(&current))?;

        let inner = Rc::clone(&self.inner);
        let pending = location.clone();
        self.inner.transitions.confirm_transition_to(
            &location,
            action,
            self.inner.confirm.as_ref(),
            Box::new(move |ok| {
                if ok {
                    inner.finish_navigation(pending, action);
                }
            }),
        );
        Ok(())
    }
}

impl HistoryInner {
    fn create_key(&self) -> String {
        let mut rng = self.rng.borrow_mut();
        (0..self.key_length)
            .map(|_| KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())] as char)
            .collect()
    }

    fn href_for(&self, location: &Location) -> String {
        format!("{}{}", self.basename, location.to_path())
    }

    fn location_from_entry(&self, entry: RawEntry) -> std::result::Result<Location, waypost_core::DecodeError> {
        location_from_entry(&self.basename, entry)
    }

    /// Approved push/replace: commit to the platform, reconcile the key
    /// stack, adopt the location, notify.
    fn finish_navigation(self: &Rc<Self>, location: Location, action: Action) {
        let href = self.href_for(&location);
        let key = location.key.clone().unwrap_or_default();

        if !self.adapter.supports_stack_mutation() {
            if location.state.is_some() {
                warn!(
                    action = %action,
                    "state payload dropped: the platform cannot mutate its navigation stack"
                );
            }
            self.adapter.navigate(&href, action == Action::Replace);
            return;
        }

        let kind = match action {
            Action::Push => CommitKind::Append,
            Action::Replace => CommitKind::Overwrite,
            Action::Pop => unreachable!("pop is never committed"),
        };

        self.state.borrow_mut().commit_in_flight = true;
        self.adapter.commit(kind, &href, &key, location.state.as_ref());
        self.state.borrow_mut().commit_in_flight = false;

        if self.force_refresh {
            self.adapter.navigate(&href, action == Action::Replace);
            return;
        }

        {
            let mut state = self.state.borrow_mut();
            let current_key = state.location.key.clone();
            match action {
                Action::Push => {
                    // Mirror real push semantics: drop forward entries, then
                    // append. An unknown current key truncates to the root.
                    let cut = state
                        .all_keys
                        .iter()
                        .position(|k| *k == current_key)
                        .map_or(0, |idx| idx + 1);
                    state.all_keys.truncate(cut);
                    state.all_keys.push(location.key.clone());
                }
                Action::Replace => {
                    // Overwrite in place; a missing current key is a
                    // recoverable desync and leaves the stack unchanged.
                    if let Some(idx) = state.all_keys.iter().position(|k| *k == current_key) {
                        state.all_keys[idx] = location.key.clone();
                    }
                }
                Action::Pop => {}
            }
            state.location = location.clone();
            state.action = action;
        }
        self.transitions.notify_listeners(&location, action);
    }

    /// Adopt a location as current and notify. No borrow is held while
    /// listeners run, so they may re-enter the controller.
    fn apply(&self, location: Location, action: Action) {
        {
            let mut state = self.state.borrow_mut();
            state.location = location.clone();
            state.action = action;
        }
        self.transitions.notify_listeners(&location, action);
    }

    /// An external move arrived from the platform (back/forward).
    fn handle_external_move(self: &Rc<Self>, entry: RawEntry) {
        if self.state.borrow().commit_in_flight {
            debug!("ignoring move notification echoed from our own commit");
            return;
        }

        let location = match self.location_from_entry(entry) {
            Ok(location) => location,
            Err(err) => {
                // A pop cannot surface an error to any caller; drop it.
                error!(error = %err, "dropping external move with undecodable pathname");
                return;
            }
        };

        let forced = {
            let mut state = self.state.borrow_mut();
            if state.force_next_pop {
                state.force_next_pop = false;
                true
            } else {
                false
            }
        };
        if forced {
            // Our own revert landing; adopt without re-prompting.
            self.apply(location, Action::Pop);
            return;
        }

        let inner = Rc::clone(self);
        let pending = location.clone();
        self.transitions.confirm_transition_to(
            &location,
            Action::Pop,
            self.confirm.as_ref(),
            Box::new(move |ok| {
                if ok {
                    inner.apply(pending, Action::Pop);
                } else {
                    inner.revert_pop(&pending);
                }
            }),
        );
    }

    /// Undo a rejected pop by moving the platform pointer back to the
    /// current entry. Keys missing from the key stack degrade to index 0.
    fn revert_pop(self: &Rc<Self>, from: &Location) {
        let delta = {
            let state = self.state.borrow();
            let to_index = state
                .all_keys
                .iter()
                .position(|k| *k == state.location.key)
                .unwrap_or(0);
            let from_index = state
                .all_keys
                .iter()
                .position(|k| *k == from.key)
                .unwrap_or(0);
            to_index as i32 - from_index as i32
        };

        if delta != 0 {
            self.state.borrow_mut().force_next_pop = true;
            self.adapter.travel(delta);
        }
    }

    /// Reference-counted lazy subscription: crossing 0↔1 wires or unwires
    /// the adapter's external-move notifications.
    fn check_adapter_subscription(self: &Rc<Self>, delta: i32) {
        let (old, new) = {
            let mut state = self.state.borrow_mut();
            let old = state.subscriber_count;
            state.subscriber_count = if delta > 0 {
                old + 1
            } else {
                old.saturating_sub(1)
            };
            (old, state.subscriber_count)
        };

        if old == 0 && new == 1 {
            debug!("subscribing to platform move notifications");
            let weak = Rc::downgrade(self);
            self.adapter.subscribe(Rc::new(move |entry| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_external_move(entry);
                }
            }));
        } else if old == 1 && new == 0 {
            debug!("unsubscribing from platform move notifications");
            self.adapter.unsubscribe();
        }
    }
}

/// Revocation handle returned by [`History::listen`]. Idempotent.
pub struct Unlisten {
    inner: Weak<HistoryInner>,
    guard: crate::transition::ListenerGuard,
    done: Cell<bool>,
}

impl Unlisten {
    /// Stop this listener and release its subscription slot.
    pub fn unlisten(&self) {
        if self.done.replace(true) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            inner.check_adapter_subscription(-1);
        }
        self.guard.revoke();
    }
}

/// Revocation handle returned by [`History::block`]. Idempotent.
pub struct Unblock {
    inner: Weak<HistoryInner>,
    guard: crate::transition::PromptGuard,
    done: Cell<bool>,
}

impl Unblock {
    /// Remove the prompt and release the block's subscription slot.
    pub fn unblock(&self) {
        if self.done.replace(true) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            let was_blocked = {
                let mut state = inner.state.borrow_mut();
                if state.is_blocked {
                    state.is_blocked = false;
                    true
                } else {
                    false
                }
            };
            if was_blocked {
                inner.check_adapter_subscription(-1);
            }
        }
        self.guard.release();
    }
}

fn normalize_basename(basename: &str) -> String {
    if basename.is_empty() {
        String::new()
    } else {
        strip_trailing_slash(&add_leading_slash(basename)).to_string()
    }
}

fn location_from_entry(
    basename: &str,
    entry: RawEntry,
) -> std::result::Result<Location, waypost_core::DecodeError> {
    let mut path = entry.path;
    if !basename.is_empty() {
        if !has_basename(&path, basename) {
            warn!(
                path,
                basename, "current path does not begin with the configured basename"
            );
        }
        path = strip_basename(&path, basename);
    }
    create_location(&To::Path(path), entry.state, entry.key, None)
}
