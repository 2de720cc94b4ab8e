#![forbid(unsafe_code)]

//! Transition confirmation and the change-listener registry.
//!
//! The manager holds at most one active [`Prompt`] and an ordered set of
//! listeners. Every navigation runs through [`confirm_transition_to`]:
//! without a prompt it approves immediately; with one, the prompt decides
//! whether to approve, veto, or ask the caller's confirmation function for a
//! yes/no answer. The confirmation function may answer synchronously or
//! arbitrarily later — the continuation it is handed fires exactly once.
//!
//! Listener bookkeeping is an explicit registry: each entry has an id and an
//! active flag, and revocation is idempotent. A listener revoked while a
//! notification pass is in flight is skipped if it has not run yet.
//!
//! [`confirm_transition_to`]: TransitionManager::confirm_transition_to

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;
use waypost_core::{Action, Location};

/// One-shot continuation answering a confirmation request.
pub type TransitionCallback = Box<dyn FnOnce(bool)>;

/// Caller-supplied confirmation: shows `message` and eventually invokes the
/// callback with the user's answer, synchronously or not.
pub type UserConfirmation = Rc<dyn Fn(&str, TransitionCallback)>;

/// Per-transition prompt hook.
pub type PromptHook = Rc<dyn Fn(&Location, Action) -> PromptDecision>;

/// What a prompt decided for one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptDecision {
    /// Ask the user with this message; the transition proceeds only on a
    /// positive answer.
    Message(String),
    /// Veto the transition outright.
    Deny,
    /// Let the transition through without asking.
    Allow,
}

/// The caller-installed gate applied to every transition.
#[derive(Clone, Default)]
pub enum Prompt {
    /// Veto every transition without consulting anyone. This is the default
    /// for `block()` with no arguments.
    #[default]
    Deny,
    /// Fixed confirmation message for every transition.
    Message(String),
    /// Decide per transition.
    Hook(PromptHook),
}

impl Prompt {
    /// Wrap a closure as a per-transition hook.
    pub fn hook(f: impl Fn(&Location, Action) -> PromptDecision + 'static) -> Self {
        Self::Hook(Rc::new(f))
    }

    fn evaluate(&self, location: &Location, action: Action) -> PromptDecision {
        match self {
            Self::Deny => PromptDecision::Deny,
            Self::Message(message) => PromptDecision::Message(message.clone()),
            Self::Hook(hook) => hook(location, action),
        }
    }
}

impl From<&str> for Prompt {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

impl From<String> for Prompt {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl fmt::Debug for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deny => f.write_str("Prompt::Deny"),
            Self::Message(message) => write!(f, "Prompt::Message({message:?})"),
            Self::Hook(_) => f.write_str("Prompt::Hook(..)"),
        }
    }
}

type Listener = Rc<dyn Fn(&Location, Action)>;

struct ActivePrompt {
    epoch: u64,
    prompt: Prompt,
}

struct ListenerEntry {
    id: u64,
    active: Rc<Cell<bool>>,
    handler: Listener,
}

#[derive(Default)]
struct TransitionInner {
    prompt: Option<ActivePrompt>,
    next_prompt_epoch: u64,
    listeners: Vec<ListenerEntry>,
    next_listener_id: u64,
}

/// Confirmation gate plus listener registry for one history instance.
///
/// Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct TransitionManager {
    inner: Rc<RefCell<TransitionInner>>,
}

impl TransitionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `prompt` as the active prompt. Last write wins; overwriting a
    /// live prompt is reported but not fatal.
    ///
    /// The returned guard clears the prompt only while it is still the one
    /// this call installed; releasing after it was superseded is a no-op.
    pub fn set_prompt(&self, prompt: Prompt) -> PromptGuard {
        let mut inner = self.inner.borrow_mut();
        if inner.prompt.is_some() {
            warn!("a history supports only one prompt at a time; replacing the active prompt");
        }
        let epoch = inner.next_prompt_epoch;
        inner.next_prompt_epoch += 1;
        inner.prompt = Some(ActivePrompt { epoch, prompt });
        PromptGuard {
            inner: Rc::downgrade(&self.inner),
            epoch,
        }
    }

    /// Whether a prompt is currently installed.
    #[must_use]
    pub fn has_prompt(&self) -> bool {
        self.inner.borrow().prompt.is_some()
    }

    /// Run the cancellation gate for one transition.
    ///
    /// Without a prompt, approves immediately. A `Message` decision defers
    /// to `confirm`; if none is configured the transition is approved with a
    /// warning, since there is no way to ask.
    pub fn confirm_transition_to(
        &self,
        location: &Location,
        action: Action,
        confirm: Option<&UserConfirmation>,
        callback: TransitionCallback,
    ) {
        // Clone the prompt out so hooks and callbacks run with no borrow
        // held and may re-enter the manager.
        let prompt = self
            .inner
            .borrow()
            .prompt
            .as_ref()
            .map(|active| active.prompt.clone());

        let Some(prompt) = prompt else {
            callback(true);
            return;
        };

        match prompt.evaluate(location, action) {
            PromptDecision::Allow => callback(true),
            PromptDecision::Deny => callback(false),
            PromptDecision::Message(message) => match confirm {
                Some(confirm) => confirm(&message, callback),
                None => {
                    warn!(
                        action = %action,
                        "a history needs a confirmation function to use a prompt message; \
                         approving the transition"
                    );
                    callback(true);
                }
            },
        }
    }

    /// Register a change listener; listeners fire in registration order.
    pub fn append_listener(&self, handler: impl Fn(&Location, Action) + 'static) -> ListenerGuard {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        let active = Rc::new(Cell::new(true));
        inner.listeners.push(ListenerEntry {
            id,
            active: Rc::clone(&active),
            handler: Rc::new(handler),
        });
        ListenerGuard {
            inner: Rc::downgrade(&self.inner),
            id,
            active,
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Invoke every active listener, synchronously, in registration order.
    ///
    /// Runs against a snapshot with no borrow held, so listeners may revoke
    /// themselves or register new listeners; a listener revoked mid-pass is
    /// skipped if it has not run yet, and late registrations wait for the
    /// next notification.
    pub fn notify_listeners(&self, location: &Location, action: Action) {
        let snapshot: Vec<(Rc<Cell<bool>>, Listener)> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|entry| (Rc::clone(&entry.active), Rc::clone(&entry.handler)))
            .collect();

        for (active, handler) in snapshot {
            if active.get() {
                handler(location, action);
            }
        }
    }
}

/// Revocation handle for an installed prompt.
pub struct PromptGuard {
    inner: Weak<RefCell<TransitionInner>>,
    epoch: u64,
}

impl PromptGuard {
    /// Clear the prompt, unless it has already been superseded. Idempotent.
    pub fn release(&self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut inner = inner.borrow_mut();
            if inner
                .prompt
                .as_ref()
                .is_some_and(|active| active.epoch == self.epoch)
            {
                inner.prompt = None;
            }
        }
    }
}

/// Revocation handle for a registered listener.
pub struct ListenerGuard {
    inner: Weak<RefCell<TransitionInner>>,
    id: u64,
    active: Rc<Cell<bool>>,
}

impl ListenerGuard {
    /// Deactivate and remove this listener. Idempotent.
    pub fn revoke(&self) {
        self.active.set(false);
        if let Some(inner) = self.inner.upgrade() {
            inner.borrow_mut().listeners.retain(|entry| entry.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn loc(pathname: &str) -> Location {
        Location {
            pathname: pathname.to_string(),
            ..Location::default()
        }
    }

    fn recorded() -> (Rc<RefCell<Vec<bool>>>, impl Fn() -> TransitionCallback) {
        let answers = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let answers = Rc::clone(&answers);
            move || -> TransitionCallback {
                let answers = Rc::clone(&answers);
                Box::new(move |ok| answers.borrow_mut().push(ok))
            }
        };
        (answers, make)
    }

    // ── confirmation ────────────────────────────────────────────────

    #[test]
    fn no_prompt_approves_immediately() {
        let manager = TransitionManager::new();
        let (answers, callback) = recorded();
        manager.confirm_transition_to(&loc("/a"), Action::Push, None, callback());
        assert_eq!(*answers.borrow(), vec![true]);
    }

    #[test]
    fn deny_prompt_vetoes_without_asking() {
        let manager = TransitionManager::new();
        let _guard = manager.set_prompt(Prompt::Deny);
        let (answers, callback) = recorded();
        manager.confirm_transition_to(&loc("/a"), Action::Push, None, callback());
        assert_eq!(*answers.borrow(), vec![false]);
    }

    #[test]
    fn message_prompt_defers_to_confirmation_function() {
        let manager = TransitionManager::new();
        let _guard = manager.set_prompt(Prompt::from("Are you sure?"));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let confirm: UserConfirmation = {
            let seen = Rc::clone(&seen);
            Rc::new(move |message, callback| {
                seen.borrow_mut().push(message.to_string());
                callback(false);
            })
        };

        let (answers, callback) = recorded();
        manager.confirm_transition_to(&loc("/a"), Action::Push, Some(&confirm), callback());
        assert_eq!(*seen.borrow(), vec!["Are you sure?".to_string()]);
        assert_eq!(*answers.borrow(), vec![false]);
    }

    #[test]
    fn message_without_confirmation_function_auto_approves() {
        let manager = TransitionManager::new();
        let _guard = manager.set_prompt(Prompt::from("unanswerable"));
        let (answers, callback) = recorded();
        manager.confirm_transition_to(&loc("/a"), Action::Push, None, callback());
        assert_eq!(*answers.borrow(), vec![true]);
    }

    #[test]
    fn hook_sees_location_and_action() {
        let manager = TransitionManager::new();
        let _guard = manager.set_prompt(Prompt::hook(|location, action| {
            if location.pathname == "/guarded" && action == Action::Pop {
                PromptDecision::Deny
            } else {
                PromptDecision::Allow
            }
        }));

        let (answers, callback) = recorded();
        manager.confirm_transition_to(&loc("/guarded"), Action::Pop, None, callback());
        manager.confirm_transition_to(&loc("/guarded"), Action::Push, None, callback());
        manager.confirm_transition_to(&loc("/open"), Action::Pop, None, callback());
        assert_eq!(*answers.borrow(), vec![false, true, true]);
    }

    #[test]
    fn confirmation_may_answer_later() {
        let manager = TransitionManager::new();
        let _guard = manager.set_prompt(Prompt::from("hold on"));

        let pending: Rc<RefCell<Option<TransitionCallback>>> = Rc::new(RefCell::new(None));
        let confirm: UserConfirmation = {
            let pending = Rc::clone(&pending);
            Rc::new(move |_message, callback| {
                *pending.borrow_mut() = Some(callback);
            })
        };

        let (answers, callback) = recorded();
        manager.confirm_transition_to(&loc("/a"), Action::Push, Some(&confirm), callback());
        assert!(answers.borrow().is_empty(), "answer must wait for the user");

        let callback = pending.borrow_mut().take().unwrap();
        callback(true);
        assert_eq!(*answers.borrow(), vec![true]);
    }

    // ── prompt lifecycle ────────────────────────────────────────────

    #[test]
    fn release_clears_own_prompt() {
        let manager = TransitionManager::new();
        let guard = manager.set_prompt(Prompt::Deny);
        assert!(manager.has_prompt());
        guard.release();
        assert!(!manager.has_prompt());
        guard.release(); // idempotent
        assert!(!manager.has_prompt());
    }

    #[test]
    fn release_of_superseded_prompt_is_a_no_op() {
        let manager = TransitionManager::new();
        let first = manager.set_prompt(Prompt::from("first"));
        let _second = manager.set_prompt(Prompt::from("second"));

        first.release();
        assert!(manager.has_prompt(), "second prompt must survive");

        let (answers, callback) = recorded();
        // Second prompt (a message with no confirmation fn) auto-approves,
        // proving it is still the one installed.
        manager.confirm_transition_to(&loc("/a"), Action::Push, None, callback());
        assert_eq!(*answers.borrow(), vec![true]);
    }

    // ── listeners ───────────────────────────────────────────────────

    #[test]
    fn listeners_fire_in_registration_order() {
        let manager = TransitionManager::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let _a = manager.append_listener({
            let order = Rc::clone(&order);
            move |_, _| order.borrow_mut().push("a")
        });
        let _b = manager.append_listener({
            let order = Rc::clone(&order);
            move |_, _| order.borrow_mut().push("b")
        });

        manager.notify_listeners(&loc("/x"), Action::Push);
        assert_eq!(*order.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn revoked_listener_stops_receiving() {
        let manager = TransitionManager::new();
        let count = Rc::new(Cell::new(0));

        let guard = manager.append_listener({
            let count = Rc::clone(&count);
            move |_, _| count.set(count.get() + 1)
        });

        manager.notify_listeners(&loc("/x"), Action::Push);
        guard.revoke();
        guard.revoke(); // idempotent
        manager.notify_listeners(&loc("/y"), Action::Push);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn revocation_does_not_disturb_other_listeners() {
        let manager = TransitionManager::new();
        let survivor = Rc::new(Cell::new(0));

        let doomed = manager.append_listener(|_, _| {});
        let _keeper = manager.append_listener({
            let survivor = Rc::clone(&survivor);
            move |_, _| survivor.set(survivor.get() + 1)
        });

        doomed.revoke();
        manager.notify_listeners(&loc("/x"), Action::Push);
        assert_eq!(survivor.get(), 1);
    }

    #[test]
    fn listener_revoked_mid_pass_is_skipped() {
        let manager = TransitionManager::new();
        let later_ran = Rc::new(Cell::new(false));
        let later_guard: Rc<RefCell<Option<ListenerGuard>>> = Rc::new(RefCell::new(None));

        let _first = manager.append_listener({
            let later_guard = Rc::clone(&later_guard);
            move |_, _| {
                if let Some(guard) = later_guard.borrow().as_ref() {
                    guard.revoke();
                }
            }
        });
        let second = manager.append_listener({
            let later_ran = Rc::clone(&later_ran);
            move |_, _| later_ran.set(true)
        });
        *later_guard.borrow_mut() = Some(second);

        manager.notify_listeners(&loc("/x"), Action::Push);
        assert!(!later_ran.get(), "listener revoked by an earlier one must not run");
    }

    #[test]
    fn listener_count_tracks_registry() {
        let manager = TransitionManager::new();
        assert_eq!(manager.listener_count(), 0);
        let guard = manager.append_listener(|_, _| {});
        assert_eq!(manager.listener_count(), 1);
        guard.revoke();
        assert_eq!(manager.listener_count(), 0);
    }
}
