#![forbid(unsafe_code)]

//! The HTML5 history adapter.
//!
//! `pushState`/`replaceState` carry a `{key, state}` payload encoded through
//! [`state_codec`](crate::state_codec); external moves arrive on `popstate`
//! (plus `hashchange` on Trident, which never fires `popstate` for hash
//! moves). Platform failures inside the adapter are logged, not surfaced:
//! the `HistoryAdapter` contract has nowhere to put them, and the original
//! DOM APIs fail only in degenerate embeddings.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{Event, PopStateEvent, Window};

use waypost::{
    CommitKind, ExternalMoveHandler, History, HistoryAdapter, HistoryOptions, RawEntry,
    TransitionCallback, UserConfirmation,
};
use waypost_core::State;

use crate::state_codec::{self, EntryState};
use crate::{WebHistoryError, detect};

type HandlerSlot = Rc<RefCell<Option<ExternalMoveHandler>>>;

/// `waypost::HistoryAdapter` over `window.history`.
pub struct BrowserAdapter {
    window: Window,
    history: web_sys::History,
    user_agent: String,
    supports_mutation: bool,
    needs_hash_events: bool,
    handler: HandlerSlot,
    popstate: RefCell<Option<Closure<dyn FnMut(PopStateEvent)>>>,
    hashchange: RefCell<Option<Closure<dyn FnMut(Event)>>>,
}

impl BrowserAdapter {
    /// Bind to the current document's `window.history`.
    ///
    /// # Errors
    ///
    /// [`WebHistoryError::NoDom`] when no DOM window exists (worker,
    /// detached module).
    pub fn new() -> Result<Rc<Self>, WebHistoryError> {
        let window = web_sys::window().ok_or(WebHistoryError::NoDom)?;
        let history = window.history().map_err(|_| WebHistoryError::NoDom)?;
        let user_agent = window.navigator().user_agent().unwrap_or_default();

        let has_push_state = js_sys::Reflect::has(history.as_ref(), &JsValue::from_str("pushState"))
            .unwrap_or(false);
        let supports_mutation =
            has_push_state && !detect::is_broken_stock_android(&user_agent);
        if !supports_mutation {
            warn!("history entries will be created with full page reloads on this browser");
        }
        let needs_hash_events = detect::needs_hash_change_events(&user_agent);

        Ok(Rc::new(Self {
            window,
            history,
            user_agent,
            supports_mutation,
            needs_hash_events,
            handler: Rc::new(RefCell::new(None)),
            popstate: RefCell::new(None),
            hashchange: RefCell::new(None),
        }))
    }
}

impl HistoryAdapter for BrowserAdapter {
    fn read_current(&self) -> RawEntry {
        // history.state throws on some engines right after a reload; treat
        // that as an entry with no payload.
        let raw = self.history.state().unwrap_or(JsValue::NULL);
        entry_from(&self.window, &raw)
    }

    fn commit(&self, kind: CommitKind, href: &str, key: &str, state: Option<&State>) {
        let payload = EntryState {
            key: Some(key.to_string()),
            state: state.cloned(),
        };
        let value = match state_codec::encode(&payload) {
            Ok(text) => js_sys::JSON::parse(&text).unwrap_or(JsValue::NULL),
            Err(err) => {
                warn!(error = %err, "committing entry without its state payload");
                JsValue::NULL
            }
        };

        let result = match kind {
            CommitKind::Append => self.history.push_state_with_url(&value, "", Some(href)),
            CommitKind::Overwrite => self.history.replace_state_with_url(&value, "", Some(href)),
        };
        if result.is_err() {
            warn!(href, ?kind, "history state mutation was rejected by the browser");
        }
    }

    fn travel(&self, delta: i32) {
        if self.history.go_with_delta(delta).is_err() {
            warn!(delta, "history traversal was rejected by the browser");
        }
    }

    fn subscribe(&self, handler: ExternalMoveHandler) {
        *self.handler.borrow_mut() = Some(handler);
        if self.popstate.borrow().is_some() {
            return;
        }

        let popstate = {
            let window = self.window.clone();
            let slot = Rc::clone(&self.handler);
            let user_agent = self.user_agent.clone();
            Closure::<dyn FnMut(PopStateEvent)>::new(move |event: PopStateEvent| {
                let state = event.state();
                if detect::is_extraneous_popstate(&user_agent, state.is_undefined()) {
                    debug!("ignoring extraneous page-load popstate");
                    return;
                }
                deliver(&window, &state, &slot);
            })
        };
        if self
            .window
            .add_event_listener_with_callback("popstate", popstate.as_ref().unchecked_ref())
            .is_err()
        {
            warn!("failed to attach the popstate listener");
        }
        *self.popstate.borrow_mut() = Some(popstate);

        if self.needs_hash_events {
            let hashchange = {
                let window = self.window.clone();
                let history = self.history.clone();
                let slot = Rc::clone(&self.handler);
                Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
                    let state = history.state().unwrap_or(JsValue::NULL);
                    deliver(&window, &state, &slot);
                })
            };
            if self
                .window
                .add_event_listener_with_callback("hashchange", hashchange.as_ref().unchecked_ref())
                .is_err()
            {
                warn!("failed to attach the hashchange listener");
            }
            *self.hashchange.borrow_mut() = Some(hashchange);
        }
    }

    fn unsubscribe(&self) {
        *self.handler.borrow_mut() = None;
        if let Some(popstate) = self.popstate.borrow_mut().take() {
            let _ = self
                .window
                .remove_event_listener_with_callback("popstate", popstate.as_ref().unchecked_ref());
        }
        if let Some(hashchange) = self.hashchange.borrow_mut().take() {
            let _ = self.window.remove_event_listener_with_callback(
                "hashchange",
                hashchange.as_ref().unchecked_ref(),
            );
        }
    }

    fn supports_stack_mutation(&self) -> bool {
        self.supports_mutation
    }

    fn navigate(&self, href: &str, replace: bool) {
        let location = self.window.location();
        let result = if replace {
            location.replace(href)
        } else {
            location.assign(href)
        };
        if result.is_err() {
            warn!(href, replace, "full navigation was rejected by the browser");
        }
    }

    fn stack_len(&self) -> usize {
        self.history.length().unwrap_or(0) as usize
    }
}

fn entry_from(window: &Window, raw_state: &JsValue) -> RawEntry {
    let location = window.location();
    let path = format!(
        "{}{}{}",
        location.pathname().unwrap_or_default(),
        location.search().unwrap_or_default(),
        location.hash().unwrap_or_default(),
    );
    let payload = decode_state_value(raw_state);
    RawEntry {
        path,
        state: payload.state,
        key: payload.key,
    }
}

fn decode_state_value(raw: &JsValue) -> EntryState {
    if raw.is_null() || raw.is_undefined() {
        return EntryState::default();
    }
    let Ok(text) = js_sys::JSON::stringify(raw) else {
        warn!("discarding a non-serializable history entry state");
        return EntryState::default();
    };
    match state_codec::decode(&String::from(text)) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "discarding an unreadable history entry state");
            EntryState::default()
        }
    }
}

fn deliver(window: &Window, raw_state: &JsValue, slot: &HandlerSlot) {
    let entry = entry_from(window, raw_state);
    // Clone the handler out so it may re-enter the adapter.
    let handler = slot.borrow().clone();
    if let Some(handler) = handler {
        handler(entry);
    }
}

/// A `get_user_confirmation` backed by `window.confirm`. Blocks the event
/// loop and answers synchronously, like the native dialog does.
#[must_use]
pub fn window_confirmation() -> UserConfirmation {
    Rc::new(|message: &str, callback: TransitionCallback| {
        let allowed = web_sys::window()
            .and_then(|window| window.confirm_with_message(message).ok())
            .unwrap_or(false);
        callback(allowed);
    })
}

/// Build a [`History`] over the current document, defaulting the
/// confirmation function to [`window_confirmation`].
///
/// # Errors
///
/// [`WebHistoryError::NoDom`] outside a document;
/// [`WebHistoryError::History`] when the initial location cannot be
/// decoded.
pub fn browser_history(mut options: HistoryOptions) -> Result<History, WebHistoryError> {
    let adapter = BrowserAdapter::new()?;
    if options.get_user_confirmation.is_none() {
        options.get_user_confirmation = Some(window_confirmation());
    }
    Ok(History::new(adapter, options)?)
}
