//! Events as data: event state, listener tables, handler slots and the
//! host side of dispatch. Invoking listeners is the engine's job; the host
//! computes propagation paths and keeps the event flags.

use crate::catalogue::HostClassDescriptor;
use crate::error::{HostError, HostResult};
use crate::profile::{BrowserCondition, FeatureTag};

use super::{
    CallbackId, DeferredAction, HostCall, HostValue, InstanceId, InstanceState, WindowHost,
    WINDOW,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    None = 0,
    Capturing = 1,
    AtTarget = 2,
    Bubbling = 3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDetail {
    Plain,
    HashChange { old_url: String, new_url: String },
}

#[derive(Debug, Clone)]
pub struct EventState {
    pub event_type: String,
    pub bubbles: bool,
    pub cancelable: bool,
    pub trusted: bool,
    pub target: Option<InstanceId>,
    pub current_target: Option<InstanceId>,
    pub phase: Phase,
    pub default_prevented: bool,
    pub stop_propagation: bool,
    pub stop_immediate: bool,
    pub dispatching: bool,
    pub detail: EventDetail,
}

impl EventState {
    pub fn new(event_type: impl Into<String>, bubbles: bool, cancelable: bool) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles,
            cancelable,
            trusted: false,
            target: None,
            current_target: None,
            phase: Phase::None,
            default_prevented: false,
            stop_propagation: false,
            stop_immediate: false,
            dispatching: false,
            detail: EventDetail::Plain,
        }
    }

    /// Event fired by the host itself rather than constructed by script.
    pub fn trusted(event_type: impl Into<String>, bubbles: bool, cancelable: bool) -> Self {
        Self {
            trusted: true,
            ..Self::new(event_type, bubbles, cancelable)
        }
    }

    pub fn with_detail(mut self, detail: EventDetail) -> Self {
        self.detail = detail;
        self
    }
}

#[derive(Debug, Clone)]
pub struct EventSourceState {
    pub url: String,
    pub ready_state: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listener {
    pub callback: CallbackId,
    pub capture: bool,
    pub once: bool,
    /// Registered through an `on<type>` handler slot.
    pub handler: bool,
}

/// Listeners of one event target, in registration order.
#[derive(Debug, Default)]
pub struct Listeners {
    entries: Vec<(String, Listener)>,
}

impl Listeners {
    pub fn add(
        &mut self,
        event_type: &str,
        callback: CallbackId,
        capture: bool,
        once: bool,
    ) -> bool {
        let duplicate = self.entries.iter().any(|(kind, listener)| {
            kind == event_type
                && !listener.handler
                && listener.callback == callback
                && listener.capture == capture
        });
        if duplicate {
            return false;
        }
        self.entries.push((
            event_type.to_string(),
            Listener {
                callback,
                capture,
                once,
                handler: false,
            },
        ));
        true
    }

    pub fn remove(&mut self, event_type: &str, callback: CallbackId, capture: bool) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(kind, listener)| {
            !(kind == event_type
                && !listener.handler
                && listener.callback == callback
                && listener.capture == capture)
        });
        before != self.entries.len()
    }

    /// Replace the handler slot for `event_type` in place, keeping its position.
    pub fn set_handler(&mut self, event_type: &str, callback: Option<CallbackId>) {
        let position = self
            .entries
            .iter()
            .position(|(kind, listener)| kind == event_type && listener.handler);
        match (position, callback) {
            (Some(index), Some(callback)) => self.entries[index].1.callback = callback,
            (Some(index), None) => {
                self.entries.remove(index);
            }
            (None, Some(callback)) => self.entries.push((
                event_type.to_string(),
                Listener {
                    callback,
                    capture: false,
                    once: false,
                    handler: true,
                },
            )),
            (None, None) => {}
        }
    }

    pub fn handler(&self, event_type: &str) -> Option<CallbackId> {
        self.entries
            .iter()
            .find(|(kind, listener)| kind == event_type && listener.handler)
            .map(|(_, listener)| listener.callback)
    }

    pub fn for_phase(&self, event_type: &str, phase: Phase) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|(kind, _)| kind == event_type)
            .map(|(_, listener)| *listener)
            .filter(|listener| match phase {
                Phase::Capturing => listener.capture,
                Phase::Bubbling => !listener.capture,
                Phase::AtTarget | Phase::None => true,
            })
            .collect()
    }

    pub fn contains(&self, event_type: &str, listener: &Listener) -> bool {
        self.entries
            .iter()
            .any(|(kind, candidate)| kind == event_type && candidate == listener)
    }

    fn forget(&mut self, event_type: &str, listener: &Listener) {
        if let Some(index) = self
            .entries
            .iter()
            .position(|(kind, candidate)| kind == event_type && candidate == listener)
        {
            self.entries.remove(index);
        }
    }
}

impl WindowHost {
    pub fn create_event(&mut self, class: &'static str, state: EventState) -> InstanceId {
        self.create_instance(class, InstanceState::Event(state))
    }

    pub fn event(&self, id: InstanceId) -> HostResult<&EventState> {
        match &self.instance(id)?.state {
            InstanceState::Event(state) => Ok(state),
            _ => Err(HostError::type_mismatch("Illegal invocation")),
        }
    }

    pub fn event_mut(&mut self, id: InstanceId) -> HostResult<&mut EventState> {
        match &mut self.instance_mut(id)?.state {
            InstanceState::Event(state) => Ok(state),
            _ => Err(HostError::type_mismatch("Illegal invocation")),
        }
    }

    /// Queue `event` for dispatch at `target` once the current script turn ends.
    pub fn fire_event(&mut self, target: InstanceId, event: InstanceId) {
        self.deferred
            .push(DeferredAction::DispatchEvent { target, event });
    }

    pub fn fire_simple_event(&mut self, target: InstanceId, event_type: &str, bubbles: bool) {
        let event = self.create_event("Event", EventState::trusted(event_type, bubbles, false));
        self.fire_event(target, event);
    }

    /// Assign an `on<type>` slot: a function installs it, anything else clears it.
    pub fn dispatch_to_handler(
        &mut self,
        target: InstanceId,
        event_type: &str,
        value: &HostValue,
    ) -> HostResult<()> {
        let callback = value.as_callback();
        self.instance_mut(target)?
            .listeners
            .set_handler(event_type, callback);
        Ok(())
    }

    pub fn event_handler(
        &self,
        target: InstanceId,
        event_type: &str,
    ) -> HostResult<Option<CallbackId>> {
        Ok(self.instance(target)?.listeners.handler(event_type))
    }

    /// Validate and mark `event` as dispatching at `target`. Returns the
    /// propagation path, target first.
    pub fn begin_dispatch(
        &mut self,
        event: InstanceId,
        target: InstanceId,
    ) -> HostResult<Vec<InstanceId>> {
        {
            let state = self.event(event)?;
            if state.dispatching {
                return Err(HostError::InvalidState(
                    "The event is already being dispatched.".into(),
                ));
            }
        }

        let mut path = vec![target];
        if let Some(mut current) = self.instance(target)?.node_id() {
            while let Some(parent) = self.dom.parent(current)? {
                path.push(self.instance_for_node(parent)?);
                current = parent;
            }
            if current == self.document {
                path.push(WINDOW);
            }
        }

        let state = self.event_mut(event)?;
        state.dispatching = true;
        state.target = Some(target);
        state.stop_propagation = false;
        state.stop_immediate = false;
        Ok(path)
    }

    /// Move the event to `current` in `phase`; returns the listeners to invoke.
    pub fn enter_phase(
        &mut self,
        event: InstanceId,
        current: InstanceId,
        phase: Phase,
    ) -> HostResult<Vec<Listener>> {
        let event_type = {
            let state = self.event_mut(event)?;
            if state.stop_propagation {
                return Ok(Vec::new());
            }
            state.current_target = Some(current);
            state.phase = phase;
            state.event_type.clone()
        };
        Ok(self.instance(current)?.listeners.for_phase(&event_type, phase))
    }

    /// Whether `listener` is still registered at `current` and should run.
    pub fn listener_active(
        &self,
        event: InstanceId,
        current: InstanceId,
        listener: &Listener,
    ) -> HostResult<bool> {
        let state = self.event(event)?;
        if state.stop_immediate {
            return Ok(false);
        }
        Ok(self
            .instance(current)?
            .listeners
            .contains(&state.event_type, listener))
    }

    /// Bookkeeping before a listener runs: `once` listeners are removed.
    pub fn listener_started(
        &mut self,
        event: InstanceId,
        current: InstanceId,
        listener: &Listener,
    ) -> HostResult<()> {
        if listener.once {
            let event_type = self.event(event)?.event_type.clone();
            self.instance_mut(current)?
                .listeners
                .forget(&event_type, listener);
        }
        Ok(())
    }

    /// A handler slot returned `false`.
    pub fn handler_returned_false(&mut self, event: InstanceId) -> HostResult<()> {
        if self
            .profile
            .has(FeatureTag::JsEventHandlerReturnFalsePreventsDefault)
        {
            let state = self.event_mut(event)?;
            if state.cancelable {
                state.default_prevented = true;
            }
        }
        Ok(())
    }

    pub fn propagation_stopped(&self, event: InstanceId) -> HostResult<bool> {
        Ok(self.event(event)?.stop_propagation)
    }

    pub fn event_bubbles(&self, event: InstanceId) -> HostResult<bool> {
        Ok(self.event(event)?.bubbles)
    }

    /// Reset per-dispatch state; returns `false` when the default was prevented.
    pub fn end_dispatch(&mut self, event: InstanceId) -> HostResult<bool> {
        let state = self.event_mut(event)?;
        state.dispatching = false;
        state.phase = Phase::None;
        state.current_target = None;
        state.stop_propagation = false;
        state.stop_immediate = false;
        Ok(!state.default_prevented)
    }
}

pub(super) fn handler_type(member: &str) -> &str {
    member.strip_prefix("on").unwrap_or(member)
}

pub(super) fn get_handler(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let callback = call.host.event_handler(call.this, handler_type(call.member))?;
    Ok(callback.map(HostValue::Callback).unwrap_or(HostValue::Null))
}

pub(super) fn set_handler(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let value = call.arg(0).clone();
    call.host
        .dispatch_to_handler(call.this, handler_type(call.member), &value)?;
    Ok(HostValue::Undefined)
}

fn listener_options(value: &HostValue) -> (bool, bool) {
    match value {
        HostValue::Dict(_) => (
            value.get("capture").map(HostValue::truthy).unwrap_or(false),
            value.get("once").map(HostValue::truthy).unwrap_or(false),
        ),
        other => (other.truthy(), false),
    }
}

fn add_event_listener(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(2)?;
    let event_type = call.string_arg(0);
    let Some(callback) = call.callback_arg(1) else {
        return Ok(HostValue::Undefined);
    };
    let (capture, once) = listener_options(call.arg(2));
    call.host
        .instance_mut(call.this)?
        .listeners
        .add(&event_type, callback, capture, once);
    Ok(HostValue::Undefined)
}

fn remove_event_listener(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(2)?;
    let event_type = call.string_arg(0);
    let Some(callback) = call.callback_arg(1) else {
        return Ok(HostValue::Undefined);
    };
    let (capture, _) = listener_options(call.arg(2));
    call.host
        .instance_mut(call.this)?
        .listeners
        .remove(&event_type, callback, capture);
    Ok(HostValue::Undefined)
}

fn construct_event_target(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call
        .host
        .create_instance("EventTarget", InstanceState::EventTarget)
        .into())
}

fn init_string(init: &HostValue, key: &str) -> String {
    init.get(key)
        .filter(|value| !value.is_undefined())
        .map(HostValue::to_display_string)
        .unwrap_or_default()
}

fn init_flag(init: &HostValue, key: &str) -> bool {
    init.get(key).map(HostValue::truthy).unwrap_or(false)
}

fn construct_event(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let init = call.arg(1);
    let state = EventState::new(
        call.string_arg(0),
        init_flag(init, "bubbles"),
        init_flag(init, "cancelable"),
    );
    Ok(call.host.create_event("Event", state).into())
}

fn construct_hash_change_event(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let init = call.arg(1);
    let state = EventState::new(
        call.string_arg(0),
        init_flag(init, "bubbles"),
        init_flag(init, "cancelable"),
    )
    .with_detail(EventDetail::HashChange {
        old_url: init_string(init, "oldURL"),
        new_url: init_string(init, "newURL"),
    });
    Ok(call.host.create_event("HashChangeEvent", state).into())
}

fn event_type(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.event(call.this)?.event_type.clone().into())
}

fn event_target(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.event(call.this)?.target.into())
}

fn event_current_target(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.event(call.this)?.current_target.into())
}

fn event_phase(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(HostValue::from(call.host.event(call.this)?.phase as u16))
}

fn event_bubbles(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.event(call.this)?.bubbles.into())
}

fn event_cancelable(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.event(call.this)?.cancelable.into())
}

fn event_default_prevented(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.event(call.this)?.default_prevented.into())
}

fn event_is_trusted(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.event(call.this)?.trusted.into())
}

fn prevent_default(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let state = call.host.event_mut(call.this)?;
    if state.cancelable {
        state.default_prevented = true;
    }
    Ok(HostValue::Undefined)
}

fn stop_propagation(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.host.event_mut(call.this)?.stop_propagation = true;
    Ok(HostValue::Undefined)
}

fn stop_immediate_propagation(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let state = call.host.event_mut(call.this)?;
    state.stop_propagation = true;
    state.stop_immediate = true;
    Ok(HostValue::Undefined)
}

fn reinitialise(state: &mut EventState, event_type: String, bubbles: bool, cancelable: bool) {
    state.event_type = event_type;
    state.bubbles = bubbles;
    state.cancelable = cancelable;
    state.default_prevented = false;
    state.stop_propagation = false;
    state.stop_immediate = false;
    state.target = None;
}

fn init_event(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let event_type = call.string_arg(0);
    let bubbles = call.bool_arg(1);
    let cancelable = call.bool_arg(2);
    let state = call.host.event_mut(call.this)?;
    if !state.dispatching {
        reinitialise(state, event_type, bubbles, cancelable);
    }
    Ok(HostValue::Undefined)
}

fn hash_change_url(call: &mut HostCall<'_>, old: bool) -> HostResult<HostValue> {
    match &call.host.event(call.this)?.detail {
        EventDetail::HashChange { old_url, new_url } => {
            Ok(if old { old_url.clone() } else { new_url.clone() }.into())
        }
        EventDetail::Plain => Err(HostError::type_mismatch("Illegal invocation")),
    }
}

fn old_url(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    hash_change_url(call, true)
}

fn new_url(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    hash_change_url(call, false)
}

fn init_hash_change_event(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let event_type = call.string_arg(0);
    let bubbles = call.bool_arg(1);
    let cancelable = call.bool_arg(2);
    let old_url = call.optional_string(3).unwrap_or_default();
    let new_url = call.optional_string(4).unwrap_or_default();
    let state = call.host.event_mut(call.this)?;
    if !state.dispatching {
        reinitialise(state, event_type, bubbles, cancelable);
        state.detail = EventDetail::HashChange { old_url, new_url };
    }
    Ok(HostValue::Undefined)
}

const EVENT_SOURCE_CONNECTING: u16 = 0;
const EVENT_SOURCE_CLOSED: u16 = 2;

fn construct_event_source(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let url = match call.optional_string(0) {
        Some(raw) => call
            .host
            .url()
            .join(&raw)
            .map(|resolved| resolved.to_string())
            .unwrap_or(raw),
        None => String::new(),
    };
    let id = call.host.create_instance(
        "EventSource",
        InstanceState::EventSource(EventSourceState {
            url,
            ready_state: EVENT_SOURCE_CONNECTING,
        }),
    );
    Ok(id.into())
}

fn event_source<'h>(
    host: &'h mut WindowHost,
    id: InstanceId,
) -> HostResult<&'h mut EventSourceState> {
    match &mut host.instance_mut(id)?.state {
        InstanceState::EventSource(state) => Ok(state),
        _ => Err(HostError::type_mismatch("Illegal invocation")),
    }
}

fn event_source_url(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(event_source(call.host, call.this)?.url.clone().into())
}

fn event_source_ready_state(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(event_source(call.host, call.this)?.ready_state.into())
}

fn event_source_with_credentials(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    event_source(call.host, call.this)?;
    Ok(false.into())
}

fn event_source_close(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    event_source(call.host, call.this)?.ready_state = EVENT_SOURCE_CLOSED;
    Ok(HostValue::Undefined)
}

pub(super) fn descriptors() -> Vec<HostClassDescriptor> {
    use BrowserCondition::*;

    vec![
        HostClassDescriptor::new("EventTarget")
            .constructor(construct_event_target, ChromeAndEdgeAndFirefox)
            .illegal_constructor(IE)
            .function("addEventListener", 2, add_event_listener)
            .function("removeEventListener", 2, remove_event_listener)
            .dispatch_function("dispatchEvent"),
        HostClassDescriptor::new("Event")
            .constructor_with(&["type", "eventInitDict"], construct_event, Any)
            .constant("NONE", 0)
            .constant("CAPTURING_PHASE", 1)
            .constant("AT_TARGET", 2)
            .constant("BUBBLING_PHASE", 3)
            .read_only("type", event_type)
            .read_only("target", event_target)
            .read_only("srcElement", event_target)
            .read_only("currentTarget", event_current_target)
            .read_only("eventPhase", event_phase)
            .read_only("bubbles", event_bubbles)
            .read_only("cancelable", event_cancelable)
            .read_only("defaultPrevented", event_default_prevented)
            .read_only("isTrusted", event_is_trusted)
            .function("preventDefault", 0, prevent_default)
            .function("stopPropagation", 0, stop_propagation)
            .function("stopImmediatePropagation", 0, stop_immediate_propagation)
            .function("initEvent", 3, init_event),
        HostClassDescriptor::new("HashChangeEvent")
            .extends("Event")
            .visible_in(ChromeAndEdgeAndFirefox)
            .constructor_with(&["type", "details"], construct_hash_change_event, ChromeAndEdgeAndFirefox)
            .read_only("oldURL", old_url)
            .read_only("newURL", new_url)
            .function("initHashChangeEvent", 5, init_hash_change_event)
            .only(FF),
        HostClassDescriptor::new("EventSource")
            .extends("EventTarget")
            .visible_in(ChromeAndEdgeAndFirefox)
            .constructor_with(&["url"], construct_event_source, ChromeAndEdgeAndFirefox)
            .constant("CONNECTING", 0)
            .constant("OPEN", 1)
            .constant("CLOSED", 2)
            .read_only("url", event_source_url)
            .read_only("readyState", event_source_ready_state)
            .read_only("withCredentials", event_source_with_credentials)
            .function("close", 0, event_source_close)
            .property("onopen", get_handler, Some(set_handler))
            .property("onmessage", get_handler, Some(set_handler))
            .property("onerror", get_handler, Some(set_handler)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_slot_keeps_its_position() {
        let mut listeners = Listeners::default();
        listeners.add("click", CallbackId(1), false, false);
        listeners.set_handler("click", Some(CallbackId(2)));
        listeners.add("click", CallbackId(3), false, false);
        listeners.set_handler("click", Some(CallbackId(4)));

        let order: Vec<_> = listeners
            .for_phase("click", Phase::Bubbling)
            .iter()
            .map(|listener| listener.callback)
            .collect();
        assert_eq!(order, vec![CallbackId(1), CallbackId(4), CallbackId(3)]);

        listeners.set_handler("click", None);
        assert_eq!(listeners.handler("click"), None);
        assert_eq!(listeners.for_phase("click", Phase::AtTarget).len(), 2);
    }

    #[test]
    fn duplicate_listeners_are_ignored() {
        let mut listeners = Listeners::default();
        assert!(listeners.add("x", CallbackId(1), true, false));
        assert!(!listeners.add("x", CallbackId(1), true, false));
        assert!(listeners.add("x", CallbackId(1), false, false));
        assert_eq!(listeners.for_phase("x", Phase::Capturing).len(), 1);
        assert!(listeners.remove("x", CallbackId(1), true));
        assert!(listeners.for_phase("x", Phase::Capturing).is_empty());
    }
}
