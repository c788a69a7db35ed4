//! Shadow roots: attachment, per-root state and adopted style sheets.

use crate::dom::{NodeId, HTML_NAMESPACE};
use crate::catalogue::HostClassDescriptor;
use crate::error::{HostError, HostResult};
use crate::profile::BrowserCondition;

use super::events::{get_handler, set_handler};
use super::{HostCall, HostValue, InstanceId, InstanceState, WindowHost};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowRootMode {
    Open,
    Closed,
}

impl ShadowRootMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAssignmentMode {
    Named,
    Manual,
}

impl SlotAssignmentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Named => "named",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShadowRootState {
    pub mode: ShadowRootMode,
    /// Host element. Only an id: the host owns the root, never the reverse.
    pub host: NodeId,
    pub delegates_focus: bool,
    pub slot_assignment: SlotAssignmentMode,
    pub adopted_style_sheets: Vec<InstanceId>,
    pub fullscreen_element: Option<InstanceId>,
    pub picture_in_picture_element: Option<InstanceId>,
    pub pointer_lock_element: Option<InstanceId>,
}

impl ShadowRootState {
    pub fn new(mode: ShadowRootMode, host: NodeId) -> Self {
        Self {
            mode,
            host,
            delegates_focus: false,
            slot_assignment: SlotAssignmentMode::Named,
            adopted_style_sheets: Vec::new(),
            fullscreen_element: None,
            picture_in_picture_element: None,
            pointer_lock_element: None,
        }
    }
}

/// Elements that accept a shadow root, besides valid custom element names.
const SHADOW_HOSTS: &[&str] = &[
    "article",
    "aside",
    "blockquote",
    "body",
    "div",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "main",
    "nav",
    "p",
    "section",
    "span",
];

impl WindowHost {
    pub fn shadow_state(&self, shadow: InstanceId) -> HostResult<&ShadowRootState> {
        match &self.instance(shadow)?.state {
            InstanceState::ShadowRoot(state) => Ok(state),
            _ => Err(HostError::type_mismatch("Illegal invocation")),
        }
    }

    fn shadow_state_mut(&mut self, shadow: InstanceId) -> HostResult<&mut ShadowRootState> {
        match &mut self.instance_mut(shadow)?.state {
            InstanceState::ShadowRoot(state) => Ok(state),
            _ => Err(HostError::type_mismatch("Illegal invocation")),
        }
    }

    pub fn shadow_root_of(&self, host: NodeId) -> Option<InstanceId> {
        self.shadow_by_host.get(&host).copied()
    }

    pub fn attach_shadow(
        &mut self,
        host: NodeId,
        mode: ShadowRootMode,
        delegates_focus: bool,
        slot_assignment: SlotAssignmentMode,
    ) -> HostResult<InstanceId> {
        let local = self.dom.local_name(host)?.unwrap_or_default();
        let attachable = self.dom.namespace(host)?.as_deref() == Some(HTML_NAMESPACE)
            && (SHADOW_HOSTS.contains(&local.as_str()) || local.contains('-'));
        if !attachable {
            return Err(HostError::not_supported(
                "Failed to execute 'attachShadow' on 'Element': This element does not support attachShadow",
            ));
        }
        if self.shadow_by_host.contains_key(&host) {
            return Err(HostError::not_supported(
                "Failed to execute 'attachShadow' on 'Element': Shadow root cannot be created on a host which already hosts a shadow tree.",
            ));
        }

        let document = self.dom.document_of(host)?;
        let (fragment, _fragment_ref) = self.dom.create_fragment(document)?;
        let mut state = ShadowRootState::new(mode, host);
        state.delegates_focus = delegates_focus;
        state.slot_assignment = slot_assignment;
        let shadow = self.bind_node_instance("ShadowRoot", fragment, InstanceState::ShadowRoot(state))?;
        self.shadow_by_host.insert(host, shadow);
        self.shadow_by_fragment.insert(fragment, shadow);
        tracing::debug!(target: "hostbridge::host", ?host, mode = mode.as_str(), "attached shadow root");
        Ok(shadow)
    }

    /// Replace the adopted list. Every sheet is checked before anything changes.
    pub fn set_adopted_style_sheets(
        &mut self,
        shadow: InstanceId,
        sheets: Vec<InstanceId>,
    ) -> HostResult<()> {
        let fragment = self.node_of(shadow)?;
        let document = self.dom.document_of(fragment)?;
        for sheet in &sheets {
            let owner = self.style_sheet(*sheet)?.owner_node;
            if let Some(owner) = owner {
                if self.dom.document_of(owner)? != document {
                    return Err(HostError::NotAllowed(
                        "Failed to set the 'adoptedStyleSheets' property on 'ShadowRoot': Style sheet was not constructed in the current document."
                            .into(),
                    ));
                }
            }
        }
        self.shadow_state_mut(shadow)?.adopted_style_sheets = sheets;
        Ok(())
    }
}

fn parse_mode(call: &HostCall<'_>, init: &HostValue) -> HostResult<ShadowRootMode> {
    match init.get("mode").map(HostValue::to_display_string).as_deref() {
        Some("open") => Ok(ShadowRootMode::Open),
        Some("closed") => Ok(ShadowRootMode::Closed),
        Some(other) => Err(HostError::type_mismatch(format!(
            "Failed to execute '{}' on '{}': The provided value '{other}' is not a valid enum value of type ShadowRootMode.",
            call.member, call.class
        ))),
        None => Err(HostError::type_mismatch(format!(
            "Failed to execute '{}' on '{}': Failed to read the 'mode' property from 'ShadowRootInit': Required member is undefined.",
            call.member, call.class
        ))),
    }
}

pub(super) fn attach_shadow(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let host = call.node()?;
    let init = call.arg(0).clone();
    let mode = parse_mode(call, &init)?;
    let delegates_focus = init
        .get("delegatesFocus")
        .map(HostValue::truthy)
        .unwrap_or(false);
    let slot_assignment = match init.get("slotAssignment").and_then(HostValue::as_str) {
        Some("manual") => SlotAssignmentMode::Manual,
        _ => SlotAssignmentMode::Named,
    };
    let shadow = call
        .host
        .attach_shadow(host, mode, delegates_focus, slot_assignment)?;
    Ok(shadow.into())
}

/// `Element.shadowRoot`: closed roots are hidden from script.
pub(super) fn shadow_root(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let host = call.node()?;
    let Some(shadow) = call.host.shadow_root_of(host) else {
        return Ok(HostValue::Null);
    };
    match call.host.shadow_state(shadow)?.mode {
        ShadowRootMode::Open => Ok(shadow.into()),
        ShadowRootMode::Closed => Ok(HostValue::Null),
    }
}

fn mode(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.shadow_state(call.this)?.mode.as_str().into())
}

fn host(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let host = call.host.shadow_state(call.this)?.host;
    call.host.wrap_node(Some(host))
}

fn delegates_focus(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.shadow_state(call.this)?.delegates_focus.into())
}

fn slot_assignment(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call
        .host
        .shadow_state(call.this)?
        .slot_assignment
        .as_str()
        .into())
}

fn active_element(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.host.shadow_state(call.this)?;
    Ok(HostValue::Null)
}

fn fullscreen_element(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.shadow_state(call.this)?.fullscreen_element.into())
}

fn picture_in_picture_element(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call
        .host
        .shadow_state(call.this)?
        .picture_in_picture_element
        .into())
}

fn pointer_lock_element(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.shadow_state(call.this)?.pointer_lock_element.into())
}

fn adopted_style_sheets(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let sheets = &call.host.shadow_state(call.this)?.adopted_style_sheets;
    Ok(HostValue::List(
        sheets.iter().map(|sheet| HostValue::Object(*sheet)).collect(),
    ))
}

fn set_adopted_style_sheets(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let conversion_error = || {
        HostError::type_mismatch(
            "Failed to set the 'adoptedStyleSheets' property on 'ShadowRoot': Failed to convert value to 'CSSStyleSheet'.",
        )
    };
    let HostValue::List(items) = call.arg(0) else {
        return Err(HostError::type_mismatch(
            "Failed to set the 'adoptedStyleSheets' property on 'ShadowRoot': The provided value cannot be converted to a sequence.",
        ));
    };
    let mut sheets = Vec::with_capacity(items.len());
    for item in items {
        let sheet = item.as_object().ok_or_else(conversion_error)?;
        if !matches!(call.host.instance(sheet)?.state, InstanceState::StyleSheet(_)) {
            return Err(conversion_error());
        }
        sheets.push(sheet);
    }
    call.host.set_adopted_style_sheets(call.this, sheets)?;
    Ok(HostValue::Undefined)
}

/// Outer HTML of every child, concatenated.
fn inner_html(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let fragment = call.node()?;
    let options = call.host.serialize_options();
    let mut html = String::new();
    for child in call.host.dom_mut().children(fragment)? {
        html.push_str(&call.host.dom().outer_html(child, &options)?);
    }
    Ok(html.into())
}

fn set_inner_html(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let fragment = call.node()?;
    let html = call.optional_string(0).unwrap_or_default();
    call.host.replace_inner_html(fragment, &html)?;
    Ok(HostValue::Undefined)
}

pub(super) fn descriptors() -> Vec<HostClassDescriptor> {
    use BrowserCondition::*;

    vec![HostClassDescriptor::new("ShadowRoot")
        .extends("DocumentFragment")
        .visible_in(ChromeAndEdgeAndFirefox)
        .illegal_constructor(ChromeAndEdgeAndFirefox)
        .read_only("mode", mode)
        .read_only("host", host)
        .read_only("delegatesFocus", delegates_focus)
        .read_only("slotAssignment", slot_assignment)
        .read_only("activeElement", active_element)
        .read_only("fullscreenElement", fullscreen_element)
        .read_only("pictureInPictureElement", picture_in_picture_element)
        .only(ChromeAndEdge)
        .read_only("pointerLockElement", pointer_lock_element)
        .property("adoptedStyleSheets", adopted_style_sheets, Some(set_adopted_style_sheets))
        .property("innerHTML", inner_html, Some(set_inner_html))
        .property("onslotchange", get_handler, Some(set_handler))]
}

#[cfg(test)]
mod tests {
    use super::super::testing::{element, window};
    use super::*;
    use crate::profile::BrowserProfile;

    #[test]
    fn second_attach_is_rejected() {
        let mut host = window("<div id=h></div>", BrowserProfile::chrome());
        let div = element(&mut host, "h");
        let node = host.node_of(div).expect("node");
        host.attach_shadow(node, ShadowRootMode::Open, false, SlotAssignmentMode::Named)
            .expect("first attach");
        let second =
            host.attach_shadow(node, ShadowRootMode::Open, false, SlotAssignmentMode::Named);
        assert!(matches!(second, Err(HostError::NotSupported(_))));
    }

    #[test]
    fn unsupported_tags_cannot_host() {
        let mut host = window("<img id=i><my-widget id=w></my-widget>", BrowserProfile::chrome());
        let img = element(&mut host, "i");
        let img = host.node_of(img).expect("node");
        assert!(host
            .attach_shadow(img, ShadowRootMode::Open, false, SlotAssignmentMode::Named)
            .is_err());
        let custom = element(&mut host, "w");
        let custom = host.node_of(custom).expect("node");
        assert!(host
            .attach_shadow(custom, ShadowRootMode::Closed, false, SlotAssignmentMode::Named)
            .is_ok());
    }

    #[test]
    fn named_slots_receive_matching_children() {
        let mut host = window(
            "<div id=h><span slot=a>1</span><b>2</b></div>",
            BrowserProfile::chrome(),
        );
        let div = element(&mut host, "h");
        let node = host.node_of(div).expect("node");
        let shadow = host
            .attach_shadow(node, ShadowRootMode::Open, false, SlotAssignmentMode::Named)
            .expect("attach");
        let fragment = host.node_of(shadow).expect("fragment");
        host.replace_inner_html(fragment, "<slot name=a></slot><slot></slot>")
            .expect("shadow content");

        let slots = host.dom_mut().children(fragment).expect("slots");
        let named = host.assigned_nodes(slots[0], false).expect("named");
        let default = host.assigned_nodes(slots[1], false).expect("default");
        assert_eq!(named.len(), 1);
        assert_eq!(host.dom().local_name(named[0]).expect("name").as_deref(), Some("span"));
        assert_eq!(default.len(), 1);
        assert_eq!(host.dom().local_name(default[0]).expect("name").as_deref(), Some("b"));
    }
}
