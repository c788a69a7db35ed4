//! `StyleSheet` / `CSSStyleSheet`. Rules are kept as text; nothing is parsed.

use crate::catalogue::HostClassDescriptor;
use crate::dom::NodeId;
use crate::error::{HostError, HostResult};
use crate::profile::BrowserCondition;

use super::{AsyncOutcome, HostCall, HostValue, InstanceId, InstanceState, WindowHost};

#[derive(Debug, Clone, Default)]
pub struct StyleSheetState {
    /// `<style>` element the sheet belongs to; `None` for constructed sheets.
    pub owner_node: Option<NodeId>,
    pub text: String,
    pub disabled: bool,
}

impl WindowHost {
    pub fn style_sheet(&self, sheet: InstanceId) -> HostResult<&StyleSheetState> {
        match &self.instance(sheet)?.state {
            InstanceState::StyleSheet(state) => Ok(state),
            _ => Err(HostError::type_mismatch("Illegal invocation")),
        }
    }

    fn style_sheet_mut(&mut self, sheet: InstanceId) -> HostResult<&mut StyleSheetState> {
        match &mut self.instance_mut(sheet)?.state {
            InstanceState::StyleSheet(state) => Ok(state),
            _ => Err(HostError::type_mismatch("Illegal invocation")),
        }
    }

    /// The sheet of a `<style>` element, created once per element.
    pub fn sheet_for_element(&mut self, node: NodeId) -> HostResult<InstanceId> {
        if let Some(sheet) = self.style_sheets.get(&node) {
            return Ok(*sheet);
        }
        let text = self.dom.text_content(node)?.unwrap_or_default();
        let sheet = self.create_instance(
            "CSSStyleSheet",
            InstanceState::StyleSheet(StyleSheetState {
                owner_node: Some(node),
                text,
                disabled: false,
            }),
        );
        self.style_sheets.insert(node, sheet);
        Ok(sheet)
    }
}

pub(super) fn element_sheet(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    Ok(call.host.sheet_for_element(node)?.into())
}

fn construct_style_sheet(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let sheet = call
        .host
        .create_instance("CSSStyleSheet", InstanceState::StyleSheet(StyleSheetState::default()));
    Ok(sheet.into())
}

fn owner_node(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let owner = call.host.style_sheet(call.this)?.owner_node;
    call.host.wrap_node(owner)
}

fn disabled(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.style_sheet(call.this)?.disabled.into())
}

fn set_disabled(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let value = call.bool_arg(0);
    call.host.style_sheet_mut(call.this)?.disabled = value;
    Ok(HostValue::Undefined)
}

fn replace_sync(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let text = call.string_arg(0);
    let state = call.host.style_sheet_mut(call.this)?;
    if state.owner_node.is_some() {
        return Err(HostError::NotAllowed(
            "Failed to execute 'replaceSync' on 'CSSStyleSheet': Can't call replaceSync on non-constructed CSSStyleSheets."
                .into(),
        ));
    }
    state.text = text;
    Ok(HostValue::Undefined)
}

/// Async twin of `replaceSync`; resolves with the sheet itself.
fn replace(call: &mut HostCall<'_>) -> AsyncOutcome {
    AsyncOutcome::Settled(replace_sync(call).map(|_| HostValue::Object(call.this)))
}

pub(super) fn descriptors() -> Vec<HostClassDescriptor> {
    use BrowserCondition::*;

    vec![
        HostClassDescriptor::new("StyleSheet")
            .illegal_constructor(Any)
            .read_only("ownerNode", owner_node)
            .property("disabled", disabled, Some(set_disabled)),
        HostClassDescriptor::new("CSSStyleSheet")
            .extends("StyleSheet")
            .constructor(construct_style_sheet, ChromeAndEdgeAndFirefox)
            .illegal_constructor(IE)
            .function("replaceSync", 1, replace_sync)
            .only(ChromeAndEdgeAndFirefox)
            .async_function("replace", 1, replace)
            .only(ChromeAndEdgeAndFirefox),
    ]
}

#[cfg(test)]
mod tests {
    use super::super::testing::{element, window};
    use crate::profile::BrowserProfile;

    #[test]
    fn style_element_sheet_is_cached() {
        let mut host = window("<style id=s>p { color: red }</style>", BrowserProfile::chrome());
        let style = element(&mut host, "s");
        let node = host.node_of(style).expect("node");
        let first = host.sheet_for_element(node).expect("sheet");
        let second = host.sheet_for_element(node).expect("sheet");
        assert_eq!(first, second);
        let state = host.style_sheet(first).expect("state");
        assert_eq!(state.owner_node, Some(node));
        assert_eq!(state.text, "p { color: red }");
    }
}
