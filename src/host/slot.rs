//! `<slot>` elements: the name state machine and slot assignment.

use crate::catalogue::{DomKind, HostClassDescriptor};
use crate::dom::{NodeId, NodeType};
use crate::error::HostResult;
use crate::profile::BrowserCondition;

use super::events::{get_handler, set_handler};
use super::html::construct_primary;
use super::{EventState, HostCall, HostValue, SlotAssignmentMode, WindowHost};

/// Outcome of assigning a new value to `HTMLSlotElement.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotNameChange {
    Unchanged,
    Clear,
    Set(String),
}

/// `null` and `""` are interchangeable as long as the other side is one of them.
pub fn apply_slot_name(old: Option<&str>, new: Option<&str>) -> SlotNameChange {
    match (old, new) {
        (old, new) if old == new => SlotNameChange::Unchanged,
        (Some(""), None) | (None, Some("")) => SlotNameChange::Unchanged,
        (_, None) | (_, Some("")) => SlotNameChange::Clear,
        (_, Some(name)) => SlotNameChange::Set(name.to_string()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotState {
    /// Current assignment, in order.
    pub assigned: Vec<NodeId>,
    /// Nodes last passed to `assign()`.
    pub manual: Vec<NodeId>,
}

impl WindowHost {
    fn is_slot(&self, node: NodeId) -> HostResult<bool> {
        Ok(self.dom.is_html_element(node)? && self.dom.local_name(node)?.as_deref() == Some("slot"))
    }

    /// Slot name of a slottable: the `slot` attribute of elements, "" for text.
    fn slot_name_of(&self, node: NodeId) -> HostResult<Option<String>> {
        match self.dom.node_type(node)? {
            NodeType::Element => Ok(Some(self.dom.get_attr(node, "slot")?)),
            NodeType::Text => {
                let text = self.dom.text_content(node)?.unwrap_or_default();
                if text.trim().is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(String::new()))
                }
            }
            _ => Ok(None),
        }
    }

    /// Recompute the slots of the shadow tree attached to `host`, if any.
    pub(super) fn reassign_for_host(&mut self, host: NodeId) -> HostResult<()> {
        if let Some(shadow) = self.shadow_by_host.get(&host).copied() {
            let fragment = self.node_of(shadow)?;
            self.reassign_tree(fragment)?;
        }
        Ok(())
    }

    /// Recompute the slots of the shadow tree `node` lives in, if any.
    pub(super) fn reassign_for_tree_of(&mut self, node: NodeId) -> HostResult<()> {
        let root = self.dom.root_of(node)?;
        if self.shadow_by_fragment.contains_key(&root) {
            self.reassign_tree(root)?;
        }
        Ok(())
    }

    fn reassign_tree(&mut self, fragment: NodeId) -> HostResult<()> {
        let Some(shadow) = self.shadow_by_fragment.get(&fragment).copied() else {
            return Ok(());
        };
        let (host, mode) = {
            let state = self.shadow_state(shadow)?;
            (state.host, state.slot_assignment)
        };
        let host_children = self.dom.children(host)?;

        let mut slots = Vec::new();
        for node in self.dom.descendants(fragment)? {
            if self.is_slot(node)? {
                slots.push(node);
            }
        }

        let mut seen_names = Vec::new();
        for slot in slots {
            let assigned = match mode {
                SlotAssignmentMode::Named => {
                    let name = self.dom.get_attr(slot, "name")?;
                    if seen_names.contains(&name) {
                        Vec::new()
                    } else {
                        let mut assigned = Vec::new();
                        for child in &host_children {
                            if self.slot_name_of(*child)?.as_deref() == Some(name.as_str()) {
                                assigned.push(*child);
                            }
                        }
                        seen_names.push(name);
                        assigned
                    }
                }
                SlotAssignmentMode::Manual => self
                    .slots
                    .get(&slot)
                    .map(|state| {
                        state
                            .manual
                            .iter()
                            .copied()
                            .filter(|node| host_children.contains(node))
                            .collect()
                    })
                    .unwrap_or_default(),
            };

            let state = self.slots.entry(slot).or_default();
            if state.assigned != assigned {
                state.assigned = assigned;
                tracing::trace!(target: "hostbridge::host", ?slot, "slot assignment changed");
                let target = self.instance_for_node(slot)?;
                let event = self.create_event("Event", EventState::trusted("slotchange", true, false));
                self.fire_event(target, event);
            }
        }
        Ok(())
    }

    fn flattened_slottables(&mut self, slot: NodeId, out: &mut Vec<NodeId>) -> HostResult<()> {
        let assigned = self
            .slots
            .get(&slot)
            .map(|state| state.assigned.clone())
            .unwrap_or_default();
        let candidates = if assigned.is_empty() {
            let mut fallback = Vec::new();
            for child in self.dom.children(slot)? {
                if matches!(self.dom.node_type(child)?, NodeType::Element | NodeType::Text) {
                    fallback.push(child);
                }
            }
            fallback
        } else {
            assigned
        };
        for node in candidates {
            if self.is_slot(node)? {
                self.flattened_slottables(node, out)?;
            } else {
                out.push(node);
            }
        }
        Ok(())
    }

    pub fn assigned_nodes(&mut self, slot: NodeId, flatten: bool) -> HostResult<Vec<NodeId>> {
        if !flatten {
            return Ok(self
                .slots
                .get(&slot)
                .map(|state| state.assigned.clone())
                .unwrap_or_default());
        }
        let mut out = Vec::new();
        self.flattened_slottables(slot, &mut out)?;
        Ok(out)
    }
}

fn slot_name(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    Ok(call.host.dom().get_attr(node, "name")?.into())
}

fn set_slot_name(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let old = call.host.dom().find_attr(node, "name")?;
    let new = call.optional_string(0);
    match apply_slot_name(old.as_deref(), new.as_deref()) {
        SlotNameChange::Unchanged => {}
        SlotNameChange::Clear => call.host.remove_attribute(node, "name")?,
        SlotNameChange::Set(name) => call.host.set_attribute(node, "name", &name)?,
    }
    Ok(HostValue::Undefined)
}

fn assign(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let slot = call.node()?;
    let mut nodes = Vec::with_capacity(call.arg_count());
    for index in 0..call.arg_count() {
        nodes.push(call.node_arg(index)?);
    }
    call.host.slots.entry(slot).or_default().manual = nodes;
    call.host.reassign_for_tree_of(slot)?;
    Ok(HostValue::Undefined)
}

fn flatten_option(call: &HostCall<'_>) -> bool {
    call.arg(0)
        .get("flatten")
        .map(HostValue::truthy)
        .unwrap_or(false)
}

fn assigned_nodes(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let slot = call.node()?;
    let flatten = flatten_option(call);
    let nodes = call.host.assigned_nodes(slot, flatten)?;
    call.host.wrap_nodes(nodes)
}

fn assigned_elements(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let slot = call.node()?;
    let flatten = flatten_option(call);
    let mut elements = Vec::new();
    for node in call.host.assigned_nodes(slot, flatten)? {
        if call.host.dom().node_type(node)? == NodeType::Element {
            elements.push(node);
        }
    }
    call.host.wrap_nodes(elements)
}

pub(super) fn descriptors() -> Vec<HostClassDescriptor> {
    use BrowserCondition::*;

    vec![HostClassDescriptor::new("HTMLSlotElement")
        .extends("HTMLElement")
        .visible_in(ChromeAndEdgeAndFirefox)
        .wraps(DomKind::html("slot"), ChromeAndEdgeAndFirefox)
        .constructor(construct_primary, ChromeAndEdgeAndFirefox)
        .property("name", slot_name, Some(set_slot_name))
        .function("assign", 0, assign)
        .function("assignedNodes", 0, assigned_nodes)
        .function("assignedElements", 0, assigned_elements)
        .property("onslotchange", get_handler, Some(set_handler))]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_empty_are_equivalent() {
        assert_eq!(apply_slot_name(Some(""), None), SlotNameChange::Unchanged);
        assert_eq!(apply_slot_name(None, Some("")), SlotNameChange::Unchanged);
        assert_eq!(apply_slot_name(None, None), SlotNameChange::Unchanged);
        assert_eq!(apply_slot_name(Some("a"), Some("a")), SlotNameChange::Unchanged);
    }

    #[test]
    fn other_transitions_change_the_name() {
        assert_eq!(apply_slot_name(Some("a"), None), SlotNameChange::Clear);
        assert_eq!(apply_slot_name(Some("a"), Some("")), SlotNameChange::Clear);
        assert_eq!(
            apply_slot_name(Some(""), Some("b")),
            SlotNameChange::Set("b".into())
        );
        assert_eq!(apply_slot_name(None, Some("b")), SlotNameChange::Set("b".into()));
    }
}
