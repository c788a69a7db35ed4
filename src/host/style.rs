//! `CSSStyleDeclaration`, for inline styles and for `getComputedStyle`.
//!
//! The property surface is generated from the CSS default table: every row
//! of a property becomes one accessor gated by the row's condition.

use crate::catalogue::{HostClassDescriptor, MemberDescriptor};
use crate::css::CssDefaults;
use crate::dom::NodeId;
use crate::error::{HostError, HostResult};
use crate::profile::BrowserCondition;

use super::{HostCall, HostValue, InstanceId, InstanceState, WindowHost};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleDeclarationState {
    pub node: NodeId,
    /// Computed declarations fall back to defaults and reject writes.
    pub computed: bool,
}

fn parse_declarations(text: &str) -> Vec<(String, String)> {
    text.split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return None;
            }
            Some((name, value.trim().to_string()))
        })
        .collect()
}

fn serialize_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl WindowHost {
    fn style_declaration(&mut self, node: NodeId, computed: bool) -> InstanceId {
        if let Some(existing) = self.style_declarations.get(&(node, computed)) {
            return *existing;
        }
        let id = self.create_instance(
            "CSSStyleDeclaration",
            InstanceState::StyleDeclaration(StyleDeclarationState { node, computed }),
        );
        self.style_declarations.insert((node, computed), id);
        id
    }

    pub fn inline_style_of(&mut self, node: NodeId) -> InstanceId {
        self.style_declaration(node, false)
    }

    pub fn computed_style_of(&mut self, node: NodeId) -> InstanceId {
        self.style_declaration(node, true)
    }

    fn declaration_state(&self, id: InstanceId) -> HostResult<StyleDeclarationState> {
        match &self.instance(id)?.state {
            InstanceState::StyleDeclaration(state) => Ok(*state),
            _ => Err(HostError::type_mismatch("Illegal invocation")),
        }
    }

    /// Value of `css_name` as seen through the declaration `id`.
    pub fn style_value(&self, id: InstanceId, css_name: &str) -> HostResult<String> {
        let state = self.declaration_state(id)?;
        let inline = parse_declarations(&self.dom.get_attr(state.node, "style")?)
            .into_iter()
            .rev()
            .find(|(name, _)| name == css_name)
            .map(|(_, value)| value);
        match inline {
            Some(value) => Ok(value),
            None if state.computed => Ok(CssDefaults::resolve(&self.profile, css_name)
                .map(|resolved| resolved.value.to_string())
                .unwrap_or_default()),
            None => Ok(String::new()),
        }
    }

    pub fn set_style_value(
        &mut self,
        id: InstanceId,
        css_name: &str,
        value: &str,
    ) -> HostResult<()> {
        let state = self.declaration_state(id)?;
        if state.computed {
            return Err(HostError::ReadOnly(format!(
                "Failed to set the '{css_name}' property on 'CSSStyleDeclaration': These styles are computed, and therefore the '{css_name}' property is read-only."
            )));
        }
        let mut declarations = parse_declarations(&self.dom.get_attr(state.node, "style")?);
        declarations.retain(|(name, _)| name != css_name);
        if !value.is_empty() {
            declarations.push((css_name.to_string(), value.to_string()));
        }
        let text = serialize_declarations(&declarations);
        self.set_attribute(state.node, "style", &text)
    }
}

pub(super) fn inline_style(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    Ok(call.host.inline_style_of(node).into())
}

fn css_name_of(member: &str) -> HostResult<&'static str> {
    CssDefaults::properties()
        .iter()
        .find(|property| property.script_name == member)
        .map(|property| property.name)
        .ok_or_else(|| HostError::type_mismatch("Illegal invocation"))
}

fn property_get(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let css_name = css_name_of(call.member)?;
    Ok(call.host.style_value(call.this, css_name)?.into())
}

fn property_set(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let css_name = css_name_of(call.member)?;
    let value = call.optional_string(0).unwrap_or_default();
    call.host.set_style_value(call.this, css_name, &value)?;
    Ok(HostValue::Undefined)
}

fn get_property_value(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let css_name = call.string_arg(0).to_ascii_lowercase();
    Ok(call.host.style_value(call.this, &css_name)?.into())
}

fn set_property(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(2)?;
    let css_name = call.string_arg(0).to_ascii_lowercase();
    let value = call.optional_string(1).unwrap_or_default();
    call.host.set_style_value(call.this, &css_name, &value)?;
    Ok(HostValue::Undefined)
}

fn remove_property(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let css_name = call.string_arg(0).to_ascii_lowercase();
    let previous = call.host.style_value(call.this, &css_name)?;
    call.host.set_style_value(call.this, &css_name, "")?;
    Ok(previous.into())
}

fn css_text(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let state = call.host.declaration_state(call.this)?;
    if state.computed {
        return Ok("".into());
    }
    let text = call.host.dom().get_attr(state.node, "style")?;
    Ok(serialize_declarations(&parse_declarations(&text)).into())
}

fn set_css_text(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let state = call.host.declaration_state(call.this)?;
    if state.computed {
        return Err(HostError::ReadOnly(
            "Failed to set the 'cssText' property on 'CSSStyleDeclaration': These styles are computed, and therefore read-only."
                .into(),
        ));
    }
    let text = serialize_declarations(&parse_declarations(&call.string_arg(0)));
    call.host.set_attribute(state.node, "style", &text)?;
    Ok(HostValue::Undefined)
}

fn length(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let state = call.host.declaration_state(call.this)?;
    let count = if state.computed {
        CssDefaults::visible(call.profile()).len()
    } else {
        parse_declarations(&call.host.dom().get_attr(state.node, "style")?).len()
    };
    Ok((count as f64).into())
}

pub(super) fn descriptors() -> Vec<HostClassDescriptor> {
    let mut declaration = HostClassDescriptor::new("CSSStyleDeclaration")
        .illegal_constructor(BrowserCondition::Any)
        .property("cssText", css_text, Some(set_css_text))
        .read_only("length", length)
        .function("getPropertyValue", 1, get_property_value)
        .function("setProperty", 2, set_property)
        .function("removeProperty", 1, remove_property);

    for property in CssDefaults::properties() {
        for row in property.table.rows() {
            declaration = declaration.member(MemberDescriptor::Property {
                name: property.script_name,
                getter: property_get,
                setter: Some(property_set),
                gate: row.condition,
                enumerable: row.iteratable,
            });
        }
    }
    vec![declaration]
}

#[cfg(test)]
mod tests {
    use super::super::testing::{element, window};
    use super::*;
    use crate::profile::BrowserProfile;

    #[test]
    fn inline_writes_go_through_the_style_attribute() {
        let mut host = window("<p id=p style='color: red'></p>", BrowserProfile::chrome());
        let p = element(&mut host, "p");
        let node = host.node_of(p).expect("node");
        let style = host.inline_style_of(node);
        host.set_style_value(style, "width", "10px").expect("set");
        assert_eq!(
            host.dom().get_attr(node, "style").expect("attr"),
            "color: red; width: 10px;"
        );
        assert_eq!(host.style_value(style, "text-align").expect("get"), "");
    }

    #[test]
    fn computed_declarations_fall_back_and_reject_writes() {
        let mut host = window("<p id=p></p>", BrowserProfile::internet_explorer());
        let p = element(&mut host, "p");
        let node = host.node_of(p).expect("node");
        let computed = host.computed_style_of(node);
        assert_eq!(host.style_value(computed, "text-align").expect("get"), "left");
        assert!(matches!(
            host.set_style_value(computed, "width", "1px"),
            Err(HostError::ReadOnly(_))
        ));
    }
}
