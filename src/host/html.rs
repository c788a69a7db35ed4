//! HTML element classes with their own reflection rules.

use crate::catalogue::{DomKind, DomNamespace, HostClassDescriptor, Hook};
use crate::dom::{HTML_NAMESPACE, SVG_NAMESPACE};
use crate::error::{HostError, HostResult};
use crate::profile::{BrowserCondition, FeatureTag};

use super::node::{reflect_bool_get, reflect_bool_set, reflect_get, reflect_set};
use super::{stylesheet, HostCall, HostValue};

const ALIGN_VALUES: &[&str] = &["left", "right", "center", "justify"];
const CLEAR_VALUES: &[&str] = &["left", "right", "all", "none"];

fn is_one_of(value: &str, allowed: &[&str]) -> bool {
    allowed
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(value))
}

/// Constructor of element classes: a new element of the class's primary kind
/// owned by the window's document.
pub(super) fn construct_primary(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let kind = call
        .host
        .catalogue()
        .descriptor_by_name(call.class)
        .and_then(|descriptor| descriptor.dom_kinds.first().map(|(kind, _)| *kind))
        .ok_or_else(|| HostError::illegal_constructor(call.class))?;
    let namespace = match kind.namespace {
        DomNamespace::Html => HTML_NAMESPACE,
        DomNamespace::Svg => SVG_NAMESPACE,
    };
    let document = call.host.document();
    call.host
        .create_element_in(document, namespace, kind.local_name)
}

fn set_align(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let value = call.string_arg(0);
    if !call.profile().has(FeatureTag::JsAlignAcceptsArbitraryValues)
        && !is_one_of(&value, ALIGN_VALUES)
    {
        return Err(HostError::InvalidValue(format!(
            "Cannot set the align property to invalid value: '{value}'"
        )));
    }
    let node = call.node()?;
    call.host.set_attribute(node, "align", &value)?;
    Ok(HostValue::Undefined)
}

/// Heading `align`: values outside the enumeration read as "".
fn heading_align(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let value = call.host.dom().get_attr(node, "align")?;
    if is_one_of(&value, ALIGN_VALUES) {
        Ok(value.into())
    } else {
        Ok("".into())
    }
}

/// Heading `clear` (IE): exact, case-sensitive match on the raw attribute.
fn heading_clear(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let value = call.host.dom().get_attr_direct(node, "clear")?;
    if CLEAR_VALUES.contains(&value.as_str()) {
        Ok(value.into())
    } else {
        Ok("".into())
    }
}

fn set_heading_clear(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let value = call.string_arg(0);
    if !CLEAR_VALUES.contains(&value.as_str()) {
        return Err(HostError::InvalidValue(format!(
            "Invalid clear property value: '{value}'."
        )));
    }
    let node = call.node()?;
    call.host.set_attribute(node, "clear", &value)?;
    Ok(HostValue::Undefined)
}

/// `size` of font elements: the attribute as an integer, 0 when not numeric.
fn font_size(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let raw = call.host.dom().get_attr(node, "size")?;
    let size = HostValue::from(raw.as_str()).to_number();
    if size.is_nan() {
        return Ok(HostValue::Number(0.0));
    }
    Ok(size.trunc().into())
}

fn is_length(value: &str) -> bool {
    let number = value
        .strip_suffix('%')
        .or_else(|| value.strip_suffix("px"))
        .unwrap_or(value);
    let mut parts = number.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();
    !whole.is_empty()
        && whole.bytes().all(|byte| byte.is_ascii_digit())
        && fraction
            .map(|digits| !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit()))
            .unwrap_or(true)
}

/// Block `width`: a length or percentage, otherwise "".
fn block_width(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let value = call.host.dom().get_attr(node, "width")?;
    if is_length(value.trim()) {
        Ok(value.trim().into())
    } else {
        Ok("".into())
    }
}

pub(super) fn descriptors() -> Vec<HostClassDescriptor> {
    use BrowserCondition::*;

    let mut heading = HostClassDescriptor::new("HTMLHeadingElement").extends("HTMLElement");
    for level in ["h1", "h2", "h3", "h4", "h5", "h6"] {
        heading = heading.wraps(DomKind::html(level), Any);
    }
    heading = heading
        .constructor(construct_primary, ChromeAndEdgeAndFirefox)
        .illegal_constructor(IE)
        .property("align", heading_align, Some(set_align))
        .property("clear", heading_clear, Some(set_heading_clear))
        .only(IE);

    let mut block = HostClassDescriptor::new("HTMLBlockElement")
        .extends("HTMLElement")
        .visible_in(IE);
    for local in ["address", "blockquote", "center", "xmp", "listing", "plaintext"] {
        block = block.wraps(DomKind::html(local), IE);
    }
    block = block
        .illegal_constructor(IE)
        .property("clear", reflect_get, Some(reflect_set))
        .property("width", block_width, Some(reflect_set))
        .hook(Hook::FeatureAccessor {
            feature: FeatureTag::JsXmlSupportViaActiveXObject,
            name: "cite",
            getter: reflect_get,
            setter: Some(reflect_set),
        });

    vec![
        HostClassDescriptor::new("HTMLDivElement")
            .extends("HTMLElement")
            .wraps(DomKind::html("div"), Any)
            .wraps(DomKind::html("marquee"), FF)
            .constructor(construct_primary, ChromeAndEdgeAndFirefox)
            .illegal_constructor(IE)
            .property("align", reflect_get, Some(set_align))
            .property("noWrap", reflect_bool_get, Some(reflect_bool_set))
            .only(IE),
        heading,
        HostClassDescriptor::new("HTMLFontElement")
            .extends("HTMLElement")
            .wraps(DomKind::html("font"), Any)
            .constructor(construct_primary, ChromeAndEdgeAndFirefox)
            .illegal_constructor(IE)
            .property("color", reflect_get, Some(reflect_set))
            .property("face", reflect_get, Some(reflect_set))
            .property("size", font_size, Some(reflect_set)),
        HostClassDescriptor::new("HTMLBaseFontElement")
            .extends("HTMLElement")
            .visible_in(IE)
            .wraps(DomKind::html("basefont"), IE)
            .illegal_constructor(IE)
            .property("color", reflect_get, Some(reflect_set))
            .property("face", reflect_get, Some(reflect_set))
            .property("size", font_size, Some(reflect_set)),
        block,
        HostClassDescriptor::new("HTMLDetailsElement")
            .extends("HTMLElement")
            .visible_in(ChromeAndEdgeAndFirefox)
            .wraps(DomKind::html("details"), ChromeAndEdgeAndFirefox)
            .constructor(construct_primary, ChromeAndEdgeAndFirefox)
            .property("open", reflect_bool_get, Some(reflect_bool_set)),
        HostClassDescriptor::new("HTMLStyleElement")
            .extends("HTMLElement")
            .wraps(DomKind::html("style"), Any)
            .constructor(construct_primary, ChromeAndEdgeAndFirefox)
            .illegal_constructor(IE)
            .property("media", reflect_get, Some(reflect_set))
            .property("type", reflect_get, Some(reflect_set))
            .read_only("sheet", stylesheet::element_sheet),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_and_percentages() {
        assert!(is_length("10"));
        assert!(is_length("10px"));
        assert!(is_length("12.5%"));
        assert!(!is_length("wide"));
        assert!(!is_length("10."));
        assert!(!is_length(""));
    }

    #[test]
    fn align_ignores_case() {
        assert!(is_one_of("Justify", ALIGN_VALUES));
        assert!(is_one_of("LEFT", ALIGN_VALUES));
        assert!(!is_one_of("middle", ALIGN_VALUES));
    }
}
