use crate::catalogue::{DomKind, HostClassDescriptor};
use crate::error::HostResult;
use crate::profile::BrowserCondition;

use super::{HostCall, HostValue};

fn number_of_chars(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let text = call.host.dom().text_content(node)?.unwrap_or_default();
    Ok((text.encode_utf16().count() as f64).into())
}

pub(super) fn descriptors() -> Vec<HostClassDescriptor> {
    use BrowserCondition::*;

    vec![
        HostClassDescriptor::new("SVGElement")
            .extends("Element")
            .illegal_constructor(Any)
            .read_only("style", super::style::inline_style),
        HostClassDescriptor::new("SVGTextContentElement")
            .extends("SVGElement")
            .illegal_constructor(Any)
            .constant("LENGTHADJUST_UNKNOWN", 0)
            .constant("LENGTHADJUST_SPACING", 1)
            .constant("LENGTHADJUST_SPACINGANDGLYPHS", 2)
            .function("getNumberOfChars", 0, number_of_chars),
        HostClassDescriptor::new("SVGTextPathElement")
            .extends("SVGTextContentElement")
            .wraps(DomKind::svg("textPath"), Any)
            .illegal_constructor(Any)
            .constant("TEXTPATH_METHODTYPE_UNKNOWN", 0)
            .constant("TEXTPATH_METHODTYPE_ALIGN", 1)
            .constant("TEXTPATH_METHODTYPE_STRETCH", 2)
            .constant("TEXTPATH_SPACINGTYPE_UNKNOWN", 0)
            .constant("TEXTPATH_SPACINGTYPE_AUTO", 1)
            .constant("TEXTPATH_SPACINGTYPE_EXACT", 2),
        HostClassDescriptor::new("SVGFEDisplacementMapElement")
            .extends("SVGElement")
            .wraps(DomKind::svg("feDisplacementMap"), Any)
            .illegal_constructor(Any)
            .constant("SVG_CHANNEL_UNKNOWN", 0)
            .constant("SVG_CHANNEL_R", 1)
            .constant("SVG_CHANNEL_G", 2)
            .constant("SVG_CHANNEL_B", 3)
            .constant("SVG_CHANNEL_A", 4),
    ]
}
