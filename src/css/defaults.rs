//! Per-browser default values of CSS properties as reported by computed style.

use super::conditional::{ConditionalRow as Row, ConditionalValueTable, Resolved};
use crate::profile::BrowserCondition::{
    Chrome, ChromeAndEdge, ChromeAndEdgeAndFirefox, Edge, FFLatest, FFESR, FF, IE,
};
use crate::profile::BrowserProfile;

#[derive(Debug, Clone, Copy)]
pub struct CssProperty {
    /// Hyphenated CSS name, e.g. `text-align`.
    pub name: &'static str,
    /// Camel-cased name exposed on `CSSStyleDeclaration`.
    pub script_name: &'static str,
    pub table: ConditionalValueTable,
}

const fn property(
    name: &'static str,
    script_name: &'static str,
    rows: &'static [Row],
) -> CssProperty {
    CssProperty {
        name,
        script_name,
        table: ConditionalValueTable::new(rows),
    }
}

static PROPERTIES: &[CssProperty] = &[
    property(
        "accent-color",
        "accentColor",
        &[Row::new(ChromeAndEdge, "auto"), Row::new(FFLatest, "auto")],
    ),
    property(
        "align-content",
        "alignContent",
        &[
            Row::new(ChromeAndEdge, "normal"),
            Row::new(FF, "normal"),
            Row::new(IE, "stretch"),
        ],
    ),
    property(
        "align-items",
        "alignItems",
        &[
            Row::new(ChromeAndEdgeAndFirefox, "normal"),
            Row::new(IE, "stretch"),
        ],
    ),
    property(
        "animation-name",
        "animationName",
        &[Row::new(ChromeAndEdgeAndFirefox, "none"), Row::new(IE, "none")],
    ),
    property(
        "backface-visibility",
        "backfaceVisibility",
        &[Row::new(ChromeAndEdgeAndFirefox, "visible"), Row::new(IE, "visible")],
    ),
    property(
        "behavior",
        "behavior",
        &[Row::hidden(IE, "")],
    ),
    property(
        "box-sizing",
        "boxSizing",
        &[Row::new(ChromeAndEdgeAndFirefox, "content-box"), Row::new(IE, "content-box")],
    ),
    property(
        "clip-path",
        "clipPath",
        &[Row::new(ChromeAndEdge, "none"), Row::new(FF, "none"), Row::new(IE, "none")],
    ),
    property(
        "color",
        "color",
        &[Row::new(ChromeAndEdgeAndFirefox, "rgb(0, 0, 0)"), Row::new(IE, "rgb(0, 0, 0)")],
    ),
    property(
        "display",
        "display",
        &[Row::new(ChromeAndEdgeAndFirefox, "block"), Row::new(IE, "block")],
    ),
    property(
        "-moz-appearance",
        "MozAppearance",
        &[Row::hidden(FF, "none")],
    ),
    property(
        "-ms-content-zooming",
        "msContentZooming",
        &[Row::new(IE, "none")],
    ),
    property(
        "overflow-anchor",
        "overflowAnchor",
        &[Row::new(ChromeAndEdge, "auto"), Row::new(FFLatest, "auto")],
    ),
    property(
        "scrollbar-gutter",
        "scrollbarGutter",
        &[Row::new(Chrome, "auto"), Row::new(Edge, "auto"), Row::new(FFLatest, "auto")],
    ),
    property(
        "text-align",
        "textAlign",
        &[
            Row::new(ChromeAndEdge, "start"),
            Row::new(FFESR, "start"),
            Row::new(FFLatest, "start"),
            Row::new(IE, "left"),
        ],
    ),
    property(
        "-webkit-appearance",
        "webkitAppearance",
        &[Row::hidden(ChromeAndEdge, "none"), Row::new(FF, "none")],
    ),
    property(
        "width",
        "width",
        &[Row::new(ChromeAndEdgeAndFirefox, "auto"), Row::new(IE, "auto")],
    ),
];

pub struct CssDefaults;

impl CssDefaults {
    pub fn properties() -> &'static [CssProperty] {
        PROPERTIES
    }

    pub fn lookup(css_name: &str) -> Option<&'static CssProperty> {
        PROPERTIES.iter().find(|property| property.name == css_name)
    }

    pub fn resolve(profile: &BrowserProfile, css_name: &str) -> Option<Resolved> {
        Self::lookup(css_name).and_then(|property| property.table.resolve(profile))
    }

    /// Properties present for `profile`, in table order.
    pub fn visible(profile: &BrowserProfile) -> Vec<(&'static str, Resolved)> {
        PROPERTIES
            .iter()
            .filter_map(|property| {
                property
                    .table
                    .resolve(profile)
                    .map(|resolved| (property.name, resolved))
            })
            .collect()
    }
}

/// `text-align` -> `textAlign`, `-moz-appearance` -> `MozAppearance`,
/// `-webkit-appearance` -> `webkitAppearance`.
pub fn css_to_script_name(css_name: &str) -> String {
    let (vendor_capital, rest) = match css_name.strip_prefix('-') {
        Some(rest) if rest.starts_with("moz-") => (true, rest),
        Some(rest) => (false, rest),
        None => (false, css_name),
    };

    let mut out = String::with_capacity(rest.len());
    let mut upper_next = false;
    for (index, ch) in rest.chars().enumerate() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next || (index == 0 && vendor_capital) {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn script_to_css_name(script_name: &str) -> String {
    let mut out = String::with_capacity(script_name.len() + 4);
    let vendor = ["webkit", "moz", "ms"]
        .iter()
        .any(|prefix| script_name.to_ascii_lowercase().starts_with(prefix))
        && script_name
            .chars()
            .skip_while(|c| c.is_ascii_lowercase() || *c == 'M')
            .next()
            .map(|c| c.is_ascii_uppercase())
            .unwrap_or(false);
    if vendor {
        out.push('-');
    }
    for (index, ch) in script_name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if index > 0 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for property in CssDefaults::properties() {
            let script = css_to_script_name(property.name);
            assert_eq!(script, property.script_name);
            assert_eq!(script_to_css_name(&script), property.name, "{script}");
        }
        assert_eq!(css_to_script_name("-moz-appearance"), "MozAppearance");
        assert_eq!(css_to_script_name("text-align"), "textAlign");
    }

    #[test]
    fn text_align_differs_between_families() {
        let chrome = CssDefaults::resolve(&BrowserProfile::chrome(), "text-align").expect("row");
        let ie = CssDefaults::resolve(&BrowserProfile::internet_explorer(), "text-align")
            .expect("row");
        assert_eq!(chrome.value, "start");
        assert_eq!(ie.value, "left");
    }

    #[test]
    fn accent_color_is_absent_on_esr() {
        assert!(CssDefaults::resolve(&BrowserProfile::firefox_esr(), "accent-color").is_none());
        assert!(CssDefaults::resolve(&BrowserProfile::firefox(), "accent-color").is_some());
    }
}
