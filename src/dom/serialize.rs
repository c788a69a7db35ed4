use html_escape::{encode_double_quoted_attribute, encode_text};
use kuchiki::{NodeData, NodeRef};

use super::HTML_NAMESPACE;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

/// Profile-dependent serialisation switches.
#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    /// Extra HTML elements written without an end tag (`basefont`, `keygen`).
    pub forbidden_end_tags: Vec<&'static str>,
}

impl SerializeOptions {
    fn end_tag_forbidden(&self, local: &str) -> bool {
        VOID_ELEMENTS.contains(&local) || self.forbidden_end_tags.contains(&local)
    }
}

pub(super) fn serialize_children(node: &NodeRef, options: &SerializeOptions, out: &mut String) {
    let raw = node
        .as_element()
        .map(|element| RAW_TEXT_ELEMENTS.contains(&&*element.name.local))
        .unwrap_or(false);
    for child in node.children() {
        if raw {
            if let Some(text) = child.as_text() {
                out.push_str(&text.borrow());
                continue;
            }
        }
        serialize_node(&child, options, out);
    }
}

pub(super) fn serialize_node(node: &NodeRef, options: &SerializeOptions, out: &mut String) {
    match node.data() {
        NodeData::Document(_) | NodeData::DocumentFragment => {
            serialize_children(node, options, out);
        }
        NodeData::Element(data) => {
            let local = &*data.name.local;
            out.push('<');
            out.push_str(local);
            for (name, attribute) in data.attributes.borrow().map.iter() {
                out.push(' ');
                if let Some(prefix) = &attribute.prefix {
                    out.push_str(prefix);
                    out.push(':');
                }
                out.push_str(&name.local);
                out.push_str("=\"");
                out.push_str(&encode_double_quoted_attribute(&attribute.value));
                out.push('"');
            }
            out.push('>');
            let html = &*data.name.ns == HTML_NAMESPACE;
            if html && options.end_tag_forbidden(local) {
                return;
            }
            serialize_children(node, options, out);
            out.push_str("</");
            out.push_str(local);
            out.push('>');
        }
        NodeData::Text(text) => {
            out.push_str(&encode_text(&*text.borrow()));
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(&text.borrow());
            out.push_str("-->");
        }
        NodeData::Doctype(doctype) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(&doctype.name);
            out.push('>');
        }
        NodeData::ProcessingInstruction(contents) => {
            let contents = contents.borrow();
            out.push_str("<?");
            out.push_str(&contents.0);
            out.push(' ');
            out.push_str(&contents.1);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::*;

    fn body_html(html: &str, options: &SerializeOptions) -> String {
        let document = kuchiki::parse_html().one(html);
        let body = document.select_first("body").expect("body");
        let mut out = String::new();
        serialize_children(body.as_node(), options, &mut out);
        out
    }

    #[test]
    fn escapes_text_and_attributes() {
        let html = body_html(
            r#"<p title="a &quot;b&quot;">x &lt; y</p>"#,
            &SerializeOptions::default(),
        );
        assert_eq!(html, r#"<p title="a &quot;b&quot;">x &lt; y</p>"#);
    }

    #[test]
    fn forbidden_end_tags_follow_options() {
        let source = "<p>x</p><basefont color=red><br>";
        assert_eq!(
            body_html(source, &SerializeOptions::default()),
            "<p>x</p><basefont color=\"red\"></basefont><br>"
        );
        let options = SerializeOptions {
            forbidden_end_tags: vec!["basefont"],
        };
        assert_eq!(
            body_html(source, &options),
            "<p>x</p><basefont color=\"red\"><br>"
        );
    }
}
