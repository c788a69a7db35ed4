//! Node, Element, Document and the other core DOM classes.

use crate::catalogue::HostClassDescriptor;
use crate::dom::{NodeId, NodeType, HTML_NAMESPACE};
use crate::error::{HostError, HostResult};
use crate::profile::BrowserCondition;

use super::events::{get_handler, set_handler};
use super::{shadow, style, HostCall, HostValue, InstanceState, WindowHost};

/// Content attribute reflected by a property: the member name, lower-cased.
pub(super) fn attribute_name(member: &str) -> String {
    match member {
        "className" => "class".to_string(),
        "htmlFor" => "for".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

pub(super) fn reflect_get(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    Ok(call
        .host
        .dom()
        .get_attr(node, &attribute_name(call.member))?
        .into())
}

pub(super) fn reflect_set(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let value = call.string_arg(0);
    call.host
        .set_attribute(node, &attribute_name(call.member), &value)?;
    Ok(HostValue::Undefined)
}

/// Boolean attribute: present means `true`.
pub(super) fn reflect_bool_get(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    Ok(call
        .host
        .dom()
        .has_attr(node, &attribute_name(call.member))?
        .into())
}

pub(super) fn reflect_bool_set(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let name = attribute_name(call.member);
    if call.bool_arg(0) {
        call.host.set_attribute(node, &name, "")?;
    } else {
        call.host.remove_attribute(node, &name)?;
    }
    Ok(HostValue::Undefined)
}

impl WindowHost {
    /// Insert and run the follow-up steps for both the old and new parent.
    pub fn insert_node(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> HostResult<()> {
        let previous_parent = self.dom.parent(child)?;
        let was_fragment = self.dom.node_type(child)? == NodeType::DocumentFragment;
        self.dom.insert_before(parent, child, reference)?;
        if let Some(previous) = previous_parent {
            self.children_changed(previous)?;
        }
        if was_fragment {
            self.children_changed(child)?;
        }
        self.children_changed(parent)
    }

    pub fn remove_node(&mut self, parent: NodeId, child: NodeId) -> HostResult<()> {
        self.dom.remove_child(parent, child)?;
        self.children_changed(parent)
    }

    /// `innerHTML` setter steps shared by elements and shadow roots.
    pub fn replace_inner_html(&mut self, node: NodeId, html: &str) -> HostResult<()> {
        self.dom.remove_all_children(node)?;
        self.dom.parse_html_snippet(node, html)?;
        self.children_changed(node)
    }

    pub fn create_element_in(
        &mut self,
        document: NodeId,
        namespace: &str,
        local_name: &str,
    ) -> HostResult<HostValue> {
        let (id, _element) = self.dom.create_element(document, namespace, local_name)?;
        Ok(self.instance_for_node(id)?.into())
    }
}

fn node_type(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    Ok(call.host.dom().node_type(node)?.code().into())
}

fn node_name(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    Ok(call.host.dom().node_name(node)?.into())
}

fn parent_node(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let parent = call.host.dom_mut().parent(node)?;
    call.host.wrap_node(parent)
}

fn child_nodes(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let children = call.host.dom_mut().children(node)?;
    call.host.wrap_nodes(children)
}

fn first_child(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let first = call.host.dom_mut().children(node)?.into_iter().next();
    call.host.wrap_node(first)
}

fn last_child(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let last = call.host.dom_mut().children(node)?.pop();
    call.host.wrap_node(last)
}

fn text_content(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    Ok(call.host.dom().text_content(node)?.into())
}

fn set_text_content(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let value = call.optional_string(0).unwrap_or_default();
    call.host.dom_mut().set_text_content(node, &value)?;
    call.host.children_changed(node)?;
    Ok(HostValue::Undefined)
}

fn owner_document(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    if call.host.dom().node_type(node)? == NodeType::Document {
        return Ok(HostValue::Null);
    }
    let document = call.host.dom_mut().document_of(node)?;
    call.host.wrap_node(Some(document))
}

fn append_child(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let parent = call.node()?;
    let child = call.node_arg(0)?;
    call.host.insert_node(parent, child, None)?;
    Ok(call.arg(0).clone())
}

fn insert_before(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(2)?;
    let parent = call.node()?;
    let child = call.node_arg(0)?;
    let reference = if call.arg(1).is_nullish() {
        None
    } else {
        Some(call.node_arg(1)?)
    };
    call.host.insert_node(parent, child, reference)?;
    Ok(call.arg(0).clone())
}

fn remove_child(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let parent = call.node()?;
    let child = call.node_arg(0)?;
    call.host.remove_node(parent, child)?;
    Ok(call.arg(0).clone())
}

fn has_child_nodes(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    Ok((!call.host.dom_mut().children(node)?.is_empty()).into())
}

fn contains(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    if call.arg(0).is_nullish() {
        return Ok(false.into());
    }
    let other = call.node_arg(0)?;
    Ok(call.host.dom().is_inclusive_ancestor(node, other)?.into())
}

fn tag_name(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    Ok(call.host.dom().tag_name(node)?.into())
}

fn local_name(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    Ok(call.host.dom().local_name(node)?.into())
}

fn namespace_uri(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    Ok(call.host.dom().namespace(node)?.into())
}

fn get_attribute(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let node = call.node()?;
    let name = call.string_arg(0);
    Ok(call.host.dom().find_attr(node, &name)?.into())
}

fn set_attribute(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(2)?;
    let node = call.node()?;
    let name = call.string_arg(0);
    let value = call.string_arg(1);
    call.host.set_attribute(node, &name, &value)?;
    Ok(HostValue::Undefined)
}

fn remove_attribute(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let node = call.node()?;
    let name = call.string_arg(0);
    call.host.remove_attribute(node, &name)?;
    Ok(HostValue::Undefined)
}

fn has_attribute(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let node = call.node()?;
    let name = call.string_arg(0);
    Ok(call.host.dom().has_attr(node, &name)?.into())
}

fn inner_html(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let options = call.host.serialize_options();
    Ok(call.host.dom().inner_html(node, &options)?.into())
}

fn set_inner_html(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let html = call.optional_string(0).unwrap_or_default();
    call.host.replace_inner_html(node, &html)?;
    Ok(HostValue::Undefined)
}

fn outer_html(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let options = call.host.serialize_options();
    Ok(call.host.dom().outer_html(node, &options)?.into())
}

fn children(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let children = call.host.dom_mut().element_children(node)?;
    call.host.wrap_nodes(children)
}

fn query_selector(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let node = call.node()?;
    let selector = call.string_arg(0);
    let found = call.host.dom_mut().query_selector(node, &selector)?;
    call.host.wrap_node(found)
}

fn query_selector_all(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let node = call.node()?;
    let selector = call.string_arg(0);
    let found = call.host.dom_mut().query_selector_all(node, &selector)?;
    call.host.wrap_nodes(found)
}

fn get_element_by_id(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let node = call.node()?;
    let element_id = call.string_arg(0);
    let found = call.host.dom_mut().element_by_id(node, &element_id)?;
    call.host.wrap_node(found)
}

fn document_element(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let document = call.node()?;
    let root = call.host.dom_mut().document_element(document)?;
    call.host.wrap_node(root)
}

fn document_section(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let document = call.node()?;
    let section = call.host.dom_mut().document_section(document, call.member)?;
    call.host.wrap_node(section)
}

fn create_element(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let document = call.node()?;
    let tag = call.string_arg(0);
    call.host.create_element_in(document, HTML_NAMESPACE, &tag)
}

fn create_element_ns(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(2)?;
    let document = call.node()?;
    let namespace = call.optional_string(0).unwrap_or_default();
    let qualified = call.string_arg(1);
    let local = qualified
        .rsplit_once(':')
        .map(|(_, local)| local)
        .unwrap_or(&qualified);
    call.host.create_element_in(document, &namespace, local)
}

fn create_text_node(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let document = call.node()?;
    let data = call.string_arg(0);
    let (id, _text) = call.host.dom_mut().create_text(document, &data)?;
    Ok(call.host.instance_for_node(id)?.into())
}

fn create_document_fragment(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let document = call.node()?;
    let (id, _fragment) = call.host.dom_mut().create_fragment(document)?;
    Ok(call.host.instance_for_node(id)?.into())
}

fn implementation(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let document = call.node()?;
    if let Some(existing) = call.host.implementations.get(&document) {
        return Ok((*existing).into());
    }
    let id = call
        .host
        .create_instance("DOMImplementation", InstanceState::DomImplementation { document });
    call.host.implementations.insert(document, id);
    Ok(id.into())
}

fn create_html_document(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    match &call.host.instance(call.this)?.state {
        InstanceState::DomImplementation { .. } => {}
        _ => return Err(HostError::type_mismatch("Illegal invocation")),
    }
    let title = call.optional_string(0);
    let document = call.host.dom_mut().create_html_document(title.as_deref());
    tracing::debug!(target: "hostbridge::host", ?document, "created HTML document");
    call.host.wrap_node(Some(document))
}

fn has_feature(_call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(true.into())
}

fn construct_fragment(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let document = call.host.document();
    let (id, _fragment) = call.host.dom_mut().create_fragment(document)?;
    Ok(call.host.instance_for_node(id)?.into())
}

fn construct_text(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let document = call.host.document();
    let data = call.optional_string(0).unwrap_or_default();
    let (id, _text) = call.host.dom_mut().create_text(document, &data)?;
    Ok(call.host.instance_for_node(id)?.into())
}

fn character_data_length(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let node = call.node()?;
    let data = call.host.dom().text_content(node)?.unwrap_or_default();
    Ok((data.encode_utf16().count() as f64).into())
}

const DOM_EXCEPTION_CONSTANTS: &[(&str, i32)] = &[
    ("INDEX_SIZE_ERR", 1),
    ("DOMSTRING_SIZE_ERR", 2),
    ("HIERARCHY_REQUEST_ERR", 3),
    ("WRONG_DOCUMENT_ERR", 4),
    ("INVALID_CHARACTER_ERR", 5),
    ("NO_DATA_ALLOWED_ERR", 6),
    ("NO_MODIFICATION_ALLOWED_ERR", 7),
    ("NOT_FOUND_ERR", 8),
    ("NOT_SUPPORTED_ERR", 9),
    ("INUSE_ATTRIBUTE_ERR", 10),
    ("INVALID_STATE_ERR", 11),
    ("SYNTAX_ERR", 12),
    ("INVALID_MODIFICATION_ERR", 13),
    ("NAMESPACE_ERR", 14),
    ("INVALID_ACCESS_ERR", 15),
    ("VALIDATION_ERR", 16),
    ("TYPE_MISMATCH_ERR", 17),
    ("SECURITY_ERR", 18),
    ("NETWORK_ERR", 19),
    ("ABORT_ERR", 20),
    ("URL_MISMATCH_ERR", 21),
    ("QUOTA_EXCEEDED_ERR", 22),
    ("TIMEOUT_ERR", 23),
    ("INVALID_NODE_TYPE_ERR", 24),
    ("DATA_CLONE_ERR", 25),
];

fn construct_dom_exception(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let message = call.optional_string(0).unwrap_or_default();
    let name = call.optional_string(1).unwrap_or_else(|| "Error".to_string());
    Ok(call.host.new_dom_exception(&name, &message).into())
}

fn dom_exception_parts(call: &HostCall<'_>) -> HostResult<(String, String)> {
    match &call.host.instance(call.this)?.state {
        InstanceState::DomException { name, message } => Ok((name.clone(), message.clone())),
        _ => Err(HostError::type_mismatch("Illegal invocation")),
    }
}

fn dom_exception_name(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(dom_exception_parts(call)?.0.into())
}

fn dom_exception_message(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(dom_exception_parts(call)?.1.into())
}

fn dom_exception_code(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let (name, _) = dom_exception_parts(call)?;
    Ok(crate::error::legacy_code(&name).into())
}

fn dom_exception_to_string(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let (name, message) = dom_exception_parts(call)?;
    if message.is_empty() {
        return Ok(name.into());
    }
    Ok(format!("{name}: {message}").into())
}

pub(super) fn descriptors() -> Vec<HostClassDescriptor> {
    use BrowserCondition::*;

    let mut dom_exception = HostClassDescriptor::new("DOMException")
        .error_prototype()
        .constructor_with(&["message", "name"], construct_dom_exception, ChromeAndEdgeAndFirefox)
        .illegal_constructor(IE)
        .read_only("name", dom_exception_name)
        .read_only("message", dom_exception_message)
        .read_only("code", dom_exception_code)
        .function("toString", 0, dom_exception_to_string);
    for (name, code) in DOM_EXCEPTION_CONSTANTS {
        dom_exception = dom_exception.constant(*name, *code);
    }

    vec![
        HostClassDescriptor::new("Node")
            .extends("EventTarget")
            .illegal_constructor(Any)
            .constant("ELEMENT_NODE", 1)
            .constant("ATTRIBUTE_NODE", 2)
            .constant("TEXT_NODE", 3)
            .constant("CDATA_SECTION_NODE", 4)
            .constant("PROCESSING_INSTRUCTION_NODE", 7)
            .constant("COMMENT_NODE", 8)
            .constant("DOCUMENT_NODE", 9)
            .constant("DOCUMENT_TYPE_NODE", 10)
            .constant("DOCUMENT_FRAGMENT_NODE", 11)
            .read_only("nodeType", node_type)
            .read_only("nodeName", node_name)
            .read_only("parentNode", parent_node)
            .read_only("childNodes", child_nodes)
            .read_only("firstChild", first_child)
            .read_only("lastChild", last_child)
            .property("textContent", text_content, Some(set_text_content))
            .read_only("ownerDocument", owner_document)
            .function("appendChild", 1, append_child)
            .function("insertBefore", 2, insert_before)
            .function("removeChild", 1, remove_child)
            .function("hasChildNodes", 0, has_child_nodes)
            .function("contains", 1, contains),
        HostClassDescriptor::new("Element")
            .extends("Node")
            .illegal_constructor(Any)
            .read_only("tagName", tag_name)
            .read_only("localName", local_name)
            .read_only("namespaceURI", namespace_uri)
            .property("id", reflect_get, Some(reflect_set))
            .property("className", reflect_get, Some(reflect_set))
            .property("slot", reflect_get, Some(reflect_set))
            .only(ChromeAndEdgeAndFirefox)
            .function("getAttribute", 1, get_attribute)
            .function("setAttribute", 2, set_attribute)
            .function("removeAttribute", 1, remove_attribute)
            .function("hasAttribute", 1, has_attribute)
            .property("innerHTML", inner_html, Some(set_inner_html))
            .read_only("outerHTML", outer_html)
            .read_only("children", children)
            .function("querySelector", 1, query_selector)
            .function("querySelectorAll", 1, query_selector_all)
            .function("attachShadow", 1, shadow::attach_shadow)
            .only(ChromeAndEdgeAndFirefox)
            .read_only("shadowRoot", shadow::shadow_root)
            .only(ChromeAndEdgeAndFirefox),
        HostClassDescriptor::new("HTMLElement")
            .extends("Element")
            .illegal_constructor(Any)
            .read_only("style", style::inline_style)
            .property("title", reflect_get, Some(reflect_set))
            .property("lang", reflect_get, Some(reflect_set))
            .property("onclick", get_handler, Some(set_handler)),
        HostClassDescriptor::new("Document")
            .extends("Node")
            .illegal_constructor(Any)
            .read_only("documentElement", document_element)
            .read_only("head", document_section)
            .read_only("body", document_section)
            .function("getElementById", 1, get_element_by_id)
            .function("querySelector", 1, query_selector)
            .function("querySelectorAll", 1, query_selector_all)
            .function("createElement", 1, create_element)
            .function("createElementNS", 2, create_element_ns)
            .function("createTextNode", 1, create_text_node)
            .function("createDocumentFragment", 0, create_document_fragment)
            .read_only("implementation", implementation),
        HostClassDescriptor::new("DOMImplementation")
            .illegal_constructor(Any)
            .function("createHTMLDocument", 0, create_html_document)
            .function("hasFeature", 0, has_feature),
        HostClassDescriptor::new("DocumentFragment")
            .extends("Node")
            .constructor(construct_fragment, ChromeAndEdgeAndFirefox)
            .illegal_constructor(IE)
            .read_only("children", children)
            .function("getElementById", 1, get_element_by_id)
            .function("querySelector", 1, query_selector)
            .function("querySelectorAll", 1, query_selector_all),
        HostClassDescriptor::new("DocumentType")
            .extends("Node")
            .illegal_constructor(Any)
            .read_only("name", node_name),
        HostClassDescriptor::new("CharacterData")
            .extends("Node")
            .illegal_constructor(Any)
            .property("data", text_content, Some(set_text_content))
            .read_only("length", character_data_length),
        HostClassDescriptor::new("Text")
            .extends("CharacterData")
            .constructor_with(&["data"], construct_text, ChromeAndEdgeAndFirefox)
            .illegal_constructor(IE),
        HostClassDescriptor::new("Comment")
            .extends("CharacterData")
            .illegal_constructor(Any),
        dom_exception,
    ]
}

#[cfg(test)]
mod tests {
    use super::super::testing::{element, window};
    use super::*;
    use crate::profile::BrowserProfile;

    #[test]
    fn reflected_names_follow_html_rules() {
        assert_eq!(attribute_name("className"), "class");
        assert_eq!(attribute_name("noWrap"), "nowrap");
        assert_eq!(attribute_name("id"), "id");
    }

    #[test]
    fn inner_html_replacement_reparents_nodes() {
        let mut host = window("<div id=a><b>x</b></div>", BrowserProfile::chrome());
        let div = element(&mut host, "a");
        let node = host.node_of(div).expect("node");
        host.replace_inner_html(node, "<i>1</i><i>2</i>")
            .expect("replace");
        let options = host.serialize_options();
        assert_eq!(
            host.dom().inner_html(node, &options).expect("html"),
            "<i>1</i><i>2</i>"
        );
    }
}
