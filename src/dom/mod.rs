//! DOM bridge: the narrow set of tree operations host objects need.
//!
//! Nodes are addressed by [`NodeId`]. The bridge only keeps weak references to
//! nodes it hands out (documents are owned here, script-visible nodes by their
//! host instance), so an id whose node has been dropped resolves to
//! [`HostError::DomDetached`].

mod serialize;

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use html5ever::{LocalName, Namespace, QualName};
use kuchiki::traits::*;
use kuchiki::{Attribute, ExpandedName, Node, NodeData, NodeRef};
use serde::{Deserialize, Serialize};

use crate::error::{HostError, HostResult};

pub use serialize::SerializeOptions;

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    ProcessingInstruction,
    Comment,
    Document,
    Doctype,
    DocumentFragment,
}

impl NodeType {
    pub fn of(node: &NodeRef) -> Self {
        match node.data() {
            NodeData::Element(_) => Self::Element,
            NodeData::Text(_) => Self::Text,
            NodeData::ProcessingInstruction(_) => Self::ProcessingInstruction,
            NodeData::Comment(_) => Self::Comment,
            NodeData::Document(_) => Self::Document,
            NodeData::Doctype(_) => Self::Doctype,
            NodeData::DocumentFragment => Self::DocumentFragment,
        }
    }

    /// `Node.nodeType` value.
    pub fn code(self) -> u16 {
        match self {
            Self::Element => 1,
            Self::Text => 3,
            Self::ProcessingInstruction => 7,
            Self::Comment => 8,
            Self::Document => 9,
            Self::Doctype => 10,
            Self::DocumentFragment => 11,
        }
    }
}

/// Mutation log entry, recorded by every write that goes through the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomMutation {
    Attribute {
        node: NodeId,
        name: String,
        value: String,
    },
    RemoveAttribute {
        node: NodeId,
        name: String,
    },
    InsertChild {
        parent: NodeId,
        child: NodeId,
    },
    RemoveChild {
        parent: NodeId,
        child: NodeId,
    },
    ReplaceChildren {
        parent: NodeId,
        html: String,
    },
    TextContent {
        node: NodeId,
        value: String,
    },
}

#[derive(Default)]
pub struct DomBridge {
    nodes: HashMap<NodeId, Weak<Node>>,
    ids: HashMap<usize, NodeId>,
    next_id: u32,
    documents: Vec<NodeRef>,
    origins: HashMap<NodeId, NodeId>,
    mutations: Vec<DomMutation>,
}

impl DomBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a full document. The first document loaded is the window's main document.
    pub fn load_document(&mut self, html: &str) -> NodeId {
        let document = kuchiki::parse_html().one(html);
        let id = self.id_of(&document);
        self.documents.push(document);
        id
    }

    pub fn create_html_document(&mut self, title: Option<&str>) -> NodeId {
        let title = title
            .map(|title| format!("<title>{}</title>", html_escape::encode_text(title)))
            .unwrap_or_default();
        let html = format!("<!DOCTYPE html><html><head>{title}</head><body></body></html>");
        self.load_document(&html)
    }

    pub fn main_document(&self) -> HostResult<NodeId> {
        self.documents
            .first()
            .and_then(|document| self.ids.get(&node_key(document)).copied())
            .ok_or(HostError::DomDetached)
    }

    /// Drop every node the bridge owns. Later lookups fail with `DomDetached`.
    pub fn discard(&mut self) {
        self.documents.clear();
        self.nodes.clear();
        self.ids.clear();
        self.origins.clear();
    }

    pub fn id_of(&mut self, node: &NodeRef) -> NodeId {
        let key = node_key(node);
        if let Some(id) = self.ids.get(&key) {
            let live = self
                .nodes
                .get(id)
                .and_then(Weak::upgrade)
                .map(|existing| Rc::ptr_eq(&existing, &node.0))
                .unwrap_or(false);
            if live {
                return *id;
            }
            self.nodes.remove(id);
        }
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, Rc::downgrade(&node.0));
        self.ids.insert(key, id);
        id
    }

    pub fn node(&self, id: NodeId) -> HostResult<NodeRef> {
        self.nodes
            .get(&id)
            .and_then(Weak::upgrade)
            .map(NodeRef)
            .ok_or(HostError::DomDetached)
    }

    pub fn node_type(&self, id: NodeId) -> HostResult<NodeType> {
        Ok(NodeType::of(&self.node(id)?))
    }

    /// The document `id` belongs to: its tree root when connected, otherwise the
    /// document that created it.
    pub fn document_of(&mut self, id: NodeId) -> HostResult<NodeId> {
        let node = self.node(id)?;
        let root = node.inclusive_ancestors().last().unwrap_or(node);
        if matches!(root.data(), NodeData::Document(_)) {
            return Ok(self.id_of(&root));
        }
        let root_id = self.id_of(&root);
        if let Some(origin) = self
            .origins
            .get(&root_id)
            .or_else(|| self.origins.get(&id))
        {
            return Ok(*origin);
        }
        self.main_document()
    }

    pub fn root_of(&mut self, id: NodeId) -> HostResult<NodeId> {
        let node = self.node(id)?;
        let root = node.inclusive_ancestors().last().unwrap_or(node);
        Ok(self.id_of(&root))
    }

    /// Create a detached element owned by `document`. The caller receives the only
    /// strong reference.
    pub fn create_element(
        &mut self,
        document: NodeId,
        namespace: &str,
        local_name: &str,
    ) -> HostResult<(NodeId, NodeRef)> {
        self.node(document)?;
        let local = if namespace == HTML_NAMESPACE {
            local_name.to_ascii_lowercase()
        } else {
            local_name.to_string()
        };
        let name = QualName::new(None, Namespace::from(namespace), LocalName::from(local));
        let element = NodeRef::new_element(name, std::iter::empty::<(ExpandedName, Attribute)>());
        let id = self.id_of(&element);
        self.origins.insert(id, document);
        Ok((id, element))
    }

    pub fn create_text(&mut self, document: NodeId, data: &str) -> HostResult<(NodeId, NodeRef)> {
        self.node(document)?;
        let text = NodeRef::new_text(data);
        let id = self.id_of(&text);
        self.origins.insert(id, document);
        Ok((id, text))
    }

    pub fn create_fragment(&mut self, document: NodeId) -> HostResult<(NodeId, NodeRef)> {
        self.node(document)?;
        let fragment = NodeRef::new(NodeData::DocumentFragment);
        let id = self.id_of(&fragment);
        self.origins.insert(id, document);
        Ok((id, fragment))
    }

    pub fn is_html_element(&self, id: NodeId) -> HostResult<bool> {
        let node = self.node(id)?;
        Ok(node
            .as_element()
            .map(|element| &*element.name.ns == HTML_NAMESPACE)
            .unwrap_or(false))
    }

    pub fn local_name(&self, id: NodeId) -> HostResult<Option<String>> {
        let node = self.node(id)?;
        Ok(node.as_element().map(|element| element.name.local.to_string()))
    }

    pub fn namespace(&self, id: NodeId) -> HostResult<Option<String>> {
        let node = self.node(id)?;
        Ok(node.as_element().map(|element| element.name.ns.to_string()))
    }

    /// `Element.tagName`: upper-cased for HTML elements.
    pub fn tag_name(&self, id: NodeId) -> HostResult<Option<String>> {
        let node = self.node(id)?;
        Ok(node.as_element().map(|element| {
            if &*element.name.ns == HTML_NAMESPACE {
                element.name.local.to_ascii_uppercase().to_string()
            } else {
                element.name.local.to_string()
            }
        }))
    }

    pub fn node_name(&self, id: NodeId) -> HostResult<String> {
        let node = self.node(id)?;
        let name = match node.data() {
            NodeData::Element(_) => self.tag_name(id)?.unwrap_or_default(),
            NodeData::Text(_) => "#text".to_string(),
            NodeData::Comment(_) => "#comment".to_string(),
            NodeData::Document(_) => "#document".to_string(),
            NodeData::DocumentFragment => "#document-fragment".to_string(),
            NodeData::Doctype(doctype) => doctype.name.clone(),
            NodeData::ProcessingInstruction(contents) => contents.borrow().0.clone(),
        };
        Ok(name)
    }

    fn normalise_attr_name(&self, id: NodeId, name: &str) -> HostResult<String> {
        if self.is_html_element(id)? {
            Ok(name.to_ascii_lowercase())
        } else {
            Ok(name.to_string())
        }
    }

    /// Attribute value with HTML name normalisation; `None` when absent.
    pub fn find_attr(&self, id: NodeId, name: &str) -> HostResult<Option<String>> {
        let name = self.normalise_attr_name(id, name)?;
        self.find_attr_direct(id, &name)
    }

    pub fn find_attr_direct(&self, id: NodeId, name: &str) -> HostResult<Option<String>> {
        let node = self.node(id)?;
        Ok(node
            .as_element()
            .and_then(|element| element.attributes.borrow().get(name).map(str::to_string)))
    }

    pub fn get_attr(&self, id: NodeId, name: &str) -> HostResult<String> {
        Ok(self.find_attr(id, name)?.unwrap_or_default())
    }

    pub fn get_attr_direct(&self, id: NodeId, name: &str) -> HostResult<String> {
        Ok(self.find_attr_direct(id, name)?.unwrap_or_default())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> HostResult<bool> {
        Ok(self.find_attr(id, name)?.is_some())
    }

    /// The only attribute write path. Returns the previous value.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> HostResult<Option<String>> {
        let name = self.normalise_attr_name(id, name)?;
        let node = self.node(id)?;
        let element = node
            .as_element()
            .ok_or_else(|| HostError::type_mismatch("attributes can only be set on elements"))?;
        let previous = element
            .attributes
            .borrow_mut()
            .insert(name.as_str(), value.to_string())
            .map(|attribute| attribute.value);
        self.mutations.push(DomMutation::Attribute {
            node: id,
            name,
            value: value.to_string(),
        });
        Ok(previous)
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> HostResult<Option<String>> {
        let name = self.normalise_attr_name(id, name)?;
        let node = self.node(id)?;
        let Some(element) = node.as_element() else {
            return Ok(None);
        };
        let previous = element
            .attributes
            .borrow_mut()
            .remove(name.as_str())
            .map(|attribute| attribute.value);
        if previous.is_some() {
            self.mutations
                .push(DomMutation::RemoveAttribute { node: id, name });
        }
        Ok(previous)
    }

    pub fn parent(&mut self, id: NodeId) -> HostResult<Option<NodeId>> {
        let node = self.node(id)?;
        Ok(node.parent().map(|parent| self.id_of(&parent)))
    }

    pub fn children(&mut self, id: NodeId) -> HostResult<Vec<NodeId>> {
        let node = self.node(id)?;
        Ok(node.children().map(|child| self.id_of(&child)).collect())
    }

    pub fn element_children(&mut self, id: NodeId) -> HostResult<Vec<NodeId>> {
        let node = self.node(id)?;
        Ok(node
            .children()
            .filter(|child| child.as_element().is_some())
            .map(|child| self.id_of(&child))
            .collect())
    }

    pub fn descendants(&mut self, id: NodeId) -> HostResult<Vec<NodeId>> {
        let node = self.node(id)?;
        Ok(node
            .descendants()
            .map(|descendant| self.id_of(&descendant))
            .collect())
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, of: NodeId) -> HostResult<bool> {
        let ancestor = self.node(ancestor)?;
        let node = self.node(of)?;
        let found = node
            .inclusive_ancestors()
            .any(|candidate| candidate == ancestor);
        Ok(found)
    }

    fn check_insertion(&self, parent: &NodeRef, child: &NodeRef) -> HostResult<()> {
        if parent.inclusive_ancestors().any(|ancestor| ancestor == *child) {
            return Err(HostError::HierarchyRequest(
                "The new child element contains the parent.".into(),
            ));
        }
        if matches!(child.data(), NodeData::Document(_)) {
            return Err(HostError::HierarchyRequest(
                "Nodes of type '#document' may not be inserted.".into(),
            ));
        }
        if !matches!(
            parent.data(),
            NodeData::Element(_) | NodeData::Document(_) | NodeData::DocumentFragment
        ) {
            return Err(HostError::HierarchyRequest(
                "This node type does not support children.".into(),
            ));
        }
        Ok(())
    }

    /// Insert `child` into `parent`. A fragment child is emptied into `parent`.
    /// Returns the nodes actually inserted.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> HostResult<Vec<NodeId>> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        self.check_insertion(&parent_node, &child_node)?;
        let reference_node = match reference {
            Some(reference) => {
                let node = self.node(reference)?;
                if node.parent().as_ref() != Some(&parent_node) {
                    return Err(HostError::NotFound(
                        "The node before which the new node is to be inserted is not a child of this node."
                            .into(),
                    ));
                }
                Some(node)
            }
            None => None,
        };

        let moved: Vec<NodeRef> = if matches!(child_node.data(), NodeData::DocumentFragment) {
            child_node.children().collect()
        } else {
            vec![child_node]
        };

        let mut inserted = Vec::with_capacity(moved.len());
        for node in moved {
            match &reference_node {
                Some(reference) => reference.insert_before(node.clone()),
                None => parent_node.append(node.clone()),
            }
            let id = self.id_of(&node);
            self.mutations.push(DomMutation::InsertChild { parent, child: id });
            inserted.push(id);
        }
        Ok(inserted)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> HostResult<Vec<NodeId>> {
        self.insert_before(parent, child, None)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> HostResult<()> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        if child_node.parent().as_ref() != Some(&parent_node) {
            return Err(HostError::NotFound(
                "The node to be removed is not a child of this node.".into(),
            ));
        }
        let document = self.document_of(parent)?;
        child_node.detach();
        self.origins.insert(child, document);
        self.mutations.push(DomMutation::RemoveChild { parent, child });
        Ok(())
    }

    pub fn remove_all_children(&mut self, id: NodeId) -> HostResult<()> {
        let node = self.node(id)?;
        let document = self.document_of(id)?;
        let children: Vec<NodeRef> = node.children().collect();
        for child in children {
            child.detach();
            let child_id = self.id_of(&child);
            self.origins.insert(child_id, document);
            self.mutations.push(DomMutation::RemoveChild {
                parent: id,
                child: child_id,
            });
        }
        Ok(())
    }

    /// Parse `text` in the context of `id` and append the resulting nodes.
    pub fn parse_html_snippet(&mut self, id: NodeId, text: &str) -> HostResult<Vec<NodeId>> {
        let target = self.node(id)?;
        let context = match target.as_element() {
            Some(element) if &*element.name.ns == HTML_NAMESPACE => element.name.clone(),
            _ => QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from("body")),
        };

        let parsed = kuchiki::parse_fragment(context, Vec::new()).one(text);
        let container = parsed
            .first_child()
            .filter(|node| node.as_element().is_some())
            .ok_or_else(|| HostError::ParseError("fragment parser produced no container".into()))?;

        let mut appended = Vec::new();
        let nodes: Vec<NodeRef> = container.children().collect();
        for node in nodes {
            target.append(node.clone());
            appended.push(self.id_of(&node));
        }
        self.mutations.push(DomMutation::ReplaceChildren {
            parent: id,
            html: text.to_string(),
        });
        tracing::debug!(target: "hostbridge::dom", nodes = appended.len(), "parsed HTML snippet");
        Ok(appended)
    }

    pub fn text_content(&self, id: NodeId) -> HostResult<Option<String>> {
        let node = self.node(id)?;
        let text = match node.data() {
            NodeData::Document(_) | NodeData::Doctype(_) => None,
            NodeData::Text(text) | NodeData::Comment(text) => Some(text.borrow().clone()),
            NodeData::ProcessingInstruction(contents) => Some(contents.borrow().1.clone()),
            NodeData::Element(_) | NodeData::DocumentFragment => Some(node.text_contents()),
        };
        Ok(text)
    }

    pub fn set_text_content(&mut self, id: NodeId, value: &str) -> HostResult<()> {
        let node = self.node(id)?;
        match node.data() {
            NodeData::Text(text) | NodeData::Comment(text) => {
                *text.borrow_mut() = value.to_string();
            }
            NodeData::Element(_) | NodeData::DocumentFragment => {
                self.remove_all_children(id)?;
                if !value.is_empty() {
                    node.append(NodeRef::new_text(value));
                }
            }
            _ => return Ok(()),
        }
        self.mutations.push(DomMutation::TextContent {
            node: id,
            value: value.to_string(),
        });
        Ok(())
    }

    pub fn inner_html(&self, id: NodeId, options: &SerializeOptions) -> HostResult<String> {
        let node = self.node(id)?;
        let mut out = String::new();
        serialize::serialize_children(&node, options, &mut out);
        Ok(out)
    }

    pub fn outer_html(&self, id: NodeId, options: &SerializeOptions) -> HostResult<String> {
        let node = self.node(id)?;
        let mut out = String::new();
        serialize::serialize_node(&node, options, &mut out);
        Ok(out)
    }

    pub fn query_selector(&mut self, id: NodeId, selector: &str) -> HostResult<Option<NodeId>> {
        let node = self.node(id)?;
        let mut matches = node
            .select(selector)
            .map_err(|_| HostError::ParseError(format!("'{selector}' is not a valid selector")))?;
        Ok(matches
            .find(|candidate| *candidate.as_node() != node)
            .map(|found| self.id_of(found.as_node())))
    }

    pub fn query_selector_all(&mut self, id: NodeId, selector: &str) -> HostResult<Vec<NodeId>> {
        let node = self.node(id)?;
        let matches: Vec<NodeRef> = node
            .select(selector)
            .map_err(|_| HostError::ParseError(format!("'{selector}' is not a valid selector")))?
            .filter(|candidate| *candidate.as_node() != node)
            .map(|found| found.as_node().clone())
            .collect();
        Ok(matches.iter().map(|found| self.id_of(found)).collect())
    }

    pub fn element_by_id(&mut self, root: NodeId, element_id: &str) -> HostResult<Option<NodeId>> {
        let node = self.node(root)?;
        let found = node.descendants().find(|candidate| {
            candidate
                .as_element()
                .map(|element| element.attributes.borrow().get("id") == Some(element_id))
                .unwrap_or(false)
        });
        Ok(found.map(|found| self.id_of(&found)))
    }

    /// First element child of the document's root element with the given local name.
    pub fn document_section(
        &mut self,
        document: NodeId,
        local: &str,
    ) -> HostResult<Option<NodeId>> {
        let Some(root) = self.document_element(document)? else {
            return Ok(None);
        };
        let children = self.element_children(root)?;
        for child in children {
            if self.local_name(child)?.as_deref() == Some(local) {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    pub fn document_element(&mut self, document: NodeId) -> HostResult<Option<NodeId>> {
        Ok(self.element_children(document)?.into_iter().next())
    }

    pub fn drain_mutations(&mut self) -> Vec<DomMutation> {
        std::mem::take(&mut self.mutations)
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.len()
    }
}

fn node_key(node: &NodeRef) -> usize {
    Rc::as_ptr(&node.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge_with(html: &str) -> (DomBridge, NodeId) {
        let mut bridge = DomBridge::new();
        let document = bridge.load_document(html);
        (bridge, document)
    }

    #[test]
    fn attributes_are_case_normalised_for_html() {
        let (mut bridge, document) = bridge_with("<div id=target></div>");
        let div = bridge
            .element_by_id(document, "target")
            .expect("lookup")
            .expect("div");

        bridge.set_attr(div, "noWrap", "").expect("set");
        assert!(bridge.has_attr(div, "NOWRAP").expect("has"));
        assert_eq!(bridge.find_attr_direct(div, "noWrap").expect("direct"), None);
        assert_eq!(bridge.find_attr_direct(div, "nowrap").expect("direct"), Some(String::new()));

        assert_eq!(bridge.remove_attr(div, "nowrap").expect("remove"), Some(String::new()));
        assert!(!bridge.has_attr(div, "nowrap").expect("has"));
        assert_eq!(bridge.drain_mutations().len(), 2);
    }

    #[test]
    fn snippet_parsing_appends_nodes() {
        let (mut bridge, document) = bridge_with("<div id=host>old</div>");
        let host = bridge.element_by_id(document, "host").expect("lookup").expect("host");
        bridge.remove_all_children(host).expect("clear");
        let appended = bridge
            .parse_html_snippet(host, "<p>one</p>text<b>two</b>")
            .expect("parse");
        assert_eq!(appended.len(), 3);
        let html = bridge.inner_html(host, &SerializeOptions::default()).expect("html");
        assert_eq!(html, "<p>one</p>text<b>two</b>");
    }

    #[test]
    fn insertion_rejects_cycles() {
        let (mut bridge, document) = bridge_with("<div id=outer><span id=inner></span></div>");
        let outer = bridge.element_by_id(document, "outer").expect("lookup").expect("outer");
        let inner = bridge.element_by_id(document, "inner").expect("lookup").expect("inner");
        let err = bridge.append_child(inner, outer).expect_err("cycle");
        assert!(matches!(err, HostError::HierarchyRequest(_)));
    }

    #[test]
    fn discarded_nodes_are_detached() {
        let (mut bridge, document) = bridge_with("<p id=x></p>");
        let p = bridge.element_by_id(document, "x").expect("lookup").expect("p");
        bridge.discard();
        assert_eq!(bridge.get_attr(p, "id"), Err(HostError::DomDetached));
    }

    #[test]
    fn created_nodes_remember_their_document() {
        let (mut bridge, _main) = bridge_with("<body></body>");
        let other = bridge.create_html_document(Some("second"));
        let (element, _owned) = bridge
            .create_element(other, HTML_NAMESPACE, "STYLE")
            .expect("create");
        assert_eq!(bridge.document_of(element).expect("doc"), other);
        assert_eq!(bridge.local_name(element).expect("name").as_deref(), Some("style"));
    }
}
