//! Engine-neutral host objects.
//!
//! A [`WindowHost`] owns everything one window's script can reach: the DOM
//! bridge, the arena of host instances, shadow-root and slot state and the
//! deferred-action queue. Member implementations receive a [`HostCall`] and
//! never touch the script engine; anything that must run script later goes
//! through the deferred queue.

mod audio;
mod call;
mod crypto;
mod deferred;
mod events;
mod html;
mod legacy;
mod node;
mod shadow;
mod slot;
mod style;
mod stylesheet;
mod svg;
mod value;
mod window;

use std::collections::HashMap;

use kuchiki::{NodeData, NodeRef};
use url::Url;

use crate::catalogue::{Catalogue, DomNamespace, HostClassDescriptor};
use crate::dom::{DomBridge, NodeId, SerializeOptions, HTML_NAMESPACE, SVG_NAMESPACE};
use crate::error::{HostError, HostResult};
use crate::profile::{BrowserProfile, FeatureTag};

pub use audio::{AudioBufferState, AudioContextState, AudioNodeState};
pub use call::{AsyncOutcome, HostCall, CONSTRUCTOR};
pub use deferred::{DeferredAction, DeferredQueue};
pub use events::{EventDetail, EventSourceState, EventState, Listener, Listeners, Phase};
pub use legacy::CoordinatesState;
pub use shadow::{ShadowRootMode, ShadowRootState, SlotAssignmentMode};
pub use slot::{apply_slot_name, SlotNameChange, SlotState};
pub use style::StyleDeclarationState;
pub use stylesheet::StyleSheetState;
pub use value::{number_to_string, string_to_number, CallbackId, HostValue, InstanceId};

/// Every builtin host class, in declaration order.
pub fn builtin_descriptors() -> Vec<HostClassDescriptor> {
    let mut descriptors = Vec::new();
    descriptors.extend(window::descriptors());
    descriptors.extend(node::descriptors());
    descriptors.extend(html::descriptors());
    descriptors.extend(slot::descriptors());
    descriptors.extend(shadow::descriptors());
    descriptors.extend(stylesheet::descriptors());
    descriptors.extend(style::descriptors());
    descriptors.extend(events::descriptors());
    descriptors.extend(svg::descriptors());
    descriptors.extend(audio::descriptors());
    descriptors.extend(crypto::descriptors());
    descriptors.extend(legacy::descriptors());
    descriptors
}

/// The window's own instance; the script global object is bound to it.
pub const WINDOW: InstanceId = InstanceId(0);

#[derive(Debug)]
pub enum InstanceState {
    Window,
    EventTarget,
    Location,
    Node,
    ShadowRoot(ShadowRootState),
    Event(EventState),
    EventSource(EventSourceState),
    StyleSheet(StyleSheetState),
    StyleDeclaration(StyleDeclarationState),
    DomException { name: String, message: String },
    DomImplementation { document: NodeId },
    AudioContext(AudioContextState),
    AudioNode(AudioNodeState),
    AudioBuffer(AudioBufferState),
    Crypto,
    SubtleCrypto,
    Coordinates(CoordinatesState),
    Enumerator,
}

#[derive(Debug)]
pub struct HostInstance {
    pub class: &'static str,
    node: Option<(NodeId, NodeRef)>,
    pub listeners: Listeners,
    pub state: InstanceState,
}

impl HostInstance {
    fn new(class: &'static str, state: InstanceState) -> Self {
        Self {
            class,
            node: None,
            listeners: Listeners::default(),
            state,
        }
    }

    pub fn node_id(&self) -> Option<NodeId> {
        self.node.as_ref().map(|(id, _)| *id)
    }
}

pub struct WindowHost {
    profile: BrowserProfile,
    catalogue: &'static Catalogue,
    dom: DomBridge,
    document: NodeId,
    url: Url,
    instances: HashMap<InstanceId, HostInstance>,
    node_instances: HashMap<NodeId, InstanceId>,
    next_instance: u32,
    deferred: DeferredQueue,
    singletons: HashMap<&'static str, InstanceId>,
    shadow_by_host: HashMap<NodeId, InstanceId>,
    shadow_by_fragment: HashMap<NodeId, InstanceId>,
    slots: HashMap<NodeId, SlotState>,
    style_sheets: HashMap<NodeId, InstanceId>,
    style_declarations: HashMap<(NodeId, bool), InstanceId>,
    implementations: HashMap<NodeId, InstanceId>,
    discarded: bool,
}

impl WindowHost {
    pub fn new(
        html: &str,
        profile: BrowserProfile,
        catalogue: &'static Catalogue,
        url: Url,
    ) -> Self {
        let mut dom = DomBridge::new();
        let document = dom.load_document(html);
        let mut instances = HashMap::new();
        instances.insert(WINDOW, HostInstance::new("Window", InstanceState::Window));
        Self {
            profile,
            catalogue,
            dom,
            document,
            url,
            instances,
            node_instances: HashMap::new(),
            next_instance: 1,
            deferred: DeferredQueue::default(),
            singletons: HashMap::new(),
            shadow_by_host: HashMap::new(),
            shadow_by_fragment: HashMap::new(),
            slots: HashMap::new(),
            style_sheets: HashMap::new(),
            style_declarations: HashMap::new(),
            implementations: HashMap::new(),
            discarded: false,
        }
    }

    pub fn profile(&self) -> &BrowserProfile {
        &self.profile
    }

    pub fn catalogue(&self) -> &'static Catalogue {
        self.catalogue
    }

    pub fn dom(&self) -> &DomBridge {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut DomBridge {
        &mut self.dom
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn deferred_mut(&mut self) -> &mut DeferredQueue {
        &mut self.deferred
    }

    pub fn next_deferred(&mut self) -> Option<DeferredAction> {
        self.deferred.pop()
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded
    }

    pub fn instance(&self, id: InstanceId) -> HostResult<&HostInstance> {
        self.instances.get(&id).ok_or(HostError::DomDetached)
    }

    pub fn instance_mut(&mut self, id: InstanceId) -> HostResult<&mut HostInstance> {
        self.instances.get_mut(&id).ok_or(HostError::DomDetached)
    }

    pub fn class_of(&self, id: InstanceId) -> HostResult<&'static str> {
        Ok(self.instance(id)?.class)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Instances that only live as long as script can reach them. Nothing in
    /// the host keeps their ids apart from pending deferred actions.
    pub fn is_transient(&self, id: InstanceId) -> bool {
        matches!(
            self.instances.get(&id).map(|instance| &instance.state),
            Some(
                InstanceState::Event(_)
                    | InstanceState::DomException { .. }
                    | InstanceState::Enumerator
                    | InstanceState::Coordinates(_)
            )
        )
    }

    /// Forget a transient instance whose script object has been collected.
    /// Returns false when the instance is kept.
    pub fn release_transient(&mut self, id: InstanceId) -> bool {
        if !self.is_transient(id) || self.deferred.references(id) {
            return false;
        }
        self.instances.remove(&id).is_some()
    }

    pub fn create_instance(&mut self, class: &'static str, state: InstanceState) -> InstanceId {
        let id = InstanceId(self.next_instance);
        self.next_instance += 1;
        self.instances.insert(id, HostInstance::new(class, state));
        id
    }

    /// Per-window singleton such as `location` or `crypto.subtle`.
    pub fn singleton(
        &mut self,
        class: &'static str,
        state: impl FnOnce() -> InstanceState,
    ) -> InstanceId {
        if let Some(id) = self.singletons.get(class) {
            return *id;
        }
        let id = self.create_instance(class, state());
        self.singletons.insert(class, id);
        id
    }

    /// The wrapper instance of a DOM node; created on first access, at most one per node.
    pub fn instance_for_node(&mut self, node: NodeId) -> HostResult<InstanceId> {
        if let Some(id) = self.node_instances.get(&node) {
            if self.instances.contains_key(id) {
                return Ok(*id);
            }
        }
        let class = self.class_for_node(&self.dom.node(node)?);
        self.bind_node_instance(class, node, InstanceState::Node)
    }

    /// Create the wrapper of `node` with an explicit class and state. The
    /// instance holds a strong reference, so freshly created nodes stay alive.
    pub fn bind_node_instance(
        &mut self,
        class: &'static str,
        node: NodeId,
        state: InstanceState,
    ) -> HostResult<InstanceId> {
        let node_ref = self.dom.node(node)?;
        let id = self.create_instance(class, state);
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.node = Some((node, node_ref));
        }
        self.node_instances.insert(node, id);
        Ok(id)
    }

    pub fn wrap_node(&mut self, node: Option<NodeId>) -> HostResult<HostValue> {
        match node {
            Some(node) => Ok(HostValue::Object(self.instance_for_node(node)?)),
            None => Ok(HostValue::Null),
        }
    }

    pub fn wrap_nodes(&mut self, nodes: Vec<NodeId>) -> HostResult<HostValue> {
        let mut wrapped = Vec::with_capacity(nodes.len());
        for node in nodes {
            wrapped.push(HostValue::Object(self.instance_for_node(node)?));
        }
        Ok(HostValue::List(wrapped))
    }

    /// DOM node behind an instance. Instances without one cannot serve node members.
    pub fn node_of(&self, id: InstanceId) -> HostResult<NodeId> {
        let node = self
            .instance(id)?
            .node_id()
            .ok_or_else(|| HostError::type_mismatch("Illegal invocation"))?;
        self.dom.node(node)?;
        Ok(node)
    }

    fn class_for_node(&self, node: &NodeRef) -> &'static str {
        match node.data() {
            NodeData::Element(element) => {
                let namespace = match &*element.name.ns {
                    HTML_NAMESPACE => DomNamespace::Html,
                    SVG_NAMESPACE => DomNamespace::Svg,
                    _ => return "Element",
                };
                self.catalogue
                    .wrapper_class_for(namespace, &element.name.local, &self.profile)
            }
            NodeData::Text(_) => "Text",
            NodeData::Comment(_) => "Comment",
            NodeData::Document(_) => "Document",
            NodeData::DocumentFragment => "DocumentFragment",
            NodeData::Doctype(_) => "DocumentType",
            NodeData::ProcessingInstruction(_) => "Node",
        }
    }

    pub fn document_instance(&mut self) -> HostResult<InstanceId> {
        self.instance_for_node(self.document)
    }

    pub fn serialize_options(&self) -> SerializeOptions {
        let mut forbidden_end_tags = Vec::new();
        if self.profile.has(FeatureTag::HtmlbasefontEndTagForbidden) {
            forbidden_end_tags.push("basefont");
        }
        if self.profile.has(FeatureTag::HtmlkeygenEndTagForbidden) {
            forbidden_end_tags.push("keygen");
        }
        SerializeOptions { forbidden_end_tags }
    }

    /// Attribute write used by every host member, followed by the attribute
    /// change steps (slot bookkeeping).
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> HostResult<()> {
        let previous = self.dom.set_attr(node, name, value)?;
        self.attribute_changed(node, name, previous.as_deref(), Some(value))
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> HostResult<()> {
        let previous = self.dom.remove_attr(node, name)?;
        if previous.is_some() {
            self.attribute_changed(node, name, previous.as_deref(), None)?;
        }
        Ok(())
    }

    fn attribute_changed(
        &mut self,
        node: NodeId,
        name: &str,
        previous: Option<&str>,
        current: Option<&str>,
    ) -> HostResult<()> {
        if previous == current {
            return Ok(());
        }
        if name.eq_ignore_ascii_case("slot") {
            if let Some(parent) = self.dom.parent(node)? {
                self.reassign_for_host(parent)?;
            }
        } else if name.eq_ignore_ascii_case("name")
            && self.dom.local_name(node)?.as_deref() == Some("slot")
        {
            self.reassign_for_tree_of(node)?;
        }
        Ok(())
    }

    /// Child list of `parent` changed: slots of affected shadow trees are recomputed.
    pub fn children_changed(&mut self, parent: NodeId) -> HostResult<()> {
        self.reassign_for_host(parent)?;
        self.reassign_for_tree_of(parent)
    }

    pub fn new_dom_exception(&mut self, name: &str, message: &str) -> InstanceId {
        self.create_instance(
            "DOMException",
            InstanceState::DomException {
                name: name.to_string(),
                message: message.to_string(),
            },
        )
    }

    /// Tear the window down: pending deferred actions are cancelled and every
    /// instance is released.
    pub fn discard(&mut self) {
        if self.discarded {
            return;
        }
        let cancelled = self.deferred.cancel_all();
        tracing::debug!(
            target: "hostbridge::host",
            cancelled,
            instances = self.instances.len(),
            "discarding window"
        );
        self.instances.clear();
        self.node_instances.clear();
        self.singletons.clear();
        self.shadow_by_host.clear();
        self.shadow_by_fragment.clear();
        self.slots.clear();
        self.style_sheets.clear();
        self.style_declarations.clear();
        self.implementations.clear();
        self.dom.discard();
        self.discarded = true;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn window(html: &str, profile: BrowserProfile) -> WindowHost {
        let catalogue = Catalogue::builtin().expect("builtin catalogue");
        let url = Url::parse("http://localhost/page.html").expect("url");
        WindowHost::new(html, profile, catalogue, url)
    }

    pub fn element(host: &mut WindowHost, id: &str) -> InstanceId {
        let document = host.document();
        let node = host
            .dom_mut()
            .element_by_id(document, id)
            .expect("lookup")
            .expect("element present");
        host.instance_for_node(node).expect("instance")
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{element, window};
    use super::*;

    #[test]
    fn one_wrapper_per_node() {
        let mut host = window("<div id=a></div>", BrowserProfile::chrome());
        let first = element(&mut host, "a");
        let second = element(&mut host, "a");
        assert_eq!(first, second);
        assert_eq!(host.class_of(first).expect("class"), "HTMLDivElement");
    }

    #[test]
    fn marquee_wrapper_depends_on_profile() {
        let html = "<marquee id=m></marquee>";
        let mut firefox = window(html, BrowserProfile::firefox_esr());
        let id = element(&mut firefox, "m");
        assert_eq!(firefox.class_of(id).expect("class"), "HTMLDivElement");

        let mut chrome = window(html, BrowserProfile::chrome());
        let id = element(&mut chrome, "m");
        assert_eq!(chrome.class_of(id).expect("class"), "HTMLElement");
    }

    #[test]
    fn transient_instances_are_released_unless_still_queued() {
        let mut host = window("<p id=p></p>", BrowserProfile::chrome());
        let p = element(&mut host, "p");
        let kept = host.new_dom_exception("NotSupportedError", "queued");
        let dropped = host.new_dom_exception("NotSupportedError", "dropped");
        host.deferred_mut().push(DeferredAction::InvokeCallback {
            callback: CallbackId(0),
            this: None,
            args: vec![HostValue::Object(kept)],
        });

        assert!(!host.release_transient(p), "node wrappers are never transient");
        assert!(!host.release_transient(kept));
        assert!(host.release_transient(dropped));
        assert_eq!(host.class_of(dropped), Err(HostError::DomDetached));

        host.next_deferred();
        assert!(host.release_transient(kept));
    }

    #[test]
    fn discard_detaches_everything() {
        let mut host = window("<p id=p></p>", BrowserProfile::chrome());
        let p = element(&mut host, "p");
        host.deferred_mut().push(DeferredAction::DispatchEvent {
            target: WINDOW,
            event: p,
        });
        host.discard();
        assert!(host.next_deferred().is_none());
        assert_eq!(host.node_of(p), Err(HostError::DomDetached));
    }
}
