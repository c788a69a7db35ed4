//! Host-object catalogue.
//!
//! Every script-visible class is declared once, engine-independently, by the
//! host modules (see [`crate::host::builtin_descriptors`]). The catalogue
//! validates the declarations, orders them so superclasses come first and
//! flattens each class's effective member list. The builtin catalogue is process-wide and immutable.

mod descriptor;

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::error::{HostError, HostResult};
use crate::profile::{BrowserCondition, BrowserProfile};

pub use descriptor::{
    AsyncHostFn, ConstantValue, ConstructorKind, ConstructorRule, DomKind, DomNamespace,
    FunctionImpl, HostClassDescriptor, HostFn, Hook, MemberDescriptor, MemberKind, PrototypeBase,
};

/// A member as seen from a class, with the class that declared it.
#[derive(Debug, Clone)]
pub struct EffectiveMember {
    pub declared_by: &'static str,
    pub member: MemberDescriptor,
}

#[derive(Debug)]
pub struct Catalogue {
    descriptors: Vec<HostClassDescriptor>,
    by_name: HashMap<&'static str, usize>,
    order: Vec<usize>,
    effective: Vec<Vec<EffectiveMember>>,
}

static BUILTIN: OnceLock<Result<Catalogue, HostError>> = OnceLock::new();

impl Catalogue {
    /// The catalogue of every builtin host class, built on first use.
    pub fn builtin() -> HostResult<&'static Catalogue> {
        BUILTIN
            .get_or_init(|| {
                let catalogue = Catalogue::build(crate::host::builtin_descriptors());
                match &catalogue {
                    Ok(catalogue) => tracing::debug!(
                        target: "hostbridge::catalogue",
                        classes = catalogue.descriptors.len(),
                        "host catalogue built"
                    ),
                    Err(err) => tracing::error!(
                        target: "hostbridge::catalogue",
                        error = %err,
                        "host catalogue rejected"
                    ),
                }
                catalogue
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn build(descriptors: Vec<HostClassDescriptor>) -> HostResult<Self> {
        let mut by_name = HashMap::new();
        for (index, descriptor) in descriptors.iter().enumerate() {
            if by_name.insert(descriptor.name, index).is_some() {
                return Err(inconsistent(format!(
                    "duplicate host class name '{}'",
                    descriptor.name
                )));
            }
        }

        for descriptor in &descriptors {
            validate_descriptor(descriptor, &descriptors, &by_name)?;
        }

        let order = topological_order(&descriptors, &by_name)?;

        let mut effective: Vec<Vec<EffectiveMember>> = vec![Vec::new(); descriptors.len()];
        for &index in &order {
            let descriptor = &descriptors[index];
            let mut members = match descriptor.superclass {
                Some(parent) => effective[by_name[parent]].clone(),
                None => Vec::new(),
            };
            let own_keys: HashSet<(&str, MemberKind)> = descriptor
                .members
                .iter()
                .map(|member| (member.name(), member.kind()))
                .collect();
            members.retain(|inherited| {
                !own_keys.contains(&(inherited.member.name(), inherited.member.kind()))
            });
            members.extend(descriptor.members.iter().cloned().map(|member| EffectiveMember {
                declared_by: descriptor.name,
                member,
            }));
            effective[index] = members;
        }

        Ok(Self {
            descriptors,
            by_name,
            order,
            effective,
        })
    }

    pub fn all_descriptors(&self) -> impl Iterator<Item = &HostClassDescriptor> {
        self.descriptors.iter()
    }

    /// Descriptors with every superclass ahead of its subclasses.
    pub fn topological(&self) -> impl Iterator<Item = &HostClassDescriptor> {
        self.order.iter().map(move |&index| &self.descriptors[index])
    }

    pub fn descriptor_by_name(&self, name: &str) -> Option<&HostClassDescriptor> {
        self.by_name.get(name).map(|&index| &self.descriptors[index])
    }

    /// Most specific visible claim wins; declaration order breaks ties.
    pub fn descriptor_for_dom_kind(
        &self,
        kind: &DomKind,
        profile: &BrowserProfile,
    ) -> Option<&HostClassDescriptor> {
        self.descriptor_for_element(kind.namespace, kind.local_name, profile)
    }

    pub fn descriptor_for_element(
        &self,
        namespace: DomNamespace,
        local_name: &str,
        profile: &BrowserProfile,
    ) -> Option<&HostClassDescriptor> {
        let mut best: Option<(&HostClassDescriptor, usize)> = None;
        for descriptor in &self.descriptors {
            if !descriptor.is_visible(profile) {
                continue;
            }
            let Some(gate) = descriptor.claim_gate(namespace, local_name) else {
                continue;
            };
            if !gate.matches(profile) {
                continue;
            }
            let breadth = gate.breadth();
            if best.map(|(_, current)| breadth < current).unwrap_or(true) {
                best = Some((descriptor, breadth));
            }
        }
        best.map(|(descriptor, _)| descriptor)
    }

    /// Class wrapping an element; generic HTML/SVG classes when nothing claims it.
    pub fn wrapper_class_for(
        &self,
        namespace: DomNamespace,
        local_name: &str,
        profile: &BrowserProfile,
    ) -> &'static str {
        if let Some(descriptor) = self.descriptor_for_element(namespace, local_name, profile) {
            return descriptor.name;
        }
        match namespace {
            DomNamespace::Html => "HTMLElement",
            DomNamespace::Svg => "SVGElement",
        }
    }

    pub fn effective_members(&self, name: &str) -> &[EffectiveMember] {
        self.by_name
            .get(name)
            .map(|&index| self.effective[index].as_slice())
            .unwrap_or(&[])
    }

    /// Effective members visible under `profile`. Alternatives sharing a
    /// `(name, kind)` resolve to the first visible one.
    pub fn visible_members(&self, name: &str, profile: &BrowserProfile) -> Vec<&EffectiveMember> {
        let Some(descriptor) = self.descriptor_by_name(name) else {
            return Vec::new();
        };
        if !descriptor.is_visible(profile) {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        self.effective_members(name)
            .iter()
            .filter(|entry| entry.member.gate().matches(profile))
            .filter(|entry| seen.insert((entry.member.name(), entry.member.kind())))
            .collect()
    }

    pub fn find_member(
        &self,
        class: &str,
        member: &str,
        profile: &BrowserProfile,
    ) -> Option<&EffectiveMember> {
        self.visible_members(class, profile)
            .into_iter()
            .find(|entry| entry.member.name() == member)
    }

    /// `class` itself followed by its superclasses.
    pub fn ancestry<'a>(
        &'a self,
        class: &'a str,
    ) -> impl Iterator<Item = &'a HostClassDescriptor> + 'a {
        let mut next = self.descriptor_by_name(class);
        std::iter::from_fn(move || {
            let current = next?;
            next = current
                .superclass
                .and_then(|parent| self.descriptor_by_name(parent));
            Some(current)
        })
    }

    pub fn is_a(&self, class: &str, ancestor: &str) -> bool {
        self.ancestry(class).any(|descriptor| descriptor.name == ancestor)
    }
}

fn inconsistent(message: String) -> HostError {
    HostError::CatalogueInconsistent(message)
}

fn validate_descriptor(
    descriptor: &HostClassDescriptor,
    descriptors: &[HostClassDescriptor],
    by_name: &HashMap<&'static str, usize>,
) -> HostResult<()> {
    if let Some(parent) = descriptor.superclass {
        let Some(&parent_index) = by_name.get(parent) else {
            return Err(inconsistent(format!(
                "'{}' extends unknown class '{parent}'",
                descriptor.name
            )));
        };
        let parent_gate = descriptors[parent_index].gate;
        if !descriptor.gate.is_within(parent_gate) {
            return Err(inconsistent(format!(
                "'{}' is visible where its superclass '{parent}' is not",
                descriptor.name
            )));
        }
    }

    let mut gates_by_key: HashMap<(&str, MemberKind), Vec<BrowserCondition>> = HashMap::new();
    for member in &descriptor.members {
        if !member.gate().overlaps(descriptor.gate) {
            return Err(inconsistent(format!(
                "member '{}.{}' is never visible",
                descriptor.name,
                member.name()
            )));
        }
        let gates = gates_by_key
            .entry((member.name(), member.kind()))
            .or_default();
        if gates.iter().any(|gate| gate.overlaps(member.gate())) {
            return Err(inconsistent(format!(
                "member '{}.{}' is declared twice for the same profiles",
                descriptor.name,
                member.name()
            )));
        }
        gates.push(member.gate());
    }

    for (kind, gate) in &descriptor.dom_kinds {
        if !gate.overlaps(descriptor.gate) {
            return Err(inconsistent(format!(
                "'{}' claims <{}> for profiles where it is not visible",
                descriptor.name, kind.local_name
            )));
        }
    }
    Ok(())
}

fn topological_order(
    descriptors: &[HostClassDescriptor],
    by_name: &HashMap<&'static str, usize>,
) -> HostResult<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; descriptors.len()];
    let mut order = Vec::with_capacity(descriptors.len());

    for start in 0..descriptors.len() {
        let mut chain = Vec::new();
        let mut cursor = Some(start);
        while let Some(index) = cursor {
            match marks[index] {
                Mark::Done => break,
                Mark::InProgress => {
                    return Err(inconsistent(format!(
                        "cyclic inheritance through '{}'",
                        descriptors[index].name
                    )))
                }
                Mark::Unvisited => {
                    marks[index] = Mark::InProgress;
                    chain.push(index);
                    cursor = descriptors[index]
                        .superclass
                        .and_then(|parent| by_name.get(parent).copied());
                }
            }
        }
        for index in chain.into_iter().rev() {
            marks[index] = Mark::Done;
            order.push(index);
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostResult;
    use crate::host::{HostCall, HostValue};

    fn noop(_call: &mut HostCall<'_>) -> HostResult<HostValue> {
        Ok(HostValue::Undefined)
    }

    #[test]
    fn rejects_unknown_superclass() {
        let err = Catalogue::build(vec![HostClassDescriptor::new("A").extends("Missing")])
            .expect_err("unknown superclass");
        assert!(matches!(err, HostError::CatalogueInconsistent(_)));
    }

    #[test]
    fn rejects_cycles_and_duplicates() {
        let cyclic = Catalogue::build(vec![
            HostClassDescriptor::new("A").extends("B"),
            HostClassDescriptor::new("B").extends("A"),
        ]);
        assert!(matches!(cyclic, Err(HostError::CatalogueInconsistent(m)) if m.contains("cyclic")));

        let duplicate = Catalogue::build(vec![
            HostClassDescriptor::new("A"),
            HostClassDescriptor::new("A"),
        ]);
        assert!(matches!(duplicate, Err(HostError::CatalogueInconsistent(m)) if m.contains("duplicate")));
    }

    #[test]
    fn subclass_overrides_by_name_and_kind() {
        let catalogue = Catalogue::build(vec![
            HostClassDescriptor::new("Child")
                .extends("Base")
                .property("value", noop, None),
            HostClassDescriptor::new("Base")
                .property("value", noop, None)
                .function("value", 0, noop)
                .constant("LIMIT", 3),
        ])
        .expect("catalogue");

        let names: Vec<_> = catalogue.topological().map(|d| d.name).collect();
        assert_eq!(names, vec!["Base", "Child"]);

        let members = catalogue.effective_members("Child");
        assert_eq!(members.len(), 3);
        let property = members
            .iter()
            .find(|entry| entry.member.kind() == MemberKind::Property)
            .expect("property");
        assert_eq!(property.declared_by, "Child");
    }

    #[test]
    fn members_never_widen_their_class() {
        let catalogue = Catalogue::build(vec![HostClassDescriptor::new("IeOnly")
            .visible_in(BrowserCondition::IE)
            .property("anything", noop, None)])
        .expect("catalogue");
        assert!(catalogue
            .visible_members("IeOnly", &BrowserProfile::chrome())
            .is_empty());
        assert_eq!(
            catalogue
                .visible_members("IeOnly", &BrowserProfile::internet_explorer())
                .len(),
            1
        );

        let dead = Catalogue::build(vec![HostClassDescriptor::new("IeOnly")
            .visible_in(BrowserCondition::IE)
            .property("chromeThing", noop, None)
            .only(BrowserCondition::Chrome)]);
        assert!(dead.is_err());
    }

    #[test]
    fn most_specific_claim_wins() {
        let catalogue = Catalogue::build(vec![
            HostClassDescriptor::new("Generic").wraps(DomKind::html("x-box"), BrowserCondition::Any),
            HostClassDescriptor::new("FirefoxBox").wraps(DomKind::html("x-box"), BrowserCondition::FF),
            HostClassDescriptor::new("LateFirefoxBox")
                .wraps(DomKind::html("x-box"), BrowserCondition::FF),
        ])
        .expect("catalogue");
        let kind = DomKind::html("x-box");
        assert_eq!(
            catalogue
                .descriptor_for_dom_kind(&kind, &BrowserProfile::firefox())
                .map(|d| d.name),
            Some("FirefoxBox")
        );
        assert_eq!(
            catalogue
                .descriptor_for_dom_kind(&kind, &BrowserProfile::chrome())
                .map(|d| d.name),
            Some("Generic")
        );
    }
}
