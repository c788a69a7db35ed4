use crate::error::HostResult;
use crate::host::{AsyncOutcome, HostCall, HostValue};
use crate::profile::{BrowserCondition, BrowserProfile, FeatureTag};

pub type HostFn = fn(&mut HostCall<'_>) -> HostResult<HostValue>;
pub type AsyncHostFn = fn(&mut HostCall<'_>) -> AsyncOutcome;

#[derive(Clone, Copy)]
pub enum FunctionImpl {
    Sync(HostFn),
    /// Must never raise; the engine turns the outcome into a promise.
    Async(AsyncHostFn),
    /// Event dispatch, carried out by the script engine itself.
    Dispatch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstantValue {
    Int(i32),
    Str(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Property,
    Function,
    Constant,
}

#[derive(Clone)]
pub enum MemberDescriptor {
    Property {
        name: &'static str,
        getter: HostFn,
        setter: Option<HostFn>,
        gate: BrowserCondition,
        enumerable: bool,
    },
    Function {
        name: &'static str,
        arity: u8,
        implementation: FunctionImpl,
        gate: BrowserCondition,
    },
    Constant {
        name: &'static str,
        value: ConstantValue,
        gate: BrowserCondition,
    },
}

impl MemberDescriptor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Property { name, .. }
            | Self::Function { name, .. }
            | Self::Constant { name, .. } => name,
        }
    }

    pub fn kind(&self) -> MemberKind {
        match self {
            Self::Property { .. } => MemberKind::Property,
            Self::Function { .. } => MemberKind::Function,
            Self::Constant { .. } => MemberKind::Constant,
        }
    }

    pub fn gate(&self) -> BrowserCondition {
        match self {
            Self::Property { gate, .. }
            | Self::Function { gate, .. }
            | Self::Constant { gate, .. } => *gate,
        }
    }

    fn set_gate(&mut self, condition: BrowserCondition) {
        match self {
            Self::Property { gate, .. }
            | Self::Function { gate, .. }
            | Self::Constant { gate, .. } => *gate = condition,
        }
    }
}

impl std::fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("gate", &self.gate())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomNamespace {
    Html,
    Svg,
}

/// Element kind a host class may wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomKind {
    pub namespace: DomNamespace,
    pub local_name: &'static str,
}

impl DomKind {
    pub const fn html(local_name: &'static str) -> Self {
        Self {
            namespace: DomNamespace::Html,
            local_name,
        }
    }

    pub const fn svg(local_name: &'static str) -> Self {
        Self {
            namespace: DomNamespace::Svg,
            local_name,
        }
    }

    pub fn matches(&self, namespace: DomNamespace, local_name: &str) -> bool {
        self.namespace == namespace && self.local_name == local_name
    }
}

#[derive(Clone, Copy)]
pub enum ConstructorKind {
    ThrowsIllegal,
    NoArgs(HostFn),
    WithSignature {
        params: &'static [&'static str],
        implementation: HostFn,
    },
}

#[derive(Clone, Copy)]
pub struct ConstructorRule {
    pub kind: ConstructorKind,
    pub gate: BrowserCondition,
}

/// Descriptor-level extras installed after the regular members.
#[derive(Clone, Copy)]
pub enum Hook {
    /// Accessor present only when the profile has `feature`.
    FeatureAccessor {
        feature: FeatureTag,
        name: &'static str,
        getter: HostFn,
        setter: Option<HostFn>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrototypeBase {
    Object,
    Error,
}

#[derive(Clone)]
pub struct HostClassDescriptor {
    pub name: &'static str,
    pub gate: BrowserCondition,
    pub superclass: Option<&'static str>,
    pub base: PrototypeBase,
    pub dom_kinds: Vec<(DomKind, BrowserCondition)>,
    pub constructors: Vec<ConstructorRule>,
    pub members: Vec<MemberDescriptor>,
    pub hooks: Vec<Hook>,
}

impl std::fmt::Debug for HostClassDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostClassDescriptor")
            .field("name", &self.name)
            .field("gate", &self.gate)
            .field("superclass", &self.superclass)
            .field("dom_kinds", &self.dom_kinds)
            .field("members", &self.members)
            .finish()
    }
}

impl HostClassDescriptor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            gate: BrowserCondition::Any,
            superclass: None,
            base: PrototypeBase::Object,
            dom_kinds: Vec::new(),
            constructors: Vec::new(),
            members: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn extends(mut self, superclass: &'static str) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn visible_in(mut self, gate: BrowserCondition) -> Self {
        self.gate = gate;
        self
    }

    pub fn error_prototype(mut self) -> Self {
        self.base = PrototypeBase::Error;
        self
    }

    pub fn wraps(mut self, kind: DomKind, gate: BrowserCondition) -> Self {
        self.dom_kinds.push((kind, gate));
        self
    }

    pub fn illegal_constructor(mut self, gate: BrowserCondition) -> Self {
        self.constructors.push(ConstructorRule {
            kind: ConstructorKind::ThrowsIllegal,
            gate,
        });
        self
    }

    pub fn constructor(mut self, implementation: HostFn, gate: BrowserCondition) -> Self {
        self.constructors.push(ConstructorRule {
            kind: ConstructorKind::NoArgs(implementation),
            gate,
        });
        self
    }

    pub fn constructor_with(
        mut self,
        params: &'static [&'static str],
        implementation: HostFn,
        gate: BrowserCondition,
    ) -> Self {
        self.constructors.push(ConstructorRule {
            kind: ConstructorKind::WithSignature {
                params,
                implementation,
            },
            gate,
        });
        self
    }

    pub fn property(mut self, name: &'static str, getter: HostFn, setter: Option<HostFn>) -> Self {
        self.members.push(MemberDescriptor::Property {
            name,
            getter,
            setter,
            gate: BrowserCondition::Any,
            enumerable: true,
        });
        self
    }

    pub fn read_only(self, name: &'static str, getter: HostFn) -> Self {
        self.property(name, getter, None)
    }

    pub fn hidden_property(
        mut self,
        name: &'static str,
        getter: HostFn,
        setter: Option<HostFn>,
        gate: BrowserCondition,
    ) -> Self {
        self.members.push(MemberDescriptor::Property {
            name,
            getter,
            setter,
            gate,
            enumerable: false,
        });
        self
    }

    pub fn function(mut self, name: &'static str, arity: u8, implementation: HostFn) -> Self {
        self.members.push(MemberDescriptor::Function {
            name,
            arity,
            implementation: FunctionImpl::Sync(implementation),
            gate: BrowserCondition::Any,
        });
        self
    }

    pub fn async_function(
        mut self,
        name: &'static str,
        arity: u8,
        implementation: AsyncHostFn,
    ) -> Self {
        self.members.push(MemberDescriptor::Function {
            name,
            arity,
            implementation: FunctionImpl::Async(implementation),
            gate: BrowserCondition::Any,
        });
        self
    }

    pub fn dispatch_function(mut self, name: &'static str) -> Self {
        self.members.push(MemberDescriptor::Function {
            name,
            arity: 1,
            implementation: FunctionImpl::Dispatch,
            gate: BrowserCondition::Any,
        });
        self
    }

    pub fn constant(mut self, name: &'static str, value: i32) -> Self {
        self.members.push(MemberDescriptor::Constant {
            name,
            value: ConstantValue::Int(value),
            gate: BrowserCondition::Any,
        });
        self
    }

    /// Narrow the gate of the most recently declared member.
    pub fn only(mut self, gate: BrowserCondition) -> Self {
        if let Some(member) = self.members.last_mut() {
            member.set_gate(gate);
        }
        self
    }

    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    pub fn hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn is_visible(&self, profile: &BrowserProfile) -> bool {
        self.gate.matches(profile)
    }

    pub fn constructor_for(&self, profile: &BrowserProfile) -> Option<&ConstructorRule> {
        self.constructors
            .iter()
            .find(|rule| rule.gate.matches(profile))
    }

    /// Gate under which this descriptor claims the element kind, if it claims it at all.
    pub fn claim_gate(
        &self,
        namespace: DomNamespace,
        local_name: &str,
    ) -> Option<BrowserCondition> {
        self.dom_kinds
            .iter()
            .find(|(candidate, _)| candidate.matches(namespace, local_name))
            .map(|(_, gate)| *gate)
    }
}
