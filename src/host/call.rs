use crate::dom::NodeId;
use crate::error::{HostError, HostResult};
use crate::profile::BrowserProfile;

use super::{CallbackId, HostValue, InstanceId, WindowHost};

static UNDEFINED: HostValue = HostValue::Undefined;

/// Member name used for constructor invocations.
pub const CONSTRUCTOR: &str = "constructor";

/// Result of an async-declared member.
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncOutcome {
    /// Settle a promise with this result.
    Settled(HostResult<HostValue>),
    /// The member queued its callback on the deferred queue; script receives `undefined`.
    Scheduled,
}

/// One invocation of a host member: receiver, arguments and the window state.
pub struct HostCall<'a> {
    pub host: &'a mut WindowHost,
    pub this: InstanceId,
    /// Class that declared the member (or the constructed class).
    pub class: &'static str,
    pub member: &'static str,
    pub args: Vec<HostValue>,
}

impl<'a> HostCall<'a> {
    pub fn new(
        host: &'a mut WindowHost,
        this: InstanceId,
        class: &'static str,
        member: &'static str,
        args: Vec<HostValue>,
    ) -> Self {
        Self {
            host,
            this,
            class,
            member,
            args,
        }
    }

    pub fn profile(&self) -> &BrowserProfile {
        self.host.profile()
    }

    pub fn arg(&self, index: usize) -> &HostValue {
        self.args.get(index).unwrap_or(&UNDEFINED)
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    pub fn string_arg(&self, index: usize) -> String {
        self.arg(index).to_display_string()
    }

    /// `undefined` and `null` read as absent.
    pub fn optional_string(&self, index: usize) -> Option<String> {
        let value = self.arg(index);
        if value.is_nullish() {
            None
        } else {
            Some(value.to_display_string())
        }
    }

    pub fn bool_arg(&self, index: usize) -> bool {
        self.arg(index).truthy()
    }

    pub fn number_arg(&self, index: usize) -> f64 {
        self.arg(index).to_number()
    }

    pub fn object_arg(&self, index: usize) -> Option<InstanceId> {
        self.arg(index).as_object()
    }

    pub fn callback_arg(&self, index: usize) -> Option<CallbackId> {
        self.arg(index).as_callback()
    }

    /// DOM node behind an object argument; anything else is a type error.
    pub fn node_arg(&self, index: usize) -> HostResult<NodeId> {
        match self.object_arg(index) {
            Some(instance) if self.host.instance(instance)?.node_id().is_some() => {
                self.host.node_of(instance)
            }
            _ => Err(HostError::type_mismatch(format!(
                "Failed to execute '{}' on '{}': parameter {} is not of type 'Node'.",
                self.member,
                self.class,
                index + 1
            ))),
        }
    }

    /// The DOM node behind the receiver.
    pub fn node(&self) -> HostResult<NodeId> {
        self.host.node_of(self.this)
    }

    /// Raise the engine's usual arity error when too few arguments were passed.
    pub fn require_args(&self, required: usize) -> HostResult<()> {
        if self.args.len() >= required {
            return Ok(());
        }
        let noun = if required == 1 { "argument" } else { "arguments" };
        let context = if self.member == CONSTRUCTOR {
            format!("Failed to construct '{}'", self.class)
        } else {
            format!("Failed to execute '{}' on '{}'", self.member, self.class)
        };
        Err(HostError::type_mismatch(format!(
            "{context}: {required} {noun} required, but only {} present.",
            self.args.len()
        )))
    }
}
