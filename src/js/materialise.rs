use std::rc::Rc;

use rquickjs::function::{Opt, Rest, This};
use rquickjs::{Ctx, Function, IntoJs, Object, Value};

use crate::catalogue::{
    ConstantValue, ConstructorKind, FunctionImpl, Hook, HostClassDescriptor, HostFn,
    MemberDescriptor, PrototypeBase,
};
use crate::error::{HostError, HostResult};
use crate::host::{HostCall, InstanceId, CONSTRUCTOR, WINDOW};
use crate::profile::BrowserProfile;

use super::async_result::invoke_async;
use super::convert::{
    args_from_js, define_accessor, define_value, instance_of, throw_host_error, to_js, Attributes,
    Bindings, HOST_ID_KEY,
};
use super::dispatch::dispatch_member;

/// Install every host class visible under the window's profile into the
/// global scope. Superclasses are always installed before their subclasses.
pub(crate) fn materialise<'js>(ctx: &Ctx<'js>, bindings: &Rc<Bindings>) -> rquickjs::Result<usize> {
    let (catalogue, profile) = {
        let host = bindings.host.borrow();
        (host.catalogue(), host.profile().clone())
    };
    let globals = ctx.globals();
    let object_proto: Object = globals.get::<_, Object>("Object")?.get("prototype")?;
    let error_proto: Object = globals.get::<_, Object>("Error")?.get("prototype")?;

    let mut installed = 0;
    for descriptor in catalogue.topological() {
        if !descriptor.is_visible(&profile) {
            continue;
        }

        let parent = match descriptor.superclass {
            Some(superclass) => bindings.prototype(ctx, superclass)?,
            None => None,
        };
        let parent = parent.unwrap_or_else(|| match descriptor.base {
            PrototypeBase::Object => object_proto.clone(),
            PrototypeBase::Error => error_proto.clone(),
        });
        let proto = Object::new(ctx.clone())?;
        proto.set_prototype(Some(&parent))?;

        let interface = interface_object(ctx, bindings, descriptor, &profile)?;
        for entry in catalogue.visible_members(descriptor.name, &profile) {
            if entry.declared_by != descriptor.name {
                continue;
            }
            install_member(ctx, bindings, &proto, &interface, descriptor.name, &entry.member)?;
        }
        for hook in &descriptor.hooks {
            install_hook(ctx, bindings, &proto, descriptor.name, hook, &profile)?;
        }

        define_value(ctx, &interface, "prototype", proto.clone().into_value(), Attributes::HIDDEN)?;
        define_value(
            ctx,
            &proto,
            "constructor",
            interface.clone().into_value(),
            Attributes::GLOBAL,
        )?;
        define_value(ctx, &globals, descriptor.name, interface.into_value(), Attributes::GLOBAL)?;
        bindings.register_prototype(ctx, descriptor.name, &proto);
        installed += 1;
    }

    if let Some(window_proto) = bindings.prototype(ctx, "Window")? {
        globals.set_prototype(Some(&window_proto))?;
    }
    define_value(ctx, &globals, HOST_ID_KEY, WINDOW.0.into_js(ctx)?, Attributes::HIDDEN)?;

    tracing::debug!(target: "quickjs", installed, profile = %profile, "materialised host classes");
    Ok(installed)
}

/// The constructor function, or a plain object for classes without one.
fn interface_object<'js>(
    ctx: &Ctx<'js>,
    bindings: &Rc<Bindings>,
    descriptor: &HostClassDescriptor,
    profile: &BrowserProfile,
) -> rquickjs::Result<Object<'js>> {
    let Some(rule) = descriptor.constructor_for(profile) else {
        return Object::new(ctx.clone());
    };
    let class = descriptor.name;
    let kind = rule.kind;
    let length = match kind {
        ConstructorKind::WithSignature { params, .. } => params.len(),
        _ => 0,
    };

    let shared = bindings.clone();
    let constructor = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, this: This<Value<'js>>, args: Rest<Value<'js>>| {
            construct(&ctx, &shared, class, kind, this.0, args.0)
        },
    )?
    .with_name(class)?
    .with_length(length)?;
    constructor.set_constructor(true);

    constructor
        .into_value()
        .into_object()
        .ok_or_else(|| rquickjs::Error::new_from_js("function", "object"))
}

fn construct<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    class: &'static str,
    kind: ConstructorKind,
    new_target: Value<'js>,
    args: Vec<Value<'js>>,
) -> rquickjs::Result<Value<'js>> {
    let (implementation, takes_args) = match kind {
        ConstructorKind::ThrowsIllegal => {
            return Err(throw_host_error(ctx, bindings, &HostError::illegal_constructor(class)))
        }
        ConstructorKind::NoArgs(implementation) => (implementation, false),
        ConstructorKind::WithSignature { implementation, .. } => (implementation, true),
    };
    // A plain call leaves the receiver unset; `new` passes the new target.
    if !new_target.is_function() {
        let err = HostError::type_mismatch(format!(
            "Failed to construct '{class}': Please use the 'new' operator, this DOM object constructor cannot be called as a function."
        ));
        return Err(throw_host_error(ctx, bindings, &err));
    }

    let args = if takes_args {
        args_from_js(ctx, bindings, &args)?
    } else {
        Vec::new()
    };
    let result = {
        let mut host = bindings.host.borrow_mut();
        let mut call = HostCall::new(&mut host, WINDOW, class, CONSTRUCTOR, args);
        implementation(&mut call)
    };
    match result {
        Ok(value) => to_js(ctx, bindings, value),
        Err(err) => Err(throw_host_error(ctx, bindings, &err)),
    }
}

fn install_member<'js>(
    ctx: &Ctx<'js>,
    bindings: &Rc<Bindings>,
    proto: &Object<'js>,
    interface: &Object<'js>,
    class: &'static str,
    member: &MemberDescriptor,
) -> rquickjs::Result<()> {
    match member {
        MemberDescriptor::Property {
            name,
            getter,
            setter,
            enumerable,
            ..
        } => install_accessor(ctx, bindings, proto, class, *name, *getter, *setter, *enumerable),
        MemberDescriptor::Function {
            name,
            arity,
            implementation,
            ..
        } => {
            let function = host_function(ctx, bindings, class, *name, *arity, *implementation)?;
            define_value(ctx, proto, name, function.into_value(), Attributes::METHOD)
        }
        MemberDescriptor::Constant { name, value, .. } => {
            let value = match *value {
                ConstantValue::Int(number) => number.into_js(ctx)?,
                ConstantValue::Str(text) => text.into_js(ctx)?,
            };
            define_value(ctx, proto, name, value.clone(), Attributes::CONSTANT)?;
            define_value(ctx, interface, name, value, Attributes::CONSTANT)
        }
    }
}

fn install_hook<'js>(
    ctx: &Ctx<'js>,
    bindings: &Rc<Bindings>,
    proto: &Object<'js>,
    class: &'static str,
    hook: &Hook,
    profile: &BrowserProfile,
) -> rquickjs::Result<()> {
    match *hook {
        Hook::FeatureAccessor {
            feature,
            name,
            getter,
            setter,
        } => {
            if !profile.has(feature) {
                return Ok(());
            }
            tracing::trace!(target: "quickjs", class, name, ?feature, "installing feature accessor");
            install_accessor(ctx, bindings, proto, class, name, getter, setter, true)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn install_accessor<'js>(
    ctx: &Ctx<'js>,
    bindings: &Rc<Bindings>,
    proto: &Object<'js>,
    class: &'static str,
    name: &'static str,
    getter: HostFn,
    setter: Option<HostFn>,
    enumerable: bool,
) -> rquickjs::Result<()> {
    let shared = bindings.clone();
    let get = Function::new(ctx.clone(), move |ctx: Ctx<'js>, this: This<Value<'js>>| {
        invoke(&ctx, &shared, class, name, getter, this.0, Vec::new())
    })?
    .with_name(&format!("get {name}"))?;

    let set = match setter {
        Some(setter) => {
            let shared = bindings.clone();
            let function = Function::new(
                ctx.clone(),
                move |ctx: Ctx<'js>, this: This<Value<'js>>, value: Opt<Value<'js>>| {
                    let value = value
                        .0
                        .unwrap_or_else(|| Value::new_undefined(ctx.clone()));
                    invoke(&ctx, &shared, class, name, setter, this.0, vec![value]).map(|_| ())
                },
            )?
            .with_name(&format!("set {name}"))?;
            Some(function)
        }
        None => None,
    };
    define_accessor(ctx, proto, name, get, set, enumerable)
}

fn host_function<'js>(
    ctx: &Ctx<'js>,
    bindings: &Rc<Bindings>,
    class: &'static str,
    name: &'static str,
    arity: u8,
    implementation: FunctionImpl,
) -> rquickjs::Result<Function<'js>> {
    let shared = bindings.clone();
    let function = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, this: This<Value<'js>>, args: Rest<Value<'js>>| match implementation {
            FunctionImpl::Sync(implementation) => {
                invoke(&ctx, &shared, class, name, implementation, this.0, args.0)
            }
            FunctionImpl::Async(implementation) => {
                invoke_async(&ctx, &shared, class, name, implementation, this.0, args.0)
            }
            FunctionImpl::Dispatch => dispatch_member(&ctx, &shared, class, this.0, args.0),
        },
    )?
    .with_name(name)?
    .with_length(usize::from(arity))?;
    Ok(function)
}

/// Resolve the instance a member was invoked on. A missing receiver means the
/// global object; anything that is not an instance of `class` is rejected.
pub(crate) fn resolve_receiver(
    bindings: &Bindings,
    class: &str,
    receiver: Option<InstanceId>,
) -> HostResult<InstanceId> {
    let host = bindings.host.borrow();
    let Some(id) = receiver else {
        return Err(HostError::type_mismatch("Illegal invocation"));
    };
    let actual = host.class_of(id)?;
    if host.catalogue().is_a(actual, class) {
        Ok(id)
    } else {
        Err(HostError::type_mismatch("Illegal invocation"))
    }
}

pub(crate) fn receiver_of(this: &Value<'_>) -> rquickjs::Result<Option<InstanceId>> {
    if this.is_undefined() || this.is_null() {
        return Ok(Some(WINDOW));
    }
    instance_of(this)
}

/// Run a synchronous host member and convert its outcome for script.
pub(crate) fn invoke<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    class: &'static str,
    member: &'static str,
    implementation: HostFn,
    this: Value<'js>,
    args: Vec<Value<'js>>,
) -> rquickjs::Result<Value<'js>> {
    let receiver = match resolve_receiver(bindings, class, receiver_of(&this)?) {
        Ok(receiver) => receiver,
        Err(err) => return Err(throw_host_error(ctx, bindings, &err)),
    };
    let args = args_from_js(ctx, bindings, &args)?;
    let result = {
        let mut host = bindings.host.borrow_mut();
        let mut call = HostCall::new(&mut host, receiver, class, member, args);
        implementation(&mut call)
    };
    match result {
        Ok(value) => to_js(ctx, bindings, value),
        Err(err) => Err(throw_host_error(ctx, bindings, &err)),
    }
}

