use std::cell::RefCell;
use std::collections::HashMap;

use rquickjs::function::This;
use rquickjs::{Array, Ctx, Function, IntoJs, Object, Persistent, Value};

use crate::error::{HostError, ScriptSurface};
use crate::host::{CallbackId, HostValue, InstanceId, WindowHost, WINDOW};

/// Hidden own property tagging a script object with its host instance.
pub(crate) const HOST_ID_KEY: &str = "__hostId";
const CALLBACK_KEY: &str = "__hostCallback";

/// Plain objects nested deeper than this convert to `undefined`.
const MAX_DEPTH: usize = 16;

/// Per-window state shared by every binding closure.
///
/// The engine handles kept here pin script objects; [`Bindings::release`]
/// must run before the runtime is dropped. Wrappers of transient instances
/// are only held through a `WeakRef`, so script decides their lifetime.
pub(crate) struct Bindings {
    pub host: RefCell<WindowHost>,
    wrappers: RefCell<HashMap<InstanceId, Persistent<Object<'static>>>>,
    weak_wrappers: RefCell<HashMap<InstanceId, Persistent<Object<'static>>>>,
    weak_ref: RefCell<Option<Persistent<Function<'static>>>>,
    prototypes: RefCell<HashMap<&'static str, Persistent<Object<'static>>>>,
    callbacks: RefCell<Vec<Persistent<Function<'static>>>>,
    errors: RefCell<Vec<String>>,
}

impl Bindings {
    pub fn new(host: WindowHost) -> Self {
        Self {
            host: RefCell::new(host),
            wrappers: RefCell::new(HashMap::new()),
            weak_wrappers: RefCell::new(HashMap::new()),
            weak_ref: RefCell::new(None),
            prototypes: RefCell::new(HashMap::new()),
            callbacks: RefCell::new(Vec::new()),
            errors: RefCell::new(Vec::new()),
        }
    }

    pub fn register_prototype<'js>(
        &self,
        ctx: &Ctx<'js>,
        class: &'static str,
        proto: &Object<'js>,
    ) {
        self.prototypes
            .borrow_mut()
            .insert(class, Persistent::save(ctx, proto.clone()));
    }

    pub fn prototype<'js>(
        &self,
        ctx: &Ctx<'js>,
        class: &str,
    ) -> rquickjs::Result<Option<Object<'js>>> {
        let saved = self.prototypes.borrow().get(class).cloned();
        saved.map(|proto| proto.restore(ctx)).transpose()
    }

    /// Prototype of the nearest materialised class in `class`'s ancestry.
    fn prototype_for_class<'js>(
        &self,
        ctx: &Ctx<'js>,
        class: &str,
    ) -> rquickjs::Result<Option<Object<'js>>> {
        let catalogue = self.host.borrow().catalogue();
        for descriptor in catalogue.ancestry(class) {
            if let Some(proto) = self.prototype(ctx, descriptor.name)? {
                return Ok(Some(proto));
            }
        }
        Ok(None)
    }

    /// The unique script object of `id`, created on first use.
    pub fn wrapper<'js>(&self, ctx: &Ctx<'js>, id: InstanceId) -> rquickjs::Result<Value<'js>> {
        if id == WINDOW {
            return Ok(ctx.globals().into_value());
        }
        let cached = self.wrappers.borrow().get(&id).cloned();
        if let Some(saved) = cached {
            return Ok(saved.restore(ctx)?.into_value());
        }
        let weak = self.weak_wrappers.borrow().get(&id).cloned();
        if let Some(saved) = weak {
            let target = deref_weak(&saved.restore(ctx)?)?;
            if !target.is_undefined() {
                return Ok(target);
            }
        }

        let (class, transient) = {
            let host = self.host.borrow();
            (host.class_of(id), host.is_transient(id))
        };
        let class = match class {
            Ok(class) => class,
            Err(err) => return Err(throw_host_error(ctx, self, &err)),
        };
        let object = Object::new(ctx.clone())?;
        if let Some(proto) = self.prototype_for_class(ctx, class)? {
            object.set_prototype(Some(&proto))?;
        }
        define_value(ctx, &object, HOST_ID_KEY, id.0.into_js(ctx)?, Attributes::HIDDEN)?;
        if transient {
            let weak = self.weak_ref_factory(ctx)?.call::<_, Object>((object.clone(),))?;
            self.weak_wrappers
                .borrow_mut()
                .insert(id, Persistent::save(ctx, weak));
        } else {
            self.wrappers
                .borrow_mut()
                .insert(id, Persistent::save(ctx, object.clone()));
        }
        Ok(object.into_value())
    }

    fn weak_ref_factory<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<Function<'js>> {
        let saved = self.weak_ref.borrow().clone();
        if let Some(saved) = saved {
            return saved.restore(ctx);
        }
        let factory: Function =
            ctx.eval("(function (target) { return new WeakRef(target); })")?;
        *self.weak_ref.borrow_mut() = Some(Persistent::save(ctx, factory.clone()));
        Ok(factory)
    }

    /// Release the host instances whose transient wrappers have been
    /// collected. Returns how many instances were dropped.
    pub fn sweep(&self, ctx: &Ctx<'_>) -> rquickjs::Result<usize> {
        let tracked: Vec<_> = self
            .weak_wrappers
            .borrow()
            .iter()
            .map(|(id, weak)| (*id, weak.clone()))
            .collect();
        let mut released = 0;
        for (id, weak) in tracked {
            if !deref_weak(&weak.restore(ctx)?)?.is_undefined() {
                continue;
            }
            self.weak_wrappers.borrow_mut().remove(&id);
            if self.host.borrow_mut().release_transient(id) {
                released += 1;
            }
        }
        Ok(released)
    }

    pub fn callback<'js>(
        &self,
        ctx: &Ctx<'js>,
        id: CallbackId,
    ) -> rquickjs::Result<Option<Function<'js>>> {
        let saved = self.callbacks.borrow().get(id.0 as usize).cloned();
        saved.map(|callback| callback.restore(ctx)).transpose()
    }

    /// Retain `function` and return its stable id; the same function always
    /// maps to the same id.
    fn register_callback<'js>(
        &self,
        ctx: &Ctx<'js>,
        value: &Value<'js>,
        function: &Function<'js>,
    ) -> rquickjs::Result<CallbackId> {
        let Some(object) = value.as_object() else {
            return Err(rquickjs::Error::new_from_js("value", "function"));
        };
        if let Some(existing) = object.get::<_, Option<u32>>(CALLBACK_KEY)? {
            return Ok(CallbackId(existing));
        }
        let id = {
            let mut callbacks = self.callbacks.borrow_mut();
            callbacks.push(Persistent::save(ctx, function.clone()));
            CallbackId((callbacks.len() - 1) as u32)
        };
        define_value(ctx, object, CALLBACK_KEY, id.0.into_js(ctx)?, Attributes::HIDDEN)?;
        Ok(id)
    }

    /// The engine's runtime error channel: logged and kept for inspection.
    pub fn report_runtime_error(&self, message: String) {
        tracing::error!(target: "quickjs", error = %message, "uncaught script error");
        self.errors.borrow_mut().push(message);
    }

    pub fn runtime_errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }

    /// Drop every engine handle. Returns how many were held.
    pub fn release(&self) -> usize {
        let wrappers = self.wrappers.borrow_mut().drain().count()
            + self.weak_wrappers.borrow_mut().drain().count()
            + usize::from(self.weak_ref.borrow_mut().take().is_some());
        let prototypes = self.prototypes.borrow_mut().drain().count();
        let callbacks = self.callbacks.borrow_mut().drain(..).count();
        wrappers + prototypes + callbacks
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Attributes {
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
}

impl Attributes {
    pub const HIDDEN: Self = Self {
        writable: false,
        enumerable: false,
        configurable: false,
    };
    /// Operations and interface objects.
    pub const METHOD: Self = Self {
        writable: true,
        enumerable: true,
        configurable: true,
    };
    pub const CONSTANT: Self = Self {
        writable: false,
        enumerable: true,
        configurable: false,
    };
    pub const GLOBAL: Self = Self {
        writable: true,
        enumerable: false,
        configurable: true,
    };
}

fn define_property<'js>(
    ctx: &Ctx<'js>,
    target: &Object<'js>,
    key: &str,
    descriptor: Object<'js>,
) -> rquickjs::Result<()> {
    let object_ctor: Object = ctx.globals().get("Object")?;
    let define: Function = object_ctor.get("defineProperty")?;
    define.call::<_, Value>((target.clone(), key, descriptor))?;
    Ok(())
}

pub(crate) fn define_value<'js>(
    ctx: &Ctx<'js>,
    target: &Object<'js>,
    key: &str,
    value: Value<'js>,
    attributes: Attributes,
) -> rquickjs::Result<()> {
    let descriptor = Object::new(ctx.clone())?;
    descriptor.set("value", value)?;
    descriptor.set("writable", attributes.writable)?;
    descriptor.set("enumerable", attributes.enumerable)?;
    descriptor.set("configurable", attributes.configurable)?;
    define_property(ctx, target, key, descriptor)
}

pub(crate) fn define_accessor<'js>(
    ctx: &Ctx<'js>,
    target: &Object<'js>,
    key: &str,
    getter: Function<'js>,
    setter: Option<Function<'js>>,
    enumerable: bool,
) -> rquickjs::Result<()> {
    let descriptor = Object::new(ctx.clone())?;
    descriptor.set("get", getter)?;
    if let Some(setter) = setter {
        descriptor.set("set", setter)?;
    }
    descriptor.set("enumerable", enumerable)?;
    descriptor.set("configurable", true)?;
    define_property(ctx, target, key, descriptor)
}

/// Target of a `WeakRef`, or `undefined` once it has been collected.
fn deref_weak<'js>(weak: &Object<'js>) -> rquickjs::Result<Value<'js>> {
    let deref: Function = weak.get("deref")?;
    deref.call((This(weak.clone()),))
}

/// Host instance tagged on a script value, if any.
pub(crate) fn instance_of(value: &Value<'_>) -> rquickjs::Result<Option<InstanceId>> {
    let Some(object) = value.as_object() else {
        return Ok(None);
    };
    Ok(object
        .get::<_, Option<u32>>(HOST_ID_KEY)?
        .map(InstanceId))
}

pub(crate) fn to_js<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    value: HostValue,
) -> rquickjs::Result<Value<'js>> {
    Ok(match value {
        HostValue::Undefined => Value::new_undefined(ctx.clone()),
        HostValue::Null => Value::new_null(ctx.clone()),
        HostValue::Bool(value) => Value::new_bool(ctx.clone(), value),
        HostValue::Number(value) => Value::new_number(ctx.clone(), value),
        HostValue::Str(value) => value.into_js(ctx)?,
        HostValue::Object(id) => bindings.wrapper(ctx, id)?,
        HostValue::Callback(id) => match bindings.callback(ctx, id)? {
            Some(function) => function.into_value(),
            None => Value::new_null(ctx.clone()),
        },
        HostValue::List(items) => {
            let array = Array::new(ctx.clone())?;
            for (index, item) in items.into_iter().enumerate() {
                array.set(index, to_js(ctx, bindings, item)?)?;
            }
            array.into_value()
        }
        HostValue::Dict(entries) => {
            let object = Object::new(ctx.clone())?;
            for (key, item) in entries {
                object.set(key, to_js(ctx, bindings, item)?)?;
            }
            object.into_value()
        }
    })
}

pub(crate) fn from_js<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    value: &Value<'js>,
) -> rquickjs::Result<HostValue> {
    from_js_at(ctx, bindings, value, 0)
}

pub(crate) fn args_from_js<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    args: &[Value<'js>],
) -> rquickjs::Result<Vec<HostValue>> {
    args.iter().map(|arg| from_js(ctx, bindings, arg)).collect()
}

fn from_js_at<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    value: &Value<'js>,
    depth: usize,
) -> rquickjs::Result<HostValue> {
    if value.is_undefined() {
        return Ok(HostValue::Undefined);
    }
    if value.is_null() {
        return Ok(HostValue::Null);
    }
    if let Some(flag) = value.as_bool() {
        return Ok(HostValue::Bool(flag));
    }
    if let Some(number) = value.as_int() {
        return Ok(HostValue::Number(f64::from(number)));
    }
    if let Some(number) = value.as_float() {
        return Ok(HostValue::Number(number));
    }
    if let Some(text) = value.as_string() {
        return Ok(HostValue::Str(text.to_string()?));
    }
    if let Some(function) = value.as_function() {
        return Ok(HostValue::Callback(bindings.register_callback(ctx, value, function)?));
    }
    if let Some(id) = instance_of(value)? {
        return Ok(HostValue::Object(id));
    }
    if depth >= MAX_DEPTH {
        return Ok(HostValue::Undefined);
    }
    if let Some(array) = value.as_array() {
        let mut items = Vec::with_capacity(array.len());
        for item in array.iter::<Value>() {
            items.push(from_js_at(ctx, bindings, &item?, depth + 1)?);
        }
        return Ok(HostValue::List(items));
    }
    if let Some(object) = value.as_object() {
        let mut entries = Vec::new();
        for entry in object.props::<String, Value>() {
            let (key, item) = entry?;
            entries.push((key, from_js_at(ctx, bindings, &item, depth + 1)?));
        }
        return Ok(HostValue::Dict(entries));
    }
    Ok(HostValue::Undefined)
}

/// Build the script value a host error surfaces as, without throwing it.
pub(crate) fn error_value<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    err: &HostError,
) -> rquickjs::Result<Value<'js>> {
    let message = err.to_string();
    match err.surface() {
        ScriptSurface::TypeError => {
            let constructor: Function = ctx.globals().get("TypeError")?;
            constructor.call((message,))
        }
        ScriptSurface::DomException(name) => {
            let id = bindings.host.borrow_mut().new_dom_exception(name, &message);
            bindings.wrapper(ctx, id)
        }
        ScriptSurface::Error => {
            let constructor: Function = ctx.globals().get("Error")?;
            constructor.call((message,))
        }
    }
}

/// Raise `err` in script; the returned error must be propagated to the engine.
pub(crate) fn throw_host_error(
    ctx: &Ctx<'_>,
    bindings: &Bindings,
    err: &HostError,
) -> rquickjs::Error {
    tracing::debug!(target: "quickjs", error = %err, "raising host error");
    match error_value(ctx, bindings, err) {
        Ok(value) => ctx.throw(value),
        Err(raised) => raised,
    }
}
