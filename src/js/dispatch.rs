use rquickjs::function::This;
use rquickjs::{Ctx, Value};

use crate::error::{HostError, HostResult};
use crate::host::{InstanceId, Phase, WindowHost};

use super::convert::{instance_of, throw_host_error, Bindings};
use super::materialise::{receiver_of, resolve_receiver};
use super::runtime::capture_exception_message;

/// `EventTarget.dispatchEvent(event)`.
pub(crate) fn dispatch_member<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    class: &'static str,
    this: Value<'js>,
    args: Vec<Value<'js>>,
) -> rquickjs::Result<Value<'js>> {
    let target = match resolve_receiver(bindings, class, receiver_of(&this)?) {
        Ok(target) => target,
        Err(err) => return Err(throw_host_error(ctx, bindings, &err)),
    };
    let event = match args.first() {
        Some(value) => instance_of(value)?,
        None => None,
    };
    let event = {
        let host = bindings.host.borrow();
        event.filter(|&id| {
            host.class_of(id)
                .map(|event_class| host.catalogue().is_a(event_class, "Event"))
                .unwrap_or(false)
        })
    };
    let Some(event) = event else {
        let err = HostError::type_mismatch(format!(
            "Failed to execute 'dispatchEvent' on '{class}': parameter 1 is not of type 'Event'."
        ));
        return Err(throw_host_error(ctx, bindings, &err));
    };

    let not_cancelled = dispatch_event(ctx, bindings, target, event)?;
    Ok(Value::new_bool(ctx.clone(), not_cancelled))
}

/// Run `event` through capture, target and bubble phases at `target`.
///
/// Listener exceptions are reported and do not stop the dispatch. Returns
/// `false` when a listener cancelled the event.
pub(crate) fn dispatch_event<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    target: InstanceId,
    event: InstanceId,
) -> rquickjs::Result<bool> {
    let path = with_host(ctx, bindings, |host| host.begin_dispatch(event, target))?;
    let outcome = run_phases(ctx, bindings, event, &path);
    let not_cancelled = with_host(ctx, bindings, |host| host.end_dispatch(event))?;
    outcome?;
    Ok(not_cancelled)
}

fn run_phases<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    event: InstanceId,
    path: &[InstanceId],
) -> rquickjs::Result<()> {
    let Some((&target, ancestors)) = path.split_first() else {
        return Ok(());
    };
    for &current in ancestors.iter().rev() {
        invoke_listeners(ctx, bindings, event, current, Phase::Capturing)?;
    }
    invoke_listeners(ctx, bindings, event, target, Phase::AtTarget)?;
    if with_host(ctx, bindings, |host| host.event_bubbles(event))? {
        for &current in ancestors {
            invoke_listeners(ctx, bindings, event, current, Phase::Bubbling)?;
        }
    }
    Ok(())
}

fn invoke_listeners<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    event: InstanceId,
    current: InstanceId,
    phase: Phase,
) -> rquickjs::Result<()> {
    let listeners = with_host(ctx, bindings, |host| host.enter_phase(event, current, phase))?;
    if listeners.is_empty() {
        return Ok(());
    }
    let receiver = bindings.wrapper(ctx, current)?;
    let event_value = bindings.wrapper(ctx, event)?;

    for listener in listeners {
        let active = with_host(ctx, bindings, |host| {
            host.listener_active(event, current, &listener)
        })?;
        if !active {
            continue;
        }
        with_host(ctx, bindings, |host| {
            host.listener_started(event, current, &listener)
        })?;
        let Some(callback) = bindings.callback(ctx, listener.callback)? else {
            continue;
        };

        match callback.call::<_, Value>((This(receiver.clone()), event_value.clone())) {
            Ok(returned) => {
                if listener.handler && returned.as_bool() == Some(false) {
                    with_host(ctx, bindings, |host| host.handler_returned_false(event))?;
                }
            }
            Err(rquickjs::Error::Exception) => {
                bindings.report_runtime_error(capture_exception_message(ctx));
            }
            Err(other) => return Err(other),
        }
    }
    Ok(())
}

fn with_host<T>(
    ctx: &Ctx<'_>,
    bindings: &Bindings,
    f: impl FnOnce(&mut WindowHost) -> HostResult<T>,
) -> rquickjs::Result<T> {
    let result = {
        let mut host = bindings.host.borrow_mut();
        f(&mut host)
    };
    result.map_err(|err| throw_host_error(ctx, bindings, &err))
}
