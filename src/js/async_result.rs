//! Turns the outcome of async-declared host members into promises.
//!
//! Async members never raise synchronously: a bad receiver, a failed argument
//! conversion or a host error all become a rejected promise.

use rquickjs::{Ctx, Function, Object, Value};

use crate::catalogue::AsyncHostFn;
use crate::error::HostResult;
use crate::host::{AsyncOutcome, HostCall, HostValue, InstanceId};

use super::convert::{args_from_js, error_value, to_js, Bindings};
use super::materialise::{receiver_of, resolve_receiver};

pub(crate) fn invoke_async<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    class: &'static str,
    member: &'static str,
    implementation: AsyncHostFn,
    this: Value<'js>,
    args: Vec<Value<'js>>,
) -> rquickjs::Result<Value<'js>> {
    let prepared = prepare(ctx, bindings, class, &this, &args);
    let outcome = match prepared {
        Ok(Ok((receiver, args))) => {
            let mut host = bindings.host.borrow_mut();
            let mut call = HostCall::new(&mut host, receiver, class, member, args);
            implementation(&mut call)
        }
        Ok(Err(err)) => AsyncOutcome::Settled(Err(err)),
        Err(rquickjs::Error::Exception) => {
            let reason = ctx.catch();
            return rejected(ctx, reason);
        }
        Err(other) => return Err(other),
    };
    settle(ctx, bindings, outcome)
}

fn prepare<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    class: &'static str,
    this: &Value<'js>,
    args: &[Value<'js>],
) -> rquickjs::Result<HostResult<(InstanceId, Vec<HostValue>)>> {
    let receiver = match resolve_receiver(bindings, class, receiver_of(this)?) {
        Ok(receiver) => receiver,
        Err(err) => return Ok(Err(err)),
    };
    Ok(Ok((receiver, args_from_js(ctx, bindings, args)?)))
}

/// `undefined` for scheduled outcomes, a settled promise otherwise.
pub(crate) fn settle<'js>(
    ctx: &Ctx<'js>,
    bindings: &Bindings,
    outcome: AsyncOutcome,
) -> rquickjs::Result<Value<'js>> {
    let settled = match outcome {
        AsyncOutcome::Scheduled => return Ok(Value::new_undefined(ctx.clone())),
        AsyncOutcome::Settled(Ok(value)) => {
            to_js(ctx, bindings, value).and_then(|value| resolved(ctx, value))
        }
        AsyncOutcome::Settled(Err(err)) => {
            tracing::debug!(target: "quickjs", error = %err, "rejecting async host call");
            error_value(ctx, bindings, &err).and_then(|reason| rejected(ctx, reason))
        }
    };
    match settled {
        Err(rquickjs::Error::Exception) => {
            let reason = ctx.catch();
            rejected(ctx, reason)
        }
        other => other,
    }
}

pub(crate) fn resolved<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<Value<'js>> {
    promise_static(ctx, "resolve", value)
}

pub(crate) fn rejected<'js>(ctx: &Ctx<'js>, reason: Value<'js>) -> rquickjs::Result<Value<'js>> {
    promise_static(ctx, "reject", reason)
}

fn promise_static<'js>(
    ctx: &Ctx<'js>,
    name: &str,
    value: Value<'js>,
) -> rquickjs::Result<Value<'js>> {
    let promise: Object = ctx.globals().get("Promise")?;
    let settle: Function = promise.get(name)?;
    settle.call((rquickjs::function::This(promise), value))
}

#[cfg(test)]
mod tests {
    use rquickjs::{Context, Runtime};

    use super::*;
    use crate::catalogue::Catalogue;
    use crate::error::HostError;
    use crate::host::WindowHost;
    use crate::profile::BrowserProfile;

    #[test]
    fn host_errors_become_rejections() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        let catalogue = Catalogue::builtin().unwrap();
        let url = url::Url::parse("http://localhost/").unwrap();
        let bindings = Bindings::new(WindowHost::new("", BrowserProfile::chrome(), catalogue, url));

        context.with(|ctx| {
            let outcome = AsyncOutcome::Settled(Err(HostError::type_mismatch("missing")));
            let promise = settle(&ctx, &bindings, outcome).unwrap();
            ctx.globals().set("pending", promise).unwrap();
            ctx.eval::<(), _>("var reason; pending.catch(e => { reason = e instanceof TypeError ? e.message : 'other'; });")
                .unwrap();
        });
        while runtime.is_job_pending() {
            runtime.execute_pending_job().unwrap();
        }
        context.with(|ctx| {
            let reason: String = ctx.eval("reason").unwrap();
            assert_eq!(reason, "missing");
            let scheduled = settle(&ctx, &bindings, AsyncOutcome::Scheduled).unwrap();
            assert!(scheduled.is_undefined());
        });
        bindings.release();
    }
}
