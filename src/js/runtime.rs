use anyhow::{Context as AnyhowContext, Result};
use rquickjs::{Context, Ctx, Error as JsError, Function, Runtime, Value};

/// Default cap on microtask jobs drained after one script turn.
pub const DEFAULT_MAX_JOBS: usize = 1000;

/// JavaScript runtime backed by QuickJS.
///
/// The engine owns the QuickJS runtime and context and provides helpers for evaluating
/// scripts. It also installs a `console` implementation that forwards each method to
/// `tracing` at the matching level.
pub struct QuickJsEngine {
    runtime: Runtime,
    context: Context,
    max_jobs: usize,
}

impl QuickJsEngine {
    /// Create a new QuickJS engine with `console.*` wired up to `tracing`.
    pub fn new() -> Result<Self> {
        Self::with_job_limit(DEFAULT_MAX_JOBS)
    }

    pub fn with_job_limit(max_jobs: usize) -> Result<Self> {
        let runtime = Runtime::new().context("failed to create QuickJS runtime")?;
        let context = Context::full(&runtime).context("failed to create QuickJS context")?;
        let engine = Self {
            runtime,
            context,
            max_jobs,
        };
        engine.init_console()?;
        Ok(engine)
    }

    /// Evaluate a script and discard the result.
    pub fn eval(&self, source: &str, filename: &str) -> Result<()> {
        self.eval_with::<()>(source, filename)
    }

    /// Evaluate a script and convert the result into `V`.
    ///
    /// Pending promise jobs are drained before returning, whether or not the
    /// script threw.
    pub fn eval_with<V>(&self, source: &str, filename: &str) -> Result<V>
    where
        V: for<'js> rquickjs::FromJs<'js>,
    {
        let script = Self::with_source_url(source, filename);
        let eval_result = self.context.with(|ctx| match ctx.eval::<V, _>(script) {
            Ok(value) => Ok(value),
            Err(JsError::Exception) => Err(anyhow::anyhow!(capture_exception_message(&ctx))),
            Err(err) => Err(anyhow::Error::from(err)),
        });

        self.execute_pending_jobs();
        eval_result
    }

    /// Execute pending jobs in the QuickJS job queue, up to the configured cap.
    ///
    /// This processes promise continuations and other microtasks. Returns the
    /// number of jobs that ran.
    pub fn execute_pending_jobs(&self) -> usize {
        let mut job_count = 0;

        while self.runtime.is_job_pending() {
            match self.runtime.execute_pending_job() {
                Ok(true) => {
                    job_count += 1;
                    if job_count >= self.max_jobs {
                        tracing::warn!(
                            target: "quickjs",
                            "Stopped processing jobs after {} iterations (possible infinite loop)",
                            self.max_jobs
                        );
                        break;
                    }
                }
                Ok(false) => break,
                Err(job_exception) => {
                    // A failing job must not stop the remaining ones.
                    job_count += 1;
                    tracing::error!(
                        target: "quickjs",
                        "Job execution error: {:?}",
                        job_exception
                    );
                    if job_count >= self.max_jobs {
                        break;
                    }
                }
            }
        }

        if job_count > 0 {
            tracing::debug!(target: "quickjs", "Executed {} pending jobs", job_count);
        }
        job_count
    }

    /// Provide access to the underlying QuickJS context for advanced integrations.
    pub fn with_context<T, F>(&self, f: F) -> Result<T>
    where
        F: for<'js> FnOnce(Ctx<'js>) -> rquickjs::Result<T>,
    {
        self.context.with(f).map_err(anyhow::Error::from)
    }

    /// Run `f` in the context without converting its error.
    pub(crate) fn enter<T, F>(&self, f: F) -> T
    where
        F: for<'js> FnOnce(Ctx<'js>) -> T,
    {
        self.context.with(f)
    }

    /// Force a garbage collection pass.
    pub fn run_gc(&self) {
        self.runtime.run_gc();
    }

    fn init_console(&self) -> Result<()> {
        self.context
            .with(|ctx| {
                let global = ctx.globals();
                let log_fn =
                    Function::new(ctx.clone(), log_from_js)?.with_name("__hostbridge_log")?;
                global.set("__hostbridge_log", log_fn)?;
                ctx.eval::<(), _>(CONSOLE_BOOTSTRAP.as_bytes())
            })
            .map_err(anyhow::Error::from)
    }

    fn with_source_url(source: &str, filename: &str) -> Vec<u8> {
        let mut script = String::with_capacity(source.len() + filename.len() + 32);
        script.push_str(source);
        if !source.ends_with('\n') {
            script.push('\n');
        }
        script.push_str("//# sourceURL=");
        script.push_str(filename);
        script.push('\n');
        script.into_bytes()
    }
}

fn log_from_js(level: String, message: String) -> rquickjs::Result<()> {
    match level.as_str() {
        "error" => tracing::error!(target: "quickjs", message = %message),
        "warn" => tracing::warn!(target: "quickjs", message = %message),
        "debug" => tracing::debug!(target: "quickjs", message = %message),
        _ => tracing::info!(target: "quickjs", message = %message),
    }
    Ok(())
}

/// Take the pending exception and describe it as `Name: message`.
pub(crate) fn capture_exception_message(ctx: &Ctx<'_>) -> String {
    let exception: Value = ctx.catch();
    describe_exception(&exception)
}

pub(crate) fn describe_exception(exception: &Value<'_>) -> String {
    if let Some(obj) = exception.as_object() {
        let message = obj.get::<_, Option<String>>("message").ok().flatten();
        let name = obj.get::<_, Option<String>>("name").ok().flatten();
        match (name, message) {
            (Some(name), Some(message)) if !message.is_empty() => {
                return format!("{name}: {message}")
            }
            (Some(name), _) => return name,
            (None, Some(message)) => return format!("Error: {message}"),
            (None, None) => {}
        }
    }
    if let Some(text) = exception.as_string().and_then(|s| s.to_string().ok()) {
        return text;
    }
    if exception.is_undefined() {
        return "QuickJS exception".to_string();
    }
    format!("{:?}", exception)
}

const CONSOLE_BOOTSTRAP: &str = r#"
(() => {
    const global = globalThis;
    const log = global.__hostbridge_log;
    delete global.__hostbridge_log;

    const stringify = (value) => {
        try {
            if (typeof value === 'string') {
                return value;
            }
            if (value === undefined) {
                return 'undefined';
            }
            if (value === null) {
                return 'null';
            }
            return String(value);
        } catch (err) {
            return '[unprintable]';
        }
    };

    const forward = (level) => (...args) => {
        try {
            log(level, args.map(stringify).join(' '));
        } catch (err) {
            // console must never throw
        }
    };

    if (typeof global.console !== 'object' || global.console === null) {
        global.console = {};
    }

    global.console.log = forward('info');
    global.console.info = forward('info');
    global.console.warn = forward('warn');
    global.console.error = forward('error');
    global.console.debug = forward('debug');
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_with_returns_value_and_drains_jobs() {
        let engine = QuickJsEngine::new().expect("engine");
        let value: i32 = engine
            .eval_with("var seen = 0; Promise.resolve(2).then(v => { seen = v; }); 40 + 2", "t.js")
            .expect("eval");
        assert_eq!(value, 42);
        let seen: i32 = engine.eval_with("seen", "t.js").expect("eval");
        assert_eq!(seen, 2);
    }

    #[test]
    fn exceptions_are_reported_with_name_and_message() {
        let engine = QuickJsEngine::new().expect("engine");
        let err = engine
            .eval("throw new TypeError('boom')", "t.js")
            .expect_err("should throw");
        assert_eq!(err.to_string(), "TypeError: boom");
    }

    #[test]
    fn console_methods_never_throw() {
        let engine = QuickJsEngine::new().expect("engine");
        engine
            .eval(
                "console.log('a', 1); console.warn({}); console.error(null); console.debug(undefined);",
                "t.js",
            )
            .expect("console");
        let hidden: bool = engine
            .eval_with("typeof __hostbridge_log === 'undefined'", "t.js")
            .expect("eval");
        assert!(hidden);
    }

    #[test]
    fn job_cap_stops_runaway_chains() {
        let engine = QuickJsEngine::with_job_limit(5).expect("engine");
        engine
            .eval(
                "var n = 0; function spin() { n++; Promise.resolve().then(spin); } spin();",
                "t.js",
            )
            .expect("eval");
        let n: i32 = engine.eval_with("n", "t.js").expect("eval");
        assert!(n <= 12, "ran {n} jobs");
    }
}
