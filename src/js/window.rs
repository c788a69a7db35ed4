use std::rc::Rc;

use anyhow::{anyhow, Context as AnyhowContext, Result};
use rquickjs::function::{Rest, This};
use rquickjs::{Ctx, Value};
use url::Url;

use crate::catalogue::Catalogue;
use crate::config::{HostConfig, DEFAULT_MAX_DEFERRED};
use crate::dom::DomMutation;
use crate::error::HostError;
use crate::host::{CallbackId, DeferredAction, HostValue, InstanceId, WindowHost};
use crate::profile::BrowserProfile;

use super::convert::{from_js, to_js, Bindings};
use super::dispatch::dispatch_event;
use super::materialise::materialise;
use super::runtime::{capture_exception_message, QuickJsEngine, DEFAULT_MAX_JOBS};

/// One window: a QuickJS context with every host class materialised for a
/// browser profile, bound to a parsed document.
pub struct JsWindow {
    engine: QuickJsEngine,
    bindings: Rc<Bindings>,
    max_deferred: usize,
    closed: bool,
}

impl JsWindow {
    pub fn new(html: &str, profile: BrowserProfile) -> Result<Self> {
        let url = Url::parse("about:blank").context("invalid default document URL")?;
        Self::build(html, profile, url, DEFAULT_MAX_JOBS, DEFAULT_MAX_DEFERRED)
    }

    pub fn with_config(html: &str, config: &HostConfig) -> Result<Self> {
        let profile = config.profile()?;
        let url = config.document_url()?;
        Self::build(
            html,
            profile,
            url,
            config.max_pending_jobs,
            config.max_deferred_actions,
        )
    }

    fn build(
        html: &str,
        profile: BrowserProfile,
        url: Url,
        max_jobs: usize,
        max_deferred: usize,
    ) -> Result<Self> {
        let catalogue = Catalogue::builtin().context("failed to build the host catalogue")?;
        let engine = QuickJsEngine::with_job_limit(max_jobs)?;
        let host = WindowHost::new(html, profile.clone(), catalogue, url);
        let bindings = Rc::new(Bindings::new(host));

        let installed = engine.enter(|ctx| match materialise(&ctx, &bindings) {
            Ok(installed) => Ok(installed),
            Err(rquickjs::Error::Exception) => Err(anyhow!(capture_exception_message(&ctx))),
            Err(err) => Err(anyhow::Error::from(err)),
        });
        let installed = match installed {
            Ok(installed) => installed,
            Err(err) => {
                bindings.release();
                return Err(err.context("failed to materialise host classes"));
            }
        };

        tracing::info!(target: "quickjs", %profile, installed, "window ready");
        Ok(Self {
            engine,
            bindings,
            max_deferred,
            closed: false,
        })
    }

    pub fn profile(&self) -> BrowserProfile {
        self.bindings.host.borrow().profile().clone()
    }

    /// Evaluate one script turn and discard the result.
    pub fn eval(&self, source: &str, filename: &str) -> Result<()> {
        self.eval_with::<()>(source, filename)
    }

    /// Evaluate one script turn: the script, its microtasks, then every
    /// deferred action it queued (each followed by its own microtasks).
    pub fn eval_with<V>(&self, source: &str, filename: &str) -> Result<V>
    where
        V: for<'js> rquickjs::FromJs<'js>,
    {
        self.ensure_open()?;
        let result = self.engine.eval_with::<V>(source, filename);
        self.run_deferred();
        result
    }

    /// Drain the deferred-action queue in FIFO order. Returns how many ran.
    pub fn run_deferred(&self) -> usize {
        let mut performed = 0;
        while performed < self.max_deferred {
            let next = self.bindings.host.borrow_mut().next_deferred();
            let Some(action) = next else {
                break;
            };
            self.engine.enter(|ctx| self.perform(&ctx, action));
            self.engine.execute_pending_jobs();
            performed += 1;
        }
        let backlog = !self.bindings.host.borrow_mut().deferred_mut().is_empty();
        if performed == self.max_deferred && backlog {
            tracing::warn!(
                target: "quickjs",
                limit = self.max_deferred,
                "deferred-action limit reached; remaining actions wait for the next turn"
            );
        }
        self.collect_garbage();
        performed
    }

    /// Run a collection pass and drop the transient host instances (events,
    /// exceptions) whose script objects did not survive it.
    pub fn collect_garbage(&self) -> usize {
        if self.closed {
            return 0;
        }
        self.engine.run_gc();
        let swept = self.engine.enter(|ctx| self.bindings.sweep(&ctx));
        match swept {
            Ok(released) => {
                if released > 0 {
                    tracing::trace!(target: "quickjs", released, "released transient instances");
                }
                released
            }
            Err(err) => {
                tracing::warn!(target: "quickjs", error = %err, "sweeping transient instances failed");
                0
            }
        }
    }

    fn perform(&self, ctx: &Ctx<'_>, action: DeferredAction) {
        tracing::trace!(target: "quickjs", ?action, "running deferred action");
        let result = match action {
            DeferredAction::DispatchEvent { target, event } => {
                dispatch_event(ctx, &self.bindings, target, event).map(|_| ())
            }
            DeferredAction::InvokeCallback {
                callback,
                this,
                args,
            } => self.invoke_callback(ctx, callback, this, args),
        };
        match result {
            Ok(()) => {}
            Err(rquickjs::Error::Exception) => {
                self.bindings
                    .report_runtime_error(capture_exception_message(ctx));
            }
            Err(err) => self.bindings.report_runtime_error(err.to_string()),
        }
    }

    fn invoke_callback<'js>(
        &self,
        ctx: &Ctx<'js>,
        callback: CallbackId,
        this: Option<InstanceId>,
        args: Vec<HostValue>,
    ) -> rquickjs::Result<()> {
        let Some(function) = self.bindings.callback(ctx, callback)? else {
            return Ok(());
        };
        let receiver = match this {
            Some(id) => self.bindings.wrapper(ctx, id)?,
            None => Value::new_undefined(ctx.clone()),
        };
        let args = args
            .into_iter()
            .map(|arg| to_js(ctx, &self.bindings, arg))
            .collect::<rquickjs::Result<Vec<_>>>()?;
        function.call::<_, Value>((This(receiver), Rest(args)))?;
        Ok(())
    }

    /// Queue a trusted event of `event_type` at `target` and run it.
    pub fn fire_simple_event(
        &self,
        target: InstanceId,
        event_type: &str,
        bubbles: bool,
    ) -> Result<()> {
        self.ensure_open()?;
        self.bindings
            .host
            .borrow_mut()
            .fire_simple_event(target, event_type, bubbles);
        self.run_deferred();
        Ok(())
    }

    /// Compile `body` as an event handler function and install it in the
    /// `on<event_type>` slot of `target`.
    pub fn install_handler_source(
        &self,
        target: InstanceId,
        event_type: &str,
        body: &str,
        filename: &str,
    ) -> Result<()> {
        self.ensure_open()?;
        let source = format!("(function (event) {{\n{body}\n}})\n//# sourceURL={filename}\n");
        let handler = self.engine.enter(|ctx| {
            let compiled = ctx
                .eval::<Value, _>(source)
                .and_then(|function| from_js(&ctx, &self.bindings, &function));
            match compiled {
                Ok(handler) => Ok(handler),
                Err(rquickjs::Error::Exception) => Err(anyhow!(capture_exception_message(&ctx))),
                Err(err) => Err(anyhow::Error::from(err)),
            }
        })?;
        self.bindings
            .host
            .borrow_mut()
            .dispatch_to_handler(target, event_type, &handler)?;
        Ok(())
    }

    /// Run `f` against the window's host state.
    pub fn with_host<T>(&self, f: impl FnOnce(&mut WindowHost) -> T) -> T {
        f(&mut self.bindings.host.borrow_mut())
    }

    /// Serialise the main document.
    pub fn document_html(&self) -> Result<String> {
        let host = self.bindings.host.borrow();
        let document = host.dom().main_document()?;
        Ok(host.dom().outer_html(document, &host.serialize_options())?)
    }

    pub fn drain_mutations(&self) -> Vec<DomMutation> {
        self.bindings.host.borrow_mut().dom_mut().drain_mutations()
    }

    pub fn runtime_errors(&self) -> Vec<String> {
        self.bindings.runtime_errors()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Discard the window: pending deferred actions are cancelled, engine
    /// handles are released and every host instance is dropped.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.bindings.host.borrow_mut().discard();
        let released = self.bindings.release();
        self.engine.run_gc();
        tracing::debug!(target: "quickjs", released, "window closed");
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(HostError::DomDetached.into());
        }
        Ok(())
    }
}

impl Drop for JsWindow {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_global_exposes_document_and_classes() {
        let window = JsWindow::new("<p id=a>hi</p>", BrowserProfile::chrome()).expect("window");
        let text: String = window
            .eval_with("document.getElementById('a').textContent", "t.js")
            .expect("eval");
        assert_eq!(text, "hi");
        let same: bool = window
            .eval_with("window === globalThis && self === window && window instanceof Window", "t.js")
            .expect("eval");
        assert!(same);
    }

    #[test]
    fn closed_window_rejects_evaluation() {
        let mut window = JsWindow::new("", BrowserProfile::firefox()).expect("window");
        window
            .eval("document.body.addEventListener('x', () => {})", "t.js")
            .expect("eval");
        window.close();
        assert!(window.is_closed());
        let err = window.eval("1", "t.js").expect_err("closed");
        assert_eq!(err.to_string(), HostError::DomDetached.to_string());
    }

    #[test]
    fn handler_source_compiles_into_slot() {
        let window = JsWindow::new("<div id=d></div>", BrowserProfile::chrome()).expect("window");
        let target = window.with_host(|host| {
            let document = host.document();
            let node = host
                .dom_mut()
                .element_by_id(document, "d")
                .expect("lookup")
                .expect("present");
            host.instance_for_node(node).expect("instance")
        });
        window
            .install_handler_source(target, "click", "window.clicked = event.type;", "inline.js")
            .expect("compile");
        window
            .eval("document.getElementById('d').dispatchEvent(new Event('click'))", "t.js")
            .expect("dispatch");
        let clicked: String = window.eval_with("clicked", "t.js").expect("eval");
        assert_eq!(clicked, "click");
    }
}
