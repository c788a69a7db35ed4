use anyhow::{anyhow, Result};
use kuchiki::parse_html;
use kuchiki::traits::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::script::{ScriptDescriptor, ScriptExecution, ScriptKind, ScriptSource};
use super::window::JsWindow;

/// Outcome of running a page, printed by the binary as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptExecutionSummary {
    pub profile: String,
    pub executed_scripts: usize,
    pub failed_scripts: usize,
    pub skipped_scripts: usize,
    pub event_handlers: usize,
    pub dom_mutations: usize,
    pub runtime_errors: Vec<String>,
}

pub fn collect_scripts(html: &str) -> Result<Vec<ScriptDescriptor>> {
    let parsed = parse_html().one(html);
    let mut collected = Vec::new();
    let selector = parsed
        .select("script")
        .map_err(|_| anyhow!("failed to compile selector"))?;

    for (index, script) in selector.enumerate() {
        let attributes = script.attributes.borrow();
        let kind = ScriptKind::from_type_attribute(attributes.get("type"));

        if let Some(src) = attributes
            .get("src")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
        {
            let execution = external_execution(&attributes, kind);
            collected.push(ScriptDescriptor::external(index, src.to_string(), kind, execution));
            continue;
        }

        drop(attributes);
        let code = script.text_contents();
        if code.trim().is_empty() {
            continue;
        }
        collected.push(ScriptDescriptor::inline(index, code, kind));
    }

    Ok(collected)
}

/// `async` and `defer` only apply to external scripts; modules always defer.
fn external_execution(attributes: &kuchiki::Attributes, kind: ScriptKind) -> ScriptExecution {
    if attributes.get("async").is_some() {
        return ScriptExecution::Async;
    }
    if attributes.get("defer").is_some() || kind == ScriptKind::Module {
        return ScriptExecution::Defer;
    }
    ScriptExecution::Blocking
}

/// Run the blocking inline classic scripts in document order. A failing
/// script is logged and the next one still runs.
pub(super) fn run_inline_scripts(
    window: &JsWindow,
    scripts: &[ScriptDescriptor],
    summary: &mut ScriptExecutionSummary,
) {
    for descriptor in scripts {
        let filename = descriptor.filename();
        let Some(code) = descriptor.runnable_code() else {
            match &descriptor.source {
                ScriptSource::External { src } => {
                    warn!(target: "quickjs", %src, "skipping external script; network loading is not available");
                }
                ScriptSource::Inline { .. } => {
                    debug!(target: "quickjs", %filename, kind = ?descriptor.kind, "skipping non-classic script");
                }
            }
            summary.skipped_scripts += 1;
            continue;
        };

        match window.eval(code, &filename) {
            Ok(()) => summary.executed_scripts += 1,
            Err(err) => {
                summary.failed_scripts += 1;
                error!(target: "quickjs", %filename, error = %err, "inline script execution failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_scripts_in_document_order() {
        let html = r#"
            <script>var a = 1;</script>
            <script src="app.js" defer></script>
            <script type="module">import x from './x.js';</script>
            <script type="application/json">{}</script>
            <script>   </script>
            <script src="late.js" async></script>
        "#;
        let scripts = collect_scripts(html).unwrap();
        assert_eq!(scripts.len(), 5);
        assert_eq!(scripts[0].runnable_code(), Some("var a = 1;"));
        assert_eq!(scripts[1].execution, ScriptExecution::Defer);
        assert_eq!(scripts[2].kind, ScriptKind::Module);
        assert_eq!(scripts[3].kind, ScriptKind::Unknown);
        assert_eq!(scripts[4].execution, ScriptExecution::Async);
        assert_eq!(scripts[4].index, 5);
    }

    #[test]
    fn summary_serialises_as_json() {
        let summary = ScriptExecutionSummary {
            profile: "Chrome".into(),
            executed_scripts: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["executed_scripts"], 2);
        assert_eq!(json["runtime_errors"], serde_json::json!([]));
    }
}
