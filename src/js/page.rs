use anyhow::Result;
use tracing::{info, warn};

use crate::config::HostConfig;
use crate::error::HostResult;
use crate::host::{InstanceId, WindowHost, WINDOW};

use super::processor::{collect_scripts, run_inline_scripts, ScriptExecutionSummary};
use super::script::ScriptDescriptor;
use super::window::JsWindow;

/// Handler attributes on `<body>` that belong to the window.
const WINDOW_HANDLERS: &[&str] = &["load", "hashchange"];

/// An `on<type>` content attribute found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HandlerAttribute {
    target: InstanceId,
    event_type: String,
    body: String,
}

/// Loads a document into a window and runs it the way a page load does:
/// handler attributes, blocking inline scripts, then `load`.
pub struct PageRuntime {
    window: JsWindow,
    scripts: Vec<ScriptDescriptor>,
}

impl PageRuntime {
    pub fn load(html: &str, config: &HostConfig) -> Result<Self> {
        let scripts = collect_scripts(html)?;
        let window = JsWindow::with_config(html, config)?;
        Ok(Self { window, scripts })
    }

    pub fn scripts(&self) -> &[ScriptDescriptor] {
        &self.scripts
    }

    pub fn window(&self) -> &JsWindow {
        &self.window
    }

    pub fn into_window(self) -> JsWindow {
        self.window
    }

    pub fn run(&mut self) -> Result<ScriptExecutionSummary> {
        let mut summary = ScriptExecutionSummary {
            profile: self.window.profile().to_string(),
            ..Default::default()
        };

        let handlers = self.window.with_host(handler_attributes)?;
        for handler in handlers {
            let filename = format!("on{}-handler.js", handler.event_type);
            match self.window.install_handler_source(
                handler.target,
                &handler.event_type,
                &handler.body,
                &filename,
            ) {
                Ok(()) => summary.event_handlers += 1,
                Err(err) => {
                    warn!(target: "quickjs", event = %handler.event_type, error = %err, "failed to compile handler attribute");
                }
            }
        }

        run_inline_scripts(&self.window, &self.scripts, &mut summary);
        self.window.fire_simple_event(WINDOW, "load", false)?;

        summary.dom_mutations = self.window.drain_mutations().len();
        summary.runtime_errors = self.window.runtime_errors();
        info!(
            target: "quickjs",
            scripts = summary.executed_scripts,
            failed = summary.failed_scripts,
            dom_mutations = summary.dom_mutations,
            "page run complete"
        );
        Ok(summary)
    }
}

fn handler_attributes(host: &mut WindowHost) -> HostResult<Vec<HandlerAttribute>> {
    let document = host.document();
    let mut found = Vec::new();
    for node in host.dom_mut().descendants(document)? {
        let element = host.dom().node(node)?;
        let Some(data) = element.as_element() else {
            continue;
        };
        let is_body = &*data.name.local == "body";
        let attributes: Vec<(String, String)> = data
            .attributes
            .borrow()
            .map
            .iter()
            .filter_map(|(name, attribute)| {
                let event_type = name.local.strip_prefix("on")?;
                (!event_type.is_empty())
                    .then(|| (event_type.to_ascii_lowercase(), attribute.value.clone()))
            })
            .collect();
        for (event_type, body) in attributes {
            let target = if is_body && WINDOW_HANDLERS.contains(&event_type.as_str()) {
                WINDOW
            } else {
                host.instance_for_node(node)?
            };
            found.push(HandlerAttribute {
                target,
                event_type,
                body,
            });
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing;
    use crate::profile::BrowserProfile;

    #[test]
    fn body_onload_targets_the_window() {
        let mut host = testing::window(
            "<body onload=\"ready()\"><button id=b onclick=\"go()\"></button></body>",
            BrowserProfile::chrome(),
        );
        let handlers = handler_attributes(&mut host).unwrap();
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].target, WINDOW);
        assert_eq!(handlers[0].event_type, "load");
        assert_ne!(handlers[1].target, WINDOW);
        assert_eq!(handlers[1].body, "go()");
    }
}
