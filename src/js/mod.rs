//! Script engine integration: QuickJS contexts with the host classes installed.

mod async_result;
mod convert;
mod dispatch;
mod materialise;
pub mod page;
pub mod processor;
pub mod runtime;
pub mod script;
pub mod window;

pub use page::PageRuntime;
pub use processor::{collect_scripts, ScriptExecutionSummary};
pub use runtime::QuickJsEngine;
pub use script::{ScriptDescriptor, ScriptExecution, ScriptKind, ScriptSource};
pub use window::JsWindow;
