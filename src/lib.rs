// Library exports for the binary and integration tests

pub mod catalogue;
pub mod config;
pub mod css;
pub mod dom;
pub mod error;
pub mod host;
pub mod js;
pub mod profile;

// Re-export commonly used types for tests
pub use catalogue::Catalogue;
pub use config::{ConfigError, HostConfig};
pub use error::{HostError, HostResult};
pub use js::{JsWindow, PageRuntime, ScriptExecutionSummary};
pub use profile::{BrowserCondition, BrowserFamily, BrowserProfile, FeatureTag};
