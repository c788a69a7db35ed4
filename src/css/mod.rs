//! Browser-conditional value tables and the per-browser CSS defaults built on them.

pub mod conditional;
pub mod defaults;

pub use conditional::{ConditionalRow, ConditionalValueTable, Resolved};
pub use defaults::{css_to_script_name, script_to_css_name, CssDefaults};
