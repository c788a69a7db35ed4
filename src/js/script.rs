use serde::{Deserialize, Serialize};

/// How a script is scheduled relative to document parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptExecution {
    /// Classic scripts that run as soon as they are parsed.
    #[default]
    Blocking,
    /// External scripts marked `async`.
    Async,
    /// External scripts marked `defer`, and modules.
    Defer,
}

/// Script language, from the `type` attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    #[default]
    Classic,
    Module,
    /// Data blocks and unknown types; never executed.
    Unknown,
}

impl ScriptKind {
    pub fn from_type_attribute(script_type: Option<&str>) -> Self {
        let Some(value) = script_type else {
            return Self::Classic;
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "text/javascript" | "application/javascript" | "text/ecmascript"
            | "application/ecmascript" | "text/jscript" => Self::Classic,
            "module" => Self::Module,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ScriptSource {
    Inline { code: String },
    External { src: String },
}

/// One `<script>` element, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDescriptor {
    pub index: usize,
    pub kind: ScriptKind,
    pub execution: ScriptExecution,
    pub source: ScriptSource,
}

impl ScriptDescriptor {
    pub fn inline(index: usize, code: String, kind: ScriptKind) -> Self {
        let execution = match kind {
            ScriptKind::Module => ScriptExecution::Defer,
            _ => ScriptExecution::Blocking,
        };
        Self {
            index,
            kind,
            execution,
            source: ScriptSource::Inline { code },
        }
    }

    pub fn external(
        index: usize,
        src: String,
        kind: ScriptKind,
        execution: ScriptExecution,
    ) -> Self {
        Self {
            index,
            kind,
            execution,
            source: ScriptSource::External { src },
        }
    }

    /// Inline classic code that runs while the document is processed.
    pub fn runnable_code(&self) -> Option<&str> {
        match (&self.source, self.kind, self.execution) {
            (ScriptSource::Inline { code }, ScriptKind::Classic, ScriptExecution::Blocking) => {
                Some(code)
            }
            _ => None,
        }
    }

    pub fn filename(&self) -> String {
        match &self.source {
            ScriptSource::Inline { .. } => format!("inline-script-{}.js", self.index),
            ScriptSource::External { src } => src.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_type_attribute() {
        assert_eq!(ScriptKind::from_type_attribute(None), ScriptKind::Classic);
        assert_eq!(
            ScriptKind::from_type_attribute(Some(" Text/JavaScript ")),
            ScriptKind::Classic
        );
        assert_eq!(ScriptKind::from_type_attribute(Some("module")), ScriptKind::Module);
        assert_eq!(
            ScriptKind::from_type_attribute(Some("application/json")),
            ScriptKind::Unknown
        );
    }

    #[test]
    fn only_inline_classic_blocking_code_is_runnable() {
        let classic = ScriptDescriptor::inline(0, "1".into(), ScriptKind::Classic);
        assert_eq!(classic.runnable_code(), Some("1"));
        let module = ScriptDescriptor::inline(1, "1".into(), ScriptKind::Module);
        assert_eq!(module.runnable_code(), None);
        let external = ScriptDescriptor::external(
            2,
            "app.js".into(),
            ScriptKind::Classic,
            ScriptExecution::Blocking,
        );
        assert_eq!(external.runnable_code(), None);
        assert_eq!(external.filename(), "app.js");
    }
}
