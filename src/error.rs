use thiserror::Error;

/// Failure kinds raised by host objects.
///
/// Every kind has a fixed script-side surface (see [`HostError::surface`]); the
/// engine layer never inspects messages to decide how to raise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("Illegal constructor.")]
    IllegalConstructor { class: String },
    #[error("{0}")]
    TypeMismatch(String),
    #[error("{0}")]
    NotSupported(String),
    #[error("{0}")]
    NotAllowed(String),
    #[error("{0}")]
    InvalidValue(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    ReadOnly(String),
    #[error("{0}")]
    HierarchyRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("host object is not attached to a live DOM node")]
    DomDetached,
    #[error("failed to parse HTML snippet: {0}")]
    ParseError(String),
    #[error("host catalogue is inconsistent: {0}")]
    CatalogueInconsistent(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// How an error must be presented to script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptSurface {
    TypeError,
    DomException(&'static str),
    Error,
}

impl HostError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported(message.into())
    }

    pub fn illegal_constructor(class: &str) -> Self {
        Self::IllegalConstructor {
            class: class.to_string(),
        }
    }

    pub fn surface(&self) -> ScriptSurface {
        match self {
            Self::IllegalConstructor { .. } | Self::TypeMismatch(_) => ScriptSurface::TypeError,
            Self::NotSupported(_) => ScriptSurface::DomException("NotSupportedError"),
            Self::NotAllowed(_) => ScriptSurface::DomException("NotAllowedError"),
            Self::InvalidState(_) => ScriptSurface::DomException("InvalidStateError"),
            Self::ReadOnly(_) => ScriptSurface::DomException("NoModificationAllowedError"),
            Self::HierarchyRequest(_) => ScriptSurface::DomException("HierarchyRequestError"),
            Self::NotFound(_) => ScriptSurface::DomException("NotFoundError"),
            Self::InvalidValue(_)
            | Self::DomDetached
            | Self::ParseError(_)
            | Self::CatalogueInconsistent(_) => ScriptSurface::Error,
        }
    }
}

/// Legacy numeric `DOMException.code` for a DOMException name; 0 for names
/// introduced after the code table was frozen.
pub fn legacy_code(name: &str) -> u16 {
    LEGACY_CODES
        .iter()
        .find(|(_, candidate)| *candidate == name)
        .map(|(code, _)| *code)
        .unwrap_or(0)
}

/// `(code, name)` pairs; the constant names are derived from this list.
pub(crate) const LEGACY_CODES: &[(u16, &str)] = &[
    (1, "IndexSizeError"),
    (3, "HierarchyRequestError"),
    (4, "WrongDocumentError"),
    (5, "InvalidCharacterError"),
    (7, "NoModificationAllowedError"),
    (8, "NotFoundError"),
    (9, "NotSupportedError"),
    (11, "InvalidStateError"),
    (12, "SyntaxError"),
    (13, "InvalidModificationError"),
    (14, "NamespaceError"),
    (15, "InvalidAccessError"),
    (17, "TypeMismatchError"),
    (18, "SecurityError"),
    (19, "NetworkError"),
    (20, "AbortError"),
    (21, "URLMismatchError"),
    (22, "QuotaExceededError"),
    (23, "TimeoutError"),
    (24, "InvalidNodeTypeError"),
    (25, "DataCloneError"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_supported_maps_to_code_nine() {
        let err = HostError::not_supported("Operation is not supported");
        assert_eq!(
            err.surface(),
            ScriptSurface::DomException("NotSupportedError")
        );
        assert_eq!(legacy_code("NotSupportedError"), 9);
        assert_eq!(legacy_code("NotAllowedError"), 0);
    }

    #[test]
    fn illegal_constructor_is_a_type_error() {
        let err = HostError::illegal_constructor("SubtleCrypto");
        assert_eq!(err.surface(), ScriptSurface::TypeError);
        assert!(err.to_string().contains("Illegal constructor"));
    }
}
