use core::fmt::Display;

use thiserror::Error;

// -----------------------------------------------------------------------------
// DocumentError

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DocumentError {
    #[error("Malformed document: {0}")]
    Syntax(String),

    #[error("Namespace prefix `{0}` is not declared")]
    UnknownPrefix(String),

    #[error("Invalid type name `{text}`: {reason}")]
    TypeName { text: String, reason: &'static str },

    #[error("Document has no root element")]
    Empty,

    #[error("Writer misuse: {0}")]
    Unbalanced(&'static str),

    #[error("Failed to emit document: {0}")]
    Emit(String),

    #[error("Type `{0}` has no namespace but a default namespace is in scope")]
    Unqualified(String),
}

impl DocumentError {
    #[inline]
    pub(crate) fn syntax(e: impl Display) -> Self {
        Self::Syntax(e.to_string())
    }

    #[inline]
    pub(crate) fn emit(e: impl Display) -> Self {
        Self::Emit(e.to_string())
    }
}
