use exs_document::DocumentError;
use thiserror::Error;

// -----------------------------------------------------------------------------
// Error

/// Errors raised by the engine.
///
/// Every variant aborts the serialize or deserialize call it occurs in.
/// Nothing is retried and no partial output is returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The document names a type, or a shape, no registered type matches.
    #[error("Could not resolve the type of element `{node}`: {reason}")]
    TypeResolution { node: String, reason: String },

    /// A runtime type reached the engine without being registered.
    #[error("Type `{0}` is not registered in the configuration")]
    Unregistered(String),

    /// A resolved type has neither a default constructor nor a factory.
    #[error("Type `{0}` cannot be activated: no default constructor or factory is configured")]
    Activation(String),

    /// A reference token was read before any element carrying it as identity.
    #[error("Reference `{0}` does not match any instance read so far")]
    UnresolvedReference(String),

    /// A migration step rejected the element it was given.
    #[error("Migration of `{type_path}` from version {version} failed: {message}")]
    Migration {
        type_path: String,
        version: usize,
        message: String,
    },

    /// The configuration or a serializer broke a rule of the engine.
    #[error("Serialization contract violated: {0}")]
    ContractViolation(String),

    /// Element content does not have the shape its type expects.
    #[error("Invalid content in `{node}`: {message}")]
    Format { node: String, message: String },

    #[error(transparent)]
    Document(#[from] DocumentError),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

impl Error {
    #[inline]
    pub(crate) fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation(message.into())
    }

    #[inline]
    pub(crate) fn format(node: impl ToString, message: impl Into<String>) -> Self {
        Self::Format {
            node: node.to_string(),
            message: message.into(),
        }
    }

    #[inline]
    pub(crate) fn resolution(node: impl ToString, reason: impl Into<String>) -> Self {
        Self::TypeResolution {
            node: node.to_string(),
            reason: reason.into(),
        }
    }
}
