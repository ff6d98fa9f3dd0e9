use core::fmt;

/// Namespace of the reserved `exs:*` attributes.
pub const EXS_NAMESPACE: &str = "urn:exs:v2";

/// Namespace of the built-in types (`sys:int`, `sys:Array`, ...).
pub const SYSTEM_NAMESPACE: &str = "urn:exs:system";

// -----------------------------------------------------------------------------
// QName

/// A namespace-qualified name.
///
/// Attribute names written by the engine for members are unqualified;
/// element names usually carry the namespace of the type they belong to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    namespace: Option<String>,
    local: String,
}

impl QName {
    /// Creates a name in the optional `namespace`.
    #[inline]
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_owned),
            local: local.into(),
        }
    }

    /// Creates a name without a namespace.
    #[inline]
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Creates a name in `namespace`.
    #[inline]
    pub fn qualified(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// Creates a reserved `exs:*` name.
    #[inline]
    pub fn reserved(local: &str) -> Self {
        Self::qualified(EXS_NAMESPACE, local)
    }

    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Returns `true` if this is the reserved name `exs:{local}`.
    #[inline]
    pub fn is_reserved(&self, local: &str) -> bool {
        self.namespace.as_deref() == Some(EXS_NAMESPACE) && self.local == local
    }

    /// Returns `true` if both parts match.
    #[inline]
    pub fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        self.namespace.as_deref() == namespace && self.local == local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}
