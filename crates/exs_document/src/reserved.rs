//! Local names of the reserved attributes in [`EXS_NAMESPACE`].
//!
//! [`EXS_NAMESPACE`]: crate::EXS_NAMESPACE

/// Concrete type of a value whose declared type is polymorphic.
pub const TYPE: &str = "type";

/// Item type of an array element.
pub const ITEM: &str = "item";

/// Generic arguments of the type an element is named after.
pub const ARGUMENTS: &str = "arguments";

/// Identity token on the first occurrence of a shared instance.
pub const IDENTITY: &str = "identity";

/// Identity token on a later occurrence; the element has no content.
pub const REFERENCE: &str = "reference";

/// Schema version of the element's type.
pub const VERSION: &str = "version";

/// Marks an absent value where an element must still be present.
pub const NULL: &str = "null";

/// Returns `true` if the reserved attribute `local` holds type names rather
/// than plain text.
#[inline]
pub fn is_type_valued(local: &str) -> bool {
    matches!(local, TYPE | ITEM | ARGUMENTS)
}
