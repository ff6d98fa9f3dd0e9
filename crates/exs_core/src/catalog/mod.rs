//! The Type Catalog: what each registered type looks like and how it is
//! named in documents.

// -----------------------------------------------------------------------------
// Modules

mod descriptor;
mod member;
mod registry;

// -----------------------------------------------------------------------------
// Exports

pub use descriptor::{
    Implementor, MapShape, NullableShape, PolymorphicShape, SequenceShape, SharedShape,
    TypeDescriptor, TypeKind,
};
pub use member::{Accessor, MemberAccess, MemberDescriptor, MemberFlags, Placement};
pub use registry::TypeRegistry;

pub(crate) use registry::register_type;

use core::any::Any;

// -----------------------------------------------------------------------------
// Describe

/// Produces the [`TypeDescriptor`] of a type.
///
/// Implemented for primitives, `String`, `Option`, the std collections,
/// [`Shared`](crate::Shared) and `Box<dyn Reflect>`. User types implement it
/// by listing their members:
///
/// ```
/// use exs_core::{Describe, MemberDescriptor, TypeDescriptor};
///
/// #[derive(Default)]
/// struct Subject {
///     message: String,
/// }
///
/// impl Describe for Subject {
///     fn describe() -> TypeDescriptor {
///         TypeDescriptor::object::<Self>(vec![MemberDescriptor::new::<Self, String>(
///             "Message",
///             |s| &s.message,
///             |s| &mut s.message,
///         )])
///         .with_default::<Self>()
///     }
/// }
/// ```
///
/// Member types, generic arguments and implementors listed in the descriptor
/// are registered along with the type.
pub trait Describe: Any {
    fn describe() -> TypeDescriptor;

    /// Registers types the descriptor does not already list.
    fn register_dependencies(_registry: &mut TypeRegistry) {}
}
