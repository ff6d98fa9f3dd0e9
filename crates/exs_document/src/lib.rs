//! The document side of `exs`: a tree of named elements and the textual
//! form it is written to and read from.
//!
//! The engine never sees character-level syntax. It produces an [`Element`]
//! tree through a [`DocumentWriter`] and consumes one returned by [`parse`].
//!
//! - [`QName`]: a namespace-qualified element or attribute name.
//! - [`TypeRef`]: the `Name[Arg1,Arg2]` syntax carried by reserved attributes.
//! - [`Element`] / [`Node`]: the tree. Migrations edit it in place.
//! - [`DocumentWriter`] / [`TreeWriter`]: the write interface of the engine.
//! - [`to_string`] / [`parse`]: the textual form, over `quick-xml`.
//! - [`NamespaceLayout`]: where `xmlns` declarations are placed on write.

// -----------------------------------------------------------------------------
// Modules

mod element;
mod error;
mod name;
mod namespaces;
mod text;
mod type_ref;
mod writer;

pub mod reserved;

// -----------------------------------------------------------------------------
// Exports

pub use element::{Attribute, AttributeValue, Element, Node};
pub use error::DocumentError;
pub use name::{EXS_NAMESPACE, QName, SYSTEM_NAMESPACE};
pub use namespaces::NamespaceLayout;
pub use text::{WriteOptions, parse, to_string};
pub use type_ref::TypeRef;
pub use writer::{DocumentWriter, TreeWriter};
