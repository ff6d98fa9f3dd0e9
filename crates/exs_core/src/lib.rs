//! The `exs` engine: converts object graphs to element trees and back.
//!
//! - [`catalog`]: the Type Catalog. [`Describe`] produces a
//!   [`TypeDescriptor`] per type; the [`TypeRegistry`] maps types to
//!   document names and resolves them back.
//! - [`activation`]: the Activator Registry, blank instances for object types.
//! - [`content`]: the Content Serializer Registry, one [`ContentSerializer`]
//!   per type with content.
//! - [`Shared`] instances are tracked by identity within one call: repeated
//!   occurrences are written as references to the first.
//! - [`migration`]: forward-only rewrites of elements written by older
//!   versions of a type.
//! - [`extension`]: the Extension Pipeline composed over the serializers.
//! - [`config`]: the [`ConfigurationBuilder`] and the immutable
//!   [`Configuration`] it produces.
//! - [`Serializer`]: the entry point.
//!
//! ```
//! use std::sync::Arc;
//!
//! use exs_core::{ConfigurationBuilder, Describe, MemberDescriptor, Serializer, TypeDescriptor};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Subject {
//!     message: String,
//! }
//!
//! impl Describe for Subject {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::object::<Self>(vec![MemberDescriptor::new::<Self, String>(
//!             "Message",
//!             |s| &s.message,
//!             |s| &mut s.message,
//!         )])
//!         .with_namespace("urn:demo")
//!         .with_default::<Self>()
//!     }
//! }
//!
//! let config = ConfigurationBuilder::new().register::<Subject>().build().unwrap();
//! let serializer = Serializer::new(Arc::new(config));
//!
//! let subject = Subject { message: "Hello World!".into() };
//! let text = serializer.serialize(&subject).unwrap();
//! assert_eq!(
//!     text,
//!     r#"<Subject xmlns="urn:demo"><Message>Hello World!</Message></Subject>"#
//! );
//! assert_eq!(serializer.deserialize::<Subject>(&text).unwrap(), subject);
//! ```

// -----------------------------------------------------------------------------
// Modules

mod context;
mod error;
mod impls;
mod references;
mod reflect;
mod serializer;

pub mod activation;
pub mod catalog;
pub mod config;
pub mod content;
pub mod extension;
pub mod migration;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use exs_document as document;

pub use catalog::{
    Describe, Implementor, MemberDescriptor, Placement, TypeDescriptor, TypeKind, TypeRegistry,
};
pub use config::{Configuration, ConfigurationBuilder};
pub use content::{ContentSerializer, TextContent, TextConverter};
pub use context::{Reading, Writing};
pub use error::{Error, Result};
pub use extension::{Extension, Predicate, Target};
pub use migration::Migrations;
pub use reflect::{Reflect, Shared, shared};
pub use serializer::Serializer;
