//! Configuration: the builder collecting registrations and overrides, and
//! the immutable snapshot the engine reads.
//!
//! ```
//! use exs_core::{ConfigurationBuilder, Describe, MemberDescriptor, TypeDescriptor};
//!
//! #[derive(Default)]
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
//!         .with_default::<Self>()
//!     }
//! }
//!
//! let config = ConfigurationBuilder::new()
//!     .configure::<Subject>(|t| {
//!         t.member("Message").attribute();
//!     })
//!     .build()
//!     .unwrap();
//! assert!(config.registry().describe_type::<Subject>().is_ok());
//! ```

// -----------------------------------------------------------------------------
// Modules

mod builder;
mod configuration;

// -----------------------------------------------------------------------------
// Exports

pub use builder::{ConfigurationBuilder, MemberConfig, TypeConfig};
pub use configuration::{Configuration, Member, ObjectLayout};
