//! Per-call state of one serialize or deserialize call.
//!
//! A context owns the reference table of its call and borrows the shared
//! [`Configuration`](crate::Configuration). Nothing in it outlives the call.

// -----------------------------------------------------------------------------
// Modules

mod reading;
mod writing;

#[cfg(feature = "debug")]
mod info_stack;

// -----------------------------------------------------------------------------
// Exports

pub use reading::Reading;
pub use writing::Writing;

#[cfg(feature = "debug")]
pub(crate) use info_stack::InfoStack;
