//! Shared containers for the `exs` crates.
//!
//! - [`hash`]: `hashbrown` containers with a fixed `foldhash` seed, so that
//!   iteration over a map never depends on a random state.
//! - [`TypeIdMap`]: a [`TypeId`](core::any::TypeId) keyed map with a
//!   pass-through hasher.

// -----------------------------------------------------------------------------
// Modules

mod typeid_map;

pub mod hash;

// -----------------------------------------------------------------------------
// Top-level exports

pub use typeid_map::TypeIdMap;
