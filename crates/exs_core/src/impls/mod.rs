//! [`Describe`](crate::Describe) for the built-in shapes.
//!
//! ## Implemented Menu
//!
//! - leaf: `bool`, `char`, `i8`-`i128`, `isize`, `u8`-`u128`, `usize`,
//!   `f32`, `f64`, `String`
//! - nullable: `Option<T>`
//! - sequences: `Vec<T>` (`Array`), `VecDeque<T>` (`List`),
//!   `BTreeSet<T>` (`SortedSet`), `HashSet<T>` (`HashSet`)
//! - maps: `HashMap<K, V>` (`Dictionary`), `BTreeMap<K, V>`
//!   (`SortedDictionary`), `indexmap::IndexMap<K, V>` (`OrderedDictionary`)
//! - identity: [`Shared<T>`](crate::Shared)
//! - polymorphic: `Box<dyn Reflect>` (`Object`), and `Box<dyn Trait>`
//!   through [`describe_polymorphic!`](crate::describe_polymorphic)

// -----------------------------------------------------------------------------
// Modules

mod maps;
mod native;
mod object;
mod option;
mod sequences;
mod shared;

// -----------------------------------------------------------------------------
// Helpers

use core::any::Any;

/// Overwrites `target` with `value` when both are a `C`.
fn replace<C: Any>(target: &mut dyn Any, value: Box<dyn Any>) -> Option<()> {
    let target = target.downcast_mut::<C>()?;
    *target = *value.downcast::<C>().ok()?;
    Some(())
}
