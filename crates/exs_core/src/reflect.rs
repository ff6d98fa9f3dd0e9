use core::any::{Any, type_name};
use std::cell::RefCell;
use std::rc::Rc;

// -----------------------------------------------------------------------------
// Reflect

/// Access to a value as [`Any`], implemented for every `'static` type.
///
/// It exists so that trait objects can be serialized: declare the trait as
/// `trait Shape: Reflect { .. }` and `&dyn Shape` can be viewed as the
/// concrete value it points to.
///
/// Beware of method resolution on smart pointers: `boxed.as_any()` on a
/// `Box<dyn Shape>` views the box itself. Dereference first with
/// `(**boxed).as_any()`.
pub trait Reflect: Any {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn as_reflect(&self) -> &dyn Reflect;

    /// The type path of the concrete type, from [`core::any::type_name`].
    fn reflect_type_path(&self) -> &'static str;
}

impl<T: Any> Reflect for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    #[inline]
    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    #[inline]
    fn reflect_type_path(&self) -> &'static str {
        type_name::<T>()
    }
}

// -----------------------------------------------------------------------------
// Shared

/// A shared, mutable instance.
///
/// Values of this type are tracked by identity: every occurrence of the same
/// allocation in one document after the first is written as a reference,
/// and read back as a clone of the same `Rc`.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wraps `value` into a new [`Shared`] allocation.
#[inline]
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}
