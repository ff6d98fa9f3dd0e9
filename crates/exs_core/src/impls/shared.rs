use core::any::{Any, TypeId};
use core::cell::RefCell;
use std::rc::Rc;

use crate::catalog::{Describe, SharedShape, TypeDescriptor, TypeKind};
use crate::error::{Error, Result};
use crate::reflect::Shared;

fn address<T: Any>(value: &dyn Any) -> Option<usize> {
    let shared = value.downcast_ref::<Shared<T>>()?;
    Some(Rc::as_ptr(shared).addr())
}

fn with_ref<T: Any>(
    value: &dyn Any,
    f: &mut dyn FnMut(&dyn Any) -> Result<()>,
) -> Option<Result<()>> {
    let shared = value.downcast_ref::<Shared<T>>()?;
    Some(match shared.try_borrow() {
        Ok(inner) => f(&*inner),
        Err(_) => Err(Error::contract("a shared instance is borrowed mutably")),
    })
}

fn with_mut<T: Any>(
    instance: &Rc<dyn Any>,
    f: &mut dyn FnMut(&mut dyn Any) -> Result<()>,
) -> Option<Result<()>> {
    let cell = instance.downcast_ref::<RefCell<T>>()?;
    Some(match cell.try_borrow_mut() {
        Ok(mut inner) => f(&mut *inner),
        Err(_) => Err(Error::contract("a shared instance is already borrowed")),
    })
}

fn wrap<T: Any>(value: Box<dyn Any>) -> Option<Rc<dyn Any>> {
    let value = value.downcast::<T>().ok()?;
    let instance: Rc<dyn Any> = Rc::new(RefCell::new(*value));
    Some(instance)
}

fn unwrap<T: Any>(instance: Rc<dyn Any>) -> Option<Box<dyn Any>> {
    let shared: Shared<T> = instance.downcast::<RefCell<T>>().ok()?;
    Some(Box::new(shared))
}

impl<T: Describe> Describe for Shared<T> {
    fn describe() -> TypeDescriptor {
        let shape = SharedShape {
            inner: TypeId::of::<T>(),
            address: address::<T>,
            with_ref: with_ref::<T>,
            with_mut: with_mut::<T>,
            wrap: wrap::<T>,
            unwrap: unwrap::<T>,
        };
        TypeDescriptor::builtin::<Self>("Shared", TypeKind::Shared(shape)).with_argument::<T>()
    }
}
