use core::any::{Any, TypeId};

use crate::catalog::{Describe, NullableShape, TypeDescriptor, TypeKind};

fn get<T: Any>(value: &dyn Any) -> Option<Option<&dyn Any>> {
    let value = value.downcast_ref::<Option<T>>()?;
    Some(value.as_ref().map(|inner| inner as &dyn Any))
}

fn some<T: Any>(inner: Box<dyn Any>) -> Option<Box<dyn Any>> {
    let inner = inner.downcast::<T>().ok()?;
    Some(Box::new(Some(*inner)))
}

fn none<T: Any>() -> Box<dyn Any> {
    Box::new(None::<T>)
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        let shape = NullableShape {
            inner: TypeId::of::<T>(),
            get: get::<T>,
            some: some::<T>,
            none: none::<T>,
        };
        TypeDescriptor::builtin::<Self>("Nullable", TypeKind::Nullable(shape))
            .with_argument::<T>()
            .with_default::<Self>()
    }
}
