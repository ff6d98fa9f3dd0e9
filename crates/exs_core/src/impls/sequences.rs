use core::any::{Any, TypeId};
use core::hash::Hash;
use std::collections::{BTreeSet, HashSet, VecDeque};

use super::replace;
use crate::catalog::{Describe, SequenceShape, TypeDescriptor, TypeKind};

/// Views each item of `C` as `&dyn Any`.
fn items<C, T>(value: &dyn Any) -> Option<Vec<&dyn Any>>
where
    C: Any,
    for<'a> &'a C: IntoIterator<Item = &'a T>,
    T: Any,
{
    let container = value.downcast_ref::<C>()?;
    Some(container.into_iter().map(|item| item as &dyn Any).collect())
}

/// Collects items read in document order into `C`.
fn collect<C, T>(items: Vec<Box<dyn Any>>) -> Option<Box<dyn Any>>
where
    C: Any + FromIterator<T>,
    T: Any,
{
    let container = items
        .into_iter()
        .map(|item| item.downcast::<T>().ok().map(|item| *item))
        .collect::<Option<C>>()?;
    Some(Box::new(container))
}

fn shape<C, T>() -> SequenceShape
where
    C: Any + FromIterator<T>,
    for<'a> &'a C: IntoIterator<Item = &'a T>,
    T: Any,
{
    SequenceShape {
        item: TypeId::of::<T>(),
        items: items::<C, T>,
        collect: collect::<C, T>,
        replace: replace::<C>,
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builtin::<Self>("Array", TypeKind::Array(shape::<Self, T>()))
            .with_argument::<T>()
            .with_default::<Self>()
    }
}

impl<T: Describe> Describe for VecDeque<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builtin::<Self>("List", TypeKind::List(shape::<Self, T>()))
            .with_argument::<T>()
            .with_default::<Self>()
    }
}

impl<T: Describe + Ord> Describe for BTreeSet<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builtin::<Self>("SortedSet", TypeKind::Set(shape::<Self, T>()))
            .with_argument::<T>()
            .with_default::<Self>()
    }
}

impl<T: Describe + Eq + Hash> Describe for HashSet<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builtin::<Self>("HashSet", TypeKind::Set(shape::<Self, T>()))
            .with_argument::<T>()
            .with_default::<Self>()
    }
}
