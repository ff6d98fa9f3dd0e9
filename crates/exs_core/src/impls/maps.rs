use core::any::{Any, TypeId};
use core::hash::Hash;
use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;

use super::replace;
use crate::catalog::{Describe, MapShape, TypeDescriptor, TypeKind};

fn entries<C, K, V>(value: &dyn Any) -> Option<Vec<(&dyn Any, &dyn Any)>>
where
    C: Any,
    for<'a> &'a C: IntoIterator<Item = (&'a K, &'a V)>,
    K: Any,
    V: Any,
{
    let container = value.downcast_ref::<C>()?;
    Some(
        container
            .into_iter()
            .map(|(key, value)| (key as &dyn Any, value as &dyn Any))
            .collect(),
    )
}

/// Inserts entries in document order. A repeated key keeps the last value.
fn collect<C, K, V>(entries: Vec<(Box<dyn Any>, Box<dyn Any>)>) -> Option<Box<dyn Any>>
where
    C: Any + FromIterator<(K, V)>,
    K: Any,
    V: Any,
{
    let container = entries
        .into_iter()
        .map(|(key, value)| {
            let key = key.downcast::<K>().ok()?;
            let value = value.downcast::<V>().ok()?;
            Some((*key, *value))
        })
        .collect::<Option<C>>()?;
    Some(Box::new(container))
}

fn shape<C, K, V>() -> MapShape
where
    C: Any + FromIterator<(K, V)>,
    for<'a> &'a C: IntoIterator<Item = (&'a K, &'a V)>,
    K: Any,
    V: Any,
{
    MapShape {
        key: TypeId::of::<K>(),
        value: TypeId::of::<V>(),
        entries: entries::<C, K, V>,
        collect: collect::<C, K, V>,
        replace: replace::<C>,
    }
}

macro_rules! impl_map {
    ($($name:literal => $map:ident<K: $($bound:path),*>),* $(,)?) => {$(
        impl<K, V> Describe for $map<K, V>
        where
            K: Describe $(+ $bound)*,
            V: Describe,
        {
            fn describe() -> TypeDescriptor {
                TypeDescriptor::builtin::<Self>($name, TypeKind::Map(shape::<Self, K, V>()))
                    .with_argument::<K>()
                    .with_argument::<V>()
                    .with_default::<Self>()
            }
        }
    )*};
}

impl_map! {
    "Dictionary" => HashMap<K: Eq, Hash>,
    "SortedDictionary" => BTreeMap<K: Ord>,
    "OrderedDictionary" => IndexMap<K: Eq, Hash>,
}
