//! The Activator Registry: blank instances for object types.

use core::any::{Any, TypeId};
use std::sync::Arc;

use exs_utils::TypeIdMap;

use crate::catalog::{TypeDescriptor, TypeRegistry};
use crate::error::{Error, Result};

/// Builds a blank instance of one type.
pub type Activator = Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>;

/// Construction strategies by type, fixed when the configuration is built.
///
/// A configured factory takes precedence over the type's default
/// constructor. Every activation of a type goes through the same cached
/// strategy, each producing a new instance.
#[derive(Default)]
pub struct Activators {
    strategies: TypeIdMap<Activator>,
}

impl Activators {
    /// Collects the default constructors of `registry`, then `factories`.
    pub(crate) fn new(
        registry: &TypeRegistry,
        factories: impl IntoIterator<Item = (TypeId, Activator)>,
    ) -> Self {
        let mut strategies = TypeIdMap::new();
        for descriptor in registry.iter() {
            if let Some(activator) = descriptor.activator() {
                strategies.insert(descriptor.type_id(), activator.clone());
            }
        }
        for (type_id, factory) in factories {
            strategies.insert(type_id, factory);
        }
        Self { strategies }
    }

    /// The strategy cached for `type_id`.
    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<&Activator> {
        self.strategies.get(&type_id)
    }

    /// Creates a blank instance.
    pub fn activate(&self, descriptor: &TypeDescriptor) -> Result<Box<dyn Any>> {
        let activator = self
            .get(descriptor.type_id())
            .ok_or_else(|| Error::Activation(descriptor.type_path().to_owned()))?;
        let instance = activator();
        if (*instance).type_id() != descriptor.type_id() {
            return Err(Error::contract(format!(
                "the activator of `{}` built a value of another type",
                descriptor.type_path()
            )));
        }
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use core::any::{Any, TypeId};
    use std::sync::Arc;

    use super::{Activator, Activators};
    use crate::catalog::{TypeDescriptor, TypeRegistry};
    use crate::error::Error;

    #[derive(Default)]
    struct Blank(u8);

    struct NoDefault;

    #[test]
    fn default_factory_and_missing() {
        let mut registry = TypeRegistry::empty();
        registry.insert(TypeDescriptor::object::<Blank>(Vec::new()).with_default::<Blank>());
        registry.insert(TypeDescriptor::object::<NoDefault>(Vec::new()));
        registry.insert(TypeDescriptor::object::<u16>(Vec::new()));

        let wrong: Activator = Arc::new(|| Box::new(1_u8) as Box<dyn Any>);
        let activators = Activators::new(&registry, [(TypeId::of::<u16>(), wrong)]);

        let blank = registry.describe_type::<Blank>().unwrap();
        let instance = activators.activate(blank).unwrap();
        assert_eq!(instance.downcast_ref::<Blank>().map(|b| b.0), Some(0));

        let first = activators.get(TypeId::of::<Blank>()).unwrap();
        let second = activators.get(TypeId::of::<Blank>()).unwrap();
        assert!(Arc::ptr_eq(first, second));

        let missing = registry.describe_type::<NoDefault>().unwrap();
        assert!(matches!(activators.activate(missing), Err(Error::Activation(_))));

        let wrong = registry.describe_type::<u16>().unwrap();
        assert!(matches!(activators.activate(wrong), Err(Error::ContractViolation(_))));
    }
}
