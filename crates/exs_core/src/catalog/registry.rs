use core::any::{Any, TypeId, type_name};

use exs_document::{AttributeValue, Element, QName, TypeRef, reserved};
use exs_utils::TypeIdMap;
use exs_utils::hash::HashMap;
use log::debug;

use crate::catalog::{Describe, TypeDescriptor, TypeKind};
use crate::content::mismatch;
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// TypeRegistry

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct NameKey {
    namespace: String,
    name: String,
    arguments: Vec<TypeId>,
}

/// The Type Catalog: registered [`TypeDescriptor`]s and the index from
/// document names back to runtime types.
///
/// Registration happens while configuring. The name index is rebuilt by
/// [`index`](Self::index) once all overrides are applied, after which the
/// registry is only read.
#[derive(Default)]
pub struct TypeRegistry {
    descriptors: TypeIdMap<TypeDescriptor>,
    order: Vec<TypeId>,
    names: HashMap<NameKey, TypeId>,
    arrays: TypeIdMap<TypeId>,
    shared: TypeIdMap<TypeId>,
}

/// Registers `T`. Stored in descriptors to register dependencies.
pub(crate) fn register_type<T: Describe>(registry: &mut TypeRegistry) {
    registry.register::<T>();
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry with the primitive leaf types and `String`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register::<bool>();
        registry.register::<char>();
        registry.register::<u8>();
        registry.register::<u16>();
        registry.register::<u32>();
        registry.register::<u64>();
        registry.register::<u128>();
        registry.register::<usize>();
        registry.register::<i8>();
        registry.register::<i16>();
        registry.register::<i32>();
        registry.register::<i64>();
        registry.register::<i128>();
        registry.register::<isize>();
        registry.register::<f32>();
        registry.register::<f64>();
        registry.register::<String>();
        registry
    }

    /// Registers `T` and, recursively, the types it depends on.
    ///
    /// Does nothing if `T` is already registered, so recursive types stop at
    /// the second visit.
    pub fn register<T: Describe>(&mut self) {
        let type_id = TypeId::of::<T>();
        if self.descriptors.contains(&type_id) {
            return;
        }
        let descriptor = T::describe();
        let dependencies = descriptor.dependencies.clone();
        self.insert(descriptor);
        for register in dependencies {
            register(self);
        }
        T::register_dependencies(self);
    }

    /// Inserts or replaces a descriptor without registering dependencies.
    pub fn insert(&mut self, descriptor: TypeDescriptor) {
        let type_id = descriptor.id;
        if self.descriptors.insert(type_id, descriptor).is_none() {
            self.order.push(type_id);
        }
    }

    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.descriptors.contains(&type_id)
    }

    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<&TypeDescriptor> {
        self.descriptors.get(&type_id)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, type_id: TypeId) -> Option<&mut TypeDescriptor> {
        self.descriptors.get_mut(&type_id)
    }

    /// Iterates over descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.order.iter().filter_map(|id| self.descriptors.get(id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns the descriptor of `type_id`.
    pub fn describe(&self, type_id: TypeId) -> Result<&TypeDescriptor> {
        self.get(type_id)
            .ok_or_else(|| Error::Unregistered(format!("{type_id:?}")))
    }

    /// Returns the descriptor of `T`.
    pub fn describe_type<T: Any>(&self) -> Result<&TypeDescriptor> {
        self.get(TypeId::of::<T>())
            .ok_or_else(|| Error::Unregistered(type_name::<T>().to_owned()))
    }

    /// Rebuilds the name index.
    ///
    /// Fails if two types share a document name, namespace and argument
    /// list, or if an argument is not registered.
    pub fn index(&mut self) -> Result<()> {
        self.names.clear();
        self.arrays.clear();
        self.shared.clear();

        for type_id in &self.order {
            let Some(descriptor) = self.descriptors.get(type_id) else {
                continue;
            };
            for argument in &descriptor.arguments {
                if !self.descriptors.contains(argument) {
                    return Err(Error::contract(format!(
                        "generic argument {argument:?} of `{}` is not registered",
                        descriptor.type_path
                    )));
                }
            }
            match &descriptor.kind {
                TypeKind::Nullable(_) => continue,
                TypeKind::Shared(shape) => {
                    self.shared.insert(shape.inner, *type_id);
                    continue;
                }
                TypeKind::Array(shape) => {
                    self.arrays.insert(shape.item, *type_id);
                }
                _ => {}
            }

            let key = NameKey {
                namespace: descriptor.namespace.clone(),
                name: descriptor.name.clone(),
                arguments: descriptor.arguments.clone(),
            };
            if let Some(previous) = self.names.insert(key, *type_id) {
                let previous = self.describe(previous)?.type_path;
                return Err(Error::contract(format!(
                    "`{}` and `{previous}` share the document name `{{{}}}{}`",
                    descriptor.type_path, descriptor.namespace, descriptor.name
                )));
            }
        }
        debug!("indexed {} document names", self.names.len());
        Ok(())
    }

    // ----------------------------------------------------------------
    // Resolution

    /// Resolves a document name with already resolved generic arguments.
    pub fn resolve(&self, namespace: &str, name: &str, arguments: &[TypeId]) -> Option<TypeId> {
        let key = NameKey {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            arguments: arguments.to_vec(),
        };
        self.names.get(&key).copied()
    }

    /// Resolves a type name read from a reserved attribute.
    pub fn resolve_ref(&self, type_ref: &TypeRef) -> Option<TypeId> {
        let arguments = type_ref
            .arguments
            .iter()
            .map(|argument| self.resolve_ref(argument))
            .collect::<Option<Vec<_>>>()?;
        self.resolve(type_ref.namespace.as_deref()?, &type_ref.name, &arguments)
    }

    /// The `Vec` type over `item`.
    #[inline]
    pub fn array_of(&self, item: TypeId) -> Option<TypeId> {
        self.arrays.get(&item).copied()
    }

    /// The `Shared` type over `inner`.
    #[inline]
    pub fn shared_of(&self, inner: TypeId) -> Option<TypeId> {
        self.shared.get(&inner).copied()
    }

    /// Resolves the runtime type of a root element.
    ///
    /// In order, first match wins:
    /// 1. `exs:item`: the array over the item type.
    /// 2. The element name with the generic arguments of `exs:arguments`.
    /// 3. `exs:type`.
    pub fn resolve_element(&self, element: &Element) -> Result<TypeId> {
        let node = element.name();

        if let Some(item) = element.reserved(reserved::ITEM) {
            let item = single_type(node, item)?;
            let resolved = self
                .resolve_ref(item)
                .and_then(|item| self.array_of(item));
            return resolved.ok_or_else(|| {
                Error::resolution(node, format!("no array of item type `{item}` is registered"))
            });
        }

        if let Some(namespace) = node.namespace() {
            let arguments = match element.reserved(reserved::ARGUMENTS) {
                Some(AttributeValue::Types(types)) => types
                    .iter()
                    .map(|argument| self.resolve_ref(argument))
                    .collect::<Option<Vec<_>>>(),
                Some(AttributeValue::Text(_)) => None,
                None => Some(Vec::new()),
            };
            if let Some(arguments) = arguments
                && let Some(found) = self.resolve(namespace, node.local_name(), &arguments)
            {
                return Ok(found);
            }
        }

        if let Some(hint) = self.type_hint(element)? {
            return Ok(hint);
        }
        Err(Error::resolution(node, "no registered type matches"))
    }

    /// Resolves `exs:type` of `element`, if present.
    pub fn type_hint(&self, element: &Element) -> Result<Option<TypeId>> {
        let Some(value) = element.reserved(reserved::TYPE) else {
            return Ok(None);
        };
        let type_ref = single_type(element.name(), value)?;
        match self.resolve_ref(type_ref) {
            Some(found) => Ok(Some(found)),
            None => Err(Error::resolution(
                element.name(),
                format!("type `{type_ref}` is not registered"),
            )),
        }
    }

    // ----------------------------------------------------------------
    // Shapes

    /// The type written by a content serializer for values of `type_id`:
    /// `Option` and `Shared` removed.
    pub fn content_type(&self, type_id: TypeId) -> Result<TypeId> {
        self.named_type(type_id).map(TypeDescriptor::type_id)
    }

    /// The type written in an attribute for `type_id`: `Option` removed.
    /// `None` if values of `type_id` cannot be attributes at all.
    pub fn attribute_type(&self, mut type_id: TypeId) -> Option<TypeId> {
        loop {
            let descriptor = self.get(type_id)?;
            match &descriptor.kind {
                TypeKind::Nullable(shape) => type_id = shape.inner,
                kind if kind.has_content() => return Some(type_id),
                _ => return None,
            }
        }
    }

    /// Looks through `Option` layers of `value`.
    ///
    /// Returns `None` for an absent value, otherwise the innermost type and
    /// value.
    pub fn present<'v>(
        &self,
        mut type_id: TypeId,
        mut value: &'v dyn Any,
    ) -> Result<Option<(TypeId, &'v dyn Any)>> {
        loop {
            let descriptor = self.describe(type_id)?;
            let TypeKind::Nullable(shape) = &descriptor.kind else {
                return Ok(Some((type_id, value)));
            };
            match (shape.get)(value) {
                Some(Some(inner)) => {
                    type_id = shape.inner;
                    value = inner;
                }
                Some(None) => return Ok(None),
                None => return Err(mismatch(descriptor.type_path)),
            }
        }
    }

    /// Wraps `value`, of the type [`present`](Self::present) looks through
    /// to, back into the `Option` layers of `type_id`.
    pub fn wrap_present(&self, type_id: TypeId, value: Box<dyn Any>) -> Result<Box<dyn Any>> {
        let descriptor = self.describe(type_id)?;
        match &descriptor.kind {
            TypeKind::Nullable(shape) => {
                let inner = self.wrap_present(shape.inner, value)?;
                (shape.some)(inner).ok_or_else(|| mismatch(descriptor.type_path))
            }
            _ => Ok(value),
        }
    }

    // ----------------------------------------------------------------
    // Naming

    /// Skips transparent wrappers.
    pub fn named_type(&self, mut type_id: TypeId) -> Result<&TypeDescriptor> {
        loop {
            let descriptor = self.describe(type_id)?;
            match &descriptor.kind {
                TypeKind::Nullable(shape) => type_id = shape.inner,
                TypeKind::Shared(shape) => type_id = shape.inner,
                _ => return Ok(descriptor),
            }
        }
    }

    /// The type name written in reserved attributes.
    pub fn type_ref(&self, type_id: TypeId) -> Result<TypeRef> {
        let descriptor = self.named_type(type_id)?;
        let mut type_ref = TypeRef::new(Some(&descriptor.namespace), descriptor.name.clone());
        for argument in &descriptor.arguments {
            type_ref = type_ref.with_argument(self.type_ref(*argument)?);
        }
        Ok(type_ref)
    }

    /// The element name of a value of `type_id` written outside a member,
    /// along with the attribute carrying its item type or generic arguments.
    pub fn element_name(
        &self,
        type_id: TypeId,
    ) -> Result<(QName, Option<(QName, AttributeValue)>)> {
        let descriptor = self.named_type(type_id)?;
        let name = QName::qualified(descriptor.namespace.clone(), descriptor.name.clone());
        let extra = match &descriptor.kind {
            TypeKind::Array(shape) => Some((
                QName::reserved(reserved::ITEM),
                AttributeValue::from(self.type_ref(shape.item)?),
            )),
            _ if !descriptor.arguments.is_empty() => {
                let arguments = descriptor
                    .arguments
                    .iter()
                    .map(|argument| self.type_ref(*argument))
                    .collect::<Result<Vec<_>>>()?;
                Some((QName::reserved(reserved::ARGUMENTS), AttributeValue::from(arguments)))
            }
            _ => None,
        };
        Ok((name, extra))
    }
}

fn single_type<'a>(node: &QName, value: &'a AttributeValue) -> Result<&'a TypeRef> {
    match value.as_types() {
        Some([single]) => Ok(single),
        _ => Err(Error::resolution(node, "expected exactly one type name")),
    }
}

#[cfg(test)]
mod tests {
    use core::any::TypeId;

    use exs_document::{Element, QName, SYSTEM_NAMESPACE, TypeRef, reserved};

    use super::TypeRegistry;
    use crate::error::Error;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register::<Vec<i32>>();
        registry.register::<Vec<String>>();
        registry.register::<Option<u8>>();
        registry.index().unwrap();
        registry
    }

    #[test]
    fn describe_and_resolve_round_trip() {
        let registry = registry();
        let int = registry.describe_type::<i32>().unwrap();
        assert_eq!(int.name(), "int");
        assert_eq!(int.namespace(), SYSTEM_NAMESPACE);
        assert_eq!(
            registry.resolve(SYSTEM_NAMESPACE, "int", &[]),
            Some(TypeId::of::<i32>())
        );

        let vec = registry.type_ref(TypeId::of::<Vec<String>>()).unwrap();
        assert_eq!(vec.name, "Array");
        assert_eq!(registry.resolve_ref(&vec), Some(TypeId::of::<Vec<String>>()));

        // Transparent types are named after what they hold.
        let (name, extra) = registry.element_name(TypeId::of::<Option<u8>>()).unwrap();
        assert_eq!(name.local_name(), "unsignedByte");
        assert!(extra.is_none());
    }

    #[test]
    fn item_hint_wins() {
        let registry = registry();
        let mut element = Element::new(QName::qualified(SYSTEM_NAMESPACE, "int"));
        element.set_attribute(
            QName::reserved(reserved::ITEM),
            TypeRef::new(Some(SYSTEM_NAMESPACE), "string"),
        );
        element.set_attribute(
            QName::reserved(reserved::ARGUMENTS),
            TypeRef::new(Some(SYSTEM_NAMESPACE), "int"),
        );
        assert_eq!(
            registry.resolve_element(&element).unwrap(),
            TypeId::of::<Vec<String>>()
        );
    }

    #[test]
    fn name_then_type_hint() {
        let registry = registry();
        let element = Element::new(QName::qualified(SYSTEM_NAMESPACE, "long"));
        assert_eq!(registry.resolve_element(&element).unwrap(), TypeId::of::<i64>());

        let mut element = Element::new(QName::local("Unknown"));
        element.set_attribute(
            QName::reserved(reserved::TYPE),
            TypeRef::new(Some(SYSTEM_NAMESPACE), "boolean"),
        );
        assert_eq!(registry.resolve_element(&element).unwrap(), TypeId::of::<bool>());

        let element = Element::new(QName::local("Unknown"));
        assert!(matches!(
            registry.resolve_element(&element),
            Err(Error::TypeResolution { node, .. }) if node == "Unknown"
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = TypeRegistry::new();
        let int = registry.describe_type::<i32>().unwrap().clone();
        registry.insert(int.with_name("long").with_namespace(SYSTEM_NAMESPACE));
        assert!(matches!(registry.index(), Err(Error::ContractViolation(_))));
    }
}
