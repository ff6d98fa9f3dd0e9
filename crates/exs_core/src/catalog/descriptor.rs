use core::any::{Any, TypeId, type_name};
use core::fmt;
use std::rc::Rc;
use std::sync::Arc;

use exs_document::SYSTEM_NAMESPACE;

use crate::Reflect;
use crate::activation::Activator;
use crate::catalog::{Describe, MemberDescriptor, TypeRegistry, register_type};
use crate::content::{ContentSerializer, EnumText, TextContent};
use crate::error::Result;

// -----------------------------------------------------------------------------
// Shapes

/// An optional value. Transparent in documents.
#[derive(Clone, Copy)]
pub struct NullableShape {
    pub inner: TypeId,
    /// `None` if the value is not of this type.
    pub get: fn(&dyn Any) -> Option<Option<&dyn Any>>,
    pub some: fn(Box<dyn Any>) -> Option<Box<dyn Any>>,
    pub none: fn() -> Box<dyn Any>,
}

/// An ordered or unordered sequence of items of one type.
#[derive(Clone, Copy)]
pub struct SequenceShape {
    pub item: TypeId,
    pub items: fn(&dyn Any) -> Option<Vec<&dyn Any>>,
    /// `None` if an item has the wrong type.
    pub collect: fn(Vec<Box<dyn Any>>) -> Option<Box<dyn Any>>,
    /// Moves a collected container into an existing one.
    pub replace: fn(&mut dyn Any, Box<dyn Any>) -> Option<()>,
}

/// A key-value container.
#[derive(Clone, Copy)]
pub struct MapShape {
    pub key: TypeId,
    pub value: TypeId,
    pub entries: fn(&dyn Any) -> Option<Vec<(&dyn Any, &dyn Any)>>,
    pub collect: fn(Vec<(Box<dyn Any>, Box<dyn Any>)>) -> Option<Box<dyn Any>>,
    pub replace: fn(&mut dyn Any, Box<dyn Any>) -> Option<()>,
}

/// A reference-counted instance tracked by identity. Transparent in
/// documents apart from the identity attributes.
///
/// Instances are handled as `Rc<dyn Any>` holding the `RefCell` so that one
/// can be registered before its content is read.
#[derive(Clone, Copy)]
pub struct SharedShape {
    pub inner: TypeId,
    pub address: fn(&dyn Any) -> Option<usize>,
    /// Calls `f` with the borrowed inner value.
    pub with_ref: fn(&dyn Any, &mut dyn FnMut(&dyn Any) -> Result<()>) -> Option<Result<()>>,
    /// Calls `f` with the mutably borrowed inner value.
    pub with_mut: fn(&Rc<dyn Any>, &mut dyn FnMut(&mut dyn Any) -> Result<()>) -> Option<Result<()>>,
    pub wrap: fn(Box<dyn Any>) -> Option<Rc<dyn Any>>,
    pub unwrap: fn(Rc<dyn Any>) -> Option<Box<dyn Any>>,
}

/// One concrete type a polymorphic type can hold.
#[derive(Clone)]
pub struct Implementor {
    pub(crate) ty: TypeId,
    pub(crate) register: fn(&mut TypeRegistry),
    pub(crate) cast: Arc<dyn Fn(Box<dyn Any>) -> Option<Box<dyn Any>> + Send + Sync>,
}

impl Implementor {
    /// `C` is stored in `P` with `cast`, usually `|c| Box::new(c)`.
    pub fn new<C: Describe, P: Any>(cast: fn(C) -> P) -> Self {
        Self {
            ty: TypeId::of::<C>(),
            register: register_type::<C>,
            cast: Arc::new(move |value| {
                let concrete = value.downcast::<C>().ok()?;
                Some(Box::new(cast(*concrete)) as Box<dyn Any>)
            }),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.ty
    }
}

/// A type whose content is a value of some other registered type.
#[derive(Clone)]
pub struct PolymorphicShape {
    /// Views the concrete value held.
    pub view: fn(&dyn Any) -> Option<&dyn Reflect>,
    /// Accepts every registered type through [`TypeDescriptor::upcast`].
    pub universal: bool,
    pub implementors: Vec<Implementor>,
}

// -----------------------------------------------------------------------------
// TypeKind

/// The shape of a type, deciding how it is written.
#[derive(Clone)]
pub enum TypeKind {
    /// Text content: primitives, strings and unit enums.
    Leaf(Arc<dyn ContentSerializer>),
    Nullable(NullableShape),
    /// `Vec<T>`: an `Array` element carrying its item type.
    Array(SequenceShape),
    /// An ordered collection other than `Vec`.
    List(SequenceShape),
    Set(SequenceShape),
    Map(MapShape),
    /// A type with a member table.
    Object(Vec<MemberDescriptor>),
    Shared(SharedShape),
    Polymorphic(PolymorphicShape),
}

impl TypeKind {
    /// Returns `true` for kinds that never own an element name.
    #[inline]
    pub fn is_transparent(&self) -> bool {
        matches!(self, Self::Nullable(_) | Self::Shared(_))
    }

    /// Returns `true` for kinds written by a content serializer of their own.
    #[inline]
    pub fn has_content(&self) -> bool {
        !matches!(self, Self::Nullable(_) | Self::Shared(_) | Self::Polymorphic(_))
    }

    #[inline]
    pub fn sequence(&self) -> Option<&SequenceShape> {
        match self {
            Self::Array(s) | Self::List(s) | Self::Set(s) => Some(s),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Leaf(_) => "Leaf",
            Self::Nullable(_) => "Nullable",
            Self::Array(_) => "Array",
            Self::List(_) => "List",
            Self::Set(_) => "Set",
            Self::Map(_) => "Map",
            Self::Object(_) => "Object",
            Self::Shared(_) => "Shared",
            Self::Polymorphic(_) => "Polymorphic",
        }
    }
}

// -----------------------------------------------------------------------------
// TypeDescriptor

/// Everything the engine knows about one runtime type.
///
/// The document name, namespace and generic arguments together identify the
/// type inside one configuration.
#[derive(Clone)]
pub struct TypeDescriptor {
    pub(crate) id: TypeId,
    pub(crate) type_path: &'static str,
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) arguments: Vec<TypeId>,
    pub(crate) kind: TypeKind,
    pub(crate) activator: Option<Activator>,
    pub(crate) upcast: fn(Box<dyn Any>) -> Option<Box<dyn Reflect>>,
    pub(crate) dependencies: Vec<fn(&mut TypeRegistry)>,
}

fn upcast<T: Any>(value: Box<dyn Any>) -> Option<Box<dyn Reflect>> {
    let value = value.downcast::<T>().ok()?;
    Some(value as Box<dyn Reflect>)
}

/// Splits `core::any::type_name::<T>()` into `(module path, name)`, dropping
/// generic arguments.
fn split_type_name(type_path: &str) -> (&str, &str) {
    let base = match type_path.find('<') {
        Some(index) => &type_path[..index],
        None => type_path,
    };
    match base.rfind("::") {
        Some(index) => (&base[..index], &base[index + 2..]),
        None => ("", base),
    }
}

impl TypeDescriptor {
    fn with_kind<T: Any>(
        name: impl Into<String>,
        namespace: impl Into<String>,
        kind: TypeKind,
    ) -> Self {
        Self {
            id: TypeId::of::<T>(),
            type_path: type_name::<T>(),
            name: name.into(),
            namespace: namespace.into(),
            arguments: Vec::new(),
            kind,
            activator: None,
            upcast: upcast::<T>,
            dependencies: Vec::new(),
        }
    }

    /// A text-valued type in the system namespace.
    pub fn leaf<T: Any>(name: &str, serializer: Arc<dyn ContentSerializer>) -> Self {
        Self::with_kind::<T>(name, SYSTEM_NAMESPACE, TypeKind::Leaf(serializer))
    }

    /// A text-valued user type, named after its Rust path.
    pub fn custom_leaf<T: Any>(serializer: Arc<dyn ContentSerializer>) -> Self {
        let (module, name) = split_type_name(type_name::<T>());
        Self::with_kind::<T>(name, format!("rust:{module}"), TypeKind::Leaf(serializer))
    }

    /// A unit enum written by variant name, named after its Rust path.
    ///
    /// ```
    /// use exs_core::{Describe, TypeDescriptor};
    ///
    /// #[derive(Clone, Copy, PartialEq)]
    /// enum Color {
    ///     Red,
    ///     Green,
    /// }
    ///
    /// impl Describe for Color {
    ///     fn describe() -> TypeDescriptor {
    ///         TypeDescriptor::enumeration(vec![("Red", Color::Red), ("Green", Color::Green)])
    ///     }
    /// }
    /// ```
    pub fn enumeration<T>(variants: Vec<(&'static str, T)>) -> Self
    where
        T: Any + Copy + PartialEq + Send + Sync,
    {
        Self::custom_leaf::<T>(Arc::new(TextContent(EnumText::new(variants))))
    }

    /// An object type with the given members, named after its Rust path
    /// (`Subject` in namespace `rust:my_crate::model`).
    pub fn object<T: Any>(members: Vec<MemberDescriptor>) -> Self {
        let (module, name) = split_type_name(type_name::<T>());
        let dependencies = members.iter().map(|m| m.register).collect();
        let namespace = format!("rust:{module}");
        let mut descriptor = Self::with_kind::<T>(name, namespace, TypeKind::Object(members));
        descriptor.dependencies = dependencies;
        descriptor
    }

    /// A polymorphic type accepting the listed implementors.
    pub fn polymorphic<T: Any>(
        name: &str,
        view: fn(&dyn Any) -> Option<&dyn Reflect>,
        implementors: Vec<Implementor>,
    ) -> Self {
        // `Box<dyn path::Trait>` lives in the trait's module.
        let path = type_name::<T>();
        let inner = match path.find('<') {
            Some(index) => path[index + 1..].trim_end_matches('>').trim_start_matches("dyn "),
            None => path,
        };
        let (module, _) = split_type_name(inner);
        let dependencies = implementors.iter().map(|i| i.register).collect();
        let kind = TypeKind::Polymorphic(PolymorphicShape {
            view,
            universal: false,
            implementors,
        });
        let mut descriptor = Self::with_kind::<T>(name, format!("rust:{module}"), kind);
        descriptor.dependencies = dependencies;
        descriptor
    }

    pub(crate) fn builtin<T: Any>(name: &str, kind: TypeKind) -> Self {
        Self::with_kind::<T>(name, SYSTEM_NAMESPACE, kind)
    }

    /// Overrides the document name.
    #[inline]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the document namespace.
    #[inline]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Adds a generic argument, registering it along with this type.
    #[inline]
    pub fn with_argument<A: Describe>(mut self) -> Self {
        self.arguments.push(TypeId::of::<A>());
        self.dependencies.push(register_type::<A>);
        self
    }

    /// Registers `A` along with this type.
    #[inline]
    pub fn with_dependency<A: Describe>(mut self) -> Self {
        self.dependencies.push(register_type::<A>);
        self
    }

    /// Activates blank instances with `T::default()`.
    #[inline]
    pub fn with_default<T: Default + Any>(mut self) -> Self {
        self.activator = Some(Arc::new(|| Box::new(T::default())));
        self
    }

    /// Activates blank instances with `factory`.
    #[inline]
    pub fn with_activator(
        mut self,
        factory: impl Fn() -> Box<dyn Any> + Send + Sync + 'static,
    ) -> Self {
        self.activator = Some(Arc::new(factory));
        self
    }

    // ----------------------------------------------------------------
    // Accessors

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.type_path
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Generic arguments in declaration order.
    #[inline]
    pub fn arguments(&self) -> &[TypeId] {
        &self.arguments
    }

    #[inline]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Returns `true` for `Vec<T>`.
    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }

    /// Returns `true` for every sequence and key-value kind.
    #[inline]
    pub fn is_collection(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Array(_) | TypeKind::List(_) | TypeKind::Set(_) | TypeKind::Map(_)
        )
    }

    /// The item type of a sequence.
    #[inline]
    pub fn item(&self) -> Option<TypeId> {
        self.kind.sequence().map(|s| s.item)
    }

    /// The members of an object type in declaration order.
    #[inline]
    pub fn members(&self) -> &[MemberDescriptor] {
        match &self.kind {
            TypeKind::Object(members) => members,
            _ => &[],
        }
    }

    #[inline]
    pub fn activator(&self) -> Option<&Activator> {
        self.activator.as_ref()
    }

    /// Moves a value of this type behind `Box<dyn Reflect>`.
    #[inline]
    pub fn upcast(&self, value: Box<dyn Any>) -> Option<Box<dyn Reflect>> {
        (self.upcast)(value)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_path", &self.type_path)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("kind", &self.kind.label())
            .field("members", &self.members())
            .finish_non_exhaustive()
    }
}
