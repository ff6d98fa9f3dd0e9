use core::any::{Any, TypeId, type_name};
use std::sync::Arc;

use exs_document::{Element, QName, WriteOptions};
use exs_utils::TypeIdMap;
use exs_utils::hash::HashSet;
use log::debug;

use crate::activation::{Activator, Activators};
use crate::catalog::{
    Describe, MemberDescriptor, MemberFlags, Placement, TypeDescriptor, TypeKind, TypeRegistry,
};
use crate::config::{Configuration, Member, ObjectLayout};
use crate::content::{ContentSerializer, MapContent, ObjectContent, SequenceContent};
use crate::error::{Error, Result};
use crate::extension::{
    AutoAttributes, Base64Encryption, Composition, CustomSerializer, Encrypt, Encryption,
    Extension, ExtensionEntry, OptimizedNamespaces, Pipeline, Predicate, Target,
};
use crate::migration::Migrations;

// -----------------------------------------------------------------------------
// ConfigurationBuilder

/// Collects registrations, overrides and extensions, then validates them
/// into a [`Configuration`].
///
/// Errors found while configuring, like an unknown member name, are kept
/// and returned by [`build`](Self::build).
pub struct ConfigurationBuilder {
    registry: TypeRegistry,
    factories: TypeIdMap<Activator>,
    migrations: TypeIdMap<Migrations>,
    pipeline: Pipeline,
    encryption: Arc<dyn Encryption>,
    options: WriteOptions,
    errors: Vec<Error>,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationBuilder {
    /// A builder with the primitive types registered.
    pub fn new() -> Self {
        Self {
            registry: TypeRegistry::new(),
            factories: TypeIdMap::new(),
            migrations: TypeIdMap::new(),
            pipeline: Pipeline::default(),
            encryption: Arc::new(Base64Encryption),
            options: WriteOptions::default(),
            errors: Vec::new(),
        }
    }

    /// Registers `T` and the types it depends on.
    pub fn register<T: Describe>(mut self) -> Self {
        self.registry.register::<T>();
        self
    }

    /// Registers `T` and applies the overrides of `f` to it.
    pub fn configure<T: Describe>(mut self, f: impl FnOnce(&mut TypeConfig<'_>)) -> Self {
        self.registry.register::<T>();
        let type_id = TypeId::of::<T>();
        let Some(descriptor) = self.registry.get_mut(type_id) else {
            self.errors.push(Error::Unregistered(type_name::<T>().to_owned()));
            return self;
        };
        let mut config = TypeConfig {
            descriptor,
            factories: &mut self.factories,
            migrations: self.migrations.get_or_insert(type_id, Migrations::new),
            pipeline: &mut self.pipeline,
            errors: &mut self.errors,
        };
        f(&mut config);
        self
    }

    /// Adds `extension` for every type and member.
    pub fn extension(self, extension: impl Extension) -> Self {
        self.extend(Predicate::Always, extension)
    }

    /// Adds `extension` for the targets matched by `predicate`.
    pub fn extend(mut self, predicate: Predicate, extension: impl Extension) -> Self {
        self.pipeline.push(ExtensionEntry {
            predicate,
            extension: Arc::new(extension),
        });
        self
    }

    /// The algorithm used by encrypted members without one of their own.
    pub fn encryption(mut self, algorithm: impl Encryption) -> Self {
        self.encryption = Arc::new(algorithm);
        self
    }

    /// Declares each namespace once, as high in the document as possible.
    pub fn use_optimized_namespaces(self) -> Self {
        self.extension(OptimizedNamespaces)
    }

    /// Writes every textual member as an attribute unless configured
    /// otherwise.
    pub fn use_auto_attributes(self) -> Self {
        self.extension(AutoAttributes::default())
    }

    /// Like [`use_auto_attributes`](Self::use_auto_attributes), writing
    /// text longer than `max_text_length` characters as content.
    pub fn use_auto_attributes_with(self, max_text_length: usize) -> Self {
        self.extension(AutoAttributes::new(max_text_length))
    }

    /// Replaces the document write options. Extensions may still adjust them.
    pub fn options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates everything and composes the serializers.
    pub fn build(self) -> Result<Configuration> {
        let Self {
            mut registry,
            factories,
            migrations,
            pipeline,
            encryption,
            mut options,
            errors,
        } = self;
        if let Some(error) = errors.into_iter().next() {
            return Err(error);
        }

        registry.index()?;
        let activators = Activators::new(&registry, factories);
        pipeline.configure_document(&mut options);

        let cx = Composition {
            registry: &registry,
            encryption: &encryption,
        };
        let serializers = compose_types(&cx, &pipeline)?;
        let layouts = compose_members(&cx, &pipeline, &serializers)?;

        debug!(
            "configuration built: {} types, {} serializers, {} pipeline entries",
            registry.len(),
            serializers.len(),
            pipeline.entries().len()
        );
        Ok(Configuration {
            registry,
            activators,
            serializers,
            layouts,
            migrations,
            options,
        })
    }
}

/// Composes the serializer of every type with content of its own.
fn compose_types(
    cx: &Composition<'_>,
    pipeline: &Pipeline,
) -> Result<TypeIdMap<Arc<dyn ContentSerializer>>> {
    let mut serializers = TypeIdMap::new();
    for descriptor in cx.registry.iter() {
        let ty = descriptor.type_id();
        let target = Target::Type(descriptor);
        let base: Arc<dyn ContentSerializer> = match descriptor.kind() {
            TypeKind::Leaf(serializer) => serializer.clone(),
            TypeKind::Array(_) | TypeKind::List(_) | TypeKind::Set(_) => {
                Arc::new(SequenceContent { ty })
            }
            TypeKind::Map(_) => Arc::new(MapContent { ty }),
            TypeKind::Object(_) => Arc::new(ObjectContent { ty }),
            TypeKind::Nullable(_) | TypeKind::Shared(_) | TypeKind::Polymorphic(_) => {
                if let Some(entry) = pipeline
                    .matching(&target)
                    .find(|e| matches!(e.predicate, Predicate::Type(_)))
                {
                    return Err(Error::contract(format!(
                        "`{}` cannot apply to `{target}`: the type has no content of its own",
                        entry.extension.kind()
                    )));
                }
                continue;
            }
        };
        serializers.insert(ty, pipeline.compose(cx, &target, base)?);
    }
    Ok(serializers)
}

/// Composes the members of every object type.
fn compose_members(
    cx: &Composition<'_>,
    pipeline: &Pipeline,
    serializers: &TypeIdMap<Arc<dyn ContentSerializer>>,
) -> Result<TypeIdMap<ObjectLayout>> {
    let registry = cx.registry;
    let mut layouts = TypeIdMap::new();
    for owner in registry.iter() {
        let TypeKind::Object(members) = owner.kind() else {
            continue;
        };
        let mut sorted: Vec<&MemberDescriptor> = members.iter().collect();
        sorted.sort_by_key(|m| m.order());

        let mut layout = ObjectLayout::default();
        let mut names = HashSet::<&str>::default();
        for member in sorted {
            let target = Target::Member { owner, member };
            let content_type = registry.content_type(member.type_id())?;

            let serializer = match serializers.get(&content_type) {
                Some(base) => Some(pipeline.compose(cx, &target, base.clone())?),
                None => {
                    if let Some(entry) = pipeline
                        .matching(&target)
                        .find(|e| matches!(e.predicate, Predicate::Member { .. }))
                    {
                        return Err(Error::contract(format!(
                            "`{}` cannot apply to `{target}`: its type has no content of its own",
                            entry.extension.kind()
                        )));
                    }
                    None
                }
            };

            let mut placement =
                pipeline.placement(cx, &target, serializer.as_deref(), member.placement());
            let identity = member.flags().contains(MemberFlags::IDENTITY);
            if identity {
                if layout.identity.is_some() {
                    return Err(Error::contract(format!(
                        "`{}` has more than one identity member",
                        owner.type_path()
                    )));
                }
                layout.identity = Some(layout.members.len());
                placement = Some(Placement::Attribute);
            }
            let placement = placement.unwrap_or(Placement::Content);
            let attribute_limit = if placement == Placement::Attribute && !identity {
                pipeline.attribute_limit(cx, &target)
            } else {
                None
            };

            if placement == Placement::Attribute {
                let textual = serializer.as_ref().is_some_and(|s| s.text().is_some());
                if !textual || registry.attribute_type(member.type_id()).is_none() {
                    return Err(Error::contract(format!(
                        "`{target}` cannot be an attribute: its content is not textual"
                    )));
                }
            }
            if !names.insert(member.name()) {
                return Err(Error::contract(format!(
                    "`{}` has two members named `{}`",
                    owner.type_path(),
                    member.name()
                )));
            }

            layout.members.push(Member {
                descriptor: member.clone(),
                element: QName::qualified(owner.namespace(), member.name()),
                placement,
                attribute_limit,
                content_type,
                serializer,
            });
        }
        layouts.insert(owner.type_id(), layout);
    }
    Ok(layouts)
}

// -----------------------------------------------------------------------------
// TypeConfig

/// Overrides for one type, handed out by
/// [`ConfigurationBuilder::configure`].
pub struct TypeConfig<'a> {
    descriptor: &'a mut TypeDescriptor,
    factories: &'a mut TypeIdMap<Activator>,
    migrations: &'a mut Migrations,
    pipeline: &'a mut Pipeline,
    errors: &'a mut Vec<Error>,
}

impl TypeConfig<'_> {
    /// Sets the document name.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.descriptor.name = name.into();
        self
    }

    /// Sets the document namespace.
    pub fn namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.descriptor.namespace = namespace.into();
        self
    }

    /// Replaces the content serializer of the type.
    pub fn serializer(&mut self, serializer: impl ContentSerializer) -> &mut Self {
        self.pipeline.push(ExtensionEntry {
            predicate: Predicate::Type(TypeDescriptor::type_id(self.descriptor)),
            extension: Arc::new(CustomSerializer::new(serializer)),
        });
        self
    }

    /// Builds blank instances with `factory` instead of the default
    /// constructor.
    pub fn activator(&mut self, factory: impl Fn() -> Box<dyn Any> + Send + Sync + 'static) -> &mut Self {
        self.factories
            .insert(TypeDescriptor::type_id(self.descriptor), Arc::new(factory));
        self
    }

    /// Appends the next migration step. The first step upgrades from
    /// version 0.
    pub fn migration(
        &mut self,
        step: impl Fn(&mut Element) -> Result<(), String> + Send + Sync + 'static,
    ) -> &mut Self {
        self.migrations.push(Arc::new(step));
        self
    }

    /// Overrides for the member declared as `member`.
    ///
    /// An unknown name fails the build.
    pub fn member(&mut self, member: &'static str) -> MemberConfig<'_> {
        let owner = TypeDescriptor::type_id(self.descriptor);
        let type_path = self.descriptor.type_path();
        let found = match &mut self.descriptor.kind {
            TypeKind::Object(members) => members.iter_mut().find(|m| m.member() == member),
            _ => None,
        };
        if found.is_none() {
            self.errors.push(Error::contract(format!(
                "`{type_path}` has no member `{member}`"
            )));
        }
        MemberConfig {
            owner,
            member,
            descriptor: found,
            pipeline: &mut *self.pipeline,
        }
    }
}

// -----------------------------------------------------------------------------
// MemberConfig

/// Overrides for one member, handed out by [`TypeConfig::member`].
pub struct MemberConfig<'a> {
    owner: TypeId,
    member: &'static str,
    descriptor: Option<&'a mut MemberDescriptor>,
    pipeline: &'a mut Pipeline,
}

impl MemberConfig<'_> {
    fn update(&mut self, f: impl FnOnce(&mut MemberDescriptor)) -> &mut Self {
        if let Some(descriptor) = self.descriptor.as_deref_mut() {
            f(descriptor);
        }
        self
    }

    fn push(&mut self, extension: impl Extension) -> &mut Self {
        self.pipeline.push(ExtensionEntry {
            predicate: Predicate::Member {
                owner: self.owner,
                member: self.member,
            },
            extension: Arc::new(extension),
        });
        self
    }

    /// Sets the document name.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.update(|m| m.name = name)
    }

    /// Members are written by ascending order, then declaration order.
    pub fn order(&mut self, order: i32) -> &mut Self {
        self.update(|m| m.order = order)
    }

    pub fn attribute(&mut self) -> &mut Self {
        self.update(|m| m.placement = Some(Placement::Attribute))
    }

    pub fn content(&mut self) -> &mut Self {
        self.update(|m| m.placement = Some(Placement::Content))
    }

    /// Uses the member's text as the identity token of shared instances.
    pub fn identity(&mut self) -> &mut Self {
        self.update(|m| m.flags |= MemberFlags::IDENTITY)
    }

    /// Encrypts the member's text with the configured algorithm.
    pub fn encrypt(&mut self) -> &mut Self {
        self.update(|m| m.flags |= MemberFlags::ENCRYPT);
        self.push(Encrypt::new())
    }

    /// Replaces the content serializer of the member.
    pub fn serializer(&mut self, serializer: impl ContentSerializer) -> &mut Self {
        self.push(CustomSerializer::new(serializer))
    }
}
