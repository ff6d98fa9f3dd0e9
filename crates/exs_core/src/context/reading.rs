use core::any::{Any, TypeId};
use std::borrow::Cow;
use std::sync::Arc;

use exs_document::{AttributeValue, Element, reserved};
use log::trace;

use crate::catalog::{
    Implementor, PolymorphicShape, SharedShape, TypeDescriptor, TypeKind, TypeRegistry,
};
use crate::config::Configuration;
use crate::content::{ContentSerializer, mismatch};
use crate::error::{Error, Result};
use crate::references::ReadReferences;

// -----------------------------------------------------------------------------
// Reading

/// The state of one deserialize call.
///
/// Content serializers receive it to recurse into nested elements through
/// [`read_element`](Self::read_element) and [`read_item`](Self::read_item).
pub struct Reading<'a> {
    config: &'a Configuration,
    references: ReadReferences,
    #[cfg(feature = "debug")]
    stack: crate::context::InfoStack,
}

impl<'a> Reading<'a> {
    pub(crate) fn new(config: &'a Configuration) -> Self {
        Self {
            config,
            references: ReadReferences::default(),
            #[cfg(feature = "debug")]
            stack: crate::context::InfoStack::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &'a Configuration {
        self.config
    }

    #[inline]
    pub fn registry(&self) -> &'a TypeRegistry {
        self.config.registry()
    }

    // ----------------------------------------------------------------
    // Values

    /// Reads a top-level element into a value of type `declared`.
    ///
    /// An element written for `declared` itself is read as such; anything
    /// else is resolved from its name and reserved attributes.
    pub(crate) fn read_root(&mut self, element: &Element, declared: TypeId) -> Result<Box<dyn Any>> {
        let registry = self.registry();
        let hint = if self.written_as(element, declared)? {
            None
        } else {
            Some(registry.resolve_element(element)?)
        };
        self.read_element(element, declared, hint, None)
    }

    /// Returns `true` if `element` has the name and shape attribute a value
    /// of `declared` is written with.
    fn written_as(&self, element: &Element, declared: TypeId) -> Result<bool> {
        let registry = self.registry();
        if matches!(registry.named_type(declared)?.kind(), TypeKind::Polymorphic(_)) {
            return Ok(false);
        }
        let (name, extra) = registry.element_name(declared)?;
        if *element.name() != name {
            return Ok(false);
        }
        Ok(match extra {
            Some((name, value)) => element.attribute(&name) == Some(&value),
            None => {
                element.reserved(reserved::ITEM).is_none()
                    && element.reserved(reserved::ARGUMENTS).is_none()
            }
        })
    }

    /// Reads an item of a collection of `declared` items.
    #[inline]
    pub fn read_item(&mut self, element: &Element, declared: TypeId) -> Result<Box<dyn Any>> {
        let hint = self.registry().type_hint(element)?;
        self.read_element(element, declared, hint, None)
    }

    /// Reads `element` into a value of type `declared`.
    ///
    /// `hint` is the type the document names for the element, if any.
    /// `serializer` replaces the configured content serializer of the named
    /// type.
    pub fn read_element(
        &mut self,
        element: &Element,
        declared: TypeId,
        hint: Option<TypeId>,
        serializer: Option<&Arc<dyn ContentSerializer>>,
    ) -> Result<Box<dyn Any>> {
        let registry = self.registry();
        let descriptor = registry.describe(declared)?;
        match descriptor.kind() {
            TypeKind::Nullable(shape) => {
                let null = element.reserved(reserved::NULL).and_then(AttributeValue::as_text);
                if null.is_some_and(|text| text.trim() == "true") {
                    return Ok((shape.none)());
                }
                let inner = self.read_element(element, shape.inner, hint, serializer)?;
                (shape.some)(inner).ok_or_else(|| mismatch(descriptor.type_path()))
            }
            TypeKind::Shared(shape) => self.read_shared(element, descriptor, shape, hint, serializer),
            TypeKind::Polymorphic(shape) => self.read_polymorphic(element, descriptor, shape, hint),
            _ => {
                if let Some(hint) = hint
                    && hint != declared
                {
                    return Err(Error::resolution(
                        element.name(),
                        format!(
                            "expected `{}`, the document names `{}`",
                            descriptor.type_path(),
                            registry.describe(hint)?.type_path()
                        ),
                    ));
                }
                self.read_content(element, descriptor, serializer)
            }
        }
    }

    fn read_shared(
        &mut self,
        element: &Element,
        descriptor: &'a TypeDescriptor,
        shape: &'a SharedShape,
        hint: Option<TypeId>,
        serializer: Option<&Arc<dyn ContentSerializer>>,
    ) -> Result<Box<dyn Any>> {
        let config = self.config;
        let registry = config.registry();

        if let Some(token) = element.reserved(reserved::REFERENCE) {
            let token = token
                .as_text()
                .ok_or_else(|| Error::format(element.name(), "invalid reference token"))?;
            let (ty, instance) = self.references.resolve(token)?;
            if ty != descriptor.type_id() {
                return Err(Error::resolution(
                    element.name(),
                    format!(
                        "reference `{token}` points to `{}`, expected `{}`",
                        registry.describe(ty)?.type_path(),
                        descriptor.type_path()
                    ),
                ));
            }
            trace!("resolved reference `{token}`");
            return (shape.unwrap)(instance).ok_or_else(|| mismatch(descriptor.type_path()));
        }

        let identity = match element.reserved(reserved::IDENTITY) {
            Some(value) => Some(
                value
                    .as_text()
                    .ok_or_else(|| Error::format(element.name(), "invalid identity token"))?,
            ),
            None => None,
        };

        let inner = registry.describe(shape.inner)?;
        let fill = if inner.kind().has_content() && hint.is_none_or(|hint| hint == shape.inner) {
            let serializer = match serializer {
                Some(serializer) => serializer,
                None => config.serializer(shape.inner)?,
            };
            serializer.supports_fill().then_some(serializer)
        } else {
            None
        };

        let instance = match fill {
            // Registered blank, so that the content can refer back to it.
            Some(serializer) => {
                let blank = config.activators().activate(inner)?;
                let instance = (shape.wrap)(blank).ok_or_else(|| mismatch(descriptor.type_path()))?;
                if let Some(token) = identity {
                    self.references.register(token, descriptor.type_id(), instance.clone())?;
                }
                let element = self.migrate(inner, element)?;
                self.enter(inner);
                let mut fill = |target: &mut dyn Any| serializer.fill(self, &element, target);
                (shape.with_mut)(&instance, &mut fill)
                    .ok_or_else(|| mismatch(descriptor.type_path()))??;
                self.leave();
                instance
            }
            None => {
                let value = self.read_element(element, shape.inner, hint, serializer)?;
                let instance = (shape.wrap)(value).ok_or_else(|| mismatch(descriptor.type_path()))?;
                if let Some(token) = identity {
                    self.references.register(token, descriptor.type_id(), instance.clone())?;
                }
                instance
            }
        };
        (shape.unwrap)(instance).ok_or_else(|| mismatch(descriptor.type_path()))
    }

    fn read_polymorphic(
        &mut self,
        element: &Element,
        descriptor: &'a TypeDescriptor,
        shape: &'a PolymorphicShape,
        hint: Option<TypeId>,
    ) -> Result<Box<dyn Any>> {
        let registry = self.registry();
        let concrete = match hint {
            Some(hint) => hint,
            None => registry.type_hint(element)?.ok_or_else(|| {
                Error::resolution(
                    element.name(),
                    format!("`{}` needs the concrete type in the document", descriptor.type_path()),
                )
            })?,
        };

        // Shared instances are named after what they hold.
        let accepts = |ty: TypeId| shape.universal || shape.implementors.iter().any(|i| i.type_id() == ty);
        let tracked = element.reserved(reserved::IDENTITY).is_some()
            || element.reserved(reserved::REFERENCE).is_some();
        let concrete = match registry.shared_of(concrete) {
            Some(shared) if tracked && accepts(shared) => shared,
            _ => concrete,
        };
        if !accepts(concrete) {
            return Err(Error::resolution(
                element.name(),
                format!(
                    "`{}` is not an implementor of `{}`",
                    registry.describe(concrete)?.type_path(),
                    descriptor.type_path()
                ),
            ));
        }

        let value = self.read_element(element, concrete, None, None)?;
        if shape.universal {
            let reflect = registry
                .describe(concrete)?
                .upcast(value)
                .ok_or_else(|| mismatch(descriptor.type_path()))?;
            let value: Box<dyn Any> = Box::new(reflect);
            return Ok(value);
        }
        let implementor = shape
            .implementors
            .iter()
            .find(|i| Implementor::type_id(i) == concrete)
            .ok_or_else(|| mismatch(descriptor.type_path()))?;
        (implementor.cast)(value).ok_or_else(|| mismatch(descriptor.type_path()))
    }

    fn read_content(
        &mut self,
        element: &Element,
        descriptor: &TypeDescriptor,
        serializer: Option<&Arc<dyn ContentSerializer>>,
    ) -> Result<Box<dyn Any>> {
        let config = self.config;
        let element = self.migrate(descriptor, element)?;
        let serializer = match serializer {
            Some(serializer) => serializer,
            None => config.serializer(descriptor.type_id())?,
        };
        self.enter(descriptor);
        let value = serializer.read(self, &element)?;
        self.leave();
        Ok(value)
    }

    /// Brings `element` up to the current version of its type.
    fn migrate<'e>(&self, descriptor: &TypeDescriptor, element: &'e Element) -> Result<Cow<'e, Element>> {
        match self.config.migrations(descriptor.type_id()) {
            Some(migrations) => migrations.migrate(descriptor, element),
            None => Ok(Cow::Borrowed(element)),
        }
    }

    #[inline]
    fn enter(&mut self, descriptor: &TypeDescriptor) {
        trace!("reading `{}`", descriptor.type_path());
        #[cfg(feature = "debug")]
        self.stack.push(descriptor.type_path());
    }

    #[inline]
    fn leave(&mut self) {
        #[cfg(feature = "debug")]
        self.stack.pop();
    }

    /// Logs `error` along with the types being read when it happened.
    pub(crate) fn log_failure(&self, error: &Error) {
        #[cfg(feature = "debug")]
        log::debug!("deserialization failed: {error} (stack:\n{:?})", self.stack);
        #[cfg(not(feature = "debug"))]
        log::debug!("deserialization failed: {error}");
    }
}
