use core::any::{Any, TypeId};
use std::sync::Arc;

use exs_document::{AttributeValue, DocumentWriter, QName, reserved};
use log::trace;

use crate::Reflect;
use crate::catalog::{PolymorphicShape, TypeDescriptor, TypeKind, TypeRegistry};
use crate::config::Configuration;
use crate::content::{ContentSerializer, mismatch};
use crate::error::{Error, Result};
use crate::references::WriteReferences;

type Attributes = Vec<(QName, AttributeValue)>;

// -----------------------------------------------------------------------------
// Writing

/// The state of one serialize call.
///
/// Content serializers receive it to emit their content and to recurse into
/// nested values through [`write_element`](Self::write_element) and
/// [`write_item`](Self::write_item).
pub struct Writing<'a> {
    config: &'a Configuration,
    out: &'a mut dyn DocumentWriter,
    references: WriteReferences,
    #[cfg(feature = "debug")]
    stack: crate::context::InfoStack,
}

impl<'a> Writing<'a> {
    pub(crate) fn new(config: &'a Configuration, out: &'a mut dyn DocumentWriter) -> Self {
        Self {
            config,
            out,
            references: WriteReferences::default(),
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
    // Raw output

    /// Appends text to the open element.
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        Ok(self.out.text(text)?)
    }

    /// Sets an attribute of the open element.
    pub fn write_attribute(&mut self, name: QName, value: impl Into<AttributeValue>) -> Result<()> {
        Ok(self.out.attribute(name, value.into())?)
    }

    /// Opens a structural element that does not stand for a value.
    pub fn open_element(&mut self, name: QName) -> Result<()> {
        Ok(self.out.open_element(name)?)
    }

    pub fn close_element(&mut self) -> Result<()> {
        Ok(self.out.close_element()?)
    }

    // ----------------------------------------------------------------
    // Values

    /// Writes a top-level value.
    pub(crate) fn write_root(&mut self, declared: TypeId, value: &dyn Any) -> Result<()> {
        self.write_element(None, declared, value, None)
    }

    /// Writes an item of a collection, named after its runtime type.
    #[inline]
    pub fn write_item(&mut self, declared: TypeId, value: &dyn Any) -> Result<()> {
        self.write_element(None, declared, value, None)
    }

    /// Writes `value`, statically of type `declared`, as one element.
    ///
    /// The element is `name` if given, otherwise the name of the runtime
    /// type. `serializer` replaces the configured content serializer of the
    /// named type.
    pub fn write_element(
        &mut self,
        name: Option<QName>,
        declared: TypeId,
        value: &dyn Any,
        serializer: Option<&Arc<dyn ContentSerializer>>,
    ) -> Result<()> {
        self.write_value(name, declared, value, serializer, Vec::new())
    }

    /// Looks through transparent and polymorphic layers down to the type
    /// owning the element, collecting reserved attributes on the way.
    fn write_value(
        &mut self,
        name: Option<QName>,
        declared: TypeId,
        value: &dyn Any,
        serializer: Option<&Arc<dyn ContentSerializer>>,
        mut attributes: Attributes,
    ) -> Result<()> {
        let registry = self.registry();
        let mut ty = declared;
        let mut value = value;
        loop {
            let descriptor = registry.describe(ty)?;
            match descriptor.kind() {
                TypeKind::Nullable(shape) => match (shape.get)(value) {
                    Some(Some(inner)) => {
                        ty = shape.inner;
                        value = inner;
                    }
                    Some(None) => {
                        attributes.push((QName::reserved(reserved::NULL), "true".into()));
                        self.open(name, shape.inner, attributes)?;
                        return self.close_element();
                    }
                    None => return Err(mismatch(descriptor.type_path())),
                },
                TypeKind::Polymorphic(shape) => {
                    let concrete = (shape.view)(value)
                        .ok_or_else(|| mismatch(descriptor.type_path()))?;
                    ty = self.concrete_type(descriptor, shape, concrete)?;
                    value = concrete.as_any();
                    attributes.push((
                        QName::reserved(reserved::TYPE),
                        registry.type_ref(ty)?.into(),
                    ));
                }
                TypeKind::Shared(shape) => {
                    let address = (shape.address)(value)
                        .ok_or_else(|| mismatch(descriptor.type_path()))?;
                    if let Some(token) = self.references.lookup(address) {
                        trace!("`{}` already written as `{token}`", descriptor.type_path());
                        attributes.push((QName::reserved(reserved::REFERENCE), token.into()));
                        self.open(name, shape.inner, attributes)?;
                        return self.close_element();
                    }

                    let inner_type = shape.inner;
                    let mut name = Some(name);
                    let mut attributes = Some(attributes);
                    let mut write = |inner: &dyn Any| -> Result<()> {
                        let explicit = self.config.identity_text(inner_type, inner)?;
                        let token = self.references.assign(address, explicit)?;
                        let mut attributes = attributes.take().unwrap_or_default();
                        attributes.push((QName::reserved(reserved::IDENTITY), token.into()));
                        let name = name.take().flatten();
                        self.write_value(name, inner_type, inner, serializer, attributes)
                    };
                    return (shape.with_ref)(value, &mut write)
                        .ok_or_else(|| mismatch(descriptor.type_path()))?;
                }
                _ => {
                    self.open(name, ty, attributes)?;
                    self.write_content(descriptor, value, serializer)?;
                    return self.close_element();
                }
            }
        }
    }

    /// The registered type of the value held by a polymorphic value.
    fn concrete_type(
        &self,
        descriptor: &TypeDescriptor,
        shape: &PolymorphicShape,
        concrete: &dyn Reflect,
    ) -> Result<TypeId> {
        let ty = Any::type_id(concrete.as_any());
        if !self.registry().contains(ty) {
            return Err(Error::Unregistered(concrete.reflect_type_path().to_owned()));
        }
        if !shape.universal && !shape.implementors.iter().any(|i| i.type_id() == ty) {
            return Err(Error::contract(format!(
                "`{}` is not a registered implementor of `{}`",
                concrete.reflect_type_path(),
                descriptor.type_path()
            )));
        }
        Ok(ty)
    }

    /// Opens the element of a value of `ty`.
    fn open(&mut self, name: Option<QName>, ty: TypeId, attributes: Attributes) -> Result<()> {
        match name {
            Some(name) => self.out.open_element(name)?,
            None => {
                let (name, extra) = self.registry().element_name(ty)?;
                self.out.open_element(name)?;
                if let Some((name, value)) = extra {
                    self.out.attribute(name, value)?;
                }
            }
        }
        for (name, value) in attributes {
            self.out.attribute(name, value)?;
        }
        Ok(())
    }

    fn write_content(
        &mut self,
        descriptor: &TypeDescriptor,
        value: &dyn Any,
        serializer: Option<&Arc<dyn ContentSerializer>>,
    ) -> Result<()> {
        let config = self.config;
        let ty = descriptor.type_id();
        if let Some(migrations) = config.migrations(ty) {
            self.write_attribute(QName::reserved(reserved::VERSION), migrations.current().to_string())?;
        }
        let serializer = match serializer {
            Some(serializer) => serializer,
            None => config.serializer(ty)?,
        };

        trace!("writing `{}`", descriptor.type_path());
        #[cfg(feature = "debug")]
        self.stack.push(descriptor.type_path());

        serializer.write(self, value)?;

        #[cfg(feature = "debug")]
        self.stack.pop();
        Ok(())
    }

    /// Logs `error` along with the types being written when it happened.
    pub(crate) fn log_failure(&self, error: &Error) {
        #[cfg(feature = "debug")]
        log::debug!("serialization failed: {error} (stack:\n{:?})", self.stack);
        #[cfg(not(feature = "debug"))]
        log::debug!("serialization failed: {error}");
    }
}
