use core::any::{Any, TypeId};

use exs_document::{Element, QName};
use log::warn;

use crate::catalog::MemberAccess;
use crate::content::{ContentSerializer, mismatch};
use crate::context::{Reading, Writing};
use crate::error::{Error, Result};

/// Walks the member layout of an object type: attribute members first,
/// then content members as child elements, both in member order.
///
/// Attribute values longer than their member's limit come first among the
/// child elements.
pub(crate) struct ObjectContent {
    pub ty: TypeId,
}

impl ContentSerializer for ObjectContent {
    fn write(&self, cx: &mut Writing<'_>, value: &dyn Any) -> Result<()> {
        let config = cx.config();
        let registry = config.registry();
        let layout = config.layout(self.ty)?;
        let type_path = registry.describe(self.ty)?.type_path();

        let mut overflow = Vec::new();
        for member in layout.attributes() {
            let descriptor = member.descriptor();
            let raw = descriptor
                .access()
                .get(value)
                .ok_or_else(|| mismatch(type_path))?;
            let Some((_, present)) = registry.present(descriptor.type_id(), raw)? else {
                continue;
            };
            let text = member.text()?.format(present)?;
            if member.attribute_limit().is_some_and(|limit| text.chars().count() > limit) {
                overflow.push(member);
                continue;
            }
            cx.write_attribute(QName::local(member.name()), text)?;
        }

        for member in overflow.into_iter().chain(layout.contents()) {
            let descriptor = member.descriptor();
            let raw = descriptor
                .access()
                .get(value)
                .ok_or_else(|| mismatch(type_path))?;
            // Absent optional members are left out.
            if registry.present(descriptor.type_id(), raw)?.is_none() {
                continue;
            }
            cx.write_element(
                Some(member.element().clone()),
                descriptor.type_id(),
                raw,
                member.serializer(),
            )?;
        }
        Ok(())
    }

    fn read(&self, cx: &mut Reading<'_>, element: &Element) -> Result<Box<dyn Any>> {
        let descriptor = cx.registry().describe(self.ty)?;
        let mut value = cx.config().activators().activate(descriptor)?;
        self.fill(cx, element, &mut *value)?;
        Ok(value)
    }

    fn supports_fill(&self) -> bool {
        true
    }

    fn fill(&self, cx: &mut Reading<'_>, element: &Element, target: &mut dyn Any) -> Result<()> {
        let config = cx.config();
        let registry = config.registry();
        let layout = config.layout(self.ty)?;

        for member in layout.attributes() {
            let Some(value) = element.attribute(&QName::local(member.name())) else {
                continue;
            };
            let text = value
                .as_text()
                .ok_or_else(|| Error::format(element.name(), "expected attribute text"))?;
            let value = member.text()?.parse(text).map_err(|e| match e {
                Error::Format { message, .. } => {
                    Error::format(element.name(), format!("attribute `{}`: {message}", member.name()))
                }
                other => other,
            })?;
            let value = registry.wrap_present(member.descriptor().type_id(), value)?;
            set(member.descriptor().access(), target, value, member.name())?;
        }

        for child in element.elements() {
            let Some(member) = layout.content(child.name()) else {
                warn!("skipping unknown element `{}` in `{}`", child.name(), element.name());
                continue;
            };
            let hint = registry.type_hint(child)?;
            let value =
                cx.read_element(child, member.descriptor().type_id(), hint, member.serializer())?;
            set(member.descriptor().access(), target, value, member.name())?;
        }
        Ok(())
    }
}

fn set(
    access: &dyn MemberAccess,
    target: &mut dyn Any,
    value: Box<dyn Any>,
    name: &str,
) -> Result<()> {
    access
        .set(target, value)
        .map_err(|_| Error::contract(format!("member `{name}` rejected the value read for it")))
}
