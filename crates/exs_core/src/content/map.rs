use core::any::{Any, TypeId};

use exs_document::{Element, QName, SYSTEM_NAMESPACE};

use crate::catalog::{MapShape, TypeKind, TypeRegistry};
use crate::content::{ContentSerializer, mismatch};
use crate::context::{Reading, Writing};
use crate::error::{Error, Result};

const ITEM: &str = "Item";
const KEY: &str = "Key";
const VALUE: &str = "Value";

/// Entries as `<sys:Item><sys:Key/><sys:Value/></sys:Item>`, in iteration
/// order. Read entries are inserted in document order.
pub(crate) struct MapContent {
    pub ty: TypeId,
}

impl MapContent {
    fn shape<'a>(&self, registry: &'a TypeRegistry) -> Result<(&'a str, &'a MapShape)> {
        let descriptor = registry.describe(self.ty)?;
        match descriptor.kind() {
            TypeKind::Map(shape) => Ok((descriptor.type_path(), shape)),
            _ => Err(Error::contract(format!("`{}` is not a map", descriptor.type_path()))),
        }
    }
}

fn child<'e>(entry: &'e Element, local: &str) -> Result<&'e Element> {
    entry
        .element(&QName::qualified(SYSTEM_NAMESPACE, local))
        .ok_or_else(|| Error::format(entry.name(), format!("missing `{local}` element")))
}

impl ContentSerializer for MapContent {
    fn write(&self, cx: &mut Writing<'_>, value: &dyn Any) -> Result<()> {
        let (type_path, shape) = self.shape(cx.registry())?;
        let entries = (shape.entries)(value).ok_or_else(|| mismatch(type_path))?;
        for (key, value) in entries {
            cx.open_element(QName::qualified(SYSTEM_NAMESPACE, ITEM))?;
            cx.write_element(Some(QName::qualified(SYSTEM_NAMESPACE, KEY)), shape.key, key, None)?;
            cx.write_element(
                Some(QName::qualified(SYSTEM_NAMESPACE, VALUE)),
                shape.value,
                value,
                None,
            )?;
            cx.close_element()?;
        }
        Ok(())
    }

    fn read(&self, cx: &mut Reading<'_>, element: &Element) -> Result<Box<dyn Any>> {
        let (type_path, shape) = self.shape(cx.registry())?;
        let registry = cx.registry();
        let mut entries = Vec::new();
        for entry in element.elements() {
            if !entry.name().matches(Some(SYSTEM_NAMESPACE), ITEM) {
                return Err(Error::format(entry.name(), "expected a dictionary item"));
            }
            let key = child(entry, KEY)?;
            let key = cx.read_element(key, shape.key, registry.type_hint(key)?, None)?;
            let value = child(entry, VALUE)?;
            let value = cx.read_element(value, shape.value, registry.type_hint(value)?, None)?;
            entries.push((key, value));
        }
        (shape.collect)(entries).ok_or_else(|| mismatch(type_path))
    }

    fn supports_fill(&self) -> bool {
        true
    }

    fn fill(&self, cx: &mut Reading<'_>, element: &Element, target: &mut dyn Any) -> Result<()> {
        let (type_path, shape) = self.shape(cx.registry())?;
        let value = self.read(cx, element)?;
        (shape.replace)(target, value).ok_or_else(|| mismatch(type_path))
    }
}
