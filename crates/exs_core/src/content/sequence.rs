use core::any::{Any, TypeId};

use exs_document::Element;

use crate::catalog::{SequenceShape, TypeRegistry};
use crate::content::{ContentSerializer, mismatch};
use crate::context::{Reading, Writing};
use crate::error::{Error, Result};

/// Items as child elements, in iteration order.
pub(crate) struct SequenceContent {
    pub ty: TypeId,
}

impl SequenceContent {
    fn shape<'a>(&self, registry: &'a TypeRegistry) -> Result<(&'a str, &'a SequenceShape)> {
        let descriptor = registry.describe(self.ty)?;
        let shape = descriptor
            .kind()
            .sequence()
            .ok_or_else(|| Error::contract(format!("`{}` is not a sequence", descriptor.type_path())))?;
        Ok((descriptor.type_path(), shape))
    }
}

impl ContentSerializer for SequenceContent {
    fn write(&self, cx: &mut Writing<'_>, value: &dyn Any) -> Result<()> {
        let (type_path, shape) = self.shape(cx.registry())?;
        let items = (shape.items)(value).ok_or_else(|| mismatch(type_path))?;
        for item in items {
            cx.write_item(shape.item, item)?;
        }
        Ok(())
    }

    fn read(&self, cx: &mut Reading<'_>, element: &Element) -> Result<Box<dyn Any>> {
        let (type_path, shape) = self.shape(cx.registry())?;
        let items = element
            .elements()
            .map(|child| cx.read_item(child, shape.item))
            .collect::<Result<Vec<_>>>()?;
        (shape.collect)(items).ok_or_else(|| mismatch(type_path))
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
