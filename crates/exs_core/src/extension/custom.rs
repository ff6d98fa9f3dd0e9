use core::any::{Any, TypeId};
use std::sync::Arc;

use exs_document::Element;

use crate::content::{ContentSerializer, TextConverter};
use crate::context::{Reading, Writing};
use crate::error::{Error, Result};
use crate::extension::{Composition, Extension, Target};

// -----------------------------------------------------------------------------
// CustomSerializer

/// Replaces the serializer of its targets.
///
/// The replacement is checked on read: a value of another type than the
/// target's is a contract violation.
#[derive(Clone)]
pub struct CustomSerializer {
    serializer: Arc<dyn ContentSerializer>,
}

impl CustomSerializer {
    #[inline]
    pub fn new(serializer: impl ContentSerializer) -> Self {
        Self {
            serializer: Arc::new(serializer),
        }
    }

    #[inline]
    pub fn from_arc(serializer: Arc<dyn ContentSerializer>) -> Self {
        Self { serializer }
    }
}

impl Extension for CustomSerializer {
    fn kind(&self) -> &'static str {
        "custom-serializer"
    }

    fn compose(
        &self,
        cx: &Composition<'_>,
        target: &Target<'_>,
        _inner: Arc<dyn ContentSerializer>,
    ) -> Result<Arc<dyn ContentSerializer>> {
        let ty = target.content_type(cx.registry)?;
        let type_path = cx.registry.describe(ty)?.type_path();
        Ok(Arc::new(Checked {
            inner: self.serializer.clone(),
            ty,
            type_path,
        }))
    }
}

struct Checked {
    inner: Arc<dyn ContentSerializer>,
    ty: TypeId,
    type_path: &'static str,
}

impl ContentSerializer for Checked {
    fn write(&self, cx: &mut Writing<'_>, value: &dyn Any) -> Result<()> {
        self.inner.write(cx, value)
    }

    fn read(&self, cx: &mut Reading<'_>, element: &Element) -> Result<Box<dyn Any>> {
        let value = self.inner.read(cx, element)?;
        if (*value).type_id() != self.ty {
            return Err(Error::contract(format!(
                "custom serializer for `{}` returned a value of another type",
                self.type_path
            )));
        }
        Ok(value)
    }

    fn supports_fill(&self) -> bool {
        self.inner.supports_fill()
    }

    fn fill(&self, cx: &mut Reading<'_>, element: &Element, target: &mut dyn Any) -> Result<()> {
        self.inner.fill(cx, element, target)
    }

    fn text(&self) -> Option<&dyn TextConverter> {
        self.inner.text()
    }
}
