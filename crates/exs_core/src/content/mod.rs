//! The Content Serializer Registry: read/write strategies for the content of
//! one element.
//!
//! A [`ContentSerializer`] sees an element that is already open (on write)
//! or already resolved to its type (on read). Naming, type hints, identity
//! and versioning are handled by the [`Writing`] and [`Reading`] contexts
//! around it.
//!
//! [`Writing`]: crate::Writing
//! [`Reading`]: crate::Reading

// -----------------------------------------------------------------------------
// Modules

mod map;
mod object;
mod sequence;
mod text;

// -----------------------------------------------------------------------------
// Exports

pub use text::{DisplayText, EnumText, Float, FloatText};

pub(crate) use map::MapContent;
pub(crate) use object::ObjectContent;
pub(crate) use sequence::SequenceContent;

use core::any::Any;

use exs_document::Element;

use crate::context::{Reading, Writing};
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// ContentSerializer

/// Reads and writes the content of elements of one type.
///
/// Serializers are shared by every call made with a configuration, so they
/// keep no per-call state; the contexts carry it.
pub trait ContentSerializer: Send + Sync + 'static {
    /// Writes `value` into the currently open element.
    fn write(&self, cx: &mut Writing<'_>, value: &dyn Any) -> Result<()>;

    /// Reads a new value from `element`.
    fn read(&self, cx: &mut Reading<'_>, element: &Element) -> Result<Box<dyn Any>>;

    /// Returns `true` if [`fill`](Self::fill) is supported.
    ///
    /// Shared instances of such types are registered before their content is
    /// read, so that the content can refer back to them.
    fn supports_fill(&self) -> bool {
        false
    }

    /// Reads `element` into an existing, blank value.
    fn fill(&self, _cx: &mut Reading<'_>, element: &Element, _target: &mut dyn Any) -> Result<()> {
        Err(Error::contract(format!(
            "the serializer of `{}` cannot fill an existing instance",
            element.name()
        )))
    }

    /// The text form of the content, for serializers of textual values.
    ///
    /// Only serializers returning `Some` can be used for attributes and
    /// wrapped by encryption.
    fn text(&self) -> Option<&dyn TextConverter> {
        None
    }
}

// -----------------------------------------------------------------------------
// TextConverter

/// Converts values of one type from and to text.
pub trait TextConverter: Send + Sync + 'static {
    fn format(&self, value: &dyn Any) -> Result<String>;

    fn parse(&self, text: &str) -> Result<Box<dyn Any>>;
}

/// A [`ContentSerializer`] writing the text of a [`TextConverter`].
pub struct TextContent<C>(pub C);

impl<C: TextConverter> ContentSerializer for TextContent<C> {
    fn write(&self, cx: &mut Writing<'_>, value: &dyn Any) -> Result<()> {
        let text = self.0.format(value)?;
        cx.write_text(&text)
    }

    fn read(&self, _cx: &mut Reading<'_>, element: &Element) -> Result<Box<dyn Any>> {
        if !element.is_leaf() {
            return Err(Error::format(element.name(), "expected text content"));
        }
        self.0.parse(&element.text()).map_err(|e| match e {
            Error::Format { message, .. } => Error::format(element.name(), message),
            other => other,
        })
    }

    fn text(&self) -> Option<&dyn TextConverter> {
        Some(&self.0)
    }
}

/// The error for a value handed to a serializer of another type.
pub(crate) fn mismatch(expected: &str) -> Error {
    Error::contract(format!("value handed to the serializer of `{expected}` has another type"))
}
