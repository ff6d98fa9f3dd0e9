use crate::catalog::Placement;
use crate::content::ContentSerializer;
use crate::extension::{Composition, Extension, Target};

/// Places every member with textual content in an attribute, unless its
/// placement was configured explicitly.
///
/// A value whose text is longer than `max_text_length` characters is
/// written as a child element instead, and read back from either form.
#[derive(Clone, Copy, Debug)]
pub struct AutoAttributes {
    pub max_text_length: usize,
}

impl AutoAttributes {
    pub const DEFAULT_MAX_TEXT_LENGTH: usize = 128;

    #[inline]
    pub const fn new(max_text_length: usize) -> Self {
        Self { max_text_length }
    }
}

impl Default for AutoAttributes {
    #[inline]
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_TEXT_LENGTH)
    }
}

impl Extension for AutoAttributes {
    fn kind(&self) -> &'static str {
        "auto-attributes"
    }

    fn placement(
        &self,
        cx: &Composition<'_>,
        target: &Target<'_>,
        serializer: Option<&dyn ContentSerializer>,
        current: Option<Placement>,
    ) -> Option<Placement> {
        let Target::Member { member, .. } = target else {
            return current;
        };
        let textual = serializer.is_some_and(|s| s.text().is_some());
        if current.is_none() && textual && cx.registry.attribute_type(member.type_id()).is_some() {
            Some(Placement::Attribute)
        } else {
            current
        }
    }

    fn attribute_limit(&self, _cx: &Composition<'_>, target: &Target<'_>) -> Option<usize> {
        match target {
            Target::Member { member, .. } if member.placement().is_none() => {
                Some(self.max_text_length)
            }
            _ => None,
        }
    }
}
