use core::any::{Any, TypeId};
use std::sync::Arc;

use exs_document::{QName, WriteOptions};
use exs_utils::TypeIdMap;

use crate::activation::Activators;
use crate::catalog::{MemberDescriptor, Placement, TypeRegistry};
use crate::content::{ContentSerializer, TextConverter, mismatch};
use crate::error::{Error, Result};
use crate::migration::Migrations;

// -----------------------------------------------------------------------------
// Member

/// A member of an object type as the engine writes it.
#[derive(Clone)]
pub struct Member {
    pub(crate) descriptor: MemberDescriptor,
    pub(crate) element: QName,
    pub(crate) placement: Placement,
    pub(crate) attribute_limit: Option<usize>,
    pub(crate) content_type: TypeId,
    pub(crate) serializer: Option<Arc<dyn ContentSerializer>>,
}

impl Member {
    #[inline]
    pub fn descriptor(&self) -> &MemberDescriptor {
        &self.descriptor
    }

    /// The document name.
    #[inline]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// The name of the member element, in the owner's namespace.
    #[inline]
    pub fn element(&self) -> &QName {
        &self.element
    }

    #[inline]
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// For attribute members, the longest text written as an attribute.
    #[inline]
    pub fn attribute_limit(&self) -> Option<usize> {
        self.attribute_limit
    }

    /// The member type with `Option` and `Shared` removed.
    #[inline]
    pub fn content_type(&self) -> TypeId {
        self.content_type
    }

    /// The composed serializer, `None` for polymorphic members.
    #[inline]
    pub fn serializer(&self) -> Option<&Arc<dyn ContentSerializer>> {
        self.serializer.as_ref()
    }

    /// The text form of an attribute member.
    pub fn text(&self) -> Result<&dyn TextConverter> {
        self.serializer
            .as_deref()
            .and_then(|s| s.text())
            .ok_or_else(|| {
                Error::contract(format!("member `{}` has no text form", self.descriptor.member()))
            })
    }
}

// -----------------------------------------------------------------------------
// ObjectLayout

/// The members of one object type, sorted by order.
#[derive(Clone, Default)]
pub struct ObjectLayout {
    pub(crate) members: Vec<Member>,
    pub(crate) identity: Option<usize>,
}

impl ObjectLayout {
    #[inline]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(|m| m.placement == Placement::Attribute)
    }

    pub fn contents(&self) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(|m| m.placement == Placement::Content)
    }

    /// The member read from element `name`: a content member, or an
    /// attribute member whose text may exceed its limit.
    pub fn content(&self, name: &QName) -> Option<&Member> {
        self.members.iter().find(|m| {
            m.element == *name
                && (m.placement == Placement::Content || m.attribute_limit.is_some())
        })
    }

    /// The member whose text is the identity token.
    #[inline]
    pub fn identity(&self) -> Option<&Member> {
        self.identity.and_then(|index| self.members.get(index))
    }
}

// -----------------------------------------------------------------------------
// Configuration

/// An immutable, validated configuration.
///
/// Built once by a [`ConfigurationBuilder`](crate::ConfigurationBuilder) and
/// read by any number of concurrent calls.
pub struct Configuration {
    pub(crate) registry: TypeRegistry,
    pub(crate) activators: Activators,
    pub(crate) serializers: TypeIdMap<Arc<dyn ContentSerializer>>,
    pub(crate) layouts: TypeIdMap<ObjectLayout>,
    pub(crate) migrations: TypeIdMap<Migrations>,
    pub(crate) options: WriteOptions,
}

impl Configuration {
    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    #[inline]
    pub fn activators(&self) -> &Activators {
        &self.activators
    }

    /// The composed content serializer of `type_id`.
    pub fn serializer(&self, type_id: TypeId) -> Result<&Arc<dyn ContentSerializer>> {
        self.serializers.get(&type_id).ok_or_else(|| {
            let descriptor = self.registry.get(type_id);
            match descriptor {
                Some(d) => Error::contract(format!("`{}` has no content of its own", d.type_path())),
                None => Error::Unregistered(format!("{type_id:?}")),
            }
        })
    }

    /// The member layout of object type `type_id`.
    pub fn layout(&self, type_id: TypeId) -> Result<&ObjectLayout> {
        self.layouts.get(&type_id).ok_or_else(|| {
            let descriptor = self.registry.get(type_id);
            match descriptor {
                Some(d) => Error::contract(format!("`{}` is not an object type", d.type_path())),
                None => Error::Unregistered(format!("{type_id:?}")),
            }
        })
    }

    /// The migrations of `type_id`, if it has any.
    #[inline]
    pub fn migrations(&self, type_id: TypeId) -> Option<&Migrations> {
        self.migrations.get(&type_id).filter(|m| !m.is_empty())
    }

    /// How documents are written.
    #[inline]
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// The identity token configured for `value`, the text of its identity
    /// member.
    pub(crate) fn identity_text(&self, type_id: TypeId, value: &dyn Any) -> Result<Option<String>> {
        let Some(member) = self.layouts.get(&type_id).and_then(ObjectLayout::identity) else {
            return Ok(None);
        };
        let descriptor = &member.descriptor;
        let raw = descriptor
            .access()
            .get(value)
            .ok_or_else(|| mismatch(descriptor.type_path()))?;
        match self.registry.present(descriptor.type_id(), raw)? {
            Some((_, present)) => Ok(Some(member.text()?.format(present)?)),
            None => Ok(None),
        }
    }
}
