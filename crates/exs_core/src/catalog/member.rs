use core::any::{Any, TypeId, type_name};
use core::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::catalog::{Describe, TypeRegistry, register_type};

// -----------------------------------------------------------------------------
// Placement & flags

/// Where a member is written inside its owner's element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Placement {
    /// A name/value pair on the owner element. Requires textual content.
    Attribute,
    /// A child element.
    Content,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MemberFlags: u8 {
        /// The member's text is the identity token of shared instances.
        const IDENTITY = 1 << 0;
        /// The member's text is encrypted.
        const ENCRYPT = 1 << 1;
    }
}

// -----------------------------------------------------------------------------
// MemberAccess

/// Type-erased get/set capability for one member of one type.
pub trait MemberAccess: Send + Sync + 'static {
    /// Returns the member of `owner`, or `None` if `owner` is of another type.
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any>;

    /// Replaces the member of `owner`.
    ///
    /// Gives `value` back if either `owner` or `value` has the wrong type.
    fn set(&self, owner: &mut dyn Any, value: Box<dyn Any>) -> Result<(), Box<dyn Any>>;
}

/// A [`MemberAccess`] made of two projection functions.
pub struct Accessor<T, M> {
    get: fn(&T) -> &M,
    get_mut: fn(&mut T) -> &mut M,
}

impl<T, M> Accessor<T, M> {
    #[inline]
    pub const fn new(get: fn(&T) -> &M, get_mut: fn(&mut T) -> &mut M) -> Self {
        Self { get, get_mut }
    }
}

impl<T: Any, M: Any> MemberAccess for Accessor<T, M> {
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        let owner = owner.downcast_ref::<T>()?;
        Some((self.get)(owner))
    }

    fn set(&self, owner: &mut dyn Any, value: Box<dyn Any>) -> Result<(), Box<dyn Any>> {
        let Some(owner) = owner.downcast_mut::<T>() else {
            return Err(value);
        };
        *(self.get_mut)(owner) = *value.downcast::<M>()?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// MemberDescriptor

/// A member of an object type: how to reach it and how it is written.
///
/// Built by a [`Describe`] implementation with its declared name; the
/// document name, order, placement and flags can be overridden when
/// configuring the owner type.
#[derive(Clone)]
pub struct MemberDescriptor {
    pub(crate) owner: TypeId,
    pub(crate) member: &'static str,
    pub(crate) name: String,
    pub(crate) ty: TypeId,
    pub(crate) type_path: &'static str,
    pub(crate) order: i32,
    pub(crate) placement: Option<Placement>,
    pub(crate) flags: MemberFlags,
    pub(crate) access: Arc<dyn MemberAccess>,
    pub(crate) register: fn(&mut TypeRegistry),
}

impl MemberDescriptor {
    /// Describes member `member` of `T`, of type `M`.
    ///
    /// ```
    /// use exs_core::MemberDescriptor;
    ///
    /// struct Subject { message: String }
    ///
    /// let member = MemberDescriptor::new::<Subject, String>(
    ///     "Message",
    ///     |s| &s.message,
    ///     |s| &mut s.message,
    /// );
    /// assert_eq!(member.name(), "Message");
    /// ```
    pub fn new<T: Any, M: Describe>(
        member: &'static str,
        get: fn(&T) -> &M,
        get_mut: fn(&mut T) -> &mut M,
    ) -> Self {
        Self {
            owner: TypeId::of::<T>(),
            member,
            name: member.to_owned(),
            ty: TypeId::of::<M>(),
            type_path: type_name::<M>(),
            order: 0,
            placement: None,
            flags: MemberFlags::empty(),
            access: Arc::new(Accessor::new(get, get_mut)),
            register: register_type::<M>,
        }
    }

    /// Places the member in an attribute unless configured otherwise.
    #[inline]
    pub fn attribute(mut self) -> Self {
        self.placement = Some(Placement::Attribute);
        self
    }

    /// Marks the member as identity key.
    #[inline]
    pub fn identity(mut self) -> Self {
        self.flags |= MemberFlags::IDENTITY;
        self
    }

    /// The name in the owner's declaration.
    #[inline]
    pub fn member(&self) -> &'static str {
        self.member
    }

    /// The document name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn owner(&self) -> TypeId {
        self.owner
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.ty
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.type_path
    }

    #[inline]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// The explicitly configured placement, if any.
    #[inline]
    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    #[inline]
    pub fn flags(&self) -> MemberFlags {
        self.flags
    }

    #[inline]
    pub fn access(&self) -> &dyn MemberAccess {
        &*self.access
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("member", &self.member)
            .field("name", &self.name)
            .field("type_path", &self.type_path)
            .field("order", &self.order)
            .field("placement", &self.placement)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{MemberAccess, MemberDescriptor};

    struct Point {
        x: i32,
    }

    #[test]
    fn accessor_get_set() {
        let member = MemberDescriptor::new::<Point, i32>("X", |p| &p.x, |p| &mut p.x);
        let mut point = Point { x: 1 };

        let value = member.access().get(&point).unwrap();
        assert_eq!(value.downcast_ref::<i32>(), Some(&1));

        member.access().set(&mut point, Box::new(7_i32)).unwrap();
        assert_eq!(point.x, 7);

        assert!(member.access().set(&mut point, Box::new("no")).is_err());
        assert!(member.access().get(&"other").is_none());
    }
}
