//! The Extension Pipeline: cross-cutting behavior composed over the default
//! serializers when a configuration is built.
//!
//! Entries apply in registration order, each wrapping what the earlier ones
//! produced. An entry whose [`Extension::kind`] and [`Predicate`] equal an
//! earlier entry's replaces it, taking the later position.

// -----------------------------------------------------------------------------
// Modules

mod attributes;
mod custom;
mod encryption;
mod namespaces;

// -----------------------------------------------------------------------------
// Exports

pub use attributes::AutoAttributes;
pub use custom::CustomSerializer;
pub use encryption::{Base64Encryption, Encrypt, Encryption};
pub use namespaces::OptimizedNamespaces;

use core::any::TypeId;
use core::fmt;
use std::sync::Arc;

use exs_document::WriteOptions;
use log::debug;

use crate::catalog::{MemberDescriptor, Placement, TypeDescriptor, TypeRegistry};
use crate::content::ContentSerializer;
use crate::error::Result;

// -----------------------------------------------------------------------------
// Target

/// What a pipeline entry is evaluated against.
#[derive(Clone, Copy, Debug)]
pub enum Target<'a> {
    /// The serializer of a type, used wherever the type appears.
    Type(&'a TypeDescriptor),
    /// The serializer of one member, built over its type's serializer.
    Member {
        owner: &'a TypeDescriptor,
        member: &'a MemberDescriptor,
    },
}

impl Target<'_> {
    /// The type whose values the composed serializer handles, with
    /// `Option` and `Shared` removed.
    pub fn content_type(&self, registry: &TypeRegistry) -> Result<TypeId> {
        match self {
            Self::Type(descriptor) => Ok(descriptor.type_id()),
            Self::Member { member, .. } => registry.content_type(member.type_id()),
        }
    }
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(descriptor) => f.write_str(descriptor.type_path()),
            Self::Member { owner, member } => {
                write!(f, "{}::{}", owner.type_path(), member.member())
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Predicate

/// Selects the targets an entry applies to.
#[derive(Clone)]
pub enum Predicate {
    /// Every type and every member.
    Always,
    Never,
    Type(TypeId),
    /// A member by its declared name.
    Member { owner: TypeId, member: &'static str },
    Custom(Arc<dyn Fn(&Target<'_>) -> bool + Send + Sync>),
}

impl Predicate {
    /// A predicate over arbitrary targets.
    #[inline]
    pub fn custom(f: impl Fn(&Target<'_>) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// The declared member `member` of `T`.
    #[inline]
    pub fn member<T: 'static>(member: &'static str) -> Self {
        Self::Member {
            owner: TypeId::of::<T>(),
            member,
        }
    }

    pub fn matches(&self, target: &Target<'_>) -> bool {
        match (self, target) {
            (Self::Always, _) => true,
            (Self::Never, _) => false,
            (Self::Type(id), Target::Type(descriptor)) => descriptor.type_id() == *id,
            (Self::Member { owner, member }, Target::Member { owner: o, member: m }) => {
                o.type_id() == *owner && m.member() == *member
            }
            (Self::Custom(f), target) => f(target),
            _ => false,
        }
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Always, Self::Always) | (Self::Never, Self::Never) => true,
            (Self::Type(a), Self::Type(b)) => a == b,
            (
                Self::Member { owner: a, member: x },
                Self::Member { owner: b, member: y },
            ) => a == b && x == y,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::Never => f.write_str("Never"),
            Self::Type(id) => f.debug_tuple("Type").field(id).finish(),
            Self::Member { owner, member } => f
                .debug_struct("Member")
                .field("owner", owner)
                .field("member", member)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// -----------------------------------------------------------------------------
// Extension

/// What extensions see while a configuration is being built.
pub struct Composition<'a> {
    pub registry: &'a TypeRegistry,
    /// The configured encryption algorithm.
    pub encryption: &'a Arc<dyn Encryption>,
}

/// A cross-cutting behavior over serializers.
///
/// Every method has a pass-through default; an extension overrides the
/// hooks it needs.
pub trait Extension: Send + Sync + 'static {
    /// Identifies the behavior for deduplication.
    fn kind(&self) -> &'static str;

    /// Wraps or replaces the serializer built so far for `target`.
    fn compose(
        &self,
        _cx: &Composition<'_>,
        _target: &Target<'_>,
        inner: Arc<dyn ContentSerializer>,
    ) -> Result<Arc<dyn ContentSerializer>> {
        Ok(inner)
    }

    /// Decides the placement of a member. `current` is the placement
    /// decided so far, `None` if nothing chose one yet.
    fn placement(
        &self,
        _cx: &Composition<'_>,
        _target: &Target<'_>,
        _serializer: Option<&dyn ContentSerializer>,
        current: Option<Placement>,
    ) -> Option<Placement> {
        current
    }

    /// The longest text a member may have to be written as an attribute.
    /// Longer values are written as content. `None` for no limit.
    fn attribute_limit(&self, _cx: &Composition<'_>, _target: &Target<'_>) -> Option<usize> {
        None
    }

    /// Adjusts how documents are written.
    fn configure_document(&self, _options: &mut WriteOptions) {}
}

/// One pipeline entry.
#[derive(Clone)]
pub struct ExtensionEntry {
    pub predicate: Predicate,
    pub extension: Arc<dyn Extension>,
}

impl fmt::Debug for ExtensionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionEntry")
            .field("kind", &self.extension.kind())
            .field("predicate", &self.predicate)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Pipeline

/// The ordered entries of a configuration.
#[derive(Clone, Default, Debug)]
pub struct Pipeline {
    entries: Vec<ExtensionEntry>,
}

impl Pipeline {
    /// Appends `entry`, first removing an entry of the same kind and
    /// predicate.
    pub fn push(&mut self, entry: ExtensionEntry) {
        let kind = entry.extension.kind();
        if let Some(index) = self
            .entries
            .iter()
            .position(|e| e.extension.kind() == kind && e.predicate == entry.predicate)
        {
            debug!("`{kind}` for {:?} replaces an earlier registration", entry.predicate);
            self.entries.remove(index);
        }
        self.entries.push(entry);
    }

    #[inline]
    pub fn entries(&self) -> &[ExtensionEntry] {
        &self.entries
    }

    /// Entries whose predicate matches `target`, in order.
    pub fn matching<'a>(
        &'a self,
        target: &'a Target<'a>,
    ) -> impl Iterator<Item = &'a ExtensionEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.predicate.matches(target))
    }

    /// Layers every matching entry over `base`, first registered innermost.
    pub fn compose(
        &self,
        cx: &Composition<'_>,
        target: &Target<'_>,
        base: Arc<dyn ContentSerializer>,
    ) -> Result<Arc<dyn ContentSerializer>> {
        // Members are composed over the serializer of their content type,
        // which already carries the entries matching that type.
        let layered = match target {
            Target::Member { .. } => {
                let content_type = target.content_type(cx.registry)?;
                Some(Target::Type(cx.registry.describe(content_type)?))
            }
            Target::Type(_) => None,
        };
        let mut serializer = base;
        for entry in self.matching(target) {
            if layered.as_ref().is_some_and(|t| entry.predicate.matches(t)) {
                continue;
            }
            serializer = entry.extension.compose(cx, target, serializer)?;
        }
        Ok(serializer)
    }

    /// Folds the placement decisions of matching entries.
    pub fn placement(
        &self,
        cx: &Composition<'_>,
        target: &Target<'_>,
        serializer: Option<&dyn ContentSerializer>,
        explicit: Option<Placement>,
    ) -> Option<Placement> {
        self.matching(target).fold(explicit, |current, entry| {
            entry.extension.placement(cx, target, serializer, current)
        })
    }

    /// The smallest attribute limit of matching entries.
    pub fn attribute_limit(&self, cx: &Composition<'_>, target: &Target<'_>) -> Option<usize> {
        self.matching(target)
            .filter_map(|entry| entry.extension.attribute_limit(cx, target))
            .min()
    }

    /// Lets every active entry adjust `options`.
    pub fn configure_document(&self, options: &mut WriteOptions) {
        for entry in &self.entries {
            if entry.predicate != Predicate::Never {
                entry.extension.configure_document(options);
            }
        }
    }
}
