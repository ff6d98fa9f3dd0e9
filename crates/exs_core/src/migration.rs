//! The Migration Engine: forward-only rewrites of elements written by older
//! versions of a type.

use std::borrow::Cow;
use std::sync::Arc;

use exs_document::{Element, QName, reserved};
use log::trace;

use crate::catalog::TypeDescriptor;
use crate::error::{Error, Result};

/// Rewrites an element in place, one version up.
pub type MigrationStep = Arc<dyn Fn(&mut Element) -> Result<(), String> + Send + Sync>;

/// The ordered migrations of one type.
///
/// Step `i` upgrades an element from version `i` to `i + 1`, so the current
/// version is the number of steps.
#[derive(Clone, Default)]
pub struct Migrations {
    steps: Vec<MigrationStep>,
}

impl Migrations {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, step: MigrationStep) {
        self.steps.push(step);
    }

    /// The version written for this type.
    #[inline]
    pub fn current(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The version `element` declares; `0` when it declares none.
    pub fn declared(&self, descriptor: &TypeDescriptor, element: &Element) -> Result<usize> {
        let Some(value) = element.reserved(reserved::VERSION) else {
            return Ok(0);
        };
        value
            .as_text()
            .and_then(|text| text.trim().parse().ok())
            .ok_or_else(|| Error::Migration {
                type_path: descriptor.type_path().to_owned(),
                version: 0,
                message: format!("invalid version attribute on `{}`", element.name()),
            })
    }

    /// Brings `element` up to the current version.
    ///
    /// An element already current is returned as is; otherwise every step
    /// from its declared version on runs, in order, over one copy.
    pub fn migrate<'e>(
        &self,
        descriptor: &TypeDescriptor,
        element: &'e Element,
    ) -> Result<Cow<'e, Element>> {
        let declared = self.declared(descriptor, element)?;
        let current = self.current();
        if declared == current {
            return Ok(Cow::Borrowed(element));
        }
        if declared > current {
            return Err(Error::Migration {
                type_path: descriptor.type_path().to_owned(),
                version: declared,
                message: format!("newer than the current version {current}"),
            });
        }

        let mut migrated = element.clone();
        for (version, step) in self.steps.iter().enumerate().skip(declared) {
            trace!("migrating `{}` from version {version}", descriptor.type_path());
            step(&mut migrated).map_err(|message| Error::Migration {
                type_path: descriptor.type_path().to_owned(),
                version,
                message,
            })?;
        }
        migrated.set_attribute(QName::reserved(reserved::VERSION), current.to_string());
        Ok(Cow::Owned(migrated))
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::sync::Arc;

    use exs_document::{Element, QName, reserved};

    use super::Migrations;
    use crate::catalog::TypeDescriptor;
    use crate::error::Error;

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::object::<u8>(Vec::new())
    }

    /// v0 `Old` -> v1 `Mid` -> v2 `New`, each step appending to a trail.
    fn migrations() -> Migrations {
        let mut migrations = Migrations::new();
        migrations.push(Arc::new(|e: &mut Element| -> Result<(), String> {
            let old = e.remove_element(&QName::local("Old")).ok_or("no Old")?;
            let mut mid = Element::new(QName::local("Mid"));
            mid.set_text(&old.text());
            e.push_element(mid);
            Ok(())
        }));
        migrations.push(Arc::new(|e: &mut Element| -> Result<(), String> {
            let mid = e.element_mut(&QName::local("Mid")).ok_or("no Mid")?;
            mid.set_name(QName::local("New"));
            Ok(())
        }));
        migrations
    }

    fn versioned(version: Option<usize>, child: &str) -> Element {
        let mut e = Element::new(QName::local("Root"));
        if let Some(version) = version {
            e.set_attribute(QName::reserved(reserved::VERSION), version.to_string());
        }
        let mut c = Element::new(QName::local(child));
        c.set_text("x");
        e.push_element(c);
        e
    }

    #[test]
    fn every_path_reaches_the_same_shape() {
        let migrations = migrations();
        let d = descriptor();
        let from_zero = migrations.migrate(&d, &versioned(None, "Old")).unwrap().into_owned();
        let from_one = migrations.migrate(&d, &versioned(Some(1), "Mid")).unwrap().into_owned();
        assert_eq!(from_zero, from_one);
        assert_eq!(from_zero.element(&QName::local("New")).unwrap().text(), "x");
    }

    #[test]
    fn current_is_untouched() {
        let migrations = migrations();
        let element = versioned(Some(2), "New");
        let result = migrations.migrate(&descriptor(), &element).unwrap();
        assert!(matches!(result, Cow::Borrowed(e) if core::ptr::eq(e, &element)));
    }

    #[test]
    fn failures_name_type_and_version() {
        let migrations = migrations();
        let d = descriptor();
        assert!(matches!(
            migrations.migrate(&d, &versioned(Some(1), "Old")),
            Err(Error::Migration { version: 1, .. })
        ));
        assert!(matches!(
            migrations.migrate(&d, &versioned(Some(3), "New")),
            Err(Error::Migration { version: 3, .. })
        ));
    }
}
