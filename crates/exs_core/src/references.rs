//! The Reference Tracker: per-call identity tables.
//!
//! Both tables live inside one [`Writing`] or [`Reading`] context and are
//! dropped with it, so tokens never mean anything across calls.
//!
//! [`Writing`]: crate::Writing
//! [`Reading`]: crate::Reading

use core::any::{Any, TypeId};
use std::rc::Rc;

use exs_utils::hash::{HashMap, HashSet};

use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// WriteReferences

/// Instance addresses already written, with their tokens.
#[derive(Default, Debug)]
pub(crate) struct WriteReferences {
    tokens: HashMap<usize, String>,
    used: HashSet<String>,
    counter: usize,
}

impl WriteReferences {
    /// The token of an instance already written.
    #[inline]
    pub fn lookup(&self, address: usize) -> Option<&str> {
        self.tokens.get(&address).map(String::as_str)
    }

    /// Assigns a token to an instance seen for the first time.
    ///
    /// Uses `explicit` when the type has an identity member, otherwise the
    /// next free number.
    pub fn assign(&mut self, address: usize, explicit: Option<String>) -> Result<String> {
        let token = match explicit {
            Some(token) if self.used.contains(&token) => {
                return Err(Error::contract(format!(
                    "identity `{token}` is shared by two different instances"
                )));
            }
            Some(token) => token,
            None => loop {
                self.counter += 1;
                let candidate = self.counter.to_string();
                if !self.used.contains(&candidate) {
                    break candidate;
                }
            },
        };
        self.used.insert(token.clone());
        self.tokens.insert(address, token.clone());
        Ok(token)
    }
}

// -----------------------------------------------------------------------------
// ReadReferences

/// Instances read so far, by token.
#[derive(Default)]
pub(crate) struct ReadReferences {
    instances: HashMap<String, (TypeId, Rc<dyn Any>)>,
}

impl ReadReferences {
    /// Registers an instance before its content is read.
    pub fn register(&mut self, token: &str, type_id: TypeId, instance: Rc<dyn Any>) -> Result<()> {
        if self.instances.contains_key(token) {
            return Err(Error::contract(format!(
                "identity `{token}` appears on more than one element"
            )));
        }
        self.instances.insert(token.to_owned(), (type_id, instance));
        Ok(())
    }

    /// The instance registered under `token`, with the `Shared` type it was
    /// registered as.
    pub fn resolve(&self, token: &str) -> Result<(TypeId, Rc<dyn Any>)> {
        self.instances
            .get(token)
            .map(|(type_id, instance)| (*type_id, instance.clone()))
            .ok_or_else(|| Error::UnresolvedReference(token.to_owned()))
    }
}
