use core::fmt::{Debug, Formatter};
use core::slice::Iter;

/// The type paths being processed, outermost first.
///
/// Entries are popped only on success, so after a failure the stack shows
/// where it happened.
#[derive(Default, Clone)]
pub(crate) struct InfoStack {
    stack: Vec<&'static str>,
}

impl InfoStack {
    pub const fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn push(&mut self, type_path: &'static str) {
        self.stack.push(type_path);
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    pub fn iter(&self) -> Iter<'_, &'static str> {
        self.stack.iter()
    }
}

impl Debug for InfoStack {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let mut iter = self.iter();

        if let Some(first) = iter.next() {
            writeln!(f, "`{first}`")?;
        }

        for type_path in iter {
            writeln!(f, " -> `{type_path}`")?;
        }

        Ok(())
    }
}
