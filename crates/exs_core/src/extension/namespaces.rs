use exs_document::{NamespaceLayout, WriteOptions};

use crate::extension::Extension;

/// Declares each namespace once, on the innermost element enclosing all of
/// its uses, with the root namespace as default.
#[derive(Clone, Copy, Debug, Default)]
pub struct OptimizedNamespaces;

impl Extension for OptimizedNamespaces {
    fn kind(&self) -> &'static str {
        "optimized-namespaces"
    }

    fn configure_document(&self, options: &mut WriteOptions) {
        options.layout = NamespaceLayout::Optimized;
    }
}
