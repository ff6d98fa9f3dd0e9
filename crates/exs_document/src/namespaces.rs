use exs_utils::hash::{HashMap, HashSet};

use crate::{DocumentError, Element, TypeRef};

/// Namespace bound to the `xml` prefix without a declaration.
pub(crate) const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

// -----------------------------------------------------------------------------
// NamespaceLayout

/// Where namespace declarations are placed when a tree is written as text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NamespaceLayout {
    /// Each element's namespace becomes the default namespace of that
    /// element when it differs from the one in scope. Prefixes needed by
    /// attributes and type names are declared on the element using them,
    /// unless already in scope.
    #[default]
    Inline,
    /// The root namespace is the default for the whole document. Every other
    /// namespace gets a prefix in first-use order, declared once on the
    /// innermost element enclosing all of its uses.
    Optimized,
}

// -----------------------------------------------------------------------------
// Declaration & Scope

/// An `xmlns` declaration. `prefix: None` is the default namespace and
/// `namespace: None` undeclares it (`xmlns=""`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Declaration {
    pub prefix: Option<String>,
    pub namespace: Option<String>,
}

impl Declaration {
    #[inline]
    fn default_namespace(namespace: Option<&str>) -> Self {
        Self {
            prefix: None,
            namespace: namespace.map(str::to_owned),
        }
    }

    #[inline]
    fn prefixed(prefix: String, namespace: &str) -> Self {
        Self {
            prefix: Some(prefix),
            namespace: Some(namespace.to_owned()),
        }
    }
}

/// The stack of declarations in effect, innermost last.
#[derive(Default, Debug)]
pub(crate) struct Scope {
    frames: Vec<Vec<Declaration>>,
}

impl Scope {
    #[inline]
    pub fn push(&mut self, declarations: Vec<Declaration>) {
        self.frames.push(declarations);
    }

    #[inline]
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .flatten()
            .find(|d| d.prefix.is_none())
            .and_then(|d| d.namespace.as_deref())
    }

    pub fn prefix_of(&self, namespace: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .flatten()
            .find(|d| d.prefix.is_some() && d.namespace.as_deref() == Some(namespace))
            .and_then(|d| d.prefix.as_deref())
    }

    pub fn namespace_of(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.frames
            .iter()
            .rev()
            .flatten()
            .find(|d| d.prefix.as_deref() == Some(prefix))
            .and_then(|d| d.namespace.as_deref())
    }
}

// -----------------------------------------------------------------------------
// Prefix allocation

/// Hands out one prefix per namespace for the whole document.
///
/// A hinted prefix is used when it is still free, otherwise `ns1`, `ns2`, ...
struct Prefixes<'a> {
    hints: &'a [(String, String)],
    assigned: HashMap<String, String>,
    taken: HashSet<String>,
    counter: usize,
}

impl<'a> Prefixes<'a> {
    fn new(hints: &'a [(String, String)]) -> Self {
        Self {
            hints,
            assigned: HashMap::default(),
            taken: HashSet::default(),
            counter: 0,
        }
    }

    fn get(&self, namespace: &str) -> Option<&str> {
        self.assigned.get(namespace).map(String::as_str)
    }

    fn assign(&mut self, namespace: &str) -> String {
        if let Some(prefix) = self.assigned.get(namespace) {
            return prefix.clone();
        }
        let hinted = self
            .hints
            .iter()
            .find(|(ns, prefix)| ns == namespace && is_free(&self.taken, prefix))
            .map(|(_, prefix)| prefix.clone());
        let prefix = match hinted {
            Some(prefix) => prefix,
            None => loop {
                self.counter += 1;
                let candidate = format!("ns{}", self.counter);
                if is_free(&self.taken, &candidate) {
                    break candidate;
                }
            },
        };
        self.taken.insert(prefix.clone());
        self.assigned.insert(namespace.to_owned(), prefix.clone());
        prefix
    }
}

fn is_free(taken: &HashSet<String>, prefix: &str) -> bool {
    !taken.contains(prefix) && !prefix.eq_ignore_ascii_case("xml") && prefix != "xmlns"
}

// -----------------------------------------------------------------------------
// Planning

/// Declarations per element, indexed in pre-order.
#[derive(Debug, Default)]
pub(crate) struct Plan {
    pub declarations: Vec<Vec<Declaration>>,
}

/// Decides where each namespace is declared for `root`.
pub(crate) fn plan(
    root: &Element,
    layout: NamespaceLayout,
    hints: &[(String, String)],
) -> Result<Plan, DocumentError> {
    let mut prefixes = Prefixes::new(hints);
    let mut plan = Plan::default();
    match layout {
        NamespaceLayout::Inline => {
            plan_inline(root, &mut Scope::default(), &mut prefixes, &mut plan)?;
        }
        NamespaceLayout::Optimized => plan_optimized(root, &mut prefixes, &mut plan)?,
    }
    Ok(plan)
}

fn type_refs(element: &Element) -> impl Iterator<Item = &TypeRef> {
    element
        .attributes()
        .iter()
        .filter_map(|a| a.value.as_types())
        .flatten()
}

fn plan_inline(
    element: &Element,
    scope: &mut Scope,
    prefixes: &mut Prefixes<'_>,
    plan: &mut Plan,
) -> Result<(), DocumentError> {
    let index = plan.declarations.len();
    plan.declarations.push(Vec::new());

    let mut declarations = Vec::new();
    let namespace = element.name().namespace();
    if namespace != scope.default_namespace() {
        declarations.push(Declaration::default_namespace(namespace));
    }
    scope.push(declarations);

    let mut needed: Vec<&str> = Vec::new();
    for attribute in element.attributes() {
        if let Some(ns) = attribute.name.namespace() {
            needed.push(ns);
        }
    }
    let default = scope.default_namespace();
    let mut refs = Vec::new();
    for type_ref in type_refs(element) {
        type_ref.visit(&mut |r| refs.push(r));
    }
    for r in refs {
        match r.namespace.as_deref() {
            ns if ns == default => {}
            None => return Err(DocumentError::Unqualified(r.name.clone())),
            Some(ns) => needed.push(ns),
        }
    }

    let mut added = Vec::new();
    for ns in needed {
        let declared = scope.prefix_of(ns).is_some()
            || added.iter().any(|d: &Declaration| d.namespace.as_deref() == Some(ns));
        if !declared {
            added.push(Declaration::prefixed(prefixes.assign(ns), ns));
        }
    }
    if let Some(frame) = scope.frames.last_mut() {
        frame.extend(added);
        plan.declarations[index] = frame.clone();
    }

    for child in element.elements() {
        plan_inline(child, scope, prefixes, plan)?;
    }
    scope.pop();
    Ok(())
}

/// A namespace use found while walking the tree.
enum Use<'a> {
    Element(Option<&'a str>),
    Attribute(&'a str),
    Type(&'a TypeRef),
}

fn plan_optimized(
    root: &Element,
    prefixes: &mut Prefixes<'_>,
    plan: &mut Plan,
) -> Result<(), DocumentError> {
    // Pre-order walk collecting parents, depths and uses.
    let mut parents: Vec<usize> = Vec::new();
    let mut depths: Vec<usize> = Vec::new();
    let mut uses: Vec<(usize, Use<'_>)> = Vec::new();
    let mut stack: Vec<(&Element, usize, usize)> = vec![(root, 0, 0)];
    while let Some((element, parent, depth)) = stack.pop() {
        let index = parents.len();
        parents.push(parent);
        depths.push(depth);

        uses.push((index, Use::Element(element.name().namespace())));
        for attribute in element.attributes() {
            if let Some(ns) = attribute.name.namespace() {
                uses.push((index, Use::Attribute(ns)));
            }
        }
        for type_ref in type_refs(element) {
            type_ref.visit(&mut |r| uses.push((index, Use::Type(r))));
        }

        let children: Vec<&Element> = element.elements().collect();
        for child in children.into_iter().rev() {
            stack.push((child, index, depth + 1));
        }
    }

    let unqualified = uses.iter().any(|(_, u)| match u {
        Use::Element(ns) => ns.is_none(),
        Use::Type(r) => r.namespace.is_none(),
        Use::Attribute(_) => false,
    });
    let default = if unqualified {
        None
    } else {
        root.name().namespace()
    };

    let mut scopes: Vec<(&str, usize)> = Vec::new();
    for (index, u) in &uses {
        let ns = match u {
            Use::Attribute(ns) => *ns,
            Use::Element(Some(ns)) if Some(*ns) != default => *ns,
            Use::Type(r) => match r.namespace.as_deref() {
                Some(ns) if Some(ns) != default => ns,
                _ => continue,
            },
            Use::Element(_) => continue,
        };
        match scopes.iter_mut().find(|(n, _)| *n == ns) {
            Some((_, at)) => *at = common_ancestor(&parents, &depths, *at, *index),
            None => {
                prefixes.assign(ns);
                scopes.push((ns, *index));
            }
        }
    }

    plan.declarations = vec![Vec::new(); parents.len()];
    if default.is_some() {
        plan.declarations[0].push(Declaration::default_namespace(default));
    }
    for (ns, at) in scopes {
        if let Some(prefix) = prefixes.get(ns) {
            plan.declarations[at].push(Declaration::prefixed(prefix.to_owned(), ns));
        }
    }
    Ok(())
}

fn common_ancestor(parents: &[usize], depths: &[usize], mut a: usize, mut b: usize) -> usize {
    while a != b {
        if depths[a] >= depths[b] {
            a = parents[a];
        } else {
            b = parents[b];
        }
    }
    a
}

#[cfg(test)]
mod tests {
    use super::{NamespaceLayout, plan};
    use crate::{Element, QName, TypeRef, reserved};

    fn hints() -> Vec<(String, String)> {
        vec![("urn:exs:v2".into(), "exs".into())]
    }

    fn leaf(ns: &str, name: &str) -> Element {
        Element::new(QName::qualified(ns, name))
    }

    #[test]
    fn optimized_declares_at_common_ancestor() {
        // <Root urn:a> <Mid urn:a> <X urn:b/> <Y urn:b/> </Mid> <Z urn:a/> </Root>
        let mut mid = leaf("urn:a", "Mid");
        mid.push_element(leaf("urn:b", "X"));
        mid.push_element(leaf("urn:b", "Y"));
        let mut root = leaf("urn:a", "Root");
        root.push_element(mid);
        root.push_element(leaf("urn:a", "Z"));

        let plan = plan(&root, NamespaceLayout::Optimized, &hints()).unwrap();
        assert_eq!(plan.declarations.len(), 5);
        assert_eq!(plan.declarations[0].len(), 1);
        assert_eq!(plan.declarations[0][0].prefix, None);
        assert_eq!(plan.declarations[1].len(), 1);
        assert_eq!(plan.declarations[1][0].prefix.as_deref(), Some("ns1"));
        assert!(plan.declarations[2..].iter().all(Vec::is_empty));
    }

    #[test]
    fn optimized_counts_type_names_and_attributes() {
        let mut child = leaf("urn:a", "Item");
        child.set_attribute(
            QName::reserved(reserved::TYPE),
            TypeRef::new(Some("urn:c"), "Concrete"),
        );
        let mut root = leaf("urn:a", "Root");
        root.push_element(child);

        let plan = plan(&root, NamespaceLayout::Optimized, &hints()).unwrap();
        let at_child: Vec<_> = plan.declarations[1]
            .iter()
            .map(|d| d.prefix.clone().unwrap())
            .collect();
        assert_eq!(at_child, ["exs", "ns1"]);
    }

    #[test]
    fn inline_switches_default_namespace() {
        let mut root = leaf("urn:a", "Root");
        root.push_element(leaf("urn:a", "Same"));
        root.push_element(Element::new(QName::local("Plain")));

        let plan = plan(&root, NamespaceLayout::Inline, &hints()).unwrap();
        assert_eq!(plan.declarations[0].len(), 1);
        assert!(plan.declarations[1].is_empty());
        assert_eq!(plan.declarations[2][0].namespace, None);
    }
}
