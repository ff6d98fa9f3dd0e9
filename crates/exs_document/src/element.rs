use crate::{QName, TypeRef};

// -----------------------------------------------------------------------------
// Attribute

/// The value of an attribute.
///
/// Reserved attributes that name types keep the parsed form so that the
/// namespaces they refer to survive any later move of the element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Types(Vec<TypeRef>),
}

impl AttributeValue {
    /// Returns the text, or `None` for a type list.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Types(_) => None,
        }
    }

    /// Returns the type list, or `None` for text.
    #[inline]
    pub fn as_types(&self) -> Option<&[TypeRef]> {
        match self {
            Self::Types(types) => Some(types),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for AttributeValue {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<TypeRef> for AttributeValue {
    #[inline]
    fn from(value: TypeRef) -> Self {
        Self::Types(vec![value])
    }
}

impl From<Vec<TypeRef>> for AttributeValue {
    #[inline]
    fn from(value: Vec<TypeRef>) -> Self {
        Self::Types(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: AttributeValue,
}

// -----------------------------------------------------------------------------
// Node

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    #[inline]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }
}

// -----------------------------------------------------------------------------
// Element

/// A named node with attributes and ordered children.
///
/// Attributes keep insertion order and names are unique within an element;
/// setting an existing name replaces its value in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    name: QName,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    #[inline]
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Renames the element. Used by migrations.
    #[inline]
    pub fn set_name(&mut self, name: QName) {
        self.name = name;
    }

    // ----------------------------------------------------------------
    // Attributes

    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &QName) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|a| &a.name == name)
            .map(|a| &a.value)
    }

    /// Returns the text of the unqualified attribute `local`.
    pub fn attribute_text(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.matches(None, local))
            .and_then(|a| a.value.as_text())
    }

    /// Returns the reserved attribute `exs:{local}`.
    pub fn reserved(&self, local: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|a| a.name.is_reserved(local))
            .map(|a| &a.value)
    }

    /// Sets an attribute, replacing any previous value of the same name.
    pub fn set_attribute(&mut self, name: QName, value: impl Into<AttributeValue>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub fn remove_attribute(&mut self, name: &QName) -> Option<AttributeValue> {
        let index = self.attributes.iter().position(|a| &a.name == name)?;
        Some(self.attributes.remove(index).value)
    }

    // ----------------------------------------------------------------
    // Children

    #[inline]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    #[inline]
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Iterates over child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Iterates mutably over child elements in document order.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Returns the first child element called `name`.
    pub fn element(&self, name: &QName) -> Option<&Element> {
        self.elements().find(|e| &e.name == name)
    }

    /// Returns the first child element called `name`, mutably.
    pub fn element_mut(&mut self, name: &QName) -> Option<&mut Element> {
        self.elements_mut().find(|e| &e.name == name)
    }

    #[inline]
    pub fn push_element(&mut self, element: Element) {
        self.children.push(Node::Element(element));
    }

    /// Appends text, merging with a directly preceding text node.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.children.last_mut() {
            Some(Node::Text(last)) => last.push_str(text),
            _ => self.children.push(Node::Text(text.to_owned())),
        }
    }

    /// Removes and returns the first child element called `name`.
    pub fn remove_element(&mut self, name: &QName) -> Option<Element> {
        let index = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if &e.name == name))?;
        match self.children.remove(index) {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    /// Returns the concatenated text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let Node::Text(text) = node {
                out.push_str(text);
            }
        }
        out
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.children.clear();
        self.push_text(text);
    }

    /// Returns `true` if the element has no child elements.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.elements().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeValue, Element};
    use crate::{QName, TypeRef, reserved};

    #[test]
    fn attributes_replace_in_place() {
        let mut e = Element::new(QName::local("Subject"));
        e.set_attribute(QName::local("A"), "1");
        e.set_attribute(QName::reserved(reserved::TYPE), TypeRef::new(None, "T"));
        e.set_attribute(QName::local("A"), "2");

        assert_eq!(e.attributes().len(), 2);
        assert_eq!(e.attributes()[0].name, QName::local("A"));
        assert_eq!(e.attribute_text("A"), Some("2"));
        assert!(matches!(
            e.reserved(reserved::TYPE),
            Some(AttributeValue::Types(t)) if t[0].name == "T"
        ));

        assert!(e.remove_attribute(&QName::local("A")).is_some());
        assert_eq!(e.attribute_text("A"), None);
    }

    #[test]
    fn children_and_text() {
        let mut e = Element::new(QName::local("Root"));
        assert!(e.is_leaf());
        e.push_text("a");
        e.push_text("b");
        e.push_text("");
        assert_eq!(e.children().len(), 1);
        assert_eq!(e.text(), "ab");

        e.push_element(Element::new(QName::local("X")));
        e.push_element(Element::new(QName::local("Y")));
        assert!(!e.is_leaf());
        assert!(e.element(&QName::local("Y")).is_some());

        let x = e.remove_element(&QName::local("X")).unwrap();
        assert_eq!(x.name().local_name(), "X");
        assert_eq!(e.elements().count(), 1);

        e.set_text("c");
        assert!(e.is_leaf());
        assert_eq!(e.text(), "c");
    }
}
