use crate::{AttributeValue, DocumentError, Element, QName};

// -----------------------------------------------------------------------------
// DocumentWriter

/// The write interface the engine emits through.
///
/// Calls must nest: every [`open_element`] is matched by one
/// [`close_element`], attributes and text go to the innermost open element.
///
/// [`open_element`]: DocumentWriter::open_element
/// [`close_element`]: DocumentWriter::close_element
pub trait DocumentWriter {
    fn open_element(&mut self, name: QName) -> Result<(), DocumentError>;

    fn attribute(&mut self, name: QName, value: AttributeValue) -> Result<(), DocumentError>;

    fn text(&mut self, value: &str) -> Result<(), DocumentError>;

    fn close_element(&mut self) -> Result<(), DocumentError>;

    /// Appends a finished subtree as a child of the current element.
    fn subtree(&mut self, element: Element) -> Result<(), DocumentError>;

    /// Number of currently open elements.
    fn depth(&self) -> usize;
}

// -----------------------------------------------------------------------------
// TreeWriter

/// A [`DocumentWriter`] that builds an [`Element`] tree.
#[derive(Debug, Default)]
pub struct TreeWriter {
    open: Vec<Element>,
    root: Option<Element>,
}

impl TreeWriter {
    #[inline]
    pub const fn new() -> Self {
        Self {
            open: Vec::new(),
            root: None,
        }
    }

    /// Returns the finished root element.
    pub fn finish(self) -> Result<Element, DocumentError> {
        if !self.open.is_empty() {
            return Err(DocumentError::Unbalanced("element left open"));
        }
        self.root.ok_or(DocumentError::Empty)
    }

    fn current(&mut self) -> Result<&mut Element, DocumentError> {
        self.open
            .last_mut()
            .ok_or(DocumentError::Unbalanced("no open element"))
    }

    fn attach(&mut self, element: Element) -> Result<(), DocumentError> {
        match self.open.last_mut() {
            Some(parent) => parent.push_element(element),
            None if self.root.is_none() => self.root = Some(element),
            None => return Err(DocumentError::Unbalanced("second root element")),
        }
        Ok(())
    }
}

impl DocumentWriter for TreeWriter {
    fn open_element(&mut self, name: QName) -> Result<(), DocumentError> {
        if self.open.is_empty() && self.root.is_some() {
            return Err(DocumentError::Unbalanced("second root element"));
        }
        self.open.push(Element::new(name));
        Ok(())
    }

    fn attribute(&mut self, name: QName, value: AttributeValue) -> Result<(), DocumentError> {
        self.current()?.set_attribute(name, value);
        Ok(())
    }

    fn text(&mut self, value: &str) -> Result<(), DocumentError> {
        self.current()?.push_text(value);
        Ok(())
    }

    fn close_element(&mut self) -> Result<(), DocumentError> {
        let element = self
            .open
            .pop()
            .ok_or(DocumentError::Unbalanced("close without open"))?;
        self.attach(element)
    }

    fn subtree(&mut self, element: Element) -> Result<(), DocumentError> {
        self.attach(element)
    }

    #[inline]
    fn depth(&self) -> usize {
        self.open.len()
    }
}
