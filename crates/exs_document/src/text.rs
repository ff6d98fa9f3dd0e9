use std::borrow::Cow;

use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName as XmlName;
use log::trace;
use quick_xml::{Reader, Writer};

use crate::namespaces::{self, Declaration, NamespaceLayout, Plan, Scope};
use crate::type_ref::write_list;
use crate::{
    AttributeValue, DocumentError, EXS_NAMESPACE, Element, Node, QName, SYSTEM_NAMESPACE, TypeRef,
    reserved,
};

// -----------------------------------------------------------------------------
// WriteOptions

/// Controls the textual form produced by [`to_string`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    /// Emit an `<?xml ...?>` declaration.
    pub declaration: bool,
    /// Indent nested elements by this many spaces.
    pub indent: Option<usize>,
    pub layout: NamespaceLayout,
    /// Preferred prefixes, as `(namespace, prefix)` pairs.
    pub prefixes: Vec<(String, String)>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            declaration: false,
            indent: None,
            layout: NamespaceLayout::Inline,
            prefixes: vec![
                (EXS_NAMESPACE.to_owned(), "exs".to_owned()),
                (SYSTEM_NAMESPACE.to_owned(), "sys".to_owned()),
            ],
        }
    }
}

// -----------------------------------------------------------------------------
// Writing

/// Writes `root` as text.
pub fn to_string(root: &Element, options: &WriteOptions) -> Result<String, DocumentError> {
    let plan = namespaces::plan(root, options.layout, &options.prefixes)?;
    let writer = match options.indent {
        Some(width) => Writer::new_with_indent(Vec::new(), b' ', width),
        None => Writer::new(Vec::new()),
    };
    let mut emitter = Emitter {
        writer,
        plan,
        next: 0,
        scope: Scope::default(),
    };

    if options.declaration {
        emitter
            .writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(DocumentError::emit)?;
    }
    emitter.element(root)?;

    String::from_utf8(emitter.writer.into_inner()).map_err(DocumentError::emit)
}

struct Emitter {
    writer: Writer<Vec<u8>>,
    plan: Plan,
    next: usize,
    scope: Scope,
}

impl Emitter {
    fn element(&mut self, element: &Element) -> Result<(), DocumentError> {
        let declarations = self
            .plan
            .declarations
            .get_mut(self.next)
            .map(core::mem::take)
            .unwrap_or_default();
        self.next += 1;

        self.scope.push(declarations.clone());
        let name = self.element_name(element.name())?;

        let mut start = BytesStart::new(name.as_str());
        for Declaration { prefix, namespace } in &declarations {
            let key = match prefix {
                Some(prefix) => format!("xmlns:{prefix}"),
                None => "xmlns".to_owned(),
            };
            push_attribute(&mut start, &key, namespace.as_deref().unwrap_or(""));
        }

        for attribute in element.attributes() {
            let key = self.attribute_name(&attribute.name)?;
            let value = match &attribute.value {
                AttributeValue::Text(text) => Cow::Borrowed(text.as_str()),
                AttributeValue::Types(types) => Cow::Owned(self.type_list(types)?),
            };
            push_attribute(&mut start, &key, &value);
        }

        if element.children().is_empty() {
            self.write(Event::Empty(start))?;
        } else {
            self.write(Event::Start(start))?;
            for child in element.children() {
                match child {
                    Node::Element(child) => self.element(child)?,
                    Node::Text(text) => self.write(Event::Text(BytesText::new(text)))?,
                }
            }
            self.write(Event::End(BytesEnd::new(name.as_str())))?;
        }

        self.scope.pop();
        Ok(())
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), DocumentError> {
        self.writer.write_event(event).map_err(DocumentError::emit)
    }

    fn element_name(&self, name: &QName) -> Result<String, DocumentError> {
        let default = self.scope.default_namespace();
        match name.namespace() {
            ns if ns == default => Ok(name.local_name().to_owned()),
            Some(ns) => self.prefixed(ns, name.local_name()),
            None => Err(DocumentError::Emit(format!(
                "element `{name}` has no namespace under a default namespace"
            ))),
        }
    }

    fn attribute_name(&self, name: &QName) -> Result<String, DocumentError> {
        match name.namespace() {
            Some(ns) => self.prefixed(ns, name.local_name()),
            None => Ok(name.local_name().to_owned()),
        }
    }

    fn prefixed(&self, namespace: &str, local: &str) -> Result<String, DocumentError> {
        match self.scope.prefix_of(namespace) {
            Some(prefix) => Ok(format!("{prefix}:{local}")),
            None => Err(DocumentError::Emit(format!(
                "no prefix in scope for namespace `{namespace}`"
            ))),
        }
    }

    fn type_list(&self, types: &[TypeRef]) -> Result<String, DocumentError> {
        let default = self.scope.default_namespace();
        let mut out = String::new();
        write_list(&mut out, types, &|ns, name| match ns {
            ns if ns == default => Ok(None),
            None => Err(DocumentError::Unqualified(name.to_owned())),
            Some(ns) => self
                .scope
                .prefix_of(ns)
                .map(|p| Some(p.to_owned()))
                .ok_or_else(|| {
                    DocumentError::Emit(format!("no prefix in scope for namespace `{ns}`"))
                }),
        })?;
        Ok(out)
    }
}

/// Pushes an attribute, escaping line breaks and tabs so they survive
/// attribute value normalization.
fn push_attribute(start: &mut BytesStart<'_>, key: &str, value: &str) {
    let escaped = escape(value);
    let value = if escaped.contains(['\n', '\r', '\t']) {
        escaped
            .replace('\n', "&#10;")
            .replace('\r', "&#13;")
            .replace('\t', "&#9;")
    } else {
        escaped.into_owned()
    };
    start.push_attribute(XmlAttribute {
        key: XmlName(key.as_bytes()),
        value: Cow::Owned(value.into_bytes()),
    });
}

// -----------------------------------------------------------------------------
// Reading

/// Parses text into an element tree.
///
/// Namespace declarations are resolved and dropped; type-valued reserved
/// attributes are parsed into [`TypeRef`]s. Whitespace-only text between
/// child elements is discarded.
pub fn parse(text: &str) -> Result<Element, DocumentError> {
    let mut reader = Reader::from_str(text);
    let mut scope = Scope::default();
    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(DocumentError::syntax)? {
            Event::Start(start) => {
                let element = open_element(&start, &mut scope)?;
                open.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&start, &mut scope)?;
                scope.pop();
                attach(&mut open, &mut root, element)?;
            }
            Event::End(_) => {
                let mut element = open
                    .pop()
                    .ok_or_else(|| DocumentError::Syntax("unexpected end tag".into()))?;
                scope.pop();
                if !element.is_leaf() {
                    element
                        .children_mut()
                        .retain(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()));
                }
                attach(&mut open, &mut root, element)?;
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(DocumentError::syntax)?;
                push_text(&mut open, &text)?;
            }
            Event::CData(c) => {
                let text = String::from_utf8(c.into_inner().into_owned())
                    .map_err(DocumentError::syntax)?;
                push_text(&mut open, &text)?;
            }
            Event::Eof => break,
            other => trace!("skipping {other:?}"),
        }
    }

    if !open.is_empty() {
        return Err(DocumentError::Syntax("unclosed element".into()));
    }
    root.ok_or(DocumentError::Empty)
}

fn push_text(open: &mut [Element], text: &str) -> Result<(), DocumentError> {
    match open.last_mut() {
        Some(current) => current.push_text(text),
        None if text.trim().is_empty() => {}
        None => return Err(DocumentError::Syntax("text outside the root element".into())),
    }
    Ok(())
}

fn attach(
    open: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), DocumentError> {
    match open.last_mut() {
        Some(parent) => parent.push_element(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(DocumentError::Syntax("more than one root element".into())),
    }
    Ok(())
}

fn split(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

fn open_element(start: &BytesStart<'_>, scope: &mut Scope) -> Result<Element, DocumentError> {
    let mut declarations = Vec::new();
    let mut plain: Vec<(String, String)> = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(DocumentError::syntax)?;
        let key = core::str::from_utf8(attribute.key.as_ref()).map_err(DocumentError::syntax)?;
        let value = attribute
            .unescape_value()
            .map_err(DocumentError::syntax)?
            .into_owned();
        match split(key) {
            (None, "xmlns") => declarations.push(Declaration {
                prefix: None,
                namespace: (!value.is_empty()).then_some(value),
            }),
            (Some("xmlns"), prefix) => declarations.push(Declaration {
                prefix: Some(prefix.to_owned()),
                namespace: Some(value),
            }),
            _ => plain.push((key.to_owned(), value)),
        }
    }
    scope.push(declarations);

    let raw = start.name();
    let raw = core::str::from_utf8(raw.as_ref()).map_err(DocumentError::syntax)?;
    let name = match split(raw) {
        (Some(prefix), local) => QName::new(Some(resolve_prefix(scope, prefix)?), local),
        (None, local) => QName::new(scope.default_namespace(), local),
    };

    let mut element = Element::new(name);
    for (key, value) in plain {
        let name = match split(&key) {
            (Some(prefix), local) => QName::new(Some(resolve_prefix(scope, prefix)?), local),
            (None, local) => QName::local(local),
        };
        let value = if name.namespace() == Some(EXS_NAMESPACE)
            && reserved::is_type_valued(name.local_name())
        {
            let namespace_of = |prefix: Option<&str>| match prefix {
                Some(prefix) => resolve_prefix(scope, prefix).map(|ns| Some(ns.to_owned())),
                None => Ok(scope.default_namespace().map(str::to_owned)),
            };
            AttributeValue::Types(TypeRef::parse_list(&value, &namespace_of)?)
        } else {
            AttributeValue::Text(value)
        };
        element.set_attribute(name, value);
    }
    Ok(element)
}

fn resolve_prefix<'s>(scope: &'s Scope, prefix: &str) -> Result<&'s str, DocumentError> {
    scope
        .namespace_of(prefix)
        .ok_or_else(|| DocumentError::UnknownPrefix(prefix.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::{WriteOptions, parse, to_string};
    use crate::{
        AttributeValue, DocumentError, Element, NamespaceLayout, QName, SYSTEM_NAMESPACE,
        TypeRef, reserved,
    };

    fn options(layout: NamespaceLayout) -> WriteOptions {
        WriteOptions {
            layout,
            ..WriteOptions::default()
        }
    }

    fn sample() -> Element {
        let mut root = Element::new(QName::qualified("urn:app", "Subject"));
        root.set_attribute(QName::local("Id"), "a \"quoted\"\nline");
        let mut message = Element::new(QName::qualified("urn:app", "Message"));
        message.push_text("Hello <World> & you");
        root.push_element(message);

        let mut item = Element::new(QName::qualified(SYSTEM_NAMESPACE, "Array"));
        item.set_attribute(
            QName::reserved(reserved::ITEM),
            TypeRef::new(Some(SYSTEM_NAMESPACE), "int"),
        );
        let mut one = Element::new(QName::qualified(SYSTEM_NAMESPACE, "int"));
        one.push_text("1");
        item.push_element(one);
        root.push_element(item);
        root
    }

    #[test]
    fn plain_document() {
        let mut root = Element::new(QName::local("Subject"));
        let mut message = Element::new(QName::local("Message"));
        message.push_text("Hello World!");
        root.push_element(message);
        assert_eq!(
            to_string(&root, &WriteOptions::default()).unwrap(),
            "<Subject><Message>Hello World!</Message></Subject>"
        );

        let mut root = Element::new(QName::local("Subject"));
        root.set_attribute(QName::local("Message"), "Hello World!");
        assert_eq!(
            to_string(&root, &WriteOptions::default()).unwrap(),
            "<Subject Message=\"Hello World!\"/>"
        );
    }

    #[test]
    fn inline_round_trip() {
        let root = sample();
        let text = to_string(&root, &options(NamespaceLayout::Inline)).unwrap();
        assert!(text.starts_with("<Subject xmlns=\"urn:app\""));
        assert!(text.contains("<Array xmlns=\"urn:exs:system\" xmlns:exs=\"urn:exs:v2\" exs:item=\"int\">"));
        assert_eq!(parse(&text).unwrap(), root);
    }

    #[test]
    fn optimized_round_trip() {
        let root = sample();
        let text = to_string(&root, &options(NamespaceLayout::Optimized)).unwrap();
        assert_eq!(text.matches("xmlns:sys=").count(), 1);
        assert!(text.contains("<sys:Array xmlns:sys=\"urn:exs:system\" xmlns:exs=\"urn:exs:v2\" exs:item=\"sys:int\">"));
        assert_eq!(parse(&text).unwrap(), root);
    }

    #[test]
    fn indentation_and_declaration() {
        let options = WriteOptions {
            declaration: true,
            indent: Some(2),
            ..WriteOptions::default()
        };
        let text = to_string(&sample(), &options).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains("\n  <Message>"));
        assert_eq!(parse(&text).unwrap(), sample());
    }

    #[test]
    fn parse_resolves_type_names() {
        let root = parse(
            r#"<a:Outer xmlns:a="urn:a" xmlns:exs="urn:exs:v2" xmlns="urn:d" exs:type="a:T[Inner]"/>"#,
        )
        .unwrap();
        assert_eq!(root.name(), &QName::qualified("urn:a", "Outer"));
        let Some(AttributeValue::Types(types)) = root.reserved(reserved::TYPE) else {
            panic!("type attribute not parsed");
        };
        assert_eq!(
            types[0],
            TypeRef::new(Some("urn:a"), "T").with_argument(TypeRef::new(Some("urn:d"), "Inner"))
        );
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(parse(""), Err(DocumentError::Empty)));
        assert!(matches!(parse("<a><b></a>"), Err(DocumentError::Syntax(_))));
        assert!(matches!(
            parse("<x:a/>"),
            Err(DocumentError::UnknownPrefix(p)) if p == "x"
        ));
        assert!(matches!(parse("<a/><b/>"), Err(DocumentError::Syntax(_))));
    }

    #[test]
    fn unqualified_type_under_default_namespace() {
        let mut root = Element::new(QName::qualified("urn:app", "Root"));
        root.set_attribute(QName::reserved(reserved::TYPE), TypeRef::new(None, "Loose"));
        assert!(matches!(
            to_string(&root, &WriteOptions::default()),
            Err(DocumentError::Unqualified(name)) if name == "Loose"
        ));
    }
}
