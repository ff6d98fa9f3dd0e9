use core::fmt::Write;

use crate::DocumentError;

// -----------------------------------------------------------------------------
// TypeRef

/// A type name as it appears in reserved attribute values.
///
/// The textual form is `prefix:Name[Arg1,Arg2]`: the namespace is carried by
/// a prefix (none for the default namespace) and generic arguments are a
/// bracketed, comma-separated list of further type names.
///
/// Prefixes only exist in text. In the tree a `TypeRef` always holds the
/// resolved namespace, so a migration can move a subtree without caring
/// which declarations were in scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub namespace: Option<String>,
    pub name: String,
    pub arguments: Vec<TypeRef>,
}

impl TypeRef {
    /// Creates a non-generic type reference.
    #[inline]
    pub fn new(namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_owned),
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    /// Appends a generic argument.
    #[inline]
    pub fn with_argument(mut self, argument: TypeRef) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Visits this reference and all nested arguments, outermost first.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a TypeRef)) {
        f(self);
        for argument in &self.arguments {
            argument.visit(f);
        }
    }

    /// Writes the textual form.
    ///
    /// `prefix_of` maps a namespace to the prefix in scope, `None` meaning
    /// the default namespace.
    pub fn write_to(
        &self,
        out: &mut String,
        prefix_of: &impl Fn(Option<&str>, &str) -> Result<Option<String>, DocumentError>,
    ) -> Result<(), DocumentError> {
        if let Some(prefix) = prefix_of(self.namespace.as_deref(), &self.name)? {
            out.push_str(&prefix);
            out.push(':');
        }
        out.push_str(&self.name);
        if !self.arguments.is_empty() {
            out.push('[');
            write_list(out, &self.arguments, prefix_of)?;
            out.push(']');
        }
        Ok(())
    }

    /// Parses a comma-separated list of type references.
    ///
    /// `namespace_of` maps a prefix (`None` when unprefixed) to its namespace.
    pub fn parse_list(
        text: &str,
        namespace_of: &impl Fn(Option<&str>) -> Result<Option<String>, DocumentError>,
    ) -> Result<Vec<TypeRef>, DocumentError> {
        let mut parser = Parser {
            text,
            pos: 0,
            namespace_of,
        };
        let list = parser.list()?;
        parser.skip_whitespace();
        if parser.pos != text.len() {
            return Err(parser.error("unexpected trailing characters"));
        }
        Ok(list)
    }
}

/// Writes `refs` separated by commas.
pub(crate) fn write_list(
    out: &mut String,
    refs: &[TypeRef],
    prefix_of: &impl Fn(Option<&str>, &str) -> Result<Option<String>, DocumentError>,
) -> Result<(), DocumentError> {
    for (index, item) in refs.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        item.write_to(out, prefix_of)?;
    }
    Ok(())
}

impl core::fmt::Display for TypeRef {
    /// Clark notation, for messages.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{{{ns}}}")?;
        }
        f.write_str(&self.name)?;
        if !self.arguments.is_empty() {
            f.write_char('[')?;
            for (index, argument) in self.arguments.iter().enumerate() {
                if index > 0 {
                    f.write_char(',')?;
                }
                write!(f, "{argument}")?;
            }
            f.write_char(']')?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Parser

struct Parser<'a, F> {
    text: &'a str,
    pos: usize,
    namespace_of: &'a F,
}

impl<'a, F> Parser<'a, F>
where
    F: Fn(Option<&str>) -> Result<Option<String>, DocumentError>,
{
    fn error(&self, reason: &'static str) -> DocumentError {
        DocumentError::TypeName {
            text: self.text.to_owned(),
            reason,
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn ident(&mut self) -> Result<&'a str, DocumentError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '[' | ']' | ':') || c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
        if start == self.pos {
            return Err(self.error("expected a name"));
        }
        Ok(&self.text[start..self.pos])
    }

    fn list(&mut self) -> Result<Vec<TypeRef>, DocumentError> {
        let mut list = vec![self.type_ref()?];
        loop {
            self.skip_whitespace();
            if self.peek() != Some(',') {
                return Ok(list);
            }
            self.pos += 1;
            list.push(self.type_ref()?);
        }
    }

    fn type_ref(&mut self) -> Result<TypeRef, DocumentError> {
        let first = self.ident()?;
        let (prefix, name) = if self.peek() == Some(':') {
            self.pos += 1;
            (Some(first), self.ident()?)
        } else {
            (None, first)
        };
        let namespace = (self.namespace_of)(prefix)?;

        let mut arguments = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some('[') {
            self.pos += 1;
            arguments = self.list()?;
            self.skip_whitespace();
            if self.peek() != Some(']') {
                return Err(self.error("unclosed generic argument list"));
            }
            self.pos += 1;
        }

        Ok(TypeRef {
            namespace,
            name: name.to_owned(),
            arguments,
        })
    }
}
