//! Element tree for TEI documents
//!
//! A small, owned DOM built from `quick_xml` events. Text follows the
//! text/tail model: `text` is the character data before the first child,
//! `tail` is the character data after an element's closing tag and before its
//! next sibling (or the parent's closing tag).
//!
//! ```text
//! <note>Pre <hi rend="sup">3</hi>Post</note>
//!       ^^^^                    ^^^^
//!       note.text               hi.tail
//! ```
//!
//! The parser recovers from malformed markup instead of failing, the way a
//! recovering libxml2 parser would: unclosed elements are closed at the end of
//! input, stray end tags are skipped, and a syntax error keeps whatever was
//! built up to that point.

use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const TEI_NS: &str = "http://www.tei-c.org/ns/1.0";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlTreeError {
    #[error("No root element found")]
    NoRootElement,
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },
}

/// A possibly prefixed element or attribute name, as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlName {
    pub prefix: Option<String>,
    pub local: String,
}

impl XmlName {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => XmlName {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            None => XmlName {
                prefix: None,
                local: raw.to_string(),
            },
        }
    }

    /// The name as written, e.g. `xml:id`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: XmlName,
    /// Resolved namespace URI. Unprefixed attributes have none.
    pub namespace: Option<String>,
    pub value: String,
}

impl Attribute {
    pub fn is_namespace_declaration(&self) -> bool {
        match &self.name.prefix {
            Some(prefix) => prefix == "xmlns",
            None => self.name.local == "xmlns",
        }
    }

    /// The `(prefix, uri)` pair declared by an `xmlns` attribute.
    fn declared_namespace(&self) -> Option<(Option<String>, String)> {
        if !self.is_namespace_declaration() {
            return None;
        }
        match &self.name.prefix {
            Some(_) => Some((Some(self.name.local.clone()), self.value.clone())),
            None => Some((None, self.value.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: XmlName,
    /// Resolved namespace URI of the element.
    pub namespace: Option<String>,
    /// Attributes in source order, names unique.
    pub attributes: Vec<Attribute>,
    pub text: Option<String>,
    pub children: Vec<Element>,
    pub tail: Option<String>,
}

impl Element {
    pub fn new(raw_name: &str) -> Self {
        Element {
            name: XmlName::parse(raw_name),
            namespace: None,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
            tail: None,
        }
    }

    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    /// True in the TEI namespace or in no namespace.
    pub fn in_tei_namespace(&self) -> bool {
        match self.namespace.as_deref() {
            None => true,
            Some(ns) => ns == TEI_NS,
        }
    }

    /// True for `<local>` in the TEI namespace or in no namespace.
    pub fn is_tei(&self, local: &str) -> bool {
        self.name.local == local && self.in_tei_namespace()
    }

    /// Value of an unprefixed attribute.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name.prefix.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Value of an attribute in the XML namespace, e.g. `xml:id`.
    pub fn xml_attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(XML_NS) && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Sets an unprefixed attribute, replacing an existing one with the same name.
    pub fn set_attribute(&mut self, local: &str, value: String) {
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.name.prefix.is_none() && a.name.local == local)
        {
            existing.value = value;
            return;
        }
        self.attributes.push(Attribute {
            name: XmlName::parse(local),
            namespace: None,
            value,
        });
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.is_tei(local))
    }

    /// Pre-order traversal including `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// The XPath `text()` node set: own text, then every child's tail.
    pub fn text_nodes(&self) -> Vec<&str> {
        let mut nodes = Vec::new();
        if let Some(text) = &self.text {
            nodes.push(text.as_str());
        }
        for child in &self.children {
            if let Some(tail) = &child.tail {
                nodes.push(tail.as_str());
            }
        }
        nodes
    }

    /// Own text and child tails concatenated, whitespace-trimmed.
    pub fn direct_text(&self) -> String {
        self.text_nodes().concat().trim().to_string()
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        let name = self.name.qualified();
        out.push('<');
        out.push_str(&name);
        for attr in &self.attributes {
            out.push(' ');
            out.push_str(&attr.name.qualified());
            out.push_str("=\"");
            out.push_str(&escape(attr.value.as_str()));
            out.push('"');
        }

        let has_text = self.text.as_deref().is_some_and(|t| !t.is_empty());
        if !has_text && self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&partial_escape(text.as_str()));
        }
        for child in &self.children {
            child.write_xml(out);
            if let Some(tail) = &child.tail {
                out.push_str(&partial_escape(tail.as_str()));
            }
        }
        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Parse an XML string, recovering from malformed markup where possible.
    ///
    /// Fails only when no root element could be built at all.
    pub fn parse(xml: &str) -> Result<Document, XmlTreeError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);
        reader.check_end_names(false);
        reader.expand_empty_elements(false);

        let mut builder = TreeBuilder::default();
        let mut syntax_error: Option<XmlTreeError> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let (element, declared) = builder.build_element(e);
                    builder.open.push(element);
                    builder.scopes.push(declared);
                }
                Ok(Event::Empty(ref e)) => {
                    let (element, _) = builder.build_element(e);
                    builder.attach(element);
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    builder.close(&name);
                }
                Ok(Event::Text(ref e)) => {
                    let text = unescape_lenient(&String::from_utf8_lossy(e));
                    builder.append_text(&text);
                }
                Ok(Event::CData(ref e)) => {
                    let text = String::from_utf8_lossy(e).into_owned();
                    builder.append_text(&text);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    let position = reader.buffer_position();
                    tracing::warn!("XML syntax error at byte {}, keeping partial tree: {}", position, e);
                    syntax_error = Some(XmlTreeError::Syntax {
                        position,
                        message: e.to_string(),
                    });
                    break;
                }
            }
        }

        if !builder.open.is_empty() {
            tracing::debug!("Closing {} unclosed element(s) at end of input", builder.open.len());
            builder.close_all();
        }

        match builder.root {
            Some(root) => Ok(Document { root }),
            None => Err(syntax_error.unwrap_or(XmlTreeError::NoRootElement)),
        }
    }

    pub fn to_xml(&self) -> String {
        self.root.to_xml()
    }
}

/// Resolves predefined and numeric references. An undeclared `&name;`
/// or a bare `&` is kept as written without affecting the rest of the chunk.
fn unescape_lenient(raw: &str) -> String {
    if let Ok(text) = unescape(raw) {
        return text.into_owned();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let reference = after
            .find(';')
            .map(|semi| &after[..=semi])
            .filter(|r| r.len() > 2 && !r[1..].contains(|c: char| c == '&' || c.is_whitespace()));

        match reference {
            Some(reference) => {
                match unescape(reference) {
                    Ok(resolved) => out.push_str(&resolved),
                    Err(_) => {
                        tracing::debug!("Keeping undeclared entity {}", reference);
                        out.push_str(reference);
                    }
                }
                rest = &after[reference.len()..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

type NamespaceScope = Vec<(Option<String>, String)>;

#[derive(Default)]
struct TreeBuilder {
    open: Vec<Element>,
    scopes: Vec<NamespaceScope>,
    root: Option<Element>,
}

impl TreeBuilder {
    fn resolve(&self, prefix: Option<&str>, own: &NamespaceScope) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NS.to_string());
        }
        let found = own
            .iter()
            .rev()
            .chain(self.scopes.iter().rev().flat_map(|scope| scope.iter().rev()))
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.clone());
        // xmlns="" undeclares the default namespace
        found.filter(|uri| !uri.is_empty())
    }

    fn build_element(&self, e: &BytesStart) -> (Element, NamespaceScope) {
        let raw_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut element = Element::new(&raw_name);

        let mut attrs = e.attributes();
        attrs.with_checks(false);
        for attr in attrs {
            let attr = match attr {
                Ok(a) => a,
                Err(err) => {
                    tracing::debug!("Skipping malformed attribute on <{}>: {}", raw_name, err);
                    continue;
                }
            };
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            if element.attributes.iter().any(|a| a.name.qualified() == key) {
                continue;
            }
            let value = unescape_lenient(&String::from_utf8_lossy(&attr.value));
            element.attributes.push(Attribute {
                name: XmlName::parse(&key),
                namespace: None,
                value,
            });
        }

        let declared: NamespaceScope = element
            .attributes
            .iter()
            .filter_map(Attribute::declared_namespace)
            .collect();

        element.namespace = self.resolve(element.name.prefix.as_deref(), &declared);
        let mut resolved = Vec::with_capacity(element.attributes.len());
        for attr in &element.attributes {
            let ns = match &attr.name.prefix {
                Some(prefix) if !attr.is_namespace_declaration() => self.resolve(Some(prefix), &declared),
                _ => None,
            };
            resolved.push(ns);
        }
        for (attr, ns) in element.attributes.iter_mut().zip(resolved) {
            attr.namespace = ns;
        }

        (element, declared)
    }

    fn attach(&mut self, element: Element) {
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(element);
        } else if self.root.is_none() {
            self.root = Some(element);
        } else {
            tracing::debug!("Ignoring extra top-level element <{}>", element.name.qualified());
        }
    }

    fn close(&mut self, raw_name: &str) {
        let Some(pos) = self.open.iter().rposition(|e| e.name.qualified() == raw_name) else {
            tracing::debug!("Ignoring stray end tag </{}>", raw_name);
            return;
        };
        while self.open.len() > pos {
            if let Some(element) = self.open.pop() {
                self.scopes.pop();
                self.attach(element);
            }
        }
    }

    fn close_all(&mut self) {
        while let Some(element) = self.open.pop() {
            self.scopes.pop();
            self.attach(element);
        }
    }

    fn append_text(&mut self, text: &str) {
        let Some(current) = self.open.last_mut() else {
            // prolog or trailing whitespace
            return;
        };
        let slot = match current.children.last_mut() {
            Some(last) => &mut last.tail,
            None => &mut current.text,
        };
        match slot {
            Some(existing) => existing.push_str(text),
            None => *slot = Some(text.to_string()),
        }
    }
}
