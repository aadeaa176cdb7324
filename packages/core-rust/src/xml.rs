//! Owned XML element tree used for envelopes, schemas, and samples.
//!
//! Parsing and serialization go through `quick-xml`. Names are kept in their
//! qualified `prefix:local` form; namespace declarations stay ordinary
//! attributes so they can be read back and echoed.

use std::borrow::Cow;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Deepest element nesting [`XmlElement::parse`] accepts.
pub const MAX_DEPTH: usize = 256;

/// Errors from parsing or serializing XML.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("invalid UTF-8 in XML input: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("serialized XML is not UTF-8: {0}")]
    Output(#[from] std::string::FromUtf8Error),
    #[error("XML write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected end of document: <{0}> is not closed")]
    UnexpectedEof(String),
    #[error("document has no root element")]
    EmptyDocument,
    #[error("document has more than one root element: <{0}>")]
    MultipleRoots(String),
    #[error("element <{0}> is nested deeper than {MAX_DEPTH} levels")]
    TooDeep(String),
}

impl XmlError {
    /// Short name of the failure, used as a fault code suffix.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "SyntaxError",
            Self::Encoding(_) => "EncodingError",
            Self::Output(_) | Self::Io(_) => "WriteError",
            Self::UnexpectedEof(_) => "UnexpectedEof",
            Self::EmptyDocument => "EmptyDocument",
            Self::MultipleRoots(_) => "MultipleRoots",
            Self::TooDeep(_) => "TooDeepError",
        }
    }
}

/// A child node of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Comment(String),
}

/// An element with its attributes and child nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    nodes: Vec<XmlNode>,
}

impl XmlElement {
    /// Creates an empty element with a (possibly qualified) name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Parses a document and returns its root element.
    ///
    /// Comments are dropped. Whitespace-only text next to child elements is
    /// dropped; leaf element text is kept verbatim.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if the text is not a single well-formed element tree,
    /// or if elements nest deeper than [`MAX_DEPTH`].
    pub fn parse(text: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let element = Self::from_start(&start)?;
                    if stack.len() >= MAX_DEPTH {
                        return Err(XmlError::TooDeep(element.name));
                    }
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    // quick-xml has already checked the end name.
                    if let Some(mut element) = stack.pop() {
                        element.drop_layout_whitespace();
                        attach(&mut stack, &mut root, element)?;
                    }
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let raw = data.into_inner();
                        parent.push_text(Cow::Borrowed(std::str::from_utf8(&raw)?));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::UnexpectedEof(open.name));
        }
        root.ok_or(XmlError::EmptyDocument)
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let name = start.name();
        let mut element = Self::new(std::str::from_utf8(name.as_ref())?);
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    fn push_text(&mut self, text: Cow<'_, str>) {
        // Adjacent text and CDATA runs merge into one node.
        if let Some(XmlNode::Text(previous)) = self.nodes.last_mut() {
            previous.push_str(&text);
        } else {
            self.nodes.push(XmlNode::Text(text.into_owned()));
        }
    }

    fn drop_layout_whitespace(&mut self) {
        if self.nodes.iter().any(|n| matches!(n, XmlNode::Element(_))) {
            self.nodes
                .retain(|n| !matches!(n, XmlNode::Text(t) if t.trim().is_empty()));
        }
    }

    // -- accessors ----------------------------------------------------------

    /// Qualified name as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its prefix.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name.split_once(':').map_or(self.name.as_str(), |(_, local)| local)
    }

    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    /// `(alias, uri)` for every `xmlns` declaration on this element.
    /// The default namespace has alias `""`.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes().filter_map(|(key, value)| {
            if key == "xmlns" {
                Some(("", value))
            } else {
                key.strip_prefix("xmlns:").map(|alias| (alias, value))
            }
        })
    }

    /// Child elements in document order.
    pub fn children(&self) -> impl Iterator<Item = &XmlElement> {
        self.nodes.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    #[must_use]
    pub fn nodes(&self) -> &[XmlNode] {
        &self.nodes
    }

    /// First child matching `name`.
    ///
    /// A qualified name (`soap:Body`) must match exactly; a bare name matches
    /// on the local name whatever the child's prefix.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children().find(|child| child.matches(name))
    }

    fn matches(&self, name: &str) -> bool {
        if name.contains(':') {
            self.name == name
        } else {
            self.local_name() == name
        }
    }

    /// Concatenated direct text content.
    #[must_use]
    pub fn text(&self) -> String {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    // -- builders -----------------------------------------------------------

    /// Appends an empty child element and returns it.
    pub fn add_child(&mut self, name: impl Into<String>) -> &mut XmlElement {
        self.push_child(Self::new(name))
    }

    /// Appends an already-built child element and returns it.
    pub fn push_child(&mut self, element: XmlElement) -> &mut XmlElement {
        self.nodes.push(XmlNode::Element(element));
        match self.nodes.last_mut() {
            Some(XmlNode::Element(element)) => element,
            _ => unreachable!("an element was just pushed"),
        }
    }

    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder-style [`add_attribute`](Self::add_attribute).
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_attribute(name, value);
        self
    }

    pub fn add_text(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if !text.is_empty() {
            self.push_text(Cow::Owned(text));
        }
        self
    }

    pub fn add_comment(&mut self, text: impl Into<String>) -> &mut Self {
        self.nodes.push(XmlNode::Comment(text.into()));
        self
    }

    // -- serialization ------------------------------------------------------

    /// Serializes the element as a standalone document.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if writing fails.
    pub fn to_xml(&self, pretty: bool) -> Result<String, XmlError> {
        let mut writer = if pretty {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_to(&mut writer)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), XmlError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if self.nodes.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        for node in &self.nodes {
            match node {
                XmlNode::Element(child) => child.write_to(writer)?,
                XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
                XmlNode::Comment(text) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.nodes.push(XmlNode::Element(element));
        Ok(())
    } else if root.is_some() {
        Err(XmlError::MultipleRoots(element.name))
    } else {
        *root = Some(element);
        Ok(())
    }
}
