use std::fmt;
use std::borrow::Cow;

use crate::{
    cursor::Cursor,
    Attribute,
    Edge,
    InvalidOperation,
    Namespace,
    Node,
    NodeType,
    Traverse,
    NS_XMLNS_PREFIX,
    NS_XMLNS_URI,
};


/// Node types reported by a [`SubtreeReader`].
///
/// [`SubtreeReader`]: struct.SubtreeReader.html
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ReaderNodeType {
    /// Not positioned on a node: before the first read or after the last one.
    None,
    /// A start tag.
    Element,
    /// An attribute or a namespace declaration.
    Attribute,
    /// A text node or an attribute value.
    Text,
    /// A whitespace-only text node.
    Whitespace,
    /// A whitespace-only text node inside an `xml:space="preserve"` scope.
    SignificantWhitespace,
    /// A comment.
    Comment,
    /// A processing instruction.
    ProcessingInstruction,
    /// An end tag.
    EndElement,
}


/// State of a [`SubtreeReader`].
///
/// [`SubtreeReader`]: struct.SubtreeReader.html
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ReadState {
    /// `read` was never called.
    Initial,
    /// Positioned on a node.
    Interactive,
    /// The whole subtree was read.
    EndOfFile,
}


#[derive(Clone, Copy, PartialEq, Debug)]
enum Token<'a> {
    Initial,
    Start(Node<'a>),
    End(Node<'a>),
    Eof,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Overlay {
    Element,
    Attribute(usize),
    AttributeValue(usize),
}

/// An attribute of a start tag as the reader sees it.
#[derive(Clone, Copy)]
enum AttrRef<'a> {
    Namespace(&'a Namespace),
    Attribute(&'a Attribute),
}

impl<'a> AttrRef<'a> {
    fn name(&self) -> Cow<'a, str> {
        match *self {
            AttrRef::Attribute(a) => Cow::Borrowed(a.name()),
            AttrRef::Namespace(ns) if ns.prefix().is_empty() => Cow::Borrowed(NS_XMLNS_PREFIX),
            AttrRef::Namespace(ns) => Cow::Owned(format!("{}:{}", NS_XMLNS_PREFIX, ns.prefix())),
        }
    }

    fn local_name(&self) -> &'a str {
        match *self {
            AttrRef::Attribute(a) => a.local_name(),
            AttrRef::Namespace(ns) if ns.prefix().is_empty() => NS_XMLNS_PREFIX,
            AttrRef::Namespace(ns) => ns.prefix(),
        }
    }

    fn prefix(&self) -> &'a str {
        match *self {
            AttrRef::Attribute(a) => a.prefix(),
            AttrRef::Namespace(ns) if ns.prefix().is_empty() => "",
            AttrRef::Namespace(_) => NS_XMLNS_PREFIX,
        }
    }

    fn namespace_uri(&self) -> &'a str {
        match *self {
            AttrRef::Attribute(a) => a.namespace(),
            AttrRef::Namespace(_) => NS_XMLNS_URI,
        }
    }

    fn value(&self) -> &'a str {
        match *self {
            AttrRef::Attribute(a) => a.value(),
            AttrRef::Namespace(ns) => ns.uri(),
        }
    }

    /// Name, prefix, local name and namespace URI of the text token
    /// produced by `read_attribute_value`.
    fn value_names(&self) -> (&'static str, &'static str, &'static str, &'static str) {
        match *self {
            AttrRef::Attribute(_) => ("", "", "", ""),
            AttrRef::Namespace(ns) if ns.prefix().is_empty() => {
                (NS_XMLNS_PREFIX, "", NS_XMLNS_PREFIX, NS_XMLNS_URI)
            }
            AttrRef::Namespace(_) => ("xmlns:", NS_XMLNS_PREFIX, "", NS_XMLNS_URI),
        }
    }
}


/// A forward-only pull reader over a subtree.
///
/// Created by [`Cursor::read_subtree`]. Reports the subtree rooted at the
/// cursor's element as a sequence of start tags, end tags and leaf nodes.
/// Namespace declarations are reported as `xmlns` attributes, interleaved
/// with regular attributes in the order they were declared.
///
/// The reader never leaves the subtree: the end tag of its root is the last token.
///
/// # Examples
///
/// ```
/// use xmlnav::{Document, ReaderNodeType};
///
/// let doc = Document::parse("<root><foo a='1'>text</foo><bar/></root>").unwrap();
/// let mut cursor = doc.cursor();
/// cursor.move_to_following_element("foo", "");
///
/// let mut reader = cursor.read_subtree().unwrap();
/// let mut tokens = Vec::new();
/// while reader.read() {
///     tokens.push((reader.node_type(), reader.name().to_string(), reader.depth()));
/// }
///
/// assert_eq!(tokens, [
///     (ReaderNodeType::Element, "foo".to_string(), 0),
///     (ReaderNodeType::Text, String::new(), 1),
///     (ReaderNodeType::EndElement, "foo".to_string(), 0),
/// ]);
/// ```
///
/// [`Cursor::read_subtree`]: struct.Cursor.html#method.read_subtree
#[derive(Clone)]
pub struct SubtreeReader<'a> {
    root: Node<'a>,
    traverse: Traverse<'a>,
    token: Token<'a>,
    overlay: Overlay,
    attrs: Vec<AttrRef<'a>>,
    depth: usize,
}

impl<'a> fmt::Debug for SubtreeReader<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "SubtreeReader {{ token: {:?}, overlay: {:?}, depth: {} }}",
               self.token, self.overlay, self.depth)
    }
}

impl<'a> SubtreeReader<'a> {
    pub(crate) fn new(cursor: &Cursor<'a>) -> Result<Self, InvalidOperation> {
        let root = match cursor.node() {
            Some(node) if node.is_root() => node.document().root_element(),
            Some(node) if node.is_element() => node,
            _ => {
                return Err(InvalidOperation::new(format!(
                    "a subtree reader can be created only on an element or the root node, not on {:?}",
                    cursor.node_type()
                )));
            }
        };

        tracing::debug!(root = root.name(), "subtree reader created");

        Ok(SubtreeReader {
            root,
            traverse: root.traverse(),
            token: Token::Initial,
            overlay: Overlay::Element,
            attrs: Vec::new(),
            depth: 0,
        })
    }

    /// Advances to the next node.
    ///
    /// Returns `false` when the subtree is exhausted.
    pub fn read(&mut self) -> bool {
        self.overlay = Overlay::Element;

        if self.token == Token::Eof {
            return false;
        }

        loop {
            match self.traverse.next() {
                Some(Edge::Open(node)) => {
                    self.set_token(Token::Start(node));
                    return true;
                }
                // Leaves and empty elements have no end token.
                Some(Edge::Close(node)) if node.is_element() && !node.is_empty_element() => {
                    self.set_token(Token::End(node));
                    return true;
                }
                Some(Edge::Close(_)) => {}
                None => {
                    self.set_token(Token::Eof);
                    return false;
                }
            }
        }
    }

    fn set_token(&mut self, token: Token<'a>) {
        self.token = token;
        self.attrs.clear();

        match token {
            Token::Start(node) | Token::End(node) => {
                let root = self.root;
                self.depth = if node == root {
                    0
                } else {
                    node.ancestors().take_while(|n| *n != root).count()
                };
            }
            Token::Initial | Token::Eof => self.depth = 0,
        }

        if let Token::Start(node) = token {
            let mut attrs: Vec<(usize, AttrRef)> = node.namespaces().iter()
                .map(|ns| (ns.decl_pos, AttrRef::Namespace(ns)))
                .chain(node.attributes().iter().map(|a| (a.decl_pos, AttrRef::Attribute(a))))
                .collect();
            attrs.sort_by_key(|(pos, _)| *pos);
            self.attrs.extend(attrs.into_iter().map(|(_, a)| a));
        }
    }

    /// Skips the children of the current element.
    ///
    /// On other nodes this is the same as `read`.
    pub fn skip(&mut self) -> bool {
        self.overlay = Overlay::Element;

        if let Token::Start(node) = self.token {
            if node.is_element() && !node.is_empty_element() {
                self.traverse = Traverse::resume_after(self.root, Edge::Close(node));
                self.token = Token::End(node);
            }
        }

        self.read()
    }

    /// Skips nodes that are not content: whitespace, comments and processing instructions.
    ///
    /// Moves from an attribute back to its element. Returns the type of the node
    /// the reader stopped on.
    pub fn move_to_content(&mut self) -> ReaderNodeType {
        self.move_to_element();

        loop {
            match self.node_type() {
                ReaderNodeType::Element
                | ReaderNodeType::EndElement
                | ReaderNodeType::Text => return self.node_type(),
                _ => {}
            }

            if !self.read() {
                return ReaderNodeType::None;
            }
        }
    }

    /// Returns the reader state.
    pub fn read_state(&self) -> ReadState {
        match self.token {
            Token::Initial => ReadState::Initial,
            Token::Eof => ReadState::EndOfFile,
            Token::Start(_) | Token::End(_) => ReadState::Interactive,
        }
    }

    /// Checks that the whole subtree was read.
    pub fn eof(&self) -> bool {
        self.token == Token::Eof
    }

    /// Returns the tree node of the current token.
    ///
    /// Attributes return their element.
    pub fn node(&self) -> Option<Node<'a>> {
        match self.token {
            Token::Start(node) | Token::End(node) => Some(node),
            Token::Initial | Token::Eof => None,
        }
    }

    fn current_attr(&self) -> Option<AttrRef<'a>> {
        match self.overlay {
            Overlay::Attribute(i) | Overlay::AttributeValue(i) => self.attrs.get(i).cloned(),
            Overlay::Element => None,
        }
    }

    /// Returns the type of the current node.
    pub fn node_type(&self) -> ReaderNodeType {
        match self.overlay {
            Overlay::Attribute(_) => return ReaderNodeType::Attribute,
            Overlay::AttributeValue(_) => return ReaderNodeType::Text,
            Overlay::Element => {}
        }

        match self.token {
            Token::Initial | Token::Eof => ReaderNodeType::None,
            Token::End(_) => ReaderNodeType::EndElement,
            Token::Start(node) => match node.node_type() {
                NodeType::Element => ReaderNodeType::Element,
                NodeType::Text => ReaderNodeType::Text,
                NodeType::Whitespace => ReaderNodeType::Whitespace,
                NodeType::SignificantWhitespace => ReaderNodeType::SignificantWhitespace,
                NodeType::Comment => ReaderNodeType::Comment,
                NodeType::ProcessingInstruction => ReaderNodeType::ProcessingInstruction,
                NodeType::Root | NodeType::Attribute | NodeType::Namespace => ReaderNodeType::None,
            },
        }
    }

    fn value_names(&self) -> (&'static str, &'static str, &'static str, &'static str) {
        self.current_attr().map(|a| a.value_names()).unwrap_or(("", "", "", ""))
    }

    /// Returns the qualified name of the current node.
    ///
    /// Namespace declarations are named `xmlns` or `xmlns:prefix`.
    /// Text, comments and attribute values have an empty name, except for the
    /// value of a namespace declaration, which is named `xmlns` or `xmlns:`.
    pub fn name(&self) -> Cow<'a, str> {
        match self.overlay {
            Overlay::Attribute(_) => {
                return self.current_attr().map(|a| a.name()).unwrap_or(Cow::Borrowed(""));
            }
            Overlay::AttributeValue(_) => return Cow::Borrowed(self.value_names().0),
            Overlay::Element => {}
        }

        Cow::Borrowed(self.node().map(|n| n.name()).unwrap_or(""))
    }

    /// Returns the local name of the current node.
    pub fn local_name(&self) -> &'a str {
        match self.overlay {
            Overlay::Attribute(_) => self.current_attr().map(|a| a.local_name()).unwrap_or(""),
            Overlay::AttributeValue(_) => self.value_names().2,
            Overlay::Element => self.node().map(|n| n.local_name()).unwrap_or(""),
        }
    }

    /// Returns the prefix of the current node.
    pub fn prefix(&self) -> &'a str {
        match self.overlay {
            Overlay::Attribute(_) => self.current_attr().map(|a| a.prefix()).unwrap_or(""),
            Overlay::AttributeValue(_) => self.value_names().1,
            Overlay::Element => self.node().map(|n| n.prefix()).unwrap_or(""),
        }
    }

    /// Returns the namespace URI of the current node.
    pub fn namespace_uri(&self) -> &'a str {
        match self.overlay {
            Overlay::Attribute(_) => self.current_attr().map(|a| a.namespace_uri()).unwrap_or(""),
            Overlay::AttributeValue(_) => self.value_names().3,
            Overlay::Element => self.node().map(|n| n.namespace_uri()).unwrap_or(""),
        }
    }

    /// Checks that the current node can have a value.
    pub fn has_value(&self) -> bool {
        !matches!(
            self.node_type(),
            ReaderNodeType::None | ReaderNodeType::Element | ReaderNodeType::EndElement
        )
    }

    /// Returns the value of the current node.
    ///
    /// Elements and end tags have an empty value.
    pub fn value(&self) -> &'a str {
        if let Some(attr) = self.current_attr() {
            return attr.value();
        }

        match self.token {
            Token::Start(node) if !node.is_element() => node.text().unwrap_or(""),
            _ => "",
        }
    }

    /// Returns the depth of the current node relative to the subtree root.
    ///
    /// Attributes are one level deeper than their element and attribute values two levels.
    pub fn depth(&self) -> usize {
        match self.overlay {
            Overlay::Element => self.depth,
            Overlay::Attribute(_) => self.depth + 1,
            Overlay::AttributeValue(_) => self.depth + 2,
        }
    }

    /// Checks that the current node is an element written as `<e/>`.
    pub fn is_empty_element(&self) -> bool {
        match (self.token, self.overlay) {
            (Token::Start(node), Overlay::Element) => node.is_empty_element(),
            _ => false,
        }
    }

    /// Returns the number of attributes of the current element,
    /// namespace declarations included.
    ///
    /// Stays the same while the reader is on an attribute.
    pub fn attribute_count(&self) -> usize {
        self.attrs.len()
    }

    /// Checks that the current element has attributes or namespace declarations.
    ///
    /// Stays the same while the reader is on an attribute or its value.
    pub fn has_attributes(&self) -> bool {
        !self.attrs.is_empty()
    }

    fn find_attr<F: Fn(&AttrRef<'a>) -> bool>(&self, f: F) -> Option<usize> {
        self.attrs.iter().position(f)
    }

    /// Returns an attribute value by qualified name.
    pub fn get_attribute(&self, name: &str) -> Option<&'a str> {
        self.find_attr(|a| a.name() == name).map(|i| self.attrs[i].value())
    }

    /// Returns an attribute value by local name and namespace URI.
    pub fn get_attribute_ns(&self, local: &str, ns: &str) -> Option<&'a str> {
        self.find_attr(|a| a.local_name() == local && a.namespace_uri() == ns)
            .map(|i| self.attrs[i].value())
    }

    /// Returns an attribute value by index.
    pub fn get_attribute_at(&self, index: usize) -> Option<&'a str> {
        self.attrs.get(index).map(|a| a.value())
    }

    /// Moves to an attribute by qualified name.
    pub fn move_to_attribute(&mut self, name: &str) -> bool {
        let index = self.find_attr(|a| a.name() == name);
        self.set_attribute(index)
    }

    /// Moves to an attribute by local name and namespace URI.
    pub fn move_to_attribute_ns(&mut self, local: &str, ns: &str) -> bool {
        let index = self.find_attr(|a| a.local_name() == local && a.namespace_uri() == ns);
        self.set_attribute(index)
    }

    /// Moves to an attribute by index.
    pub fn move_to_attribute_at(&mut self, index: usize) -> bool {
        let index = if index < self.attrs.len() { Some(index) } else { None };
        self.set_attribute(index)
    }

    fn set_attribute(&mut self, index: Option<usize>) -> bool {
        match index {
            Some(i) => {
                self.overlay = Overlay::Attribute(i);
                true
            }
            None => false,
        }
    }

    /// Moves to the first attribute of the current element.
    ///
    /// Works from the element itself as well as from any of its attributes or attribute values.
    pub fn move_to_first_attribute(&mut self) -> bool {
        self.move_to_attribute_at(0)
    }

    /// Moves to the next attribute.
    ///
    /// On the element itself moves to the first attribute.
    pub fn move_to_next_attribute(&mut self) -> bool {
        let next = match self.overlay {
            Overlay::Element => 0,
            Overlay::Attribute(i) | Overlay::AttributeValue(i) => i + 1,
        };

        self.move_to_attribute_at(next)
    }

    /// Moves from an attribute back to its element.
    pub fn move_to_element(&mut self) -> bool {
        match self.overlay {
            Overlay::Element => false,
            Overlay::Attribute(_) | Overlay::AttributeValue(_) => {
                self.overlay = Overlay::Element;
                true
            }
        }
    }

    /// Moves into the value of the current attribute.
    ///
    /// The value is reported once as a text node.
    pub fn read_attribute_value(&mut self) -> bool {
        match self.overlay {
            Overlay::Attribute(i) => {
                self.overlay = Overlay::AttributeValue(i);
                true
            }
            Overlay::Element | Overlay::AttributeValue(_) => false,
        }
    }

    /// Resolves a namespace prefix at the current node.
    ///
    /// Leaf nodes resolve against their parent element.
    pub fn lookup_namespace(&self, prefix: &str) -> Option<&'a str> {
        self.node()?.lookup_namespace_uri(prefix)
    }
}
