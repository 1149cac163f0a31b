/*!
Represent an [XML 1.0](https://www.w3.org/TR/xml/) document as a read-only tree
and navigate it through an [XPath data model](https://www.w3.org/TR/xpath/#data-model) cursor.

The root point of the documentation is [`Document::parse`] and [`Document::cursor`].

A [`Cursor`] is a cheap, cloneable position inside a [`Document`]. It can visit
elements, text nodes, comments and processing instructions, as well as the
attribute and namespace nodes of an element, and can be projected onto a
forward-only pull reader via [`Cursor::read_subtree`].

The tree structure itself is a heavily modified <https://github.com/programble/ego-tree>
License: ISC.

[`Document::parse`]: struct.Document.html#method.parse
[`Document::cursor`]: struct.Document.html#method.cursor
[`Cursor`]: struct.Cursor.html
[`Cursor::read_subtree`]: struct.Cursor.html#method.read_subtree
*/

#![doc(html_root_url = "https://docs.rs/xmlnav/0.1.0")]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::borrow::Cow;
use std::fmt;
use std::iter::FusedIterator;
use std::ops::{BitOr, Range};
use std::sync::Arc;

pub use xmlparser::TextPos;

mod builder;
mod convert;
mod cursor;
mod dtd;
mod ids;
mod namespaces;
mod parse;
mod reader;

pub use builder::DocumentBuilder;
pub use convert::{convert, FormatError, FromXmlValue};
pub use cursor::{Cursor, NodeOrder, SelectChildren, SelectDescendants};
pub use namespaces::{InScopeNamespaces, NamespaceScope};
pub use parse::{Error, ParsingOptions};
pub use reader::{ReadState, ReaderNodeType, SubtreeReader};

use ids::IdIndex;


/// The <http://www.w3.org/XML/1998/namespace> URI.
pub const NS_XML_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// The <http://www.w3.org/2000/xmlns/> URI.
pub const NS_XMLNS_URI: &str = "http://www.w3.org/2000/xmlns/";

/// The prefix that is implicitly bound to [`NS_XML_URI`].
pub const NS_XML_PREFIX: &str = "xml";

/// The prefix used by namespace declarations.
pub const NS_XMLNS_PREFIX: &str = "xmlns";


/// An operation that is not allowed in the current state.
///
/// Returned when a subtree reader is requested on an ineligible node
/// and when a [`DocumentBuilder`] is used out of order.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("invalid operation: {0}")]
pub struct InvalidOperation(Cow<'static, str>);

impl InvalidOperation {
    pub(crate) fn new<S: Into<Cow<'static, str>>>(msg: S) -> Self {
        InvalidOperation(msg.into())
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.0
    }
}


/// An XML tree container.
///
/// A tree consists of [`Node`]s stored in a single arena. Attributes and
/// namespace declarations are stored in side tables and are reachable only
/// from their element.
///
/// A document is immutable. It can be created by [`Document::parse`] or
/// by a [`DocumentBuilder`].
pub struct Document {
    nodes: Vec<NodeData>,
    attrs: Vec<Attribute>,
    /// Namespace declarations. The first one is always the implicit `xml` binding.
    namespaces: Vec<Namespace>,
    /// In-scope namespaces of all elements, as indices into `namespaces`.
    scopes: Vec<usize>,
    root_element: NodeId,
    ids: IdIndex,
}

impl Document {
    /// Returns the root node.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse("<e/>").unwrap();
    /// assert!(doc.root().is_root());
    /// assert_eq!(doc.root().first_child().unwrap().local_name(), "e");
    /// ```
    pub fn root(&self) -> Node {
        self.node(NodeId(0))
    }

    /// Returns the root element of the document.
    ///
    /// Unlike `root`, will return a first element node.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse("<!-- comment --><e/>").unwrap();
    /// assert_eq!(doc.root_element().local_name(), "e");
    /// ```
    pub fn root_element(&self) -> Node {
        self.node(self.root_element)
    }

    /// Returns a node by its ID, if it belongs to this document.
    pub fn get_node(&self, id: NodeId) -> Option<Node> {
        if id.0 < self.nodes.len() {
            Some(self.node(id))
        } else {
            None
        }
    }

    /// Returns an iterator over document's descendant nodes.
    ///
    /// Shorthand for `doc.root().descendants()`.
    pub fn descendants(&self) -> Descendants {
        self.root().descendants()
    }

    /// Returns the number of nodes in the document, including the root node.
    ///
    /// Attributes and namespaces are not counted.
    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    /// Creates a cursor positioned on the root node.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlnav::{Document, NodeType};
    ///
    /// let doc = Document::parse("<e/>").unwrap();
    /// let mut cursor = doc.cursor();
    /// assert_eq!(cursor.node_type(), NodeType::Root);
    /// assert!(cursor.move_to_first_child());
    /// assert_eq!(cursor.name(), "e");
    /// ```
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self)
    }

    fn node(&self, id: NodeId) -> Node {
        Node { id, d: &self.nodes[id.0], doc: self }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        macro_rules! writeln_indented {
            ($depth:expr, $f:expr, $fmt:expr) => {
                for _ in 0..$depth { write!($f, "    ")?; }
                writeln!($f, $fmt)?;
            };
            ($depth:expr, $f:expr, $fmt:expr, $($arg:tt)*) => {
                for _ in 0..$depth { write!($f, "    ")?; }
                writeln!($f, $fmt, $($arg)*)?;
            };
        }

        fn print_vec<T: fmt::Debug>(prefix: &str, data: &[T], depth: usize, f: &mut fmt::Formatter)
            -> Result<(), fmt::Error>
        {
            if data.is_empty() {
                return Ok(());
            }

            writeln_indented!(depth, f, "{}: [", prefix);
            for v in data {
                writeln_indented!(depth + 1, f, "{:?}", v);
            }
            writeln_indented!(depth, f, "]");

            Ok(())
        }

        fn print_children(parent: Node, depth: usize, f: &mut fmt::Formatter)
            -> Result<(), fmt::Error>
        {
            for child in parent.children() {
                if child.is_element() {
                    writeln_indented!(depth, f, "Element {{");
                    writeln_indented!(depth, f, "    name: {:?}", child.name());
                    print_vec("attributes", child.attributes(), depth + 1, f)?;
                    print_vec("namespaces", child.namespaces(), depth + 1, f)?;

                    if child.has_children() {
                        writeln_indented!(depth, f, "    children: [");
                        print_children(child, depth + 2, f)?;
                        writeln_indented!(depth, f, "    ]");
                    }

                    writeln_indented!(depth, f, "}}");
                } else {
                    writeln_indented!(depth, f, "{:?}", child);
                }
            }

            Ok(())
        }

        writeln!(f, "Document [")?;
        print_children(self.root(), 1, f)?;
        writeln!(f, "]")?;

        Ok(())
    }
}


/// List of XPath data model node types.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NodeType {
    /// The root node of the `Document`.
    Root,
    /// An element node.
    Element,
    /// An attribute node.
    Attribute,
    /// A namespace node.
    Namespace,
    /// A text node.
    Text,
    /// A whitespace-only text node inside an `xml:space="preserve"` scope.
    SignificantWhitespace,
    /// A whitespace-only text node.
    Whitespace,
    /// A processing instruction.
    ProcessingInstruction,
    /// A comment node.
    Comment,
}

impl NodeType {
    /// Checks that this is one of the three text node types.
    pub fn is_text_kind(self) -> bool {
        matches!(self, NodeType::Text | NodeType::Whitespace | NodeType::SignificantWhitespace)
    }
}


/// A set of node types used by type-filtered navigation.
///
/// # Examples
///
/// ```
/// use xmlnav::{KindMask, NodeType};
///
/// let mask = KindMask::of(NodeType::Text);
/// assert!(mask.contains(NodeType::Whitespace));
/// assert!(!mask.contains(NodeType::Element));
///
/// let mask = KindMask::of(NodeType::Element) | KindMask::of(NodeType::Comment);
/// assert!(mask.contains(NodeType::Comment));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct KindMask(u16);

impl KindMask {
    /// Matches every node type that can appear in a child sequence.
    pub const ALL: KindMask = KindMask(
          kind_bit(NodeType::Element)
        | kind_bit(NodeType::Text)
        | kind_bit(NodeType::SignificantWhitespace)
        | kind_bit(NodeType::Whitespace)
        | kind_bit(NodeType::ProcessingInstruction)
        | kind_bit(NodeType::Comment)
    );

    /// Creates a mask for a node type.
    ///
    /// `NodeType::Text` also matches whitespace nodes.
    pub const fn of(kind: NodeType) -> Self {
        match kind {
            NodeType::Text => KindMask(
                  kind_bit(NodeType::Text)
                | kind_bit(NodeType::SignificantWhitespace)
                | kind_bit(NodeType::Whitespace)
            ),
            _ => KindMask(kind_bit(kind)),
        }
    }

    /// Checks that the mask contains a node type.
    pub fn contains(self, kind: NodeType) -> bool {
        self.0 & kind_bit(kind) != 0
    }
}

impl From<NodeType> for KindMask {
    fn from(kind: NodeType) -> Self {
        KindMask::of(kind)
    }
}

impl BitOr for KindMask {
    type Output = KindMask;

    fn bitor(self, rhs: KindMask) -> KindMask {
        KindMask(self.0 | rhs.0)
    }
}

const fn kind_bit(kind: NodeType) -> u16 {
    1 << kind as u16
}


/// Node ID.
///
/// Index into a `Document`-internal `Vec`.
///
/// Since documents are built in a single pass, the ID order is the document order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the underlying index.
    pub fn get(self) -> usize {
        self.0
    }
}


pub(crate) enum NodeKind {
    Root,
    Element(ElementData),
    PI { target: String, value: String },
    Comment(String),
    Text(String),
    Whitespace(String),
    SignificantWhitespace(String),
}

impl NodeKind {
    fn node_type(&self) -> NodeType {
        match *self {
            NodeKind::Root => NodeType::Root,
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::PI { .. } => NodeType::ProcessingInstruction,
            NodeKind::Comment(_) => NodeType::Comment,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Whitespace(_) => NodeType::Whitespace,
            NodeKind::SignificantWhitespace(_) => NodeType::SignificantWhitespace,
        }
    }

    fn text_content(&self) -> Option<&str> {
        match *self {
            NodeKind::Text(ref text)
            | NodeKind::Whitespace(ref text)
            | NodeKind::SignificantWhitespace(ref text) => Some(text),
            _ => None,
        }
    }
}


pub(crate) struct ElementData {
    pub(crate) name: QName,
    pub(crate) attributes: Range<usize>,
    /// Declarations made on this element.
    pub(crate) namespaces: Range<usize>,
    /// In-scope namespaces, nearest first. Filled when the document is frozen.
    pub(crate) scope: Range<usize>,
    /// Number of leading `scope` entries declared on this element.
    pub(crate) local_scope: usize,
    pub(crate) is_empty: bool,
}


pub(crate) struct NodeData {
    pub(crate) parent: Option<NodeId>,
    pub(crate) prev_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) children: Option<(NodeId, NodeId)>,
    pub(crate) kind: NodeKind,
}

impl NodeData {
    pub(crate) fn element(&self) -> Option<&ElementData> {
        match self.kind {
            NodeKind::Element(ref e) => Some(e),
            _ => None,
        }
    }
}


/// A namespace URI.
///
/// Shared between all names that use it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct Uri(Arc<str>);

impl Uri {
    pub(crate) fn new(text: &str) -> Self {
        Uri(Arc::from(text))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{:?}", &*self.0)
    }
}


/// A qualified name: an optional prefix, a local name and a namespace URI.
///
/// # Examples
///
/// ```
/// use xmlnav::QName;
///
/// let name = QName::with_namespace("x", "a2", "urn:foo");
/// assert_eq!(name.qualified(), "x:a2");
/// assert_eq!(name.prefix(), "x");
/// assert_eq!(name.local_name(), "a2");
/// assert_eq!(name.namespace(), "urn:foo");
///
/// let name = QName::from("root");
/// assert_eq!(name.prefix(), "");
/// assert_eq!(name.namespace(), "");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QName {
    qualified: String,
    local_start: usize,
    ns: Uri,
}

impl QName {
    /// Creates a name without a prefix and namespace.
    pub fn new(local: &str) -> Self {
        QName { qualified: local.to_string(), local_start: 0, ns: Uri::new("") }
    }

    /// Creates a name with a prefix and namespace URI.
    ///
    /// An empty prefix is allowed, e.g. for names in the default namespace.
    pub fn with_namespace(prefix: &str, local: &str, ns: &str) -> Self {
        QName::with_uri(prefix, local, Uri::new(ns))
    }

    pub(crate) fn with_uri(prefix: &str, local: &str, ns: Uri) -> Self {
        if prefix.is_empty() {
            QName { qualified: local.to_string(), local_start: 0, ns }
        } else {
            QName {
                qualified: format!("{}:{}", prefix, local),
                local_start: prefix.len() + 1,
                ns,
            }
        }
    }

    /// Returns the `prefix:local` form.
    pub fn qualified(&self) -> &str {
        &self.qualified
    }

    /// Returns the prefix or an empty string.
    pub fn prefix(&self) -> &str {
        if self.local_start == 0 {
            ""
        } else {
            &self.qualified[..self.local_start - 1]
        }
    }

    /// Returns the local name.
    pub fn local_name(&self) -> &str {
        &self.qualified[self.local_start..]
    }

    /// Returns the namespace URI or an empty string.
    pub fn namespace(&self) -> &str {
        self.ns.as_str()
    }

    pub(crate) fn matches(&self, local: &str, ns: &str) -> bool {
        self.local_name() == local && self.namespace() == ns
    }
}

impl<'a> From<&'a str> for QName {
    fn from(local: &'a str) -> Self {
        QName::new(local)
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        if self.ns.is_empty() {
            write!(f, "{}", self.qualified)
        } else {
            write!(f, "{{{}}}{}", self.ns.as_str(), self.qualified)
        }
    }
}


/// An attribute.
pub struct Attribute {
    pub(crate) name: QName,
    pub(crate) value: String,
    pub(crate) is_id: bool,
    /// Position among all the attributes of the start tag, namespace declarations included.
    pub(crate) decl_pos: usize,
}

impl Attribute {
    /// Returns attribute's qualified name.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse(
    ///     "<e xmlns:n='http://www.w3.org' a='b' n:a='c'/>"
    /// ).unwrap();
    ///
    /// assert_eq!(doc.root_element().attributes()[0].name(), "a");
    /// assert_eq!(doc.root_element().attributes()[1].name(), "n:a");
    /// ```
    pub fn name(&self) -> &str {
        self.name.qualified()
    }

    /// Returns attribute's local name.
    pub fn local_name(&self) -> &str {
        self.name.local_name()
    }

    /// Returns attribute's prefix.
    pub fn prefix(&self) -> &str {
        self.name.prefix()
    }

    /// Returns attribute's namespace URI.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse(
    ///     "<e xmlns:n='http://www.w3.org' a='b' n:a='c'/>"
    /// ).unwrap();
    ///
    /// assert_eq!(doc.root_element().attributes()[0].namespace(), "");
    /// assert_eq!(doc.root_element().attributes()[1].namespace(), "http://www.w3.org");
    /// ```
    pub fn namespace(&self) -> &str {
        self.name.namespace()
    }

    /// Returns attribute's value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Checks that the attribute was declared with the `ID` type.
    pub fn is_id(&self) -> bool {
        self.is_id
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "Attribute {{ name: {:?}, value: {:?} }}", self.name, self.value)
    }
}


/// A namespace declaration.
///
/// Contains *prefix* and URI pair. The default namespace has an empty prefix.
#[derive(Clone, PartialEq)]
pub struct Namespace {
    pub(crate) prefix: String,
    pub(crate) uri: Uri,
    pub(crate) decl_pos: usize,
}

impl Namespace {
    /// Returns namespace prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse(
    ///     "<e xmlns:n='http://www.w3.org'/>"
    /// ).unwrap();
    ///
    /// assert_eq!(doc.root_element().namespaces()[0].prefix(), "n");
    /// ```
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns namespace URI.
    pub fn uri(&self) -> &str {
        self.uri.as_str()
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "Namespace {{ prefix: {:?}, uri: {:?} }}", self.prefix, self.uri)
    }
}


/// A node.
pub struct Node<'a> {
    /// Node ID.
    id: NodeId,

    /// Tree containing the node.
    doc: &'a Document,

    d: &'a NodeData,
}

impl<'a> Copy for Node<'a> {}

impl<'a> Clone for Node<'a> {
    fn clone(&self) -> Self { *self }
}

impl<'a> Eq for Node<'a> {}

impl<'a> PartialEq for Node<'a> {
    fn eq(&self, other: &Self) -> bool {
           self.id == other.id
        && std::ptr::eq(self.doc, other.doc)
    }
}

impl<'a> Node<'a> {
    /// Returns node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns node's type.
    pub fn node_type(&self) -> NodeType {
        self.d.kind.node_type()
    }

    /// Checks that node is a root node.
    pub fn is_root(&self) -> bool {
        self.node_type() == NodeType::Root
    }

    /// Checks that node is an element node.
    pub fn is_element(&self) -> bool {
        self.node_type() == NodeType::Element
    }

    /// Checks that node is a text, whitespace or significant whitespace node.
    pub fn is_text(&self) -> bool {
        self.node_type().is_text_kind()
    }

    /// Returns node's document.
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Returns node's qualified name.
    ///
    /// Elements return `prefix:local`, processing instructions return their target.
    /// All other nodes have an empty name.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse("<foo:bar xmlns:foo='#foo'/>").unwrap();
    ///
    /// assert_eq!(doc.root_element().name(), "foo:bar");
    /// assert_eq!(doc.root_element().local_name(), "bar");
    /// assert_eq!(doc.root_element().prefix(), "foo");
    /// assert_eq!(doc.root_element().namespace_uri(), "#foo");
    /// ```
    pub fn name(&self) -> &'a str {
        match self.d.kind {
            NodeKind::Element(ref e) => e.name.qualified(),
            NodeKind::PI { ref target, .. } => target,
            _ => "",
        }
    }

    /// Returns node's local name.
    pub fn local_name(&self) -> &'a str {
        match self.d.kind {
            NodeKind::Element(ref e) => e.name.local_name(),
            NodeKind::PI { ref target, .. } => target,
            _ => "",
        }
    }

    /// Returns node's prefix.
    pub fn prefix(&self) -> &'a str {
        match self.d.kind {
            NodeKind::Element(ref e) => e.name.prefix(),
            _ => "",
        }
    }

    /// Returns node's namespace URI.
    pub fn namespace_uri(&self) -> &'a str {
        match self.d.kind {
            NodeKind::Element(ref e) => e.name.namespace(),
            _ => "",
        }
    }

    /// Returns node's string value.
    ///
    /// - for the root and element nodes, a concatenation of all descendant text nodes
    /// - for text, comment and processing instruction nodes, their own content
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse("<foo><bar>baz</bar><quux>quuux</quux></foo>").unwrap();
    ///
    /// assert_eq!(doc.root().value(), "bazquuux");
    /// assert_eq!(doc.root_element().value(), "bazquuux");
    /// ```
    pub fn value(&self) -> Cow<'a, str> {
        match self.d.kind {
            NodeKind::Root | NodeKind::Element(_) => {
                let mut texts = self.descendants().filter_map(|n| n.d.kind.text_content());
                let first = match texts.next() {
                    Some(text) => text,
                    None => return Cow::Borrowed(""),
                };

                match texts.next() {
                    None => Cow::Borrowed(first),
                    Some(second) => {
                        let mut s = String::from(first);
                        s.push_str(second);
                        texts.for_each(|t| s.push_str(t));
                        Cow::Owned(s)
                    }
                }
            }
            NodeKind::PI { ref value, .. } => Cow::Borrowed(value),
            NodeKind::Comment(ref text)
            | NodeKind::Text(ref text)
            | NodeKind::Whitespace(ref text)
            | NodeKind::SignificantWhitespace(ref text) => Cow::Borrowed(text),
        }
    }

    /// Returns node's own text.
    ///
    /// - for text and comment nodes will return a self text
    /// - for a processing instruction will return its value
    /// - for other nodes will return `None`
    pub fn text(&self) -> Option<&'a str> {
        match self.d.kind {
            NodeKind::PI { ref value, .. } => Some(value),
            NodeKind::Comment(ref text) => Some(text),
            _ => self.d.kind.text_content(),
        }
    }

    /// Checks that the element was written as `<e/>`.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse("<root><a/><b></b></root>").unwrap();
    /// let mut children = doc.root_element().children();
    ///
    /// assert!(children.next().unwrap().is_empty_element());
    /// assert!(!children.next().unwrap().is_empty_element());
    /// ```
    pub fn is_empty_element(&self) -> bool {
        match self.d.kind {
            NodeKind::Element(ref e) => e.is_empty,
            _ => false,
        }
    }

    /// Returns element's attribute value.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse(
    ///     "<e xmlns:n='http://www.w3.org' a='b' n:a='c'/>"
    /// ).unwrap();
    ///
    /// assert_eq!(doc.root_element().attribute("a", ""), Some("b"));
    /// assert_eq!(doc.root_element().attribute("a", "http://www.w3.org"), Some("c"));
    /// assert_eq!(doc.root_element().attribute("xmlns", ""), None);
    /// ```
    pub fn attribute(&self, local: &str, ns: &str) -> Option<&'a str> {
        self.attributes().iter().find(|a| a.name.matches(local, ns)).map(|a| a.value.as_str())
    }

    /// Returns element's attributes.
    ///
    /// Namespace declarations are not attributes.
    pub fn attributes(&self) -> &'a [Attribute] {
        match self.d.kind {
            NodeKind::Element(ref e) => &self.doc.attrs[e.attributes.clone()],
            _ => &[],
        }
    }

    /// Checks that element has attributes.
    pub fn has_attributes(&self) -> bool {
        !self.attributes().is_empty()
    }

    /// Returns namespaces declared on this element.
    ///
    /// See [`Node::namespaces_in_scope`] for inherited ones.
    ///
    /// [`Node::namespaces_in_scope`]: struct.Node.html#method.namespaces_in_scope
    pub fn namespaces(&self) -> &'a [Namespace] {
        match self.d.kind {
            NodeKind::Element(ref e) => &self.doc.namespaces[e.namespaces.clone()],
            _ => &[],
        }
    }

    pub(crate) fn element_data(&self) -> Option<&'a ElementData> {
        self.d.element()
    }

    fn gen_node(&self, id: NodeId) -> Node<'a> {
        self.doc.node(id)
    }

    /// Returns the parent of this node.
    pub fn parent(&self) -> Option<Self> {
        self.d.parent.map(|id| self.gen_node(id))
    }

    /// Returns the parent element of this node.
    pub fn parent_element(&self) -> Option<Self> {
        self.ancestors().find(|n| n.is_element())
    }

    /// Returns the previous sibling of this node.
    pub fn prev_sibling(&self) -> Option<Self> {
        self.d.prev_sibling.map(|id| self.gen_node(id))
    }

    /// Returns the next sibling of this node.
    pub fn next_sibling(&self) -> Option<Self> {
        self.d.next_sibling.map(|id| self.gen_node(id))
    }

    /// Returns the first child of this node.
    pub fn first_child(&self) -> Option<Self> {
        self.d.children.map(|(id, _)| self.gen_node(id))
    }

    /// Returns the last child of this node.
    pub fn last_child(&self) -> Option<Self> {
        self.d.children.map(|(_, id)| self.gen_node(id))
    }

    /// Returns true if this node has children.
    pub fn has_children(&self) -> bool {
        self.d.children.is_some()
    }

    /// Returns an iterator over ancestor nodes.
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors(self.parent())
    }

    /// Returns an iterator over previous sibling nodes.
    pub fn prev_siblings(&self) -> PrevSiblings<'a> {
        PrevSiblings(self.prev_sibling())
    }

    /// Returns an iterator over next sibling nodes.
    pub fn next_siblings(&self) -> NextSiblings<'a> {
        NextSiblings(self.next_sibling())
    }

    /// Returns an iterator over children nodes.
    pub fn children(&self) -> Children<'a> {
        Children { front: self.first_child(), back: self.last_child() }
    }

    /// Returns an iterator which traverses the subtree starting at this node.
    pub fn traverse(&self) -> Traverse<'a> {
        Traverse { root: *self, edge: None, done: false }
    }

    /// Returns an iterator over this node and its descendants.
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants(self.traverse())
    }
}

impl<'a> fmt::Debug for Node<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self.d.kind {
            NodeKind::Root => write!(f, "Root"),
            NodeKind::Element(ref e) => {
                write!(f, "Element {{ name: {:?}, attributes: {:?}, namespaces: {:?} }}",
                       e.name, self.attributes(), self.namespaces())
            }
            NodeKind::PI { ref target, ref value } => {
                write!(f, "PI {{ target: {:?}, value: {:?} }}", target, value)
            }
            NodeKind::Comment(ref text) => write!(f, "Comment({:?})", text),
            NodeKind::Text(ref text) => write!(f, "Text({:?})", text),
            NodeKind::Whitespace(ref text) => write!(f, "Whitespace({:?})", text),
            NodeKind::SignificantWhitespace(ref text) => {
                write!(f, "SignificantWhitespace({:?})", text)
            }
        }
    }
}

macro_rules! axis_iterators {
    ($(#[$m:meta] $i:ident($f:path);)*) => {
        $(
            #[$m]
            #[derive(Clone)]
            pub struct $i<'a>(Option<Node<'a>>);
            impl<'a> Iterator for $i<'a> {
                type Item = Node<'a>;
                fn next(&mut self) -> Option<Self::Item> {
                    let node = self.0.take();
                    self.0 = node.as_ref().and_then($f);
                    node
                }
            }
        )*
    };
}

axis_iterators! {
    /// Iterator over ancestors.
    Ancestors(Node::parent);

    /// Iterator over previous siblings.
    PrevSiblings(Node::prev_sibling);

    /// Iterator over next siblings.
    NextSiblings(Node::next_sibling);
}


/// Iterator over children.
#[derive(Clone)]
pub struct Children<'a> {
    front: Option<Node<'a>>,
    back: Option<Node<'a>>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            let node = self.front.take();
            self.back = None;
            node
        } else {
            let node = self.front.take();
            self.front = node.as_ref().and_then(Node::next_sibling);
            node
        }
    }
}

impl<'a> DoubleEndedIterator for Children<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.back == self.front {
            let node = self.back.take();
            self.front = None;
            node
        } else {
            let node = self.back.take();
            self.back = node.as_ref().and_then(Node::prev_sibling);
            node
        }
    }
}


/// Open or close edge of a node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Edge<'a> {
    /// Open.
    Open(Node<'a>),
    /// Close.
    Close(Node<'a>),
}


/// Iterator which traverses a subtree.
#[derive(Clone)]
pub struct Traverse<'a> {
    root: Node<'a>,
    edge: Option<Edge<'a>>,
    done: bool,
}

impl<'a> Traverse<'a> {
    /// Continues the traversal right after the given edge.
    pub(crate) fn resume_after(root: Node<'a>, edge: Edge<'a>) -> Self {
        Traverse { root, edge: Some(edge), done: false }
    }
}

impl<'a> Iterator for Traverse<'a> {
    type Item = Edge<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.edge {
            Some(Edge::Open(node)) => {
                self.edge = Some(match node.first_child() {
                    Some(first_child) => Edge::Open(first_child),
                    None => Edge::Close(node),
                });
            }
            Some(Edge::Close(node)) => {
                if node == self.root {
                    self.edge = None;
                } else if let Some(next_sibling) = node.next_sibling() {
                    self.edge = Some(Edge::Open(next_sibling));
                } else {
                    self.edge = node.parent().map(Edge::Close);
                }
            }
            None => {
                self.edge = Some(Edge::Open(self.root));
            }
        }

        // A finished walk must not start over from the root.
        self.done = self.edge.is_none();
        self.edge
    }
}

impl<'a> FusedIterator for Traverse<'a> {}


/// Iterator over a node and its descendants.
#[derive(Clone)]
pub struct Descendants<'a>(Traverse<'a>);

impl<'a> Iterator for Descendants<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for edge in &mut self.0 {
            if let Edge::Open(node) = edge {
                return Some(node);
            }
        }

        None
    }
}

impl<'a> FusedIterator for Descendants<'a> {}
