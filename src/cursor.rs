use std::borrow::Cow;
use std::fmt;
use std::iter::FusedIterator;

use crate::{
    convert::{convert, FormatError, FromXmlValue},
    namespaces::{self, NamespaceScope},
    reader::SubtreeReader,
    Attribute,
    Descendants,
    Document,
    ElementData,
    InvalidOperation,
    KindMask,
    Namespace,
    Node,
    NodeId,
    NodeType,
};


#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Position {
    Node(NodeId),
    /// `index` is relative to the element's attributes.
    Attribute { element: NodeId, index: usize },
    /// `index` is relative to the element's `NamespaceScope::All` list.
    Namespace { element: NodeId, index: usize },
}


/// A relative position of two cursors in document order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NodeOrder {
    /// The first cursor is before the second one.
    Before,
    /// The first cursor is after the second one.
    After,
    /// Both cursors are at the same position.
    Same,
    /// Cursors belong to different documents.
    Unknown,
}


/// A read-only cursor over the XPath data model of a `Document`.
///
/// Every `move_to_*` method returns `true` on success and leaves the
/// position unchanged on failure.
///
/// Cloning a cursor is cheap and the clone moves independently.
///
/// # Examples
///
/// ```
/// use xmlnav::{Document, NodeType};
///
/// let doc = Document::parse("<root a='1' b='2'><child/></root>").unwrap();
/// let mut cursor = doc.cursor();
///
/// assert!(cursor.move_to_first_child());
/// assert!(cursor.move_to_first_attribute());
/// assert_eq!(cursor.name(), "a");
/// assert!(cursor.move_to_next_attribute());
/// assert_eq!(cursor.value(), "2");
/// assert!(!cursor.move_to_next_attribute());
///
/// assert!(cursor.move_to_parent());
/// assert!(cursor.move_to_first_child());
/// assert_eq!(cursor.node_type(), NodeType::Element);
/// assert_eq!(cursor.name(), "child");
/// ```
#[derive(Clone)]
pub struct Cursor<'a> {
    doc: &'a Document,
    pos: Position,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(doc: &'a Document) -> Self {
        Cursor { doc, pos: Position::Node(NodeId(0)) }
    }

    pub(crate) fn at(node: Node<'a>) -> Self {
        Cursor { doc: node.document(), pos: Position::Node(node.id()) }
    }

    /// Returns the cursor's document.
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Returns the tree node at the current position.
    ///
    /// Returns `None` on attribute and namespace positions.
    pub fn node(&self) -> Option<Node<'a>> {
        match self.pos {
            Position::Node(id) => Some(self.doc.node(id)),
            _ => None,
        }
    }

    /// Returns the attribute at the current position.
    pub fn current_attribute(&self) -> Option<&'a Attribute> {
        match self.pos {
            Position::Attribute { element, index } => {
                let e = self.element_at(element)?;
                self.doc.attrs.get(e.attributes.start + index)
            }
            _ => None,
        }
    }

    /// Returns the namespace binding at the current position.
    pub fn current_namespace(&self) -> Option<&'a Namespace> {
        match self.pos {
            Position::Namespace { element, index } => {
                namespaces::binding_at(self.doc, self.element_at(element)?, index)
            }
            _ => None,
        }
    }

    /// Returns the tree node at the current position or the element that
    /// owns the current attribute or namespace.
    fn owner(&self) -> Node<'a> {
        match self.pos {
            Position::Node(id)
            | Position::Attribute { element: id, .. }
            | Position::Namespace { element: id, .. } => self.doc.node(id),
        }
    }

    fn element_at(&self, id: NodeId) -> Option<&'a ElementData> {
        self.doc.nodes[id.0].element()
    }

    /// Returns the element at the current position.
    fn current_element(&self) -> Option<(NodeId, &'a ElementData)> {
        match self.pos {
            Position::Node(id) => self.element_at(id).map(|e| (id, e)),
            _ => None,
        }
    }

    /// Returns the type of the current node.
    pub fn node_type(&self) -> NodeType {
        match self.pos {
            Position::Node(id) => self.doc.nodes[id.0].kind.node_type(),
            Position::Attribute { .. } => NodeType::Attribute,
            Position::Namespace { .. } => NodeType::Namespace,
        }
    }

    /// Returns the qualified name of the current node.
    ///
    /// Namespace nodes are named after their prefix. Processing instructions
    /// return their target. Root, text and comment nodes have an empty name.
    pub fn name(&self) -> &'a str {
        match self.pos {
            Position::Node(_) => self.owner().name(),
            Position::Attribute { .. } => self.current_attribute().map(Attribute::name).unwrap_or(""),
            Position::Namespace { .. } => self.current_namespace().map(Namespace::prefix).unwrap_or(""),
        }
    }

    /// Returns the local name of the current node.
    pub fn local_name(&self) -> &'a str {
        match self.pos {
            Position::Node(_) => self.owner().local_name(),
            Position::Attribute { .. } => {
                self.current_attribute().map(Attribute::local_name).unwrap_or("")
            }
            Position::Namespace { .. } => {
                self.current_namespace().map(Namespace::prefix).unwrap_or("")
            }
        }
    }

    /// Returns the prefix of the current node.
    pub fn prefix(&self) -> &'a str {
        match self.pos {
            Position::Node(_) => self.owner().prefix(),
            Position::Attribute { .. } => self.current_attribute().map(Attribute::prefix).unwrap_or(""),
            Position::Namespace { .. } => "",
        }
    }

    /// Returns the namespace URI of the current node.
    pub fn namespace_uri(&self) -> &'a str {
        match self.pos {
            Position::Node(_) => self.owner().namespace_uri(),
            Position::Attribute { .. } => {
                self.current_attribute().map(Attribute::namespace).unwrap_or("")
            }
            Position::Namespace { .. } => "",
        }
    }

    /// Returns the string value of the current node.
    ///
    /// Attributes return their value and namespace nodes their URI.
    pub fn value(&self) -> Cow<'a, str> {
        match self.pos {
            Position::Node(_) => self.owner().value(),
            Position::Attribute { .. } => {
                Cow::Borrowed(self.current_attribute().map(Attribute::value).unwrap_or(""))
            }
            Position::Namespace { .. } => {
                Cow::Borrowed(self.current_namespace().map(Namespace::uri).unwrap_or(""))
            }
        }
    }

    /// Checks that the current node is an element with attributes.
    ///
    /// Namespace declarations are not attributes.
    pub fn has_attributes(&self) -> bool {
        self.current_element().map(|(_, e)| !e.attributes.is_empty()).unwrap_or(false)
    }

    /// Checks that the current node has child nodes.
    pub fn has_children(&self) -> bool {
        self.node().map(|n| n.has_children()).unwrap_or(false)
    }

    /// Checks that the current node is an element written as `<e/>`.
    pub fn is_empty_element(&self) -> bool {
        self.current_element().map(|(_, e)| e.is_empty).unwrap_or(false)
    }

    fn set_node(&mut self, node: Option<Node<'a>>) -> bool {
        match node {
            Some(node) => {
                self.pos = Position::Node(node.id());
                true
            }
            None => false,
        }
    }

    /// Moves to the first child node.
    pub fn move_to_first_child(&mut self) -> bool {
        let child = self.node().and_then(|n| n.first_child());
        self.set_node(child)
    }

    /// Moves to the next sibling node.
    pub fn move_to_next(&mut self) -> bool {
        let next = self.node().and_then(|n| n.next_sibling());
        self.set_node(next)
    }

    /// Moves to the previous sibling node.
    pub fn move_to_previous(&mut self) -> bool {
        let prev = self.node().and_then(|n| n.prev_sibling());
        self.set_node(prev)
    }

    /// Moves to the first sibling node.
    ///
    /// Succeeds when already there. Fails on the root node, attributes and namespaces.
    pub fn move_to_first(&mut self) -> bool {
        let first = self.node().and_then(|n| n.parent()).and_then(|p| p.first_child());
        self.set_node(first)
    }

    /// Moves to the parent node.
    ///
    /// Attributes and namespace nodes move to their element.
    pub fn move_to_parent(&mut self) -> bool {
        match self.pos {
            Position::Node(_) => {
                let parent = self.owner().parent();
                self.set_node(parent)
            }
            Position::Attribute { element, .. } | Position::Namespace { element, .. } => {
                self.pos = Position::Node(element);
                true
            }
        }
    }

    /// Moves to the root node. Always succeeds.
    pub fn move_to_root(&mut self) {
        self.pos = Position::Node(NodeId(0));
    }

    /// Moves to the position of another cursor.
    ///
    /// Fails when the cursor belongs to a different document.
    pub fn move_to(&mut self, other: &Cursor<'a>) -> bool {
        if !std::ptr::eq(self.doc, other.doc) {
            return false;
        }

        self.pos = other.pos;
        true
    }

    /// Moves to an element by the value of its `ID`-typed attribute.
    pub fn move_to_id(&mut self, id: &str) -> bool {
        match self.doc.ids.get(id) {
            Some(element) => {
                self.pos = Position::Node(element);
                true
            }
            None => {
                tracing::trace!(id, "no element with such ID");
                false
            }
        }
    }

    /// Moves to the first attribute of the current element.
    pub fn move_to_first_attribute(&mut self) -> bool {
        match self.current_element() {
            Some((element, e)) if !e.attributes.is_empty() => {
                self.pos = Position::Attribute { element, index: 0 };
                true
            }
            _ => false,
        }
    }

    /// Moves to the next attribute of the same element.
    pub fn move_to_next_attribute(&mut self) -> bool {
        if let Position::Attribute { element, index } = self.pos {
            let len = self.element_at(element).map(|e| e.attributes.len()).unwrap_or(0);
            if index + 1 < len {
                self.pos = Position::Attribute { element, index: index + 1 };
                return true;
            }
        }

        false
    }

    /// Moves to an attribute of the current element by its expanded name.
    pub fn move_to_attribute(&mut self, local: &str, ns: &str) -> bool {
        let (element, e) = match self.current_element() {
            Some(v) => v,
            None => return false,
        };

        let attrs = &self.doc.attrs[e.attributes.clone()];
        match attrs.iter().position(|a| a.name.matches(local, ns)) {
            Some(index) => {
                self.pos = Position::Attribute { element, index };
                true
            }
            None => false,
        }
    }

    /// Moves to the first namespace node of the current element.
    pub fn move_to_first_namespace(&mut self, scope: NamespaceScope) -> bool {
        match self.current_element() {
            Some((element, e)) if namespaces::scope_len(e, scope) > 0 => {
                self.pos = Position::Namespace { element, index: 0 };
                true
            }
            _ => false,
        }
    }

    /// Moves to the next namespace node of the same element.
    ///
    /// Fails when the next node is outside of `scope`. Each scope list starts
    /// with the narrower one, so an iteration may continue with a wider scope:
    /// after the last `Local` node, `All` still yields the inherited bindings and `xml`.
    pub fn move_to_next_namespace(&mut self, scope: NamespaceScope) -> bool {
        if let Position::Namespace { element, index } = self.pos {
            let len = self.element_at(element).map(|e| namespaces::scope_len(e, scope)).unwrap_or(0);
            if index + 1 < len {
                self.pos = Position::Namespace { element, index: index + 1 };
                return true;
            }
        }

        false
    }

    /// Moves to the in-scope namespace node with the given prefix.
    pub fn move_to_namespace(&mut self, prefix: &str) -> bool {
        let (element, _) = match self.current_element() {
            Some(v) => v,
            None => return false,
        };

        let node = self.doc.node(element);
        match node.namespaces_in_scope(NamespaceScope::All).position(|ns| ns.prefix() == prefix) {
            Some(index) => {
                self.pos = Position::Namespace { element, index };
                true
            }
            None => false,
        }
    }

    /// Moves to the next node in document order that matches the mask.
    ///
    /// On attribute and namespace positions the search starts at the
    /// children of their element.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlnav::{Document, KindMask};
    ///
    /// let doc = Document::parse("<root><child/></root>").unwrap();
    /// let mut cursor = doc.cursor();
    ///
    /// assert!(cursor.move_to_following(KindMask::ALL));
    /// assert_eq!(cursor.name(), "root");
    /// assert!(cursor.move_to_following(KindMask::ALL));
    /// assert_eq!(cursor.name(), "child");
    /// assert!(!cursor.move_to_following(KindMask::ALL));
    /// ```
    pub fn move_to_following(&mut self, mask: KindMask) -> bool {
        let start = self.owner().id().0 + 1;
        let found = self.doc.nodes[start..].iter()
            .position(|n| mask.contains(n.kind.node_type()))
            .map(|i| NodeId(start + i));

        match found {
            Some(id) => {
                self.pos = Position::Node(id);
                true
            }
            None => false,
        }
    }

    /// Moves to the next element in document order with the given expanded name.
    pub fn move_to_following_element(&mut self, local: &str, ns: &str) -> bool {
        let start = self.owner().id().0 + 1;
        let found = self.doc.nodes[start..].iter()
            .position(|n| n.element().map(|e| e.name.matches(local, ns)).unwrap_or(false))
            .map(|i| NodeId(start + i));

        match found {
            Some(id) => {
                self.pos = Position::Node(id);
                true
            }
            None => false,
        }
    }

    /// Moves to the next sibling that matches the mask.
    pub fn move_to_next_of_kind(&mut self, mask: KindMask) -> bool {
        let next = self.node()
            .and_then(|n| n.next_siblings().find(|n| mask.contains(n.node_type())));
        self.set_node(next)
    }

    /// Moves to the next sibling element with the given expanded name.
    pub fn move_to_next_element(&mut self, local: &str, ns: &str) -> bool {
        let next = self.node()
            .and_then(|n| n.next_siblings().find(|n| is_element_named(n, local, ns)));
        self.set_node(next)
    }

    /// Moves to the first child that matches the mask.
    pub fn move_to_child(&mut self, mask: KindMask) -> bool {
        let child = self.node()
            .and_then(|n| n.children().find(|n| mask.contains(n.node_type())));
        self.set_node(child)
    }

    /// Moves to the first child element with the given expanded name.
    pub fn move_to_child_element(&mut self, local: &str, ns: &str) -> bool {
        let child = self.node()
            .and_then(|n| n.children().find(|n| is_element_named(n, local, ns)));
        self.set_node(child)
    }

    /// Checks that both cursors point to the same node of the same document.
    pub fn is_same_position(&self, other: &Cursor) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.pos == other.pos
    }

    /// Checks that `other` is strictly inside the subtree of this cursor.
    ///
    /// Attributes and namespace nodes are descendants of their element.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse("<a><e x='1'/></a>").unwrap();
    ///
    /// let root = doc.cursor();
    /// let mut attr = doc.cursor();
    /// assert!(attr.move_to_following_element("e", ""));
    /// assert!(attr.move_to_first_attribute());
    ///
    /// assert!(root.is_descendant(&attr));
    /// assert!(!attr.is_descendant(&root));
    /// ```
    pub fn is_descendant(&self, other: &Cursor) -> bool {
        if !std::ptr::eq(self.doc, other.doc) {
            return false;
        }

        let id = match self.pos {
            Position::Node(id) => id,
            _ => return false,
        };

        let mut current = match other.pos {
            Position::Node(oid) => self.doc.nodes[oid.0].parent,
            Position::Attribute { element, .. } | Position::Namespace { element, .. } => Some(element),
        };

        while let Some(ancestor) = current {
            if ancestor == id {
                return true;
            }

            current = self.doc.nodes[ancestor.0].parent;
        }

        false
    }

    /// Compares positions of two cursors in document order.
    ///
    /// Namespace nodes of an element precede its attributes, and both precede its children.
    pub fn compare_position(&self, other: &Cursor) -> NodeOrder {
        if !std::ptr::eq(self.doc, other.doc) {
            return NodeOrder::Unknown;
        }

        match self.order_key().cmp(&other.order_key()) {
            std::cmp::Ordering::Less => NodeOrder::Before,
            std::cmp::Ordering::Greater => NodeOrder::After,
            std::cmp::Ordering::Equal => NodeOrder::Same,
        }
    }

    fn order_key(&self) -> (usize, usize) {
        match self.pos {
            Position::Node(id) => (id.0, 0),
            Position::Namespace { element, index } => (element.0, 1 + index),
            Position::Attribute { element, index } => {
                let namespaces = self.element_at(element)
                    .map(|e| namespaces::scope_len(e, NamespaceScope::All))
                    .unwrap_or(0);
                (element.0, 1 + namespaces + index)
            }
        }
    }

    /// Returns cursors at the children that match the mask.
    pub fn select_children(&self, mask: KindMask) -> SelectChildren<'a> {
        SelectChildren {
            next: self.node().and_then(|n| n.first_child()),
            mask,
        }
    }

    /// Returns cursors at the descendants that match the mask.
    ///
    /// The current node is included when `match_self` is set.
    pub fn select_descendants(&self, mask: KindMask, match_self: bool) -> SelectDescendants<'a> {
        let mut iter = self.node().map(|n| n.descendants());
        if !match_self {
            if let Some(ref mut iter) = iter {
                iter.next();
            }
        }

        SelectDescendants { iter, mask }
    }

    /// Returns the value of an attribute of the current element.
    ///
    /// Returns an empty string when there is no such attribute.
    pub fn get_attribute(&self, local: &str, ns: &str) -> &'a str {
        match self.current_element() {
            Some((element, _)) => self.doc.node(element).attribute(local, ns).unwrap_or(""),
            None => "",
        }
    }

    /// Returns the namespace URI bound to a prefix at the current node.
    ///
    /// Returns an empty string when the prefix is not bound.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse("<a xmlns:x='urn:x'/>").unwrap();
    /// let mut cursor = doc.cursor();
    /// cursor.move_to_first_child();
    ///
    /// assert_eq!(cursor.get_namespace("x"), "urn:x");
    /// assert_eq!(cursor.get_namespace(""), "");
    /// assert_eq!(cursor.get_namespace("xml"), xmlnav::NS_XML_URI);
    /// ```
    pub fn get_namespace(&self, prefix: &str) -> &'a str {
        self.owner().lookup_namespace_uri(prefix).unwrap_or("")
    }

    /// Converts the current value.
    pub fn value_as<T: FromXmlValue>(&self) -> Result<T, FormatError> {
        convert(&self.value())
    }

    /// Converts the current value to a boolean.
    pub fn value_as_bool(&self) -> Result<bool, FormatError> {
        self.value_as()
    }

    /// Converts the current value to a 32-bit integer.
    pub fn value_as_int(&self) -> Result<i32, FormatError> {
        self.value_as()
    }

    /// Converts the current value to a 64-bit integer.
    pub fn value_as_long(&self) -> Result<i64, FormatError> {
        self.value_as()
    }

    /// Converts the current value to a double.
    pub fn value_as_double(&self) -> Result<f64, FormatError> {
        self.value_as()
    }

    /// Converts the current value to a date and time.
    pub fn value_as_date_time(&self) -> Result<chrono::NaiveDateTime, FormatError> {
        self.value_as()
    }

    /// Creates a pull reader over the current subtree.
    ///
    /// Only root and element positions can be read.
    pub fn read_subtree(&self) -> Result<SubtreeReader<'a>, InvalidOperation> {
        SubtreeReader::new(self)
    }
}

impl<'a> fmt::Debug for Cursor<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "Cursor {{ position: {:?}, type: {:?}, name: {:?} }}",
               self.pos, self.node_type(), self.name())
    }
}

fn is_element_named(node: &Node, local: &str, ns: &str) -> bool {
    node.element_data().map(|e| e.name.matches(local, ns)).unwrap_or(false)
}


/// Iterator over cursors at child nodes.
#[derive(Clone)]
pub struct SelectChildren<'a> {
    next: Option<Node<'a>>,
    mask: KindMask,
}

impl<'a> Iterator for SelectChildren<'a> {
    type Item = Cursor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.next {
            self.next = node.next_sibling();
            if self.mask.contains(node.node_type()) {
                return Some(Cursor::at(node));
            }
        }

        None
    }
}

impl<'a> FusedIterator for SelectChildren<'a> {}


/// Iterator over cursors at descendant nodes.
#[derive(Clone)]
pub struct SelectDescendants<'a> {
    iter: Option<Descendants<'a>>,
    mask: KindMask,
}

impl<'a> Iterator for SelectDescendants<'a> {
    type Item = Cursor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let mask = self.mask;
        self.iter.as_mut()?
            .find(|n| mask.contains(n.node_type()))
            .map(Cursor::at)
    }
}

impl<'a> FusedIterator for SelectDescendants<'a> {}
