use crate::{
    ids::IdIndex,
    namespaces,
    Attribute,
    Document,
    ElementData,
    InvalidOperation,
    Namespace,
    NodeData,
    NodeId,
    NodeKind,
    QName,
    Uri,
    NS_XML_PREFIX,
    NS_XML_URI,
};


/// An append-only `Document` constructor.
///
/// Nodes are appended in document order. Attributes and namespace declarations
/// must be added right after `start_element`, before any content of that element.
///
/// Adjacent text runs are merged into a single text node and classified as
/// `Text`, `Whitespace` or `SignificantWhitespace` according to the
/// `xml:space` attributes in scope. Insignificant whitespace is dropped
/// unless `preserve_whitespace` is set.
///
/// # Examples
///
/// ```
/// use xmlnav::{DocumentBuilder, QName};
///
/// let mut b = DocumentBuilder::new();
/// b.start_element(QName::with_namespace("x", "root", "urn:x")).unwrap();
/// b.namespace("x", "urn:x").unwrap();
/// b.attribute("a", "1").unwrap();
/// b.text("hello").unwrap();
/// b.end_element().unwrap();
/// let doc = b.finish().unwrap();
///
/// assert_eq!(doc.root_element().name(), "x:root");
/// assert_eq!(doc.root_element().value(), "hello");
/// ```
#[derive(Debug)]
pub struct DocumentBuilder {
    doc: Document,
    parent: NodeId,
    pending: Option<PendingElement>,
    /// `xml:space="preserve"` state of each open element.
    space: Vec<bool>,
    preserve_whitespace: bool,
}

#[derive(Debug)]
struct PendingElement {
    name: QName,
    attributes_start: usize,
    namespaces_start: usize,
    next_decl_pos: usize,
    preserve: Option<bool>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    /// Creates a builder that contains only the root node.
    pub fn new() -> Self {
        let root = NodeData {
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            children: None,
            kind: NodeKind::Root,
        };

        let xml = Namespace {
            prefix: NS_XML_PREFIX.to_string(),
            uri: Uri::new(NS_XML_URI),
            decl_pos: 0,
        };

        DocumentBuilder {
            doc: Document {
                nodes: vec![root],
                attrs: Vec::new(),
                namespaces: vec![xml],
                scopes: Vec::new(),
                root_element: NodeId(0),
                ids: IdIndex::default(),
            },
            parent: NodeId(0),
            pending: None,
            space: vec![false],
            preserve_whitespace: false,
        }
    }

    /// Keeps whitespace-only text nodes outside of `xml:space="preserve"` scopes.
    pub fn preserve_whitespace(mut self, flag: bool) -> Self {
        self.preserve_whitespace = flag;
        self
    }

    /// Returns the number of nodes appended so far, including the root node.
    pub fn nodes_count(&self) -> usize {
        self.doc.nodes.len()
    }

    /// Starts a new element.
    ///
    /// Fails when the document already has a root element.
    pub fn start_element<N: Into<QName>>(&mut self, name: N) -> Result<&mut Self, InvalidOperation> {
        self.open_pending()?;

        if self.parent == NodeId(0) && self.doc.root_element != NodeId(0) {
            return Err(InvalidOperation::new("a document can have only one root element"));
        }

        self.pending = Some(PendingElement {
            name: name.into(),
            attributes_start: self.doc.attrs.len(),
            namespaces_start: self.doc.namespaces.len(),
            next_decl_pos: 0,
            preserve: None,
        });

        Ok(self)
    }

    /// Adds an attribute to the element started last.
    pub fn attribute<N: Into<QName>>(&mut self, name: N, value: &str) -> Result<&mut Self, InvalidOperation> {
        self.push_attribute(name.into(), value, false)
    }

    /// Adds an `ID`-typed attribute to the element started last.
    ///
    /// The element will be reachable by `Cursor::move_to_id`.
    pub fn id_attribute<N: Into<QName>>(&mut self, name: N, value: &str) -> Result<&mut Self, InvalidOperation> {
        self.push_attribute(name.into(), value, true)
    }

    fn push_attribute(&mut self, name: QName, value: &str, is_id: bool) -> Result<&mut Self, InvalidOperation> {
        let pending = match self.pending {
            Some(ref mut pending) => pending,
            None => return Err(InvalidOperation::new(
                "attributes must be added before any content of the element"
            )),
        };

        if name.prefix() == NS_XML_PREFIX && name.local_name() == "space" {
            pending.preserve = Some(value == "preserve");
        }

        self.doc.attrs.push(Attribute {
            name,
            value: value.to_string(),
            is_id,
            decl_pos: pending.next_decl_pos,
        });
        pending.next_decl_pos += 1;

        Ok(self)
    }

    /// Declares a namespace on the element started last.
    ///
    /// An empty prefix declares the default namespace. An empty URI with an
    /// empty prefix undeclares the inherited default namespace.
    pub fn namespace(&mut self, prefix: &str, uri: &str) -> Result<&mut Self, InvalidOperation> {
        let pending = match self.pending {
            Some(ref mut pending) => pending,
            None => return Err(InvalidOperation::new(
                "namespaces must be declared before any content of the element"
            )),
        };

        let declared = &self.doc.namespaces[pending.namespaces_start..];
        if declared.iter().any(|ns| ns.prefix == prefix) {
            return Err(InvalidOperation::new(
                format!("namespace prefix '{}' is declared twice", prefix)
            ));
        }

        self.doc.namespaces.push(Namespace {
            prefix: prefix.to_string(),
            uri: Uri::new(uri),
            decl_pos: pending.next_decl_pos,
        });
        pending.next_decl_pos += 1;

        Ok(self)
    }

    /// Appends text to the current element.
    ///
    /// Merged with the previous node when it is a text node as well.
    pub fn text(&mut self, text: &str) -> Result<&mut Self, InvalidOperation> {
        if text.is_empty() {
            return Ok(self);
        }

        self.open_pending()?;

        if self.parent == NodeId(0) {
            if is_xml_whitespace(text) {
                return Ok(self);
            }

            return Err(InvalidOperation::new("text is not allowed outside of the root element"));
        }

        let preserve = self.space.last().cloned().unwrap_or(false);

        let last_text = self.doc.nodes[self.parent.0].children
            .map(|(_, last)| last)
            .filter(|last| self.doc.nodes[last.0].kind.text_content().is_some());

        if let Some(last) = last_text {
            let node = &mut self.doc.nodes[last.0];
            let mut merged = match std::mem::replace(&mut node.kind, NodeKind::Root) {
                NodeKind::Text(s) | NodeKind::Whitespace(s) | NodeKind::SignificantWhitespace(s) => s,
                other => {
                    node.kind = other;
                    return Ok(self);
                }
            };
            merged.push_str(text);
            node.kind = classify_text(merged, preserve);
            return Ok(self);
        }

        let kind = classify_text(text.to_string(), preserve);
        if let NodeKind::Whitespace(_) = kind {
            if !self.preserve_whitespace {
                tracing::trace!(len = text.len(), "insignificant whitespace dropped");
                return Ok(self);
            }
        }

        self.append(kind);
        Ok(self)
    }

    /// Appends a comment.
    pub fn comment(&mut self, text: &str) -> Result<&mut Self, InvalidOperation> {
        self.open_pending()?;
        self.append(NodeKind::Comment(text.to_string()));
        Ok(self)
    }

    /// Appends a processing instruction.
    pub fn processing_instruction(&mut self, target: &str, value: &str)
        -> Result<&mut Self, InvalidOperation>
    {
        self.open_pending()?;
        self.append(NodeKind::PI { target: target.to_string(), value: value.to_string() });
        Ok(self)
    }

    /// Closes the current element with an end tag.
    pub fn end_element(&mut self) -> Result<&mut Self, InvalidOperation> {
        if let Some(pending) = self.pending.take() {
            self.append_element(pending, false);
            return Ok(self);
        }

        if self.parent == NodeId(0) {
            return Err(InvalidOperation::new("there is no open element to close"));
        }

        self.space.pop();
        self.parent = self.doc.nodes[self.parent.0].parent.unwrap_or(NodeId(0));
        Ok(self)
    }

    /// Closes the element started last as an empty element, like `<e/>`.
    ///
    /// Fails when the element already has content.
    pub fn end_empty_element(&mut self) -> Result<&mut Self, InvalidOperation> {
        match self.pending.take() {
            Some(pending) => {
                self.append_element(pending, true);
                Ok(self)
            }
            None => Err(InvalidOperation::new("only an element without content can be empty")),
        }
    }

    /// Freezes the document.
    ///
    /// Computes namespace scopes and builds the ID index.
    pub fn finish(mut self) -> Result<Document, InvalidOperation> {
        if self.pending.is_some() || self.parent != NodeId(0) {
            return Err(InvalidOperation::new("the document has unclosed elements"));
        }

        if self.doc.root_element == NodeId(0) {
            return Err(InvalidOperation::new("the document has no root element"));
        }

        namespaces::resolve_scopes(&mut self.doc);
        self.doc.ids = IdIndex::build(&self.doc);

        tracing::debug!(
            nodes = self.doc.nodes.len(),
            attributes = self.doc.attrs.len(),
            namespaces = self.doc.namespaces.len() - 1,
            ids = self.doc.ids.len(),
            "document frozen"
        );

        Ok(self.doc)
    }

    fn open_pending(&mut self) -> Result<(), InvalidOperation> {
        if let Some(pending) = self.pending.take() {
            let preserve = pending.preserve
                .unwrap_or_else(|| self.space.last().cloned().unwrap_or(false));
            self.parent = self.append_element(pending, false);
            self.space.push(preserve);
        }

        Ok(())
    }

    fn append_element(&mut self, pending: PendingElement, is_empty: bool) -> NodeId {
        let id = self.append(NodeKind::Element(ElementData {
            name: pending.name,
            attributes: pending.attributes_start..self.doc.attrs.len(),
            namespaces: pending.namespaces_start..self.doc.namespaces.len(),
            scope: 0..0,
            local_scope: 0,
            is_empty,
        }));

        if self.parent == NodeId(0) {
            self.doc.root_element = id;
        }

        id
    }

    fn append(&mut self, kind: NodeKind) -> NodeId {
        let new_child_id = NodeId(self.doc.nodes.len());
        let parent_id = self.parent;

        self.doc.nodes.push(NodeData {
            parent: Some(parent_id),
            prev_sibling: None,
            next_sibling: None,
            children: None,
            kind,
        });

        let last_child_id = self.doc.nodes[parent_id.0].children.map(|(_, id)| id);
        self.doc.nodes[new_child_id.0].prev_sibling = last_child_id;

        if let Some(id) = last_child_id {
            self.doc.nodes[id.0].next_sibling = Some(new_child_id);
        }

        self.doc.nodes[parent_id.0].children = Some(
            match self.doc.nodes[parent_id.0].children {
                Some((first_child_id, _)) => (first_child_id, new_child_id),
                None => (new_child_id, new_child_id),
            }
        );

        new_child_id
    }
}

fn classify_text(text: String, preserve: bool) -> NodeKind {
    if !is_xml_whitespace(&text) {
        NodeKind::Text(text)
    } else if preserve {
        NodeKind::SignificantWhitespace(text)
    } else {
        NodeKind::Whitespace(text)
    }
}

pub(crate) fn is_xml_whitespace(text: &str) -> bool {
    text.bytes().all(|c| matches!(c, b' ' | b'\t' | b'\n' | b'\r'))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeType;

    #[test]
    fn attribute_after_content() {
        let mut b = DocumentBuilder::new();
        b.start_element("a").unwrap();
        b.text("x").unwrap();
        assert!(b.attribute("b", "1").is_err());
    }

    #[test]
    fn second_root() {
        let mut b = DocumentBuilder::new();
        b.start_element("a").unwrap().end_empty_element().unwrap();
        assert!(b.start_element("b").is_err());
    }

    #[test]
    fn unclosed() {
        let mut b = DocumentBuilder::new();
        b.start_element("a").unwrap();
        b.start_element("b").unwrap();
        b.end_element().unwrap();
        assert!(b.finish().is_err());
    }

    #[test]
    fn no_root() {
        let mut b = DocumentBuilder::new();
        b.comment("c").unwrap();
        assert!(b.finish().is_err());
    }

    #[test]
    fn text_merge_reclassifies() {
        let mut b = DocumentBuilder::new().preserve_whitespace(true);
        b.start_element("a").unwrap();
        b.text("  ").unwrap();
        b.text("x").unwrap();
        b.end_element().unwrap();
        let doc = b.finish().unwrap();

        let child = doc.root_element().first_child().unwrap();
        assert_eq!(child.node_type(), NodeType::Text);
        assert_eq!(child.text(), Some("  x"));
        assert_eq!(doc.root_element().children().count(), 1);
    }

    #[test]
    fn space_preserve_inherited() {
        let mut b = DocumentBuilder::new();
        b.start_element("a").unwrap();
        b.attribute(QName::with_namespace("xml", "space", NS_XML_URI), "preserve").unwrap();
        b.start_element("b").unwrap();
        b.text(" ").unwrap();
        b.end_element().unwrap();
        b.end_element().unwrap();
        let doc = b.finish().unwrap();

        let b = doc.root_element().first_child().unwrap();
        assert_eq!(b.first_child().unwrap().node_type(), NodeType::SignificantWhitespace);
    }
}
