use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::{Document, Node, NodeId, NodeKind};


/// Maps values of `ID`-typed attributes to their elements.
#[derive(Default)]
pub(crate) struct IdIndex(HashMap<String, NodeId>);

impl IdIndex {
    /// Scans all elements in document order.
    ///
    /// When the same value is used twice, the first element wins.
    pub(crate) fn build(doc: &Document) -> Self {
        let mut map = HashMap::new();

        for (i, node) in doc.nodes.iter().enumerate() {
            let e = match node.kind {
                NodeKind::Element(ref e) => e,
                _ => continue,
            };

            for attr in doc.attrs[e.attributes.clone()].iter().filter(|a| a.is_id) {
                match map.entry(attr.value.clone()) {
                    Entry::Vacant(entry) => {
                        entry.insert(NodeId(i));
                    }
                    Entry::Occupied(entry) => {
                        tracing::warn!(
                            id = %attr.value,
                            first = entry.get().get(),
                            duplicate = i,
                            "duplicated ID value, the first element is kept"
                        );
                    }
                }
            }
        }

        IdIndex(map)
    }

    pub(crate) fn get(&self, id: &str) -> Option<NodeId> {
        self.0.get(id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}


impl Document {
    /// Returns an element by the value of its `ID`-typed attribute.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse("\
    /// <!DOCTYPE root [<!ATTLIST item key ID #IMPLIED>]>
    /// <root><item key='a'/><item key='b'>B</item></root>
    /// ").unwrap();
    ///
    /// assert_eq!(doc.element_by_id("b").unwrap().value(), "B");
    /// assert!(doc.element_by_id("c").is_none());
    /// ```
    pub fn element_by_id(&self, id: &str) -> Option<Node> {
        self.ids.get(id).map(|id| self.node(id))
    }
}
