use crate::{Document, ElementData, Namespace, Node, NodeKind, NS_XML_PREFIX, NS_XML_URI, NS_XMLNS_PREFIX, NS_XMLNS_URI};


/// Selects which namespace nodes of an element are visited.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum NamespaceScope {
    /// All in-scope namespaces, including the implicit `xml` binding.
    #[default]
    All,
    /// All in-scope namespaces except the implicit `xml` binding.
    ExcludeXml,
    /// Only namespaces declared on the element itself.
    Local,
}


/// Computes in-scope namespaces of every element.
///
/// Parents always precede their children in the arena, so a single forward
/// pass sees the parent scope already resolved.
pub(crate) fn resolve_scopes(doc: &mut Document) {
    for i in 0..doc.nodes.len() {
        let (decls, parent_scope) = match doc.nodes[i].kind {
            NodeKind::Element(ref e) => {
                let parent_scope = doc.nodes[i].parent
                    .and_then(|p| doc.nodes[p.0].element())
                    .map(|p| p.scope.clone())
                    .unwrap_or(0..0);
                (e.namespaces.clone(), parent_scope)
            }
            _ => continue,
        };

        let start = doc.scopes.len();

        for idx in decls.clone() {
            let ns = &doc.namespaces[idx];
            // `xmlns=""` only shadows the inherited default namespace.
            if ns.prefix.is_empty() && ns.uri.is_empty() {
                continue;
            }

            doc.scopes.push(idx);
        }

        let local = doc.scopes.len() - start;

        for k in parent_scope {
            let idx = doc.scopes[k];
            let prefix = &doc.namespaces[idx].prefix;
            let shadowed = doc.namespaces[decls.clone()].iter().any(|ns| ns.prefix == *prefix);
            if !shadowed {
                doc.scopes.push(idx);
            }
        }

        let end = doc.scopes.len();
        if let NodeKind::Element(ref mut e) = doc.nodes[i].kind {
            e.scope = start..end;
            e.local_scope = local;
        }
    }
}


/// Returns the number of namespace nodes visible for a scope.
pub(crate) fn scope_len(e: &ElementData, scope: NamespaceScope) -> usize {
    match scope {
        NamespaceScope::Local => e.local_scope,
        NamespaceScope::ExcludeXml => e.scope.len(),
        NamespaceScope::All => e.scope.len() + 1,
    }
}

/// Returns a namespace node by its index in the `All` list.
pub(crate) fn binding_at<'a>(doc: &'a Document, e: &ElementData, index: usize) -> Option<&'a Namespace> {
    if index < e.scope.len() {
        Some(&doc.namespaces[doc.scopes[e.scope.start + index]])
    } else if index == e.scope.len() {
        // The implicit `xml` binding.
        Some(&doc.namespaces[0])
    } else {
        None
    }
}

/// Resolves a prefix at an element.
///
/// The empty prefix resolves the default namespace.
pub(crate) fn lookup<'a>(doc: &'a Document, e: &ElementData, prefix: &str) -> Option<&'a str> {
    match prefix {
        NS_XML_PREFIX => return Some(NS_XML_URI),
        NS_XMLNS_PREFIX => return Some(NS_XMLNS_URI),
        _ => {}
    }

    doc.scopes[e.scope.clone()].iter()
        .map(|idx| &doc.namespaces[*idx])
        .find(|ns| ns.prefix == prefix)
        .map(|ns| ns.uri.as_str())
}


/// Iterator over in-scope namespaces of an element.
#[derive(Clone)]
pub struct InScopeNamespaces<'a> {
    doc: &'a Document,
    element: Option<&'a ElementData>,
    index: usize,
    len: usize,
}

impl<'a> Iterator for InScopeNamespaces<'a> {
    type Item = &'a Namespace;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }

        let ns = binding_at(self.doc, self.element?, self.index);
        self.index += 1;
        ns
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.len - self.index.min(self.len);
        (n, Some(n))
    }
}

impl<'a> ExactSizeIterator for InScopeNamespaces<'a> {}


impl<'a> Node<'a> {
    /// Returns namespaces in scope of this element.
    ///
    /// Declarations of the element come first, then the inherited ones, nearest first.
    /// `NamespaceScope::All` ends with the implicit `xml` binding.
    ///
    /// Non-element nodes have no namespaces.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlnav::{Document, NamespaceScope};
    ///
    /// let doc = Document::parse("<a xmlns:x='urn:x'><e xmlns:y='urn:y'/></a>").unwrap();
    /// let e = doc.root_element().first_child().unwrap();
    ///
    /// let prefixes: Vec<_> = e.namespaces_in_scope(NamespaceScope::All)
    ///     .map(|ns| ns.prefix()).collect();
    /// assert_eq!(prefixes, ["y", "x", "xml"]);
    ///
    /// let prefixes: Vec<_> = e.namespaces_in_scope(NamespaceScope::Local)
    ///     .map(|ns| ns.prefix()).collect();
    /// assert_eq!(prefixes, ["y"]);
    /// ```
    pub fn namespaces_in_scope(&self, scope: NamespaceScope) -> InScopeNamespaces<'a> {
        let element = self.element_data();
        InScopeNamespaces {
            doc: self.document(),
            element,
            index: 0,
            len: element.map(|e| scope_len(e, scope)).unwrap_or(0),
        }
    }

    /// Resolves a namespace prefix to a URI.
    ///
    /// Non-element nodes resolve against their parent element.
    /// An empty prefix resolves the default namespace.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse("<e xmlns:n='http://www.w3.org'/>").unwrap();
    ///
    /// assert_eq!(doc.root_element().lookup_namespace_uri("n"), Some("http://www.w3.org"));
    /// assert_eq!(doc.root_element().lookup_namespace_uri(""), None);
    /// ```
    pub fn lookup_namespace_uri(&self, prefix: &str) -> Option<&'a str> {
        let element = if self.is_element() { Some(*self) } else { self.parent_element() };
        match element.and_then(|n| n.element_data()) {
            Some(e) => lookup(self.document(), e, prefix),
            None => match prefix {
                NS_XML_PREFIX => Some(NS_XML_URI),
                NS_XMLNS_PREFIX => Some(NS_XMLNS_URI),
                _ => None,
            },
        }
    }

    /// Returns the nearest prefix bound to a URI.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse("<e xmlns:n='http://www.w3.org'/>").unwrap();
    ///
    /// assert_eq!(doc.root_element().lookup_prefix("http://www.w3.org"), Some("n"));
    /// ```
    pub fn lookup_prefix(&self, uri: &str) -> Option<&'a str> {
        if uri == NS_XML_URI {
            return Some(NS_XML_PREFIX);
        }

        let element = if self.is_element() { Some(*self) } else { self.parent_element() };
        element
            .into_iter()
            .flat_map(|n| n.namespaces_in_scope(NamespaceScope::ExcludeXml))
            .find(|ns| ns.uri() == uri)
            .map(|ns| ns.prefix())
    }
}
