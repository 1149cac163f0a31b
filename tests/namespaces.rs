use pretty_assertions::assert_eq;
use rstest::rstest;

use xmlnav::*;

fn collect(cursor: &Cursor, scope: NamespaceScope) -> Vec<(String, String)> {
    let mut cursor = cursor.clone();
    let mut list = Vec::new();

    if cursor.move_to_first_namespace(scope) {
        loop {
            list.push((cursor.name().to_string(), cursor.value().into_owned()));
            if !cursor.move_to_next_namespace(scope) {
                break;
            }
        }
    }

    list
}

fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
    list.iter().map(|(p, u)| (p.to_string(), u.to_string())).collect()
}

const DATA: &str = "\
<a xmlns:x='urn:x' xmlns='urn:default'>
    <b xmlns:y='urn:y' xmlns:x='urn:x2'>
        <c xmlns=''/>
    </b>
</a>
";

#[rstest]
#[case("a", NamespaceScope::Local, &[("x", "urn:x"), ("", "urn:default")])]
#[case("a", NamespaceScope::ExcludeXml, &[("x", "urn:x"), ("", "urn:default")])]
#[case("a", NamespaceScope::All, &[("x", "urn:x"), ("", "urn:default"), ("xml", NS_XML_URI)])]
#[case("b", NamespaceScope::Local, &[("y", "urn:y"), ("x", "urn:x2")])]
#[case("b", NamespaceScope::All,
    &[("y", "urn:y"), ("x", "urn:x2"), ("", "urn:default"), ("xml", NS_XML_URI)])]
#[case("c", NamespaceScope::Local, &[])]
#[case("c", NamespaceScope::All, &[("y", "urn:y"), ("x", "urn:x2"), ("xml", NS_XML_URI)])]
fn scopes(#[case] local: &str, #[case] scope: NamespaceScope, #[case] expected: &[(&str, &str)]) {
    let doc = Document::parse(DATA).unwrap();
    let mut cursor = doc.cursor();
    assert!(cursor.move_to_following(KindMask::of(NodeType::Element)));
    while cursor.local_name() != local {
        assert!(cursor.move_to_following(KindMask::of(NodeType::Element)));
    }

    assert_eq!(collect(&cursor, scope), pairs(expected));
}

#[test]
fn xml_reported_once() {
    let doc = Document::parse("<a xmlns:xml='http://www.w3.org/XML/1998/namespace'><b/></a>").unwrap();
    let b = doc.root_element().first_child().unwrap();

    let prefixes: Vec<_> = b.namespaces_in_scope(NamespaceScope::All).map(|ns| ns.prefix()).collect();
    assert_eq!(prefixes, ["xml"]);
}

#[test]
fn scope_widened_during_iteration() {
    let doc = Document::parse("<html xmlns='NS1'><body/></html>").unwrap();
    let mut cursor = doc.cursor();
    assert!(cursor.move_to_first_child());

    assert!(cursor.move_to_first_namespace(NamespaceScope::Local));
    assert_eq!((cursor.name(), &*cursor.value()), ("", "NS1"));
    assert!(!cursor.move_to_next_namespace(NamespaceScope::Local));
    assert!(!cursor.move_to_next_namespace(NamespaceScope::ExcludeXml));
    assert_eq!(cursor.value(), "NS1");

    assert!(cursor.move_to_next_namespace(NamespaceScope::All));
    assert_eq!((cursor.name(), &*cursor.value()), ("xml", NS_XML_URI));
    assert!(!cursor.move_to_next_namespace(NamespaceScope::All));
    assert_eq!(cursor.name(), "xml");

    assert!(cursor.move_to_parent());
    assert!(cursor.move_to_first_child());
    assert_eq!(cursor.name(), "body");

    assert!(!cursor.move_to_first_namespace(NamespaceScope::Local));
    assert!(cursor.move_to_first_namespace(NamespaceScope::ExcludeXml));
    assert_eq!(cursor.value(), "NS1");
    assert!(!cursor.move_to_next_namespace(NamespaceScope::ExcludeXml));
    assert!(cursor.move_to_next_namespace(NamespaceScope::All));
    assert_eq!(cursor.name(), "xml");
    assert!(!cursor.move_to_next_namespace(NamespaceScope::All));
}

#[test]
fn move_to_root_from_namespace() {
    let doc = Document::parse("<a xmlns:x='urn:x'><b/></a>").unwrap();
    let mut cursor = doc.cursor();
    assert!(cursor.move_to_following_element("b", ""));
    assert!(cursor.move_to_first_namespace(NamespaceScope::All));
    assert_eq!(cursor.node_type(), NodeType::Namespace);

    cursor.move_to_root();
    assert_eq!(cursor.node_type(), NodeType::Root);
    assert!(cursor.is_same_position(&doc.cursor()));
    assert!(!cursor.move_to_next_namespace(NamespaceScope::All));
    assert!(cursor.move_to_first_child());
    assert_eq!(cursor.name(), "a");
}

#[test]
fn nested_order() {
    let doc = Document::parse("<a xmlns:x='urn:x'><e/></a>").unwrap();
    let mut cursor = doc.cursor();
    assert!(cursor.move_to_following_element("e", ""));

    assert_eq!(
        collect(&cursor, NamespaceScope::All),
        pairs(&[("x", "urn:x"), ("xml", NS_XML_URI)])
    );
}

#[test]
fn default_namespace_undeclared() {
    let doc = Document::parse(DATA).unwrap();
    let mut cursor = doc.cursor();
    assert!(cursor.move_to_following_element("c", ""));

    assert_eq!(cursor.namespace_uri(), "");
    assert_eq!(cursor.get_namespace(""), "");
    assert_eq!(cursor.get_namespace("x"), "urn:x2");

    let c = cursor.node().unwrap();
    assert_eq!(c.lookup_namespace_uri(""), None);
    assert_eq!(c.lookup_prefix("urn:y"), Some("y"));
    assert_eq!(c.lookup_prefix("urn:x"), None);
}

#[test]
fn non_element_positions() {
    let doc = Document::parse("<a xmlns:x='urn:x'>text</a>").unwrap();
    let mut cursor = doc.cursor();

    assert!(!cursor.move_to_first_namespace(NamespaceScope::All));

    assert!(cursor.move_to_following(KindMask::of(NodeType::Text)));
    assert!(!cursor.move_to_first_namespace(NamespaceScope::All));
    // Text nodes resolve against their parent element.
    assert_eq!(cursor.get_namespace("x"), "urn:x");
    assert_eq!(cursor.get_namespace("xmlns"), NS_XMLNS_URI);
}

#[test]
fn builder_declarations() {
    let mut b = DocumentBuilder::new();
    b.start_element(QName::with_namespace("", "root", "urn:d")).unwrap()
        .namespace("", "urn:d").unwrap()
        .namespace("p", "urn:p").unwrap();
    b.start_element(QName::with_namespace("p", "child", "urn:p")).unwrap();
    b.end_element().unwrap();
    b.end_element().unwrap();
    let doc = b.finish().unwrap();

    let child = doc.root_element().first_child().unwrap();
    assert_eq!(child.namespace_uri(), "urn:p");
    assert_eq!(child.lookup_namespace_uri(""), Some("urn:d"));
    assert_eq!(child.namespaces_in_scope(NamespaceScope::ExcludeXml).len(), 2);
}

#[test]
fn duplicated_builder_declaration() {
    let mut b = DocumentBuilder::new();
    b.start_element("root").unwrap().namespace("p", "urn:1").unwrap();
    assert!(b.namespace("p", "urn:2").is_err());
}
