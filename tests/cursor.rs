use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

use xmlnav::*;

const ORDERS: &str = "\
<!DOCTYPE orders [
    <!ATTLIST order id ID #REQUIRED>
    <!ATTLIST item sku ID #IMPLIED>
]>
<orders xmlns:x='urn:x'>
    <!-- first -->
    <order id='o1' total='10'>
        <item sku='a'>Apple</item>
        <item sku='b'>Banana</item>
    </order>
    <?audit checked?>
    <order id='o2' total='2.5'>
        <x:item sku='c'>Cherry</x:item>
    </order>
</orders>
";

#[fixture]
fn orders() -> Document {
    Document::parse(ORDERS).unwrap()
}

fn element<'a>(doc: &'a Document, local: &str) -> Cursor<'a> {
    let mut cursor = doc.cursor();
    assert!(cursor.move_to_following_element(local, ""), "no '{}' element", local);
    cursor
}

#[rstest]
fn root_position(orders: Document) {
    let cursor = orders.cursor();

    assert_eq!(cursor.node_type(), NodeType::Root);
    assert_eq!(cursor.name(), "");
    assert!(cursor.has_children());
    assert!(!cursor.has_attributes());
    assert_eq!(cursor.value(), orders.root().value());
}

#[rstest]
fn tree_navigation(orders: Document) {
    let mut cursor = orders.cursor();

    assert!(!cursor.move_to_parent());
    assert!(!cursor.move_to_next());
    assert!(!cursor.move_to_first());

    assert!(cursor.move_to_first_child());
    assert_eq!(cursor.name(), "orders");

    assert!(cursor.move_to_first_child());
    assert_eq!(cursor.node_type(), NodeType::Comment);
    assert_eq!(cursor.value(), " first ");
    assert!(!cursor.move_to_previous());

    assert!(cursor.move_to_next());
    assert_eq!(cursor.get_attribute("id", ""), "o1");

    assert!(cursor.move_to_next());
    assert_eq!(cursor.node_type(), NodeType::ProcessingInstruction);
    assert_eq!(cursor.name(), "audit");

    assert!(cursor.move_to_next());
    assert!(!cursor.move_to_next());
    assert_eq!(cursor.get_attribute("id", ""), "o2");

    assert!(cursor.move_to_first());
    assert_eq!(cursor.node_type(), NodeType::Comment);
    assert!(cursor.move_to_first());

    assert!(cursor.move_to_parent());
    assert!(cursor.move_to_parent());
    assert_eq!(cursor.node_type(), NodeType::Root);
}

fn children_forward<'a>(parent: &Cursor<'a>) -> Vec<Cursor<'a>> {
    let mut list = Vec::new();
    let mut cursor = parent.clone();
    if cursor.move_to_first_child() {
        list.push(cursor.clone());
        while cursor.move_to_next() {
            list.push(cursor.clone());
        }
    }
    list
}

#[rstest]
fn backward_order_matches_forward(orders: Document) {
    let containers = orders.cursor().select_descendants(
        KindMask::of(NodeType::Root) | KindMask::of(NodeType::Element),
        true,
    );

    for parent in containers {
        let forward = children_forward(&parent);

        let mut backward = Vec::new();
        if let Some(last) = forward.last() {
            let mut cursor = last.clone();
            backward.push(cursor.clone());
            while cursor.move_to_previous() {
                backward.push(cursor.clone());
            }
        }
        backward.reverse();

        assert_eq!(backward.len(), forward.len());
        for (a, b) in forward.iter().zip(&backward) {
            assert!(a.is_same_position(b));
        }
    }
}

#[rstest]
fn failed_move_keeps_position(orders: Document) {
    let mut cursor = element(&orders, "item");
    let before = cursor.clone();

    assert!(!cursor.move_to_id("missing"));
    assert!(!cursor.move_to_next_attribute());
    assert!(!cursor.move_to_next_namespace(NamespaceScope::All));
    assert!(!cursor.move_to_first_namespace(NamespaceScope::Local));
    assert!(!cursor.move_to_child_element("nope", ""));
    assert!(!cursor.move_to_child(KindMask::of(NodeType::Comment)));
    assert!(!cursor.move_to_previous());
    assert!(cursor.is_same_position(&before));
}

#[rstest]
fn attributes(orders: Document) {
    let mut cursor = element(&orders, "order");
    assert!(cursor.has_attributes());

    assert!(cursor.move_to_first_attribute());
    assert_eq!(cursor.node_type(), NodeType::Attribute);
    assert_eq!(cursor.name(), "id");
    assert_eq!(cursor.value(), "o1");
    assert!(cursor.current_attribute().unwrap().is_id());

    // Already on an attribute.
    assert!(!cursor.move_to_first_attribute());
    assert!(!cursor.move_to_attribute("total", ""));
    assert!(!cursor.move_to_first_child());
    assert!(!cursor.move_to_next());

    assert!(cursor.move_to_next_attribute());
    assert_eq!(cursor.name(), "total");
    assert_eq!(cursor.value_as_int(), Ok(10));
    assert!(!cursor.move_to_next_attribute());

    assert!(cursor.move_to_parent());
    assert_eq!(cursor.name(), "order");

    assert!(cursor.move_to_attribute("total", ""));
    assert_eq!(cursor.value(), "10");
    assert!(cursor.move_to_parent());
    assert!(!cursor.move_to_attribute("total", "urn:x"));
}

#[rstest]
fn namespaces(orders: Document) {
    let mut cursor = orders.cursor();
    assert!(cursor.move_to_following_element("item", "urn:x"));

    assert_eq!(cursor.name(), "x:item");
    assert_eq!(cursor.prefix(), "x");
    assert_eq!(cursor.get_namespace("x"), "urn:x");
    assert_eq!(cursor.get_namespace(""), "");
    assert_eq!(cursor.get_namespace("y"), "");

    // Nothing is declared on the element itself.
    assert!(!cursor.move_to_first_namespace(NamespaceScope::Local));

    assert!(cursor.move_to_first_namespace(NamespaceScope::All));
    assert_eq!(cursor.node_type(), NodeType::Namespace);
    assert_eq!(cursor.name(), "x");
    assert_eq!(cursor.local_name(), "x");
    assert_eq!(cursor.prefix(), "");
    assert_eq!(cursor.namespace_uri(), "");
    assert_eq!(cursor.value(), "urn:x");

    assert!(!cursor.move_to_first_namespace(NamespaceScope::All));
    assert!(!cursor.move_to_next_namespace(NamespaceScope::ExcludeXml));
    assert!(cursor.move_to_next_namespace(NamespaceScope::All));
    assert_eq!(cursor.name(), "xml");
    assert_eq!(cursor.value(), NS_XML_URI);
    assert!(!cursor.move_to_next_namespace(NamespaceScope::All));

    assert!(cursor.move_to_parent());
    assert_eq!(cursor.name(), "x:item");

    assert!(cursor.move_to_namespace("xml"));
    assert_eq!(cursor.value(), NS_XML_URI);
}

#[rstest]
fn move_to_id(orders: Document) {
    let mut cursor = orders.cursor();

    assert!(cursor.move_to_id("o2"));
    assert_eq!(cursor.name(), "order");
    assert_eq!(cursor.value(), "Cherry");
    assert_eq!(cursor.value_as_double(), Err(FormatError {
        value: "Cherry".to_string(),
        target: "double",
    }));

    assert!(cursor.move_to_id("b"));
    assert_eq!(cursor.value(), "Banana");

    assert!(cursor.move_to_id("c"));
    assert_eq!(cursor.namespace_uri(), "urn:x");

    assert!(!cursor.move_to_id("o3"));
    assert_eq!(cursor.namespace_uri(), "urn:x");
}

#[rstest]
fn move_to_following(orders: Document) {
    let mut cursor = orders.cursor();
    let mut names = Vec::new();
    while cursor.move_to_following(KindMask::of(NodeType::Element)) {
        names.push(cursor.name());
    }
    assert_eq!(names, ["orders", "order", "item", "item", "order", "x:item"]);

    let mut cursor = orders.cursor();
    let mut values = Vec::new();
    while cursor.move_to_following(KindMask::of(NodeType::Text)) {
        values.push(cursor.value().into_owned());
    }
    assert_eq!(values, ["Apple", "Banana", "Cherry"]);

    let mask = KindMask::of(NodeType::Comment) | KindMask::of(NodeType::ProcessingInstruction);
    let mut cursor = orders.cursor();
    assert!(cursor.move_to_following(mask));
    assert_eq!(cursor.node_type(), NodeType::Comment);
    assert!(cursor.move_to_following(mask));
    assert_eq!(cursor.node_type(), NodeType::ProcessingInstruction);
    assert!(!cursor.move_to_following(mask));
}

#[rstest]
fn move_to_following_from_attribute(orders: Document) {
    let mut cursor = element(&orders, "order");
    assert!(cursor.move_to_first_attribute());

    // The element's children follow its attributes.
    assert!(cursor.move_to_following(KindMask::ALL));
    assert_eq!(cursor.name(), "item");
    assert_eq!(cursor.value(), "Apple");
}

#[test]
fn move_to_following_all() {
    let doc = Document::parse("<root><child/><child2/></root>").unwrap();
    let mut cursor = doc.cursor();

    assert!(cursor.move_to_following(KindMask::ALL));
    assert_eq!(cursor.name(), "root");
    assert!(cursor.move_to_following(KindMask::ALL));
    assert_eq!(cursor.name(), "child");
    assert!(cursor.move_to_next_of_kind(KindMask::ALL));
    assert_eq!(cursor.name(), "child2");
}

#[rstest]
fn kind_filtered_children(orders: Document) {
    let mut cursor = orders.cursor();
    assert!(cursor.move_to_child(KindMask::of(NodeType::Element)));

    assert!(cursor.move_to_child(KindMask::of(NodeType::ProcessingInstruction)));
    assert_eq!(cursor.name(), "audit");
    assert!(cursor.move_to_next_of_kind(KindMask::of(NodeType::Element)));
    assert_eq!(cursor.get_attribute("id", ""), "o2");
    assert!(!cursor.move_to_next_of_kind(KindMask::ALL));

    assert!(cursor.move_to_child_element("item", "urn:x"));
    assert!(cursor.move_to_parent());
    assert!(cursor.move_to_previous());
    assert!(cursor.move_to_previous());
    assert!(cursor.move_to_child_element("item", ""));
    assert!(cursor.move_to_next_element("item", ""));
    assert_eq!(cursor.value(), "Banana");
    assert!(!cursor.move_to_next_element("item", ""));
}

#[rstest]
fn select_children(orders: Document) {
    let cursor = element(&orders, "orders");

    let kinds: Vec<_> = cursor.select_children(KindMask::ALL).map(|c| c.node_type()).collect();
    assert_eq!(kinds, [
        NodeType::Comment,
        NodeType::Element,
        NodeType::ProcessingInstruction,
        NodeType::Element,
    ]);

    let ids: Vec<_> = cursor.select_children(KindMask::of(NodeType::Element))
        .map(|c| c.get_attribute("id", ""))
        .collect();
    assert_eq!(ids, ["o1", "o2"]);
}

#[rstest]
#[case(false, 5)]
#[case(true, 6)]
fn select_descendants(orders: Document, #[case] match_self: bool, #[case] count: usize) {
    let cursor = element(&orders, "orders");
    let elements = cursor.select_descendants(KindMask::of(NodeType::Element), match_self);
    assert_eq!(elements.count(), count);

    let texts: Vec<_> = cursor.select_descendants(KindMask::of(NodeType::Text), match_self)
        .map(|c| c.value().into_owned())
        .collect();
    assert_eq!(texts, ["Apple", "Banana", "Cherry"]);
}

#[test]
fn select_descendants_stays_exhausted() {
    let doc = Document::parse("<a><b/></a>").unwrap();
    let mut cursor = doc.cursor();
    assert!(cursor.move_to_first_child());

    let mut iter = cursor.select_descendants(KindMask::ALL, false);
    let names: Vec<_> = (0..5).map(|_| iter.next().map(|c| c.name())).collect();
    assert_eq!(names, [Some("b"), None, None, None, None]);

    let mut nodes = doc.root_element().descendants();
    assert_eq!(nodes.by_ref().count(), 2);
    assert_eq!(nodes.next(), None);
}

#[rstest]
fn is_descendant(orders: Document) {
    let root = orders.cursor();
    let order = element(&orders, "order");
    let item = element(&orders, "item");

    let mut attr = item.clone();
    assert!(attr.move_to_first_attribute());

    let mut ns = item.clone();
    assert!(ns.move_to_first_namespace(NamespaceScope::All));

    assert!(root.is_descendant(&attr));
    assert!(order.is_descendant(&attr));
    assert!(item.is_descendant(&attr));
    assert!(item.is_descendant(&ns));
    assert!(!attr.is_descendant(&item));
    assert!(!item.is_descendant(&order));
    assert!(!item.is_descendant(&item));

    let other = Document::parse(ORDERS).unwrap();
    assert!(!other.cursor().is_descendant(&attr));
}

#[rstest]
fn compare_position(orders: Document) {
    let order = element(&orders, "order");
    let item = element(&orders, "item");

    let mut ns = order.clone();
    assert!(ns.move_to_first_namespace(NamespaceScope::All));
    let mut attr = order.clone();
    assert!(attr.move_to_first_attribute());

    assert_eq!(order.compare_position(&item), NodeOrder::Before);
    assert_eq!(item.compare_position(&order), NodeOrder::After);
    assert_eq!(order.compare_position(&order.clone()), NodeOrder::Same);
    assert_eq!(order.compare_position(&ns), NodeOrder::Before);
    assert_eq!(ns.compare_position(&attr), NodeOrder::Before);
    assert_eq!(attr.compare_position(&item), NodeOrder::Before);

    let other = Document::parse(ORDERS).unwrap();
    assert_eq!(order.compare_position(&other.cursor()), NodeOrder::Unknown);
}

#[rstest]
fn move_to_other(orders: Document) {
    let mut cursor = orders.cursor();
    let item = element(&orders, "item");

    assert!(cursor.move_to(&item));
    assert!(cursor.is_same_position(&item));

    let other = Document::parse(ORDERS).unwrap();
    let mut foreign = other.cursor();
    assert!(!foreign.move_to(&item));
    assert!(!foreign.is_same_position(&orders.cursor()));

    cursor.move_to_root();
    assert!(cursor.is_same_position(&orders.cursor()));
}

#[test]
fn clones_are_independent() {
    let doc = Document::parse("<a><b/></a>").unwrap();
    let mut cursor = doc.cursor();
    let clone = cursor.clone();

    assert!(cursor.move_to_first_child());
    assert_eq!(clone.node_type(), NodeType::Root);
    assert!(!clone.is_same_position(&cursor));
}

#[test]
fn whitespace_kinds() {
    let opt = ParsingOptions { preserve_whitespace: true, ..ParsingOptions::default() };
    let doc = Document::parse_with_options("<r> <p xml:space='preserve'> </p></r>", opt).unwrap();
    let mut cursor = doc.cursor();

    assert!(cursor.move_to_following(KindMask::of(NodeType::Whitespace)));
    assert_eq!(cursor.node_type(), NodeType::Whitespace);
    assert!(cursor.move_to_following(KindMask::of(NodeType::Text)));
    assert_eq!(cursor.node_type(), NodeType::SignificantWhitespace);
}

#[rstest]
#[case("1", Some(true))]
#[case("false", Some(false))]
#[case("1.0", None)]
fn value_as_bool(#[case] text: &str, #[case] expected: Option<bool>) {
    let doc = Document::parse(&format!("<v>{}</v>", text)).unwrap();
    let mut cursor = doc.cursor();
    cursor.move_to_first_child();

    assert_eq!(cursor.value_as_bool().ok(), expected);
}

#[test]
fn typed_values() {
    let doc = Document::parse("\
<v d='2005-12-13' f='3.14159265359' i='1' l='10000000000000000' h='0x10000000000000000'/>
").unwrap();

    let mut cursor = doc.cursor();
    cursor.move_to_first_child();

    cursor.move_to_attribute("d", "");
    let date = cursor.value_as_date_time().unwrap();
    assert_eq!(date.to_string(), "2005-12-13 00:00:00");
    cursor.move_to_parent();

    cursor.move_to_attribute("f", "");
    assert_eq!(cursor.value_as_double(), Ok(3.14159265359));
    cursor.move_to_parent();

    cursor.move_to_attribute("i", "");
    assert_eq!(cursor.value_as_int(), Ok(1));
    assert_eq!(cursor.value_as::<String>(), Ok("1".to_string()));
    cursor.move_to_parent();

    cursor.move_to_attribute("l", "");
    assert_eq!(cursor.value_as_long(), Ok(10000000000000000));
    assert!(cursor.value_as_int().is_err());
    cursor.move_to_parent();

    cursor.move_to_attribute("h", "");
    assert!(cursor.value_as_long().is_err());
}
