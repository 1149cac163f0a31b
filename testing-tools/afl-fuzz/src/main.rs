extern crate afl;
extern crate xmlnav;

use std::str;

use afl::fuzz;
use xmlnav::{KindMask, NamespaceScope, ParsingOptions};

fn main() {
    fuzz!(|data: &[u8]| {
        let text = match str::from_utf8(data) {
            Ok(text) => text,
            Err(_) => return,
        };

        let opt = ParsingOptions { nodes_limit: 10_000, ..ParsingOptions::default() };
        let doc = match xmlnav::Document::parse_with_options(text, opt) {
            Ok(doc) => doc,
            Err(_) => return,
        };

        let mut cursor = doc.cursor();
        while cursor.move_to_following(KindMask::ALL) {
            let _ = cursor.value();

            let mut ns = cursor.clone();
            if ns.move_to_first_namespace(NamespaceScope::All) {
                while ns.move_to_next_namespace(NamespaceScope::All) {}
            }

            let mut attr = cursor.clone();
            if attr.move_to_first_attribute() {
                while attr.move_to_next_attribute() {}
            }
        }

        cursor.move_to_root();
        if let Ok(mut reader) = cursor.read_subtree() {
            while reader.read() {
                while reader.move_to_next_attribute() {
                    reader.read_attribute_value();
                }
            }
        }
    });
}
