//! A minimal scanner of the internal DTD subset.
//!
//! Only `<!ATTLIST>` declarations are interpreted, and only to find out
//! which attributes have the `ID` type. Everything else is skipped.

/// An attribute declared with the `ID` type.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct IdAttribute<'input> {
    /// Qualified element name, as written.
    pub element: &'input str,
    /// Qualified attribute name, as written.
    pub attribute: &'input str,
}


#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum DeclToken<'input> {
    Word(&'input str),
    Group(&'input str),
    Quoted(&'input str),
    End,
}

struct Scanner<'input> {
    text: &'input str,
    pos: usize,
}

impl<'input> Scanner<'input> {
    fn new(text: &'input str) -> Self {
        Scanner { text, pos: 0 }
    }

    fn rest(&self) -> &'input str {
        &self.text[self.pos..]
    }

    fn skip_spaces(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Moves right after `pattern` or to the end.
    fn skip_past(&mut self, pattern: &str) {
        match self.rest().find(pattern) {
            Some(idx) => self.pos += idx + pattern.len(),
            None => self.pos = self.text.len(),
        }
    }

    /// Returns the text up to the `end` char and moves past it.
    fn consume_until(&mut self, end: char) -> &'input str {
        let rest = self.rest();
        match rest.find(end) {
            Some(idx) => {
                self.pos += idx + end.len_utf8();
                &rest[..idx]
            }
            None => {
                self.pos = self.text.len();
                rest
            }
        }
    }

    fn next_token(&mut self) -> Option<DeclToken<'input>> {
        self.skip_spaces();

        let c = self.rest().chars().next()?;
        match c {
            '>' => {
                self.pos += 1;
                Some(DeclToken::End)
            }
            '(' => {
                self.pos += 1;
                Some(DeclToken::Group(self.consume_until(')')))
            }
            '"' | '\'' => {
                self.pos += 1;
                Some(DeclToken::Quoted(self.consume_until(c)))
            }
            _ => {
                let rest = self.rest();
                let len = rest
                    .find(|c: char| c.is_whitespace() || matches!(c, '>' | '(' | '"' | '\''))
                    .unwrap_or(rest.len());
                self.pos += len;
                Some(DeclToken::Word(&rest[..len]))
            }
        }
    }

    /// Skips the rest of a markup declaration, honoring quoted strings.
    fn skip_declaration(&mut self) {
        while let Some(token) = self.next_token() {
            if token == DeclToken::End {
                break;
            }
        }
    }
}


/// Collects `ID`-typed attribute declarations from an internal DTD subset.
pub(crate) fn parse_id_attributes(subset: &str) -> Vec<IdAttribute> {
    let mut list = Vec::new();
    let mut s = Scanner::new(subset);

    loop {
        match s.rest().find('<') {
            Some(idx) => s.pos += idx,
            None => break,
        }

        let rest = s.rest();
        if rest.starts_with("<!--") {
            s.skip_past("-->");
        } else if rest.starts_with("<?") {
            s.skip_past("?>");
        } else if rest.starts_with("<!ATTLIST") {
            s.pos += "<!ATTLIST".len();
            parse_attlist(&mut s, &mut list);
        } else {
            s.pos += 1;
            s.skip_declaration();
        }
    }

    list
}

fn parse_attlist<'input>(s: &mut Scanner<'input>, list: &mut Vec<IdAttribute<'input>>) {
    let element = match s.next_token() {
        Some(DeclToken::Word(name)) => name,
        Some(DeclToken::End) | None => return,
        Some(_) => {
            s.skip_declaration();
            return;
        }
    };

    loop {
        let attribute = match s.next_token() {
            Some(DeclToken::Word(name)) => name,
            Some(DeclToken::End) | None => return,
            Some(_) => {
                s.skip_declaration();
                return;
            }
        };

        let is_id = match s.next_token() {
            Some(DeclToken::Word("NOTATION")) => {
                s.next_token();
                false
            }
            Some(DeclToken::Word(kind)) => kind == "ID",
            Some(DeclToken::Group(_)) => false,
            Some(DeclToken::End) | None => return,
            Some(DeclToken::Quoted(_)) => {
                s.skip_declaration();
                return;
            }
        };

        match s.next_token() {
            Some(DeclToken::Word("#FIXED")) => {
                s.next_token();
            }
            Some(DeclToken::Word(_)) | Some(DeclToken::Quoted(_)) => {}
            Some(DeclToken::End) | None => return,
            Some(DeclToken::Group(_)) => {
                s.skip_declaration();
                return;
            }
        }

        if is_id {
            tracing::trace!(element, attribute, "ID attribute declared");
            list.push(IdAttribute { element, attribute });
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single() {
        let list = parse_id_attributes("<!ATTLIST item key ID #IMPLIED>");
        assert_eq!(list, [IdAttribute { element: "item", attribute: "key" }]);
    }

    #[test]
    fn multiple_definitions() {
        let list = parse_id_attributes("
            <!ELEMENT a (b)*>
            <!ATTLIST a
                name CDATA #REQUIRED
                kind (x|y) 'x'
                n:id ID #REQUIRED
                fixed CDATA #FIXED '>'>
            <!ATTLIST b id ID #IMPLIED>
        ");

        assert_eq!(list, [
            IdAttribute { element: "a", attribute: "n:id" },
            IdAttribute { element: "b", attribute: "id" },
        ]);
    }

    #[test]
    fn skips_comments_and_entities() {
        let list = parse_id_attributes("
            <!-- <!ATTLIST a id ID #IMPLIED> -->
            <!ENTITY e '<!ATTLIST a id ID #IMPLIED>'>
            <?pi <!ATTLIST a id ID #IMPLIED>?>
            <!ATTLIST c ref IDREF #IMPLIED>
        ");

        assert!(list.is_empty());
    }

    #[test]
    fn notation() {
        let list = parse_id_attributes("<!ATTLIST a n NOTATION (x|y) #IMPLIED i ID #IMPLIED>");
        assert_eq!(list, [IdAttribute { element: "a", attribute: "i" }]);
    }
}
