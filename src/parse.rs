use xmlparser::{self, ElementEnd, EntityDefinition, Stream, StrSpan, TextPos, Token};

use crate::{
    builder::DocumentBuilder,
    dtd::{self, IdAttribute},
    Document,
    InvalidOperation,
    QName,
    Uri,
    NS_XML_PREFIX,
    NS_XML_URI,
    NS_XMLNS_PREFIX,
    NS_XMLNS_URI,
};

const ENTITY_DEPTH: u8 = 10;

// Entity references expanded per document, nested ones included.
const ENTITY_EXPANSIONS_LIMIT: usize = 10_000;


/// A list of all possible errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The `xmlns:xml` attribute must have an <http://www.w3.org/XML/1998/namespace> URI.
    #[error("'xml' namespace prefix mapped to wrong URI at {0}")]
    InvalidXmlPrefixUri(TextPos),

    /// Only the `xmlns:xml` attribute can have the <http://www.w3.org/XML/1998/namespace> URI.
    #[error("the 'xml' namespace URI is used for not 'xml' prefix at {0}")]
    UnexpectedXmlUri(TextPos),

    /// The <http://www.w3.org/2000/xmlns/> URI must not be declared.
    #[error("the 'xmlns' URI is used at {0}, but it must not be declared")]
    UnexpectedXmlnsUri(TextPos),

    /// `xmlns` can't be used as an element prefix.
    #[error("the 'xmlns' prefix is used at {0}, but it must not be")]
    InvalidElementNamePrefix(TextPos),

    /// A namespace was already defined on this element.
    #[error("namespace '{0}' at {1} is already defined")]
    DuplicatedNamespace(String, TextPos),

    /// A prefix is used without a declaration.
    #[error("an unknown namespace prefix '{0}' at {1}")]
    UnknownNamespace(String, TextPos),

    /// Incorrect tree structure.
    #[allow(missing_docs)]
    #[error("expected '{expected}' tag, not '{actual}' at {pos}")]
    UnexpectedCloseTag { expected: String, actual: String, pos: TextPos },

    /// Entity value starts with a close tag.
    ///
    /// Example:
    /// ```xml
    /// <!DOCTYPE test [ <!ENTITY p '</p>'> ]>
    /// <root>&p;</root>
    /// ```
    #[error("unexpected close tag at {0}")]
    UnexpectedEntityCloseTag(TextPos),

    /// A reference to an entity that was not defined in the DTD.
    #[error("unknown entity reference '{0}' at {1}")]
    UnknownEntityReference(String, TextPos),

    /// A `&` that does not start a valid character or entity reference.
    #[error("malformed entity reference at {0}")]
    MalformedEntityReference(TextPos),

    /// A possible entity reference loop or too many entity expansions.
    #[error("a possible entity reference loop is detected at {0}")]
    EntityReferenceLoop(TextPos),

    /// An element has a duplicated attributes.
    ///
    /// This also includes namespaces resolving.
    /// So an element like this will lead to an error.
    /// ```xml
    /// <e xmlns:n1='http://www.w3.org' xmlns:n2='http://www.w3.org' n1:a='b1' n2:a='b2'/>
    /// ```
    #[error("attribute '{0}' at {1} is already defined")]
    DuplicatedAttribute(String, TextPos),

    /// The XML document must have at least one element.
    #[error("the document does not have a root node")]
    NoRootNode,

    /// A DTD was found while `ParsingOptions::allow_dtd` is not set.
    #[error("XML with DTD detected")]
    DtdDetected,

    /// The document has more nodes than `ParsingOptions::nodes_limit` allows.
    #[error("nodes limit reached")]
    NodesLimitReached,

    /// The tree builder rejected the document structure.
    #[error("invalid document structure: {0}")]
    InvalidStructure(#[from] InvalidOperation),

    /// Errors detected by the `xmlparser` crate.
    #[error(transparent)]
    ParserError(#[from] xmlparser::Error),
}


/// Parsing options.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ParsingOptions {
    /// Keep whitespace-only text nodes outside of `xml:space="preserve"` scopes.
    ///
    /// Default: false
    pub preserve_whitespace: bool,

    /// Allow DTD parsing.
    ///
    /// When set to `false`, XML with DTD will cause an error.
    ///
    /// Default: true
    pub allow_dtd: bool,

    /// Sets the maximum number of nodes to parse.
    ///
    /// Useful when dealing with random input to limit memory usage.
    ///
    /// Default: u32::MAX (no limit)
    pub nodes_limit: u32,
}

impl Default for ParsingOptions {
    fn default() -> Self {
        ParsingOptions {
            preserve_whitespace: false,
            allow_dtd: true,
            nodes_limit: u32::MAX,
        }
    }
}


impl Document {
    /// Parses the input XML string.
    ///
    /// We do not support `&[u8]` or `Reader` because the input must be an already allocated
    /// UTF-8 string.
    ///
    /// # Examples
    ///
    /// ```
    /// let doc = xmlnav::Document::parse("<e/>").unwrap();
    /// assert_eq!(doc.descendants().count(), 2); // root node + `e` element node
    /// ```
    pub fn parse(text: &str) -> Result<Document, Error> {
        Self::parse_with_options(text, ParsingOptions::default())
    }

    /// Parses the input XML string using the specified parsing options.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlnav::{Document, ParsingOptions};
    ///
    /// let opt = ParsingOptions { preserve_whitespace: true, ..ParsingOptions::default() };
    /// let doc = Document::parse_with_options("<e> <a/> </e>", opt).unwrap();
    /// assert_eq!(doc.root_element().children().count(), 3);
    /// ```
    pub fn parse_with_options(text: &str, opt: ParsingOptions) -> Result<Document, Error> {
        parse(text, opt)
    }
}


#[derive(Clone, Copy)]
struct Entity<'input> {
    name: &'input str,
    value: StrSpan<'input>,
}

struct RawAttribute<'input> {
    prefix: &'input str,
    local: &'input str,
    value: String,
    pos: usize,
}

struct StartTag<'input> {
    prefix: &'input str,
    local: &'input str,
    pos: usize,
    attributes: Vec<RawAttribute<'input>>,
}

struct OpenTag<'input> {
    prefix: &'input str,
    local: &'input str,
    ns_mark: usize,
}

struct Context<'input> {
    text: &'input str,
    opt: ParsingOptions,
    builder: DocumentBuilder,
    entities: Vec<Entity<'input>>,
    id_attributes: Vec<IdAttribute<'input>>,
    /// Namespaces in scope, nearest last.
    namespaces: Vec<(&'input str, Uri)>,
    tags: Vec<OpenTag<'input>>,
    start_tag: Option<StartTag<'input>>,
    dtd_start: usize,
    /// Text collected since the last markup.
    buffer: String,
    has_root: bool,
    entity_expansions: usize,
}

impl<'input> Context<'input> {
    fn pos_at(&self, pos: usize) -> TextPos {
        Stream::from(self.text).gen_text_pos_from(pos)
    }

    fn check_limit(&self) -> Result<(), Error> {
        if self.builder.nodes_count() >= self.opt.nodes_limit as usize {
            return Err(Error::NodesLimitReached);
        }

        Ok(())
    }

    fn flush_text(&mut self) -> Result<(), Error> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.check_limit()?;
        self.builder.text(&self.buffer)?;
        self.buffer.clear();
        Ok(())
    }

    fn resolve(&self, prefix: &str) -> Option<&Uri> {
        self.namespaces.iter().rev().find(|(p, _)| *p == prefix).map(|(_, uri)| uri)
    }
}

fn parse(text: &str, opt: ParsingOptions) -> Result<Document, Error> {
    tracing::debug!(len = text.len(), ?opt, "parsing document");

    let mut ctx = Context {
        text,
        opt,
        builder: DocumentBuilder::new().preserve_whitespace(opt.preserve_whitespace),
        entities: Vec::new(),
        id_attributes: Vec::new(),
        namespaces: vec![(NS_XML_PREFIX, Uri::new(NS_XML_URI))],
        tags: Vec::new(),
        start_tag: None,
        dtd_start: 0,
        buffer: String::new(),
        has_root: false,
        entity_expansions: 0,
    };

    process_tokens(xmlparser::Tokenizer::from(text), 0, &mut ctx)?;
    ctx.flush_text()?;

    if !ctx.has_root {
        return Err(Error::NoRootNode);
    }

    Ok(ctx.builder.finish()?)
}

fn process_tokens<'input>(
    tokenizer: xmlparser::Tokenizer<'input>,
    entity_depth: u8,
    ctx: &mut Context<'input>,
) -> Result<(), Error> {
    // An entity can close only the elements it has opened.
    let tags_base = if entity_depth == 0 { 0 } else { ctx.tags.len() };

    for token in tokenizer {
        match token? {
            Token::ProcessingInstruction { target, content, .. } => {
                ctx.flush_text()?;
                ctx.check_limit()?;
                let value = content.map(|v| v.as_str()).unwrap_or("");
                ctx.builder.processing_instruction(target.as_str(), value)?;
            }
            Token::Comment { text, .. } => {
                ctx.flush_text()?;
                ctx.check_limit()?;
                ctx.builder.comment(text.as_str())?;
            }
            Token::DtdStart { span, .. } => {
                if !ctx.opt.allow_dtd {
                    return Err(Error::DtdDetected);
                }

                ctx.dtd_start = span.end();
            }
            Token::EmptyDtd { .. } => {
                if !ctx.opt.allow_dtd {
                    return Err(Error::DtdDetected);
                }
            }
            Token::DtdEnd { span } => {
                let subset = &ctx.text[ctx.dtd_start..span.start()];
                ctx.id_attributes = dtd::parse_id_attributes(subset);
                tracing::debug!(
                    ids = ctx.id_attributes.len(),
                    entities = ctx.entities.len(),
                    "internal DTD subset processed"
                );
            }
            Token::EntityDeclaration { name, definition, .. } => {
                if let EntityDefinition::EntityValue(value) = definition {
                    ctx.entities.push(Entity { name: name.as_str(), value });
                }
            }
            Token::Text { text } => {
                process_text(text, entity_depth, ctx)?;
            }
            Token::Cdata { text, .. } => {
                push_text_chunk(text.as_str(), &mut ctx.buffer);
            }
            Token::ElementStart { prefix, local, span } => {
                ctx.flush_text()?;

                if prefix.as_str() == NS_XMLNS_PREFIX {
                    return Err(Error::InvalidElementNamePrefix(ctx.pos_at(span.start())));
                }

                ctx.start_tag = Some(StartTag {
                    prefix: prefix.as_str(),
                    local: local.as_str(),
                    pos: span.start(),
                    attributes: Vec::new(),
                });
            }
            Token::Attribute { prefix, local, value, span } => {
                let mut normalized = String::with_capacity(value.as_str().len());
                normalize_attribute(value, entity_depth, ctx, &mut normalized)?;

                if let Some(ref mut tag) = ctx.start_tag {
                    tag.attributes.push(RawAttribute {
                        prefix: prefix.as_str(),
                        local: local.as_str(),
                        value: normalized,
                        pos: span.start(),
                    });
                }
            }
            Token::ElementEnd { end, span } => {
                process_element_end(end, span, tags_base, ctx)?;
            }
            Token::Declaration { .. } => {}
        }
    }

    Ok(())
}

fn process_element_end<'input>(
    end: ElementEnd<'input>,
    span: StrSpan<'input>,
    tags_base: usize,
    ctx: &mut Context<'input>,
) -> Result<(), Error> {
    match end {
        ElementEnd::Open | ElementEnd::Empty => {
            let tag = match ctx.start_tag.take() {
                Some(tag) => tag,
                None => return Err(Error::UnexpectedEntityCloseTag(ctx.pos_at(span.start()))),
            };

            process_start_tag(tag, matches!(end, ElementEnd::Empty), ctx)
        }
        ElementEnd::Close(prefix, local) => {
            ctx.flush_text()?;

            if ctx.tags.len() <= tags_base {
                return Err(Error::UnexpectedEntityCloseTag(ctx.pos_at(span.start())));
            }

            let open = match ctx.tags.pop() {
                Some(open) => open,
                None => return Err(Error::UnexpectedEntityCloseTag(ctx.pos_at(span.start()))),
            };

            if prefix.as_str() != open.prefix || local.as_str() != open.local {
                return Err(Error::UnexpectedCloseTag {
                    expected: gen_qname_string(open.prefix, open.local),
                    actual: gen_qname_string(prefix.as_str(), local.as_str()),
                    pos: ctx.pos_at(span.start()),
                });
            }

            ctx.builder.end_element()?;
            ctx.namespaces.truncate(open.ns_mark);
            Ok(())
        }
    }
}

fn process_start_tag<'input>(
    tag: StartTag<'input>,
    is_empty: bool,
    ctx: &mut Context<'input>,
) -> Result<(), Error> {
    let ns_mark = ctx.namespaces.len();

    // Namespace declarations must be known before any name is resolved.
    for attr in &tag.attributes {
        let prefix = match namespace_declaration(attr) {
            Some(prefix) => prefix,
            None => continue,
        };

        let value = attr.value.as_str();
        let pos = attr.pos;

        // The xmlns namespace MUST NOT be declared.
        if value == NS_XMLNS_URI {
            return Err(Error::UnexpectedXmlnsUri(ctx.pos_at(pos)));
        }

        let is_xml_ns_uri = value == NS_XML_URI;

        // The prefix 'xml' is by definition bound to the namespace name
        // http://www.w3.org/XML/1998/namespace.
        // It MUST NOT be bound to any other namespace name.
        if prefix == NS_XML_PREFIX {
            if !is_xml_ns_uri {
                return Err(Error::InvalidXmlPrefixUri(ctx.pos_at(pos)));
            }
        } else if is_xml_ns_uri {
            // The xml namespace MUST NOT be bound to a non-xml prefix.
            return Err(Error::UnexpectedXmlUri(ctx.pos_at(pos)));
        }

        if ctx.namespaces[ns_mark..].iter().any(|(p, _)| *p == prefix) {
            return Err(Error::DuplicatedNamespace(prefix.to_string(), ctx.pos_at(pos)));
        }

        // The xml namespace is always in scope.
        if !is_xml_ns_uri {
            ctx.namespaces.push((prefix, Uri::new(value)));
        }
    }

    let tag_ns = match ctx.resolve(tag.prefix) {
        Some(uri) => uri.clone(),
        None if tag.prefix.is_empty() => Uri::new(""),
        None => {
            return Err(Error::UnknownNamespace(tag.prefix.to_string(), ctx.pos_at(tag.pos)));
        }
    };

    if ctx.tags.is_empty() {
        ctx.has_root = true;
    }

    ctx.check_limit()?;
    ctx.builder.start_element(QName::with_uri(tag.prefix, tag.local, tag_ns))?;

    let element_name = gen_qname_string(tag.prefix, tag.local);
    let mut names: Vec<(&str, Uri)> = Vec::new();

    for attr in &tag.attributes {
        if let Some(prefix) = namespace_declaration(attr) {
            if prefix != NS_XML_PREFIX {
                ctx.builder.namespace(prefix, &attr.value)?;
            }

            continue;
        }

        // 'The namespace name for an unprefixed attribute name
        // always has no value.'
        let ns = if attr.prefix.is_empty() {
            Uri::new("")
        } else {
            match ctx.resolve(attr.prefix) {
                Some(uri) => uri.clone(),
                None => {
                    return Err(Error::UnknownNamespace(attr.prefix.to_string(), ctx.pos_at(attr.pos)));
                }
            }
        };

        if names.iter().any(|(local, uri)| *local == attr.local && *uri == ns) {
            return Err(Error::DuplicatedAttribute(attr.local.to_string(), ctx.pos_at(attr.pos)));
        }

        let raw_name = gen_qname_string(attr.prefix, attr.local);
        let is_id = ctx.id_attributes.iter()
            .any(|d| d.element == element_name && d.attribute == raw_name);

        let name = QName::with_uri(attr.prefix, attr.local, ns.clone());
        if is_id {
            ctx.builder.id_attribute(name, &attr.value)?;
        } else {
            ctx.builder.attribute(name, &attr.value)?;
        }

        names.push((attr.local, ns));
    }

    if is_empty {
        ctx.builder.end_empty_element()?;
        ctx.namespaces.truncate(ns_mark);
    } else {
        ctx.tags.push(OpenTag { prefix: tag.prefix, local: tag.local, ns_mark });
    }

    Ok(())
}

/// Returns the declared prefix when the attribute is a namespace declaration.
fn namespace_declaration<'input>(attr: &RawAttribute<'input>) -> Option<&'input str> {
    if attr.prefix == NS_XMLNS_PREFIX {
        Some(attr.local)
    } else if attr.prefix.is_empty() && attr.local == NS_XMLNS_PREFIX {
        Some("")
    } else {
        None
    }
}


enum Reference<'input> {
    Char(char),
    Entity(&'input str),
}

/// Splits text at the next reference.
///
/// Returns the text before the reference, the reference itself and its length in bytes.
fn next_reference<'input>(text: &'input str)
    -> Option<(&'input str, Option<Reference<'input>>, usize)>
{
    let start = text.find('&')?;
    let tail = &text[start..];
    let end = match tail.find(';') {
        Some(end) => end,
        None => return Some((&text[..start], None, 1)),
    };

    Some((&text[..start], parse_reference(&tail[1..end]), end + 1))
}

fn parse_reference(name: &str) -> Option<Reference> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };

        return std::char::from_u32(code).map(Reference::Char);
    }

    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '&') {
        return None;
    }

    let c = match name {
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        "apos" => '\'',
        "quot" => '"',
        _ => return Some(Reference::Entity(name)),
    };

    Some(Reference::Char(c))
}

fn process_text<'input>(
    text: StrSpan<'input>,
    entity_depth: u8,
    ctx: &mut Context<'input>,
) -> Result<(), Error> {
    let mut rest = text.as_str();
    let mut pos = text.start();

    while let Some((before, reference, len)) = next_reference(rest) {
        push_text_chunk(before, &mut ctx.buffer);
        pos += before.len();

        match reference {
            Some(Reference::Char(c)) => ctx.buffer.push(c),
            Some(Reference::Entity(name)) => {
                let entity = find_entity(name, pos, entity_depth, ctx)?;
                if entity.value.as_str().contains('<') {
                    let tokenizer = xmlparser::Tokenizer::from_fragment(ctx.text, entity.value.start()..entity.value.end());
                    process_tokens(tokenizer, entity_depth + 1, ctx)?;
                } else {
                    process_text(entity.value, entity_depth + 1, ctx)?;
                }
            }
            None => return Err(Error::MalformedEntityReference(ctx.pos_at(pos))),
        }

        pos += len;
        rest = &rest[before.len() + len..];
    }

    push_text_chunk(rest, &mut ctx.buffer);
    Ok(())
}

// https://www.w3.org/TR/REC-xml/#AVNormalize
fn normalize_attribute<'input>(
    value: StrSpan<'input>,
    entity_depth: u8,
    ctx: &mut Context<'input>,
    out: &mut String,
) -> Result<(), Error> {
    let mut rest = value.as_str();
    let mut pos = value.start();

    while let Some((before, reference, len)) = next_reference(rest) {
        push_attribute_chunk(before, out);
        pos += before.len();

        match reference {
            // Characters from references are added as is.
            Some(Reference::Char(c)) => out.push(c),
            Some(Reference::Entity(name)) => {
                let entity = find_entity(name, pos, entity_depth, ctx)?;
                normalize_attribute(entity.value, entity_depth + 1, ctx, out)?;
            }
            None => return Err(Error::MalformedEntityReference(ctx.pos_at(pos))),
        }

        pos += len;
        rest = &rest[before.len() + len..];
    }

    push_attribute_chunk(rest, out);
    Ok(())
}

fn find_entity<'input>(
    name: &str,
    pos: usize,
    entity_depth: u8,
    ctx: &mut Context<'input>,
) -> Result<Entity<'input>, Error> {
    // Depth catches recursion and the running count catches fan-out.
    ctx.entity_expansions += 1;
    if entity_depth >= ENTITY_DEPTH || ctx.entity_expansions > ENTITY_EXPANSIONS_LIMIT {
        tracing::warn!(name, expansions = ctx.entity_expansions, "entity expansion limit reached");
        return Err(Error::EntityReferenceLoop(ctx.pos_at(pos)));
    }

    match ctx.entities.iter().find(|e| e.name == name) {
        Some(entity) => Ok(*entity),
        None => Err(Error::UnknownEntityReference(name.to_string(), ctx.pos_at(pos))),
    }
}

// Translate \r\n and any \r that is not followed by \n into a single \n character.
//
// https://www.w3.org/TR/xml/#sec-line-ends
fn push_text_chunk(text: &str, buf: &mut String) {
    if !text.contains('\r') {
        buf.push_str(text);
        return;
    }

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }

            buf.push('\n');
        } else {
            buf.push(c);
        }
    }
}

fn push_attribute_chunk(text: &str, buf: &mut String) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            // \r in \r\n should be ignored.
            '\r' if chars.peek() == Some(&'\n') => {}
            // \n, \r and \t should be converted into spaces.
            '\n' | '\r' | '\t' => buf.push(' '),
            _ => buf.push(c),
        }
    }
}

fn gen_qname_string(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(s: &str) -> String {
        let mut buf = String::new();
        push_text_chunk(s, &mut buf);
        buf
    }

    fn attr_of(s: &str) -> String {
        let mut buf = String::new();
        push_attribute_chunk(s, &mut buf);
        buf
    }

    #[test]
    fn line_endings() {
        assert_eq!(text_of("a\r\nb\rc\n"), "a\nb\nc\n");
        assert_eq!(text_of("\r"), "\n");
    }

    #[test]
    fn attribute_whitespace() {
        assert_eq!(attr_of("a\r\nb\tc\nd"), "a b c d");
    }

    #[test]
    fn references() {
        assert!(matches!(parse_reference("#x41"), Some(Reference::Char('A'))));
        assert!(matches!(parse_reference("#65"), Some(Reference::Char('A'))));
        assert!(matches!(parse_reference("amp"), Some(Reference::Char('&'))));
        assert!(matches!(parse_reference("ent"), Some(Reference::Entity("ent"))));
        assert!(parse_reference("#xZZ").is_none());
        assert!(parse_reference("").is_none());
        assert!(parse_reference("a b").is_none());
    }
}
