// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use memchr::memchr;

use crate::model::node::{Attribute, Element, Node};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlParseError {
    UnclosedElement { tag: String },
    UnexpectedCloseTag { tag: String, offset: usize },
    MalformedCloseTag { offset: usize },
    UnterminatedTag { offset: usize },
    UnterminatedComment { offset: usize },
    UnterminatedDoctype { offset: usize },
    UnsupportedDeclaration { offset: usize },
}

impl fmt::Display for HtmlParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnclosedElement { tag } => {
                write!(f, "element <{tag}> is not closed before the end of input")
            }
            Self::UnexpectedCloseTag { tag, offset } => {
                write!(f, "closing tag </{tag}> at byte {offset} matches no open element")
            }
            Self::MalformedCloseTag { offset } => {
                write!(f, "closing tag at byte {offset} is missing its tag name")
            }
            Self::UnterminatedTag { offset } => {
                write!(f, "tag starting at byte {offset} is not terminated by '>'")
            }
            Self::UnterminatedComment { offset } => {
                write!(f, "comment starting at byte {offset} is not terminated by '-->'")
            }
            Self::UnterminatedDoctype { offset } => {
                write!(f, "doctype starting at byte {offset} is not terminated by '>'")
            }
            Self::UnsupportedDeclaration { offset } => {
                write!(f, "unsupported markup declaration at byte {offset}")
            }
        }
    }
}

impl std::error::Error for HtmlParseError {}

/// Parses fragment markup into a forest of nodes.
///
/// Strict where it matters for validating AI output: unclosed elements, stray
/// close tags, and unterminated comments are errors instead of being silently
/// repaired. A close tag does close any elements still open inside it, and a
/// `<` that does not begin markup is literal text, matching how fragments are
/// written in practice.
///
/// Intentional limits: names are canonicalized to ASCII lowercase (so
/// case-sensitive foreign-content attributes like `viewBox` flatten; exact
/// vector-graphic bytes travel through the placeholder codec, never through
/// this parser), doctypes are scanned past without being represented, and
/// only a small stable entity set is decoded.
pub fn parse_fragment(input: &str) -> Result<Vec<Node>, HtmlParseError> {
    FragmentParser::new(input).parse()
}

/// Serializes a forest back to markup. Text is entity-escaped, rawtext
/// (`script`/`style`) content is emitted verbatim, void elements emit no
/// close tag, and every other empty element serializes as a start/end pair.
pub fn serialize_fragment(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

pub fn serialize_node(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_rawtext_element(name: &str) -> bool {
    matches!(name, "script" | "style")
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn starts_with_ignore_ascii_case(bytes: &[u8], start: usize, needle: &[u8]) -> bool {
    bytes.len() >= start + needle.len()
        && bytes[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

struct FragmentParser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    roots: Vec<Node>,
    stack: Vec<Element>,
}

impl<'a> FragmentParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            roots: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<Node>, HtmlParseError> {
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'<' && self.at_markup_start() {
                match self.bytes[self.pos + 1] {
                    b'/' => self.parse_close_tag()?,
                    b'!' => self.parse_declaration()?,
                    _ => self.parse_start_tag()?,
                }
            } else {
                self.parse_text();
            }
        }
        if let Some(open) = self.stack.last() {
            return Err(HtmlParseError::UnclosedElement {
                tag: open.name().to_owned(),
            });
        }
        Ok(self.roots)
    }

    fn at_markup_start(&self) -> bool {
        match self.bytes.get(self.pos + 1) {
            Some(b) => b.is_ascii_alphabetic() || *b == b'/' || *b == b'!',
            None => false,
        }
    }

    /// Adjacent text runs coalesce so that parse and serialize stay
    /// idempotent across a literal `<` splitting a run.
    fn attach(&mut self, node: Node) {
        let siblings = match self.stack.last_mut() {
            Some(parent) => parent.children_mut(),
            None => &mut self.roots,
        };
        if let (Some(Node::Text(last)), Node::Text(text)) = (siblings.last_mut(), &node) {
            last.push_str(text);
            return;
        }
        siblings.push(node);
    }

    /// Text runs end at the next `<`. Scanning starts one byte in so a
    /// literal `<` is consumed as text; `<` is ASCII and never a slice
    /// endpoint inside a multi-byte character.
    fn parse_text(&mut self) {
        let start = self.pos;
        let from = start + 1;
        let end = match memchr(b'<', &self.bytes[from..]) {
            Some(rel) => from + rel,
            None => self.bytes.len(),
        };
        let decoded = decode_entities(&self.input[start..end]);
        if !decoded.is_empty() {
            self.attach(Node::Text(decoded));
        }
        self.pos = end;
    }

    fn parse_declaration(&mut self) -> Result<(), HtmlParseError> {
        let offset = self.pos;
        if starts_with_ignore_ascii_case(self.bytes, offset, b"<!--") {
            let body_start = offset + 4;
            let Some(rel) = self.input[body_start..].find("-->") else {
                return Err(HtmlParseError::UnterminatedComment { offset });
            };
            let comment = self.input[body_start..body_start + rel].to_owned();
            self.attach(Node::Comment(comment));
            self.pos = body_start + rel + 3;
            return Ok(());
        }
        if starts_with_ignore_ascii_case(self.bytes, offset, b"<!doctype") {
            let Some(rel) = memchr(b'>', &self.bytes[offset..]) else {
                return Err(HtmlParseError::UnterminatedDoctype { offset });
            };
            self.pos = offset + rel + 1;
            return Ok(());
        }
        Err(HtmlParseError::UnsupportedDeclaration { offset })
    }

    fn parse_close_tag(&mut self) -> Result<(), HtmlParseError> {
        let offset = self.pos;
        let name_start = offset + 2;
        let mut j = name_start;
        while j < self.bytes.len() && is_name_byte(self.bytes[j]) {
            j += 1;
        }
        if j == name_start {
            return Err(HtmlParseError::MalformedCloseTag { offset });
        }
        let name = &self.input[name_start..j];

        while j < self.bytes.len() && self.bytes[j] != b'>' {
            j += 1;
        }
        if j == self.bytes.len() {
            return Err(HtmlParseError::UnterminatedTag { offset });
        }
        self.pos = j + 1;

        let Some(depth) = self.stack.iter().rposition(|el| el.name().eq_ignore_ascii_case(name))
        else {
            return Err(HtmlParseError::UnexpectedCloseTag {
                tag: name.to_ascii_lowercase(),
                offset,
            });
        };
        // Pops close anything left open inside the matched element first.
        while self.stack.len() > depth {
            let element = self.stack.pop().expect("stack is non-empty above depth");
            self.attach(Node::Element(element));
        }
        Ok(())
    }

    fn parse_start_tag(&mut self) -> Result<(), HtmlParseError> {
        let offset = self.pos;
        let name_start = offset + 1;
        let mut j = name_start;
        while j < self.bytes.len() && is_name_byte(self.bytes[j]) {
            j += 1;
        }
        let mut element = Element::new(&self.input[name_start..j]);

        let len = self.bytes.len();
        let mut k = j;
        let mut self_closing = false;
        loop {
            while k < len && self.bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k >= len {
                return Err(HtmlParseError::UnterminatedTag { offset });
            }
            if self.bytes[k] == b'>' {
                k += 1;
                break;
            }
            if self.bytes[k] == b'/' {
                if k + 1 < len && self.bytes[k + 1] == b'>' {
                    self_closing = true;
                    k += 2;
                    break;
                }
                k += 1;
                continue;
            }

            let attr_start = k;
            while k < len && is_name_byte(self.bytes[k]) {
                k += 1;
            }
            if attr_start == k {
                // Not a name byte; skip it rather than failing the whole tag.
                k += 1;
                continue;
            }
            let attr_name = &self.input[attr_start..k];

            while k < len && self.bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            let value = if k < len && self.bytes[k] == b'=' {
                k += 1;
                while k < len && self.bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if k >= len {
                    return Err(HtmlParseError::UnterminatedTag { offset });
                }
                if self.bytes[k] == b'"' || self.bytes[k] == b'\'' {
                    let quote = self.bytes[k];
                    k += 1;
                    let value_start = k;
                    while k < len && self.bytes[k] != quote {
                        k += 1;
                    }
                    if k >= len {
                        return Err(HtmlParseError::UnterminatedTag { offset });
                    }
                    let raw = &self.input[value_start..k];
                    k += 1;
                    Some(decode_entities(raw))
                } else {
                    let value_start = k;
                    while k < len && !self.bytes[k].is_ascii_whitespace() && self.bytes[k] != b'>' {
                        if self.bytes[k] == b'/' && k + 1 < len && self.bytes[k + 1] == b'>' {
                            break;
                        }
                        k += 1;
                    }
                    Some(self.input[value_start..k].to_owned())
                }
            } else {
                None
            };
            // First occurrence wins for duplicate attribute names.
            if !element.has_attr(attr_name) {
                element.attributes_mut().push(Attribute::new(attr_name, value));
            }
        }
        self.pos = k;

        if is_void_element(element.name()) || self_closing {
            self.attach(Node::Element(element));
            return Ok(());
        }
        if is_rawtext_element(element.name()) {
            return self.parse_rawtext(element);
        }
        self.stack.push(element);
        Ok(())
    }

    /// Rawtext content runs verbatim to the matching case-insensitive close
    /// tag; `<` inside it never opens markup.
    fn parse_rawtext(&mut self, mut element: Element) -> Result<(), HtmlParseError> {
        let name = element.name().to_owned();
        let needle = name.as_bytes();
        let len = self.bytes.len();
        let mut i = self.pos;
        loop {
            let Some(rel) = memchr(b'<', &self.bytes[i..]) else {
                return Err(HtmlParseError::UnclosedElement { tag: name });
            };
            i += rel;
            if i + 2 + needle.len() > len {
                return Err(HtmlParseError::UnclosedElement { tag: name });
            }
            if self.bytes[i + 1] == b'/'
                && self.bytes[i + 2..i + 2 + needle.len()].eq_ignore_ascii_case(needle)
            {
                let mut k = i + 2 + needle.len();
                while k < len && self.bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if k < len && self.bytes[k] == b'>' {
                    let raw = &self.input[self.pos..i];
                    if !raw.is_empty() {
                        element.push_child(Node::Text(raw.to_owned()));
                    }
                    self.attach(Node::Element(element));
                    self.pos = k + 1;
                    return Ok(());
                }
            }
            i += 1;
        }
    }
}

// Longest accepted entity body: "#1114111" / "#x10FFFF".
const MAX_ENTITY_BODY: usize = 8;

/// Decodes the small stable entity set: the five named XML entities plus
/// `&nbsp;` and well-formed numeric references. Anything else passes through
/// unchanged and survives a serialize round trip via re-escaping.
fn decode_entities(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let Some(first) = memchr(b'&', bytes) else {
        return raw.to_owned();
    };

    let mut out = String::with_capacity(raw.len());
    out.push_str(&raw[..first]);
    let mut i = first;
    while i < bytes.len() {
        if bytes[i] != b'&' {
            let next = match memchr(b'&', &bytes[i..]) {
                Some(rel) => i + rel,
                None => bytes.len(),
            };
            out.push_str(&raw[i..next]);
            i = next;
            continue;
        }
        // A ';' beyond the longest valid body never terminates an entity.
        let window_end = (i + 1 + MAX_ENTITY_BODY + 1).min(bytes.len());
        let Some(rel) = memchr(b';', &bytes[i + 1..window_end]) else {
            out.push('&');
            i += 1;
            continue;
        };
        let body = &raw[i + 1..i + 1 + rel];
        if body.as_bytes().contains(&b'&') {
            out.push('&');
            i += 1;
            continue;
        }
        match decode_entity_body(body) {
            Some(ch) => out.push(ch),
            None => out.push_str(&raw[i..i + 1 + rel + 1]),
        }
        i += 1 + rel + 1;
    }
    out
}

fn decode_entity_body(body: &str) -> Option<char> {
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => {
            let digits = body.strip_prefix('#')?;
            let value = match digits.strip_prefix(['x', 'X']) {
                Some(hex) if !hex.is_empty() => u32::from_str_radix(hex, 16).ok()?,
                Some(_) => return None,
                None if !digits.is_empty() => digits.parse::<u32>().ok()?,
                None => return None,
            };
            char::from_u32(value)
        }
    }
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(text) => escape_text(out, text),
        Node::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Node::Element(element) => {
            out.push('<');
            out.push_str(element.name());
            for attr in element.attributes() {
                out.push(' ');
                out.push_str(attr.name());
                if let Some(value) = attr.value() {
                    out.push_str("=\"");
                    escape_attr(out, value);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(element.name()) {
                return;
            }
            if is_rawtext_element(element.name()) {
                for child in element.children() {
                    if let Node::Text(text) = child {
                        out.push_str(text);
                    }
                }
            } else {
                for child in element.children() {
                    write_node(out, child);
                }
            }
            out.push_str("</");
            out.push_str(element.name());
            out.push('>');
        }
    }
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(ch),
        }
    }
}
