// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Vector-graphic placeholder codec.
//!
//! Free-text generation does not reliably reproduce verbose vector-path
//! syntax, so `<svg>` subtrees are swapped for minimal `<svg-slot id="N">`
//! markers before transmission and restored by id afterwards. Restoration is
//! byte-exact: originals are recorded as raw spans of the input, never
//! re-serialized.

use std::sync::OnceLock;

use memchr::memchr;
use regex::Regex;

/// id → original vector-graphic markup, scoped to one encode/decode cycle.
/// Ids are sequential from zero; each submission builds a fresh map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    originals: Vec<String>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    pub fn original(&self, id: usize) -> Option<&str> {
        self.originals.get(id).map(String::as_str)
    }

    fn push(&mut self, markup: String) -> usize {
        self.originals.push(markup);
        self.originals.len() - 1
    }
}

/// Encodes a fragment for transmission: every `<svg>` subtree (including
/// self-closing ones) becomes `<svg-slot id="N"></svg-slot>` and its exact
/// bytes are recorded under N. An unterminated subtree is left as-is.
pub fn encode(fragment: &str) -> (String, PlaceholderMap) {
    let bytes = fragment.as_bytes();
    let mut map = PlaceholderMap::new();
    let mut out = String::with_capacity(fragment.len());
    let mut i = 0;
    while i < bytes.len() {
        let Some(rel) = memchr(b'<', &bytes[i..]) else {
            break;
        };
        let lt = i + rel;
        out.push_str(&fragment[i..lt]);
        if is_svg_open(bytes, lt) {
            if let Some(end) = svg_span_end(bytes, lt) {
                let id = map.push(fragment[lt..end].to_owned());
                out.push_str(&format!("<svg-slot id=\"{id}\"></svg-slot>"));
                i = end;
                continue;
            }
        }
        out.push('<');
        i = lt + 1;
    }
    out.push_str(&fragment[i..]);
    (out, map)
}

/// What [`decode`] produced: the restored text plus the marker ids that had
/// no mapping and were left untouched (a non-fatal diagnostic).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOutcome {
    text: String,
    unmatched: Vec<String>,
}

impl DecodeOutcome {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.text, self.unmatched)
    }
}

static SLOT_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Tolerates the marker variants a model may emit: case changes, quote
/// changes or no quotes, extra attributes, a self-closing tag, or a dropped
/// close tag. A marker without a readable id attribute is not touched.
fn slot_pattern() -> &'static Regex {
    SLOT_PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)<svg-slot[^>]*?\sid\s*=\s*["']?(\d+)["']?[^>]*>(?:\s*</svg-slot\s*>)?"#)
            .expect("placeholder marker pattern is valid")
    })
}

/// Restores originals by id correlation. Markers whose id is missing from
/// `map` are kept verbatim and reported in the outcome.
pub fn decode(text: &str, map: &PlaceholderMap) -> DecodeOutcome {
    let mut out = String::with_capacity(text.len());
    let mut unmatched = Vec::new();
    let mut last = 0;
    for caps in slot_pattern().captures_iter(text) {
        let whole = caps.get(0).expect("capture 0 spans the match");
        out.push_str(&text[last..whole.start()]);
        let original = caps[1].parse::<usize>().ok().and_then(|id| map.original(id));
        match original {
            Some(markup) => out.push_str(markup),
            None => {
                unmatched.push(caps[1].to_owned());
                out.push_str(whole.as_str());
            }
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    DecodeOutcome { text: out, unmatched }
}

/// `<svg` followed by a tag-delimiting byte. `<svg-slot` and `<svga` do not
/// qualify.
fn is_svg_open(bytes: &[u8], lt: usize) -> bool {
    if lt + 4 > bytes.len() || !bytes[lt..lt + 4].eq_ignore_ascii_case(b"<svg") {
        return false;
    }
    match bytes.get(lt + 4) {
        Some(b) => b.is_ascii_whitespace() || *b == b'>' || *b == b'/',
        None => false,
    }
}

fn is_svg_close(bytes: &[u8], lt: usize) -> Option<usize> {
    if lt + 5 > bytes.len() || !bytes[lt..lt + 5].eq_ignore_ascii_case(b"</svg") {
        return None;
    }
    let mut k = lt + 5;
    while k < bytes.len() && bytes[k].is_ascii_whitespace() {
        k += 1;
    }
    (k < bytes.len() && bytes[k] == b'>').then_some(k + 1)
}

/// End of the tag starting at `lt`, honoring quoted attribute values so an
/// embedded `>` does not end the tag. Also reports whether the tag is
/// self-closing.
fn scan_tag_end(bytes: &[u8], lt: usize) -> Option<(usize, bool)> {
    let mut quote: Option<u8> = None;
    let mut last_meaningful = 0u8;
    let mut i = lt + 1;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => return Some((i + 1, last_meaningful == b'/')),
                _ => {
                    if !b.is_ascii_whitespace() {
                        last_meaningful = b;
                    }
                }
            },
        }
        i += 1;
    }
    None
}

/// Byte index one past the subtree that opens at `lt`, handling nested and
/// self-closing `<svg>` tags.
fn svg_span_end(bytes: &[u8], lt: usize) -> Option<usize> {
    let (open_end, self_closing) = scan_tag_end(bytes, lt)?;
    if self_closing {
        return Some(open_end);
    }
    let mut depth = 1usize;
    let mut i = open_end;
    loop {
        let rel = memchr(b'<', &bytes[i..])?;
        i += rel;
        if let Some(close_end) = is_svg_close(bytes, i) {
            depth -= 1;
            if depth == 0 {
                return Some(close_end);
            }
            i = close_end;
        } else if is_svg_open(bytes, i) {
            let (tag_end, nested_self_closing) = scan_tag_end(bytes, i)?;
            if !nested_self_closing {
                depth += 1;
            }
            i = tag_end;
        } else {
            i += 1;
        }
    }
}
