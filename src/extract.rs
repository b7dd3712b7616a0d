// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pulls a candidate fragment out of streamed AI text.
//!
//! Stateless by contract: callers re-run it against the whole accumulated
//! buffer after every chunk, which keeps partial-input handling trivial. An
//! unterminated fence simply never matches.

use std::sync::OnceLock;

use regex::Regex;

use crate::format::html::parse_fragment;
use crate::model::Node;
use crate::placeholder::{decode, PlaceholderMap};

/// A validated fragment candidate: restored markup plus any placeholder ids
/// the reply referenced without a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFragment {
    markup: String,
    unmatched: Vec<String>,
}

impl ExtractedFragment {
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    pub fn into_markup(self) -> String {
        self.markup
    }
}

static HEADING: OnceLock<Regex> = OnceLock::new();
static FENCE: OnceLock<Regex> = OnceLock::new();

/// A markdown heading whose text begins `Fixed HTML`, any level, any case.
fn heading_pattern() -> &'static Regex {
    HEADING.get_or_init(|| {
        Regex::new(r"(?mi)^[ \t]{0,3}#{1,6}[ \t]+fixed[ \t]+html[^\n]*$")
            .expect("heading pattern is valid")
    })
}

/// A closed fenced code block; the body is capture 2. An opening fence
/// without its closing line never matches.
fn fence_pattern() -> &'static Regex {
    FENCE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]{0,3}```([^\n]*)\n([\s\S]*?)^[ \t]{0,3}```[ \t]*\r?$")
            .expect("fence pattern is valid")
    })
}

/// Extracts the proposed fragment from `accumulated`, or `None` while no
/// valid candidate exists yet (the normal "no fix yet" state, not an error).
///
/// The strict grammar (a `Fixed HTML` heading followed by a fenced block)
/// wins; otherwise the first closed fence of any kind is taken. The
/// candidate is placeholder-decoded and must parse into at least one node
/// that carries content.
pub fn extract(accumulated: &str, placeholders: &PlaceholderMap) -> Option<ExtractedFragment> {
    let candidate = strict_candidate(accumulated)
        .or_else(|| first_fenced_body(accumulated))?
        .trim();
    if candidate.is_empty() {
        return None;
    }

    let (markup, unmatched) = decode(candidate, placeholders).into_parts();
    let nodes = parse_fragment(&markup).ok()?;
    if !nodes.iter().any(Node::carries_content) {
        return None;
    }
    Some(ExtractedFragment { markup, unmatched })
}

fn strict_candidate(text: &str) -> Option<&str> {
    let heading = heading_pattern().find(text)?;
    first_fenced_body(&text[heading.end()..])
}

fn first_fenced_body(text: &str) -> Option<&str> {
    fence_pattern()
        .captures(text)
        .map(|caps| caps.get(2).expect("fence body capture").as_str())
}
