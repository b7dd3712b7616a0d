// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use proteus::model::Node;

fn ascii_repeat_to_len(prefix: &str, fill: char, target_len: usize) -> String {
    if prefix.len() >= target_len {
        return prefix[..target_len].to_owned();
    }
    let mut out = String::with_capacity(target_len);
    out.push_str(prefix);
    while out.len() < target_len {
        out.push(fill);
    }
    out
}

pub fn checksum_nodes(nodes: &[Node]) -> u64 {
    let mut acc = 0u64;
    for node in nodes {
        match node {
            Node::Element(element) => {
                acc = acc.wrapping_mul(131).wrapping_add(element.name().len() as u64);
                for attribute in element.attributes() {
                    acc = acc.wrapping_mul(131).wrapping_add(attribute.name().len() as u64);
                    if let Some(value) = attribute.value() {
                        acc = acc.wrapping_mul(131).wrapping_add(value.len() as u64);
                    }
                }
                acc = acc.wrapping_mul(131).wrapping_add(checksum_nodes(element.children()));
            }
            Node::Text(text) => {
                acc = acc.wrapping_mul(131).wrapping_add(text.len() as u64);
            }
            Node::Comment(comment) => {
                acc = acc.wrapping_mul(131).wrapping_add(comment.len() as u64);
            }
        }
    }
    acc
}

pub mod page {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Params {
        pub sections: usize,
        pub rows_per_section: usize,
        pub span_depth: usize,
        pub text_len: usize,
    }

    impl Params {
        pub const fn new(
            sections: usize,
            rows_per_section: usize,
            span_depth: usize,
            text_len: usize,
        ) -> Self {
            Self { sections, rows_per_section, span_depth, text_len }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Case {
        Small,
        MediumDense,
        LargeDeep,
    }

    impl Case {
        pub const fn id(self) -> &'static str {
            match self {
                Self::Small => "small",
                Self::MediumDense => "medium_dense",
                Self::LargeDeep => "large_deep",
            }
        }

        pub const fn params(self) -> Params {
            match self {
                Self::Small => Params::new(2, 8, 2, 16),
                Self::MediumDense => Params::new(6, 40, 3, 24),
                Self::LargeDeep => Params::new(10, 80, 6, 48),
            }
        }
    }

    fn nested_spans(depth: usize, text: &str) -> String {
        let mut out = String::new();
        for level in 0..depth {
            out.push_str(&format!("<span class=\"d{level}\">"));
        }
        out.push_str(text);
        for _ in 0..depth {
            out.push_str("</span>");
        }
        out
    }

    /// Deterministic sectioned page generator. Node count and text volume
    /// scale with the params; ids are stable for selector lookups.
    pub fn markup(params: Params) -> String {
        let mut out = String::new();
        out.push_str("<main id=\"bench-root\">");
        for section in 0..params.sections {
            out.push_str(&format!(
                "<section id=\"s{section:02}\" class=\"block\"><h2>Section {section}</h2><ul>"
            ));
            for row in 0..params.rows_per_section {
                let text =
                    ascii_repeat_to_len(&format!("row {section}-{row} "), 'x', params.text_len);
                out.push_str(&format!(
                    "<li data-row=\"{row}\">{}</li>",
                    nested_spans(params.span_depth, &text)
                ));
            }
            out.push_str("</ul></section>");
        }
        out.push_str("</main>");
        out
    }

    pub fn fixture(case: Case) -> String {
        markup(case.params())
    }
}

pub mod reply {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Case {
        ShortProse,
        HeadedFragment,
        FallbackFence,
        UnclosedFence,
    }

    impl Case {
        pub const fn id(self) -> &'static str {
            match self {
                Self::ShortProse => "short_prose",
                Self::HeadedFragment => "headed_fragment",
                Self::FallbackFence => "fallback_fence",
                Self::UnclosedFence => "unclosed_fence",
            }
        }
    }

    fn prose(paragraphs: usize) -> String {
        let mut out = String::new();
        for index in 0..paragraphs {
            out.push_str(&ascii_repeat_to_len(&format!("Paragraph {index} "), 'y', 160));
            out.push_str("\n\n");
        }
        out
    }

    /// Streamed-reply generator around a medium page fragment.
    pub fn fixture(case: Case) -> String {
        let fragment = page::fixture(page::Case::MediumDense);
        match case {
            Case::ShortProse => prose(6),
            Case::HeadedFragment => {
                format!("{}## Fixed HTML\n\n```html\n{fragment}\n```\n{}", prose(3), prose(2))
            }
            Case::FallbackFence => {
                format!("{}```html\n{fragment}\n```\n{}", prose(3), prose(2))
            }
            Case::UnclosedFence => {
                format!("{}## Fixed HTML\n\n```html\n{fragment}\n{}", prose(3), prose(8))
            }
        }
    }

    /// Reply whose fenced fragment carries `slots` placeholder markers,
    /// paired with the map that restores them.
    pub fn slot_heavy(slots: usize) -> (String, proteus::placeholder::PlaceholderMap) {
        let mut fragment = String::from("<div id=\"charts\">");
        for index in 0..slots {
            fragment.push_str(&format!(
                "<figure id=\"fig{index:03}\"><svg viewBox=\"0 0 10 10\"><path d=\"M0 {index}L10 10\"></path></svg><figcaption>Chart {index}</figcaption></figure>"
            ));
        }
        fragment.push_str("</div>");

        let (encoded, map) = proteus::placeholder::encode(&fragment);
        let reply = format!("## Fixed HTML\n\n```html\n{encoded}\n```\n");
        (reply, map)
    }
}
