// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::model::document::{LiveDocument, NodePath};
use crate::model::node::{canonical_name, Node};

/// One step of a tag+position path: the `idx`-th element child with this tag,
/// counted among same-tag element siblings only. Text and comment siblings do
/// not shift the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    tag: SmolStr,
    index: usize,
}

impl PathStep {
    pub fn new(tag: impl AsRef<str>, index: usize) -> Self {
        Self {
            tag: canonical_name(tag.as_ref()),
            index,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Best-effort stable address of one element in the live document.
///
/// Canonical format:
/// - `doc`: the whole document (nothing concrete selected)
/// - `#<id>`: the first element carrying this unique id
/// - `#<anchor-id>>tag:idx>tag:idx`: path below an anchored ancestor
/// - `tag:idx>tag:idx`: path from the document root when no ancestor
///   carries a usable id
///
/// Valid immediately after generation; best-effort after unrelated
/// structural change elsewhere in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StableSelector {
    Document,
    UniqueId(String),
    /// Invariant: `steps` is never empty (an anchor alone is `UniqueId`).
    TagPath {
        anchor: Option<String>,
        steps: Vec<PathStep>,
    },
}

impl StableSelector {
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document)
    }

    /// Computes the stable address of the element at `target`. `None` and
    /// anything that is not a live element degrade to the whole-document
    /// sentinel. Contract: resolving the result immediately afterwards yields
    /// `target` again.
    pub fn generate(document: &LiveDocument, target: Option<&NodePath>) -> Self {
        let Some(path) = target else {
            return Self::Document;
        };
        let Some(Node::Element(_)) = document.node_at(path) else {
            return Self::Document;
        };

        if let Some(id) = usable_id(document, path) {
            return Self::UniqueId(id);
        }

        // Nearest ancestor whose id re-resolves to that ancestor anchors the
        // path; otherwise the path runs from the document root.
        let mut anchor = None;
        let mut anchor_path: Option<NodePath> = None;
        let mut cursor = path.parent();
        while let Some(candidate) = cursor {
            if let Some(id) = usable_id(document, &candidate) {
                anchor = Some(id);
                anchor_path = Some(candidate);
                break;
            }
            cursor = candidate.parent();
        }

        let from = anchor_path.as_ref().map_or(0, |p| p.segments().len());
        let mut steps = Vec::with_capacity(path.segments().len() - from);
        for depth in from..path.segments().len() {
            let sub = NodePath::new(path.segments()[..=depth].iter().copied());
            steps.push(step_for(document, &sub));
        }

        Self::TagPath { anchor, steps }
    }

    /// Re-resolves the address against the current tree. `Document` yields
    /// `None`: the whole document is not one node.
    pub fn resolve(&self, document: &LiveDocument) -> Option<NodePath> {
        match self {
            Self::Document => None,
            Self::UniqueId(id) => document.find_by_id(id),
            Self::TagPath { anchor, steps } => {
                let mut path = match anchor {
                    Some(id) => Some(document.find_by_id(id)?),
                    None => None,
                };
                for step in steps {
                    path = Some(resolve_step(document, path.as_ref(), step)?);
                }
                path
            }
        }
    }

    pub fn parse(input: &str) -> Result<Self, ParseSelectorError> {
        if input.is_empty() {
            return Err(ParseSelectorError::Empty);
        }
        if input == "doc" {
            return Ok(Self::Document);
        }

        if let Some(rest) = input.strip_prefix('#') {
            match rest.split_once('>') {
                None => {
                    let id = parse_anchor_id(rest)?;
                    Ok(Self::UniqueId(id))
                }
                Some((id, steps_str)) => {
                    let anchor = parse_anchor_id(id)?;
                    Ok(Self::TagPath {
                        anchor: Some(anchor),
                        steps: parse_steps(steps_str)?,
                    })
                }
            }
        } else {
            Ok(Self::TagPath {
                anchor: None,
                steps: parse_steps(input)?,
            })
        }
    }
}

impl fmt::Display for StableSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => f.write_str("doc"),
            Self::UniqueId(id) => write!(f, "#{id}"),
            Self::TagPath { anchor, steps } => {
                let mut lead = "";
                if let Some(id) = anchor {
                    write!(f, "#{id}")?;
                    lead = ">";
                }
                for step in steps {
                    write!(f, "{lead}{}:{}", step.tag(), step.index())?;
                    lead = ">";
                }
                Ok(())
            }
        }
    }
}

impl FromStr for StableSelector {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The element's id, if it has one that is safe to embed in the canonical
/// form and re-resolves to this very element (first match in document order).
fn usable_id(document: &LiveDocument, path: &NodePath) -> Option<String> {
    let element = document.node_at(path)?.as_element()?;
    let id = element.attr("id")?;
    if id.is_empty() || id.contains('>') || id.chars().any(char::is_whitespace) {
        return None;
    }
    if document.find_by_id(id).as_ref() != Some(path) {
        return None;
    }
    Some(id.to_owned())
}

fn step_for(document: &LiveDocument, path: &NodePath) -> PathStep {
    let node = document
        .node_at(path)
        .expect("step_for is only called on live paths");
    let tag = node
        .as_element()
        .expect("step_for is only called on elements")
        .name();

    let siblings = match path.parent() {
        Some(parent) => document
            .node_at(&parent)
            .and_then(Node::as_element)
            .expect("parent of a live element path is a live element")
            .children(),
        None => document.roots(),
    };
    let index = siblings[..path.last()]
        .iter()
        .filter(|sibling| sibling.is_element_named(tag))
        .count();

    PathStep::new(tag, index)
}

fn resolve_step(
    document: &LiveDocument,
    parent: Option<&NodePath>,
    step: &PathStep,
) -> Option<NodePath> {
    let children = match parent {
        Some(path) => document.node_at(path)?.as_element()?.children(),
        None => document.roots(),
    };
    let mut seen = 0;
    for (index, child) in children.iter().enumerate() {
        if !child.is_element_named(step.tag()) {
            continue;
        }
        if seen == step.index() {
            return Some(match parent {
                Some(path) => path.child(index),
                None => NodePath::root(index),
            });
        }
        seen += 1;
    }
    None
}

fn parse_anchor_id(raw: &str) -> Result<String, ParseSelectorError> {
    if raw.is_empty() {
        return Err(ParseSelectorError::MissingAnchorId);
    }
    if raw.chars().any(char::is_whitespace) {
        return Err(ParseSelectorError::InvalidAnchorId);
    }
    Ok(raw.to_owned())
}

fn parse_steps(raw: &str) -> Result<Vec<PathStep>, ParseSelectorError> {
    let mut steps = Vec::new();
    for part in raw.split('>') {
        if part.is_empty() {
            return Err(ParseSelectorError::EmptyStep);
        }
        let (tag, index_str) = part.rsplit_once(':').ok_or(ParseSelectorError::MissingStepIndex)?;
        if tag.is_empty() {
            return Err(ParseSelectorError::MissingStepTag);
        }
        if index_str.is_empty() {
            return Err(ParseSelectorError::MissingStepIndex);
        }
        let index = index_str.parse::<usize>().map_err(ParseSelectorError::InvalidStepIndex)?;
        steps.push(PathStep::new(tag, index));
    }
    Ok(steps)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseSelectorError {
    Empty,
    MissingAnchorId,
    InvalidAnchorId,
    EmptyStep,
    MissingStepTag,
    MissingStepIndex,
    InvalidStepIndex(std::num::ParseIntError),
}

impl fmt::Display for ParseSelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("selector must not be empty"),
            Self::MissingAnchorId => f.write_str("selector is missing the anchor id after '#'"),
            Self::InvalidAnchorId => f.write_str("selector anchor id must not contain whitespace"),
            Self::EmptyStep => f.write_str("selector must not contain empty steps"),
            Self::MissingStepTag => f.write_str("selector step is missing its tag"),
            Self::MissingStepIndex => f.write_str("selector step is missing its ':index' part"),
            Self::InvalidStepIndex(err) => write!(f, "invalid selector step index: {err}"),
        }
    }
}

impl std::error::Error for ParseSelectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidStepIndex(err) => Some(err),
            _ => None,
        }
    }
}
