// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Apply/toggle/discard lifecycle for AI-proposed fixes.
//!
//! The registry is the sole writer of the live tree: every mutation is a
//! `TreePatch` routed through `LiveDocument::apply_patch`. Hard failures
//! (no tagged node, unparseable fragments) abort before any mutation;
//! degraded cases (double discard, an externally removed wrapper) succeed
//! with warnings on the returned [`FixOutcome`].

use std::collections::BTreeMap;
use std::fmt;

use crate::format::html::{parse_fragment, HtmlParseError};
use crate::model::{
    Element, FixId, LiveDocument, Node, PatchError, StableSelector, TreePatch, FIX_ID_ATTR,
};

/// Attribute on the wrapper naming which side is currently displayed.
pub const FIX_VIEW_ATTR: &str = "data-fix-view";
/// Bare attribute marking the wrapper's control span.
pub const FIX_CONTROLS_ATTR: &str = "data-fix-controls";
/// Attribute naming the action a control button triggers.
pub const FIX_ACTION_ATTR: &str = "data-fix-action";

const VIEW_FIXED: &str = "fixed";
const VIEW_ORIGINAL: &str = "original";
const DISCARD_LABEL: &str = "Discard";
const SHOW_ORIGINAL_LABEL: &str = "Show original";
const SHOW_FIXED_LABEL: &str = "Show fixed";

/// Bookkeeping for one applied fix. Created by `apply`, destroyed by
/// `discard`. The wrapper in the live tree displays exactly one side at a
/// time; the record owns the markup of both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixRecord {
    fix_id: FixId,
    original_markup: String,
    fixed_markup: String,
    showing_fixed: bool,
    selector: StableSelector,
}

impl FixRecord {
    pub fn fix_id(&self) -> &FixId {
        &self.fix_id
    }

    pub fn original_markup(&self) -> &str {
        &self.original_markup
    }

    pub fn fixed_markup(&self) -> &str {
        &self.fixed_markup
    }

    pub fn is_showing_fixed(&self) -> bool {
        self.showing_fixed
    }

    pub fn selector(&self) -> &StableSelector {
        &self.selector
    }
}

/// Warnings produced by a degraded but successful lifecycle operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixOutcome {
    pub warnings: Vec<String>,
}

/// All applied fixes, keyed by fix id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixRegistry {
    records: BTreeMap<FixId, FixRecord>,
}

impl FixRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, fix_id: &FixId) -> Option<&FixRecord> {
        self.records.get(fix_id)
    }

    pub fn contains(&self, fix_id: &FixId) -> bool {
        self.records.contains_key(fix_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Applied fixes in fix-id order.
    pub fn records(&self) -> impl Iterator<Item = &FixRecord> {
        self.records.values()
    }
}

/// Which of a fix's two markup sides an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixSide {
    Original,
    Fixed,
}

impl fmt::Display for FixSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => f.write_str("original"),
            Self::Fixed => f.write_str("fixed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixError {
    NodeNotFound { fix_id: FixId },
    AlreadyApplied { fix_id: FixId },
    FragmentParse { fix_id: FixId, side: FixSide, source: HtmlParseError },
    EmptyFragment { fix_id: FixId, side: FixSide },
    MultiRootedOriginal { fix_id: FixId, roots: usize },
    Patch { fix_id: FixId, source: PatchError },
}

impl fmt::Display for FixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { fix_id } => {
                write!(f, "no live node is tagged with fix id '{fix_id}'")
            }
            Self::AlreadyApplied { fix_id } => write!(f, "fix '{fix_id}' is already applied"),
            Self::FragmentParse { fix_id, side, source } => {
                write!(f, "the {side} fragment of fix '{fix_id}' does not parse: {source}")
            }
            Self::EmptyFragment { fix_id, side } => {
                write!(f, "the {side} fragment of fix '{fix_id}' is empty")
            }
            Self::MultiRootedOriginal { fix_id, roots } => {
                write!(
                    f,
                    "the original fragment of fix '{fix_id}' has {roots} roots; discard needs exactly one"
                )
            }
            Self::Patch { fix_id, source } => {
                write!(f, "tree patch for fix '{fix_id}' failed: {source}")
            }
        }
    }
}

impl std::error::Error for FixError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FragmentParse { source, .. } => Some(source),
            Self::Patch { source, .. } => Some(source),
            _ => None,
        }
    }
}

// Extracted lifecycle implementation for apply/toggle/discard.
include!("registry_impl.rs");
