// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The coordinator that drives one fix lifecycle end to end.
//!
//! A [`FixSession`] owns the live tree, the registry of applied fixes and
//! the on-disk conversation history. The host feeds it selections, prompts
//! and stream notifications; it hands back a [`TransportRequest`] for each
//! submitted prompt and mutates the tree once a reply carries usable
//! markup. Degraded conditions that should not stop the host accumulate as
//! warnings, drained with [`FixSession::take_warnings`].

use std::fmt;

use crate::extract::extract;
use crate::fixes::{FixError, FixRegistry};
use crate::format::html::serialize_node;
use crate::model::{
    CapturedImage, FixId, LiveDocument, PatchError, Selection, StableSelector, TreePatch,
    FIX_ID_ATTR,
};
use crate::placeholder::{encode, PlaceholderMap};
use crate::store::{
    ConversationItem, ConversationKind, FixAttachment, HistoryStore, StoreError, StreamUpdate,
};

/// When an extracted fragment goes into the live tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyPolicy {
    /// Apply as soon as a finalized reply yields a usable fragment.
    #[default]
    OnFinalize,
    /// Park the fragment as a pending proposal until
    /// [`FixSession::confirm_pending_fix`].
    ManualConfirm,
}

/// The outbound request the host sends to its AI transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// Screenshot of the selected region as a `data:` URI, when one was
    /// captured.
    pub image_data_uri: Option<String>,
    pub prompt: String,
    /// The selected fragment with `<svg>` subtrees swapped for slot
    /// markers. Absent for whole-document selections.
    pub encoded_fragment: Option<String>,
}

/// What became of a finalized reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// No reply was streaming; nothing to settle.
    NoActiveStream,
    /// The reply settled but carried no usable fragment.
    NoFragment,
    /// The selection covered the whole document, so there is no single
    /// node to rewrite.
    DocumentWide,
    /// The fragment was applied to the live tree.
    Applied { fix_id: FixId },
    /// The fragment is parked until [`FixSession::confirm_pending_fix`].
    Pending { fix_id: FixId },
    /// Apply was attempted and failed; an error item in the history says
    /// why.
    ApplyFailed { fix_id: FixId },
}

/// Transient state for one selection, from [`FixSession::begin_selection`]
/// until the next selection or [`FixSession::reset_selection`] replaces it.
#[derive(Debug, Clone)]
pub struct FixCycle {
    fix_id: FixId,
    selector: StableSelector,
    original_markup: Option<String>,
    image: Option<CapturedImage>,
    placeholders: PlaceholderMap,
    proposal: Option<String>,
}

impl FixCycle {
    pub fn fix_id(&self) -> &FixId {
        &self.fix_id
    }

    pub fn selector(&self) -> &StableSelector {
        &self.selector
    }

    /// The markup captured from the tree before the target was tagged.
    pub fn original_markup(&self) -> Option<&str> {
        self.original_markup.as_deref()
    }

    pub fn image(&self) -> Option<&CapturedImage> {
        self.image.as_ref()
    }

    pub fn has_pending_proposal(&self) -> bool {
        self.proposal.is_some()
    }
}

#[derive(Debug)]
pub enum SessionError {
    /// A prompt was submitted with no active selection cycle.
    SelectionMissing,
    Fix(FixError),
    Store(StoreError),
    Patch(PatchError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectionMissing => {
                write!(f, "no active selection; select a region before submitting")
            }
            Self::Fix(err) => write!(f, "fix lifecycle failed: {err}"),
            Self::Store(err) => write!(f, "history store failed: {err}"),
            Self::Patch(err) => write!(f, "tree patch failed: {err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SelectionMissing => None,
            Self::Fix(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Patch(err) => Some(err),
        }
    }
}

impl From<FixError> for SessionError {
    fn from(err: FixError) -> Self {
        Self::Fix(err)
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<PatchError> for SessionError {
    fn from(err: PatchError) -> Self {
        Self::Patch(err)
    }
}

/// The top-level object the host runs against.
#[derive(Debug)]
pub struct FixSession {
    document: LiveDocument,
    registry: FixRegistry,
    history: HistoryStore,
    cycle: Option<FixCycle>,
    policy: ApplyPolicy,
    next_fix_number: u32,
    warnings: Vec<String>,
}

impl FixSession {
    pub fn new(document: LiveDocument, history: HistoryStore) -> Self {
        Self {
            document,
            registry: FixRegistry::new(),
            history,
            cycle: None,
            policy: ApplyPolicy::default(),
            next_fix_number: 1,
            warnings: Vec::new(),
        }
    }

    /// Returns the session with `policy` instead of the default
    /// [`ApplyPolicy::OnFinalize`].
    pub fn with_policy(mut self, policy: ApplyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ApplyPolicy {
        self.policy
    }

    pub fn document(&self) -> &LiveDocument {
        &self.document
    }

    /// Host-side edits outside the fix lifecycle go through this handle.
    /// Wrapper materialization stays with the registry.
    pub fn document_mut(&mut self) -> &mut LiveDocument {
        &mut self.document
    }

    pub fn registry(&self) -> &FixRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn active_cycle(&self) -> Option<&FixCycle> {
        self.cycle.as_ref()
    }

    /// Drains the warnings accumulated since the last call.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

// Extracted lifecycle implementation for the selection/submit/stream flow.
include!("session_impl.rs");

#[cfg(test)]
mod tests;
