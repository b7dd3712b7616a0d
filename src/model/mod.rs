// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model: fragment trees, the live document, and stable addressing.
//!
//! A session owns one [`LiveDocument`]; every mutation flows through
//! [`LiveDocument::apply_patch`].

pub mod document;
pub mod ids;
pub mod node;
pub mod selection;
pub mod selector;

pub use document::{LiveDocument, NodePath, PatchError, TreePatch, FIX_ID_ATTR};
pub use ids::{FixId, Id, IdError};
pub use node::{Attribute, AttributeList, Element, Node};
pub use selection::{CapturedImage, Selection};
pub use selector::{ParseSelectorError, PathStep, StableSelector};
