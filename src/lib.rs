// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Proteus — reversible AI fixes for live HTML fragments.
//!
//! Single-crate layout: document tree and selectors (`model`), the svg
//! placeholder codec, streaming reply extraction, the fix lifecycle
//! registry, the session coordinator and the on-disk conversation history.

pub mod extract;
pub mod fixes;
pub mod format;
pub mod model;
pub mod placeholder;
pub mod session;
pub mod store;
