// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for conversation history on disk.
//!
//! The store module reads/writes the history log (one JSON file per session
//! folder) that survives restarts and replays into the UI on startup.

pub mod history_log;

pub use history_log::{
    ConversationItem, ConversationKind, FixAttachment, HistoryStore, StoreError, StreamUpdate,
    WriteDurability,
};
