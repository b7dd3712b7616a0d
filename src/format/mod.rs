// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Fragment markup parsing/serialization.
//!
//! The engine validates AI-proposed markup and round-trips fragments through
//! the live tree, so the parser is strict where browsers would silently
//! repair.

pub mod html;

pub use html::{parse_fragment, serialize_fragment, serialize_node, HtmlParseError};
