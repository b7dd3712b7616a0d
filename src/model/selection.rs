// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use crate::model::document::NodePath;

/// A screenshot of the selected region, captured by the (out-of-scope)
/// selection UI and forwarded to the AI transport as a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    media_type: String,
    bytes: Vec<u8>,
}

impl CapturedImage {
    pub fn new(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn data_uri(&self) -> String {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine as _;

        let encoded = STANDARD.encode(&self.bytes);
        format!("data:{};base64,{encoded}", self.media_type)
    }
}

/// What the selection provider hands the session when the user picks a
/// region. All parts are optional: an empty selection means the page itself.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    image: Option<CapturedImage>,
    fragment_markup: Option<String>,
    target: Option<NodePath>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_node(target: NodePath, fragment_markup: impl Into<String>) -> Self {
        Self {
            image: None,
            fragment_markup: Some(fragment_markup.into()),
            target: Some(target),
        }
    }

    pub fn image(&self) -> Option<&CapturedImage> {
        self.image.as_ref()
    }

    pub fn set_image(&mut self, image: Option<CapturedImage>) {
        self.image = image;
    }

    pub fn fragment_markup(&self) -> Option<&str> {
        self.fragment_markup.as_deref()
    }

    pub fn set_fragment_markup<T: Into<String>>(&mut self, markup: Option<T>) {
        self.fragment_markup = markup.map(Into::into);
    }

    pub fn target(&self) -> Option<&NodePath> {
        self.target.as_ref()
    }

    pub fn set_target(&mut self, target: Option<NodePath>) {
        self.target = target;
    }
}
