// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// A stable identifier used across the model and persistence surfaces.
///
/// This is intentionally std-only and does not enforce any particular id
/// scheme; it only enforces that the id can be embedded verbatim in an HTML
/// attribute value and in the persisted history log (non-empty, no
/// whitespace, no markup-significant characters), because fix ids travel as
/// `data-fix-id="<id>"` tags on live nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate_attribute_safe(&value)?;
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<T> Borrow<str> for Id<T> {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl<T> FromStr for Id<T> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl<T> TryFrom<String> for Id<T> {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    Empty,
    InvalidChar(char),
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("id must not be empty"),
            Self::InvalidChar(ch) => write!(f, "id must not contain {ch:?}"),
        }
    }
}

impl std::error::Error for IdError {}

fn validate_attribute_safe(value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    for ch in value.chars() {
        if ch.is_whitespace() || matches!(ch, '"' | '\'' | '<' | '>' | '&') {
            return Err(IdError::InvalidChar(ch));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FixIdTag {}
pub type FixId = Id<FixIdTag>;

#[cfg(test)]
mod tests {
    use super::{FixId, Id, IdError};

    #[test]
    fn id_rejects_empty() {
        let result: Result<Id<()>, _> = Id::new("");
        assert_eq!(result, Err(IdError::Empty));
    }

    #[test]
    fn id_rejects_whitespace_and_markup_chars() {
        for raw in ["a b", "f\t1", "f\"1", "f'1", "a<b", "a>b", "a&b"] {
            let result: Result<Id<()>, _> = Id::new(raw);
            assert!(matches!(result, Err(IdError::InvalidChar(_))), "accepted {raw:?}");
        }
    }

    #[test]
    fn fix_id_round_trips_through_display() {
        let id = FixId::new("f:0042").expect("fix id");
        assert_eq!(id.to_string(), "f:0042");
        assert_eq!(id.as_str(), "f:0042");
    }
}
