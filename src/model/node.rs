// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use smallvec::SmallVec;
use smol_str::SmolStr;

/// One attribute on an element. `value == None` models a bare boolean
/// attribute (`<button disabled>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: SmolStr,
    value: Option<String>,
}

impl Attribute {
    /// Names are canonicalized to ASCII lowercase.
    pub fn new(name: impl AsRef<str>, value: Option<String>) -> Self {
        Self {
            name: canonical_name(name.as_ref()),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: Option<String>) {
        self.value = value;
    }
}

pub type AttributeList = SmallVec<[Attribute; 4]>;

/// An element in a fragment tree. Tag names are canonical ASCII lowercase;
/// attribute order is preserved as parsed or inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: SmolStr,
    attributes: AttributeList,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: canonical_name(name.as_ref()),
            attributes: AttributeList::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeList {
        &mut self.attributes
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Returns the value of the first attribute with this (lowercased) name.
    /// A present-but-bare attribute yields `Some("")`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        let name = canonical_name(name);
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value().unwrap_or(""))
    }

    pub fn has_attr(&self, name: &str) -> bool {
        let name = canonical_name(name);
        self.attributes.iter().any(|attr| attr.name == name)
    }

    /// Sets or replaces the first attribute with this name, preserving its
    /// position; appends otherwise.
    pub fn set_attr(&mut self, name: impl AsRef<str>, value: Option<String>) {
        let canonical = canonical_name(name.as_ref());
        if let Some(attr) = self.attributes.iter_mut().find(|attr| attr.name == canonical) {
            attr.value = value;
            return;
        }
        self.attributes.push(Attribute {
            name: canonical,
            value,
        });
    }

    /// Removes every attribute with this name; reports whether any existed.
    pub fn remove_attr(&mut self, name: &str) -> bool {
        let name = canonical_name(name);
        let before = self.attributes.len();
        self.attributes.retain(|attr| attr.name != name);
        self.attributes.len() != before
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn element(name: impl AsRef<str>) -> Self {
        Self::Element(Element::new(name))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element_named(&self, name: &str) -> bool {
        self.as_element()
            .is_some_and(|element| element.name() == canonical_name(name).as_str())
    }

    /// A node carries content when it is an element or when its text is not
    /// pure whitespace. Comments never count as content.
    pub fn carries_content(&self) -> bool {
        match self {
            Self::Element(_) => true,
            Self::Text(text) => !text.trim().is_empty(),
            Self::Comment(_) => false,
        }
    }

    /// Concatenated text content of the subtree, in document order.
    pub fn text_content(&self) -> String {
        fn collect(node: &Node, out: &mut String) {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => {
                    for child in element.children() {
                        collect(child, out);
                    }
                }
                Node::Comment(_) => {}
            }
        }

        let mut out = String::new();
        collect(self, &mut out);
        out
    }
}

pub(crate) fn canonical_name(raw: &str) -> SmolStr {
    if raw.bytes().any(|b| b.is_ascii_uppercase()) {
        SmolStr::from(raw.to_ascii_lowercase())
    } else {
        SmolStr::from(raw)
    }
}
