// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use smallvec::SmallVec;

use crate::model::ids::FixId;
use crate::model::node::{Element, Node};

pub const FIX_ID_ATTR: &str = "data-fix-id";

/// Address of one node as child indexes from the document root. The first
/// segment selects among the root nodes of the fragment forest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath {
    segments: SmallVec<[usize; 8]>,
}

impl NodePath {
    pub fn root(index: usize) -> Self {
        let mut segments = SmallVec::new();
        segments.push(index);
        Self { segments }
    }

    pub fn new(segments: impl IntoIterator<Item = usize>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    pub fn segments(&self) -> &[usize] {
        &self.segments
    }

    pub fn child(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(index);
        Self { segments }
    }

    /// Path of the containing node. `None` for a root node, whose container
    /// is the document itself.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    pub fn last(&self) -> usize {
        *self.segments.last().expect("NodePath is never empty")
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// One mutation of the live tree. Every patch carries the explicit values it
/// writes; there is no implicit lookup at apply time beyond path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreePatch {
    /// Replace the node at `path` with `node`.
    Replace { path: NodePath, node: Node },
    /// Set or overwrite one attribute on the element at `path`.
    SetAttr {
        path: NodePath,
        name: String,
        value: Option<String>,
    },
    /// Remove one attribute from the element at `path`. Removing an absent
    /// attribute is not an error.
    RemoveAttr { path: NodePath, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    PathNotFound(NodePath),
    NotAnElement(NodePath),
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathNotFound(path) => write!(f, "no node at path {path}"),
            Self::NotAnElement(path) => {
                write!(f, "node at path {path} is not an element")
            }
        }
    }
}

impl std::error::Error for PatchError {}

/// The live rendered document. All mutation goes through [`apply_patch`];
/// reads never observe a half-applied change.
///
/// [`apply_patch`]: LiveDocument::apply_patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveDocument {
    roots: Vec<Node>,
    rev: u64,
}

impl LiveDocument {
    pub fn from_nodes(roots: Vec<Node>) -> Self {
        Self { roots, rev: 0 }
    }

    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    /// Monotonic revision counter, bumped once per applied patch.
    pub fn rev(&self) -> u64 {
        self.rev
    }

    pub fn node_at(&self, path: &NodePath) -> Option<&Node> {
        let mut segments = path.segments().iter();
        let mut node = self.roots.get(*segments.next()?)?;
        for &segment in segments {
            node = node.as_element()?.children().get(segment)?;
        }
        Some(node)
    }

    fn node_at_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let mut segments = path.segments().iter();
        let mut node = self.roots.get_mut(*segments.next()?)?;
        for &segment in segments {
            node = node.as_element_mut()?.children_mut().get_mut(segment)?;
        }
        Some(node)
    }

    pub fn apply_patch(&mut self, patch: TreePatch) -> Result<(), PatchError> {
        match patch {
            TreePatch::Replace { path, node } => {
                let Some(slot) = self.node_at_mut(&path) else {
                    return Err(PatchError::PathNotFound(path));
                };
                *slot = node;
            }
            TreePatch::SetAttr { path, name, value } => {
                let element = self.element_at_mut(&path)?;
                element.set_attr(name, value);
            }
            TreePatch::RemoveAttr { path, name } => {
                let element = self.element_at_mut(&path)?;
                element.remove_attr(&name);
            }
        }
        self.rev += 1;
        Ok(())
    }

    fn element_at_mut(&mut self, path: &NodePath) -> Result<&mut Element, PatchError> {
        match self.node_at_mut(path) {
            None => Err(PatchError::PathNotFound(path.clone())),
            Some(Node::Element(element)) => Ok(element),
            Some(_) => Err(PatchError::NotAnElement(path.clone())),
        }
    }

    /// First element in document order whose `id` attribute equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<NodePath> {
        self.find_element(&mut |element| element.attr("id") == Some(id))
    }

    /// First element in document order tagged with this fix id.
    pub fn find_tagged(&self, fix_id: &FixId) -> Option<NodePath> {
        self.find_element(&mut |element| element.attr(FIX_ID_ATTR) == Some(fix_id.as_str()))
    }

    fn find_element(&self, pred: &mut dyn FnMut(&Element) -> bool) -> Option<NodePath> {
        fn walk(
            node: &Node,
            path: &NodePath,
            pred: &mut dyn FnMut(&Element) -> bool,
        ) -> Option<NodePath> {
            let element = node.as_element()?;
            if pred(element) {
                return Some(path.clone());
            }
            for (index, child) in element.children().iter().enumerate() {
                if let Some(found) = walk(child, &path.child(index), pred) {
                    return Some(found);
                }
            }
            None
        }

        for (index, root) in self.roots.iter().enumerate() {
            if let Some(found) = walk(root, &NodePath::root(index), pred) {
                return Some(found);
            }
        }
        None
    }
}
