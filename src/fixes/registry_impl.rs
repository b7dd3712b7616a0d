// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Lifecycle implementation for [`FixRegistry`]. Keeps `fixes::mod` focused
/// on the public record/outcome types and error reporting.
impl FixRegistry {
    /// Replaces the live node tagged `fix_id` with a wrapper displaying the
    /// fixed fragment, and records the fix.
    ///
    /// Validation runs before any mutation: if the tagged node is missing or
    /// either fragment is unusable, the tree is left untouched. The original
    /// fragment must parse to exactly one root so `discard` can reinsert it
    /// at the wrapper's position.
    pub fn apply(
        &mut self,
        document: &mut LiveDocument,
        fix_id: FixId,
        original_markup: impl Into<String>,
        fixed_markup: impl Into<String>,
        selector: StableSelector,
    ) -> Result<(), FixError> {
        let original_markup = original_markup.into();
        let fixed_markup = fixed_markup.into();

        if self.records.contains_key(&fix_id) {
            return Err(FixError::AlreadyApplied { fix_id });
        }
        let Some(path) = document.find_tagged(&fix_id) else {
            return Err(FixError::NodeNotFound { fix_id });
        };

        let original_roots =
            parse_fragment(&original_markup).map_err(|source| FixError::FragmentParse {
                fix_id: fix_id.clone(),
                side: FixSide::Original,
                source,
            })?;
        if original_roots.is_empty() {
            return Err(FixError::EmptyFragment { fix_id, side: FixSide::Original });
        }
        if original_roots.len() > 1 {
            return Err(FixError::MultiRootedOriginal { fix_id, roots: original_roots.len() });
        }

        let fixed_roots =
            parse_fragment(&fixed_markup).map_err(|source| FixError::FragmentParse {
                fix_id: fix_id.clone(),
                side: FixSide::Fixed,
                source,
            })?;
        if fixed_roots.is_empty() {
            return Err(FixError::EmptyFragment { fix_id, side: FixSide::Fixed });
        }

        let wrapper = build_wrapper(&fix_id, fixed_roots, true);
        document
            .apply_patch(TreePatch::Replace { path, node: wrapper })
            .map_err(|source| FixError::Patch { fix_id: fix_id.clone(), source })?;

        self.records.insert(
            fix_id.clone(),
            FixRecord {
                fix_id,
                original_markup,
                fixed_markup,
                showing_fixed: true,
                selector,
            },
        );
        Ok(())
    }

    /// Swaps the wrapper's displayed content between the original and fixed
    /// fragment and flips the toggle label.
    ///
    /// If the side being swapped in no longer parses, the fixed side is
    /// shown instead and the anomaly comes back as a warning; the wrapper is
    /// never left empty. An unknown fix id or an externally removed wrapper
    /// is a warned no-op.
    pub fn toggle(
        &mut self,
        document: &mut LiveDocument,
        fix_id: &FixId,
    ) -> Result<FixOutcome, FixError> {
        let mut outcome = FixOutcome::default();
        let Some(record) = self.records.get(fix_id) else {
            outcome.warnings.push(format!("toggle ignored: no applied fix '{fix_id}'"));
            return Ok(outcome);
        };
        let Some(path) = document.find_tagged(fix_id) else {
            self.records.remove(fix_id);
            outcome.warnings.push(format!(
                "wrapper for fix '{fix_id}' is gone from the document; dropped its record"
            ));
            return Ok(outcome);
        };

        let want_fixed = !record.showing_fixed;
        let (content, show_fixed) = if want_fixed {
            match parse_displayable(&record.fixed_markup) {
                Ok(nodes) => (nodes, true),
                Err(detail) => {
                    outcome.warnings.push(format!(
                        "fixed fragment of fix '{fix_id}' no longer parses ({detail}); view left unchanged"
                    ));
                    return Ok(outcome);
                }
            }
        } else {
            match parse_displayable(&record.original_markup) {
                Ok(nodes) => (nodes, false),
                Err(detail) => {
                    outcome.warnings.push(format!(
                        "original fragment of fix '{fix_id}' no longer parses ({detail}); keeping the fixed view"
                    ));
                    match parse_displayable(&record.fixed_markup) {
                        Ok(nodes) => (nodes, true),
                        Err(detail) => {
                            outcome.warnings.push(format!(
                                "fixed fragment of fix '{fix_id}' no longer parses either ({detail}); view left unchanged"
                            ));
                            return Ok(outcome);
                        }
                    }
                }
            }
        };

        let wrapper = build_wrapper(fix_id, content, show_fixed);
        document
            .apply_patch(TreePatch::Replace { path, node: wrapper })
            .map_err(|source| FixError::Patch { fix_id: fix_id.clone(), source })?;
        if let Some(record) = self.records.get_mut(fix_id) {
            record.showing_fixed = show_fixed;
        }
        Ok(outcome)
    }

    /// Removes the wrapper, reinserts the original node at its position and
    /// deletes the record.
    ///
    /// A second discard of the same id is a warned no-op. If the wrapper is
    /// already gone (external drift) the record is dropped without touching
    /// the tree.
    pub fn discard(
        &mut self,
        document: &mut LiveDocument,
        fix_id: &FixId,
    ) -> Result<FixOutcome, FixError> {
        let mut outcome = FixOutcome::default();
        let Some(record) = self.records.get(fix_id) else {
            outcome.warnings.push(format!("discard ignored: no applied fix '{fix_id}'"));
            return Ok(outcome);
        };
        let Some(path) = document.find_tagged(fix_id) else {
            self.records.remove(fix_id);
            outcome.warnings.push(format!(
                "wrapper for fix '{fix_id}' is gone from the document; dropped its record"
            ));
            return Ok(outcome);
        };

        let mut roots =
            parse_fragment(&record.original_markup).map_err(|source| FixError::FragmentParse {
                fix_id: fix_id.clone(),
                side: FixSide::Original,
                source,
            })?;
        if roots.len() != 1 {
            return Err(match roots.len() {
                0 => FixError::EmptyFragment { fix_id: fix_id.clone(), side: FixSide::Original },
                n => FixError::MultiRootedOriginal { fix_id: fix_id.clone(), roots: n },
            });
        }
        let original = roots.remove(0);

        document
            .apply_patch(TreePatch::Replace { path, node: original })
            .map_err(|source| FixError::Patch { fix_id: fix_id.clone(), source })?;
        self.records.remove(fix_id);
        Ok(outcome)
    }
}

/// The wrapper element that takes the original node's place while a fix is
/// applied. Carries the fix id tag, the displayed side and the two controls.
fn build_wrapper(fix_id: &FixId, content: Vec<Node>, showing_fixed: bool) -> Node {
    let mut wrapper = Element::new("div");
    wrapper.set_attr(FIX_ID_ATTR, Some(fix_id.as_str().to_owned()));
    wrapper.set_attr(FIX_VIEW_ATTR, Some(view_name(showing_fixed).to_owned()));
    for node in content {
        wrapper.push_child(node);
    }
    wrapper.push_child(control_span(showing_fixed));
    Node::Element(wrapper)
}

fn control_span(showing_fixed: bool) -> Node {
    let mut span = Element::new("span");
    span.set_attr(FIX_CONTROLS_ATTR, None);
    span.push_child(control_button("discard", DISCARD_LABEL));
    let toggle_label = if showing_fixed { SHOW_ORIGINAL_LABEL } else { SHOW_FIXED_LABEL };
    span.push_child(control_button("toggle", toggle_label));
    Node::Element(span)
}

fn control_button(action: &str, label: &str) -> Node {
    let mut button = Element::new("button");
    button.set_attr(FIX_ACTION_ATTR, Some(action.to_owned()));
    button.push_child(Node::text(label));
    Node::Element(button)
}

fn view_name(showing_fixed: bool) -> &'static str {
    if showing_fixed {
        VIEW_FIXED
    } else {
        VIEW_ORIGINAL
    }
}

/// Parses a stored side for display. Returns a human-readable reason when
/// the markup cannot be shown, for warning text on the degraded path.
fn parse_displayable(markup: &str) -> Result<Vec<Node>, String> {
    match parse_fragment(markup) {
        Ok(nodes) if nodes.is_empty() => Err("empty fragment".to_owned()),
        Ok(nodes) => Ok(nodes),
        Err(err) => Err(err.to_string()),
    }
}
