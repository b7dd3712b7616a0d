// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Lifecycle operations of [`FixSession`], split out of `session::mod` to
/// keep the module root focused on the public types.
impl FixSession {
    /// Starts a fix cycle for `selection`.
    ///
    /// A reply still streaming for the previous cycle settles with
    /// whatever content has arrived and is never extracted. The previous
    /// cycle's pending proposal is dropped and, when its fix never
    /// applied, its tag comes off the tree.
    pub fn begin_selection(&mut self, selection: &Selection) -> Result<(), SessionError> {
        self.history.finalize()?;
        self.invalidate_cycle()?;

        let selector = StableSelector::generate(&self.document, selection.target());
        let fix_id = self.allocate_fix_id();

        let mut original_markup = selection.fragment_markup().map(str::to_owned);
        if !selector.is_document() {
            if let Some(path) = selection.target() {
                // The tree's own serialization wins over the host's copy;
                // discard reinserts exactly this markup. Captured before
                // the tag below so the fragment stays untagged.
                if let Some(node) = self.document.node_at(path) {
                    original_markup = Some(serialize_node(node));
                }
                self.document.apply_patch(TreePatch::SetAttr {
                    path: path.clone(),
                    name: FIX_ID_ATTR.to_owned(),
                    value: Some(fix_id.as_str().to_owned()),
                })?;
            }
        }

        self.cycle = Some(FixCycle {
            fix_id,
            selector,
            original_markup,
            image: selection.image().cloned(),
            placeholders: PlaceholderMap::new(),
            proposal: None,
        });
        Ok(())
    }

    /// Clears the active cycle without starting a new one. The host calls
    /// this when its fix panel is dismissed.
    pub fn reset_selection(&mut self) -> Result<(), SessionError> {
        self.invalidate_cycle()
    }

    /// Builds the outbound request for `prompt` and records both sides of
    /// the exchange: the user item and an empty streaming reply.
    pub fn submit(&mut self, prompt: &str) -> Result<TransportRequest, SessionError> {
        let Some(cycle) = self.cycle.as_mut() else {
            return Err(SessionError::SelectionMissing);
        };

        let mut encoded_fragment = None;
        if let Some(markup) = cycle.original_markup.as_deref() {
            let (encoded, placeholders) = encode(markup);
            cycle.placeholders = placeholders;
            encoded_fragment = Some(encoded);
        }
        let image_data_uri = cycle.image.as_ref().map(CapturedImage::data_uri);

        self.history
            .append(ConversationItem::new(ConversationKind::User, prompt))?;
        self.history
            .append(ConversationItem::new(ConversationKind::Ai, ""))?;

        Ok(TransportRequest {
            image_data_uri,
            prompt: prompt.to_owned(),
            encoded_fragment,
        })
    }

    /// Feeds one streamed chunk into the active reply.
    pub fn on_chunk(&mut self, chunk: &str) -> Result<(), SessionError> {
        if let StreamUpdate::NoActiveItem = self.history.update_streaming(chunk)? {
            self.warnings
                .push("a stream chunk arrived with no reply in flight; dropped".to_owned());
        }
        Ok(())
    }

    /// Records a transport failure. A streaming reply settles with its
    /// partial content and is never extracted.
    pub fn on_error(&mut self, message: &str) -> Result<(), SessionError> {
        self.history.finalize()?;
        self.history.append(ConversationItem::new(
            ConversationKind::Error,
            sanitize_error(message),
        ))?;
        Ok(())
    }

    /// Settles the streaming reply and runs extraction over its content.
    ///
    /// Under [`ApplyPolicy::OnFinalize`] a usable fragment goes straight
    /// into the live tree; under [`ApplyPolicy::ManualConfirm`] it is
    /// parked for [`FixSession::confirm_pending_fix`]. An apply failure
    /// lands in the history as an error item instead of bubbling up.
    pub fn on_finalize(&mut self) -> Result<FinalizeOutcome, SessionError> {
        let Some(content) = self.history.finalize()? else {
            return Ok(FinalizeOutcome::NoActiveStream);
        };
        let Some(cycle) = self.cycle.as_ref() else {
            return Ok(FinalizeOutcome::NoFragment);
        };
        let Some(fragment) = extract(&content, &cycle.placeholders) else {
            return Ok(FinalizeOutcome::NoFragment);
        };

        let fix_id = cycle.fix_id.clone();
        let selector = cycle.selector.clone();
        let original = cycle.original_markup.clone();
        let unmatched = fragment.unmatched().to_vec();
        let fixed = fragment.into_markup();
        for id in unmatched {
            self.warnings
                .push(format!("reply referenced unknown placeholder id {id}"));
        }

        if selector.is_document() {
            return Ok(FinalizeOutcome::DocumentWide);
        }
        let Some(original) = original else {
            return Ok(FinalizeOutcome::DocumentWide);
        };

        match self.policy {
            ApplyPolicy::OnFinalize => self.apply_fix(fix_id, original, fixed, selector),
            ApplyPolicy::ManualConfirm => {
                if let Some(cycle) = self.cycle.as_mut() {
                    cycle.proposal = Some(fixed);
                }
                Ok(FinalizeOutcome::Pending { fix_id })
            }
        }
    }

    /// Applies the proposal parked by a finalize under
    /// [`ApplyPolicy::ManualConfirm`].
    pub fn confirm_pending_fix(&mut self) -> Result<FinalizeOutcome, SessionError> {
        let proposal = self.cycle.as_mut().and_then(|cycle| cycle.proposal.take());
        let Some(fixed) = proposal else {
            self.warnings
                .push("confirm ignored: no fix proposal is pending".to_owned());
            return Ok(FinalizeOutcome::NoFragment);
        };
        let Some(cycle) = self.cycle.as_ref() else {
            return Ok(FinalizeOutcome::NoFragment);
        };

        let fix_id = cycle.fix_id.clone();
        let selector = cycle.selector.clone();
        let Some(original) = cycle.original_markup.clone() else {
            return Ok(FinalizeOutcome::DocumentWide);
        };
        self.apply_fix(fix_id, original, fixed, selector)
    }

    /// Swaps the displayed side of an applied fix.
    pub fn toggle_fix(&mut self, fix_id: &FixId) -> Result<(), SessionError> {
        let outcome = self.registry.toggle(&mut self.document, fix_id)?;
        self.warnings.extend(outcome.warnings);
        Ok(())
    }

    /// Puts the original markup back and forgets the fix.
    pub fn discard_fix(&mut self, fix_id: &FixId) -> Result<(), SessionError> {
        let outcome = self.registry.discard(&mut self.document, fix_id)?;
        let discarded_cleanly = outcome.warnings.is_empty();
        self.warnings.extend(outcome.warnings);
        if discarded_cleanly {
            self.history.append(ConversationItem::new(
                ConversationKind::UserMessage,
                "Fix discarded; the original markup is back.",
            ))?;
        }
        Ok(())
    }

    /// Replays the persisted history into memory and returns it.
    pub fn load_history(&mut self) -> Result<&[ConversationItem], SessionError> {
        Ok(self.history.load()?)
    }

    pub fn clear_history(&mut self) -> Result<(), SessionError> {
        Ok(self.history.clear()?)
    }

    fn allocate_fix_id(&mut self) -> FixId {
        let fix_id = FixId::new(format!("f:{:04}", self.next_fix_number))
            .expect("counter-generated fix id is valid");
        self.next_fix_number += 1;
        fix_id
    }

    /// Drops the active cycle. A tag left by a never-applied fix comes off
    /// the tree; an applied fix keeps its wrapper and registry record.
    fn invalidate_cycle(&mut self) -> Result<(), SessionError> {
        let Some(cycle) = self.cycle.take() else {
            return Ok(());
        };
        if cycle.proposal.is_some() {
            self.warnings
                .push(format!("pending proposal for fix '{}' was dropped", cycle.fix_id));
        }
        if !self.registry.contains(&cycle.fix_id) {
            if let Some(path) = self.document.find_tagged(&cycle.fix_id) {
                self.document.apply_patch(TreePatch::RemoveAttr {
                    path,
                    name: FIX_ID_ATTR.to_owned(),
                })?;
            }
        }
        Ok(())
    }

    fn apply_fix(
        &mut self,
        fix_id: FixId,
        original: String,
        fixed: String,
        selector: StableSelector,
    ) -> Result<FinalizeOutcome, SessionError> {
        match self.registry.apply(
            &mut self.document,
            fix_id.clone(),
            original.clone(),
            fixed.clone(),
            selector,
        ) {
            Ok(()) => {
                self.history.attach_fix(FixAttachment {
                    original_fragment: original,
                    fixed_fragment: fixed,
                    fix_id: fix_id.clone(),
                })?;
                self.history.append(ConversationItem::new(
                    ConversationKind::UserMessage,
                    "Fix applied. Toggle or discard it from the controls.",
                ))?;
                Ok(FinalizeOutcome::Applied { fix_id })
            }
            Err(err) => {
                self.history.append(ConversationItem::new(
                    ConversationKind::Error,
                    format!("could not apply the fix: {err}"),
                ))?;
                Ok(FinalizeOutcome::ApplyFailed { fix_id })
            }
        }
    }
}

const ERROR_MESSAGE_MAX_CHARS: usize = 500;

/// Strips control characters and caps the length of a transport error
/// before it becomes history content.
fn sanitize_error(message: &str) -> String {
    let cleaned: String = message
        .chars()
        .filter(|ch| !ch.is_control())
        .take(ERROR_MESSAGE_MAX_CHARS)
        .collect();
    if cleaned.trim().is_empty() {
        "the transport reported an error without a message".to_owned()
    } else {
        cleaned
    }
}
