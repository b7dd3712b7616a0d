// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rstest::{fixture, rstest};

use super::{ApplyPolicy, FinalizeOutcome, FixSession, SessionError};
use crate::format::html::{parse_fragment, serialize_fragment};
use crate::model::{
    CapturedImage, LiveDocument, NodePath, Selection, StableSelector, TreePatch, FIX_ID_ATTR,
};
use crate::store::{ConversationKind, HistoryStore};

static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

struct TempDir {
    path: std::path::PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut path = env::temp_dir();
        path.push(format!("proteus-{prefix}-{}-{nanos}-{counter}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

const PAGE: &str = r#"<main><h1>Title</h1><div id="x">Hi</div><p>after</p></main>"#;
const SVG_PAGE: &str =
    r#"<main><div id="x"><svg viewBox="0 0 4 4"><rect width="4" height="4"></rect></svg>Hi</div></main>"#;

fn page_document(markup: &str) -> LiveDocument {
    LiveDocument::from_nodes(parse_fragment(markup).expect("page fixture parses"))
}

fn div_selection() -> Selection {
    Selection::of_node(NodePath::new([0, 1]), r#"<div id="x">Hi</div>"#)
}

struct SessionTestCtx {
    tmp: TempDir,
    session: FixSession,
}

impl SessionTestCtx {
    fn new(prefix: &str) -> Self {
        let tmp = TempDir::new(prefix);
        let session =
            FixSession::new(page_document(PAGE), HistoryStore::new(tmp.path().join("state")));
        Self { tmp, session }
    }
}

#[fixture]
fn ctx() -> SessionTestCtx {
    SessionTestCtx::new("session")
}

#[rstest]
fn begin_selection_tags_the_target_and_captures_its_markup(mut ctx: SessionTestCtx) {
    ctx.session.begin_selection(&div_selection()).expect("begin selection");

    let cycle = ctx.session.active_cycle().expect("cycle");
    assert_eq!(cycle.fix_id().as_str(), "f:0001");
    assert_eq!(
        cycle.selector(),
        &"#x".parse::<StableSelector>().expect("selector")
    );
    assert_eq!(cycle.original_markup(), Some(r#"<div id="x">Hi</div>"#));
    assert!(!cycle.has_pending_proposal());

    let rendered = serialize_fragment(ctx.session.document().roots());
    assert!(rendered.contains(r#"<div id="x" data-fix-id="f:0001">Hi</div>"#));
}

#[rstest]
fn a_new_selection_supersedes_the_previous_cycle(mut ctx: SessionTestCtx) {
    ctx.session.begin_selection(&div_selection()).expect("first selection");
    ctx.session.begin_selection(&div_selection()).expect("second selection");

    let rendered = serialize_fragment(ctx.session.document().roots());
    assert!(rendered.contains(r#"data-fix-id="f:0002""#));
    assert!(!rendered.contains("f:0001"));
    assert_eq!(
        ctx.session.active_cycle().expect("cycle").fix_id().as_str(),
        "f:0002"
    );
    assert!(ctx.session.take_warnings().is_empty());
}

#[rstest]
fn submit_without_a_selection_is_rejected(mut ctx: SessionTestCtx) {
    let err = ctx.session.submit("hello").unwrap_err();
    assert!(matches!(err, SessionError::SelectionMissing));
    assert!(ctx.session.history().is_empty());
}

#[rstest]
fn submit_encodes_the_fragment_and_logs_the_exchange(ctx: SessionTestCtx) {
    let mut session = FixSession::new(
        page_document(SVG_PAGE),
        HistoryStore::new(ctx.tmp.path().join("svg-state")),
    );
    let mut selection = Selection::of_node(NodePath::new([0, 0]), "<div>host copy</div>");
    selection.set_image(Some(CapturedImage::new("image/png", vec![1, 2, 3, 4])));
    session.begin_selection(&selection).expect("begin selection");

    let request = session.submit("Straighten the chart.").expect("submit");
    assert_eq!(request.prompt, "Straighten the chart.");
    let encoded = request.encoded_fragment.expect("encoded fragment");
    assert!(encoded.contains(r#"<svg-slot id="0"></svg-slot>"#));
    assert!(!encoded.contains("<svg "));
    assert!(!encoded.contains("host copy"));
    let uri = request.image_data_uri.expect("image uri");
    assert!(uri.starts_with("data:image/png;base64,"));

    let items = session.history().items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].kind, ConversationKind::User);
    assert_eq!(items[0].content, "Straighten the chart.");
    assert_eq!(items[1].kind, ConversationKind::Ai);
    assert!(items[1].is_streaming);
    assert_eq!(items[1].content, "");
}

#[rstest]
fn a_finalized_reply_applies_and_annotates_the_history(mut ctx: SessionTestCtx) {
    ctx.session.begin_selection(&div_selection()).expect("begin selection");
    let fix_id = ctx.session.active_cycle().expect("cycle").fix_id().clone();
    ctx.session.submit("Make the greeting bold.").expect("submit");
    ctx.session
        .on_chunk("Tightened it.\n\n## Fixed HTML\n\n```html\n<div id=\"x\"><b>Hi")
        .expect("first chunk");
    ctx.session.on_chunk("</b></div>\n```\n").expect("second chunk");

    let outcome = ctx.session.on_finalize().expect("finalize");
    assert_eq!(outcome, FinalizeOutcome::Applied { fix_id: fix_id.clone() });

    let rendered = serialize_fragment(ctx.session.document().roots());
    assert!(rendered.contains(r#"data-fix-id="f:0001""#));
    assert!(rendered.contains(r#"data-fix-view="fixed""#));
    assert!(rendered.contains("<b>Hi</b>"));
    assert!(ctx.session.registry().contains(&fix_id));

    let items = ctx.session.history().items();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].kind, ConversationKind::User);
    assert_eq!(items[1].kind, ConversationKind::Ai);
    assert!(!items[1].is_streaming);
    assert!(items[1].content.starts_with("Tightened it."));
    let fix = items[1].fix.as_ref().expect("fix attachment");
    assert_eq!(fix.fix_id, fix_id);
    assert_eq!(fix.original_fragment, r#"<div id="x">Hi</div>"#);
    assert_eq!(fix.fixed_fragment, r#"<div id="x"><b>Hi</b></div>"#);
    assert_eq!(items[2].kind, ConversationKind::UserMessage);
    assert!(ctx.session.take_warnings().is_empty());
}

#[rstest]
fn a_reply_without_usable_markup_applies_nothing(mut ctx: SessionTestCtx) {
    ctx.session.begin_selection(&div_selection()).expect("begin selection");
    ctx.session.submit("anything to improve?").expect("submit");
    ctx.session
        .on_chunk("The markup is already clean; no changes needed.")
        .expect("chunk");

    let outcome = ctx.session.on_finalize().expect("finalize");
    assert_eq!(outcome, FinalizeOutcome::NoFragment);
    let rendered = serialize_fragment(ctx.session.document().roots());
    assert!(rendered.contains(r#"data-fix-id="f:0001""#));
    assert!(!rendered.contains("data-fix-view"));
    assert!(ctx.session.registry().is_empty());
}

#[rstest]
fn chunks_with_no_reply_in_flight_are_warned_and_dropped(mut ctx: SessionTestCtx) {
    ctx.session.on_chunk("stray").expect("chunk");

    let warnings = ctx.session.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("no reply in flight"));
    assert!(ctx.session.history().is_empty());
}

#[rstest]
fn a_new_selection_orphans_the_inflight_stream(mut ctx: SessionTestCtx) {
    ctx.session.begin_selection(&div_selection()).expect("first selection");
    ctx.session.submit("fix it").expect("submit");
    ctx.session.on_chunk("partial answer").expect("chunk");

    ctx.session.begin_selection(&div_selection()).expect("second selection");

    let items = ctx.session.history().items();
    assert_eq!(items.len(), 2);
    assert!(!items[1].is_streaming);
    assert_eq!(items[1].content, "partial answer");
    assert!(ctx.session.registry().is_empty());
    assert_eq!(
        ctx.session.on_finalize().expect("finalize"),
        FinalizeOutcome::NoActiveStream
    );
}

#[rstest]
fn transport_errors_settle_the_reply_with_a_sanitized_item(mut ctx: SessionTestCtx) {
    ctx.session.begin_selection(&div_selection()).expect("begin selection");
    ctx.session.submit("fix it").expect("submit");
    ctx.session.on_chunk("half a rep").expect("chunk");
    ctx.session.on_error("boom\u{7}!\nconnection reset").expect("error");

    let items = ctx.session.history().items();
    assert_eq!(items.len(), 3);
    assert!(!items[1].is_streaming);
    assert_eq!(items[1].content, "half a rep");
    assert_eq!(items[2].kind, ConversationKind::Error);
    assert_eq!(items[2].content, "boom!connection reset");

    ctx.session.on_error(&"x".repeat(600)).expect("long error");
    let items = ctx.session.history().items();
    assert_eq!(items.last().expect("items").content.chars().count(), 500);
    assert_eq!(
        ctx.session.on_finalize().expect("finalize"),
        FinalizeOutcome::NoActiveStream
    );
}

#[rstest]
fn manual_confirm_parks_the_fragment_until_confirmed(ctx: SessionTestCtx) {
    let mut session = FixSession::new(
        page_document(PAGE),
        HistoryStore::new(ctx.tmp.path().join("manual-state")),
    )
    .with_policy(ApplyPolicy::ManualConfirm);

    session.begin_selection(&div_selection()).expect("begin selection");
    let fix_id = session.active_cycle().expect("cycle").fix_id().clone();
    session.submit("Make the greeting bold.").expect("submit");
    session
        .on_chunk("## Fixed HTML\n\n```html\n<div id=\"x\"><b>Hi</b></div>\n```\n")
        .expect("chunk");

    let outcome = session.on_finalize().expect("finalize");
    assert_eq!(outcome, FinalizeOutcome::Pending { fix_id: fix_id.clone() });
    assert!(session.active_cycle().expect("cycle").has_pending_proposal());
    let rendered = serialize_fragment(session.document().roots());
    assert!(!rendered.contains("data-fix-view"));

    let outcome = session.confirm_pending_fix().expect("confirm");
    assert_eq!(outcome, FinalizeOutcome::Applied { fix_id: fix_id.clone() });
    let rendered = serialize_fragment(session.document().roots());
    assert!(rendered.contains(r#"data-fix-view="fixed""#));
    assert!(session.registry().contains(&fix_id));

    let outcome = session.confirm_pending_fix().expect("second confirm");
    assert_eq!(outcome, FinalizeOutcome::NoFragment);
    let warnings = session.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("confirm ignored"));
}

#[rstest]
fn whole_document_selection_finalizes_without_apply(mut ctx: SessionTestCtx) {
    let rev_before = ctx.session.document().rev();
    ctx.session.begin_selection(&Selection::new()).expect("begin selection");
    assert!(ctx.session.active_cycle().expect("cycle").selector().is_document());

    let request = ctx.session.submit("What should change here?").expect("submit");
    assert_eq!(request.encoded_fragment, None);

    ctx.session
        .on_chunk("```html\n<main><p>rewritten</p></main>\n```\n")
        .expect("chunk");
    let outcome = ctx.session.on_finalize().expect("finalize");
    assert_eq!(outcome, FinalizeOutcome::DocumentWide);
    assert_eq!(ctx.session.document().rev(), rev_before);
    assert!(ctx.session.registry().is_empty());
}

#[rstest]
fn a_missing_tag_at_finalize_reports_an_error_item(mut ctx: SessionTestCtx) {
    ctx.session.begin_selection(&div_selection()).expect("begin selection");
    let fix_id = ctx.session.active_cycle().expect("cycle").fix_id().clone();
    ctx.session.submit("fix it").expect("submit");

    let path = ctx.session.document().find_tagged(&fix_id).expect("tagged node");
    ctx.session
        .document_mut()
        .apply_patch(TreePatch::RemoveAttr { path, name: FIX_ID_ATTR.to_owned() })
        .expect("external untag");

    ctx.session
        .on_chunk("```html\n<div id=\"x\"><b>Hi</b></div>\n```\n")
        .expect("chunk");
    let outcome = ctx.session.on_finalize().expect("finalize");
    assert_eq!(outcome, FinalizeOutcome::ApplyFailed { fix_id });

    let last = ctx.session.history().items().last().expect("items").clone();
    assert_eq!(last.kind, ConversationKind::Error);
    assert!(last.content.contains("no live node is tagged"));
    assert!(ctx.session.registry().is_empty());
}

#[rstest]
fn toggle_and_discard_route_through_the_session(mut ctx: SessionTestCtx) {
    let pristine = ctx.session.document().clone();
    ctx.session.begin_selection(&div_selection()).expect("begin selection");
    let fix_id = ctx.session.active_cycle().expect("cycle").fix_id().clone();
    ctx.session.submit("Make the greeting bold.").expect("submit");
    ctx.session
        .on_chunk("## Fixed HTML\n\n```html\n<div id=\"x\"><b>Hi</b></div>\n```\n")
        .expect("chunk");
    let outcome = ctx.session.on_finalize().expect("finalize");
    assert_eq!(outcome, FinalizeOutcome::Applied { fix_id: fix_id.clone() });

    ctx.session.toggle_fix(&fix_id).expect("toggle");
    let rendered = serialize_fragment(ctx.session.document().roots());
    assert!(rendered.contains(r#"data-fix-view="original""#));
    assert!(rendered.contains(">Show fixed<"));

    ctx.session.discard_fix(&fix_id).expect("discard");
    assert!(ctx.session.registry().is_empty());
    assert_eq!(ctx.session.document().roots(), pristine.roots());
    let last = ctx.session.history().items().last().expect("items").clone();
    assert_eq!(last.kind, ConversationKind::UserMessage);
    assert!(last.content.contains("discarded"));
    assert!(ctx.session.take_warnings().is_empty());
}
