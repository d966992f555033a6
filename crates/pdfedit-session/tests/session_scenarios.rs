//! Edit session scenarios: history around tree and edit actions, merge and split
//!
//! Run with: cargo test -p pdfedit-session --test session_scenarios

#[path = "../../pdfedit-core/tests/common/pdfs.rs"]
mod pdfs;

use pdfedit_core::{Rect, TextAnnotation, TextPatch, TextStyle};
use pdfedit_session::{EditSession, SessionConfig, SessionError, ROOT};
use pdfs::{init_tracing, page_count, page_strings, synthetic_pdf};
use pretty_assertions::assert_eq;

fn note(page: u32, text: &str) -> TextAnnotation {
    TextAnnotation {
        text: text.into(),
        ..TextAnnotation::placed(page, 0.1, 0.1, TextStyle::default())
    }
}

#[test]
fn upload_undo_redo_restores_identical_payload() {
    init_tracing();
    let mut session = EditSession::default();
    let original = synthetic_pdf(2, "Doc");

    let id = session.upload(ROOT, "doc.pdf", original.clone()).unwrap();
    let before = session.workspace().bytes(id).unwrap();

    assert!(session.undo());
    assert!(!session.tree().contains(id));
    assert!(session.tree().children(ROOT).unwrap().is_empty());

    assert!(session.redo());
    assert!(session.tree().contains(id));
    let after = session.workspace().bytes(id).unwrap();
    assert_eq!(after.len(), before.len());
    assert_eq!(&after[..], &original[..]);
}

#[test]
fn failed_upload_leaves_history_alone() {
    let mut session = EditSession::default();
    let err = session.upload(ROOT, "bad.pdf", b"not a pdf".to_vec());
    assert!(matches!(err, Err(SessionError::Engine(_))));
    assert!(!session.can_undo());
    assert!(session.tree().is_empty());
}

#[test]
fn every_action_captures_once() {
    let mut session = EditSession::default();
    let folder = session.create_folder(ROOT, "Inbox").unwrap();
    let doc = session.upload(folder, "a.pdf", synthetic_pdf(1, "A")).unwrap();
    session.rename(doc, "renamed.pdf").unwrap();
    session.move_node(doc, ROOT).unwrap();
    session.rotate_page(doc, 1, 90).unwrap();
    let note_id = session.add_annotation(doc, note(1, "hi")).unwrap();
    session
        .update_annotation(doc, note_id, |a| a.text = "hello".into())
        .unwrap();
    session.remove_annotation(doc, note_id).unwrap();
    assert_eq!(session.history().len(), 8);

    // Walk all the way back to the empty workspace
    let mut undos = 0;
    while session.undo() {
        undos += 1;
    }
    assert_eq!(undos, 8);
    assert!(session.tree().is_empty());
}

#[test]
fn undo_restores_previous_rotation() {
    let mut session = EditSession::default();
    let doc = session.upload(ROOT, "a.pdf", synthetic_pdf(2, "A")).unwrap();
    session.rotate_page(doc, 2, 90).unwrap();
    session.rotate_page(doc, 2, 90).unwrap();
    assert_eq!(session.workspace().rotations(doc).unwrap().degrees(2), 180);

    session.undo();
    assert_eq!(session.workspace().rotations(doc).unwrap().degrees(2), 90);
    session.redo();
    assert_eq!(session.workspace().rotations(doc).unwrap().degrees(2), 180);
}

#[test]
fn edits_on_missing_pages_are_rejected() {
    let mut session = EditSession::default();
    let doc = session.upload(ROOT, "a.pdf", synthetic_pdf(1, "A")).unwrap();
    assert!(matches!(
        session.add_annotation(doc, note(3, "x")),
        Err(SessionError::PageOutOfRange { page: 3, page_count: 1, .. })
    ));
    assert!(matches!(
        session.rotate_page(doc, 0, 90),
        Err(SessionError::PageOutOfRange { page: 0, .. })
    ));
    assert!(matches!(
        session.remove_patch(doc, 99),
        Err(SessionError::EntityNotFound { id: 99, .. })
    ));
    assert_eq!(session.history().len(), 1);
}

#[test]
fn delete_then_undo_brings_back_edits() {
    let mut session = EditSession::default();
    let folder = session.create_folder(ROOT, "Work").unwrap();
    let doc = session.upload(folder, "a.pdf", synthetic_pdf(1, "A")).unwrap();
    session.add_annotation(doc, note(1, "keep me")).unwrap();

    let removed = session.delete(folder).unwrap();
    assert_eq!(removed, vec![folder, doc]);
    assert!(session.workspace().annotations(doc).is_none());
    assert!(session.workspace().payloads().is_empty());

    session.undo();
    assert_eq!(session.workspace().annotations(doc).unwrap().len(), 1);
    assert_eq!(page_strings(&session.export(doc).unwrap(), 1), vec!["A-Page-1", "keep me"]);
}

#[test]
fn merge_bakes_edits_of_each_input() {
    init_tracing();
    let mut session = EditSession::default();
    let a = session.upload(ROOT, "a.pdf", synthetic_pdf(1, "A")).unwrap();
    let b = session.upload(ROOT, "b.pdf", synthetic_pdf(2, "B")).unwrap();
    session.add_annotation(b, note(2, "signed")).unwrap();

    let merged = session.merge(&[a, b], ROOT, "merged.pdf").unwrap();
    assert_eq!(session.workspace().page_count(merged).unwrap(), 3);

    let bytes = session.workspace().bytes(merged).unwrap();
    assert_eq!(page_strings(&bytes, 1), vec!["A-Page-1"]);
    assert_eq!(page_strings(&bytes, 3), vec!["B-Page-2", "signed"]);

    // Inputs are untouched
    assert!(session.tree().contains(a));
    assert_eq!(session.workspace().annotations(b).unwrap().len(), 1);
}

#[test]
fn merge_of_one_document_fails_cleanly() {
    let mut session = EditSession::default();
    let a = session.upload(ROOT, "a.pdf", synthetic_pdf(1, "A")).unwrap();
    assert!(matches!(
        session.merge(&[a], ROOT, "merged.pdf"),
        Err(SessionError::Engine(_))
    ));
    assert_eq!(session.tree().children(ROOT).unwrap(), &[a]);
    assert_eq!(session.history().len(), 1);
}

#[test]
fn added_patches_belong_to_their_document() {
    let mut session = EditSession::default();
    let a = session.upload(ROOT, "a.pdf", synthetic_pdf(1, "A")).unwrap();
    let b = session.upload(ROOT, "b.pdf", synthetic_pdf(1, "B")).unwrap();
    let patch = TextPatch::detected(
        1,
        Rect::new(0.1, 0.1, 0.2, 0.05),
        "B-Page-1",
        TextStyle::default(),
    );
    assert_eq!(patch.doc_id, 0);

    let id = session.add_patch(b, patch).unwrap();
    let stored = session.workspace().annotations(b).unwrap().patch(id).unwrap();
    assert_eq!(stored.doc_id, b);

    // Copying the edits elsewhere rebinds them to the target
    let json = session.export_annotations(b).unwrap();
    session.import_annotations(a, &json).unwrap();
    let copied = session.workspace().annotations(a).unwrap();
    assert_eq!(copied.patch(id).unwrap().doc_id, a);
}

#[test]
fn split_places_pages_in_new_folder() {
    let mut session = EditSession::default();
    let doc = session.upload(ROOT, "report.pdf", synthetic_pdf(3, "R")).unwrap();
    let mut patch = TextPatch::detected(
        2,
        Rect::new(100.0 / 612.0, 80.0 / 792.0, 80.0 / 612.0, 14.0 / 792.0),
        "R-Page-2",
        TextStyle::default(),
    );
    patch.new_text = "Fixed".into();
    session.add_patch(doc, patch).unwrap();

    let (folder, pages) = session.split(doc).unwrap();
    assert_eq!(session.tree().get(folder).unwrap().name, "report (split)");
    assert_eq!(pages.len(), 3);
    assert_eq!(session.tree().get(pages[1]).unwrap().name, "report-page-2.pdf");

    for (i, &page_doc) in pages.iter().enumerate() {
        let bytes = session.workspace().bytes(page_doc).unwrap();
        assert_eq!(page_count(&bytes), 1);
        let strings = page_strings(&bytes, 1);
        if i == 1 {
            assert_eq!(strings, vec!["R-Page-2", "Fixed"]);
        } else {
            assert_eq!(strings, vec![format!("R-Page-{}", i + 1)]);
        }
    }

    // One undo removes the folder and all its pages
    session.undo();
    assert!(!session.tree().contains(folder));
    assert!(pages.iter().all(|&p| !session.workspace().payloads().contains(p)));
}

#[test]
fn exit_edit_mode_prunes_with_one_capture() {
    let mut session = EditSession::default();
    let doc = session.upload(ROOT, "a.pdf", synthetic_pdf(1, "A")).unwrap();
    session
        .add_annotation(doc, TextAnnotation::placed(1, 0.5, 0.5, TextStyle::default()))
        .unwrap();
    session.add_annotation(doc, note(1, "real")).unwrap();
    let history = session.history().len();

    assert_eq!(session.exit_edit_mode(doc).unwrap(), 1);
    assert_eq!(session.history().len(), history + 1);
    assert_eq!(session.workspace().annotations(doc).unwrap().len(), 1);

    // Nothing left to prune: no new history entry
    assert_eq!(session.exit_edit_mode(doc).unwrap(), 0);
    assert_eq!(session.history().len(), history + 1);
}

#[test]
fn annotations_round_trip_through_json() {
    let mut session = EditSession::default();
    let a = session.upload(ROOT, "a.pdf", synthetic_pdf(1, "A")).unwrap();
    let b = session.upload(ROOT, "b.pdf", synthetic_pdf(1, "B")).unwrap();
    session.add_annotation(a, note(1, "copied")).unwrap();

    let json = session.export_annotations(a).unwrap();
    session.import_annotations(b, &json).unwrap();
    assert_eq!(page_strings(&session.export(b).unwrap(), 1), vec!["B-Page-1", "copied"]);

    session.undo();
    assert!(session.workspace().annotations(b).is_none());
}

#[test]
fn overlay_follows_rotation() {
    let mut session = EditSession::default();
    let doc = session.upload(ROOT, "a.pdf", synthetic_pdf(1, "A")).unwrap();
    assert!(session.overlay(doc, 1).unwrap().is_empty());

    let id = session
        .add_image(
            doc,
            pdfedit_core::ImageAnnotation::new(1, Rect::new(0.1, 0.2, 0.3, 0.4), vec![0u8]),
        )
        .unwrap();
    let upright = session.overlay(doc, 1).unwrap();
    assert_eq!(upright.len(), 1);
    assert_eq!(upright[0].id, id);
    assert!(upright[0].rect.approx_eq(&Rect::new(0.1, 0.2, 0.3, 0.4), 1e-9));

    session.rotate_page(doc, 1, 90).unwrap();
    let rotated = session.overlay(doc, 1).unwrap();
    assert!(rotated[0].rect.approx_eq(&Rect::new(0.4, 0.1, 0.4, 0.3), 1e-9));
}

#[test]
fn small_history_limit_bounds_undo() {
    let mut session = EditSession::new(SessionConfig {
        history_limit: 2,
        ..SessionConfig::default()
    });
    for name in ["a", "b", "c", "d"] {
        session.create_folder(ROOT, name).unwrap();
    }
    assert_eq!(session.history().len(), 2);
    while session.undo() {}
    assert_eq!(session.tree().children(ROOT).unwrap().len(), 2);
}
