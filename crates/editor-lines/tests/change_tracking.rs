use std::sync::{Arc, Mutex};

use editor_lines::{
    ChangeKind, ChangeTracker, EditorConfig, EditorDocument, LineChangeInfo, NoBaseline,
    StaticBaselineProvider, TextBuffer, TrackerError,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn kinds(doc: &EditorDocument) -> Vec<ChangeKind> {
    doc.change_tracker()
        .unwrap()
        .changes()
        .map(|(_, info)| info.kind)
        .collect()
}

#[test]
fn test_modified_then_inserted_line_is_unsaved() {
    let provider = StaticBaselineProvider::new().with("doc.txt", "a\nb\nc");
    let mut doc = EditorDocument::new("doc.txt", "a\nx\nc", EditorConfig::default());
    doc.attach_change_tracker(&provider).unwrap();

    assert_eq!(
        kinds(&doc),
        vec![ChangeKind::None, ChangeKind::Modified, ChangeKind::None]
    );

    // Newline at the end of line 2.
    doc.insert(3, "\n").unwrap();
    let tracker = doc.change_tracker().unwrap();
    assert_eq!(tracker.get_change(3).unwrap().kind, ChangeKind::Unsaved);
    assert_eq!(tracker.line_count(), 4);
}

#[test]
fn test_deleted_baseline_line_annotates_previous_line() {
    let provider = StaticBaselineProvider::new().with("doc.txt", "a\nb");
    let mut doc = EditorDocument::new("doc.txt", "a", EditorConfig::default());
    doc.attach_change_tracker(&provider).unwrap();

    let tracker = doc.change_tracker().unwrap();
    assert_eq!(
        tracker.get_change(1).unwrap(),
        &LineChangeInfo {
            kind: ChangeKind::None,
            deleted_text_after: Some("b".to_string()),
        }
    );
    assert_eq!(
        tracker.get_change(2),
        Err(TrackerError::LineOutOfRange {
            line: 2,
            line_count: 1
        })
    );
}

#[test]
fn test_no_baseline_marks_saved_lines_separately() {
    let mut doc = EditorDocument::new("new.txt", "one\ntwo", EditorConfig::default());
    doc.attach_change_tracker(&NoBaseline).unwrap();

    doc.insert(0, "zero ").unwrap();
    assert_eq!(kinds(&doc), vec![ChangeKind::Unsaved, ChangeKind::None]);

    doc.mark_saved(&NoBaseline).unwrap();
    assert_eq!(kinds(&doc), vec![ChangeKind::Saved, ChangeKind::None]);

    doc.insert(doc.buffer().len_chars(), "!").unwrap();
    assert_eq!(kinds(&doc), vec![ChangeKind::Saved, ChangeKind::Unsaved]);
}

#[test]
fn test_crlf_baseline_matches_lf_buffer() {
    let provider = StaticBaselineProvider::new().with("win.txt", "a\r\nb\r\nc");
    let mut doc = EditorDocument::new("win.txt", "a\r\nb\r\nc", EditorConfig::default());
    doc.attach_change_tracker(&provider).unwrap();
    assert_eq!(doc.change_tracker().unwrap().changed_line_count(), 0);
    assert_eq!(doc.text_for_saving(), "a\r\nb\r\nc");
}

#[test]
fn test_one_notification_per_edit() {
    let mut doc = EditorDocument::new("n.txt", "a\nb\nc\nd", EditorConfig::default());
    doc.attach_change_tracker(&NoBaseline).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    doc.change_tracker_mut()
        .unwrap()
        .subscribe(move |event| seen_clone.lock().unwrap().push(event.version));

    // Removes two line breaks and inserts three: many line events, one notification.
    doc.replace(1, 4, "\n1\n2\n").unwrap();
    doc.insert(0, "x").unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[test]
fn test_random_edits_keep_records_aligned() {
    let mut rng = StdRng::seed_from_u64(7);
    let initial: String = (0..50).map(|i| format!("line {i}\n")).collect();
    let provider = StaticBaselineProvider::new().with("r.txt", initial.as_str());
    let mut doc = EditorDocument::new("r.txt", &initial, EditorConfig::default());
    doc.attach_change_tracker(&provider).unwrap();

    let fragments = ["", "x", "\n", "ab\ncd", "\n\n", "line 3\n"];
    for step in 0..500 {
        let len = doc.buffer().len_chars();
        let offset = rng.gen_range(0..=len);
        let remove = rng.gen_range(0..=(len - offset).min(8));
        let text = fragments[rng.gen_range(0..fragments.len())];
        doc.replace(offset, remove, text).unwrap();

        let tracker = doc.change_tracker().unwrap();
        assert_eq!(
            tracker.line_count(),
            doc.buffer().line_count(),
            "records out of sync after step {step}"
        );

        if step % 100 == 99 {
            doc.mark_saved(&provider).unwrap();
        }
    }

    // Re-saving against the baseline classifies every line from a fresh diff.
    doc.mark_saved(&provider).unwrap();
    let tracker = doc.change_tracker().unwrap();
    assert!(
        tracker
            .changes()
            .all(|(_, info)| info.kind != ChangeKind::Unsaved)
    );
}

#[test]
fn test_identical_text_after_round_trip_edit_has_no_changes() {
    let text = "alpha\nbeta\ngamma";
    let provider = StaticBaselineProvider::new().with("t.txt", text);
    let mut doc = EditorDocument::new("t.txt", text, EditorConfig::default());
    doc.attach_change_tracker(&provider).unwrap();

    doc.insert(6, "new\n").unwrap();
    doc.remove(6, 4).unwrap();
    assert!(doc.change_tracker().unwrap().changed_line_count() > 0);

    doc.mark_saved(&provider).unwrap();
    assert_eq!(doc.change_tracker().unwrap().changed_line_count(), 0);
}

#[test]
fn test_standalone_tracker_with_line_events() {
    let mut buffer = TextBuffer::from_text("a\nb");
    let mut tracker = ChangeTracker::new();
    tracker.initialize_with_baseline(&buffer, Some("a\nb")).unwrap();

    let edit = buffer.insert(1, "\nc").unwrap();
    tracker.apply_events(&edit.events, &buffer).unwrap();
    let kinds: Vec<ChangeKind> = tracker.changes().map(|(_, info)| info.kind).collect();
    assert_eq!(
        kinds,
        vec![ChangeKind::Unsaved, ChangeKind::Unsaved, ChangeKind::None]
    );

    let diff = tracker.get_diffs_by_line(2, &buffer).unwrap();
    assert_eq!(diff.baseline.as_deref(), Some("b"));
    assert_eq!(diff.current, "c");
}
