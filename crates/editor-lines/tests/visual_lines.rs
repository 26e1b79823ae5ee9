use std::cell::Cell;

use editor_lines::{
    BuildContext, CaretDirection, CaretMode, EditorConfig, EditorDocument, ElementGenerator,
    ElementKind, FoldEvent, GeneratedElement, GeneratedKind, LayoutConfig, LayoutError,
    StyleSpan, StyleTransformer, TextBuffer, VisualLineBuilder,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

/// Zero-length marker at a fixed document offset, counting constructions.
struct Bookmark {
    offset: usize,
    built: Cell<usize>,
}

impl Bookmark {
    fn at(offset: usize) -> Self {
        Self {
            offset,
            built: Cell::new(0),
        }
    }
}

impl ElementGenerator for Bookmark {
    fn first_interested_offset(&self, _: &BuildContext<'_>, from: usize) -> Option<usize> {
        (from <= self.offset).then_some(self.offset)
    }

    fn construct_element(&self, _: &BuildContext<'_>, _: usize) -> Option<GeneratedElement> {
        self.built.set(self.built.get() + 1);
        Some(GeneratedElement::marker("*"))
    }
}

/// Reports interest at a fixed offset forever, whatever it is asked.
struct Pinned(usize);

impl ElementGenerator for Pinned {
    fn name(&self) -> &str {
        "Pinned"
    }

    fn first_interested_offset(&self, _: &BuildContext<'_>, _: usize) -> Option<usize> {
        Some(self.0)
    }

    fn construct_element(&self, _: &BuildContext<'_>, _: usize) -> Option<GeneratedElement> {
        Some(GeneratedElement::marker("#"))
    }
}

/// Interested everywhere but never constructs anything.
struct Shy;

impl ElementGenerator for Shy {
    fn first_interested_offset(&self, _: &BuildContext<'_>, from: usize) -> Option<usize> {
        Some(from)
    }

    fn construct_element(&self, _: &BuildContext<'_>, _: usize) -> Option<GeneratedElement> {
        None
    }
}

#[test]
fn test_length_five_line_without_generators() {
    let buffer = TextBuffer::from_text("abcde\nfg");
    let config = LayoutConfig::default();
    let line = VisualLineBuilder::new(&buffer, &config)
        .build(1, &[], &[])
        .unwrap();

    assert_eq!(line.elements().len(), 1);
    assert_eq!(line.elements()[0].document_length(), 5);
    assert!(matches!(line.elements()[0].kind, ElementKind::Text(_)));
}

#[test]
fn test_zero_length_marker_forward_progress() {
    let buffer = TextBuffer::from_text("abcde");
    let config = LayoutConfig::default();
    let bookmark = Bookmark::at(2);
    let line = VisualLineBuilder::new(&buffer, &config)
        .build(1, &[&bookmark], &[])
        .unwrap();

    assert!(bookmark.built.get() <= 2);
    assert_eq!(line.display_text(), "ab*cde");
}

#[test]
fn test_pinned_interest_fails_fast() {
    let buffer = TextBuffer::from_text("abcde");
    let config = LayoutConfig::default();
    let err = VisualLineBuilder::new(&buffer, &config)
        .build(1, &[&Pinned(2)], &[])
        .unwrap_err();
    assert_eq!(
        err,
        LayoutError::InterestBeforeOffset {
            generator: "Pinned".to_string(),
            offset: 3,
            interest: 2,
        }
    );
}

#[test]
fn test_declining_generator_leaves_text_intact() {
    let buffer = TextBuffer::from_text("abc");
    let config = LayoutConfig::default();
    let line = VisualLineBuilder::new(&buffer, &config)
        .build(1, &[&Shy], &[])
        .unwrap();
    assert_eq!(line.display_text(), "abc");
    assert_eq!(line.document_length(), 3);
}

#[test]
fn test_round_trip_with_folds_and_markers() {
    let text = "struct S {\n    a: u8,\n    b: u8,\n} // end";
    let mut doc = EditorDocument::new("s.rs", text, EditorConfig::default());
    let fold = doc.add_fold(10, 33, None).unwrap();
    doc.set_folded(fold, true).unwrap();

    let bookmark = Bookmark::at(3);
    let line = doc.visual_line(1, &[&bookmark], &[]).unwrap();
    assert_eq!(line.display_text(), "str*uct S {...} // end");
    assert_eq!(line.last_document_line().line_number, 4);

    let hidden = 11..33;
    for offset in 0..=line.document_length() {
        if hidden.contains(&offset) {
            continue;
        }
        let column = line.text_offset_to_visual_column(offset).unwrap();
        assert_eq!(
            line.visual_column_to_text_offset(column).unwrap(),
            offset,
            "offset {offset} via column {column}"
        );
    }
}

#[test]
fn test_folded_lines_are_hidden_from_viewport() {
    let text = "a\nb {\nc\nd\n}\ne\nf";
    let mut doc = EditorDocument::new("v.txt", text, EditorConfig::default());
    // From the end of "b {" to just before "}".
    let fold = doc.add_fold(5, 10, Some("/* 2 lines */".to_string())).unwrap();

    let unfolded: Vec<String> = doc
        .visible_lines(1, 10)
        .unwrap()
        .iter()
        .map(|line| line.display_text())
        .collect();
    assert_eq!(unfolded, vec!["a", "b {", "c", "d", "}", "e", "f"]);

    doc.set_folded(fold, true).unwrap();
    let folded: Vec<String> = doc
        .visible_lines(1, 10)
        .unwrap()
        .iter()
        .map(|line| line.display_text())
        .collect();
    assert_eq!(folded, vec!["a", "b {/* 2 lines */}", "e", "f"]);

    let first_two = doc.visible_lines(2, 2).unwrap();
    assert_eq!(first_two[0].first_document_line().line_number, 2);
    assert_eq!(first_two[0].last_document_line().line_number, 5);
    assert_eq!(first_two[1].first_document_line().line_number, 6);
}

#[test]
fn test_edits_keep_folds_in_place() {
    let text = "fn f() {\n    x();\n}\n";
    let mut doc = EditorDocument::new("f.rs", text, EditorConfig::default());
    let fold = doc.add_fold(8, 18, None).unwrap();
    doc.set_folded(fold, true).unwrap();

    doc.insert(0, "// hi\n").unwrap();
    let line = doc.visual_line(2, &[], &[]).unwrap();
    assert_eq!(line.display_text(), "fn f() {...}");

    // Typing inside the fold grows it.
    let body = doc.folding().get(fold).unwrap().start + 5;
    doc.insert(body, "yy").unwrap();
    let region = doc.folding().get(fold).unwrap();
    assert_eq!((region.start, region.end), (14, 26));
    let line = doc.visual_line(2, &[], &[]).unwrap();
    assert_eq!(line.display_text(), "fn f() {...}");
}

#[test]
fn test_deleting_fold_content_prunes_region() {
    let mut doc = EditorDocument::new("p.txt", "ab\ncd\nef", EditorConfig::default());
    let fold = doc.add_fold(3, 5, None).unwrap();
    doc.set_folded(fold, true).unwrap();

    doc.remove(2, 4).unwrap();
    assert!(doc.folding().get(fold).is_none());
    assert!(doc.folding().is_empty());

    let line = doc.visual_line(1, &[], &[]).unwrap();
    assert_eq!(line.display_text(), "abef");
}

#[test]
fn test_fold_events_are_published() {
    let mut folding = editor_lines::FoldingModel::new(20);
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    folding.subscribe(move |event| events_clone.lock().unwrap().push(event.clone()));

    let id = folding.add_fold(2, 6, None).unwrap();
    folding.set_folded(id, true).unwrap();
    folding.apply_edit(1, 7, 0).unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            FoldEvent::Invalidated { start: 2, end: 6 },
            FoldEvent::Removed { id },
        ]
    );
}

#[test]
fn test_document_publishes_fold_events() {
    let mut doc = EditorDocument::new("e.txt", "ab\ncd\nef", EditorConfig::default());
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    let subscription =
        doc.subscribe_folds(move |event| events_clone.lock().unwrap().push(event.clone()));

    let fold = doc.add_fold(3, 5, None).unwrap();
    doc.set_folded(fold, true).unwrap();
    doc.remove(2, 4).unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            FoldEvent::Invalidated { start: 3, end: 5 },
            FoldEvent::Removed { id: fold },
        ]
    );

    assert!(doc.unsubscribe_folds(subscription));
    let other = doc.add_fold(0, 2, None).unwrap();
    doc.set_folded(other, true).unwrap();
    assert_eq!(events.lock().unwrap().len(), 2);
}

#[test]
fn test_empty_fold_title_keeps_offsets_round_tripping() {
    let mut doc = EditorDocument::new("t.txt", "ab{cdef}gh", EditorConfig::default());
    let fold = doc.add_fold(3, 7, Some(String::new())).unwrap();
    doc.set_folded(fold, true).unwrap();

    let line = doc.visual_line(1, &[], &[]).unwrap();
    assert_eq!(line.display_text(), "ab{...}gh");
    assert_eq!(line.visual_length(), 9);
    for offset in (0..=3).chain(7..=10) {
        let column = line.text_offset_to_visual_column(offset).unwrap();
        assert_eq!(
            line.visual_column_to_text_offset(column).unwrap(),
            offset,
            "offset {offset} via column {column}"
        );
    }
}

#[test]
fn test_caret_walks_over_placeholder() {
    let mut doc = EditorDocument::new("c.txt", "ab{cdef}gh", EditorConfig::default());
    let fold = doc.add_fold(3, 7, None).unwrap();
    doc.set_folded(fold, true).unwrap();
    let line = doc.visual_line(1, &[], &[]).unwrap();
    assert_eq!(line.display_text(), "ab{...}gh");

    let mut stops = vec![0];
    let mut column = 0;
    while let Some(next) = line.next_caret_position(column, CaretDirection::Forward, CaretMode::Normal)
    {
        stops.push(next);
        column = next;
    }
    assert_eq!(stops, vec![0, 1, 2, 3, 6, 7, 8, 9]);

    let offsets: Vec<usize> = stops
        .iter()
        .map(|&c| line.visual_column_to_text_offset(c).unwrap())
        .collect();
    assert_eq!(offsets, vec![0, 1, 2, 3, 7, 8, 9, 10]);
}

#[test]
fn test_styles_and_render_runs() {
    let doc = EditorDocument::new("r.txt", "\tlet x;", EditorConfig::default());
    let styles = StyleTransformer::new(vec![StyleSpan::new(1, 4, 5)]);
    let line = doc.visual_line(1, &[], &[&styles]).unwrap();

    let runs = line.render_runs(&doc.config().layout);
    let summary: Vec<(&str, usize, Vec<u32>)> = runs
        .iter()
        .map(|r| (r.text.as_str(), r.cells, r.styles.clone()))
        .collect();
    assert_eq!(
        summary,
        vec![("\t", 4, vec![]), ("let", 3, vec![5]), (" x;", 3, vec![])]
    );
}

#[test]
fn test_custom_generated_element_kind() {
    struct Inlay;

    impl ElementGenerator for Inlay {
        fn first_interested_offset(&self, ctx: &BuildContext<'_>, from: usize) -> Option<usize> {
            let at = ctx.first_line.offset + 1;
            (from <= at).then_some(at)
        }

        fn construct_element(&self, _: &BuildContext<'_>, _: usize) -> Option<GeneratedElement> {
            Some(GeneratedElement::new(GeneratedKind::Custom(1), ": i32", 0))
        }
    }

    let doc = EditorDocument::new("i.rs", "x = 1\ny = 2", EditorConfig::default());
    let line = doc.visual_line(2, &[&Inlay], &[]).unwrap();
    assert_eq!(line.display_text(), "y: i32 = 2");
    assert_eq!(line.visual_length(), 10);
    assert_eq!(line.document_length(), 5);
    // Right after "y" is before the inlay; the next offset is after it.
    assert_eq!(line.document_offset_to_visual_column(7), Ok(1));
    assert_eq!(line.document_offset_to_visual_column(8), Ok(7));
}
