#![warn(missing_docs)]
//! Editor Lines - Line Annotation and Visual Line Engine
//!
//! # Overview
//!
//! `editor-lines` is the headless machinery between a text buffer and a renderer:
//! it classifies every document line against a baseline (the last saved or committed text),
//! keeps that per-line metadata in a run-compressed sequence that survives live edits, and
//! turns document lines into visual lines made of plain text and generated elements such as
//! fold placeholders.
//!
//! # Core Features
//!
//! - **Run-Compressed Sequence**: treap of `(value, run)` nodes, O(log n) indexed access
//! - **Line Diff**: Myers O(ND) in linear space over interned lines
//! - **Change Tracking**: per-line `None` / `Inserted` / `Modified` / `Unsaved` / `Saved`
//!   with deleted baseline text attached to the preceding line
//! - **Code Folding**: nested fold regions with synchronous offset rebasing
//! - **Visual Lines**: generator pipeline with fold placeholders spanning several lines,
//!   offset/column mapping and grapheme-aware caret stops
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  EditorDocument (per-document context)      │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  VisualLineBuilder + generators/transformers│  ← Rendering Data
//! ├──────────────────────┬──────────────────────┤
//! │  ChangeTracker       │  FoldingModel        │  ← Annotations
//! ├──────────────────────┤                      │
//! │  Line Diff | RunList │                      │
//! ├──────────────────────┴──────────────────────┤
//! │  TextBuffer (Rope-based)                    │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use editor_lines::{ChangeKind, EditorConfig, EditorDocument, StaticBaselineProvider};
//!
//! let baseline = StaticBaselineProvider::new().with("main.rs", "fn main() {\n}\n");
//! let mut doc = EditorDocument::new("main.rs", "fn main() {\n}\n", EditorConfig::default());
//! doc.attach_change_tracker(&baseline).unwrap();
//!
//! // Add a line to the body, then signal that the document was saved.
//! doc.insert(12, "    run();\n").unwrap();
//! doc.mark_saved(&baseline).unwrap();
//!
//! let tracker = doc.change_tracker().unwrap();
//! assert_eq!(tracker.get_change(2).unwrap().kind, ChangeKind::Inserted);
//! assert_eq!(tracker.get_change(3).unwrap().kind, ChangeKind::None);
//!
//! // Fold the body.
//! let fold = doc.add_fold(11, 23, None).unwrap();
//! doc.set_folded(fold, true).unwrap();
//!
//! let line = doc.visual_line(1, &[], &[]).unwrap();
//! assert_eq!(line.display_text(), "fn main() {...}");
//! assert_eq!(line.last_document_line().line_number, 3);
//! ```
//!
//! # Module Description
//!
//! - [`run_list`] - Run-compressed sequence
//! - [`diff`] - Line diff engine
//! - [`buffer`] - Rope based text buffer with line events
//! - [`baseline`] - Baseline providers
//! - [`change_tracker`] - Per-line change annotations
//! - [`folding`] - Fold regions
//! - [`visual_line`] - Visual line elements and builder
//! - [`generators`] - Folding generator and style transformer
//! - [`document`] - Per-document context
//! - [`config`] - Configuration
//!
//! # Threading
//!
//! All components are driven from one layout/update thread. The only state read through
//! `&self` from elsewhere is [`TextBuffer::text_snapshot`], which sits behind a lock.

pub mod baseline;
pub mod buffer;
pub mod change_tracker;
pub mod config;
pub mod diff;
pub mod document;
pub mod error;
pub mod folding;
pub mod generators;
pub mod notify;
pub mod run_list;
pub mod visual_line;

pub use baseline::{
    BaselineProvider, BaselineProviders, FileBaselineProvider, NoBaseline, StaticBaselineProvider,
    load_baseline,
};
pub use buffer::{BufferEdit, DocumentLine, LineEnding, LineEvent, TextBuffer};
pub use change_tracker::{
    ChangeKind, ChangeOccurred, ChangeTracker, LineChangeInfo, LineDiffPair, TrackerState,
};
pub use config::{EditorConfig, LayoutConfig};
pub use diff::{Edit, EditKind, LineInterner, diff_lines, diff_slices};
pub use document::EditorDocument;
pub use error::{BufferError, Error, FoldingError, LayoutError, RunListError, TrackerError};
pub use folding::{FoldEvent, FoldId, FoldRegion, FoldingModel};
pub use generators::{FoldingElementGenerator, StyleSpan, StyleTransformer};
pub use notify::SubscriptionId;
pub use run_list::RunList;
pub use visual_line::{
    BuildContext, CaretDirection, CaretMode, ElementGenerator, ElementKind, GeneratedElement,
    GeneratedKind, RenderRun, StyleId, TextRun, VisualLine, VisualLineBuilder, VisualLineElement,
    VisualLineTransformer,
};
