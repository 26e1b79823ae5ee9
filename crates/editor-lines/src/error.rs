//! Error types.
//!
//! Every error here is a contract violation: an out-of-range index, an invalid fold range, a
//! misbehaving generator. They are returned immediately and never swallowed, because continuing
//! would leave the shared structures inconsistent. Environmental failures (an unreadable
//! baseline) are not errors; they are logged and degraded by the change tracker.

use thiserror::Error;

use crate::folding::FoldId;

/// Errors produced by [`RunList`](crate::run_list::RunList).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunListError {
    #[error("index {index} out of range for length {len}")]
    /// An index was outside `0..len` (or `0..=len` for insertion).
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Logical element count at the time of the call.
        len: usize,
    },

    #[error("range {start}..{end} out of range for length {len}")]
    /// A removal range extended past the end of the list.
    RangeOutOfRange {
        /// Range start (inclusive).
        start: usize,
        /// Range end (exclusive).
        end: usize,
        /// Logical element count at the time of the call.
        len: usize,
    },
}

/// Errors produced by [`TextBuffer`](crate::buffer::TextBuffer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("offset {offset} out of range for document length {len}")]
    /// A char offset was past the end of the document.
    OffsetOutOfRange {
        /// The offending offset.
        offset: usize,
        /// Document length in chars.
        len: usize,
    },

    #[error("line {line} out of range (document has {line_count} lines)")]
    /// A 1-based line number was `0` or past the last line.
    LineOutOfRange {
        /// The offending line number.
        line: usize,
        /// Number of lines in the document.
        line_count: usize,
    },
}

/// Errors produced by [`FoldingModel`](crate::folding::FoldingModel).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FoldingError {
    #[error("invalid fold range {start}..{end} (document length {len})")]
    /// `end <= start`, or one of the offsets is past the end of the document.
    InvalidRange {
        /// Requested start offset.
        start: usize,
        /// Requested end offset.
        end: usize,
        /// Document length in chars.
        len: usize,
    },

    #[error("unknown fold region {0:?}")]
    /// The handle does not name a live region (it was removed or pruned).
    UnknownFold(FoldId),
}

/// Errors produced while building or querying a [`VisualLine`](crate::visual_line::VisualLine).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error(
        "generator '{generator}' reported interest at {interest}, before the requested offset {offset}"
    )]
    /// A generator answered `first_interested_offset(offset)` with a smaller offset.
    InterestBeforeOffset {
        /// Name of the misbehaving generator.
        generator: String,
        /// The offset the generator was asked about.
        offset: usize,
        /// The offset it reported.
        interest: usize,
    },

    #[error("generator '{generator}' constructed an element ending at {end}, past the document end {len}")]
    /// A generator produced an element that runs off the end of the document.
    ElementPastDocumentEnd {
        /// Name of the misbehaving generator.
        generator: String,
        /// Absolute end offset of the element.
        end: usize,
        /// Document length in chars.
        len: usize,
    },

    #[error("transformer '{transformer}' changed the document length from {expected} to {actual}")]
    /// A transformer added or removed document text from the element list.
    TransformerChangedLength {
        /// Name of the misbehaving transformer.
        transformer: String,
        /// Document length spanned before the transformer ran.
        expected: usize,
        /// Document length spanned afterwards.
        actual: usize,
    },

    #[error("relative text offset {offset} out of range (line spans {len})")]
    /// A relative text offset was past the end of the visual line.
    OffsetOutOfRange {
        /// The offending relative offset.
        offset: usize,
        /// Document length spanned by the visual line.
        len: usize,
    },

    #[error("visual column {column} out of range (visual length {len})")]
    /// A visual column was past the end of the visual line.
    ColumnOutOfRange {
        /// The offending column.
        column: usize,
        /// Visual length of the line.
        len: usize,
    },

    #[error(transparent)]
    /// The underlying buffer rejected a line or offset.
    Buffer(#[from] BufferError),
}

/// Errors produced by [`ChangeTracker`](crate::change_tracker::ChangeTracker).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("change tracker has been disposed")]
    /// The tracker was disposed and no longer accepts edit notifications.
    Disposed,

    #[error("change tracker is not initialized")]
    /// An edit notification arrived before `initialize`.
    Uninitialized,

    #[error("line {line} out of range (tracker holds {line_count} lines)")]
    /// An edit notification named a line the tracker does not know about.
    LineOutOfRange {
        /// The offending 1-based line number.
        line: usize,
        /// Number of document lines tracked.
        line_count: usize,
    },

    #[error(transparent)]
    /// The record list rejected an index.
    RunList(#[from] RunListError),
}

/// Crate-level error returned by [`EditorDocument`](crate::document::EditorDocument).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    /// Buffer error.
    Buffer(#[from] BufferError),

    #[error(transparent)]
    /// Folding error.
    Folding(#[from] FoldingError),

    #[error(transparent)]
    /// Layout error.
    Layout(#[from] LayoutError),

    #[error(transparent)]
    /// Change tracker error.
    Tracker(#[from] TrackerError),
}
