//! Line-indexed text buffer.
//!
//! A `ropey::Rope` with LF-only line breaks. Offsets are `char` offsets; lines are numbered from
//! 1 (line 0 is reserved for the "before the first line" sentinel used by change tracking).
//!
//! Every mutation reports the structural line changes it caused as an ordered list of
//! [`LineEvent`]s, one per structural change. Consumers (the change tracker) replay them to
//! keep per-line metadata aligned with the document.

use std::borrow::Cow;
use std::sync::Arc;

use parking_lot::Mutex;
use ropey::Rope;

use crate::error::BufferError;

/// The preferred newline sequence used when saving a document.
///
/// Text is stored internally with LF (`'\n'`) line breaks; CRLF and lone CR are normalized on
/// the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
}

impl LineEnding {
    /// Detect the dominant line ending: CRLF if the text contains any `"\r\n"`, otherwise LF.
    pub fn detect_in_text(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::Crlf
        } else {
            Self::Lf
        }
    }

    /// Convert LF-normalized text to this line ending.
    pub fn apply_to_text(self, text: &str) -> String {
        match self {
            Self::Lf => text.to_string(),
            Self::Crlf => text.replace('\n', "\r\n"),
        }
    }
}

/// Normalize CRLF and lone CR to LF.
pub fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Split text into lines the same way the buffer does (N newlines => N + 1 lines).
pub fn split_lines(text: &str) -> Vec<String> {
    normalize_newlines(text)
        .split('\n')
        .map(str::to_string)
        .collect()
}

/// A single document line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentLine {
    /// 1-based line number.
    pub line_number: usize,
    /// Char offset of the first character.
    pub offset: usize,
    /// Length in chars, excluding the line delimiter.
    pub length: usize,
}

impl DocumentLine {
    /// Offset just past the last character (the position of the delimiter, if any).
    pub fn end_offset(&self) -> usize {
        self.offset + self.length
    }
}

/// A structural line change reported by a buffer mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineEvent {
    /// The content of `line` changed but the line count did not.
    LineLengthChanged {
        /// 1-based line number (post-edit).
        line: usize,
    },
    /// A new line was inserted directly after `after`.
    LineInserted {
        /// 1-based line number of the line the new one follows.
        after: usize,
    },
    /// `line` was removed; the lines after it moved up by one.
    LineRemoved {
        /// 1-based line number (at the time of the event).
        line: usize,
    },
    /// The whole document was replaced.
    DocumentRebuilt,
}

/// Result of a buffer mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferEdit {
    /// Char offset where the edit starts.
    pub offset: usize,
    /// Number of chars removed.
    pub removed: usize,
    /// Number of chars inserted (after newline normalization).
    pub inserted: usize,
    /// Structural line changes, in application order.
    pub events: Vec<LineEvent>,
}

/// Rope-backed text buffer with line bookkeeping.
#[derive(Debug)]
pub struct TextBuffer {
    rope: Rope,
    line_ending: LineEnding,
    /// Full-text cache for [`TextBuffer::text_snapshot`].
    ///
    /// This is the only state touched through `&self` from outside the layout thread (a
    /// background formatter may read the snapshot), so it sits behind a lock.
    snapshot: Mutex<Option<Arc<str>>>,
}

impl TextBuffer {
    /// Create an empty buffer (one empty line).
    pub fn new() -> Self {
        Self::from_text("")
    }

    /// Create a buffer from text, normalizing line endings.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(&normalize_newlines(text)),
            line_ending: LineEnding::detect_in_text(text),
            snapshot: Mutex::new(None),
        }
    }

    /// Line ending detected when the text was loaded.
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Document length in chars.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns `true` if the document holds no text.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Number of lines (an empty document has one line).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Get a line by its 1-based number.
    pub fn line(&self, line_number: usize) -> Result<DocumentLine, BufferError> {
        let line_count = self.line_count();
        if line_number == 0 || line_number > line_count {
            return Err(BufferError::LineOutOfRange {
                line: line_number,
                line_count,
            });
        }

        let index = line_number - 1;
        let offset = self.rope.line_to_char(index);
        let end = if line_number < line_count {
            // Exclude the '\n' terminating this line.
            self.rope.line_to_char(index + 1) - 1
        } else {
            self.rope.len_chars()
        };

        Ok(DocumentLine {
            line_number,
            offset,
            length: end - offset,
        })
    }

    /// Get the line containing `offset`. The delimiter belongs to the line it terminates.
    pub fn line_by_offset(&self, offset: usize) -> Result<DocumentLine, BufferError> {
        self.check_offset(offset)?;
        self.line(self.rope.char_to_line(offset) + 1)
    }

    /// Text of a line, without its delimiter.
    pub fn line_text(&self, line_number: usize) -> Result<String, BufferError> {
        let line = self.line(line_number)?;
        Ok(self
            .rope
            .slice(line.offset..line.end_offset())
            .to_string())
    }

    /// Text of every line, without delimiters.
    pub fn line_texts(&self) -> Vec<String> {
        self.rope
            .lines()
            .map(|line| {
                let mut text = line.to_string();
                if text.ends_with('\n') {
                    text.pop();
                }
                text
            })
            .collect()
    }

    /// Text in `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<String, BufferError> {
        self.check_offset(end)?;
        if start > end {
            return Err(BufferError::OffsetOutOfRange {
                offset: start,
                len: end,
            });
        }
        Ok(self.rope.slice(start..end).to_string())
    }

    /// The full text.
    ///
    /// The snapshot is cached until the next mutation and may be read concurrently through a
    /// shared reference.
    pub fn text_snapshot(&self) -> Arc<str> {
        let mut cached = self.snapshot.lock();
        cached
            .get_or_insert_with(|| Arc::from(self.rope.to_string()))
            .clone()
    }

    /// Insert `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<BufferEdit, BufferError> {
        self.replace(offset, 0, text)
    }

    /// Remove `len` chars starting at `offset`.
    pub fn remove(&mut self, offset: usize, len: usize) -> Result<BufferEdit, BufferError> {
        self.replace(offset, len, "")
    }

    /// Replace `len` chars at `offset` with `text`.
    ///
    /// Events for the removal come first, then events for the insertion.
    pub fn replace(
        &mut self,
        offset: usize,
        len: usize,
        text: &str,
    ) -> Result<BufferEdit, BufferError> {
        self.check_offset(offset)?;
        self.check_offset(offset.saturating_add(len))?;

        let text = normalize_newlines(text);
        let inserted = text.chars().count();
        let mut events = Vec::new();

        if len > 0 {
            let first = self.rope.char_to_line(offset) + 1;
            let last = self.rope.char_to_line(offset + len) + 1;
            for _ in first..last {
                events.push(LineEvent::LineRemoved { line: first + 1 });
            }
            events.push(LineEvent::LineLengthChanged { line: first });
            self.rope.remove(offset..offset + len);
        }

        if inserted > 0 {
            let line = self.rope.char_to_line(offset) + 1;
            if len == 0 {
                events.push(LineEvent::LineLengthChanged { line });
            }
            let newlines = text.matches('\n').count();
            for i in 0..newlines {
                events.push(LineEvent::LineInserted { after: line + i });
            }
            self.rope.insert(offset, &text);
        }

        *self.snapshot.get_mut() = None;

        Ok(BufferEdit {
            offset,
            removed: len,
            inserted,
            events,
        })
    }

    /// Replace the whole document.
    pub fn set_text(&mut self, text: &str) -> BufferEdit {
        let removed = self.rope.len_chars();
        self.rope = Rope::from_str(&normalize_newlines(text));
        self.line_ending = LineEnding::detect_in_text(text);
        *self.snapshot.get_mut() = None;

        BufferEdit {
            offset: 0,
            removed,
            inserted: self.rope.len_chars(),
            events: vec![LineEvent::DocumentRebuilt],
        }
    }

    /// The full text converted to the detected line ending, ready to be written to disk.
    pub fn text_for_saving(&self) -> String {
        self.line_ending.apply_to_text(&self.text_snapshot())
    }

    fn check_offset(&self, offset: usize) -> Result<(), BufferError> {
        let len = self.rope.len_chars();
        if offset > len {
            return Err(BufferError::OffsetOutOfRange { offset, len });
        }
        Ok(())
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for TextBuffer {
    fn clone(&self) -> Self {
        Self {
            rope: self.rope.clone(),
            line_ending: self.line_ending,
            snapshot: Mutex::new(None),
        }
    }
}
