//! Visual line construction.
//!
//! A [`VisualLine`] is the rendered form of one document line: an ordered list of
//! [`VisualLineElement`]s, each covering a contiguous span of document chars and a span of
//! visual columns. Plain text costs one column per `char`; generated elements (fold
//! placeholders, markers) may cover any number of document chars, including none, and any
//! number of columns.
//!
//! The [`VisualLineBuilder`] walks the line left to right. At every step each
//! [`ElementGenerator`] reports the next offset it wants to handle; the text up to the nearest
//! such offset becomes a plain text element, then the interested generators are asked, in
//! priority order, to construct an element there. A generated element that runs past the end
//! of the line (a fold spanning several lines) pulls the following lines into the same visual
//! line.
//!
//! After construction, [`VisualLineTransformer`]s may split and restyle elements as long as
//! the total document length is preserved.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use crate::buffer::{DocumentLine, TextBuffer};
use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::folding::FoldId;

/// Style tag attached to elements by transformers.
pub type StyleId = u32;

/// Calculate visual width of a character in terminal cells (UAX #11).
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(1)
}

/// Width of `ch` at cell offset `cell_offset_in_line`, expanding `'\t'` to the next tab stop.
pub fn cell_width_at(ch: char, cell_offset_in_line: usize, tab_width: usize) -> usize {
    if ch == '\t' {
        let tab_width = tab_width.max(1);
        tab_width - cell_offset_in_line % tab_width
    } else {
        char_width(ch)
    }
}

/// Plain document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    text: String,
    len: usize,
}

impl TextRun {
    /// Wrap `text`.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let len = text.chars().count();
        Self { text, len }
    }

    /// The text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the run is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Split at char index `at` (clamped to the run).
    pub fn split_at(&self, at: usize) -> (TextRun, TextRun) {
        let at = at.min(self.len);
        let byte = self
            .text
            .char_indices()
            .nth(at)
            .map_or(self.text.len(), |(idx, _)| idx);
        (
            TextRun::new(&self.text[..byte]),
            TextRun::new(&self.text[byte..]),
        )
    }

    /// Caret stops inside the run, as char indices in `0..=len`, ascending.
    fn caret_stops(&self, mode: CaretMode) -> Vec<usize> {
        let mut stops = Vec::new();
        let mut chars = 0;
        match mode {
            CaretMode::Normal => {
                stops.push(0);
                for grapheme in self.text.graphemes(true) {
                    chars += grapheme.chars().count();
                    stops.push(chars);
                }
            }
            CaretMode::WordStart => {
                for segment in self.text.split_word_bounds() {
                    if segment.chars().next().is_some_and(char::is_alphanumeric) {
                        stops.push(chars);
                    }
                    chars += segment.chars().count();
                }
            }
        }
        stops
    }
}

/// What a generated element stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratedKind {
    /// Placeholder of a folded region.
    FoldPlaceholder(FoldId),
    /// Decoration that consumes no document text.
    Marker,
    /// Host-defined element.
    Custom(u32),
}

/// An element produced by an [`ElementGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedElement {
    /// What the element stands for.
    pub kind: GeneratedKind,
    /// Text shown in place of the covered document span.
    pub text: String,
    /// Number of document chars replaced. May be zero.
    pub document_length: usize,
    /// Number of visual columns occupied.
    pub visual_length: usize,
}

impl GeneratedElement {
    /// Element showing `text` (one column per char) in place of `document_length` chars.
    pub fn new(kind: GeneratedKind, text: impl Into<String>, document_length: usize) -> Self {
        let text = text.into();
        let visual_length = text.chars().count();
        Self {
            kind,
            text,
            document_length,
            visual_length,
        }
    }

    /// Zero-document-length marker showing `text`.
    pub fn marker(text: impl Into<String>) -> Self {
        Self::new(GeneratedKind::Marker, text, 0)
    }
}

/// Element payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// Plain document text.
    Text(TextRun),
    /// Generated element.
    Generated(GeneratedElement),
}

/// Caret movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretDirection {
    /// Towards larger columns.
    Forward,
    /// Towards smaller columns.
    Backward,
}

/// Which positions count as caret stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaretMode {
    /// Every grapheme cluster boundary.
    #[default]
    Normal,
    /// Start of every word.
    WordStart,
}

/// What a renderer needs to draw one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRun {
    /// First visual column of the element.
    pub visual_column: usize,
    /// Text to draw. Tabs are kept; `cells` accounts for their expansion.
    pub text: String,
    /// Width in terminal cells.
    pub cells: usize,
    /// Styles attached by transformers.
    pub styles: Vec<StyleId>,
    /// `true` for generated elements.
    pub generated: bool,
}

/// One element of a [`VisualLine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualLineElement {
    /// First visual column, relative to the visual line.
    pub visual_column: usize,
    /// First document char, relative to the start of the visual line.
    pub relative_text_offset: usize,
    /// Styles attached by transformers.
    pub styles: Vec<StyleId>,
    /// Payload.
    pub kind: ElementKind,
}

impl VisualLineElement {
    /// Plain text element. Offsets are assigned by the builder.
    pub fn text(run: TextRun) -> Self {
        Self {
            visual_column: 0,
            relative_text_offset: 0,
            styles: Vec::new(),
            kind: ElementKind::Text(run),
        }
    }

    /// Generated element. Offsets are assigned by the builder.
    pub fn generated(element: GeneratedElement) -> Self {
        Self {
            visual_column: 0,
            relative_text_offset: 0,
            styles: Vec::new(),
            kind: ElementKind::Generated(element),
        }
    }

    /// Builder-style style tagging.
    pub fn with_styles(mut self, styles: Vec<StyleId>) -> Self {
        self.styles = styles;
        self
    }

    /// Number of visual columns occupied.
    pub fn visual_length(&self) -> usize {
        match &self.kind {
            ElementKind::Text(run) => run.len(),
            ElementKind::Generated(element) => element.visual_length,
        }
    }

    /// Number of document chars covered.
    pub fn document_length(&self) -> usize {
        match &self.kind {
            ElementKind::Text(run) => run.len(),
            ElementKind::Generated(element) => element.document_length,
        }
    }

    /// `true` for generated elements.
    pub fn is_generated(&self) -> bool {
        matches!(self.kind, ElementKind::Generated(_))
    }

    fn visual_end(&self) -> usize {
        self.visual_column + self.visual_length()
    }

    fn relative_end(&self) -> usize {
        self.relative_text_offset + self.document_length()
    }

    /// Visual column of relative offset `relative`, which must lie within the element.
    ///
    /// Generated elements are atomic: their start maps to their first column, anything else
    /// to the column after them.
    pub fn visual_column_of(&self, relative: usize) -> usize {
        match &self.kind {
            ElementKind::Text(run) => {
                let delta = relative.saturating_sub(self.relative_text_offset).min(run.len());
                self.visual_column + delta
            }
            ElementKind::Generated(_) => {
                if relative == self.relative_text_offset {
                    self.visual_column
                } else {
                    self.visual_end()
                }
            }
        }
    }

    /// Relative offset of visual column `column`, which must lie within the element.
    pub fn relative_offset_of(&self, column: usize) -> usize {
        match &self.kind {
            ElementKind::Text(run) => {
                let delta = column.saturating_sub(self.visual_column).min(run.len());
                self.relative_text_offset + delta
            }
            ElementKind::Generated(_) => {
                if column == self.visual_column {
                    self.relative_text_offset
                } else {
                    self.relative_end()
                }
            }
        }
    }

    /// Next caret stop inside this element, strictly after (or before) `column`.
    pub fn next_caret_position(
        &self,
        column: usize,
        direction: CaretDirection,
        mode: CaretMode,
    ) -> Option<usize> {
        let stops: Vec<usize> = match &self.kind {
            ElementKind::Text(run) => run
                .caret_stops(mode)
                .into_iter()
                .map(|stop| self.visual_column + stop)
                .collect(),
            ElementKind::Generated(element) => match mode {
                CaretMode::Normal => vec![self.visual_column, self.visual_column + element.visual_length],
                CaretMode::WordStart => vec![self.visual_column],
            },
        };
        match direction {
            CaretDirection::Forward => stops.into_iter().find(|&stop| stop > column),
            CaretDirection::Backward => stops.into_iter().rev().find(|&stop| stop < column),
        }
    }

    /// Render payload for this element starting at cell 0.
    pub fn render_payload(&self, config: &LayoutConfig) -> RenderRun {
        self.render_payload_at(config, 0)
    }

    fn render_payload_at(&self, config: &LayoutConfig, start_cell: usize) -> RenderRun {
        let tab_width = config.effective_tab_width();
        let (text, generated) = match &self.kind {
            ElementKind::Text(run) => (run.text(), false),
            ElementKind::Generated(element) => (element.text.as_str(), true),
        };
        let mut cell = start_cell;
        for ch in text.chars() {
            cell = cell.saturating_add(cell_width_at(ch, cell, tab_width));
        }
        RenderRun {
            visual_column: self.visual_column,
            text: text.to_string(),
            cells: cell - start_cell,
            styles: self.styles.clone(),
            generated,
        }
    }
}

/// Inputs shared by generators and transformers during one build.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    /// The document.
    pub buffer: &'a TextBuffer,
    /// First document line of the visual line being built.
    pub first_line: DocumentLine,
    /// Layout options.
    pub config: &'a LayoutConfig,
}

/// Produces generated elements at offsets it is interested in.
pub trait ElementGenerator {
    /// Name used in error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// First offset `>= from` this generator wants to handle, or `None`.
    ///
    /// Returning an offset below `from` is a contract violation and aborts the build.
    fn first_interested_offset(&self, context: &BuildContext<'_>, from: usize) -> Option<usize>;

    /// Construct an element at `offset`, or decline with `None`.
    fn construct_element(
        &self,
        context: &BuildContext<'_>,
        offset: usize,
    ) -> Option<GeneratedElement>;
}

/// Rewrites the element list of a visual line after construction.
///
/// Offsets are up to date when `transform` is called and are recomputed afterwards. The total
/// document length must not change.
pub trait VisualLineTransformer {
    /// Name used in error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Rewrite `elements` in place.
    fn transform(&self, context: &BuildContext<'_>, elements: &mut Vec<VisualLineElement>);
}

/// The rendered form of one or more document lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualLine {
    first_line: DocumentLine,
    last_line: DocumentLine,
    elements: Vec<VisualLineElement>,
    visual_length: usize,
    document_length: usize,
}

impl VisualLine {
    /// First document line.
    pub fn first_document_line(&self) -> DocumentLine {
        self.first_line
    }

    /// Last document line; differs from the first when a fold spans lines.
    pub fn last_document_line(&self) -> DocumentLine {
        self.last_line
    }

    /// Elements in visual order.
    pub fn elements(&self) -> &[VisualLineElement] {
        &self.elements
    }

    /// Total number of visual columns.
    pub fn visual_length(&self) -> usize {
        self.visual_length
    }

    /// Total number of document chars covered.
    pub fn document_length(&self) -> usize {
        self.document_length
    }

    /// Document offset of relative offset 0.
    pub fn start_offset(&self) -> usize {
        self.first_line.offset
    }

    /// Visual column of a relative text offset.
    ///
    /// Offsets hidden inside a generated element map to the column after it.
    pub fn text_offset_to_visual_column(&self, relative: usize) -> Result<usize, LayoutError> {
        if relative > self.document_length {
            return Err(LayoutError::OffsetOutOfRange {
                offset: relative,
                len: self.document_length,
            });
        }
        Ok(self
            .elements
            .iter()
            .find(|e| e.relative_text_offset <= relative && relative <= e.relative_end())
            .map_or(self.visual_length, |e| e.visual_column_of(relative)))
    }

    /// Relative text offset of a visual column. `visual_length` maps to the end of the line.
    pub fn visual_column_to_text_offset(&self, column: usize) -> Result<usize, LayoutError> {
        if column > self.visual_length {
            return Err(LayoutError::ColumnOutOfRange {
                column,
                len: self.visual_length,
            });
        }
        Ok(self
            .elements
            .iter()
            .find(|e| e.visual_column <= column && column < e.visual_end())
            .map_or(self.document_length, |e| e.relative_offset_of(column)))
    }

    /// Visual column of an absolute document offset.
    pub fn document_offset_to_visual_column(&self, offset: usize) -> Result<usize, LayoutError> {
        let start = self.start_offset();
        let relative = offset
            .checked_sub(start)
            .filter(|relative| *relative <= self.document_length)
            .ok_or(LayoutError::OffsetOutOfRange {
                offset,
                len: start + self.document_length,
            })?;
        self.text_offset_to_visual_column(relative)
    }

    /// Absolute document offset of a visual column.
    pub fn visual_column_to_document_offset(&self, column: usize) -> Result<usize, LayoutError> {
        Ok(self.start_offset() + self.visual_column_to_text_offset(column)?)
    }

    /// Next caret stop strictly after (or before) `column`, or `None` at the line boundary.
    pub fn next_caret_position(
        &self,
        column: usize,
        direction: CaretDirection,
        mode: CaretMode,
    ) -> Option<usize> {
        match direction {
            CaretDirection::Forward => {
                let first = self.elements.iter().position(|e| e.visual_end() > column)?;
                self.elements[first..].iter().find_map(|e| {
                    let from = column.max(e.visual_column.saturating_sub(1));
                    e.next_caret_position(from, direction, mode)
                })
            }
            CaretDirection::Backward => {
                let last = self.elements.iter().rposition(|e| e.visual_column < column)?;
                self.elements[..=last].iter().rev().find_map(|e| {
                    let from = column.min(e.visual_end() + 1);
                    e.next_caret_position(from, direction, mode)
                })
            }
        }
    }

    /// Render payloads of every element, with tab expansion continuing across elements.
    pub fn render_runs(&self, config: &LayoutConfig) -> Vec<RenderRun> {
        let mut cell = 0;
        self.elements
            .iter()
            .map(|element| {
                let run = element.render_payload_at(config, cell);
                cell += run.cells;
                run
            })
            .collect()
    }

    /// The text a renderer would show, generated elements included.
    pub fn display_text(&self) -> String {
        self.elements
            .iter()
            .map(|e| match &e.kind {
                ElementKind::Text(run) => run.text(),
                ElementKind::Generated(element) => element.text.as_str(),
            })
            .collect()
    }
}

/// Assign visual columns and relative offsets; returns `(visual_length, document_length)`.
fn calculate_offsets(elements: &mut [VisualLineElement]) -> (usize, usize) {
    let mut visual = 0;
    let mut text = 0;
    for element in elements {
        element.visual_column = visual;
        element.relative_text_offset = text;
        visual += element.visual_length();
        text += element.document_length();
    }
    (visual, text)
}

/// Builds [`VisualLine`]s for one document.
#[derive(Debug, Clone, Copy)]
pub struct VisualLineBuilder<'a> {
    buffer: &'a TextBuffer,
    config: &'a LayoutConfig,
}

impl<'a> VisualLineBuilder<'a> {
    /// Create a builder over `buffer`.
    pub fn new(buffer: &'a TextBuffer, config: &'a LayoutConfig) -> Self {
        Self { buffer, config }
    }

    /// Build the visual line starting at document line `line_number` (1-based).
    ///
    /// `generators` are in priority order: when several are interested in the same offset,
    /// the first one that constructs an element wins.
    pub fn build(
        &self,
        line_number: usize,
        generators: &[&dyn ElementGenerator],
        transformers: &[&dyn VisualLineTransformer],
    ) -> Result<VisualLine, LayoutError> {
        let first_line = self.buffer.line(line_number)?;
        let context = BuildContext {
            buffer: self.buffer,
            first_line,
            config: self.config,
        };
        let document_end = self.buffer.len_chars();

        let mut elements = Vec::new();
        let mut interests: Vec<Option<usize>> = vec![None; generators.len()];
        let mut last_line = first_line;
        let mut offset = first_line.offset;
        let mut line_end = first_line.end_offset();
        // 0 right after a non-empty element, 1 otherwise.
        let mut ask_interest_offset = 0;

        while offset + ask_interest_offset <= line_end {
            let asked = offset + ask_interest_offset;
            let mut text_piece_end = line_end;
            for (generator, interest) in generators.iter().zip(interests.iter_mut()) {
                *interest = generator.first_interested_offset(&context, asked);
                if let Some(found) = *interest {
                    if found < asked {
                        return Err(LayoutError::InterestBeforeOffset {
                            generator: generator.name().to_string(),
                            offset: asked,
                            interest: found,
                        });
                    }
                    text_piece_end = text_piece_end.min(found);
                }
            }

            if text_piece_end > offset {
                let text = self.buffer.slice(offset, text_piece_end)?;
                elements.push(VisualLineElement::text(TextRun::new(text)));
                offset = text_piece_end;
            }

            ask_interest_offset = 1;
            for (generator, interest) in generators.iter().zip(interests.iter()) {
                if *interest != Some(offset) {
                    continue;
                }
                let Some(element) = generator.construct_element(&context, offset) else {
                    continue;
                };
                let length = element.document_length;
                if offset + length > document_end {
                    return Err(LayoutError::ElementPastDocumentEnd {
                        generator: generator.name().to_string(),
                        end: offset + length,
                        len: document_end,
                    });
                }
                elements.push(VisualLineElement::generated(element));
                if length > 0 {
                    ask_interest_offset = 0;
                    offset += length;
                    if offset > line_end {
                        last_line = self.buffer.line_by_offset(offset)?;
                        line_end = last_line.end_offset();
                    }
                    break;
                }
            }
        }

        let expected = line_end - first_line.offset;
        let (mut visual_length, mut document_length) = calculate_offsets(&mut elements);
        debug_assert_eq!(document_length, expected);

        for transformer in transformers {
            transformer.transform(&context, &mut elements);
            (visual_length, document_length) = calculate_offsets(&mut elements);
            if document_length != expected {
                return Err(LayoutError::TransformerChangedLength {
                    transformer: transformer.name().to_string(),
                    expected,
                    actual: document_length,
                });
            }
        }

        tracing::trace!(
            first_line = first_line.line_number,
            last_line = last_line.line_number,
            elements = elements.len(),
            visual_length,
            "visual line built"
        );

        Ok(VisualLine {
            first_line,
            last_line,
            elements,
            visual_length,
            document_length,
        })
    }
}
