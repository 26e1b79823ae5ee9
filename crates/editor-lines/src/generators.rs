//! Built-in element generators and transformers.

use crate::folding::FoldingModel;
use crate::visual_line::{
    BuildContext, ElementGenerator, ElementKind, GeneratedElement, GeneratedKind, StyleId,
    VisualLineElement, VisualLineTransformer,
};

/// Replaces folded regions with a placeholder element.
///
/// When several folded regions start at the same offset, the one reaching furthest wins.
#[derive(Debug, Clone, Copy)]
pub struct FoldingElementGenerator<'a> {
    folding: &'a FoldingModel,
}

impl<'a> FoldingElementGenerator<'a> {
    /// Generator over `folding`.
    pub fn new(folding: &'a FoldingModel) -> Self {
        Self { folding }
    }
}

impl ElementGenerator for FoldingElementGenerator<'_> {
    fn name(&self) -> &str {
        "FoldingElementGenerator"
    }

    fn first_interested_offset(&self, _context: &BuildContext<'_>, from: usize) -> Option<usize> {
        self.folding.next_folded_start(from)
    }

    fn construct_element(
        &self,
        context: &BuildContext<'_>,
        offset: usize,
    ) -> Option<GeneratedElement> {
        let region = self.folding.widest_folded_at(offset)?;
        if region.end <= offset {
            return None;
        }
        let title = region
            .title
            .as_deref()
            .filter(|title| !title.is_empty())
            .unwrap_or(&context.config.fold_placeholder);
        Some(GeneratedElement::new(
            GeneratedKind::FoldPlaceholder(region.id),
            title,
            region.end - offset,
        ))
    }
}

/// A styled span of absolute document offsets `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleSpan {
    /// Start char offset (inclusive).
    pub start: usize,
    /// End char offset (exclusive).
    pub end: usize,
    /// Style applied to the span.
    pub style_id: StyleId,
}

impl StyleSpan {
    /// Create a span.
    pub fn new(start: usize, end: usize, style_id: StyleId) -> Self {
        Self {
            start,
            end,
            style_id,
        }
    }
}

/// Splits text elements at style span boundaries and tags the pieces.
///
/// Generated elements are tagged when a span covers their whole document range (or, for
/// zero-length elements, their position). Overlapping spans stack in span order.
#[derive(Debug, Clone, Default)]
pub struct StyleTransformer {
    spans: Vec<StyleSpan>,
}

impl StyleTransformer {
    /// Transformer applying `spans`. Empty spans are ignored.
    pub fn new(spans: Vec<StyleSpan>) -> Self {
        let spans = spans.into_iter().filter(|s| s.end > s.start).collect();
        Self { spans }
    }

    /// The spans applied.
    pub fn spans(&self) -> &[StyleSpan] {
        &self.spans
    }

    fn styles_for(&self, start: usize, end: usize) -> Vec<StyleId> {
        self.spans
            .iter()
            .filter(|s| {
                if start == end {
                    s.start <= start && start < s.end
                } else {
                    s.start <= start && end <= s.end
                }
            })
            .map(|s| s.style_id)
            .collect()
    }
}

impl VisualLineTransformer for StyleTransformer {
    fn name(&self) -> &str {
        "StyleTransformer"
    }

    fn transform(&self, context: &BuildContext<'_>, elements: &mut Vec<VisualLineElement>) {
        if self.spans.is_empty() {
            return;
        }
        let line_start = context.first_line.offset;
        let mut result = Vec::with_capacity(elements.len());

        for element in elements.drain(..) {
            let start = line_start + element.relative_text_offset;
            let end = start + element.document_length();

            let run = match element.kind {
                ElementKind::Text(run) => run,
                ElementKind::Generated(generated) => {
                    let mut styles = element.styles;
                    styles.extend(self.styles_for(start, end));
                    result.push(VisualLineElement::generated(generated).with_styles(styles));
                    continue;
                }
            };

            let mut cuts: Vec<usize> = self
                .spans
                .iter()
                .flat_map(|s| [s.start, s.end])
                .filter(|&cut| start < cut && cut < end)
                .collect();
            cuts.sort_unstable();
            cuts.dedup();

            let mut rest = run;
            let mut piece_start = start;
            for cut in cuts.into_iter().chain(std::iter::once(end)) {
                let (piece, tail) = rest.split_at(cut - piece_start);
                let mut styles = element.styles.clone();
                styles.extend(self.styles_for(piece_start, cut));
                result.push(VisualLineElement::text(piece).with_styles(styles));
                rest = tail;
                piece_start = cut;
            }
        }

        *elements = result;
    }
}
