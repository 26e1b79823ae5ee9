//! Per-document context.
//!
//! [`EditorDocument`] owns everything the annotation and layout machinery needs for one open
//! document: the text, its fold regions, the optional change tracker and the configuration.
//! Every edit goes through it so the three stay consistent: the buffer is mutated first, fold
//! offsets are rebased in the same call, and the tracker replays the edit's line events as
//! one batch.

use std::path::{Path, PathBuf};

use crate::baseline::BaselineProvider;
use crate::buffer::{BufferEdit, TextBuffer};
use crate::change_tracker::ChangeTracker;
use crate::config::EditorConfig;
use crate::error::Error;
use crate::folding::{FoldEvent, FoldId, FoldingModel};
use crate::generators::FoldingElementGenerator;
use crate::notify::SubscriptionId;
use crate::visual_line::{ElementGenerator, VisualLine, VisualLineBuilder, VisualLineTransformer};

/// One open document.
#[derive(Debug)]
pub struct EditorDocument {
    path: PathBuf,
    buffer: TextBuffer,
    folding: FoldingModel,
    tracker: Option<ChangeTracker>,
    config: EditorConfig,
}

impl EditorDocument {
    /// Open a document with initial `text`.
    pub fn new(path: impl Into<PathBuf>, text: &str, config: EditorConfig) -> Self {
        let buffer = TextBuffer::from_text(text);
        let folding = FoldingModel::new(buffer.len_chars());
        Self {
            path: path.into(),
            buffer,
            folding,
            tracker: None,
            config,
        }
    }

    /// Document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The text.
    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Fold regions.
    pub fn folding(&self) -> &FoldingModel {
        &self.folding
    }

    /// Configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Replace the configuration. Visual lines built afterwards use it.
    pub fn set_config(&mut self, config: EditorConfig) {
        self.config = config;
    }

    /// The change tracker, if attached.
    pub fn change_tracker(&self) -> Option<&ChangeTracker> {
        self.tracker.as_ref()
    }

    /// Mutable access to the change tracker (for subscriptions).
    pub fn change_tracker_mut(&mut self) -> Option<&mut ChangeTracker> {
        self.tracker.as_mut()
    }

    /// Start tracking changes against the baseline `provider` has for this document.
    ///
    /// Does nothing if a tracker is already attached.
    pub fn attach_change_tracker(&mut self, provider: &dyn BaselineProvider) -> Result<(), Error> {
        if self.tracker.is_some() {
            return Ok(());
        }
        let mut tracker = ChangeTracker::new();
        tracker.initialize(&self.buffer, self.path.clone(), provider)?;
        self.tracker = Some(tracker);
        Ok(())
    }

    /// Stop tracking changes. Returns `false` if no tracker was attached.
    pub fn detach_change_tracker(&mut self) -> bool {
        match self.tracker.take() {
            Some(mut tracker) => tracker.dispose(),
            None => false,
        }
    }

    /// Insert `text` at char `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<BufferEdit, Error> {
        let edit = self.buffer.insert(offset, text)?;
        self.propagate(edit)
    }

    /// Remove `len` chars at `offset`.
    pub fn remove(&mut self, offset: usize, len: usize) -> Result<BufferEdit, Error> {
        let edit = self.buffer.remove(offset, len)?;
        self.propagate(edit)
    }

    /// Replace `len` chars at `offset` with `text`.
    pub fn replace(&mut self, offset: usize, len: usize, text: &str) -> Result<BufferEdit, Error> {
        let edit = self.buffer.replace(offset, len, text)?;
        self.propagate(edit)
    }

    /// Replace the whole text. Fold regions are dropped.
    pub fn set_text(&mut self, text: &str) -> Result<BufferEdit, Error> {
        let edit = self.buffer.set_text(text);
        self.folding.reset(self.buffer.len_chars());
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.apply_events(&edit.events, &self.buffer)?;
        }
        Ok(edit)
    }

    /// Forward the "back to saved state" signal to the change tracker.
    pub fn mark_saved(&mut self, provider: &dyn BaselineProvider) -> Result<(), Error> {
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.on_saved(&self.buffer, provider)?;
        }
        Ok(())
    }

    /// Text ready to be written to disk, with the document's original line endings.
    pub fn text_for_saving(&self) -> String {
        self.buffer.text_for_saving()
    }

    /// Register a fold region.
    pub fn add_fold(
        &mut self,
        start: usize,
        end: usize,
        title: Option<String>,
    ) -> Result<FoldId, Error> {
        Ok(self.folding.add_fold(start, end, title)?)
    }

    /// Fold or unfold a region.
    pub fn set_folded(&mut self, id: FoldId, folded: bool) -> Result<(), Error> {
        Ok(self.folding.set_folded(id, folded)?)
    }

    /// Fold or unfold every region.
    pub fn set_all_folded(&mut self, folded: bool) {
        self.folding.set_all_folded(folded);
    }

    /// Remove a fold region.
    pub fn remove_fold(&mut self, id: FoldId) -> Result<(), Error> {
        self.folding.remove_fold(id)?;
        Ok(())
    }

    /// Subscribe to fold notifications: folding toggles and regions pruned by edits.
    pub fn subscribe_folds<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&FoldEvent) + Send + 'static,
    {
        self.folding.subscribe(callback)
    }

    /// Remove a fold callback.
    pub fn unsubscribe_folds(&mut self, id: SubscriptionId) -> bool {
        self.folding.unsubscribe(id)
    }

    /// Build the visual line starting at `line`.
    ///
    /// Folding has the highest priority; `extra_generators` follow in the given order.
    pub fn visual_line(
        &self,
        line: usize,
        extra_generators: &[&dyn ElementGenerator],
        transformers: &[&dyn VisualLineTransformer],
    ) -> Result<VisualLine, Error> {
        let folding = FoldingElementGenerator::new(&self.folding);
        let mut generators: Vec<&dyn ElementGenerator> = Vec::with_capacity(extra_generators.len() + 1);
        generators.push(&folding);
        generators.extend_from_slice(extra_generators);

        let builder = VisualLineBuilder::new(&self.buffer, &self.config.layout);
        Ok(builder.build(line, &generators, transformers)?)
    }

    /// Build up to `count` consecutive visual lines starting at document line `first`.
    ///
    /// Lines swallowed by a folded region do not get a visual line of their own.
    pub fn visible_lines(&self, first: usize, count: usize) -> Result<Vec<VisualLine>, Error> {
        let mut lines = Vec::with_capacity(count);
        let mut line = first;
        while lines.len() < count && line <= self.buffer.line_count() {
            let visual = self.visual_line(line, &[], &[])?;
            line = visual.last_document_line().line_number + 1;
            lines.push(visual);
        }
        Ok(lines)
    }

    fn propagate(&mut self, edit: BufferEdit) -> Result<BufferEdit, Error> {
        self.folding
            .apply_edit(edit.offset, edit.removed, edit.inserted)?;
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.apply_events(&edit.events, &self.buffer)?;
        }
        Ok(edit)
    }
}
