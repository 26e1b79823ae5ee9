//! Per-line change annotations.
//!
//! A [`ChangeTracker`] keeps one [`LineChangeInfo`] per document line, classifying it against
//! a baseline (the last saved or committed text). Records live in a [`RunList`], so a document
//! of mostly unchanged lines costs a handful of runs regardless of its length.
//!
//! Index 0 of the record list is a sentinel for "before the first line": baseline lines deleted
//! at the very top of the document are attached to it. Line `n` (1-based) lives at index `n`,
//! so the record list always holds `line_count + 1` entries.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --initialize--> WithBaseline | WithoutBaseline --dispose--> Disposed
//! ```
//!
//! Live edits are replayed from the buffer's [`LineEvent`] feed; a save (the host's "back to
//! saved state" signal) goes through [`ChangeTracker::on_saved`].

use std::path::{Path, PathBuf};

use crate::baseline::{BaselineProvider, load_baseline};
use crate::buffer::{LineEvent, TextBuffer, split_lines};
use crate::diff::{EditKind, diff_lines};
use crate::error::TrackerError;
use crate::notify::{Subscribers, SubscriptionId};
use crate::run_list::RunList;

/// Change classification of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChangeKind {
    /// Unchanged relative to the baseline (or never touched when there is no baseline).
    #[default]
    None,
    /// The line does not exist in the baseline.
    Inserted,
    /// Baseline lines were removed here.
    ///
    /// The tracker records deletions as [`LineChangeInfo::deleted_text_after`] on the
    /// preceding line instead, so it never stores this kind itself.
    Deleted,
    /// The line replaces different baseline content.
    Modified,
    /// Edited in this session and not saved yet.
    Unsaved,
    /// Edited in this session and saved, but never compared against a baseline.
    Saved,
}

impl From<EditKind> for ChangeKind {
    fn from(kind: EditKind) -> Self {
        match kind {
            EditKind::Inserted => ChangeKind::Inserted,
            EditKind::Deleted => ChangeKind::Deleted,
            EditKind::Modified => ChangeKind::Modified,
        }
    }
}

/// Change record of one line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineChangeInfo {
    /// Classification of the line itself.
    pub kind: ChangeKind,
    /// Baseline lines deleted directly after this line, joined with `'\n'`.
    pub deleted_text_after: Option<String>,
}

impl LineChangeInfo {
    /// Record with `kind` and no deleted text.
    pub fn new(kind: ChangeKind) -> Self {
        Self {
            kind,
            deleted_text_after: None,
        }
    }

    /// Returns `true` if the line or its trailing deletion differs from the baseline.
    pub fn is_changed(&self) -> bool {
        self.kind != ChangeKind::None || self.deleted_text_after.is_some()
    }
}

/// Lifecycle state of a [`ChangeTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// `initialize` has not run yet.
    Uninitialized,
    /// Lines are classified against a baseline.
    WithBaseline,
    /// No baseline is available; only session edits are tracked.
    WithoutBaseline,
    /// The tracker was disposed.
    Disposed,
}

/// Published after every batch that may have changed annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeOccurred {
    /// Tracker version after the batch. Strictly increasing.
    pub version: u64,
}

/// Baseline and current text of one line, for inline diff popups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiffPair {
    /// Baseline line with the same number, if the baseline is that long.
    pub baseline: Option<String>,
    /// Current text of the line.
    pub current: String,
}

/// Tracks per-line change annotations of one document.
#[derive(Debug)]
pub struct ChangeTracker {
    records: RunList<LineChangeInfo>,
    baseline: Option<Vec<String>>,
    path: Option<PathBuf>,
    state: TrackerState,
    version: u64,
    subscribers: Subscribers<ChangeOccurred>,
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeTracker {
    /// Create an uninitialized tracker.
    pub fn new() -> Self {
        Self {
            records: RunList::new(),
            baseline: None,
            path: None,
            state: TrackerState::Uninitialized,
            version: 0,
            subscribers: Subscribers::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Current version; bumped on every published [`ChangeOccurred`].
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Path the baseline is looked up for.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Baseline lines, if a baseline is tracked.
    pub fn baseline(&self) -> Option<&[String]> {
        self.baseline.as_deref()
    }

    /// Number of document lines tracked (excluding the sentinel).
    pub fn line_count(&self) -> usize {
        self.records.len().saturating_sub(1)
    }

    /// Load the baseline of `path` from `provider` and classify every line of `buffer`.
    ///
    /// An unreadable baseline is logged and treated as absent. Calling this on an initialized
    /// tracker does nothing.
    pub fn initialize(
        &mut self,
        buffer: &TextBuffer,
        path: impl Into<PathBuf>,
        provider: &dyn BaselineProvider,
    ) -> Result<(), TrackerError> {
        self.ensure_not_disposed()?;
        if self.state != TrackerState::Uninitialized {
            return Ok(());
        }

        let path = path.into();
        let baseline = match load_baseline(provider, &path) {
            Ok(baseline) => baseline,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "baseline unreadable, tracking without baseline");
                None
            }
        };
        self.path = Some(path);
        self.install_baseline(buffer, baseline)
    }

    /// Classify every line of `buffer` against in-memory baseline text.
    ///
    /// Calling this on an initialized tracker does nothing.
    pub fn initialize_with_baseline(
        &mut self,
        buffer: &TextBuffer,
        baseline: Option<&str>,
    ) -> Result<(), TrackerError> {
        self.ensure_not_disposed()?;
        if self.state != TrackerState::Uninitialized {
            return Ok(());
        }
        self.install_baseline(buffer, baseline.map(split_lines))
    }

    /// Handle the host's "document is back at its saved state" signal.
    ///
    /// With a baseline, the baseline is reloaded (the last good one is kept if the provider
    /// fails) and the document is diffed again. Without one, every [`ChangeKind::Unsaved`] line
    /// becomes [`ChangeKind::Saved`].
    pub fn on_saved(
        &mut self,
        buffer: &TextBuffer,
        provider: &dyn BaselineProvider,
    ) -> Result<(), TrackerError> {
        self.ensure_initialized()?;

        if let Some(path) = self.path.clone() {
            match load_baseline(provider, &path) {
                Ok(Some(lines)) => self.baseline = Some(lines),
                Ok(None) => self.baseline = None,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "baseline unreadable on save, keeping previous baseline");
                }
            }
        }

        if self.baseline.is_some() {
            self.rebuild_from_diff(buffer)?;
            self.state = TrackerState::WithBaseline;
        } else {
            self.records.transform(|info| {
                if info.kind == ChangeKind::Unsaved {
                    LineChangeInfo {
                        kind: ChangeKind::Saved,
                        deleted_text_after: info.deleted_text_after.clone(),
                    }
                } else {
                    info.clone()
                }
            });
            self.state = TrackerState::WithoutBaseline;
        }
        self.publish();
        Ok(())
    }

    /// The content of `line` changed but the line count did not.
    pub fn line_length_changed(&mut self, line: usize) -> Result<(), TrackerError> {
        self.ensure_initialized()?;
        self.apply_event(LineEvent::LineLengthChanged { line })?;
        self.publish();
        Ok(())
    }

    /// A line was inserted directly after `after`.
    pub fn line_inserted(&mut self, after: usize) -> Result<(), TrackerError> {
        self.ensure_initialized()?;
        self.apply_event(LineEvent::LineInserted { after })?;
        self.publish();
        Ok(())
    }

    /// `line` is being removed.
    pub fn line_removed(&mut self, line: usize) -> Result<(), TrackerError> {
        self.ensure_initialized()?;
        self.apply_event(LineEvent::LineRemoved { line })?;
        self.publish();
        Ok(())
    }

    /// The whole document was replaced; every line becomes [`ChangeKind::Unsaved`].
    pub fn document_rebuilt(&mut self, line_count: usize) -> Result<(), TrackerError> {
        self.ensure_initialized()?;
        self.rebuild_unsaved(line_count);
        self.publish();
        Ok(())
    }

    /// Replay one buffer edit's events and publish a single [`ChangeOccurred`].
    pub fn apply_events(
        &mut self,
        events: &[LineEvent],
        buffer: &TextBuffer,
    ) -> Result<(), TrackerError> {
        self.ensure_initialized()?;
        if events.is_empty() {
            return Ok(());
        }
        for event in events {
            match *event {
                LineEvent::DocumentRebuilt => self.rebuild_unsaved(buffer.line_count()),
                event => self.apply_event(event)?,
            }
        }
        debug_assert_eq!(self.line_count(), buffer.line_count());
        self.publish();
        Ok(())
    }

    /// Change record of `line`. Line 0 is the sentinel before the first line.
    pub fn get_change(&self, line: usize) -> Result<&LineChangeInfo, TrackerError> {
        self.ensure_initialized()?;
        self.records
            .get(line)
            .ok_or(TrackerError::LineOutOfRange {
                line,
                line_count: self.line_count(),
            })
    }

    /// Baseline and current text of `line`.
    pub fn get_diffs_by_line(
        &self,
        line: usize,
        buffer: &TextBuffer,
    ) -> Result<LineDiffPair, TrackerError> {
        self.ensure_initialized()?;
        let line_count = self.line_count();
        if line == 0 || line > line_count {
            return Err(TrackerError::LineOutOfRange { line, line_count });
        }
        let current = buffer
            .line_text(line)
            .map_err(|_| TrackerError::LineOutOfRange { line, line_count })?;
        let baseline = self
            .baseline
            .as_ref()
            .and_then(|lines| lines.get(line - 1))
            .cloned();
        Ok(LineDiffPair { baseline, current })
    }

    /// `(line_number, record)` for every document line, in order.
    pub fn changes(&self) -> impl Iterator<Item = (usize, &LineChangeInfo)> + '_ {
        self.records.iter().enumerate().skip(1)
    }

    /// Number of lines whose record reports a change.
    pub fn changed_line_count(&self) -> usize {
        let changed: usize = self
            .records
            .runs()
            .filter(|(info, _)| info.is_changed())
            .map(|(_, run)| run)
            .sum();
        // The sentinel is not a line.
        let sentinel = self.records.get(0).is_some_and(LineChangeInfo::is_changed);
        changed - usize::from(sentinel)
    }

    /// Register a [`ChangeOccurred`] callback.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ChangeOccurred) + Send + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Remove a callback.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Detach the tracker. Returns `true` the first time, `false` afterwards.
    pub fn dispose(&mut self) -> bool {
        if self.state == TrackerState::Disposed {
            return false;
        }
        self.state = TrackerState::Disposed;
        self.subscribers.clear();
        self.records.clear();
        self.baseline = None;
        tracing::debug!(path = ?self.path, "change tracker disposed");
        true
    }

    fn ensure_not_disposed(&self) -> Result<(), TrackerError> {
        match self.state {
            TrackerState::Disposed => Err(TrackerError::Disposed),
            _ => Ok(()),
        }
    }

    fn ensure_initialized(&self) -> Result<(), TrackerError> {
        match self.state {
            TrackerState::Disposed => Err(TrackerError::Disposed),
            TrackerState::Uninitialized => Err(TrackerError::Uninitialized),
            _ => Ok(()),
        }
    }

    fn install_baseline(
        &mut self,
        buffer: &TextBuffer,
        baseline: Option<Vec<String>>,
    ) -> Result<(), TrackerError> {
        self.baseline = baseline;
        self.records.clear();
        if self.baseline.is_some() {
            self.rebuild_from_diff(buffer)?;
            self.state = TrackerState::WithBaseline;
        } else {
            self.records.push_run(buffer.line_count() + 1, LineChangeInfo::default());
            self.state = TrackerState::WithoutBaseline;
            tracing::debug!(lines = buffer.line_count(), "change tracker initialized without baseline");
        }
        Ok(())
    }

    fn rebuild_from_diff(&mut self, buffer: &TextBuffer) -> Result<(), TrackerError> {
        let Some(baseline) = self.baseline.as_ref() else {
            return Ok(());
        };
        let current = buffer.line_texts();
        let edits = diff_lines(baseline, &current);

        let mut records = RunList::new();
        records.push(LineChangeInfo::default());
        let mut last_end_b = 0;
        for edit in &edits {
            records.push_run(edit.begin_b - last_end_b, LineChangeInfo::default());
            if edit.kind == EditKind::Deleted {
                let deleted = baseline[edit.range_a()].join("\n");
                let mut info = records.get(edit.begin_b).cloned().unwrap_or_default();
                info.deleted_text_after = Some(match info.deleted_text_after {
                    Some(existing) => format!("{existing}\n{deleted}"),
                    None => deleted,
                });
                records.set(edit.begin_b, info)?;
            } else {
                records.push_run(edit.len_b(), LineChangeInfo::new(edit.kind.into()));
            }
            last_end_b = edit.end_b;
        }
        records.push_run(current.len() - last_end_b, LineChangeInfo::default());

        tracing::debug!(
            baseline_lines = baseline.len(),
            current_lines = current.len(),
            edits = edits.len(),
            runs = records.run_count(),
            "change tracker diffed against baseline"
        );
        self.records = records;
        Ok(())
    }

    fn rebuild_unsaved(&mut self, line_count: usize) {
        self.records.clear();
        self.records
            .push_run(line_count + 1, LineChangeInfo::new(ChangeKind::Unsaved));
    }

    fn apply_event(&mut self, event: LineEvent) -> Result<(), TrackerError> {
        let line_count = self.line_count();
        let out_of_range = |line| TrackerError::LineOutOfRange { line, line_count };

        match event {
            LineEvent::LineLengthChanged { line } => {
                if line == 0 || line > line_count {
                    return Err(out_of_range(line));
                }
                let mut info = self.records.get(line).cloned().ok_or(out_of_range(line))?;
                info.kind = ChangeKind::Unsaved;
                self.records.set(line, info)?;
            }
            LineEvent::LineInserted { after } => {
                let mut first = self.records.get(after).cloned().ok_or(out_of_range(after))?;
                let new_line = LineChangeInfo {
                    kind: ChangeKind::Unsaved,
                    deleted_text_after: first.deleted_text_after.take(),
                };
                first.kind = ChangeKind::Unsaved;
                self.records.insert(after + 1, new_line)?;
                self.records.set(after, first)?;
            }
            LineEvent::LineRemoved { line } => {
                if line == 0 || line > line_count {
                    return Err(out_of_range(line));
                }
                self.records.remove_at(line)?;
            }
            LineEvent::DocumentRebuilt => self.rebuild_unsaved(line_count),
        }
        Ok(())
    }

    fn publish(&mut self) {
        self.version += 1;
        let event = ChangeOccurred {
            version: self.version,
        };
        self.subscribers.notify(&event);
    }
}
