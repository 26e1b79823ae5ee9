//! Fold regions.
//!
//! A [`FoldRegion`] is a collapsible char range `start..end` of the document. Regions may nest
//! or be disjoint, and two regions may share the same bounds. The [`FoldingModel`] keeps them
//! sorted by start offset (ties broken by registration order) together with a prefix-maximum
//! of their end offsets, so point queries prune early instead of scanning every region.
//!
//! Folded regions are additionally indexed by start offset, which answers "where does the next
//! folded region start" in O(log f).
//!
//! Offsets are rebased synchronously through [`FoldingModel::apply_edit`] as part of the same
//! edit that moves the buffer text.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::error::FoldingError;
use crate::notify::{Subscribers, SubscriptionId};

/// Stable handle of a fold region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FoldId(pub u64);

/// A collapsible span of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldRegion {
    /// Handle of this region.
    pub id: FoldId,
    /// Start char offset (inclusive).
    pub start: usize,
    /// End char offset (exclusive). Always greater than `start`.
    pub end: usize,
    /// Whether the region is currently collapsed.
    pub is_folded: bool,
    /// Placeholder text shown when folded. `None` uses the configured default.
    pub title: Option<String>,
}

impl FoldRegion {
    /// Check if `offset` lies inside the region.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Always `false` for a live region; zero-length regions are pruned.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Notification published by a [`FoldingModel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldEvent {
    /// Visual lines intersecting `start..=end` must be rebuilt.
    Invalidated {
        /// First affected offset.
        start: usize,
        /// Last affected offset.
        end: usize,
    },
    /// A region disappeared, either explicitly or because an edit collapsed it.
    Removed {
        /// Handle of the removed region.
        id: FoldId,
    },
}

/// Owns the fold regions of one document.
#[derive(Debug)]
pub struct FoldingModel {
    /// Sorted by `(start, id)`.
    regions: Vec<FoldRegion>,
    /// `prefix_max_end[i] = max(regions[0..=i].end)`.
    prefix_max_end: Vec<usize>,
    /// `(start, id)` of every folded region.
    folded_starts: BTreeSet<(usize, FoldId)>,
    document_length: usize,
    next_id: u64,
    subscribers: Subscribers<FoldEvent>,
}

impl FoldingModel {
    /// Create an empty model for a document of `document_length` chars.
    pub fn new(document_length: usize) -> Self {
        Self {
            regions: Vec::new(),
            prefix_max_end: Vec::new(),
            folded_starts: BTreeSet::new(),
            document_length,
            next_id: 0,
            subscribers: Subscribers::new(),
        }
    }

    /// Document length the model currently assumes.
    pub fn document_length(&self) -> usize {
        self.document_length
    }

    /// Register a new (unfolded) region.
    pub fn add_fold(
        &mut self,
        start: usize,
        end: usize,
        title: Option<String>,
    ) -> Result<FoldId, FoldingError> {
        if end <= start || end > self.document_length {
            return Err(FoldingError::InvalidRange {
                start,
                end,
                len: self.document_length,
            });
        }

        let id = FoldId(self.next_id);
        self.next_id += 1;

        let pos = self.regions.partition_point(|r| (r.start, r.id) < (start, id));
        self.regions.insert(
            pos,
            FoldRegion {
                id,
                start,
                end,
                is_folded: false,
                title,
            },
        );
        self.prefix_max_end.insert(pos, 0);
        self.rebuild_prefix_max_end_from(pos);
        Ok(id)
    }

    /// Remove a region.
    pub fn remove_fold(&mut self, id: FoldId) -> Result<FoldRegion, FoldingError> {
        let pos = self.position(id)?;
        let region = self.regions.remove(pos);
        self.prefix_max_end.remove(pos);
        self.rebuild_prefix_max_end_from(pos);

        if region.is_folded {
            self.folded_starts.remove(&(region.start, region.id));
            self.subscribers.notify(&FoldEvent::Invalidated {
                start: region.start,
                end: region.end,
            });
        }
        self.subscribers.notify(&FoldEvent::Removed { id });
        Ok(region)
    }

    /// Remove every region.
    pub fn clear(&mut self) {
        let removed = std::mem::take(&mut self.regions);
        self.prefix_max_end.clear();
        self.folded_starts.clear();
        for region in removed {
            if region.is_folded {
                self.subscribers.notify(&FoldEvent::Invalidated {
                    start: region.start,
                    end: region.end,
                });
            }
            self.subscribers.notify(&FoldEvent::Removed { id: region.id });
        }
    }

    /// Fold or unfold a region. Setting the current state again is a no-op.
    pub fn set_folded(&mut self, id: FoldId, folded: bool) -> Result<(), FoldingError> {
        let pos = self.position(id)?;
        self.set_folded_at(pos, folded);
        Ok(())
    }

    /// Fold or unfold every region.
    pub fn set_all_folded(&mut self, folded: bool) {
        for pos in 0..self.regions.len() {
            self.set_folded_at(pos, folded);
        }
    }

    fn set_folded_at(&mut self, pos: usize, folded: bool) {
        let region = &mut self.regions[pos];
        if region.is_folded == folded {
            return;
        }

        region.is_folded = folded;
        let (start, end, id) = (region.start, region.end, region.id);
        if folded {
            self.folded_starts.insert((start, id));
        } else {
            self.folded_starts.remove(&(start, id));
        }
        self.subscribers
            .notify(&FoldEvent::Invalidated { start, end });
    }

    /// Look up a region.
    pub fn get(&self, id: FoldId) -> Option<&FoldRegion> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// All regions, sorted by start offset then registration order.
    pub fn folds(&self) -> &[FoldRegion] {
        &self.regions
    }

    /// Number of regions.
    pub fn fold_count(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` if there are no regions.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Start offset of the first region starting at or after `offset`.
    pub fn next_region_start(&self, offset: usize) -> Option<usize> {
        let idx = self.regions.partition_point(|r| r.start < offset);
        self.regions.get(idx).map(|r| r.start)
    }

    /// Start offset of the first *folded* region starting at or after `offset`.
    pub fn next_folded_start(&self, offset: usize) -> Option<usize> {
        self.folded_starts
            .range((offset, FoldId(0))..)
            .next()
            .map(|(start, _)| *start)
    }

    /// All regions containing `offset`, outermost first.
    ///
    /// Regions are ordered by start ascending, then end descending, then registration order,
    /// so the innermost (and, among identical ranges, the most recently registered) comes last.
    pub fn regions_covering(&self, offset: usize) -> Vec<&FoldRegion> {
        let idx = self.regions.partition_point(|r| r.start <= offset);
        let mut result = Vec::new();
        for i in (0..idx).rev() {
            // No region in `regions[0..=i]` reaches past `offset`.
            if self.prefix_max_end[i] <= offset {
                break;
            }
            let region = &self.regions[i];
            if region.contains(offset) {
                result.push(region);
            }
        }
        result.sort_by_key(|r| (r.start, Reverse(r.end), r.id));
        result
    }

    /// The folded region starting at `offset` that reaches furthest.
    ///
    /// Regions that merely cover `offset` are ignored, so a build starting inside a folded
    /// region shows its text up to the next folded start. Ties keep the earliest registered.
    pub fn widest_folded_at(&self, offset: usize) -> Option<&FoldRegion> {
        let first = self.regions.partition_point(|r| r.start < offset);
        let mut best: Option<&FoldRegion> = None;
        for region in self.regions[first..].iter().take_while(|r| r.start == offset) {
            if region.is_folded && best.is_none_or(|b| region.end > b.end) {
                best = Some(region);
            }
        }
        best
    }

    /// Rebase every region for an edit that replaced `removed` chars at `offset` with
    /// `inserted` chars.
    ///
    /// Regions entirely inside the removed span collapse to zero length and are pruned (a
    /// [`FoldEvent::Removed`] is published for each). Regions spanning the edit grow or shrink
    /// by the net length delta; regions after it shift.
    pub fn apply_edit(
        &mut self,
        offset: usize,
        removed: usize,
        inserted: usize,
    ) -> Result<(), FoldingError> {
        let removed_end = offset.saturating_add(removed);
        if removed_end > self.document_length {
            return Err(FoldingError::InvalidRange {
                start: offset,
                end: removed_end,
                len: self.document_length,
            });
        }

        if removed > 0 {
            for region in &mut self.regions {
                if region.end <= offset {
                    // Before the removed span.
                } else if region.start >= removed_end {
                    region.start -= removed;
                    region.end -= removed;
                } else if region.start >= offset && region.end <= removed_end {
                    // Inside the removed span; pruned below.
                    region.start = offset;
                    region.end = offset;
                } else if region.start < offset && region.end > removed_end {
                    region.end -= removed;
                } else if region.start < offset {
                    region.end = offset;
                } else {
                    region.start = offset;
                    region.end -= removed;
                }
            }
        }

        if inserted > 0 {
            for region in &mut self.regions {
                if region.start >= offset && !(region.is_empty() && region.start == offset) {
                    region.start += inserted;
                    region.end += inserted;
                } else if region.end > offset {
                    region.end += inserted;
                }
            }
        }

        self.document_length = self.document_length - removed + inserted;

        let mut pruned = Vec::new();
        self.regions.retain(|region| {
            if region.is_empty() {
                pruned.push(region.id);
                false
            } else {
                true
            }
        });
        self.regions.sort_by_key(|r| (r.start, r.id));
        self.folded_starts = self
            .regions
            .iter()
            .filter(|r| r.is_folded)
            .map(|r| (r.start, r.id))
            .collect();
        self.rebuild_prefix_max_end_from(0);

        tracing::trace!(
            offset,
            removed,
            inserted,
            pruned = pruned.len(),
            remaining = self.regions.len(),
            "fold regions rebased"
        );
        for id in pruned {
            self.subscribers.notify(&FoldEvent::Removed { id });
        }
        Ok(())
    }

    /// Reset the model for a wholesale document replacement.
    pub fn reset(&mut self, document_length: usize) {
        self.clear();
        self.document_length = document_length;
    }

    /// Subscribe to fold notifications.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&FoldEvent) + Send + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn position(&self, id: FoldId) -> Result<usize, FoldingError> {
        self.regions
            .iter()
            .position(|r| r.id == id)
            .ok_or(FoldingError::UnknownFold(id))
    }

    fn rebuild_prefix_max_end_from(&mut self, start_idx: usize) {
        self.prefix_max_end.resize(self.regions.len(), 0);
        let mut max_end = match start_idx {
            0 => 0,
            i => self.prefix_max_end.get(i - 1).copied().unwrap_or(0),
        };
        for (idx, region) in self.regions.iter().enumerate().skip(start_idx) {
            max_end = max_end.max(region.end);
            self.prefix_max_end[idx] = max_end;
        }
    }
}
