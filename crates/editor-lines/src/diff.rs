//! Line-level difference engine.
//!
//! Computes a minimal edit script between a baseline and a current sequence of lines using
//! Myers' O(ND) algorithm in its linear-space form (middle snake, divide and conquer).
//!
//! Lines are interned into integer ids through a shared hash table before diffing, so
//! comparing two lines during the search is a single integer comparison.
//!
//! The output is an ordered list of [`Edit`]s. Between two consecutive edits (and before the
//! first / after the last) the sequences are equal, so the edits plus the unchanged spans
//! between them cover `0..old.len()` and `0..new.len()` exactly, with no gaps or overlaps.

use std::collections::HashMap;
use std::ops::{Index, IndexMut, Range};

/// Kind of a single [`Edit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    /// Lines only present in the current sequence (`begin_a == end_a`).
    Inserted,
    /// Lines only present in the baseline (`begin_b == end_b`).
    Deleted,
    /// Baseline lines replaced by different current lines.
    Modified,
}

/// One hunk of the edit script.
///
/// `begin_a..end_a` is the baseline range, `begin_b..end_b` the current range (0-based,
/// half-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edit {
    /// Kind of change.
    pub kind: EditKind,
    /// Start of the baseline range.
    pub begin_a: usize,
    /// End of the baseline range (exclusive).
    pub end_a: usize,
    /// Start of the current range.
    pub begin_b: usize,
    /// End of the current range (exclusive).
    pub end_b: usize,
}

impl Edit {
    fn new(begin_a: usize, end_a: usize, begin_b: usize, end_b: usize) -> Self {
        let kind = match (end_a > begin_a, end_b > begin_b) {
            (true, true) => EditKind::Modified,
            (true, false) => EditKind::Deleted,
            _ => EditKind::Inserted,
        };
        Self {
            kind,
            begin_a,
            end_a,
            begin_b,
            end_b,
        }
    }

    /// Number of baseline lines covered.
    pub fn len_a(&self) -> usize {
        self.end_a - self.begin_a
    }

    /// Number of current lines covered.
    pub fn len_b(&self) -> usize {
        self.end_b - self.begin_b
    }

    /// Baseline range.
    pub fn range_a(&self) -> Range<usize> {
        self.begin_a..self.end_a
    }

    /// Current range.
    pub fn range_b(&self) -> Range<usize> {
        self.begin_b..self.end_b
    }
}

/// Maps line contents to dense ids so equal lines compare as equal integers.
#[derive(Debug, Default)]
pub struct LineInterner<'a> {
    ids: HashMap<&'a str, u32>,
}

impl<'a> LineInterner<'a> {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a single line.
    pub fn intern(&mut self, line: &'a str) -> u32 {
        let next = self.ids.len() as u32;
        *self.ids.entry(line).or_insert(next)
    }

    /// Intern a whole sequence.
    pub fn intern_all<S: AsRef<str>>(&mut self, lines: &'a [S]) -> Vec<u32> {
        lines.iter().map(|line| self.intern(line.as_ref())).collect()
    }

    /// Number of distinct lines seen so far.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if no line has been interned.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Diff two sequences of lines.
///
/// # Example
///
/// ```rust
/// use editor_lines::diff::{diff_lines, EditKind};
///
/// let edits = diff_lines(&["a", "b", "c"], &["a", "x", "c"]);
/// assert_eq!(edits.len(), 1);
/// assert_eq!(edits[0].kind, EditKind::Modified);
/// assert_eq!(edits[0].range_b(), 1..2);
/// ```
pub fn diff_lines<A, B>(old: &[A], new: &[B]) -> Vec<Edit>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut interner = LineInterner::new();
    let old_ids: Vec<u32> = old
        .iter()
        .map(|line| interner.intern(line.as_ref()))
        .collect();
    let new_ids: Vec<u32> = new
        .iter()
        .map(|line| interner.intern(line.as_ref()))
        .collect();
    let edits = diff_slices(&old_ids, &new_ids);
    tracing::trace!(
        old_lines = old.len(),
        new_lines = new.len(),
        distinct = interner.len(),
        edits = edits.len(),
        "line diff computed"
    );
    edits
}

/// Diff two slices of comparable items.
///
/// Deterministic: identical inputs always produce identical edit lists.
pub fn diff_slices<T: PartialEq>(old: &[T], new: &[T]) -> Vec<Edit> {
    let mut out = EditCollector::default();
    if old.is_empty() && new.is_empty() {
        return out.finish();
    }

    let max_d = max_d(old.len(), new.len());
    let mut vf = V::new(max_d);
    let mut vb = V::new(max_d);
    conquer(
        old,
        0..old.len(),
        new,
        0..new.len(),
        &mut vf,
        &mut vb,
        &mut out,
    );
    out.finish()
}

/// Collects raw delete/insert operations and coalesces touching ones into hunks.
#[derive(Debug, Default)]
struct EditCollector {
    edits: Vec<Edit>,
}

impl EditCollector {
    fn push(&mut self, a: Range<usize>, b: Range<usize>) {
        if a.is_empty() && b.is_empty() {
            return;
        }
        if let Some(prev) = self.edits.last_mut()
            && prev.end_a == a.start
            && prev.end_b == b.start
        {
            *prev = Edit::new(prev.begin_a, a.end, prev.begin_b, b.end);
            return;
        }
        self.edits.push(Edit::new(a.start, a.end, b.start, b.end));
    }

    fn finish(self) -> Vec<Edit> {
        self.edits
    }
}

fn max_d(len1: usize, len2: usize) -> usize {
    (len1 + len2).div_ceil(2) + 1
}

/// A diagonal-indexed vector (`k` ranges over `-offset..=offset`).
#[derive(Debug)]
struct V {
    offset: isize,
    v: Vec<usize>,
}

impl V {
    fn new(max_d: usize) -> Self {
        Self {
            offset: max_d as isize,
            v: vec![0; 2 * max_d + 1],
        }
    }
}

impl Index<isize> for V {
    type Output = usize;

    fn index(&self, k: isize) -> &usize {
        &self.v[(k + self.offset) as usize]
    }
}

impl IndexMut<isize> for V {
    fn index_mut(&mut self, k: isize) -> &mut usize {
        &mut self.v[(k + self.offset) as usize]
    }
}

fn common_prefix_len<T: PartialEq>(
    old: &[T],
    old_range: Range<usize>,
    new: &[T],
    new_range: Range<usize>,
) -> usize {
    old[old_range]
        .iter()
        .zip(&new[new_range])
        .take_while(|(a, b)| a == b)
        .count()
}

fn common_suffix_len<T: PartialEq>(
    old: &[T],
    old_range: Range<usize>,
    new: &[T],
    new_range: Range<usize>,
) -> usize {
    old[old_range]
        .iter()
        .rev()
        .zip(new[new_range].iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Find the start of the middle snake of an optimal path through `old_range` x `new_range`.
fn find_middle_snake<T: PartialEq>(
    old: &[T],
    old_range: Range<usize>,
    new: &[T],
    new_range: Range<usize>,
    vf: &mut V,
    vb: &mut V,
) -> Option<(usize, usize)> {
    let n = old_range.len();
    let m = new_range.len();

    let delta = n as isize - m as isize;
    let odd = delta & 1 == 1;

    vf[1] = 0;
    vb[1] = 0;

    let d_max = max_d(n, m) as isize;
    for d in 0..d_max {
        // Forward paths.
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && vf[k - 1] < vf[k + 1]) {
                vf[k + 1]
            } else {
                vf[k - 1] + 1
            };
            let y = (x as isize - k) as usize;
            let (x0, y0) = (x, y);
            if x < n && y < m {
                x += common_prefix_len(
                    old,
                    old_range.start + x..old_range.end,
                    new,
                    new_range.start + y..new_range.end,
                );
            }
            vf[k] = x;

            if odd && (k - delta).abs() <= d - 1 && vf[k] + vb[-(k - delta)] >= n {
                return Some((x0 + old_range.start, y0 + new_range.start));
            }
        }

        // Backward paths.
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && vb[k - 1] < vb[k + 1]) {
                vb[k + 1]
            } else {
                vb[k - 1] + 1
            };
            let mut y = (x as isize - k) as usize;
            if x < n && y < m {
                let advance = common_suffix_len(
                    old,
                    old_range.start..old_range.start + n - x,
                    new,
                    new_range.start..new_range.start + m - y,
                );
                x += advance;
                y += advance;
            }
            vb[k] = x;

            if !odd && (k - delta).abs() <= d && vb[k] + vf[-(k - delta)] >= n {
                return Some((n - x + old_range.start, m - y + new_range.start));
            }
        }
    }

    None
}

fn conquer<T: PartialEq>(
    old: &[T],
    mut old_range: Range<usize>,
    new: &[T],
    mut new_range: Range<usize>,
    vf: &mut V,
    vb: &mut V,
    out: &mut EditCollector,
) {
    let prefix = common_prefix_len(old, old_range.clone(), new, new_range.clone());
    old_range.start += prefix;
    new_range.start += prefix;

    let suffix = common_suffix_len(old, old_range.clone(), new, new_range.clone());
    old_range.end -= suffix;
    new_range.end -= suffix;

    if old_range.is_empty() || new_range.is_empty() {
        out.push(old_range, new_range);
        return;
    }

    match find_middle_snake(old, old_range.clone(), new, new_range.clone(), vf, vb) {
        Some((x, y))
            if (x, y) != (old_range.start, new_range.start)
                && (x, y) != (old_range.end, new_range.end) =>
        {
            conquer(old, old_range.start..x, new, new_range.start..y, vf, vb, out);
            conquer(old, x..old_range.end, new, y..new_range.end, vf, vb, out);
        }
        _ => out.push(old_range, new_range),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Walk the edits and check they tile both index spaces.
    fn assert_covers(edits: &[Edit], old: &[u32], new: &[u32]) {
        let (mut a, mut b) = (0usize, 0usize);
        for edit in edits {
            assert!(edit.begin_a >= a && edit.begin_b >= b, "edits out of order");
            // The gap before the edit is an unchanged span of equal length on both sides.
            assert_eq!(edit.begin_a - a, edit.begin_b - b);
            assert_eq!(old[a..edit.begin_a], new[b..edit.begin_b]);
            assert!(edit.len_a() > 0 || edit.len_b() > 0, "empty edit");
            a = edit.end_a;
            b = edit.end_b;
        }
        assert_eq!(old.len() - a, new.len() - b);
        assert_eq!(old[a..], new[b..]);
    }

    fn edit_distance(edits: &[Edit]) -> usize {
        edits.iter().map(|e| e.len_a() + e.len_b()).sum()
    }

    /// Reference LCS-based distance for small inputs.
    fn lcs_distance(old: &[u32], new: &[u32]) -> usize {
        let mut dp = vec![vec![0usize; new.len() + 1]; old.len() + 1];
        for i in (0..old.len()).rev() {
            for j in (0..new.len()).rev() {
                dp[i][j] = if old[i] == new[j] {
                    dp[i + 1][j + 1] + 1
                } else {
                    dp[i + 1][j].max(dp[i][j + 1])
                };
            }
        }
        old.len() + new.len() - 2 * dp[0][0]
    }

    #[test]
    fn test_both_empty() {
        assert!(diff_lines::<&str, &str>(&[], &[]).is_empty());
    }

    #[test]
    fn test_identical() {
        let lines = ["a", "b", "c"];
        assert!(diff_lines(&lines, &lines).is_empty());
    }

    #[test]
    fn test_pure_insert_and_delete() {
        assert_eq!(
            diff_lines(&["a", "c"], &["a", "b", "c"]),
            vec![Edit {
                kind: EditKind::Inserted,
                begin_a: 1,
                end_a: 1,
                begin_b: 1,
                end_b: 2,
            }]
        );
        assert_eq!(
            diff_lines(&["a", "b"], &["a"]),
            vec![Edit {
                kind: EditKind::Deleted,
                begin_a: 1,
                end_a: 2,
                begin_b: 1,
                end_b: 1,
            }]
        );
    }

    #[test]
    fn test_modified() {
        assert_eq!(
            diff_lines(&["a", "b", "c"], &["a", "x", "c"]),
            vec![Edit {
                kind: EditKind::Modified,
                begin_a: 1,
                end_a: 2,
                begin_b: 1,
                end_b: 2,
            }]
        );
    }

    #[test]
    fn test_fully_disjoint() {
        let edits = diff_lines(&["a", "b"], &["x", "y", "z"]);
        assert_eq!(
            edits,
            vec![Edit {
                kind: EditKind::Modified,
                begin_a: 0,
                end_a: 2,
                begin_b: 0,
                end_b: 3,
            }]
        );

        let edits = diff_lines::<&str, &str>(&["a", "b"], &[]);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].kind, EditKind::Deleted);

        let edits = diff_lines::<&str, &str>(&[], &["a"]);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].kind, EditKind::Inserted);
    }

    #[test]
    fn test_duplicate_lines() {
        let old = ["}", "}", "fn a() {", "}"];
        let new = ["}", "fn a() {", "}", "}"];
        let edits = diff_lines(&old, &new);
        assert_eq!(edit_distance(&edits), 2);
    }

    #[test]
    fn test_interner_shares_ids() {
        let old = ["x", "y"];
        let new = ["y", "z"];
        let mut interner = LineInterner::new();
        let a = interner.intern_all(&old);
        let b = interner.intern_all(&new);
        assert_eq!(a[1], b[0]);
        assert_eq!(interner.len(), 3);
    }

    #[test]
    fn test_random_coverage_minimality_and_determinism() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..300 {
            let old: Vec<u32> = (0..rng.gen_range(0..30))
                .map(|_| rng.gen_range(0..4))
                .collect();
            let new: Vec<u32> = (0..rng.gen_range(0..30))
                .map(|_| rng.gen_range(0..4))
                .collect();

            let edits = diff_slices(&old, &new);
            assert_covers(&edits, &old, &new);
            assert_eq!(edit_distance(&edits), lcs_distance(&old, &new));
            assert_eq!(edits, diff_slices(&old, &new));
        }
    }

    #[test]
    fn test_large_inputs() {
        let old: Vec<u32> = (0..5_000).collect();
        let mut new = old.clone();
        new.remove(10);
        new.insert(2_500, 99_999);
        new[4_000] = 77_777;

        let edits = diff_slices(&old, &new);
        assert_covers(&edits, &old, &new);
        assert_eq!(edits.len(), 3);
        assert_eq!(edits[0].kind, EditKind::Deleted);
        assert_eq!(edits[1].kind, EditKind::Inserted);
        assert_eq!(edits[2].kind, EditKind::Modified);
    }
}
