//! Run-length compressed list.
//!
//! [`RunList`] stores a sequence of values addressed by a 0-based index, but physically keeps
//! `(value, run_length)` nodes in a balanced tree (a treap ordered by position). Adjacent equal
//! elements collapse into a single node, so a document of 100k unchanged lines costs one node.
//!
//! - `get` / `set`: O(log r)
//! - `insert_range` / `remove_range`: O(log r), independent of the number of elements inserted
//! - `transform`: O(r)
//!
//! where `r` is the number of runs. Equality between values is decided by a caller-supplied
//! predicate (defaulting to [`PartialEq`]).
//!
//! Invariant: no two adjacent runs ever hold equal values. Every mutation goes through
//! [`join`], which coalesces the runs meeting at the seam.

use std::fmt;

use crate::error::RunListError;

type Link<T> = Option<Box<Node<T>>>;

#[derive(Clone)]
struct Node<T> {
    value: T,
    /// Number of elements in this run (always > 0).
    run: usize,
    /// Number of elements in this subtree.
    total: usize,
    /// Number of runs in this subtree.
    runs: usize,
    priority: u32,
    left: Link<T>,
    right: Link<T>,
}

impl<T> Node<T> {
    fn leaf(value: T, run: usize, priority: u32) -> Box<Self> {
        Box::new(Self {
            value,
            run,
            total: run,
            runs: 1,
            priority,
            left: None,
            right: None,
        })
    }

    fn update(&mut self) {
        self.total = total(&self.left) + self.run + total(&self.right);
        self.runs = runs(&self.left) + 1 + runs(&self.right);
    }
}

fn total<T>(link: &Link<T>) -> usize {
    link.as_ref().map_or(0, |node| node.total)
}

fn runs<T>(link: &Link<T>) -> usize {
    link.as_ref().map_or(0, |node| node.runs)
}

fn first<T>(link: &Link<T>) -> Option<&Node<T>> {
    let mut node = link.as_deref()?;
    while let Some(left) = node.left.as_deref() {
        node = left;
    }
    Some(node)
}

fn last<T>(link: &Link<T>) -> Option<&Node<T>> {
    let mut node = link.as_deref()?;
    while let Some(right) = node.right.as_deref() {
        node = right;
    }
    Some(node)
}

/// Concatenate two trees. Every element of `a` precedes every element of `b`.
fn merge<T>(a: Link<T>, b: Link<T>) -> Link<T> {
    match (a, b) {
        (None, b) => b,
        (a, None) => a,
        (Some(mut a), Some(mut b)) => {
            if a.priority >= b.priority {
                a.right = merge(a.right.take(), Some(b));
                a.update();
                Some(a)
            } else {
                b.left = merge(Some(a), b.left.take());
                b.update();
                Some(b)
            }
        }
    }
}

/// Split a tree so that the left part holds exactly `at` elements.
///
/// A run straddling the split point is cut in two; both halves keep the original priority.
fn split<T: Clone>(link: Link<T>, at: usize) -> (Link<T>, Link<T>) {
    let Some(mut node) = link else {
        return (None, None);
    };

    let left_total = total(&node.left);
    if at <= left_total {
        let (l, r) = split(node.left.take(), at);
        node.left = r;
        node.update();
        (l, Some(node))
    } else if at >= left_total + node.run {
        let (l, r) = split(node.right.take(), at - left_total - node.run);
        node.right = l;
        node.update();
        (Some(node), r)
    } else {
        let keep = at - left_total;
        let mut tail = Node::leaf(node.value.clone(), node.run - keep, node.priority);
        tail.right = node.right.take();
        tail.update();
        node.run = keep;
        node.update();
        (Some(node), Some(tail))
    }
}

/// Detach the last run. Returns `(rest, last_run)`; the detached node has no children.
fn pop_last<T>(link: Link<T>) -> (Link<T>, Link<T>) {
    let Some(mut node) = link else {
        return (None, None);
    };

    if node.right.is_some() {
        let (rest, popped) = pop_last(node.right.take());
        node.right = rest;
        node.update();
        (Some(node), popped)
    } else {
        let rest = node.left.take();
        node.update();
        (rest, Some(node))
    }
}

/// Detach the first run. Returns `(first_run, rest)`; the detached node has no children.
fn pop_first<T>(link: Link<T>) -> (Link<T>, Link<T>) {
    let Some(mut node) = link else {
        return (None, None);
    };

    if node.left.is_some() {
        let (popped, rest) = pop_first(node.left.take());
        node.left = rest;
        node.update();
        (popped, Some(node))
    } else {
        let rest = node.right.take();
        node.update();
        (Some(node), rest)
    }
}

/// Concatenate two trees, coalescing the runs that meet at the seam if they are equal.
fn join<T>(a: Link<T>, b: Link<T>, eq: fn(&T, &T) -> bool) -> Link<T> {
    let coalesce = match (last(&a), first(&b)) {
        (Some(x), Some(y)) => eq(&x.value, &y.value),
        _ => false,
    };
    if !coalesce {
        return merge(a, b);
    }

    let (a_rest, a_last) = pop_last(a);
    let (b_first, b_rest) = pop_first(b);
    match (a_last, b_first) {
        (Some(mut node), Some(next)) => {
            node.run += next.run;
            node.update();
            merge(merge(a_rest, Some(node)), b_rest)
        }
        (a_last, b_first) => merge(merge(a_rest, a_last), merge(b_first, b_rest)),
    }
}

fn drain_into<T>(link: Link<T>, out: &mut Vec<(T, usize)>) {
    if let Some(node) = link {
        let Node {
            value,
            run,
            left,
            right,
            ..
        } = *node;
        drain_into(left, out);
        out.push((value, run));
        drain_into(right, out);
    }
}

/// Build a balanced tree from `count` runs taken in order from `runs`.
///
/// Priorities are capped by `ceiling` so the heap order holds along every root-to-leaf path.
fn build<T>(
    count: usize,
    runs: &mut impl Iterator<Item = (T, usize)>,
    priorities: &mut PriorityGen,
    ceiling: u32,
) -> Link<T> {
    if count == 0 {
        return None;
    }
    let priority = priorities.next().min(ceiling);
    let left_count = count / 2;
    let left = build(left_count, runs, priorities, priority);
    let (value, run) = runs.next()?;
    let right = build(count - left_count - 1, runs, priorities, priority);

    let mut node = Node::leaf(value, run, priority);
    node.left = left;
    node.right = right;
    node.update();
    Some(node)
}

/// Deterministic xorshift priorities, so identical operation sequences produce identical trees.
#[derive(Debug, Clone)]
struct PriorityGen(u64);

impl PriorityGen {
    const SEED: u64 = 0x9E37_79B9_7F4A_7C15;

    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        (x >> 32) as u32
    }
}

/// An ordered, run-length compressed list.
///
/// # Example
///
/// ```rust
/// use editor_lines::RunList;
///
/// let mut list = RunList::new();
/// list.insert_range(0, 100_000, 0u8).unwrap();
/// assert_eq!(list.run_count(), 1);
///
/// list.set(500, 1).unwrap();
/// assert_eq!(list.run_count(), 3);
/// assert_eq!(list.get(500), Some(&1));
///
/// list.transform(|_| 7);
/// assert_eq!(list.run_count(), 1);
/// ```
#[derive(Clone)]
pub struct RunList<T> {
    root: Link<T>,
    eq: fn(&T, &T) -> bool,
    priorities: PriorityGen,
}

impl<T: Clone + PartialEq> RunList<T> {
    /// Create an empty list that compares values with [`PartialEq`].
    pub fn new() -> Self {
        Self::with_eq(<T as PartialEq>::eq)
    }
}

impl<T: Clone + PartialEq> Default for RunList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> RunList<T> {
    /// Create an empty list that compares adjacent values with `eq`.
    pub fn with_eq(eq: fn(&T, &T) -> bool) -> Self {
        Self {
            root: None,
            eq,
            priorities: PriorityGen(PriorityGen::SEED),
        }
    }

    /// Logical number of elements.
    pub fn len(&self) -> usize {
        total(&self.root)
    }

    /// Returns `true` if the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of stored runs.
    pub fn run_count(&self) -> usize {
        runs(&self.root)
    }

    /// Get the element at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        let mut link = &self.root;
        let mut index = index;
        while let Some(node) = link {
            let left_total = total(&node.left);
            if index < left_total {
                link = &node.left;
            } else if index < left_total + node.run {
                return Some(&node.value);
            } else {
                index -= left_total + node.run;
                link = &node.right;
            }
        }
        None
    }

    /// Replace the element at `index`.
    ///
    /// The position may merge into a neighboring run or split the run that contained it.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), RunListError> {
        let len = self.len();
        let Some(current) = self.get(index) else {
            return Err(RunListError::IndexOutOfRange { index, len });
        };
        if (self.eq)(current, &value) {
            return Ok(());
        }

        let (left, rest) = split(self.root.take(), index);
        let (_, right) = split(rest, 1);
        let priority = self.priorities.next();
        let left = join(left, Some(Node::leaf(value, 1, priority)), self.eq);
        self.root = join(left, right, self.eq);
        Ok(())
    }

    /// Insert `count` copies of `value` before `index` (`index == len` appends).
    pub fn insert_range(&mut self, index: usize, count: usize, value: T) -> Result<(), RunListError> {
        let len = self.len();
        if index > len {
            return Err(RunListError::IndexOutOfRange { index, len });
        }
        if count == 0 {
            return Ok(());
        }

        let priority = self.priorities.next();
        let (left, right) = split(self.root.take(), index);
        let left = join(left, Some(Node::leaf(value, count, priority)), self.eq);
        self.root = join(left, right, self.eq);
        Ok(())
    }

    /// Insert a single element before `index`.
    pub fn insert(&mut self, index: usize, value: T) -> Result<(), RunListError> {
        self.insert_range(index, 1, value)
    }

    /// Append a single element.
    pub fn push(&mut self, value: T) {
        let priority = self.priorities.next();
        let root = self.root.take();
        self.root = join(root, Some(Node::leaf(value, 1, priority)), self.eq);
    }

    /// Append `count` copies of `value`.
    pub fn push_run(&mut self, count: usize, value: T) {
        if count == 0 {
            return;
        }
        let priority = self.priorities.next();
        let root = self.root.take();
        self.root = join(root, Some(Node::leaf(value, count, priority)), self.eq);
    }

    /// Remove `count` elements starting at `index`.
    pub fn remove_range(&mut self, index: usize, count: usize) -> Result<(), RunListError> {
        let len = self.len();
        let end = index.saturating_add(count);
        if end > len {
            return Err(RunListError::RangeOutOfRange {
                start: index,
                end,
                len,
            });
        }
        if count == 0 {
            return Ok(());
        }

        let (left, rest) = split(self.root.take(), index);
        let (_, right) = split(rest, count);
        self.root = join(left, right, self.eq);
        Ok(())
    }

    /// Remove the element at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<(), RunListError> {
        let len = self.len();
        if index >= len {
            return Err(RunListError::IndexOutOfRange { index, len });
        }
        self.remove_range(index, 1)
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.root = None;
    }

    /// Rewrite every stored value through `f`, re-merging runs that become equal.
    ///
    /// `f` is called once per run, not once per element.
    pub fn transform<F>(&mut self, mut f: F)
    where
        F: FnMut(&T) -> T,
    {
        let mut drained = Vec::with_capacity(self.run_count());
        drain_into(self.root.take(), &mut drained);

        let mut mapped: Vec<(T, usize)> = Vec::with_capacity(drained.len());
        for (value, run) in drained {
            let value = f(&value);
            match mapped.last_mut() {
                Some((prev, prev_run)) if (self.eq)(prev, &value) => *prev_run += run,
                _ => mapped.push((value, run)),
            }
        }

        let count = mapped.len();
        self.root = build(count, &mut mapped.into_iter(), &mut self.priorities, u32::MAX);
    }

    /// Iterate over every element in index order.
    ///
    /// The iterator is lazy; calling `iter` again restarts from the beginning.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            runs: self.runs(),
            current: None,
        }
    }

    /// Iterate over `(value, run_length)` pairs in index order.
    pub fn runs(&self) -> Runs<'_, T> {
        let mut runs = Runs { stack: Vec::new() };
        runs.push_left_spine(self.root.as_deref());
        runs
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        fn walk<T>(link: &Link<T>, ceiling: u32) -> (usize, usize) {
            match link {
                None => (0, 0),
                Some(node) => {
                    assert!(node.run > 0, "empty run");
                    assert!(node.priority <= ceiling, "heap order violated");
                    let (lt, lr) = walk(&node.left, node.priority);
                    let (rt, rr) = walk(&node.right, node.priority);
                    assert_eq!(node.total, lt + node.run + rt, "stale total");
                    assert_eq!(node.runs, lr + 1 + rr, "stale run count");
                    (node.total, node.runs)
                }
            }
        }
        walk(&self.root, u32::MAX);

        let runs: Vec<_> = self.runs().collect();
        for pair in runs.windows(2) {
            assert!(!(self.eq)(pair[0].0, pair[1].0), "adjacent runs are equal");
        }
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for RunList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.runs()).finish()
    }
}

impl<'a, T: Clone> IntoIterator for &'a RunList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the runs of a [`RunList`].
#[derive(Debug)]
pub struct Runs<'a, T> {
    stack: Vec<&'a Node<T>>,
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("value", &self.value)
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

impl<'a, T> Runs<'a, T> {
    fn push_left_spine(&mut self, mut node: Option<&'a Node<T>>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a, T> Iterator for Runs<'a, T> {
    type Item = (&'a T, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        Some((&node.value, node.run))
    }
}

/// Element iterator of a [`RunList`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    runs: Runs<'a, T>,
    current: Option<(&'a T, usize)>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((value, remaining)) = self.current.as_mut()
                && *remaining > 0
            {
                *remaining -= 1;
                return Some(*value);
            }
            self.current = Some(self.runs.next()?);
        }
    }
}
