//! Cell DAG traversal that accumulates storage stats

use super::StorageStats;
use crate::model::{CellNode, Hash};
use std::collections::HashSet;

/// How a single [`collect`] call counts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectOptions {
    /// Leave the root's own bits and cell out of the total; descendants still count
    pub skip_root: bool,
    /// Count every occurrence and leave the visited set untouched
    pub ignore_visited: bool,
}

impl CollectOptions {
    /// Each distinct content hash counted once
    pub fn deduplicated() -> Self {
        CollectOptions::default()
    }

    /// Every reachable occurrence counted
    pub fn raw() -> Self {
        CollectOptions {
            skip_root: false,
            ignore_visited: true,
        }
    }

    pub fn skipping_root(mut self) -> Self {
        self.skip_root = true;
        self
    }
}

struct Frame<'a, C> {
    cell: &'a C,
    next_ref: usize,
    acc: StorageStats,
}

/// Admit `cell` into the walk, or `None` if it was already counted
///
/// The hash is recorded before any child is visited.
fn enter<'a, C: CellNode>(
    cell: &'a C,
    count_self: bool,
    visited: &mut HashSet<Hash>,
    ignore_visited: bool,
) -> Option<Frame<'a, C>> {
    if !ignore_visited && !visited.insert(cell.repr_hash()) {
        return None;
    }
    let acc = if count_self {
        StorageStats::single(cell.bit_len())
    } else {
        StorageStats::zero()
    };
    Some(Frame {
        cell,
        next_ref: 0,
        acc,
    })
}

/// Sum the bits and cells reachable from `root`
///
/// Unless `ignore_visited` is set, a cell whose hash is already in
/// `visited` contributes nothing and its references are not followed;
/// every other cell has its hash added to `visited`. Passing the same set
/// to several calls therefore counts shared subtrees only once across all
/// of them.
///
/// The graph must be acyclic and equal hashes must imply equal children;
/// neither is checked. Traversal uses a heap stack, so depth is bounded by
/// memory only. Children are visited in order and folded into their parent
/// after their own subtree completes.
pub fn collect<C: CellNode>(
    root: &C,
    visited: &mut HashSet<Hash>,
    options: CollectOptions,
) -> StorageStats {
    let ignore = options.ignore_visited;
    let mut stack = match enter(root, !options.skip_root, visited, ignore) {
        Some(frame) => vec![frame],
        None => return StorageStats::zero(),
    };
    let mut total = StorageStats::zero();

    while let Some(frame) = stack.last_mut() {
        let cell = frame.cell;
        match cell.refs().get(frame.next_ref) {
            Some(child) => {
                frame.next_ref += 1;
                if let Some(child_frame) = enter(child.as_ref(), true, visited, ignore) {
                    stack.push(child_frame);
                }
            }
            None => {
                if let Some(done) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.acc += done.acc,
                        None => total = done.acc,
                    }
                }
            }
        }
    }

    tracing::debug!(
        root = %root.repr_hash().short(),
        bits = %total.bits(),
        cells = %total.cells(),
        ?options,
        "collected cell stats"
    );
    total
}

/// Deduplicated stats of `root` on its own
pub fn collect_deduplicated<C: CellNode>(root: &C) -> StorageStats {
    collect(root, &mut HashSet::new(), CollectOptions::deduplicated())
}

/// Raw structural stats of `root`
pub fn collect_raw<C: CellNode>(root: &C) -> StorageStats {
    collect(root, &mut HashSet::new(), CollectOptions::raw())
}

/// Sum several roots against one visited set
///
/// Subtrees shared between roots are counted once for the whole batch.
pub fn collect_many<'a, C, I>(
    roots: I,
    visited: &mut HashSet<Hash>,
    options: CollectOptions,
) -> StorageStats
where
    C: CellNode + 'a,
    I: IntoIterator<Item = &'a C>,
{
    roots
        .into_iter()
        .map(|root| collect(root, visited, options))
        .sum()
}
