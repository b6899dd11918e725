//! Smallest window of positions covering every matched query term.
//!
//! Two searches are available. The greedy search anchors on each position of
//! the first term and chains nearest neighbours through the remaining terms,
//! branching when a neighbour is equidistant above and below the anchor. It is
//! a heuristic and can miss the true minimum. The sliding-window search merges
//! the sorted position lists and is exact.
//!
//! Both are bounded by a step budget; `None` means the budget ran out.

use crate::config::ProximityStrategy;
use crate::index::Position;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

struct Budget {
    remaining: usize,
}

impl Budget {
    fn step(&mut self) -> Option<()> {
        self.remaining = self.remaining.checked_sub(1)?;
        Some(())
    }
}

/// Smallest window (`max - min + 1`) found with `strategy`, or `None` if any
/// list is empty or the budget is exhausted.
pub fn min_window(lists: &[&[Position]], strategy: ProximityStrategy, step_budget: usize) -> Option<u32> {
    if lists.is_empty() || lists.iter().any(|l| l.is_empty()) {
        return None;
    }
    let mut budget = Budget { remaining: step_budget };
    match strategy {
        ProximityStrategy::Greedy => greedy_min_window(lists, &mut budget),
        ProximityStrategy::SlidingWindow => sliding_min_window(lists, &mut budget),
    }
}

/// `terms / min_window`; 1.0 when every term occurs back to back.
pub fn proximity_score(lists: &[&[Position]], strategy: ProximityStrategy, step_budget: usize) -> Option<f64> {
    let window = min_window(lists, strategy, step_budget)?;
    Some(lists.len() as f64 / f64::from(window))
}

type Bounds = (i64, i64);

fn span((lo, hi): Bounds) -> i64 {
    hi - lo + 1
}

fn greedy_min_window(lists: &[&[Position]], budget: &mut Budget) -> Option<u32> {
    let floor = lists.len() as i64;
    let mut best: Option<i64> = None;
    for &anchor in lists[0] {
        let anchor = i64::from(anchor);
        let window = span(chain(anchor, &lists[1..], (anchor, anchor), budget)?);
        best = Some(best.map_or(window, |b| b.min(window)));
        if window == floor {
            break;
        }
    }
    best.map(|w| w as u32)
}

fn chain(anchor: i64, rest: &[&[Position]], bounds: Bounds, budget: &mut Budget) -> Option<Bounds> {
    let Some((current, remaining)) = rest.split_first() else {
        return Some(bounds);
    };
    budget.step()?;

    let distance = (anchor - nearest(current, anchor)).abs();
    let up = anchor + distance;
    let down = anchor - distance;
    let up_ok = contains(current, up);
    let down_ok = contains(current, down);
    let widen = |p: i64| (bounds.0.min(p), bounds.1.max(p));

    if up_ok && down_ok && up != down && !remaining.is_empty() {
        let upper = chain(up, remaining, widen(up), budget)?;
        let lower = chain(down, remaining, widen(down), budget)?;
        return Some(if span(upper) <= span(lower) { upper } else { lower });
    }
    let next = if up_ok { up } else { down };
    chain(next, remaining, widen(next), budget)
}

/// Position in the ascending `list` closest to `target`; lower one on ties.
fn nearest(list: &[Position], target: i64) -> i64 {
    let idx = list.partition_point(|&p| i64::from(p) < target);
    let above = list.get(idx).map(|&p| i64::from(p));
    let below = idx.checked_sub(1).map(|i| i64::from(list[i]));
    match (below, above) {
        (Some(b), Some(a)) => if target - b <= a - target { b } else { a },
        (Some(b), None) => b,
        (None, Some(a)) => a,
        (None, None) => target,
    }
}

fn contains(list: &[Position], value: i64) -> bool {
    u32::try_from(value).map_or(false, |v| list.binary_search(&v).is_ok())
}

fn sliding_min_window(lists: &[&[Position]], budget: &mut Budget) -> Option<u32> {
    let floor = lists.len() as u32;
    let mut cursors = vec![0usize; lists.len()];
    let mut heap = BinaryHeap::with_capacity(lists.len());
    let mut hi = 0;
    for (i, list) in lists.iter().enumerate() {
        hi = hi.max(list[0]);
        heap.push(Reverse((list[0], i)));
    }

    let mut best = u32::MAX;
    while let Some(Reverse((lo, i))) = heap.pop() {
        budget.step()?;
        best = best.min(hi - lo + 1);
        if best == floor {
            break;
        }
        cursors[i] += 1;
        let Some(&next) = lists[i].get(cursors[i]) else { break };
        hi = hi.max(next);
        heap.push(Reverse((next, i)));
    }
    Some(best)
}
