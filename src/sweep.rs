//! The Bentley-Ottmann style line-sweep driver: pops events from the
//! [`EventQueue`] in x-order and dispatches on type, maintaining the
//! [`SweepStatus`] of currently active segments.

use crate::error::{CrateError, Result};
use crate::events::{Event, EventQueue};
use crate::geometry::{ccw, get_intersection, has_point, is_crossed_by, y_at, Intersection, Point, Segment};
use crate::pairs::IndexPair;
use crate::status::{NodeId, SweepStatus};
use std::collections::{HashMap, HashSet};

/// Reinsertion offset past a shared intersection point, expressed as a
/// multiple of the caller's `eps` but clamped to an absolute range. The
/// offset must clear the ccw-zero tolerance band `insert_at` ties on, or the
/// reinserted segments land back inside each other's tie-break window and
/// can't be told apart, which argues for scaling with `eps`. But a coarse
/// user-supplied `eps` (for noisy real-world input) would otherwise push the
/// reinsertion x far past a short segment's actual extent, so the scaled
/// value is clamped to stay small in absolute terms regardless of `eps`.
const REINSERT_DX_EPS_MULTIPLE: f64 = 1e4;
const REINSERT_DX_MIN: f64 = 1e-9;
const REINSERT_DX_MAX: f64 = 1e-4;

/// Runs the line sweep over `segments` and returns every intersecting pair.
/// `eps` is the ccw-zero tolerance used throughout the status and the
/// geometric predicates.
pub fn find_intersections(segments: &[Segment], eps: f64) -> Result<HashSet<IndexPair>> {
    let mut queue = EventQueue::new();
    for seg in segments {
        if seg.is_vertical() {
            queue.insert(Event::VerticalSegment(*seg));
        } else {
            queue.insert(Event::SegmentStart(*seg));
            queue.insert(Event::SegmentEnd(*seg));
        }
    }
    log::debug!("sweep: {} segments, {} initial events", segments.len(), queue.len());

    let mut status = SweepStatus::new(eps);
    let mut results: HashSet<IndexPair> = HashSet::new();

    while let Some(event) = queue.pop_min() {
        #[cfg(debug_assertions)]
        debug_assert!(queue.assert_order(), "event queue invariant violated after pop");

        let current_x = event.trigger_x();
        log::trace!("dispatching event at x={current_x}");
        let mut ctx = SweepCtx { queue: &mut queue, results: &mut results, current_x, eps };
        match event {
            Event::SegmentStart(s) => handle_start(&mut ctx, &mut status, s),
            Event::SegmentEnd(s) => handle_end(&mut ctx, &mut status, s)?,
            Event::VerticalSegment(v) => handle_vertical(&mut ctx, &status, v),
            Event::Intersection { point, a, b } => handle_intersection(&mut ctx, &mut status, point, a, b)?,
        }
    }

    Ok(results)
}

fn points_equal(a: Point, b: Point, eps: f64) -> bool {
    (a.x - b.x).abs() <= eps && (a.y - b.y).abs() <= eps
}

/// Per-event-dispatch context shared by the pairwise-check helpers below:
/// the event queue and result set being accumulated, the sweep x at which
/// the current event fired, and the ccw-zero tolerance. Bundled to keep
/// `process_pair_if_crossing`/`walk_and_check` down to a handful of
/// parameters instead of threading all four through individually.
struct SweepCtx<'a> {
    queue: &'a mut EventQueue,
    results: &'a mut HashSet<IndexPair>,
    current_x: f64,
    eps: f64,
}

/// Classifies the intersection of `s` against `other`: records an overlap or
/// a past/current crossing directly into `ctx.results`, or enqueues a future
/// crossing as an `Intersection` event.
///
/// A past/current crossing at `pt` never goes through `handle_intersection`
/// (there's no queued event for it, since it's already behind the sweep
/// line), so it would otherwise only ever record this one pair even when a
/// third segment also passes through `pt` without being adjacent to `s`.
/// `close_group_at_point` recovers that closure by walking outward from
/// `other_node` for every other active segment also through `pt`.
fn process_pair_if_crossing(ctx: &mut SweepCtx, status: &SweepStatus, s: Segment, other: Segment, other_node: NodeId) {
    match get_intersection(&s, &other, ctx.eps) {
        Intersection::None => {}
        Intersection::Overlap => {
            ctx.results.insert(IndexPair::new(s.index, other.index));
        }
        Intersection::Point(pt) => {
            if pt.x > ctx.current_x + ctx.eps {
                ctx.queue.insert(Event::Intersection { point: pt, a: s, b: other });
            } else {
                ctx.results.insert(IndexPair::new(s.index, other.index));
                close_group_at_point(status, ctx.results, other_node, s, pt, ctx.eps);
            }
        }
    }
}

/// Collects every segment reachable by walking outward from `seed` that also
/// passes through `pt` within `eps`, and records the full pairwise
/// combination of that group (plus `extra`) into `results`.
///
/// `seed`'s own in-order neighbor on either side can be `extra`'s own tree
/// node (e.g. `extra` was just inserted next to `seed`), so segment indices
/// are deduplicated as they're collected rather than assumed distinct.
fn close_group_at_point(status: &SweepStatus, results: &mut HashSet<IndexPair>, seed: NodeId, extra: Segment, pt: Point, eps: f64) {
    let mut seen = HashSet::new();
    let mut members = Vec::new();
    let push = |seg: Segment, members: &mut Vec<Segment>, seen: &mut HashSet<usize>| {
        if seen.insert(seg.index) {
            members.push(seg);
        }
    };
    push(extra, &mut members, &mut seen);
    push(status.value(seed), &mut members, &mut seen);

    let mut cur = seed;
    while let Some(l) = status.left(cur) {
        let lseg = status.value(l);
        if !has_point(&lseg, pt, eps) {
            break;
        }
        push(lseg, &mut members, &mut seen);
        cur = l;
    }
    cur = seed;
    while let Some(r) = status.right(cur) {
        let rseg = status.value(r);
        if !has_point(&rseg, pt, eps) {
            break;
        }
        push(rseg, &mut members, &mut seen);
        cur = r;
    }

    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            results.insert(IndexPair::new(members[i].index, members[j].index));
        }
    }
}

/// Walks outward from `start`, checking each neighbor against `s`. The
/// immediate neighbor is always checked; the walk continues past it only
/// while successive neighbors are tied with `s` at its own start point
/// (several segments genuinely starting at the same coordinate), since those
/// are the only ones the single-neighbor check can't already account for.
/// Stopping on "does it cross" instead of "is it tied" would be wrong: a
/// neighbor can cross `s` without being adjacent to every other segment that
/// also crosses `s`, so continuing past a crossing (but untied) neighbor
/// risks skipping a real crossing further out while never reaching it again.
fn walk_and_check(
    ctx: &mut SweepCtx,
    status: &SweepStatus,
    mut neighbor: Option<NodeId>,
    s: Segment,
    next: impl Fn(&SweepStatus, NodeId) -> Option<NodeId>,
) {
    while let Some(nid) = neighbor {
        let other = status.value(nid);
        process_pair_if_crossing(ctx, status, s, other, nid);
        if ccw(&other, s.start).abs() > ctx.eps {
            break;
        }
        neighbor = next(status, nid);
    }
}

fn handle_start(ctx: &mut SweepCtx, status: &mut SweepStatus, s: Segment) {
    let node = status.insert(s);
    walk_and_check(ctx, status, status.left(node), s, |st, id| st.left(id));
    walk_and_check(ctx, status, status.right(node), s, |st, id| st.right(id));
}

fn handle_end(ctx: &mut SweepCtx, status: &mut SweepStatus, s: Segment) -> Result<()> {
    let node = status.find_with_reference_point(s.index, s.end).ok_or_else(|| {
        CrateError::InvariantViolation(format!(
            "segment {} not found in status while processing its end event",
            s.index
        ))
    })?;

    if let (Some(l), Some(r)) = (status.left(node), status.right(node)) {
        let lseg = status.value(l);
        let rseg = status.value(r);
        process_pair_if_crossing(ctx, status, lseg, rseg, r);
    }

    status.delete(node);
    Ok(())
}

fn handle_vertical(ctx: &mut SweepCtx, status: &SweepStatus, v: Segment) {
    let batch_x = v.start.x;
    let mut batch = vec![v];
    for e in ctx.queue.drain_while(|e| matches!(e, Event::VerticalSegment(s) if s.start.x == batch_x)) {
        if let Event::VerticalSegment(s) = e {
            batch.push(s);
        }
    }

    for i in 0..batch.len() {
        for j in i + 1..batch.len() {
            if is_crossed_by(&batch[i], &batch[j], ctx.eps) {
                ctx.results.insert(IndexPair::new(batch[i].index, batch[j].index));
            }
        }
    }

    for v_i in &batch {
        for other in status.find_vertical_intersections(v_i) {
            ctx.results.insert(IndexPair::new(v_i.index, other.index));
        }
    }
}

fn handle_intersection(ctx: &mut SweepCtx, status: &mut SweepStatus, point: Point, a: Segment, b: Segment) -> Result<()> {
    let eps = ctx.eps;
    let mut involved: HashMap<usize, Segment> = HashMap::new();
    involved.insert(a.index, a);
    involved.insert(b.index, b);

    for e in ctx.queue.drain_while(|e| matches!(e, Event::Intersection { point: p, .. } if points_equal(*p, point, eps))) {
        if let Event::Intersection { a: ia, b: ib, .. } = e {
            involved.insert(ia.index, ia);
            involved.insert(ib.index, ib);
        }
    }

    // `involved` is a HashMap; iteration order is not stable across runs, so
    // pick the smallest index rather than an arbitrary first key. Any member
    // of the group works as the seed, but the choice must be deterministic.
    let seed_index = *involved.keys().min().expect("at least one segment is involved in its own intersection event");
    let seed_node = status.find_with_reference_point(seed_index, point).ok_or_else(|| {
        CrateError::InvariantViolation(format!("segment {seed_index} missing from status during intersection handling"))
    })?;

    // Walk by actual geometry (`has_point`), not by `involved` membership: a
    // segment can pass through `point` and be tree-adjacent to the group
    // without ever having been scheduled against every other member (e.g.
    // two fully-overlapping segments where only one of them ever became
    // adjacent to a third crossing segment, so only that one got an
    // `Intersection` event queued). Restricting this walk to `involved` would
    // stop at such a segment and drop it from both the group reorder and the
    // pairwise closure below.
    let mut group_nodes = vec![seed_node];
    let mut cur = seed_node;
    while let Some(l) = status.left(cur) {
        if has_point(&status.value(l), point, eps) {
            group_nodes.push(l);
            cur = l;
        } else {
            break;
        }
    }
    cur = seed_node;
    while let Some(r) = status.right(cur) {
        if has_point(&status.value(r), point, eps) {
            group_nodes.push(r);
            cur = r;
        } else {
            break;
        }
    }

    // Every member of `involved` plus every segment found by the geometric
    // walk above passes through `point`, so every pairwise combination among
    // them genuinely intersects there, not just the pairs that happened to
    // arrive as queued events or happened to be tree-adjacent to `seed_node`
    // specifically.
    let mut members: HashMap<usize, Segment> = involved.clone();
    for &id in &group_nodes {
        let seg = status.value(id);
        members.insert(seg.index, seg);
    }
    let members: Vec<Segment> = members.values().copied().collect();
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            ctx.results.insert(IndexPair::new(members[i].index, members[j].index));
        }
    }

    // Reorder the group: remove every member, then reinsert each one ranked
    // by its position just past the intersection, rather than permuting
    // stored values in place (see the design notes on why in-place
    // permutation isn't safe across a rotation boundary).
    //
    // `group_nodes` was collected before any deletion; `SweepStatus::delete`
    // keeps every other live `NodeId` pinned to the same segment value across
    // rotations and splices, so deleting each captured id directly is safe
    // even though earlier deletions in this loop rebalance the tree.
    let group_segments: Vec<Segment> = group_nodes.iter().map(|&id| status.value(id)).collect();
    for &id in &group_nodes {
        status.delete(id);
    }

    let dx = (eps * REINSERT_DX_EPS_MULTIPLE).clamp(REINSERT_DX_MIN, REINSERT_DX_MAX);
    let reinsert_x = point.x + dx;
    let mut new_nodes = Vec::with_capacity(group_segments.len());
    for seg in &group_segments {
        let ref_point = Point::new(reinsert_x, y_at(seg, reinsert_x));
        new_nodes.push(status.insert_at(*seg, ref_point));
    }

    let new_node_set: HashSet<NodeId> = new_nodes.iter().copied().collect();
    let mut leftmost = new_nodes[0];
    while let Some(l) = status.left(leftmost) {
        if new_node_set.contains(&l) {
            leftmost = l;
        } else {
            break;
        }
    }
    let mut rightmost = new_nodes[0];
    while let Some(r) = status.right(rightmost) {
        if new_node_set.contains(&r) {
            rightmost = r;
        } else {
            break;
        }
    }

    if let Some(l) = status.left(leftmost) {
        process_pair_if_crossing(ctx, status, status.value(leftmost), status.value(l), l);
    }
    if let Some(r) = status.right(rightmost) {
        process_pair_if_crossing(ctx, status, status.value(rightmost), status.value(r), r);
    }

    Ok(())
}
