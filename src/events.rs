//! The sweep's event queue: an ordered multiset of [`Event`]s, keyed by
//! trigger x, then event-type priority, then per-type tiebreakers. Backed by
//! an arena-allocated AVL tree so the queue owns no raw pointers.

use crate::geometry::{Point, Segment};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;

/// A sweep event. Each variant carries the segment(s) that produced it.
#[derive(Debug, Clone, Copy)]
pub enum Event {
    SegmentStart(Segment),
    SegmentEnd(Segment),
    VerticalSegment(Segment),
    Intersection { point: Point, a: Segment, b: Segment },
}

impl Event {
    pub fn trigger_x(&self) -> f64 {
        match self {
            Event::SegmentStart(s) => s.start.x,
            Event::VerticalSegment(s) => s.start.x,
            Event::SegmentEnd(s) => s.end.x,
            Event::Intersection { point, .. } => point.x,
        }
    }

    fn type_priority(&self) -> u8 {
        match self {
            Event::SegmentStart(_) => 1,
            Event::VerticalSegment(_) => 2,
            Event::Intersection { .. } => 3,
            Event::SegmentEnd(_) => 4,
        }
    }

    /// The full comparator key per the event queue's ordering rules: trigger
    /// x, then type priority, then a per-type tiebreaker (segment index for
    /// Start/End/Vertical; (y, max index, min index) for Intersection).
    fn sort_key(&self) -> EventKey {
        match self {
            Event::SegmentStart(s) | Event::VerticalSegment(s) => EventKey(
                OrderedFloat(self.trigger_x()),
                self.type_priority(),
                OrderedFloat(0.0),
                s.index,
                0,
            ),
            Event::SegmentEnd(s) => EventKey(
                OrderedFloat(self.trigger_x()),
                self.type_priority(),
                OrderedFloat(0.0),
                s.index,
                0,
            ),
            Event::Intersection { point, a, b } => EventKey(
                OrderedFloat(point.x),
                self.type_priority(),
                OrderedFloat(point.y),
                a.index.max(b.index),
                a.index.min(b.index),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey(OrderedFloat<f64>, u8, OrderedFloat<f64>, usize, usize);

struct QNode {
    key: EventKey,
    value: Event,
    left: Option<usize>,
    right: Option<usize>,
    height: i32,
}

/// An ordered multiset of events with duplicate suppression: inserting an
/// event that compares equal (under the full key) to one already present is
/// silently dropped, per the queue's contract.
#[derive(Default)]
pub struct EventQueue {
    nodes: Vec<QNode>,
    free: Vec<usize>,
    root: Option<usize>,
    len: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `event`. Returns `false` (and drops the event) if an event
    /// with an equal sort key is already queued.
    pub fn insert(&mut self, event: Event) -> bool {
        let key = event.sort_key();
        let mut inserted = false;
        self.root = self.insert_rec(self.root, key, event, &mut inserted);
        if inserted {
            self.len += 1;
        } else {
            log::warn!("dropping duplicate event at x={}", event.trigger_x());
        }
        inserted
    }

    pub fn peek_min(&self) -> Option<&Event> {
        let mut cur = self.root?;
        while let Some(l) = self.nodes[cur].left {
            cur = l;
        }
        Some(&self.nodes[cur].value)
    }

    pub fn pop_min(&mut self) -> Option<Event> {
        let root = self.root?;
        let (new_root, value) = self.delete_min_rec(root);
        self.root = new_root;
        self.len -= 1;
        Some(value)
    }

    /// Pops and returns every event for which `pred` holds, in ascending
    /// order, stopping at the first event that doesn't match (or the queue
    /// becoming empty). Used to drain batches of same-x verticals or
    /// same-point intersections.
    pub fn drain_while(&mut self, pred: impl Fn(&Event) -> bool) -> Vec<Event> {
        let mut out = Vec::new();
        while let Some(ev) = self.peek_min() {
            if !pred(ev) {
                break;
            }
            out.push(self.pop_min().unwrap());
        }
        out
    }

    pub fn assert_order(&self) -> bool {
        fn rec(nodes: &[QNode], n: Option<usize>, min: Option<EventKey>, max: Option<EventKey>) -> bool {
            match n {
                None => true,
                Some(i) => {
                    let node = &nodes[i];
                    if let Some(m) = min {
                        if node.key < m {
                            return false;
                        }
                    }
                    if let Some(m) = max {
                        if node.key > m {
                            return false;
                        }
                    }
                    rec(nodes, node.left, min, Some(node.key)) && rec(nodes, node.right, Some(node.key), max)
                }
            }
        }
        rec(&self.nodes, self.root, None, None)
    }

    fn alloc(&mut self, key: EventKey, value: Event) -> usize {
        let node = QNode { key, value, left: None, right: None, height: 1 };
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = node;
            idx
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn height(&self, n: Option<usize>) -> i32 {
        n.map_or(0, |i| self.nodes[i].height)
    }

    fn update_height(&mut self, n: usize) {
        let h = 1 + self.height(self.nodes[n].left).max(self.height(self.nodes[n].right));
        self.nodes[n].height = h;
    }

    fn balance_factor(&self, n: usize) -> i32 {
        self.height(self.nodes[n].left) - self.height(self.nodes[n].right)
    }

    fn rotate_right(&mut self, n: usize) -> usize {
        let l = self.nodes[n].left.expect("rotate_right requires a left child");
        let lr = self.nodes[l].right;
        self.nodes[l].right = Some(n);
        self.nodes[n].left = lr;
        self.update_height(n);
        self.update_height(l);
        l
    }

    fn rotate_left(&mut self, n: usize) -> usize {
        let r = self.nodes[n].right.expect("rotate_left requires a right child");
        let rl = self.nodes[r].left;
        self.nodes[r].left = Some(n);
        self.nodes[n].right = rl;
        self.update_height(n);
        self.update_height(r);
        r
    }

    fn rebalance(&mut self, n: usize) -> usize {
        self.update_height(n);
        let bf = self.balance_factor(n);
        if bf > 1 {
            let l = self.nodes[n].left.unwrap();
            if self.balance_factor(l) < 0 {
                let new_l = self.rotate_left(l);
                self.nodes[n].left = Some(new_l);
            }
            return self.rotate_right(n);
        }
        if bf < -1 {
            let r = self.nodes[n].right.unwrap();
            if self.balance_factor(r) > 0 {
                let new_r = self.rotate_right(r);
                self.nodes[n].right = Some(new_r);
            }
            return self.rotate_left(n);
        }
        n
    }

    fn insert_rec(&mut self, node: Option<usize>, key: EventKey, value: Event, inserted: &mut bool) -> Option<usize> {
        let n = match node {
            None => {
                *inserted = true;
                return Some(self.alloc(key, value));
            }
            Some(n) => n,
        };
        match key.cmp(&self.nodes[n].key) {
            Ordering::Less => {
                let new_left = self.insert_rec(self.nodes[n].left, key, value, inserted);
                self.nodes[n].left = new_left;
            }
            Ordering::Greater => {
                let new_right = self.insert_rec(self.nodes[n].right, key, value, inserted);
                self.nodes[n].right = new_right;
            }
            Ordering::Equal => {
                *inserted = false;
                return Some(n);
            }
        }
        Some(self.rebalance(n))
    }

    fn delete_min_rec(&mut self, node: usize) -> (Option<usize>, Event) {
        if let Some(l) = self.nodes[node].left {
            let (new_l, value) = self.delete_min_rec(l);
            self.nodes[node].left = new_l;
            return (Some(self.rebalance(node)), value);
        }
        let right = self.nodes[node].right;
        let value = self.nodes[node].value;
        self.free.push(node);
        (right, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Segment;
    use pretty_assertions::assert_eq;

    fn s(i: usize, x0: f64, y0: f64, x1: f64, y1: f64) -> Segment {
        Segment::new(i, Point::new(x0, y0), Point::new(x1, y1))
    }

    #[test]
    fn pops_in_ascending_trigger_x_order() {
        let mut q = EventQueue::new();
        q.insert(Event::SegmentStart(s(0, 5.0, 0.0, 6.0, 0.0)));
        q.insert(Event::SegmentStart(s(1, 1.0, 0.0, 2.0, 0.0)));
        q.insert(Event::SegmentStart(s(2, 3.0, 0.0, 4.0, 0.0)));
        assert_eq!(q.pop_min().unwrap().trigger_x(), 1.0);
        assert_eq!(q.pop_min().unwrap().trigger_x(), 3.0);
        assert_eq!(q.pop_min().unwrap().trigger_x(), 5.0);
        assert!(q.pop_min().is_none());
    }

    #[test]
    fn breaks_x_ties_by_type_priority() {
        let mut q = EventQueue::new();
        let seg = s(0, 2.0, 0.0, 4.0, 0.0);
        q.insert(Event::SegmentEnd(seg));
        q.insert(Event::SegmentStart(seg));
        assert!(matches!(q.pop_min().unwrap(), Event::SegmentStart(_)));
        assert!(matches!(q.pop_min().unwrap(), Event::SegmentEnd(_)));
    }

    #[test]
    fn drops_exact_duplicate_events() {
        let mut q = EventQueue::new();
        let seg = s(0, 2.0, 0.0, 4.0, 0.0);
        assert!(q.insert(Event::SegmentStart(seg)));
        assert!(!q.insert(Event::SegmentStart(seg)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn stays_ordered_under_many_inserts() {
        let mut q = EventQueue::new();
        for i in 0..200usize {
            let x = ((i * 37) % 199) as f64;
            q.insert(Event::SegmentStart(s(i, x, 0.0, x + 1.0, 0.0)));
        }
        assert!(q.assert_order());
        let mut last = f64::NEG_INFINITY;
        while let Some(ev) = q.pop_min() {
            assert!(ev.trigger_x() >= last);
            last = ev.trigger_x();
        }
    }
}
