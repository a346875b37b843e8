//! The sweep status: an ordered sequence of currently-active, non-vertical
//! segments with fast neighbor navigation. Backed by an arena-allocated AVL
//! tree with explicit parent pointers (the idiomatic stand-in for raw parent
//! pointers in an arena representation).
//!
//! The tree's order is never "segment vs segment" — it's always "a reference
//! point vs a stored segment's line", via [`ccw`]. This sidesteps the
//! non-transitivity that a naive segment-vs-segment comparator would have as
//! the sweep x moves forward (see the design notes on this).

use crate::geometry::{ccw, y_at, Point, Segment};

/// How far past a tied reference point to probe `seg`'s own line when
/// breaking an insertion tie, expressed as a multiple of the tree's `eps` but
/// clamped to an absolute range. The probe must clear the ccw-zero band `eps`
/// itself ties on, or a coarse `--epsilon` leaves the probe point still
/// within that band and the tie-break silently degenerates back to "break
/// left"; scaling with `eps` fixes that. Clamped at the low end so the
/// default (and any finer) `eps` still gets a concrete, non-vanishing probe
/// distance, and at the high end so a very coarse `eps` doesn't push the
/// probe past a short segment's actual extent.
const TIE_BREAK_DX_EPS_MULTIPLE: f64 = 1e4;
const TIE_BREAK_DX_MIN: f64 = 1e-6;
const TIE_BREAK_DX_MAX: f64 = 1e-2;

struct StatusNode {
    value: Segment,
    left: Option<usize>,
    right: Option<usize>,
    parent: Option<usize>,
    height: i32,
}

/// Opaque handle to a node in the status. Stable across rotations; freed on
/// [`SweepStatus::delete`].
pub type NodeId = usize;

pub struct SweepStatus {
    nodes: Vec<StatusNode>,
    free: Vec<usize>,
    root: Option<usize>,
    eps: f64,
    len: usize,
}

impl SweepStatus {
    pub fn new(eps: f64) -> Self {
        SweepStatus { nodes: Vec::new(), free: Vec::new(), root: None, eps, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn value(&self, id: NodeId) -> Segment {
        self.nodes[id].value
    }

    /// Inserts `seg`, ranked by `seg.start` against the current status.
    pub fn insert(&mut self, seg: Segment) -> NodeId {
        self.insert_at(seg, seg.start)
    }

    /// Inserts `seg`, ranked by an arbitrary reference point rather than
    /// `seg.start`. Used to re-rank a segment into its post-intersection
    /// vertical position: the reference point is evaluated along `seg`'s own
    /// line just past the intersection x, so the insert naturally lands the
    /// segment on the correct side of every other active segment.
    pub fn insert_at(&mut self, seg: Segment, ref_point: Point) -> NodeId {
        let mut out_id = usize::MAX;
        let new_root = self.insert_rec(self.root, None, seg, ref_point, &mut out_id);
        self.nodes[new_root].parent = None;
        self.root = Some(new_root);
        self.len += 1;
        out_id
    }

    /// The in-order predecessor of `id`.
    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        if let Some(l) = self.nodes[id].left {
            return Some(self.max_node(l));
        }
        let mut cur = id;
        let mut parent = self.nodes[id].parent;
        while let Some(p) = parent {
            if self.nodes[p].right == Some(cur) {
                return Some(p);
            }
            cur = p;
            parent = self.nodes[p].parent;
        }
        None
    }

    /// The in-order successor of `id`.
    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        if let Some(r) = self.nodes[id].right {
            return Some(self.min_node(r));
        }
        let mut cur = id;
        let mut parent = self.nodes[id].parent;
        while let Some(p) = parent {
            if self.nodes[p].left == Some(cur) {
                return Some(p);
            }
            cur = p;
            parent = self.nodes[p].parent;
        }
        None
    }

    /// Locates the node whose segment index is `line_id`, descending by
    /// `ref_point`'s ccw against each visited node. Because several active
    /// segments may be momentarily collinear with `ref_point` (a shared
    /// intersection, or the segment's own endpoint), a near-zero ccw
    /// descends into both subtrees rather than picking one.
    ///
    /// The ccw-guided descent assumes the tree's structural left/right order
    /// still agrees with `ref_point`; a segment whose relative order shifted
    /// since it was last placed (several close-together reorders in a row,
    /// each ranked against its own nearby reference point) can fall outside
    /// that assumption and be missed. Falling back to a full tree walk on a
    /// failed descent trades a rare linear scan for never hard-failing a
    /// lookup of a segment that is, in fact, still active.
    pub fn find_with_reference_point(&self, line_id: usize, ref_point: Point) -> Option<NodeId> {
        self.find_rec(self.root, line_id, ref_point).or_else(|| self.find_by_index(self.root, line_id))
    }

    fn find_by_index(&self, node: Option<usize>, line_id: usize) -> Option<usize> {
        let n = node?;
        if self.nodes[n].value.index == line_id {
            return Some(n);
        }
        self.find_by_index(self.nodes[n].left, line_id).or_else(|| self.find_by_index(self.nodes[n].right, line_id))
    }

    /// Every active segment crossed by the vertical segment `vline`.
    pub fn find_vertical_intersections(&self, vline: &Segment) -> Vec<Segment> {
        let mut out = Vec::new();
        self.find_vertical_rec(self.root, vline, &mut out);
        out
    }

    /// Removes `id` from the status by identity. Every other live `NodeId`
    /// keeps referring to the same segment it did before the call: when `id`
    /// has two children, its in-order successor node is relinked into `id`'s
    /// structural position (not copied by value), and `id` itself is the one
    /// freed.
    pub fn delete(&mut self, id: NodeId) {
        let left = self.nodes[id].left;
        let right = self.nodes[id].right;
        let parent = self.nodes[id].parent;

        let rebalance_from = match (left, right) {
            (Some(l), Some(r)) => {
                let succ = self.min_node(r);
                if succ == r {
                    self.nodes[succ].left = Some(l);
                    self.nodes[l].parent = Some(succ);
                    self.nodes[succ].parent = parent;
                    self.replace_child(parent, id, Some(succ));
                    self.update_height(succ);
                    Some(succ)
                } else {
                    let succ_parent = self.nodes[succ].parent.expect("successor below id.right has a parent");
                    let succ_right = self.nodes[succ].right;
                    self.nodes[succ_parent].left = succ_right;
                    if let Some(sr) = succ_right {
                        self.nodes[sr].parent = Some(succ_parent);
                    }
                    self.nodes[succ].left = Some(l);
                    self.nodes[l].parent = Some(succ);
                    self.nodes[succ].right = Some(r);
                    self.nodes[r].parent = Some(succ);
                    self.nodes[succ].parent = parent;
                    self.replace_child(parent, id, Some(succ));
                    self.update_height(succ);
                    Some(succ_parent)
                }
            }
            (one, other) => {
                let child = one.or(other);
                if let Some(c) = child {
                    self.nodes[c].parent = parent;
                }
                self.replace_child(parent, id, child);
                parent
            }
        };

        self.free.push(id);
        self.len -= 1;
        self.rebalance_up(rebalance_from);
    }

    fn replace_child(&mut self, parent: Option<usize>, old_child: usize, new_child: Option<usize>) {
        match parent {
            None => self.root = new_child,
            Some(p) => {
                if self.nodes[p].left == Some(old_child) {
                    self.nodes[p].left = new_child;
                } else {
                    self.nodes[p].right = new_child;
                }
            }
        }
    }

    fn rebalance_up(&mut self, mut cur: Option<usize>) {
        while let Some(n) = cur {
            let gp = self.nodes[n].parent;
            let is_left_child = gp.map(|p| self.nodes[p].left == Some(n));
            let new_n = self.rebalance_for_delete(n);
            self.nodes[new_n].parent = gp;
            match gp {
                None => self.root = Some(new_n),
                Some(p) => {
                    if is_left_child == Some(true) {
                        self.nodes[p].left = Some(new_n);
                    } else {
                        self.nodes[p].right = Some(new_n);
                    }
                }
            }
            cur = gp;
        }
    }

    #[cfg(test)]
    pub fn in_order_values(&self) -> Vec<Segment> {
        let mut out = Vec::new();
        self.in_order_rec(self.root, &mut out);
        out
    }

    #[cfg(test)]
    fn in_order_rec(&self, n: Option<usize>, out: &mut Vec<Segment>) {
        if let Some(n) = n {
            self.in_order_rec(self.nodes[n].left, out);
            out.push(self.nodes[n].value);
            self.in_order_rec(self.nodes[n].right, out);
        }
    }

    fn alloc(&mut self, seg: Segment, parent: Option<usize>) -> usize {
        let node = StatusNode { value: seg, left: None, right: None, parent, height: 1 };
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = node;
            idx
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn min_node(&self, mut n: usize) -> usize {
        while let Some(l) = self.nodes[n].left {
            n = l;
        }
        n
    }

    fn max_node(&self, mut n: usize) -> usize {
        while let Some(r) = self.nodes[n].right {
            n = r;
        }
        n
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
        self.nodes[n].left = lr;
        if let Some(lr_id) = lr {
            self.nodes[lr_id].parent = Some(n);
        }
        self.nodes[l].right = Some(n);
        self.nodes[n].parent = Some(l);
        self.update_height(n);
        self.update_height(l);
        l
    }

    fn rotate_left(&mut self, n: usize) -> usize {
        let r = self.nodes[n].right.expect("rotate_left requires a right child");
        let rl = self.nodes[r].left;
        self.nodes[n].right = rl;
        if let Some(rl_id) = rl {
            self.nodes[rl_id].parent = Some(n);
        }
        self.nodes[r].left = Some(n);
        self.nodes[n].parent = Some(r);
        self.update_height(n);
        self.update_height(r);
        r
    }

    fn rebalance_for_insert(&mut self, n: usize) -> usize {
        self.update_height(n);
        let bf = self.balance_factor(n);
        if bf > 1 {
            let l = self.nodes[n].left.unwrap();
            if self.balance_factor(l) >= 0 {
                self.rotate_right(n)
            } else {
                let new_l = self.rotate_left(l);
                self.nodes[n].left = Some(new_l);
                self.rotate_right(n)
            }
        } else if bf < -1 {
            let r = self.nodes[n].right.unwrap();
            if self.balance_factor(r) <= 0 {
                self.rotate_left(n)
            } else {
                let new_r = self.rotate_right(r);
                self.nodes[n].right = Some(new_r);
                self.rotate_left(n)
            }
        } else {
            n
        }
    }

    fn rebalance_for_delete(&mut self, n: usize) -> usize {
        self.update_height(n);
        let bf = self.balance_factor(n);
        if bf > 1 {
            let l = self.nodes[n].left.unwrap();
            if self.balance_factor(l) >= 0 {
                self.rotate_right(n)
            } else {
                let new_l = self.rotate_left(l);
                self.nodes[n].left = Some(new_l);
                self.rotate_right(n)
            }
        } else if bf < -1 {
            let r = self.nodes[n].right.unwrap();
            if self.balance_factor(r) <= 0 {
                self.rotate_left(n)
            } else {
                let new_r = self.rotate_right(r);
                self.nodes[n].right = Some(new_r);
                self.rotate_left(n)
            }
        } else {
            n
        }
    }

    fn insert_rec(
        &mut self,
        node: Option<usize>,
        parent: Option<usize>,
        seg: Segment,
        ref_point: Point,
        out_id: &mut usize,
    ) -> usize {
        let n = match node {
            None => {
                let id = self.alloc(seg, parent);
                *out_id = id;
                return id;
            }
            Some(n) => n,
        };
        let c = ccw(&self.nodes[n].value, ref_point);
        let c = if c.abs() <= self.eps {
            // `ref_point` lies on (or within eps of) the existing node's line,
            // e.g. two segments sharing a start point. Their relative order
            // past this x depends on slope, not on this single coincident
            // point, so break the tie by probing a bit further along `seg`'s
            // own direction rather than always going left: segments whose
            // future order differs from an arbitrary left-break would
            // otherwise desync the tree from the ccw-descent invariant
            // `find_rec`/`find_vertical_rec` rely on.
            let dx = (self.eps * TIE_BREAK_DX_EPS_MULTIPLE).clamp(TIE_BREAK_DX_MIN, TIE_BREAK_DX_MAX);
            let probe_x = ref_point.x + dx;
            ccw(&self.nodes[n].value, Point::new(probe_x, y_at(&seg, probe_x)))
        } else {
            c
        };
        if c > self.eps {
            let new_right = self.insert_rec(self.nodes[n].right, Some(n), seg, ref_point, out_id);
            self.nodes[n].right = Some(new_right);
        } else {
            // Still tied after the forward probe: the two lines are genuinely
            // collinear, so any consistent placement is correct.
            let new_left = self.insert_rec(self.nodes[n].left, Some(n), seg, ref_point, out_id);
            self.nodes[n].left = Some(new_left);
        }
        let balanced = self.rebalance_for_insert(n);
        self.nodes[balanced].parent = parent;
        balanced
    }

    fn find_rec(&self, node: Option<usize>, line_id: usize, ref_point: Point) -> Option<usize> {
        let n = node?;
        if self.nodes[n].value.index == line_id {
            return Some(n);
        }
        let c = ccw(&self.nodes[n].value, ref_point);
        if c.abs() <= self.eps {
            self.find_rec(self.nodes[n].left, line_id, ref_point)
                .or_else(|| self.find_rec(self.nodes[n].right, line_id, ref_point))
        } else if c > 0.0 {
            self.find_rec(self.nodes[n].right, line_id, ref_point)
        } else {
            self.find_rec(self.nodes[n].left, line_id, ref_point)
        }
    }

    fn find_vertical_rec(&self, node: Option<usize>, vline: &Segment, out: &mut Vec<Segment>) {
        let n = match node {
            Some(n) => n,
            None => return,
        };
        let node_seg = self.nodes[n].value;
        let start_ccw = ccw(&node_seg, vline.start);
        let end_ccw = ccw(&node_seg, vline.end);
        let start_zero = start_ccw.abs() <= self.eps;
        let end_zero = end_ccw.abs() <= self.eps;
        let crossed = start_zero || end_zero || (start_ccw > 0.0) != (end_ccw > 0.0);
        if crossed {
            out.push(node_seg);
        }

        // If `vline` straddles this node (or touches it within `eps`), both
        // subtrees can still hold further crossings anywhere in its range, so
        // recurse into both. Otherwise the whole of `vline` lies strictly to
        // one side and only the matching subtree can contain a crossing.
        let entirely_above = start_ccw > self.eps && end_ccw > self.eps;
        let entirely_below = start_ccw < -self.eps && end_ccw < -self.eps;
        let go_left = !entirely_above;
        let go_right = !entirely_below;
        if go_left {
            self.find_vertical_rec(self.nodes[n].left, vline, out);
        }
        if go_right {
            self.find_vertical_rec(self.nodes[n].right, vline, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use pretty_assertions::assert_eq;

    fn seg(i: usize, x0: f64, y0: f64, x1: f64, y1: f64) -> Segment {
        Segment::new(i, Point::new(x0, y0), Point::new(x1, y1))
    }

    #[test]
    fn insert_and_neighbor_navigation_orders_by_height() {
        let mut status = SweepStatus::new(1e-8);
        // Three parallel horizontal-ish lines at y = 0, 1, 2, all spanning x in [0, 10].
        let low = status.insert(seg(0, 0.0, 0.0, 10.0, 0.0));
        let mid = status.insert(seg(1, 0.0, 1.0, 10.0, 1.0));
        let high = status.insert(seg(2, 0.0, 2.0, 10.0, 2.0));

        assert_eq!(status.left(mid), Some(low));
        assert_eq!(status.right(mid), Some(high));
        assert_eq!(status.left(low), None);
        assert_eq!(status.right(high), None);
    }

    #[test]
    fn delete_preserves_remaining_neighbor_chain() {
        let mut status = SweepStatus::new(1e-8);
        let a = status.insert(seg(0, 0.0, 0.0, 10.0, 0.0));
        let b = status.insert(seg(1, 0.0, 1.0, 10.0, 1.0));
        let c = status.insert(seg(2, 0.0, 2.0, 10.0, 2.0));

        status.delete(b);
        assert_eq!(status.len(), 2);
        assert_eq!(status.right(a), Some(c));
        assert_eq!(status.left(c), Some(a));
    }

    #[test]
    fn find_with_reference_point_locates_by_index() {
        let mut status = SweepStatus::new(1e-8);
        status.insert(seg(0, 0.0, 0.0, 10.0, 0.0));
        let b = status.insert(seg(1, 0.0, 1.0, 10.0, 1.0));
        status.insert(seg(2, 0.0, 2.0, 10.0, 2.0));

        let found = status.find_with_reference_point(1, Point::new(5.0, 1.0));
        assert_eq!(found, Some(b));
    }

    #[test]
    fn find_vertical_intersections_reports_crossed_segments() {
        let mut status = SweepStatus::new(1e-8);
        status.insert(seg(0, 0.0, 0.0, 10.0, 0.0));
        status.insert(seg(1, 0.0, 5.0, 10.0, 5.0));
        status.insert(seg(2, 0.0, 10.0, 10.0, 10.0));

        let vline = Segment::new(3, Point::new(5.0, 20.0), Point::new(5.0, -20.0));
        let mut crossed: Vec<usize> = status
            .find_vertical_intersections(&vline)
            .into_iter()
            .map(|s| s.index)
            .collect();
        crossed.sort();
        assert_eq!(crossed, vec![0, 1, 2]);
    }

    #[test]
    fn many_inserts_and_deletes_keep_tree_consistent() {
        let mut status = SweepStatus::new(1e-8);
        let mut ids = Vec::new();
        for i in 0..64usize {
            let y = i as f64;
            ids.push(status.insert(seg(i, 0.0, y, 10.0, y)));
        }
        assert_eq!(status.len(), 64);
        let values_before = status.in_order_values();
        for (i, v) in values_before.iter().enumerate() {
            assert_eq!(v.index, i, "status must stay ordered by y after many inserts");
        }

        for &id in ids.iter().step_by(2) {
            status.delete(id);
        }
        assert_eq!(status.len(), 32);
        let remaining = status.in_order_values();
        let mut prev_y = f64::NEG_INFINITY;
        for v in remaining {
            assert!(v.start.y > prev_y);
            prev_y = v.start.y;
        }
    }
}
