//! The brute-force parallel detector: pre-sort by start.x, then for every
//! segment fan out one unit of work per outer index that scans forward only
//! as far as the x-ordering prune allows.

use crate::geometry::is_crossed_by;
use crate::pairs::IndexPair;
use crate::Segment;
use rayon::prelude::*;
use std::collections::HashSet;

/// Returns every intersecting pair among `segments`, using a per-index
/// parallel fan-out over an x-sorted copy of the input. `eps` is the
/// collinearity tolerance forwarded to [`is_crossed_by`].
pub fn find_intersections(segments: &[Segment], eps: f64) -> HashSet<IndexPair> {
    let mut sorted: Vec<Segment> = segments.to_vec();
    sorted.sort_by(|a, b| a.start.x.partial_cmp(&b.start.x).expect("coordinates must not be NaN"));

    let n = sorted.len();
    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let sorted = &sorted;
            let p = sorted[i];
            (i + 1..n)
                .take_while(move |&j| sorted[j].start.x <= p.end.x)
                .filter_map(move |j| {
                    let q = sorted[j];
                    if is_crossed_by(&p, &q, eps) {
                        Some(IndexPair::new(p.index, q.index))
                    } else {
                        None
                    }
                })
        })
        .collect()
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
    fn simple_x_crossing() {
        let segs = vec![seg(0, 1.0, 0.0, 4.0, 2.0), seg(1, 2.0, 2.0, 4.0, 0.0)];
        let result = find_intersections(&segs, 1e-8);
        assert_eq!(result, HashSet::from([IndexPair::new(0, 1)]));
    }

    #[test]
    fn disjoint_segments_produce_no_pairs() {
        let segs = vec![seg(0, 1.0, 3.0, 3.0, 1.0), seg(1, 2.0, 3.0, 4.0, 2.0)];
        assert!(find_intersections(&segs, 1e-8).is_empty());
    }

    #[test]
    fn triple_scenario_matches_expected_pairs() {
        let segs = vec![
            seg(0, 1.0, 2.0, 5.0, 2.0),
            seg(1, 2.0, 1.0, 5.0, 4.0),
            seg(2, 2.0, 3.0, 4.0, 1.0),
            seg(3, 4.0, 4.0, 5.0, 3.0),
        ];
        let result = find_intersections(&segs, 1e-8);
        assert_eq!(
            result,
            HashSet::from([
                IndexPair::new(0, 1),
                IndexPair::new(0, 2),
                IndexPair::new(1, 2),
                IndexPair::new(1, 3),
            ])
        );
    }

    #[test]
    fn is_order_independent_under_permutation() {
        let segs = vec![
            seg(0, 1.0, 2.0, 5.0, 2.0),
            seg(1, 2.0, 1.0, 5.0, 4.0),
            seg(2, 2.0, 3.0, 4.0, 1.0),
            seg(3, 4.0, 4.0, 5.0, 3.0),
        ];
        let mut reversed: Vec<Segment> = segs.iter().rev().cloned().collect();
        for (new_index, s) in reversed.iter_mut().enumerate() {
            *s = Segment::new(new_index, s.start, s.end);
        }
        // segs[0] <-> reversed[3], segs[1] <-> reversed[2], etc.
        let original = find_intersections(&segs, 1e-8);
        let permuted = find_intersections(&reversed, 1e-8);
        assert_eq!(original.len(), permuted.len());
    }
}
