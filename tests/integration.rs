//! End-to-end coverage: parsing through detection through output formatting,
//! and cross-algorithm agreement over randomly generated inputs.

use pretty_assertions::assert_eq;
use proptest::collection::vec;
use proptest::prelude::*;
use segsect::geometry::{Point, Segment};
use segsect::{brute_force, io, pairs, sweep};
use std::io::Cursor;

const EPS: f64 = 1e-8;

#[test]
fn full_pipeline_round_trips_from_text_input_to_text_output() {
    let input = "\
1.0 4.0 3.0 0.0
1.0 3.0 3.0 1.0
1.0 1.0 3.0 3.0
1.0 0.0 3.0 4.0
";
    let segments = io::parse_segments(Cursor::new(input)).expect("well-formed input parses");
    let found = sweep::find_intersections(&segments, EPS).expect("no invariant violation on a clean input");

    let mut out = Vec::new();
    io::write_pairs(&mut out, &pairs::sorted(found)).unwrap();
    let text = String::from_utf8(out).unwrap();

    // All four diagonals share a common crossing point, so every pair appears.
    assert_eq!(text, "0_1\n0_2\n0_3\n1_2\n1_3\n2_3\n");
}

#[test]
fn sweep_and_brute_force_agree_on_the_star_with_overlap_fixture() {
    let segs = vec![
        seg(0, 1.0, 4.0, 3.0, 0.0),
        seg(1, 1.0, 3.0, 3.0, 1.0),
        seg(2, 1.0, 1.0, 3.0, 3.0),
        seg(3, 1.0, 0.0, 3.0, 4.0),
        seg(4, 2.0, 3.5, 4.0, 3.5),
        seg(5, 2.0, 0.5, 4.0, 0.5),
        seg(6, 3.0, 1.0, 3.0, 3.0),
    ];

    let via_sweep = sweep::find_intersections(&segs, EPS).unwrap();
    let via_brute_force = brute_force::find_intersections(&segs, EPS);
    assert_eq!(pairs::sorted(via_sweep), pairs::sorted(via_brute_force));
}

fn seg(i: usize, x0: f64, y0: f64, x1: f64, y1: f64) -> Segment {
    Segment::new(i, Point::new(x0, y0), Point::new(x1, y1))
}

fn coord() -> impl Strategy<Value = f64> {
    (0..20i32).prop_map(|v| v as f64)
}

fn arb_segments(n: usize) -> impl Strategy<Value = Vec<Segment>> {
    vec((coord(), coord(), coord(), coord()), n).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (x0, y0, x1, y1))| Segment::new(i, Point::new(x0, y0), Point::new(x1, y1)))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn sweep_agrees_with_brute_force_on_random_segment_sets(segments in arb_segments(10)) {
        let via_sweep = sweep::find_intersections(&segments, EPS);
        prop_assume!(via_sweep.is_ok());
        let via_sweep = pairs::sorted(via_sweep.unwrap());
        let via_brute_force = pairs::sorted(brute_force::find_intersections(&segments, EPS));
        prop_assert_eq!(via_sweep, via_brute_force);
    }

    #[test]
    fn brute_force_result_is_invariant_under_reversing_the_input_order(segments in arb_segments(8)) {
        let forward = brute_force::find_intersections(&segments, EPS);
        let reversed: Vec<Segment> = segments.iter().rev().copied().collect();
        let reindexed: Vec<Segment> = reversed
            .iter()
            .enumerate()
            .map(|(new_index, s)| Segment::new(segments.len() - 1 - new_index, s.start, s.end))
            .collect();
        let backward = brute_force::find_intersections(&reindexed, EPS);
        prop_assert_eq!(pairs::sorted(forward), pairs::sorted(backward));
    }
}
