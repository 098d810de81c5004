//! Property-Based Tests
//!
//! Geometric invariants of the AOI mapper:
//! - width/height and the equivalent end corner give identical labels
//! - a point maps to a label only if some AOI contains it half-open
//! - the label is always the first containing AOI in table order

use gazekit_core::{map_points, AoiColumns, Point, Rect, TextStimulus};
use polars::prelude::df;
use proptest::prelude::*;

fn layout() -> impl Strategy<Value = Vec<(f64, f64, f64, f64)>> {
    prop::collection::vec((0.0..500.0, 0.0..500.0, 0.0..80.0, 0.0..80.0), 1..20)
}

fn stimulus(boxes: &[(f64, f64, f64, f64)], end_corner: bool) -> TextStimulus {
    let labels: Vec<String> = (0..boxes.len()).map(|i| format!("aoi{i}")).collect();
    let column = |f: fn(&(f64, f64, f64, f64)) -> f64| boxes.iter().map(f).collect::<Vec<f64>>();
    let aois = df!(
        "label" => labels,
        "x" => column(|b| b.0),
        "y" => column(|b| b.1),
        "w" => column(|b| b.2),
        "h" => column(|b| b.3),
        "ex" => column(|b| b.0 + b.2),
        "ey" => column(|b| b.1 + b.3),
    )
    .unwrap();
    let columns = AoiColumns::new(["label"], "x", "y");
    let columns = if end_corner {
        columns.with_end("ex", "ey")
    } else {
        columns.with_size("w", "h")
    };
    TextStimulus::new(aois, columns).unwrap()
}

fn labels(stimulus: &TextStimulus, points: &[Option<Point>]) -> Vec<String> {
    let columns = map_points(points, None, stimulus).unwrap();
    columns[0]
        .str()
        .unwrap()
        .into_iter()
        .map(|value| value.unwrap().to_string())
        .collect()
}

/// Property: both boundary encodings describe the same rectangles
#[test]
fn proptest_size_and_end_agree() {
    proptest!(|(boxes in layout(), points in prop::collection::vec((0.0..600.0, 0.0..600.0), 1..50))| {
        let points: Vec<Option<Point>> = points.into_iter().map(|(x, y)| Some([x, y])).collect();
        let by_size = labels(&stimulus(&boxes, false), &points);
        let by_end = labels(&stimulus(&boxes, true), &points);
        prop_assert_eq!(by_size, by_end);
    });
}

/// Property: the label equals a linear scan for the first containing AOI
#[test]
fn proptest_matches_linear_scan() {
    proptest!(|(boxes in layout(), points in prop::collection::vec((0.0..600.0, 0.0..600.0), 1..50))| {
        let stimulus = stimulus(&boxes, false);
        let wrapped: Vec<Option<Point>> = points.iter().map(|&(x, y)| Some([x, y])).collect();
        let mapped = labels(&stimulus, &wrapped);

        for ((x, y), label) in points.iter().zip(&mapped) {
            let expected = boxes
                .iter()
                .position(|b| Rect::from_size(b.0, b.1, b.2, b.3).contains(*x, *y))
                .map(|i| format!("aoi{i}"))
                .unwrap_or_default();
            prop_assert_eq!(label, &expected);
        }
    });
}

/// Property: start corners always match, end corners never match the same AOI
#[test]
fn proptest_corners() {
    proptest!(|(boxes in layout())| {
        let stimulus = stimulus(&boxes, false);
        for (i, b) in boxes.iter().enumerate() {
            let end = labels(&stimulus, &[Some([b.0 + b.2, b.1 + b.3])]);
            prop_assert_ne!(&end[0], &format!("aoi{i}"));
            if b.2 > 0.0 && b.3 > 0.0 {
                let start = labels(&stimulus, &[Some([b.0, b.1])]);
                prop_assert!(!start[0].is_empty());
            }
        }
    });
}
