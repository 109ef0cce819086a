// Strategies shared by the property tests. Clouds deliberately allow
// duplicate and collinear points; every consumer has to cope with both.
use proptest::collection::vec;
use proptest::prelude::*;
use std::ops::Range;

use crate::data::Point;

/// A point with both coordinates drawn from `-span..span`.
pub fn point_in(span: f64) -> impl Strategy<Value = Point> {
  (-span..span, -span..span).prop_map(|(x, y)| Point::new(x, y))
}

/// A cloud of points sized by `size`. Keep spans modest: the exact
/// arithmetic audits slow down sharply on wide exponent ranges.
pub fn cloud(span: f64, size: Range<usize>) -> impl Strategy<Value = Vec<Point>> {
  vec(point_in(span), size)
}
