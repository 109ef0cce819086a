use crate::data::{Point, Vector};

/// Direction of the turn taken when walking through three points.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone)]
pub enum Orientation {
  CounterClockWise,
  ClockWise,
  CoLinear,
}
use Orientation::*;

impl Orientation {
  /// Determine the direction you have to turn if you walk from `p1`
  /// to `p2` to `p3`.
  ///
  /// The sign is ruled on with adaptive exact arithmetic: the result is the
  /// true mathematical orientation of the three coordinates, no matter how
  /// close to collinear they are.
  ///
  /// # Examples
  ///
  /// ```rust
  /// # use ruppert::data::Point;
  /// # use ruppert::Orientation;
  /// let p1 = Point::new(0.0, 0.0);
  /// let p2 = Point::new(0.0, 1.0);
  /// assert!(Orientation::new(&p1, &p2, &Point::new(0.0, 2.0)).is_colinear());
  /// assert!(Orientation::new(&p1, &p2, &Point::new(-1.0, 2.0)).is_ccw());
  /// assert!(Orientation::new(&p1, &p2, &Point::new(1.0, 2.0)).is_cw());
  /// ```
  pub fn new(p1: &Point, p2: &Point, p3: &Point) -> Orientation {
    let orient = geometry_predicates::predicates::orient2d(p1.array(), p2.array(), p3.array());
    if orient > 0.0 {
      CounterClockWise
    } else if orient < 0.0 {
      ClockWise
    } else {
      CoLinear
    }
  }

  pub fn is_ccw(self) -> bool {
    self == CounterClockWise
  }

  pub fn is_cw(self) -> bool {
    self == ClockWise
  }

  pub fn is_colinear(self) -> bool {
    self == CoLinear
  }

  pub fn reverse(self) -> Orientation {
    match self {
      CounterClockWise => ClockWise,
      ClockWise => CounterClockWise,
      CoLinear => CoLinear,
    }
  }
}

/// True if `d` lies strictly inside the circumcircle of the triangle
/// `(a, b, c)`.
///
/// The triangle must be in counterclockwise order. Like [`Orientation::new`],
/// the decision is exact for all finite inputs.
pub fn in_circle(a: &Point, b: &Point, c: &Point, d: &Point) -> bool {
  geometry_predicates::predicates::incircle(a.array(), b.array(), c.array(), d.array()) > 0.0
}

/// Center of the circle through `a`, `b` and `c`, or `None` if the three
/// points are collinear.
///
/// This is a floating-point construction, not a predicate: the result is
/// subject to round-off and is only used to pick coordinates for new
/// vertices, never to make topology decisions.
pub fn circumcenter(a: &Point, b: &Point, c: &Point) -> Option<Point> {
  let d = 2.0 * ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x));
  if d == 0.0 {
    return None;
  }
  let a_len = (b.x - a.x) * (b.x - a.x) + (b.y - a.y) * (b.y - a.y);
  let c_len = (c.x - a.x) * (c.x - a.x) + (c.y - a.y) * (c.y - a.y);
  let ux = a.x + (a_len * (c.y - a.y) - c_len * (b.y - a.y)) / d;
  let uy = a.y + (c_len * (b.x - a.x) - a_len * (c.x - a.x)) / d;
  Some(Point::new(ux, uy))
}

pub fn distance_sq(a: &Point, b: &Point) -> f64 {
  let dx = b.x - a.x;
  let dy = b.y - a.y;
  dx * dx + dy * dy
}

/// Twice the signed area of the triangle `(a, b, c)`. Positive for
/// counterclockwise triangles.
pub fn signed_area_x2(a: &Point, b: &Point, c: &Point) -> f64 {
  (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// True if `p` lies strictly inside the diametral circle of the edge
/// `(a, b)`, i.e. the circle with the edge as its diameter.
///
/// Vertices inside the diametral circle of a constraint edge force the edge
/// to be split during refinement.
///
/// # Examples
///
/// ```rust
/// # use ruppert::data::Point;
/// # use ruppert::predicates::encroaches;
/// let a = Point::new(0.0, 0.0);
/// let b = Point::new(2.0, 0.0);
/// assert!(encroaches(&Point::new(1.0, 0.5), &a, &b));
/// assert!(!encroaches(&Point::new(1.0, 1.5), &a, &b));
/// ```
pub fn encroaches(p: &Point, a: &Point, b: &Point) -> bool {
  let mid = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
  distance_sq(p, &mid) < distance_sq(a, b) / 4.0
}

/// Outward normal of the directed edge `a -> b`, assuming the interior of
/// the mesh is on the edge's left. Not normalized.
pub fn outward_normal(a: &Point, b: &Point) -> Vector {
  Vector::new(b.y - a.y, a.x - b.x)
}

/// The power of two closest to `value` in log space.
///
/// Used to round segment split positions so that repeated splits of the same
/// segment reuse identical fractions, which stops mutually encroaching
/// segment pairs from splitting each other forever.
pub fn nearest_power_of_two(value: f64) -> f64 {
  value.log2().round().exp2()
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn orientation_basic() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(1.0, 0.0);
    assert_eq!(
      Orientation::new(&a, &b, &Point::new(0.5, 1.0)),
      CounterClockWise
    );
    assert_eq!(Orientation::new(&a, &b, &Point::new(0.5, -1.0)), ClockWise);
    assert_eq!(Orientation::new(&a, &b, &Point::new(2.0, 0.0)), CoLinear);
  }

  #[test]
  fn orientation_near_degenerate() {
    // c sits 2^-53 above the line through a and b. Naive evaluation of the
    // cross product rounds the offset away and reports CoLinear.
    let a = Point::new(12.0, 12.0);
    let b = Point::new(24.0, 24.0);
    let c = Point::new(0.5, 0.5 + f64::EPSILON / 2.0);
    assert_eq!(Orientation::new(&a, &b, &c), CounterClockWise);
    assert_eq!(
      Orientation::new(&a, &b, &Point::new(0.5, 0.5)),
      CoLinear
    );
  }

  #[test]
  fn in_circle_unit() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(1.0, 0.0);
    let c = Point::new(0.0, 1.0);
    assert!(in_circle(&a, &b, &c, &Point::new(0.4, 0.4)));
    assert!(!in_circle(&a, &b, &c, &Point::new(2.0, 2.0)));
    // (1, 1) is cocircular with the right triangle's circumcircle.
    assert!(!in_circle(&a, &b, &c, &Point::new(1.0, 1.0)));
  }

  #[test]
  fn circumcenter_of_collinear_is_none() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(1.0, 1.0);
    let c = Point::new(2.0, 2.0);
    assert_eq!(circumcenter(&a, &b, &c), None);
  }

  #[test]
  fn power_of_two_rounding() {
    assert_eq!(nearest_power_of_two(0.9), 1.0);
    assert_eq!(nearest_power_of_two(0.3), 0.25);
    assert_eq!(nearest_power_of_two(5.0), 4.0);
    assert_eq!(nearest_power_of_two(7.0), 8.0);
  }

  proptest! {
    #[test]
    fn orientation_antisymmetric(
      ax in -100.0..100.0f64, ay in -100.0..100.0f64,
      bx in -100.0..100.0f64, by in -100.0..100.0f64,
      cx in -100.0..100.0f64, cy in -100.0..100.0f64,
    ) {
      let a = Point::new(ax, ay);
      let b = Point::new(bx, by);
      let c = Point::new(cx, cy);
      prop_assert_eq!(Orientation::new(&a, &b, &c), Orientation::new(&b, &a, &c).reverse());
      prop_assert_eq!(Orientation::new(&a, &b, &c), Orientation::new(&b, &c, &a));
    }

    #[test]
    fn circumcenter_is_equidistant(
      ax in -100.0..100.0f64, ay in -100.0..100.0f64,
      bx in -100.0..100.0f64, by in -100.0..100.0f64,
      cx in -100.0..100.0f64, cy in -100.0..100.0f64,
    ) {
      let a = Point::new(ax, ay);
      let b = Point::new(bx, by);
      let c = Point::new(cx, cy);
      prop_assume!(signed_area_x2(&a, &b, &c).abs() > 1.0);

      let center = circumcenter(&a, &b, &c).unwrap();
      let ra = distance_sq(&center, &a).sqrt();
      let rb = distance_sq(&center, &b).sqrt();
      let rc = distance_sq(&center, &c).sqrt();
      let scale = ra.max(1.0);
      prop_assert!((ra - rb).abs() <= scale * 1e-9);
      prop_assert!((ra - rc).abs() <= scale * 1e-9);
    }
  }
}
