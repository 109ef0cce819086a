use std::ops::{Add, Mul, Sub};

/// A point in the plane.
///
/// Coordinates are plain `f64` values; every coordinate handed to the engine
/// must be finite. Points are identified by their index in the array that
/// owns them and never move once inserted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub const fn new(x: f64, y: f64) -> Point {
    Point { x, y }
  }

  pub fn array(&self) -> [f64; 2] {
    [self.x, self.y]
  }

  pub fn is_finite(&self) -> bool {
    self.x.is_finite() && self.y.is_finite()
  }

  pub fn midpoint(&self, other: &Point) -> Point {
    Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
  }
}

impl From<(f64, f64)> for Point {
  fn from((x, y): (f64, f64)) -> Point {
    Point::new(x, y)
  }
}

impl From<[f64; 2]> for Point {
  fn from([x, y]: [f64; 2]) -> Point {
    Point::new(x, y)
  }
}

/// A displacement in the plane. Unbounded Voronoi edges carry one of these
/// as their ray direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector {
  pub x: f64,
  pub y: f64,
}

impl Vector {
  pub const fn new(x: f64, y: f64) -> Vector {
    Vector { x, y }
  }

  pub fn dot(&self, other: &Vector) -> f64 {
    self.x * other.x + self.y * other.y
  }
}

impl Sub for Point {
  type Output = Vector;
  fn sub(self, other: Point) -> Vector {
    Vector::new(self.x - other.x, self.y - other.y)
  }
}

impl Add<Vector> for Point {
  type Output = Point;
  fn add(self, v: Vector) -> Point {
    Point::new(self.x + v.x, self.y + v.y)
  }
}

impl Mul<f64> for Vector {
  type Output = Vector;
  fn mul(self, s: f64) -> Vector {
    Vector::new(self.x * s, self.y * s)
  }
}
