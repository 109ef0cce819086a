//! Two-dimensional constrained Delaunay triangulation with Ruppert-style
//! quality refinement.
//!
//! Supply points and optional constraint segments through
//! [`TriangulateInput`], drive the pipeline with [`Options`] (or the classic
//! switch syntax via [`Options::from_switches`]), and receive the finished
//! mesh as a [`TriangulateOutput`].

// #![deny(warnings)]
#![deny(clippy::cast_lossless)]
#![doc(test(no_crate_inject))]

pub mod algorithms;
pub mod data;
mod options;
pub mod predicates;
mod triangulate;

pub use algorithms::constrained::{RegionInfo, RegionSeed};
pub use data::io::{TriangulateInput, TriangulateOutput};
pub use data::{Point, Vector};
pub use options::Options;
pub use predicates::Orientation;
pub use triangulate::triangulate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
  /// Fewer than three input points outside refine mode.
  TooFewPoints { found: usize },
  /// A point, hole, or region seed has a NaN or infinite coordinate.
  InvalidCoordinate { point: usize },
  /// A segment, triangle, or region references a point that does not exist.
  PointOutOfRange {
    kind: &'static str,
    index: usize,
    point: usize,
  },
  DegenerateSegment { segment: usize },
  /// Constraint segments cross somewhere other than a shared endpoint.
  SegmentsCross {
    first: (usize, usize),
    second: (usize, usize),
  },
  CollinearInput,
  /// A refine-mode input triangle has zero or negative (clockwise) area.
  DegenerateTriangle { triangle: usize },
  InconsistentMesh { triangle: usize },
  /// A marker or attribute list is not parallel to its primary array.
  AttributeLengthMismatch { point: usize },
  UnknownSwitch { switch: char },
  /// The input is too large for 32-bit exchange indices.
  SizeLimit,
}

impl std::fmt::Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
    match self {
      Error::TooFewPoints { found } => write!(f, "Need at least 3 points, got {}", found),
      Error::InvalidCoordinate { point } => {
        write!(f, "Entry {} has a NaN or infinite coordinate", point)
      }
      Error::PointOutOfRange { kind, index, point } => {
        write!(f, "{} {} references nonexistent point {}", kind, index, point)
      }
      Error::DegenerateSegment { segment } => {
        write!(f, "Segment {} has identical endpoints", segment)
      }
      Error::SegmentsCross { first, second } => write!(
        f,
        "Segment {:?} crosses constrained edge {:?}",
        first, second
      ),
      Error::CollinearInput => write!(f, "All points are collinear"),
      Error::DegenerateTriangle { triangle } => {
        write!(f, "Triangle {} has zero or negative area", triangle)
      }
      Error::InconsistentMesh { triangle } => {
        write!(f, "Mesh is inconsistent at triangle {}", triangle)
      }
      Error::AttributeLengthMismatch { point } => {
        write!(f, "Marker or attribute list length mismatch at entry {}", point)
      }
      Error::UnknownSwitch { switch } => write!(f, "Unknown switch '{}'", switch),
      Error::SizeLimit => write!(f, "Too many points for 32-bit indexing"),
    }
  }
}

impl std::error::Error for Error {}

#[cfg(test)]
pub mod testing;
