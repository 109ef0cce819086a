use std::collections::hash_map::Entry;
use std::collections::HashMap;

use ordered_float::NotNan;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::mesh::{Insertion, TriIdx, TriMesh, VertIdx};
use crate::data::Point;
use crate::Error;

/// Result of the unconstrained phase. The mesh still carries its three
/// bounding vertices; duplicate input points are staged as vertices but
/// never referenced by a triangle.
#[derive(Debug)]
pub struct Delaunay {
  pub mesh: TriMesh,
  /// Mesh vertex each input point resolved to. Duplicates map to their
  /// first occurrence.
  pub canonical: Vec<VertIdx>,
}

/// Insertion order is shuffled for the usual randomized-incremental
/// runtime bound, but from a fixed seed so identical inputs produce
/// identical meshes.
const INSERTION_SEED: u64 = 0xde1a;

/// Delaunay triangulation by randomized incremental insertion into a
/// bounding triangle.
///
/// All points are staged as mesh vertices up front, in input order, so
/// that mesh index minus the super count recovers the input index.
pub fn triangulate(points: &[Point]) -> Result<Delaunay, Error> {
  if points.len() < 3 {
    return Err(Error::TooFewPoints {
      found: points.len(),
    });
  }

  let (s0, s1, s2) = super_triangle(points);
  let mut mesh = TriMesh::bootstrap(s0, s1, s2);

  let mut canonical = Vec::with_capacity(points.len());
  let mut seen: HashMap<(NotNan<f64>, NotNan<f64>), VertIdx> = HashMap::new();
  let mut schedule = Vec::with_capacity(points.len());
  for (idx, p) in points.iter().enumerate() {
    let v = mesh.add_vert(*p);
    let x = NotNan::new(p.x).map_err(|_| Error::InvalidCoordinate { point: idx })?;
    let y = NotNan::new(p.y).map_err(|_| Error::InvalidCoordinate { point: idx })?;
    match seen.entry((x, y)) {
      Entry::Occupied(first) => canonical.push(*first.get()),
      Entry::Vacant(slot) => {
        slot.insert(v);
        canonical.push(v);
        schedule.push(v);
      }
    }
  }

  if schedule.len() < 3 {
    return Err(Error::TooFewPoints {
      found: schedule.len(),
    });
  }

  let mut rng = SmallRng::seed_from_u64(INSERTION_SEED);
  schedule.shuffle(&mut rng);

  let mut hint = None;
  for v in schedule {
    match mesh.insert_vertex(v, hint) {
      Insertion::Inserted { .. } => (),
      Insertion::Duplicate(u) => {
        // Coordinates that hash apart but compare equal; fold them too.
        for slot in canonical.iter_mut() {
          if *slot == v {
            *slot = u;
          }
        }
      }
    }
    hint = mesh.vertex_tri(v).or(hint);
  }

  let any_finite = (0..mesh.triangles.len()).any(|t| !mesh.is_super_tri(TriIdx(t)));
  if !any_finite {
    return Err(Error::CollinearInput);
  }

  mesh.check_invariant("delaunay");
  Ok(Delaunay { mesh, canonical })
}

/// A triangle that comfortably contains every input point. Its corners are
/// placed far enough out that no circumcircle reasoning is needed for them;
/// flips touching these vertices are decided symbolically.
fn super_triangle(points: &[Point]) -> (Point, Point, Point) {
  let mut min = points[0];
  let mut max = points[0];
  for p in points {
    min.x = min.x.min(p.x);
    min.y = min.y.min(p.y);
    max.x = max.x.max(p.x);
    max.y = max.y.max(p.y);
  }
  let cx = (min.x + max.x) / 2.0;
  let cy = (min.y + max.y) / 2.0;
  let reach = (max.x - min.x).max(max.y - min.y).max(1.0) * 2048.0;
  (
    Point::new(cx - reach, cy - reach),
    Point::new(cx + reach, cy - reach),
    Point::new(cx, cy + reach),
  )
}
