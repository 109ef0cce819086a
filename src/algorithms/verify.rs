//! Exact mesh audits.
//!
//! Everything here re-derives properties the engine is supposed to maintain,
//! using `BigRational` arithmetic so the verdict is unconditional. The
//! audits back the consistency-check option and the brute-force validators
//! in the test suite; they are far too slow for the construction path.

use std::cmp::Ordering;

use num_rational::BigRational;
use num_traits::Zero;

use crate::data::mesh::{Edge, SubIdx, TriIdx, TriMesh, VertIdx};
use crate::Error;

/// Structural audit: vertex indices in range, corners distinct, triangles
/// exactly counterclockwise, and neighbor links mutual with agreeing shared
/// edges.
pub fn consistency(mesh: &TriMesh) -> Result<(), Error> {
  for idx in 0..mesh.triangles.len() {
    let t = TriIdx(idx);
    let tri = mesh.tri(t);
    let [a, b, c] = tri.vertices;
    for v in [a, b, c] {
      if v.0 >= mesh.vertices.len() {
        return Err(Error::InconsistentMesh { triangle: idx });
      }
    }
    if a == b || b == c || c == a {
      return Err(Error::InconsistentMesh { triangle: idx });
    }
    if orient_exact(mesh, a, b, c)? != Ordering::Greater {
      return Err(Error::DegenerateTriangle { triangle: idx });
    }
    for sub in 0..3 {
      let s = SubIdx(sub);
      let n = match tri.neighbor(s) {
        Some(n) => n,
        None => continue,
      };
      if n.0 >= mesh.triangles.len() {
        return Err(Error::InconsistentMesh { triangle: idx });
      }
      let back = match mesh.tri(n).neighbor_idx(t) {
        Some(back) => back,
        None => return Err(Error::InconsistentMesh { triangle: idx }),
      };
      let (ea, eb) = mesh.edge_verts(&Edge::new(t, s));
      let (na, nb) = mesh.edge_verts(&Edge::new(n, back));
      if (ea, eb) != (nb, na) {
        return Err(Error::InconsistentMesh { triangle: idx });
      }
    }
  }
  Ok(())
}

/// Local Delaunay audit of the carved mesh: across every unconstrained
/// interior edge, the opposite apex must not lie strictly inside the
/// circumcircle. Edges touching super vertices are skipped; their flips are
/// decided symbolically, not metrically.
pub fn delaunay(mesh: &TriMesh) -> Result<(), Error> {
  for idx in 0..mesh.triangles.len() {
    let t = TriIdx(idx);
    for sub in 0..3 {
      let s = SubIdx(sub);
      let e = Edge::new(t, s);
      let n = match mesh.tri(t).neighbor(s) {
        Some(n) => n,
        None => continue,
      };
      if n.0 < idx {
        continue;
      }
      let (a, b) = mesh.edge_verts(&e);
      if mesh.is_constrained(a, b) {
        continue;
      }
      let apex = mesh.tri(t).vert(s.ccw());
      let m = match mesh.mirror(&e) {
        Some(m) => m,
        None => continue,
      };
      let far = mesh.tri(m.tri).vert(m.sub.ccw());
      if [a, b, apex, far].iter().any(|&v| mesh.is_super(v)) {
        continue;
      }
      let [ta, tb, tc] = mesh.tri(t).vertices;
      if in_circle_exact(mesh, ta, tb, tc, far)? == Ordering::Greater {
        return Err(Error::InconsistentMesh { triangle: idx });
      }
    }
  }
  Ok(())
}

/// Quadratic audit: no finite vertex of the triangulation lies strictly
/// inside any triangle's circumcircle. This is the global Delaunay property
/// and only holds for unconstrained, carved meshes, which is exactly where
/// the test suite applies it.
pub fn empty_circumcircles(mesh: &TriMesh) -> Result<(), Error> {
  for idx in 0..mesh.triangles.len() {
    let [a, b, c] = mesh.tri(TriIdx(idx)).vertices;
    for v in 0..mesh.vertices.len() {
      let v = VertIdx(v);
      if v == a || v == b || v == c {
        continue;
      }
      // Super vertices and merged duplicates take no part in the mesh.
      if mesh.is_super(v) || mesh.vertex_tri(v).is_none() {
        continue;
      }
      if in_circle_exact(mesh, a, b, c, v)? == Ordering::Greater {
        return Err(Error::InconsistentMesh { triangle: idx });
      }
    }
  }
  Ok(())
}

fn exact_coords(mesh: &TriMesh, v: VertIdx) -> Result<(BigRational, BigRational), Error> {
  let p = mesh.vert(v);
  let x = BigRational::from_float(p.x).ok_or(Error::InvalidCoordinate { point: v.0 })?;
  let y = BigRational::from_float(p.y).ok_or(Error::InvalidCoordinate { point: v.0 })?;
  Ok((x, y))
}

fn orient_exact(mesh: &TriMesh, a: VertIdx, b: VertIdx, c: VertIdx) -> Result<Ordering, Error> {
  let (ax, ay) = exact_coords(mesh, a)?;
  let (bx, by) = exact_coords(mesh, b)?;
  let (cx, cy) = exact_coords(mesh, c)?;
  let det = (&bx - &ax) * (&cy - &ay) - (&by - &ay) * (&cx - &ax);
  Ok(det.cmp(&BigRational::zero()))
}

/// Sign of the in-circle determinant: `Greater` when `d` is strictly inside
/// the circumcircle of the counterclockwise triangle `(a, b, c)`.
fn in_circle_exact(
  mesh: &TriMesh,
  a: VertIdx,
  b: VertIdx,
  c: VertIdx,
  d: VertIdx,
) -> Result<Ordering, Error> {
  let (dx, dy) = exact_coords(mesh, d)?;
  let row = |v: VertIdx| -> Result<[BigRational; 3], Error> {
    let (x, y) = exact_coords(mesh, v)?;
    let ex = x - &dx;
    let ey = y - &dy;
    let lift = &ex * &ex + &ey * &ey;
    Ok([ex, ey, lift])
  };
  let m = [row(a)?, row(b)?, row(c)?];
  let minor = |c1: usize, c2: usize| &m[1][c1] * &m[2][c2] - &m[1][c2] * &m[2][c1];
  let det = &m[0][0] * minor(1, 2) - &m[0][1] * minor(0, 2) + &m[0][2] * minor(0, 1);
  Ok(det.cmp(&BigRational::zero()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::algorithms::{constrained, delaunay as builder};
  use crate::data::Point;
  use proptest::prelude::*;

  fn carved(points: &[Point]) -> TriMesh {
    let d = builder::triangulate(points).unwrap();
    let mut mesh = d.mesh;
    constrained::enclose_hull(&mut mesh);
    constrained::carve(&mut mesh, &[], &[]);
    mesh
  }

  #[test]
  fn clean_mesh_passes_every_audit() {
    let mesh = carved(&[
      Point::new(0.0, 0.0),
      Point::new(4.0, 0.0),
      Point::new(5.0, 3.0),
      Point::new(2.0, 5.0),
      Point::new(-1.0, 2.0),
      Point::new(2.0, 2.0),
    ]);
    assert_eq!(consistency(&mesh), Ok(()));
    assert_eq!(delaunay(&mesh), Ok(()));
    assert_eq!(empty_circumcircles(&mesh), Ok(()));
  }

  #[test]
  fn inverted_triangle_is_reported() {
    let mut mesh = carved(&[
      Point::new(0.0, 0.0),
      Point::new(2.0, 0.0),
      Point::new(2.0, 2.0),
      Point::new(0.0, 2.0),
    ]);
    mesh.triangles[0].vertices.swap(0, 1);
    assert_eq!(
      consistency(&mesh),
      Err(Error::DegenerateTriangle { triangle: 0 })
    );
  }

  #[test]
  fn broken_neighbor_link_is_reported() {
    let mut mesh = carved(&[
      Point::new(0.0, 0.0),
      Point::new(2.0, 0.0),
      Point::new(2.0, 2.0),
      Point::new(0.0, 2.0),
    ]);
    // Point one triangle at itself; the backlink check must object.
    let s = mesh.triangles[0]
      .neighbors
      .iter()
      .position(|n| n.is_some())
      .unwrap();
    mesh.triangles[0].neighbors[s] = Some(TriIdx(0));
    assert!(matches!(
      consistency(&mesh),
      Err(Error::InconsistentMesh { .. })
    ));
  }

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]
    #[test]
    fn random_clouds_are_exactly_delaunay(
      points in crate::testing::cloud(50.0, 3..14)
    ) {
      let d = match builder::triangulate(&points) {
        Ok(d) => d,
        Err(_) => return Ok(()),
      };
      let mut mesh = d.mesh;
      constrained::enclose_hull(&mut mesh);
      constrained::carve(&mut mesh, &[], &[]);
      prop_assert_eq!(consistency(&mesh), Ok(()));
      prop_assert_eq!(delaunay(&mesh), Ok(()));
      prop_assert_eq!(empty_circumcircles(&mesh), Ok(()));
    }
  }
}
