use std::collections::VecDeque;

use crate::data::mesh::{Edge, MeshLocation, SegmentWalk, SubIdx, TriIdx, TriMesh, VertIdx, Walk};
use crate::data::Point;
use crate::Error;

/// A region seed: every triangle reachable from `point` without crossing a
/// constrained edge receives `attribute` and, when given, `max_area`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSeed {
  pub point: Point,
  pub attribute: f64,
  pub max_area: Option<f64>,
}

/// Region table produced by carving, indexed by triangle tag. Index 0 is
/// the untagged default.
#[derive(Debug, Clone, Copy)]
pub struct RegionInfo {
  pub attribute: f64,
  pub max_area: Option<f64>,
}

/// Force every input segment into the triangulation as a constrained edge.
///
/// Segments are stored per sub-segment: a segment passing exactly through
/// an intermediate vertex becomes two constrained edges sharing that
/// vertex, both carrying the segment's marker.
pub fn insert_segments(
  mesh: &mut TriMesh,
  canonical: &[VertIdx],
  segments: &[[usize; 2]],
  markers: &[i32],
) -> Result<(), Error> {
  debug_assert_eq!(segments.len(), markers.len());
  for (idx, seg) in segments.iter().enumerate() {
    let va = canonical[seg[0]];
    let vb = canonical[seg[1]];
    if va == vb {
      tracing::warn!(
        segment = idx,
        "segment endpoints coincide after duplicate merging, skipping"
      );
      continue;
    }
    insert_segment(mesh, va, vb, markers[idx])?;
  }
  mesh.check_invariant("insert_segments");
  Ok(())
}

fn insert_segment(mesh: &mut TriMesh, va: VertIdx, vb: VertIdx, marker: i32) -> Result<(), Error> {
  let mut cur = va;
  while cur != vb {
    match mesh.segment_walk(cur, vb)? {
      SegmentWalk::AlreadyEdge => {
        mesh.mark_constraint(cur, vb, marker);
        cur = vb;
      }
      SegmentWalk::Corridor(corridor) => {
        let end = corridor.end;
        mesh.excavate(cur, corridor);
        mesh.mark_constraint(cur, end, marker);
        cur = end;
      }
    }
  }
  Ok(())
}

/// Turn every convex hull edge into a constrained segment with marker 1,
/// unless the edge already carries one. Must run before [`carve`] so the
/// exterior flood stops at the hull.
pub fn enclose_hull(mesh: &mut TriMesh) {
  let mut hull = Vec::new();
  for t in 0..mesh.triangles.len() {
    let t = TriIdx(t);
    if mesh.is_super_tri(t) {
      continue;
    }
    for s in 0..3 {
      let e = Edge::new(t, SubIdx(s));
      let outside = match mesh.mirror(&e) {
        Some(m) => mesh.is_super_tri(m.tri),
        None => true,
      };
      if outside {
        let (a, b) = mesh.edge_verts(&e);
        if mesh.constraint_marker(a, b).is_none() {
          hull.push((a, b));
        }
      }
    }
  }
  tracing::debug!(edges = hull.len(), "enclosing convex hull");
  for (a, b) in hull {
    mesh.mark_constraint(a, b, 1);
  }
}

/// Remove the exterior and every hole region, then tag the remaining
/// triangles with their region seeds. Returns the region table.
///
/// The exterior flood starts at the bounding triangle's corners and spreads
/// until it hits constrained edges, so an unenclosed point set must have
/// its hull marked first.
pub fn carve(mesh: &mut TriMesh, holes: &[Point], seeds: &[RegionSeed]) -> Vec<RegionInfo> {
  let ntri = mesh.triangles.len();
  let mut dead = vec![false; ntri];

  let mut queue: VecDeque<TriIdx> = VecDeque::new();
  for t in 0..ntri {
    let t = TriIdx(t);
    if mesh.is_super_tri(t) {
      dead[t.0] = true;
      queue.push_back(t);
    }
  }
  flood(mesh, &mut dead, &mut queue);

  for (idx, hole) in holes.iter().enumerate() {
    match locate_seed(mesh, hole) {
      Some(t) => {
        if !dead[t.0] {
          dead[t.0] = true;
          queue.push_back(t);
          flood(mesh, &mut dead, &mut queue);
        }
      }
      None => tracing::debug!(hole = idx, "hole point lies outside the mesh"),
    }
  }

  let mut regions = vec![RegionInfo {
    attribute: 0.0,
    max_area: None,
  }];
  for (idx, seed) in seeds.iter().enumerate() {
    let tag = regions.len() as u32;
    regions.push(RegionInfo {
      attribute: seed.attribute,
      max_area: seed.max_area,
    });
    match locate_seed(mesh, &seed.point) {
      Some(t) if !dead[t.0] => tag_flood(mesh, &dead, t, tag),
      _ => tracing::debug!(region = idx, "region point lies in carved space"),
    }
  }

  let removed = dead.iter().filter(|&&d| d).count();
  tracing::debug!(removed, kept = ntri - removed, "carved exterior and holes");
  mesh.retain_triangles(&dead);
  regions
}

fn flood(mesh: &TriMesh, dead: &mut [bool], queue: &mut VecDeque<TriIdx>) {
  while let Some(t) = queue.pop_front() {
    for s in 0..3 {
      let e = Edge::new(t, SubIdx(s));
      let (a, b) = mesh.edge_verts(&e);
      if mesh.is_constrained(a, b) {
        continue;
      }
      if let Some(m) = mesh.mirror(&e) {
        if !dead[m.tri.0] {
          dead[m.tri.0] = true;
          queue.push_back(m.tri);
        }
      }
    }
  }
}

fn tag_flood(mesh: &mut TriMesh, dead: &[bool], start: TriIdx, tag: u32) {
  let mut queue = VecDeque::new();
  mesh.set_tag(start, tag);
  queue.push_back(start);
  while let Some(t) = queue.pop_front() {
    for s in 0..3 {
      let e = Edge::new(t, SubIdx(s));
      let (a, b) = mesh.edge_verts(&e);
      if mesh.is_constrained(a, b) {
        continue;
      }
      if let Some(m) = mesh.mirror(&e) {
        if !dead[m.tri.0] && mesh.tag(m.tri) != tag {
          mesh.set_tag(m.tri, tag);
          queue.push_back(m.tri);
        }
      }
    }
  }
}

fn locate_seed(mesh: &mut TriMesh, p: &Point) -> Option<TriIdx> {
  if mesh.triangles.is_empty() {
    return None;
  }
  match mesh.locate_any(TriIdx(0), p) {
    Walk::Found(MeshLocation::InTriangle(t)) => Some(t),
    Walk::Found(MeshLocation::OnEdge(e)) => Some(e.tri),
    Walk::Found(MeshLocation::OnVertex(_)) => None,
    Walk::Found(MeshLocation::Outside(_)) => None,
    Walk::Blocked(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::algorithms::delaunay;

  fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
    coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
  }

  fn ring(first: usize, len: usize) -> Vec<[usize; 2]> {
    (0..len).map(|i| [first + i, first + (i + 1) % len]).collect()
  }

  #[test]
  fn annulus_keeps_eight_triangles() {
    let points = pts(&[
      (0.0, 0.0),
      (3.0, 0.0),
      (3.0, 3.0),
      (0.0, 3.0),
      (1.0, 1.0),
      (2.0, 1.0),
      (2.0, 2.0),
      (1.0, 2.0),
    ]);
    let mut segments = ring(0, 4);
    segments.extend(ring(4, 4));
    let markers = vec![1, 1, 1, 1, 2, 2, 2, 2];

    let d = delaunay::triangulate(&points).unwrap();
    let mut mesh = d.mesh;
    insert_segments(&mut mesh, &d.canonical, &segments, &markers).unwrap();
    carve(&mut mesh, &[Point::new(1.5, 1.5)], &[]);

    assert_eq!(mesh.triangles.len(), 8);
    for (i, seg) in segments.iter().enumerate() {
      let a = d.canonical[seg[0]];
      let b = d.canonical[seg[1]];
      assert!(mesh.find_edge(a, b).is_some());
      assert_eq!(mesh.constraint_marker(a, b), Some(markers[i]));
    }
    mesh.check_invariant("annulus");
  }

  #[test]
  fn crossing_segments_are_rejected() {
    let points = pts(&[(0.0, 0.0), (3.0, 0.0), (1.0, -0.8), (1.0, 2.0)]);
    let segments = vec![[0, 1], [2, 3]];
    let markers = vec![0, 0];

    let d = delaunay::triangulate(&points).unwrap();
    let mut mesh = d.mesh;
    let err = insert_segments(&mut mesh, &d.canonical, &segments, &markers).unwrap_err();
    match err {
      Error::SegmentsCross { first, second } => {
        assert_eq!(first, (2, 3));
        let mut crossed = [second.0, second.1];
        crossed.sort_unstable();
        assert_eq!(crossed, [0, 1]);
      }
      other => panic!("expected SegmentsCross, got {:?}", other),
    }
  }

  #[test]
  fn segment_through_vertex_splits_at_it() {
    let points = pts(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.5, 1.0), (1.5, 1.0)]);
    let segments = vec![[0, 2]];
    let markers = vec![5];

    let d = delaunay::triangulate(&points).unwrap();
    let mut mesh = d.mesh;
    insert_segments(&mut mesh, &d.canonical, &segments, &markers).unwrap();

    let v0 = d.canonical[0];
    let v1 = d.canonical[1];
    let v2 = d.canonical[2];
    assert_eq!(mesh.constraint_marker(v0, v1), Some(5));
    assert_eq!(mesh.constraint_marker(v1, v2), Some(5));
    assert!(!mesh.is_constrained(v0, v2));
  }

  #[test]
  fn hull_enclosure_keeps_interior() {
    let points = pts(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (1.0, 1.0)]);
    let d = delaunay::triangulate(&points).unwrap();
    let mut mesh = d.mesh;
    enclose_hull(&mut mesh);
    carve(&mut mesh, &[], &[]);

    assert_eq!(mesh.triangles.len(), 4);
    for t in 0..mesh.triangles.len() {
      let t = TriIdx(t);
      for s in 0..3 {
        let e = Edge::new(t, SubIdx(s));
        if mesh.mirror(&e).is_none() {
          let (a, b) = mesh.edge_verts(&e);
          assert_eq!(mesh.constraint_marker(a, b), Some(1));
        }
      }
    }
  }

  #[test]
  fn region_seed_tags_reachable_triangles() {
    let points = pts(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
    let segments = ring(0, 4);
    let markers = vec![1; 4];

    let d = delaunay::triangulate(&points).unwrap();
    let mut mesh = d.mesh;
    insert_segments(&mut mesh, &d.canonical, &segments, &markers).unwrap();
    let seeds = vec![RegionSeed {
      point: Point::new(0.5, 0.5),
      attribute: 7.5,
      max_area: Some(0.25),
    }];
    let regions = carve(&mut mesh, &[], &seeds);

    assert_eq!(regions.len(), 2);
    assert_eq!(regions[1].attribute, 7.5);
    assert_eq!(regions[1].max_area, Some(0.25));
    assert_eq!(mesh.triangles.len(), 2);
    for t in 0..mesh.triangles.len() {
      assert_eq!(mesh.tag(TriIdx(t)), 1);
    }
  }
}
