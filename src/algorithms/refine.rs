//! Delaunay refinement in the style of Ruppert.
//!
//! Encroached sub-segments are split first, at their midpoint or on a
//! power-of-two shell near input vertices. Triangles violating the angle or
//! area bounds are then attacked at their circumcenter; a circumcenter that
//! cannot be reached without crossing a constrained edge splits that edge
//! instead of being inserted. Angles pinched between two constrained edges
//! are exempt from the angle bound; no split can widen them.

use std::collections::VecDeque;

use crate::algorithms::constrained::RegionInfo;
use crate::data::mesh::{Edge, MeshLocation, SubIdx, TriIdx, TriMesh, VertIdx, Walk};
use crate::data::Point;
use crate::predicates;

/// Per-vertex bookkeeping carried alongside the mesh: a boundary marker and
/// `dim` attributes per vertex, indexed like `TriMesh::vertices`. Refinement
/// appends one entry for every Steiner point it inserts.
#[derive(Debug, Clone)]
pub struct VertexData {
  pub dim: usize,
  pub markers: Vec<i32>,
  pub attributes: Vec<Vec<f64>>,
}

impl VertexData {
  pub fn new(dim: usize) -> VertexData {
    VertexData {
      dim,
      markers: Vec::new(),
      attributes: Vec::new(),
    }
  }

  pub fn push(&mut self, marker: i32, attributes: Vec<f64>) {
    debug_assert_eq!(attributes.len(), self.dim);
    self.markers.push(marker);
    self.attributes.push(attributes);
  }
}

/// Bounds driving refinement. With every field off, refinement is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefineParams {
  /// Minimum angle in degrees that every output triangle must reach.
  pub min_angle_deg: Option<f64>,
  /// Area bound applied to every triangle, on top of any per-region bound.
  pub max_area: Option<f64>,
  /// Split sub-segments until their diametral circles are empty, making the
  /// constrained triangulation truly Delaunay.
  pub conforming: bool,
  /// Hard cap on the number of Steiner points.
  pub max_steiner: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefineOutcome {
  /// Number of Steiner points inserted.
  pub steiner: usize,
  /// False if the Steiner cap was hit with encroached sub-segments or bad
  /// triangles still pending.
  pub complete: bool,
}

/// Refine the carved triangulation until it meets `params`.
///
/// `data` must hold one entry per existing mesh vertex; markers and
/// attributes for new Steiner points are appended to it. Segment splits
/// inherit the segment's marker and interpolate attributes along the
/// segment, circumcenters get marker 0 and barycentric attributes.
pub fn refine(
  mesh: &mut TriMesh,
  data: &mut VertexData,
  regions: &[RegionInfo],
  params: RefineParams,
) -> RefineOutcome {
  debug_assert_eq!(data.markers.len(), mesh.vertices.len());
  if let Some(deg) = params.min_angle_deg {
    if deg > 33.0 {
      tracing::warn!(
        min_angle = deg,
        "minimum angle above 33 degrees, refinement may not terminate"
      );
    }
  }
  let b_squared = params.min_angle_deg.map(|deg| {
    // A triangle is skinny when circumradius / shortest edge exceeds
    // B = 1 / (2 sin angle). Both sides are squared to skip the roots.
    let s = deg.to_radians().sin();
    1.0 / (4.0 * s * s)
  });
  let input_limit = mesh.vertices.len();
  let mut refiner = Refiner {
    mesh: &mut *mesh,
    data,
    regions,
    params,
    b_squared,
    input_limit,
    seg_queue: VecDeque::new(),
    tri_queue: VecDeque::new(),
    inserted: 0,
  };
  refiner.seed();
  let complete = refiner.run();
  let steiner = refiner.inserted;
  mesh.check_invariant("refine");
  tracing::debug!(steiner, complete, "refinement finished");
  RefineOutcome { steiner, complete }
}

struct Refiner<'a> {
  mesh: &'a mut TriMesh,
  data: &'a mut VertexData,
  regions: &'a [RegionInfo],
  params: RefineParams,
  b_squared: Option<f64>,
  /// Vertices below this index existed before refinement started.
  input_limit: usize,
  seg_queue: VecDeque<(VertIdx, VertIdx)>,
  /// Queued with their vertex triple; a slot whose triple changed since
  /// queueing is stale and dropped on pop.
  tri_queue: VecDeque<(TriIdx, [VertIdx; 3])>,
  inserted: usize,
}

impl<'a> Refiner<'a> {
  fn any_active(&self) -> bool {
    self.params.conforming || self.triangle_bounds_active()
  }

  fn triangle_bounds_active(&self) -> bool {
    self.b_squared.is_some()
      || self.params.max_area.is_some()
      || self.regions.iter().any(|r| r.max_area.is_some())
  }

  fn exhausted(&self) -> bool {
    match self.params.max_steiner {
      Some(cap) => self.inserted >= cap,
      None => false,
    }
  }

  fn seed(&mut self) {
    if !self.any_active() {
      return;
    }
    // Constraint iteration order is arbitrary; sorting keeps the split
    // order, and with it the refined mesh, identical across runs.
    let mut pairs: Vec<_> = self.mesh.constraints().map(|(e, _)| (e.min, e.max)).collect();
    pairs.sort_unstable();
    for (a, b) in pairs {
      self.consider_segment(a, b);
    }
    if self.triangle_bounds_active() {
      for idx in 0..self.mesh.triangles.len() {
        let t = TriIdx(idx);
        if self.is_bad(t) {
          self.tri_queue.push_back((t, self.mesh.tri(t).vertices));
        }
      }
    }
  }

  fn run(&mut self) -> bool {
    loop {
      if self.exhausted() {
        return !self.has_pending_work();
      }
      if let Some((a, b)) = self.seg_queue.pop_front() {
        self.split_segment(a, b, false);
        continue;
      }
      match self.tri_queue.pop_front() {
        Some((t, verts)) => self.split_triangle(t, verts),
        None => return true,
      }
    }
  }

  fn has_pending_work(&self) -> bool {
    if self
      .seg_queue
      .iter()
      .any(|&(a, b)| self.segment_encroached(a, b))
    {
      return true;
    }
    self
      .tri_queue
      .iter()
      .any(|&(t, verts)| self.mesh.tri(t).vertices == verts)
  }

  // Segments

  fn consider_segment(&mut self, a: VertIdx, b: VertIdx) {
    if self.segment_encroached(a, b) {
      self.seg_queue.push_back((a, b));
    }
  }

  /// True if either apex flanking the sub-segment lies strictly inside its
  /// diametral circle. In a constrained Delaunay triangulation any vertex
  /// inside the circle pulls one of the two apexes in with it, so testing
  /// the apexes suffices.
  fn segment_encroached(&self, a: VertIdx, b: VertIdx) -> bool {
    if !self.mesh.is_constrained(a, b) {
      return false;
    }
    let e = match self.mesh.find_edge(a, b) {
      Some(e) => e,
      None => return false,
    };
    let pa = self.mesh.vert(a);
    let pb = self.mesh.vert(b);
    let apex = self.mesh.tri(e.tri).vert(e.sub.ccw());
    if predicates::encroaches(self.mesh.vert(apex), pa, pb) {
      return true;
    }
    if let Some(m) = self.mesh.mirror(&e) {
      let apex = self.mesh.tri(m.tri).vert(m.sub.ccw());
      if predicates::encroaches(self.mesh.vert(apex), pa, pb) {
        return true;
      }
    }
    false
  }

  /// Split the sub-segment `(a, b)` and re-queue affected work. `forced`
  /// skips the encroachment re-check; it is set when a circumcenter walk ran
  /// into the segment. Returns false if the split was stale or degenerate.
  fn split_segment(&mut self, a: VertIdx, b: VertIdx, forced: bool) -> bool {
    if !forced && !self.segment_encroached(a, b) {
      return false;
    }
    let marker = match self.mesh.constraint_marker(a, b) {
      Some(m) => m,
      None => return false,
    };
    let e = match self.mesh.find_edge(a, b) {
      Some(e) => e,
      None => return false,
    };
    let pa = *self.mesh.vert(a);
    let pb = *self.mesh.vert(b);
    let (p, frac) = split_point(
      &pa,
      &pb,
      self.is_input_vertex(a),
      self.is_input_vertex(b),
    );
    if p == pa || p == pb {
      tracing::warn!(?a, ?b, "sub-segment too short to split further");
      return false;
    }
    // Release the constraint before walking: the split point may round to
    // either side of the exact segment line, and the walk must be free to
    // cross the old edge to reach it.
    self.mesh.unmark_constraint(a, b);
    let loc = match self.mesh.locate(e.tri, &p) {
      Walk::Found(MeshLocation::OnVertex(v)) => {
        tracing::warn!(?a, ?b, ?v, "sub-segment split point coincides with a vertex");
        self.mesh.mark_constraint(a, b, marker);
        return false;
      }
      Walk::Found(MeshLocation::Outside(_)) | Walk::Blocked(_) => {
        self.mesh.mark_constraint(a, b, marker);
        return false;
      }
      Walk::Found(loc) => loc,
    };
    let attributes = self.lerp_attributes(a, b, frac);
    let v = self.mesh.add_vert(p);
    self.data.push(marker, attributes);
    self.mesh.insert_at(v, loc);
    self.mesh.mark_constraint(a, v, marker);
    self.mesh.mark_constraint(v, b, marker);
    debug_assert!(self.mesh.find_edge(a, v).is_some());
    debug_assert!(self.mesh.find_edge(v, b).is_some());
    self.inserted += 1;
    self.requeue_around(v);
    true
  }

  // Triangles

  fn split_triangle(&mut self, t: TriIdx, verts: [VertIdx; 3]) {
    if self.mesh.tri(t).vertices != verts {
      return;
    }
    let [a, b, c] = verts;
    let pa = *self.mesh.vert(a);
    let pb = *self.mesh.vert(b);
    let pc = *self.mesh.vert(c);
    let cc = match predicates::circumcenter(&pa, &pb, &pc) {
      Some(cc) => cc,
      None => return,
    };
    match self.mesh.locate(t, &cc) {
      Walk::Blocked(e) => {
        let (ea, eb) = self.mesh.edge_verts(&e);
        if self.mesh.is_constrained(ea, eb) {
          // The circumcenter is shadowed by a sub-segment; splitting the
          // segment takes priority over the skinny triangle.
          if self.split_segment(ea, eb, true) {
            self.tri_queue.push_back((t, verts));
          }
        } else {
          tracing::debug!(?t, "circumcenter escaped through an unconstrained boundary");
        }
      }
      Walk::Found(MeshLocation::OnVertex(_)) => {
        tracing::debug!(?t, "circumcenter coincides with an existing vertex");
      }
      Walk::Found(MeshLocation::OnEdge(e)) => {
        let (ea, eb) = self.mesh.edge_verts(&e);
        if self.mesh.is_constrained(ea, eb) {
          if self.split_segment(ea, eb, true) {
            self.tri_queue.push_back((t, verts));
          }
        } else {
          self.insert_steiner(cc, e.tri, MeshLocation::OnEdge(e));
        }
      }
      Walk::Found(MeshLocation::InTriangle(host)) => {
        self.insert_steiner(cc, host, MeshLocation::InTriangle(host));
      }
      Walk::Found(MeshLocation::Outside(_)) => {}
    }
  }

  fn insert_steiner(&mut self, p: Point, host: TriIdx, loc: MeshLocation) {
    let attributes = self.interpolated_attributes(host, &p);
    let v = self.mesh.add_vert(p);
    self.data.push(0, attributes);
    self.mesh.insert_at(v, loc);
    self.inserted += 1;
    self.requeue_around(v);
  }

  /// Every triangle and constrained edge touched by an insertion is incident
  /// to the new vertex, so rescanning its fan picks up all fresh work.
  fn requeue_around(&mut self, v: VertIdx) {
    for t in self.mesh.triangles_around(v) {
      if self.is_bad(t) {
        self.tri_queue.push_back((t, self.mesh.tri(t).vertices));
      }
      for sub in 0..3 {
        let e = Edge::new(t, SubIdx(sub));
        let (a, b) = self.mesh.edge_verts(&e);
        if self.mesh.is_constrained(a, b) {
          self.consider_segment(a, b);
        }
      }
    }
  }

  fn is_bad(&self, t: TriIdx) -> bool {
    let [a, b, c] = self.mesh.tri(t).vertices;
    let pa = self.mesh.vert(a);
    let pb = self.mesh.vert(b);
    let pc = self.mesh.vert(c);
    if let Some(cap) = self.area_cap(t) {
      if predicates::signed_area_x2(pa, pb, pc) / 2.0 > cap {
        return true;
      }
    }
    if let Some(b2) = self.b_squared {
      if let Some(cc) = predicates::circumcenter(pa, pb, pc) {
        let r2 = predicates::distance_sq(&cc, pa);
        let ab = predicates::distance_sq(pa, pb);
        let bc = predicates::distance_sq(pb, pc);
        let ca = predicates::distance_sq(pc, pa);
        let l2 = ab.min(bc).min(ca);
        if r2 > b2 * l2 && !self.pinned_by_segments(a, b, c, ab, bc, ca) {
          return true;
        }
      }
    }
    false
  }

  /// The smallest angle sits opposite the shortest edge. When both edges
  /// radiating from its corner are constrained the angle is an input
  /// feature no split can widen, and the angle bound skips the triangle.
  fn pinned_by_segments(
    &self,
    a: VertIdx,
    b: VertIdx,
    c: VertIdx,
    ab: f64,
    bc: f64,
    ca: f64,
  ) -> bool {
    let (apex, u, w) = if ab <= bc && ab <= ca {
      (c, a, b)
    } else if bc <= ca {
      (a, b, c)
    } else {
      (b, c, a)
    };
    self.mesh.is_constrained(apex, u) && self.mesh.is_constrained(apex, w)
  }

  fn area_cap(&self, t: TriIdx) -> Option<f64> {
    let region = self
      .regions
      .get(self.mesh.tag(t) as usize)
      .and_then(|r| r.max_area);
    match (self.params.max_area, region) {
      (Some(a), Some(b)) => Some(a.min(b)),
      (a, b) => a.or(b),
    }
  }

  fn is_input_vertex(&self, v: VertIdx) -> bool {
    v.0 < self.input_limit
  }

  fn lerp_attributes(&self, a: VertIdx, b: VertIdx, frac: f64) -> Vec<f64> {
    let va = &self.data.attributes[a.0];
    let vb = &self.data.attributes[b.0];
    va.iter().zip(vb).map(|(x, y)| x + (y - x) * frac).collect()
  }

  fn interpolated_attributes(&self, t: TriIdx, p: &Point) -> Vec<f64> {
    if self.data.dim == 0 {
      return Vec::new();
    }
    let [a, b, c] = self.mesh.tri(t).vertices;
    let pa = self.mesh.vert(a);
    let pb = self.mesh.vert(b);
    let pc = self.mesh.vert(c);
    let total = predicates::signed_area_x2(pa, pb, pc);
    let wa = predicates::signed_area_x2(p, pb, pc) / total;
    let wb = predicates::signed_area_x2(pa, p, pc) / total;
    let wc = predicates::signed_area_x2(pa, pb, p) / total;
    (0..self.data.dim)
      .map(|i| {
        wa * self.data.attributes[a.0][i]
          + wb * self.data.attributes[b.0][i]
          + wc * self.data.attributes[c.0][i]
      })
      .collect()
  }
}

/// Where to split the sub-segment `(pa, pb)`, as a point and the fraction
/// from `pa` toward `pb`.
///
/// Between two vertices of the same kind the midpoint is used. When exactly
/// one endpoint is an input vertex the split lands at a power-of-two
/// distance from it, so repeated splits of segments sharing that endpoint
/// fall on common concentric shells.
fn split_point(pa: &Point, pb: &Point, a_input: bool, b_input: bool) -> (Point, f64) {
  if a_input == b_input {
    return (pa.midpoint(pb), 0.5);
  }
  let len = predicates::distance_sq(pa, pb).sqrt();
  let shell = predicates::nearest_power_of_two(len / 2.0);
  let mut frac = if a_input {
    shell / len
  } else {
    1.0 - shell / len
  };
  if !(frac > 0.0 && frac < 1.0) {
    frac = 0.5;
  }
  (*pa + (*pb - *pa) * frac, frac)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::algorithms::constrained::{self, RegionSeed};
  use crate::algorithms::delaunay;

  fn cdt(
    points: &[(f64, f64)],
    segments: &[[usize; 2]],
    markers: &[i32],
    seeds: &[RegionSeed],
  ) -> (TriMesh, Vec<RegionInfo>) {
    let pts: Vec<Point> = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
    let d = delaunay::triangulate(&pts).unwrap();
    let mut mesh = d.mesh;
    constrained::insert_segments(&mut mesh, &d.canonical, segments, markers).unwrap();
    let regions = constrained::carve(&mut mesh, &[], seeds);
    (mesh, regions)
  }

  fn boundary_marked_data(mesh: &TriMesh) -> VertexData {
    let mut data = VertexData::new(0);
    for i in 0..mesh.vertices.len() {
      let marker = if i < mesh.num_super_vertices() { 0 } else { 1 };
      data.push(marker, Vec::new());
    }
    data
  }

  fn coord_data(mesh: &TriMesh) -> VertexData {
    let mut data = VertexData::new(1);
    for p in &mesh.vertices {
      data.push(0, vec![p.x]);
    }
    data
  }

  fn tri_area(mesh: &TriMesh, t: TriIdx) -> f64 {
    let [a, b, c] = mesh.tri(t).vertices;
    predicates::signed_area_x2(mesh.vert(a), mesh.vert(b), mesh.vert(c)) / 2.0
  }

  fn min_angle_deg(mesh: &TriMesh, t: TriIdx) -> f64 {
    let [a, b, c] = mesh.tri(t).vertices;
    let pts = [*mesh.vert(a), *mesh.vert(b), *mesh.vert(c)];
    let mut best = f64::MAX;
    for i in 0..3 {
      let u = pts[(i + 1) % 3] - pts[i];
      let v = pts[(i + 2) % 3] - pts[i];
      let cos = u.dot(&v) / (u.dot(&u).sqrt() * v.dot(&v).sqrt());
      best = best.min(cos.clamp(-1.0, 1.0).acos().to_degrees());
    }
    best
  }

  fn all_segments_gabriel(mesh: &TriMesh) -> bool {
    let pairs: Vec<_> = mesh.constraints().map(|(e, _)| (e.min, e.max)).collect();
    pairs.iter().all(|&(a, b)| {
      let e = match mesh.find_edge(a, b) {
        Some(e) => e,
        None => return false,
      };
      let pa = mesh.vert(a);
      let pb = mesh.vert(b);
      let apex = mesh.tri(e.tri).vert(e.sub.ccw());
      if predicates::encroaches(mesh.vert(apex), pa, pb) {
        return false;
      }
      if let Some(m) = mesh.mirror(&e) {
        let apex = mesh.tri(m.tri).vert(m.sub.ccw());
        if predicates::encroaches(mesh.vert(apex), pa, pb) {
          return false;
        }
      }
      true
    })
  }

  #[test]
  fn skinny_box_reaches_min_angle() {
    let (mut mesh, regions) = cdt(
      &[(0.0, 0.0), (10.0, 0.0), (10.0, 1.0), (0.0, 1.0)],
      &[[0, 1], [1, 2], [2, 3], [3, 0]],
      &[1, 1, 1, 1],
      &[],
    );
    let mut data = boundary_marked_data(&mesh);
    let outcome = refine(
      &mut mesh,
      &mut data,
      &regions,
      RefineParams {
        min_angle_deg: Some(20.0),
        ..RefineParams::default()
      },
    );
    assert!(outcome.complete);
    assert!(outcome.steiner > 0);
    for idx in 0..mesh.triangles.len() {
      assert!(min_angle_deg(&mesh, TriIdx(idx)) >= 19.99);
    }
    // Segment splits carry the boundary marker and stay on the boundary;
    // circumcenters get marker 0 and stay strictly inside.
    let supers = mesh.num_super_vertices();
    for (i, p) in mesh.vertices.iter().enumerate().skip(supers + 4) {
      let on_boundary = p.x == 0.0 || p.x == 10.0 || p.y == 0.0 || p.y == 1.0;
      if data.markers[i] == 1 {
        assert!(on_boundary, "marked vertex {:?} drifted off the boundary", p);
      } else {
        assert!(!on_boundary);
      }
    }
  }

  #[test]
  fn area_cap_bounds_every_triangle() {
    let (mut mesh, regions) = cdt(
      &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)],
      &[[0, 1], [1, 2], [2, 3], [3, 0]],
      &[1, 1, 1, 1],
      &[],
    );
    let mut data = coord_data(&mesh);
    let outcome = refine(
      &mut mesh,
      &mut data,
      &regions,
      RefineParams {
        max_area: Some(0.5),
        ..RefineParams::default()
      },
    );
    assert!(outcome.complete);
    assert!(outcome.steiner > 0);
    for idx in 0..mesh.triangles.len() {
      assert!(tri_area(&mesh, TriIdx(idx)) <= 0.5);
    }
    // The single attribute equals the x coordinate on the input, a linear
    // field both interpolation paths reproduce.
    for (p, attrs) in mesh.vertices.iter().zip(&data.attributes) {
      assert!((attrs[0] - p.x).abs() < 1e-6);
    }
  }

  #[test]
  fn steiner_budget_stops_refinement() {
    let (mut mesh, regions) = cdt(
      &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)],
      &[[0, 1], [1, 2], [2, 3], [3, 0]],
      &[1, 1, 1, 1],
      &[],
    );
    let before = mesh.vertices.len();
    let mut data = boundary_marked_data(&mesh);
    let outcome = refine(
      &mut mesh,
      &mut data,
      &regions,
      RefineParams {
        max_area: Some(0.01),
        max_steiner: Some(5),
        ..RefineParams::default()
      },
    );
    assert!(!outcome.complete);
    assert!(outcome.steiner <= 5);
    assert_eq!(mesh.vertices.len(), before + outcome.steiner);
    assert_eq!(data.markers.len(), mesh.vertices.len());
  }

  #[test]
  fn conforming_splits_encroached_segments() {
    let (mut mesh, regions) = cdt(
      &[
        (0.0, 0.0),
        (4.0, 0.0),
        (4.0, 4.0),
        (0.0, 4.0),
        (1.0, 2.5),
      ],
      &[[0, 1], [1, 2], [2, 3], [3, 0], [0, 2]],
      &[1, 1, 1, 1, 7],
      &[],
    );
    let mut data = coord_data(&mesh);
    let before = mesh.num_constraints();
    let outcome = refine(
      &mut mesh,
      &mut data,
      &regions,
      RefineParams {
        conforming: true,
        ..RefineParams::default()
      },
    );
    assert!(outcome.complete);
    assert!(mesh.num_constraints() > before);
    assert!(all_segments_gabriel(&mesh));
    // The diagonal split at its midpoint; both halves keep its marker.
    let mid = mesh
      .vertices
      .iter()
      .position(|p| *p == Point::new(2.0, 2.0))
      .map(VertIdx)
      .unwrap();
    assert_eq!(data.markers[mid.0], 7);
    assert!((data.attributes[mid.0][0] - 2.0).abs() < 1e-12);
    let halves: Vec<_> = mesh.constraints().filter(|&(_, m)| m == 7).collect();
    assert!(halves.len() >= 2);
  }

  #[test]
  fn region_cap_applies_within_region() {
    let seeds = [RegionSeed {
      point: Point::new(1.5, 1.0),
      attribute: 10.0,
      max_area: Some(0.25),
    }];
    let (mut mesh, regions) = cdt(
      &[
        (0.0, 0.0),
        (6.0, 0.0),
        (6.0, 2.0),
        (0.0, 2.0),
        (3.0, 0.0),
        (3.0, 2.0),
      ],
      &[[0, 4], [4, 1], [1, 2], [2, 5], [5, 3], [3, 0], [4, 5]],
      &[1, 1, 1, 1, 1, 1, 1],
      &seeds,
    );
    assert_eq!(regions.len(), 2);
    let mut data = boundary_marked_data(&mesh);
    let outcome = refine(&mut mesh, &mut data, &regions, RefineParams::default());
    assert!(outcome.complete);
    assert!(outcome.steiner > 0);
    let mut coarse_right = false;
    for idx in 0..mesh.triangles.len() {
      let t = TriIdx(idx);
      if mesh.tag(t) == 1 {
        assert!(tri_area(&mesh, t) <= 0.25);
      } else {
        coarse_right |= tri_area(&mesh, t) > 0.25;
      }
    }
    assert!(coarse_right, "the unseeded chamber should stay coarse");
  }

  #[test]
  fn shell_split_lands_on_power_of_two() {
    let pa = Point::new(0.0, 0.0);
    let pb = Point::new(5.0, 0.0);
    let (p, frac) = split_point(&pa, &pb, true, false);
    assert_eq!(p, Point::new(2.0, 0.0));
    assert!((frac - 0.4).abs() < 1e-12);
    let (p, frac) = split_point(&pa, &pb, false, true);
    assert_eq!(p, Point::new(3.0, 0.0));
    assert!((frac - 0.6).abs() < 1e-12);
    let (p, frac) = split_point(&pa, &pb, true, true);
    assert_eq!(p, Point::new(2.5, 0.0));
    assert_eq!(frac, 0.5);
  }
}
