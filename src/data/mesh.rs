use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::data::Point;
use crate::predicates::{self, Orientation};
use crate::Error;

// Index conventions, used throughout the engine:
//
//   * triangle vertices are stored in counterclockwise order;
//   * edge `s` of a triangle spans `vert(s.cw())` -> `vert(s)`, so it is the
//     edge opposite vertex `s.ccw()`;
//   * `neighbors[s]` is the triangle across edge `s`, `None` on the hull.

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct TriIdx(pub usize);
impl std::fmt::Debug for TriIdx {
  fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(fmt, "t{}", self.0)
  }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct VertIdx(pub usize);
impl std::fmt::Debug for VertIdx {
  fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(fmt, "v{}", self.0)
  }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct SubIdx(pub usize);
impl std::fmt::Debug for SubIdx {
  fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(fmt, "s{}", self.0)
  }
}

impl SubIdx {
  pub fn ccw(self) -> Self {
    Self((self.0 + 1) % 3)
  }
  pub fn cw(self) -> Self {
    Self((self.0 + 2) % 3)
  }
}

/// One edge of one triangle.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct Edge {
  pub tri: TriIdx,
  pub sub: SubIdx,
}

impl Edge {
  pub fn new(tri: TriIdx, sub: SubIdx) -> Self {
    Self { tri, sub }
  }
}

/// An undirected edge identified by its endpoint vertices.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Hash)]
pub struct IndexEdge {
  pub min: VertIdx,
  pub max: VertIdx,
}

impl IndexEdge {
  pub fn new(a: VertIdx, b: VertIdx) -> IndexEdge {
    IndexEdge {
      min: std::cmp::min(a, b),
      max: std::cmp::max(a, b),
    }
  }
}

/// Triangle representation.
#[derive(Clone, PartialEq, Eq)]
pub struct Triangle {
  /// Vertex indices, in counterclockwise order.
  pub vertices: [VertIdx; 3],
  /// Neighbor triangle across each edge, `None` on the hull.
  pub neighbors: [Option<TriIdx>; 3],
}

impl std::fmt::Debug for Triangle {
  fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(fmt, "Tri{{v=(")?;
    for (idx, v) in self.vertices.iter().enumerate() {
      let prefix = if idx == 0 { "" } else { ", " };
      write!(fmt, "{}{}", prefix, v.0)?;
    }
    write!(fmt, "), n=(")?;
    for (idx, n) in self.neighbors.iter().enumerate() {
      let prefix = if idx == 0 { "" } else { ", " };
      match n {
        Some(idx) => write!(fmt, "{}{}", prefix, idx.0)?,
        None => write!(fmt, "{}_", prefix)?,
      }
    }
    write!(fmt, ")}}")
  }
}

impl Triangle {
  pub fn vert(&self, idx: SubIdx) -> VertIdx {
    self.vertices[idx.0]
  }

  pub fn neighbor(&self, idx: SubIdx) -> Option<TriIdx> {
    self.neighbors[idx.0]
  }

  fn neighbor_mut(&mut self, idx: SubIdx) -> &mut Option<TriIdx> {
    &mut self.neighbors[idx.0]
  }

  fn update_neighbor(&mut self, idx_from: TriIdx, idx_to: Option<TriIdx>) -> bool {
    for i in 0..3 {
      if self.neighbors[i] == Some(idx_from) {
        self.neighbors[i] = idx_to;
        return true;
      }
    }
    false
  }

  pub fn vertex_idx(&self, v_idx: VertIdx) -> Option<SubIdx> {
    self.vertices.iter().position(|p| *p == v_idx).map(SubIdx)
  }

  pub fn neighbor_idx(&self, idx: TriIdx) -> Option<SubIdx> {
    self
      .neighbors
      .iter()
      .position(|p| *p == Some(idx))
      .map(SubIdx)
  }
}

/// Location of a point relative to the mesh.
#[derive(Debug, PartialEq, Eq)]
pub enum MeshLocation {
  /// Strictly inside the triangle.
  InTriangle(TriIdx),
  /// In the interior of an edge.
  OnEdge(Edge),
  /// Coincident with an existing vertex.
  OnVertex(VertIdx),
  /// Beyond a hull edge.
  Outside(Edge),
}

/// Result of a point-location walk that refuses to cross fixed edges.
#[derive(Debug, PartialEq, Eq)]
pub enum Walk {
  Found(MeshLocation),
  /// The walk would have to cross this constrained or hull edge.
  Blocked(Edge),
}

/// Result of forcing a segment into the mesh, one corridor at a time.
#[derive(Debug)]
pub enum SegmentWalk {
  /// The edge already exists.
  AlreadyEdge,
  /// The segment passes through this vertex; the corridor covers the
  /// sub-segment up to it.
  Corridor(Corridor),
}

/// The triangles crossed by one straight sub-segment, together with the two
/// contour polylines bounding them.
#[derive(Debug)]
pub struct Corridor {
  /// Last vertex of the sub-segment: the target vertex, or a vertex the
  /// segment passes through.
  pub end: VertIdx,
  triangles: Vec<TriIdx>,
  /// Contour edges left of the walk direction, in walk order.
  left: Vec<Edge>,
  /// Contour edges right of the walk direction, in walk order.
  right: Vec<Edge>,
}

struct CavityVertex {
  vert: VertIdx,
  /// Mirror of the contour edge ending at `vert`, seen from outside the
  /// cavity. `None` when the contour edge lies on the hull.
  outer: Option<Edge>,
}

/// A mutable triangulation: vertices plus CCW triangles with adjacency.
///
/// The first `supers` vertices (0 or 3) are synthetic bounding vertices that
/// never appear in final output. Constrained edges are tracked by vertex
/// pair so they survive flips and carry their boundary marker through
/// splits.
#[derive(Debug, Clone)]
pub struct TriMesh {
  pub vertices: Vec<Point>,
  pub triangles: Vec<Triangle>,
  supers: usize,
  vertex_tri: Vec<Option<TriIdx>>,
  constraints: HashMap<IndexEdge, i32>,
  /// Region tag per triangle, inherited across splits. Tag 0 means
  /// untagged; carving assigns others.
  tags: Vec<u32>,
  rng: SmallRng,
}

const WALK_SEED: u64 = 0x5eed_1e55;

impl TriMesh {
  /// Create a mesh consisting of a single bounding triangle. `p0`, `p1`,
  /// `p2` must be in counterclockwise order; they become the three super
  /// vertices.
  pub fn bootstrap(p0: Point, p1: Point, p2: Point) -> TriMesh {
    debug_assert!(Orientation::new(&p0, &p1, &p2).is_ccw());
    let t0 = TriIdx(0);
    TriMesh {
      vertices: vec![p0, p1, p2],
      triangles: vec![Triangle {
        vertices: [VertIdx(0), VertIdx(1), VertIdx(2)],
        neighbors: [None, None, None],
      }],
      supers: 3,
      vertex_tri: vec![Some(t0); 3],
      constraints: HashMap::new(),
      tags: vec![0],
      rng: SmallRng::seed_from_u64(WALK_SEED),
    }
  }

  /// Rebuild a mesh from an existing triangulation (refine mode). The
  /// triangles must be CCW and consistent; adjacency is recovered from
  /// shared vertex pairs. Hull edges of the reconstruction are implicitly
  /// constrained with marker 1.
  pub fn from_triangles(vertices: Vec<Point>, tris: &[[usize; 3]]) -> Result<TriMesh, Error> {
    let mut mesh = TriMesh {
      vertex_tri: vec![None; vertices.len()],
      vertices,
      triangles: Vec::with_capacity(tris.len()),
      supers: 0,
      constraints: HashMap::new(),
      tags: vec![0; tris.len()],
      rng: SmallRng::seed_from_u64(WALK_SEED),
    };

    let mut edge_owner: HashMap<IndexEdge, Edge> = HashMap::new();
    for (idx, tri) in tris.iter().enumerate() {
      let idx = TriIdx(idx);
      let vertices = array_init::array_init(|i| VertIdx(tri[i]));
      mesh.triangles.push(Triangle {
        vertices,
        neighbors: [None, None, None],
      });
      mesh.note_incidence(idx);
      for s in 0..3 {
        let s = SubIdx(s);
        let key = IndexEdge::new(vertices[s.cw().0], vertices[s.0]);
        match edge_owner.insert(key, Edge::new(idx, s)) {
          None => (),
          Some(other) => {
            if mesh.tri(other.tri).neighbor(other.sub).is_some() {
              // Three triangles on one edge.
              return Err(Error::InconsistentMesh { triangle: idx.0 });
            }
            *mesh.tri_mut(idx).neighbor_mut(s) = Some(other.tri);
            *mesh.tri_mut(other.tri).neighbor_mut(other.sub) = Some(idx);
          }
        }
      }
    }

    // The boundary of an existing mesh is fixed: refinement must not walk
    // or flip across it.
    for (key, edge) in edge_owner {
      if mesh.tri(edge.tri).neighbor(edge.sub).is_none() {
        mesh.constraints.insert(key, 1);
      }
    }

    mesh.check_invariant("from_triangles");
    Ok(mesh)
  }

  pub fn tri(&self, idx: TriIdx) -> &Triangle {
    &self.triangles[idx.0]
  }

  fn tri_mut(&mut self, idx: TriIdx) -> &mut Triangle {
    &mut self.triangles[idx.0]
  }

  pub fn vert(&self, idx: VertIdx) -> &Point {
    &self.vertices[idx.0]
  }

  pub fn tri_vert(&self, tri_idx: TriIdx, idx: SubIdx) -> &Point {
    self.vert(self.tri(tri_idx).vert(idx))
  }

  pub fn num_super_vertices(&self) -> usize {
    self.supers
  }

  pub fn is_super(&self, v: VertIdx) -> bool {
    v.0 < self.supers
  }

  /// True if any corner of the triangle is a super vertex.
  pub fn is_super_tri(&self, idx: TriIdx) -> bool {
    let [v0, v1, v2] = self.tri(idx).vertices;
    self.is_super(v0) || self.is_super(v1) || self.is_super(v2)
  }

  pub fn add_vert(&mut self, p: Point) -> VertIdx {
    let idx = self.vertices.len();
    self.vertices.push(p);
    self.vertex_tri.push(None);
    VertIdx(idx)
  }

  fn add_tri(&mut self) -> TriIdx {
    let v = VertIdx(0);
    let idx = self.triangles.len();
    self.triangles.push(Triangle {
      vertices: [v, v, v],
      neighbors: [None, None, None],
    });
    self.tags.push(0);
    TriIdx(idx)
  }

  pub fn tag(&self, idx: TriIdx) -> u32 {
    self.tags[idx.0]
  }

  pub fn set_tag(&mut self, idx: TriIdx, tag: u32) {
    self.tags[idx.0] = tag;
  }

  fn set_tri(&mut self, idx: TriIdx, t: Triangle) {
    self.triangles[idx.0] = t;
    self.note_incidence(idx);
  }

  fn note_incidence(&mut self, idx: TriIdx) {
    for v in self.triangles[idx.0].vertices {
      self.vertex_tri[v.0] = Some(idx);
    }
  }

  /// Some triangle incident to `v`.
  pub fn vertex_tri(&self, v: VertIdx) -> Option<TriIdx> {
    self.vertex_tri[v.0]
  }

  /// The same undirected edge seen from the neighboring triangle.
  pub fn mirror(&self, edge: &Edge) -> Option<Edge> {
    let t = self.tri(edge.tri);
    let idx_neighbor = t.neighbor(edge.sub)?;
    let t_neighbor = self.tri(idx_neighbor);
    match t_neighbor.neighbor_idx(edge.tri) {
      Some(sub) => Some(Edge::new(idx_neighbor, sub)),
      None => panic!(
        "adjacency violated: {:?}={:?}, {:?}={:?}",
        edge.tri, t, idx_neighbor, t_neighbor
      ),
    }
  }

  pub fn edge_verts(&self, edge: &Edge) -> (VertIdx, VertIdx) {
    let t = self.tri(edge.tri);
    (t.vert(edge.sub.cw()), t.vert(edge.sub))
  }

  /// Find an edge joining `a` and `b` by rotating around `a`.
  pub fn find_edge(&self, a: VertIdx, b: VertIdx) -> Option<Edge> {
    let start = self.vertex_tri(a)?;
    // Rotate counterclockwise around `a`; fall back to the other direction
    // when the rotation runs into the hull.
    let mut cur = start;
    loop {
      let s = self.tri(cur).vertex_idx(a)?;
      if self.tri(cur).vert(s.ccw()) == b {
        // Edge a -> b spans subs (a, b) = (s, s.ccw()).
        return Some(Edge::new(cur, s.ccw()));
      }
      match self.tri(cur).neighbor(s.ccw()) {
        Some(next) if next == start => return None,
        Some(next) => cur = next,
        None => break,
      }
    }
    let mut cur = start;
    loop {
      let s = self.tri(cur).vertex_idx(a)?;
      if self.tri(cur).vert(s.cw()) == b {
        return Some(Edge::new(cur, s));
      }
      match self.tri(cur).neighbor(s) {
        Some(next) if next == start => return None,
        Some(next) => cur = next,
        None => return None,
      }
    }
  }

  /// All triangles incident to `v`, in no particular order.
  pub fn triangles_around(&self, v: VertIdx) -> Vec<TriIdx> {
    let start = match self.vertex_tri(v) {
      Some(t) => t,
      None => return Vec::new(),
    };
    let mut out = vec![start];
    let mut cur = start;
    loop {
      let s = match self.tri(cur).vertex_idx(v) {
        Some(s) => s,
        None => panic!("stale incidence: {:?} not in {:?}", v, cur),
      };
      match self.tri(cur).neighbor(s.ccw()) {
        Some(next) if next == start => return out,
        Some(next) => {
          out.push(next);
          cur = next;
        }
        None => break,
      }
    }
    // The counterclockwise sweep ran into the hull. Pick up the remaining
    // fan by rotating the other way from the start.
    let mut cur = start;
    loop {
      let s = match self.tri(cur).vertex_idx(v) {
        Some(s) => s,
        None => panic!("stale incidence: {:?} not in {:?}", v, cur),
      };
      match self.tri(cur).neighbor(s) {
        Some(next) => {
          out.push(next);
          cur = next;
        }
        None => return out,
      }
    }
  }

  // Constraint bookkeeping

  pub fn mark_constraint(&mut self, a: VertIdx, b: VertIdx, marker: i32) {
    self.constraints.insert(IndexEdge::new(a, b), marker);
  }

  pub fn is_constrained(&self, a: VertIdx, b: VertIdx) -> bool {
    self.constraints.contains_key(&IndexEdge::new(a, b))
  }

  pub fn constraint_marker(&self, a: VertIdx, b: VertIdx) -> Option<i32> {
    self.constraints.get(&IndexEdge::new(a, b)).copied()
  }

  pub fn unmark_constraint(&mut self, a: VertIdx, b: VertIdx) -> Option<i32> {
    self.constraints.remove(&IndexEdge::new(a, b))
  }

  pub fn constraints(&self) -> impl Iterator<Item = (IndexEdge, i32)> + '_ {
    self.constraints.iter().map(|(k, v)| (*k, *v))
  }

  pub fn num_constraints(&self) -> usize {
    self.constraints.len()
  }

  fn split_constraint(&mut self, a: VertIdx, b: VertIdx, mid: VertIdx) -> Option<i32> {
    let marker = self.constraints.remove(&IndexEdge::new(a, b))?;
    self.constraints.insert(IndexEdge::new(a, mid), marker);
    self.constraints.insert(IndexEdge::new(mid, b), marker);
    Some(marker)
  }

  // Point location

  /// Classify `p` against a single triangle. When `p` lies beyond more than
  /// one edge, the exit edge is chosen at random; that randomness is what
  /// guarantees the walk in [`TriMesh::locate`] terminates.
  fn classify(&mut self, start: TriIdx, p: &Point) -> MeshLocation {
    use MeshLocation::*;
    use Orientation::*;

    let p0 = *self.tri_vert(start, SubIdx(0));
    let p1 = *self.tri_vert(start, SubIdx(1));
    let p2 = *self.tri_vert(start, SubIdx(2));

    let d0 = Orientation::new(&p0, &p1, p);
    let d1 = Orientation::new(&p1, &p2, p);
    let d2 = Orientation::new(&p2, &p0, p);

    let mut exits = [SubIdx(0); 3];
    let mut num_exits = 0;
    for (i, d) in [d0, d1, d2].iter().enumerate() {
      if *d == ClockWise {
        exits[num_exits] = SubIdx((i + 1) % 3);
        num_exits += 1;
      }
    }
    if num_exits > 0 {
      let pick = if num_exits == 1 {
        0
      } else {
        self.rng.gen_range(0..num_exits)
      };
      return Outside(Edge::new(start, exits[pick]));
    }

    match (d0, d1, d2) {
      (CounterClockWise, CounterClockWise, CounterClockWise) => InTriangle(start),
      (CoLinear, CounterClockWise, CounterClockWise) => OnEdge(Edge::new(start, SubIdx(1))),
      (CounterClockWise, CoLinear, CounterClockWise) => OnEdge(Edge::new(start, SubIdx(2))),
      (CounterClockWise, CounterClockWise, CoLinear) => OnEdge(Edge::new(start, SubIdx(0))),
      (CoLinear, CoLinear, _) => OnVertex(self.tri(start).vert(SubIdx(1))),
      (_, CoLinear, CoLinear) => OnVertex(self.tri(start).vert(SubIdx(2))),
      (CoLinear, _, CoLinear) => OnVertex(self.tri(start).vert(SubIdx(0))),
      _ => unreachable!(),
    }
  }

  /// Walk from `start` toward `p`, refusing to cross constrained edges and
  /// hull edges.
  pub fn locate(&mut self, start: TriIdx, p: &Point) -> Walk {
    self.locate_impl(start, p, false)
  }

  /// Walk from `start` toward `p`, crossing constrained edges freely.
  /// Blocks only on the hull.
  pub fn locate_any(&mut self, start: TriIdx, p: &Point) -> Walk {
    self.locate_impl(start, p, true)
  }

  fn locate_impl(&mut self, start: TriIdx, p: &Point, cross_constrained: bool) -> Walk {
    let mut cur = start;
    // The randomized exit choice makes cycles vanishingly unlikely, but a
    // corrupt structure would walk forever. Budget generously.
    let mut fuel = 16 * self.triangles.len() + 64;

    loop {
      match self.classify(cur, p) {
        MeshLocation::Outside(e) => {
          if !cross_constrained {
            let (a, b) = self.edge_verts(&e);
            if self.is_constrained(a, b) {
              return Walk::Blocked(e);
            }
          }
          match self.tri(e.tri).neighbor(e.sub) {
            Some(next) => cur = next,
            None => return Walk::Blocked(e),
          }
        }
        loc => return Walk::Found(loc),
      }
      fuel -= 1;
      if fuel == 0 {
        panic!("point location walk did not terminate");
      }
    }
  }

  // Insertion

  /// Insert the staged vertex `v` into the triangulation, legalizing
  /// locally afterwards. Returns the constraint marker when the insertion
  /// split a constrained edge.
  ///
  /// # Panics
  ///
  /// Panics if `v` lies outside the triangulated region.
  pub fn insert_vertex(&mut self, v: VertIdx, hint: Option<TriIdx>) -> Insertion {
    let p = *self.vert(v);
    let start = hint.unwrap_or(TriIdx(0));
    match self.locate(start, &p) {
      Walk::Found(loc) => self.insert_at(v, loc),
      Walk::Blocked(e) => panic!("vertex {:?} outside the triangulated region: {:?}", v, e),
    }
  }

  /// Insert the staged vertex `v` at a known location.
  pub fn insert_at(&mut self, v: VertIdx, loc: MeshLocation) -> Insertion {
    match loc {
      MeshLocation::OnVertex(u) => Insertion::Duplicate(u),
      MeshLocation::InTriangle(t) => {
        self.insert_in_triangle(v, t);
        Insertion::Inserted { split_marker: None }
      }
      MeshLocation::OnEdge(e) => {
        let split_marker = self.insert_on_edge(v, e);
        Insertion::Inserted { split_marker }
      }
      MeshLocation::Outside(e) => {
        panic!("vertex {:?} outside the triangulated region: {:?}", v, e)
      }
    }
  }

  fn insert_in_triangle(&mut self, idx_v: VertIdx, idx_t: TriIdx) {
    let t = self.tri(idx_t).clone();
    let tag = self.tag(idx_t);

    let idx_t0 = idx_t;
    let idx_t1 = self.add_tri();
    let idx_t2 = self.add_tri();
    self.set_tag(idx_t1, tag);
    self.set_tag(idx_t2, tag);

    let [v0, v1, v2] = t.vertices;
    let [n0, n1, n2] = t.neighbors;

    self.set_tri(
      idx_t0,
      Triangle {
        vertices: [idx_v, v0, v1],
        neighbors: [Some(idx_t1), Some(idx_t2), n1],
      },
    );
    self.set_tri(
      idx_t1,
      Triangle {
        vertices: [idx_v, v1, v2],
        neighbors: [Some(idx_t2), Some(idx_t0), n2],
      },
    );
    self.set_tri(
      idx_t2,
      Triangle {
        vertices: [idx_v, v2, v0],
        neighbors: [Some(idx_t0), Some(idx_t1), n0],
      },
    );

    if let Some(idx_neighbor) = n2 {
      self.tri_mut(idx_neighbor).update_neighbor(idx_t0, Some(idx_t1));
    }
    if let Some(idx_neighbor) = n0 {
      self.tri_mut(idx_neighbor).update_neighbor(idx_t0, Some(idx_t2));
    }

    self.check_invariant_tri(idx_t0, "insert_in_triangle(t0)");
    self.check_invariant_tri(idx_t1, "insert_in_triangle(t1)");
    self.check_invariant_tri(idx_t2, "insert_in_triangle(t2)");

    self.maybe_swap(idx_t0);
    self.maybe_swap(idx_t1);
    self.maybe_swap(idx_t2);
  }

  /// Split the edge `e` at the staged vertex `idx_v`. Handles hull edges
  /// (no twin triangle) and keeps the constraint map consistent when the
  /// split edge is a constrained segment.
  fn insert_on_edge(&mut self, idx_v: VertIdx, e: Edge) -> Option<i32> {
    let idx_t0 = e.tri;
    let t0 = self.tri(idx_t0).clone();
    let sub = e.sub;

    let idx_t1 = t0.neighbor(sub);
    let idx_t2 = self.add_tri();
    self.set_tag(idx_t2, self.tags[idx_t0.0]);
    let idx_t3 = match idx_t1 {
      Some(idx_t1) => {
        let idx = self.add_tri();
        self.set_tag(idx, self.tags[idx_t1.0]);
        Some(idx)
      }
      None => None,
    };

    let v0 = t0.vert(sub);
    let v1 = t0.vert(sub.ccw());
    let v2 = t0.vert(sub.cw());

    let split_marker = self.split_constraint(v2, v0, idx_v);

    self.set_tri(
      idx_t0,
      Triangle {
        vertices: [idx_v, v0, v1],
        neighbors: [Some(idx_t2), idx_t1, t0.neighbor(sub.ccw())],
      },
    );

    let n = t0.neighbor(sub.cw());
    self.set_tri(
      idx_t2,
      Triangle {
        vertices: [idx_v, v1, v2],
        neighbors: [idx_t3, Some(idx_t0), n],
      },
    );
    if let Some(n) = n {
      self.tri_mut(n).update_neighbor(idx_t0, Some(idx_t2));
    }

    if let Some(idx_t1) = idx_t1 {
      let idx_t3 = idx_t3.unwrap();

      let t1 = self.tri(idx_t1).clone();
      let sub1 = match t1.neighbor_idx(idx_t0) {
        Some(sub1) => sub1,
        None => panic!("adjacency violated at {:?} / {:?}", idx_t0, idx_t1),
      };

      let w0 = t1.vert(sub1);
      let w1 = t1.vert(sub1.ccw());
      let w2 = t1.vert(sub1.cw());

      self.set_tri(
        idx_t1,
        Triangle {
          vertices: [idx_v, w1, w2],
          neighbors: [Some(idx_t0), Some(idx_t3), t1.neighbor(sub1.cw())],
        },
      );

      let n = t1.neighbor(sub1.ccw());
      self.set_tri(
        idx_t3,
        Triangle {
          vertices: [idx_v, w0, w1],
          neighbors: [Some(idx_t1), Some(idx_t2), n],
        },
      );
      if let Some(n) = n {
        self.tri_mut(n).update_neighbor(idx_t1, Some(idx_t3));
      }
    }

    self.check_invariant_tri(idx_t0, "insert_on_edge(t0)");
    self.check_invariant_tri(idx_t2, "insert_on_edge(t2)");
    if let Some(idx_t1) = idx_t1 {
      self.check_invariant_tri(idx_t1, "insert_on_edge(t1)");
    }
    if let Some(idx_t3) = idx_t3 {
      self.check_invariant_tri(idx_t3, "insert_on_edge(t3)");
    }

    self.maybe_swap(idx_t0);
    self.maybe_swap(idx_t2);
    if let Some(idx) = idx_t1 {
      self.maybe_swap(idx);
    }
    if let Some(idx) = idx_t3 {
      self.maybe_swap(idx);
    }

    split_marker
  }

  /// Split the edge `e` at point `p`, returning the new vertex. `p` must
  /// lie in the interior of `e`.
  pub fn split_edge(&mut self, e: Edge, p: Point) -> (VertIdx, Option<i32>) {
    let v = self.add_vert(p);
    let marker = self.insert_on_edge(v, e);
    (v, marker)
  }

  // Legalization

  /// Restore the local Delaunay property across edge 2 of `idx0`,
  /// recursively fixing any edges invalidated by the flip. Constrained
  /// edges are never flipped. Flip quads touching a super vertex are
  /// decided by vertex index: the edge yields whenever its lowest endpoint
  /// is more synthetic than the lowest apex, which reproduces the Delaunay
  /// triangulation the bounding vertices would produce at true infinity.
  fn maybe_swap(&mut self, idx0: TriIdx) -> bool {
    use Orientation::*;

    let t0_t1_idx = SubIdx(2);
    let idx1 = match self.tri(idx0).neighbor(t0_t1_idx) {
      Some(idx) => idx,
      None => return false,
    };

    let t0 = self.tri(idx0);
    let t1 = self.tri(idx1);

    let t1_t0_idx = match t1.neighbor_idx(idx0) {
      Some(idx) => idx,
      None => panic!("adjacency violated at {:?} / {:?}", idx0, idx1),
    };

    let v0 = t0.vert(t0_t1_idx);
    let v1 = t0.vert(t0_t1_idx.ccw());
    let v2 = t0.vert(t0_t1_idx.cw());
    let v3 = t1.vert(t1_t0_idx.ccw());

    if self.is_constrained(v0, v2) {
      return false;
    }

    let p0 = *self.vert(v0);
    let p1 = *self.vert(v1);
    let p2 = *self.vert(v2);
    let p3 = *self.vert(v3);

    // The quad must be strictly convex for the flip to be valid geometry.
    let d0 = Orientation::new(&p0, &p2, &p1);
    let d1 = Orientation::new(&p0, &p2, &p3);
    let d2 = Orientation::new(&p1, &p3, &p0);
    let d3 = Orientation::new(&p1, &p3, &p2);

    if d0 == CoLinear || d1 == CoLinear || d2 == CoLinear || d3 == CoLinear {
      return false;
    }
    if d0 == d1 || d2 == d3 {
      return false;
    }

    let any_super =
      self.is_super(v0) || self.is_super(v1) || self.is_super(v2) || self.is_super(v3);
    let should_swap = if any_super {
      v0.min(v2) < v1.min(v3)
    } else {
      predicates::in_circle(&p0, &p1, &p2, &p3)
    };

    if !should_swap {
      return false;
    }

    let n0 = self.tri(idx1).neighbor(t1_t0_idx.cw());
    let n1 = self.tri(idx0).neighbor(t0_t1_idx.ccw());
    let n2 = self.tri(idx0).neighbor(t0_t1_idx.cw());
    let n3 = self.tri(idx1).neighbor(t1_t0_idx.ccw());

    self.set_tri(
      idx0,
      Triangle {
        vertices: [v1, v2, v3],
        neighbors: [Some(idx1), n2, n3],
      },
    );
    self.set_tri(
      idx1,
      Triangle {
        vertices: [v1, v3, v0],
        neighbors: [n1, Some(idx0), n0],
      },
    );

    // n0 and n2 keep their owner; n1 and n3 change sides.
    if let Some(idx) = n1 {
      if !self.tri_mut(idx).update_neighbor(idx0, Some(idx1)) {
        panic!("adjacency violated at {:?} / {:?}", idx0, idx);
      }
    }
    if let Some(idx) = n3 {
      if !self.tri_mut(idx).update_neighbor(idx1, Some(idx0)) {
        panic!("adjacency violated at {:?} / {:?}", idx1, idx);
      }
    }

    self.check_invariant_tri(idx0, "post-swap idx0");
    self.check_invariant_tri(idx1, "post-swap idx1");

    self.maybe_swap(idx0);
    self.maybe_swap(idx1);

    true
  }

  // Segment forcing

  /// Walk the corridor of triangles crossed by the straight segment
  /// `from -> to`. The walk stops early when the segment passes exactly
  /// through a vertex; callers continue from there.
  pub fn segment_walk(&self, from: VertIdx, to: VertIdx) -> Result<SegmentWalk, Error> {
    use Orientation::*;

    let p_start = *self.vert(from);
    let p_end = *self.vert(to);

    let (mut tri, sub) = match self.wedge_toward(from, to)? {
      WedgeHit::Adjacent => return Ok(SegmentWalk::AlreadyEdge),
      WedgeHit::Through(v) => {
        return Ok(SegmentWalk::Corridor(Corridor {
          end: v,
          triangles: Vec::new(),
          left: Vec::new(),
          right: Vec::new(),
        }))
      }
      WedgeHit::Wedge(tri, sub) => (tri, sub),
    };

    let mut corridor = Corridor {
      end: to,
      triangles: vec![tri],
      left: vec![Edge::new(tri, sub)],
      right: vec![Edge::new(tri, sub.ccw())],
    };

    // Exit edge of the wedge triangle: the one opposite `from`.
    let mut exit = Edge::new(tri, sub.cw());

    loop {
      let (a, b) = self.edge_verts(&exit);
      if self.is_constrained(a, b) {
        return Err(Error::SegmentsCross {
          first: (from.0 - self.supers, to.0 - self.supers),
          second: (a.0 - self.supers, b.0 - self.supers),
        });
      }
      let entry = match self.mirror(&exit) {
        Some(e) => e,
        None => panic!("segment walk left the triangulated region"),
      };
      tri = entry.tri;
      corridor.triangles.push(tri);

      let sub = entry.sub;
      let far = self.tri(tri).vert(sub.ccw());
      let p_far = *self.vert(far);

      let d_far = Orientation::new(&p_start, &p_end, &p_far);
      if d_far == CoLinear {
        // Hit `to`, or a vertex the segment passes through.
        corridor.left.push(Edge::new(tri, sub.cw()));
        corridor.right.push(Edge::new(tri, sub.ccw()));
        corridor.end = far;
        return Ok(SegmentWalk::Corridor(corridor));
      }

      let p_entry_head = *self.tri_vert(tri, sub);
      let d_head = Orientation::new(&p_start, &p_end, &p_entry_head);
      if d_far == d_head.reverse() {
        // Far vertex is on the left; exit between it and the entry head.
        corridor.left.push(Edge::new(tri, sub.cw()));
        exit = Edge::new(tri, sub.ccw());
      } else {
        corridor.right.push(Edge::new(tri, sub.ccw()));
        exit = Edge::new(tri, sub.cw());
      }
    }
  }

  /// Re-triangulate the corridor so that `from -> corridor.end` becomes an
  /// edge. The corridor's triangle slots are reused; the caller marks the
  /// new edge as constrained if needed.
  pub fn excavate(&mut self, from: VertIdx, corridor: Corridor) {
    if corridor.triangles.is_empty() {
      return;
    }
    let to = corridor.end;
    let mut pool = corridor.triangles;

    let right_slice = self.cavity_polyline(from, &corridor.right, false);
    let left_slice = self.cavity_polyline(to, &corridor.left, true);

    let root_r = self.fill_cavity(None, &right_slice, &mut pool);
    let root_l = self.fill_cavity(None, &left_slice, &mut pool);
    debug_assert!(pool.is_empty());

    match (root_r, root_l) {
      (Some(r), Some(l)) => {
        *self.tri_mut(r).neighbor_mut(SubIdx(0)) = Some(l);
        *self.tri_mut(l).neighbor_mut(SubIdx(0)) = Some(r);
      }
      _ => panic!("corridor produced an empty cavity"),
    }

    self.check_invariant("post-excavate");
  }

  /// Boundary polyline of one side of a corridor, as cavity vertices with
  /// their outside mirrors. Right contour edges run head-forward, left ones
  /// head-backward, so walking the left contour in reverse yields the same
  /// "push each edge's head" shape.
  fn cavity_polyline(&self, start: VertIdx, contour: &[Edge], reversed: bool) -> Vec<CavityVertex> {
    let mut slice = Vec::with_capacity(contour.len() + 1);
    slice.push(CavityVertex {
      vert: start,
      outer: None,
    });
    let mut add = |edge: &Edge| {
      slice.push(CavityVertex {
        vert: self.tri(edge.tri).vert(edge.sub),
        outer: self.mirror(edge),
      });
    };
    if reversed {
      for edge in contour.iter().rev() {
        add(edge);
      }
    } else {
      for edge in contour {
        add(edge);
      }
    }
    slice
  }

  /// Fan the cavity polyline into triangles drawn from `pool`, picking each
  /// apex with the in-circle test so the result is locally Delaunay with
  /// respect to the cavity vertices.
  fn fill_cavity(
    &mut self,
    parent: Option<Edge>,
    slice: &[CavityVertex],
    pool: &mut Vec<TriIdx>,
  ) -> Option<TriIdx> {
    debug_assert!(slice.len() > 1);
    if slice.len() == 2 {
      // A single original contour edge: stitch the parent directly to the
      // untouched outside triangle.
      let outer = slice[1].outer;
      match parent {
        Some(p) => {
          *self.tri_mut(p.tri).neighbor_mut(p.sub) = outer.map(|e| e.tri);
          if let Some(outer) = outer {
            *self.tri_mut(outer.tri).neighbor_mut(outer.sub) = Some(p.tri);
          }
        }
        None => debug_assert!(false, "cavity base cannot be a contour edge"),
      }
      return outer.map(|e| e.tri);
    }

    let last = slice.len() - 1;
    let v_start = slice[0].vert;
    let v_end = slice[last].vert;
    let p_start = *self.vert(v_start);
    let p_end = *self.vert(v_end);

    let mut i_mid = 1;
    for i in 2..last {
      let cur = *self.vert(slice[i_mid].vert);
      let next = *self.vert(slice[i].vert);
      if predicates::in_circle(&p_start, &cur, &p_end, &next) {
        i_mid = i;
      }
    }
    let v_mid = slice[i_mid].vert;

    let idx_self = match pool.pop() {
      Some(idx) => idx,
      None => panic!("cavity re-triangulation exhausted its triangle pool"),
    };

    let idx_t0 = self.fill_cavity(
      Some(Edge::new(idx_self, SubIdx(1))),
      &slice[..i_mid + 1],
      pool,
    );
    let idx_t1 = self.fill_cavity(Some(Edge::new(idx_self, SubIdx(2))), &slice[i_mid..], pool);

    self.set_tri(
      idx_self,
      Triangle {
        vertices: [v_start, v_mid, v_end],
        neighbors: [parent.map(|e| e.tri), idx_t0, idx_t1],
      },
    );

    Some(idx_self)
  }

  // Rotation around a vertex looking for the wedge containing a direction.

  fn wedge_toward(&self, from: VertIdx, to: VertIdx) -> Result<WedgeHit, Error> {
    use Orientation::*;

    let p_from = *self.vert(from);
    let p_to = *self.vert(to);
    let start = match self.vertex_tri(from) {
      Some(t) => t,
      None => panic!("{:?} is not part of the triangulation", from),
    };

    let mut cur = start;
    let mut fuel = self.triangles.len() + 1;
    loop {
      let t = self.tri(cur);
      let s = match t.vertex_idx(from) {
        Some(s) => s,
        None => panic!("stale incidence for {:?}", from),
      };
      let a = t.vert(s.ccw());
      let b = t.vert(s.cw());
      if a == to || b == to {
        return Ok(WedgeHit::Adjacent);
      }

      let p_a = *self.vert(a);
      let p_b = *self.vert(b);
      let d_a = Orientation::new(&p_from, &p_a, &p_to);
      let d_b = Orientation::new(&p_from, &p_b, &p_to);

      if d_a == CoLinear && (p_a - p_from).dot(&(p_to - p_from)) > 0.0 {
        return Ok(WedgeHit::Through(a));
      }
      if d_b == CoLinear && (p_b - p_from).dot(&(p_to - p_from)) > 0.0 {
        return Ok(WedgeHit::Through(b));
      }
      // `to` lies inside the wedge iff it is strictly left of from->a and
      // strictly right of from->b.
      if d_a == CounterClockWise && d_b == ClockWise {
        return Ok(WedgeHit::Wedge(cur, s));
      }

      // Rotate counterclockwise around `from`: cross the edge from -> a.
      cur = match t.neighbor(s.ccw()) {
        Some(next) => next,
        None => panic!("segment endpoint on the hull"),
      };
      fuel -= 1;
      if fuel == 0 {
        panic!("wedge search did not terminate around {:?}", from);
      }
    }
  }

  // Carving

  /// Drop every triangle whose flag in `dead` is set, compacting the
  /// triangle array. Vertex indices are untouched.
  pub fn retain_triangles(&mut self, dead: &[bool]) {
    debug_assert_eq!(dead.len(), self.triangles.len());

    let mut remap: Vec<Option<TriIdx>> = Vec::with_capacity(self.triangles.len());
    let mut next = 0;
    for &d in dead {
      if d {
        remap.push(None);
      } else {
        remap.push(Some(TriIdx(next)));
        next += 1;
      }
    }

    let old = std::mem::take(&mut self.triangles);
    let old_tags = std::mem::take(&mut self.tags);
    self.triangles = Vec::with_capacity(next);
    self.tags = Vec::with_capacity(next);
    for (idx, t) in old.into_iter().enumerate() {
      if remap[idx].is_none() {
        continue;
      }
      self.triangles.push(Triangle {
        vertices: t.vertices,
        neighbors: array_init::array_init(|i| t.neighbors[i].and_then(|n| remap[n.0])),
      });
      self.tags.push(old_tags[idx]);
    }

    for slot in self.vertex_tri.iter_mut() {
      *slot = None;
    }
    for idx in 0..self.triangles.len() {
      self.note_incidence(TriIdx(idx));
    }

    self.check_invariant("post-retain");
  }

  // Invariant checking

  #[allow(unused)]
  #[cfg(not(debug_assertions))]
  fn check_invariant_tri(&self, _idx: TriIdx, _msg: &str) {}

  #[cfg(debug_assertions)]
  fn check_invariant_tri(&self, idx: TriIdx, msg: &str) {
    let t = self.tri(idx);
    for i in 0..3 {
      let i = SubIdx(i);

      if let Some(idx_neighbor) = t.neighbor(i) {
        let n = self.tri(idx_neighbor);
        let violated = if let Some(j) = n.neighbor_idx(idx) {
          t.vert(i) != n.vert(j.cw()) || t.vert(i.cw()) != n.vert(j)
        } else {
          true
        };
        if violated {
          panic!(
            "invariant violated: {}, {:?}={:?}, {:?}={:?}",
            msg, idx, t, idx_neighbor, n
          );
        }
      }

      let e = Edge::new(idx, i);
      if let Some(d) = self.mirror(&e) {
        assert_eq!(Some(e), self.mirror(&d));
      }
    }

    let p0 = self.tri_vert(idx, SubIdx(0));
    let p1 = self.tri_vert(idx, SubIdx(1));
    let p2 = self.tri_vert(idx, SubIdx(2));
    if !Orientation::new(p0, p1, p2).is_ccw() {
      panic!("invariant violated: {}, {:?} is not ccw", msg, idx);
    }
  }

  #[allow(unused)]
  #[cfg(not(debug_assertions))]
  pub fn check_invariant(&self, _msg: &str) {}

  #[cfg(debug_assertions)]
  pub fn check_invariant(&self, msg: &str) {
    for idx in 0..self.triangles.len() {
      self.check_invariant_tri(TriIdx(idx), msg);
    }
  }
}

enum WedgeHit {
  /// `from` and `to` are already connected by an edge.
  Adjacent,
  /// The ray exits through another vertex.
  Through(VertIdx),
  /// The ray passes through the interior of this triangle; the sub index is
  /// the position of `from`.
  Wedge(TriIdx, SubIdx),
}

/// Result of a vertex insertion.
#[derive(Debug, PartialEq, Eq)]
pub enum Insertion {
  Inserted {
    /// Marker of the constrained edge the insertion split, if any.
    split_marker: Option<i32>,
  },
  /// The vertex coincides with an existing vertex.
  Duplicate(VertIdx),
}
