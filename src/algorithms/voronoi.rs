//! Voronoi dual of the triangulation.

use crate::data::mesh::{SubIdx, TriIdx, TriMesh};
use crate::data::{Point, Vector};
use crate::predicates;

/// An edge of the Voronoi diagram. Interior triangulation edges dualize to a
/// bounded edge between two circumcenters; boundary edges dualize to a ray
/// leaving `origin` along `direction`.
#[derive(Debug, Clone, PartialEq)]
pub struct VoronoiEdge {
  pub origin: usize,
  /// The circumcenter at the far end, or `None` for an unbounded ray.
  pub target: Option<usize>,
  /// Outward direction of an unbounded ray, unnormalized. Set exactly when
  /// `target` is `None`.
  pub direction: Option<Vector>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoronoiDiagram {
  /// One vertex per triangle: its circumcenter.
  pub vertices: Vec<Point>,
  pub edges: Vec<VoronoiEdge>,
}

/// Dualize the triangulation. Every triangle contributes its circumcenter
/// as a Voronoi vertex and every triangulation edge contributes one Voronoi
/// edge, so the diagram is only a true Voronoi tessellation when the mesh is
/// Delaunay rather than merely constrained Delaunay.
pub fn voronoi(mesh: &TriMesh) -> VoronoiDiagram {
  let mut vertices = Vec::with_capacity(mesh.triangles.len());
  for idx in 0..mesh.triangles.len() {
    let [a, b, c] = mesh.tri(TriIdx(idx)).vertices;
    let pa = mesh.vert(a);
    let pb = mesh.vert(b);
    let pc = mesh.vert(c);
    let cc = match predicates::circumcenter(pa, pb, pc) {
      Some(cc) => cc,
      None => {
        // Only reachable when the cross product of a counterclockwise
        // triangle underflows; the centroid keeps the output well formed.
        tracing::warn!(triangle = idx, "degenerate triangle in voronoi dual");
        Point::new((pa.x + pb.x + pc.x) / 3.0, (pa.y + pb.y + pc.y) / 3.0)
      }
    };
    vertices.push(cc);
  }

  let mut edges = Vec::new();
  for idx in 0..mesh.triangles.len() {
    let t = TriIdx(idx);
    for sub in 0..3 {
      let s = SubIdx(sub);
      match mesh.tri(t).neighbor(s) {
        Some(n) => {
          // Interior duals are emitted once, from the lower-numbered side.
          if t.0 < n.0 {
            edges.push(VoronoiEdge {
              origin: t.0,
              target: Some(n.0),
              direction: None,
            });
          }
        }
        None => {
          let tri = mesh.tri(t);
          let a = mesh.vert(tri.vert(s.cw()));
          let b = mesh.vert(tri.vert(s));
          edges.push(VoronoiEdge {
            origin: t.0,
            target: None,
            direction: Some(predicates::outward_normal(a, b)),
          });
        }
      }
    }
  }
  tracing::debug!(
    vertices = vertices.len(),
    edges = edges.len(),
    "voronoi dual assembled"
  );
  VoronoiDiagram { vertices, edges }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::algorithms::{constrained, delaunay};

  fn carved_square() -> TriMesh {
    let pts = [
      Point::new(0.0, 0.0),
      Point::new(2.0, 0.0),
      Point::new(2.0, 2.0),
      Point::new(0.0, 2.0),
    ];
    let d = delaunay::triangulate(&pts).unwrap();
    let mut mesh = d.mesh;
    let segments = [[0, 1], [1, 2], [2, 3], [3, 0]];
    constrained::insert_segments(&mut mesh, &d.canonical, &segments, &[1; 4]).unwrap();
    constrained::carve(&mut mesh, &[], &[]);
    mesh
  }

  #[test]
  fn square_dual_has_one_interior_edge_and_four_rays() {
    let mesh = carved_square();
    assert_eq!(mesh.triangles.len(), 2);
    let diagram = voronoi(&mesh);

    // Both halves of the square are right triangles whose circumcenter is
    // the center of the hypotenuse.
    assert_eq!(diagram.vertices, vec![Point::new(1.0, 1.0); 2]);

    let interior: Vec<_> = diagram
      .edges
      .iter()
      .filter(|e| e.target.is_some())
      .collect();
    let rays: Vec<_> = diagram
      .edges
      .iter()
      .filter(|e| e.target.is_none())
      .collect();
    assert_eq!(interior.len(), 1);
    assert_eq!(rays.len(), 4);
    for e in &diagram.edges {
      assert!(e.origin < diagram.vertices.len());
      assert_eq!(e.target.is_none(), e.direction.is_some());
    }
    // Every ray leaves the square: moving from its origin along the
    // direction increases the distance to the center.
    for ray in &rays {
      let d = ray.direction.unwrap();
      let o = diagram.vertices[ray.origin];
      let away = (o + d * 1.0) - Point::new(1.0, 1.0);
      let near = o - Point::new(1.0, 1.0);
      assert!(away.dot(&away) > near.dot(&near));
    }
  }

  #[test]
  fn ray_directions_are_orthogonal_to_their_boundary_edges() {
    let mesh = carved_square();
    let diagram = voronoi(&mesh);
    let mut rays = 0;
    for idx in 0..mesh.triangles.len() {
      let t = TriIdx(idx);
      for sub in 0..3 {
        let s = SubIdx(sub);
        if mesh.tri(t).neighbor(s).is_some() {
          continue;
        }
        let a = *mesh.vert(mesh.tri(t).vert(s.cw()));
        let b = *mesh.vert(mesh.tri(t).vert(s));
        let normal = predicates::outward_normal(&a, &b);
        assert_eq!(normal.dot(&(b - a)), 0.0);
        rays += 1;
      }
    }
    assert_eq!(rays, 4);
  }
}
