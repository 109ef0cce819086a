//! The full pipeline: validate, build, constrain, carve, refine, audit,
//! assemble.

use claims::debug_assert_ok;

use crate::algorithms::constrained::{self, RegionInfo};
use crate::algorithms::delaunay;
use crate::algorithms::refine::{self, RefineParams, VertexData};
use crate::algorithms::verify;
use crate::algorithms::voronoi;
use crate::data::io::{self, TriangulateInput, TriangulateOutput};
use crate::data::mesh::{TriIdx, TriMesh, VertIdx};
use crate::options::Options;
use crate::Error;

/// Triangulate `input` as directed by `options`.
///
/// Plain mode builds a Delaunay triangulation of the points, forces the
/// segments in when `planar_straight_line_graph` is set, and carves away
/// the exterior and any holes. Refine mode instead reconstructs the mesh
/// from `input.triangles` and improves it in place. Either way the quality
/// pass then runs under whatever bounds the options carry.
pub fn triangulate(
  input: &TriangulateInput,
  options: &Options,
) -> Result<TriangulateOutput, Error> {
  io::validate(input, options)?;
  if options.verbose && !options.quiet {
    tracing::info!(
      points = input.points.len(),
      segments = input.segments.len(),
      refine = options.refine,
      "triangulation started"
    );
  }

  let (mut mesh, regions) = if options.refine {
    reconstruct(input, options)?
  } else {
    construct(input, options)?
  };

  let mut data = vertex_data(input, &mesh);
  let outcome = refine::refine(
    &mut mesh,
    &mut data,
    &regions,
    RefineParams {
      min_angle_deg: options.min_angle,
      max_area: options.max_area,
      conforming: options.conforming_delaunay,
      max_steiner: options.max_steiner_points,
    },
  );
  debug_assert_ok!(verify::consistency(&mesh));

  if options.check_consistency {
    verify::consistency(&mesh)?;
    verify::delaunay(&mesh)?;
  }

  let vor = if options.produce_voronoi {
    Some(voronoi::voronoi(&mesh))
  } else {
    None
  };

  let output = io::assemble(&mesh, &data, &regions, options, outcome.complete, vor);
  if options.verbose && !options.quiet {
    tracing::info!(
      points = output.points.len(),
      triangles = output.triangles.len(),
      steiner = outcome.steiner,
      complete = outcome.complete,
      "triangulation finished"
    );
  }
  Ok(output)
}

fn construct(
  input: &TriangulateInput,
  options: &Options,
) -> Result<(TriMesh, Vec<RegionInfo>), Error> {
  let d = delaunay::triangulate(&input.points)?;
  let mut mesh = d.mesh;

  if options.planar_straight_line_graph && !input.segments.is_empty() {
    let markers: Vec<i32> = if input.segment_markers.is_empty() {
      vec![0; input.segments.len()]
    } else {
      input.segment_markers.clone()
    };
    constrained::insert_segments(&mut mesh, &d.canonical, &input.segments, &markers)?;
  }
  if options.enclose_convex_hull || !options.planar_straight_line_graph {
    constrained::enclose_hull(&mut mesh);
  }
  // Hole and region seeds belong to PSLG input; without segments to stop
  // the flood a hole seed would hollow out the whole hull.
  let regions = if options.planar_straight_line_graph {
    constrained::carve(&mut mesh, &input.holes, &input.regions)
  } else {
    constrained::carve(&mut mesh, &[], &[])
  };
  Ok((mesh, regions))
}

/// Refine mode: rebuild the mesh the caller already has. Input segments,
/// when given, re-mark their edges; the reconstruction has already pinned
/// the boundary. Per-triangle area bounds become one region per bounded
/// triangle so splits inherit them.
fn reconstruct(
  input: &TriangulateInput,
  options: &Options,
) -> Result<(TriMesh, Vec<RegionInfo>), Error> {
  io::check_triangles(input)?;
  let mut mesh = TriMesh::from_triangles(input.points.clone(), &input.triangles)?;

  if options.planar_straight_line_graph {
    for (idx, seg) in input.segments.iter().enumerate() {
      let a = VertIdx(seg[0]);
      let b = VertIdx(seg[1]);
      if mesh.find_edge(a, b).is_some() {
        let marker = input.segment_markers.get(idx).copied().unwrap_or(0);
        mesh.mark_constraint(a, b, marker);
      } else {
        tracing::warn!(
          segment = idx,
          "segment is not an edge of the mesh being refined"
        );
      }
    }
  }

  let mut regions = vec![RegionInfo {
    attribute: 0.0,
    max_area: None,
  }];
  for (idx, &cap) in input.triangle_max_areas.iter().enumerate() {
    if cap.is_finite() && cap > 0.0 {
      let tag = regions.len() as u32;
      regions.push(RegionInfo {
        attribute: 0.0,
        max_area: Some(cap),
      });
      mesh.set_tag(TriIdx(idx), tag);
    }
  }
  Ok((mesh, regions))
}

/// Markers and attribute rows for every mesh vertex, in vertex order.
/// Super vertices get zeros; input rows follow verbatim.
fn vertex_data(input: &TriangulateInput, mesh: &TriMesh) -> VertexData {
  let dim = input.point_attributes.first().map_or(0, |row| row.len());
  let mut data = VertexData::new(dim);
  for _ in 0..mesh.num_super_vertices() {
    data.push(0, vec![0.0; dim]);
  }
  for idx in 0..input.points.len() {
    let marker = input.point_markers.get(idx).copied().unwrap_or(0);
    let attrs = if dim == 0 {
      Vec::new()
    } else {
      input.point_attributes[idx].clone()
    };
    data.push(marker, attrs);
  }
  debug_assert_eq!(data.markers.len(), mesh.vertices.len());
  data
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::Point;

  fn square() -> TriangulateInput {
    TriangulateInput {
      points: vec![
        Point::new(0.0, 0.0),
        Point::new(2.0, 0.0),
        Point::new(2.0, 2.0),
        Point::new(0.0, 2.0),
      ],
      ..TriangulateInput::default()
    }
  }

  #[test]
  fn square_is_two_triangles() {
    let out = triangulate(&square(), &Options::default()).unwrap();
    assert_eq!(out.points, square().points);
    assert_eq!(out.triangles.len(), 2);
    assert!(out.refinement_complete);
    assert!(out.voronoi.is_none());
    assert!(out.edges.is_empty());
    assert!(out.neighbors.is_empty());
  }

  #[test]
  fn met_quality_bound_inserts_nothing() {
    let options = Options::from_switches("q20").unwrap();
    let out = triangulate(&square(), &options).unwrap();
    assert_eq!(out.points.len(), 4);
    assert!(out.refinement_complete);
  }

  #[test]
  fn refining_a_finished_mesh_adds_nothing() {
    let options = Options::from_switches("q25a0.8").unwrap();
    let first = triangulate(&square(), &options).unwrap();
    assert!(first.refinement_complete);
    assert!(first.points.len() > 4);

    let again = TriangulateInput {
      points: first.points.clone(),
      triangles: first.triangles.clone(),
      ..TriangulateInput::default()
    };
    let options = Options::from_switches("rq25a0.8").unwrap();
    let second = triangulate(&again, &options).unwrap();
    assert!(second.refinement_complete);
    assert_eq!(second.points, first.points);
    assert_eq!(second.triangles.len(), first.triangles.len());
  }

  #[test]
  fn duplicate_points_are_echoed_verbatim() {
    let mut input = square();
    input.points.push(Point::new(2.0, 0.0));
    let out = triangulate(&input, &Options::default()).unwrap();
    assert_eq!(out.points, input.points);
    // The duplicate takes part in no triangle and keeps its zero marker;
    // the four corners sit on the hull and get the boundary default.
    assert_eq!(out.point_markers, vec![1, 1, 1, 1, 0]);
    for tri in &out.triangles {
      for &v in tri {
        assert_ne!(v, 4);
      }
    }
  }

  #[test]
  fn crossing_segments_are_rejected() {
    let mut input = square();
    input.segments = vec![[0, 2], [1, 3]];
    let options = Options::from_switches("p").unwrap();
    let err = triangulate(&input, &options).unwrap_err();
    assert!(matches!(err, Error::SegmentsCross { .. }));
  }

  #[test]
  fn refine_mode_rejects_flipped_triangles() {
    let input = TriangulateInput {
      points: square().points,
      triangles: vec![[0, 3, 1], [1, 2, 3]],
      ..TriangulateInput::default()
    };
    let options = Options::from_switches("r").unwrap();
    assert_eq!(
      triangulate(&input, &options),
      Err(Error::DegenerateTriangle { triangle: 0 })
    );
  }

  #[test]
  fn per_triangle_area_bounds_refine_their_triangles() {
    let coarse = triangulate(&square(), &Options::default()).unwrap();
    assert_eq!(coarse.triangles.len(), 2);
    let again = TriangulateInput {
      points: coarse.points.clone(),
      triangles: coarse.triangles.clone(),
      triangle_max_areas: vec![0.5, -1.0],
      ..TriangulateInput::default()
    };
    let out = triangulate(&again, &Options::from_switches("ra").unwrap()).unwrap();
    assert!(out.refinement_complete);
    assert!(out.points.len() > coarse.points.len());
  }

  #[test]
  fn consistency_audit_accepts_pipeline_output() {
    let options = Options::from_switches("Cq20a0.5en").unwrap();
    let out = triangulate(&square(), &options).unwrap();
    assert!(out.refinement_complete);
    assert_eq!(out.neighbors.len(), out.triangles.len());
    assert!(!out.edges.is_empty());
  }

  #[test]
  fn too_few_points_is_an_input_error() {
    let input = TriangulateInput {
      points: vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)],
      ..TriangulateInput::default()
    };
    assert_eq!(
      triangulate(&input, &Options::default()),
      Err(Error::TooFewPoints { found: 2 })
    );
  }
}
