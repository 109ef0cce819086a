//! Exchange structures at the crate boundary.
//!
//! These mirror the classic flat parallel-array mesh format: one `Vec` per
//! array, lengths are the counts, empty means absent. Optional per-entry
//! lists (markers, attributes, area bounds) must be empty or exactly
//! parallel to their primary array.

use crate::algorithms::constrained::{RegionInfo, RegionSeed};
use crate::algorithms::refine::VertexData;
use crate::algorithms::voronoi::VoronoiDiagram;
use crate::data::mesh::{Edge, SubIdx, TriIdx, TriMesh};
use crate::data::Point;
use crate::options::Options;
use crate::predicates::Orientation;
use crate::Error;

/// Everything a triangulation run consumes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriangulateInput {
  pub points: Vec<Point>,
  /// Boundary marker per point; empty for all zero.
  pub point_markers: Vec<i32>,
  /// Rectangular attribute rows, one per point; empty for none.
  pub point_attributes: Vec<Vec<f64>>,
  /// Constraint segments as point index pairs.
  pub segments: Vec<[usize; 2]>,
  /// Marker per segment; empty for all zero.
  pub segment_markers: Vec<i32>,
  /// One seed point inside every hole to carve out.
  pub holes: Vec<Point>,
  /// Region seeds carrying a regional attribute and an optional area bound.
  pub regions: Vec<RegionSeed>,
  /// Refine mode only: the triangles of the mesh being refined.
  pub triangles: Vec<[usize; 3]>,
  /// Refine mode only: per-triangle area bounds parallel to `triangles`.
  /// Entries that are not positive mean unbounded.
  pub triangle_max_areas: Vec<f64>,
}

/// Everything a triangulation run produces. Points `[0, input_count)` are
/// the input points verbatim, merged duplicates included; Steiner points
/// follow them.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangulateOutput {
  pub points: Vec<Point>,
  pub point_markers: Vec<i32>,
  pub point_attributes: Vec<Vec<f64>>,
  /// Counterclockwise corner triples.
  pub triangles: Vec<[usize; 3]>,
  /// Regional attribute per triangle; filled when region attributes are
  /// requested.
  pub triangle_attributes: Vec<f64>,
  /// Neighbor triples per triangle when requested; `None` faces a boundary.
  pub neighbors: Vec<[Option<usize>; 3]>,
  /// The constraint sub-segments present in the mesh, sorted.
  pub segments: Vec<[usize; 2]>,
  pub segment_markers: Vec<i32>,
  /// Every triangulation edge when requested.
  pub edges: Vec<[usize; 2]>,
  pub edge_markers: Vec<i32>,
  pub voronoi: Option<VoronoiDiagram>,
  /// False when the Steiner bound stopped refinement early.
  pub refinement_complete: bool,
}

/// Output indices are exchanged as `i32` downstream of this crate.
const INDEX_LIMIT: usize = i32::MAX as usize;

pub(crate) fn validate(input: &TriangulateInput, options: &Options) -> Result<(), Error> {
  if input.points.len() > INDEX_LIMIT {
    return Err(Error::SizeLimit);
  }
  for (idx, p) in input.points.iter().enumerate() {
    if !p.is_finite() {
      return Err(Error::InvalidCoordinate { point: idx });
    }
  }
  if !options.refine && input.points.len() < 3 {
    return Err(Error::TooFewPoints {
      found: input.points.len(),
    });
  }
  parallel(input.point_markers.len(), input.points.len())?;
  if !input.point_attributes.is_empty() {
    parallel(input.point_attributes.len(), input.points.len())?;
    let dim = input.point_attributes[0].len();
    for (idx, row) in input.point_attributes.iter().enumerate() {
      if row.len() != dim {
        return Err(Error::AttributeLengthMismatch { point: idx });
      }
    }
  }
  for (idx, seg) in input.segments.iter().enumerate() {
    for &v in seg {
      if v >= input.points.len() {
        return Err(Error::PointOutOfRange {
          kind: "segment",
          index: idx,
          point: v,
        });
      }
    }
    if seg[0] == seg[1] {
      return Err(Error::DegenerateSegment { segment: idx });
    }
  }
  parallel(input.segment_markers.len(), input.segments.len())?;
  for (idx, hole) in input.holes.iter().enumerate() {
    if !hole.is_finite() {
      return Err(Error::InvalidCoordinate { point: idx });
    }
  }
  for (idx, region) in input.regions.iter().enumerate() {
    if !region.point.is_finite() {
      return Err(Error::InvalidCoordinate { point: idx });
    }
  }
  for (idx, tri) in input.triangles.iter().enumerate() {
    for &v in tri {
      if v >= input.points.len() {
        return Err(Error::PointOutOfRange {
          kind: "triangle",
          index: idx,
          point: v,
        });
      }
    }
  }
  parallel(input.triangle_max_areas.len(), input.triangles.len())?;
  Ok(())
}

fn parallel(len: usize, expected: usize) -> Result<(), Error> {
  if len != 0 && len != expected {
    return Err(Error::AttributeLengthMismatch {
      point: len.min(expected),
    });
  }
  Ok(())
}

/// Refine-mode input triangles must be counterclockwise and have positive
/// area.
pub(crate) fn check_triangles(input: &TriangulateInput) -> Result<(), Error> {
  for (idx, tri) in input.triangles.iter().enumerate() {
    let [a, b, c] = *tri;
    match Orientation::new(&input.points[a], &input.points[b], &input.points[c]) {
      Orientation::CounterClockWise => (),
      Orientation::ClockWise | Orientation::CoLinear => {
        return Err(Error::DegenerateTriangle { triangle: idx })
      }
    }
  }
  Ok(())
}

/// Turn the finished mesh into the flat output form. Super vertices are
/// stripped; point markers of 0 on the mesh boundary become 1, as do edge
/// markers of boundary edges. Segment markers are echoed verbatim.
pub(crate) fn assemble(
  mesh: &TriMesh,
  data: &VertexData,
  regions: &[RegionInfo],
  options: &Options,
  refinement_complete: bool,
  voronoi: Option<VoronoiDiagram>,
) -> TriangulateOutput {
  let supers = mesh.num_super_vertices();
  let points: Vec<Point> = mesh.vertices[supers..].to_vec();
  let mut point_markers: Vec<i32> = data.markers[supers..].to_vec();
  let point_attributes: Vec<Vec<f64>> = if data.dim == 0 {
    Vec::new()
  } else {
    data.attributes[supers..].to_vec()
  };

  let mut on_boundary = vec![false; mesh.vertices.len()];
  for idx in 0..mesh.triangles.len() {
    let t = TriIdx(idx);
    for sub in 0..3 {
      let s = SubIdx(sub);
      if mesh.tri(t).neighbor(s).is_none() {
        let (a, b) = mesh.edge_verts(&Edge::new(t, s));
        on_boundary[a.0] = true;
        on_boundary[b.0] = true;
      }
    }
  }
  for (i, marker) in point_markers.iter_mut().enumerate() {
    if *marker == 0 && on_boundary[supers + i] {
      *marker = 1;
    }
  }

  let triangles: Vec<[usize; 3]> = (0..mesh.triangles.len())
    .map(|idx| {
      let [a, b, c] = mesh.tri(TriIdx(idx)).vertices;
      [a.0 - supers, b.0 - supers, c.0 - supers]
    })
    .collect();

  let triangle_attributes: Vec<f64> = if options.region_attributes {
    (0..mesh.triangles.len())
      .map(|idx| {
        regions
          .get(mesh.tag(TriIdx(idx)) as usize)
          .map_or(0.0, |r| r.attribute)
      })
      .collect()
  } else {
    Vec::new()
  };

  let neighbors: Vec<[Option<usize>; 3]> = if options.produce_neighbors {
    (0..mesh.triangles.len())
      .map(|idx| {
        let t = mesh.tri(TriIdx(idx));
        array_init::array_init(|s| t.neighbors[s].map(|n| n.0))
      })
      .collect()
  } else {
    Vec::new()
  };

  // HashMap iteration order is not stable; sort so identical runs emit
  // identical output.
  let mut constraint_list: Vec<(usize, usize, i32)> = mesh
    .constraints()
    .map(|(e, m)| (e.min.0 - supers, e.max.0 - supers, m))
    .collect();
  constraint_list.sort_unstable();
  let segments: Vec<[usize; 2]> = constraint_list.iter().map(|&(a, b, _)| [a, b]).collect();
  let segment_markers: Vec<i32> = constraint_list.iter().map(|&(_, _, m)| m).collect();

  let (edges, edge_markers) = if options.produce_edges {
    collect_edges(mesh, supers)
  } else {
    (Vec::new(), Vec::new())
  };

  TriangulateOutput {
    points,
    point_markers,
    point_attributes,
    triangles,
    triangle_attributes,
    neighbors,
    segments,
    segment_markers,
    edges,
    edge_markers,
    voronoi,
    refinement_complete,
  }
}

fn collect_edges(mesh: &TriMesh, supers: usize) -> (Vec<[usize; 2]>, Vec<i32>) {
  let mut edges = Vec::new();
  let mut markers = Vec::new();
  for idx in 0..mesh.triangles.len() {
    let t = TriIdx(idx);
    for sub in 0..3 {
      let s = SubIdx(sub);
      let boundary = match mesh.tri(t).neighbor(s) {
        // Interior edges are emitted from the lower-numbered side only.
        Some(n) => {
          if n.0 < idx {
            continue;
          }
          false
        }
        None => true,
      };
      let (a, b) = mesh.edge_verts(&Edge::new(t, s));
      let mut marker = mesh.constraint_marker(a, b).unwrap_or(0);
      if boundary && marker == 0 {
        marker = 1;
      }
      let (lo, hi) = if a.0 < b.0 { (a.0, b.0) } else { (b.0, a.0) };
      edges.push([lo - supers, hi - supers]);
      markers.push(marker);
    }
  }
  (edges, markers)
}
