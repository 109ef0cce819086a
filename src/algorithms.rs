pub mod constrained;
pub mod delaunay;
pub mod refine;
pub mod verify;
pub mod voronoi;

#[doc(inline)]
pub use voronoi::{VoronoiDiagram, VoronoiEdge};
