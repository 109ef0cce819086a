pub mod io;
pub mod mesh;
pub(crate) mod point;

pub use io::{TriangulateInput, TriangulateOutput};
pub use point::{Point, Vector};
