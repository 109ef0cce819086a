//! Triangulation configuration.
//!
//! [`Options`] is the native configuration surface. The classic
//! single-letter switch strings (`"pq20a1ziV"`) are accepted through
//! [`Options::from_switches`] as a thin translation layer; nothing else in
//! the crate ever looks at a switch character.

use crate::Error;

/// What to build and how hard to refine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Options {
  /// Treat the input as a planar straight line graph: force its segments
  /// into the mesh and honor holes and regions (`p`).
  pub planar_straight_line_graph: bool,
  /// Refine an existing mesh given by input triangles instead of building
  /// one from scratch (`r`).
  pub refine: bool,
  /// Minimum angle quality bound in degrees (`q`, bare default 20).
  pub min_angle: Option<f64>,
  /// Global maximum triangle area (`a` with a value).
  pub max_area: Option<f64>,
  /// Triangulate the whole convex hull, emitting hull segments (`c`).
  pub enclose_convex_hull: bool,
  /// Split segments until the mesh is truly Delaunay, not merely
  /// constrained Delaunay (`D`).
  pub conforming_delaunay: bool,
  /// Compute the Voronoi dual (`v`).
  pub produce_voronoi: bool,
  /// List all triangulation edges in the output (`e`).
  pub produce_edges: bool,
  /// List triangle neighbors in the output (`n`).
  pub produce_neighbors: bool,
  /// Assign regional attributes to triangles (`A`).
  pub region_attributes: bool,
  /// Re-audit the finished mesh with exact arithmetic (`C`).
  pub check_consistency: bool,
  /// Hard cap on inserted Steiner points (`S`, bare default 0).
  pub max_steiner_points: Option<usize>,
  /// Suppress all `info`-level diagnostics (`Q`).
  pub quiet: bool,
  /// Emit per-phase summaries at `info` level (`V`).
  pub verbose: bool,
}

impl Options {
  /// Parse a classic switch string.
  ///
  /// Supported: `p`, `r`, `q[angle]`, `a[area]`, `c`, `D`, `v`, `e`, `n`,
  /// `A`, `S[count]`, `C`, `Q`, `V`. A bare `a` requests the per-triangle
  /// area bounds supplied with the refine-mode input, so it sets no global
  /// bound. `z` and `i` are accepted and ignored: indices are always
  /// zero-based and construction is always incremental. Anything else is an
  /// [`Error::UnknownSwitch`].
  pub fn from_switches(switches: &str) -> Result<Options, Error> {
    let mut opts = Options::default();
    let chars: Vec<char> = switches.chars().collect();
    let mut i = 0;
    while i < chars.len() {
      let c = chars[i];
      i += 1;
      match c {
        'p' => opts.planar_straight_line_graph = true,
        'r' => opts.refine = true,
        'q' => {
          let (value, next) = scan_f64(&chars, i);
          opts.min_angle = Some(value.unwrap_or(20.0));
          i = next;
        }
        'a' => {
          let (value, next) = scan_f64(&chars, i);
          if let Some(area) = value {
            opts.max_area = Some(area);
          }
          i = next;
        }
        'S' => {
          let (value, next) = scan_usize(&chars, i);
          opts.max_steiner_points = Some(value.unwrap_or(0));
          i = next;
        }
        'c' => opts.enclose_convex_hull = true,
        'D' => opts.conforming_delaunay = true,
        'v' => opts.produce_voronoi = true,
        'e' => opts.produce_edges = true,
        'n' => opts.produce_neighbors = true,
        'A' => opts.region_attributes = true,
        'C' => opts.check_consistency = true,
        'Q' => opts.quiet = true,
        'V' => opts.verbose = true,
        'z' | 'i' => {}
        _ => return Err(Error::UnknownSwitch { switch: c }),
      }
    }
    Ok(opts)
  }
}

/// Scan a decimal number (digits with at most one dot) starting at `start`.
/// Returns the parsed value and the index past it; scans nothing when no
/// digit or dot is present.
fn scan_f64(chars: &[char], start: usize) -> (Option<f64>, usize) {
  let mut end = start;
  let mut seen_dot = false;
  while end < chars.len() {
    let c = chars[end];
    if c.is_ascii_digit() || (c == '.' && !seen_dot) {
      seen_dot |= c == '.';
      end += 1;
    } else {
      break;
    }
  }
  if end == start {
    return (None, start);
  }
  let text: String = chars[start..end].iter().collect();
  (text.parse().ok(), end)
}

fn scan_usize(chars: &[char], start: usize) -> (Option<usize>, usize) {
  let mut end = start;
  while end < chars.len() && chars[end].is_ascii_digit() {
    end += 1;
  }
  if end == start {
    return (None, start);
  }
  let text: String = chars[start..end].iter().collect();
  (text.parse().ok(), end)
}
