//! Region-of-interest models and polygon geometry.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::video::VideoId;

/// Tolerance for the on-edge containment test.
const EDGE_EPSILON: f64 = 1e-9;

/// Unique identifier for a region of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RoiId(pub i64);

impl RoiId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised when constructing a polygon.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolygonError {
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
}

/// A closed simple polygon in image pixel space.
///
/// Vertices are ordered; the closing edge from the last vertex back to the
/// first is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Polygon {
    points: Vec<(f64, f64)>,
}

impl Polygon {
    /// Create a polygon from an ordered vertex list.
    ///
    /// Fails when fewer than 3 vertices are given.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, PolygonError> {
        if points.len() < 3 {
            return Err(PolygonError::TooFewVertices(points.len()));
        }
        Ok(Self { points })
    }

    /// The ordered vertex list.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Test whether a point lies inside the polygon.
    ///
    /// Boundary points count as inside, mirroring the original
    /// `pointPolygonTest(...) >= 0` semantics.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if self.on_boundary(x, y) {
            return true;
        }

        // Standard even-odd ray cast along +x.
        let mut inside = false;
        let n = self.points.len();
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.points[i];
            let (xj, yj) = self.points[j];
            if (yi > y) != (yj > y) {
                let x_cross = (xj - xi) * (y - yi) / (yj - yi) + xi;
                if x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Test whether a point lies on one of the polygon's edges.
    fn on_boundary(&self, x: f64, y: f64) -> bool {
        let n = self.points.len();
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.points[i];
            let (xj, yj) = self.points[j];
            if point_on_segment(x, y, xi, yi, xj, yj) {
                return true;
            }
            j = i;
        }
        false
    }
}

/// Whether (px, py) lies on the segment (ax, ay)-(bx, by).
fn point_on_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> bool {
    let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
    if cross.abs() > EDGE_EPSILON * (1.0 + (bx - ax).abs() + (by - ay).abs()) {
        return false;
    }
    let dot = (px - ax) * (bx - ax) + (py - ay) * (by - ay);
    let len_sq = (bx - ax) * (bx - ax) + (by - ay) * (by - ay);
    dot >= -EDGE_EPSILON && dot <= len_sq + EDGE_EPSILON
}

/// A persisted region of interest.
///
/// Created on explicit user request; immutable thereafter. One video may
/// own many ROIs, and ROIs are not required to be disjoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoiRecord {
    /// Store-assigned id
    pub id: RoiId,
    /// Owning video
    pub video_id: VideoId,
    /// Display name
    pub name: String,
    /// Ordered vertex list in image pixel space
    pub polygon: Polygon,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polygon {
        Polygon::new(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]).unwrap()
    }

    #[test]
    fn test_too_few_vertices() {
        assert_eq!(
            Polygon::new(vec![(0.0, 0.0), (1.0, 1.0)]),
            Err(PolygonError::TooFewVertices(2))
        );
    }

    #[test]
    fn test_contains_interior() {
        let poly = unit_square();
        assert!(poly.contains(5.0, 5.0));
        assert!(poly.contains(0.1, 9.9));
    }

    #[test]
    fn test_contains_exterior() {
        let poly = unit_square();
        assert!(!poly.contains(-1.0, 5.0));
        assert!(!poly.contains(5.0, 10.5));
        assert!(!poly.contains(100.0, 100.0));
    }

    #[test]
    fn test_boundary_is_inside() {
        let poly = unit_square();
        // Edge midpoints and a vertex
        assert!(poly.contains(5.0, 0.0));
        assert!(poly.contains(10.0, 5.0));
        assert!(poly.contains(0.0, 0.0));
    }

    #[test]
    fn test_triangle_containment() {
        let poly = Polygon::new(vec![(0.0, 0.0), (10.0, 0.0), (5.0, 10.0)]).unwrap();
        assert!(poly.contains(5.0, 2.0));
        assert!(!poly.contains(0.5, 9.0));
        // Point on the slanted edge
        assert!(poly.contains(2.5, 5.0));
    }

    #[test]
    fn test_concave_polygon() {
        // A "U" shape: points in the notch are outside.
        let poly = Polygon::new(vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (7.0, 10.0),
            (7.0, 3.0),
            (3.0, 3.0),
            (3.0, 10.0),
            (0.0, 10.0),
        ])
        .unwrap();
        assert!(poly.contains(1.0, 5.0));
        assert!(poly.contains(8.0, 5.0));
        assert!(!poly.contains(5.0, 8.0));
    }
}
