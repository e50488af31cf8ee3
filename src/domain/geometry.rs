use serde::{Deserialize, Serialize};

use super::errors::{DomainError, DomainResult};

/// Distance (px) under which a point counts as lying on a polygon edge.
const EDGE_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn dot(self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product.
    pub fn cross(self, other: Point) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance_squared(self, other: Point) -> f32 {
        let d = self.sub(other);
        d.dot(d)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Point::new(x, y)
    }
}

impl From<Point> for [f32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Inside-or-on-boundary test by ray casting.
///
/// Points lying on an edge or a vertex (within `EDGE_TOLERANCE`) count as inside.
/// Works for convex and concave simple polygons.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> DomainResult<bool> {
    if polygon.len() < 3 {
        return Err(DomainError::InvalidGeometry(format!(
            "un polígono necesita al menos 3 vértices, recibidos {}",
            polygon.len()
        )));
    }
    Ok(ray_cast(point, polygon))
}

fn ray_cast(point: Point, vertices: &[Point]) -> bool {
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let a = vertices[i];
        let b = vertices[j];
        if on_segment(point, a, b) {
            return true;
        }
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn on_segment(p: Point, a: Point, b: Point) -> bool {
    let ab = b.sub(a);
    let ap = p.sub(a);
    let len = ab.length();
    if len <= f32::EPSILON {
        return ap.length() <= EDGE_TOLERANCE;
    }
    if (ab.cross(ap) / len).abs() > EDGE_TOLERANCE {
        return false;
    }
    let t = ap.dot(ab) / (len * len);
    let slack = EDGE_TOLERANCE / len;
    (-slack..=1.0 + slack).contains(&t)
}

/// Proper crossing of segments p1-p2 and q1-q2 (shared endpoints do not count).
fn segments_cross(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = p2.sub(p1).cross(q1.sub(p1));
    let d2 = p2.sub(p1).cross(q2.sub(p1));
    let d3 = q2.sub(q1).cross(p1.sub(q1));
    let d4 = q2.sub(q1).cross(p2.sub(q1));
    (d1 > 0.0) != (d2 > 0.0) && (d3 > 0.0) != (d4 > 0.0) && d1 != 0.0 && d2 != 0.0 && d3 != 0.0 && d4 != 0.0
}

/// Simple closed polygon, validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> DomainResult<Self> {
        if vertices.len() < 3 {
            return Err(DomainError::InvalidGeometry(format!(
                "un polígono necesita al menos 3 vértices, recibidos {}",
                vertices.len()
            )));
        }
        if let Some(p) = vertices.iter().find(|p| !p.is_finite()) {
            return Err(DomainError::InvalidGeometry(format!("vértice no finito: {p:?}")));
        }
        let polygon = Self { vertices };
        if polygon.area() <= f32::EPSILON {
            return Err(DomainError::InvalidGeometry("polígono de área nula".into()));
        }
        if polygon.is_self_intersecting() {
            return Err(DomainError::InvalidGeometry("polígono auto-intersectado".into()));
        }
        Ok(polygon)
    }

    pub fn contains(&self, point: Point) -> bool {
        // construction guarantees >= 3 vertices
        point_in_polygon(point, &self.vertices).unwrap_or(false)
    }

    /// Shoelace area (absolute).
    pub fn area(&self) -> f32 {
        let n = self.vertices.len();
        let twice: f32 = (0..n)
            .map(|i| self.vertices[i].cross(self.vertices[(i + 1) % n]))
            .sum();
        twice.abs() / 2.0
    }

    /// Edges as (start, end) pairs, closing back to the first vertex.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    fn is_self_intersecting(&self) -> bool {
        let n = self.vertices.len();
        let edges: Vec<_> = self.edges().collect();
        for i in 0..n {
            for j in (i + 1)..n {
                // adjacent edges share a vertex
                if j == i + 1 || (i == 0 && j == n - 1) {
                    continue;
                }
                let (p1, p2) = edges[i];
                let (q1, q2) = edges[j];
                if segments_cross(p1, p2, q1, q2) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[[f32; 2]]) -> Vec<Point> {
        raw.iter().copied().map(Point::from).collect()
    }

    fn square() -> Vec<Point> {
        pts(&[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]])
    }

    #[test]
    fn test_point_inside_and_outside_square() {
        let sq = square();
        assert!(point_in_polygon(Point::new(5.0, 5.0), &sq).unwrap());
        assert!(!point_in_polygon(Point::new(15.0, 5.0), &sq).unwrap());
        assert!(!point_in_polygon(Point::new(-0.5, 5.0), &sq).unwrap());
    }

    #[test]
    fn test_boundary_counts_as_inside() {
        let sq = square();
        assert!(point_in_polygon(Point::new(10.0, 5.0), &sq).unwrap());
        assert!(point_in_polygon(Point::new(5.0, 0.0), &sq).unwrap());
        assert!(point_in_polygon(Point::new(0.0, 0.0), &sq).unwrap());
        assert!(point_in_polygon(Point::new(10.0, 10.0), &sq).unwrap());
    }

    #[test]
    fn test_concave_polygon() {
        // "U" shape opening upwards
        let u = pts(&[
            [0.0, 0.0],
            [3.0, 0.0],
            [3.0, 6.0],
            [6.0, 6.0],
            [6.0, 0.0],
            [9.0, 0.0],
            [9.0, 9.0],
            [0.0, 9.0],
        ]);
        assert!(point_in_polygon(Point::new(1.0, 1.0), &u).unwrap());
        assert!(!point_in_polygon(Point::new(4.5, 3.0), &u).unwrap());
        assert!(point_in_polygon(Point::new(4.5, 8.0), &u).unwrap());
    }

    #[test]
    fn test_degenerate_input_is_rejected() {
        let line = pts(&[[0.0, 0.0], [1.0, 1.0]]);
        let err = point_in_polygon(Point::new(0.5, 0.5), &line).unwrap_err();
        assert!(matches!(err, DomainError::InvalidGeometry(_)));
    }

    #[test]
    fn test_repeated_calls_are_deterministic() {
        let sq = square();
        for p in [Point::new(5.0, 5.0), Point::new(10.0, 3.0), Point::new(11.0, 3.0)] {
            let first = point_in_polygon(p, &sq).unwrap();
            for _ in 0..50 {
                assert_eq!(point_in_polygon(p, &sq).unwrap(), first);
            }
        }
    }

    #[test]
    fn test_polygon_validation() {
        assert!(Polygon::new(square()).is_ok());
        assert!(matches!(
            Polygon::new(pts(&[[0.0, 0.0], [1.0, 1.0]])),
            Err(DomainError::InvalidGeometry(_))
        ));
        // collinear vertices have no area
        assert!(Polygon::new(pts(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]])).is_err());
        // bow-tie
        let bow = pts(&[[0.0, 0.0], [10.0, 10.0], [10.0, 0.0], [0.0, 10.0]]);
        assert!(Polygon::new(bow).is_err());
        assert!(Polygon::new(pts(&[[0.0, 0.0], [f32::NAN, 1.0], [2.0, 0.0]])).is_err());
    }

    #[test]
    fn test_polygon_area_and_contains() {
        let poly = Polygon::new(square()).unwrap();
        assert!((poly.area() - 100.0).abs() < 1e-3);
        assert!(poly.contains(Point::new(2.0, 2.0)));
        assert_eq!(poly.edges().count(), 4);
    }
}
