use crate::prelude::Point;

const EDGE_EPSILON: f64 = 1e-9;

/// Returns true when `point` lies inside or on the boundary of the polygon.
///
/// Vertices are taken in order and the polygon is closed implicitly. Fewer
/// than three vertices never contain anything.
pub fn polygon_contains(vertices: &[Point], point: Point) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[j];
        if on_segment(a, b, point) {
            return true;
        }
        // Ray casting towards +x.
        if ((a.y > point.y) != (b.y > point.y))
            && (point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    let scale = (b.x - a.x).abs().max((b.y - a.y).abs()).max(1.0);
    if cross.abs() > EDGE_EPSILON * scale {
        return false;
    }
    p.x >= a.x.min(b.x) - EDGE_EPSILON
        && p.x <= a.x.max(b.x) + EDGE_EPSILON
        && p.y >= a.y.min(b.y) - EDGE_EPSILON
        && p.y <= a.y.max(b.y) + EDGE_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn interior_and_exterior_points() {
        assert!(polygon_contains(&square(), Point::new(5.0, 5.0)));
        assert!(!polygon_contains(&square(), Point::new(15.0, 5.0)));
        assert!(!polygon_contains(&square(), Point::new(-0.1, 5.0)));
    }

    #[test]
    fn boundary_counts_as_inside() {
        assert!(polygon_contains(&square(), Point::new(10.0, 5.0)));
        assert!(polygon_contains(&square(), Point::new(0.0, 0.0)));
        assert!(polygon_contains(&square(), Point::new(5.0, 10.0)));
    }

    #[test]
    fn concave_notch_is_outside() {
        let l_shape = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 4.0),
            Point::new(4.0, 4.0),
            Point::new(4.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(polygon_contains(&l_shape, Point::new(2.0, 8.0)));
        assert!(!polygon_contains(&l_shape, Point::new(8.0, 8.0)));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let line = vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)];
        assert!(!polygon_contains(&line, Point::new(5.0, 5.0)));
    }
}
