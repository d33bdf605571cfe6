use crate::model::Point;

/// Points closer than this to an edge count as inside the polygon.
pub const EDGE_EPSILON: f32 = 1e-4;

pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let ab_len2 = abx * abx + aby * aby;
    if ab_len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p.x - a.x) * abx + (p.y - a.y) * aby) / ab_len2;
    let t = t.clamp(0.0, 1.0);
    p.distance(Point::new(a.x + abx * t, a.y + aby * t))
}

fn edges(poly: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = poly.len();
    (0..n).map(move |i| (poly[i], poly[(i + 1) % n]))
}

/// Even-odd ray casting. Boundary points are inside.
pub fn point_in_polygon(p: Point, poly: &[Point]) -> bool {
    if poly.len() < 3 {
        return false;
    }
    if edges(poly).any(|(a, b)| distance_to_segment(p, a, b) <= EDGE_EPSILON) {
        return true;
    }
    let mut inside = false;
    for (a, b) in edges(poly) {
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// Axis-aligned bounds as `(min, max)`.
pub fn polygon_bounds(poly: &[Point]) -> Option<(Point, Point)> {
    let mut it = poly.iter();
    let first = *it.next()?;
    let mut min = first;
    let mut max = first;
    for p in it {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Some((min, max))
}

pub fn signed_area(poly: &[Point]) -> f32 {
    edges(poly).map(|(a, b)| a.x * b.y - b.x * a.y).sum::<f32>() * 0.5
}

/// Area centroid, or the vertex mean when the outline has no area.
pub fn polygon_centroid(poly: &[Point]) -> Option<Point> {
    if poly.is_empty() {
        return None;
    }
    let area = signed_area(poly);
    if area.abs() <= f32::EPSILON {
        let n = poly.len() as f32;
        let (sx, sy) = poly.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        return Some(Point::new(sx / n, sy / n));
    }
    let (cx, cy) = edges(poly).fold((0.0, 0.0), |(cx, cy), (a, b)| {
        let cross = a.x * b.y - b.x * a.y;
        (cx + (a.x + b.x) * cross, cy + (a.y + b.y) * cross)
    });
    Some(Point::new(cx / (6.0 * area), cy / (6.0 * area)))
}

fn cross(o: Point, a: Point, b: Point) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(b1, b2, a1))
        || (d2 == 0.0 && on_segment(b1, b2, a2))
        || (d3 == 0.0 && on_segment(a1, a2, b1))
        || (d4 == 0.0 && on_segment(a1, a2, b2))
}

/// True when no two non-adjacent edges of the closed outline touch.
pub fn is_simple_polygon(poly: &[Point]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        let (a1, a2) = (poly[i], poly[(i + 1) % n]);
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            if adjacent {
                continue;
            }
            let (b1, b2) = (poly[j], poly[(j + 1) % n]);
            if segments_intersect(a1, a2, b1, b2) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn point_strictly_inside_triangle_is_selected() {
        assert!(point_in_polygon(Point::new(2.0, 2.0), &triangle()));
    }

    #[test]
    fn point_outside_triangle_is_not_selected() {
        assert!(!point_in_polygon(Point::new(8.0, 8.0), &triangle()));
        assert!(!point_in_polygon(Point::new(-1.0, 5.0), &triangle()));
    }

    #[test]
    fn edge_and_vertex_points_count_as_inside() {
        let tri = triangle();
        assert!(point_in_polygon(Point::new(5.0, 0.0), &tri));
        assert!(point_in_polygon(Point::new(5.0, 5.0), &tri));
        assert!(point_in_polygon(Point::new(0.0, 0.0), &tri));
    }

    #[test]
    fn degenerate_outline_contains_nothing() {
        let line = [Point::new(0.0, 0.0), Point::new(5.0, 5.0)];
        assert!(!point_in_polygon(Point::new(1.0, 1.0), &line));
    }

    #[test]
    fn bowtie_uses_even_odd() {
        let bowtie = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(Point::new(2.0, 5.0), &bowtie));
        assert!(!point_in_polygon(Point::new(5.0, 2.0), &bowtie));
        assert!(!is_simple_polygon(&bowtie));
    }

    #[test]
    fn square_is_simple_and_centered() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        assert!(is_simple_polygon(&square));
        let c = polygon_centroid(&square).unwrap();
        assert!((c.x - 2.0).abs() < 1e-4 && (c.y - 2.0).abs() < 1e-4);
        let (min, max) = polygon_bounds(&square).unwrap();
        assert_eq!((min, max), (Point::new(0.0, 0.0), Point::new(4.0, 4.0)));
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let d = distance_to_segment(Point::new(-3.0, 4.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-4);
    }
}
