use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned extent of a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_points<'a, I: IntoIterator<Item = &'a Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut env = Envelope::new(first.x, first.y, first.x, first.y);
        for p in iter {
            env.expand_to(p);
        }
        Some(env)
    }

    pub fn expand_to(&mut self, p: &Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ]
    }
}

/// Polygon with an exterior ring followed by any number of holes. Rings are
/// stored closed or open; edges wrap around either way.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub rings: Vec<Vec<Point>>,
}

impl Polygon {
    pub fn new(rings: Vec<Vec<Point>>) -> Self {
        Self { rings }
    }

    pub fn from_envelope(env: &Envelope) -> Self {
        Self::new(vec![env.corners().to_vec()])
    }

    pub fn exterior(&self) -> &[Point] {
        self.rings.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn envelope(&self) -> Option<Envelope> {
        Envelope::from_points(self.exterior())
    }

    fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.rings.iter().flat_map(|ring| {
            let n = ring.len();
            (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
        })
    }

    /// Even-odd containment over all rings, so holes exclude their interior.
    pub fn contains(&self, p: &Point) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    pub fn distance_to_point(&self, p: &Point) -> f64 {
        if self.contains(p) {
            return 0.0;
        }
        self.edges()
            .map(|(a, b)| point_segment_distance(p, &a, &b))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn distance_to_segment(&self, a: &Point, b: &Point) -> f64 {
        if self.contains(a) || self.contains(b) {
            return 0.0;
        }
        self.edges()
            .map(|(c, d)| segment_segment_distance(a, b, &c, &d))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn map_points<F: Fn(&Point) -> Point>(&self, f: F) -> Polygon {
        Polygon::new(
            self.rings
                .iter()
                .map(|ring| ring.iter().map(&f).collect())
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => GeometryKind::Polygon,
        }
    }

    pub fn envelope(&self) -> Option<Envelope> {
        match self {
            Geometry::Point(p) => Some(Envelope::new(p.x, p.y, p.x, p.y)),
            Geometry::Polygon(poly) => poly.envelope(),
            Geometry::MultiPolygon(parts) => parts
                .iter()
                .filter_map(Polygon::envelope)
                .reduce(|acc, env| acc.union(&env)),
        }
    }

    pub fn as_point(&self) -> Option<&Point> {
        match self {
            Geometry::Point(p) => Some(p),
            _ => None,
        }
    }

    pub fn distance_to_point(&self, p: &Point) -> f64 {
        match self {
            Geometry::Point(q) => q.distance(p),
            Geometry::Polygon(poly) => poly.distance_to_point(p),
            Geometry::MultiPolygon(parts) => parts
                .iter()
                .map(|poly| poly.distance_to_point(p))
                .fold(f64::INFINITY, f64::min),
        }
    }

    pub fn distance_to_segment(&self, a: &Point, b: &Point) -> f64 {
        match self {
            Geometry::Point(q) => point_segment_distance(q, a, b),
            Geometry::Polygon(poly) => poly.distance_to_segment(a, b),
            Geometry::MultiPolygon(parts) => parts
                .iter()
                .map(|poly| poly.distance_to_segment(a, b))
                .fold(f64::INFINITY, f64::min),
        }
    }

    pub fn map_points<F: Fn(&Point) -> Point>(&self, f: F) -> Geometry {
        match self {
            Geometry::Point(p) => Geometry::Point(f(p)),
            Geometry::Polygon(poly) => Geometry::Polygon(poly.map_points(&f)),
            Geometry::MultiPolygon(parts) => {
                Geometry::MultiPolygon(parts.iter().map(|poly| poly.map_points(&f)).collect())
            }
        }
    }

    pub fn points(&self) -> Box<dyn Iterator<Item = &Point> + '_> {
        match self {
            Geometry::Point(p) => Box::new(std::iter::once(p)),
            Geometry::Polygon(poly) => Box::new(poly.rings.iter().flatten()),
            Geometry::MultiPolygon(parts) => {
                Box::new(parts.iter().flat_map(|poly| poly.rings.iter().flatten()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    Polygon,
}

pub fn point_segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(&Point::new(a.x + t * dx, a.y + t * dy))
}

fn orientation(a: &Point, b: &Point, c: &Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: &Point, b: &Point, p: &Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

pub fn segments_intersect(a: &Point, b: &Point, c: &Point, d: &Point) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if ((o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0))
        && ((o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0))
    {
        return true;
    }

    (o1 == 0.0 && on_segment(a, b, c))
        || (o2 == 0.0 && on_segment(a, b, d))
        || (o3 == 0.0 && on_segment(c, d, a))
        || (o4 == 0.0 && on_segment(c, d, b))
}

pub fn segment_segment_distance(a: &Point, b: &Point, c: &Point, d: &Point) -> f64 {
    if segments_intersect(a, b, c, d) {
        return 0.0;
    }
    point_segment_distance(a, c, d)
        .min(point_segment_distance(b, c, d))
        .min(point_segment_distance(c, a, b))
        .min(point_segment_distance(d, a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Polygon {
        Polygon::from_envelope(&Envelope::new(min, min, max, max))
    }

    #[test]
    fn contains_respects_holes() {
        let mut poly = square(0.0, 10.0);
        poly.rings.push(square(4.0, 6.0).rings.remove(0));
        assert!(poly.contains(&Point::new(1.0, 1.0)));
        assert!(!poly.contains(&Point::new(5.0, 5.0)));
        assert!(!poly.contains(&Point::new(11.0, 5.0)));
    }

    #[test]
    fn point_distance_is_zero_inside_and_planar_outside() {
        let poly = square(0.0, 10.0);
        assert_eq!(poly.distance_to_point(&Point::new(5.0, 5.0)), 0.0);
        assert!((poly.distance_to_point(&Point::new(13.0, 14.0)) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn crossing_segment_has_zero_distance() {
        let poly = square(0.0, 10.0);
        let a = Point::new(-5.0, 5.0);
        let b = Point::new(15.0, 5.0);
        assert_eq!(poly.distance_to_segment(&a, &b), 0.0);
    }

    #[test]
    fn passing_segment_reports_gap() {
        let poly = square(0.0, 10.0);
        let a = Point::new(-5.0, 13.0);
        let b = Point::new(15.0, 13.0);
        assert!((poly.distance_to_segment(&a, &b) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn multipolygon_envelope_covers_all_parts() {
        let geom = Geometry::MultiPolygon(vec![square(0.0, 1.0), square(5.0, 8.0)]);
        assert_eq!(geom.envelope(), Some(Envelope::new(0.0, 0.0, 8.0, 8.0)));
        assert_eq!(geom.kind(), GeometryKind::Polygon);
    }
}
