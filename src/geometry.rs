use kurbo::{BezPath, CubicBez, Line, ParamCurveNearest, PathEl, PathSeg, Shape};

pub use kurbo::{Point, Vec2};

use crate::config::FillRule;

/// Accuracy passed to kurbo's nearest-point solvers.
pub const NEAREST_ACCURACY: f64 = 1e-6;

/// Distance from `p` to the closed segment `a`-`b`.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    Line::new(a, b).nearest(p, NEAREST_ACCURACY).distance_sq.sqrt()
}

/// One drawing command; the start point is the end of the previous segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    Line(Point),
    /// Two control points followed by the end point.
    Cubic(Point, Point, Point),
}

impl PathSegment {
    pub fn end(&self) -> Point {
        match *self {
            PathSegment::Line(end) | PathSegment::Cubic(_, _, end) => end,
        }
    }

    /// The kurbo segment starting at `from`.
    pub fn to_path_seg(self, from: Point) -> PathSeg {
        match self {
            PathSegment::Line(end) => PathSeg::Line(Line::new(from, end)),
            PathSegment::Cubic(c1, c2, end) => PathSeg::Cubic(CubicBez::new(from, c1, c2, end)),
        }
    }
}

/// A closed sequence of lines and cubics. The last segment ends at `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedContour {
    pub start: Point,
    pub segments: Vec<PathSegment>,
}

impl FittedContour {
    /// Closed polygon through `points`, one line per edge.
    pub fn polygon(points: &[Point]) -> Self {
        let start = points.first().copied().unwrap_or_default();
        let segments = points
            .iter()
            .skip(1)
            .chain(std::iter::once(&start))
            .map(|p| PathSegment::Line(*p))
            .collect();
        Self { start, segments }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Segments with their start points resolved.
    pub fn path_segs(&self) -> impl Iterator<Item = PathSeg> + '_ {
        let mut from = self.start;
        self.segments.iter().map(move |segment| {
            let seg = segment.to_path_seg(from);
            from = segment.end();
            seg
        })
    }

    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start);
        for segment in &self.segments {
            match *segment {
                PathSegment::Line(end) => path.line_to(end),
                PathSegment::Cubic(c1, c2, end) => path.curve_to(c1, c2, end),
            }
        }
        path.close_path();
        path
    }

    /// Polyline within `tolerance` of the outline. The start point is not
    /// repeated at the end.
    pub fn flatten(&self, tolerance: f64) -> Vec<Point> {
        let mut points = Vec::new();
        kurbo::flatten(self.to_bez_path().elements().iter().copied(), tolerance, |el| match el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => points.push(p),
            _ => {}
        });
        if points.len() > 1 && points.last() == Some(&self.start) {
            points.pop();
        }
        points
    }

    /// Exact enclosed area. Positive when the outline runs clockwise on screen.
    pub fn signed_area(&self) -> f64 {
        self.to_bez_path().area()
    }

    pub fn winding_number(&self, p: Point) -> i32 {
        self.to_bez_path().winding(p)
    }

    /// Distance from `p` to the nearest point of the outline.
    pub fn distance_to(&self, p: Point) -> f64 {
        self.path_segs()
            .map(|seg| seg.nearest(p, NEAREST_ACCURACY).distance_sq)
            .fold(f64::INFINITY, f64::min)
            .sqrt()
    }
}

/// Whether `p` is inside the shape formed by all `contours` under `rule`.
pub fn contains(contours: &[FittedContour], p: Point, rule: FillRule) -> bool {
    let winding: i32 = contours.iter().map(|c| c.winding_number(p)).sum();
    match rule {
        FillRule::NonZero => winding != 0,
        FillRule::EvenOdd => winding % 2 != 0,
    }
}
