use crate::config::{TraceConfig, TraceMode};
use crate::contour::{Contour, Heading, Region, Vertex};
use kurbo::{CubicBez, Line, ParamCurve, ParamCurveDeriv, ParamCurveNearest};

use crate::geometry::{FittedContour, NEAREST_ACCURACY, PathSegment, Point, Vec2};
use crate::pixels::Color;

/// Arc length, in pixels, over which the turning angle at a vertex is measured.
pub const CORNER_WINDOW: f64 = 3.0;

const ANGLE_EPSILON: f64 = 1e-9;

/// A region whose outer boundary and holes have been reduced to path segments.
#[derive(Debug, Clone)]
pub struct FittedRegion {
    pub id: u32,
    pub color: Color,
    pub area: usize,
    /// Outer contour first, then the holes.
    pub contours: Vec<FittedContour>,
}

impl FittedRegion {
    pub fn segment_count(&self) -> usize {
        self.contours.iter().map(FittedContour::segment_count).sum()
    }

    /// Net signed area of all contours; holes count negatively.
    pub fn signed_area(&self) -> f64 {
        self.contours.iter().map(FittedContour::signed_area).sum()
    }
}

/// Fit the outer contour and every hole of `region`.
pub fn fit_region(region: &Region, config: &TraceConfig) -> FittedRegion {
    let contours = std::iter::once(&region.outer)
        .chain(&region.holes)
        .filter(|contour| !contour.is_empty())
        .map(|contour| fit_contour(contour, config))
        .collect();
    FittedRegion {
        id: region.id,
        color: region.color,
        area: region.area,
        contours,
    }
}

/// Reduce a grid contour to lines and cubics that stay within the configured
/// tolerance of every original vertex.
///
/// A tolerance of zero keeps every grid vertex. Otherwise collinear vertices are
/// dropped first; then, unless the mode is [`TraceMode::None`], the loop is cut
/// at its corners and each run between corners is split until every piece fits.
pub fn fit_contour(contour: &Contour, config: &TraceConfig) -> FittedContour {
    let tolerance = config.curve_fit_tolerance();
    if tolerance <= 0.0 || contour.len() < 3 {
        return FittedContour::polygon(&contour.to_points());
    }

    let reduced: Vec<Point> = remove_collinear(contour.vertices())
        .into_iter()
        .map(Point::from)
        .collect();
    if config.mode() == TraceMode::None {
        return FittedContour::polygon(&reduced);
    }

    let anchors = find_anchors(&reduced, config.corner_threshold());
    let curves = config.mode() == TraceMode::Spline;
    let n = reduced.len();
    let mut segments = Vec::new();
    for (i, &from) in anchors.iter().enumerate() {
        let to = anchors.get(i + 1).copied().unwrap_or(anchors[0] + n);
        let run: Vec<Point> = (from..=to).map(|k| reduced[k % n]).collect();
        fit_run(&run, tolerance, curves, &mut segments);
    }

    FittedContour {
        start: reduced[anchors[0]],
        segments,
    }
}

/// Keep only the vertices where the walking direction changes.
///
/// Falls back to the full loop when fewer than three vertices would remain.
pub fn remove_collinear(vertices: &[Vertex]) -> Vec<Vertex> {
    let n = vertices.len();
    let kept: Vec<Vertex> = (0..n)
        .filter(|&i| {
            let prev = vertices[(i + n - 1) % n];
            let next = vertices[(i + 1) % n];
            Heading::between(prev, vertices[i]) != Heading::between(vertices[i], next)
        })
        .map(|i| vertices[i])
        .collect();
    if kept.len() < 3 {
        vertices.to_vec()
    } else {
        kept
    }
}

/// Indices of the corner vertices of a closed polygon, in ascending order.
///
/// The turning angle at a vertex is taken between the chords reaching
/// [`CORNER_WINDOW`] of arc length backwards and forwards. A vertex is a corner
/// when that angle exceeds `threshold_deg` and no vertex within the window on
/// either side turns harder. Loops too short for the window keep every vertex.
/// At least two anchors are always returned for polygons with two or more
/// distinct points.
pub fn find_anchors(points: &[Point], threshold_deg: f64) -> Vec<usize> {
    let n = points.len();
    let arc = ArcLength::new(points);
    if arc.total <= 4.0 * CORNER_WINDOW {
        return (0..n).collect();
    }

    let angles: Vec<f64> = (0..n)
        .map(|i| {
            let here = points[i];
            let back = arc.point_at(arc.offsets[i] - CORNER_WINDOW);
            let ahead = arc.point_at(arc.offsets[i] + CORNER_WINDOW);
            let incoming = here - back;
            let outgoing = ahead - here;
            incoming.cross(outgoing).abs().atan2(incoming.dot(outgoing))
        })
        .collect();

    let threshold = threshold_deg.to_radians();
    let mut anchors: Vec<usize> = (0..n)
        .filter(|&i| {
            angles[i] > threshold
                && arc.within_window(i, false).all(|j| angles[i] > angles[j] + ANGLE_EPSILON)
                && arc.within_window(i, true).all(|j| angles[i] + ANGLE_EPSILON >= angles[j])
        })
        .collect();

    if anchors.is_empty() {
        anchors.push(0);
    }
    if anchors.len() < 2 {
        let first = points[anchors[0]];
        let farthest = (0..n).fold(anchors[0], |best, i| {
            if points[i].distance(first) > points[best].distance(first) {
                i
            } else {
                best
            }
        });
        if farthest != anchors[0] {
            anchors.push(farthest);
            anchors.sort_unstable();
        }
    }
    anchors
}

/// Cumulative arc length along a closed polygon.
struct ArcLength<'a> {
    points: &'a [Point],
    /// Arc length from vertex 0 to each vertex.
    offsets: Vec<f64>,
    total: f64,
}

impl<'a> ArcLength<'a> {
    fn new(points: &'a [Point]) -> Self {
        let n = points.len();
        let mut offsets = Vec::with_capacity(n);
        let mut total = 0.0;
        for i in 0..n {
            offsets.push(total);
            total += points[i].distance(points[(i + 1) % n]);
        }
        Self {
            points,
            offsets,
            total,
        }
    }

    /// Point at arc length `s`, wrapping around the loop.
    fn point_at(&self, s: f64) -> Point {
        let n = self.points.len();
        let s = s.rem_euclid(self.total);
        let k = self.offsets.partition_point(|&o| o <= s).saturating_sub(1);
        let a = self.points[k];
        let b = self.points[(k + 1) % n];
        let len = a.distance(b);
        if len <= f64::EPSILON {
            return a;
        }
        a.lerp(b, (s - self.offsets[k]) / len)
    }

    /// Vertices other than `i` within [`CORNER_WINDOW`] of arc length ahead of
    /// it (or behind it).
    fn within_window(&self, i: usize, forward: bool) -> impl Iterator<Item = usize> + '_ {
        let n = self.points.len();
        (1..n)
            .map(move |step| if forward { (i + step) % n } else { (i + n - step) % n })
            .take_while(move |&j| {
                let gap = if forward {
                    self.offsets[j] - self.offsets[i]
                } else {
                    self.offsets[i] - self.offsets[j]
                };
                gap.rem_euclid(self.total) <= CORNER_WINDOW
            })
    }
}

/// Split-and-fit one run between two anchors, appending its segments in order.
fn fit_run(run: &[Point], tolerance: f64, curves: bool, out: &mut Vec<PathSegment>) {
    let mut stack = vec![(0, run.len() - 1)];
    while let Some((lo, hi)) = stack.pop() {
        if hi - lo < 2 {
            out.push(PathSegment::Line(run[hi]));
            continue;
        }

        let (split, deviation) = farthest_from_chord(&run[lo..=hi]);
        if deviation <= tolerance {
            out.push(PathSegment::Line(run[hi]));
            continue;
        }

        if curves {
            if let Some((cubic, error)) = fit_cubic(&densify(&run[lo..=hi])) {
                if error <= tolerance {
                    out.push(PathSegment::Cubic(cubic.p1, cubic.p2, cubic.p3));
                    continue;
                }
            }
        }

        let mid = lo + split;
        stack.push((mid, hi));
        stack.push((lo, mid));
    }
}

/// Interior index farthest from the chord joining the ends, with its distance.
fn farthest_from_chord(points: &[Point]) -> (usize, f64) {
    let chord = Line::new(points[0], points[points.len() - 1]);
    let mut best = (1, -1.0);
    for (i, &p) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let d = chord.nearest(p, NEAREST_ACCURACY).distance_sq.sqrt();
        if d > best.1 {
            best = (i, d);
        }
    }
    best
}

/// Restore the unit-spaced vertices between consecutive points.
fn densify(points: &[Point]) -> Vec<Point> {
    let mut dense = vec![points[0]];
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let steps = a.distance(b).round().max(1.0) as usize;
        for s in 1..=steps {
            dense.push(a.lerp(b, s as f64 / steps as f64));
        }
    }
    dense
}

fn unit(v: Vec2) -> Option<Vec2> {
    let len = v.hypot();
    (len > f64::EPSILON).then(|| v / len)
}

/// Largest distance from a sample to the nearest point of `cubic`.
fn max_distance(cubic: &CubicBez, samples: &[Point]) -> f64 {
    samples
        .iter()
        .map(|&q| cubic.nearest(q, NEAREST_ACCURACY).distance_sq)
        .fold(0.0, f64::max)
        .sqrt()
}

/// Least-squares cubic through `samples` with tangents estimated at both ends,
/// returned with its largest deviation from the samples.
///
/// Parameters start out proportional to chord length and get one round of
/// Newton refinement; the better of the two fits is returned.
fn fit_cubic(samples: &[Point]) -> Option<(CubicBez, f64)> {
    let m = samples.len();
    if m < 3 {
        return None;
    }
    let k = ((m - 1) / 4).max(1);
    let (p0, p3) = (samples[0], samples[m - 1]);
    let t1 = unit(samples[k] - p0)?;
    let t2 = unit(samples[m - 1 - k] - p3)?;

    let mut params = Vec::with_capacity(m);
    let mut acc = 0.0;
    params.push(0.0);
    for pair in samples.windows(2) {
        acc += pair[0].distance(pair[1]);
        params.push(acc);
    }
    if acc <= f64::EPSILON {
        return None;
    }
    for u in &mut params {
        *u /= acc;
    }

    let first = solve_cubic(samples, &params, t1, t2);
    for (u, &q) in params.iter_mut().zip(samples) {
        *u = newton_step(&first, q, *u);
    }
    let second = solve_cubic(samples, &params, t1, t2);

    let first_error = max_distance(&first, samples);
    let second_error = max_distance(&second, samples);
    Some(if second_error < first_error {
        (second, second_error)
    } else {
        (first, first_error)
    })
}

/// Handle lengths along the fixed tangents that minimize the squared
/// parametric error.
fn solve_cubic(samples: &[Point], params: &[f64], t1: Vec2, t2: Vec2) -> CubicBez {
    let m = samples.len();
    let (p0, p3) = (samples[0], samples[m - 1]);

    let mut c = [[0.0f64; 2]; 2];
    let mut x = [0.0f64; 2];
    for (&q, &u) in samples.iter().zip(params) {
        let mu = 1.0 - u;
        let b0 = mu * mu * mu;
        let b1 = 3.0 * mu * mu * u;
        let b2 = 3.0 * mu * u * u;
        let b3 = u * u * u;
        let a1 = t1 * b1;
        let a2 = t2 * b2;
        c[0][0] += a1.dot(a1);
        c[0][1] += a1.dot(a2);
        c[1][1] += a2.dot(a2);
        let rest = q.to_vec2() - (p0.to_vec2() * (b0 + b1) + p3.to_vec2() * (b2 + b3));
        x[0] += a1.dot(rest);
        x[1] += a2.dot(rest);
    }
    c[1][0] = c[0][1];

    let chord = p0.distance(p3);
    let det = c[0][0] * c[1][1] - c[0][1] * c[1][0];
    let (mut alpha1, mut alpha2) = if det.abs() > 1e-12 {
        (
            (x[0] * c[1][1] - x[1] * c[0][1]) / det,
            (c[0][0] * x[1] - c[1][0] * x[0]) / det,
        )
    } else {
        (0.0, 0.0)
    };
    let floor = 1e-6 * chord;
    if alpha1 <= floor || alpha2 <= floor {
        alpha1 = chord / 3.0;
        alpha2 = chord / 3.0;
    }

    CubicBez::new(p0, p0 + t1 * alpha1, p3 + t2 * alpha2, p3)
}

fn newton_step(cubic: &CubicBez, q: Point, u: f64) -> f64 {
    let d1 = cubic.deriv();
    let d2 = d1.deriv();
    let diff = cubic.eval(u) - q;
    let v1 = d1.eval(u).to_vec2();
    let v2 = d2.eval(u).to_vec2();
    let denominator = v1.dot(v1) + diff.dot(v2);
    if denominator.abs() <= f64::EPSILON {
        return u;
    }
    (u - diff.dot(v1) / denominator).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraceParams;
    use crate::contour::trace_regions;
    use crate::quantize::LabelPlane;
    use ndarray::Array2;

    fn config(tolerance: f64, mode: TraceMode) -> TraceConfig {
        TraceParams {
            curve_fit_tolerance: tolerance,
            mode,
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    /// Outer contour of a filled disk of radius `r` centred in a square image.
    fn disk_contour(r: f64) -> Contour {
        let size = (2.0 * r) as usize + 4;
        let center = size as f64 / 2.0;
        let labels = Array2::from_shape_fn((size, size), |(y, x)| {
            let dx = x as f64 + 0.5 - center;
            let dy = y as f64 + 0.5 - center;
            u32::from(dx * dx + dy * dy <= r * r)
        });
        let plane = LabelPlane::new(labels, vec![Color::WHITE, Color::BLACK]).unwrap();
        let regions = trace_regions(&plane);
        regions[1].outer.clone()
    }

    fn rect_contour(w: u32, h: u32) -> Contour {
        let mut vertices = Vec::new();
        for x in 0..w {
            vertices.push(Vertex::new(x, 0));
        }
        for y in 0..h {
            vertices.push(Vertex::new(w, y));
        }
        for x in (1..=w).rev() {
            vertices.push(Vertex::new(x, h));
        }
        for y in (1..=h).rev() {
            vertices.push(Vertex::new(0, y));
        }
        Contour::new(vertices)
    }

    /// Largest distance from an original vertex to the fitted outline.
    fn max_deviation(contour: &Contour, fitted: &FittedContour) -> f64 {
        contour
            .to_points()
            .iter()
            .map(|&p| fitted.distance_to(p))
            .fold(0.0, f64::max)
    }

    fn assert_closed(fitted: &FittedContour) {
        assert_eq!(fitted.segments.last().unwrap().end(), fitted.start);
    }

    mod remove_collinear {
        use super::*;

        #[test]
        fn rectangle_keeps_four_corners() {
            let reduced = remove_collinear(rect_contour(5, 3).vertices());
            assert_eq!(
                reduced,
                vec![
                    Vertex::new(0, 0),
                    Vertex::new(5, 0),
                    Vertex::new(5, 3),
                    Vertex::new(0, 3)
                ]
            );
        }
    }

    mod find_anchors {
        use super::*;

        #[test]
        fn small_loops_keep_every_vertex() {
            let square: Vec<Point> = remove_collinear(rect_contour(2, 2).vertices())
                .into_iter()
                .map(Point::from)
                .collect();
            assert_eq!(find_anchors(&square, 60.0), vec![0, 1, 2, 3]);
        }

        #[test]
        fn rectangle_corners_are_anchors() {
            let points: Vec<Point> = remove_collinear(rect_contour(10, 8).vertices())
                .into_iter()
                .map(Point::from)
                .collect();
            assert_eq!(find_anchors(&points, 60.0), vec![0, 1, 2, 3]);
        }

        #[test]
        fn smooth_loop_gets_two_anchors() {
            let points: Vec<Point> = remove_collinear(disk_contour(30.0).vertices())
                .into_iter()
                .map(Point::from)
                .collect();
            let anchors = find_anchors(&points, 60.0);
            assert_eq!(anchors.len(), 2);
            assert_eq!(anchors[0], 0);
        }
    }

    mod fit_contour {
        use super::*;

        #[test]
        fn zero_tolerance_keeps_every_vertex() {
            let contour = rect_contour(4, 3);
            let fitted = fit_contour(&contour, &config(0.0, TraceMode::Spline));
            assert_eq!(fitted.segment_count(), contour.len());
            assert!(fitted.segments.iter().all(|s| matches!(s, PathSegment::Line(_))));
            assert!((fitted.signed_area() - 12.0).abs() < 1e-9);
            assert_closed(&fitted);
        }

        #[test]
        fn rectangle_reduces_to_four_lines() {
            for mode in [TraceMode::None, TraceMode::Polygon, TraceMode::Spline] {
                let fitted = fit_contour(&rect_contour(9, 5), &config(1.0, mode));
                assert_eq!(fitted.segment_count(), 4, "{mode:?}");
                assert!((fitted.signed_area() - 45.0).abs() < 1e-9);
                assert_closed(&fitted);
            }
        }

        #[test]
        fn none_mode_keeps_staircase_corners() {
            let contour = disk_contour(6.0);
            let reduced = remove_collinear(contour.vertices()).len();
            let fitted = fit_contour(&contour, &config(2.0, TraceMode::None));
            assert_eq!(fitted.segment_count(), reduced);
            assert!((fitted.signed_area() - contour.signed_area() as f64).abs() < 1e-9);
        }

        #[test]
        fn spline_mode_uses_curves_on_a_disk() {
            let contour = disk_contour(20.0);
            let fitted = fit_contour(&contour, &config(1.0, TraceMode::Spline));
            assert!(fitted.segments.iter().any(|s| matches!(s, PathSegment::Cubic(..))));
            assert!(fitted.segment_count() < remove_collinear(contour.vertices()).len());
            assert_closed(&fitted);
        }

        #[test]
        fn polygon_mode_has_only_lines() {
            let contour = disk_contour(10.0);
            let fitted = fit_contour(&contour, &config(1.0, TraceMode::Polygon));
            assert!(fitted.segments.iter().all(|s| matches!(s, PathSegment::Line(_))));
        }

        #[test]
        fn fits_stay_within_tolerance() {
            let contour = disk_contour(14.0);
            for mode in [TraceMode::Polygon, TraceMode::Spline] {
                for tolerance in [0.5, 1.0, 2.0] {
                    let fitted = fit_contour(&contour, &config(tolerance, mode));
                    let deviation = max_deviation(&contour, &fitted);
                    assert!(
                        deviation <= tolerance + 0.05,
                        "{mode:?} at {tolerance}: deviation {deviation}"
                    );
                }
            }
        }

        #[test]
        fn orientation_is_preserved() {
            let contour = disk_contour(9.0);
            let fitted = fit_contour(&contour, &config(1.5, TraceMode::Spline));
            assert!(fitted.signed_area() > 0.0);

            let mut reversed = contour.vertices().to_vec();
            reversed.reverse();
            let hole = fit_contour(&Contour::new(reversed), &config(1.5, TraceMode::Spline));
            assert!(hole.signed_area() < 0.0);
        }
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// fit_contour: segment count never grows with tolerance
            #[test]
            fn segment_count_monotonic(
                r in 3.0f64..14.0,
                a in 0.0f64..3.0,
                b in 0.0f64..3.0,
                spline in proptest::bool::ANY
            ) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                let mode = if spline { TraceMode::Spline } else { TraceMode::Polygon };
                let contour = disk_contour(r);
                let fine = fit_contour(&contour, &config(lo, mode));
                let coarse = fit_contour(&contour, &config(hi, mode));
                prop_assert!(coarse.segment_count() <= fine.segment_count());
            }

            /// fit_contour: area stays close to the pixel area
            #[test]
            fn area_is_approximated(r in 3.0f64..14.0, tolerance in 0.0f64..2.0) {
                let contour = disk_contour(r);
                let exact = contour.signed_area() as f64;
                let fitted = fit_contour(&contour, &config(tolerance, TraceMode::Polygon));
                let perimeter = contour.len() as f64;
                prop_assert!((fitted.signed_area() - exact).abs() <= perimeter * tolerance + 1e-9);
            }
        }
    }
}
