use std::cmp::Reverse;
use std::collections::HashMap;

use crate::geometry::Point;
use crate::pixels::Color;
use crate::quantize::LabelPlane;

/// A pixel corner on the integer grid, `0..=width` by `0..=height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Vertex {
    pub x: u32,
    pub y: u32,
}

impl Vertex {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    fn step(self, heading: Heading) -> Vertex {
        match heading {
            Heading::East => Vertex::new(self.x + 1, self.y),
            Heading::South => Vertex::new(self.x, self.y + 1),
            Heading::West => Vertex::new(self.x - 1, self.y),
            Heading::North => Vertex::new(self.x, self.y - 1),
        }
    }
}

impl From<Vertex> for Point {
    fn from(v: Vertex) -> Self {
        Point::new(v.x as f64, v.y as f64)
    }
}

/// Direction of a unit edge in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heading {
    East,
    South,
    West,
    North,
}

impl Heading {
    /// Clockwise quarter turn on screen.
    pub fn turn_right(self) -> Heading {
        match self {
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
            Heading::North => Heading::East,
        }
    }

    pub fn turn_left(self) -> Heading {
        match self {
            Heading::East => Heading::North,
            Heading::North => Heading::West,
            Heading::West => Heading::South,
            Heading::South => Heading::East,
        }
    }

    /// Heading of the unit step from `from` to `to`, if they are grid neighbours.
    pub fn between(from: Vertex, to: Vertex) -> Option<Heading> {
        match (to.x as i64 - from.x as i64, to.y as i64 - from.y as i64) {
            (1, 0) => Some(Heading::East),
            (0, 1) => Some(Heading::South),
            (-1, 0) => Some(Heading::West),
            (0, -1) => Some(Heading::North),
            _ => None,
        }
    }
}

/// A closed loop of grid vertices. Consecutive vertices are one unit apart and
/// the edge from the last vertex back to the first is implicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    vertices: Vec<Vertex>,
}

impl Contour {
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Shoelace area, positive for clockwise loops on screen.
    pub fn signed_area(&self) -> i64 {
        let n = self.vertices.len();
        let twice: i64 = (0..n)
            .map(|i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
            })
            .sum();
        twice / 2
    }

    pub fn to_points(&self) -> Vec<Point> {
        self.vertices.iter().map(|&v| Point::from(v)).collect()
    }

    /// Whether some vertex is visited more than once.
    pub fn has_repeated_vertex(&self) -> bool {
        let mut seen = self.vertices.clone();
        seen.sort_unstable();
        seen.windows(2).any(|pair| pair[0] == pair[1])
    }

    /// Pixels on the left of each edge, the side facing away from the region
    /// that owns the loop. Pixels outside the image are skipped.
    pub fn outside_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let n = self.vertices.len();
        (0..n).filter_map(move |i| {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            match Heading::between(a, b)? {
                Heading::East => Some((a.x, a.y.checked_sub(1)?)),
                Heading::South => Some((a.x, a.y)),
                Heading::West => Some((a.x.checked_sub(1)?, a.y)),
                Heading::North => Some((a.x.checked_sub(1)?, a.y.checked_sub(1)?)),
            }
        })
    }

    /// Rotate so the loop starts at its top-most, then left-most vertex.
    fn rotate_to_raster_start(&mut self) {
        let start = self
            .vertices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| (v.y, v.x))
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.vertices.rotate_left(start);
    }
}

/// Boundary of one region of a label plane.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: u32,
    pub color: Color,
    /// Pixel count.
    pub area: usize,
    /// Clockwise outer boundary.
    pub outer: Contour,
    /// Counter-clockwise boundaries of enclosed areas.
    pub holes: Vec<Contour>,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    start: Vertex,
    heading: Heading,
}

impl Edge {
    fn end(&self) -> Vertex {
        self.start.step(self.heading)
    }
}

/// Directed boundary edges of one region, in raster order of their pixel.
#[derive(Default)]
struct EdgeSet {
    edges: Vec<Edge>,
    outgoing: HashMap<Vertex, [Option<usize>; 2]>,
}

impl EdgeSet {
    fn push(&mut self, start: Vertex, heading: Heading) {
        let index = self.edges.len();
        self.edges.push(Edge { start, heading });
        let slots = self.outgoing.entry(start).or_insert([None, None]);
        if slots[0].is_none() {
            slots[0] = Some(index);
        } else {
            slots[1] = Some(index);
        }
    }

    /// The edge leaving `edge`'s end: right turn, else straight, else left.
    fn successor(&self, edge: usize) -> Option<usize> {
        let current = self.edges[edge];
        let slots = self.outgoing.get(&current.end())?;
        let preferred = [
            current.heading.turn_right(),
            current.heading,
            current.heading.turn_left(),
        ];
        preferred.iter().find_map(|&heading| {
            slots
                .iter()
                .flatten()
                .copied()
                .find(|&i| self.edges[i].heading == heading)
        })
    }

    /// Every closed walk, cut at repeated vertices into simple loops.
    fn loops(&self) -> Vec<Contour> {
        let mut visited = vec![false; self.edges.len()];
        let mut loops = Vec::new();
        for first in 0..self.edges.len() {
            if visited[first] {
                continue;
            }
            let mut vertices = Vec::new();
            let mut current = first;
            loop {
                visited[current] = true;
                vertices.push(self.edges[current].start);
                match self.successor(current) {
                    Some(next) if next != first && !visited[next] => current = next,
                    _ => break,
                }
            }
            split_simple(vertices, &mut loops);
        }
        loops
    }
}

/// Cut a closed walk wherever it returns to a vertex it already passed.
///
/// Where an outer boundary and a hole touch at a corner the walk runs through
/// both; each cut-off piece is a simple loop on its own.
fn split_simple(walk: Vec<Vertex>, out: &mut Vec<Contour>) {
    let mut path: Vec<Vertex> = Vec::with_capacity(walk.len());
    let mut position: HashMap<Vertex, usize> = HashMap::new();
    for vertex in walk {
        if let Some(&at) = position.get(&vertex) {
            let piece: Vec<Vertex> = path.drain(at..).collect();
            for v in &piece {
                position.remove(v);
            }
            out.push(Contour::new(piece));
        }
        position.insert(vertex, path.len());
        path.push(vertex);
    }
    if !path.is_empty() {
        out.push(Contour::new(path));
    }
}

/// Walk the boundaries of every region, returning one [`Region`] per id in id
/// order.
///
/// Each unit edge between a region and a different label or the image border
/// is directed so that the region lies on its right. At a saddle vertex the
/// walk prefers the right-most turn, so diagonally touching pixels never share
/// a loop. Walks that pass a vertex twice are cut into simple loops; the
/// largest clockwise loop is the outer boundary, starting at the region's
/// first pixel in raster order, and the rest are holes.
pub fn trace_regions(labels: &LabelPlane) -> Vec<Region> {
    let (w, h) = (labels.width(), labels.height());
    let mut sets: Vec<EdgeSet> = (0..labels.region_count()).map(|_| EdgeSet::default()).collect();

    for y in 0..h {
        for x in 0..w {
            let id = labels.label(x, y);
            let differs = |nx: i64, ny: i64| {
                nx < 0
                    || ny < 0
                    || nx >= w as i64
                    || ny >= h as i64
                    || labels.label(nx as u32, ny as u32) != id
            };
            let (xi, yi) = (x as i64, y as i64);
            let set = &mut sets[id as usize];
            if differs(xi, yi - 1) {
                set.push(Vertex::new(x, y), Heading::East);
            }
            if differs(xi + 1, yi) {
                set.push(Vertex::new(x + 1, y), Heading::South);
            }
            if differs(xi, yi + 1) {
                set.push(Vertex::new(x + 1, y + 1), Heading::West);
            }
            if differs(xi - 1, yi) {
                set.push(Vertex::new(x, y + 1), Heading::North);
            }
        }
    }

    let regions: Vec<Region> = sets
        .into_iter()
        .zip(labels.regions())
        .enumerate()
        .map(|(id, (set, info))| {
            let mut loops = set.loops();
            let outer_index = loops
                .iter()
                .enumerate()
                .max_by_key(|(i, contour)| (contour.signed_area(), Reverse(*i)))
                .map(|(i, _)| i)
                .unwrap_or(0);
            let mut outer = if loops.is_empty() {
                Contour::new(Vec::new())
            } else {
                loops.remove(outer_index)
            };
            outer.rotate_to_raster_start();
            Region {
                id: id as u32,
                color: info.color,
                area: info.area,
                outer,
                holes: loops,
            }
        })
        .collect();

    log::debug!(
        "traced {} regions with {} holes",
        regions.len(),
        regions.iter().map(|r| r.holes.len()).sum::<usize>()
    );
    regions
}

/// Order regions back to front for stacked output.
///
/// Enclosing regions come before the regions inside them, so holes can be
/// painted over instead of cut out. Only holes that open onto a transparent
/// region are kept.
pub fn stack_regions(mut regions: Vec<Region>, labels: &LabelPlane) -> Vec<Region> {
    let (w, h) = (labels.width(), labels.height());
    let transparent = |(x, y): (u32, u32)| {
        x < w
            && y < h
            && labels
                .region(labels.label(x, y))
                .is_some_and(|info| info.color.is_transparent())
    };
    for region in &mut regions {
        region
            .holes
            .retain(|hole| hole.outside_pixels().any(|pixel| transparent(pixel)));
    }
    regions.sort_by_key(|region| (Reverse(region.outer.signed_area()), region.id));
    regions
}
