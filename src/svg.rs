use std::fmt::{self, Write as _};

use crate::config::{FillRule, TraceConfig};
use crate::geometry::{FittedContour, PathSegment, Point};
use crate::pixels::Color;
use crate::simplify::FittedRegion;

/// One `<path>` element: every contour of a region under a single fill.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgPath {
    pub color: Color,
    pub contours: Vec<FittedContour>,
    pub fill_rule: FillRule,
    pub stroke: bool,
}

impl SvgPath {
    /// The `d` attribute: one `M ... Z` sub-path per contour.
    pub fn path_data(&self, precision: u32) -> String {
        let mut d = String::new();
        for contour in &self.contours {
            if contour.segments.is_empty() {
                continue;
            }
            if !d.is_empty() {
                d.push(' ');
            }
            write_contour(&mut d, contour, precision);
        }
        d
    }
}

fn write_contour(d: &mut String, contour: &FittedContour, precision: u32) {
    let coord = |p: Point| {
        format!(
            "{} {}",
            format_number(p.x, precision),
            format_number(p.y, precision)
        )
    };
    d.push('M');
    d.push_str(&coord(contour.start));

    let last = contour.segments.len() - 1;
    for (i, segment) in contour.segments.iter().enumerate() {
        match *segment {
            // The closing edge is implied by Z.
            PathSegment::Line(end) if i == last && end == contour.start => {}
            PathSegment::Line(end) => {
                d.push_str(" L");
                d.push_str(&coord(end));
            }
            PathSegment::Cubic(c1, c2, end) => {
                d.push_str(" C");
                d.push_str(&coord(c1));
                d.push(' ');
                d.push_str(&coord(c2));
                d.push(' ');
                d.push_str(&coord(end));
            }
        }
    }
    d.push_str(" Z");
}

/// Fixed-point rendering with trailing zeros (and a bare dot) removed.
pub fn format_number(value: f64, precision: u32) -> String {
    let mut s = format!("{:.*}", precision as usize, value);
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_owned();
    }
    s
}

/// A complete SVG document sized to the source image.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    pub width: u32,
    pub height: u32,
    pub precision: u32,
    pub paths: Vec<SvgPath>,
}

impl SvgDocument {
    /// Document without any paths.
    pub fn new(width: u32, height: u32, precision: u32) -> Self {
        Self {
            width,
            height,
            precision,
            paths: Vec::new(),
        }
    }

    /// One path per region, in region order. Fully transparent regions and
    /// regions without segments are skipped.
    pub fn from_regions(
        width: u32,
        height: u32,
        regions: &[FittedRegion],
        config: &TraceConfig,
    ) -> Self {
        let mut doc = Self::new(width, height, config.coordinate_precision());
        for region in regions {
            if region.color.is_transparent() || region.segment_count() == 0 {
                continue;
            }
            doc.add_path(SvgPath {
                color: region.color,
                contours: region.contours.clone(),
                fill_rule: config.fill_rule(),
                stroke: config.stroke_mode(),
            });
        }
        doc
    }

    pub fn add_path(&mut self, path: SvgPath) {
        self.paths.push(path);
    }

    pub fn segment_count(&self) -> usize {
        self.paths
            .iter()
            .flat_map(|p| &p.contours)
            .map(FittedContour::segment_count)
            .sum()
    }
}

fn opacity(alpha: u8) -> String {
    format_number(alpha as f64 / 255.0, 3)
}

impl fmt::Display for SvgDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            f,
            "<!-- Generator: {} {} -->",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )?;
        writeln!(
            f,
            r#"<svg version="1.1" xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        )?;

        for path in &self.paths {
            let mut attrs = String::new();
            let hex = path.color.to_hex_string();
            let partial = path.color.a < 255;
            if path.stroke {
                write!(attrs, r#" fill="none" stroke="{hex}" stroke-width="1""#)?;
                if partial {
                    write!(attrs, r#" stroke-opacity="{}""#, opacity(path.color.a))?;
                }
            } else {
                write!(attrs, r#" fill="{hex}""#)?;
                if partial {
                    write!(attrs, r#" fill-opacity="{}""#, opacity(path.color.a))?;
                }
            }
            writeln!(
                f,
                r#"<path d="{}"{attrs} fill-rule="{}"/>"#,
                path.path_data(self.precision),
                path.fill_rule.as_svg_str()
            )?;
        }

        writeln!(f, "</svg>")
    }
}
