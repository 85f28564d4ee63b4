use serde::{Deserialize, Serialize};

use crate::{ConvertError, ConvertResult};

/// Largest palette the quantizer accepts.
pub const MAX_PALETTE_SIZE: i64 = 256;
/// Largest number of decimal digits emitted per coordinate.
pub const MAX_COORDINATE_PRECISION: i64 = 8;
/// Largest number of k-means refinement rounds.
pub const MAX_KMEANS_ITERATIONS: i64 = 64;
/// Threshold used when a palette of one color forces binary mode.
pub const DEFAULT_BINARY_THRESHOLD: u8 = 128;

/// How contours are reduced to path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceMode {
    /// Keep the pixel staircase, only dropping collinear vertices.
    None,
    /// Straight line segments only.
    Polygon,
    /// Straight lines and cubic Bezier curves.
    #[default]
    Spline,
}

/// Winding rule written into each `<path>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillRule {
    #[default]
    EvenOdd,
    NonZero,
}

impl FillRule {
    /// The attribute value used in SVG markup.
    pub fn as_svg_str(self) -> &'static str {
        match self {
            FillRule::EvenOdd => "evenodd",
            FillRule::NonZero => "nonzero",
        }
    }
}

/// How the regions of one image are layered in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hierarchical {
    /// Every region cuts its enclosed regions out as holes; paths never overlap.
    #[default]
    Cutout,
    /// Regions are painted back to front and enclosed regions are drawn on top.
    Stacked,
}

/// Raw parameter bundle as it arrives over the boundary.
///
/// Numeric fields are deliberately wide so that out-of-range values are
/// reported by [`TraceParams::validate`] with the offending field name
/// instead of a generic deserialization error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceParams {
    pub palette_size: i64,
    pub binary_threshold: Option<i64>,
    pub curve_fit_tolerance: f64,
    pub minimum_region_area: i64,
    pub coordinate_precision: i64,
    pub stroke_mode: bool,
    pub mode: TraceMode,
    pub corner_threshold: f64,
    pub kmeans_iterations: i64,
    pub alpha_threshold: i64,
    pub fill_rule: FillRule,
    pub hierarchical: Hierarchical,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            palette_size: 8,
            binary_threshold: None,
            curve_fit_tolerance: 1.0,
            minimum_region_area: 4,
            coordinate_precision: 2,
            stroke_mode: false,
            mode: TraceMode::Spline,
            corner_threshold: 60.0,
            kmeans_iterations: 10,
            alpha_threshold: 1,
            fill_rule: FillRule::EvenOdd,
            hierarchical: Hierarchical::Cutout,
        }
    }
}

impl TraceParams {
    /// Parse a JSON object. Unknown fields are ignored, missing ones take defaults.
    /// A blank string is treated as `{}`.
    pub fn from_json(json: &str) -> ConvertResult<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut ignored = Vec::new();
        let mut deserializer = serde_json::Deserializer::from_str(json);
        let params: Self = serde_ignored::deserialize(&mut deserializer, |path| {
            ignored.push(path.to_string());
        })?;
        deserializer.end()?;

        if !ignored.is_empty() {
            log::debug!("ignoring unknown parameter fields: {}", ignored.join(", "));
        }
        Ok(params)
    }

    /// Check every field against its accepted range and freeze the result.
    pub fn validate(self) -> ConvertResult<TraceConfig> {
        let binary_threshold = match self.binary_threshold {
            Some(value) => Some(u8::try_from(value).map_err(|_| {
                ConvertError::config(format!("binaryThreshold must be within 0-255, got {value}"))
            })?),
            None => None,
        };

        let palette_size = if binary_threshold.is_some() {
            // Ignored in binary mode, but a negative count is still nonsense.
            if self.palette_size < 0 {
                return Err(ConvertError::config(format!(
                    "paletteSize must not be negative, got {}",
                    self.palette_size
                )));
            }
            self.palette_size as usize
        } else {
            if !(1..=MAX_PALETTE_SIZE).contains(&self.palette_size) {
                return Err(ConvertError::config(format!(
                    "paletteSize must be within 1-{MAX_PALETTE_SIZE}, got {}",
                    self.palette_size
                )));
            }
            self.palette_size as usize
        };

        if !self.curve_fit_tolerance.is_finite() || self.curve_fit_tolerance < 0.0 {
            return Err(ConvertError::config(format!(
                "curveFitTolerance must be a non-negative number, got {}",
                self.curve_fit_tolerance
            )));
        }

        let minimum_region_area = usize::try_from(self.minimum_region_area).map_err(|_| {
            ConvertError::config(format!(
                "minimumRegionArea must not be negative, got {}",
                self.minimum_region_area
            ))
        })?;

        if !(0..=MAX_COORDINATE_PRECISION).contains(&self.coordinate_precision) {
            return Err(ConvertError::config(format!(
                "coordinatePrecision must be within 0-{MAX_COORDINATE_PRECISION}, got {}",
                self.coordinate_precision
            )));
        }

        if !self.corner_threshold.is_finite() || !(0.0..=180.0).contains(&self.corner_threshold) {
            return Err(ConvertError::config(format!(
                "cornerThreshold must be within 0-180 degrees, got {}",
                self.corner_threshold
            )));
        }

        if !(1..=MAX_KMEANS_ITERATIONS).contains(&self.kmeans_iterations) {
            return Err(ConvertError::config(format!(
                "kmeansIterations must be within 1-{MAX_KMEANS_ITERATIONS}, got {}",
                self.kmeans_iterations
            )));
        }

        let alpha_threshold = u8::try_from(self.alpha_threshold).map_err(|_| {
            ConvertError::config(format!(
                "alphaThreshold must be within 0-255, got {}",
                self.alpha_threshold
            ))
        })?;

        let binary_threshold = binary_threshold.or_else(|| {
            (palette_size <= 1).then_some(DEFAULT_BINARY_THRESHOLD)
        });

        Ok(TraceConfig {
            palette_size,
            binary_threshold,
            curve_fit_tolerance: self.curve_fit_tolerance,
            minimum_region_area,
            coordinate_precision: self.coordinate_precision as u32,
            stroke_mode: self.stroke_mode,
            mode: self.mode,
            corner_threshold: self.corner_threshold,
            kmeans_iterations: self.kmeans_iterations as usize,
            alpha_threshold,
            fill_rule: self.fill_rule,
            hierarchical: self.hierarchical,
        })
    }
}

/// Validated, immutable tracing configuration shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceConfig {
    palette_size: usize,
    binary_threshold: Option<u8>,
    curve_fit_tolerance: f64,
    minimum_region_area: usize,
    coordinate_precision: u32,
    stroke_mode: bool,
    mode: TraceMode,
    corner_threshold: f64,
    kmeans_iterations: usize,
    alpha_threshold: u8,
    fill_rule: FillRule,
    hierarchical: Hierarchical,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            palette_size: 8,
            binary_threshold: None,
            curve_fit_tolerance: 1.0,
            minimum_region_area: 4,
            coordinate_precision: 2,
            stroke_mode: false,
            mode: TraceMode::Spline,
            corner_threshold: 60.0,
            kmeans_iterations: 10,
            alpha_threshold: 1,
            fill_rule: FillRule::EvenOdd,
            hierarchical: Hierarchical::Cutout,
        }
    }
}

impl TraceConfig {
    /// Parse and validate a JSON parameter bundle in one step.
    pub fn from_json(json: &str) -> ConvertResult<Self> {
        TraceParams::from_json(json)?.validate()
    }

    /// Maximum number of palette entries in color mode.
    pub fn palette_size(&self) -> usize {
        self.palette_size
    }

    /// Luminance threshold when tracing in binary mode, `None` in color mode.
    pub fn binary_threshold(&self) -> Option<u8> {
        self.binary_threshold
    }

    pub fn curve_fit_tolerance(&self) -> f64 {
        self.curve_fit_tolerance
    }

    pub fn minimum_region_area(&self) -> usize {
        self.minimum_region_area
    }

    pub fn coordinate_precision(&self) -> u32 {
        self.coordinate_precision
    }

    pub fn stroke_mode(&self) -> bool {
        self.stroke_mode
    }

    pub fn mode(&self) -> TraceMode {
        self.mode
    }

    /// Minimum turning angle, in degrees, for a vertex to be kept as a corner.
    pub fn corner_threshold(&self) -> f64 {
        self.corner_threshold
    }

    pub fn kmeans_iterations(&self) -> usize {
        self.kmeans_iterations
    }

    /// Pixels with alpha strictly below this value are keyed out.
    pub fn alpha_threshold(&self) -> u8 {
        self.alpha_threshold
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    pub fn hierarchical(&self) -> Hierarchical {
        self.hierarchical
    }

    /// The parameter bundle that validates back into this configuration.
    pub fn to_params(&self) -> TraceParams {
        TraceParams {
            palette_size: self.palette_size as i64,
            binary_threshold: self.binary_threshold.map(i64::from),
            curve_fit_tolerance: self.curve_fit_tolerance,
            minimum_region_area: self.minimum_region_area as i64,
            coordinate_precision: self.coordinate_precision as i64,
            stroke_mode: self.stroke_mode,
            mode: self.mode,
            corner_threshold: self.corner_threshold,
            kmeans_iterations: self.kmeans_iterations as i64,
            alpha_threshold: self.alpha_threshold as i64,
            fill_rule: self.fill_rule,
            hierarchical: self.hierarchical,
        }
    }
}
