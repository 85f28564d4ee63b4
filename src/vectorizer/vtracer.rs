use visioncortex::PathSimplifyMode;
use vtracer::{ColorImage, ColorMode, Config, SvgFile, convert};

use crate::config::{Hierarchical, TraceConfig, TraceMode};
use crate::pixels::PixelPlane;
use crate::quantize::threshold_mask;
use crate::{ConvertError, ConvertResult};

use super::Vectorizer;

/// VTracer-based SVG vectorizer implementation.
///
/// Shares the parameter bundle with the built-in pipeline; options without a
/// VTracer counterpart are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct VtracerSvgVectorizer;

impl Vectorizer for VtracerSvgVectorizer {
    type Options = TraceConfig;
    type Output = String;

    fn vectorize(&self, image: &PixelPlane, options: &Self::Options) -> ConvertResult<Self::Output> {
        let svg_file = trace(to_color_image(image, options), options)?;
        Ok(svg_file.to_string())
    }
}

/// Map the shared configuration onto VTracer's own.
pub fn vtracer_config(options: &TraceConfig) -> Config {
    let mode = match options.mode() {
        TraceMode::None => PathSimplifyMode::None,
        TraceMode::Polygon => PathSimplifyMode::Polygon,
        TraceMode::Spline => PathSimplifyMode::Spline,
    };
    let color_mode = if options.binary_threshold().is_some() {
        ColorMode::Binary
    } else {
        ColorMode::Color
    };
    let hierarchical = match options.hierarchical() {
        Hierarchical::Cutout => vtracer::Hierarchical::Cutout,
        Hierarchical::Stacked => vtracer::Hierarchical::Stacked,
    };
    Config {
        color_mode,
        hierarchical,
        mode,
        // VTracer filters by the side of a square, not by pixel count.
        filter_speckle: (options.minimum_region_area() as f64).sqrt().round() as usize,
        color_precision: 6,
        layer_difference: 16,
        corner_threshold: options.corner_threshold().round() as i32,
        length_threshold: 4.0,
        max_iterations: 10,
        splice_threshold: 45,
        path_precision: Some(options.coordinate_precision()),
    }
}

/// Copy the plane into VTracer's image type. In binary mode pixels are
/// thresholded up front so the configured threshold applies.
fn to_color_image(image: &PixelPlane, options: &TraceConfig) -> ColorImage {
    let (w, h) = image.dimensions();
    let mut pixels = image.image().as_raw().clone();
    if let Some(thr) = options.binary_threshold() {
        let mask = threshold_mask(&image::imageops::grayscale(image.image()), thr);
        for (px, value) in pixels.chunks_exact_mut(4).zip(mask.as_raw()) {
            px[0] = *value;
            px[1] = *value;
            px[2] = *value;
        }
    }
    for px in pixels.chunks_exact_mut(4) {
        if px[3] < options.alpha_threshold() {
            px[3] = 0;
        }
    }
    ColorImage {
        pixels,
        width: w as usize,
        height: h as usize,
    }
}

/// Trace a ColorImage into an SVG using VTracer.
pub fn trace(img: ColorImage, options: &TraceConfig) -> ConvertResult<SvgFile> {
    let svg_file = convert(img, vtracer_config(options)).map_err(ConvertError::Trace)?;
    Ok(svg_file)
}
