pub mod config;
pub mod contour;
pub mod error;
pub mod ffi;
pub mod geometry;
pub mod pixels;
pub mod quantize;
pub mod simplify;
pub mod svg;
pub mod vectorizer;

pub use config::{FillRule, Hierarchical, TraceConfig, TraceMode, TraceParams};
pub use error::{ConvertError, ConvertResult};
pub use ffi::SvgBuffer;
pub use pixels::{Color, PixelPlane};
pub use quantize::LabelPlane;
pub use svg::SvgDocument;
pub use vectorizer::{ContourVectorizer, Vectorizer};
#[cfg(feature = "vectorizer-vtracer")]
pub use vectorizer::vtracer::VtracerSvgVectorizer;

use std::path::Path;

use crate::contour::{stack_regions, trace_regions};
use crate::quantize::quantize;
use crate::simplify::{FittedRegion, fit_region};

/// Convert PNG bytes into SVG text using a JSON parameter bundle.
///
/// Parameters are validated before the image is decoded. An empty bundle
/// selects the defaults.
pub fn convert(png: &[u8], params_json: &str) -> ConvertResult<String> {
    Converter::from_json(params_json)?.convert_png(png)
}

/// Like [`convert`], returning an owned buffer that can cross the C boundary.
pub fn convert_to_buffer(png: &[u8], params_json: &str) -> ConvertResult<SvgBuffer> {
    SvgBuffer::new(convert(png, params_json)?)
}

/// Run every stage on a decoded plane.
pub fn trace_plane(plane: &PixelPlane, config: &TraceConfig) -> ConvertResult<SvgDocument> {
    let labels = quantize(plane, config)?;
    let mut regions = trace_regions(&labels);
    if config.hierarchical() == Hierarchical::Stacked {
        regions = stack_regions(regions, &labels);
    }
    let fitted: Vec<FittedRegion> = regions
        .iter()
        .map(|region| fit_region(region, config))
        .collect();

    let doc = SvgDocument::from_regions(plane.width(), plane.height(), &fitted, config);
    log::debug!(
        "emitted {} paths with {} segments",
        doc.paths.len(),
        doc.segment_count()
    );
    Ok(doc)
}

/// Entry point for configuring and running PNG to SVG conversion.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: TraceConfig,
}

impl Converter {
    pub fn new(config: TraceConfig) -> Self {
        Self { config }
    }

    /// Build a converter from a JSON parameter bundle.
    pub fn from_json(params_json: &str) -> ConvertResult<Self> {
        Ok(Self::new(TraceConfig::from_json(params_json)?))
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: TraceConfig) -> Self {
        self.config = config;
        self
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Only run the quantization stage.
    pub fn quantize(&self, plane: &PixelPlane) -> ConvertResult<LabelPlane> {
        quantize(plane, &self.config)
    }

    /// Trace a decoded plane into a document.
    pub fn trace(&self, plane: &PixelPlane) -> ConvertResult<SvgDocument> {
        plane.trace(&ContourVectorizer, &self.config)
    }

    /// Decode PNG bytes and trace them into SVG text.
    pub fn convert_png(&self, png: &[u8]) -> ConvertResult<String> {
        let plane = PixelPlane::from_png(png)?;
        Ok(self.trace(&plane)?.to_string())
    }

    /// Read a PNG file and write the traced SVG to `output`.
    pub fn convert_file(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> ConvertResult<()> {
        let png = std::fs::read(input)?;
        let svg = self.convert_png(&png)?;
        std::fs::write(output, svg)?;
        Ok(())
    }
}
