use crate::config::TraceConfig;
use crate::pixels::PixelPlane;
use crate::svg::SvgDocument;
use crate::ConvertResult;

/// A trait representing an algorithm that can turn a pixel plane into a vector representation.
pub trait Vectorizer {
    type Options;
    type Output;

    fn vectorize(&self, image: &PixelPlane, options: &Self::Options) -> ConvertResult<Self::Output>;
}

/// The built-in pipeline: quantize, trace region boundaries, fit and serialize.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContourVectorizer;

impl Vectorizer for ContourVectorizer {
    type Options = TraceConfig;
    type Output = SvgDocument;

    fn vectorize(&self, image: &PixelPlane, options: &Self::Options) -> ConvertResult<Self::Output> {
        crate::trace_plane(image, options)
    }
}

#[cfg(feature = "vectorizer-vtracer")]
pub mod vtracer;

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn contour_vectorizer_matches_pixel_plane_trace() {
        let mut image = RgbaImage::from_pixel(6, 6, Rgba([255, 255, 255, 255]));
        for y in 1..5 {
            for x in 1..5 {
                image.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let plane = PixelPlane::from_image(image).unwrap();
        let config = TraceConfig::default();

        let direct = ContourVectorizer.vectorize(&plane, &config).unwrap();
        let via_plane = plane.trace(&ContourVectorizer, &config).unwrap();
        assert_eq!(direct, via_plane);
        assert_eq!(direct.paths.len(), 2);
    }
}
