use std::fmt;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::vectorizer::Vectorizer;
use crate::{ConvertError, ConvertResult};

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Lowercase `#rrggbb`; alpha is not part of the string.
    pub fn to_hex_string(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

impl From<Rgba<u8>> for Color {
    fn from(value: Rgba<u8>) -> Self {
        let Rgba([r, g, b, a]) = value;
        Color::new(r, g, b, a)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_string())
    }
}

/// Decoded, immutable RGBA pixel data with a non-zero area.
#[derive(Debug, Clone)]
pub struct PixelPlane {
    image: RgbaImage,
}

impl PixelPlane {
    /// Decode PNG bytes into a pixel plane.
    pub fn from_png(bytes: &[u8]) -> ConvertResult<Self> {
        if bytes.is_empty() {
            return Err(ConvertError::EmptyImage);
        }
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
        Self::from_image(decoded.to_rgba8())
    }

    /// Wrap an already decoded image.
    pub fn from_image(image: RgbaImage) -> ConvertResult<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ConvertError::ZeroDimension { width, height });
        }
        Ok(Self { image })
    }

    /// Build a plane from a row-major RGBA byte buffer.
    pub fn from_raw(width: u32, height: u32, rgba: Vec<u8>) -> ConvertResult<Self> {
        if width == 0 || height == 0 {
            return Err(ConvertError::ZeroDimension { width, height });
        }
        let expected = width as usize * height as usize * 4;
        let found = rgba.len();
        let image = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
            ConvertError::config(format!(
                "RGBA buffer holds {found} bytes, expected {expected} for {width}x{height}"
            ))
        })?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Get a reference to the underlying RGBA image.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        Color::from(*self.image.get_pixel(x, y))
    }

    /// Trace the plane using the specified vectorizer and options.
    pub fn trace<V>(&self, vectorizer: &V, options: &V::Options) -> ConvertResult<V::Output>
    where
        V: Vectorizer,
    {
        vectorizer.vectorize(self, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_png(image: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    mod color {
        use super::*;

        #[test]
        fn hex_string_is_lowercase_and_padded() {
            assert_eq!(Color::rgb(0, 15, 255).to_hex_string(), "#000fff");
            assert_eq!(Color::new(171, 205, 239, 0).to_hex_string(), "#abcdef");
        }

        #[test]
        fn transparency_follows_alpha() {
            assert!(Color::TRANSPARENT.is_transparent());
            assert!(!Color::new(0, 0, 0, 1).is_transparent());
        }
    }

    mod pixel_plane {
        use super::*;

        #[test]
        fn decodes_png_bytes() {
            let mut source = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
            source.put_pixel(2, 1, Rgba([200, 100, 50, 128]));
            let plane = PixelPlane::from_png(&encode_png(&source)).unwrap();

            assert_eq!(plane.dimensions(), (3, 2));
            assert_eq!(plane.pixel(0, 0), Color::rgb(10, 20, 30));
            assert_eq!(plane.pixel(2, 1), Color::new(200, 100, 50, 128));
        }

        #[test]
        fn empty_bytes_are_rejected() {
            let err = PixelPlane::from_png(&[]).unwrap_err();
            assert!(matches!(err, ConvertError::EmptyImage));
        }

        #[test]
        fn garbage_bytes_are_rejected() {
            let err = PixelPlane::from_png(b"definitely not a png").unwrap_err();
            assert!(matches!(err, ConvertError::Image(_)));
        }

        #[test]
        fn truncated_png_is_rejected() {
            let source = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]));
            let bytes = encode_png(&source);
            let err = PixelPlane::from_png(&bytes[..bytes.len() / 2]).unwrap_err();
            assert!(matches!(err, ConvertError::Image(_)));
        }

        #[test]
        fn zero_dimension_image_is_rejected() {
            let err = PixelPlane::from_image(RgbaImage::new(0, 4)).unwrap_err();
            assert!(matches!(
                err,
                ConvertError::ZeroDimension {
                    width: 0,
                    height: 4
                }
            ));
        }

        #[test]
        fn raw_buffer_size_is_checked() {
            assert!(PixelPlane::from_raw(2, 2, vec![0; 16]).is_ok());
            let err = PixelPlane::from_raw(2, 2, vec![0; 15]).unwrap_err();
            assert!(matches!(err, ConvertError::Config(msg) if msg.contains("15 bytes")));
        }
    }
}
