use thiserror::Error;

/// Result type alias for operations that may fail with [`ConvertError`].
pub type ConvertResult<T> = std::result::Result<T, ConvertError>;

/// Error types that can occur while converting a PNG into SVG.
///
/// Decode and configuration errors are raised before any tracing work starts.
/// At the C boundary every variant collapses into a null result.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// PNG loading or decoding error.
    #[error("Image decoding failed: {0}")]
    Image(#[from] image::ImageError),
    /// The input buffer held no bytes at all.
    #[error("Image buffer is empty")]
    EmptyImage,
    /// The decoded image has no pixels.
    #[error("Image has zero area ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },
    /// The parameter bundle is not valid JSON for the expected schema.
    #[error("Invalid parameters: {0}")]
    Json(#[from] serde_json::Error),
    /// A parameter is present but out of its accepted range.
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Label plane dimensions did not line up with the pixel plane.
    #[error("Invalid label plane shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    /// The serialized document contains a NUL byte and cannot cross the C boundary.
    #[error("Output contains an interior NUL byte")]
    InteriorNul,
    /// File system I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// An external tracing backend failed.
    #[error("Tracing failed: {0}")]
    Trace(String),
}

impl ConvertError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ConvertError::Config(msg.into())
    }
}
