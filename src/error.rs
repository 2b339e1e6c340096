//! Error types for the compositor and export pipeline.

use thiserror::Error;

/// Result type alias for editor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while composing or exporting a design.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image bytes could not be decoded into a bitmap.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// A bitmap could not be encoded.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// A `data:` URI was malformed or not base64 encoded.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// A colour string was not a valid hex colour.
    #[error("Invalid colour {0:?}: expected #rrggbb or #rgb")]
    InvalidColor(String),

    /// An asset handle did not refer to the current asset.
    #[error("Asset {0} is not on the stage")]
    UnknownAsset(u64),

    /// The transform overlay could not be rasterized.
    #[error("SVG rendering failed: {0}")]
    Svg(String),

    /// Building or writing the PDF document failed.
    #[error("PDF export failed: {0}")]
    Pdf(String),

    /// Settings JSON could not be parsed or written.
    #[error("Invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            image::ImageError::Encoding(e) => Error::Encode(e.to_string()),
            other => Error::Decode(other.to_string()),
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::Pdf(err.to_string())
    }
}
