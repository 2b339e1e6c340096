//! Bitmap types shared by the scene, the stage and the exporters.
//!
//! A [`Bitmap`] pairs decoded RGBA pixels with the [`BitmapSource`] they were
//! loaded from. Bitmaps are immutable once built: recoloring or uploading
//! always produces a new bitmap, never edits an existing one.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use image::{ImageFormat, RgbaImage};

use crate::error::{Error, Result};

/// A rectangle in stage pixel coordinates.
///
/// The origin may be negative: an asset can be dragged partly off the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// X offset from the left edge of the stage
    pub x: i32,
    /// Y offset from the top edge of the stage
    pub y: i32,
    /// Width of the rectangle
    pub width: u32,
    /// Height of the rectangle
    pub height: u32,
}

impl Rect {
    /// Creates a new rectangle with the given position and dimensions.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Creates a rectangle starting at origin (0, 0) with the given dimensions.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// Returns the right edge coordinate (x + width), saturating at `i32::MAX`.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(extent(self.width))
    }

    /// Returns the bottom edge coordinate (y + height), saturating at `i32::MAX`.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(extent(self.height))
    }

    /// Returns true if the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Returns true if the point lies inside the rectangle.
    ///
    /// Left and top edges are inclusive, right and bottom edges exclusive.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Returns the rectangle shifted by the given offset.
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.width,
            self.height,
        )
    }
}

fn extent(len: u32) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Where a bitmap's pixels came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitmapSource {
    /// A file on disk, such as the default shirt template.
    Path(PathBuf),

    /// A self-contained `data:` URI (uploads and recolored templates).
    DataUri(String),
}

impl BitmapSource {
    /// Returns `true` if the pixels are embedded in the source itself.
    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::DataUri(_))
    }

    /// Loads and decodes the bitmap this source points at.
    pub fn load(&self) -> Result<Bitmap> {
        match self {
            Self::Path(path) => {
                let bytes = std::fs::read(path)?;
                let pixels = image::load_from_memory(&bytes)?.to_rgba8();
                Ok(Bitmap::new(self.clone(), pixels))
            }
            Self::DataUri(uri) => {
                let (_, bytes) = decode_data_uri(uri)?;
                let pixels = image::load_from_memory(&bytes)?.to_rgba8();
                Ok(Bitmap::new(self.clone(), pixels))
            }
        }
    }
}

impl From<&Path> for BitmapSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Decoded RGBA pixels together with their source.
///
/// Pixels are shared behind an [`Arc`], so cloning a bitmap is cheap and the
/// stage layers can hold on to the same buffer as the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    source: BitmapSource,
    pixels: Arc<RgbaImage>,
}

impl Bitmap {
    /// Wraps already decoded pixels.
    pub fn new(source: BitmapSource, pixels: RgbaImage) -> Self {
        Self {
            source,
            pixels: Arc::new(pixels),
        }
    }

    /// Builds a self-contained bitmap from pixels, encoding them as a PNG
    /// `data:` URI source.
    pub fn from_pixels(pixels: RgbaImage) -> Result<Self> {
        let uri = encode_data_uri("image/png", &encode_png(&pixels)?);
        Ok(Self::new(BitmapSource::DataUri(uri), pixels))
    }

    /// Decodes raw file bytes (PNG, JPEG, ...) into a bitmap whose source is
    /// the bytes re-expressed as a `data:` URI.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes)?;
        let pixels = image::load_from_memory_with_format(bytes, format)?.to_rgba8();
        let uri = encode_data_uri(format.to_mime_type(), bytes);
        Ok(Self::new(BitmapSource::DataUri(uri), pixels))
    }

    /// Reads a user-selected file and decodes it.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    pub fn source(&self) -> &BitmapSource {
        &self.source
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Returns the natural pixel dimensions.
    pub fn dimensions(&self) -> SizePx {
        SizePx::new(self.pixels.width(), self.pixels.height())
    }

    /// Returns `true` if both bitmaps share the same pixel buffer.
    pub fn same_pixels(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }

    /// Returns the bitmap as PNG bytes.
    ///
    /// A PNG `data:` URI source is decoded as-is; anything else is encoded
    /// from the pixels.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        if let BitmapSource::DataUri(uri) = &self.source {
            if uri.starts_with("data:image/png;base64,") {
                let (_, bytes) = decode_data_uri(uri)?;
                return Ok(bytes);
            }
        }
        encode_png(&self.pixels)
    }
}

/// Encodes RGBA pixels as a PNG file.
pub fn encode_png(pixels: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    pixels.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Builds a base64 `data:` URI for the given payload.
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

/// Splits a base64 `data:` URI into its MIME type and decoded payload.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::InvalidDataUri("missing data: prefix".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::InvalidDataUri("missing ',' separator".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| Error::InvalidDataUri("only base64 payloads are supported".into()))?;
    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Error::InvalidDataUri(e.to_string()))?;
    Ok((mime.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn rect_edges_and_contains() {
        let rect = Rect::new(-10, 20, 100, 200);
        assert_eq!(rect.right(), 90);
        assert_eq!(rect.bottom(), 220);
        assert!(rect.contains(-10, 20));
        assert!(rect.contains(89, 219));
        assert!(!rect.contains(90, 100));
        assert!(!rect.contains(0, 220));
        assert_eq!(rect.translate(10, -20), Rect::new(0, 0, 100, 200));
    }

    #[test]
    fn rect_edges_saturate_near_the_limits() {
        let far = Rect::new(i32::MAX - 5, i32::MAX - 5, 10, 10);
        assert_eq!(far.right(), i32::MAX);
        assert_eq!(far.bottom(), i32::MAX);
        assert!(far.contains(i32::MAX - 1, i32::MAX - 5));

        let wide = Rect::new(0, 0, u32::MAX, 1);
        assert_eq!(wide.right(), i32::MAX);
        assert!(wide.contains(1_000_000, 0));

        assert_eq!(far.translate(100, 100), Rect::new(i32::MAX, i32::MAX, 10, 10));
        assert_eq!(
            Rect::new(i32::MIN + 1, 0, 1, 1).translate(-10, 0).x,
            i32::MIN
        );
    }

    #[test]
    fn rect_intersection() {
        let stage = Rect::from_size(600, 600);
        assert!(stage.intersects(&Rect::new(-50, -50, 51, 51)));
        assert!(!stage.intersects(&Rect::new(-50, -50, 50, 50)));
        assert!(!stage.intersects(&Rect::new(600, 0, 10, 10)));
        assert!(!stage.intersects(&Rect::new(i32::MAX - 5, 0, 10, 10)));
    }

    #[test]
    fn bitmap_from_png_bytes() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let png = encode_png(&img).unwrap();

        let bitmap = Bitmap::from_bytes(&png).unwrap();
        assert_eq!(bitmap.dimensions(), SizePx::new(3, 2));
        assert_eq!(bitmap.pixels().get_pixel(2, 1).0, [10, 20, 30, 255]);
        match bitmap.source() {
            BitmapSource::DataUri(uri) => assert!(uri.starts_with("data:image/png;base64,")),
            other => panic!("expected data URI, got {:?}", other),
        }
    }

    #[test]
    fn data_uri_source_reloads_same_pixels() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([200, 0, 0, 128]));
        let bitmap = Bitmap::from_pixels(img.clone()).unwrap();

        let reloaded = bitmap.source().load().unwrap();
        assert_eq!(reloaded.pixels(), &img);
        assert!(bitmap.source().is_embedded());
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = Bitmap::from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::Decode(_)), "got {:?}", err);
    }

    #[test]
    fn malformed_data_uris_are_rejected() {
        assert!(matches!(
            decode_data_uri("image/png;base64,AAAA"),
            Err(Error::InvalidDataUri(_))
        ));
        assert!(matches!(
            decode_data_uri("data:text/plain,hello"),
            Err(Error::InvalidDataUri(_))
        ));
        assert!(matches!(
            decode_data_uri("data:image/png;base64,%%%"),
            Err(Error::InvalidDataUri(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BitmapSource::Path("/nonexistent/tshirt.png".into())
            .load()
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
