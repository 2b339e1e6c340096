//! Shirt template recoloring.

use image::RgbaImage;
use log::info;

use crate::bitmap::{Bitmap, BitmapSource};
use crate::color::ShirtColor;
use crate::composite::{CompositeOp, draw, fill};
use crate::error::Result;

/// Produces a tinted copy of `base`.
///
/// The base is drawn onto an offscreen buffer of its natural size, the buffer
/// is filled with `color` using multiply, and the base is drawn once more
/// with destination-atop so only the garment silhouette keeps any alpha. The
/// result is a new self-contained bitmap; `base` is left untouched.
///
/// Always pass the original template here, not a previously tinted one:
/// tints multiply, so chaining them darkens the shirt on every pick.
pub fn recolor(base: &Bitmap, color: ShirtColor) -> Result<Bitmap> {
    let size = base.dimensions();
    let mut canvas = RgbaImage::new(size.width, size.height);

    draw(&mut canvas, base.pixels(), 0, 0, CompositeOp::SourceOver);
    fill(&mut canvas, color.to_rgba(), CompositeOp::Multiply);
    draw(&mut canvas, base.pixels(), 0, 0, CompositeOp::DestinationAtop);

    let tinted = Bitmap::from_pixels(canvas)?;
    info!(
        "recolored {}x{} template to {}",
        size.width, size.height, color
    );
    Ok(tinted)
}

/// Loads `source` and recolors it.
///
/// Fails with a decode or I/O error when the template cannot be loaded,
/// instead of waiting on an image that never arrives.
pub fn recolor_source(source: &BitmapSource, color: ShirtColor) -> Result<Bitmap> {
    let base = source.load()?;
    recolor(&base, color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use image::Rgba;

    /// 4x4 fixture: transparent border column, white body, grey print, and
    /// one half-transparent edge pixel.
    fn fixture_template() -> Bitmap {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        for y in 0..4 {
            img.put_pixel(0, y, Rgba([0, 0, 0, 0]));
        }
        img.put_pixel(2, 2, Rgba([128, 128, 128, 255]));
        img.put_pixel(3, 3, Rgba([255, 255, 255, 128]));
        Bitmap::new(BitmapSource::Path("tshirt.png".into()), img)
    }

    #[test]
    fn transparent_pixels_stay_transparent() {
        let base = fixture_template();
        let tinted = recolor(&base, ShirtColor::new(255, 0, 0)).unwrap();

        for y in 0..4 {
            assert_eq!(tinted.pixels().get_pixel(0, y).0, [0, 0, 0, 0]);
        }
    }

    #[test]
    fn opaque_pixels_take_the_tint() {
        let base = fixture_template();
        let tinted = recolor(&base, ShirtColor::new(255, 0, 0)).unwrap();

        // White body becomes the pick colour.
        assert_eq!(tinted.pixels().get_pixel(1, 1).0, [255, 0, 0, 255]);
        // Printed grey detail is multiplied, not replaced.
        assert_eq!(tinted.pixels().get_pixel(2, 2).0, [128, 0, 0, 255]);
    }

    #[test]
    fn semi_transparent_edge_keeps_its_alpha() {
        let base = fixture_template();
        let tinted = recolor(&base, ShirtColor::new(0, 0, 255)).unwrap();

        let edge = tinted.pixels().get_pixel(3, 3);
        assert_eq!(edge[3], 128);
        assert_eq!(edge[0], 0);
        assert_eq!(edge[2], 255);
    }

    #[test]
    fn recolor_is_idempotent_from_the_same_base() {
        let base = fixture_template();
        let color = ShirtColor::from_hex("#3a7bd5").unwrap();

        let first = recolor(&base, color).unwrap();
        let second = recolor(&base, color).unwrap();

        assert_eq!(first.pixels(), second.pixels());
        assert_eq!(first.source(), second.source());
    }

    #[test]
    fn base_is_not_mutated() {
        let base = fixture_template();
        let before = base.pixels().clone();

        let tinted = recolor(&base, ShirtColor::new(0, 128, 0)).unwrap();

        assert_eq!(base.pixels(), &before);
        assert!(!tinted.same_pixels(&base));
        assert!(tinted.source().is_embedded());
        assert_eq!(tinted.dimensions(), base.dimensions());
    }

    #[test]
    fn white_is_identity_on_opaque_pixels() {
        let base = fixture_template();
        let tinted = recolor(&base, ShirtColor::WHITE).unwrap();
        assert_eq!(tinted.pixels().get_pixel(2, 2).0, [128, 128, 128, 255]);
    }

    #[test]
    fn unloadable_source_is_an_error() {
        let source = BitmapSource::Path("/missing/tshirt.png".into());
        let err = recolor_source(&source, ShirtColor::WHITE).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
