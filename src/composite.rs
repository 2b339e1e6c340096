//! Pixel compositing with HTML canvas semantics.
//!
//! Pixels are stored straight (non-premultiplied), but every operation is
//! evaluated the way a 2D canvas does it: blend first, then Porter-Duff
//! compose, with colours weighted by alpha. A result with zero alpha is
//! stored as `[0, 0, 0, 0]`, matching a premultiplied canvas read back.

use image::{Rgba, RgbaImage};

/// A `globalCompositeOperation` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeOp {
    /// Source drawn over the backdrop.
    #[default]
    SourceOver,
    /// Channel-wise product blended over the backdrop.
    Multiply,
    /// Backdrop kept only where the source is opaque; source shows elsewhere.
    DestinationAtop,
}

/// Composites a single source pixel onto a backdrop pixel.
pub fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>, op: CompositeOp) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let s = channels(src);
    let d = channels(dst);

    // Premultiplied result colour and alpha.
    let (rgb, out_a) = match op {
        CompositeOp::SourceOver => {
            let rgb = [0, 1, 2].map(|i| s[i] * sa + d[i] * da * (1.0 - sa));
            (rgb, sa + da * (1.0 - sa))
        }
        CompositeOp::Multiply => {
            // Cs' = (1 - ab) * Cs + ab * B(Cb, Cs), then source-over.
            let rgb = [0, 1, 2].map(|i| {
                let mixed = (1.0 - da) * s[i] + da * d[i] * s[i];
                mixed * sa + d[i] * da * (1.0 - sa)
            });
            (rgb, sa + da * (1.0 - sa))
        }
        CompositeOp::DestinationAtop => {
            let rgb = [0, 1, 2].map(|i| s[i] * sa * (1.0 - da) + d[i] * da * sa);
            (rgb, sa)
        }
    };

    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let unpremultiply = |c: f32| ((c / out_a) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba([
        unpremultiply(rgb[0]),
        unpremultiply(rgb[1]),
        unpremultiply(rgb[2]),
        (out_a * 255.0).round() as u8,
    ])
}

fn channels(p: Rgba<u8>) -> [f32; 3] {
    [p[0] as f32 / 255.0, p[1] as f32 / 255.0, p[2] as f32 / 255.0]
}

/// Fills the whole destination with a colour (`fillRect` over the canvas).
pub fn fill(dest: &mut RgbaImage, color: Rgba<u8>, op: CompositeOp) {
    for pixel in dest.pixels_mut() {
        *pixel = blend_pixel(*pixel, color, op);
    }
}

/// Draws a source image onto a destination at the specified position.
///
/// Like `drawImage`, operations that affect the backdrop outside the source
/// (such as [`CompositeOp::DestinationAtop`]) are applied to every
/// destination pixel, with the area outside the source treated as
/// transparent.
pub fn draw(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32, op: CompositeOp) {
    let clear = Rgba([0, 0, 0, 0]);
    let clips_outside = op == CompositeOp::DestinationAtop;
    let (src_w, src_h) = (src.width() as i32, src.height() as i32);

    for (dx, dy, pixel) in dest.enumerate_pixels_mut() {
        let sx = (dx as i32).saturating_sub(x);
        let sy = (dy as i32).saturating_sub(y);
        let inside = sx >= 0 && sy >= 0 && sx < src_w && sy < src_h;

        if inside {
            *pixel = blend_pixel(*pixel, *src.get_pixel(sx as u32, sy as u32), op);
        } else if clips_outside {
            *pixel = blend_pixel(*pixel, clear, op);
        }
    }
}

/// Composites a source image onto a destination using source-over.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32) {
    draw(dest, src, x, y, CompositeOp::SourceOver);
}

/// Flattens an image onto an opaque background colour.
pub fn flatten(image: &RgbaImage, background: Rgba<u8>) -> RgbaImage {
    let mut out = RgbaImage::from_pixel(image.width(), image.height(), background);
    composite_over(&mut out, image, 0, 0);
    out
}
