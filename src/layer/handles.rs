//! Transform handle layer (the selection overlay).
//!
//! Draws the selection border, eight resize anchors and a rotation anchor
//! around the asset, in the style of a scene-graph transformer. The chrome
//! is described as SVG and rasterized with resvg so strokes are
//! anti-aliased the same way at every stage size.
//!
//! The anchors are visual only. Pointer-downs on them are not hit-tested;
//! the asset is resized through [`Editor::place_asset`] and is never
//! rotated.
//!
//! [`Editor::place_asset`]: crate::Editor::place_asset

use std::fmt::Write as _;

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};
use serde::{Deserialize, Serialize};

use super::{
    AssetBounds, DependencyVersion, LayerConfig, LayerEffect, LayerVersions, RenderContext,
};
use crate::bitmap::Rect;
use crate::color::ShirtColor;
use crate::composite::composite_over;
use crate::error::{Error, Result};
use crate::scene::AssetId;

// ============================================================================
// HandleStyle
// ============================================================================

/// Visual style of the transform overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct HandleStyle {
    /// Side length of each square anchor, in pixels.
    pub anchor_size: u32,

    /// Border and anchor outline colour.
    #[serde(with = "hex")]
    #[cfg_attr(feature = "jsonschema", schemars(with = "String"))]
    pub stroke: ShirtColor,

    /// Anchor fill colour.
    #[serde(with = "hex")]
    #[cfg_attr(feature = "jsonschema", schemars(with = "String"))]
    pub fill: ShirtColor,

    /// Distance of the rotation anchor above the top edge.
    pub rotate_anchor_offset: u32,
}

impl Default for HandleStyle {
    fn default() -> Self {
        Self {
            anchor_size: 10,
            stroke: ShirtColor::new(0, 161, 255),
            fill: ShirtColor::WHITE,
            rotate_anchor_offset: 50,
        }
    }
}

/// Serde adapter storing a [`ShirtColor`] as its hex string.
pub(crate) mod hex {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::color::ShirtColor;

    pub fn serialize<S: Serializer>(color: &ShirtColor, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&color.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ShirtColor, D::Error> {
        let hex = String::deserialize(d)?;
        ShirtColor::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// HandlesConfig
// ============================================================================

/// The overlay attached to a selected asset.
///
/// # Consumed Properties
///
/// - [`AssetBounds`]: where to draw. Without it the layer draws nothing.
#[derive(Debug, Clone, Default)]
pub struct HandlesConfig {
    /// The asset the overlay is attached to.
    pub target: AssetId,

    pub style: HandleStyle,
}

impl HandlesConfig {
    pub fn new(target: AssetId, style: HandleStyle) -> Self {
        Self { target, style }
    }
}

impl LayerConfig for HandlesConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self.target != other.target || self.style != other.style
    }
}

impl LayerEffect for HandlesConfig {
    /// Drawn last, on top of the template and the asset.
    fn dependencies(versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::combine(&[versions.template, versions.asset])
    }

    fn transform(&self, ctx: &mut RenderContext) -> Result<()> {
        let Some(AssetBounds(bounds)) = ctx.get::<AssetBounds>().copied() else {
            return Ok(());
        };

        let (width, height) = ctx.frame.dimensions();
        let svg = handles_svg(&self.style, bounds, width, height)?;
        let chrome = rasterize_svg(&svg, width, height)?;
        composite_over(&mut ctx.frame, &chrome, 0, 0);
        Ok(())
    }
}

// ============================================================================
// SVG Rendering
// ============================================================================

/// Builds the overlay markup for a stage of `width` x `height`.
fn handles_svg(style: &HandleStyle, bounds: Rect, width: u32, height: u32) -> Result<String> {
    let stroke = style.stroke.to_hex();
    let fill = style.fill.to_hex();
    let size = style.anchor_size as f32;

    // Half-pixel offsets keep one-pixel strokes on pixel centres.
    let left = bounds.x as f32 + 0.5;
    let top = bounds.y as f32 + 0.5;
    let right = bounds.right() as f32 - 0.5;
    let bottom = bounds.bottom() as f32 - 0.5;
    let mid_x = (left + right) / 2.0;
    let mid_y = (top + bottom) / 2.0;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );
    write!(
        svg,
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="1"/>"#,
        left,
        top,
        (right - left).max(0.0),
        (bottom - top).max(0.0),
        stroke
    )
    .map_err(svg_error)?;

    let anchors = [
        (left, top),
        (mid_x, top),
        (right, top),
        (right, mid_y),
        (right, bottom),
        (mid_x, bottom),
        (left, bottom),
        (left, mid_y),
        (mid_x, top - style.rotate_anchor_offset as f32),
    ];
    for (cx, cy) in anchors {
        write!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" stroke="{}" stroke-width="1"/>"#,
            cx - size / 2.0,
            cy - size / 2.0,
            size,
            size,
            fill,
            stroke
        )
        .map_err(svg_error)?;
    }

    svg.push_str("</svg>");
    Ok(svg)
}

fn svg_error(e: std::fmt::Error) -> Error {
    Error::Svg(e.to_string())
}

/// Renders SVG markup at 1:1 scale onto a `width` x `height` image.
fn rasterize_svg(svg_data: &str, width: u32, height: u32) -> Result<RgbaImage> {
    let tree = Tree::from_str(svg_data, &Options::default())
        .map_err(|e| Error::Svg(e.to_string()))?;
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| Error::Svg(format!("cannot allocate {}x{} pixmap", width, height)))?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
    Ok(pixmap_to_rgba_image(&pixmap))
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());

    for (pixel, src) in img.pixels_mut().zip(pixmap.pixels()) {
        // tiny_skia uses premultiplied alpha, we need to unpremultiply
        let c = src.demultiply();
        *pixel = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }

    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::SizePx;

    fn render_around(bounds: Rect) -> RgbaImage {
        let mut ctx = RenderContext::new(SizePx::new(120, 120));
        ctx.set(AssetBounds(bounds));
        HandlesConfig::new(AssetId::default(), HandleStyle::default())
            .transform(&mut ctx)
            .unwrap();
        ctx.frame
    }

    #[test]
    fn border_is_drawn_in_stroke_colour() {
        let frame = render_around(Rect::new(30, 60, 40, 40));

        // Left edge, between the corner and middle anchors.
        let edge = frame.get_pixel(30, 70);
        assert!(edge[3] > 200, "border should be opaque, got {:?}", edge);
        assert!(edge[2] > edge[0], "border should be blue, got {:?}", edge);
    }

    #[test]
    fn anchors_are_filled() {
        let frame = render_around(Rect::new(30, 60, 40, 40));

        // Centre of the top-left anchor is white fill.
        let anchor = frame.get_pixel(30, 60);
        assert!(anchor.0.iter().all(|c| *c > 200), "got {:?}", anchor);

        // Rotation anchor sits above the top edge.
        let rotater = frame.get_pixel(50, 10);
        assert!(rotater[3] > 200, "got {:?}", rotater);
    }

    #[test]
    fn interior_and_far_pixels_untouched() {
        let frame = render_around(Rect::new(30, 60, 40, 40));
        assert_eq!(frame.get_pixel(50, 80).0, [0, 0, 0, 0]);
        assert_eq!(frame.get_pixel(110, 110).0, [0, 0, 0, 0]);
    }

    #[test]
    fn markup_has_border_and_nine_anchors() {
        let bounds = Rect::new(30, 60, 40, 40);
        let svg = handles_svg(&HandleStyle::default(), bounds, 120, 120).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<rect").count(), 10);
        assert_eq!(svg.matches(r#"fill="none""#).count(), 1);
    }

    #[test]
    fn nothing_drawn_without_asset_bounds() {
        let mut ctx = RenderContext::new(SizePx::new(16, 16));
        HandlesConfig::default().transform(&mut ctx).unwrap();
        assert!(ctx.frame.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn style_serializes_colours_as_hex() {
        let json = serde_json::to_string(&HandleStyle::default()).unwrap();
        assert!(json.contains("\"stroke\":\"#00a1ff\""));
        assert!(json.contains("\"anchorSize\":10"));
    }
}
