//! Uploaded asset layer.

use image::imageops::{self, FilterType};

use super::{
    AssetBounds, DependencyVersion, LayerConfig, LayerEffect, LayerVersions, RenderContext,
};
use crate::bitmap::{Bitmap, Rect};
use crate::composite::composite_over;
use crate::error::Result;

/// The uploaded image drawn at its current placement.
///
/// # Emitted Properties
///
/// - [`AssetBounds`]: the placement rectangle, for the transform handles.
#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub bitmap: Bitmap,

    /// Position and display size on the stage. A size different from the
    /// bitmap's natural size scales the asset.
    pub placement: Rect,
}

impl AssetConfig {
    pub fn new(bitmap: Bitmap, placement: Rect) -> Self {
        Self { bitmap, placement }
    }
}

impl LayerConfig for AssetConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self.placement != other.placement
            || (!self.bitmap.same_pixels(&other.bitmap) && self.bitmap != other.bitmap)
    }
}

impl LayerEffect for AssetConfig {
    /// Drawn on top of the template.
    fn dependencies(versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::from_version(versions.template)
    }

    fn transform(&self, ctx: &mut RenderContext) -> Result<()> {
        let Rect { x, y, width, height } = self.placement;
        let (frame_w, frame_h) = ctx.frame.dimensions();
        let on_stage = self.placement.intersects(&Rect::from_size(frame_w, frame_h));
        if width == 0 || height == 0 || !on_stage {
            return Ok(());
        }

        let pixels = self.bitmap.pixels();
        if pixels.dimensions() == (width, height) {
            composite_over(&mut ctx.frame, pixels, x, y);
        } else {
            let scaled = imageops::resize(pixels, width, height, FilterType::Triangle);
            composite_over(&mut ctx.frame, &scaled, x, y);
        }
        Ok(())
    }

    fn emit(&self, ctx: &mut RenderContext) {
        ctx.set(AssetBounds(self.placement));
    }
}
