//! Shirt template layer: the background of the stage.

use image::imageops::{self, FilterType};

use super::{DependencyVersion, LayerConfig, LayerEffect, LayerVersions, RenderContext};
use crate::bitmap::Bitmap;
use crate::composite::composite_over;
use crate::error::Result;

/// The shirt template, stretched to cover the whole stage.
#[derive(Debug, Clone)]
pub struct TemplateConfig {
    pub bitmap: Bitmap,
}

impl TemplateConfig {
    pub fn new(bitmap: Bitmap) -> Self {
        Self { bitmap }
    }
}

impl LayerConfig for TemplateConfig {
    fn differs_from(&self, other: &Self) -> bool {
        !self.bitmap.same_pixels(&other.bitmap) && self.bitmap != other.bitmap
    }
}

impl LayerEffect for TemplateConfig {
    /// The template is the bottom of the stack.
    fn dependencies(_versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::NONE
    }

    fn transform(&self, ctx: &mut RenderContext) -> Result<()> {
        let (width, height) = ctx.frame.dimensions();
        let pixels = self.bitmap.pixels();

        if pixels.dimensions() == (width, height) {
            composite_over(&mut ctx.frame, pixels, 0, 0);
        } else {
            let stretched = imageops::resize(pixels, width, height, FilterType::Triangle);
            composite_over(&mut ctx.frame, &stretched, 0, 0);
        }
        Ok(())
    }
}
