//! The editing surface.
//!
//! [`Stage`] feeds the scene into the layer pipeline and keeps the last
//! drawn frame. Redraws are batched: mutations only mark the stage dirty via
//! [`Stage::request_redraw`], and the next [`Stage::draw`] renders once no
//! matter how many requests piled up in between.

use image::RgbaImage;
use log::debug;

use crate::bitmap::SizePx;
use crate::error::Result;
use crate::layer::{AssetConfig, HandleStyle, HandlesConfig, LayerPipeline, TemplateConfig};
use crate::scene::{AssetId, SceneState};

pub struct Stage {
    size: SizePx,
    pipeline: LayerPipeline,
    handle_style: HandleStyle,
    needs_draw: bool,
    frame: Option<RgbaImage>,
    draw_count: u64,
}

impl Stage {
    pub fn new(size: SizePx, handle_style: HandleStyle) -> Self {
        Self {
            size,
            pipeline: LayerPipeline::default(),
            handle_style,
            needs_draw: true,
            frame: None,
            draw_count: 0,
        }
    }

    /// Pixel size of the surface buffer.
    pub fn size(&self) -> SizePx {
        self.size
    }

    /// Pushes the scene's template and asset into the pipeline.
    ///
    /// Returns true if anything visible changed.
    pub fn show_scene(&mut self, scene: &SceneState) -> bool {
        let template_changed = self
            .pipeline
            .template
            .set_config(Some(TemplateConfig::new(scene.template().clone())));

        let asset = scene
            .asset()
            .map(|a| AssetConfig::new(a.bitmap.clone(), a.placement));
        let asset_changed = self.pipeline.asset.set_config(asset);

        let changed = template_changed || asset_changed;
        if changed {
            self.request_redraw();
        }
        changed
    }

    /// Attaches the transform overlay to `target`, or detaches it.
    pub fn attach_overlay(&mut self, target: Option<AssetId>) -> bool {
        let config = target.map(|id| HandlesConfig::new(id, self.handle_style.clone()));
        self.pipeline.handles.set_config(config)
    }

    /// Returns the asset the overlay is attached to.
    pub fn overlay_target(&self) -> Option<AssetId> {
        self.pipeline.handles.config().map(|c| c.target)
    }

    /// Shows or hides the overlay without detaching it.
    pub fn set_overlay_visible(&mut self, visible: bool) -> bool {
        self.pipeline.handles.set_enabled(visible)
    }

    /// Returns true if handles would appear in the next frame.
    pub fn overlay_drawn(&self) -> bool {
        self.pipeline.handles.is_active()
    }

    /// Marks the stage for redraw on the next [`draw`](Self::draw).
    pub fn request_redraw(&mut self) {
        self.needs_draw = true;
    }

    pub fn needs_draw(&self) -> bool {
        self.needs_draw
    }

    /// Brings the frame up to date and returns it.
    ///
    /// When this returns, the frame reflects every change made so far; it
    /// is the render-complete point captures wait on.
    pub fn draw(&mut self) -> Result<&RgbaImage> {
        let frame = match self.frame.take() {
            Some(frame) if !self.needs_draw => frame,
            _ => {
                self.draw_count += 1;
                debug!("stage draw #{}", self.draw_count);
                self.pipeline.render(self.size)?
            }
        };
        self.needs_draw = false;
        Ok(&*self.frame.insert(frame))
    }

    /// The last drawn frame, possibly stale.
    pub fn frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    /// Number of times the pipeline has been asked to render.
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }
}
