//! Scene state: the one template, the optional asset, the selection and the
//! overlay visibility flag.

use std::fmt;

use log::{debug, info};

use crate::bitmap::{Bitmap, Rect};
use crate::error::{Error, Result};

/// Stable handle of an uploaded asset.
///
/// Every upload gets a fresh id, so a selection that survived a re-upload
/// can be recognised as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The uploaded image and where it sits on the stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: AssetId,
    pub bitmap: Bitmap,
    pub placement: Rect,
}

/// Everything the stage shows, owned in one place.
#[derive(Debug, Clone)]
pub struct SceneState {
    base_template: Bitmap,
    template: Bitmap,
    asset: Option<Asset>,
    selection: Option<AssetId>,
    overlay_visible: bool,
    next_asset_id: u64,
}

impl SceneState {
    /// Creates a scene around the original template bitmap.
    pub fn new(template: Bitmap) -> Self {
        Self {
            base_template: template.clone(),
            template,
            asset: None,
            selection: None,
            overlay_visible: true,
            next_asset_id: 1,
        }
    }

    /// The template as originally loaded; recoloring always starts here.
    pub fn base_template(&self) -> &Bitmap {
        &self.base_template
    }

    /// The template currently displayed.
    pub fn template(&self) -> &Bitmap {
        &self.template
    }

    pub fn asset(&self) -> Option<&Asset> {
        self.asset.as_ref()
    }

    pub fn selection(&self) -> Option<AssetId> {
        self.selection
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Replaces the displayed template.
    pub fn set_template(&mut self, template: Bitmap) {
        debug!("template replaced ({:?})", template.dimensions());
        self.template = template;
    }

    /// Replaces the uploaded asset and returns its new handle.
    ///
    /// The asset starts at the stage origin at its natural size. A selection
    /// of the previous asset is dropped.
    pub fn set_asset(&mut self, bitmap: Bitmap) -> AssetId {
        let id = AssetId(self.next_asset_id);
        self.next_asset_id += 1;

        let size = bitmap.dimensions();
        self.asset = Some(Asset {
            id,
            bitmap,
            placement: Rect::from_size(size.width, size.height),
        });

        self.selection = None;

        info!("asset {} uploaded ({}x{})", id, size.width, size.height);
        id
    }

    /// Sets or clears the selection.
    ///
    /// Selecting an asset forces the overlay visible. Only the current asset
    /// can be selected.
    pub fn select(&mut self, target: Option<AssetId>) -> Result<()> {
        match target {
            Some(id) => {
                if self.asset.as_ref().map(|a| a.id) != Some(id) {
                    return Err(Error::UnknownAsset(id.get()));
                }
                self.selection = Some(id);
                self.overlay_visible = true;
            }
            None => self.selection = None,
        }
        Ok(())
    }

    /// Clears the selection and hides the overlay.
    pub fn deselect(&mut self) {
        self.selection = None;
        self.overlay_visible = false;
    }

    /// Moves the asset by a drag delta. Returns false if there is no asset.
    pub fn move_asset(&mut self, dx: i32, dy: i32) -> bool {
        match self.asset.as_mut() {
            Some(asset) => {
                asset.placement = asset.placement.translate(dx, dy);
                true
            }
            None => false,
        }
    }

    /// Sets the asset's position and display size, as a transform would.
    ///
    /// Width and height are clamped to at least one pixel.
    pub fn place_asset(&mut self, placement: Rect) -> bool {
        match self.asset.as_mut() {
            Some(asset) => {
                asset.placement = Rect::new(
                    placement.x,
                    placement.y,
                    placement.width.max(1),
                    placement.height.max(1),
                );
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_overlay_visible(&mut self, visible: bool) {
        self.overlay_visible = visible;
    }
}
