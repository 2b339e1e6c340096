//! The t-shirt editor: wires user input to the scene, stage and exporters.

use std::path::Path;

use image::RgbaImage;
use log::{info, warn};

use crate::bitmap::{Bitmap, BitmapSource, Rect};
use crate::color::ShirtColor;
use crate::compositor::recolor;
use crate::download::DownloadSink;
use crate::error::Result;
use crate::export::{ExportPipeline, PreviewSurface, Snapshotter, SurfaceSnapshot};
use crate::overlay::{OverlayController, PointerBus, PointerEvent, PointerKind};
use crate::scene::{AssetId, SceneState};
use crate::settings::EditorSettings;
use crate::stage::Stage;

// ============================================================================
// Editor
// ============================================================================

/// Main editor state.
///
/// `Editor` owns the scene and everything derived from it. Every mutating
/// call resynchronises the stage and the overlay; the stage itself only
/// redraws when a frame is requested.
///
/// # Example
///
/// ```
/// use image::{Rgba, RgbaImage};
/// use shirt_composer::{Bitmap, BitmapSource, Editor, EditorSettings, MemorySink};
///
/// let template = Bitmap::new(
///     BitmapSource::Path("tshirt.png".into()),
///     RgbaImage::from_pixel(600, 600, Rgba([255, 255, 255, 255])),
/// );
/// let mut editor = Editor::new(EditorSettings::default(), template);
///
/// editor.pick_color("#3a7bd5").unwrap();
///
/// let mut downloads = MemorySink::new();
/// editor.export_image(&mut downloads).unwrap();
/// assert!(downloads.get("tshirt-design.png").is_some());
/// ```
pub struct Editor {
    settings: EditorSettings,
    scene: SceneState,
    stage: Stage,
    overlay: OverlayController,
    exporter: ExportPipeline,
    color: ShirtColor,

    /// Last page position of an in-progress asset drag.
    drag_from: Option<(i32, i32)>,
}

impl Editor {
    /// Creates an editor around an already loaded template.
    ///
    /// The editing surface is assumed to sit at the page origin; see
    /// [`set_surface_bounds`](Self::set_surface_bounds).
    pub fn new(settings: EditorSettings, template: Bitmap) -> Self {
        let size = settings.stage;
        let stage = Stage::new(size.into(), settings.handles.clone());
        let overlay = OverlayController::new(
            Rect::from_size(size.width, size.height),
            settings.overlay_restore,
        );
        let exporter = ExportPipeline::new(&settings);

        let mut editor = Self {
            color: ShirtColor::WHITE,
            scene: SceneState::new(template),
            stage,
            overlay,
            exporter,
            settings,
            drag_from: None,
        };
        editor.refresh();
        editor
    }

    /// Loads the template from `settings.template_path` and applies the
    /// initial colour.
    pub fn open(settings: EditorSettings) -> Result<Self> {
        let template = BitmapSource::Path(settings.template_path.clone()).load()?;
        let initial = settings.initial_color;
        let mut editor = Self::new(settings, template);
        if initial != ShirtColor::WHITE {
            editor.set_color(initial)?;
        }
        Ok(editor)
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn shirt_color(&self) -> ShirtColor {
        self.color
    }

    /// Moves the surface container, in page coordinates.
    pub fn set_surface_bounds(&mut self, bounds: Rect) {
        self.overlay.set_surface(bounds);
    }

    // ---- Lifecycle ----

    /// Installs the outside-click listener.
    pub fn mount(&mut self, bus: &mut PointerBus) {
        self.overlay.mount(bus);
    }

    /// Removes the outside-click listener.
    pub fn unmount(&mut self, bus: &mut PointerBus) {
        self.overlay.unmount(bus);
    }

    // ---- Shirt colour ----

    /// Recolors the shirt from a picker hex value.
    pub fn pick_color(&mut self, hex: &str) -> Result<()> {
        let color = ShirtColor::from_hex(hex)?;
        self.set_color(color)
    }

    /// Recolors the shirt, always starting from the original template.
    ///
    /// On failure the current template stays on the stage.
    pub fn set_color(&mut self, color: ShirtColor) -> Result<()> {
        let tinted = recolor(self.scene.base_template(), color).inspect_err(|e| {
            warn!("recolor to {} failed: {}", color, e);
        })?;
        self.color = color;
        self.scene.set_template(tinted);
        self.refresh();
        Ok(())
    }

    // ---- Asset ----

    /// Uploads the selected file. With no file selected this does nothing.
    pub fn upload(&mut self, file: Option<&Path>) -> Result<Option<AssetId>> {
        let Some(path) = file else {
            return Ok(None);
        };
        let bitmap = Bitmap::read_file(path).inspect_err(|e| {
            warn!("upload of {} failed: {}", path.display(), e);
        })?;
        Ok(Some(self.place_upload(bitmap)))
    }

    /// Uploads raw image bytes.
    pub fn upload_bytes(&mut self, bytes: &[u8]) -> Result<AssetId> {
        let bitmap = Bitmap::from_bytes(bytes)?;
        Ok(self.place_upload(bitmap))
    }

    fn place_upload(&mut self, bitmap: Bitmap) -> AssetId {
        let id = self.scene.set_asset(bitmap);
        self.refresh();
        id
    }

    /// Selects the asset (or clears the selection with `None`).
    pub fn select(&mut self, target: Option<AssetId>) -> Result<()> {
        self.scene.select(target)?;
        self.refresh();
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.scene.deselect();
        self.refresh();
    }

    /// Drags the asset by a delta.
    pub fn move_asset(&mut self, dx: i32, dy: i32) -> bool {
        let moved = self.scene.move_asset(dx, dy);
        self.refresh();
        moved
    }

    /// Sets the asset's position and size, as the transform handles would.
    pub fn place_asset(&mut self, placement: Rect) -> bool {
        let placed = self.scene.place_asset(placement);
        self.refresh();
        placed
    }

    // ---- Pointer input ----

    /// Handles a page-level pointer event.
    ///
    /// Outside the surface, a pointer-down deselects (when mounted). On the
    /// surface, a pointer-down on the asset selects it and starts a drag that
    /// follows pointer moves until pointer-up.
    pub fn pointer(&mut self, bus: &PointerBus, event: PointerEvent) -> Result<()> {
        if self.overlay.handle_page_pointer(bus, &event, &mut self.scene) {
            self.drag_from = None;
            self.refresh();
            return Ok(());
        }

        match event.kind {
            PointerKind::Down if self.overlay.is_on_surface(event.x, event.y) => {
                let (sx, sy) = self.overlay.to_stage(event.x, event.y);
                let hit = self
                    .scene
                    .asset()
                    .filter(|a| a.placement.contains(sx, sy))
                    .map(|a| a.id);
                if let Some(id) = hit {
                    self.select(Some(id))?;
                    self.drag_from = Some((event.x, event.y));
                }
            }
            PointerKind::Move => {
                if let Some((px, py)) = self.drag_from {
                    self.move_asset(event.x.saturating_sub(px), event.y.saturating_sub(py));
                    self.drag_from = Some((event.x, event.y));
                }
            }
            PointerKind::Up => self.drag_from = None,
            PointerKind::Down => {}
        }
        Ok(())
    }

    // ---- Rendering ----

    /// Draws the stage as the user sees it, overlay included.
    pub fn render(&mut self) -> Result<&RgbaImage> {
        self.stage.draw()
    }

    fn refresh(&mut self) {
        self.stage.show_scene(&self.scene);
        self.overlay.sync(&self.scene, &mut self.stage);
    }

    /// Captures the stage with the overlay hidden.
    ///
    /// Visibility is restored before this returns, also on failure.
    fn capture(&mut self, snapshotter: &dyn Snapshotter) -> Result<Bitmap> {
        let result = {
            let suppressed = self.overlay.suppress(&mut self.scene);
            self.overlay.sync(&suppressed, &mut self.stage);
            snapshotter.capture(&mut self.stage)
        };
        self.refresh();
        if let Err(e) = &result {
            warn!("capture failed: {}", e);
        }
        result
    }

    // ---- Export ----

    /// Captures the design and opens the preview surface.
    pub fn open_preview(&mut self) -> Result<&PreviewSurface> {
        let region = self.exporter.region_snapshot();
        let snapshot = self.capture(&region)?;
        self.exporter.show_preview(snapshot);
        info!("preview opened");
        Ok(self.exporter.preview())
    }

    pub fn preview(&self) -> &PreviewSurface {
        self.exporter.preview()
    }

    pub fn close_preview(&mut self) {
        self.exporter.preview_mut().close();
    }

    /// Exports the stage's pixel buffer as `tshirt-design.png`.
    pub fn export_image(&mut self, sink: &mut dyn DownloadSink) -> Result<()> {
        let snapshot = self.capture(&SurfaceSnapshot)?;
        self.exporter.save_png(&snapshot, sink)
    }

    /// Exports a region snapshot as `tshirt-design.pdf`.
    pub fn export_pdf(&mut self, sink: &mut dyn DownloadSink) -> Result<()> {
        let region = self.exporter.region_snapshot();
        let snapshot = self.capture(&region)?;
        self.exporter.save_pdf(&snapshot, sink)
    }
}

// ============================================================================
// Tests
// ============================================================================
