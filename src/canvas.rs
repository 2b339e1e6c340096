//! HTML Canvas bindings for WASM environments.
//!
//! This module provides [`EditorCanvas`], a wrapper around [`Editor`] that
//! draws the stage into an HTML canvas element and forwards page pointer
//! events to it.
//!
//! # Feature Flag
//!
//! This module is only available with the `canvas` feature enabled:
//!
//! ```toml
//! [dependencies]
//! shirt-composer = { version = "0.1", features = ["canvas"] }
//! ```
//!
//! # Example (JavaScript/TypeScript)
//!
//! ```javascript
//! import init, { EditorCanvas } from 'shirt-composer';
//!
//! await init();
//!
//! const canvas = document.getElementById('stage');
//! const editor = EditorCanvas.fromTemplatePng(templatePng, settingsJson);
//!
//! picker.oninput = (e) => { editor.setShirtColor(e.target.value); editor.renderToCanvas(canvas); };
//! document.onpointerdown = (e) => { editor.pointerDown(e.pageX, e.pageY); editor.renderToCanvas(canvas); };
//!
//! const png = editor.exportPng();
//! ```

use wasm_bindgen::Clamped;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use crate::bitmap::{Bitmap, Rect};
use crate::download::MemorySink;
use crate::editor::Editor;
use crate::overlay::{PointerBus, PointerEvent};
use crate::settings::EditorSettings;

fn js_error(e: crate::error::Error) -> JsError {
    JsError::new(&e.to_string())
}

// ============================================================================
// EditorCanvas
// ============================================================================

/// An [`Editor`] exposed to JavaScript via wasm-bindgen.
///
/// The page-level pointer listener is installed on construction and removed
/// by [`teardown`](Self::teardown).
#[wasm_bindgen]
pub struct EditorCanvas {
    editor: Editor,
    bus: PointerBus,
}

#[wasm_bindgen]
impl EditorCanvas {
    /// Creates an editor from the template's PNG bytes.
    ///
    /// # Arguments
    ///
    /// * `png_data` - The raw PNG bytes of the shirt template
    /// * `settings_json` - Editor settings as JSON, or `null` for defaults
    #[wasm_bindgen(js_name = "fromTemplatePng")]
    pub fn from_template_png(
        png_data: &[u8],
        settings_json: Option<String>,
    ) -> Result<EditorCanvas, JsError> {
        let settings = match settings_json {
            Some(json) => EditorSettings::from_json(&json).map_err(js_error)?,
            None => EditorSettings::default(),
        };
        let template = Bitmap::from_bytes(png_data).map_err(js_error)?;

        let mut bus = PointerBus::new();
        let mut editor = Editor::new(settings, template);
        editor.mount(&mut bus);
        Ok(Self { editor, bus })
    }

    /// Moves the surface container, in page coordinates.
    #[wasm_bindgen(js_name = "setSurfaceBounds")]
    pub fn set_surface_bounds(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.editor.set_surface_bounds(Rect::new(x, y, width, height));
    }

    // ---- Editing ----

    /// Recolors the shirt from a `#rrggbb` picker value.
    #[wasm_bindgen(js_name = "setShirtColor")]
    pub fn set_shirt_color(&mut self, hex: &str) -> Result<(), JsError> {
        self.editor.pick_color(hex).map_err(js_error)
    }

    /// Uploads an image file's bytes and returns the new asset's id.
    #[wasm_bindgen(js_name = "uploadAsset")]
    pub fn upload_asset(&mut self, bytes: &[u8]) -> Result<f64, JsError> {
        let id = self.editor.upload_bytes(bytes).map_err(js_error)?;
        Ok(id.get() as f64)
    }

    pub fn deselect(&mut self) {
        self.editor.deselect();
    }

    #[wasm_bindgen(js_name = "pointerDown")]
    pub fn pointer_down(&mut self, x: i32, y: i32) -> Result<(), JsError> {
        self.editor
            .pointer(&self.bus, PointerEvent::down(x, y))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = "pointerMove")]
    pub fn pointer_move(&mut self, x: i32, y: i32) -> Result<(), JsError> {
        self.editor
            .pointer(&self.bus, PointerEvent::moved(x, y))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = "pointerUp")]
    pub fn pointer_up(&mut self, x: i32, y: i32) -> Result<(), JsError> {
        self.editor
            .pointer(&self.bus, PointerEvent::up(x, y))
            .map_err(js_error)
    }

    // ---- Rendering ----

    /// Draws the stage into a canvas element, resizing it to the stage.
    #[wasm_bindgen(js_name = "renderToCanvas")]
    pub fn render_to_canvas(&mut self, canvas: &HtmlCanvasElement) -> Result<(), JsError> {
        let frame = self.editor.render().map_err(js_error)?;
        let (width, height) = frame.dimensions();

        canvas.set_width(width);
        canvas.set_height(height);

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .map_err(|_| JsError::new("Failed to get 2d context"))?
            .ok_or_else(|| JsError::new("Canvas 2d context is null"))?
            .dyn_into()
            .map_err(|_| JsError::new("Failed to cast to CanvasRenderingContext2d"))?;

        let raw_pixels = frame.as_raw().as_slice();
        let image_data =
            ImageData::new_with_u8_clamped_array_and_sh(Clamped(raw_pixels), width, height)
                .map_err(|_| JsError::new("Failed to create ImageData"))?;

        ctx.put_image_data(&image_data, 0.0, 0.0)
            .map_err(|_| JsError::new("Failed to put image data"))?;

        Ok(())
    }

    // ---- Export ----

    /// Captures a preview and returns it as a PNG `data:` URI.
    #[wasm_bindgen(js_name = "previewDataUri")]
    pub fn preview_data_uri(&mut self) -> Result<String, JsError> {
        let preview = self.editor.open_preview().map_err(js_error)?;
        let snapshot = preview
            .snapshot()
            .ok_or_else(|| JsError::new("Preview has no snapshot"))?;
        let png = snapshot.to_png().map_err(js_error)?;
        Ok(crate::bitmap::encode_data_uri("image/png", &png))
    }

    #[wasm_bindgen(js_name = "closePreview")]
    pub fn close_preview(&mut self) {
        self.editor.close_preview();
    }

    /// Exports the design as PNG bytes.
    #[wasm_bindgen(js_name = "exportPng")]
    pub fn export_png(&mut self) -> Result<Vec<u8>, JsError> {
        let mut sink = MemorySink::new();
        self.editor.export_image(&mut sink).map_err(js_error)?;
        let filename = self.editor.settings().png_filename.clone();
        sink.take(&filename)
            .ok_or_else(|| JsError::new("PNG export produced no file"))
    }

    /// Exports the design as PDF bytes.
    #[wasm_bindgen(js_name = "exportPdf")]
    pub fn export_pdf(&mut self) -> Result<Vec<u8>, JsError> {
        let mut sink = MemorySink::new();
        self.editor.export_pdf(&mut sink).map_err(js_error)?;
        let filename = self.editor.settings().pdf_filename.clone();
        sink.take(&filename)
            .ok_or_else(|| JsError::new("PDF export produced no file"))
    }

    /// Removes the page-level pointer listener.
    pub fn teardown(&mut self) {
        self.editor.unmount(&mut self.bus);
    }
}
