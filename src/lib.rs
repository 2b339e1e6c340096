//! shirt-composer: t-shirt design compositing library
//!
//! This crate recolors a shirt template, lets a user place an uploaded image
//! on it with a selection overlay, and exports the result as PNG or PDF
//! with the overlay kept out of the exported pixels.
//!
//! # Example
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use shirt_composer::{
//!     Bitmap, BitmapSource, Editor, EditorSettings, MemorySink, PointerBus, encode_png,
//! };
//!
//! let template = Bitmap::new(
//!     BitmapSource::Path("tshirt.png".into()),
//!     RgbaImage::from_pixel(600, 600, Rgba([255, 255, 255, 255])),
//! );
//! let mut bus = PointerBus::new();
//! let mut editor = Editor::new(EditorSettings::default(), template);
//! editor.mount(&mut bus);
//!
//! // Tint the shirt and drop a logo on it.
//! editor.pick_color("#1e90ff").unwrap();
//! let logo = encode_png(&RgbaImage::from_pixel(80, 80, Rgba([0, 0, 0, 255]))).unwrap();
//! let id = editor.upload_bytes(&logo).unwrap();
//! editor.select(Some(id)).unwrap();
//! editor.move_asset(200, 150);
//!
//! // Exports never contain the selection handles.
//! let mut downloads = MemorySink::new();
//! editor.export_image(&mut downloads).unwrap();
//! editor.export_pdf(&mut downloads).unwrap();
//! assert_eq!(downloads.save_count(), 2);
//!
//! editor.unmount(&mut bus);
//! ```
//!
//! # Recoloring on its own
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use shirt_composer::{Bitmap, ShirtColor, recolor};
//!
//! let base = Bitmap::from_pixels(RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]))).unwrap();
//! let red = recolor(&base, ShirtColor::new(255, 0, 0)).unwrap();
//! assert_eq!(red.pixels().get_pixel(0, 0).0, [255, 0, 0, 255]);
//! ```

mod bitmap;
mod color;
mod composite;
mod compositor;
mod download;
mod editor;
mod error;
mod export;
mod layer;
mod overlay;
mod scene;
mod settings;
mod stage;

#[cfg(feature = "canvas")]
mod canvas;

pub use bitmap::{Bitmap, BitmapSource, Rect, SizePx, decode_data_uri, encode_data_uri, encode_png};
#[cfg(feature = "canvas")]
pub use canvas::EditorCanvas;
pub use color::ShirtColor;
pub use composite::CompositeOp;
pub use compositor::{recolor, recolor_source};
pub use download::{DirectorySink, DownloadSink, MemorySink};
pub use editor::Editor;
pub use error::{Error, Result};
pub use export::{
    ExportPipeline, PreviewSurface, RegionSnapshot, Snapshotter, SurfaceSnapshot, build_pdf,
};
pub use layer::{
    AssetBounds, AssetConfig, CacheKey, HandleStyle, HandlesConfig, Layer, LayerConfig,
    LayerPipeline, LayerVersions, RenderContext, TemplateConfig,
};
pub use overlay::{
    ListenerId, OverlayController, OverlaySuppression, PointerBus, PointerEvent, PointerKind,
};
pub use scene::{Asset, AssetId, SceneState};
pub use settings::{EditorSettings, OverlayRestore, PdfPage, RegionSnapshotSettings, StageSize};
pub use stage::Stage;
