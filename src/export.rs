//! Snapshots, the preview surface and PNG/PDF export.
//!
//! Two kinds of snapshot exist. A [`SurfaceSnapshot`] serializes the stage's
//! own pixel buffer, exactly as drawn. A [`RegionSnapshot`] captures the
//! on-screen region around it the way a page screenshot would: flattened
//! onto the container background and scaled by the device pixel ratio.
//! Image export uses the former; preview and PDF use the latter.

use image::imageops::{self, FilterType};
use log::info;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::bitmap::{Bitmap, SizePx};
use crate::color::ShirtColor;
use crate::composite::flatten;
use crate::download::DownloadSink;
use crate::error::Result;
use crate::settings::{EditorSettings, PdfPage, RegionSnapshotSettings};
use crate::stage::Stage;

// ============================================================================
// Snapshots
// ============================================================================

/// Rasterizes the current stage into a standalone bitmap.
pub trait Snapshotter {
    /// Draws the stage if needed and captures the result.
    fn capture(&self, stage: &mut Stage) -> Result<Bitmap>;
}

/// The stage's own pixel buffer, transparency included.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceSnapshot;

impl Snapshotter for SurfaceSnapshot {
    fn capture(&self, stage: &mut Stage) -> Result<Bitmap> {
        let frame = stage.draw()?.clone();
        Bitmap::from_pixels(frame)
    }
}

/// A capture of the stage's on-screen region.
#[derive(Debug, Clone, Copy)]
pub struct RegionSnapshot {
    /// Device pixel ratio.
    pub scale: f32,
    /// Container background behind transparent stage pixels.
    pub background: ShirtColor,
}

impl RegionSnapshot {
    fn output_size(&self, size: SizePx) -> SizePx {
        let scale = |v: u32| ((v as f32 * self.scale).round() as u32).max(1);
        SizePx::new(scale(size.width), scale(size.height))
    }
}

impl From<RegionSnapshotSettings> for RegionSnapshot {
    fn from(settings: RegionSnapshotSettings) -> Self {
        Self {
            scale: settings.scale,
            background: settings.background,
        }
    }
}

impl Snapshotter for RegionSnapshot {
    fn capture(&self, stage: &mut Stage) -> Result<Bitmap> {
        let size = stage.size();
        let flat = flatten(stage.draw()?, self.background.to_rgba());

        let out = self.output_size(size);
        let pixels = if out == size {
            flat
        } else {
            imageops::resize(&flat, out.width, out.height, FilterType::Triangle)
        };
        Bitmap::from_pixels(pixels)
    }
}

// ============================================================================
// Preview Surface
// ============================================================================

/// The in-app preview of the design.
#[derive(Debug, Clone)]
pub struct PreviewSurface {
    snapshot: Option<Bitmap>,
    open: bool,
    display_height: u32,
}

impl PreviewSurface {
    pub fn new(display_height: u32) -> Self {
        Self {
            snapshot: None,
            open: false,
            display_height,
        }
    }

    /// Shows a new snapshot, replacing the previous one.
    pub fn open(&mut self, snapshot: Bitmap) {
        self.snapshot = Some(snapshot);
        self.open = true;
    }

    /// Hides the preview. The last snapshot is kept until replaced.
    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn snapshot(&self) -> Option<&Bitmap> {
        self.snapshot.as_ref()
    }

    /// On-screen size: fixed height, width following the aspect ratio.
    pub fn display_size(&self) -> Option<SizePx> {
        let size = self.snapshot.as_ref()?.dimensions();
        if size.height == 0 {
            return Some(SizePx::new(0, self.display_height));
        }
        let width = (size.width as u64 * self.display_height as u64 / size.height as u64) as u32;
        Some(SizePx::new(width, self.display_height))
    }
}

// ============================================================================
// Export Pipeline
// ============================================================================

/// Turns snapshots into downloads and previews.
pub struct ExportPipeline {
    png_filename: String,
    pdf_filename: String,
    pdf_page: PdfPage,
    region: RegionSnapshot,
    preview: PreviewSurface,
}

impl ExportPipeline {
    pub fn new(settings: &EditorSettings) -> Self {
        Self {
            png_filename: settings.png_filename.clone(),
            pdf_filename: settings.pdf_filename.clone(),
            pdf_page: settings.pdf_page,
            region: settings.region_snapshot.into(),
            preview: PreviewSurface::new(settings.preview_height),
        }
    }

    /// Snapshotter used for preview and PDF.
    pub fn region_snapshot(&self) -> RegionSnapshot {
        self.region
    }

    pub fn preview(&self) -> &PreviewSurface {
        &self.preview
    }

    pub fn preview_mut(&mut self) -> &mut PreviewSurface {
        &mut self.preview
    }

    /// Saves a snapshot as the PNG download.
    pub fn save_png(&self, snapshot: &Bitmap, sink: &mut dyn DownloadSink) -> Result<()> {
        let png = snapshot.to_png()?;
        sink.save(&self.png_filename, &png)?;
        info!("exported {} ({} bytes)", self.png_filename, png.len());
        Ok(())
    }

    /// Saves a snapshot as a single-page PDF download.
    pub fn save_pdf(&self, snapshot: &Bitmap, sink: &mut dyn DownloadSink) -> Result<()> {
        let pdf = build_pdf(snapshot, self.pdf_page)?;
        sink.save(&self.pdf_filename, &pdf)?;
        info!("exported {} ({} bytes)", self.pdf_filename, pdf.len());
        Ok(())
    }

    /// Opens the preview surface on a snapshot.
    pub fn show_preview(&mut self, snapshot: Bitmap) {
        self.preview.open(snapshot);
    }
}

// ============================================================================
// PDF
// ============================================================================

/// CSS pixels to PDF points.
const PT_PER_PX: f32 = 0.75;

/// A4 portrait in points.
const A4_PT: (i64, i64) = (595, 842);

fn int(v: i64) -> Object {
    Object::Integer(v)
}

/// Builds a one-page PDF showing `snapshot` from the page's top-left corner.
///
/// The image is embedded as an RGB XObject with its alpha channel as a soft
/// mask when it is not fully opaque.
pub fn build_pdf(snapshot: &Bitmap, page: PdfPage) -> Result<Vec<u8>> {
    let pixels = snapshot.pixels();
    let (width, height) = pixels.dimensions();
    let image_w = (width as f32 * PT_PER_PX).round() as i64;
    let image_h = (height as f32 * PT_PER_PX).round() as i64;
    let (page_w, page_h) = match page {
        PdfPage::FitSnapshot => (image_w, image_h),
        PdfPage::A4 => A4_PT,
    };

    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let rgb: Vec<u8> = pixels.pixels().flat_map(|p| [p[0], p[1], p[2]]).collect();
    let alpha: Vec<u8> = pixels.pixels().map(|p| p[3]).collect();

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => int(width as i64),
        "Height" => int(height as i64),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => int(8),
    };
    if alpha.iter().any(|a| *a != 255) {
        let mask_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => int(width as i64),
            "Height" => int(height as i64),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => int(8),
        };
        let mask_id = doc.add_object(Stream::new(mask_dict, alpha));
        image_dict.set("SMask", mask_id);
    }
    let image_id = doc.add_object(Stream::new(image_dict, rgb));

    // PDF space starts bottom-left; place the image against the top edge.
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    int(image_w),
                    int(0),
                    int(0),
                    int(image_h),
                    int(0),
                    int(page_h - image_h),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "MediaBox" => vec![int(0), int(0), int(page_w), int(page_h)],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => int(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
