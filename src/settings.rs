//! Editor settings, loadable from JSON.
//!
//! Every field has a default, so an empty object (`{}`) is a complete
//! configuration.
//!
//! # Example
//!
//! ```
//! use shirt_composer::{EditorSettings, OverlayRestore};
//!
//! let settings = EditorSettings::from_json(r#"{ "overlayRestore": "visible" }"#).unwrap();
//! assert_eq!(settings.overlay_restore, OverlayRestore::Visible);
//! assert_eq!(settings.png_filename, "tshirt-design.png");
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bitmap::SizePx;
use crate::color::ShirtColor;
use crate::error::Result;
use crate::layer::HandleStyle;
use crate::layer::handles::hex;

// ============================================================================
// Nested settings
// ============================================================================

/// Pixel size of the editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct StageSize {
    pub width: u32,
    pub height: u32,
}

impl Default for StageSize {
    fn default() -> Self {
        Self {
            width: 600,
            height: 600,
        }
    }
}

impl From<StageSize> for SizePx {
    fn from(size: StageSize) -> Self {
        SizePx::new(size.width, size.height)
    }
}

/// What overlay visibility becomes once a capture is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "kebab-case")]
pub enum OverlayRestore {
    /// Whatever it was before the capture.
    #[default]
    Previous,
    /// Always visible, even if it was hidden before.
    Visible,
}

/// How region snapshots (preview and PDF) are taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct RegionSnapshotSettings {
    /// Device pixel ratio applied to the captured region.
    pub scale: f32,

    /// Container background the stage is flattened onto.
    #[serde(with = "hex")]
    #[cfg_attr(feature = "jsonschema", schemars(with = "String"))]
    pub background: ShirtColor,
}

impl Default for RegionSnapshotSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            background: ShirtColor::WHITE,
        }
    }
}

/// Page layout of the exported PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum PdfPage {
    /// Page sized to the snapshot; the image covers it edge to edge.
    #[default]
    FitSnapshot,
    /// A4 portrait, image at the top-left corner at its natural size.
    A4,
}

// ============================================================================
// EditorSettings
// ============================================================================

/// Top-level editor configuration.
///
/// # JSON Format
///
/// ```json
/// {
///   "stage": { "width": 600, "height": 600 },
///   "templatePath": "tshirt.png",
///   "initialColor": "#ffffff",
///   "pngFilename": "tshirt-design.png",
///   "pdfFilename": "tshirt-design.pdf",
///   "previewHeight": 600,
///   "overlayRestore": "previous",
///   "regionSnapshot": { "scale": 1.0, "background": "#ffffff" },
///   "pdfPage": "fitSnapshot",
///   "handles": { "anchorSize": 10, "stroke": "#00a1ff", "fill": "#ffffff", "rotateAnchorOffset": 50 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    pub stage: StageSize,

    /// Default shirt template loaded at start-up.
    pub template_path: PathBuf,

    /// Shirt colour before the first pick.
    #[serde(with = "hex")]
    #[cfg_attr(feature = "jsonschema", schemars(with = "String"))]
    pub initial_color: ShirtColor,

    pub png_filename: String,
    pub pdf_filename: String,

    /// Display height of the preview surface, in pixels.
    pub preview_height: u32,

    pub overlay_restore: OverlayRestore,
    pub region_snapshot: RegionSnapshotSettings,
    pub pdf_page: PdfPage,
    pub handles: HandleStyle,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            stage: StageSize::default(),
            template_path: PathBuf::from("tshirt.png"),
            initial_color: ShirtColor::WHITE,
            png_filename: "tshirt-design.png".into(),
            pdf_filename: "tshirt-design.pdf".into(),
            preview_height: 600,
            overlay_restore: OverlayRestore::default(),
            region_snapshot: RegionSnapshotSettings::default(),
            pdf_page: PdfPage::default(),
            handles: HandleStyle::default(),
        }
    }
}

impl EditorSettings {
    /// Serializes the settings to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserializes settings from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_is_all_defaults() {
        let settings = EditorSettings::from_json("{}").unwrap();
        assert_eq!(settings, EditorSettings::default());
        assert_eq!(settings.stage, StageSize { width: 600, height: 600 });
        assert_eq!(settings.pdf_filename, "tshirt-design.pdf");
        assert_eq!(settings.template_path, PathBuf::from("tshirt.png"));
    }

    #[test]
    fn json_uses_camel_case() {
        let json = EditorSettings::default().to_json_pretty().unwrap();
        assert!(json.contains("\"templatePath\""));
        assert!(json.contains("\"overlayRestore\": \"previous\""));
        assert!(json.contains("\"pdfPage\": \"fitSnapshot\""));
        assert!(json.contains("\"initialColor\": \"#ffffff\""));
    }

    #[test]
    fn partial_nested_settings_keep_defaults() {
        let settings = EditorSettings::from_json(
            r##"{ "regionSnapshot": { "scale": 2.0 }, "handles": { "stroke": "#FF0000" } }"##,
        )
        .unwrap();

        assert_eq!(settings.region_snapshot.scale, 2.0);
        assert_eq!(settings.region_snapshot.background, ShirtColor::WHITE);
        assert_eq!(settings.handles.stroke, ShirtColor::new(255, 0, 0));
        assert_eq!(settings.handles.anchor_size, 10);
    }

    #[test]
    fn bad_colour_is_a_settings_error() {
        let err = EditorSettings::from_json(r#"{ "initialColor": "blue" }"#).unwrap_err();
        assert!(matches!(err, Error::Settings(_)));
    }

    #[test]
    fn settings_roundtrip() {
        let mut settings = EditorSettings::default();
        settings.overlay_restore = OverlayRestore::Visible;
        settings.pdf_page = PdfPage::A4;

        let restored = EditorSettings::from_json(&settings.to_json_pretty().unwrap()).unwrap();
        assert_eq!(restored, settings);
    }
}
