//! Layer infrastructure for the editing stage.
//!
//! The stage is drawn by a fixed pipeline of layers. Each layer encapsulates
//! a configuration, an enabled state, version tracking for cache
//! invalidation, and a per-size frame cache.
//!
//! # Architecture
//!
//! Each layer config implements [`LayerEffect`], which defines:
//! - How the layer renders itself
//! - What properties it emits for downstream layers
//! - Which upstream layers its cached output depends on
//!
//! Properties flow through the pipeline via [`RenderContext`], enabling
//! layers to communicate without tight coupling. The asset layer, for
//! instance, publishes [`AssetBounds`] so the transform handles can be drawn
//! around it without knowing how the asset was placed.

pub mod asset;
pub mod handles;
pub mod template;

pub use asset::AssetConfig;
pub use handles::{HandleStyle, HandlesConfig};
pub use template::TemplateConfig;

use std::any::{Any, TypeId};
use std::collections::HashMap;

use image::RgbaImage;
use log::debug;

use crate::bitmap::{Rect, SizePx};
use crate::error::Result;

// ============================================================================
// Render Context
// ============================================================================

/// Context that flows through the rendering pipeline.
///
/// Layers can read properties set by upstream layers and emit new properties
/// for downstream layers to consume.
///
/// # Example
///
/// ```ignore
/// // Upstream layer emits a property
/// ctx.set(AssetBounds(rect));
///
/// // Downstream layer reads the property
/// if let Some(bounds) = ctx.get::<AssetBounds>() {
///     // Draw around it...
/// }
/// ```
pub struct RenderContext {
    /// The frame being built up, sized to the stage.
    pub frame: RgbaImage,

    /// Typed property bag for inter-layer communication.
    properties: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RenderContext {
    /// Creates a context with a transparent frame of the given size.
    pub fn new(size: SizePx) -> Self {
        Self {
            frame: RgbaImage::new(size.width, size.height),
            properties: HashMap::new(),
        }
    }

    /// Sets a typed property that downstream layers can read.
    pub fn set<T: Any + Send + Sync>(&mut self, value: T) {
        self.properties.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Gets a typed property set by an upstream layer.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.properties
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref())
    }
}

// ============================================================================
// Common Properties
// ============================================================================

/// Where the uploaded asset ended up on the stage.
///
/// Emitted by the asset layer, consumed by the transform handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetBounds(pub Rect);

// ============================================================================
// Layer Traits
// ============================================================================

/// Trait for layer configuration types.
///
/// Implementations must detect when a configuration meaningfully differs
/// from another, which drives cache invalidation.
pub trait LayerConfig: Clone {
    /// Returns true if this config differs from another in a way that
    /// would produce different rendering output.
    fn differs_from(&self, other: &Self) -> bool;
}

/// Trait for layer configurations that know how to apply themselves.
///
/// The separation of [`transform`](Self::transform) and [`emit`](Self::emit)
/// provides a canonical place for property emission; properties are not
/// cached, so `emit` runs on cache hits too.
pub trait LayerEffect: LayerConfig {
    /// Returns the dependency version for cache invalidation.
    ///
    /// Layers draw on top of the upstream frame, so they combine the
    /// versions of every layer below them. Root layers return
    /// `DependencyVersion::NONE`.
    fn dependencies(versions: &LayerVersions) -> DependencyVersion;

    /// Draws this layer into `ctx.frame`.
    fn transform(&self, ctx: &mut RenderContext) -> Result<()>;

    /// Emit properties for downstream layers to consume.
    ///
    /// The default implementation emits nothing.
    fn emit(&self, _ctx: &mut RenderContext) {}
}

// ============================================================================
// Layer Dependencies
// ============================================================================

/// Represents the combined version of upstream layer dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DependencyVersion(u64);

impl DependencyVersion {
    /// No dependencies (root layer).
    pub const NONE: Self = Self(0);

    /// Creates a dependency version from a single version number.
    pub fn from_version(version: u64) -> Self {
        Self(version)
    }

    /// Combines multiple upstream layer versions into one (order sensitive).
    pub fn combine(versions: &[u64]) -> Self {
        Self(versions.iter().fold(0u64, |acc, v| {
            acc.wrapping_mul(1_000_003).wrapping_add(*v)
        }))
    }
}

// ============================================================================
// Layer Versions
// ============================================================================

/// Snapshot of all layer versions in the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct LayerVersions {
    /// Version of the shirt template layer.
    pub template: u64,
    /// Version of the uploaded asset layer.
    pub asset: u64,
    /// Version of the transform handles layer.
    pub handles: u64,
}

// ============================================================================
// CacheKey
// ============================================================================

/// Key for cached frames: the stage size they were rendered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    width: u32,
    height: u32,
}

impl CacheKey {
    pub fn new(size: SizePx) -> Self {
        Self {
            width: size.width,
            height: size.height,
        }
    }
}

// ============================================================================
// Generic Layer
// ============================================================================

/// A generic layer with configuration, caching, and version tracking.
///
/// The layer tracks:
/// - Optional configuration of type `C`
/// - Whether the layer is enabled (can be toggled without losing config)
/// - A version number that increments on any state change
/// - A cache of rendered frames keyed by stage size
/// - The dependency version when each cache entry was stored
pub struct Layer<C: LayerConfig> {
    config: Option<C>,
    enabled: bool,
    version: u64,
    cache: HashMap<CacheKey, (RgbaImage, DependencyVersion)>,
}

impl<C: LayerConfig> Default for Layer<C> {
    fn default() -> Self {
        Self {
            config: None,
            enabled: true,
            version: 0,
            cache: HashMap::new(),
        }
    }
}

impl<C: LayerConfig> Layer<C> {
    /// Returns the current configuration, if any.
    pub fn config(&self) -> Option<&C> {
        self.config.as_ref()
    }

    /// Returns true if this layer is active (has config AND is enabled).
    pub fn is_active(&self) -> bool {
        self.enabled && self.config.is_some()
    }

    /// Sets whether the layer is enabled.
    ///
    /// Returns true if the enabled state changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.invalidate();
            true
        } else {
            false
        }
    }

    /// Returns the current version number.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets the configuration. Returns true if it changed.
    ///
    /// Clears the cache and increments version if the config differs.
    pub fn set_config(&mut self, config: Option<C>) -> bool {
        let differs = match (&self.config, &config) {
            (None, None) => false,
            (Some(_), None) | (None, Some(_)) => true,
            (Some(old), Some(new)) => old.differs_from(new),
        };

        if differs {
            self.config = config;
            self.invalidate();
            true
        } else {
            false
        }
    }

    /// Invalidates the cache and increments version.
    pub fn invalidate(&mut self) {
        self.version = self.version.wrapping_add(1);
        self.cache.clear();
    }

    /// Gets a cached frame if valid for the given key and dependency version.
    pub fn get_cached(&self, key: CacheKey, deps: DependencyVersion) -> Option<&RgbaImage> {
        self.cache
            .get(&key)
            .and_then(|(frame, stored)| (*stored == deps).then_some(frame))
    }

    /// Stores a frame in the cache with the current dependency version.
    pub fn store(&mut self, key: CacheKey, frame: RgbaImage, deps: DependencyVersion) {
        self.cache.insert(key, (frame, deps));
    }
}

impl<C: LayerEffect> Layer<C> {
    /// Apply this layer to the render context, using cache if valid.
    ///
    /// An inactive layer passes the context through unchanged. On a cache
    /// hit the frame is replaced from cache and properties are re-emitted.
    pub fn apply(
        &mut self,
        ctx: &mut RenderContext,
        key: CacheKey,
        versions: &LayerVersions,
    ) -> Result<()> {
        let Some(config) = self.config.as_ref().filter(|_| self.enabled) else {
            return Ok(());
        };

        let deps = C::dependencies(versions);

        if let Some(cached) = self.get_cached(key, deps) {
            ctx.frame = cached.clone();
            config.emit(ctx);
            return Ok(());
        }

        config.transform(ctx)?;
        config.emit(ctx);

        self.store(key, ctx.frame.clone(), deps);
        Ok(())
    }
}

// ============================================================================
// Composite Layer
// ============================================================================

/// A cache-only layer for the final composited frame.
#[derive(Default)]
pub struct CompositeLayer {
    cache: HashMap<CacheKey, (RgbaImage, DependencyVersion)>,
}

impl CompositeLayer {
    /// Gets a cached frame if valid for the given key and dependency version.
    pub fn get_cached(&self, key: CacheKey, deps: DependencyVersion) -> Option<&RgbaImage> {
        self.cache
            .get(&key)
            .and_then(|(frame, stored)| (*stored == deps).then_some(frame))
    }

    /// Stores a frame in the cache with the current dependency version.
    pub fn store(&mut self, key: CacheKey, frame: RgbaImage, deps: DependencyVersion) {
        self.cache.insert(key, (frame, deps));
    }
}

// ============================================================================
// Layer Pipeline
// ============================================================================

/// The stage's layers with their dependency relationships.
///
/// # Dependency Graph
///
/// ```text
/// Transparent stage
///     │
///     ▼
/// ┌──────────┐
/// │ Template │ ◄── No dependencies (root layer)
/// └────┬─────┘
///      │
///      ▼
/// ┌──────────┐
/// │  Asset   │ ◄── Depends on: Template
/// └────┬─────┘
///      │
///      ▼
/// ┌──────────┐
/// │ Handles  │ ◄── Depends on: Template + Asset (consumes AssetBounds)
/// └────┬─────┘
///      │
///      ▼
/// ┌─────────────┐
/// │  Composite  │ ◄── Depends on: all layers
/// └─────────────┘
/// ```
#[derive(Default)]
pub struct LayerPipeline {
    /// Shirt template stretched over the stage.
    pub template: Layer<TemplateConfig>,

    /// The uploaded asset at its placement.
    pub asset: Layer<AssetConfig>,

    /// Transform overlay. Disabling it hides the handles but keeps the target.
    pub handles: Layer<HandlesConfig>,

    /// Composite cache (depends on all layers).
    pub composite: CompositeLayer,
}

impl LayerPipeline {
    /// Returns a snapshot of all layer versions.
    pub fn layer_versions(&self) -> LayerVersions {
        LayerVersions {
            template: self.template.version(),
            asset: self.asset.version(),
            handles: self.handles.version(),
        }
    }

    fn composite_dependencies(&self) -> DependencyVersion {
        DependencyVersion::combine(&[
            self.template.version(),
            self.asset.version(),
            self.handles.version(),
        ])
    }

    /// Renders a frame of the given size through the full pipeline.
    ///
    /// The composite cache is checked first; otherwise each layer is applied
    /// in order and the result is cached.
    pub fn render(&mut self, size: SizePx) -> Result<RgbaImage> {
        let key = CacheKey::new(size);
        let composite_deps = self.composite_dependencies();

        if let Some(cached) = self.composite.get_cached(key, composite_deps) {
            debug!("stage frame served from composite cache");
            return Ok(cached.clone());
        }

        let mut ctx = RenderContext::new(size);

        let versions = self.layer_versions();
        self.template.apply(&mut ctx, key, &versions)?;
        self.asset.apply(&mut ctx, key, &versions)?;
        self.handles.apply(&mut ctx, key, &versions)?;

        self.composite.store(key, ctx.frame.clone(), composite_deps);

        Ok(ctx.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{Bitmap, BitmapSource};
    use image::Rgba;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> Bitmap {
        Bitmap::new(
            BitmapSource::Path("fixture.png".into()),
            RgbaImage::from_pixel(w, h, Rgba(rgba)),
        )
    }

    #[test]
    fn layer_generic_set_config() {
        let mut layer: Layer<TemplateConfig> = Layer::default();

        assert!(layer.config().is_none());
        assert!(!layer.is_active());
        assert_eq!(layer.version(), 0);

        let bitmap = solid(2, 2, [255, 0, 0, 255]);
        assert!(layer.set_config(Some(TemplateConfig::new(bitmap.clone()))));
        assert!(layer.is_active());
        assert_eq!(layer.version(), 1);

        // Same bitmap: no change.
        assert!(!layer.set_config(Some(TemplateConfig::new(bitmap))));
        assert_eq!(layer.version(), 1);

        // Different bitmap: change.
        assert!(layer.set_config(Some(TemplateConfig::new(solid(2, 2, [0, 0, 255, 255])))));
        assert_eq!(layer.version(), 2);
    }

    #[test]
    fn layer_toggle_without_losing_config() {
        let mut layer: Layer<HandlesConfig> = Layer::default();
        layer.set_config(Some(HandlesConfig::default()));
        assert!(layer.is_active());

        assert!(layer.set_enabled(false));
        assert!(!layer.is_active());
        assert!(layer.config().is_some());
        assert_eq!(layer.version(), 2);

        assert!(!layer.set_enabled(false));
        assert_eq!(layer.version(), 2);
    }

    #[test]
    fn empty_pipeline_renders_transparent_frame() {
        let mut pipeline = LayerPipeline::default();
        let frame = pipeline.render(SizePx::new(8, 8)).unwrap();
        assert_eq!(frame.dimensions(), (8, 8));
        assert_eq!(frame.get_pixel(3, 3).0, [0, 0, 0, 0]);
    }

    #[test]
    fn template_change_invalidates_composite() {
        let mut pipeline = LayerPipeline::default();
        let size = SizePx::new(4, 4);

        pipeline
            .template
            .set_config(Some(TemplateConfig::new(solid(4, 4, [255, 0, 0, 255]))));
        let first = pipeline.render(size).unwrap();

        pipeline
            .template
            .set_config(Some(TemplateConfig::new(solid(4, 4, [0, 255, 0, 255]))));
        let second = pipeline.render(size).unwrap();

        assert_eq!(first.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(second.get_pixel(0, 0).0, [0, 255, 0, 255]);
    }

    #[test]
    fn asset_layer_emits_bounds_on_cache_hit() {
        let mut pipeline = LayerPipeline::default();
        let size = SizePx::new(10, 10);
        let asset = AssetConfig::new(solid(2, 2, [0, 0, 0, 255]), Rect::new(3, 4, 2, 2));
        pipeline.asset.set_config(Some(asset));

        let versions = pipeline.layer_versions();
        let key = CacheKey::new(size);

        let mut ctx = RenderContext::new(size);
        pipeline.asset.apply(&mut ctx, key, &versions).unwrap();
        assert_eq!(ctx.get::<AssetBounds>(), Some(&AssetBounds(Rect::new(3, 4, 2, 2))));

        let deps = AssetConfig::dependencies(&versions);
        assert!(pipeline.asset.get_cached(key, deps).is_some());

        // Second pass is a cache hit but still emits.
        let mut ctx = RenderContext::new(size);
        pipeline.asset.apply(&mut ctx, key, &versions).unwrap();
        assert_eq!(ctx.get::<AssetBounds>(), Some(&AssetBounds(Rect::new(3, 4, 2, 2))));
        assert_eq!(ctx.frame.get_pixel(3, 4).0, [0, 0, 0, 255]);
    }

    #[test]
    fn combine_is_order_sensitive() {
        assert_ne!(
            DependencyVersion::combine(&[1, 2]),
            DependencyVersion::combine(&[2, 1])
        );
    }
}
