//! Selection overlay control.
//!
//! [`OverlayController`] keeps the transform overlay attached to the current
//! selection, deselects on pointer-downs outside the editing surface, and
//! hides the overlay while pixels are being captured.

use std::ops::Deref;

use log::debug;

use crate::bitmap::Rect;
use crate::scene::SceneState;
use crate::settings::OverlayRestore;
use crate::stage::Stage;

// ============================================================================
// Pointer events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

/// A pointer event in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub x: i32,
    pub y: i32,
    pub kind: PointerKind,
}

impl PointerEvent {
    pub fn down(x: i32, y: i32) -> Self {
        Self { x, y, kind: PointerKind::Down }
    }

    pub fn moved(x: i32, y: i32) -> Self {
        Self { x, y, kind: PointerKind::Move }
    }

    pub fn up(x: i32, y: i32) -> Self {
        Self { x, y, kind: PointerKind::Up }
    }
}

/// Handle of a registered page-level pointer listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Page-wide registration gate for pointer listeners.
///
/// The bus only records which listeners are mounted; it does not dispatch
/// events. Callers hand each page event to a listener's owner, which checks
/// [`is_subscribed`](Self::is_subscribed) before reacting. Unsubscribing at
/// teardown therefore silences the listener.
#[derive(Debug, Default)]
pub struct PointerBus {
    listeners: Vec<ListenerId>,
    next_id: u64,
}

impl PointerBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push(id);
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| *l != id);
        self.listeners.len() != before
    }

    pub fn is_subscribed(&self, id: ListenerId) -> bool {
        self.listeners.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

// ============================================================================
// OverlayController
// ============================================================================

/// Drives the transform overlay for the surface container.
///
/// Owns the outside-click listener registration, keeps the stage's overlay in
/// step with the scene's selection and visibility, and hands out
/// [`OverlaySuppression`] guards for captures.
pub struct OverlayController {
    /// Bounds of the surface container in page coordinates.
    surface: Rect,
    restore: OverlayRestore,
    listener: Option<ListenerId>,
}

impl OverlayController {
    pub fn new(surface: Rect, restore: OverlayRestore) -> Self {
        Self {
            surface,
            restore,
            listener: None,
        }
    }

    pub fn surface(&self) -> Rect {
        self.surface
    }

    /// Moves the surface container, e.g. after a page layout change.
    pub fn set_surface(&mut self, surface: Rect) {
        self.surface = surface;
    }

    /// Registers the outside-click listener. Mounting twice is a no-op.
    pub fn mount(&mut self, bus: &mut PointerBus) {
        if self.listener.is_none() {
            self.listener = Some(bus.subscribe());
        }
    }

    /// Removes the outside-click listener.
    pub fn unmount(&mut self, bus: &mut PointerBus) {
        if let Some(id) = self.listener.take() {
            bus.unsubscribe(id);
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.listener.is_some()
    }

    /// Converts page coordinates into stage coordinates.
    pub fn to_stage(&self, x: i32, y: i32) -> (i32, i32) {
        (x.saturating_sub(self.surface.x), y.saturating_sub(self.surface.y))
    }

    /// Returns true if the page position lies on the editing surface.
    pub fn is_on_surface(&self, x: i32, y: i32) -> bool {
        self.surface.contains(x, y)
    }

    /// Delivers a page-level pointer event to the outside-click listener.
    ///
    /// A pointer-down outside the surface clears the selection and hides the
    /// overlay. Returns true if it did.
    pub fn handle_page_pointer(
        &self,
        bus: &PointerBus,
        event: &PointerEvent,
        scene: &mut SceneState,
    ) -> bool {
        let listening = self.listener.is_some_and(|id| bus.is_subscribed(id));
        if !listening || event.kind != PointerKind::Down || self.is_on_surface(event.x, event.y) {
            return false;
        }

        debug!("pointer-down outside surface at ({}, {})", event.x, event.y);
        scene.deselect();
        true
    }

    /// Resynchronises the overlay with the scene.
    ///
    /// The overlay is attached to the selection (or detached when there is
    /// none) and shown according to the visibility flag. A redraw is
    /// requested only if something changed; it happens on the next draw.
    pub fn sync(&self, scene: &SceneState, stage: &mut Stage) {
        let attached = stage.attach_overlay(scene.selection());
        let toggled = stage.set_overlay_visible(scene.overlay_visible());
        if attached || toggled {
            stage.request_redraw();
        }
    }

    /// Hides the overlay until the returned guard is dropped.
    pub fn suppress<'a>(&self, scene: &'a mut SceneState) -> OverlaySuppression<'a> {
        let saved = scene.overlay_visible();
        scene.set_overlay_visible(false);
        OverlaySuppression {
            scene,
            saved,
            restore: self.restore,
        }
    }
}

/// Keeps the overlay hidden for the duration of a capture.
///
/// Visibility is restored on drop, so it comes back even when the capture
/// fails part-way.
pub struct OverlaySuppression<'a> {
    scene: &'a mut SceneState,
    saved: bool,
    restore: OverlayRestore,
}

impl OverlaySuppression<'_> {
    /// Visibility that will be restored on drop.
    pub fn restores_to(&self) -> bool {
        match self.restore {
            OverlayRestore::Previous => self.saved,
            OverlayRestore::Visible => true,
        }
    }
}

impl Deref for OverlaySuppression<'_> {
    type Target = SceneState;

    fn deref(&self) -> &SceneState {
        &*self.scene
    }
}

impl Drop for OverlaySuppression<'_> {
    fn drop(&mut self) {
        let visible = self.restores_to();
        self.scene.set_overlay_visible(visible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{Bitmap, BitmapSource, SizePx};
    use crate::layer::HandleStyle;
    use image::{Rgba, RgbaImage};

    fn scene_with_selected_asset() -> SceneState {
        let white = |w, h| {
            Bitmap::new(
                BitmapSource::Path("tshirt.png".into()),
                RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])),
            )
        };
        let mut scene = SceneState::new(white(10, 10));
        let id = scene.set_asset(white(2, 2));
        scene.select(Some(id)).unwrap();
        scene
    }

    fn controller(restore: OverlayRestore) -> OverlayController {
        OverlayController::new(Rect::new(100, 50, 600, 600), restore)
    }

    #[test]
    fn outside_click_deselects_only_while_mounted() {
        let mut bus = PointerBus::new();
        let mut overlay = controller(OverlayRestore::Previous);
        let mut scene = scene_with_selected_asset();

        // Not mounted yet: ignored.
        assert!(!overlay.handle_page_pointer(&bus, &PointerEvent::down(5, 5), &mut scene));
        assert!(scene.selection().is_some());

        overlay.mount(&mut bus);
        overlay.mount(&mut bus);
        assert_eq!(bus.len(), 1);

        assert!(overlay.handle_page_pointer(&bus, &PointerEvent::down(5, 5), &mut scene));
        assert_eq!(scene.selection(), None);
        assert!(!scene.overlay_visible());

        let mut scene = scene_with_selected_asset();
        overlay.unmount(&mut bus);
        assert!(bus.is_empty());
        assert!(!overlay.handle_page_pointer(&bus, &PointerEvent::down(5, 5), &mut scene));
        assert!(scene.selection().is_some());
    }

    #[test]
    fn clicks_on_the_surface_keep_selection() {
        let mut bus = PointerBus::new();
        let mut overlay = controller(OverlayRestore::Previous);
        overlay.mount(&mut bus);
        let mut scene = scene_with_selected_asset();

        assert!(!overlay.handle_page_pointer(&bus, &PointerEvent::down(100, 50), &mut scene));
        assert!(!overlay.handle_page_pointer(&bus, &PointerEvent::down(699, 649), &mut scene));
        // Moves outside never deselect.
        assert!(!overlay.handle_page_pointer(&bus, &PointerEvent::moved(0, 0), &mut scene));
        assert!(scene.selection().is_some());

        assert!(overlay.handle_page_pointer(&bus, &PointerEvent::down(700, 649), &mut scene));
    }

    #[test]
    fn page_to_stage_coordinates() {
        let overlay = controller(OverlayRestore::Previous);
        assert_eq!(overlay.to_stage(150, 100), (50, 50));
    }

    #[test]
    fn suppression_hides_then_restores_previous() {
        let overlay = controller(OverlayRestore::Previous);
        let mut scene = scene_with_selected_asset();

        {
            let guard = overlay.suppress(&mut scene);
            assert!(!guard.overlay_visible());
            assert!(guard.restores_to());
        }
        assert!(scene.overlay_visible());

        scene.deselect();
        {
            let guard = overlay.suppress(&mut scene);
            assert!(!guard.overlay_visible());
        }
        assert!(!scene.overlay_visible(), "hidden overlay stays hidden");
    }

    #[test]
    fn suppression_visible_policy_always_shows() {
        let overlay = controller(OverlayRestore::Visible);
        let mut scene = scene_with_selected_asset();
        scene.deselect();

        drop(overlay.suppress(&mut scene));

        assert!(scene.overlay_visible());
    }

    #[test]
    fn sync_attaches_to_selection_and_requests_redraw() {
        let overlay = controller(OverlayRestore::Previous);
        let mut stage = Stage::new(SizePx::new(10, 10), HandleStyle::default());
        let mut scene = scene_with_selected_asset();
        stage.draw().unwrap();

        overlay.sync(&scene, &mut stage);
        assert_eq!(stage.overlay_target(), scene.selection());
        assert!(stage.needs_draw());

        stage.draw().unwrap();
        scene.deselect();
        overlay.sync(&scene, &mut stage);
        assert_eq!(stage.overlay_target(), None);
        assert!(stage.needs_draw());
    }
}
