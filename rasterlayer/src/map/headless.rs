//! In-memory map surface.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::trace;

use super::{EventBus, MapEvent, MapSurface, OverlayHandle, Subscription};
use crate::coord::GeoBounds;
use crate::fetch::TileImage;
use crate::planner::DEFAULT_TILE_SIZE_PX;
use crate::raster::DEFAULT_MAX_ZOOM;

/// Default viewport size in pixels (width, height).
pub const DEFAULT_VIEWPORT_PX: (u32, u32) = (1024, 768);

/// An image placed on a [`HeadlessMap`].
#[derive(Debug, Clone)]
pub struct Overlay {
    pub image: TileImage,
    pub bounds: GeoBounds,
    pub opacity: f64,
}

/// Map surface with no rendering.
///
/// Keeps overlays in memory and lets callers move the view, emitting the same
/// events a real widget would at the end of a gesture.
pub struct HeadlessMap {
    bounds: GeoBounds,
    zoom: u8,
    viewport_px: (u32, u32),
    overlays: BTreeMap<OverlayHandle, Overlay>,
    next_handle: u64,
    events: EventBus,
    overlays_added: u64,
    overlays_removed: u64,
}

impl HeadlessMap {
    pub fn new(bounds: GeoBounds, zoom: u8) -> Self {
        Self {
            bounds,
            zoom,
            viewport_px: DEFAULT_VIEWPORT_PX,
            overlays: BTreeMap::new(),
            next_handle: 1,
            events: EventBus::new(),
            overlays_added: 0,
            overlays_removed: 0,
        }
    }

    /// Set the pixel size used to pick a zoom in `fit_to_bounds`.
    pub fn with_viewport_px(mut self, width: u32, height: u32) -> Self {
        self.viewport_px = (width.max(1), height.max(1));
        self
    }

    /// Pan to `bounds` at the current zoom.
    pub fn pan_to(&mut self, bounds: GeoBounds) {
        self.bounds = bounds;
        self.events.emit(MapEvent::MoveEnd);
    }

    /// Move to `bounds` at `zoom`.
    pub fn set_view(&mut self, bounds: GeoBounds, zoom: u8) {
        let zoomed = zoom != self.zoom;
        self.bounds = bounds;
        self.zoom = zoom;
        self.events.emit(if zoomed { MapEvent::ZoomEnd } else { MapEvent::MoveEnd });
    }

    pub fn overlays(&self) -> impl Iterator<Item = (OverlayHandle, &Overlay)> {
        self.overlays.iter().map(|(handle, overlay)| (*handle, overlay))
    }

    pub fn overlay(&self, handle: OverlayHandle) -> Option<&Overlay> {
        self.overlays.get(&handle)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// Total overlays ever added.
    pub fn overlays_added(&self) -> u64 {
        self.overlays_added
    }

    /// Total overlays ever removed.
    pub fn overlays_removed(&self) -> u64 {
        self.overlays_removed
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Largest zoom at which `bounds` fits inside the viewport.
    fn zoom_to_fit(&self, bounds: &GeoBounds) -> u8 {
        let tile = DEFAULT_TILE_SIZE_PX as f64;
        let fit = |extent_deg: f64, px: u32| {
            if extent_deg <= 0.0 {
                return f64::INFINITY;
            }
            (px as f64 * 360.0 / (extent_deg * tile)).log2()
        };
        let zoom = fit(bounds.width(), self.viewport_px.0)
            .min(fit(bounds.height(), self.viewport_px.1))
            .floor();
        if zoom.is_finite() {
            zoom.clamp(0.0, DEFAULT_MAX_ZOOM as f64) as u8
        } else {
            DEFAULT_MAX_ZOOM
        }
    }
}

impl MapSurface for HeadlessMap {
    fn fit_to_bounds(&mut self, bounds: GeoBounds) {
        let zoom = self.zoom_to_fit(&bounds);
        trace!(bounds = ?bounds, zoom, "Fit map to bounds");
        self.set_view(bounds, zoom);
    }

    fn current_bounds(&self) -> GeoBounds {
        self.bounds
    }

    fn zoom(&self) -> u8 {
        self.zoom
    }

    fn add_overlay(&mut self, image: TileImage, bounds: GeoBounds, opacity: f64) -> OverlayHandle {
        let handle = OverlayHandle::new(self.next_handle);
        self.next_handle += 1;
        self.overlays.insert(
            handle,
            Overlay {
                image,
                bounds,
                opacity,
            },
        );
        self.overlays_added += 1;
        handle
    }

    fn remove_overlay(&mut self, handle: OverlayHandle) {
        if self.overlays.remove(&handle).is_some() {
            self.overlays_removed += 1;
        }
    }

    fn set_overlay_opacity(&mut self, handle: OverlayHandle, opacity: f64) {
        if let Some(overlay) = self.overlays.get_mut(&handle) {
            overlay.opacity = opacity;
        }
    }

    fn subscribe(&mut self) -> (Subscription, mpsc::UnboundedReceiver<MapEvent>) {
        self.events.subscribe()
    }
}
