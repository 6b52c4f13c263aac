//! Map widget capability interface.
//!
//! The tile pipeline never talks to a concrete map widget. It drives any
//! [`MapSurface`]: something that can report its viewport, fit itself to a
//! region, place image overlays and notify subscribers when a pan or zoom
//! gesture ends.
//!
//! [`HeadlessMap`] is an in-memory surface used by the CLI and by tests.

mod events;
mod headless;

use tokio::sync::mpsc;

use crate::coord::GeoBounds;
use crate::fetch::TileImage;

pub use events::{EventBus, Subscription};
pub use headless::{HeadlessMap, Overlay, DEFAULT_VIEWPORT_PX};

/// Opaque handle to an overlay placed on a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayHandle(u64);

impl OverlayHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Notifications emitted when a map gesture completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    /// A pan finished.
    MoveEnd,
    /// A zoom finished.
    ZoomEnd,
}

/// What the tile pipeline needs from a map widget.
pub trait MapSurface: Send {
    /// Move and zoom so that `bounds` fills the view.
    fn fit_to_bounds(&mut self, bounds: GeoBounds);

    /// Currently visible region.
    fn current_bounds(&self) -> GeoBounds;

    /// Current integer zoom level.
    fn zoom(&self) -> u8;

    /// Place an image over `bounds` and return a handle to it.
    fn add_overlay(&mut self, image: TileImage, bounds: GeoBounds, opacity: f64) -> OverlayHandle;

    /// Remove an overlay, releasing its bitmap. Unknown handles are ignored.
    fn remove_overlay(&mut self, handle: OverlayHandle);

    fn set_overlay_opacity(&mut self, handle: OverlayHandle, opacity: f64);

    /// Subscribe to pan/zoom end events.
    ///
    /// Events stop when the returned [`Subscription`] is dropped.
    fn subscribe(&mut self) -> (Subscription, mpsc::UnboundedReceiver<MapEvent>);
}
