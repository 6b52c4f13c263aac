//! Viewport controller.
//!
//! Reacts to map gestures and parameter changes by running the tile
//! pipeline:
//!
//! ```text
//! map event ─▶ planner ─▶ cache.reconcile ─▶ fetch tasks
//!                              │                  │
//!                              ▼                  ▼
//!                         evictions      FetchCompletion ─▶ cache.install ─▶ overlay
//! ```
//!
//! The controller is `Empty` until a raster is loaded and `Active` after.
//! Every viewport pass and every invalidating parameter change starts a new
//! cache generation, so results of superseded fetches are discarded.

mod event_loop;
mod types;
mod viewport;

pub use types::{
    ControllerCommand, ControllerConfig, ControllerError, ControllerState, FetchCompletion, ParamsChange,
    DEFAULT_DEBOUNCE, DEFAULT_OPACITY,
};
pub use viewport::ViewportController;
