//! Viewport-driven tile cache.
//!
//! The cache maps each [`TileKey`](crate::coord::TileKey) to exactly one
//! [`TileEntry`]:
//!
//! ```text
//!              reconcile                 install
//!   (absent) ───────────▶ Pending ───────────────▶ Loaded
//!                            │                        │
//!                            │ mark_failed            │ evict
//!                            ▼                        ▼
//!                          Failed ──── evict ────▶ (absent)
//! ```
//!
//! [`reconcile`] is the pure planning step; [`TileCache`] applies its result
//! to the entries and the map overlays, and guards installs with generation
//! tags.

mod entry;
mod reconcile;
mod stats;
mod tile_cache;

pub use entry::{EntryState, TileEntry};
pub use reconcile::{reconcile, Reconciliation};
pub use stats::CacheStats;
pub use tile_cache::{FetchOrder, InstallOutcome, TileCache, DEFAULT_PADDING};
