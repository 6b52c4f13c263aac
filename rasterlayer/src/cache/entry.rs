//! Cache entries.

use tokio_util::sync::CancellationToken;

use crate::coord::GeoBounds;
use crate::fetch::FetchError;
use crate::map::OverlayHandle;

/// Lifecycle state of one cached tile.
#[derive(Debug, Clone)]
pub enum EntryState {
    /// A fetch was issued under `generation` and has not completed.
    Pending {
        generation: u64,
        cancel: CancellationToken,
    },
    /// The tile is on the map.
    Loaded { handle: OverlayHandle },
    /// The fetch failed. Not retried until the key is requested again.
    Failed { error: FetchError },
}

/// A cached tile and its bounds.
#[derive(Debug, Clone)]
pub struct TileEntry {
    pub bounds: GeoBounds,
    pub state: EntryState,
}

impl TileEntry {
    pub(crate) fn pending(bounds: GeoBounds, generation: u64, cancel: CancellationToken) -> Self {
        Self {
            bounds,
            state: EntryState::Pending { generation, cancel },
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, EntryState::Pending { .. })
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, EntryState::Loaded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, EntryState::Failed { .. })
    }

    /// Generation of the in-flight fetch, if any.
    pub fn pending_generation(&self) -> Option<u64> {
        match &self.state {
            EntryState::Pending { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    pub fn overlay(&self) -> Option<OverlayHandle> {
        match &self.state {
            EntryState::Loaded { handle } => Some(*handle),
            _ => None,
        }
    }
}
