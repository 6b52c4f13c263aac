//! Stateful tile cache bound to a map surface.

use std::collections::{BTreeMap, HashSet};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::entry::{EntryState, TileEntry};
use super::reconcile::reconcile;
use super::stats::CacheStats;
use crate::coord::{GeoBounds, TileKey};
use crate::fetch::{FetchError, TileImage};
use crate::map::{MapSurface, OverlayHandle};

/// Default viewport padding as a fraction of the viewport extent.
pub const DEFAULT_PADDING: f64 = 0.1;

/// A fetch the caller must issue after reconciliation.
#[derive(Debug, Clone)]
pub struct FetchOrder {
    pub key: TileKey,
    pub bounds: GeoBounds,
    /// Generation the result must be reported under.
    pub generation: u64,
    /// Fires when the entry is evicted before the fetch completes.
    pub cancel: CancellationToken,
}

/// Result of reporting a completed fetch to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The tile is now on the map.
    Installed(OverlayHandle),
    /// The entry is now `Failed`.
    Failed,
    /// The result no longer matches a current pending entry and was dropped.
    Stale,
}

/// Owns every tile entry and the overlays of loaded tiles.
///
/// All mutation is synchronous. Each pending entry remembers the generation
/// its fetch was issued under; a completion is applied only when it carries
/// that same generation and the key is still requested, so results of
/// evicted or superseded fetches never reach the map.
#[derive(Debug)]
pub struct TileCache {
    entries: BTreeMap<TileKey, TileEntry>,
    requested: HashSet<TileKey>,
    generation: u64,
    padding: f64,
    stats: CacheStats,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(DEFAULT_PADDING)
    }
}

impl TileCache {
    pub fn new(padding: f64) -> Self {
        Self {
            entries: BTreeMap::new(),
            requested: HashSet::new(),
            generation: 0,
            padding,
            stats: CacheStats::default(),
        }
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new generation and return it.
    pub fn advance_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &TileKey) -> Option<&TileEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&TileKey, &TileEntry)> {
        self.entries.iter()
    }

    pub fn is_requested(&self, key: &TileKey) -> bool {
        self.requested.contains(key)
    }

    pub fn pending_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_pending()).count()
    }

    pub fn loaded_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_loaded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_failed()).count()
    }

    /// Bring the cache in line with a new plan.
    ///
    /// Evicts entries outside the padded `viewport` (and failed entries),
    /// records `requested` as the current request set, and creates a pending
    /// entry for every requested tile without one. The returned orders are
    /// tagged with the current generation.
    pub fn reconcile<M>(&mut self, requested: &[GeoBounds], viewport: &GeoBounds, map: &mut M) -> Vec<FetchOrder>
    where
        M: MapSurface + ?Sized,
    {
        let keys: Vec<TileKey> = requested.iter().map(GeoBounds::key).collect();
        let padded = viewport.padded(self.padding);
        let plan = reconcile(&keys, &self.entries, &padded);

        for key in &plan.to_evict {
            self.evict(key, map);
        }
        self.requested = keys.into_iter().collect();

        let generation = self.generation;
        let orders: Vec<FetchOrder> = plan
            .to_fetch
            .iter()
            .map(|key| {
                let cancel = CancellationToken::new();
                let bounds = key.bounds();
                self.entries
                    .insert(*key, TileEntry::pending(bounds, generation, cancel.clone()));
                FetchOrder {
                    key: *key,
                    bounds,
                    generation,
                    cancel,
                }
            })
            .collect();

        self.stats.fetches_issued += orders.len() as u64;
        debug!(
            generation,
            requested = self.requested.len(),
            fetch = orders.len(),
            evicted = plan.to_evict.len(),
            cached = self.entries.len(),
            "Reconciled tile cache"
        );
        orders
    }

    /// Attach a fetched tile to the map.
    ///
    /// No-op returning [`InstallOutcome::Stale`] when the entry was evicted,
    /// replaced by a newer fetch, or is no longer requested. The image is
    /// dropped in that case.
    pub fn install<M>(
        &mut self,
        key: TileKey,
        generation: u64,
        image: TileImage,
        opacity: f64,
        map: &mut M,
    ) -> InstallOutcome
    where
        M: MapSurface + ?Sized,
    {
        if !self.accept(&key, generation) {
            return InstallOutcome::Stale;
        }
        let Some(entry) = self.entries.get_mut(&key) else {
            return InstallOutcome::Stale;
        };

        let handle = map.add_overlay(image, entry.bounds, opacity);
        entry.state = EntryState::Loaded { handle };
        self.stats.installs += 1;
        trace!(key = %key, generation, "Installed tile");
        InstallOutcome::Installed(handle)
    }

    /// Record a failed fetch.
    ///
    /// The entry stays `Failed` until the next reconciliation, which either
    /// re-requests or evicts it.
    pub fn mark_failed(&mut self, key: TileKey, generation: u64, error: FetchError) -> InstallOutcome {
        if !self.accept(&key, generation) {
            return InstallOutcome::Stale;
        }
        let Some(entry) = self.entries.get_mut(&key) else {
            return InstallOutcome::Stale;
        };

        warn!(key = %key, generation, kind = ?error.kind(), error = %error, "Tile fetch failed");
        entry.state = EntryState::Failed { error };
        self.stats.failures += 1;
        InstallOutcome::Failed
    }

    /// Report a completed fetch, installing or failing its entry.
    pub fn complete<M>(
        &mut self,
        key: TileKey,
        generation: u64,
        result: Result<TileImage, FetchError>,
        opacity: f64,
        map: &mut M,
    ) -> InstallOutcome
    where
        M: MapSurface + ?Sized,
    {
        match result {
            Ok(image) => self.install(key, generation, image, opacity, map),
            Err(error) => self.mark_failed(key, generation, error),
        }
    }

    /// Remove every entry, releasing overlays and cancelling fetches.
    ///
    /// Returns the number of entries removed.
    pub fn evict_all<M>(&mut self, map: &mut M) -> usize
    where
        M: MapSurface + ?Sized,
    {
        let keys: Vec<TileKey> = self.entries.keys().copied().collect();
        for key in &keys {
            self.evict(key, map);
        }
        self.requested.clear();
        if !keys.is_empty() {
            debug!(evicted = keys.len(), generation = self.generation, "Evicted all tiles");
        }
        keys.len()
    }

    /// Update the opacity of every loaded overlay in place.
    ///
    /// Returns the number of overlays updated.
    pub fn set_opacity<M>(&mut self, opacity: f64, map: &mut M) -> usize
    where
        M: MapSurface + ?Sized,
    {
        let mut updated = 0;
        for handle in self.entries.values().filter_map(TileEntry::overlay) {
            map.set_overlay_opacity(handle, opacity);
            updated += 1;
        }
        updated
    }

    fn evict<M>(&mut self, key: &TileKey, map: &mut M) -> bool
    where
        M: MapSurface + ?Sized,
    {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        match entry.state {
            EntryState::Loaded { handle } => map.remove_overlay(handle),
            EntryState::Pending { cancel, .. } => {
                cancel.cancel();
                self.stats.cancellations += 1;
            }
            EntryState::Failed { .. } => {}
        }
        self.stats.evictions += 1;
        true
    }

    /// Check a completion against the current state.
    ///
    /// A matching pending entry that is no longer requested is dropped here,
    /// since no later completion can apply to it.
    fn accept(&mut self, key: &TileKey, generation: u64) -> bool {
        let current = self
            .entries
            .get(key)
            .and_then(TileEntry::pending_generation)
            == Some(generation);

        if current && self.requested.contains(key) {
            return true;
        }
        if current {
            self.entries.remove(key);
            self.stats.evictions += 1;
        }
        self.stats.stale_discards += 1;
        trace!(key = %key, generation, current = self.generation, "Discarded stale tile result");
        false
    }
}
