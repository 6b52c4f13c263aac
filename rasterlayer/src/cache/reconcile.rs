//! Pure reconciliation of requested tiles against cache contents.

use std::collections::{BTreeMap, HashSet};

use super::entry::{EntryState, TileEntry};
use crate::coord::{GeoBounds, TileKey};

/// Work produced by [`reconcile`].
///
/// Evictions must be applied before fetches: a failed key that is still
/// requested appears in both lists and is replaced by a fresh fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Requested keys to fetch, in request order.
    pub to_fetch: Vec<TileKey>,
    /// Cached keys to drop, in key order.
    pub to_evict: Vec<TileKey>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.to_fetch.is_empty() && self.to_evict.is_empty()
    }
}

/// Decide which tiles to fetch and which to drop.
///
/// - A requested key is fetched when it has no entry, or only a failed one.
/// - An entry is evicted when its bounds do not intersect `padded_viewport`.
/// - A failed entry is always evicted; if still requested it is re-fetched.
///
/// Pending and loaded entries are never fetched again, which keeps at most
/// one fetch in flight per key.
pub fn reconcile(
    requested: &[TileKey],
    entries: &BTreeMap<TileKey, TileEntry>,
    padded_viewport: &GeoBounds,
) -> Reconciliation {
    let mut to_evict = Vec::new();
    let mut retry = HashSet::new();

    for (key, entry) in entries {
        if !entry.bounds.intersects(padded_viewport) {
            to_evict.push(*key);
        } else if let EntryState::Failed { .. } = entry.state {
            to_evict.push(*key);
            retry.insert(*key);
        }
    }

    let mut seen = HashSet::with_capacity(requested.len());
    let to_fetch = requested
        .iter()
        .filter(|key| seen.insert(**key))
        .filter(|key| !entries.contains_key(key) || retry.contains(key))
        .copied()
        .collect();

    Reconciliation { to_fetch, to_evict }
}
