//! Range-based data cache with eviction.
//!
//! The performance lever the whole engine hinges on: eviction walks
//! `loaded_ranges` (a handful of entries even at a million-item scale), never
//! the sparse item store. `loaded`/`pending`/`failed` are kept as
//! `BTreeSet<RangeId>` so the "outside the keep zone" scan during eviction is
//! a small number of ordered comparisons rather than an unordered full pass.

use std::collections::{BTreeSet, HashMap};

use instant::Instant;

use super::abort::AbortHandle;
use super::types::{range_for_id, range_id, Index, Range, RangeId, Slot};

#[derive(Clone, Debug)]
pub struct FailureInfo {
    pub attempts: u32,
    pub last_error: String,
    pub fail_time: Instant,
}

#[derive(Debug)]
pub struct EvictionResult {
    pub keep_start: Index,
    pub keep_end: Index,
    pub evicted_count: usize,
    pub evicted_ranges: Vec<RangeId>,
}

pub struct RangeCache<T> {
    range_size: u64,
    loaded: BTreeSet<RangeId>,
    pending: BTreeSet<RangeId>,
    failed: HashMap<RangeId, FailureInfo>,
    items: HashMap<Index, Slot<T>>,
    abort_handles: HashMap<RangeId, AbortHandle>,
    cached_item_count: usize,
}

impl<T> RangeCache<T> {
    pub fn new(range_size: u64) -> Self {
        Self {
            range_size,
            loaded: BTreeSet::new(),
            pending: BTreeSet::new(),
            failed: HashMap::new(),
            items: HashMap::new(),
            abort_handles: HashMap::new(),
            cached_item_count: 0,
        }
    }

    pub fn cached_item_count(&self) -> usize {
        self.cached_item_count
    }

    pub fn is_loaded(&self, id: RangeId) -> bool {
        self.loaded.contains(&id)
    }

    pub fn is_pending(&self, id: RangeId) -> bool {
        self.pending.contains(&id)
    }

    pub fn failure(&self, id: RangeId) -> Option<&FailureInfo> {
        self.failed.get(&id)
    }

    pub fn loaded_ranges(&self) -> impl Iterator<Item = RangeId> + '_ {
        self.loaded.iter().copied()
    }

    pub fn get(&self, index: Index) -> Option<&Slot<T>> {
        self.items.get(&index)
    }

    pub fn register_abort_handle(&mut self, id: RangeId, handle: AbortHandle) {
        self.abort_handles.insert(id, handle);
    }

    /// I1: a RangeId is in at most one of the three sets at any time.
    pub fn mark_pending(&mut self, id: RangeId) {
        self.loaded.remove(&id);
        self.failed.remove(&id);
        self.pending.insert(id);
    }

    pub fn mark_loaded(&mut self, id: RangeId) {
        self.pending.remove(&id);
        self.failed.remove(&id);
        self.loaded.insert(id);
        self.abort_handles.remove(&id);
    }

    pub fn mark_failed(&mut self, id: RangeId, message: impl Into<String>) {
        self.loaded.remove(&id);
        self.pending.remove(&id);
        let attempts = self.failed.get(&id).map(|f| f.attempts).unwrap_or(0) + 1;
        self.failed.insert(
            id,
            FailureInfo {
                attempts,
                last_error: message.into(),
                fail_time: Instant::now(),
            },
        );
        self.abort_handles.remove(&id);
    }

    /// Writes slots `[offset, offset+items.len())`; increments
    /// `cached_item_count` once per previously-empty slot (I3).
    pub fn store(&mut self, offset: Index, items: Vec<Slot<T>>) {
        for (i, item) in items.into_iter().enumerate() {
            let index = offset + i as u64;
            if self.items.insert(index, item).is_none() {
                self.cached_item_count += 1;
            }
        }
    }

    /// True if every slot in range `id`'s window currently holds an item.
    fn window_fully_populated(&self, id: RangeId) -> bool {
        let range = range_for_id(id, self.range_size);
        (range.start..range.end).all(|idx| self.items.contains_key(&idx))
    }

    /// Defensive check for the load/eviction race: if id's window isn't
    /// fully populated anymore, it has no business being in `loaded`.
    pub fn verify_loaded(&mut self, id: RangeId) {
        if self.loaded.contains(&id) && !self.window_fully_populated(id) {
            self.loaded.remove(&id);
        }
    }

    /// Called by a load's completion handler before re-adding `id` to
    /// `loaded`: if the range was evicted mid-write, the write must not
    /// resurrect it.
    pub fn try_mark_loaded_after_write(&mut self, id: RangeId) -> bool {
        if self.window_fully_populated(id) {
            self.mark_loaded(id);
            true
        } else {
            false
        }
    }

    /// Reclaims memory for loaded ranges entirely outside
    /// `[visible_start - buffer, visible_end + buffer]`. Precondition:
    /// `cached_item_count > max_cached_items` — callers check this so the
    /// cache itself stays a pure bookkeeping structure.
    pub fn evict(&mut self, visible_start: Index, visible_end: Index, buffer: u64) -> EvictionResult {
        let keep_start = visible_start.saturating_sub(buffer);
        let keep_end = visible_end.saturating_add(buffer);
        let keep_range = Range::new(keep_start, keep_end.max(keep_start));

        // A candidate id can be loaded, pending, or mid-flight with a
        // registered abort handle — scan their union (still
        // O(loaded_ranges + pending_ranges), never the sparse item store)
        // so an in-flight load for a range the user has scrolled far away
        // from is aborted alongside a merely-loaded one, not left to
        // complete uselessly (documented in DESIGN.md).
        let mut candidates: BTreeSet<RangeId> = self.loaded.iter().copied().collect();
        candidates.extend(self.pending.iter().copied());
        candidates.extend(self.abort_handles.keys().copied());

        let to_evict: Vec<RangeId> = candidates
            .into_iter()
            .filter(|&id| {
                let range = range_for_id(id, self.range_size);
                !range.overlaps(&keep_range)
            })
            .collect();

        let mut evicted_count = 0usize;
        for id in &to_evict {
            let range = range_for_id(*id, self.range_size);
            for idx in range.start..range.end {
                if self.items.remove(&idx).is_some() {
                    evicted_count += 1;
                }
            }
            self.loaded.remove(id);
            self.pending.remove(id);
            if let Some(handle) = self.abort_handles.remove(id) {
                handle.abort();
            }
        }
        self.cached_item_count = self.cached_item_count.saturating_sub(evicted_count);

        EvictionResult {
            keep_start,
            keep_end,
            evicted_count,
            evicted_ranges: to_evict,
        }
    }

    pub fn reset(&mut self) {
        for (_, handle) in self.abort_handles.drain() {
            handle.abort();
        }
        self.loaded.clear();
        self.pending.clear();
        self.failed.clear();
        self.items.clear();
        self.cached_item_count = 0;
    }

    pub fn range_id_for_offset(&self, offset: Index) -> RangeId {
        range_id(offset, self.range_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::abort::abort_pair;

    fn real_items(n: usize) -> Vec<Slot<u32>> {
        (0..n as u32).map(Slot::Real).collect()
    }

    #[test]
    fn store_increments_count_once_per_slot() {
        let mut cache: RangeCache<u32> = RangeCache::new(20);
        cache.store(0, real_items(20));
        assert_eq!(cache.cached_item_count(), 20);
        // overwriting existing slots must not double count
        cache.store(0, real_items(20));
        assert_eq!(cache.cached_item_count(), 20);
    }

    #[test]
    fn mark_transitions_are_mutually_exclusive() {
        let mut cache: RangeCache<u32> = RangeCache::new(20);
        cache.mark_pending(0);
        assert!(cache.is_pending(0));
        cache.mark_loaded(0);
        assert!(cache.is_loaded(0));
        assert!(!cache.is_pending(0));
        cache.mark_failed(0, "boom");
        assert!(!cache.is_loaded(0));
        assert!(cache.failure(0).unwrap().attempts == 1);
    }

    #[test]
    fn eviction_is_scoped_to_loaded_ranges_outside_keep_zone() {
        let mut cache: RangeCache<u32> = RangeCache::new(20);
        for range in 0..10u64 {
            cache.store(range * 20, real_items(20));
            cache.mark_loaded(range);
        }
        assert_eq!(cache.cached_item_count(), 200);

        // visible around range 8 (indices 160..180), buffer 10
        let result = cache.evict(160, 180, 10);
        assert!(result.evicted_count > 0);
        assert!(!cache.is_loaded(0));
        assert!(cache.is_loaded(8));
        assert_eq!(cache.cached_item_count(), 200 - result.evicted_count);
    }

    #[test]
    fn eviction_aborts_inflight_handle_for_evicted_range() {
        let mut cache: RangeCache<u32> = RangeCache::new(20);
        cache.store(0, real_items(20));
        cache.mark_pending(0);
        let (handle, mut signal) = abort_pair();
        cache.register_abort_handle(0, handle);

        cache.evict(10_000, 10_020, 10);
        assert!(!cache.is_pending(0));
        // handle was consumed and aborted
        futures::executor::block_on(signal.aborted());
        assert!(signal.is_aborted());
    }

    #[test]
    fn race_completion_after_eviction_does_not_resurrect_range() {
        let mut cache: RangeCache<u32> = RangeCache::new(20);
        cache.mark_pending(0);
        // user scrolls away, eviction runs before the load completes (no
        // items were ever stored for range 0, so nothing to evict, but the
        // pending marker and any abort handle are cleared)
        cache.evict(10_000, 10_020, 10);
        assert!(!cache.is_pending(0));

        // the in-flight load's completion handler now writes the slots...
        cache.store(0, real_items(20));
        // ...but must verify before trusting the write
        let became_loaded = cache.try_mark_loaded_after_write(0);
        assert!(became_loaded, "slots are present so this path does succeed");

        // Now simulate a write that's incomplete because eviction raced
        // mid-write (only part of the window got written back).
        let mut cache2: RangeCache<u32> = RangeCache::new(20);
        cache2.store(0, real_items(10)); // only half the window
        let became_loaded2 = cache2.try_mark_loaded_after_write(0);
        assert!(!became_loaded2);
        assert!(!cache2.is_loaded(0));
    }

    #[test]
    fn reset_clears_everything_and_aborts() {
        let mut cache: RangeCache<u32> = RangeCache::new(20);
        cache.store(0, real_items(20));
        cache.mark_pending(1);
        let (handle, mut signal) = abort_pair();
        cache.register_abort_handle(1, handle);

        cache.reset();
        assert_eq!(cache.cached_item_count(), 0);
        assert!(!cache.is_pending(1));
        futures::executor::block_on(signal.aborted());
        assert!(signal.is_aborted());
    }
}
