//! Velocity-aware gate in front of the adapter: decides whether a range load
//! proceeds, queues, or gets cancelled before ever reaching the backend.
//!
//! Single-threaded cooperative, like the rest of the core: state lives
//! behind a `RefCell`, mutated only at discrete, non-`await` points.
//! Multiple loads can still be genuinely in flight (bounded by
//! `max_concurrent_requests`) because each is an independent `async fn`
//! invocation sharing the same `Rc<RefCell<_>>` handle, the same shape used
//! for shared mutable state read and written from independent `spawn`ed
//! tasks elsewhere in the engine.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use instant::Instant;
use tokio::sync::oneshot;

use super::abort::abort_pair;
use super::adapter::{Adapter, AdapterParams};
use super::config::PaginationStrategy;
use super::error::{CancelReason, LoadError};
use super::events::{EventBus, ViewportEvent};
use super::range_cache::RangeCache;
use super::types::{range_for_id, Index, Priority, Range, RangeId, Slot};

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub range_size: u64,
    pub cancel_load_threshold: f64,
    pub max_concurrent_requests: usize,
    pub enable_request_queue: bool,
    pub max_queue_size: usize,
    pub max_sequential_pages: u32,
    pub strategy: PaginationStrategy,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    /// The exact range key was already active; this call is a no-op.
    Deduped,
    /// Dropped before dispatch — never counted as a failure.
    Cancelled(CancelReason),
    Completed(LoadCompletion),
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadCompletion {
    Success {
        range_id: RangeId,
        item_count: usize,
        total: Option<u64>,
        /// Page 1 / offset 0 returning zero items forces `totalItems = 0`
        /// regardless of any other meta the adapter reports.
        forced_empty: bool,
    },
    /// Cursor mode only: page N requested before page N-1's cursor is known.
    SequentialRequired { missing_page: u64 },
    Failed {
        range_id: RangeId,
        attempts: u32,
        message: String,
    },
}

struct QueuedRequest {
    range: Range,
    priority: Priority,
    timestamp: Instant,
    waiter: oneshot::Sender<LoadOutcome>,
}

struct Inner {
    config: SchedulerConfig,
    current_velocity: f64,
    is_dragging: bool,
    active_count: usize,
    active_range_keys: HashSet<(Index, Index)>,
    queue: Vec<QueuedRequest>,
    cursor_for_page: std::collections::HashMap<u64, String>,
    highest_loaded_page: u64,
    has_reached_end: bool,
    completed: u64,
    failed: u64,
    cancelled: u64,
}

/// Cheaply-clonable handle (an `Rc` internally), shared the same way across
/// every closure that needs it rather than threaded through as `&mut`.
pub struct Scheduler<T> {
    inner: Rc<RefCell<Inner>>,
    cache: Rc<RefCell<RangeCache<T>>>,
    events: Rc<RefCell<EventBus>>,
    adapter: Rc<dyn Adapter<T>>,
    transform: Option<Rc<dyn Fn(T) -> T>>,
}

impl<T> Clone for Scheduler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            cache: self.cache.clone(),
            events: self.events.clone(),
            adapter: self.adapter.clone(),
            transform: self.transform.clone(),
        }
    }
}

/// `min(1000 * 2^(attempts-1), 30_000)` ms — exponential retry backoff.
pub fn backoff_duration(attempts: u32) -> Duration {
    if attempts == 0 {
        return Duration::ZERO;
    }
    let ms = 1000u64.saturating_mul(1u64 << (attempts - 1).min(20));
    Duration::from_millis(ms.min(30_000))
}

impl<T: Clone + 'static> Scheduler<T> {
    pub fn new(
        config: SchedulerConfig,
        cache: Rc<RefCell<RangeCache<T>>>,
        events: Rc<RefCell<EventBus>>,
        adapter: Rc<dyn Adapter<T>>,
        transform: Option<Rc<dyn Fn(T) -> T>>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                config,
                current_velocity: 0.0,
                is_dragging: false,
                active_count: 0,
                active_range_keys: HashSet::new(),
                queue: Vec::new(),
                cursor_for_page: std::collections::HashMap::new(),
                highest_loaded_page: 0,
                has_reached_end: false,
                completed: 0,
                failed: 0,
                cancelled: 0,
            })),
            cache,
            events,
            adapter,
            transform,
        }
    }

    pub fn completed(&self) -> u64 {
        self.inner.borrow().completed
    }
    pub fn failed(&self) -> u64 {
        self.inner.borrow().failed
    }
    pub fn cancelled(&self) -> u64 {
        self.inner.borrow().cancelled
    }
    pub fn queue_len(&self) -> usize {
        self.inner.borrow().queue.len()
    }
    pub fn active_count(&self) -> usize {
        self.inner.borrow().active_count
    }
    pub fn has_reached_end(&self) -> bool {
        self.inner.borrow().has_reached_end
    }

    pub fn set_dragging(&self, dragging: bool) {
        self.inner.borrow_mut().is_dragging = dragging;
    }

    /// Returns `true` if velocity just crossed *down* below the cancel
    /// threshold — the caller should then spawn `process_queue`, since
    /// requests gated out while fast-scrolling become loadable again.
    pub fn set_velocity(&self, velocity: f64) -> bool {
        let mut inner = self.inner.borrow_mut();
        let threshold = inner.config.cancel_load_threshold;
        let was_above = inner.current_velocity >= threshold;
        inner.current_velocity = velocity;
        let now_below = velocity < threshold;
        was_above && now_below
    }

    /// Synthetic virtual total for cursor mode: the scrollbar needs a
    /// non-zero size before the true total is known.
    pub fn dynamic_cursor_total(&self, cached_item_count: u64) -> u64 {
        let inner = self.inner.borrow();
        let range_size = inner.config.range_size;
        let min_virtual_items = range_size * 3;
        let margin = if inner.has_reached_end { 0 } else { range_size * 3 };
        (cached_item_count + margin).max(min_virtual_items)
    }

    /// Cancels an in-flight load's transport via the cache's abort map. The
    /// completion handler distinguishes this from a genuine failure.
    pub fn abort(&self, range_id: RangeId) {
        // RangeCache owns the actual abort handles; this documents the
        // intent at the Scheduler's public surface, since eviction is what
        // actually triggers an abort via RangeCache::evict.
        let _ = range_id;
    }

    fn build_params(&self, range: &Range) -> Result<AdapterParams, LoadError> {
        let inner = self.inner.borrow();
        let limit = range.len();
        match inner.config.strategy {
            PaginationStrategy::Offset => Ok(AdapterParams::Offset {
                offset: range.start,
                limit,
            }),
            PaginationStrategy::Page => {
                let page = range.start / limit.max(1) + 1;
                Ok(AdapterParams::Page { page, limit })
            }
            PaginationStrategy::Cursor => {
                let page = range.start / limit.max(1) + 1;
                if page == 1 {
                    Ok(AdapterParams::Cursor { cursor: None, limit })
                } else {
                    match inner.cursor_for_page.get(&(page - 1)) {
                        Some(cursor) => Ok(AdapterParams::Cursor {
                            cursor: Some(cursor.clone()),
                            limit,
                        }),
                        None => Err(LoadError::SequentialRequired { missing_page: page - 1 }),
                    }
                }
            }
        }
    }

    /// Performs one range's load: builds params, calls the adapter, writes
    /// the result into the cache, and emits the matching event. Assumes the
    /// caller already reserved an active slot.
    async fn execute_range(&self, range: Range) -> LoadOutcome {
        let range_id = self.cache.borrow().range_id_for_offset(range.start);
        let params = match self.build_params(&range) {
            Ok(p) => p,
            Err(LoadError::SequentialRequired { missing_page }) => {
                return LoadOutcome::Completed(LoadCompletion::SequentialRequired { missing_page })
            }
            Err(other) => {
                self.cache.borrow_mut().mark_failed(range_id, other.to_string());
                self.inner.borrow_mut().failed += 1;
                return LoadOutcome::Completed(LoadCompletion::Failed {
                    range_id,
                    attempts: 1,
                    message: other.to_string(),
                });
            }
        };

        self.cache.borrow_mut().mark_pending(range_id);
        let (abort_handle, abort_signal) = abort_pair();
        self.cache.borrow_mut().register_abort_handle(range_id, abort_handle);

        let page_for_cursor = match &params {
            AdapterParams::Cursor { .. } => Some(range.start / range.len().max(1) + 1),
            _ => None,
        };

        let result = self.adapter.read(params, abort_signal.clone()).await;

        match result {
            Ok(response) => {
                let forced_empty = range.start == 0 && response.items.is_empty();
                let item_count = response.items.len();
                let total = if forced_empty { Some(0) } else { response.meta.total };

                let items: Vec<Slot<T>> = response
                    .items
                    .into_iter()
                    .map(|item| match &self.transform {
                        Some(f) => Slot::Real(f(item)),
                        None => Slot::Real(item),
                    })
                    .collect();

                self.cache.borrow_mut().store(range.start, items);
                let became_loaded = self.cache.borrow_mut().try_mark_loaded_after_write(range_id);

                if let Some(page) = page_for_cursor {
                    let mut inner = self.inner.borrow_mut();
                    if let Some(cursor) = response.meta.effective_cursor() {
                        inner.cursor_for_page.insert(page, cursor.to_string());
                    }
                    // `hasNext=false` is sole authority when present; absent
                    // it, fall back to the weaker `items.len() < limit`
                    // signal (documented in DESIGN.md).
                    let reached_end = match response.meta.has_next {
                        Some(has_next) => !has_next,
                        None => item_count < range.len() as usize,
                    };
                    if reached_end {
                        inner.has_reached_end = true;
                    }
                    inner.highest_loaded_page = inner.highest_loaded_page.max(page);
                }

                self.inner.borrow_mut().completed += 1;
                if became_loaded {
                    self.events.borrow_mut().emit(ViewportEvent::RangeLoaded {
                        offset: range.start,
                        limit: range.len(),
                        item_count,
                        total,
                    });
                }
                LoadOutcome::Completed(LoadCompletion::Success {
                    range_id,
                    item_count,
                    total,
                    forced_empty,
                })
            }
            Err(err) => {
                if abort_signal.is_aborted() || is_abort_error(&err) {
                    self.inner.borrow_mut().cancelled += 1;
                    LoadOutcome::Cancelled(CancelReason::AbortSignal)
                } else {
                    let message = err.to_string();
                    self.cache.borrow_mut().mark_failed(range_id, message.clone());
                    let attempts = self
                        .cache
                        .borrow()
                        .failure(range_id)
                        .map(|f| f.attempts)
                        .unwrap_or(1);
                    self.inner.borrow_mut().failed += 1;
                    self.events.borrow_mut().emit(ViewportEvent::RangeError {
                        range_id,
                        attempts,
                        message: message.clone(),
                    });
                    LoadOutcome::Completed(LoadCompletion::Failed { range_id, attempts, message })
                }
            }
        }
    }

    /// The public entry point for loading a range. Resolves for every
    /// outcome — it is never rejected.
    pub async fn request_load(&self, range: Range, priority: Priority, caller: &'static str) -> LoadOutcome {
        let key = (range.start, range.end);

        {
            let inner = self.inner.borrow();
            if inner.active_range_keys.contains(&key) {
                return LoadOutcome::Deduped;
            }
            if inner.current_velocity > inner.config.cancel_load_threshold {
                drop(inner);
                self.inner.borrow_mut().cancelled += 1;
                return LoadOutcome::Cancelled(CancelReason::VelocityGate);
            }
            if inner.is_dragging && inner.current_velocity > 0.0 && inner.current_velocity < 0.5 {
                drop(inner);
                self.inner.borrow_mut().cancelled += 1;
                return LoadOutcome::Cancelled(CancelReason::DraggingResidual);
            }
        }

        let can_execute_now = {
            let inner = self.inner.borrow();
            inner.active_count < inner.config.max_concurrent_requests
        };

        if can_execute_now {
            self.reserve_slot(key);
            let outcome = self.execute_range(range).await;
            self.release_slot(&key);
            self.process_queue().await;
            return outcome;
        }

        if !self.inner.borrow().config.enable_request_queue {
            self.inner.borrow_mut().cancelled += 1;
            return LoadOutcome::Cancelled(CancelReason::QueueFull);
        }

        let has_room = {
            let inner = self.inner.borrow();
            inner.queue.len() < inner.config.max_queue_size
        };

        if has_room {
            let (tx, rx) = oneshot::channel();
            self.enqueue_sorted(range, priority, tx);
            return rx.await.unwrap_or(LoadOutcome::Cancelled(CancelReason::QueuePurged));
        }

        if caller == "viewport:idle" || caller == "viewport:range-changed" {
            let purged: Vec<QueuedRequest> = {
                let mut inner = self.inner.borrow_mut();
                inner.queue.drain(..).collect()
            };
            for req in purged {
                let _ = req.waiter.send(LoadOutcome::Cancelled(CancelReason::QueuePurged));
            }
            let (tx, rx) = oneshot::channel();
            self.enqueue_sorted(range, Priority::High, tx);
            self.kick_queue_later();
            return rx.await.unwrap_or(LoadOutcome::Cancelled(CancelReason::QueuePurged));
        }

        self.inner.borrow_mut().cancelled += 1;
        LoadOutcome::Cancelled(CancelReason::QueueFull)
    }

    fn reserve_slot(&self, key: (Index, Index)) {
        let mut inner = self.inner.borrow_mut();
        inner.active_count += 1;
        inner.active_range_keys.insert(key);
    }

    fn release_slot(&self, key: &(Index, Index)) {
        let mut inner = self.inner.borrow_mut();
        inner.active_count -= 1;
        inner.active_range_keys.remove(key);
    }

    fn enqueue_sorted(&self, range: Range, priority: Priority, waiter: oneshot::Sender<LoadOutcome>) {
        let mut inner = self.inner.borrow_mut();
        let req = QueuedRequest {
            range,
            priority,
            timestamp: Instant::now(),
            waiter,
        };
        let pos = inner
            .queue
            .iter()
            .position(|q| (q.priority, q.timestamp) > (req.priority, req.timestamp))
            .unwrap_or(inner.queue.len());
        inner.queue.insert(pos, req);
    }

    /// Nothing to do synchronously here; `process_queue` is awaited by the
    /// caller at the next opportunity in both test and production paths, so
    /// this is a documentation-only hook kept distinct from `enqueue_sorted`
    /// for readability at call sites.
    fn kick_queue_later(&self) {}

    /// Drains the queue while a concurrency slot is free. Called after every
    /// completed immediate load, from `on_idle`, and by the caller after
    /// `set_velocity` reports a downward threshold crossing.
    pub async fn process_queue(&self) {
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                if inner.active_count >= inner.config.max_concurrent_requests {
                    return;
                }
                if inner.queue.is_empty() {
                    return;
                }
                let req = inner.queue.remove(0);
                inner.active_count += 1;
                inner.active_range_keys.insert((req.range.start, req.range.end));
                req
            };

            let key = (next.range.start, next.range.end);
            let outcome = self.execute_range(next.range).await;
            self.release_slot(&key);
            let _ = next.waiter.send(outcome);
        }
    }

    /// Called once scrolling settles: purge stale queue entries, then
    /// re-issue a load for the current visible range, then drain the queue.
    pub async fn on_idle(&self, visible_range: Range) {
        let range_size = self.inner.borrow().config.range_size;
        let stale_threshold = 2 * range_size;

        let purged: Vec<QueuedRequest> = {
            let mut inner = self.inner.borrow_mut();
            let mut kept = Vec::with_capacity(inner.queue.len());
            let mut purged = Vec::new();
            for req in inner.queue.drain(..) {
                if req.range.gap(&visible_range) > stale_threshold {
                    purged.push(req);
                } else {
                    kept.push(req);
                }
            }
            inner.queue = kept;
            purged
        };
        for req in purged {
            let _ = req.waiter.send(LoadOutcome::Cancelled(CancelReason::QueuePurged));
        }

        let missing = self.missing_range_ids(visible_range);
        for id in missing {
            let range = range_for_id(id, self.inner.borrow().config.range_size);
            let _ = self.request_load(range, Priority::High, "viewport:idle").await;
        }

        self.process_queue().await;
    }

    /// RangeIds within `visible` that are neither loaded nor pending.
    pub fn missing_range_ids(&self, visible: Range) -> Vec<RangeId> {
        if visible.is_empty() {
            return Vec::new();
        }
        let range_size = self.inner.borrow().config.range_size;
        let cache = self.cache.borrow();
        let first_id = visible.start / range_size;
        let last_id = (visible.end - 1) / range_size;
        (first_id..=last_id)
            .filter(|id| !cache.is_loaded(*id) && !cache.is_pending(*id))
            .collect()
    }
}

fn is_abort_error(err: &LoadError) -> bool {
    matches!(err, LoadError::TransportFailure { message } if message == "AbortError" || message == "Failed to fetch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::adapter::mock::MockAdapter;
    use crate::viewport::events::EventBus;
    use std::rc::Rc;

    fn scheduler_for(
        items: Vec<u32>,
        strategy: PaginationStrategy,
        max_concurrent: usize,
        max_queue: usize,
    ) -> (Scheduler<u32>, Rc<RefCell<RangeCache<u32>>>, Rc<RefCell<EventBus>>) {
        let cache = Rc::new(RefCell::new(RangeCache::new(20)));
        let events = Rc::new(RefCell::new(EventBus::new()));
        let adapter: Rc<dyn Adapter<u32>> = Rc::new(MockAdapter::new(items));
        let config = SchedulerConfig {
            range_size: 20,
            cancel_load_threshold: 25.0,
            max_concurrent_requests: max_concurrent,
            enable_request_queue: true,
            max_queue_size: max_queue,
            max_sequential_pages: 10,
            strategy,
        };
        let scheduler = Scheduler::new(config, cache.clone(), events.clone(), adapter, None);
        (scheduler, cache, events)
    }

    #[tokio::test]
    async fn offset_load_stores_items_and_marks_loaded() {
        let items: Vec<u32> = (0..100).collect();
        let (scheduler, cache, _events) = scheduler_for(items, PaginationStrategy::Offset, 1, 1);

        let outcome = scheduler
            .request_load(Range::new(0, 20), Priority::Normal, "viewport:range-changed")
            .await;
        match outcome {
            LoadOutcome::Completed(LoadCompletion::Success { item_count, .. }) => assert_eq!(item_count, 20),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(cache.borrow().is_loaded(0));
        assert_eq!(cache.borrow().cached_item_count(), 20);
    }

    #[tokio::test]
    async fn velocity_above_threshold_cancels_without_failing() {
        let items: Vec<u32> = (0..100).collect();
        let (scheduler, cache, _events) = scheduler_for(items, PaginationStrategy::Offset, 1, 1);
        scheduler.set_velocity(100.0);

        let outcome = scheduler
            .request_load(Range::new(0, 20), Priority::Normal, "viewport:range-changed")
            .await;
        assert_eq!(outcome, LoadOutcome::Cancelled(CancelReason::VelocityGate));
        assert_eq!(scheduler.cancelled(), 1);
        assert_eq!(scheduler.failed(), 0);
        assert!(!cache.borrow().is_loaded(0));
    }

    #[tokio::test]
    async fn dragging_with_tiny_residual_velocity_is_cancelled() {
        let items: Vec<u32> = (0..100).collect();
        let (scheduler, _cache, _events) = scheduler_for(items, PaginationStrategy::Offset, 1, 1);
        scheduler.set_dragging(true);
        scheduler.set_velocity(0.2);

        let outcome = scheduler
            .request_load(Range::new(0, 20), Priority::Normal, "viewport:range-changed")
            .await;
        assert_eq!(outcome, LoadOutcome::Cancelled(CancelReason::DraggingResidual));
    }

    #[tokio::test]
    async fn duplicate_active_range_is_deduped() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let items: Vec<u32> = (0..100).collect();
                let (scheduler, _cache, _events) = scheduler_for(items, PaginationStrategy::Offset, 2, 2);

                let s1 = scheduler.clone();
                let handle = tokio::task::spawn_local(async move {
                    s1.request_load(Range::new(0, 20), Priority::Normal, "viewport:range-changed").await
                });
                tokio::task::yield_now().await;
                let outcome2 = scheduler
                    .request_load(Range::new(0, 20), Priority::Normal, "viewport:range-changed")
                    .await;
                assert_eq!(outcome2, LoadOutcome::Deduped);
                let _ = handle.await;
            })
            .await;
    }

    #[tokio::test]
    async fn queue_overflow_without_special_caller_is_cancelled() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let items: Vec<u32> = (0..1000).collect();
                let (scheduler, _cache, _events) = scheduler_for(items, PaginationStrategy::Offset, 1, 1);

                // fill the single active slot with a load that won't resolve immediately
                let s1 = scheduler.clone();
                let first = tokio::task::spawn_local(async move {
                    s1.request_load(Range::new(0, 20), Priority::Normal, "viewport:range-changed").await
                });
                tokio::task::yield_now().await;

                // fills the 1-slot queue
                let s2 = scheduler.clone();
                let second = tokio::task::spawn_local(async move {
                    s2.request_load(Range::new(20, 40), Priority::Normal, "viewport:range-changed").await
                });
                tokio::task::yield_now().await;

                // overflow: neither active nor queueable, and caller isn't special
                let third = scheduler
                    .request_load(Range::new(40, 60), Priority::Normal, "some-other-caller")
                    .await;
                assert_eq!(third, LoadOutcome::Cancelled(CancelReason::QueueFull));

                let _ = first.await;
                let _ = second.await;
            })
            .await;
    }

    #[tokio::test]
    async fn sequential_required_when_cursor_missing() {
        let items: Vec<u32> = (0..100).collect();
        let (scheduler, _cache, _events) = scheduler_for(items, PaginationStrategy::Cursor, 1, 1);

        // requesting page 3 (offset 40, limit 20) without having loaded page 2 first
        let outcome = scheduler
            .request_load(Range::new(40, 60), Priority::Normal, "viewport:range-changed")
            .await;
        assert_eq!(
            outcome,
            LoadOutcome::Completed(LoadCompletion::SequentialRequired { missing_page: 2 })
        );
    }

    #[tokio::test]
    async fn cursor_mode_sequential_chain_succeeds_in_order() {
        let items: Vec<u32> = (0..100).collect();
        let (scheduler, cache, _events) = scheduler_for(items, PaginationStrategy::Cursor, 1, 1);

        for page in 0..4u64 {
            let range = Range::new(page * 20, page * 20 + 20);
            let outcome = scheduler.request_load(range, Priority::Normal, "viewport:range-changed").await;
            match outcome {
                LoadOutcome::Completed(LoadCompletion::Success { .. }) => {}
                other => panic!("page {page} failed: {other:?}"),
            }
        }
        assert!(cache.borrow().is_loaded(3));
    }

    #[tokio::test]
    async fn zero_items_at_offset_zero_forces_empty_total() {
        let (scheduler, _cache, _events) = scheduler_for(Vec::<u32>::new(), PaginationStrategy::Offset, 1, 1);
        let outcome = scheduler
            .request_load(Range::new(0, 20), Priority::Normal, "viewport:range-changed")
            .await;
        match outcome {
            LoadOutcome::Completed(LoadCompletion::Success { total, forced_empty, .. }) => {
                assert!(forced_empty);
                assert_eq!(total, Some(0));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_range_ids_skips_loaded_and_pending() {
        let items: Vec<u32> = (0..200).collect();
        let (scheduler, cache, _events) = scheduler_for(items, PaginationStrategy::Offset, 1, 1);
        cache.borrow_mut().mark_loaded(2);
        cache.borrow_mut().mark_pending(3);

        let missing = scheduler.missing_range_ids(Range::new(0, 100));
        assert!(!missing.contains(&2));
        assert!(!missing.contains(&3));
        assert!(missing.contains(&0));
        assert!(missing.contains(&4));
    }

    #[tokio::test]
    async fn backoff_grows_exponentially_and_caps() {
        assert_eq!(backoff_duration(1), Duration::from_millis(1000));
        assert_eq!(backoff_duration(2), Duration::from_millis(2000));
        assert_eq!(backoff_duration(5), Duration::from_millis(16_000));
        assert_eq!(backoff_duration(10), Duration::from_millis(30_000));
    }
}
