//! The one external I/O boundary: an opaque backend exposing a single
//! `read(params, abort)` call. `?Send` because wasm32 futures are not
//! `Send` and the whole engine is single-threaded cooperative, consistent
//! with the rest of the engine's wasm-bound async boundary never requiring
//! `Send` anywhere.

use async_trait::async_trait;
use serde::Deserialize;

use super::abort::AbortSignal;
use super::error::LoadError;
use super::types::Index;

/// Request shape the Scheduler builds, one variant per pagination strategy.
#[derive(Clone, Debug, PartialEq)]
pub enum AdapterParams {
    Offset { offset: Index, limit: u64 },
    Page { page: u64, limit: u64 },
    Cursor { cursor: Option<String>, limit: u64 },
}

/// Tolerant response shape: recognizes `data`, `items`, or a bare array as
/// the item list, and treats anything else as `ProtocolMismatch` at the
/// call site rather than here — this type only captures what `serde` can
/// parse generically.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AdapterMeta {
    pub total: Option<u64>,
    pub cursor: Option<String>,
    #[serde(rename = "nextCursor")]
    pub next_cursor: Option<String>,
    #[serde(rename = "hasNext")]
    pub has_next: Option<bool>,
}

impl AdapterMeta {
    /// `meta.cursor || meta.nextCursor`.
    pub fn effective_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().or(self.next_cursor.as_deref())
    }
}

pub struct AdapterResponse<T> {
    pub items: Vec<T>,
    pub meta: AdapterMeta,
}

/// The backend collaborator. Out of scope per spec §1; the core only
/// depends on this trait.
#[async_trait(?Send)]
pub trait Adapter<T> {
    async fn read(
        &self,
        params: AdapterParams,
        abort: AbortSignal,
    ) -> Result<AdapterResponse<T>, LoadError>;
}

/// In-memory adapter for tests (spec tooling, §1/§8 [AMBIENT]): backed by a
/// fixed `Vec<T>`, with injectable latency and a one-shot failure queue, the
/// role the donor's own integration tests fill with a fake store instead of
/// a live Nostr relay.
#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::time::Duration;

    pub struct MockAdapter<T: Clone> {
        items: Vec<T>,
        pub latency: Duration,
        /// Offsets that should fail their *next* read (one-shot).
        pub fail_once: RefCell<std::collections::HashSet<u64>>,
        pub calls: RefCell<Vec<AdapterParams>>,
        /// cursor string issued for "page N" -> used to validate sequential chains
        pub cursor_for_page: RefCell<std::collections::HashMap<u64, String>>,
    }

    impl<T: Clone> MockAdapter<T> {
        pub fn new(items: Vec<T>) -> Self {
            Self {
                items,
                latency: Duration::from_millis(0),
                fail_once: RefCell::new(Default::default()),
                calls: RefCell::new(Vec::new()),
                cursor_for_page: RefCell::new(Default::default()),
            }
        }

        pub fn total(&self) -> u64 {
            self.items.len() as u64
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    #[async_trait(?Send)]
    impl<T: Clone + 'static> Adapter<T> for MockAdapter<T> {
        async fn read(
            &self,
            params: AdapterParams,
            mut abort: AbortSignal,
        ) -> Result<AdapterResponse<T>, LoadError> {
            self.calls.borrow_mut().push(params.clone());

            if !self.latency.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.latency) => {}
                    _ = abort.aborted() => return Err(LoadError::TransportFailure { message: "AbortError".into() }),
                }
            }
            if abort.is_aborted() {
                return Err(LoadError::TransportFailure { message: "AbortError".into() });
            }

            let (offset, limit) = match &params {
                AdapterParams::Offset { offset, limit } => (*offset, *limit),
                AdapterParams::Page { page, limit } => (((page - 1) * limit), *limit),
                AdapterParams::Cursor { cursor, limit } => {
                    let page = match cursor {
                        None => 1u64,
                        Some(c) => {
                            let prev_page = self
                                .cursor_for_page
                                .borrow()
                                .iter()
                                .find(|(_, v)| *v == c)
                                .map(|(k, _)| *k)
                                .unwrap_or(1);
                            prev_page + 1
                        }
                    };
                    ((page - 1) * limit, *limit)
                }
            };

            if self.fail_once.borrow_mut().remove(&offset) {
                return Err(LoadError::TransportFailure { message: "simulated failure".into() });
            }

            let start = (offset as usize).min(self.items.len());
            let end = (start + limit as usize).min(self.items.len());
            let slice = self.items[start..end].to_vec();

            let mut meta = AdapterMeta {
                total: Some(self.items.len() as u64),
                ..Default::default()
            };

            if let AdapterParams::Cursor { .. } = &params {
                let page = offset / limit.max(1) + 1;
                let has_next = end < self.items.len();
                let next_cursor = if has_next {
                    let token = format!("cursor-{page}");
                    self.cursor_for_page.borrow_mut().insert(page, token.clone());
                    Some(token)
                } else {
                    None
                };
                meta.has_next = Some(has_next);
                meta.cursor = next_cursor;
            }

            Ok(AdapterResponse { items: slice, meta })
        }
    }
}
