//! The viewport engine: geometry, range cache, scheduler, scroll state, and
//! the controller that wires them together. Framework-agnostic — nothing
//! here touches `web_sys` or Dioxus directly; that glue lives in
//! `crate::components`.

pub mod abort;
pub mod adapter;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod geometry;
pub mod range_cache;
pub mod scheduler;
pub mod scroll_state;
pub mod types;

pub use adapter::{Adapter, AdapterMeta, AdapterParams, AdapterResponse};
#[cfg(any(test, feature = "test-support"))]
pub use adapter::mock::MockAdapter;
pub use config::{ItemSize, PaginationStrategy, ViewportConfig};
pub use controller::{Controller, LifecycleState};
pub use error::{log_invariant_violation, CancelReason, LoadError};
pub use events::{EventBus, SubscriptionId, ViewportEvent};
pub use range_cache::RangeCache;
pub use scheduler::{LoadCompletion, LoadOutcome, Scheduler};
pub use scroll_state::{ScrollState, SpeedTracker};
pub use types::{
    range_for_id, range_id, Alignment, Direction, Index, Orientation, Placeholder, Priority, Range, RangeId, Slot,
};
