//! Core engine for a virtual-scrolling viewport: a sliding window of
//! elements rendered over a lazily-materialized sequence of up to hundreds
//! of millions of items, backed by a velocity-aware load scheduler.
//!
//! This crate is the engine only — geometry, range cache, scheduler, scroll
//! state, and the controller that wires them together. The Dioxus component
//! in [`components`] is a thin rendering shell over [`viewport::Controller`].

pub mod components;
pub mod viewport;

pub use viewport::{Controller, ViewportConfig, ViewportEvent};
