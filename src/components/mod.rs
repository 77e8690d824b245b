//! Dioxus components. [`viewport_list`] is the only one the engine itself
//! ships; everything else is left to the host app.

pub mod viewport_list;

pub use viewport_list::{ViewportList, ViewportListProps};
