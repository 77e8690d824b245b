//! Recognized configuration options, as a single deserializable struct with
//! documented defaults — a plain struct, `#[serde(default)]` per field, one
//! `Default` impl holding every named constant, the same shape used for
//! settings stores elsewhere in the engine.

use serde::{Deserialize, Serialize};

use super::types::Orientation;

/// Pagination strategy the Scheduler issues adapter calls under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationStrategy {
    Offset,
    Page,
    Cursor,
}

impl Default for PaginationStrategy {
    fn default() -> Self {
        PaginationStrategy::Offset
    }
}

/// Item size: a fixed pixel value, or auto-detected from the first mounted
/// DOM elements.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemSize {
    Fixed(f64),
    Auto,
}

impl Default for ItemSize {
    fn default() -> Self {
        ItemSize::Auto
    }
}

/// Safety ceiling for browser transforms: `10^8` px by default.
pub const DEFAULT_MAX_VIRTUAL_SIZE: f64 = 100_000_000.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    // --- Geometry ---
    pub item_size: ItemSize,
    pub overscan: u64,
    pub orientation: Orientation,
    pub auto_detect_item_size: bool,
    pub max_virtual_size: f64,
    pub container_padding: f64,

    // --- Cache ---
    pub range_size: u64,
    pub max_cached_items: usize,
    pub eviction_buffer: u64,

    // --- Scheduler ---
    pub strategy: PaginationStrategy,
    pub cancel_load_threshold: f64,
    pub max_concurrent_requests: usize,
    pub enable_request_queue: bool,
    pub max_queue_size: usize,
    pub max_sequential_pages: u32,

    // --- Positioning ---
    pub initial_scroll_index: Index,
    pub select_id: Option<String>,
    pub auto_load: bool,
    pub auto_select_first: bool,

    // --- Behavior ---
    pub stop_on_click: bool,
    pub sensitivity: f64,
    pub smoothing: bool,
}

use super::types::Index;

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            item_size: ItemSize::Auto,
            overscan: 2,
            orientation: Orientation::Vertical,
            auto_detect_item_size: true,
            max_virtual_size: DEFAULT_MAX_VIRTUAL_SIZE,
            container_padding: 0.0,

            range_size: 20,
            max_cached_items: 1000,
            eviction_buffer: 150,

            strategy: PaginationStrategy::Offset,
            cancel_load_threshold: 25.0,
            max_concurrent_requests: 1,
            enable_request_queue: true,
            max_queue_size: 1,
            max_sequential_pages: 10,

            initial_scroll_index: 0,
            select_id: None,
            auto_load: true,
            auto_select_first: false,

            stop_on_click: true,
            sensitivity: 0.5,
            smoothing: false,
        }
    }
}

impl ViewportConfig {
    pub fn fixed_item_size(&self) -> Option<f64> {
        match self.item_size {
            ItemSize::Fixed(size) => Some(size),
            ItemSize::Auto => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let cfg = ViewportConfig::default();
        assert_eq!(cfg.overscan, 2);
        assert_eq!(cfg.range_size, 20);
        assert_eq!(cfg.max_cached_items, 1000);
        assert_eq!(cfg.eviction_buffer, 150);
        assert_eq!(cfg.cancel_load_threshold, 25.0);
        assert_eq!(cfg.max_concurrent_requests, 1);
        assert_eq!(cfg.max_queue_size, 1);
        assert_eq!(cfg.max_virtual_size, DEFAULT_MAX_VIRTUAL_SIZE);
        assert!(cfg.auto_load);
        assert!(!cfg.auto_select_first);
    }

    #[test]
    fn deserialize_partial_config_fills_defaults() {
        let json = r#"{"overscan": 5, "strategy": "cursor"}"#;
        let cfg: ViewportConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.overscan, 5);
        assert_eq!(cfg.strategy, PaginationStrategy::Cursor);
        assert_eq!(cfg.range_size, 20);
    }
}
