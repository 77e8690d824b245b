//! Deterministic Index-space <-> pixel-space mapping (spec §4.1).
//!
//! Every function here is pure: no allocation, no shared state, and no
//! panics on malformed input — degenerate inputs produce degenerate but
//! safe outputs (`Range::EMPTY`, a zero-sized virtual space), matching
//! spec.md's "Failure semantics: invalid inputs produce degenerate but safe
//! outputs; no exceptions."
//!
//! Compression (when `total_items * item_size` would exceed
//! `max_virtual_size`, the browser transform ceiling) is handled inline
//! rather than as a separate code path, since both branches share the
//! near-bottom correction.

use super::types::{Index, Range};

/// `virtual_size / (total_items * item_size)`. `1.0` when uncompressed.
fn compression_ratio(virtual_size: f64, raw_size: f64) -> f64 {
    if raw_size <= 0.0 {
        1.0
    } else {
        virtual_size / raw_size
    }
}

fn virtual_size_for(total_items: u64, item_size: f64, max_virtual_size: f64) -> f64 {
    let raw = total_items as f64 * item_size;
    raw.min(max_virtual_size)
}

/// Resolves valid, non-degenerate inputs. Returns `None` for anything that
/// would force a NaN or otherwise unsafe computation downstream (I4).
fn validate_inputs(container_size: f64, item_size: f64, total_items: u64) -> Option<()> {
    if total_items == 0 {
        return None;
    }
    if !container_size.is_finite() || container_size <= 0.0 {
        return None;
    }
    if !item_size.is_finite() || item_size <= 0.0 {
        return None;
    }
    Some(())
}

/// Computes the visible index range for the current scroll position.
///
/// `target_index`, when set, is consumed by the *caller* after the first
/// render that honors it (spec §4.1: "consume the target on first use") —
/// this function is pure and stateless, so it simply applies the override
/// every time it is passed; clearing it after first use is the Controller's
/// responsibility (spec §4.5's `targetScrollIndex` bookkeeping).
pub fn visible_range(
    scroll_pos: f64,
    container_size: f64,
    item_size: f64,
    total_items: u64,
    overscan: u64,
    max_virtual_size: f64,
    target_index: Option<Index>,
) -> Range {
    if validate_inputs(container_size, item_size, total_items).is_none() {
        return Range::EMPTY;
    }
    if !scroll_pos.is_finite() {
        return Range::EMPTY;
    }

    let raw_size = total_items as f64 * item_size;
    let virtual_size = virtual_size_for(total_items, item_size, max_virtual_size);
    let ratio = compression_ratio(virtual_size, raw_size);

    let (mut start, mut end): (f64, f64) = if ratio >= 1.0 {
        let start = (scroll_pos / item_size).floor() - overscan as f64;
        let end = start + (container_size / item_size).ceil() + 2.0 * overscan as f64;
        (start, end)
    } else {
        let scroll_ratio = scroll_pos / virtual_size;
        let exact_index = scroll_ratio * total_items as f64;
        let visible_count = (container_size / item_size).ceil() + 2.0 * overscan as f64;
        let start = exact_index.floor();
        let end = exact_index.ceil() + visible_count;
        (start, end)
    };

    apply_near_bottom_correction(&mut start, &mut end, scroll_pos, virtual_size, container_size, item_size, total_items);

    if let Some(target) = target_index {
        let new_start = (target as f64 - overscan as f64).max(0.0);
        end += new_start - start;
        start = new_start;
    }

    clamp_range(start, end, total_items)
}

/// Linearly interpolates `start`/`end` toward the bottom-anchored window as
/// `scroll_pos` nears the end of the virtual space, guaranteeing the last
/// items stay reachable despite compression rounding (spec §4.1).
fn apply_near_bottom_correction(
    start: &mut f64,
    end: &mut f64,
    scroll_pos: f64,
    virtual_size: f64,
    container_size: f64,
    item_size: f64,
    total_items: u64,
) {
    let distance_from_bottom = (virtual_size - container_size) - scroll_pos;
    if distance_from_bottom > container_size {
        return;
    }

    let first_visible_at_bottom =
        (total_items as f64 - (container_size / item_size).floor()).max(0.0);
    let factor = (1.0 - distance_from_bottom / container_size).clamp(0.0, 1.0);

    let span = *end - *start;
    *start += factor * (first_visible_at_bottom - *start);
    *end = *start + span;

    if distance_from_bottom <= 1.0 {
        *end = total_items as f64;
    }
}

fn clamp_range(start: f64, end: f64, total_items: u64) -> Range {
    if !start.is_finite() || !end.is_finite() {
        return Range::EMPTY;
    }
    let clamped_start = start.max(0.0).min((total_items - 1) as f64) as u64;
    let clamped_end_f = end.max(start).min(total_items as f64);
    let clamped_end = clamped_end_f.max(clamped_start as f64 + 1.0) as u64;
    Range::new(clamped_start, clamped_end.min(total_items))
}

/// Pixel offset of `index` from the top (or left, for horizontal
/// orientation) of the viewport, given the current scroll position.
pub fn position_for_item(
    index: Index,
    scroll_pos: f64,
    total_items: u64,
    item_size: f64,
    max_virtual_size: f64,
    container_size: f64,
) -> f64 {
    if validate_inputs(container_size, item_size, total_items).is_none() {
        return 0.0;
    }

    let raw_size = total_items as f64 * item_size;
    let virtual_size = virtual_size_for(total_items, item_size, max_virtual_size);
    let ratio = compression_ratio(virtual_size, raw_size);

    if ratio >= 1.0 {
        return index as f64 * item_size - scroll_pos;
    }

    let scroll_ratio = scroll_pos / virtual_size;
    let mut position = (index as f64 - scroll_ratio * total_items as f64) * item_size;

    // Symmetric near-bottom correction so the rendered stack doesn't jitter
    // near the edge (spec §4.1).
    let distance_from_bottom = (virtual_size - container_size) - scroll_pos;
    if distance_from_bottom <= container_size {
        let first_visible_at_bottom =
            (total_items as f64 - (container_size / item_size).floor()).max(0.0);
        let factor = (1.0 - distance_from_bottom / container_size).clamp(0.0, 1.0);
        let bottom_anchored_position = (index as f64 - first_visible_at_bottom) * item_size;
        position += factor * (bottom_anchored_position - position);
    }

    position
}

/// Pixel extent the scrollbar represents (spec §4.1): may be less than
/// `total_items * item_size` under compression.
pub fn total_virtual_size(total_items: u64, item_size: f64, container_padding: f64, max_virtual_size: f64) -> f64 {
    if total_items == 0 || item_size <= 0.0 || !item_size.is_finite() {
        return container_padding.max(0.0);
    }
    (total_items as f64 * item_size + container_padding).min(max_virtual_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::config::DEFAULT_MAX_VIRTUAL_SIZE;

    const ITEM: f64 = 50.0;
    const CONTAINER: f64 = 600.0;

    #[test]
    fn empty_total_items_is_empty_range() {
        let r = visible_range(0.0, CONTAINER, ITEM, 0, 2, DEFAULT_MAX_VIRTUAL_SIZE, None);
        assert_eq!(r, Range::EMPTY);
    }

    #[test]
    fn single_item_clamps_to_zero() {
        let r = visible_range(0.0, CONTAINER, ITEM, 1, 2, DEFAULT_MAX_VIRTUAL_SIZE, None);
        assert_eq!(r, Range::new(0, 1));
    }

    #[test]
    fn uncompressed_basic_range() {
        let r = visible_range(1000.0, CONTAINER, ITEM, 10_000, 2, DEFAULT_MAX_VIRTUAL_SIZE, None);
        // start = floor(1000/50) - 2 = 18; end = 18 + ceil(600/50) + 4 = 18+12+4=34
        assert_eq!(r.start, 18);
        assert_eq!(r.end, 34);
    }

    #[test]
    fn visible_range_is_never_nan_and_stays_in_bounds() {
        let total = 1_000_000u64;
        for scroll in [0.0, 1.0, 12345.6, 49_999_999.0, f64::NAN, f64::INFINITY, -5.0] {
            let r = visible_range(scroll, CONTAINER, ITEM, total, 2, DEFAULT_MAX_VIRTUAL_SIZE, None);
            assert!(r.start <= total);
            assert!(r.end <= total);
            assert!(r.start <= r.end);
        }
    }

    #[test]
    fn near_bottom_reaches_last_index() {
        let total = 10_000u64;
        let full = total_virtual_size(total, ITEM, 0.0, DEFAULT_MAX_VIRTUAL_SIZE);
        let max_scroll = full - CONTAINER;
        let r = visible_range(max_scroll, CONTAINER, ITEM, total, 2, DEFAULT_MAX_VIRTUAL_SIZE, None);
        assert!(r.end >= total, "expected end to reach total_items, got {r:?}");
    }

    #[test]
    fn compressed_mode_near_bottom_reaches_last_index() {
        // force compression: 10M items * 50px = 500,000,000 px, ceiling at 1e8
        let total = 10_000_000u64;
        let max_virtual = 100_000_000.0;
        let full = total_virtual_size(total, ITEM, 0.0, max_virtual);
        assert!(full < total as f64 * ITEM, "expected compression to engage");

        let r = visible_range(full - CONTAINER, CONTAINER, ITEM, total, 2, max_virtual, None);
        assert!(r.end >= total - 1, "compressed near-bottom should reach the tail, got {r:?}");
    }

    #[test]
    fn target_index_overrides_start_under_compression() {
        let total = 10_000_000u64;
        let max_virtual = 100_000_000.0;
        let r = visible_range(0.0, CONTAINER, ITEM, total, 2, max_virtual, Some(500_000));
        assert_eq!(r.start, 500_000 - 2);
    }

    #[test]
    fn position_for_item_uncompressed_matches_formula() {
        let pos = position_for_item(20, 500.0, 10_000, ITEM, DEFAULT_MAX_VIRTUAL_SIZE, CONTAINER);
        assert_eq!(pos, 20.0 * ITEM - 500.0);
    }

    #[test]
    fn total_virtual_size_caps_at_ceiling() {
        let size = total_virtual_size(10_000_000, ITEM, 0.0, 100_000_000.0);
        assert_eq!(size, 100_000_000.0);
    }

    #[test]
    fn invariant_span_bound_holds_across_random_like_sweep() {
        let total = 5_000u64;
        let overscan = 2u64;
        let max_span = (CONTAINER / ITEM).ceil() as u64 + 2 * overscan + 2;
        let mut scroll = 0.0;
        while scroll < total as f64 * ITEM {
            let r = visible_range(scroll, CONTAINER, ITEM, total, overscan, DEFAULT_MAX_VIRTUAL_SIZE, None);
            assert!(r.len() <= max_span, "range {:?} exceeded bound {} at scroll={}", r, max_span, scroll);
            scroll += 137.0;
        }
    }
}
