//! Turns wheel/drag input into one authoritative scroll position plus a
//! signed velocity, and coalesces renders to one per animation frame.
//!
//! The RAF-coalescing shape mirrors the donor's `virtual_list.rs`: a
//! `render_scheduled` flag gates a single callback per frame instead of
//! emitting once per DOM event, so ten wheel events in one frame still
//! produce exactly one `scroll` and one `velocity-changed` emit.

use std::collections::VecDeque;
use std::time::Duration;

use instant::Instant;

use super::types::Direction;

const VELOCITY_WINDOW: Duration = Duration::from_millis(100);
const ANCHOR_GAP_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameUpdate {
    pub position: f64,
    pub velocity: f64,
    pub direction: Direction,
}

#[derive(Debug)]
pub struct SpeedTracker {
    velocity: f64,
    direction: Direction,
    last_position: Option<f64>,
    last_time: Option<Instant>,
    samples: VecDeque<(Instant, f64)>,
}

impl SpeedTracker {
    fn new() -> Self {
        Self {
            velocity: 0.0,
            direction: Direction::Forward,
            last_position: None,
            last_time: None,
            samples: VecDeque::new(),
        }
    }

    fn reset(&mut self) {
        self.velocity = 0.0;
        self.samples.clear();
        self.last_position = None;
        self.last_time = None;
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// `timeDelta = now - lastTime`; dropped if zero. Samples older than the
    /// 100 ms window are discarded; with ≥2 remaining, velocity is
    /// recomputed as the slope across the whole window rather than just the
    /// latest instantaneous delta, so a single jittery sample can't spike it.
    fn update(&mut self, position: f64, now: Instant) {
        let pos_delta = position - self.last_position.unwrap_or(position);
        if let Some(last_time) = self.last_time {
            if now <= last_time {
                return;
            }
        }
        self.direction = if pos_delta >= 0.0 { Direction::Forward } else { Direction::Backward };

        self.samples.push_back((now, position));
        while let Some(&(t, _)) = self.samples.front() {
            if now.duration_since(t) > VELOCITY_WINDOW {
                self.samples.pop_front();
            } else {
                break;
            }
        }
        if self.samples.len() >= 2 {
            let (oldest_time, oldest_pos) = *self.samples.front().unwrap();
            let (newest_time, newest_pos) = *self.samples.back().unwrap();
            let dt = newest_time.duration_since(oldest_time).as_secs_f64() * 1000.0;
            if dt > 0.0 {
                self.velocity = (newest_pos - oldest_pos) / dt;
            }
        }

        self.last_position = Some(position);
        self.last_time = Some(now);
    }
}

/// Click-anchor state: while active, wheel input is swallowed so a
/// free-spinning wheel's residual inertia can't move the list after the
/// user has clicked on it.
struct ClickAnchor {
    anchor_position: f64,
    last_event_time: Instant,
    initial_delta: Option<f64>,
    last_delta: f64,
    min_delta: f64,
    consecutive_increases: u32,
    sustained_high_count: u32,
    elapsed_since_start: Duration,
    start_time: Instant,
}

impl ClickAnchor {
    fn new(anchor_position: f64, now: Instant) -> Self {
        Self {
            anchor_position,
            last_event_time: now,
            initial_delta: None,
            last_delta: 0.0,
            min_delta: f64::MAX,
            consecutive_increases: 0,
            sustained_high_count: 0,
            elapsed_since_start: Duration::ZERO,
            start_time: now,
        }
    }

    /// Feeds one wheel delta through the discriminator. Returns `true` if
    /// the anchor should be released (normal scrolling resumes starting
    /// with this very delta).
    fn observe(&mut self, delta: f64, now: Instant) -> bool {
        let gap = now.duration_since(self.last_event_time);
        self.elapsed_since_start = now.duration_since(self.start_time);
        let magnitude = delta.abs();

        if gap > ANCHOR_GAP_TIMEOUT {
            self.last_event_time = now;
            return true;
        }

        let initial_delta = *self.initial_delta.get_or_insert(magnitude);
        let is_first_event = self.last_delta == 0.0;
        let last_delta = self.last_delta;
        let min_delta = self.min_delta.min(magnitude);

        let is_batched_repeat = last_delta > 0.0 && magnitude > 1.8 * last_delta && magnitude < 2.2 * last_delta;

        // The first event in an anchor has no real baseline to compare
        // against (lastDelta/minDelta are still at their zeroed/MAX initial
        // values), so it only establishes the baseline rather than counting
        // as an "increase".
        if !is_batched_repeat && !is_first_event {
            if magnitude > last_delta * 1.01 {
                self.consecutive_increases += 1;
            } else if magnitude < last_delta * 0.99 {
                self.consecutive_increases = 0;
            }
            if magnitude > min_delta * 1.05 {
                self.sustained_high_count += 1;
            } else {
                self.sustained_high_count = 0;
            }
        }

        self.last_delta = magnitude;
        self.min_delta = min_delta;
        self.last_event_time = now;

        let reaccelerated = magnitude > 1.15 * min_delta && magnitude > 1.08 * last_delta;

        let release = self.consecutive_increases >= 3
            || self.sustained_high_count >= 5
            || reaccelerated
            || magnitude < 30.0
            || (magnitude < 0.3 * initial_delta && self.elapsed_since_start > Duration::from_millis(300));

        release
    }
}

#[derive(Clone, Debug)]
pub struct ScrollStateConfig {
    pub sensitivity: f64,
    pub smoothing: bool,
    pub stop_on_click: bool,
}

impl Default for ScrollStateConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.5,
            smoothing: false,
            stop_on_click: true,
        }
    }
}

/// Owns the single scroll position, its velocity tracker, the click-anchor
/// discriminator, and RAF render coalescing. Framework-agnostic: the host
/// drives `on_animation_frame` from its own `requestAnimationFrame` loop and
/// reads back `FrameUpdate`s instead of this type emitting events directly,
/// so it can be exercised without any DOM or event bus in tests.
pub struct ScrollState {
    config: ScrollStateConfig,
    position: f64,
    max_scroll: f64,
    speed: SpeedTracker,
    anchor: Option<ClickAnchor>,
    is_scrolling: bool,
    has_emitted_idle: bool,
    render_scheduled: bool,
    last_frame_position: Option<f64>,
}

impl ScrollState {
    pub fn new(config: ScrollStateConfig) -> Self {
        Self {
            config,
            position: 0.0,
            max_scroll: 0.0,
            speed: SpeedTracker::new(),
            anchor: None,
            is_scrolling: false,
            has_emitted_idle: false,
            render_scheduled: false,
            last_frame_position: None,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        self.speed.velocity()
    }

    pub fn is_scrolling(&self) -> bool {
        self.is_scrolling
    }

    pub fn set_max_scroll(&mut self, max_scroll: f64) {
        self.max_scroll = max_scroll.max(0.0);
        self.position = self.position.clamp(0.0, self.max_scroll);
    }

    /// Position clamping is deferred until the caller knows `totalItems >
    /// 0` — before that, an `initialScrollIndex` position must survive
    /// untouched, so this bypasses `set_max_scroll`'s clamp entirely.
    pub fn set_position_unclamped(&mut self, position: f64) {
        self.position = position;
    }

    pub fn mousedown(&mut self, now: Instant) {
        if self.config.stop_on_click {
            self.anchor = Some(ClickAnchor::new(self.position, now));
        }
    }

    pub fn mouseup(&mut self) {
        self.anchor = None;
    }

    /// Processes one wheel event. `raw_delta` is `deltaY` (or `deltaX` for
    /// horizontal orientation) straight off the DOM event.
    pub fn wheel(&mut self, raw_delta: f64, now: Instant) {
        let mut delta = raw_delta * self.config.sensitivity;
        if self.config.smoothing {
            delta *= 0.3;
        }

        if let Some(anchor) = &mut self.anchor {
            let release = anchor.observe(delta, now);
            if !release {
                self.position = anchor.anchor_position;
                self.is_scrolling = true;
                self.has_emitted_idle = false;
                self.schedule_render();
                return;
            }
            self.anchor = None;
        }

        let new_pos = (self.position + delta).clamp(0.0, self.max_scroll);
        self.position = new_pos;
        self.speed.update(new_pos, now);
        self.is_scrolling = true;
        self.has_emitted_idle = false;
        self.schedule_render();
    }

    pub fn scroll_by(&mut self, delta: f64, now: Instant) {
        let new_pos = (self.position + delta).clamp(0.0, self.max_scroll);
        self.position = new_pos;
        self.speed.update(new_pos, now);
        self.is_scrolling = true;
        self.has_emitted_idle = false;
        self.schedule_render();
    }

    pub fn scroll_to_position(&mut self, pos: f64, now: Instant) {
        let new_pos = pos.clamp(0.0, self.max_scroll);
        self.position = new_pos;
        self.speed.update(new_pos, now);
        self.is_scrolling = true;
        self.has_emitted_idle = false;
        self.schedule_render();
    }

    fn schedule_render(&mut self) {
        self.render_scheduled = true;
    }

    /// Called once per `requestAnimationFrame` tick while `is_scrolling`.
    /// Flushes at most one coalesced `FrameUpdate`, then runs idle
    /// detection: two consecutive frames at the same position, while still
    /// flagged scrolling, emit idle exactly once and stop the loop (the
    /// host is expected to stop requesting frames once `is_scrolling`
    /// becomes `false`).
    pub fn on_animation_frame(&mut self, now: Instant) -> (Option<FrameUpdate>, bool) {
        let frame = if self.render_scheduled {
            self.render_scheduled = false;
            Some(FrameUpdate {
                position: self.position,
                velocity: self.speed.velocity(),
                direction: self.speed.direction(),
            })
        } else {
            None
        };

        let mut went_idle = false;
        if self.is_scrolling {
            if let Some(last) = self.last_frame_position {
                if (last - self.position).abs() < f64::EPSILON {
                    if !self.has_emitted_idle {
                        self.has_emitted_idle = true;
                        self.is_scrolling = false;
                        self.speed.reset();
                        went_idle = true;
                    }
                } else {
                    self.has_emitted_idle = false;
                }
            }
        }
        self.last_frame_position = Some(self.position);

        (frame, went_idle)
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
        self.speed.reset();
        self.anchor = None;
        self.is_scrolling = false;
        self.has_emitted_idle = false;
        self.render_scheduled = false;
        self.last_frame_position = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(ms: u64) -> Instant {
        // tests only ever compare durations between two `t()` calls, so an
        // arbitrary fixed epoch is fine — `instant::Instant` doesn't expose
        // a const constructor, so we derive every timestamp from `now()`.
        Instant::now() + Duration::from_millis(ms)
    }

    #[test]
    fn wheel_moves_position_and_schedules_one_frame() {
        let mut s = ScrollState::new(ScrollStateConfig::default());
        s.set_max_scroll(10_000.0);
        s.wheel(100.0, t(0));
        assert!(s.position() > 0.0);
        let (frame, _) = s.on_animation_frame(t(16));
        assert!(frame.is_some());
        let (frame2, _) = s.on_animation_frame(t(32));
        assert!(frame2.is_none(), "second frame with no new input should not re-emit");
    }

    #[test]
    fn position_clamps_to_max_scroll() {
        let mut s = ScrollState::new(ScrollStateConfig::default());
        s.set_max_scroll(100.0);
        s.wheel(10_000.0, t(0));
        assert_eq!(s.position(), 100.0);
    }

    #[test]
    fn idle_emits_once_after_two_still_frames() {
        let mut s = ScrollState::new(ScrollStateConfig::default());
        s.set_max_scroll(10_000.0);
        s.wheel(50.0, t(0));
        let (_, idle1) = s.on_animation_frame(t(16));
        assert!(!idle1);
        let (_, idle2) = s.on_animation_frame(t(32));
        assert!(idle2, "two consecutive unchanged frames should emit idle");
        let (_, idle3) = s.on_animation_frame(t(48));
        assert!(!idle3, "idle must not re-emit for further still frames");
        assert!(!s.is_scrolling());
    }

    #[test]
    fn click_anchor_swallows_decreasing_inertia() {
        let mut s = ScrollState::new(ScrollStateConfig::default());
        s.set_max_scroll(10_000.0);
        s.scroll_by(500.0, t(0));
        let anchored_at = s.position();
        s.mousedown(t(10));

        // strictly-decreasing magnitudes, no gap > 200ms: anchor holds
        s.wheel(120.0, t(20));
        assert_eq!(s.position(), anchored_at);
        s.wheel(100.0, t(40));
        assert_eq!(s.position(), anchored_at);
        s.wheel(80.0, t(60));
        assert_eq!(s.position(), anchored_at);
    }

    #[test]
    fn click_anchor_releases_on_long_gap() {
        let mut s = ScrollState::new(ScrollStateConfig::default());
        s.set_max_scroll(10_000.0);
        s.mousedown(t(0));
        s.wheel(200.0, t(10));
        let anchored_at = s.position();
        assert_eq!(s.position(), anchored_at);
        // gap > 200ms since the last wheel event: treated as a fresh,
        // intentional scroll rather than residual inertia.
        s.wheel(200.0, t(250));
        assert_ne!(s.position(), anchored_at);
    }

    #[test]
    fn speed_tracker_direction_follows_sign_of_delta() {
        let mut s = ScrollState::new(ScrollStateConfig::default());
        s.set_max_scroll(10_000.0);
        s.wheel(100.0, t(0));
        s.wheel(100.0, t(16));
        assert_eq!(s.velocity() > 0.0, true);
    }
}
