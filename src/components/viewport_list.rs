//! Dioxus rendering shell over [`crate::viewport::Controller`]: owns the DOM
//! scaffold, forwards wheel/mousedown events, and drives the RAF loop that
//! coalesces scroll/velocity updates and range-changed loads.
//!
//! Shaped after the existing `onmounted`-for-container-measurement and
//! `requestAnimationFrame`-throttled scroll handling pattern, generalized to
//! delegate geometry and scheduling entirely to the Controller instead of
//! computing a visible range from summed item heights.

use dioxus::prelude::*;
use instant::Instant;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsCast;

use crate::viewport::geometry::position_for_item;
use crate::viewport::{Controller, Range, Slot};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = requestAnimationFrame)]
    fn request_animation_frame(closure: &js_sys::Function);
}

/// Reads the mounted container's measured height off the DOM. DOM attach
/// failures are not part of the Adapter contract, so they are `anyhow`
/// errors logged at the call site rather than propagated, per the
/// Controller's "never throws to callers" rule.
#[cfg(target_arch = "wasm32")]
fn measured_container_size(evt: &Event<MountedData>) -> anyhow::Result<f64> {
    let element = evt
        .data()
        .downcast::<web_sys::HtmlElement>()
        .ok_or_else(|| anyhow::anyhow!("mounted viewport container is not an HtmlElement"))?;
    Ok(element.client_height() as f64)
}

#[derive(Props, Clone, PartialEq)]
pub struct ViewportListProps<T: PartialEq + Clone + 'static> {
    pub controller: Controller<T>,
    /// Renders one slot: `Some(item)` for a real item, `None` for a
    /// placeholder occupying the same position.
    pub item_content: fn(Option<T>, u64) -> Element,
    #[props(default = "viewport-list".to_string())]
    pub container_class: String,
}

/// Renders the current visible window of a [`Controller`] and keeps the RAF
/// loop alive while the user is actively scrolling.
#[component]
pub fn ViewportList<T: PartialEq + Clone + 'static>(props: ViewportListProps<T>) -> Element {
    let controller = props.controller.clone();
    let mut visible = use_signal(|| Range::EMPTY);

    let init_controller = controller.clone();
    let onmounted = move |evt: Event<MountedData>| {
        let controller = init_controller.clone();
        let mut visible = visible;
        #[cfg(target_arch = "wasm32")]
        let container_size = measured_container_size(&evt).unwrap_or_else(|err| {
            log::warn!("falling back to default container size: {err:#}");
            600.0
        });
        #[cfg(not(target_arch = "wasm32"))]
        let container_size = {
            let _ = evt;
            600.0
        };
        spawn(async move {
            // Defers the initial (possibly positional) load until after this
            // frame's DOM attachment settles, the same `setTimeout(..., 0)`
            // suspension point the donor's own mount-time effects use.
            #[cfg(target_arch = "wasm32")]
            gloo_timers::future::TimeoutFuture::new(0).await;
            controller.initialize(container_size.max(1.0)).await;
            visible.set(controller.visible_range());
        });
    };

    let wheel_controller = controller.clone();
    let onwheel = move |evt: Event<WheelData>| {
        let controller = wheel_controller.clone();
        #[cfg(target_arch = "wasm32")]
        let delta_y = {
            let data = evt.data();
            data.downcast::<web_sys::WheelEvent>().map(|e| e.delta_y()).unwrap_or(0.0)
        };
        #[cfg(not(target_arch = "wasm32"))]
        let delta_y = {
            let _ = &evt;
            0.0
        };
        controller.handle_wheel(delta_y, Instant::now());
        schedule_frame(controller, visible);
    };

    let mousedown_controller = controller.clone();
    let onmousedown = move |_evt: Event<MouseData>| {
        mousedown_controller.handle_mousedown(Instant::now());
    };

    let mouseup_controller = controller.clone();
    let onmouseup = move |_evt: Event<MouseData>| {
        mouseup_controller.handle_mouseup();
    };

    let range = *visible.read();
    let item_size = controller.item_size();
    let scroll_pos = controller.scroll_position();
    let total = controller.total_items().unwrap_or(0);
    let max_virtual_size = controller.max_virtual_size();
    let cache = controller.cache();

    // The container never scrolls natively (the compressed virtual space
    // can exceed what `scrollTop`/`scrollHeight` can represent): wheel deltas
    // drive `scroll_pos` directly, and each item is placed by `translateY`
    // relative to it, matching `position_for_item`'s own frame of reference.
    rsx! {
        div {
            class: "{props.container_class}",
            style: "overflow: hidden; position: relative; height: 100%;",
            onmounted,
            onwheel,
            onmousedown,
            onmouseup,

            for index in range.start..range.end {
                {
                    let top = position_for_item(index, scroll_pos, total, item_size, max_virtual_size, 0.0);
                    let slot = cache.borrow().get(index).cloned();
                    let (item, is_placeholder) = match slot {
                        Some(Slot::Real(value)) => (Some(value), false),
                        Some(Slot::Placeholder(_)) => (None, true),
                        None => (None, true),
                    };
                    let class = if is_placeholder { "viewport-item viewport-item--placeholder" } else { "viewport-item" };
                    rsx! {
                        div {
                            key: "{index}",
                            class: "{class}",
                            style: "position: absolute; top: 0; left: 0; right: 0; transform: translateY({top}px); height: {item_size}px;",
                            "data-index": "{index}",
                            {(props.item_content)(item, index)}
                        }
                    }
                }
            }
        }
    }
}

/// Spawns (wasm32) or inlines (native/test builds) one RAF-driven frame of
/// the Controller's scroll/velocity/idle processing, then re-schedules
/// itself while more frames are pending.
fn schedule_frame<T: Clone + 'static>(controller: Controller<T>, mut visible: Signal<Range>) {
    #[cfg(target_arch = "wasm32")]
    {
        let closure = wasm_bindgen::closure::Closure::once_into_js(move || {
            let controller = controller.clone();
            spawn(async move {
                let new_range = controller.on_animation_frame(Instant::now()).await;
                visible.set(new_range);
            });
        });
        request_animation_frame(closure.unchecked_ref());
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        spawn(async move {
            let new_range = controller.on_animation_frame(Instant::now()).await;
            visible.set(new_range);
        });
    }
}
