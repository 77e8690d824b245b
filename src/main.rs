#![allow(non_snake_case)]

use std::rc::Rc;

use dioxus::prelude::*;

use viewport_core::components::ViewportList;
use viewport_core::viewport::{Adapter, MockAdapter};
use viewport_core::{Controller, ViewportConfig};

fn main() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
        tracing_wasm::set_as_global_default();
    }

    log::info!("starting viewport demo");
    dioxus::launch(App);
}

#[derive(Clone, Debug, PartialEq)]
struct DemoItem {
    label: String,
}

#[component]
fn App() -> Element {
    let controller = use_signal(|| {
        let items: Vec<DemoItem> = (0..250_000u64)
            .map(|i| DemoItem { label: format!("row {i}") })
            .collect();
        let adapter: Rc<dyn Adapter<DemoItem>> = Rc::new(MockAdapter::new(items));
        Controller::new(ViewportConfig::default(), adapter)
    });

    rsx! {
        div {
            style: "height: 100vh; display: flex; flex-direction: column;",
            h1 { "viewport-core demo" }
            div {
                style: "flex: 1; border: 1px solid #333;",
                ViewportList {
                    controller: controller.read().clone(),
                    item_content: render_row,
                }
            }
        }
    }
}

fn render_row(item: Option<DemoItem>, index: u64) -> Element {
    match item {
        Some(item) => rsx! { div { "{item.label}" } },
        None => rsx! { div { class: "skeleton", "loading row {index}…" } },
    }
}
