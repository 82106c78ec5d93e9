//! WASM bindings for the Tapwrite editor.
//!
//! Exposes the `Tapwrite` class: a rich-text editor mounted into a host
//! element, with image uploads going through a host-supplied function.

mod capability;
mod editor;
mod types;

pub use editor::*;
pub use types::*;

use wasm_bindgen::prelude::*;

/// Initialize panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    use tracing::Level;
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;

    let console_level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );

    let filter = EnvFilter::new("info,tapwrite=debug");

    let reg = Registry::default().with(filter).with(wasm_layer);

    let _ = set_global_default(reg);
}
