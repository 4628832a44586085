//! WASM bindings for the SEIR core library.
//!
//! `WasmSeirModel` runs a whole scenario in one call; `WasmTimelineRunner`
//! integrates in batches of days so a UI can report progress.

mod model;
mod runner;

pub use model::WasmSeirModel;
pub use runner::WasmTimelineRunner;

use seir_core::Method;
use wasm_bindgen::prelude::*;

/// Names accepted by the `integrator` parameter.
#[wasm_bindgen]
pub fn available_methods() -> js_sys::Array {
    Method::ALL
        .iter()
        .map(|method| JsValue::from_str(method.name()))
        .collect()
}

pub(crate) fn to_js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}
