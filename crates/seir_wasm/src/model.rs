//! Whole-scenario model wrapper.

use crate::to_js_error;
use anyhow::Context;
use seir_core::{Parameters, Scenario, SeirModel};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub(crate) fn build_model(params_val: JsValue) -> Result<SeirModel, JsValue> {
    let parameters: Parameters = from_value(params_val)
        .map_err(|e| JsValue::from_str(&format!("Invalid model parameters: {}", e)))?;
    SeirModel::new(parameters)
        .context("Model construction failed")
        .map_err(to_js_error)
}

pub(crate) fn parse_scenario(scenario_val: JsValue) -> Result<Scenario, JsValue> {
    from_value(scenario_val).map_err(|e| JsValue::from_str(&format!("Invalid scenario: {}", e)))
}

#[wasm_bindgen]
pub struct WasmSeirModel {
    model: SeirModel,
}

#[wasm_bindgen]
impl WasmSeirModel {
    /// Accepts the calculator's parameter object (`r0`, `dIncubation`, ...).
    #[wasm_bindgen(constructor)]
    pub fn new(params_val: JsValue) -> Result<WasmSeirModel, JsValue> {
        console_error_panic_hook::set_once();
        Ok(WasmSeirModel {
            model: build_model(params_val)?,
        })
    }

    /// Name of the integration method in use.
    pub fn integrator(&self) -> String {
        self.model.parameters().integrator.clone()
    }

    /// Returns an array with one `{deaths, hospitalized, ...}` object per day.
    pub fn calculate(&self, scenario_val: JsValue) -> Result<JsValue, JsValue> {
        let scenario = parse_scenario(scenario_val)?;
        let timeline = self
            .model
            .calculate(&scenario)
            .context("Simulation failed")
            .map_err(to_js_error)?;

        to_value(&timeline).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Same as `calculate`, wrapped with numeric diagnostics.
    pub fn calculate_with_diagnostics(&self, scenario_val: JsValue) -> Result<JsValue, JsValue> {
        let scenario = parse_scenario(scenario_val)?;
        let report = self
            .model
            .calculate_with_diagnostics(&scenario)
            .context("Simulation failed")
            .map_err(to_js_error)?;

        to_value(&report).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}
