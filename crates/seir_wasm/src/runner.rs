//! Stepped timeline runner.

use crate::model::{build_model, parse_scenario};
use seir_core::simulation::{Diagnostics, SimulationReport};
use seir_core::{Timeline, TimelineSample};
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

/// Progress payload returned after each batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TimelineProgress {
    done: bool,
    days_done: usize,
    total_days: usize,
}

pub(crate) struct TimelineRunnerState {
    timeline: Timeline,
    samples: Vec<TimelineSample>,
    total_days: usize,
}

impl TimelineRunnerState {
    pub(crate) fn new(timeline: Timeline) -> Self {
        let total_days = timeline.len();
        Self {
            timeline,
            samples: Vec::with_capacity(total_days),
            total_days,
        }
    }

    pub(crate) fn progress(&self) -> TimelineProgress {
        TimelineProgress {
            done: self.samples.len() == self.total_days,
            days_done: self.samples.len(),
            total_days: self.total_days,
        }
    }

    pub(crate) fn advance(&mut self, batch_size: usize) -> TimelineProgress {
        self.samples
            .extend(self.timeline.by_ref().take(batch_size.max(1)));
        self.progress()
    }

    pub(crate) fn into_report(self) -> SimulationReport {
        let diagnostics: Diagnostics = self.timeline.into_diagnostics();
        SimulationReport {
            timeline: self.samples,
            diagnostics,
        }
    }
}

/// WASM-exported runner that integrates a scenario a batch of days at a time.
#[wasm_bindgen]
pub struct WasmTimelineRunner {
    state: Option<TimelineRunnerState>,
}

#[wasm_bindgen]
impl WasmTimelineRunner {
    #[wasm_bindgen(constructor)]
    pub fn new(params_val: JsValue, scenario_val: JsValue) -> Result<WasmTimelineRunner, JsValue> {
        console_error_panic_hook::set_once();

        let model = build_model(params_val)?;
        let scenario = parse_scenario(scenario_val)?;
        let timeline = model
            .timeline(&scenario)
            .map_err(|e| JsValue::from_str(&format!("Simulation init failed: {}", e)))?;

        Ok(WasmTimelineRunner {
            state: Some(TimelineRunnerState::new(timeline)),
        })
    }

    pub fn is_done(&self) -> bool {
        self.state
            .as_ref()
            .map_or(true, |state| state.progress().done)
    }

    /// Integrate up to `batch_size` more days and return progress.
    pub fn run_days(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        let progress = state.advance(batch_size as usize);

        to_value(&progress).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        to_value(&state.progress())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Timeline and diagnostics for the days integrated so far.
    pub fn get_result(&mut self) -> Result<JsValue, JsValue> {
        let state = self
            .state
            .take()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        to_value(&state.into_report())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}
