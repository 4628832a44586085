//! JSON configuration for parameters and scenarios.
//!
//! Keys follow the original calculator (`dIncubation`, `pSevere`, ...).
//! Optional keys fall back to the same defaults as the Rust constructors.

use crate::error::SeirResult;
use crate::model::Parameters;
use crate::simulation::Scenario;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Parses and validates a parameter set.
pub fn parameters_from_json(json: &str) -> SeirResult<Parameters> {
    let parameters: Parameters = serde_json::from_str(json)?;
    parameters.validate()?;
    Ok(parameters)
}

/// Parses and validates a scenario.
pub fn scenario_from_json(json: &str) -> SeirResult<Scenario> {
    let scenario: Scenario = serde_json::from_str(json)?;
    scenario.validate()?;
    Ok(scenario)
}

pub fn load_parameters<P: AsRef<Path>>(path: P) -> Result<Parameters> {
    let path = path.as_ref();
    info!("Loading parameters from file {}", path.display());
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read parameter file {}", path.display()))?;
    parameters_from_json(&contents)
        .with_context(|| format!("Invalid parameter file {}", path.display()))
}

pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<Scenario> {
    let path = path.as_ref();
    info!("Loading scenario from file {}", path.display());
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    scenario_from_json(&contents)
        .with_context(|| format!("Invalid scenario file {}", path.display()))
}
