//! Registry of explicit Runge-Kutta methods.
//!
//! Each method is stored in the compact row layout consumed by
//! [`crate::solvers::ExplicitRungeKutta`]: for an s-stage method there are s
//! rows, row `i < s - 1` holds `[c, a_1, ..., a_{i+1}]` for stage `i + 1`,
//! and the final row holds the s output weights `[b_1, ..., b_s]`.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const EULER: &[&[f64]] = &[&[1.0]];

const MIDPOINT: &[&[f64]] = &[&[0.5, 0.5], &[0.0, 1.0]];

const HEUN: &[&[f64]] = &[&[1.0, 1.0], &[0.5, 0.5]];

const RALSTON: &[&[f64]] = &[&[2.0 / 3.0, 2.0 / 3.0], &[0.25, 0.75]];

const KUTTA3: &[&[f64]] = &[
    &[0.5, 0.5],
    &[1.0, -1.0, 2.0],
    &[1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0],
];

const SSP33: &[&[f64]] = &[
    &[1.0, 1.0],
    &[0.5, 0.25, 0.25],
    &[1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0],
];

const SSP43: &[&[f64]] = &[
    &[0.5, 0.5],
    &[1.0, 0.5, 0.5],
    &[0.5, 1.0 / 6.0, 1.0 / 6.0, 1.0 / 6.0],
    &[1.0 / 6.0, 1.0 / 6.0, 1.0 / 6.0, 0.5],
];

const RK4: &[&[f64]] = &[
    &[0.5, 0.5],
    &[0.5, 0.0, 0.5],
    &[1.0, 0.0, 0.0, 1.0],
    &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
];

const RK38: &[&[f64]] = &[
    &[1.0 / 3.0, 1.0 / 3.0],
    &[2.0 / 3.0, -1.0 / 3.0, 1.0],
    &[1.0, 1.0, -1.0, 1.0],
    &[1.0 / 8.0, 3.0 / 8.0, 3.0 / 8.0, 1.0 / 8.0],
];

/// The registered integration methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Euler,
    Midpoint,
    Heun,
    Ralston,
    #[serde(rename = "K3")]
    Kutta3,
    #[serde(rename = "SSP33")]
    Ssp33,
    #[serde(rename = "SSP43")]
    Ssp43,
    #[serde(rename = "RK4")]
    Rk4,
    #[serde(rename = "RK38")]
    Rk38,
}

impl Default for Method {
    fn default() -> Self {
        Method::Rk4
    }
}

impl Method {
    pub const ALL: [Method; 9] = [
        Method::Euler,
        Method::Midpoint,
        Method::Heun,
        Method::Ralston,
        Method::Kutta3,
        Method::Ssp33,
        Method::Ssp43,
        Method::Rk4,
        Method::Rk38,
    ];

    /// Registry name of the method.
    pub fn name(self) -> &'static str {
        match self {
            Method::Euler => "Euler",
            Method::Midpoint => "Midpoint",
            Method::Heun => "Heun",
            Method::Ralston => "Ralston",
            Method::Kutta3 => "K3",
            Method::Ssp33 => "SSP33",
            Method::Ssp43 => "SSP43",
            Method::Rk4 => "RK4",
            Method::Rk38 => "RK38",
        }
    }

    fn rows(self) -> &'static [&'static [f64]] {
        match self {
            Method::Euler => EULER,
            Method::Midpoint => MIDPOINT,
            Method::Heun => HEUN,
            Method::Ralston => RALSTON,
            Method::Kutta3 => KUTTA3,
            Method::Ssp33 => SSP33,
            Method::Ssp43 => SSP43,
            Method::Rk4 => RK4,
            Method::Rk38 => RK38,
        }
    }

    pub fn tableau(self) -> Tableau {
        Tableau {
            rows: self.rows().iter().map(|row| row.to_vec()).collect(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::UnknownMethod(s.to_string()))
    }
}

/// Resolves a registered method name to its tableau.
pub fn lookup(name: &str) -> Result<Tableau, ConfigurationError> {
    name.parse::<Method>().map(Method::tableau)
}

/// Butcher tableau of an explicit Runge-Kutta method in compact row layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Tableau {
    rows: Vec<Vec<f64>>,
}

impl Tableau {
    /// Builds a custom tableau, checking the staircase row shape.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, ConfigurationError> {
        let stages = rows.len();
        if stages == 0 {
            return Err(ConfigurationError::MalformedTableau(
                "a tableau needs at least one row".to_string(),
            ));
        }
        for (i, row) in rows[..stages - 1].iter().enumerate() {
            if row.len() != i + 2 {
                return Err(ConfigurationError::MalformedTableau(format!(
                    "row {} must hold {} entries (offset + {} weights), got {}",
                    i,
                    i + 2,
                    i + 1,
                    row.len()
                )));
            }
        }
        let last = &rows[stages - 1];
        if last.len() != stages {
            return Err(ConfigurationError::MalformedTableau(format!(
                "output row must hold {} weights, got {}",
                stages,
                last.len()
            )));
        }
        if rows.iter().flatten().any(|value| !value.is_finite()) {
            return Err(ConfigurationError::MalformedTableau(
                "coefficients must be finite".to_string(),
            ));
        }
        Ok(Self { rows })
    }

    /// Number of derivative evaluations per step.
    pub fn stages(&self) -> usize {
        self.rows.len()
    }

    /// Fractional time offset `c` of a stage. Stage 0 has no offset.
    pub fn offset(&self, stage: usize) -> f64 {
        if stage == 0 {
            0.0
        } else {
            self.rows[stage - 1][0]
        }
    }

    /// Weights `a_{stage,1..stage}` applied to the earlier stage derivatives.
    pub fn stage_weights(&self, stage: usize) -> &[f64] {
        if stage == 0 {
            &[]
        } else {
            &self.rows[stage - 1][1..]
        }
    }

    /// Output weights `b_1..b_s`.
    pub fn output_weights(&self) -> &[f64] {
        &self.rows[self.rows.len() - 1]
    }

    /// First-order consistency: output weights sum to one and every stage
    /// offset equals the sum of its weights.
    pub fn is_consistent(&self, tolerance: f64) -> bool {
        let weight_sum: f64 = self.output_weights().iter().sum();
        if (weight_sum - 1.0).abs() > tolerance {
            return false;
        }
        (1..self.stages()).all(|stage| {
            let row_sum: f64 = self.stage_weights(stage).iter().sum();
            (row_sum - self.offset(stage)).abs() <= tolerance
        })
    }
}
