//! Extended SEIR compartment model: parameters, intervention schedule and
//! the vector field integrated by the simulation driver.

use crate::error::ValidationError;
use crate::tableau::Method;
use crate::traits::{constant, DynamicalSystem, Scalar};
use serde::{Deserialize, Serialize};

/// Number of compartments in the state vector.
pub const COMPARTMENTS: usize = 10;

/// Transmission multiplier applied once a finite intervention has lapsed.
pub const RESIDUAL_TRANSMISSION: f64 = 0.5;

/// Compartments in state-vector order. Values are population fractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compartment {
    Susceptible,
    Exposed,
    Infectious,
    /// Recovering from a mild case.
    Mild,
    /// Severe case, not yet hospitalized.
    Severe,
    /// Severe case in hospital.
    SevereHospitalized,
    /// Will die; counted as hospitalized until then.
    Fatal,
    RecoveredMild,
    RecoveredSevere,
    Dead,
}

impl Compartment {
    pub const ALL: [Compartment; COMPARTMENTS] = [
        Compartment::Susceptible,
        Compartment::Exposed,
        Compartment::Infectious,
        Compartment::Mild,
        Compartment::Severe,
        Compartment::SevereHospitalized,
        Compartment::Fatal,
        Compartment::RecoveredMild,
        Compartment::RecoveredSevere,
        Compartment::Dead,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// How long the transmission reduction stays in force.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum InterventionDuration {
    Indefinite,
    Finite(f64),
}

impl Default for InterventionDuration {
    fn default() -> Self {
        InterventionDuration::Indefinite
    }
}

impl From<Option<f64>> for InterventionDuration {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(days) => InterventionDuration::Finite(days),
            None => InterventionDuration::Indefinite,
        }
    }
}

impl From<InterventionDuration> for Option<f64> {
    fn from(value: InterventionDuration) -> Self {
        match value {
            InterventionDuration::Indefinite => None,
            InterventionDuration::Finite(days) => Some(days),
        }
    }
}

fn default_dt() -> f64 {
    1.0
}

fn default_integrator() -> String {
    Method::default().name().to_string()
}

/// Epidemiological and numerical parameters of a model.
///
/// Durations are in days. Field names serialize to the keys used by the
/// browser calculator this model originates from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Basic reproduction number without intervention.
    pub r0: f64,
    #[serde(rename = "dDeath")]
    pub death_time: f64,
    #[serde(rename = "dIncubation")]
    pub incubation_time: f64,
    #[serde(rename = "dInfectious")]
    pub infectious_time: f64,
    #[serde(rename = "dRecoveryMild")]
    pub mild_recovery_time: f64,
    #[serde(rename = "dRecoverySevere", alias = "dRecoveryServere")]
    pub severe_recovery_time: f64,
    #[serde(rename = "dHospitalLag")]
    pub hospital_lag: f64,
    /// Case fatality rate.
    pub cfr: f64,
    #[serde(rename = "pSevere", alias = "pServere")]
    pub severe_probability: f64,
    /// Length of one sampled simulation day, split into sub-steps.
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(rename = "duration", default)]
    pub intervention_duration: InterventionDuration,
    /// Registry name of the integration method, resolved when the model is built.
    #[serde(default = "default_integrator")]
    pub integrator: String,
}

impl Parameters {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        r0: f64,
        death_time: f64,
        incubation_time: f64,
        infectious_time: f64,
        mild_recovery_time: f64,
        severe_recovery_time: f64,
        hospital_lag: f64,
        cfr: f64,
        severe_probability: f64,
    ) -> Self {
        Self {
            r0,
            death_time,
            incubation_time,
            infectious_time,
            mild_recovery_time,
            severe_recovery_time,
            hospital_lag,
            cfr,
            severe_probability,
            dt: default_dt(),
            intervention_duration: InterventionDuration::default(),
            integrator: default_integrator(),
        }
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_intervention_duration(mut self, duration: InterventionDuration) -> Self {
        self.intervention_duration = duration;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.integrator = method.name().to_string();
        self
    }

    pub fn with_integrator(mut self, name: impl Into<String>) -> Self {
        self.integrator = name.into();
        self
    }

    /// Probability that an infection ends as a mild case.
    pub fn mild_probability(&self) -> f64 {
        1.0 - self.severe_probability - self.cfr
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.r0.is_finite() {
            return Err(ValidationError::NonFinite { name: "r0" });
        }
        if self.r0 < 0.0 {
            return Err(ValidationError::NegativeR0(self.r0));
        }

        let mut durations = vec![
            ("dDeath", self.death_time),
            ("dIncubation", self.incubation_time),
            ("dInfectious", self.infectious_time),
            ("dRecoveryMild", self.mild_recovery_time),
            ("dRecoverySevere", self.severe_recovery_time),
            ("dHospitalLag", self.hospital_lag),
        ];
        if let InterventionDuration::Finite(days) = self.intervention_duration {
            durations.push(("duration", days));
        }
        for (name, value) in durations {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite { name });
            }
            if value <= 0.0 {
                return Err(ValidationError::NonPositiveDuration { name, value });
            }
        }

        for (name, value) in [("cfr", self.cfr), ("pSevere", self.severe_probability)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::ProbabilityOutOfRange { name, value });
            }
        }
        let combined = self.severe_probability + self.cfr;
        if combined > 1.0 + 1e-12 {
            return Err(ValidationError::ProbabilitiesExceedOne(combined));
        }

        if !self.dt.is_finite() {
            return Err(ValidationError::NonFinite { name: "dt" });
        }
        if self.dt <= 0.0 {
            return Err(ValidationError::NonPositiveStep(self.dt));
        }
        Ok(())
    }
}

/// Which branch of the transmission schedule applies at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionPhase {
    Baseline,
    Reduced,
    /// The intervention window has closed; a fixed residual reduction remains.
    Residual,
}

/// Time-limited reduction of transmission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    pub reduction_percent: f64,
    pub start_day: f64,
    pub duration: InterventionDuration,
}

impl Intervention {
    pub fn none() -> Self {
        Self {
            reduction_percent: 0.0,
            start_day: 0.0,
            duration: InterventionDuration::Indefinite,
        }
    }

    /// The window is open strictly between its start and end; the exact end
    /// instant still counts as baseline.
    pub fn phase_at(&self, t: f64) -> TransmissionPhase {
        let start = self.start_day;
        match self.duration {
            InterventionDuration::Indefinite if t > start => TransmissionPhase::Reduced,
            InterventionDuration::Indefinite => TransmissionPhase::Baseline,
            InterventionDuration::Finite(days) => {
                let end = start + days;
                if t > start && t < end {
                    TransmissionPhase::Reduced
                } else if t > end {
                    TransmissionPhase::Residual
                } else {
                    TransmissionPhase::Baseline
                }
            }
        }
    }

    pub fn multiplier_at(&self, t: f64) -> f64 {
        match self.phase_at(t) {
            TransmissionPhase::Baseline => 1.0,
            TransmissionPhase::Reduced => (100.0 - self.reduction_percent) / 100.0,
            TransmissionPhase::Residual => RESIDUAL_TRANSMISSION,
        }
    }
}

/// Right-hand side of the extended SEIR system for one scenario.
#[derive(Debug, Clone)]
pub struct SeirDynamics {
    r0: f64,
    infectious_time: f64,
    intervention: Intervention,
    incubation_rate: f64,
    recovery_rate: f64,
    mild_rate: f64,
    severe_rate: f64,
    hospital_rate: f64,
    death_rate: f64,
    p_mild: f64,
    p_severe: f64,
    cfr: f64,
}

impl SeirDynamics {
    pub fn new(parameters: &Parameters, intervention: Intervention) -> Self {
        Self {
            r0: parameters.r0,
            infectious_time: parameters.infectious_time,
            intervention,
            incubation_rate: 1.0 / parameters.incubation_time,
            recovery_rate: 1.0 / parameters.infectious_time,
            mild_rate: 1.0 / parameters.mild_recovery_time,
            severe_rate: 1.0 / parameters.severe_recovery_time,
            hospital_rate: 1.0 / parameters.hospital_lag,
            death_rate: 1.0 / parameters.death_time,
            p_mild: parameters.mild_probability(),
            p_severe: parameters.severe_probability,
            cfr: parameters.cfr,
        }
    }

    pub fn intervention(&self) -> &Intervention {
        &self.intervention
    }

    /// Transmission rate beta at time `t`.
    pub fn transmission_rate(&self, t: f64) -> f64 {
        self.intervention.multiplier_at(t) * self.r0 / self.infectious_time
    }
}

impl<T: Scalar> DynamicalSystem<T> for SeirDynamics {
    fn dimension(&self) -> usize {
        COMPARTMENTS
    }

    fn apply(&self, t: T, x: &[T], out: &mut [T]) {
        let beta: T = constant(self.transmission_rate(t.to_f64().unwrap_or(f64::NAN)));
        let a: T = constant(self.incubation_rate);
        let gamma: T = constant(self.recovery_rate);
        let mild_rate: T = constant(self.mild_rate);
        let severe_rate: T = constant(self.severe_rate);
        let hospital_rate: T = constant(self.hospital_rate);
        let death_rate: T = constant(self.death_rate);
        let p_mild: T = constant(self.p_mild);
        let p_severe: T = constant(self.p_severe);
        let cfr: T = constant(self.cfr);

        let s = x[Compartment::Susceptible.index()];
        let e = x[Compartment::Exposed.index()];
        let i = x[Compartment::Infectious.index()];
        let mild = x[Compartment::Mild.index()];
        let severe = x[Compartment::Severe.index()];
        let severe_h = x[Compartment::SevereHospitalized.index()];
        let fatal = x[Compartment::Fatal.index()];

        let infection = beta * i * s;
        let removal = gamma * i;

        out[Compartment::Susceptible.index()] = -infection;
        out[Compartment::Exposed.index()] = infection - a * e;
        out[Compartment::Infectious.index()] = a * e - removal;
        out[Compartment::Mild.index()] = p_mild * removal - mild_rate * mild;
        out[Compartment::Severe.index()] = p_severe * removal - hospital_rate * severe;
        out[Compartment::SevereHospitalized.index()] =
            hospital_rate * severe - severe_rate * severe_h;
        out[Compartment::Fatal.index()] = cfr * removal - death_rate * fatal;
        out[Compartment::RecoveredMild.index()] = mild_rate * mild;
        out[Compartment::RecoveredSevere.index()] = severe_rate * severe_h;
        out[Compartment::Dead.index()] = death_rate * fatal;
    }
}
