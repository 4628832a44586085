pub mod config;
pub mod error;
pub mod model;
pub mod presets;
pub mod simulation;
pub mod solvers;
pub mod tableau;
/// The `seir_core` crate is the numerical engine behind the SEIR projections.
/// It integrates a ten-compartment extension of the SEIR model with fixed-step
/// explicit Runge-Kutta methods and reports one population-scaled sample per day.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` (ODEs), `Steppable` (Solvers).
/// - **Tableau**: Registry of explicit Runge-Kutta methods (Euler through RK4 and the 3/8 rule).
/// - **Solvers**: Tableau-driven explicit Runge-Kutta stepper.
/// - **Model**: Compartments, parameters, intervention schedule and the SEIR vector field.
/// - **Simulation**: Sub-stepping driver, daily sampling and numeric diagnostics.
pub mod traits;

pub use error::{ConfigurationError, SeirError, SeirResult, ValidationError};
pub use model::{Compartment, Intervention, InterventionDuration, Parameters, SeirDynamics};
pub use simulation::{run, Scenario, SeirModel, SimulationReport, Timeline, TimelineSample};
pub use tableau::{lookup, Method, Tableau};
