//! Reference parameter sets.

use crate::model::Parameters;

/// Early-2020 COVID-19 estimates (Wuhan), with a two-day sampling interval.
///
/// Death and recovery times are measured from the end of the infectious
/// period, hence the subtracted 2.9 days.
pub fn covid19() -> Parameters {
    Parameters::new(
        2.2,
        32.0 - 2.9,
        5.2,
        2.9,
        14.0 - 2.9,
        31.5 - 2.9,
        5.0,
        0.02,
        0.2,
    )
    .with_dt(2.0)
}
