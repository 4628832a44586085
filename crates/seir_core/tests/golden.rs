use seir_core::presets;
use seir_core::{run, Method, Parameters, Scenario, SeirError, SeirModel, TimelineSample};

fn wuhan_parameters() -> Parameters {
    Parameters::new(2.2, 29.1, 5.2, 2.9, 11.1, 28.6, 5.0, 0.02, 0.2).with_dt(2.0)
}

fn wuhan_scenario() -> Scenario {
    Scenario::new(7_000_000.0)
        .with_initially_infected(1.0)
        .with_reduction(2.0 / 3.0 * 100.0, 100.0)
}

fn last(timeline: &[TimelineSample]) -> TimelineSample {
    timeline[timeline.len() - 1]
}

#[test]
fn wuhan_outbreak_matches_reference_projection() {
    let timeline = run(&wuhan_parameters(), &wuhan_scenario()).expect("run should succeed");
    assert_eq!(timeline.len(), 110);
    let final_day = last(&timeline);
    assert_eq!(final_day.deaths, 16479);
    assert_eq!(final_day.hospitalized, 9007);
    assert_eq!(final_day.recovered, 832702);
}

#[test]
fn preset_reproduces_reference_projection() {
    let model = SeirModel::new(presets::covid19()).expect("preset should build");
    let final_day = last(&model.calculate(&wuhan_scenario()).unwrap());
    assert_eq!(final_day.deaths, 16479);
    assert_eq!(final_day.hospitalized, 9007);
    assert_eq!(final_day.recovered, 832702);
    assert_eq!(final_day.total_infected, 861403);
}

#[test]
fn explicit_rk4_equals_default_method() {
    let default = run(&wuhan_parameters(), &wuhan_scenario()).unwrap();
    let explicit = run(
        &wuhan_parameters().with_method(Method::Rk4),
        &wuhan_scenario(),
    )
    .unwrap();
    assert_eq!(default, explicit);
}

#[test]
fn unknown_integrator_is_a_configuration_error() {
    let result = run(&wuhan_parameters().with_integrator("Dopri5"), &wuhan_scenario());
    assert!(matches!(result, Err(SeirError::Configuration(_))));
}
