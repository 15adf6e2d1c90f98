//! Integration tests for linked daily functions
//!
//! | Function | Behaviour checked                                  |
//! |----------|----------------------------------------------------|
//! | linear   | thermal response interpolated and flat outside x   |
//! | hold     | frozen after the hold stage                        |
//! | tracker  | value back over a tracked reference window         |
//! | links    | organ setup fails on a missing required link       |

use plant_arbitrator::functions::{FunctionConfig, FunctionLinks, MEAN_TEMPERATURE};
use plant_arbitrator::organs::{GenericOrganParameters, GrainParameters, OrganKind};
use plant_arbitrator::{ArbitrationError, DailyDrivers, GenericOrgan, Grain};

fn parse(json: &str) -> FunctionConfig {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_temperature_response_from_json() {
    let config = parse(
        r#"{"type": "linear", "driver": "mean_temperature", "x": [0, 25, 40], "y": [0, 1, 0]}"#,
    );
    let mut f = config.build();

    f.update(&DailyDrivers::new(1).with(MEAN_TEMPERATURE, 12.5));
    assert!((f.value() - 0.5).abs() < 1e-12);
    f.update(&DailyDrivers::new(2).with(MEAN_TEMPERATURE, 45.0));
    assert_eq!(f.value(), 0.0);
    // No reading: keep yesterday's value
    f.update(&DailyDrivers::new(3));
    assert_eq!(f.value(), 0.0);
}

#[test]
fn test_hold_freezes_after_stage() {
    let config = parse(
        r#"{"type": "hold", "hold_stage": 4.0,
            "value": {"type": "driver", "name": "mean_temperature"}}"#,
    );
    let mut f = config.build();
    f.update(&DailyDrivers::new(1).with_stage(3.0).with(MEAN_TEMPERATURE, 18.0));
    assert_eq!(f.value(), 18.0);
    f.update(&DailyDrivers::new(2).with_stage(5.0).with(MEAN_TEMPERATURE, 30.0));
    assert_eq!(f.value(), 18.0);
}

#[test]
fn test_tracker_value_back() {
    let config = FunctionConfig::Tracker {
        variable: Box::new(FunctionConfig::driver("biomass", 0.0)),
        reference: Box::new(FunctionConfig::constant(1.0)),
        value_back: 2.0,
        start_stage: 1.0,
        end_stage: 10.0,
    };
    let mut f = config.build();
    for (day, biomass) in [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)] {
        f.update(&DailyDrivers::new(day).with_stage(2.0).with("biomass", biomass));
    }
    // Two reference units back from the latest record
    assert_eq!(f.value(), 30.0);
}

#[test]
fn test_maximum_over_children() {
    let config = parse(
        r#"{"type": "maximum", "children": [
            {"type": "constant", "value": 0.2},
            {"type": "driver", "name": "demand", "default": 0.0}
        ]}"#,
    );
    let mut f = config.build();
    f.update(&DailyDrivers::new(1));
    assert_eq!(f.value(), 0.2);
    f.update(&DailyDrivers::new(2).with("demand", 0.7));
    assert_eq!(f.value(), 0.7);
}

#[test]
fn test_missing_links_reported_at_setup() {
    let err = GenericOrgan::new(GenericOrganParameters {
        name: "Stem".to_string(),
        kind: OrganKind::Stem,
        initial_wt_g_per_plant: 0.0,
        links: FunctionLinks::new(),
    })
    .unwrap_err();
    match err {
        ArbitrationError::MissingLink { organ, link } => {
            assert_eq!(organ, "Stem");
            assert_eq!(link, "maximum_n_conc");
        }
        other => panic!("unexpected error {other:?}"),
    }

    let grain = Grain::new(GrainParameters {
        name: "Grain".to_string(),
        links: FunctionLinks::new().with_constant("maximum_n_conc", 0.02),
    });
    assert!(matches!(grain, Err(ArbitrationError::MissingLink { .. })));
}
