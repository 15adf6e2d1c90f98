//! Integration tests for daily arbitration
//!
//! Scenario soil:
//!
//! | Layer | Thickness (mm) | LL   | DUL  | NO3 (kg/ha) |
//! |-------|----------------|------|------|-------------|
//! | 0     | 150            | 0.10 | 0.30 | 10          |
//! | 1     | 150            | 0.12 | 0.28 | 8           |
//! | 2     | 200            | 0.15 | 0.25 | 5           |
//!
//! Root sown at 100 mm with 1.0 g/m² in layer 0, KNO3 0.002, partition
//! fraction 0.2. A leaf fixes 1.0 g/m²/day and wants 1.0 mm water.
//!
//! Tests validate:
//! - DM, N and water balance every day
//! - First growing day puts the root's 0.2 g/m² in layer 0
//! - Soil N and water deltas match what organs received
//! - Zero demand leaves pools untouched
//! - N fixation respiration comes out of the DM supply
//! - A root with no biomass cannot place its DM share

use plant_arbitrator::arbitration::{Arbitrator, ArbitratorParameters};
use plant_arbitrator::functions::{FunctionConfig, FunctionLinks, PHOTOSYNTHESIS, WATER_DEMAND};
use plant_arbitrator::organs::{GenericOrgan, GenericOrganParameters, OrganKind, RootParameters};
use plant_arbitrator::uptake::NitrogenUptakeParameters;
use plant_arbitrator::{
    ArbitrationError, DailyDrivers, Organ, Resource, Root, SoilLayer, SoilProfile, SoilZone, SowingParameters,
};

const TOL: f64 = 1e-9;

fn scenario_zone() -> SoilZone {
    let profile = SoilProfile::new(vec![
        SoilLayer::new(150.0, 1.30, 0.10, 0.30, 0.40).with_nitrogen(10.0, 0.0),
        SoilLayer::new(150.0, 1.35, 0.12, 0.28, 0.38).with_nitrogen(8.0, 0.0),
        SoilLayer::new(200.0, 1.40, 0.15, 0.25, 0.35).with_nitrogen(5.0, 0.0),
    ])
    .unwrap();
    SoilZone::new("field", profile)
}

fn scenario_root(zone: &SoilZone) -> Root {
    root_with_initial_dm(zone, 1.0)
}

fn root_with_initial_dm(zone: &SoilZone, initial_dm: f64) -> Root {
    let params = RootParameters {
        initial_dm_g_per_plant: initial_dm,
        nitrogen: NitrogenUptakeParameters {
            kno3: 0.002,
            knh4: 0.0,
            max_daily_n_uptake_g_per_m2: 10.0,
        },
        links: FunctionLinks::new()
            .with_constant("partition_fraction", 0.2)
            .with_constant("maximum_n_conc", 0.01)
            .with_constant("minimum_n_conc", 0.005)
            .with_constant("root_front_velocity", 20.0),
        ..Default::default()
    };
    Root::new(params, zone.profile()).unwrap()
}

fn leaf(links: FunctionLinks) -> GenericOrgan {
    GenericOrgan::new(GenericOrganParameters {
        name: "Leaf".to_string(),
        kind: OrganKind::Leaf,
        initial_wt_g_per_plant: 0.0,
        links,
    })
    .unwrap()
}

fn scenario_leaf() -> GenericOrgan {
    leaf(FunctionLinks::new()
        .with_constant("maximum_n_conc", 0.05)
        .with_constant("partition_fraction", 0.0)
        .with("photosynthesis", FunctionConfig::driver(PHOTOSYNTHESIS, 0.0))
        .with("water_demand", FunctionConfig::driver(WATER_DEMAND, 0.0)))
}

fn sow_all(organs: &mut [Box<dyn Organ>], zone: &SoilZone) {
    let sowing = SowingParameters {
        depth_mm: 100.0,
        population: 1.0,
        plant_in_ground: true,
    };
    for organ in organs.iter_mut() {
        organ.update_functions(&DailyDrivers::new(0));
        organ.sow(&sowing, zone).unwrap();
    }
}

fn drivers(day: u32) -> DailyDrivers {
    DailyDrivers::new(day)
        .with(PHOTOSYNTHESIS, 1.0)
        .with(WATER_DEMAND, 1.0)
}

fn scenario() -> (Vec<Box<dyn Organ>>, SoilZone) {
    let zone = scenario_zone();
    let mut organs: Vec<Box<dyn Organ>> = vec![Box::new(scenario_root(&zone)), Box::new(scenario_leaf())];
    sow_all(&mut organs, &zone);
    (organs, zone)
}

#[test]
fn test_first_day_not_growing() {
    let (mut organs, mut zone) = scenario();
    let arbitrator = Arbitrator::new(&ArbitratorParameters::default());

    let day1 = arbitrator.run_day(&mut organs, &mut zone, &drivers(1)).unwrap();
    assert_eq!(day1.dm.supply, 1.0);
    assert_eq!(day1.dm.allocated, 0.0, "Root front is still at sowing depth");
    // Extractable water in layer 0: 0.06 × (45 − 15) × 100/150 = 1.2 mm
    assert!((day1.water.supply - 1.2).abs() < TOL);
    assert!((day1.water.allocated - 1.0).abs() < TOL);
    assert!((day1.root.as_ref().unwrap().depth_mm - 120.0).abs() < TOL);
}

#[test]
fn test_first_growing_day_places_dm_in_layer_zero() {
    let (mut organs, mut zone) = scenario();
    let arbitrator = Arbitrator::new(&ArbitratorParameters::default());

    arbitrator.run_day(&mut organs, &mut zone, &drivers(1)).unwrap();
    let day2 = arbitrator.run_day(&mut organs, &mut zone, &drivers(2)).unwrap();

    let root = day2.organ("Root").unwrap();
    assert!((root.dm_demand - 0.2).abs() < TOL);
    assert!((root.dm_allocated - 0.2).abs() < TOL);
    assert!((day2.dm.allocated - 0.2).abs() < TOL);

    let props = day2.root.as_ref().unwrap();
    assert!(props.length_density[0] > 0.0);
    assert_eq!(props.length_density[1], 0.0);
    assert_eq!(props.length_density[2], 0.0);
}

#[test]
fn test_soil_deltas_match_uptake() {
    let (mut organs, mut zone) = scenario();
    let arbitrator = Arbitrator::new(&ArbitratorParameters::default());
    let initial_n = zone.total_mineral_n_kg_per_ha();

    for day in 1..=10 {
        let result = arbitrator.run_day(&mut organs, &mut zone, &drivers(day)).unwrap();
        assert!((result.soil_delta.total_water_mm() + result.water.allocated).abs() < TOL);
        // Only the root supplies N here, so every gram allocated came from soil
        assert!((result.soil_delta.total_nitrogen_kg_per_ha() + result.n.allocated * 10.0).abs() < TOL);
        assert!(result.n.allocated <= result.n.supply + TOL);
    }
    assert!(zone.total_mineral_n_kg_per_ha() < initial_n);
}

#[test]
fn test_crop_dm_is_conserved() {
    let (mut organs, mut zone) = scenario();
    let arbitrator = Arbitrator::new(&ArbitratorParameters::default());
    let initial: f64 = organs.iter().map(|o| o.wt() + o.dead_wt()).sum();

    let mut allocated = 0.0;
    let mut returned = 0.0;
    for day in 1..=15 {
        let result = arbitrator.run_day(&mut organs, &mut zone, &drivers(day)).unwrap();
        allocated += result.dm.allocated;
        returned += result.residues.iter().map(|f| f.total_amount()).sum::<f64>() / 10.0;
    }
    let now: f64 = organs.iter().map(|o| o.wt() + o.dead_wt()).sum();
    assert!((now - (initial + allocated - returned)).abs() < 1e-9);
}

#[test]
fn test_zero_demand_leaves_pools_unchanged() {
    let zone = scenario_zone();
    let mut organs: Vec<Box<dyn Organ>> = vec![Box::new(scenario_leaf())];
    sow_all(&mut organs, &zone);
    let mut zone = zone;
    let arbitrator = Arbitrator::default();

    let before_water = zone.water_mm().to_vec();
    let result = arbitrator
        .run_day(&mut organs, &mut zone, &DailyDrivers::new(1).with(PHOTOSYNTHESIS, 3.0))
        .unwrap();

    assert_eq!(result.dm.supply, 3.0);
    assert_eq!(result.dm.allocated, 0.0);
    assert_eq!(organs[0].wt(), 0.0);
    assert_eq!(zone.water_mm(), before_water.as_slice());
}

#[test]
fn test_fixation_respiration_reduces_growth() {
    let zone = scenario_zone();
    let nodule = leaf(FunctionLinks::new()
        .with_constant("maximum_n_conc", 0.04)
        .with_constant("minimum_n_conc", 0.04)
        .with_constant("dm_demand", 1.0)
        .with_constant("n_fixation", 1.0)
        .with_constant("n_fixation_cost", 5.0)
        .with_constant("photosynthesis", 2.0));
    let mut organs: Vec<Box<dyn Organ>> = vec![Box::new(nodule)];
    sow_all(&mut organs, &zone);
    let mut zone = zone;

    let result = Arbitrator::default()
        .run_day(&mut organs, &mut zone, &DailyDrivers::new(1))
        .unwrap();

    // N demand 0.04 × 1.0 from fixation only, costing 5 g DM per g N
    assert!((result.fixation_respiration - 0.2).abs() < TOL);
    assert!((result.dm.allocated - 1.0).abs() < TOL);
    assert!((result.n.allocated - 0.04).abs() < TOL);
}

#[test]
fn test_respiration_limits_growth_when_supply_is_short() {
    let zone = scenario_zone();
    let nodule = leaf(FunctionLinks::new()
        .with_constant("maximum_n_conc", 0.04)
        .with_constant("minimum_n_conc", 0.04)
        .with_constant("dm_demand", 1.0)
        .with_constant("n_fixation", 1.0)
        .with_constant("n_fixation_cost", 5.0)
        .with_constant("photosynthesis", 1.0));
    let mut organs: Vec<Box<dyn Organ>> = vec![Box::new(nodule)];
    sow_all(&mut organs, &zone);
    let mut zone = zone;

    let result = Arbitrator::default()
        .run_day(&mut organs, &mut zone, &DailyDrivers::new(1))
        .unwrap();

    assert!((result.fixation_respiration - 0.2).abs() < TOL);
    assert!((result.dm.allocated - 0.8).abs() < TOL);
    assert!((result.dm.allocated + result.fixation_respiration - result.dm.supply).abs() < TOL);
}

#[test]
fn test_empty_root_fails_partitioning() {
    let zone = scenario_zone();
    let mut organs: Vec<Box<dyn Organ>> = vec![Box::new(root_with_initial_dm(&zone, 0.0)), Box::new(scenario_leaf())];
    sow_all(&mut organs, &zone);
    let mut zone = zone;
    let arbitrator = Arbitrator::default();

    let day1 = arbitrator.run_day(&mut organs, &mut zone, &drivers(1)).unwrap();
    assert_eq!(day1.dm.allocated, 0.0);

    // Root demand 0.2 g/m² but every layer weight is zero
    match arbitrator.run_day(&mut organs, &mut zone, &drivers(2)) {
        Err(ArbitrationError::Partitioning { organ, resource, amount }) => {
            assert_eq!(organ, "Root");
            assert_eq!(resource, Resource::DryMatter);
            assert!((amount - 0.2).abs() < TOL);
        }
        other => panic!("expected Partitioning, got {other:?}"),
    }
}
