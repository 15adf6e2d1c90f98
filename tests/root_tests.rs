//! Integration tests for the root organ
//!
//! | Property                    | Expected                                   |
//! |-----------------------------|--------------------------------------------|
//! | N uptake cap                | 80 kg/ha available, cap 5 g/m² ⇒ supply 5  |
//! | Empty layer weight          | inherits the layer above                   |
//! | Nitrogen weight             | max(RAw, 1e-10), raw N activity kept       |
//! | Root front                  | never retreats, never passes XF = 0 layers |
//! | Water extraction            | never more than the supply                 |

use plant_arbitrator::functions::{FunctionConfig, FunctionLinks, ROOT_FRONT_VELOCITY};
use plant_arbitrator::organs::RootParameters;
use plant_arbitrator::uptake::activity::MIN_NITROGEN_WEIGHT;
use plant_arbitrator::uptake::NitrogenUptakeParameters;
use plant_arbitrator::{
    ArbitrationError, BiomassPool, DailyDrivers, Organ, Root, SoilLayer, SoilProfile, SoilZone, SowingParameters,
};

fn uniform_zone(no3_kg_per_ha: f64) -> SoilZone {
    let profile = SoilProfile::new(vec![
        SoilLayer::new(100.0, 1.3, 0.10, 0.30, 0.40).with_nitrogen(no3_kg_per_ha, 0.0),
        SoilLayer::new(100.0, 1.3, 0.10, 0.30, 0.40),
        SoilLayer::new(100.0, 1.3, 0.10, 0.30, 0.40),
    ])
    .unwrap();
    SoilZone::new("field", profile)
}

fn sown_root(nitrogen: NitrogenUptakeParameters, zone: &SoilZone) -> Root {
    let params = RootParameters {
        initial_dm_g_per_plant: 1.0,
        nitrogen,
        links: FunctionLinks::new()
            .with_constant("partition_fraction", 0.2)
            .with_constant("maximum_n_conc", 0.01)
            .with("root_front_velocity", FunctionConfig::driver(ROOT_FRONT_VELOCITY, 20.0)),
        ..Default::default()
    };
    let mut root = Root::new(params, zone.profile()).unwrap();
    root.update_functions(&DailyDrivers::new(0));
    root.sow(
        &SowingParameters {
            depth_mm: 50.0,
            population: 1.0,
            plant_in_ground: true,
        },
        zone,
    )
    .unwrap();
    root
}

#[test]
fn test_uptake_supply_is_capped() {
    let zone = uniform_zone(80.0);
    // A large coefficient makes the supply the whole 80 kg/ha pool
    let nitrogen = NitrogenUptakeParameters {
        kno3: 1.0,
        knh4: 0.0,
        max_daily_n_uptake_g_per_m2: 5.0,
    };
    let root = sown_root(nitrogen, &zone);
    let supply = root.n_supply(&zone).unwrap();
    assert!((supply.uptake - 5.0).abs() < 1e-12);

    let uncapped = sown_root(
        NitrogenUptakeParameters {
            max_daily_n_uptake_g_per_m2: 100.0,
            ..nitrogen
        },
        &zone,
    );
    assert!((uncapped.n_supply(&zone).unwrap().uptake - 8.0).abs() < 1e-12);
}

#[test]
fn test_empty_layer_inherits_weight() {
    let zone = uniform_zone(10.0);
    let mut root = sown_root(NitrogenUptakeParameters::default(), &zone);
    root.update_functions(&DailyDrivers::new(1).with(ROOT_FRONT_VELOCITY, 120.0));
    root.do_actual_growth(&zone).unwrap();
    assert!((root.depth_mm() - 170.0).abs() < 1e-12);

    root.set_dm_potential_allocation(&BiomassPool::default()).unwrap();
    let weights = root.activity_weights();
    assert!(root.layer_live()[1].wt() == 0.0);
    assert_eq!(weights.water[1], weights.water[0]);
    assert_eq!(weights.water[2], 0.0, "Layer below the root front");
}

#[test]
fn test_nitrogen_weight_is_floored_water_weight() {
    let mut zone = uniform_zone(10.0);
    let mut root = sown_root(NitrogenUptakeParameters::default(), &zone);
    root.update_functions(&DailyDrivers::new(1));
    root.do_actual_growth(&zone).unwrap();

    let taken = root.take_water(0.5, &mut zone).unwrap();
    assert!((taken.iter().sum::<f64>() - 0.5).abs() < 1e-12);

    root.set_dm_potential_allocation(&BiomassPool::structural(0.1)).unwrap();
    let weights = root.activity_weights();
    assert_eq!(weights.nitrogen_activity[0], 0.0, "No N was taken up");
    assert_eq!(weights.nitrogen[0], weights.water[0].max(MIN_NITROGEN_WEIGHT));
    assert!(weights.water[0] > MIN_NITROGEN_WEIGHT);
}

#[test]
fn test_root_front_never_retreats() {
    let zone = uniform_zone(10.0);
    let mut root = sown_root(NitrogenUptakeParameters::default(), &zone);
    let mut last = root.depth_mm();
    for (day, velocity) in [30.0, -50.0, 0.0, 45.0, 400.0, -10.0].into_iter().enumerate() {
        root.update_functions(&DailyDrivers::new(day as u32 + 1).with(ROOT_FRONT_VELOCITY, velocity));
        root.do_actual_growth(&zone).unwrap();
        assert!(root.depth_mm() >= last);
        assert!(root.depth_mm() <= zone.profile().max_root_depth());
        last = root.depth_mm();
    }
    assert_eq!(last, 300.0);
}

#[test]
fn test_front_stops_above_unexplorable_layer() {
    let profile = SoilProfile::new(vec![
        SoilLayer::new(100.0, 1.3, 0.10, 0.30, 0.40),
        SoilLayer::new(100.0, 1.3, 0.10, 0.30, 0.40).with_crop(0.10, 0.06, 0.0),
    ])
    .unwrap();
    let zone = SoilZone::new("field", profile);
    let mut root = sown_root(NitrogenUptakeParameters::default(), &zone);
    root.update_functions(&DailyDrivers::new(1).with(ROOT_FRONT_VELOCITY, 500.0));
    root.do_actual_growth(&zone).unwrap();
    assert_eq!(root.depth_mm(), 100.0);
}

#[test]
fn test_extraction_beyond_supply_fails() {
    let mut zone = uniform_zone(10.0);
    let mut root = sown_root(NitrogenUptakeParameters::default(), &zone);
    let supply: f64 = root.water_supply(&zone).unwrap().iter().sum();
    let err = root.take_water(supply * 2.0, &mut zone).unwrap_err();
    assert!(matches!(err, ArbitrationError::UptakeExceedsSupply { .. }));
}

#[test]
fn test_sowing_below_profile_fails() {
    let zone = uniform_zone(10.0);
    let mut root = sown_root(NitrogenUptakeParameters::default(), &zone);
    let err = root
        .sow(
            &SowingParameters {
                depth_mm: 1000.0,
                ..Default::default()
            },
            &zone,
        )
        .unwrap_err();
    assert!(matches!(err, ArbitrationError::DepthOutOfRange { .. }));
}
