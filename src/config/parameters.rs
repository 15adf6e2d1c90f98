//! Parameter structures for a single-crop run.
//!
//! Soil, crop and run parameters live in separate files so one soil can be
//! reused across crops. Missing or unreadable files fall back to defaults.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::arbitration::{Arbitrator, ArbitratorParameters};
use crate::error::ArbitrationResult;
use crate::functions::{DailyDrivers, PHOTOSYNTHESIS, WATER_DEMAND};
use crate::organs::{
    GenericOrgan, GenericOrganParameters, Grain, GrainParameters, Organ, OrganKind, Root,
    RootParameters, SowingParameters,
};
use crate::schedule::{DriverSource, Simulation};
use crate::soil::{SoilLayer, SoilProfile, SoilZone};
use crate::state::ResidueSink;

/// Read `path` as JSON, or log and return the default
fn load_json_or_default<T, P>(path: P, what: &str) -> T
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    match std::fs::read_to_string(path.as_ref()) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(params) => {
                log::info!("Loaded {} parameters from {:?}", what, path.as_ref());
                params
            }
            Err(e) => {
                log::warn!("Failed to parse {} parameters: {}, using defaults", what, e);
                T::default()
            }
        },
        Err(_) => {
            log::info!("{} parameters file not found, using defaults", what);
            T::default()
        }
    }
}

/// Top-level parameters container
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub soil: SoilParameters,
    pub root: RootParameters,
    /// Above-ground organs, in arbitration order after the root
    pub organs: Vec<OrganConfig>,
    pub sowing: SowingParameters,
    pub arbitrator: ArbitratorParameters,
    pub drivers: DriverParameters,
}

impl Parameters {
    /// Load parameters from `data/parameters`, or use defaults
    pub fn load_or_default() -> Self {
        Self::load_from_dir("data/parameters")
    }

    /// Load `soil.json`, `crop.json` and `run.json` from a directory
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        let soil = SoilParameters::load_or_default(dir.join("soil.json"));
        let crop = CropParameters::load_or_default(dir.join("crop.json"));
        let run = RunParameters::load_or_default(dir.join("run.json"));

        Self {
            soil,
            root: crop.root,
            organs: crop.organs,
            sowing: run.sowing,
            arbitrator: run.arbitrator,
            drivers: run.drivers,
        }
    }

    /// Build the soil zone and organs, sow, and wrap them in a simulation
    pub fn build_simulation(&self, sink: Box<dyn ResidueSink>) -> ArbitrationResult<Simulation> {
        let profile = SoilProfile::new(self.soil.layers.clone())?;
        let zone = SoilZone::new(&self.soil.zone, profile);

        let mut organs: Vec<Box<dyn Organ>> = Vec::with_capacity(self.organs.len() + 1);
        organs.push(Box::new(Root::new(self.root.clone(), zone.profile())?));
        for organ in &self.organs {
            organs.push(organ.build()?);
        }

        let mut sim = Simulation::new(organs, zone, Arbitrator::new(&self.arbitrator), sink);
        sim.sow(&self.sowing)?;
        Ok(sim)
    }
}

impl Default for Parameters {
    fn default() -> Self {
        let crop = CropParameters::default();
        let run = RunParameters::default();
        Self {
            soil: SoilParameters::default(),
            root: crop.root,
            organs: crop.organs,
            sowing: run.sowing,
            arbitrator: run.arbitrator,
            drivers: run.drivers,
        }
    }
}

/// Soil zone description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilParameters {
    /// Zone name
    pub zone: String,
    /// Layers, surface first
    pub layers: Vec<SoilLayer>,
}

impl SoilParameters {
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        load_json_or_default(path, "soil")
    }
}

impl Default for SoilParameters {
    /// Three-layer loam: 150/150/200 mm, water at DUL
    fn default() -> Self {
        Self {
            zone: "field".to_string(),
            layers: vec![
                SoilLayer::new(150.0, 1.30, 0.10, 0.30, 0.40).with_nitrogen(10.0, 1.0),
                SoilLayer::new(150.0, 1.35, 0.12, 0.28, 0.38).with_nitrogen(8.0, 0.5),
                SoilLayer::new(200.0, 1.40, 0.15, 0.25, 0.35).with_nitrogen(5.0, 0.2),
            ],
        }
    }
}

/// Organ entry in the crop file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "organ", rename_all = "snake_case")]
pub enum OrganConfig {
    Generic(GenericOrganParameters),
    Grain(GrainParameters),
}

impl OrganConfig {
    pub fn name(&self) -> &str {
        match self {
            OrganConfig::Generic(p) => &p.name,
            OrganConfig::Grain(p) => &p.name,
        }
    }

    /// Construct the organ, resolving its function links
    pub fn build(&self) -> ArbitrationResult<Box<dyn Organ>> {
        Ok(match self {
            OrganConfig::Generic(p) => Box::new(GenericOrgan::new(p.clone())?),
            OrganConfig::Grain(p) => Box::new(Grain::new(p.clone())?),
        })
    }
}

/// Crop file: root plus above-ground organs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropParameters {
    pub root: RootParameters,
    pub organs: Vec<OrganConfig>,
}

impl CropParameters {
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        load_json_or_default(path, "crop")
    }
}

impl Default for CropParameters {
    /// A root, one photosynthesising leaf and a stem
    fn default() -> Self {
        let stem = GenericOrganParameters {
            name: "Stem".to_string(),
            kind: OrganKind::Stem,
            ..Default::default()
        };
        let mut stem_links = stem.links.clone();
        stem_links.0.remove("photosynthesis");
        stem_links.0.remove("water_demand");
        Self {
            root: RootParameters::default(),
            organs: vec![
                OrganConfig::Generic(GenericOrganParameters::default()),
                OrganConfig::Generic(GenericOrganParameters {
                    links: stem_links,
                    ..stem
                }),
            ],
        }
    }
}

/// Run file: sowing, arbitration tolerance and daily drivers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParameters {
    pub sowing: SowingParameters,
    pub arbitrator: ArbitratorParameters,
    pub drivers: DriverParameters,
}

impl RunParameters {
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        load_json_or_default(path, "run")
    }
}

/// Constant daily drivers with a linear stage clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverParameters {
    /// Stage on day 1
    pub start_stage: f64,
    /// Stage advance per day
    pub stage_per_day: f64,
    /// Named values supplied every day
    pub values: BTreeMap<String, f64>,
}

impl DriverParameters {
    /// Drivers for `day`
    pub fn for_day(&self, day: u32) -> DailyDrivers {
        let stage = self.start_stage + self.stage_per_day * f64::from(day.saturating_sub(1));
        DailyDrivers {
            day,
            stage,
            values: self.values.clone(),
        }
    }
}

impl DriverSource for DriverParameters {
    fn drivers(&mut self, day: u32) -> DailyDrivers {
        self.for_day(day)
    }
}

impl Default for DriverParameters {
    fn default() -> Self {
        let mut values = BTreeMap::new();
        // g/m²/day
        values.insert(PHOTOSYNTHESIS.to_string(), 5.0);
        // mm/day
        values.insert(WATER_DEMAND.to_string(), 2.0);
        Self {
            start_stage: 1.0,
            stage_per_day: 0.05,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CollectingSink;

    #[test]
    fn test_default_soil_params() {
        let params = SoilParameters::default();
        assert_eq!(params.layers.len(), 3);
        assert!((params.layers[0].dul - 0.30).abs() < 1e-12);
    }

    #[test]
    fn test_missing_dir_uses_defaults() {
        let params = Parameters::load_from_dir("does/not/exist");
        assert_eq!(params.organs.len(), 2);
        assert_eq!(params.root.name, "Root");
    }

    #[test]
    fn test_serialization() {
        let params = Parameters::default();
        let json = serde_json::to_string_pretty(&params).unwrap();
        let parsed: Parameters = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.organs, params.organs);
        assert_eq!(parsed.soil, params.soil);
    }

    #[test]
    fn test_soil_layer_optional_fields() {
        let json = r#"{"zone": "paddock", "layers": [
            {"thickness_mm": 100, "bulk_density_g_per_cm3": 1.3, "ll": 0.1,
             "dul": 0.3, "sat": 0.4, "initial_water": 0.2, "crop_ll": 0.1}
        ]}"#;
        let soil: SoilParameters = serde_json::from_str(json).unwrap();
        assert_eq!(soil.layers[0].xf, 1.0);
        assert_eq!(soil.layers[0].no3_kg_per_ha, 0.0);
    }

    #[test]
    fn test_build_simulation_puts_root_first() {
        let params = Parameters::default();
        let sim = params.build_simulation(Box::new(CollectingSink::default())).unwrap();
        assert_eq!(sim.organs().len(), 3);
        assert_eq!(sim.organs()[0].kind(), OrganKind::Root);
    }

    #[test]
    fn test_stage_clock() {
        let drivers = DriverParameters::default();
        assert_eq!(drivers.for_day(1).stage, 1.0);
        assert!((drivers.for_day(21).stage - 2.0).abs() < 1e-12);
    }
}
