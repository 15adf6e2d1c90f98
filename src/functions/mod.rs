//! Daily scalar functions linked into organs.
//!
//! Organs never read weather or phenology directly. Each organ holds explicit
//! links to `PlantFunction`s (partition fraction, N concentrations,
//! temperature effect, ...) which are updated once per day from the
//! `DailyDrivers` and then read as plain values for the rest of the day.
//!
//! Function kinds:
//! - `ConstantFunction`, `DriverFunction`, `LinearInterpolationFunction`
//! - `MaximumFunction` / `MinimumFunction` over child functions
//! - `HoldFunction`: follows its child until a phenological stage, then freezes
//! - `TrackerFunction`: "value back X" over a tracked window
//!
//! `FunctionConfig` is the serialisable description; `FunctionLinks` resolves
//! named links for an organ at setup and reports `MissingLink` otherwise.

pub mod basic;
pub mod config;
pub mod hold;
pub mod storage_n_demand;
pub mod tracker;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use basic::{
    ConstantFunction, DriverFunction, LinearInterpolationFunction, MaximumFunction,
    MinimumFunction,
};
pub use config::{FunctionConfig, FunctionLinks};
pub use hold::HoldFunction;
pub use storage_n_demand::storage_n_demand;
pub use tracker::TrackerFunction;

/// Driver name for root front velocity (mm/day)
pub const ROOT_FRONT_VELOCITY: &str = "root_front_velocity";
/// Driver name for the temperature effect on root growth (0-1)
pub const TEMPERATURE_EFFECT: &str = "temperature_effect";
/// Driver name for daily mean air temperature (°C)
pub const MEAN_TEMPERATURE: &str = "mean_temperature";
/// Driver name for daily potential photosynthesis (g DM/m²)
pub const PHOTOSYNTHESIS: &str = "photosynthesis";
/// Driver name for daily crop water demand (mm)
pub const WATER_DEMAND: &str = "water_demand";

/// Externally supplied inputs for one simulated day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyDrivers {
    /// Simulated day number
    pub day: u32,
    /// Phenological stage number
    pub stage: f64,
    /// Named weather-driven scalars
    pub values: BTreeMap<String, f64>,
}

impl DailyDrivers {
    /// Drivers for `day` with no named values
    pub fn new(day: u32) -> Self {
        Self {
            day,
            ..Default::default()
        }
    }

    /// Set the phenological stage
    pub fn with_stage(mut self, stage: f64) -> Self {
        self.stage = stage;
        self
    }

    /// Set a named driver value
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    /// Named driver value, if present
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// Scalar-valued function evaluated once per day
pub trait PlantFunction: Send + fmt::Debug {
    /// Recompute the cached value from today's drivers
    fn update(&mut self, drivers: &DailyDrivers);

    /// Today's value
    fn value(&self) -> f64;

    /// Clone into a box, used when a day is staged on copied organs
    fn box_clone(&self) -> Box<dyn PlantFunction>;
}

impl Clone for Box<dyn PlantFunction> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drivers_lookup() {
        let drivers = DailyDrivers::new(3).with_stage(2.5).with(ROOT_FRONT_VELOCITY, 20.0);
        assert_eq!(drivers.get(ROOT_FRONT_VELOCITY), Some(20.0));
        assert_eq!(drivers.get(TEMPERATURE_EFFECT), None);
        assert_eq!(drivers.stage, 2.5);
    }
}
