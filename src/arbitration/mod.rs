//! Daily resource arbitration between organs.
//!
//! The arbitrator collects supplies and demands from every organ, divides
//! what is available, attributes the distributed amounts back to the
//! supplying organs, and verifies conservation before the day counts.

pub mod allocation;
pub mod arbitrator;
pub mod balance;

use serde::{Deserialize, Serialize};

use crate::organs::{OrganReport, RootProperties};
use crate::soil::SoilDelta;
use crate::state::FomLayer;

pub use allocation::{draw_sources, relative_allocation, remaining_supply, Source};
pub use arbitrator::{Arbitrator, ArbitratorParameters, Phase};
pub use balance::{BalanceChecker, RELATIVE_TOLERANCE};

/// Crop totals for one resource on one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub supply: f64,
    pub demand: f64,
    pub allocated: f64,
}

/// Outcome of one arbitrated day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayResult {
    pub day: u32,
    /// Dry matter (g/m²)
    pub dm: ResourceSummary,
    /// Nitrogen (g/m²)
    pub n: ResourceSummary,
    /// Water (mm)
    pub water: ResourceSummary,
    /// DM respired to pay for N fixation (g/m²)
    pub fixation_respiration: f64,
    pub organs: Vec<OrganReport>,
    /// Root properties at the end of the day
    pub root: Option<RootProperties>,
    /// Net change in the soil zone over the day
    pub soil_delta: SoilDelta,
    /// Residues returned to the soil
    pub residues: Vec<FomLayer>,
}

impl DayResult {
    /// Report for a named organ
    pub fn organ(&self, name: &str) -> Option<&OrganReport> {
        self.organs.iter().find(|o| o.name == name)
    }
}
