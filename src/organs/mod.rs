//! Plant organs taking part in arbitration.
//!
//! Every organ exposes the same capability set through the [`Organ`] trait:
//! DM, N and water supply and demand, setters for the arbitrated
//! allocations, and its current weight and N content. The arbitrator only
//! ever sees `Box<dyn Organ>`; organs never see each other.
//!
//! Variants:
//! - [`Root`]: below ground, resolved per soil layer, the only organ that
//!   takes up and commits water and mineral N from the soil zone
//! - [`GenericOrgan`]: leaf, stem or reserve; single-valued
//! - [`Grain`]: reproductive sink, demand only

pub mod generic;
pub mod grain;
pub mod root;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ArbitrationResult;
use crate::functions::DailyDrivers;
use crate::soil::SoilZone;
use crate::state::{BiomassAllocation, BiomassPool, BiomassSupply, FomLayer};

pub use generic::{GenericOrgan, GenericOrganParameters};
pub use grain::{Grain, GrainParameters};
pub use root::{Root, RootParameters, RootProperties};

/// Organ category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganKind {
    Root,
    Leaf,
    Stem,
    Reserve,
    Grain,
}

impl fmt::Display for OrganKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrganKind::Root => "root",
            OrganKind::Leaf => "leaf",
            OrganKind::Stem => "stem",
            OrganKind::Reserve => "reserve",
            OrganKind::Grain => "grain",
        };
        f.write_str(name)
    }
}

/// Crop-level quantities an organ may need when reporting demand
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArbitrationContext {
    /// Simulated day
    pub day: u32,
    /// Total DM supply of the crop for the day (g/m²)
    pub total_dm_supply: f64,
}

/// Sowing event parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SowingParameters {
    /// Sowing depth (mm)
    pub depth_mm: f64,
    /// Plant population (plants/m²)
    pub population: f64,
    /// Whether the crop is in the ground after sowing
    pub plant_in_ground: bool,
}

impl Default for SowingParameters {
    fn default() -> Self {
        Self {
            depth_mm: 50.0,
            population: 1.0,
            plant_in_ground: true,
        }
    }
}

/// Tissue returned to the soil by one organ on one day
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueReturn {
    /// Organ that returned it
    pub organ: String,
    /// DM removed from the organ (g/m²)
    pub senesced_dm: f64,
    /// N removed from the organ (g/m²)
    pub senesced_n: f64,
    /// Record for the decomposition collaborator
    pub fom: FomLayer,
}

impl ResidueReturn {
    /// Above-ground tissue returned as a single surface record
    pub fn surface(organ: &str, dm_g_per_m2: f64, n_g_per_m2: f64) -> Self {
        Self {
            organ: organ.to_string(),
            senesced_dm: dm_g_per_m2,
            senesced_n: n_g_per_m2,
            fom: FomLayer::from_layers(organ, &[dm_g_per_m2], &[n_g_per_m2]),
        }
    }
}

/// End-of-day organ state for reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganReport {
    pub name: String,
    pub kind: Option<OrganKind>,
    /// Live DM (g/m²)
    pub wt: f64,
    /// Live N (g/m²)
    pub n: f64,
    /// Dead DM (g/m²)
    pub dead_wt: f64,
    pub dm_demand: f64,
    pub dm_allocated: f64,
    pub n_demand: f64,
    pub n_allocated: f64,
    pub water_demand: f64,
    pub water_allocated: f64,
}

/// Arbitration capability set of a plant organ
pub trait Organ: Send + fmt::Debug {
    /// Unique organ name
    fn name(&self) -> &str;

    fn kind(&self) -> OrganKind;

    /// Commencing phase: update linked daily functions
    fn update_functions(&mut self, drivers: &DailyDrivers);

    /// DM on offer today, by source
    fn dm_supply(&self) -> BiomassSupply;

    /// DM wanted today, by pool
    fn dm_demand(&self, ctx: &ArbitrationContext) -> BiomassPool;

    /// Record the potential (unconstrained by N) DM allocation
    fn set_dm_potential_allocation(&mut self, allocation: &BiomassPool) -> ArbitrationResult<()>;

    /// Commit the actual DM allocation and what was drawn from this organ
    fn set_dm_allocation(&mut self, allocation: &BiomassAllocation) -> ArbitrationResult<()>;

    /// N on offer today, by source
    fn n_supply(&self, zone: &SoilZone) -> ArbitrationResult<BiomassSupply>;

    /// N wanted today, by pool
    fn n_demand(&self) -> BiomassPool;

    /// Commit the N allocation; roots commit their soil uptake here
    fn set_n_allocation(&mut self, allocation: &BiomassAllocation, zone: &mut SoilZone) -> ArbitrationResult<()>;

    /// Water wanted today (mm)
    fn water_demand(&self) -> f64 {
        0.0
    }

    /// Extractable water per soil layer (mm); empty for organs without roots
    fn water_supply(&self, _zone: &SoilZone) -> ArbitrationResult<Vec<f64>> {
        Ok(Vec::new())
    }

    /// Water received by a demanding organ (mm)
    fn set_water_allocation(&mut self, _amount_mm: f64) -> ArbitrationResult<()> {
        Ok(())
    }

    /// Extract `uptake_mm` from the zone; returns the per-layer amounts taken
    fn take_water(&mut self, _uptake_mm: f64, _zone: &mut SoilZone) -> ArbitrationResult<Vec<f64>> {
        Ok(Vec::new())
    }

    /// Minimum N concentration (g/g)
    fn min_n_conc(&self) -> f64;

    /// Maximum N concentration (g/g)
    fn max_n_conc(&self) -> f64;

    /// Respiration cost of N fixation (g DM / g N)
    fn n_fixation_cost(&self) -> f64 {
        0.0
    }

    /// Live DM (g/m²)
    fn wt(&self) -> f64;

    /// Live N (g/m²)
    fn n(&self) -> f64;

    /// Dead DM (g/m²)
    fn dead_wt(&self) -> f64 {
        0.0
    }

    /// Dead N (g/m²)
    fn dead_n(&self) -> f64 {
        0.0
    }

    /// End of day: grow, senesce, and return any residue for the soil
    fn do_actual_growth(&mut self, zone: &SoilZone) -> ArbitrationResult<Option<ResidueReturn>>;

    /// Sowing resets organ state
    fn sow(&mut self, _sowing: &SowingParameters, _zone: &SoilZone) -> ArbitrationResult<()> {
        Ok(())
    }

    /// Crop end: return remaining tissue to the soil and zero the organ
    fn end_crop(&mut self) -> Option<ResidueReturn> {
        None
    }

    /// Layer-resolved properties, for roots
    fn root_properties(&self) -> Option<RootProperties> {
        None
    }

    /// Clone into a box, used when a day is staged on copied organs
    fn box_clone(&self) -> Box<dyn Organ>;
}

impl Clone for Box<dyn Organ> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Non-negative value of a 0-1 function output
pub(crate) fn unit_fraction(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
