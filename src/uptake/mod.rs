//! Layer-resolved root uptake.
//!
//! Pure functions over the soil zone and the root's per-layer live biomass:
//! soil water availability factor (swaf), soil mineral-N supply and its
//! whole-organ cap, water supply, Root Activity weights and the partitioning
//! of an organ-level amount across layers.

pub mod activity;
pub mod nitrogen;
pub mod water;

pub use activity::{partition, root_activity_weights, RootActivityWeights};
pub use nitrogen::{
    capped_n_supply, nitrogen_uptake_delta, soil_n_supply, soil_water_availability,
    LayerNitrogenSupply, NitrogenUptakeParameters,
};
pub use water::{water_extraction, water_supply};

/// Tolerance for comparing a committed uptake against the supply it came from
pub const UPTAKE_TOLERANCE: f64 = 1e-9;
