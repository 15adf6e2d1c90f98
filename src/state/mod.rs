//! State records shared by organs, the arbitrator and reporting.
//!
//! Contains biomass pools and supply/allocation records, and the fresh
//! organic matter records handed to the decomposition collaborator.

mod biomass;
mod residue;

pub use biomass::{Biomass, BiomassAllocation, BiomassPool, BiomassSupply};
pub use residue::{
    CollectingSink, Fom, FomLayer, FomLayerLayer, ResidueSink, FOM_CARBON_FRACTION,
    G_PER_M2_TO_KG_PER_HA,
};
