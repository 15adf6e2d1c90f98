//! Soil layer state seen by the arbitrator.
//!
//! - `SoilProfile`: immutable layer geometry, water limits and crop
//!   parameters, with depth lookups and root-occupancy geometry
//! - `SoilZone`: the water and mineral-N pools one crop extracts from
//!
//! Only the root organ writes to a zone, and only through committed deltas.

mod layer;
mod zone;

pub use layer::{SoilLayer, SoilProfile};
pub use zone::{SoilDelta, SoilZone};

/// Conversion from kg/ha to g/m²
pub const KG_PER_HA_TO_G_PER_M2: f64 = 0.1;
