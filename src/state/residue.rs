//! Fresh organic matter returned to the soil.
//!
//! Senesced and dead roots are returned layer by layer. Carbon is taken as
//! 40% of dry matter; phosphorus and ash alkalinity are not tracked.

use serde::{Deserialize, Serialize};

/// Carbon fraction of residue dry matter
pub const FOM_CARBON_FRACTION: f64 = 0.40;

/// Conversion from g/m² to kg/ha
pub const G_PER_M2_TO_KG_PER_HA: f64 = 10.0;

/// Organic matter in one layer (kg/ha)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fom {
    /// Dry matter (kg/ha)
    pub amount: f64,
    /// Nitrogen (kg/ha)
    pub n: f64,
    /// Carbon (kg/ha)
    pub c: f64,
    /// Phosphorus (kg/ha)
    pub p: f64,
    /// Ash alkalinity
    pub ash_alk: f64,
}

/// Residue for one soil layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FomLayerLayer {
    /// Organic matter added
    pub fom: Fom,
    /// C:N ratio hint (0 = derive from the pools)
    pub cnr: f64,
    /// Labile phosphorus (kg/ha)
    pub labile_p: f64,
}

/// Residue incorporation for the whole profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FomLayer {
    /// Crop type that produced the residue
    pub crop_type: String,
    /// One entry per soil layer
    pub layers: Vec<FomLayerLayer>,
}

impl FomLayer {
    /// Build from per-layer DM and N in g/m²
    pub fn from_layers(crop_type: &str, dm_g_per_m2: &[f64], n_g_per_m2: &[f64]) -> Self {
        let layers = dm_g_per_m2
            .iter()
            .zip(n_g_per_m2)
            .map(|(&dm, &n)| {
                let amount = dm * G_PER_M2_TO_KG_PER_HA;
                FomLayerLayer {
                    fom: Fom {
                        amount,
                        n: n * G_PER_M2_TO_KG_PER_HA,
                        c: FOM_CARBON_FRACTION * amount,
                        p: 0.0,
                        ash_alk: 0.0,
                    },
                    cnr: 0.0,
                    labile_p: 0.0,
                }
            })
            .collect();
        Self {
            crop_type: crop_type.to_string(),
            layers,
        }
    }

    /// Total dry matter (kg/ha)
    pub fn total_amount(&self) -> f64 {
        self.layers.iter().map(|l| l.fom.amount).sum()
    }

    /// Total nitrogen (kg/ha)
    pub fn total_n(&self) -> f64 {
        self.layers.iter().map(|l| l.fom.n).sum()
    }
}

/// Decomposition collaborator that receives residues
pub trait ResidueSink: Send {
    /// Incorporate one residue record
    fn incorporate(&mut self, fom: FomLayer);
}

/// Sink that keeps everything it receives, for reporting and tests
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    /// Records received, in order
    pub received: Vec<FomLayer>,
}

impl CollectingSink {
    /// Total DM received (kg/ha)
    pub fn total_amount(&self) -> f64 {
        self.received.iter().map(FomLayer::total_amount).sum()
    }
}

impl ResidueSink for CollectingSink {
    fn incorporate(&mut self, fom: FomLayer) {
        self.received.push(fom);
    }
}
