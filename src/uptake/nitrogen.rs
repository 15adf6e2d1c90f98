//! Soil mineral-N supply for a root system.
//!
//! Per-layer supply (kg/ha) of each form:
//!
//! ```text
//! ppm    = N × 100 / (BD × thickness)
//! supply = N × K × ppm × swaf
//! ```
//!
//! The organ-level uptake supply is the layer sum converted to g/m², capped
//! at the maximum daily uptake. The cap applies to the total only.

use serde::{Deserialize, Serialize};

use super::UPTAKE_TOLERANCE;
use crate::error::{ArbitrationError, ArbitrationResult, Resource};
use crate::soil::{SoilProfile, SoilZone, KG_PER_HA_TO_G_PER_M2};

/// Uptake coefficients for soil mineral N
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NitrogenUptakeParameters {
    /// Nitrate uptake coefficient (/ppm/day)
    pub kno3: f64,
    /// Ammonium uptake coefficient (/ppm/day)
    pub knh4: f64,
    /// Maximum daily N uptake for the whole root system (g/m²)
    pub max_daily_n_uptake_g_per_m2: f64,
}

impl Default for NitrogenUptakeParameters {
    fn default() -> Self {
        Self {
            kno3: 0.02,
            knh4: 0.01,
            max_daily_n_uptake_g_per_m2: 10.0,
        }
    }
}

/// Available mineral N per layer (kg/ha)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerNitrogenSupply {
    pub no3_kg_per_ha: Vec<f64>,
    pub nh4_kg_per_ha: Vec<f64>,
}

impl LayerNitrogenSupply {
    /// Zero supply for `n_layers`
    pub fn zeros(n_layers: usize) -> Self {
        Self {
            no3_kg_per_ha: vec![0.0; n_layers],
            nh4_kg_per_ha: vec![0.0; n_layers],
        }
    }

    /// Sum of both forms over all layers (kg/ha)
    pub fn total_kg_per_ha(&self) -> f64 {
        self.no3_kg_per_ha.iter().sum::<f64>() + self.nh4_kg_per_ha.iter().sum::<f64>()
    }

    /// Uncapped total (g/m²)
    pub fn total_g_per_m2(&self) -> f64 {
        self.total_kg_per_ha() * KG_PER_HA_TO_G_PER_M2
    }

    /// Combined NO3 + NH4 supply per layer (kg/ha)
    pub fn per_layer_kg_per_ha(&self) -> Vec<f64> {
        self.no3_kg_per_ha
            .iter()
            .zip(&self.nh4_kg_per_ha)
            .map(|(no3, nh4)| no3 + nh4)
            .collect()
    }
}

/// Soil water availability factor per layer, 0 at LL and 1 at or above DUL
pub fn soil_water_availability(profile: &SoilProfile, water_mm: &[f64]) -> Vec<f64> {
    profile
        .ll_mm()
        .iter()
        .zip(profile.dul_mm())
        .zip(water_mm)
        .map(|((ll, dul), water)| {
            let range = dul - ll;
            if range <= 0.0 {
                return 0.0;
            }
            ((water - ll) / range).clamp(0.0, 1.0)
        })
        .collect()
}

fn layer_supply(n_kg_per_ha: f64, k: f64, bulk_density: f64, thickness_mm: f64, swaf: f64) -> f64 {
    let ppm = n_kg_per_ha * (100.0 / (bulk_density * thickness_mm));
    // A layer cannot give more than it holds
    (n_kg_per_ha * k * ppm * swaf).clamp(0.0, n_kg_per_ha.max(0.0))
}

/// Per-layer NO3 and NH4 supply for layers down to `root_layer` with live roots
pub fn soil_n_supply(
    zone: &SoilZone,
    live_wt: &[f64],
    root_layer: usize,
    params: &NitrogenUptakeParameters,
) -> LayerNitrogenSupply {
    let profile = zone.profile();
    let n = zone.n_layers();
    let mut supply = LayerNitrogenSupply::zeros(n);
    let swaf = soil_water_availability(profile, zone.water_mm());

    for layer in 0..n.min(root_layer + 1) {
        if live_wt.get(layer).copied().unwrap_or(0.0) <= 0.0 {
            continue;
        }
        let soil = profile.layer(layer);
        supply.no3_kg_per_ha[layer] = layer_supply(
            zone.no3_kg_per_ha()[layer],
            params.kno3,
            soil.bulk_density_g_per_cm3,
            soil.thickness_mm,
            swaf[layer],
        );
        supply.nh4_kg_per_ha[layer] = layer_supply(
            zone.nh4_kg_per_ha()[layer],
            params.knh4,
            soil.bulk_density_g_per_cm3,
            soil.thickness_mm,
            swaf[layer],
        );
    }
    supply
}

/// Organ-level uptake supply (g/m²): the layer total capped at the daily maximum
pub fn capped_n_supply(supply: &LayerNitrogenSupply, max_daily_n_uptake_g_per_m2: f64) -> f64 {
    supply.total_g_per_m2().min(max_daily_n_uptake_g_per_m2.max(0.0))
}

/// Signed NO3 and NH4 deltas (kg/ha) removing `uptake_g_per_m2` from the soil
///
/// Each layer gives up the same fraction of its supply. Uptake beyond the
/// capped supply is an error.
pub fn nitrogen_uptake_delta(
    organ: &str,
    supply: &LayerNitrogenSupply,
    uptake_g_per_m2: f64,
    max_daily_n_uptake_g_per_m2: f64,
) -> ArbitrationResult<(Vec<f64>, Vec<f64>)> {
    let n = supply.no3_kg_per_ha.len();
    let capped = capped_n_supply(supply, max_daily_n_uptake_g_per_m2);
    if uptake_g_per_m2 > capped + UPTAKE_TOLERANCE {
        return Err(ArbitrationError::UptakeExceedsSupply {
            organ: organ.to_string(),
            resource: Resource::Nitrogen,
            requested: uptake_g_per_m2,
            supply: capped,
        });
    }

    let total = supply.total_g_per_m2();
    if uptake_g_per_m2 <= 0.0 || total <= 0.0 {
        return Ok((vec![0.0; n], vec![0.0; n]));
    }

    let fraction = (uptake_g_per_m2 / total).min(1.0);
    let no3 = supply.no3_kg_per_ha.iter().map(|s| -s * fraction).collect();
    let nh4 = supply.nh4_kg_per_ha.iter().map(|s| -s * fraction).collect();
    Ok((no3, nh4))
}
