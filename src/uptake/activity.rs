//! Root Activity weights and layer partitioning.
//!
//! A layer's water weight is its specific water uptake (uptake per unit live
//! root) scaled by thickness and the fraction of the layer occupied by roots:
//!
//! ```text
//! RAw(l) = max(uptake(l) / live(l) × thickness(l) × root_fraction(l), 1e-20)
//! ```
//!
//! Layers holding no live roots inherit the weights of the layer above (the
//! surface layer gets zero). Layers below the root front get zero.
//!
//! The nitrogen weight is computed the same way from the N uptake, but is
//! then floored against the water weight, `RAn = max(RAw, 1e-10)`, so in
//! effect it follows water uptake. The raw value is kept for reporting.

use crate::error::{ArbitrationError, ArbitrationResult, Resource};
use crate::soil::SoilProfile;

/// Smallest water weight given to a layer with live roots
pub const MIN_WATER_WEIGHT: f64 = 1e-20;
/// Floor applied to the nitrogen weight
pub const MIN_NITROGEN_WEIGHT: f64 = 1e-10;

/// Per-layer Root Activity weights
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootActivityWeights {
    /// Water-based weights, used to place new root DM
    pub water: Vec<f64>,
    /// Nitrogen weights after the floor
    pub nitrogen: Vec<f64>,
    /// Nitrogen activity before the floor
    pub nitrogen_activity: Vec<f64>,
}

impl RootActivityWeights {
    /// Sum of water weights
    pub fn total_water(&self) -> f64 {
        self.water.iter().sum()
    }
}

/// Root Activity weights from the previous day's positive uptake arrays
pub fn root_activity_weights(
    profile: &SoilProfile,
    root_depth_mm: f64,
    live_wt: &[f64],
    water_uptake_mm: &[f64],
    n_uptake_kg_per_ha: &[f64],
) -> ArbitrationResult<RootActivityWeights> {
    let n = profile.len();
    let mut weights = RootActivityWeights {
        water: vec![0.0; n],
        nitrogen: vec![0.0; n],
        nitrogen_activity: vec![0.0; n],
    };
    let root_layer = profile.layer_index_at_depth(root_depth_mm.max(0.0))?;

    for layer in 0..=root_layer.min(n - 1) {
        let live = live_wt.get(layer).copied().unwrap_or(0.0);
        if live > 0.0 {
            let scale = profile.layer(layer).thickness_mm
                * profile.fraction_of_layer_occupied_by_root(layer, root_depth_mm);
            let water_uptake = water_uptake_mm.get(layer).copied().unwrap_or(0.0);
            let n_uptake = n_uptake_kg_per_ha.get(layer).copied().unwrap_or(0.0);

            let raw = (water_uptake / live * scale).max(MIN_WATER_WEIGHT);
            weights.water[layer] = raw;
            weights.nitrogen_activity[layer] = n_uptake / live * scale;
            weights.nitrogen[layer] = raw.max(MIN_NITROGEN_WEIGHT);
        } else if layer > 0 {
            weights.water[layer] = weights.water[layer - 1];
            weights.nitrogen[layer] = weights.nitrogen[layer - 1];
            weights.nitrogen_activity[layer] = weights.nitrogen_activity[layer - 1];
        }
    }
    Ok(weights)
}

/// Split `amount` across layers in proportion to `weights`
///
/// A zero amount gives zeros; a positive amount with no weight is an error.
pub fn partition(organ: &str, resource: Resource, amount: f64, weights: &[f64]) -> ArbitrationResult<Vec<f64>> {
    if amount == 0.0 {
        return Ok(vec![0.0; weights.len()]);
    }
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) {
        return Err(ArbitrationError::partitioning(organ, resource, amount));
    }
    Ok(weights.iter().map(|w| amount * w / total).collect())
}
