//! Mutable soil pools for one zone.
//!
//! The profile is fixed for the life of the crop; the pools change once per
//! day when a root commits its water and mineral-N uptake.

use serde::{Deserialize, Serialize};

use super::SoilProfile;
use crate::error::{ArbitrationError, ArbitrationResult, Resource};

/// Pools smaller than this after a commit are treated as rounding noise
const POOL_TOLERANCE: f64 = 1e-9;

/// Soil zone: profile plus current water and mineral nitrogen
#[derive(Debug, Clone)]
pub struct SoilZone {
    /// Zone name
    pub name: String,
    profile: SoilProfile,
    /// Water per layer (mm)
    water_mm: Vec<f64>,
    /// Nitrate per layer (kg/ha)
    no3_kg_per_ha: Vec<f64>,
    /// Ammonium per layer (kg/ha)
    nh4_kg_per_ha: Vec<f64>,
}

/// Signed changes committed to a zone on one day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilDelta {
    /// Water change per layer (mm, negative for uptake)
    pub water_mm: Vec<f64>,
    /// Nitrate change per layer (kg/ha)
    pub no3_kg_per_ha: Vec<f64>,
    /// Ammonium change per layer (kg/ha)
    pub nh4_kg_per_ha: Vec<f64>,
}

impl SoilDelta {
    /// Zeroed delta for `n_layers`
    pub fn zeros(n_layers: usize) -> Self {
        Self {
            water_mm: vec![0.0; n_layers],
            no3_kg_per_ha: vec![0.0; n_layers],
            nh4_kg_per_ha: vec![0.0; n_layers],
        }
    }

    /// Total water change (mm)
    pub fn total_water_mm(&self) -> f64 {
        self.water_mm.iter().sum()
    }

    /// Total mineral nitrogen change (kg/ha)
    pub fn total_nitrogen_kg_per_ha(&self) -> f64 {
        self.no3_kg_per_ha.iter().sum::<f64>() + self.nh4_kg_per_ha.iter().sum::<f64>()
    }
}

impl SoilZone {
    /// Zone initialised from the profile's initial water and nitrogen
    pub fn new(name: &str, profile: SoilProfile) -> Self {
        let water_mm = profile
            .layers()
            .iter()
            .map(|l| l.initial_water * l.thickness_mm)
            .collect();
        let no3_kg_per_ha = profile.layers().iter().map(|l| l.no3_kg_per_ha).collect();
        let nh4_kg_per_ha = profile.layers().iter().map(|l| l.nh4_kg_per_ha).collect();
        Self {
            name: name.to_string(),
            profile,
            water_mm,
            no3_kg_per_ha,
            nh4_kg_per_ha,
        }
    }

    /// Immutable layer data
    pub fn profile(&self) -> &SoilProfile {
        &self.profile
    }

    /// Number of layers
    pub fn n_layers(&self) -> usize {
        self.profile.len()
    }

    /// Water per layer (mm)
    pub fn water_mm(&self) -> &[f64] {
        &self.water_mm
    }

    /// Nitrate per layer (kg/ha)
    pub fn no3_kg_per_ha(&self) -> &[f64] {
        &self.no3_kg_per_ha
    }

    /// Ammonium per layer (kg/ha)
    pub fn nh4_kg_per_ha(&self) -> &[f64] {
        &self.nh4_kg_per_ha
    }

    /// Total profile water (mm)
    pub fn total_water_mm(&self) -> f64 {
        self.water_mm.iter().sum()
    }

    /// Total mineral nitrogen (kg/ha)
    pub fn total_mineral_n_kg_per_ha(&self) -> f64 {
        self.no3_kg_per_ha.iter().sum::<f64>() + self.nh4_kg_per_ha.iter().sum::<f64>()
    }

    /// Replace water contents (mm), e.g. after an external water balance step
    pub fn set_water_mm(&mut self, water_mm: Vec<f64>) -> ArbitrationResult<()> {
        self.check_len("soil water", water_mm.len())?;
        self.water_mm = water_mm;
        Ok(())
    }

    /// Replace mineral nitrogen contents (kg/ha)
    pub fn set_mineral_n(&mut self, no3: Vec<f64>, nh4: Vec<f64>) -> ArbitrationResult<()> {
        self.check_len("NO3", no3.len())?;
        self.check_len("NH4", nh4.len())?;
        self.no3_kg_per_ha = no3;
        self.nh4_kg_per_ha = nh4;
        Ok(())
    }

    /// Apply a signed water delta (mm)
    pub fn apply_water_delta(&mut self, organ: &str, delta_mm: &[f64]) -> ArbitrationResult<()> {
        self.check_len("water delta", delta_mm.len())?;
        apply_delta(organ, Resource::Water, &mut self.water_mm, delta_mm)
    }

    /// Apply signed NO3 and NH4 deltas (kg/ha)
    pub fn apply_nitrogen_delta(
        &mut self,
        organ: &str,
        delta_no3: &[f64],
        delta_nh4: &[f64],
    ) -> ArbitrationResult<()> {
        self.check_len("NO3 delta", delta_no3.len())?;
        self.check_len("NH4 delta", delta_nh4.len())?;
        apply_delta(organ, Resource::Nitrogen, &mut self.no3_kg_per_ha, delta_no3)?;
        apply_delta(organ, Resource::Nitrogen, &mut self.nh4_kg_per_ha, delta_nh4)
    }

    fn check_len(&self, context: &str, actual: usize) -> ArbitrationResult<()> {
        if actual != self.n_layers() {
            return Err(ArbitrationError::LayerMismatch {
                context: context.to_string(),
                expected: self.n_layers(),
                actual,
            });
        }
        Ok(())
    }
}

fn apply_delta(organ: &str, resource: Resource, pool: &mut [f64], delta: &[f64]) -> ArbitrationResult<()> {
    // Validate the whole array before touching the pool
    for (&current, &change) in pool.iter().zip(delta) {
        if current + change < -POOL_TOLERANCE {
            return Err(ArbitrationError::UptakeExceedsSupply {
                organ: organ.to_string(),
                resource,
                requested: -change,
                supply: current,
            });
        }
    }
    for (current, &change) in pool.iter_mut().zip(delta) {
        *current = (*current + change).max(0.0);
    }
    Ok(())
}
