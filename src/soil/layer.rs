//! Layered soil profile.
//!
//! Units follow the soil water convention: thickness in mm, water limits as
//! volumetric fractions (mm/mm), mineral nitrogen in kg/ha.

use serde::{Deserialize, Serialize};

use crate::error::{ArbitrationError, ArbitrationResult};

/// One soil layer, as supplied by the soil parameterisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilLayer {
    /// Layer thickness (mm)
    pub thickness_mm: f64,
    /// Bulk density (g/cm³)
    pub bulk_density_g_per_cm3: f64,
    /// Lower limit, 15 bar (mm/mm)
    pub ll: f64,
    /// Drained upper limit (mm/mm)
    pub dul: f64,
    /// Saturated water content (mm/mm)
    pub sat: f64,
    /// Initial water content (mm/mm)
    pub initial_water: f64,
    /// Nitrate nitrogen (kg/ha)
    #[serde(default)]
    pub no3_kg_per_ha: f64,
    /// Ammonium nitrogen (kg/ha)
    #[serde(default)]
    pub nh4_kg_per_ha: f64,
    /// Crop lower limit (mm/mm)
    pub crop_ll: f64,
    /// Water extraction rate constant (/day)
    #[serde(default = "default_kl")]
    pub kl: f64,
    /// Root exploration factor (0-1)
    #[serde(default = "default_xf")]
    pub xf: f64,
}

fn default_kl() -> f64 {
    DEFAULT_KL
}

fn default_xf() -> f64 {
    1.0
}

/// KL used when a layer does not give one
pub const DEFAULT_KL: f64 = 0.06;

impl SoilLayer {
    /// Layer with the given geometry and limits, water at DUL and no mineral N
    pub fn new(thickness_mm: f64, bulk_density_g_per_cm3: f64, ll: f64, dul: f64, sat: f64) -> Self {
        Self {
            thickness_mm,
            bulk_density_g_per_cm3,
            ll,
            dul,
            sat,
            initial_water: dul,
            no3_kg_per_ha: 0.0,
            nh4_kg_per_ha: 0.0,
            crop_ll: ll,
            kl: DEFAULT_KL,
            xf: 1.0,
        }
    }

    /// Set initial mineral nitrogen (kg/ha)
    pub fn with_nitrogen(mut self, no3_kg_per_ha: f64, nh4_kg_per_ha: f64) -> Self {
        self.no3_kg_per_ha = no3_kg_per_ha;
        self.nh4_kg_per_ha = nh4_kg_per_ha;
        self
    }

    /// Set initial volumetric water content
    pub fn with_water(mut self, water: f64) -> Self {
        self.initial_water = water;
        self
    }

    /// Set crop-specific lower limit, KL and XF
    pub fn with_crop(mut self, crop_ll: f64, kl: f64, xf: f64) -> Self {
        self.crop_ll = crop_ll;
        self.kl = kl;
        self.xf = xf;
        self
    }

    fn validate(&self, index: usize) -> ArbitrationResult<()> {
        let invalid = |message: String| ArbitrationError::InvalidSoil { layer: index, message };

        if !(self.thickness_mm > 0.0) {
            return Err(invalid(format!("thickness must be positive, got {}", self.thickness_mm)));
        }
        if !(self.bulk_density_g_per_cm3 > 0.0) {
            return Err(invalid(format!(
                "bulk density must be positive, got {}",
                self.bulk_density_g_per_cm3
            )));
        }
        if self.ll > self.dul || self.dul > self.sat {
            return Err(invalid(format!(
                "expected LL <= DUL <= SAT, got {} / {} / {}",
                self.ll, self.dul, self.sat
            )));
        }
        if self.no3_kg_per_ha < 0.0 || self.nh4_kg_per_ha < 0.0 {
            return Err(invalid("mineral nitrogen must be non-negative".to_string()));
        }
        if !(0.0..=1.0).contains(&self.xf) {
            return Err(invalid(format!("XF must be within 0-1, got {}", self.xf)));
        }
        if self.kl < 0.0 {
            return Err(invalid(format!("KL must be non-negative, got {}", self.kl)));
        }
        Ok(())
    }
}

/// Ordered soil layers, surface first
#[derive(Debug, Clone, PartialEq)]
pub struct SoilProfile {
    layers: Vec<SoilLayer>,
    /// Cumulative depth to the bottom of each layer (mm)
    bottoms_mm: Vec<f64>,
}

impl SoilProfile {
    /// Build a profile, validating every layer
    pub fn new(layers: Vec<SoilLayer>) -> ArbitrationResult<Self> {
        if layers.is_empty() {
            return Err(ArbitrationError::InvalidSoil {
                layer: 0,
                message: "profile has no layers".to_string(),
            });
        }
        for (i, layer) in layers.iter().enumerate() {
            layer.validate(i)?;
        }
        let bottoms_mm = layers
            .iter()
            .scan(0.0, |depth, layer| {
                *depth += layer.thickness_mm;
                Some(*depth)
            })
            .collect();
        Ok(Self { layers, bottoms_mm })
    }

    /// Layers, surface first
    pub fn layers(&self) -> &[SoilLayer] {
        &self.layers
    }

    /// Layer at index
    pub fn layer(&self, index: usize) -> &SoilLayer {
        &self.layers[index]
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True when the profile has no layers (never, after construction)
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layer thicknesses (mm)
    pub fn thickness(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.thickness_mm).collect()
    }

    /// Depth to the bottom of a layer (mm)
    pub fn cumulative_depth(&self, index: usize) -> f64 {
        self.bottoms_mm[index]
    }

    /// Total profile depth (mm)
    pub fn total_depth(&self) -> f64 {
        self.bottoms_mm.last().copied().unwrap_or(0.0)
    }

    /// Index of the first layer whose bottom is at or below `depth_mm`
    pub fn layer_index_at_depth(&self, depth_mm: f64) -> ArbitrationResult<usize> {
        self.bottoms_mm
            .iter()
            .position(|&bottom| bottom >= depth_mm)
            .ok_or(ArbitrationError::DepthOutOfRange {
                depth_mm,
                profile_depth_mm: self.total_depth(),
            })
    }

    /// Fraction of a layer lying above the root front (0-1)
    pub fn fraction_of_layer_occupied_by_root(&self, index: usize, root_depth_mm: f64) -> f64 {
        let bottom = self.bottoms_mm[index];
        let thickness = self.layers[index].thickness_mm;
        let top = bottom - thickness;
        let depth_to_root = bottom.min(root_depth_mm);
        let depth_of_root_in_layer = (depth_to_root - top).max(0.0);
        depth_of_root_in_layer / thickness
    }

    /// Deepest point roots can reach: total thickness of layers with XF > 0
    pub fn max_root_depth(&self) -> f64 {
        self.layers
            .iter()
            .filter(|l| l.xf > 0.0)
            .map(|l| l.thickness_mm)
            .sum()
    }

    /// Lower limit per layer (mm)
    pub fn ll_mm(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.ll * l.thickness_mm).collect()
    }

    /// Drained upper limit per layer (mm)
    pub fn dul_mm(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.dul * l.thickness_mm).collect()
    }

    /// Saturation per layer (mm)
    pub fn sat_mm(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.sat * l.thickness_mm).collect()
    }

    /// Crop lower limit per layer (mm)
    pub fn crop_ll_mm(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.crop_ll * l.thickness_mm).collect()
    }
}
