//! Root water supply and extraction.

use super::UPTAKE_TOLERANCE;
use crate::error::{ArbitrationError, ArbitrationResult, Resource};
use crate::soil::SoilZone;

/// Extractable water per layer (mm)
///
/// `KL × KL modifier × (water − crop LL) × root fraction` for layers down to
/// the root front, zero below.
pub fn water_supply(zone: &SoilZone, root_depth_mm: f64, kl_modifier: f64) -> ArbitrationResult<Vec<f64>> {
    let profile = zone.profile();
    let n = zone.n_layers();
    let mut supply = vec![0.0; n];
    if root_depth_mm <= 0.0 {
        return Ok(supply);
    }
    let root_layer = profile.layer_index_at_depth(root_depth_mm)?;
    let crop_ll = profile.crop_ll_mm();

    for layer in 0..=root_layer.min(n - 1) {
        let soil = profile.layer(layer);
        let available = zone.water_mm()[layer] - crop_ll[layer];
        let fraction = profile.fraction_of_layer_occupied_by_root(layer, root_depth_mm);
        supply[layer] = (soil.kl * kl_modifier * available * fraction).max(0.0);
    }
    Ok(supply)
}

/// Positive per-layer extraction taking `uptake_mm` pro rata to layer supply
pub fn water_extraction(organ: &str, supply: &[f64], uptake_mm: f64) -> ArbitrationResult<Vec<f64>> {
    let total: f64 = supply.iter().sum();
    if uptake_mm > total + UPTAKE_TOLERANCE {
        return Err(ArbitrationError::UptakeExceedsSupply {
            organ: organ.to_string(),
            resource: Resource::Water,
            requested: uptake_mm,
            supply: total,
        });
    }
    if uptake_mm <= 0.0 || total <= 0.0 {
        return Ok(vec![0.0; supply.len()]);
    }
    let fraction = (uptake_mm / total).min(1.0);
    Ok(supply.iter().map(|s| s * fraction).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soil::{SoilLayer, SoilProfile};

    fn zone() -> SoilZone {
        let profile = SoilProfile::new(vec![
            SoilLayer::new(100.0, 1.3, 0.1, 0.3, 0.4).with_crop(0.1, 0.08, 1.0),
            SoilLayer::new(100.0, 1.3, 0.1, 0.3, 0.4).with_crop(0.1, 0.06, 1.0),
            SoilLayer::new(100.0, 1.3, 0.1, 0.3, 0.4).with_crop(0.1, 0.04, 1.0),
        ])
        .unwrap();
        SoilZone::new("field", profile)
    }

    #[test]
    fn test_supply_stops_at_root_front() {
        let z = zone();
        let supply = water_supply(&z, 150.0, 1.0).unwrap();
        // (30 − 10) × 0.08 × 1.0
        assert!((supply[0] - 1.6).abs() < 1e-12);
        // half the second layer is occupied
        assert!((supply[1] - 0.6).abs() < 1e-12);
        assert_eq!(supply[2], 0.0);
    }

    #[test]
    fn test_no_roots_no_supply() {
        let supply = water_supply(&zone(), 0.0, 1.0).unwrap();
        assert_eq!(supply, vec![0.0; 3]);
    }

    #[test]
    fn test_extraction_pro_rata() {
        let taken = water_extraction("Root", &[1.5, 0.5, 0.0], 1.0).unwrap();
        assert!((taken[0] - 0.75).abs() < 1e-12);
        assert!((taken[1] - 0.25).abs() < 1e-12);
        assert!(water_extraction("Root", &[0.5], 0.6).is_err());
    }
}
