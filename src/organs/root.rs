//! Root organ.
//!
//! The root keeps live and dead biomass per soil layer and is the only organ
//! that takes water and mineral N out of the soil zone. New DM is placed in
//! layers by Root Activity water weights; N is placed by per-layer deficit.
//!
//! The root grows only while the crop is in the ground and the root front is
//! below the sowing depth. The front advances every in-ground day:
//!
//! ```text
//! depth += RFV × XF(root layer) × temperature effect     (≤ max rooting depth)
//! ```

use serde::{Deserialize, Serialize};

use super::{
    unit_fraction, ArbitrationContext, Organ, OrganKind, ResidueReturn, SowingParameters,
};
use crate::error::{ArbitrationError, ArbitrationResult, Resource};
use crate::functions::{
    DailyDrivers, FunctionConfig, FunctionLinks, PlantFunction, ROOT_FRONT_VELOCITY,
    TEMPERATURE_EFFECT,
};
use crate::soil::{SoilProfile, SoilZone, KG_PER_HA_TO_G_PER_M2};
use crate::state::{Biomass, BiomassAllocation, BiomassPool, BiomassSupply, FomLayer};
use crate::uptake::{
    capped_n_supply, nitrogen_uptake_delta, partition, root_activity_weights, soil_n_supply,
    water_extraction, water_supply, LayerNitrogenSupply, NitrogenUptakeParameters,
    RootActivityWeights,
};

/// Allocations below this are treated as zero when checked against demand
const ALLOCATION_TOLERANCE: f64 = 1e-12;

/// Static root parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootParameters {
    /// Organ name
    pub name: String,
    /// Crop type written on residue records
    pub crop_type: String,
    /// Root DM per plant at sowing (g)
    pub initial_dm_g_per_plant: f64,
    /// Specific root length (m/g)
    pub specific_root_length_m_per_g: f64,
    /// Soil mineral-N uptake coefficients and daily cap
    pub nitrogen: NitrogenUptakeParameters,
    /// Linked daily functions
    ///
    /// Required: `partition_fraction`, `maximum_n_conc`, `root_front_velocity`.
    /// Optional: `minimum_n_conc` (0), `nitrogen_demand_switch` (1),
    /// `temperature_effect` (1), `senescence_rate` (0), `kl_modifier` (1).
    pub links: FunctionLinks,
}

impl Default for RootParameters {
    fn default() -> Self {
        Self {
            name: "Root".to_string(),
            crop_type: "crop".to_string(),
            initial_dm_g_per_plant: 0.2,
            specific_root_length_m_per_g: 40.0,
            nitrogen: NitrogenUptakeParameters::default(),
            links: FunctionLinks::new()
                .with_constant("partition_fraction", 0.2)
                .with_constant("maximum_n_conc", 0.01)
                .with_constant("minimum_n_conc", 0.005)
                .with_constant("senescence_rate", 0.005)
                .with("root_front_velocity", FunctionConfig::driver(ROOT_FRONT_VELOCITY, 20.0))
                .with("temperature_effect", FunctionConfig::driver(TEMPERATURE_EFFECT, 1.0)),
        }
    }
}

/// Layer-resolved root properties published each day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootProperties {
    /// Root front depth (mm)
    pub depth_mm: f64,
    /// Root length density per layer (m/mm³, `wt × SRL / 1e6 / thickness`)
    pub length_density: Vec<f64>,
    /// Fraction of each layer above the root front
    pub exploration_by_layer: Vec<f64>,
    /// KL × KL modifier per layer
    pub kl_adjusted: Vec<f64>,
    /// Crop lower limit per layer (mm)
    pub ll_dep_mm: Vec<f64>,
    /// Daily N uptake cap (g/m²)
    pub max_daily_n_uptake_g_per_m2: f64,
}

#[derive(Debug, Clone)]
struct RootLinks {
    partition_fraction: Box<dyn PlantFunction>,
    maximum_n_conc: Box<dyn PlantFunction>,
    minimum_n_conc: Option<Box<dyn PlantFunction>>,
    nitrogen_demand_switch: Option<Box<dyn PlantFunction>>,
    root_front_velocity: Box<dyn PlantFunction>,
    temperature_effect: Option<Box<dyn PlantFunction>>,
    senescence_rate: Option<Box<dyn PlantFunction>>,
    kl_modifier: Option<Box<dyn PlantFunction>>,
}

impl RootLinks {
    fn resolve(organ: &str, links: &FunctionLinks) -> ArbitrationResult<Self> {
        Ok(Self {
            partition_fraction: links.required(organ, "partition_fraction")?,
            maximum_n_conc: links.required(organ, "maximum_n_conc")?,
            minimum_n_conc: links.optional("minimum_n_conc"),
            nitrogen_demand_switch: links.optional("nitrogen_demand_switch"),
            root_front_velocity: links.required(organ, "root_front_velocity")?,
            temperature_effect: links.optional("temperature_effect"),
            senescence_rate: links.optional("senescence_rate"),
            kl_modifier: links.optional("kl_modifier"),
        })
    }

    fn update(&mut self, drivers: &DailyDrivers) {
        self.partition_fraction.update(drivers);
        self.maximum_n_conc.update(drivers);
        self.root_front_velocity.update(drivers);
        for f in [
            &mut self.minimum_n_conc,
            &mut self.nitrogen_demand_switch,
            &mut self.temperature_effect,
            &mut self.senescence_rate,
            &mut self.kl_modifier,
        ]
        .into_iter()
        .flatten()
        {
            f.update(drivers);
        }
    }
}

fn value_or(f: &Option<Box<dyn PlantFunction>>, default: f64) -> f64 {
    f.as_ref().map_or(default, |f| f.value())
}

/// Below-ground organ resolved per soil layer
#[derive(Debug, Clone)]
pub struct Root {
    params: RootParameters,
    links: RootLinks,
    profile: SoilProfile,
    layer_live: Vec<Biomass>,
    layer_dead: Vec<Biomass>,
    depth_mm: f64,
    sowing_depth_mm: f64,
    plant_in_ground: bool,
    /// Today's senescence rate, fixed in the Commencing phase
    senescence_rate: f64,
    /// Previous water extraction per layer (mm, positive)
    water_uptake_mm: Vec<f64>,
    /// Previous NO3 change per layer (kg/ha, negative for uptake)
    delta_no3_kg_per_ha: Vec<f64>,
    /// Previous NH4 change per layer (kg/ha, negative for uptake)
    delta_nh4_kg_per_ha: Vec<f64>,
    weights: RootActivityWeights,
    potential: BiomassPool,
    total_length_m: f64,
}

impl Root {
    /// Root over `profile`, zeroed until sown
    pub fn new(params: RootParameters, profile: &SoilProfile) -> ArbitrationResult<Self> {
        let links = RootLinks::resolve(&params.name, &params.links)?;
        let mut root = Self {
            params,
            links,
            profile: profile.clone(),
            layer_live: Vec::new(),
            layer_dead: Vec::new(),
            depth_mm: 0.0,
            sowing_depth_mm: 0.0,
            plant_in_ground: false,
            senescence_rate: 0.0,
            water_uptake_mm: Vec::new(),
            delta_no3_kg_per_ha: Vec::new(),
            delta_nh4_kg_per_ha: Vec::new(),
            weights: RootActivityWeights::default(),
            potential: BiomassPool::default(),
            total_length_m: 0.0,
        };
        root.clear();
        Ok(root)
    }

    /// Reset to the unsown state with fresh per-layer arrays
    pub fn clear(&mut self) {
        let n = self.profile.len();
        self.layer_live = vec![Biomass::default(); n];
        self.layer_dead = vec![Biomass::default(); n];
        self.water_uptake_mm = vec![0.0; n];
        self.delta_no3_kg_per_ha = vec![0.0; n];
        self.delta_nh4_kg_per_ha = vec![0.0; n];
        self.weights = RootActivityWeights::default();
        self.potential = BiomassPool::default();
        self.depth_mm = 0.0;
        self.sowing_depth_mm = 0.0;
        self.plant_in_ground = false;
        self.total_length_m = 0.0;
    }

    /// Root front depth (mm)
    pub fn depth_mm(&self) -> f64 {
        self.depth_mm
    }

    /// Live biomass per layer
    pub fn layer_live(&self) -> &[Biomass] {
        &self.layer_live
    }

    /// Dead biomass per layer
    pub fn layer_dead(&self) -> &[Biomass] {
        &self.layer_dead
    }

    /// Root Activity weights used for the last DM allocation
    pub fn activity_weights(&self) -> &RootActivityWeights {
        &self.weights
    }

    /// Last water extraction per layer (mm)
    pub fn water_uptake_mm(&self) -> &[f64] {
        &self.water_uptake_mm
    }

    /// Last NO3 and NH4 change per layer (kg/ha)
    pub fn nitrogen_delta_kg_per_ha(&self) -> (&[f64], &[f64]) {
        (&self.delta_no3_kg_per_ha, &self.delta_nh4_kg_per_ha)
    }

    /// Pending potential DM allocation (cleared once growth is committed)
    pub fn potential_dm_allocation(&self) -> &BiomassPool {
        &self.potential
    }

    /// Total root length (m/m²) as of the Commencing phase
    pub fn total_length_m(&self) -> f64 {
        self.total_length_m
    }

    /// Growing once the front has moved past the sowing depth
    pub fn is_growing(&self) -> bool {
        self.plant_in_ground && self.sowing_depth_mm < self.depth_mm
    }

    /// Root length density per layer
    pub fn length_density(&self) -> Vec<f64> {
        self.layer_live
            .iter()
            .zip(self.profile.layers())
            .map(|(live, soil)| live.wt() * self.params.specific_root_length_m_per_g / 1e6 / soil.thickness_mm)
            .collect()
    }

    fn live_wt(&self) -> Vec<f64> {
        self.layer_live.iter().map(Biomass::wt).collect()
    }

    fn root_layer(&self) -> ArbitrationResult<usize> {
        self.profile.layer_index_at_depth(self.depth_mm)
    }

    fn kl_modifier(&self) -> f64 {
        value_or(&self.links.kl_modifier, 1.0)
    }

    fn layer_n_supply(&self, zone: &SoilZone) -> ArbitrationResult<LayerNitrogenSupply> {
        if !self.plant_in_ground || self.depth_mm <= 0.0 {
            return Ok(LayerNitrogenSupply::zeros(zone.n_layers()));
        }
        let root_layer = self.root_layer()?;
        Ok(soil_n_supply(zone, &self.live_wt(), root_layer, &self.params.nitrogen))
    }

    /// N needed to bring each layer to maximum concentration
    fn layer_n_deficits(&self) -> Vec<f64> {
        let max_n = self.max_n_conc();
        self.layer_live
            .iter()
            .map(|l| (max_n * (l.wt() + l.potential_dm_allocation) - l.n()).max(0.0))
            .collect()
    }

    fn refresh_weights(&mut self) -> ArbitrationResult<()> {
        let n_uptake: Vec<f64> = self
            .delta_no3_kg_per_ha
            .iter()
            .zip(&self.delta_nh4_kg_per_ha)
            .map(|(no3, nh4)| -(no3 + nh4))
            .collect();
        self.weights = root_activity_weights(
            &self.profile,
            self.depth_mm,
            &self.live_wt(),
            &self.water_uptake_mm,
            &n_uptake,
        )?;
        Ok(())
    }

    fn residue(&self, dm: &[f64], n: &[f64]) -> ResidueReturn {
        ResidueReturn {
            organ: self.params.name.clone(),
            senesced_dm: dm.iter().sum(),
            senesced_n: n.iter().sum(),
            fom: FomLayer::from_layers(&self.params.crop_type, dm, n),
        }
    }

    /// Current root properties
    pub fn properties(&self) -> RootProperties {
        let kl_modifier = self.kl_modifier();
        RootProperties {
            depth_mm: self.depth_mm,
            length_density: self.length_density(),
            exploration_by_layer: (0..self.profile.len())
                .map(|i| self.profile.fraction_of_layer_occupied_by_root(i, self.depth_mm))
                .collect(),
            kl_adjusted: self.profile.layers().iter().map(|l| l.kl * kl_modifier).collect(),
            ll_dep_mm: self.profile.crop_ll_mm(),
            max_daily_n_uptake_g_per_m2: self.params.nitrogen.max_daily_n_uptake_g_per_m2,
        }
    }
}

impl Organ for Root {
    fn name(&self) -> &str {
        &self.params.name
    }

    fn kind(&self) -> OrganKind {
        OrganKind::Root
    }

    fn update_functions(&mut self, drivers: &DailyDrivers) {
        self.links.update(drivers);
        self.senescence_rate = unit_fraction(value_or(&self.links.senescence_rate, 0.0));
        self.total_length_m = self.length_density().iter().sum();
    }

    fn dm_supply(&self) -> BiomassSupply {
        BiomassSupply::default()
    }

    fn dm_demand(&self, ctx: &ArbitrationContext) -> BiomassPool {
        if !self.is_growing() {
            return BiomassPool::default();
        }
        let fraction = self.links.partition_fraction.value().max(0.0);
        BiomassPool::structural(ctx.total_dm_supply.max(0.0) * fraction)
    }

    fn set_dm_potential_allocation(&mut self, allocation: &BiomassPool) -> ArbitrationResult<()> {
        self.potential = *allocation;
        for layer in &mut self.layer_live {
            layer.potential_dm_allocation = 0.0;
        }
        if self.depth_mm <= 0.0 {
            return Ok(());
        }
        let amount = allocation.total();
        if !self.is_growing() && amount > ALLOCATION_TOLERANCE {
            return Err(ArbitrationError::InvalidAllocation {
                organ: self.params.name.clone(),
                resource: Resource::DryMatter,
                amount,
            });
        }

        self.refresh_weights()?;
        let parts = partition(&self.params.name, Resource::DryMatter, amount, &self.weights.water)?;
        for (layer, part) in self.layer_live.iter_mut().zip(parts) {
            layer.potential_dm_allocation = part;
        }
        Ok(())
    }

    fn set_dm_allocation(&mut self, allocation: &BiomassAllocation) -> ArbitrationResult<()> {
        let amount = allocation.received();
        if self.depth_mm > 0.0 {
            let parts = partition(&self.params.name, Resource::DryMatter, amount, &self.weights.water)?;
            for (layer, part) in self.layer_live.iter_mut().zip(parts) {
                layer.structural_wt += part;
            }
        } else if amount > ALLOCATION_TOLERANCE {
            return Err(ArbitrationError::partitioning(&self.params.name, Resource::DryMatter, amount));
        }
        for layer in &mut self.layer_live {
            layer.potential_dm_allocation = 0.0;
        }
        self.potential = BiomassPool::default();
        Ok(())
    }

    fn n_supply(&self, zone: &SoilZone) -> ArbitrationResult<BiomassSupply> {
        let supply = self.layer_n_supply(zone)?;
        Ok(BiomassSupply {
            uptake: capped_n_supply(&supply, self.params.nitrogen.max_daily_n_uptake_g_per_m2),
            ..Default::default()
        })
    }

    fn n_demand(&self) -> BiomassPool {
        if !self.plant_in_ground {
            return BiomassPool::default();
        }
        let switch = value_or(&self.links.nitrogen_demand_switch, 1.0).max(0.0);
        let demand: f64 = self.layer_n_deficits().iter().sum::<f64>() * switch;
        debug_assert!(demand >= 0.0);
        BiomassPool::structural(demand)
    }

    fn set_n_allocation(&mut self, allocation: &BiomassAllocation, zone: &mut SoilZone) -> ArbitrationResult<()> {
        let received = allocation.received();
        let parts = partition(&self.params.name, Resource::Nitrogen, received, &self.layer_n_deficits())?;
        for (layer, part) in self.layer_live.iter_mut().zip(parts) {
            layer.structural_n += part;
        }

        let n = zone.n_layers();
        if allocation.uptake > 0.0 {
            let supply = self.layer_n_supply(zone)?;
            let (no3, nh4) = nitrogen_uptake_delta(
                &self.params.name,
                &supply,
                allocation.uptake,
                self.params.nitrogen.max_daily_n_uptake_g_per_m2,
            )?;
            zone.apply_nitrogen_delta(&self.params.name, &no3, &nh4)?;
            log::debug!(
                "{}: N uptake {:.6} g/m2 ({:.6} kg/ha)",
                self.params.name,
                allocation.uptake,
                allocation.uptake / KG_PER_HA_TO_G_PER_M2
            );
            self.delta_no3_kg_per_ha = no3;
            self.delta_nh4_kg_per_ha = nh4;
        } else {
            self.delta_no3_kg_per_ha = vec![0.0; n];
            self.delta_nh4_kg_per_ha = vec![0.0; n];
        }
        Ok(())
    }

    fn water_supply(&self, zone: &SoilZone) -> ArbitrationResult<Vec<f64>> {
        if !self.plant_in_ground {
            return Ok(vec![0.0; zone.n_layers()]);
        }
        water_supply(zone, self.depth_mm, self.kl_modifier())
    }

    fn take_water(&mut self, uptake_mm: f64, zone: &mut SoilZone) -> ArbitrationResult<Vec<f64>> {
        let supply = self.water_supply(zone)?;
        let taken = water_extraction(&self.params.name, &supply, uptake_mm)?;
        let delta: Vec<f64> = taken.iter().map(|t| -t).collect();
        zone.apply_water_delta(&self.params.name, &delta)?;
        self.water_uptake_mm = taken.clone();
        Ok(taken)
    }

    fn min_n_conc(&self) -> f64 {
        value_or(&self.links.minimum_n_conc, 0.0)
    }

    fn max_n_conc(&self) -> f64 {
        self.links.maximum_n_conc.value()
    }

    fn wt(&self) -> f64 {
        self.layer_live.iter().map(Biomass::wt).sum()
    }

    fn n(&self) -> f64 {
        self.layer_live.iter().map(Biomass::n).sum()
    }

    fn dead_wt(&self) -> f64 {
        self.layer_dead.iter().map(Biomass::wt).sum()
    }

    fn dead_n(&self) -> f64 {
        self.layer_dead.iter().map(Biomass::n).sum()
    }

    fn do_actual_growth(&mut self, _zone: &SoilZone) -> ArbitrationResult<Option<ResidueReturn>> {
        if !self.plant_in_ground {
            return Ok(None);
        }

        let root_layer = self.root_layer()?;
        let xf = self.profile.layer(root_layer).xf;
        let temperature_effect = value_or(&self.links.temperature_effect, 1.0);
        let advance = (self.links.root_front_velocity.value() * xf * temperature_effect).max(0.0);
        self.depth_mm = (self.depth_mm + advance).min(self.profile.max_root_depth());

        let rate = self.senescence_rate;
        let mut dm = vec![0.0; self.layer_live.len()];
        let mut n = vec![0.0; self.layer_live.len()];
        for (i, layer) in self.layer_live.iter_mut().enumerate() {
            if layer.wt() > 0.0 && rate > 0.0 {
                let senesced = layer.take_fraction(rate);
                dm[i] = senesced.wt();
                n[i] = senesced.n();
            }
        }
        Ok(Some(self.residue(&dm, &n)))
    }

    fn sow(&mut self, sowing: &SowingParameters, _zone: &SoilZone) -> ArbitrationResult<()> {
        self.clear();
        if sowing.depth_mm > self.profile.total_depth() {
            return Err(ArbitrationError::DepthOutOfRange {
                depth_mm: sowing.depth_mm,
                profile_depth_mm: self.profile.total_depth(),
            });
        }
        self.plant_in_ground = sowing.plant_in_ground;
        self.depth_mm = sowing.depth_mm;
        self.sowing_depth_mm = sowing.depth_mm;

        let mut accumulated = 0.0;
        let mut initial_layers = 0;
        for soil in self.profile.layers() {
            if accumulated < self.depth_mm {
                initial_layers += 1;
            }
            accumulated += soil.thickness_mm;
        }
        if initial_layers > 0 {
            let max_n = self.links.maximum_n_conc.value();
            let per_layer = self.params.initial_dm_g_per_plant / initial_layers as f64 * sowing.population;
            for layer in self.layer_live.iter_mut().take(initial_layers) {
                layer.structural_wt = per_layer;
                layer.structural_n = per_layer * max_n;
            }
        }
        log::info!(
            "{}: sown at {:.1} mm, {:.4} g/m2 in {} layer(s)",
            self.params.name,
            self.depth_mm,
            self.wt(),
            initial_layers
        );
        Ok(())
    }

    fn end_crop(&mut self) -> Option<ResidueReturn> {
        let dm: Vec<f64> = self
            .layer_live
            .iter()
            .zip(&self.layer_dead)
            .map(|(live, dead)| live.wt() + dead.wt())
            .collect();
        let n: Vec<f64> = self
            .layer_live
            .iter()
            .zip(&self.layer_dead)
            .map(|(live, dead)| live.n() + dead.n())
            .collect();
        let residue = self.residue(&dm, &n);
        log::info!(
            "{}: crop ended, {:.3} kg/ha returned to the soil",
            self.params.name,
            residue.fom.total_amount()
        );
        self.clear();
        Some(residue)
    }

    fn root_properties(&self) -> Option<RootProperties> {
        Some(self.properties())
    }

    fn box_clone(&self) -> Box<dyn Organ> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soil::SoilLayer;

    fn zone() -> SoilZone {
        let profile = SoilProfile::new(vec![
            SoilLayer::new(150.0, 1.3, 0.10, 0.30, 0.45).with_nitrogen(10.0, 0.0),
            SoilLayer::new(150.0, 1.35, 0.12, 0.28, 0.42).with_nitrogen(8.0, 0.0),
            SoilLayer::new(200.0, 1.4, 0.15, 0.25, 0.40).with_nitrogen(5.0, 0.0),
        ])
        .unwrap();
        SoilZone::new("field", profile)
    }

    fn sown_root(zone: &SoilZone) -> Root {
        let params = RootParameters {
            initial_dm_g_per_plant: 1.0,
            ..Default::default()
        };
        let mut root = Root::new(params, zone.profile()).unwrap();
        root.update_functions(&DailyDrivers::new(1));
        root.sow(
            &SowingParameters {
                depth_mm: 100.0,
                population: 1.0,
                plant_in_ground: true,
            },
            zone,
        )
        .unwrap();
        root
    }

    #[test]
    fn test_missing_required_link() {
        let params = RootParameters {
            links: FunctionLinks::new().with_constant("maximum_n_conc", 0.01),
            ..Default::default()
        };
        let err = Root::new(params, zone().profile()).unwrap_err();
        assert!(matches!(err, ArbitrationError::MissingLink { .. }));
    }

    #[test]
    fn test_sow_places_initial_dm_in_first_layer() {
        let z = zone();
        let root = sown_root(&z);
        assert_eq!(root.layer_live()[0].structural_wt, 1.0);
        assert!((root.layer_live()[0].structural_n - 0.01).abs() < 1e-12);
        assert_eq!(root.layer_live()[1].wt(), 0.0);
        assert!(!root.is_growing());
    }

    #[test]
    fn test_front_advance_is_capped() {
        let z = zone();
        let mut root = sown_root(&z);
        root.update_functions(&DailyDrivers::new(1).with(ROOT_FRONT_VELOCITY, 1000.0));
        root.do_actual_growth(&z).unwrap();
        assert_eq!(root.depth_mm(), 500.0);
        assert!(root.is_growing());
    }

    #[test]
    fn test_senescence_returns_fom() {
        let z = zone();
        let mut root = sown_root(&z);
        let before = root.wt();
        let residue = root.do_actual_growth(&z).unwrap().unwrap();
        assert!((residue.senesced_dm - before * 0.005).abs() < 1e-12);
        assert!((residue.fom.total_amount() - residue.senesced_dm * 10.0).abs() < 1e-12);
        assert!((root.wt() + residue.senesced_dm - before).abs() < 1e-12);
    }

    #[test]
    fn test_end_crop_zeroes_root() {
        let z = zone();
        let mut root = sown_root(&z);
        let residue = root.end_crop().unwrap();
        assert!((residue.fom.total_amount() - 10.0).abs() < 1e-12);
        assert_eq!(root.wt(), 0.0);
        assert_eq!(root.depth_mm(), 0.0);
    }

    #[test]
    fn test_not_growing_rejects_dm() {
        let z = zone();
        let mut root = sown_root(&z);
        let err = root
            .set_dm_potential_allocation(&BiomassPool::structural(0.1))
            .unwrap_err();
        assert!(matches!(err, ArbitrationError::InvalidAllocation { .. }));
    }
}
