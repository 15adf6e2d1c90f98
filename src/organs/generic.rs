//! Single-valued above-ground organ (leaf, stem, reserve).
//!
//! Supply:
//! - DM fixation from the `photosynthesis` function (leaves)
//! - DM reallocation = senescing storage × reallocation factor
//! - DM retranslocation = remaining storage × retranslocation factor
//! - N sources analogously from the N pools, plus optional N fixation
//!
//! Demand is either a direct `dm_demand` function or a `partition_fraction`
//! of the crop's DM supply, split structural / storage by
//! `structural_fraction`. Structural N demand follows the minimum N
//! concentration; storage N fills up to the maximum.

use serde::{Deserialize, Serialize};

use super::{unit_fraction, ArbitrationContext, Organ, OrganKind, ResidueReturn, SowingParameters};
use crate::error::ArbitrationResult;
use crate::functions::{
    storage_n_demand, DailyDrivers, FunctionConfig, FunctionLinks, PlantFunction, PHOTOSYNTHESIS,
    WATER_DEMAND,
};
use crate::soil::SoilZone;
use crate::state::{Biomass, BiomassAllocation, BiomassPool, BiomassSupply};

/// Parameters for a generic organ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericOrganParameters {
    /// Organ name
    pub name: String,
    /// Leaf, stem or reserve
    pub kind: OrganKind,
    /// Structural DM per plant at sowing (g)
    pub initial_wt_g_per_plant: f64,
    /// Linked daily functions; only `maximum_n_conc` is required
    pub links: FunctionLinks,
}

impl Default for GenericOrganParameters {
    fn default() -> Self {
        Self {
            name: "Leaf".to_string(),
            kind: OrganKind::Leaf,
            initial_wt_g_per_plant: 0.0,
            links: FunctionLinks::new()
                .with_constant("maximum_n_conc", 0.05)
                .with_constant("minimum_n_conc", 0.01)
                .with_constant("partition_fraction", 0.5)
                .with_constant("structural_fraction", 0.8)
                .with_constant("dm_retranslocation_factor", 0.1)
                .with_constant("senescence_rate", 0.01)
                .with("photosynthesis", FunctionConfig::driver(PHOTOSYNTHESIS, 0.0))
                .with("water_demand", FunctionConfig::driver(WATER_DEMAND, 0.0)),
        }
    }
}

#[derive(Debug, Clone)]
struct GenericLinks {
    maximum_n_conc: Box<dyn PlantFunction>,
    minimum_n_conc: Option<Box<dyn PlantFunction>>,
    nitrogen_demand_switch: Option<Box<dyn PlantFunction>>,
    dm_demand: Option<Box<dyn PlantFunction>>,
    partition_fraction: Option<Box<dyn PlantFunction>>,
    structural_fraction: Option<Box<dyn PlantFunction>>,
    photosynthesis: Option<Box<dyn PlantFunction>>,
    dm_retranslocation_factor: Option<Box<dyn PlantFunction>>,
    dm_reallocation_factor: Option<Box<dyn PlantFunction>>,
    n_retranslocation_factor: Option<Box<dyn PlantFunction>>,
    n_reallocation_factor: Option<Box<dyn PlantFunction>>,
    senescence_rate: Option<Box<dyn PlantFunction>>,
    n_fixation: Option<Box<dyn PlantFunction>>,
    n_fixation_cost: Option<Box<dyn PlantFunction>>,
    water_demand: Option<Box<dyn PlantFunction>>,
}

impl GenericLinks {
    fn resolve(organ: &str, links: &FunctionLinks) -> ArbitrationResult<Self> {
        Ok(Self {
            maximum_n_conc: links.required(organ, "maximum_n_conc")?,
            minimum_n_conc: links.optional("minimum_n_conc"),
            nitrogen_demand_switch: links.optional("nitrogen_demand_switch"),
            dm_demand: links.optional("dm_demand"),
            partition_fraction: links.optional("partition_fraction"),
            structural_fraction: links.optional("structural_fraction"),
            photosynthesis: links.optional("photosynthesis"),
            dm_retranslocation_factor: links.optional("dm_retranslocation_factor"),
            dm_reallocation_factor: links.optional("dm_reallocation_factor"),
            n_retranslocation_factor: links.optional("n_retranslocation_factor"),
            n_reallocation_factor: links.optional("n_reallocation_factor"),
            senescence_rate: links.optional("senescence_rate"),
            n_fixation: links.optional("n_fixation"),
            n_fixation_cost: links.optional("n_fixation_cost"),
            water_demand: links.optional("water_demand"),
        })
    }

    fn update(&mut self, drivers: &DailyDrivers) {
        self.maximum_n_conc.update(drivers);
        for f in [
            &mut self.minimum_n_conc,
            &mut self.nitrogen_demand_switch,
            &mut self.dm_demand,
            &mut self.partition_fraction,
            &mut self.structural_fraction,
            &mut self.photosynthesis,
            &mut self.dm_retranslocation_factor,
            &mut self.dm_reallocation_factor,
            &mut self.n_retranslocation_factor,
            &mut self.n_reallocation_factor,
            &mut self.senescence_rate,
            &mut self.n_fixation,
            &mut self.n_fixation_cost,
            &mut self.water_demand,
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

/// Leaf, stem or reserve organ
#[derive(Debug, Clone)]
pub struct GenericOrgan {
    params: GenericOrganParameters,
    links: GenericLinks,
    live: Biomass,
    dead: Biomass,
    potential: BiomassPool,
    /// DM committed today, the structural N basis once potential is cleared
    growth: BiomassPool,
    in_ground: bool,
    senescence_rate: f64,
    water_allocated_mm: f64,
}

impl GenericOrgan {
    pub fn new(params: GenericOrganParameters) -> ArbitrationResult<Self> {
        let links = GenericLinks::resolve(&params.name, &params.links)?;
        Ok(Self {
            params,
            links,
            live: Biomass::default(),
            dead: Biomass::default(),
            potential: BiomassPool::default(),
            growth: BiomassPool::default(),
            in_ground: false,
            senescence_rate: 0.0,
            water_allocated_mm: 0.0,
        })
    }

    /// Live tissue
    pub fn live(&self) -> &Biomass {
        &self.live
    }

    /// Dead tissue
    pub fn dead(&self) -> &Biomass {
        &self.dead
    }

    /// Water received today (mm)
    pub fn water_allocated_mm(&self) -> f64 {
        self.water_allocated_mm
    }

    fn n_switch(&self) -> f64 {
        value_or(&self.links.nitrogen_demand_switch, 1.0).max(0.0)
    }

    /// Share of storage DM lost to senescence and reallocated
    fn dm_reallocation_fraction(&self) -> f64 {
        self.senescence_rate * unit_fraction(value_or(&self.links.dm_reallocation_factor, 0.0))
    }

    /// Share of every N component lost to senescence and reallocated
    fn n_reallocation_fraction(&self) -> f64 {
        self.senescence_rate * unit_fraction(value_or(&self.links.n_reallocation_factor, 0.0))
    }
}

impl Organ for GenericOrgan {
    fn name(&self) -> &str {
        &self.params.name
    }

    fn kind(&self) -> OrganKind {
        self.params.kind
    }

    fn update_functions(&mut self, drivers: &DailyDrivers) {
        self.links.update(drivers);
        self.senescence_rate = unit_fraction(value_or(&self.links.senescence_rate, 0.0));
        self.water_allocated_mm = 0.0;
        self.growth = BiomassPool::default();
    }

    fn dm_supply(&self) -> BiomassSupply {
        if !self.in_ground {
            return BiomassSupply::default();
        }
        let storage = self.live.non_structural_wt.max(0.0);
        let reallocation = storage * self.dm_reallocation_fraction();
        let retranslocation =
            (storage - reallocation) * unit_fraction(value_or(&self.links.dm_retranslocation_factor, 0.0));
        BiomassSupply {
            fixation: value_or(&self.links.photosynthesis, 0.0).max(0.0),
            reallocation,
            uptake: 0.0,
            retranslocation,
        }
    }

    fn dm_demand(&self, ctx: &ArbitrationContext) -> BiomassPool {
        if !self.in_ground {
            return BiomassPool::default();
        }
        let total = match (&self.links.dm_demand, &self.links.partition_fraction) {
            (Some(demand), _) => demand.value(),
            (None, Some(fraction)) => ctx.total_dm_supply * fraction.value(),
            (None, None) => 0.0,
        }
        .max(0.0);
        let structural_fraction = unit_fraction(value_or(&self.links.structural_fraction, 1.0));
        BiomassPool {
            structural: total * structural_fraction,
            non_structural: total * (1.0 - structural_fraction),
            metabolic: 0.0,
        }
    }

    fn set_dm_potential_allocation(&mut self, allocation: &BiomassPool) -> ArbitrationResult<()> {
        self.potential = *allocation;
        self.live.potential_dm_allocation = allocation.total();
        Ok(())
    }

    fn set_dm_allocation(&mut self, allocation: &BiomassAllocation) -> ArbitrationResult<()> {
        self.live.structural_wt += allocation.structural;
        self.live.metabolic_wt += allocation.metabolic;
        self.live.non_structural_wt += allocation.non_structural - allocation.retranslocation - allocation.reallocation;
        debug_assert!(self.live.non_structural_wt > -1e-9);
        self.growth = BiomassPool {
            structural: allocation.structural,
            non_structural: allocation.non_structural,
            metabolic: allocation.metabolic,
        };
        self.potential = BiomassPool::default();
        self.live.potential_dm_allocation = 0.0;
        Ok(())
    }

    fn n_supply(&self, _zone: &SoilZone) -> ArbitrationResult<BiomassSupply> {
        if !self.in_ground {
            return Ok(BiomassSupply::default());
        }
        let realloc_fraction = self.n_reallocation_fraction();
        let storage_left = self.live.non_structural_n.max(0.0) * (1.0 - realloc_fraction);
        Ok(BiomassSupply {
            fixation: value_or(&self.links.n_fixation, 0.0).max(0.0),
            reallocation: self.live.n().max(0.0) * realloc_fraction,
            uptake: 0.0,
            retranslocation: storage_left * unit_fraction(value_or(&self.links.n_retranslocation_factor, 0.0)),
        })
    }

    fn n_demand(&self) -> BiomassPool {
        if !self.in_ground {
            return BiomassPool::default();
        }
        let switch = self.n_switch();
        // Before growth is committed the pending potential counts on top of
        // live weight; afterwards live weight already holds today's growth
        let (structural_dm, pending) = if self.potential.total() > 0.0 {
            (self.potential.structural, self.potential)
        } else {
            (self.growth.structural, BiomassPool::default())
        };
        let structural = (self.min_n_conc() * structural_dm * switch).max(0.0);
        let priority = BiomassPool::structural(structural);
        let storage = storage_n_demand(self.max_n_conc(), switch, &self.live, &pending, &priority);
        BiomassPool {
            structural,
            non_structural: storage,
            metabolic: 0.0,
        }
    }

    fn set_n_allocation(&mut self, allocation: &BiomassAllocation, _zone: &mut SoilZone) -> ArbitrationResult<()> {
        let total_n = self.live.n();
        if allocation.reallocation > 0.0 && total_n > 0.0 {
            let f = (allocation.reallocation / total_n).min(1.0);
            self.live.structural_n -= self.live.structural_n * f;
            self.live.non_structural_n -= self.live.non_structural_n * f;
            self.live.metabolic_n -= self.live.metabolic_n * f;
        }
        self.live.non_structural_n -= allocation.retranslocation;
        debug_assert!(self.live.non_structural_n > -1e-9);

        self.live.structural_n += allocation.structural;
        self.live.non_structural_n += allocation.non_structural;
        self.live.metabolic_n += allocation.metabolic;
        Ok(())
    }

    fn water_demand(&self) -> f64 {
        if !self.in_ground {
            return 0.0;
        }
        value_or(&self.links.water_demand, 0.0).max(0.0)
    }

    fn set_water_allocation(&mut self, amount_mm: f64) -> ArbitrationResult<()> {
        self.water_allocated_mm = amount_mm;
        Ok(())
    }

    fn min_n_conc(&self) -> f64 {
        value_or(&self.links.minimum_n_conc, 0.0)
    }

    fn max_n_conc(&self) -> f64 {
        self.links.maximum_n_conc.value()
    }

    fn n_fixation_cost(&self) -> f64 {
        value_or(&self.links.n_fixation_cost, 0.0).max(0.0)
    }

    fn wt(&self) -> f64 {
        self.live.wt()
    }

    fn n(&self) -> f64 {
        self.live.n()
    }

    fn dead_wt(&self) -> f64 {
        self.dead.wt()
    }

    fn dead_n(&self) -> f64 {
        self.dead.n()
    }

    fn do_actual_growth(&mut self, _zone: &SoilZone) -> ArbitrationResult<Option<ResidueReturn>> {
        if self.in_ground && self.senescence_rate > 0.0 {
            let senesced = self.live.take_fraction(self.senescence_rate);
            self.dead.add(&senesced);
        }
        Ok(None)
    }

    fn sow(&mut self, sowing: &SowingParameters, _zone: &SoilZone) -> ArbitrationResult<()> {
        self.live.clear();
        self.dead.clear();
        self.potential = BiomassPool::default();
        self.growth = BiomassPool::default();
        self.in_ground = sowing.plant_in_ground;
        self.live.structural_wt = self.params.initial_wt_g_per_plant * sowing.population;
        self.live.structural_n = self.live.structural_wt * self.max_n_conc();
        Ok(())
    }

    fn end_crop(&mut self) -> Option<ResidueReturn> {
        log::info!(
            "{}: crop ended with {:.3} g/m2 live and {:.3} g/m2 dead",
            self.params.name,
            self.live.wt(),
            self.dead.wt()
        );
        let dm = self.live.wt() + self.dead.wt();
        let n = self.live.n() + self.dead.n();
        self.live.clear();
        self.dead.clear();
        self.potential = BiomassPool::default();
        self.growth = BiomassPool::default();
        self.in_ground = false;
        (dm > 0.0 || n > 0.0).then(|| ResidueReturn::surface(&self.params.name, dm, n))
    }

    fn box_clone(&self) -> Box<dyn Organ> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soil::{SoilLayer, SoilProfile};

    fn zone() -> SoilZone {
        let profile = SoilProfile::new(vec![SoilLayer::new(100.0, 1.3, 0.1, 0.3, 0.4)]).unwrap();
        SoilZone::new("field", profile)
    }

    fn stem() -> GenericOrgan {
        let params = GenericOrganParameters {
            name: "Stem".to_string(),
            kind: OrganKind::Stem,
            initial_wt_g_per_plant: 0.0,
            links: FunctionLinks::new()
                .with_constant("maximum_n_conc", 0.02)
                .with_constant("minimum_n_conc", 0.01)
                .with_constant("dm_demand", 2.0)
                .with_constant("structural_fraction", 0.5)
                .with_constant("dm_retranslocation_factor", 0.5)
                .with_constant("senescence_rate", 0.1)
                .with_constant("dm_reallocation_factor", 0.5),
        };
        let mut organ = GenericOrgan::new(params).unwrap();
        organ.sow(&SowingParameters::default(), &zone()).unwrap();
        organ.update_functions(&DailyDrivers::new(1));
        organ
    }

    #[test]
    fn test_demand_split_by_structural_fraction() {
        let demand = stem().dm_demand(&ArbitrationContext::default());
        assert_eq!(demand.structural, 1.0);
        assert_eq!(demand.non_structural, 1.0);
    }

    #[test]
    fn test_storage_supplies_never_exceed_pool() {
        let mut organ = stem();
        organ.live.non_structural_wt = 4.0;
        let supply = organ.dm_supply();
        // 4 × 0.1 × 0.5 reallocated, then half of what is left
        assert!((supply.reallocation - 0.2).abs() < 1e-12);
        assert!((supply.retranslocation - 1.9).abs() < 1e-12);
        assert!(supply.reallocation + supply.retranslocation <= 4.0);
    }

    #[test]
    fn test_dm_allocation_draws_storage() {
        let mut organ = stem();
        organ.live.non_structural_wt = 4.0;
        organ
            .set_dm_allocation(&BiomassAllocation {
                structural: 1.0,
                retranslocation: 1.9,
                reallocation: 0.2,
                ..Default::default()
            })
            .unwrap();
        assert!((organ.live().non_structural_wt - 1.9).abs() < 1e-12);
        assert_eq!(organ.live().structural_wt, 1.0);
    }

    #[test]
    fn test_structural_n_demand_survives_growth() {
        let mut organ = stem();
        organ.set_dm_potential_allocation(&BiomassPool::structural(1.0)).unwrap();
        let before = organ.n_demand();
        organ
            .set_dm_allocation(&BiomassAllocation {
                structural: 1.0,
                ..Default::default()
            })
            .unwrap();
        let after = organ.n_demand();
        assert!((before.structural - 0.01).abs() < 1e-12);
        assert!((after.structural - before.structural).abs() < 1e-12);
        assert!((after.total() - before.total()).abs() < 1e-12);
    }

    #[test]
    fn test_senescence_moves_live_to_dead() {
        let mut organ = stem();
        organ.live.structural_wt = 10.0;
        organ.do_actual_growth(&zone()).unwrap();
        assert!((organ.live().wt() - 9.0).abs() < 1e-12);
        assert!((organ.dead().wt() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_end_crop_returns_live_and_dead_tissue() {
        let mut organ = stem();
        organ.live.structural_wt = 10.0;
        organ.live.structural_n = 0.2;
        organ.do_actual_growth(&zone()).unwrap();

        let residue = organ.end_crop().unwrap();
        assert!((residue.senesced_dm - 10.0).abs() < 1e-12);
        assert!((residue.senesced_n - 0.2).abs() < 1e-12);
        assert_eq!(residue.fom.layers.len(), 1);
        assert!((residue.fom.total_amount() - 100.0).abs() < 1e-9);
        assert_eq!(organ.wt() + organ.dead_wt(), 0.0);
        assert!(organ.end_crop().is_none(), "Nothing left to return");
    }

    #[test]
    fn test_not_sown_has_no_demand() {
        let organ = GenericOrgan::new(GenericOrganParameters::default()).unwrap();
        let ctx = ArbitrationContext {
            day: 1,
            total_dm_supply: 5.0,
        };
        assert_eq!(organ.dm_demand(&ctx).total(), 0.0);
        assert_eq!(organ.dm_supply().total(), 0.0);
    }
}
