//! Grain: a reproductive sink with DM and N demand and no supply.

use serde::{Deserialize, Serialize};

use super::{ArbitrationContext, Organ, OrganKind, ResidueReturn, SowingParameters};
use crate::error::ArbitrationResult;
use crate::functions::{DailyDrivers, FunctionLinks, PlantFunction};
use crate::soil::SoilZone;
use crate::state::{Biomass, BiomassAllocation, BiomassPool, BiomassSupply};

/// Parameters for a grain organ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrainParameters {
    pub name: String,
    /// Linked daily functions
    ///
    /// Required: `fill_rate` (g/m²/day), `maximum_n_conc`.
    /// Optional: `filling` (> 0 while grain fills, default 1),
    /// `minimum_n_conc`, `nitrogen_demand_switch`.
    pub links: FunctionLinks,
}

impl Default for GrainParameters {
    fn default() -> Self {
        Self {
            name: "Grain".to_string(),
            links: FunctionLinks::new()
                .with_constant("fill_rate", 0.0)
                .with_constant("maximum_n_conc", 0.025),
        }
    }
}

#[derive(Debug, Clone)]
struct GrainLinks {
    fill_rate: Box<dyn PlantFunction>,
    maximum_n_conc: Box<dyn PlantFunction>,
    filling: Option<Box<dyn PlantFunction>>,
    minimum_n_conc: Option<Box<dyn PlantFunction>>,
    nitrogen_demand_switch: Option<Box<dyn PlantFunction>>,
}

/// Reproductive sink
#[derive(Debug, Clone)]
pub struct Grain {
    params: GrainParameters,
    links: GrainLinks,
    live: Biomass,
    potential: f64,
    in_ground: bool,
}

impl Grain {
    pub fn new(params: GrainParameters) -> ArbitrationResult<Self> {
        let organ = params.name.as_str();
        let links = GrainLinks {
            fill_rate: params.links.required(organ, "fill_rate")?,
            maximum_n_conc: params.links.required(organ, "maximum_n_conc")?,
            filling: params.links.optional("filling"),
            minimum_n_conc: params.links.optional("minimum_n_conc"),
            nitrogen_demand_switch: params.links.optional("nitrogen_demand_switch"),
        };
        Ok(Self {
            params,
            links,
            live: Biomass::default(),
            potential: 0.0,
            in_ground: false,
        })
    }

    /// Grain tissue
    pub fn live(&self) -> &Biomass {
        &self.live
    }

    fn is_filling(&self) -> bool {
        self.in_ground && self.links.filling.as_ref().map_or(true, |f| f.value() > 0.0)
    }
}

impl Organ for Grain {
    fn name(&self) -> &str {
        &self.params.name
    }

    fn kind(&self) -> OrganKind {
        OrganKind::Grain
    }

    fn update_functions(&mut self, drivers: &DailyDrivers) {
        self.links.fill_rate.update(drivers);
        self.links.maximum_n_conc.update(drivers);
        for f in [
            &mut self.links.filling,
            &mut self.links.minimum_n_conc,
            &mut self.links.nitrogen_demand_switch,
        ]
        .into_iter()
        .flatten()
        {
            f.update(drivers);
        }
    }

    fn dm_supply(&self) -> BiomassSupply {
        BiomassSupply::default()
    }

    fn dm_demand(&self, _ctx: &ArbitrationContext) -> BiomassPool {
        if !self.is_filling() {
            return BiomassPool::default();
        }
        BiomassPool::structural(self.links.fill_rate.value().max(0.0))
    }

    fn set_dm_potential_allocation(&mut self, allocation: &BiomassPool) -> ArbitrationResult<()> {
        self.potential = allocation.total();
        self.live.potential_dm_allocation = self.potential;
        Ok(())
    }

    fn set_dm_allocation(&mut self, allocation: &BiomassAllocation) -> ArbitrationResult<()> {
        self.live.structural_wt += allocation.received();
        self.potential = 0.0;
        self.live.potential_dm_allocation = 0.0;
        Ok(())
    }

    fn n_supply(&self, _zone: &SoilZone) -> ArbitrationResult<BiomassSupply> {
        Ok(BiomassSupply::default())
    }

    fn n_demand(&self) -> BiomassPool {
        if !self.in_ground {
            return BiomassPool::default();
        }
        let switch = self
            .links
            .nitrogen_demand_switch
            .as_ref()
            .map_or(1.0, |f| f.value())
            .max(0.0);
        let deficit = (self.max_n_conc() * (self.live.wt() + self.potential) - self.live.n()).max(0.0);
        BiomassPool::structural(deficit * switch)
    }

    fn set_n_allocation(&mut self, allocation: &BiomassAllocation, _zone: &mut SoilZone) -> ArbitrationResult<()> {
        self.live.structural_n += allocation.received();
        Ok(())
    }

    fn min_n_conc(&self) -> f64 {
        self.links.minimum_n_conc.as_ref().map_or(0.0, |f| f.value())
    }

    fn max_n_conc(&self) -> f64 {
        self.links.maximum_n_conc.value()
    }

    fn wt(&self) -> f64 {
        self.live.wt()
    }

    fn n(&self) -> f64 {
        self.live.n()
    }

    fn do_actual_growth(&mut self, _zone: &SoilZone) -> ArbitrationResult<Option<ResidueReturn>> {
        Ok(None)
    }

    fn sow(&mut self, sowing: &SowingParameters, _zone: &SoilZone) -> ArbitrationResult<()> {
        self.live.clear();
        self.potential = 0.0;
        self.in_ground = sowing.plant_in_ground;
        Ok(())
    }

    fn end_crop(&mut self) -> Option<ResidueReturn> {
        log::info!("{}: harvested {:.3} g/m2", self.params.name, self.live.wt());
        let dm = self.live.wt();
        let n = self.live.n();
        self.live.clear();
        self.potential = 0.0;
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
    use crate::functions::FunctionConfig;
    use crate::soil::{SoilLayer, SoilProfile};

    fn grain() -> Grain {
        let params = GrainParameters {
            name: "Grain".to_string(),
            links: FunctionLinks::new()
                .with_constant("fill_rate", 1.5)
                .with_constant("maximum_n_conc", 0.02)
                .with("filling", FunctionConfig::driver("filling", 0.0)),
        };
        let zone = SoilZone::new(
            "field",
            SoilProfile::new(vec![SoilLayer::new(100.0, 1.3, 0.1, 0.3, 0.4)]).unwrap(),
        );
        let mut grain = Grain::new(params).unwrap();
        grain.sow(&SowingParameters::default(), &zone).unwrap();
        grain
    }

    #[test]
    fn test_demand_only_while_filling() {
        let mut g = grain();
        g.update_functions(&DailyDrivers::new(1));
        assert_eq!(g.dm_demand(&ArbitrationContext::default()).total(), 0.0);
        g.update_functions(&DailyDrivers::new(2).with("filling", 1.0));
        assert_eq!(g.dm_demand(&ArbitrationContext::default()).structural, 1.5);
    }

    #[test]
    fn test_n_demand_includes_potential_growth() {
        let mut g = grain();
        g.update_functions(&DailyDrivers::new(1).with("filling", 1.0));
        g.set_dm_potential_allocation(&BiomassPool::structural(1.5)).unwrap();
        assert!((g.n_demand().structural - 0.03).abs() < 1e-12);
        assert_eq!(g.dm_supply().total(), 0.0);
    }
}
