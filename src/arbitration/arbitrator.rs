//! Daily arbitration protocol.
//!
//! ## Phases
//!
//! | # | Phase        | Work                                                        |
//! |---|--------------|-------------------------------------------------------------|
//! | 0 | Commencing   | organs update their daily functions                         |
//! | 1 | PotentialDm  | DM supply vs demand, potential allocation                   |
//! | 2 | ActualDm     | fixation respiration deducted, growth committed             |
//! | 3 | Nitrogen     | N supply vs demand, allocation, root commits soil N uptake  |
//! | 4 | Water        | water supply vs demand, roots extract soil water            |
//! | 5 | EndOfDay     | actual growth, senescence, residues                         |
//!
//! Every resource is checked by the [`BalanceChecker`] inside its phase; the
//! first failure aborts the day.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::allocation::{
    draw_sources, relative_allocation, remaining_supply, DM_SOURCE_ORDER, N_SOURCE_ORDER,
    RESPIRATION_SOURCE_ORDER,
};
use super::balance::{BalanceChecker, RELATIVE_TOLERANCE};
use super::{DayResult, ResourceSummary};
use crate::error::{ArbitrationResult, Resource};
use crate::functions::DailyDrivers;
use crate::organs::{ArbitrationContext, Organ, OrganReport, ResidueReturn};
use crate::soil::{SoilDelta, SoilZone};
use crate::state::{BiomassAllocation, BiomassPool, BiomassSupply};

/// Arbitration phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Commencing,
    PotentialDm,
    ActualDm,
    Nitrogen,
    Water,
    EndOfDay,
}

impl Phase {
    /// Fixed order in which phases run every day
    pub const ORDER: [Phase; 6] = [
        Phase::Commencing,
        Phase::PotentialDm,
        Phase::ActualDm,
        Phase::Nitrogen,
        Phase::Water,
        Phase::EndOfDay,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Commencing => "commencing",
            Phase::PotentialDm => "potential DM",
            Phase::ActualDm => "actual DM",
            Phase::Nitrogen => "nitrogen",
            Phase::Water => "water",
            Phase::EndOfDay => "end of day",
        };
        f.write_str(name)
    }
}

/// Arbitrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitratorParameters {
    /// Relative tolerance for balance checks
    pub relative_tolerance: f64,
}

impl Default for ArbitratorParameters {
    fn default() -> Self {
        Self {
            relative_tolerance: RELATIVE_TOLERANCE,
        }
    }
}

/// Working values carried between the phases of one day
#[derive(Debug, Default)]
struct DayState {
    dm_supplies: Vec<BiomassSupply>,
    dm_demands: Vec<BiomassPool>,
    total_dm_supply: f64,
    dm_allocated: Vec<f64>,
    fixation_respiration: f64,
    paid_fixation: Vec<f64>,
    n_demands: Vec<f64>,
    n_allocated: Vec<f64>,
    water_demands: Vec<f64>,
    water_allocated: Vec<f64>,
    dm: ResourceSummary,
    n: ResourceSummary,
    water: ResourceSummary,
    residues: Vec<ResidueReturn>,
}

impl DayState {
    fn new(n_organs: usize) -> Self {
        Self {
            dm_allocated: vec![0.0; n_organs],
            paid_fixation: vec![0.0; n_organs],
            n_demands: vec![0.0; n_organs],
            n_allocated: vec![0.0; n_organs],
            water_demands: vec![0.0; n_organs],
            water_allocated: vec![0.0; n_organs],
            ..Default::default()
        }
    }
}

/// Runs the daily phase protocol over a set of organs and one soil zone
#[derive(Debug, Clone, Default)]
pub struct Arbitrator {
    checker: BalanceChecker,
}

impl Arbitrator {
    pub fn new(params: &ArbitratorParameters) -> Self {
        Self {
            checker: BalanceChecker::new(params.relative_tolerance),
        }
    }

    /// Balance checker used for every phase
    pub fn checker(&self) -> &BalanceChecker {
        &self.checker
    }

    /// Run one day over `organs` and `zone`, mutating both
    ///
    /// Callers that need all-or-nothing days run this on copies and keep the
    /// copies only on success.
    pub fn run_day(
        &self,
        organs: &mut [Box<dyn Organ>],
        zone: &mut SoilZone,
        drivers: &DailyDrivers,
    ) -> ArbitrationResult<DayResult> {
        let day = drivers.day;
        let water_before = zone.water_mm().to_vec();
        let no3_before = zone.no3_kg_per_ha().to_vec();
        let nh4_before = zone.nh4_kg_per_ha().to_vec();

        let mut state = DayState::new(organs.len());
        for phase in Phase::ORDER {
            match phase {
                Phase::Commencing => self.commence(organs, drivers),
                Phase::PotentialDm => self.potential_dm(organs, day, &mut state)?,
                Phase::ActualDm => self.actual_dm(organs, zone, day, &mut state)?,
                Phase::Nitrogen => self.nitrogen(organs, zone, day, &mut state)?,
                Phase::Water => self.water(organs, zone, day, &mut state)?,
                Phase::EndOfDay => self.end_of_day(organs, zone, day, &mut state)?,
            }
            log::trace!("day {}: {} phase complete", day, phase);
        }

        let soil_delta = SoilDelta {
            water_mm: difference(zone.water_mm(), &water_before),
            no3_kg_per_ha: difference(zone.no3_kg_per_ha(), &no3_before),
            nh4_kg_per_ha: difference(zone.nh4_kg_per_ha(), &nh4_before),
        };

        let reports = organs
            .iter()
            .enumerate()
            .map(|(i, organ)| OrganReport {
                name: organ.name().to_string(),
                kind: Some(organ.kind()),
                wt: organ.wt(),
                n: organ.n(),
                dead_wt: organ.dead_wt(),
                dm_demand: state.dm_demands.get(i).map_or(0.0, BiomassPool::total),
                dm_allocated: state.dm_allocated[i],
                n_demand: state.n_demands[i],
                n_allocated: state.n_allocated[i],
                water_demand: state.water_demands[i],
                water_allocated: state.water_allocated[i],
            })
            .collect();

        Ok(DayResult {
            day,
            dm: state.dm,
            n: state.n,
            water: state.water,
            fixation_respiration: state.fixation_respiration,
            organs: reports,
            root: organs.iter().find_map(|o| o.root_properties()),
            soil_delta,
            residues: state.residues.into_iter().map(|r| r.fom).collect(),
        })
    }

    fn commence(&self, organs: &mut [Box<dyn Organ>], drivers: &DailyDrivers) {
        for organ in organs.iter_mut() {
            organ.update_functions(drivers);
        }
    }

    fn potential_dm(&self, organs: &mut [Box<dyn Organ>], day: u32, state: &mut DayState) -> ArbitrationResult<()> {
        state.dm_supplies = organs.iter().map(|o| o.dm_supply()).collect();
        state.total_dm_supply = state.dm_supplies.iter().map(BiomassSupply::total).sum();

        let ctx = ArbitrationContext {
            day,
            total_dm_supply: state.total_dm_supply,
        };
        state.dm_demands = organs.iter().map(|o| o.dm_demand(&ctx)).collect();
        let total_demand: f64 = state.dm_demands.iter().map(BiomassPool::total).sum();

        let potential = relative_allocation(&state.dm_demands, state.total_dm_supply);
        for (organ, allocation) in organs.iter_mut().zip(&potential) {
            organ.set_dm_potential_allocation(allocation)?;
        }

        let allocations = named(organs, potential.iter().map(BiomassPool::total));
        self.checker.check(
            Resource::DryMatter,
            day,
            state.total_dm_supply.min(total_demand),
            &allocations,
        )?;
        log::debug!(
            "day {}: DM supply {:.6}, demand {:.6}",
            day,
            state.total_dm_supply,
            total_demand
        );
        Ok(())
    }

    fn actual_dm(
        &self,
        organs: &mut [Box<dyn Organ>],
        zone: &SoilZone,
        day: u32,
        state: &mut DayState,
    ) -> ArbitrationResult<()> {
        // Fixation the crop expects to need, from demand still to be met
        // after reallocation and uptake
        let n_demand: f64 = organs.iter().map(|o| o.n_demand().total()).sum();
        let n_supplies = organs
            .iter()
            .map(|o| o.n_supply(zone))
            .collect::<ArbitrationResult<Vec<_>>>()?;
        let reallocation: f64 = n_supplies.iter().map(|s| s.reallocation).sum();
        let uptake: f64 = n_supplies.iter().map(|s| s.uptake).sum();
        let fixation_supply: f64 = n_supplies.iter().map(|s| s.fixation).sum();
        let expected_fixation = fixation_supply.min((n_demand - reallocation - uptake).max(0.0));

        let mut expected: Vec<f64> = n_supplies
            .iter()
            .map(|s| {
                if fixation_supply > 0.0 {
                    s.fixation * expected_fixation / fixation_supply
                } else {
                    0.0
                }
            })
            .collect();
        let mut respired: Vec<f64> = organs
            .iter()
            .zip(&expected)
            .map(|(o, fixed)| fixed * o.n_fixation_cost())
            .collect();
        let mut total_respired: f64 = respired.iter().sum();
        if total_respired > state.total_dm_supply && total_respired > 0.0 {
            let scale = state.total_dm_supply / total_respired;
            expected.iter_mut().for_each(|e| *e *= scale);
            respired.iter_mut().for_each(|r| *r *= scale);
            total_respired = respired.iter().sum();
        }
        state.paid_fixation = expected;
        state.fixation_respiration = total_respired;

        let final_supply = (state.total_dm_supply - total_respired).max(0.0);
        let total_demand: f64 = state.dm_demands.iter().map(BiomassPool::total).sum();
        let growth = relative_allocation(&state.dm_demands, final_supply);
        let total_growth: f64 = growth.iter().map(BiomassPool::total).sum();

        let respiration_draws = draw_sources(&state.dm_supplies, total_respired, &RESPIRATION_SOURCE_ORDER);
        let left = remaining_supply(&state.dm_supplies, &respiration_draws);
        let growth_draws = draw_sources(&left, total_growth, &DM_SOURCE_ORDER);

        let mut drawn = Vec::with_capacity(organs.len());
        for (i, organ) in organs.iter_mut().enumerate() {
            let allocation = BiomassAllocation {
                structural: growth[i].structural,
                non_structural: growth[i].non_structural,
                metabolic: growth[i].metabolic,
                retranslocation: respiration_draws[i].retranslocation + growth_draws[i].retranslocation,
                reallocation: respiration_draws[i].reallocation + growth_draws[i].reallocation,
                respired: respired[i],
                uptake: 0.0,
                fixation: respiration_draws[i].fixation + growth_draws[i].fixation,
            };
            organ.set_dm_allocation(&allocation)?;
            state.dm_allocated[i] = allocation.received();
            drawn.push(allocation.drawn());
        }

        let received = named(organs, growth.iter().map(BiomassPool::total));
        self.checker
            .check(Resource::DryMatter, day, final_supply.min(total_demand), &received)?;
        self.checker.check_sources(
            Resource::DryMatter,
            day,
            total_growth + total_respired,
            &named(organs, drawn.into_iter()),
        )?;

        state.dm = ResourceSummary {
            supply: state.total_dm_supply,
            demand: total_demand,
            allocated: total_growth,
        };
        if total_respired > 0.0 {
            log::debug!("day {}: {:.6} g/m2 DM respired for N fixation", day, total_respired);
        }
        Ok(())
    }

    fn nitrogen(
        &self,
        organs: &mut [Box<dyn Organ>],
        zone: &mut SoilZone,
        day: u32,
        state: &mut DayState,
    ) -> ArbitrationResult<()> {
        let demands: Vec<BiomassPool> = organs.iter().map(|o| o.n_demand()).collect();
        let mut supplies = Vec::with_capacity(organs.len());
        for (organ, paid) in organs.iter().zip(&state.paid_fixation) {
            let mut supply = organ.n_supply(zone)?;
            supply.fixation = supply.fixation.min(*paid);
            supplies.push(supply);
        }
        let total_supply: f64 = supplies.iter().map(BiomassSupply::total).sum();
        let total_demand: f64 = demands.iter().map(BiomassPool::total).sum();

        let allocation = relative_allocation(&demands, total_supply);
        let total_allocated: f64 = allocation.iter().map(BiomassPool::total).sum();
        let draws = draw_sources(&supplies, total_allocated, &N_SOURCE_ORDER);

        let mut drawn = Vec::with_capacity(organs.len());
        for (i, organ) in organs.iter_mut().enumerate() {
            let a = BiomassAllocation {
                structural: allocation[i].structural,
                non_structural: allocation[i].non_structural,
                metabolic: allocation[i].metabolic,
                retranslocation: draws[i].retranslocation,
                reallocation: draws[i].reallocation,
                respired: 0.0,
                uptake: draws[i].uptake,
                fixation: draws[i].fixation,
            };
            organ.set_n_allocation(&a, zone)?;
            state.n_demands[i] = demands[i].total();
            state.n_allocated[i] = a.received();
            drawn.push(a.drawn());
        }

        let received = named(organs, allocation.iter().map(BiomassPool::total));
        self.checker
            .check(Resource::Nitrogen, day, total_supply.min(total_demand), &received)?;
        self.checker
            .check_sources(Resource::Nitrogen, day, total_allocated, &named(organs, drawn.into_iter()))?;

        state.n = ResourceSummary {
            supply: total_supply,
            demand: total_demand,
            allocated: total_allocated,
        };
        log::debug!(
            "day {}: N supply {:.6}, demand {:.6}, allocated {:.6}",
            day,
            total_supply,
            total_demand,
            total_allocated
        );
        Ok(())
    }

    fn water(
        &self,
        organs: &mut [Box<dyn Organ>],
        zone: &mut SoilZone,
        day: u32,
        state: &mut DayState,
    ) -> ArbitrationResult<()> {
        let demands: Vec<f64> = organs.iter().map(|o| o.water_demand()).collect();
        let layer_supplies = organs
            .iter()
            .map(|o| o.water_supply(zone))
            .collect::<ArbitrationResult<Vec<_>>>()?;
        let supplies: Vec<f64> = layer_supplies.iter().map(|s| s.iter().sum()).collect();

        let total_demand: f64 = demands.iter().sum();
        let total_supply: f64 = supplies.iter().sum();
        let uptake = total_demand.min(total_supply);

        let mut extracted = vec![0.0; organs.len()];
        for (i, organ) in organs.iter_mut().enumerate() {
            if layer_supplies[i].is_empty() {
                continue;
            }
            let share = if total_supply > 0.0 {
                uptake * supplies[i] / total_supply
            } else {
                0.0
            };
            extracted[i] = organ.take_water(share, zone)?.iter().sum();
        }

        for (i, organ) in organs.iter_mut().enumerate() {
            let amount = if total_demand > 0.0 {
                uptake * demands[i] / total_demand
            } else {
                0.0
            };
            organ.set_water_allocation(amount)?;
            state.water_demands[i] = demands[i];
            state.water_allocated[i] = amount;
        }

        self.checker
            .check(Resource::Water, day, uptake, &named(organs, extracted.into_iter()))?;
        self.checker.check(
            Resource::Water,
            day,
            uptake,
            &named(organs, state.water_allocated.iter().copied()),
        )?;

        state.water = ResourceSummary {
            supply: total_supply,
            demand: total_demand,
            allocated: uptake,
        };
        Ok(())
    }

    fn end_of_day(
        &self,
        organs: &mut [Box<dyn Organ>],
        zone: &SoilZone,
        day: u32,
        state: &mut DayState,
    ) -> ArbitrationResult<()> {
        for organ in organs.iter_mut() {
            if let Some(residue) = organ.do_actual_growth(zone)? {
                state.residues.push(residue);
            }
        }
        self.checker.check_residue(day, &state.residues)
    }
}

fn named<'a>(organs: &'a [Box<dyn Organ>], amounts: impl Iterator<Item = f64>) -> Vec<(&'a str, f64)> {
    organs.iter().map(|o| o.name()).zip(amounts).collect()
}

fn difference(after: &[f64], before: &[f64]) -> Vec<f64> {
    after.iter().zip(before).map(|(a, b)| a - b).collect()
}
