//! Storage (non-structural) N demand.
//!
//! Storage N tries to bring the organ's N content up to its maximum
//! concentration once structural and metabolic demand are met:
//!
//! demand = max(0, switch × max(0, maxNConc × (Live.Wt + potential) − Live.N)
//!              − structural N demand − metabolic N demand)
//!
//! where `potential` is today's structural plus metabolic potential DM
//! allocation.

use crate::state::{Biomass, BiomassPool};

/// Storage N demand (g/m²)
pub fn storage_n_demand(
    max_n_conc: f64,
    nitrogen_demand_switch: f64,
    live: &Biomass,
    potential_dm_allocation: &BiomassPool,
    n_demand: &BiomassPool,
) -> f64 {
    let potential = potential_dm_allocation.structural + potential_dm_allocation.metabolic;
    let deficit = (max_n_conc * (live.wt() + potential) - live.n()).max(0.0) * nitrogen_demand_switch;
    (deficit - n_demand.structural - n_demand.metabolic).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_demand_after_structural() {
        let live = Biomass {
            structural_wt: 10.0,
            structural_n: 0.2,
            ..Default::default()
        };
        let potential = BiomassPool::structural(2.0);
        let demand = BiomassPool::structural(0.1);
        // 0.04 × 12 − 0.2 = 0.28, less 0.1 structural
        let storage = storage_n_demand(0.04, 1.0, &live, &potential, &demand);
        assert!((storage - 0.18).abs() < 1e-12);
    }

    #[test]
    fn test_switch_off_removes_demand() {
        let live = Biomass {
            structural_wt: 10.0,
            ..Default::default()
        };
        let storage = storage_n_demand(0.04, 0.0, &live, &BiomassPool::default(), &BiomassPool::default());
        assert_eq!(storage, 0.0);
    }
}
