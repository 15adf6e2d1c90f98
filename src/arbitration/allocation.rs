//! Relative allocation of a supply over organ demands, and attribution of
//! the distributed amount back to the organs that supplied it.
//!
//! Demand is met in two passes: structural plus metabolic first, each organ
//! receiving the same fraction of its priority demand, then storage from
//! whatever remains. No organ ever receives more than it asked for.

use serde::{Deserialize, Serialize};

use crate::state::{BiomassPool, BiomassSupply};

/// Supply source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Reallocation,
    Uptake,
    Fixation,
    Retranslocation,
}

impl Source {
    /// Amount of this source in a supply record
    pub fn of(&self, supply: &BiomassSupply) -> f64 {
        match self {
            Source::Reallocation => supply.reallocation,
            Source::Uptake => supply.uptake,
            Source::Fixation => supply.fixation,
            Source::Retranslocation => supply.retranslocation,
        }
    }

    fn add_to(&self, supply: &mut BiomassSupply, amount: f64) {
        match self {
            Source::Reallocation => supply.reallocation += amount,
            Source::Uptake => supply.uptake += amount,
            Source::Fixation => supply.fixation += amount,
            Source::Retranslocation => supply.retranslocation += amount,
        }
    }
}

/// DM draw order for growth
pub const DM_SOURCE_ORDER: [Source; 3] = [Source::Reallocation, Source::Fixation, Source::Retranslocation];

/// DM draw order for fixation respiration
pub const RESPIRATION_SOURCE_ORDER: [Source; 3] =
    [Source::Fixation, Source::Retranslocation, Source::Reallocation];

/// N draw order
pub const N_SOURCE_ORDER: [Source; 4] = [
    Source::Reallocation,
    Source::Uptake,
    Source::Fixation,
    Source::Retranslocation,
];

/// Distribute `supply` over `demands`
pub fn relative_allocation(demands: &[BiomassPool], supply: f64) -> Vec<BiomassPool> {
    let mut remaining = supply.max(0.0);

    let priority_total: f64 = demands.iter().map(BiomassPool::priority).sum();
    let priority_allocated = remaining.min(priority_total);
    let priority_fraction = if priority_total > 0.0 {
        priority_allocated / priority_total
    } else {
        0.0
    };
    remaining -= priority_allocated;

    let storage_total: f64 = demands.iter().map(|d| d.non_structural).sum();
    let storage_allocated = remaining.min(storage_total);
    let storage_fraction = if storage_total > 0.0 {
        storage_allocated / storage_total
    } else {
        0.0
    };

    demands
        .iter()
        .map(|d| BiomassPool {
            structural: d.structural * priority_fraction,
            non_structural: d.non_structural * storage_fraction,
            metabolic: d.metabolic * priority_fraction,
        })
        .collect()
}

/// Draw `amount` from the organs' supplies, source by source in `order`
///
/// Within a source, each organ gives in proportion to what it offered.
/// Returns what was drawn from each organ.
pub fn draw_sources(supplies: &[BiomassSupply], amount: f64, order: &[Source]) -> Vec<BiomassSupply> {
    let mut drawn = vec![BiomassSupply::default(); supplies.len()];
    let mut remaining = amount.max(0.0);

    for source in order {
        if remaining <= 0.0 {
            break;
        }
        let available: f64 = supplies.iter().map(|s| source.of(s).max(0.0)).sum();
        if available <= 0.0 {
            continue;
        }
        let take = remaining.min(available);
        let fraction = take / available;
        for (supply, draw) in supplies.iter().zip(drawn.iter_mut()) {
            source.add_to(draw, source.of(supply).max(0.0) * fraction);
        }
        remaining -= take;
    }
    drawn
}

/// Supplies left after `drawn` has been taken
pub fn remaining_supply(supplies: &[BiomassSupply], drawn: &[BiomassSupply]) -> Vec<BiomassSupply> {
    supplies
        .iter()
        .zip(drawn)
        .map(|(s, d)| BiomassSupply {
            fixation: (s.fixation - d.fixation).max(0.0),
            reallocation: (s.reallocation - d.reallocation).max(0.0),
            uptake: (s.uptake - d.uptake).max(0.0),
            retranslocation: (s.retranslocation - d.retranslocation).max(0.0),
        })
        .collect()
}
