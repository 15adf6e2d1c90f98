//! Biomass records exchanged between organs and the arbitrator.
//!
//! Supply is split by source (fixation, reallocation, uptake,
//! retranslocation); demand and allocation are split by pool (structural,
//! non-structural storage, metabolic). All amounts are g/m².

use serde::{Deserialize, Serialize};

/// Demand or pool amounts split by tissue component
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BiomassPool {
    /// Structural (g/m²)
    pub structural: f64,
    /// Non-structural storage (g/m²)
    pub non_structural: f64,
    /// Metabolic (g/m²)
    pub metabolic: f64,
}

impl BiomassPool {
    /// Pool with only a structural component
    pub fn structural(amount: f64) -> Self {
        Self {
            structural: amount,
            ..Default::default()
        }
    }

    /// Sum of all components
    pub fn total(&self) -> f64 {
        self.structural + self.non_structural + self.metabolic
    }

    /// Structural plus metabolic, the first-priority pools
    pub fn priority(&self) -> f64 {
        self.structural + self.metabolic
    }

    /// True when every component is non-negative
    pub fn is_non_negative(&self) -> bool {
        self.structural >= 0.0 && self.non_structural >= 0.0 && self.metabolic >= 0.0
    }
}

/// Amounts an organ can offer on the current day, split by source
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BiomassSupply {
    /// New assimilate or fixed N (g/m²)
    pub fixation: f64,
    /// Released from senescing tissue (g/m²)
    pub reallocation: f64,
    /// Taken up from the soil (g/m²)
    pub uptake: f64,
    /// Mobilised from storage (g/m²)
    pub retranslocation: f64,
}

impl BiomassSupply {
    /// Sum of all sources
    pub fn total(&self) -> f64 {
        self.fixation + self.reallocation + self.uptake + self.retranslocation
    }

    /// True when every source is non-negative
    pub fn is_non_negative(&self) -> bool {
        self.fixation >= 0.0
            && self.reallocation >= 0.0
            && self.uptake >= 0.0
            && self.retranslocation >= 0.0
    }
}

/// Resolved distribution an organ receives, and what was drawn from it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BiomassAllocation {
    /// Received into structural tissue (g/m²)
    pub structural: f64,
    /// Received into storage (g/m²)
    pub non_structural: f64,
    /// Received into metabolic tissue (g/m²)
    pub metabolic: f64,
    /// Drawn from this organ's storage (g/m²)
    pub retranslocation: f64,
    /// Drawn from this organ's senescing tissue (g/m²)
    pub reallocation: f64,
    /// DM respired by this organ, e.g. to pay for N fixation (g/m²)
    pub respired: f64,
    /// Drawn from this organ's soil uptake supply (g/m²)
    pub uptake: f64,
    /// Drawn from this organ's fixation supply (g/m²)
    pub fixation: f64,
}

impl BiomassAllocation {
    /// Total received into tissue pools
    pub fn received(&self) -> f64 {
        self.structural + self.non_structural + self.metabolic
    }

    /// Total drawn from this organ's supplies
    pub fn drawn(&self) -> f64 {
        self.retranslocation + self.reallocation + self.uptake + self.fixation
    }
}

/// Live or dead tissue: DM and N in three components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Biomass {
    /// Structural DM (g/m²)
    pub structural_wt: f64,
    /// Non-structural DM (g/m²)
    pub non_structural_wt: f64,
    /// Metabolic DM (g/m²)
    pub metabolic_wt: f64,
    /// Structural N (g/m²)
    pub structural_n: f64,
    /// Non-structural N (g/m²)
    pub non_structural_n: f64,
    /// Metabolic N (g/m²)
    pub metabolic_n: f64,
    /// Pending potential DM allocation for the current day (g/m²)
    pub potential_dm_allocation: f64,
}

impl Biomass {
    /// Total DM (g/m²)
    pub fn wt(&self) -> f64 {
        self.structural_wt + self.non_structural_wt + self.metabolic_wt
    }

    /// Total N (g/m²)
    pub fn n(&self) -> f64 {
        self.structural_n + self.non_structural_n + self.metabolic_n
    }

    /// N concentration (g/g), zero without DM
    pub fn n_conc(&self) -> f64 {
        let wt = self.wt();
        if wt > 0.0 {
            self.n() / wt
        } else {
            0.0
        }
    }

    /// Reset every component to zero
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Remove `fraction` of every component, returning the removed tissue
    pub fn take_fraction(&mut self, fraction: f64) -> Biomass {
        let f = fraction.clamp(0.0, 1.0);
        let removed = Biomass {
            structural_wt: self.structural_wt * f,
            non_structural_wt: self.non_structural_wt * f,
            metabolic_wt: self.metabolic_wt * f,
            structural_n: self.structural_n * f,
            non_structural_n: self.non_structural_n * f,
            metabolic_n: self.metabolic_n * f,
            potential_dm_allocation: 0.0,
        };
        self.structural_wt -= removed.structural_wt;
        self.non_structural_wt -= removed.non_structural_wt;
        self.metabolic_wt -= removed.metabolic_wt;
        self.structural_n -= removed.structural_n;
        self.non_structural_n -= removed.non_structural_n;
        self.metabolic_n -= removed.metabolic_n;
        removed
    }

    /// Add another tissue record into this one
    pub fn add(&mut self, other: &Biomass) {
        self.structural_wt += other.structural_wt;
        self.non_structural_wt += other.non_structural_wt;
        self.metabolic_wt += other.metabolic_wt;
        self.structural_n += other.structural_n;
        self.non_structural_n += other.non_structural_n;
        self.metabolic_n += other.metabolic_n;
    }
}
