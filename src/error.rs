//! Error types for the arbitration engine.
//!
//! Every failure is fatal for the simulated day that raised it. Arbitration is
//! deterministic, so a day that failed once fails again with the same inputs;
//! the schedule therefore terminates the run instead of retrying.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used throughout the library
pub type ArbitrationResult<T> = Result<T, ArbitrationError>;

/// Resource being arbitrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// Dry matter (g/m²)
    DryMatter,
    /// Nitrogen (g/m²)
    Nitrogen,
    /// Soil water (mm)
    Water,
    /// Fresh organic matter returned to the soil (kg/ha)
    Residue,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::DryMatter => "dry matter",
            Resource::Nitrogen => "nitrogen",
            Resource::Water => "water",
            Resource::Residue => "residue",
        };
        f.write_str(name)
    }
}

/// Arbitration failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArbitrationError {
    /// A depth query went below the bottom of the soil profile
    #[error("depth {depth_mm:.3} mm is deeper than the soil profile ({profile_depth_mm:.3} mm)")]
    DepthOutOfRange {
        /// Requested depth (mm)
        depth_mm: f64,
        /// Total profile depth (mm)
        profile_depth_mm: f64,
    },

    /// Requested soil uptake is larger than what the organ can supply
    #[error("{organ}: requested {resource} uptake {requested:.6} exceeds supply {supply:.6}")]
    UptakeExceedsSupply {
        /// Organ name
        organ: String,
        /// Resource taken up
        resource: Resource,
        /// Requested amount
        requested: f64,
        /// Available (capped) supply
        supply: f64,
    },

    /// A positive amount had no weight basis to be partitioned on
    #[error("{organ}: cannot partition {amount:.6} of {resource}, weight sum is zero")]
    Partitioning {
        /// Organ name
        organ: String,
        /// Resource being partitioned
        resource: Resource,
        /// Amount that could not be placed
        amount: f64,
    },

    /// Allocated total does not match the amount made available
    #[error(
        "day {day}: {resource} balance violated, expected {expected:.12} but allocated {actual:.12} (organs: {})",
        .organs.join(", ")
    )]
    BalanceViolation {
        /// Resource checked
        resource: Resource,
        /// Simulated day
        day: u32,
        /// Organs taking part in the allocation
        organs: Vec<String>,
        /// Amount made available
        expected: f64,
        /// Sum of allocations
        actual: f64,
    },

    /// A required helper function or organ reference was not configured
    #[error("{organ}: required link '{link}' was not resolved")]
    MissingLink {
        /// Organ (or component) owning the link
        organ: String,
        /// Link name
        link: String,
    },

    /// An organ was handed an allocation it did not ask for
    #[error("{organ}: invalid {resource} allocation {amount:.6} with zero demand")]
    InvalidAllocation {
        /// Organ name
        organ: String,
        /// Resource allocated
        resource: Resource,
        /// Offered amount
        amount: f64,
    },

    /// Soil layer data breaks a physical invariant
    #[error("soil layer {layer}: {message}")]
    InvalidSoil {
        /// Layer index (0 = surface)
        layer: usize,
        /// Description of the broken invariant
        message: String,
    },

    /// A layered array does not match the soil profile
    #[error("{context}: expected {expected} layers, got {actual}")]
    LayerMismatch {
        /// Where the mismatch was found
        context: String,
        /// Number of soil layers
        expected: usize,
        /// Length supplied
        actual: usize,
    },

    /// The run already failed on an earlier day
    #[error("simulation terminated after a failure on day {day}")]
    RunTerminated {
        /// Day that failed
        day: u32,
    },
}

impl ArbitrationError {
    /// Convenience constructor for missing links
    pub fn missing_link(organ: &str, link: &str) -> Self {
        Self::MissingLink {
            organ: organ.to_string(),
            link: link.to_string(),
        }
    }

    /// Convenience constructor for partitioning failures
    pub fn partitioning(organ: &str, resource: Resource, amount: f64) -> Self {
        Self::Partitioning {
            organ: organ.to_string(),
            resource,
            amount,
        }
    }

    /// Resource involved in the failure, where there is one
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Self::UptakeExceedsSupply { resource, .. }
            | Self::Partitioning { resource, .. }
            | Self::BalanceViolation { resource, .. }
            | Self::InvalidAllocation { resource, .. } => Some(*resource),
            _ => None,
        }
    }
}
