//! Plant Arbitrator - daily resource arbitration for a crop model
//!
//! Each simulated day, plant organs report dry matter, nitrogen and water
//! supply and demand; the arbitrator divides what is available, the root
//! commits water and mineral-N uptake to a layered soil zone, and senesced
//! tissue is returned to the soil as fresh organic matter. Every resource is
//! checked for conservation before a day is committed.

pub mod arbitration;
pub mod config;
pub mod error;
pub mod export;
pub mod functions;
pub mod organs;
pub mod schedule;
pub mod soil;
pub mod state;
pub mod uptake;

pub use arbitration::{Arbitrator, ArbitratorParameters, BalanceChecker, DayResult, Phase, ResourceSummary};
pub use config::Parameters;
pub use error::{ArbitrationError, ArbitrationResult, Resource};
pub use functions::{DailyDrivers, FunctionConfig, FunctionLinks, PlantFunction};
pub use organs::{GenericOrgan, Grain, Organ, OrganKind, Root, RootProperties, SowingParameters};
pub use schedule::{DriverSource, Ensemble, Simulation};
pub use soil::{SoilDelta, SoilLayer, SoilProfile, SoilZone};
pub use state::{Biomass, BiomassPool, BiomassSupply, FomLayer, ResidueSink};
