//! JSON state export for simulation snapshots.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::arbitration::DayResult;
use crate::organs::{OrganReport, RootProperties};
use crate::schedule::Simulation;

/// Soil zone pools at export time
#[derive(Debug, Clone, Serialize)]
pub struct SoilSnapshot {
    pub zone: String,
    /// Water per layer (mm)
    pub water_mm: Vec<f64>,
    /// Nitrate per layer (kg/ha)
    pub no3_kg_per_ha: Vec<f64>,
    /// Ammonium per layer (kg/ha)
    pub nh4_kg_per_ha: Vec<f64>,
}

/// Full state export structure
#[derive(Debug, Clone, Serialize)]
pub struct StateExport {
    /// Export timestamp
    pub exported_at: String,
    /// Export version for compatibility
    pub version: &'static str,
    /// Last committed day
    pub day: u32,
    pub terminated: bool,
    pub organs: Vec<OrganReport>,
    pub root: Option<RootProperties>,
    pub soil: SoilSnapshot,
    /// Last committed day's result
    pub last_day: Option<DayResult>,
}

impl StateExport {
    /// Snapshot a simulation
    pub fn from_simulation(sim: &Simulation) -> Self {
        let zone = sim.zone();
        let organs = sim
            .organs()
            .iter()
            .map(|o| OrganReport {
                name: o.name().to_string(),
                kind: Some(o.kind()),
                wt: o.wt(),
                n: o.n(),
                dead_wt: o.dead_wt(),
                ..Default::default()
            })
            .collect();
        Self {
            exported_at: Local::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION"),
            day: sim.day(),
            terminated: sim.is_terminated(),
            organs,
            root: sim.organs().iter().find_map(|o| o.root_properties()),
            soil: SoilSnapshot {
                zone: zone.name.clone(),
                water_mm: zone.water_mm().to_vec(),
                no3_kg_per_ha: zone.no3_kg_per_ha().to_vec(),
                nh4_kg_per_ha: zone.nh4_kg_per_ha().to_vec(),
            },
            last_day: sim.last_result().cloned(),
        }
    }
}

/// Export current simulation state to JSON
///
/// Creates the exports directory if it doesn't exist.
/// Filename is auto-generated with timestamp: `state_YYYYMMDD_HHMMSS.json`
///
/// Returns the path to the saved JSON file.
pub fn export_state_json(sim: &Simulation) -> Result<PathBuf> {
    let dir = PathBuf::from("exports");
    std::fs::create_dir_all(&dir)?;

    let filename = format!("state_{}.json", Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(filename);
    export_state_json_to(sim, &path)?;
    Ok(path)
}

/// Export state to a specific file
pub fn export_state_json_to(sim: &Simulation, path: &Path) -> Result<()> {
    let export = StateExport::from_simulation(sim);

    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &export)?;

    log::info!("JSON state exported: {}", path.display());
    Ok(())
}
