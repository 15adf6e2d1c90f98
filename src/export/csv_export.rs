//! CSV time-series export, one row per committed day.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::arbitration::DayResult;

/// Record for CSV time-series export
#[derive(Debug, Clone, Serialize)]
pub struct DailyRecord {
    pub day: u32,
    /// DM supply (g/m²)
    pub dm_supply: f64,
    /// DM demand (g/m²)
    pub dm_demand: f64,
    /// DM allocated (g/m²)
    pub dm_allocated: f64,
    /// DM respired for N fixation (g/m²)
    pub fixation_respiration: f64,
    /// N supply (g/m²)
    pub n_supply: f64,
    /// N demand (g/m²)
    pub n_demand: f64,
    /// N allocated (g/m²)
    pub n_allocated: f64,
    /// Water supply (mm)
    pub water_supply: f64,
    /// Water demand (mm)
    pub water_demand: f64,
    /// Water taken up (mm)
    pub water_uptake: f64,
    /// Root depth (mm)
    pub root_depth_mm: f64,
    /// Live crop DM (g/m²)
    pub total_wt: f64,
    /// Live crop N (g/m²)
    pub total_n: f64,
    /// Net soil mineral N change (kg/ha)
    pub soil_n_change_kg_per_ha: f64,
    /// Residue DM returned (kg/ha)
    pub residue_kg_per_ha: f64,
}

impl From<&DayResult> for DailyRecord {
    fn from(r: &DayResult) -> Self {
        Self {
            day: r.day,
            dm_supply: r.dm.supply,
            dm_demand: r.dm.demand,
            dm_allocated: r.dm.allocated,
            fixation_respiration: r.fixation_respiration,
            n_supply: r.n.supply,
            n_demand: r.n.demand,
            n_allocated: r.n.allocated,
            water_supply: r.water.supply,
            water_demand: r.water.demand,
            water_uptake: r.water.allocated,
            root_depth_mm: r.root.as_ref().map_or(0.0, |p| p.depth_mm),
            total_wt: r.organs.iter().map(|o| o.wt).sum(),
            total_n: r.organs.iter().map(|o| o.n).sum(),
            soil_n_change_kg_per_ha: r.soil_delta.total_nitrogen_kg_per_ha(),
            residue_kg_per_ha: r.residues.iter().map(|f| f.total_amount()).sum(),
        }
    }
}

/// CSV exporter for daily results
pub struct CsvExporter {
    writer: csv::Writer<File>,
    /// Rows written so far
    rows: usize,
    /// Path to output file
    path: PathBuf,
}

impl CsvExporter {
    /// Create a new CSV exporter in `exports/`
    ///
    /// Filename is auto-generated with timestamp.
    pub fn new() -> Result<Self> {
        let dir = PathBuf::from("exports");
        std::fs::create_dir_all(&dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Self::create(dir.join(format!("daily_{}.csv", timestamp)))
    }

    /// Create a CSV exporter writing to `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let writer = csv::Writer::from_writer(file);

        log::info!("CSV export started: {}", path.display());

        Ok(Self {
            writer,
            rows: 0,
            path,
        })
    }

    /// Write one day
    pub fn record(&mut self, result: &DayResult) -> Result<()> {
        self.writer.serialize(DailyRecord::from(result))?;
        self.rows += 1;
        Ok(())
    }

    /// Write every day of a history
    pub fn record_all(&mut self, history: &[DayResult]) -> Result<()> {
        for result in history {
            self.record(result)?;
        }
        Ok(())
    }

    /// Finish writing and return the output path
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        log::info!("CSV export completed: {} ({} days)", self.path.display(), self.rows);
        Ok(self.path)
    }

    /// Get the output path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
