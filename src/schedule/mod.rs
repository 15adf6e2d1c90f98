//! Day-by-day simulation driving the arbitrator.
//!
//! A [`Simulation`] owns its organs, soil zone, arbitrator and residue sink.
//! Each [`Simulation::step`] stages the day on copies of the organs and the
//! zone; the copies replace the committed state only when every phase and
//! balance check has passed. A failed day terminates the run.

mod ensemble;

pub use ensemble::Ensemble;

use crate::arbitration::{Arbitrator, DayResult};
use crate::error::{ArbitrationError, ArbitrationResult};
use crate::functions::DailyDrivers;
use crate::organs::{Organ, ResidueReturn, SowingParameters};
use crate::soil::SoilZone;
use crate::state::ResidueSink;

/// Supplies the drivers for each simulated day
pub trait DriverSource {
    fn drivers(&mut self, day: u32) -> DailyDrivers;
}

impl<F> DriverSource for F
where
    F: FnMut(u32) -> DailyDrivers,
{
    fn drivers(&mut self, day: u32) -> DailyDrivers {
        self(day)
    }
}

/// One crop in one soil zone
pub struct Simulation {
    organs: Vec<Box<dyn Organ>>,
    zone: SoilZone,
    arbitrator: Arbitrator,
    sink: Box<dyn ResidueSink>,
    /// Last committed day
    day: u32,
    /// Day on which the run failed
    terminated: Option<u32>,
    history: Vec<DayResult>,
}

impl Simulation {
    pub fn new(
        organs: Vec<Box<dyn Organ>>,
        zone: SoilZone,
        arbitrator: Arbitrator,
        sink: Box<dyn ResidueSink>,
    ) -> Self {
        Self {
            organs,
            zone,
            arbitrator,
            sink,
            day: 0,
            terminated: None,
            history: Vec::new(),
        }
    }

    /// Sow every organ into the zone
    pub fn sow(&mut self, sowing: &SowingParameters) -> ArbitrationResult<()> {
        for organ in self.organs.iter_mut() {
            organ.sow(sowing, &self.zone)?;
        }
        log::info!(
            "Sown at {:.0} mm, {} plants/m2, {} organs",
            sowing.depth_mm,
            sowing.population,
            self.organs.len()
        );
        Ok(())
    }

    /// Arbitrate one day and commit it if it balances
    pub fn step(&mut self, drivers: &DailyDrivers) -> ArbitrationResult<&DayResult> {
        if let Some(day) = self.terminated {
            return Err(ArbitrationError::RunTerminated { day });
        }

        let mut organs = self.organs.clone();
        let mut zone = self.zone.clone();
        match self.arbitrator.run_day(&mut organs, &mut zone, drivers) {
            Ok(result) => {
                self.organs = organs;
                self.zone = zone;
                self.day = drivers.day;
                for fom in result.residues.iter().cloned() {
                    self.sink.incorporate(fom);
                }
                self.history.push(result);
                Ok(&self.history[self.history.len() - 1])
            }
            Err(e) => {
                log::error!("Day {} failed, run terminated: {}", drivers.day, e);
                self.terminated = Some(drivers.day);
                Err(e)
            }
        }
    }

    /// Run `days` consecutive days after the last committed one
    pub fn run<S: DriverSource + ?Sized>(&mut self, days: u32, source: &mut S) -> ArbitrationResult<()> {
        let first = self.day + 1;
        for day in first..first + days {
            let drivers = source.drivers(day);
            self.step(&drivers)?;
        }
        Ok(())
    }

    /// Step while `keep_going` accepts the last committed result
    ///
    /// Stops after `max_days` at most. Returns the number of days run.
    pub fn run_while<S, P>(&mut self, max_days: u32, source: &mut S, mut keep_going: P) -> ArbitrationResult<u32>
    where
        S: DriverSource + ?Sized,
        P: FnMut(&DayResult) -> bool,
    {
        let mut run = 0;
        while run < max_days {
            let drivers = source.drivers(self.day + 1);
            let result = self.step(&drivers)?;
            run += 1;
            if !keep_going(result) {
                break;
            }
        }
        Ok(run)
    }

    /// End the crop, handing all remaining live and dead tissue to the residue sink
    ///
    /// Residues are checked against the removed tissue before delivery.
    pub fn end_crop(&mut self) -> ArbitrationResult<()> {
        let residues: Vec<ResidueReturn> = self.organs.iter_mut().filter_map(|o| o.end_crop()).collect();
        self.arbitrator.checker().check_residue(self.day, &residues)?;

        let returned: f64 = residues.iter().map(|r| r.senesced_dm).sum();
        for residue in residues {
            self.sink.incorporate(residue.fom);
        }
        log::info!("Crop ended on day {}, {:.4} g/m2 returned to soil", self.day, returned);
        Ok(())
    }

    pub fn organs(&self) -> &[Box<dyn Organ>] {
        &self.organs
    }

    pub fn organ(&self, name: &str) -> Option<&dyn Organ> {
        self.organs.iter().find(|o| o.name() == name).map(|o| o.as_ref())
    }

    pub fn zone(&self) -> &SoilZone {
        &self.zone
    }

    /// Mutable zone, for the soil collaborator between days
    pub fn zone_mut(&mut self) -> &mut SoilZone {
        &mut self.zone
    }

    /// Last committed day (0 before the first step)
    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.is_some()
    }

    pub fn history(&self) -> &[DayResult] {
        &self.history
    }

    pub fn last_result(&self) -> Option<&DayResult> {
        self.history.last()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("organs", &self.organs)
            .field("zone", &self.zone.name)
            .field("day", &self.day)
            .field("terminated", &self.terminated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::ArbitratorParameters;
    use crate::soil::{SoilLayer, SoilProfile};
    use crate::state::CollectingSink;

    fn empty_simulation() -> Simulation {
        let profile = SoilProfile::new(vec![SoilLayer::new(100.0, 1.3, 0.1, 0.3, 0.4)]).unwrap();
        Simulation::new(
            Vec::new(),
            SoilZone::new("field", profile),
            Arbitrator::new(&ArbitratorParameters::default()),
            Box::new(CollectingSink::default()),
        )
    }

    #[test]
    fn test_days_advance() {
        let mut sim = empty_simulation();
        sim.run(3, &mut |day: u32| DailyDrivers::new(day)).unwrap();
        assert_eq!(sim.day(), 3);
        assert_eq!(sim.history().len(), 3);
    }

    #[test]
    fn test_run_while_stops_on_predicate() {
        let mut sim = empty_simulation();
        let run = sim
            .run_while(10, &mut |day: u32| DailyDrivers::new(day), |r| r.day < 4)
            .unwrap();
        assert_eq!(run, 4);
        assert_eq!(sim.day(), 4);
    }
}
