//! Independent simulations run in parallel.

use rayon::prelude::*;

use super::{DriverSource, Simulation};
use crate::error::ArbitrationResult;

/// Set of simulations sharing nothing but the day count
#[derive(Debug, Default)]
pub struct Ensemble {
    members: Vec<Simulation>,
}

impl Ensemble {
    pub fn new(members: Vec<Simulation>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[Simulation] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Run every member for `days`, each with its own driver source
    ///
    /// `make_source` is called once per member index. Results are returned
    /// in member order; a failed member does not stop the others.
    pub fn run<S, F>(&mut self, days: u32, make_source: F) -> Vec<ArbitrationResult<()>>
    where
        S: DriverSource,
        F: Fn(usize) -> S + Sync,
    {
        let results: Vec<_> = self
            .members
            .par_iter_mut()
            .enumerate()
            .map(|(i, sim)| {
                let mut source = make_source(i);
                sim.run(days, &mut source)
            })
            .collect();
        let failed = results.iter().filter(|r| r.is_err()).count();
        log::info!(
            "Ensemble of {} ran {} days, {} failed",
            self.members.len(),
            days,
            failed
        );
        results
    }

    pub fn into_members(self) -> Vec<Simulation> {
        self.members
    }
}
