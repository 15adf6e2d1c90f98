//! Conservation-of-mass checks run before a day is committed.

use crate::error::{ArbitrationError, ArbitrationResult, Resource};
use crate::organs::ResidueReturn;
use crate::state::G_PER_M2_TO_KG_PER_HA;

/// Default relative tolerance
pub const RELATIVE_TOLERANCE: f64 = 1e-9;

/// Verifies that allocated, drawn and returned amounts add up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceChecker {
    relative_tolerance: f64,
}

impl Default for BalanceChecker {
    fn default() -> Self {
        Self::new(RELATIVE_TOLERANCE)
    }
}

impl BalanceChecker {
    pub fn new(relative_tolerance: f64) -> Self {
        Self { relative_tolerance }
    }

    /// Absolute tolerance for an amount of this size
    pub fn tolerance(&self, available: f64) -> f64 {
        self.relative_tolerance * available.abs().max(1.0)
    }

    /// Allocations must be non-negative and sum to `available`
    pub fn check(
        &self,
        resource: Resource,
        day: u32,
        available: f64,
        allocations: &[(&str, f64)],
    ) -> ArbitrationResult<()> {
        let tol = self.tolerance(available);
        if let Some((organ, amount)) = allocations.iter().find(|(_, amount)| *amount < -tol) {
            return Err(ArbitrationError::BalanceViolation {
                resource,
                day,
                organs: vec![organ.to_string()],
                expected: 0.0,
                actual: *amount,
            });
        }
        let actual: f64 = allocations.iter().map(|(_, amount)| amount).sum();
        if (actual - available).abs() > tol {
            return Err(ArbitrationError::BalanceViolation {
                resource,
                day,
                organs: allocations.iter().map(|(organ, _)| organ.to_string()).collect(),
                expected: available,
                actual,
            });
        }
        Ok(())
    }

    /// What was drawn from supplying organs must equal what was distributed
    pub fn check_sources(
        &self,
        resource: Resource,
        day: u32,
        distributed: f64,
        drawn: &[(&str, f64)],
    ) -> ArbitrationResult<()> {
        self.check(resource, day, distributed, drawn)
    }

    /// Residue DM and N (kg/ha) must equal senesced tissue (g/m²) × 10
    pub fn check_residue(&self, day: u32, residues: &[ResidueReturn]) -> ArbitrationResult<()> {
        for residue in residues {
            let pairs = [
                (residue.senesced_dm, residue.fom.total_amount()),
                (residue.senesced_n, residue.fom.total_n()),
            ];
            for (senesced, returned) in pairs {
                let expected = senesced * G_PER_M2_TO_KG_PER_HA;
                if (returned - expected).abs() > self.tolerance(expected) {
                    return Err(ArbitrationError::BalanceViolation {
                        resource: Resource::Residue,
                        day,
                        organs: vec![residue.organ.clone()],
                        expected,
                        actual: returned,
                    });
                }
            }
        }
        Ok(())
    }
}
