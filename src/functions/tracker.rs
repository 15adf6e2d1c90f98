//! Tracks a variable between two stages and reports a lagged value.
//!
//! The "value back X" statistic walks back through the tracked days summing
//! a reference variable (e.g. thermal time) and returns the tracked variable
//! on the day the running sum first reaches X.

use super::{DailyDrivers, PlantFunction};

/// Daily tracker with a "value back" statistic
#[derive(Debug, Clone)]
pub struct TrackerFunction {
    variable: Box<dyn PlantFunction>,
    reference: Box<dyn PlantFunction>,
    value_back: f64,
    start_stage: f64,
    end_stage: f64,
    variable_values: Vec<f64>,
    reference_values: Vec<f64>,
    in_window: bool,
}

impl TrackerFunction {
    pub fn new(
        variable: Box<dyn PlantFunction>,
        reference: Box<dyn PlantFunction>,
        value_back: f64,
        start_stage: f64,
        end_stage: f64,
    ) -> Self {
        Self {
            variable,
            reference,
            value_back,
            start_stage,
            end_stage,
            variable_values: Vec::new(),
            reference_values: Vec::new(),
            in_window: false,
        }
    }

    /// Number of tracked days
    pub fn len(&self) -> usize {
        self.variable_values.len()
    }

    /// True before anything has been tracked
    pub fn is_empty(&self) -> bool {
        self.variable_values.is_empty()
    }
}

impl PlantFunction for TrackerFunction {
    fn update(&mut self, drivers: &DailyDrivers) {
        self.variable.update(drivers);
        self.reference.update(drivers);

        let stage = drivers.stage;
        if !self.in_window && stage >= self.start_stage && stage < self.end_stage {
            self.variable_values.clear();
            self.reference_values.clear();
            self.in_window = true;
        } else if self.in_window && stage >= self.end_stage {
            self.in_window = false;
        }

        if self.in_window {
            self.variable_values.push(self.variable.value());
            self.reference_values.push(self.reference.value());
        }
    }

    fn value(&self) -> f64 {
        let mut accumulated = 0.0;
        for (i, reference) in self.reference_values.iter().enumerate().rev() {
            accumulated += reference;
            if accumulated >= self.value_back {
                return self.variable_values[i];
            }
        }
        0.0
    }

    fn box_clone(&self) -> Box<dyn PlantFunction> {
        Box::new(self.clone())
    }
}
