//! Value that follows its child until a phenological stage, then holds.

use super::{DailyDrivers, PlantFunction};

/// Updates daily from `inner` until the crop is beyond `hold_stage`
#[derive(Debug, Clone)]
pub struct HoldFunction {
    hold_stage: f64,
    inner: Box<dyn PlantFunction>,
    value: f64,
    initialised: bool,
}

impl HoldFunction {
    pub fn new(hold_stage: f64, inner: Box<dyn PlantFunction>) -> Self {
        Self {
            hold_stage,
            inner,
            value: 0.0,
            initialised: false,
        }
    }

    /// True once the held value no longer changes
    pub fn is_holding(&self, stage: f64) -> bool {
        stage > self.hold_stage
    }
}

impl PlantFunction for HoldFunction {
    fn update(&mut self, drivers: &DailyDrivers) {
        if self.initialised && self.is_holding(drivers.stage) {
            return;
        }
        self.inner.update(drivers);
        self.value = self.inner.value();
        self.initialised = true;
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn box_clone(&self) -> Box<dyn PlantFunction> {
        Box::new(self.clone())
    }
}
