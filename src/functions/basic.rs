//! Constant, driver-backed, interpolated and min/max functions.

use super::{DailyDrivers, PlantFunction};

/// Returned by `MaximumFunction` when it has no children
pub const EMPTY_MAXIMUM: f64 = -999_999_999.0;

/// Returned by `MinimumFunction` when it has no children
pub const EMPTY_MINIMUM: f64 = 999_999_999.0;

/// Fixed value
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantFunction {
    value: f64,
}

impl ConstantFunction {
    /// Function that always returns `value`
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl PlantFunction for ConstantFunction {
    fn update(&mut self, _drivers: &DailyDrivers) {}

    fn value(&self) -> f64 {
        self.value
    }

    fn box_clone(&self) -> Box<dyn PlantFunction> {
        Box::new(self.clone())
    }
}

/// Reads a named daily driver, falling back to a default when absent
#[derive(Debug, Clone, PartialEq)]
pub struct DriverFunction {
    name: String,
    default: f64,
    value: f64,
}

impl DriverFunction {
    /// Function tracking driver `name`
    pub fn new(name: &str, default: f64) -> Self {
        Self {
            name: name.to_string(),
            default,
            value: default,
        }
    }
}

impl PlantFunction for DriverFunction {
    fn update(&mut self, drivers: &DailyDrivers) {
        self.value = drivers.get(&self.name).unwrap_or(self.default);
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn box_clone(&self) -> Box<dyn PlantFunction> {
        Box::new(self.clone())
    }
}

/// Piecewise-linear response to a driver, flat beyond the end points
///
/// The stage is used as the driver when `driver` is `"stage"`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearInterpolationFunction {
    driver: String,
    x: Vec<f64>,
    y: Vec<f64>,
    value: f64,
}

impl LinearInterpolationFunction {
    /// `x` must be ascending and the same length as `y`
    pub fn new(driver: &str, x: Vec<f64>, y: Vec<f64>) -> Self {
        debug_assert_eq!(x.len(), y.len());
        let value = y.first().copied().unwrap_or(0.0);
        Self {
            driver: driver.to_string(),
            x,
            y,
            value,
        }
    }

    /// Interpolate at `at`
    pub fn interpolate(&self, at: f64) -> f64 {
        let n = self.x.len().min(self.y.len());
        if n == 0 {
            return 0.0;
        }
        if at <= self.x[0] {
            return self.y[0];
        }
        for i in 1..n {
            if at <= self.x[i] {
                let span = self.x[i] - self.x[i - 1];
                if span <= 0.0 {
                    return self.y[i];
                }
                let t = (at - self.x[i - 1]) / span;
                return self.y[i - 1] + t * (self.y[i] - self.y[i - 1]);
            }
        }
        self.y[n - 1]
    }
}

impl PlantFunction for LinearInterpolationFunction {
    fn update(&mut self, drivers: &DailyDrivers) {
        let at = if self.driver == "stage" {
            Some(drivers.stage)
        } else {
            drivers.get(&self.driver)
        };
        if let Some(at) = at {
            self.value = self.interpolate(at);
        }
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn box_clone(&self) -> Box<dyn PlantFunction> {
        Box::new(self.clone())
    }
}

/// Largest value of its children
#[derive(Debug, Clone)]
pub struct MaximumFunction {
    children: Vec<Box<dyn PlantFunction>>,
}

impl MaximumFunction {
    pub fn new(children: Vec<Box<dyn PlantFunction>>) -> Self {
        Self { children }
    }
}

impl PlantFunction for MaximumFunction {
    fn update(&mut self, drivers: &DailyDrivers) {
        for child in &mut self.children {
            child.update(drivers);
        }
    }

    fn value(&self) -> f64 {
        self.children
            .iter()
            .map(|c| c.value())
            .fold(EMPTY_MAXIMUM, f64::max)
    }

    fn box_clone(&self) -> Box<dyn PlantFunction> {
        Box::new(self.clone())
    }
}

/// Smallest value of its children
#[derive(Debug, Clone)]
pub struct MinimumFunction {
    children: Vec<Box<dyn PlantFunction>>,
}

impl MinimumFunction {
    pub fn new(children: Vec<Box<dyn PlantFunction>>) -> Self {
        Self { children }
    }
}

impl PlantFunction for MinimumFunction {
    fn update(&mut self, drivers: &DailyDrivers) {
        for child in &mut self.children {
            child.update(drivers);
        }
    }

    fn value(&self) -> f64 {
        self.children
            .iter()
            .map(|c| c.value())
            .fold(EMPTY_MINIMUM, f64::min)
    }

    fn box_clone(&self) -> Box<dyn PlantFunction> {
        Box::new(self.clone())
    }
}
