//! Serialisable function descriptions and named link resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    ConstantFunction, DriverFunction, HoldFunction, LinearInterpolationFunction, MaximumFunction,
    MinimumFunction, PlantFunction, TrackerFunction,
};
use crate::error::{ArbitrationError, ArbitrationResult};

/// Description of a daily function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FunctionConfig {
    Constant {
        value: f64,
    },
    Driver {
        name: String,
        #[serde(default)]
        default: f64,
    },
    Linear {
        driver: String,
        x: Vec<f64>,
        y: Vec<f64>,
    },
    Maximum {
        children: Vec<FunctionConfig>,
    },
    Minimum {
        children: Vec<FunctionConfig>,
    },
    Hold {
        hold_stage: f64,
        value: Box<FunctionConfig>,
    },
    Tracker {
        variable: Box<FunctionConfig>,
        reference: Box<FunctionConfig>,
        value_back: f64,
        start_stage: f64,
        end_stage: f64,
    },
}

impl FunctionConfig {
    /// Shorthand for a constant
    pub fn constant(value: f64) -> Self {
        Self::Constant { value }
    }

    /// Shorthand for a driver lookup with a default
    pub fn driver(name: &str, default: f64) -> Self {
        Self::Driver {
            name: name.to_string(),
            default,
        }
    }

    /// Instantiate the described function
    pub fn build(&self) -> Box<dyn PlantFunction> {
        match self {
            Self::Constant { value } => Box::new(ConstantFunction::new(*value)),
            Self::Driver { name, default } => Box::new(DriverFunction::new(name, *default)),
            Self::Linear { driver, x, y } => {
                Box::new(LinearInterpolationFunction::new(driver, x.clone(), y.clone()))
            }
            Self::Maximum { children } => {
                Box::new(MaximumFunction::new(children.iter().map(|c| c.build()).collect()))
            }
            Self::Minimum { children } => {
                Box::new(MinimumFunction::new(children.iter().map(|c| c.build()).collect()))
            }
            Self::Hold { hold_stage, value } => Box::new(HoldFunction::new(*hold_stage, value.build())),
            Self::Tracker {
                variable,
                reference,
                value_back,
                start_stage,
                end_stage,
            } => Box::new(TrackerFunction::new(
                variable.build(),
                reference.build(),
                *value_back,
                *start_stage,
                *end_stage,
            )),
        }
    }
}

/// Named function links configured for one organ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionLinks(pub BTreeMap<String, FunctionConfig>);

impl FunctionLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a link
    pub fn with(mut self, name: &str, config: FunctionConfig) -> Self {
        self.0.insert(name.to_string(), config);
        self
    }

    /// Shorthand for a constant link
    pub fn with_constant(self, name: &str, value: f64) -> Self {
        self.with(name, FunctionConfig::constant(value))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Build a required link, failing with `MissingLink` if it is not configured
    pub fn required(&self, organ: &str, name: &str) -> ArbitrationResult<Box<dyn PlantFunction>> {
        self.0
            .get(name)
            .map(FunctionConfig::build)
            .ok_or_else(|| ArbitrationError::missing_link(organ, name))
    }

    /// Build an optional link
    pub fn optional(&self, name: &str) -> Option<Box<dyn PlantFunction>> {
        self.0.get(name).map(FunctionConfig::build)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::DailyDrivers;

    #[test]
    fn test_required_link_missing() {
        let links = FunctionLinks::new().with_constant("MaxNconc", 0.01);
        let err = links.required("Root", "PartitionFraction").unwrap_err();
        assert_eq!(
            err,
            ArbitrationError::MissingLink {
                organ: "Root".to_string(),
                link: "PartitionFraction".to_string(),
            }
        );
        assert!(links.required("Root", "MaxNconc").is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "type": "maximum",
            "children": [
                { "type": "constant", "value": 0.1 },
                { "type": "driver", "name": "x" }
            ]
        }"#;
        let config: FunctionConfig = serde_json::from_str(json).unwrap();
        let mut f = config.build();
        f.update(&DailyDrivers::new(1).with("x", 0.4));
        assert_eq!(f.value(), 0.4);
    }
}
