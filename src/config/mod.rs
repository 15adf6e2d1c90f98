//! Configuration module for loading simulation parameters.
//!
//! Every section deserialises from JSON and falls back to documented
//! defaults when its file is absent.

mod parameters;

pub use parameters::{
    CropParameters, DriverParameters, OrganConfig, Parameters, RunParameters, SoilParameters,
};
