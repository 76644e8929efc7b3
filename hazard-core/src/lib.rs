//! Core library for the `hazard` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Weather and air-quality provider clients
//! - The derived-metric calculator (dew point, drought, fire risk, AQI, ...)
//! - Per-disaster prediction forms and the prediction service client
//!
//! It is used by `hazard-cli`, but can also be reused by other binaries or services.

pub mod assessment;
pub mod config;
pub mod forms;
pub mod metrics;
pub mod model;
pub mod prediction;
pub mod provider;

pub use assessment::{Assessor, Conditions};
pub use config::Config;
pub use forms::{FieldValue, PredictionForm};
pub use model::{
    DerivedMetrics, DisasterKind, DroughtClass, Location, Particulates, ResolvedLocation,
    WeatherObservation,
};
pub use prediction::{Prediction, PredictionClient, PredictionError};
pub use provider::{AirQualityProvider, WeatherProvider};
