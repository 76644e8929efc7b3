//! Prediction-request forms for each disaster kind.
//!
//! A form is a flat map of named fields. [`PredictionForm::prefill`] seeds it
//! from an observation and its derived metrics; the user may then override any
//! field with [`PredictionForm::set`] before it is submitted.

use std::{collections::BTreeMap, fmt};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::model::{DerivedMetrics, DisasterKind, WeatherObservation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numbers when the text parses as one, text otherwise.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => FieldValue::Number(n),
            _ => FieldValue::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", round2(*n)),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Fields the backend needs for each kind before a request is worth sending.
pub fn required_fields(kind: DisasterKind) -> &'static [&'static str] {
    match kind {
        DisasterKind::Flood => &["rainfall", "humidity", "soil_moisture", "temperature"],
        DisasterKind::Fire => &["temperature", "humidity", "wind_speed", "fire_risk_index"],
        DisasterKind::Earthquake => &["magnitude", "depth", "latitude", "longitude"],
        DisasterKind::Cyclone => &["pressure", "wind_speed", "humidity", "sea_surface_temperature"],
        DisasterKind::Heatwave => &["temperature", "humidity", "dew_point", "uv_index"],
        DisasterKind::Thunderstorm => {
            &["temperature", "humidity", "pressure", "cape", "lifted_index", "wind_shear"]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionForm {
    #[serde(skip)]
    pub kind: DisasterKind,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl PredictionForm {
    pub fn new(kind: DisasterKind) -> Self {
        Self { kind, fields: BTreeMap::new() }
    }

    /// Seeds the form for `kind` from weather data.
    ///
    /// Earthquake forms only get coordinates; their seismic fields are
    /// user-supplied. Cyclone forms leave sea surface temperature to the user.
    pub fn prefill(
        kind: DisasterKind,
        lat: f64,
        lon: f64,
        obs: &WeatherObservation,
        derived: &DerivedMetrics,
    ) -> Self {
        let mut form = Self::new(kind);
        form.insert("latitude", lat);
        form.insert("longitude", lon);
        form.insert("location", obs.location_name.as_str());

        match kind {
            DisasterKind::Flood => {
                form.insert("rainfall", obs.precip_mm);
                form.insert("humidity", obs.humidity_pct);
                form.insert("temperature", obs.temperature_c);
                form.insert("soil_moisture", derived.soil_moisture_pct);
                form.insert("drought_index", derived.drought.label());
                form.insert("cloud_cover", obs.cloud_pct);
            }
            DisasterKind::Fire => {
                form.insert("temperature", obs.temperature_c);
                form.insert("humidity", obs.humidity_pct);
                form.insert("wind_speed", obs.wind_kph);
                form.insert("rainfall", obs.precip_mm);
                form.insert("fire_risk_index", derived.fire_risk);
                form.insert("vegetation_index", derived.vegetation_index_pct);
                form.insert("drought_index", derived.drought.label());
            }
            DisasterKind::Earthquake => {}
            DisasterKind::Cyclone => {
                form.insert("pressure", obs.pressure_mb);
                form.insert("wind_speed", obs.wind_kph);
                form.insert("wind_direction", obs.wind_degree);
                form.insert("humidity", obs.humidity_pct);
                form.insert("rainfall", obs.precip_mm);
                form.insert("cloud_cover", obs.cloud_pct);
            }
            DisasterKind::Heatwave => {
                form.insert("temperature", obs.temperature_c);
                form.insert("humidity", obs.humidity_pct);
                form.insert("dew_point", derived.dew_point_c);
                form.insert("uv_index", obs.uv_index);
                form.insert("air_quality_index", derived.aqi);
                form.insert("soil_moisture", derived.soil_moisture_pct);
                form.insert("vegetation_index", derived.vegetation_index_pct);
                form.insert("drought_index", derived.drought.label());
                form.insert("fire_risk_index", derived.fire_risk);
            }
            DisasterKind::Thunderstorm => {
                form.insert("temperature", obs.temperature_c);
                form.insert("humidity", obs.humidity_pct);
                form.insert("pressure", obs.pressure_mb);
                form.insert("dew_point", derived.dew_point_c);
                form.insert("cape", derived.cape);
                form.insert("lifted_index", derived.lifted_index);
                form.insert("wind_shear", derived.wind_shear_ms);
                form.insert("cloud_cover", obs.cloud_pct);
                form.insert("visibility", obs.visibility_km);
            }
        }

        form
    }

    fn insert(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// User edit: replaces or adds `name`.
    pub fn set(&mut self, name: &str, raw: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("Field name must not be empty"));
        }
        self.fields.insert(name.to_string(), FieldValue::parse(raw));
        Ok(())
    }

    /// Applies a `name=value` assignment.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<()> {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected `field=value`, got '{assignment}'"))?;
        self.set(name, value)
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        required_fields(self.kind)
            .iter()
            .copied()
            .filter(|f| match self.fields.get(*f) {
                Some(FieldValue::Number(n)) => !n.is_finite(),
                Some(FieldValue::Text(s)) => s.is_empty(),
                None => true,
            })
            .collect()
    }
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}
