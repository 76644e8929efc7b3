use std::{fmt, str::FromStr};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where to look up weather: explicit coordinates or a free-text place name.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Coordinates { lat: f64, lon: f64 },
    Query(String),
}

impl FromStr for Location {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Location must not be empty"));
        }

        if let Some((lat, lon)) = trimmed.split_once(',') {
            if let (Ok(lat), Ok(lon)) = (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                    return Err(anyhow!("Coordinates out of range: {lat},{lon}"));
                }
                return Ok(Location::Coordinates { lat, lon });
            }
        }

        Ok(Location::Query(trimmed.to_string()))
    }
}

/// A place returned by a location search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl ResolvedLocation {
    pub fn coordinates(lat: f64, lon: f64) -> Self {
        Self {
            name: format!("{lat:.4},{lon:.4}"),
            region: String::new(),
            country: String::new(),
            lat,
            lon,
        }
    }

    pub fn display_name(&self) -> String {
        [self.name.as_str(), self.region.as_str(), self.country.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Raw weather for one location, as of the most recent fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub location_name: String,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_mb: f64,
    pub wind_kph: f64,
    pub wind_degree: f64,
    pub gust_kph: f64,
    pub precip_mm: f64,
    pub uv_index: f64,
    pub visibility_km: f64,
    pub cloud_pct: f64,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub observation_time: DateTime<Utc>,
}

/// Particulate concentrations in µg/m³.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Particulates {
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisasterKind {
    Flood,
    Fire,
    Earthquake,
    Cyclone,
    Heatwave,
    Thunderstorm,
}

impl DisasterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisasterKind::Flood => "flood",
            DisasterKind::Fire => "fire",
            DisasterKind::Earthquake => "earthquake",
            DisasterKind::Cyclone => "cyclone",
            DisasterKind::Heatwave => "heatwave",
            DisasterKind::Thunderstorm => "thunderstorm",
        }
    }

    pub const fn all() -> &'static [DisasterKind] {
        &[
            DisasterKind::Flood,
            DisasterKind::Fire,
            DisasterKind::Earthquake,
            DisasterKind::Cyclone,
            DisasterKind::Heatwave,
            DisasterKind::Thunderstorm,
        ]
    }
}

impl fmt::Display for DisasterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DisasterKind {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        DisasterKind::all()
            .iter()
            .find(|kind| kind.as_str() == lower)
            .copied()
            .ok_or_else(|| {
                anyhow!(
                    "Unknown disaster kind '{value}'. Supported kinds: \
                     flood, fire, earthquake, cyclone, heatwave, thunderstorm."
                )
            })
    }
}

impl FromStr for DisasterKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DisasterKind::try_from(s)
    }
}

/// SPI-style drought bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DroughtClass {
    SevereDrought,
    ModerateDrought,
    MildDrought,
    Normal,
}

impl DroughtClass {
    pub fn label(&self) -> &'static str {
        match self {
            DroughtClass::SevereDrought => "Severe Drought",
            DroughtClass::ModerateDrought => "Moderate Drought",
            DroughtClass::MildDrought => "Mild Drought",
            DroughtClass::Normal => "Normal",
        }
    }
}

impl fmt::Display for DroughtClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Secondary indices computed from a [`WeatherObservation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub dew_point_c: f64,
    pub drought: DroughtClass,
    pub fire_risk: f64,
    pub soil_moisture_pct: u8,
    pub vegetation_index_pct: u8,
    pub cape: f64,
    pub lifted_index: f64,
    pub wind_shear_ms: f64,
    pub aqi: u16,
}
