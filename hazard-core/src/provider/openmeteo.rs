use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::model::Particulates;

use super::{AirQualityProvider, truncate_body};

/// Open-Meteo air-quality client.
#[derive(Debug, Clone)]
pub struct OpenMeteoAirQuality {
    http: Client,
    base_url: String,
}

impl OpenMeteoAirQuality {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string() }
    }
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    #[serde(default)]
    pm10: Vec<Option<f64>>,
    #[serde(default)]
    pm2_5: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    #[serde(default)]
    utc_offset_seconds: i64,
    hourly: OmHourly,
}

/// Picks the hourly reading closest to `now` from an air-quality body.
///
/// Timestamps are local to the requested location (`timezone=auto`), so `now`
/// is shifted by the response's UTC offset before comparing.
pub fn parse_air_quality(body: &str, now: chrono::DateTime<Utc>) -> Result<Particulates> {
    let parsed: OmResponse =
        serde_json::from_str(body).context("Failed to parse Open-Meteo air-quality JSON")?;

    let local_now = now.naive_utc() + chrono::Duration::seconds(parsed.utc_offset_seconds);

    let nearest = parsed
        .hourly
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M")
                .ok()
                .map(|ts| (i, (ts - local_now).num_seconds().abs()))
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(i, _)| i)
        .ok_or_else(|| anyhow!("Open-Meteo air-quality response contained no hourly data"))?;

    Ok(Particulates {
        pm2_5: parsed.hourly.pm2_5.get(nearest).copied().flatten(),
        pm10: parsed.hourly.pm10.get(nearest).copied().flatten(),
    })
}

#[async_trait]
impl AirQualityProvider for OpenMeteoAirQuality {
    async fn particulates(&self, lat: f64, lon: f64) -> Result<Particulates> {
        let url = format!("{}/v1/air-quality", self.base_url);
        debug!(%url, lat, lon, "requesting air quality");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("hourly", "pm10,pm2_5".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Open-Meteo (air quality)")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Open-Meteo air-quality response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo air-quality request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        parse_air_quality(&body, Utc::now())
    }
}
