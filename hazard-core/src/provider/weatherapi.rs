use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::model::{ResolvedLocation, WeatherObservation};

use super::{WeatherProvider, truncate_body};

/// weatherapi.com client.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    http: Client,
    base_url: String,
    api_key: String,
}

impl WeatherApiProvider {
    pub fn new(http: Client, base_url: String, api_key: String) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), api_key }
    }

    async fn get_text(&self, path: &str, query: &[(&str, &str)], what: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, what, "requesting weatherapi");

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to WeatherAPI.com ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read WeatherAPI {what} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "WeatherAPI {} request failed with status {}: {}",
                what,
                status,
                truncate_body(&body),
            ));
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
    localtime_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    last_updated_epoch: Option<i64>,
    temp_c: f64,
    humidity: f64,
    pressure_mb: f64,
    wind_kph: f64,
    wind_degree: f64,
    #[serde(default)]
    gust_kph: Option<f64>,
    precip_mm: f64,
    uv: f64,
    vis_km: f64,
    cloud: f64,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    totalprecip_mm: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    day: WaDay,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    location: WaLocation,
    current: WaCurrent,
    forecast: Option<WaForecast>,
}

#[derive(Debug, Deserialize)]
struct WaSearchEntry {
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
    lat: f64,
    lon: f64,
}

/// Maps a `forecast.json` body onto an observation without particulate data.
///
/// Precipitation prefers the day's forecast total over the instantaneous
/// reading, since the drought and soil estimates work on daily amounts.
pub fn parse_forecast(body: &str) -> Result<WeatherObservation> {
    let parsed: WaForecastResponse =
        serde_json::from_str(body).context("Failed to parse WeatherAPI forecast JSON")?;

    let ts = parsed.current.last_updated_epoch.or(parsed.location.localtime_epoch);
    let observation_time = ts.and_then(unix_to_utc).unwrap_or_else(Utc::now);

    let day_total = parsed
        .forecast
        .as_ref()
        .and_then(|f| f.forecastday.first())
        .and_then(|d| d.day.totalprecip_mm);

    let location_name = [parsed.location.name, parsed.location.region, parsed.location.country]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let current = parsed.current;

    Ok(WeatherObservation {
        location_name,
        temperature_c: current.temp_c,
        humidity_pct: current.humidity,
        pressure_mb: current.pressure_mb,
        wind_kph: current.wind_kph,
        wind_degree: current.wind_degree,
        gust_kph: current.gust_kph.unwrap_or(current.wind_kph),
        precip_mm: day_total.unwrap_or(current.precip_mm),
        uv_index: current.uv,
        visibility_km: current.vis_km,
        cloud_pct: current.cloud,
        pm2_5: None,
        pm10: None,
        observation_time,
    })
}

pub fn parse_search(body: &str) -> Result<Vec<ResolvedLocation>> {
    let entries: Vec<WaSearchEntry> =
        serde_json::from_str(body).context("Failed to parse WeatherAPI search JSON")?;

    Ok(entries
        .into_iter()
        .map(|e| ResolvedLocation {
            name: e.name,
            region: e.region,
            country: e.country,
            lat: e.lat,
            lon: e.lon,
        })
        .collect())
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn current(&self, lat: f64, lon: f64) -> Result<WeatherObservation> {
        let q = format!("{lat},{lon}");
        let body = self
            .get_text("/v1/forecast.json", &[("q", q.as_str()), ("days", "1")], "forecast")
            .await?;

        parse_forecast(&body)
    }

    async fn search(&self, query: &str) -> Result<Vec<ResolvedLocation>> {
        let body = self.get_text("/v1/search.json", &[("q", query)], "search").await?;
        let found = parse_search(&body)?;
        debug!(query, matches = found.len(), "weatherapi search finished");
        Ok(found)
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORECAST: &str = r#"{
        "location": {
            "name": "Chennai", "region": "Tamil Nadu", "country": "India",
            "lat": 13.08, "lon": 80.28, "localtime_epoch": 1700000100
        },
        "current": {
            "last_updated_epoch": 1700000000,
            "temp_c": 31.0, "humidity": 74, "pressure_mb": 1006.0,
            "wind_kph": 18.4, "wind_degree": 120, "gust_kph": 25.2,
            "precip_mm": 0.3, "uv": 7.0, "vis_km": 6.0, "cloud": 50,
            "condition": { "text": "Partly cloudy" }
        },
        "forecast": { "forecastday": [ { "day": { "totalprecip_mm": 12.7 } } ] }
    }"#;

    #[test]
    fn parses_forecast_fields() {
        let obs = parse_forecast(FORECAST).unwrap();

        assert_eq!(obs.location_name, "Chennai, Tamil Nadu, India");
        assert_eq!(obs.temperature_c, 31.0);
        assert_eq!(obs.humidity_pct, 74.0);
        assert_eq!(obs.gust_kph, 25.2);
        assert_eq!(obs.precip_mm, 12.7);
        assert_eq!(obs.cloud_pct, 50.0);
        assert_eq!(obs.observation_time.timestamp(), 1_700_000_000);
        assert!(obs.pm2_5.is_none());
    }

    #[test]
    fn forecast_without_day_totals_uses_current_precip() {
        let body = FORECAST.replace(
            r#""forecast": { "forecastday": [ { "day": { "totalprecip_mm": 12.7 } } ] }"#,
            r#""forecast": { "forecastday": [] }"#,
        );
        let obs = parse_forecast(&body).unwrap();
        assert_eq!(obs.precip_mm, 0.3);
    }

    #[test]
    fn malformed_forecast_is_an_error() {
        let err = parse_forecast(r#"{"location": {}}"#).unwrap_err();
        assert!(err.to_string().contains("Failed to parse WeatherAPI forecast JSON"));
    }

    #[test]
    fn parses_search_results() {
        let body = r#"[
            {"id": 1, "name": "London", "region": "City of London, Greater London",
             "country": "United Kingdom", "lat": 51.52, "lon": -0.11, "url": "london"},
            {"id": 2, "name": "London", "region": "Ontario", "country": "Canada",
             "lat": 42.98, "lon": -81.25, "url": "london-ontario"}
        ]"#;

        let found = parse_search(body).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].country, "Canada");
        assert_eq!(found[0].lat, 51.52);
    }

    #[test]
    fn empty_search_is_empty_vec() {
        assert!(parse_search("[]").unwrap().is_empty());
    }
}
