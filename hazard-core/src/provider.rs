use crate::{
    Config,
    model::{Particulates, ResolvedLocation, WeatherObservation},
    provider::{openmeteo::OpenMeteoAirQuality, weatherapi::WeatherApiProvider},
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, time::Duration};

pub mod openmeteo;
pub mod weatherapi;

/// Source of current weather and place search.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, lat: f64, lon: f64) -> anyhow::Result<WeatherObservation>;

    async fn search(&self, query: &str) -> anyhow::Result<Vec<ResolvedLocation>>;
}

/// Source of particulate readings.
#[async_trait]
pub trait AirQualityProvider: Send + Sync + Debug {
    async fn particulates(&self, lat: f64, lon: f64) -> anyhow::Result<Particulates>;
}

/// Shared HTTP client honouring the configured request timeout.
pub fn http_client(config: &Config) -> anyhow::Result<Client> {
    let mut builder = Client::builder();
    if let Some(secs) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().context("Failed to build HTTP client")
}

/// Construct the weather provider from config.
pub fn weather_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.weather_api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No weather API key configured.\n\
             Hint: run `hazard configure` or set HAZARD_WEATHER_API_KEY."
        )
    })?;

    Ok(Box::new(WeatherApiProvider::new(
        http_client(config)?,
        config.weather_base_url().to_string(),
        api_key.to_owned(),
    )))
}

/// Construct the air-quality provider from config. Open-Meteo needs no key.
pub fn air_quality_provider_from_config(
    config: &Config,
) -> anyhow::Result<Box<dyn AirQualityProvider>> {
    Ok(Box::new(OpenMeteoAirQuality::new(
        http_client(config)?,
        config.air_quality_base_url().to_string(),
    )))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
