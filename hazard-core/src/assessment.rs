use anyhow::{Result, anyhow};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    Config,
    forms::PredictionForm,
    metrics,
    model::{DerivedMetrics, DisasterKind, Location, Particulates, ResolvedLocation, WeatherObservation},
    provider::{
        AirQualityProvider, WeatherProvider, air_quality_provider_from_config,
        weather_provider_from_config,
    },
};

/// An observation with its derived metrics, ready for a form.
#[derive(Debug, Clone, Serialize)]
pub struct Conditions {
    pub location: ResolvedLocation,
    pub observation: WeatherObservation,
    pub derived: DerivedMetrics,
}

#[derive(Debug)]
pub struct Assessor {
    weather: Box<dyn WeatherProvider>,
    air_quality: Box<dyn AirQualityProvider>,
}

impl Assessor {
    pub fn new(weather: Box<dyn WeatherProvider>, air_quality: Box<dyn AirQualityProvider>) -> Self {
        Self { weather, air_quality }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            weather_provider_from_config(config)?,
            air_quality_provider_from_config(config)?,
        ))
    }

    /// Coordinates pass straight through; text goes to the provider's search
    /// and the first match wins.
    pub async fn resolve(&self, location: &Location) -> Result<ResolvedLocation> {
        match location {
            Location::Coordinates { lat, lon } => Ok(ResolvedLocation::coordinates(*lat, *lon)),
            Location::Query(text) => {
                let found = self.weather.search(text).await?;
                found
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow!("No location matched '{text}'"))
            }
        }
    }

    /// Fetches weather and air quality together and merges them.
    ///
    /// A failed air-quality fetch only costs the particulate readings; a
    /// failed weather fetch fails the whole observation.
    pub async fn observe(&self, lat: f64, lon: f64) -> Result<WeatherObservation> {
        let (weather, air) =
            tokio::join!(self.weather.current(lat, lon), self.air_quality.particulates(lat, lon));

        let mut observation = weather?;
        let particulates = air.unwrap_or_else(|e| {
            warn!(error = %e, "air quality unavailable, using default AQI");
            Particulates::default()
        });

        observation.pm2_5 = particulates.pm2_5;
        observation.pm10 = particulates.pm10;
        Ok(observation)
    }

    pub async fn conditions(&self, location: &Location) -> Result<Conditions> {
        let location = self.resolve(location).await?;
        debug!(name = %location.display_name(), lat = location.lat, lon = location.lon, "resolved location");

        let observation = self.observe(location.lat, location.lon).await?;
        let derived = metrics::derive(&observation);

        Ok(Conditions { location, observation, derived })
    }

    /// Resolves, observes and pre-fills the form for `kind`.
    pub async fn prefill(&self, kind: DisasterKind, location: &Location) -> Result<(Conditions, PredictionForm)> {
        let conditions = self.conditions(location).await?;
        let form = PredictionForm::prefill(
            kind,
            conditions.location.lat,
            conditions.location.lon,
            &conditions.observation,
            &conditions.derived,
        );
        Ok((conditions, form))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FieldValue;
    use async_trait::async_trait;
    use chrono::Utc;

    #[derive(Debug)]
    struct FakeWeather {
        fail: bool,
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn current(&self, lat: f64, lon: f64) -> Result<WeatherObservation> {
            if self.fail {
                return Err(anyhow!("WeatherAPI forecast request failed with status 403"));
            }
            Ok(WeatherObservation {
                location_name: format!("{lat},{lon}"),
                temperature_c: 20.0,
                humidity_pct: 100.0,
                pressure_mb: 1013.0,
                wind_kph: 10.0,
                wind_degree: 90.0,
                gust_kph: 10.0,
                precip_mm: 50.0,
                uv_index: 3.0,
                visibility_km: 10.0,
                cloud_pct: 100.0,
                pm2_5: None,
                pm10: None,
                observation_time: Utc::now(),
            })
        }

        async fn search(&self, query: &str) -> Result<Vec<ResolvedLocation>> {
            if query == "nowhere" {
                return Ok(vec![]);
            }
            Ok(vec![
                ResolvedLocation {
                    name: query.to_string(),
                    region: "First".into(),
                    country: "Land".into(),
                    lat: 10.0,
                    lon: 20.0,
                },
                ResolvedLocation {
                    name: query.to_string(),
                    region: "Second".into(),
                    country: "Land".into(),
                    lat: -10.0,
                    lon: -20.0,
                },
            ])
        }
    }

    #[derive(Debug)]
    struct FakeAir {
        reading: Option<Particulates>,
    }

    #[async_trait]
    impl AirQualityProvider for FakeAir {
        async fn particulates(&self, _lat: f64, _lon: f64) -> Result<Particulates> {
            self.reading.ok_or_else(|| anyhow!("Open-Meteo air-quality request failed"))
        }
    }

    fn assessor(weather_fails: bool, reading: Option<Particulates>) -> Assessor {
        Assessor::new(Box::new(FakeWeather { fail: weather_fails }), Box::new(FakeAir { reading }))
    }

    #[tokio::test]
    async fn resolve_picks_first_search_match() {
        let a = assessor(false, None);
        let loc = a.resolve(&Location::Query("Springfield".into())).await.unwrap();
        assert_eq!(loc.region, "First");
    }

    #[tokio::test]
    async fn resolve_reports_empty_search() {
        let a = assessor(false, None);
        let err = a.resolve(&Location::Query("nowhere".into())).await.unwrap_err();
        assert!(err.to_string().contains("No location matched"));
    }

    #[tokio::test]
    async fn coordinates_skip_search() {
        let a = assessor(false, None);
        let loc = a.resolve(&Location::Coordinates { lat: 1.5, lon: 2.5 }).await.unwrap();
        assert_eq!((loc.lat, loc.lon), (1.5, 2.5));
    }

    #[tokio::test]
    async fn observe_merges_particulates() {
        let a = assessor(false, Some(Particulates { pm2_5: Some(35.4), pm10: Some(20.0) }));
        let conditions = a.conditions(&Location::Coordinates { lat: 0.0, lon: 0.0 }).await.unwrap();

        assert_eq!(conditions.observation.pm2_5, Some(35.4));
        assert_eq!(conditions.derived.aqi, 100);
    }

    #[tokio::test]
    async fn air_quality_failure_falls_back_to_default_aqi() {
        let a = assessor(false, None);
        let conditions = a.conditions(&Location::Coordinates { lat: 0.0, lon: 0.0 }).await.unwrap();

        assert_eq!(conditions.observation.pm10, None);
        assert_eq!(conditions.derived.aqi, metrics::DEFAULT_AQI);
    }

    #[tokio::test]
    async fn weather_failure_is_an_error() {
        let a = assessor(true, Some(Particulates::default()));
        let err = a.observe(0.0, 0.0).await.unwrap_err();
        assert!(err.to_string().contains("status 403"));
    }

    #[tokio::test]
    async fn prefill_builds_form_for_kind() {
        let a = assessor(false, None);
        let (conditions, form) =
            a.prefill(DisasterKind::Flood, &Location::Query("Springfield".into())).await.unwrap();

        assert_eq!(form.kind, DisasterKind::Flood);
        assert_eq!(form.get("latitude"), Some(&FieldValue::Number(10.0)));
        assert_eq!(form.get("drought_index"), Some(&FieldValue::Text("Normal".into())));
        assert_eq!(conditions.derived.drought.label(), "Normal");
        assert!(form.missing_required().is_empty());
    }
}
