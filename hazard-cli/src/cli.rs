use anyhow::{Context, anyhow};
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use hazard_core::{
    Assessor, Config, DisasterKind, Location, PredictionClient, WeatherObservation, metrics,
    provider::http_client,
};
use inquire::{CustomType, Password, PasswordDisplayMode, Text};
use tracing::info;

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "hazard", version, about = "Weather-derived disaster risk assessment")]
pub struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Print JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set the weather API key and prediction service URL.
    Configure,

    /// Show current weather and derived metrics for a place.
    Weather {
        /// Place name, or "lat,lon".
        #[arg(allow_hyphen_values = true)]
        location: String,
    },

    /// Compute derived metrics from values given on the command line.
    Metrics {
        /// Temperature in °C.
        #[arg(long, allow_hyphen_values = true)]
        temp: f64,

        /// Relative humidity in percent.
        #[arg(long, allow_hyphen_values = true)]
        humidity: f64,

        /// Sustained wind in kph.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        wind: f64,

        /// Gust speed in kph; defaults to the sustained wind.
        #[arg(long, allow_hyphen_values = true)]
        gust: Option<f64>,

        /// Precipitation in mm.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        precip: f64,

        /// PM2.5 in µg/m³.
        #[arg(long, allow_hyphen_values = true)]
        pm25: Option<f64>,

        /// PM10 in µg/m³.
        #[arg(long, allow_hyphen_values = true)]
        pm10: Option<f64>,
    },

    /// Pre-fill a prediction form for a place and submit it.
    Assess {
        /// One of: flood, fire, earthquake, cyclone, heatwave, thunderstorm.
        kind: DisasterKind,

        /// Place name, or "lat,lon".
        #[arg(allow_hyphen_values = true)]
        location: String,

        /// Override or add a form field, e.g. `--set magnitude=6.2`. Repeatable.
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        overrides: Vec<String>,

        /// Print the form without submitting it.
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Weather { location } => {
                let config = Config::load_with_env()?;
                let assessor = Assessor::from_config(&config)?;
                let location: Location = location.parse()?;

                let conditions = assessor.conditions(&location).await?;
                output::conditions(&conditions, self.json)
            }
            Command::Metrics { temp, humidity, wind, gust, precip, pm25, pm10 } => {
                let obs = WeatherObservation {
                    location_name: "command line".to_string(),
                    temperature_c: temp,
                    humidity_pct: humidity,
                    pressure_mb: f64::NAN,
                    wind_kph: wind,
                    wind_degree: 0.0,
                    gust_kph: gust.unwrap_or(wind),
                    precip_mm: precip,
                    uv_index: f64::NAN,
                    visibility_km: f64::NAN,
                    cloud_pct: f64::NAN,
                    pm2_5: pm25,
                    pm10,
                    observation_time: Utc::now(),
                };
                output::metrics(&metrics::derive(&obs), self.json)
            }
            Command::Assess { kind, location, overrides, dry_run } => {
                let config = Config::load_with_env()?;
                let assessor = Assessor::from_config(&config)?;
                let location: Location = location.parse()?;

                let (conditions, mut form) = assessor.prefill(kind, &location).await?;
                for assignment in &overrides {
                    form.apply_assignment(assignment)?;
                }

                let missing = form.missing_required();
                if dry_run {
                    return output::form(&conditions, &form, &missing, self.json);
                }

                if !missing.is_empty() {
                    return Err(anyhow!(
                        "The {kind} form is missing required fields: {}.\n\
                         Hint: supply them with --set, e.g. `--set {}=...`.",
                        missing.join(", "),
                        missing[0],
                    ));
                }

                let client = PredictionClient::new(http_client(&config)?, config.prediction_base_url()?);
                let prediction = client
                    .predict(&form)
                    .await
                    .with_context(|| format!("No {kind} prediction available"))?;

                output::prediction(&conditions, &prediction, self.json)
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = Password::new("WeatherAPI.com API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()?;
    if !key.trim().is_empty() {
        config.weather_api_key = Some(key.trim().to_string());
    }

    let current_url = config.prediction_base_url.clone().unwrap_or_default();
    let url = Text::new("Prediction service base URL:")
        .with_default(&current_url)
        .with_help_message("Requests go to <url>/api/predict/<kind>")
        .prompt()?;
    config.prediction_base_url = Some(url.trim().to_string()).filter(|u| !u.is_empty());

    let timeout = CustomType::<u64>::new("Request timeout in seconds:")
        .with_default(config.request_timeout_secs.unwrap_or(30))
        .prompt()?;
    config.request_timeout_secs = Some(timeout);

    config.save()?;
    info!(path = %Config::config_file_path()?.display(), "configuration saved");
    println!("Configuration saved to {}", Config::config_file_path()?.display());

    Ok(())
}
