//! Derived-metric calculator.
//!
//! Turns a [`WeatherObservation`] into the secondary indices the prediction
//! forms expect. Every function here is pure arithmetic over `f64`; degenerate
//! input (e.g. zero relative humidity) yields `NaN` or an infinity instead of
//! an error, and callers display whatever comes out.
//!
//! The convective indices ([`cape`], [`lifted_index`], [`wind_shear`]) are
//! simplified stand-ins with no physical calibration. Their formulas are fixed
//! so that results stay comparable between releases.

use crate::model::{DerivedMetrics, DroughtClass, WeatherObservation};

const MAGNUS_A: f64 = 17.27;
const MAGNUS_B: f64 = 237.7;

const DROUGHT_MEAN_PRECIP_MM: f64 = 50.0;
const DROUGHT_STD_PRECIP_MM: f64 = 20.0;

/// Soil moisture fraction assumed when no earlier reading is known.
pub const DEFAULT_SOIL_MOISTURE: f64 = 0.5;

/// AQI reported when neither particulate reading is available ("good air").
pub const DEFAULT_AQI: u16 = 25;

const VEGETATION_BASE: f64 = 0.6;
const VEGETATION_OPTIMAL_TEMP_C: f64 = 25.0;

/// One row of an EPA breakpoint table: concentration range mapped to index range.
#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    c_lo: f64,
    c_hi: f64,
    i_lo: f64,
    i_hi: f64,
}

const fn bp(c_lo: f64, c_hi: f64, i_lo: f64, i_hi: f64) -> Breakpoint {
    Breakpoint { c_lo, c_hi, i_lo, i_hi }
}

// 24-hour PM2.5, µg/m³
const PM25_BREAKPOINTS: [Breakpoint; 7] = [
    bp(0.0, 12.0, 0.0, 50.0),
    bp(12.1, 35.4, 51.0, 100.0),
    bp(35.5, 55.4, 101.0, 150.0),
    bp(55.5, 150.4, 151.0, 200.0),
    bp(150.5, 250.4, 201.0, 300.0),
    bp(250.5, 350.4, 301.0, 400.0),
    bp(350.5, 500.4, 401.0, 500.0),
];

// 24-hour PM10, µg/m³
const PM10_BREAKPOINTS: [Breakpoint; 7] = [
    bp(0.0, 54.0, 0.0, 50.0),
    bp(55.0, 154.0, 51.0, 100.0),
    bp(155.0, 254.0, 101.0, 150.0),
    bp(255.0, 354.0, 151.0, 200.0),
    bp(355.0, 424.0, 201.0, 300.0),
    bp(425.0, 504.0, 301.0, 400.0),
    bp(505.0, 604.0, 401.0, 500.0),
];

/// Dew point in °C using the Magnus approximation.
///
/// Not clamped: `rh <= 0` gives `NaN` or `-inf`. At exactly 100 % the dew
/// point is the temperature itself; the formula alone can land one ULP above.
/// Below saturation the result stays under the temperature up to rounding.
pub fn dew_point(temperature_c: f64, humidity_pct: f64) -> f64 {
    if humidity_pct == 100.0 {
        return temperature_c;
    }
    let alpha = (MAGNUS_A * temperature_c) / (MAGNUS_B + temperature_c) + (humidity_pct / 100.0).ln();
    (MAGNUS_B * alpha) / (MAGNUS_A - alpha)
}

/// Classifies precipitation with a z-score against a fixed climatology
/// (mean 50 mm, standard deviation 20 mm).
///
/// The climatology is a monthly one. [`derive`] feeds it the day's total,
/// which is all the weather provider reports, so a dry day on its own already
/// reads as "Severe Drought".
pub fn drought_index(precip_mm: f64) -> DroughtClass {
    let z = (precip_mm - DROUGHT_MEAN_PRECIP_MM) / DROUGHT_STD_PRECIP_MM;

    if z < -1.5 {
        DroughtClass::SevereDrought
    } else if z < -1.0 {
        DroughtClass::ModerateDrought
    } else if z < -0.5 {
        DroughtClass::MildDrought
    } else {
        DroughtClass::Normal
    }
}

/// Fire-risk score in `[0, 100]`.
///
/// The weighted sum `0.1 T + 0.4 wind - 0.7 RH - 0.2 precip` tops out at 50
/// for the extreme (100 °C, 100 kph, 0 %, 0 mm) case, so it is doubled onto
/// the 0-100 scale before clamping.
pub fn fire_risk(temperature_c: f64, wind_kph: f64, humidity_pct: f64, precip_mm: f64) -> f64 {
    let raw = 0.1 * temperature_c + 0.4 * wind_kph - 0.7 * humidity_pct - 0.2 * precip_mm;
    (raw * 2.0).clamp(0.0, 100.0)
}

/// Soil moisture in percent, stepping `previous` (a 0-1 fraction) by the
/// day's precipitation gain and temperature loss.
pub fn soil_moisture(temperature_c: f64, precip_mm: f64, previous: f64) -> u8 {
    let fraction = (previous + precip_mm / 100.0 - temperature_c / 100.0).clamp(0.0, 1.0);
    to_percent(fraction * 100.0)
}

/// Vegetation index in percent.
///
/// Base greenness of 0.6 scaled by how close the temperature is to 25 °C and
/// by rainfall, whose factor saturates at 1.
pub fn vegetation_index(temperature_c: f64, precip_mm: f64) -> u8 {
    let temp_factor =
        (1.0 - (temperature_c - VEGETATION_OPTIMAL_TEMP_C).abs() / VEGETATION_OPTIMAL_TEMP_C).max(0.0);
    let precip_factor = (0.5 + precip_mm.max(0.0) / 20.0).min(1.0);

    to_percent(VEGETATION_BASE * temp_factor * precip_factor * 100.0)
}

/// Simplified CAPE (J/kg): grows with surface warmth above 10 °C and, more
/// steeply, with low-level moisture. Never negative.
pub fn cape(temperature_c: f64, dew_point_c: f64) -> f64 {
    (50.0 * (temperature_c - 10.0) + 100.0 * (dew_point_c - 10.0)).max(0.0)
}

/// Simplified lifted index: dew point depression pushes towards stable
/// (positive), moisture above 10 °C dew point towards unstable (negative).
pub fn lifted_index(temperature_c: f64, dew_point_c: f64) -> f64 {
    0.5 * (temperature_c - dew_point_c) - 0.5 * (dew_point_c - 10.0)
}

/// Shear proxy in m/s: the gust excess over sustained wind.
pub fn wind_shear(wind_kph: f64, gust_kph: f64) -> f64 {
    (gust_kph - wind_kph).max(0.0) / 3.6
}

/// US EPA AQI from PM2.5 and PM10; the worse of the two sub-indices wins.
///
/// A missing (or `NaN`) reading is ignored; with neither present the result
/// is [`DEFAULT_AQI`].
pub fn air_quality_index(pm2_5: Option<f64>, pm10: Option<f64>) -> u16 {
    let pm25_index = pm2_5.and_then(|c| sub_index(c, &PM25_BREAKPOINTS));
    let pm10_index = pm10.and_then(|c| sub_index(c, &PM10_BREAKPOINTS));

    match (pm25_index, pm10_index) {
        (Some(a), Some(b)) => a.max(b),
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => DEFAULT_AQI,
    }
}

fn sub_index(concentration: f64, table: &[Breakpoint]) -> Option<u16> {
    if concentration.is_nan() {
        return None;
    }
    if concentration < 0.0 {
        return Some(0);
    }

    // Readings that fall between two rows' ranges use the upper row, which
    // keeps the index non-decreasing across the gap.
    let Some(row) = table.iter().find(|row| concentration <= row.c_hi) else {
        return Some(500);
    };

    let index = (row.i_hi - row.i_lo) / (row.c_hi - row.c_lo) * (concentration - row.c_lo) + row.i_lo;
    Some(index.round().clamp(0.0, 500.0) as u16)
}

fn to_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Computes every derived index for one observation.
pub fn derive(obs: &WeatherObservation) -> DerivedMetrics {
    let dew_point_c = dew_point(obs.temperature_c, obs.humidity_pct);

    DerivedMetrics {
        dew_point_c,
        drought: drought_index(obs.precip_mm),
        fire_risk: fire_risk(obs.temperature_c, obs.wind_kph, obs.humidity_pct, obs.precip_mm),
        soil_moisture_pct: soil_moisture(obs.temperature_c, obs.precip_mm, DEFAULT_SOIL_MOISTURE),
        vegetation_index_pct: vegetation_index(obs.temperature_c, obs.precip_mm),
        cape: cape(obs.temperature_c, dew_point_c),
        lifted_index: lifted_index(obs.temperature_c, dew_point_c),
        wind_shear_ms: wind_shear(obs.wind_kph, obs.gust_kph),
        aqi: air_quality_index(obs.pm2_5, obs.pm10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Utc;

    fn observation() -> WeatherObservation {
        WeatherObservation {
            location_name: "Test".into(),
            temperature_c: 30.0,
            humidity_pct: 60.0,
            pressure_mb: 1008.0,
            wind_kph: 20.0,
            wind_degree: 180.0,
            gust_kph: 38.0,
            precip_mm: 0.0,
            uv_index: 8.0,
            visibility_km: 10.0,
            cloud_pct: 25.0,
            pm2_5: Some(12.0),
            pm10: Some(54.0),
            observation_time: Utc::now(),
        }
    }

    #[test]
    fn dew_point_at_saturation_equals_temperature() {
        assert_relative_eq!(dew_point(20.0, 100.0), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn dew_point_never_exceeds_temperature() {
        for t in [-20.0, 0.0, 15.0, 35.0] {
            for rh in [1.0, 10.0, 45.5, 80.0, 99.9, 100.0] {
                assert!(dew_point(t, rh) <= t + 1e-9, "t={t} rh={rh}");
            }
        }
    }

    #[test]
    fn dew_point_at_saturation_is_exactly_temperature() {
        let mut t = -40.0;
        while t <= 50.0 {
            assert_eq!(dew_point(t, 100.0), t, "t={t}");
            t += 0.01;
        }
    }

    #[test]
    fn dew_point_degenerate_humidity_is_not_finite() {
        assert!(!dew_point(20.0, 0.0).is_finite());
        assert!(dew_point(20.0, -5.0).is_nan());
    }

    #[test]
    fn drought_thresholds() {
        assert_eq!(drought_index(50.0), DroughtClass::Normal);
        assert_eq!(drought_index(0.0), DroughtClass::SevereDrought);
        assert_eq!(drought_index(25.0), DroughtClass::ModerateDrought);
        assert_eq!(drought_index(35.0), DroughtClass::MildDrought);
        assert_eq!(drought_index(40.0), DroughtClass::Normal);
        assert_eq!(drought_index(0.0).label(), "Severe Drought");
        assert_eq!(drought_index(50.0).label(), "Normal");
    }

    #[test]
    fn fire_risk_extremes() {
        assert_eq!(fire_risk(0.0, 0.0, 100.0, 100.0), 0.0);
        assert_eq!(fire_risk(100.0, 100.0, 0.0, 0.0), 100.0);
    }

    #[test]
    fn fire_risk_is_clamped() {
        for t in [-40.0, 0.0, 25.0, 60.0, 500.0] {
            for wind in [0.0, 30.0, 250.0] {
                for rh in [0.0, 50.0, 100.0] {
                    for p in [0.0, 10.0, 300.0] {
                        let r = fire_risk(t, wind, rh, p);
                        assert!((0.0..=100.0).contains(&r));
                    }
                }
            }
        }
    }

    #[test]
    fn soil_moisture_steps_from_previous() {
        assert_eq!(soil_moisture(20.0, 10.0, DEFAULT_SOIL_MOISTURE), 40);
        assert_eq!(soil_moisture(0.0, 200.0, DEFAULT_SOIL_MOISTURE), 100);
        assert_eq!(soil_moisture(80.0, 0.0, DEFAULT_SOIL_MOISTURE), 0);
    }

    #[test]
    fn vegetation_peaks_at_optimal_temperature() {
        assert_eq!(vegetation_index(25.0, 50.0), 60);
        assert_eq!(vegetation_index(25.0, 0.0), 30);
        assert!(vegetation_index(35.0, 50.0) < vegetation_index(25.0, 50.0));
        assert_eq!(vegetation_index(60.0, 50.0), 0);
        assert_eq!(vegetation_index(-10.0, 50.0), 0);
    }

    #[test]
    fn percent_outputs_stay_in_range() {
        for t in [-50.0, -5.0, 10.0, 25.0, 45.0, 90.0] {
            for p in [-10.0, 0.0, 5.0, 40.0, 500.0] {
                assert!(soil_moisture(t, p, DEFAULT_SOIL_MOISTURE) <= 100);
                assert!(vegetation_index(t, p) <= 100);
            }
        }
    }

    #[test]
    fn aqi_first_breakpoint_upper_edge() {
        assert_eq!(air_quality_index(Some(12.0), Some(54.0)), 50);
    }

    #[test]
    fn aqi_defaults_when_both_missing() {
        assert_eq!(air_quality_index(None, None), DEFAULT_AQI);
        assert_eq!(air_quality_index(None, None), 25);
        assert_eq!(air_quality_index(Some(f64::NAN), None), 25);
    }

    #[test]
    fn aqi_takes_worse_pollutant() {
        // PM2.5 35.4 is the top of the "moderate" band.
        assert_eq!(air_quality_index(Some(35.4), Some(10.0)), 100);
        assert_eq!(air_quality_index(Some(1.0), Some(154.0)), 100);
        assert_eq!(air_quality_index(None, Some(154.0)), 100);
    }

    #[test]
    fn aqi_saturates_at_table_bounds() {
        assert_eq!(air_quality_index(Some(900.0), None), 500);
        assert_eq!(air_quality_index(None, Some(10_000.0)), 500);
        assert_eq!(air_quality_index(Some(-3.0), Some(-1.0)), 0);
    }

    #[test]
    fn aqi_is_monotonic_in_each_pollutant() {
        let mut prev = 0;
        let mut c = 0.0;
        while c < 520.0 {
            let aqi = air_quality_index(Some(c), None);
            assert!(aqi >= prev, "pm2.5 {c}: {aqi} < {prev}");
            prev = aqi;
            c += 0.05;
        }

        let mut prev = 0;
        let mut c = 0.0;
        while c < 620.0 {
            let aqi = air_quality_index(None, Some(c));
            assert!(aqi >= prev, "pm10 {c}: {aqi} < {prev}");
            prev = aqi;
            c += 0.5;
        }
    }

    #[test]
    fn convective_formulas_are_fixed() {
        assert_relative_eq!(cape(30.0, 22.0), 2200.0);
        assert_relative_eq!(cape(5.0, 0.0), 0.0);
        assert_relative_eq!(lifted_index(30.0, 22.0), -2.0);
        assert_relative_eq!(lifted_index(30.0, 5.0), 15.0);
        assert_relative_eq!(wind_shear(20.0, 38.0), 5.0);
        assert_relative_eq!(wind_shear(20.0, 10.0), 0.0);
    }

    #[test]
    fn derive_bundles_every_metric() {
        let obs = observation();
        let m = derive(&obs);

        assert_relative_eq!(m.dew_point_c, dew_point(30.0, 60.0));
        assert_eq!(m.drought, DroughtClass::SevereDrought);
        assert_eq!(m.fire_risk, 0.0);
        assert_eq!(m.soil_moisture_pct, 20);
        assert_eq!(m.vegetation_index_pct, 24);
        assert_relative_eq!(m.wind_shear_ms, 5.0);
        assert_eq!(m.aqi, 50);
        assert_relative_eq!(m.cape, cape(30.0, m.dew_point_c));
    }
}
