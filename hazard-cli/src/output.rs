//! Human-readable and JSON rendering of command results.

use hazard_core::{Conditions, DerivedMetrics, Prediction, PredictionForm};
use serde_json::json;

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn conditions(c: &Conditions, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        return print_json(&serde_json::to_value(c)?);
    }

    let o = &c.observation;
    println!("{}", c.location.display_name());
    println!("  observed       {}", o.observation_time.format("%Y-%m-%d %H:%M UTC"));
    println!("  temperature    {:.1} °C", o.temperature_c);
    println!("  humidity       {:.0} %", o.humidity_pct);
    println!("  pressure       {:.0} mb", o.pressure_mb);
    println!("  wind           {:.1} kph from {:.0}° (gusts {:.1} kph)", o.wind_kph, o.wind_degree, o.gust_kph);
    println!("  precipitation  {:.1} mm", o.precip_mm);
    println!("  uv index       {:.1}", o.uv_index);
    println!("  visibility     {:.1} km", o.visibility_km);
    println!("  cloud cover    {:.0} %", o.cloud_pct);
    println!("  pm2.5 / pm10   {} / {}", fmt_opt(o.pm2_5), fmt_opt(o.pm10));
    println!();
    print_metrics(&c.derived);
    Ok(())
}

pub fn metrics(m: &DerivedMetrics, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        return print_json(&serde_json::to_value(m)?);
    }
    print_metrics(m);
    Ok(())
}

fn print_metrics(m: &DerivedMetrics) {
    println!("Derived metrics");
    println!("  dew point        {:.1} °C", m.dew_point_c);
    println!("  drought          {}", m.drought);
    println!("  fire risk        {:.1} / 100", m.fire_risk);
    println!("  soil moisture    {} %", m.soil_moisture_pct);
    println!("  vegetation       {} %", m.vegetation_index_pct);
    println!("  CAPE (simple)    {:.0} J/kg", m.cape);
    println!("  lifted index     {:.1}", m.lifted_index);
    println!("  wind shear       {:.1} m/s", m.wind_shear_ms);
    println!("  AQI              {}", m.aqi);
}

pub fn form(
    c: &Conditions,
    form: &PredictionForm,
    missing: &[&str],
    as_json: bool,
) -> anyhow::Result<()> {
    if as_json {
        return print_json(&json!({
            "kind": form.kind,
            "location": c.location,
            "fields": form,
            "missing": missing,
        }));
    }

    println!("{} form for {}", form.kind, c.location.display_name());
    for (name, value) in &form.fields {
        println!("  {name:<24} {value}");
    }
    if !missing.is_empty() {
        println!();
        println!("Missing required fields: {}", missing.join(", "));
    }
    Ok(())
}

pub fn prediction(c: &Conditions, p: &Prediction, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        return print_json(&json!({ "location": c.location, "prediction": p }));
    }

    println!("{} risk for {}: {}", p.kind, c.location.display_name(), p.label);
    match p.confidence {
        Some(conf) => println!("  confidence {conf:.1} %"),
        None => println!("  confidence not reported"),
    }
    Ok(())
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.1}")).unwrap_or_else(|| "n/a".to_string())
}
