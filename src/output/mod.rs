//! Output formatter - renders resolutions as text or JSON

use crate::database::{LookupOutcome, NormalizedRecord};
use crate::resolve::Resolution;
use serde_json::{Value, json};

#[cfg(feature = "colored-output")]
use colored::Colorize;

/// Format resolutions as indented text, one block per address
pub fn format_text(resolutions: &[Resolution], use_color: bool) -> String {
    let mut result = String::new();

    for resolution in resolutions {
        result.push_str(&paint(&resolution.ip, Style::Address, use_color));
        result.push('\n');

        let width = resolution
            .outcomes
            .iter()
            .map(|o| o.backend.len())
            .max()
            .unwrap_or(0);

        for outcome in &resolution.outcomes {
            let (info, style) = describe(&outcome.outcome);
            result.push_str(&format!(
                "  {:<width$}  {}\n",
                outcome.backend,
                paint(&info, style, use_color),
                width = width
            ));
        }
    }

    result
}

/// Format resolutions as a JSON array, preserving input and backend order
pub fn format_json(resolutions: &[Resolution]) -> Result<String, serde_json::Error> {
    let items: Vec<Value> = resolutions
        .iter()
        .map(|resolution| {
            let results: Vec<Value> = resolution
                .outcomes
                .iter()
                .map(|o| outcome_json(&o.backend, &o.outcome))
                .collect();
            json!({
                "ip": resolution.ip,
                "results": results,
            })
        })
        .collect();

    serde_json::to_string_pretty(&items)
}

fn outcome_json(backend: &str, outcome: &LookupOutcome) -> Value {
    match outcome {
        LookupOutcome::Found(record) => json!({
            "backend": backend,
            "status": "found",
            "record": record,
        }),
        LookupOutcome::NotFound => json!({ "backend": backend, "status": "not_found" }),
        LookupOutcome::Unavailable => json!({ "backend": backend, "status": "unavailable" }),
        LookupOutcome::Error(e) => json!({
            "backend": backend,
            "status": "error",
            "error": e.to_string(),
        }),
    }
}

#[derive(Debug, Clone, Copy)]
enum Style {
    Address,
    Found,
    Missing,
    Failed,
}

fn describe(outcome: &LookupOutcome) -> (String, Style) {
    match outcome {
        LookupOutcome::Found(record) if record.is_empty() => ("[Empty record]".to_string(), Style::Missing),
        LookupOutcome::Found(record) => (format_record(record), Style::Found),
        LookupOutcome::NotFound => ("[Not found]".to_string(), Style::Missing),
        LookupOutcome::Unavailable => ("[Unavailable]".to_string(), Style::Failed),
        LookupOutcome::Error(e) => (format!("[Error: {}]", e), Style::Failed),
    }
}

/// Compact one-line rendering of a record
///
/// Repeated place names (a city-state whose region equals its country) are printed once.
pub fn format_record(record: &NormalizedRecord) -> String {
    let mut parts: Vec<String> = Vec::new();

    for place in [&record.country, &record.region, &record.city].into_iter().flatten() {
        if parts.last() != Some(place) {
            parts.push(place.clone());
        }
    }

    if let Some(ref isp) = record.isp {
        parts.push(isp.clone());
    }

    if let Some(asn) = record.asn {
        parts.push(format!("AS{}", asn));
    }

    if let Some(ref domain) = record.domain {
        parts.push(domain.clone());
    }

    if let Some(ref zipcode) = record.zipcode {
        parts.push(zipcode.clone());
    }

    if let (Some(lat), Some(lon)) = (record.latitude, record.longitude) {
        parts.push(format!("({:.4}, {:.4})", lat, lon));
    }

    parts.join(" ")
}

#[cfg(feature = "colored-output")]
fn paint(text: &str, style: Style, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    match style {
        Style::Address => text.bold().to_string(),
        Style::Found => text.green().to_string(),
        Style::Missing => text.yellow().to_string(),
        Style::Failed => text.red().to_string(),
    }
}

#[cfg(not(feature = "colored-output"))]
fn paint(text: &str, _style: Style, _use_color: bool) -> String {
    text.to_string()
}
