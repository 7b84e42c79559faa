//! Aggregate statistics over weather readings and the optional LLM narrative
//! attached to them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::WeatherLog;

/// Temperature band boundaries in °C (upper bound exclusive).
const COLD_BELOW: f64 = 10.0;
const MILD_BELOW: f64 = 20.0;
const WARM_BELOW: f64 = 28.0;

const HUMID_AT_OR_ABOVE: f64 = 80.0;
const DRY_AT_OR_BELOW: f64 = 30.0;

const HEAT_ALERT_AT: f64 = 35.0;
const FROST_ALERT_AT: f64 = 0.0;
const LOW_HUMIDITY_BELOW: f64 = 30.0;
const RAIN_ALERT_AT: f64 = 70.0;

/// Minimum difference between halves, in °C, for a trend to be reported.
const TREND_THRESHOLD: f64 = 1.0;

pub const NO_DATA: &str = "no data available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSummary {
    pub avg_temperature: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub avg_humidity: f64,
    pub avg_precipitation_probability: f64,
    pub total_records: usize,
    pub date_range: DateRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub temperature_trend: Trend,
    pub temperature_change: f64,
}

/// Narrative produced by the completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiInsights {
    pub summary: String,
    #[serde(default)]
    pub trends: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub alerts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherInsights {
    pub summary: InsightSummary,
    pub trends: TrendSummary,
    pub classification: String,
    pub alerts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_insights: Option<AiInsights>,
}

impl WeatherInsights {
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.summary.total_records > 0
    }
}

/// Produces a narrative for already computed statistics. A single attempt;
/// callers fall back to the numeric result on any error.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, insights: &WeatherInsights) -> Result<AiInsights>;
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean over the present values only.
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

/// Computes statistics over `records`, which must be ordered newest first.
///
/// The trend compares the newer half against the older half: a positive
/// change means it got warmer.
#[must_use]
pub fn aggregate(records: &[WeatherLog]) -> WeatherInsights {
    if records.is_empty() {
        return WeatherInsights {
            summary: InsightSummary {
                avg_temperature: 0.0,
                min_temperature: 0.0,
                max_temperature: 0.0,
                avg_humidity: 0.0,
                avg_precipitation_probability: 0.0,
                total_records: 0,
                date_range: DateRange {
                    from: None,
                    to: None,
                },
            },
            trends: TrendSummary {
                temperature_trend: Trend::Stable,
                temperature_change: 0.0,
            },
            classification: NO_DATA.to_string(),
            alerts: Vec::new(),
            ai_insights: None,
        };
    }

    let temperatures = records.iter().map(|r| r.temperature);
    let avg_temperature = mean(temperatures.clone()).unwrap_or_default();
    let min_temperature = temperatures.clone().fold(f64::INFINITY, f64::min);
    let max_temperature = temperatures.fold(f64::NEG_INFINITY, f64::max);
    let avg_humidity = mean(records.iter().filter_map(|r| r.humidity));
    let avg_precipitation = mean(records.iter().filter_map(|r| r.precipitation_probability));

    let from = records.iter().map(|r| r.fetched_at).min();
    let to = records.iter().map(|r| r.fetched_at).max();

    let (temperature_trend, change) = trend(records);

    let mut alerts = Vec::new();
    if max_temperature >= HEAT_ALERT_AT {
        alerts.push(format!(
            "Heat alert: temperatures reached {}°C",
            round1(max_temperature)
        ));
    }
    if min_temperature <= FROST_ALERT_AT {
        alerts.push(format!(
            "Frost alert: temperatures dropped to {}°C",
            round1(min_temperature)
        ));
    }
    if let Some(humidity) = avg_humidity.filter(|h| *h < LOW_HUMIDITY_BELOW) {
        alerts.push(format!(
            "Low humidity alert: average humidity of {}%",
            round1(humidity)
        ));
    }
    if let Some(rain) = avg_precipitation.filter(|p| *p >= RAIN_ALERT_AT) {
        alerts.push(format!(
            "Rain alert: average precipitation probability of {}%",
            round1(rain)
        ));
    }

    WeatherInsights {
        summary: InsightSummary {
            avg_temperature: round1(avg_temperature),
            min_temperature: round1(min_temperature),
            max_temperature: round1(max_temperature),
            avg_humidity: round1(avg_humidity.unwrap_or_default()),
            avg_precipitation_probability: round1(avg_precipitation.unwrap_or_default()),
            total_records: records.len(),
            date_range: DateRange { from, to },
        },
        trends: TrendSummary {
            temperature_trend,
            temperature_change: round1(change),
        },
        classification: classify(avg_temperature, avg_humidity),
        alerts,
        ai_insights: None,
    }
}

fn trend(records: &[WeatherLog]) -> (Trend, f64) {
    if records.len() < 2 {
        return (Trend::Stable, 0.0);
    }

    let mid = records.len() / 2;
    let (newer, older) = records.split_at(mid);
    let newer_avg = mean(newer.iter().map(|r| r.temperature)).unwrap_or_default();
    let older_avg = mean(older.iter().map(|r| r.temperature)).unwrap_or_default();
    let change = newer_avg - older_avg;

    let label = if change > TREND_THRESHOLD {
        Trend::Increasing
    } else if change < -TREND_THRESHOLD {
        Trend::Decreasing
    } else {
        Trend::Stable
    };

    (label, change)
}

fn classify(avg_temperature: f64, avg_humidity: Option<f64>) -> String {
    let band = if avg_temperature < COLD_BELOW {
        "cold"
    } else if avg_temperature < MILD_BELOW {
        "mild"
    } else if avg_temperature < WARM_BELOW {
        "warm"
    } else {
        "hot"
    };

    match avg_humidity {
        Some(h) if h >= HUMID_AT_OR_ABOVE => format!("{band} and humid"),
        Some(h) if h <= DRY_AT_OR_BELOW => format!("{band} and dry"),
        _ => band.to_string(),
    }
}

/// System prompt for the completion API.
pub const SYSTEM_PROMPT: &str = "You are a meteorology assistant for a weather dashboard. \
Given aggregate weather statistics, reply with a single JSON object and nothing else, \
using exactly these keys: \"summary\" (string, two or three sentences), \
\"trends\" (array of strings), \"recommendations\" (array of strings), \
\"alerts\" (array of strings, empty when nothing is notable).";

/// User prompt carrying the statistics as JSON.
pub fn user_prompt(insights: &WeatherInsights) -> Result<String> {
    let stats = serde_json::json!({
        "summary": insights.summary,
        "trends": insights.trends,
        "classification": insights.classification,
        "alerts": insights.alerts,
    });

    Ok(format!(
        "Analyse these weather statistics (temperatures in °C, humidity and \
         precipitation probability in %):\n{}",
        serde_json::to_string_pretty(&stats)?
    ))
}

/// Parses the completion text. Models often wrap JSON in a Markdown fence or
/// add prose around it, so only the outermost object is read.
pub fn parse_ai_insights(content: &str) -> Result<AiInsights> {
    let start = content
        .find('{')
        .context("No JSON object in completion content")?;
    let end = content
        .rfind('}')
        .filter(|end| *end > start)
        .context("Unterminated JSON object in completion content")?;

    let parsed: AiInsights = serde_json::from_str(&content[start..=end])
        .context("Completion content is not valid insight JSON")?;

    if parsed.summary.trim().is_empty() {
        anyhow::bail!("Completion returned an empty summary");
    }

    Ok(parsed)
}
