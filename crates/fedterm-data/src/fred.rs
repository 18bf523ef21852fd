//! FRED Data Adapter
//!
//! Fetches series metadata and observations from the FRED API when a key
//! is configured, and falls back to generated mock series otherwise so
//! the terminal runs end to end without credentials. Upstream failures
//! on the data path also fall back to mock rather than surfacing errors.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;
use serde_json::Value;

use crate::error::{DataError, Result};
use crate::model::{SeriesData, SeriesInfo, SeriesPoint, round2};
use crate::translate::{Translator, korean_title};

const FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred";

/// FRED client with keyless mock fallback
pub struct FredClient {
    api_key: Option<String>,
    base_url: String,
    http: reqwest::Client,
    translator: Arc<Translator>,
}

impl FredClient {
    pub fn new(api_key: Option<String>, translator: Arc<Translator>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: FRED_BASE_URL.into(),
            http,
            translator,
        }
    }

    /// Whether a FRED API key is configured
    pub fn is_live(&self) -> bool {
        self.api_key.is_some()
    }

    /// Time-series observations for a series. Never fails: keyless mode
    /// and upstream errors both serve mock data.
    pub async fn series_data(&self, series_id: &str) -> SeriesData {
        let Some(key) = self.api_key.as_deref() else {
            return mock_series(series_id);
        };
        match self.fetch_series(series_id, key).await {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(series = %series_id, error = %e, "FRED fetch failed, serving mock data");
                mock_series(series_id)
            }
        }
    }

    /// Series metadata. None in keyless mode or on upstream failure; no
    /// mock metadata is fabricated.
    pub async fn series_info(&self, series_id: &str) -> Option<SeriesInfo> {
        let key = self.api_key.as_deref()?;
        match self.fetch_info(series_id, key).await {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!(series = %series_id, error = %e, "FRED metadata fetch failed");
                None
            }
        }
    }

    /// Full-text series search. Empty in keyless mode or on failure.
    pub async fn search(&self, query: &str) -> Vec<SeriesInfo> {
        let Some(key) = self.api_key.as_deref() else {
            return Vec::new();
        };
        match self.fetch_search(query, key).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "FRED search failed");
                Vec::new()
            }
        }
    }

    async fn fetch_series(&self, series_id: &str, key: &str) -> Result<SeriesData> {
        let info: Value = self
            .http
            .get(format!("{}/series", self.base_url))
            .query(&[
                ("series_id", series_id),
                ("api_key", key),
                ("file_type", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let meta = info
            .get("seriess")
            .and_then(Value::as_array)
            .and_then(|s| s.first())
            .ok_or_else(|| DataError::SeriesNotFound(series_id.to_owned()))?;

        let observations: Value = self
            .http
            .get(format!("{}/series/observations", self.base_url))
            .query(&[
                ("series_id", series_id),
                ("api_key", key),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", "100"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Newest-first from the API, stored oldest-first.
        let mut points = parse_observations(&observations)?;
        points.reverse();

        let english_title = meta.get("title").and_then(Value::as_str).unwrap_or(series_id);
        let title = self.translator.title_for(series_id, english_title).await;

        Ok(SeriesData {
            id: series_id.to_owned(),
            title,
            units: meta
                .get("units")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            frequency: meta
                .get("frequency")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            data: points,
            last_updated: meta
                .get("last_updated")
                .and_then(Value::as_str)
                .and_then(|s| s.split(' ').next())
                .unwrap_or_default()
                .to_owned(),
        })
    }

    async fn fetch_info(&self, series_id: &str, key: &str) -> Result<SeriesInfo> {
        let payload: Value = self
            .http
            .get(format!("{}/series", self.base_url))
            .query(&[
                ("series_id", series_id),
                ("api_key", key),
                ("file_type", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        payload
            .get("seriess")
            .and_then(Value::as_array)
            .and_then(|s| s.first())
            .map(series_info_from)
            .ok_or_else(|| DataError::SeriesNotFound(series_id.to_owned()))
    }

    async fn fetch_search(&self, query: &str, key: &str) -> Result<Vec<SeriesInfo>> {
        let payload: Value = self
            .http
            .get(format!("{}/series/search", self.base_url))
            .query(&[
                ("search_text", query),
                ("api_key", key),
                ("file_type", "json"),
                ("limit", "20"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(payload
            .get("seriess")
            .and_then(Value::as_array)
            .map(|series| series.iter().map(series_info_from).collect())
            .unwrap_or_default())
    }
}

/// Map one FRED `seriess` entry to metadata, applying static Korean
/// titles and carrying the frequency string as the category.
fn series_info_from(entry: &Value) -> SeriesInfo {
    let id = entry
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let english_title = entry.get("title").and_then(Value::as_str).unwrap_or_default();

    SeriesInfo {
        title: korean_title(&id, english_title),
        description: entry
            .get("notes")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        category: entry
            .get("frequency")
            .and_then(Value::as_str)
            .map(str::to_owned),
        id,
    }
}

/// Parse FRED observations, skipping the "." missing-value sentinel and
/// anything unparsable.
fn parse_observations(payload: &Value) -> Result<Vec<SeriesPoint>> {
    let observations = payload
        .get("observations")
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::Payload("missing observations array".into()))?;

    let mut points = Vec::with_capacity(observations.len());
    for obs in observations {
        let Some(raw) = obs.get("value").and_then(Value::as_str) else {
            continue;
        };
        if raw == "." {
            continue;
        }
        let Ok(value) = raw.parse::<f64>() else {
            continue;
        };
        let Some(date) = obs
            .get("date")
            .and_then(Value::as_str)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        else {
            continue;
        };
        points.push(SeriesPoint { date, value });
    }
    Ok(points)
}

struct MockProfile {
    base: f64,
    trend: f64,
    vol: f64,
    title: String,
    units: &'static str,
    frequency: &'static str,
}

fn mock_profile(sid: &str, raw_id: &str) -> MockProfile {
    let preset = |base, trend, vol, title: &str, units, frequency| MockProfile {
        base,
        trend,
        vol,
        title: title.to_owned(),
        units,
        frequency,
    };

    match sid {
        "GDP" => preset(20000.0, 100.0, 50.0, "국내총생산 (GDP)", "Billions of Dollars", "Quarterly"),
        "CPIAUCSL" => preset(250.0, 0.8, 0.5, "소비자물가지수 (CPI)", "Index 1982-1984=100", "Monthly"),
        "UNRATE" => preset(4.0, 0.0, 0.2, "실업률", "Percent", "Monthly"),
        "FEDFUNDS" => preset(5.33, -0.1, 0.1, "연방기금금리", "Percent", "Monthly"),
        "SP500" => preset(4500.0, 20.0, 100.0, "S&P 500", "Index", "Daily"),
        "DGS10" => preset(4.2, -0.02, 0.1, "미 국채 10년 금리", "Percent", "Daily"),
        "M2SL" => preset(21000.0, 50.0, 30.0, "M2 통화량", "Billions of Dollars", "Monthly"),
        "DCOILWTICO" => preset(75.0, -0.5, 3.0, "WTI 원유 현물 가격", "Dollars per Barrel", "Daily"),
        "VIXCLS" => preset(18.0, 0.0, 3.0, "VIX 변동성 지수", "Index", "Daily"),
        _ => MockProfile {
            base: 100.0,
            trend: 1.0,
            vol: 5.0,
            title: korean_title(sid, &format!("Series: {raw_id}")),
            units: "Index",
            frequency: "Monthly",
        },
    }
}

/// Generate a 51-point mock series ending today. The shape is fixed
/// (count, ascending dates, 30- or 90-day spacing); values are a random
/// walk around the preset level, except UNRATE which follows a
/// sine-plus-noise path.
pub(crate) fn mock_series(series_id: &str) -> SeriesData {
    let sid = series_id.to_ascii_uppercase();
    let profile = mock_profile(&sid, series_id);

    let today = Utc::now().date_naive();
    let step_months: i64 = if profile.frequency == "Quarterly" { 3 } else { 1 };
    let mut rng = rand::thread_rng();
    let mut value = profile.base;
    let mut points = Vec::with_capacity(51);

    for i in (0..=50i64).rev() {
        let date = today - Duration::days(i * step_months * 30);
        if sid == "UNRATE" {
            value = 4.0 + (i as f64 / 10.0).sin() + rng.gen_range(0.0..0.2);
        } else {
            value += rng.gen_range(-0.5..0.5) * profile.vol + profile.trend;
        }
        points.push(SeriesPoint {
            date,
            value: round2(value),
        });
    }

    SeriesData {
        id: series_id.to_owned(),
        title: profile.title,
        units: profile.units.to_owned(),
        frequency: profile.frequency.to_owned(),
        data: points,
        last_updated: today.format("%Y-%m-%d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mock_series_shape() {
        let series = mock_series("CPIAUCSL");
        assert_eq!(series.data.len(), 51);
        assert_eq!(series.title, "소비자물가지수 (CPI)");
        assert_eq!(series.frequency, "Monthly");

        let today = Utc::now().date_naive();
        assert_eq!(series.data.last().map(|p| p.date), Some(today));
        for pair in series.data.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(30));
        }
    }

    #[test]
    fn test_mock_quarterly_spacing() {
        let series = mock_series("GDP");
        assert_eq!(series.data.len(), 51);
        assert_eq!(series.frequency, "Quarterly");
        for pair in series.data.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(90));
        }
    }

    #[test]
    fn test_mock_preset_lookup_ignores_case() {
        let series = mock_series("vixcls");
        assert_eq!(series.id, "vixcls");
        assert_eq!(series.title, "VIX 변동성 지수");
        assert_eq!(series.units, "Index");
    }

    #[test]
    fn test_mock_unknown_series_uses_generic_profile() {
        let series = mock_series("XYZTEST");
        assert_eq!(series.title, "Series: XYZTEST");
        assert_eq!(series.units, "Index");
        assert_eq!(series.frequency, "Monthly");
        assert_eq!(series.data.len(), 51);
    }

    #[test]
    fn test_mock_unrate_stays_in_band() {
        let series = mock_series("UNRATE");
        for point in &series.data {
            assert!(point.value > 2.5 && point.value < 5.5, "out of band: {}", point.value);
        }
    }

    #[test]
    fn test_parse_observations_filters_sentinels() {
        let payload = json!({
            "observations": [
                {"date": "2025-06-01", "value": "3.1"},
                {"date": "2025-05-01", "value": "."},
                {"date": "2025-04-01", "value": "not-a-number"},
                {"date": "2025-03-01", "value": "2.9"},
            ]
        });
        let points = parse_observations(&payload).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 3.1);
        assert_eq!(points[1].value, 2.9);
    }

    #[test]
    fn test_parse_observations_requires_array() {
        let payload = json!({"error_message": "Bad Request"});
        assert!(parse_observations(&payload).is_err());
    }
}
