//! Domain Models
//!
//! Core data types for economic time series and stock quotes. Values
//! are plain f64 readings as served by the upstream APIs; field names
//! on the wire keep the camelCase shape clients already consume.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One observation of a time series
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Observation date
    pub date: NaiveDate,

    /// Observation value; always finite
    pub value: f64,
}

/// A full economic time series with metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeriesData {
    /// Series identifier (e.g., "CPIAUCSL")
    pub id: String,

    /// Display title, Korean where a translation exists
    pub title: String,

    /// Unit label (e.g., "Percent")
    pub units: String,

    /// Observation frequency (e.g., "Monthly")
    pub frequency: String,

    /// Observations, ascending by date, no duplicate dates
    pub data: Vec<SeriesPoint>,

    /// Upstream last-updated stamp
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}

impl SeriesData {
    /// Latest observation, if any
    pub fn latest(&self) -> Option<&SeriesPoint> {
        self.data.last()
    }
}

/// Series metadata without observations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeriesInfo {
    /// Series identifier
    pub id: String,

    /// Display title
    pub title: String,

    /// Short description
    pub description: String,

    /// Catalog category, when curated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A stock quote with six months of daily closes
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Ticker symbol (e.g., "AAPL")
    pub ticker: String,

    /// Company name
    pub name: String,

    /// Latest price
    pub price: f64,

    /// Previous session close
    pub previous_close: f64,

    /// Change vs previous close
    pub change: f64,

    /// Change vs previous close, percent
    pub change_percent: f64,

    /// Market capitalization, when the upstream exposes it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,

    /// GICS sector; empty when unknown
    pub sector: String,

    /// Industry; empty when unknown
    pub industry: String,

    /// Daily close history, ascending
    pub history: Vec<SeriesPoint>,
}

/// A ticker search match
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TickerMatch {
    pub symbol: String,
    pub name: String,
}

/// One holding in the portfolio block a chat request may carry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortfolioHolding {
    /// Ticker symbol
    pub ticker: String,

    /// Shares held
    pub quantity: f64,

    /// Average purchase price, USD
    #[serde(rename = "avgPrice", skip_serializing_if = "Option::is_none")]
    pub avg_price: Option<f64>,
}

/// Round to two decimal places, the upstream display convention
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Two decimals with thousands separators, keeping the minus sign
pub(crate) fn comma_sep(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}
