//! Stock Quotes
//!
//! Pulls quotes and six months of daily closes from the public Yahoo
//! chart endpoint. No credential is required; failures propagate and
//! the tool layer renders them as result strings.

use chrono::DateTime;
use serde_json::Value;

use crate::error::{DataError, Result};
use crate::model::{Quote, SeriesPoint, TickerMatch, round2};

const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Popular tickers surfaced by search before any live lookup.
pub const POPULAR_TICKERS: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("GOOGL", "Alphabet Inc."),
    ("AMZN", "Amazon.com Inc."),
    ("NVDA", "NVIDIA Corporation"),
    ("TSLA", "Tesla Inc."),
    ("META", "Meta Platforms Inc."),
    ("NFLX", "Netflix Inc."),
    ("JPM", "JPMorgan Chase & Co."),
    ("V", "Visa Inc."),
    ("JNJ", "Johnson & Johnson"),
    ("WMT", "Walmart Inc."),
    ("PG", "Procter & Gamble Co."),
    ("MA", "Mastercard Inc."),
    ("DIS", "The Walt Disney Company"),
    ("BAC", "Bank of America Corp."),
    ("XOM", "Exxon Mobil Corporation"),
    ("COST", "Costco Wholesale Corp."),
    ("KO", "The Coca-Cola Company"),
    ("PEP", "PepsiCo Inc."),
];

/// Yahoo chart client
pub struct StockClient {
    base_url: String,
    http: reqwest::Client,
}

impl StockClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent(concat!("fedterm/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            base_url: YAHOO_BASE_URL.into(),
            http,
        }
    }

    /// Quote with six months of daily history for a ticker.
    pub async fn quote(&self, ticker: &str) -> Result<Quote> {
        let symbol = ticker.trim().to_ascii_uppercase();
        let payload: Value = self
            .http
            .get(format!("{}/v8/finance/chart/{symbol}", self.base_url))
            .query(&[("range", "6mo"), ("interval", "1d")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        quote_from_chart(&symbol, &payload)
    }

    /// Ticker search: substring match over the popular table, plus one
    /// live lookup when the query itself looks like a symbol.
    pub async fn search_tickers(&self, query: &str) -> Vec<TickerMatch> {
        let mut results = match_popular(query);

        let q = query.trim().to_ascii_uppercase();
        let looks_like_symbol =
            (1..=5).contains(&q.len()) && q.chars().all(|c| c.is_ascii_alphabetic());
        if looks_like_symbol && !results.iter().any(|m| m.symbol == q) {
            if let Ok(quote) = self.quote(&q).await {
                if !quote.name.eq_ignore_ascii_case(&q) {
                    results.insert(
                        0,
                        TickerMatch {
                            symbol: q,
                            name: quote.name,
                        },
                    );
                }
            }
        }

        results.truncate(20);
        results
    }
}

impl Default for StockClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Substring match against the popular-ticker table. An empty query
/// matches everything.
fn match_popular(query: &str) -> Vec<TickerMatch> {
    let q_upper = query.trim().to_ascii_uppercase();
    let q_lower = query.trim().to_lowercase();

    POPULAR_TICKERS
        .iter()
        .filter(|(symbol, name)| {
            symbol.contains(&q_upper) || name.to_lowercase().contains(&q_lower)
        })
        .map(|(symbol, name)| TickerMatch {
            symbol: (*symbol).to_owned(),
            name: (*name).to_owned(),
        })
        .collect()
}

/// Build a quote from a Yahoo chart payload. The previous close prefers
/// the meta field, then the penultimate daily close, then the chart-wide
/// previous close.
fn quote_from_chart(symbol: &str, payload: &Value) -> Result<Quote> {
    let result = payload
        .pointer("/chart/result/0")
        .ok_or_else(|| DataError::TickerNotFound(symbol.to_owned()))?;
    let meta = result.get("meta").cloned().unwrap_or_default();

    let timestamps = result
        .get("timestamp")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let closes = result
        .pointer("/indicators/quote/0/close")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut history = Vec::with_capacity(timestamps.len());
    for (ts, close) in timestamps.iter().zip(closes.iter()) {
        let (Some(ts), Some(value)) = (ts.as_i64(), close.as_f64()) else {
            continue;
        };
        let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
            continue;
        };
        history.push(SeriesPoint {
            date,
            value: round2(value),
        });
    }

    let price = meta
        .get("regularMarketPrice")
        .and_then(Value::as_f64)
        .or_else(|| history.last().map(|p| p.value))
        .ok_or_else(|| DataError::Payload(format!("no price in chart payload for {symbol}")))?;
    let previous_close = meta
        .get("previousClose")
        .and_then(Value::as_f64)
        .or_else(|| (history.len() >= 2).then(|| history[history.len() - 2].value))
        .or_else(|| meta.get("chartPreviousClose").and_then(Value::as_f64))
        .unwrap_or(price);

    let change = price - previous_close;
    let change_percent = if previous_close == 0.0 {
        0.0
    } else {
        change / previous_close * 100.0
    };

    let name = meta
        .get("shortName")
        .and_then(Value::as_str)
        .or_else(|| meta.get("longName").and_then(Value::as_str))
        .map(str::to_owned)
        .or_else(|| {
            POPULAR_TICKERS
                .iter()
                .find(|(s, _)| *s == symbol)
                .map(|(_, n)| (*n).to_owned())
        })
        .unwrap_or_else(|| symbol.to_owned());

    Ok(Quote {
        ticker: symbol.to_owned(),
        name,
        price: round2(price),
        previous_close: round2(previous_close),
        change: round2(change),
        change_percent: round2(change_percent),
        market_cap: meta.get("marketCap").and_then(Value::as_f64),
        sector: String::new(),
        industry: String::new(),
        history,
    })
}
