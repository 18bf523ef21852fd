//! # fedterm-data
//!
//! Economic data domain for the FRED terminal: series access with a
//! keyless mock fallback, stock quotes, the indicator search pipeline,
//! Korean series titles, and the agent tools that expose all of it to
//! the model.
//!
//! ## Data flow
//!
//! ```text
//!   model tool call
//!        │
//!        ▼
//!  ┌──────────────┐     ┌────────────┐     ┌─────────────────┐
//!  │ agent tools  │ ──▶ │ FredClient │ ──▶ │ FRED API / mock │
//!  │ (tools::*)   │     └────────────┘     └─────────────────┘
//!  │              │     ┌────────────┐     ┌─────────────────┐
//!  │              │ ──▶ │ StockClient│ ──▶ │ Yahoo chart API │
//!  └──────────────┘     └────────────┘     └─────────────────┘
//!        │
//!        ▼
//!  Korean summary text + structured series payload
//! ```
//!
//! Without a FRED API key every series request serves generated mock
//! data with a realistic shape, so the whole stack runs offline.

pub mod catalog;
pub mod error;
pub mod fred;
pub mod model;
pub mod prompts;
pub mod search;
pub mod stocks;
pub mod tools;
pub mod translate;

pub use error::{DataError, Result};
pub use fred::FredClient;
pub use model::{PortfolioHolding, Quote, SeriesData, SeriesInfo, SeriesPoint, TickerMatch};
pub use search::{SearchOutcome, SearchPipeline};
pub use stocks::StockClient;
pub use tools::{EconomicDataTool, IndicatorSearchTool, StockDataTool};
pub use translate::Translator;
