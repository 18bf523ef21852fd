//! Agent Tools
//!
//! Domain tools implementing `fedterm_agent::Tool` for the terminal:
//! FRED series fetch, stock quotes, and indicator search.

mod economic_data;
mod indicator_search;
mod stock_data;

pub use economic_data::EconomicDataTool;
pub use indicator_search::IndicatorSearchTool;
pub use stock_data::StockDataTool;
