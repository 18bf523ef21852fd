//! Stock Data Tool
//!
//! Fetches a quote with six months of history and renders the Korean
//! summary the model answers from. Fetch failures become readable
//! result strings rather than turn-ending errors.

use std::sync::Arc;

use async_trait::async_trait;

use fedterm_agent::{
    Result as AgentResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema,
};

use crate::model::comma_sep;
use crate::stocks::StockClient;

/// Tool for fetching stock quotes
pub struct StockDataTool {
    stocks: Arc<StockClient>,
}

impl StockDataTool {
    pub fn new(stocks: Arc<StockClient>) -> Self {
        Self { stocks }
    }
}

#[async_trait]
impl Tool for StockDataTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_stock_data".into(),
            description: "Fetch stock market data for a given ticker symbol. Use this tool \
                          when the user asks about a specific stock, company, or wants to \
                          correlate stock prices with economic indicators."
                .into(),
            parameters: vec![ParameterSchema {
                name: "ticker".into(),
                param_type: "string".into(),
                description: "The stock ticker symbol (e.g., AAPL, MSFT, TSLA, NVDA)".into(),
                required: true,
            }],
        }
    }

    async fn execute(&self, call: &ToolCall) -> AgentResult<ToolResult> {
        let ticker = call.str_arg("ticker").unwrap_or("AAPL");

        let quote = match self.stocks.quote(ticker).await {
            Ok(quote) => quote,
            Err(e) => {
                return Ok(ToolResult::failure(
                    "get_stock_data",
                    format!("종목 {ticker} 데이터를 가져올 수 없습니다: {e}"),
                ));
            }
        };
        if quote.price == 0.0 {
            return Ok(ToolResult::failure(
                "get_stock_data",
                format!("종목 {ticker}에 대한 가격 정보를 찾을 수 없습니다."),
            ));
        }

        let emoji = if quote.change >= 0.0 { "📈" } else { "📉" };
        let mut summary = format!(
            "{emoji} **{}** ({})\n\
             - 현재가: **${}**\n\
             - 전일 대비: {}{} ({}{:.2}%)\n\
             - 섹터: {}\n\
             - 산업: {}\n",
            quote.name,
            quote.ticker,
            comma_sep(quote.price),
            sign(quote.change),
            comma_sep(quote.change),
            sign(quote.change_percent),
            quote.change_percent,
            or_na(&quote.sector),
            or_na(&quote.industry),
        );

        if let Some(cap) = quote.market_cap {
            if cap > 0.0 {
                summary.push_str(&format!("- 시가총액: {}\n", cap_label(cap)));
            }
        }

        if quote.history.len() >= 2 {
            let first = quote.history[0];
            let last = quote.history[quote.history.len() - 1];
            let period_change = if first.value == 0.0 {
                0.0
            } else {
                (last.value - first.value) / first.value * 100.0
            };
            summary.push_str(&format!(
                "- 6개월 수익률: {}{:.1}%\n",
                sign(period_change),
                period_change
            ));
            summary.push_str(&format!(
                "- 기간: {} ~ {} ({}일)\n",
                first.date,
                last.date,
                quote.history.len()
            ));
        }

        Ok(ToolResult::success("get_stock_data", summary))
    }
}

fn sign(value: f64) -> &'static str {
    if value >= 0.0 { "+" } else { "" }
}

fn or_na(value: &str) -> &str {
    if value.is_empty() { "N/A" } else { value }
}

fn cap_label(cap: f64) -> String {
    if cap >= 1e12 {
        format!("${:.1}T", cap / 1e12)
    } else if cap >= 1e9 {
        format!("${:.1}B", cap / 1e9)
    } else {
        format!("${:.0}M", cap / 1e6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_label() {
        assert_eq!(cap_label(2.5e12), "$2.5T");
        assert_eq!(cap_label(3.2e9), "$3.2B");
        assert_eq!(cap_label(4.56e8), "$456M");
    }

    #[test]
    fn test_or_na() {
        assert_eq!(or_na(""), "N/A");
        assert_eq!(or_na("Technology"), "Technology");
    }

    #[test]
    fn test_schema_requires_ticker() {
        let tool = StockDataTool::new(Arc::new(StockClient::new()));
        let schema = tool.schema();
        assert_eq!(schema.name, "get_stock_data");
        assert!(schema.parameters[0].required);
    }
}
