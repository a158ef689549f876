use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::Tool;
use crate::registry::{Concurrency, ToolHandler, ToolRegistry};

pub const YAHOO_FINANCE_HOST: &str = "https://query1.finance.yahoo.com";

/// Thin client over the Yahoo Finance quote endpoint
///
/// Holds no per-request state, so the tools built on it may run concurrently.
#[derive(Clone)]
pub struct StockClient {
    client: Client,
    host: String,
}

impl StockClient {
    pub fn new<S: Into<String>>(host: S) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("reagent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            host: host.into(),
        })
    }

    async fn quote(&self, ticker: &str) -> AgentResult<Value> {
        let url = format!("{}/v7/finance/quote", self.host.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("symbols", ticker)])
            .send()
            .await
            .map_err(|e| AgentError::ExecutionError(format!("Quote request failed: {}", e)))?;

        if response.status() != StatusCode::OK {
            return Err(AgentError::ExecutionError(format!(
                "Quote request for {} failed with status {}",
                ticker,
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::ExecutionError(format!("Invalid quote response: {}", e)))?;

        body.pointer("/quoteResponse/result/0")
            .cloned()
            .ok_or_else(|| AgentError::ExecutionError(format!("No quote found for {}", ticker)))
    }

    /// Current market price, null when the exchange reports none
    pub async fn stock_price(&self, ticker: &str) -> AgentResult<Value> {
        let quote = self.quote(ticker).await?;
        let current_price = quote
            .get("regularMarketPrice")
            .cloned()
            .unwrap_or(Value::Null);
        Ok(json!({"ticker": ticker, "current_price": current_price}))
    }

    /// Next dividend date as `YYYY-MM-DD`, null for stocks without one
    pub async fn dividend_date(&self, ticker: &str) -> AgentResult<Value> {
        let quote = self.quote(ticker).await?;
        let dividend_date = quote
            .get("dividendDate")
            .and_then(|d| d.as_i64())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|date| date.date_naive().to_string());
        Ok(json!({"ticker": ticker, "dividend_date": dividend_date}))
    }
}

fn ticker_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "ticker": {
                "type": "string",
                "description": "The ticker symbol for the stock, e.g. GOOG"
            }
        },
        "required": ["ticker"]
    })
}

fn ticker_argument(arguments: &Value) -> AgentResult<String> {
    arguments
        .get("ticker")
        .and_then(|t| t.as_str())
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AgentError::InvalidParameters("Missing required string 'ticker'".into()))
}

pub struct StockPriceTool {
    client: StockClient,
}

#[async_trait]
impl ToolHandler for StockPriceTool {
    async fn call(&self, arguments: Value) -> AgentResult<Content> {
        let ticker = ticker_argument(&arguments)?;
        self.client.stock_price(&ticker).await.map(Content::json)
    }

    fn concurrency(&self) -> Concurrency {
        Concurrency::Shared
    }
}

pub struct DividendDateTool {
    client: StockClient,
}

#[async_trait]
impl ToolHandler for DividendDateTool {
    async fn call(&self, arguments: Value) -> AgentResult<Content> {
        let ticker = ticker_argument(&arguments)?;
        self.client.dividend_date(&ticker).await.map(Content::json)
    }

    fn concurrency(&self) -> Concurrency {
        Concurrency::Shared
    }
}

/// Register `get_stock_price` and `get_dividend_date` backed by one client
pub fn register(registry: &mut ToolRegistry, client: StockClient) -> AgentResult<()> {
    registry.register(
        Tool::new(
            "get_stock_price",
            "Use this function to get the current price of a stock.",
            ticker_schema(),
        ),
        StockPriceTool {
            client: client.clone(),
        },
    )?;
    registry.register(
        Tool::new(
            "get_dividend_date",
            "Use this function to get the next dividend payment date of a stock.",
            ticker_schema(),
        ),
        DividendDateTool { client },
    )
}
