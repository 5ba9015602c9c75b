use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::Value as JsonValue;

use super::datasource::{decimal_field, QuoteResult, QuoteSource};
use crate::error::FetchError;
use crate::transport::{fetch_json_with_retry, RetryPolicy};

/// Twelve Data `/quote` endpoint. Needs an API key.
pub struct TwelveDataSource {
    client: Arc<Client>,
    api_key: Option<String>,
    symbol: String,
    retry: RetryPolicy,
    label: String,
}

impl TwelveDataSource {
    pub fn new(client: Arc<Client>, api_key: Option<String>, symbol: &str, retry: RetryPolicy) -> TwelveDataSource {
        TwelveDataSource {
            client,
            api_key,
            symbol: symbol.to_owned(),
            retry,
            label: format!("Twelve Data {}", symbol),
        }
    }
}

/// Prices come back as strings; errors come back with HTTP 200 and `"status": "error"`.
pub fn parse_quote(source_label: &str, response: &JsonValue) -> Result<QuoteResult, FetchError> {
    if response["status"].as_str() == Some("error") {
        return Err(FetchError::data_shape(
            source_label,
            response["message"].as_str().unwrap_or("error status"),
        ));
    }
    let close = decimal_field(source_label, &response["close"], "close")?;
    let previous_close = decimal_field(source_label, &response["previous_close"], "previous_close").ok();
    Ok(QuoteResult::from_prices(close, previous_close, source_label))
}

#[async_trait]
impl QuoteSource for TwelveDataSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn attempt(&self) -> Result<QuoteResult, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(FetchError::Config("TWELVE_DATA_API_KEY"))?;
        let url = format!(
            "https://api.twelvedata.com/quote?symbol={}&apikey={}",
            self.symbol, api_key
        );
        let response = fetch_json_with_retry(&self.client, &url, &self.retry).await?;
        info!("Twelve Data: {} {}", &self.symbol, response);
        parse_quote(&self.label, &response)
    }
}
