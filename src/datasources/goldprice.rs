use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::Value as JsonValue;

use super::datasource::{decimal_field, QuoteResult, QuoteSource};
use crate::error::FetchError;
use crate::transport::{fetch_json_with_retry, RetryPolicy};

pub struct GoldpriceSource {
    client: Arc<Client>,
    metal: String,
    currency: String,
    retry: RetryPolicy,
    label: String,
}

impl GoldpriceSource {
    pub fn new(client: Arc<Client>, metal: &str, currency: &str, retry: RetryPolicy) -> GoldpriceSource {
        GoldpriceSource {
            client,
            metal: metal.to_owned(),
            currency: currency.to_owned(),
            retry,
            label: format!("goldprice.org {}/{} (spot)", metal, currency),
        }
    }
}

/// `{"items": [{"xauPrice": 2345.1, "xauClose": 2330.0, ...}]}`
pub fn parse_dbxrates(source_label: &str, metal: &str, response: &JsonValue) -> Result<QuoteResult, FetchError> {
    let item = &response["items"][0];
    if !item.is_object() {
        return Err(FetchError::data_shape(source_label, "missing items[0]"));
    }
    let prefix = metal.to_ascii_lowercase();
    let last = decimal_field(source_label, &item[prefix.clone() + "Price"], "price")?;
    let prev = decimal_field(source_label, &item[prefix + "Close"], "close").ok();
    Ok(QuoteResult::from_prices(last, prev, source_label))
}

#[async_trait]
impl QuoteSource for GoldpriceSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn attempt(&self) -> Result<QuoteResult, FetchError> {
        let url = format!("https://data-asg.goldprice.org/dbXRates/{}", &self.currency);
        let response = fetch_json_with_retry(&self.client, &url, &self.retry).await?;
        info!("Goldprice: {}", response);
        parse_dbxrates(&self.label, &self.metal, &response)
    }
}
