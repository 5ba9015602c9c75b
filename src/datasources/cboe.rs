use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use super::datasource::{QuoteResult, QuoteSource, Series};
use crate::error::FetchError;
use crate::transport::{fetch_text_with_retry, RetryPolicy};

const VIX_HISTORY_URL: &str = "https://cdn.cboe.com/api/global/us_indices/daily_prices/VIX_History.csv";

/// CBOE's published VIX daily history. Keyless CSV.
pub struct CboeVixSource {
    client: Arc<Client>,
    retry: RetryPolicy,
}

impl CboeVixSource {
    pub fn new(client: Arc<Client>, retry: RetryPolicy) -> CboeVixSource {
        CboeVixSource { client, retry }
    }
}

/// `DATE,OPEN,HIGH,LOW,CLOSE` with `MM/DD/YYYY` dates.
pub fn parse_vix_history(source_label: &str, body: &str) -> Result<Series, FetchError> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| FetchError::data_shape(source_label, e.to_string()))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| FetchError::data_shape(source_label, format!("no {} column", name)))
    };
    let (date_col, close_col) = (column("DATE")?, column("CLOSE")?);

    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| FetchError::data_shape(source_label, e.to_string()))?;
    Ok(Series::from_raw(
        records
            .iter()
            .filter_map(|r| Some((r.get(date_col)?, r.get(close_col)?))),
        "%m/%d/%Y",
    ))
}

#[async_trait]
impl QuoteSource for CboeVixSource {
    fn label(&self) -> &str {
        "CBOE VIX history (daily close)"
    }

    async fn attempt(&self) -> Result<QuoteResult, FetchError> {
        let body = fetch_text_with_retry(&self.client, VIX_HISTORY_URL, &self.retry).await?;
        parse_vix_history(self.label(), &body)?.to_quote(self.label())
    }
}
