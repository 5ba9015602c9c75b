use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::Value as JsonValue;

use super::datasource::{QuoteResult, QuoteSource, Series};
use crate::error::FetchError;
use crate::transport::{fetch_json_with_retry, fetch_text_with_retry, RetryPolicy};

const FRED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Something that can return a whole time series by id.
#[async_trait]
pub trait SeriesProvider: Sync + Send {
    fn name(&self) -> &str;

    async fn series(&self, series_id: &str) -> Result<Series, FetchError>;
}

/// FRED observations API. Needs an API key.
pub struct FredApi {
    client: Arc<Client>,
    api_key: Option<String>,
    retry: RetryPolicy,
    base_url: String,
}

impl FredApi {
    pub fn new(client: Arc<Client>, api_key: Option<String>, retry: RetryPolicy) -> FredApi {
        FredApi {
            client,
            api_key,
            retry,
            base_url: "https://api.stlouisfed.org/fred/series/observations".to_owned(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> FredApi {
        self.base_url = base_url.to_owned();
        self
    }
}

#[async_trait]
impl SeriesProvider for FredApi {
    fn name(&self) -> &str {
        "FRED"
    }

    async fn series(&self, series_id: &str) -> Result<Series, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(FetchError::Config("FRED_API_KEY"))?;
        let url = format!(
            "{}?series_id={}&api_key={}&file_type=json&sort_order=desc&limit=30",
            self.base_url, series_id, api_key
        );
        let response = fetch_json_with_retry(&self.client, &url, &self.retry).await?;
        parse_observations(&format!("FRED {}", series_id), &response)
    }
}

/// `{"observations": [{"date": "2024-03-01", "value": "13.20"}, ...]}` in any order.
pub fn parse_observations(source_label: &str, response: &JsonValue) -> Result<Series, FetchError> {
    if let Some(message) = response["error_message"].as_str() {
        return Err(FetchError::data_shape(source_label, message));
    }
    let observations = response["observations"]
        .as_array()
        .ok_or_else(|| FetchError::data_shape(source_label, "missing observations array"))?;
    let series = Series::from_raw(
        observations.iter().filter_map(|o| Some((o["date"].as_str()?, o["value"].as_str()?))),
        FRED_DATE_FORMAT,
    );
    info!(
        "{}: {} valid of {} observations",
        source_label,
        series.len(),
        observations.len()
    );
    Ok(series)
}

/// FRED graph CSV download. Keyless.
pub struct FredCsv {
    client: Arc<Client>,
    retry: RetryPolicy,
    base_url: String,
}

impl FredCsv {
    pub fn new(client: Arc<Client>, retry: RetryPolicy) -> FredCsv {
        FredCsv {
            client,
            retry,
            base_url: "https://fred.stlouisfed.org/graph/fredgraph.csv".to_owned(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> FredCsv {
        self.base_url = base_url.to_owned();
        self
    }
}

#[async_trait]
impl SeriesProvider for FredCsv {
    fn name(&self) -> &str {
        "FRED graph CSV"
    }

    async fn series(&self, series_id: &str) -> Result<Series, FetchError> {
        let url = format!("{}?id={}", self.base_url, series_id);
        let body = fetch_text_with_retry(&self.client, &url, &self.retry).await?;
        parse_fredgraph_csv(&format!("FRED graph CSV {}", series_id), series_id, &body)
    }
}

/// Header is `observation_date,<ID>` (older exports use `DATE,<ID>`); missing values are `.`.
pub fn parse_fredgraph_csv(
    source_label: &str,
    series_id: &str,
    body: &str,
) -> Result<Series, FetchError> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| FetchError::data_shape(source_label, e.to_string()))?
        .clone();
    let value_col = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(series_id))
        .ok_or_else(|| {
            FetchError::data_shape(source_label, format!("no {} column in CSV header", series_id))
        })?;

    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| FetchError::data_shape(source_label, e.to_string()))?;
    Ok(Series::from_raw(
        records
            .iter()
            .filter_map(|r| Some((r.get(0)?, r.get(value_col)?))),
        FRED_DATE_FORMAT,
    ))
}

/// Latest value of one series from any [`SeriesProvider`].
pub struct SeriesQuoteSource {
    provider: Arc<dyn SeriesProvider>,
    series_id: String,
    label: String,
}

impl SeriesQuoteSource {
    pub fn new(provider: Arc<dyn SeriesProvider>, series_id: &str, label: &str) -> SeriesQuoteSource {
        SeriesQuoteSource {
            provider,
            series_id: series_id.to_owned(),
            label: label.to_owned(),
        }
    }
}

#[async_trait]
impl QuoteSource for SeriesQuoteSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn attempt(&self) -> Result<QuoteResult, FetchError> {
        self.provider
            .series(&self.series_id)
            .await?
            .to_quote(&self.label)
    }
}
