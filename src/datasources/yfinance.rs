use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use log::info;
use rust_decimal::{prelude::FromPrimitive, Decimal};

use super::datasource::{Observation, QuoteResult, QuoteSource, Series};
use crate::error::{FetchError, TransportError};
use crate::transport::{retry_with_backoff, RetryPolicy};

pub struct YahooFinanceSource {
    connector: Arc<yahoo_finance_api::YahooConnector>,
    ticker: String,
    retry: RetryPolicy,
    label: String,
}

impl YahooFinanceSource {
    pub fn new(
        connector: Arc<yahoo_finance_api::YahooConnector>,
        ticker: &str,
        label: &str,
        retry: RetryPolicy,
    ) -> YahooFinanceSource {
        YahooFinanceSource {
            connector,
            ticker: ticker.to_owned(),
            retry,
            label: label.to_owned(),
        }
    }
}

/// Daily `(unix timestamp, close)` bars to a series. Non-finite closes are dropped.
pub fn closes_to_series(bars: impl IntoIterator<Item = (i64, f64)>) -> Series {
    Series::new(
        bars.into_iter()
            .filter_map(|(ts, close)| {
                Some(Observation {
                    date: DateTime::from_timestamp(ts, 0)?.date_naive(),
                    value: Some(close)
                        .filter(|c| c.is_finite())
                        .and_then(Decimal::from_f64)?,
                })
            })
            .collect(),
    )
}

#[async_trait]
impl QuoteSource for YahooFinanceSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn attempt(&self) -> Result<QuoteResult, FetchError> {
        let response = retry_with_backoff(&self.retry, |_| {
            self.connector.get_quote_range(&self.ticker, "1d", "5d")
        })
        .await
        .map_err(|e| {
            TransportError::new(
                &format!("yahoo chart {}", self.ticker),
                self.retry.max_attempts,
                e,
            )
        })?;
        let quotes = response
            .quotes()
            .map_err(|e| FetchError::data_shape(&self.label, e.to_string()))?;
        info!("Yahoo: {} {:?}", &self.ticker, &quotes);
        closes_to_series(quotes.iter().map(|q| (q.timestamp, q.close))).to_quote(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_closes_to_series_orders_by_timestamp() {
        // 2024-03-04, 2024-03-05 and 2024-03-01 at 14:30 UTC, out of order.
        let series = closes_to_series(vec![
            (1709562600, 14.33),
            (1709649000, 15.0),
            (1709303400, f64::NAN),
            (1709303400 - 86400, 12.0),
        ]);
        assert_eq!(series.len(), 3);
        let quote = series.to_quote("Yahoo Finance ^VIX").unwrap();
        assert_eq!(quote.price, Decimal::from(15));
        assert_eq!(quote.change_percent, Some(Decimal::from_str("4.68").unwrap()));
    }

    #[test]
    fn test_no_bars_is_data_shape_error() {
        let series = closes_to_series(Vec::new());
        assert!(matches!(
            series.to_quote("Yahoo Finance ^VIX"),
            Err(FetchError::DataShape { .. })
        ));
    }
}
