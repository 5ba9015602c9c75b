//! Indicators derived from two series joined on date.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::try_join;
use log::info;
use rust_decimal::Decimal;
use serde_json::json;

use super::datasource::{round2, QuoteResult, QuoteSource, Series};
use super::fred::SeriesProvider;
use crate::error::FetchError;

pub const TEN_YEAR: &str = "DGS10";
pub const TWO_YEAR: &str = "DGS2";
pub const CORPORATE_EQUITIES: &str = "NCBEILQ027S";
pub const GDP: &str = "GDP";

/// Latest date with a valid value in both series.
fn latest_common(a: &Series, b: &Series) -> Option<(NaiveDate, Decimal, Decimal)> {
    a.dates()
        .rev()
        .find_map(|date| Some((date, a.value_on(date)?, b.value_on(date)?)))
}

/// 10-year minus 2-year Treasury constant maturity yield.
pub struct YieldSpreadSource {
    provider: Arc<dyn SeriesProvider>,
    label: String,
}

impl YieldSpreadSource {
    pub fn new(provider: Arc<dyn SeriesProvider>) -> YieldSpreadSource {
        let label = format!("{} {}-{}", provider.name(), TEN_YEAR, TWO_YEAR);
        YieldSpreadSource { provider, label }
    }
}

pub fn yield_spread(label: &str, ten: &Series, two: &Series) -> Result<QuoteResult, FetchError> {
    let (date, ten_year, two_year) = latest_common(ten, two).ok_or_else(|| {
        FetchError::data_shape(label, "no date with both DGS10 and DGS2 observations")
    })?;
    let spread = round2(ten_year - two_year);
    Ok(QuoteResult::new(spread, None, label)
        .with_extra("tenYear", json!(ten_year))
        .with_extra("twoYear", json!(two_year))
        .with_extra("inverted", spread < Decimal::ZERO)
        .with_extra("date", date.to_string()))
}

#[async_trait]
impl QuoteSource for YieldSpreadSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn attempt(&self) -> Result<QuoteResult, FetchError> {
        let (ten, two) = try_join!(
            self.provider.series(TEN_YEAR),
            self.provider.series(TWO_YEAR)
        )?;
        let result = yield_spread(&self.label, &ten, &two)?;
        info!("{}: spread {}", self.label, result.price);
        Ok(result)
    }
}

/// Corporate equities market value over GDP, as a percentage.
pub struct BuffettSource {
    provider: Arc<dyn SeriesProvider>,
    label: String,
}

impl BuffettSource {
    pub fn new(provider: Arc<dyn SeriesProvider>) -> BuffettSource {
        let label = format!("{} {}/{}", provider.name(), CORPORATE_EQUITIES, GDP);
        BuffettSource { provider, label }
    }
}

/// Market value is reported in millions, GDP in billions.
pub fn buffett_ratio(label: &str, market_cap: &Series, gdp: &Series) -> Result<QuoteResult, FetchError> {
    let (date, cap_millions, gdp_billions) = latest_common(market_cap, gdp)
        .ok_or_else(|| FetchError::data_shape(label, "no quarter with both market value and GDP"))?;
    if gdp_billions.is_zero() {
        return Err(FetchError::data_shape(label, "GDP is zero"));
    }
    let cap_billions = cap_millions / Decimal::from(1000);
    let ratio = round2(cap_billions / gdp_billions * Decimal::from(100));
    Ok(QuoteResult::new(ratio, None, label)
        .with_extra("marketCap", json!(round2(cap_billions)))
        .with_extra("gdp", json!(gdp_billions))
        .with_extra("date", date.to_string()))
}

#[async_trait]
impl QuoteSource for BuffettSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn attempt(&self) -> Result<QuoteResult, FetchError> {
        let (market_cap, gdp) = try_join!(
            self.provider.series(CORPORATE_EQUITIES),
            self.provider.series(GDP)
        )?;
        buffett_ratio(&self.label, &market_cap, &gdp)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn series(rows: &[(&'static str, &'static str)]) -> Series {
        Series::from_raw(rows.iter().copied(), "%Y-%m-%d")
    }

    #[test]
    fn test_inverted_spread() {
        let ten = series(&[("2024-03-04", "4.22"), ("2024-03-05", "4.20")]);
        let two = series(&[("2024-03-04", "4.55"), ("2024-03-05", "4.50")]);
        let result = yield_spread("FRED DGS10-DGS2", &ten, &two).unwrap();
        assert_eq!(result.price, Decimal::from_str("-0.30").unwrap());
        assert_eq!(result.extra["inverted"], json!(true));
        assert_eq!(result.extra["date"], json!("2024-03-05"));
        assert_eq!(result.change_percent, None);
    }

    #[test]
    fn test_spread_joins_on_common_date() {
        // DGS2 has not published 03-05 yet; the spread must come from 03-04.
        let ten = series(&[("2024-03-04", "4.22"), ("2024-03-05", "4.20")]);
        let two = series(&[("2024-03-04", "4.02"), ("2024-03-05", ".")]);
        let result = yield_spread("FRED DGS10-DGS2", &ten, &two).unwrap();
        assert_eq!(result.price, Decimal::from_str("0.20").unwrap());
        assert_eq!(result.extra["inverted"], json!(false));
        assert_eq!(result.extra["date"], json!("2024-03-04"));
    }

    #[test]
    fn test_spread_without_overlap() {
        let ten = series(&[("2024-03-05", "4.20")]);
        let two = series(&[("2024-03-04", "4.50")]);
        assert!(matches!(
            yield_spread("FRED DGS10-DGS2", &ten, &two),
            Err(FetchError::DataShape { .. })
        ));
    }

    #[test]
    fn test_buffett_ratio() {
        let cap = series(&[("2023-10-01", "52000000"), ("2024-01-01", "55000000")]);
        let gdp = series(&[("2023-10-01", "27900"), ("2024-01-01", "28300")]);
        let result = buffett_ratio("FRED NCBEILQ027S/GDP", &cap, &gdp).unwrap();
        // 55000 / 28300 * 100
        assert_eq!(result.price, Decimal::from_str("194.35").unwrap());
        assert_eq!(result.extra["date"], json!("2024-01-01"));
    }
}
