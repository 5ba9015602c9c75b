use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::{prelude::FromPrimitive, Decimal, RoundingStrategy};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::FetchError;

/// Marker providers use for a missing observation.
pub const MISSING_SENTINEL: &str = ".";

/// One provider queried for one indicator.
#[async_trait]
pub trait QuoteSource: Sync + Send {
    /// Stable, human-readable provenance, e.g. `FRED VIXCLS (daily close)`.
    fn label(&self) -> &str;

    async fn attempt(&self) -> Result<QuoteResult, FetchError>;
}

/// Normalized success shape shared by every adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    pub price: Decimal,
    pub change_percent: Option<Decimal>,
    pub source: String,
    /// Indicator-specific fields merged into the response body.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl QuoteResult {
    pub fn new(price: Decimal, change_percent: Option<Decimal>, source: &str) -> QuoteResult {
        QuoteResult {
            price,
            change_percent,
            source: source.to_owned(),
            extra: Map::new(),
        }
    }

    pub fn from_prices(latest: Decimal, previous: Option<Decimal>, source: &str) -> QuoteResult {
        let change_percent = previous.and_then(|prev| change_percent(latest, prev));
        QuoteResult::new(latest, change_percent, source)
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<JsonValue>) -> QuoteResult {
        self.extra.insert(key.to_owned(), value.into());
        self
    }
}

/// `(latest - previous) / previous * 100` to two decimals, or `None` when previous is zero.
pub fn change_percent(latest: Decimal, previous: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    (latest - previous)
        .checked_div(previous)
        .and_then(|ratio| ratio.checked_mul(Decimal::from(100)))
        .map(round2)
}

pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parses a provider value, rejecting the missing sentinel, blanks and non-numeric text.
pub fn parse_value(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() || raw == MISSING_SENTINEL {
        return None;
    }
    Decimal::from_str(raw).ok()
}

/// Reads a numeric field that a provider may encode as a JSON number or a numeric string.
pub fn decimal_field(source_label: &str, value: &JsonValue, name: &str) -> Result<Decimal, FetchError> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_f64().filter(|f| f.is_finite()).and_then(Decimal::from_f64),
        JsonValue::String(s) => parse_value(s),
        _ => None,
    };
    parsed.ok_or_else(|| {
        FetchError::data_shape(source_label, format!("{} is not numeric: {}", name, value))
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Decimal,
}

/// Valid observations of one time series, sorted ascending by date with one value per date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    observations: Vec<Observation>,
}

impl Series {
    pub fn new(mut observations: Vec<Observation>) -> Series {
        // Stable sort keeps the provider's last value for a repeated date after dedup.
        observations.sort_by_key(|o| o.date);
        observations.reverse();
        observations.dedup_by_key(|o| o.date);
        observations.reverse();
        Series { observations }
    }

    /// Builds a series from raw `(date, value)` text, dropping rows whose value is missing
    /// or non-numeric and rows whose date does not match `date_format`.
    pub fn from_raw<'a>(
        rows: impl IntoIterator<Item = (&'a str, &'a str)>,
        date_format: &str,
    ) -> Series {
        Series::new(
            rows.into_iter()
                .filter_map(|(date, value)| {
                    Some(Observation {
                        date: NaiveDate::parse_from_str(date.trim(), date_format).ok()?,
                        value: parse_value(value)?,
                    })
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }

    pub fn previous(&self) -> Option<&Observation> {
        self.observations.iter().rev().nth(1)
    }

    pub fn value_on(&self, date: NaiveDate) -> Option<Decimal> {
        self.observations
            .binary_search_by_key(&date, |o| o.date)
            .ok()
            .map(|i| self.observations[i].value)
    }

    pub fn dates(&self) -> impl DoubleEndedIterator<Item = NaiveDate> + '_ {
        self.observations.iter().map(|o| o.date)
    }

    /// Latest value with change against the prior valid observation.
    pub fn to_quote(&self, source_label: &str) -> Result<QuoteResult, FetchError> {
        let latest = self
            .latest()
            .ok_or_else(|| FetchError::data_shape(source_label, "no valid observations"))?;
        Ok(QuoteResult::from_prices(
            latest.value,
            self.previous().map(|o| o.value),
            source_label,
        )
        .with_extra("date", latest.date.to_string()))
    }
}
