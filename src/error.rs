//! Error taxonomy for the fetch engine.
//!
//! Adapters only ever return [`FetchError`]; the chain runner folds those into
//! diagnostics and surfaces [`TotalFailure`] once every source and the cache
//! have been exhausted.

use thiserror::Error;

use crate::indicator::Indicator;

/// A network-level failure after the retry budget was spent.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{url} failed after {attempts} attempt(s): {cause}")]
pub struct TransportError {
    /// Request URL with the query string stripped, so keys never leak into diagnostics.
    pub url: String,
    pub attempts: u32,
    /// Last underlying cause.
    pub cause: String,
}

impl TransportError {
    pub fn new(url: &str, attempts: u32, cause: impl ToString) -> TransportError {
        TransportError {
            url: redact_url(url),
            attempts,
            cause: cause.to_string(),
        }
    }
}

/// Failure of a single adapter attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// A required credential is not configured. Skips the adapter.
    #[error("missing credential: {0} is not set")]
    Config(&'static str),

    /// HTTP or network failure, already retried at the transport layer.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The payload did not have the expected structure or held a non-numeric value.
    #[error("unexpected payload from {source_label}: {message}")]
    DataShape {
        source_label: String,
        message: String,
    },
}

impl FetchError {
    pub fn data_shape(source_label: &str, message: impl Into<String>) -> FetchError {
        FetchError::DataShape {
            source_label: source_label.to_owned(),
            message: message.into(),
        }
    }
}

/// Diagnostic entry recorded for every adapter that failed within a chain run.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterFailure {
    pub source_label: String,
    pub message: String,
}

/// Every adapter failed and no fresh cache entry was available.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("all {} sources failed for {indicator}", .failures.len())]
pub struct TotalFailure {
    pub indicator: Indicator,
    pub failures: Vec<AdapterFailure>,
}

fn redact_url(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_owned()
}
