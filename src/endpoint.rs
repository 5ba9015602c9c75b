//! Maps chain outcomes onto the JSON response contract.

use axum::http::StatusCode;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value as JsonValue};

use crate::cache::StalenessCache;
use crate::chain::{ChainSuccess, FallbackChain};
use crate::error::{AdapterFailure, TotalFailure};
use crate::indicator::{FailurePolicy, Indicator};

pub const UNAVAILABLE_SOURCE: &str = "unavailable";

/// An endpoint's status and JSON body, ready to be wrapped in an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointResponse {
    pub status: StatusCode,
    pub body: JsonValue,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn tried(failures: &[AdapterFailure], success: Option<&str>) -> Vec<JsonValue> {
    failures
        .iter()
        .map(|f| json!({ "src": f.source_label, "ok": false, "err": f.message }))
        .chain(success.map(|src| json!({ "src": src, "ok": true })))
        .collect()
}

pub fn render_success(indicator: Indicator, success: &ChainSuccess) -> EndpointResponse {
    let result = &success.result;
    let mut body = Map::new();
    body.insert(indicator.value_field().to_owned(), json!(result.price));
    if indicator.value_field() == "price" {
        body.insert("changePercent".to_owned(), json!(result.change_percent));
    }
    body.insert("source".to_owned(), json!(result.source));
    body.extend(result.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    body.insert("timestamp".to_owned(), json!(timestamp()));
    if success.cached || !success.failures.is_empty() {
        let live = if success.cached {
            None
        } else {
            Some(result.source.as_str())
        };
        body.insert(
            "_debug".to_owned(),
            json!({ "cached": success.cached, "tried": tried(&success.failures, live) }),
        );
    }
    EndpointResponse {
        status: StatusCode::OK,
        body: JsonValue::Object(body),
    }
}

pub fn render_failure(failure: &TotalFailure) -> EndpointResponse {
    let indicator = failure.indicator;
    match indicator.failure_policy() {
        FailurePolicy::Neutral => {
            let mut body = Map::new();
            body.insert(indicator.value_field().to_owned(), json!(0));
            match indicator {
                Indicator::YieldSpread => {
                    body.insert("inverted".to_owned(), json!(false));
                }
                _ => {
                    body.insert("changePercent".to_owned(), JsonValue::Null);
                }
            }
            body.insert("source".to_owned(), json!(UNAVAILABLE_SOURCE));
            body.insert("timestamp".to_owned(), json!(timestamp()));
            EndpointResponse {
                status: StatusCode::OK,
                body: JsonValue::Object(body),
            }
        }
        FailurePolicy::ServerError => EndpointResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({
                "error": format!("Unable to fetch {} from any source", indicator),
                "_debug": { "tried": tried(&failure.failures, None) },
                "timestamp": timestamp(),
            }),
        },
    }
}

/// Runs the chain and renders the outcome under the indicator's failure policy.
pub async fn serve_indicator(chain: &FallbackChain, cache: &StalenessCache) -> EndpointResponse {
    match chain.run(cache).await {
        Ok(success) => render_success(chain.indicator(), &success),
        Err(failure) => render_failure(&failure),
    }
}
