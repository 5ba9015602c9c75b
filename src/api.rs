use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::future::join_all;
use log::info;
use reqwest::Client;
use serde_json::{json, Map, Value as JsonValue};
use yahoo_finance_api::YahooConnector;

use crate::cache::StalenessCache;
use crate::chains::{ChainFactory, ProviderChains};
use crate::config::Config;
use crate::endpoint::{serve_indicator, EndpointResponse};
use crate::indicator::Indicator;

const NO_STORE: &str = "no-store, must-revalidate";

/// Shared by every request. The cache is the only mutable state.
pub struct AppState {
    pub chains: Arc<dyn ChainFactory>,
    pub cache: Arc<StalenessCache>,
}

impl AppState {
    pub fn new(chains: Arc<dyn ChainFactory>) -> AppState {
        AppState {
            chains,
            cache: Arc::new(StalenessCache::new()),
        }
    }

    pub async fn indicator(&self, indicator: Indicator) -> EndpointResponse {
        let chain = self.chains.chain(indicator);
        serve_indicator(&chain, &self.cache).await
    }

    /// Every indicator fetched concurrently; each chain still runs its sources in order.
    /// Failed components become `{"error": ...}` and never fail the whole body.
    pub async fn market(&self) -> JsonValue {
        let responses = join_all(Indicator::ALL.iter().map(|&i| async move {
            (i, self.indicator(i).await)
        }))
        .await;

        let mut body = Map::new();
        for (indicator, response) in responses {
            let component = if response.status.is_success() {
                response.body
            } else {
                json!({ "error": response.body["error"].as_str().unwrap_or("unavailable") })
            };
            body.insert(indicator.key().to_owned(), component);
        }
        body.insert(
            "timestamp".to_owned(),
            json!(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        );
        JsonValue::Object(body)
    }
}

pub async fn build_state(config: Config) -> Result<Arc<AppState>> {
    let client = Client::builder()
        .user_agent(concat!("ireina-indicators/", env!("CARGO_PKG_VERSION")))
        .timeout(config.http_timeout)
        .build()?;
    let yahoo = YahooConnector::new()?;
    info!(
        "FRED key {}, Twelve Data key {}",
        if config.fred_api_key.is_some() { "present" } else { "missing" },
        if config.twelve_data_api_key.is_some() { "present" } else { "missing" },
    );
    let chains = ProviderChains::new(Arc::new(client), Arc::new(yahoo), Arc::new(config));
    Ok(Arc::new(AppState::new(Arc::new(chains))))
}

fn no_store(status: StatusCode, body: JsonValue) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    response
}

async fn indicator_handler(state: Arc<AppState>, indicator: Indicator) -> Response {
    let response = state.indicator(indicator).await;
    no_store(response.status, response.body)
}

async fn vix(State(state): State<Arc<AppState>>) -> Response {
    indicator_handler(state, Indicator::Vix).await
}

async fn gold(State(state): State<Arc<AppState>>) -> Response {
    indicator_handler(state, Indicator::Gold).await
}

async fn yield_spread(State(state): State<Arc<AppState>>) -> Response {
    indicator_handler(state, Indicator::YieldSpread).await
}

async fn dxy(State(state): State<Arc<AppState>>) -> Response {
    indicator_handler(state, Indicator::Dxy).await
}

async fn buffett(State(state): State<Arc<AppState>>) -> Response {
    indicator_handler(state, Indicator::Buffett).await
}

async fn market(State(state): State<Arc<AppState>>) -> Response {
    no_store(StatusCode::OK, state.market().await)
}

async fn health() -> Response {
    no_store(StatusCode::OK, json!({ "status": "ok" }))
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/vix", get(vix))
        .route("/api/gold", get(gold))
        .route("/api/yield-spread", get(yield_spread))
        .route("/api/dxy", get(dxy))
        .route("/api/buffett", get(buffett))
        .route("/api/market", get(market))
        .route("/health", get(health))
        .with_state(state)
}
