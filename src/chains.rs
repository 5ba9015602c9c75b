//! Per-indicator source lists, constructed fresh for every request.

use std::sync::Arc;

use reqwest::Client;
use yahoo_finance_api::YahooConnector;

use crate::chain::FallbackChain;
use crate::config::Config;
use crate::datasources::{
    BuffettSource, CboeVixSource, FredApi, FredCsv, GoldpriceSource, QuoteSource,
    SeriesProvider, SeriesQuoteSource, TwelveDataSource, YahooFinanceSource, YieldSpreadSource,
};
use crate::indicator::Indicator;

pub trait ChainFactory: Sync + Send {
    fn chain(&self, indicator: Indicator) -> FallbackChain;
}

/// The production provider line-up.
pub struct ProviderChains {
    client: Arc<Client>,
    yahoo: Arc<YahooConnector>,
    config: Arc<Config>,
}

impl ProviderChains {
    pub fn new(client: Arc<Client>, yahoo: Arc<YahooConnector>, config: Arc<Config>) -> ProviderChains {
        ProviderChains {
            client,
            yahoo,
            config,
        }
    }

    fn fred_api(&self) -> Arc<dyn SeriesProvider> {
        Arc::new(FredApi::new(
            self.client.clone(),
            self.config.fred_api_key.clone(),
            self.config.retry,
        ))
    }

    fn fred_csv(&self) -> Arc<dyn SeriesProvider> {
        Arc::new(FredCsv::new(self.client.clone(), self.config.retry))
    }

    fn yahoo(&self, ticker: &str, label: &str) -> Box<dyn QuoteSource> {
        Box::new(YahooFinanceSource::new(
            self.yahoo.clone(),
            ticker,
            label,
            self.config.retry,
        ))
    }

    pub fn sources(&self, indicator: Indicator) -> Vec<Box<dyn QuoteSource>> {
        let retry = self.config.retry;
        match indicator {
            Indicator::Vix => vec![
                Box::new(SeriesQuoteSource::new(self.fred_api(), "VIXCLS", "FRED VIXCLS (daily close)")),
                self.yahoo("^VIX", "Yahoo Finance ^VIX"),
                Box::new(CboeVixSource::new(self.client.clone(), retry)),
                Box::new(SeriesQuoteSource::new(self.fred_csv(), "VIXCLS", "FRED graph CSV VIXCLS")),
            ],
            Indicator::Gold => vec![
                Box::new(GoldpriceSource::new(self.client.clone(), "XAU", "USD", retry)),
                Box::new(TwelveDataSource::new(
                    self.client.clone(),
                    self.config.twelve_data_api_key.clone(),
                    "XAU/USD",
                    retry,
                )),
                self.yahoo("GC=F", "Yahoo Finance GC=F (COMEX futures)"),
            ],
            Indicator::YieldSpread => vec![
                Box::new(YieldSpreadSource::new(self.fred_api())),
                Box::new(YieldSpreadSource::new(self.fred_csv())),
            ],
            Indicator::Dxy => vec![
                Box::new(SeriesQuoteSource::new(
                    self.fred_api(),
                    "DTWEXBGS",
                    "FRED DTWEXBGS (broad USD index)",
                )),
                self.yahoo("DX-Y.NYB", "Yahoo Finance DX-Y.NYB"),
                Box::new(SeriesQuoteSource::new(self.fred_csv(), "DTWEXBGS", "FRED graph CSV DTWEXBGS")),
            ],
            Indicator::Buffett => vec![
                Box::new(BuffettSource::new(self.fred_api())),
                Box::new(BuffettSource::new(self.fred_csv())),
            ],
        }
    }
}

impl ChainFactory for ProviderChains {
    fn chain(&self, indicator: Indicator) -> FallbackChain {
        FallbackChain::new(
            indicator,
            self.sources(indicator),
            self.config.cache_window(indicator),
        )
    }
}
