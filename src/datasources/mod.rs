mod cboe;
mod datasource;
mod fred;
mod goldprice;
mod spread;
mod twelvedata;
mod yfinance;

pub use cboe::CboeVixSource;
pub use datasource::{
    change_percent, decimal_field, parse_value, round2, Observation, QuoteResult, QuoteSource,
    Series, MISSING_SENTINEL,
};
pub use fred::{FredApi, FredCsv, SeriesProvider, SeriesQuoteSource};
pub use goldprice::GoldpriceSource;
pub use spread::{BuffettSource, YieldSpreadSource};
pub use twelvedata::TwelveDataSource;
pub use yfinance::YahooFinanceSource;
