use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{anyhow, Context, Result};

use crate::indicator::Indicator;
use crate::transport::RetryPolicy;

/// Upper bound for `MARKET_RETRY_BASE_DELAY_MS`.
const MAX_RETRY_BASE_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub fred_api_key: Option<String>,
    pub twelve_data_api_key: Option<String>,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    pub vix_cache_window: Option<Duration>,
    pub gold_cache_window: Option<Duration>,
    pub dxy_cache_window: Option<Duration>,
    pub yield_spread_cache_window: Option<Duration>,
    pub buffett_cache_window: Option<Duration>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            fred_api_key: None,
            twelve_data_api_key: None,
            http_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            vix_cache_window: Some(Duration::from_secs(2 * 3600)),
            gold_cache_window: Some(Duration::from_secs(3600)),
            dxy_cache_window: Some(Duration::from_secs(4 * 3600)),
            yield_spread_cache_window: None,
            buffett_cache_window: None,
        }
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Config> {
        dotenvy::dotenv().ok();
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
        let defaults = Config::default();
        let parse = |key: &str| -> Result<Option<u64>> {
            lookup(key)
                .map(|v| {
                    u64::from_str(v.trim()).with_context(|| format!("{} must be an integer, got {:?}", key, v))
                })
                .transpose()
        };
        let window = |key: &str, default: Option<Duration>| -> Result<Option<Duration>> {
            Ok(match parse(key)? {
                Some(0) => None,
                Some(mins) => Some(
                    mins.checked_mul(60)
                        .map(Duration::from_secs)
                        .with_context(|| format!("{} is too large", key))?,
                ),
                None => default,
            })
        };
        let key = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let listen_addr = match lookup("MARKET_LISTEN_ADDR") {
            Some(addr) => addr
                .parse()
                .map_err(|e| anyhow!("invalid MARKET_LISTEN_ADDR {:?}: {}", addr, e))?,
            None => defaults.listen_addr,
        };
        let attempts = parse("MARKET_RETRY_ATTEMPTS")?
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(defaults.retry.max_attempts);
        let base_delay = parse("MARKET_RETRY_BASE_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.base_delay);
        if base_delay > MAX_RETRY_BASE_DELAY {
            return Err(anyhow!(
                "MARKET_RETRY_BASE_DELAY_MS must be at most {}, got {}",
                MAX_RETRY_BASE_DELAY.as_millis(),
                base_delay.as_millis()
            ));
        }

        Ok(Config {
            listen_addr,
            fred_api_key: key("FRED_API_KEY"),
            twelve_data_api_key: key("TWELVE_DATA_API_KEY"),
            http_timeout: parse("MARKET_HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            retry: RetryPolicy::new(attempts, base_delay),
            vix_cache_window: window("VIX_CACHE_WINDOW_MINS", defaults.vix_cache_window)?,
            gold_cache_window: window("GOLD_CACHE_WINDOW_MINS", defaults.gold_cache_window)?,
            dxy_cache_window: window("DXY_CACHE_WINDOW_MINS", defaults.dxy_cache_window)?,
            yield_spread_cache_window: window(
                "YIELD_SPREAD_CACHE_WINDOW_MINS",
                defaults.yield_spread_cache_window,
            )?,
            buffett_cache_window: window("BUFFETT_CACHE_WINDOW_MINS", defaults.buffett_cache_window)?,
        })
    }

    pub fn cache_window(&self, indicator: Indicator) -> Option<Duration> {
        match indicator {
            Indicator::Vix => self.vix_cache_window,
            Indicator::Gold => self.gold_cache_window,
            Indicator::YieldSpread => self.yield_spread_cache_window,
            Indicator::Dxy => self.dxy_cache_window,
            Indicator::Buffett => self.buffett_cache_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.fred_api_key, None);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(500));
        assert_eq!(config.cache_window(Indicator::Vix), Some(Duration::from_secs(7200)));
        assert_eq!(config.cache_window(Indicator::YieldSpread), None);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("MARKET_LISTEN_ADDR", "127.0.0.1:3000"),
            ("FRED_API_KEY", " abc "),
            ("TWELVE_DATA_API_KEY", ""),
            ("MARKET_RETRY_ATTEMPTS", "5"),
            ("VIX_CACHE_WINDOW_MINS", "0"),
            ("BUFFETT_CACHE_WINDOW_MINS", "1440"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.fred_api_key.as_deref(), Some("abc"));
        assert_eq!(config.twelve_data_api_key, None);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.cache_window(Indicator::Vix), None);
        assert_eq!(config.cache_window(Indicator::Buffett), Some(Duration::from_secs(86400)));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(from_pairs(&[("MARKET_RETRY_ATTEMPTS", "three")]).is_err());
        assert!(from_pairs(&[("MARKET_LISTEN_ADDR", "nowhere")]).is_err());
    }

    #[test]
    fn test_oversized_values_are_errors() {
        let max = u64::MAX.to_string();
        let err = from_pairs(&[("VIX_CACHE_WINDOW_MINS", &max)]).unwrap_err();
        assert!(err.to_string().contains("VIX_CACHE_WINDOW_MINS"));
        assert!(from_pairs(&[("MARKET_RETRY_BASE_DELAY_MS", &max)]).is_err());
        assert!(from_pairs(&[("MARKET_RETRY_BASE_DELAY_MS", "60001")]).is_err());

        let config = from_pairs(&[("MARKET_RETRY_BASE_DELAY_MS", "60000")]).unwrap();
        assert_eq!(config.retry.base_delay, Duration::from_secs(60));
    }
}
