//! Market indicator service: VIX, spot gold, the 10y-2y Treasury spread, the broad USD
//! index and the Buffett Indicator, each served from an ordered chain of data providers
//! with a short-lived in-memory fallback.
//!
//! ```text
//! request -> api -> endpoint -> FallbackChain -> QuoteSource (in order) -> transport
//!                        ^              |
//!                        |              +-- StalenessCache (written on success,
//!                        +----------------   read once every source has failed)
//! ```

pub mod api;
pub mod cache;
pub mod chain;
pub mod chains;
pub mod config;
pub mod datasources;
pub mod endpoint;
pub mod error;
pub mod indicator;
pub mod transport;

pub use api::{app_router, build_state, AppState};
pub use cache::{CacheEntry, StalenessCache};
pub use chain::{ChainSuccess, FallbackChain, CACHED_SUFFIX};
pub use chains::{ChainFactory, ProviderChains};
pub use config::Config;
pub use error::{AdapterFailure, FetchError, TotalFailure, TransportError};
pub use indicator::{FailurePolicy, Indicator};
