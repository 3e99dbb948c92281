//! Market data: providers, the frozen session snapshot, and the replay feed.

pub mod circuit_breaker;
pub mod csv_import;
pub mod feed;
pub mod provider;
pub mod replay;
pub mod retry;
pub mod snapshot;
pub mod synthetic;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvProvider;
pub use feed::{parse_price, FeedError, PriceFeed, PriceSignal};
pub use provider::{DailyClose, DataError, DataProvider, DataSource, IntradayObservation};
pub use replay::ReplayFeed;
pub use retry::RetryPolicy;
pub use snapshot::{MarketSnapshot, TradingDay};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
