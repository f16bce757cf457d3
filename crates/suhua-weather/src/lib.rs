//! Weather, seismic and typhoon feeds for the Su-Hua dashboard
//!
//! Every dataset comes from the CWA open data platform. A single
//! [`CwaClient`] fetches raw payloads; each [`Feed`] parses its dataset
//! into domain records and knows its own "unavailable" value.

pub mod client;
pub mod earthquake;
pub mod feed;
pub mod forecast;
pub mod rain;
pub mod typhoon;
pub mod types;

pub use client::{CwaClient, RawPayload, SourceConfig};
pub use earthquake::EarthquakeFeed;
pub use feed::{CwaProvider, Feed, FeedKind};
pub use forecast::ForecastFeed;
pub use rain::RainFeed;
pub use typhoon::TyphoonFeed;
pub use types::*;
