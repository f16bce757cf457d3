//! Su-Hua highway road incidents
//!
//! Incident text from the TDX traffic-news feed is classified against a
//! keyword taxonomy (segment, severity, road generation) and served from a
//! time-bounded snapshot cache.

pub mod cache;
pub mod classifier;
pub mod client;
pub mod clock;
pub mod error;
pub mod matcher;
pub mod taxonomy;
pub mod types;

pub use cache::RoadStatusCache;
pub use classifier::{Classification, Classifier};
pub use client::{RoadIncidentSource, TdxRoadClient};
pub use clock::{Clock, SystemClock};
pub use error::RoadError;
pub use taxonomy::Taxonomy;
pub use types::{
    RawIncident, RoadClass, RoadGeneration, RoadIncident, RoadSnapshot, SegmentReport,
    SeverityTier,
};
