//! HTTP backend of the Su-Hua highway dashboard
//!
//! One JSON endpoint combines rain, earthquake, typhoon and road status;
//! two more proxy the CWA radar and typhoon-track images.

pub mod aggregator;
pub mod images;
pub mod routes;

pub use aggregator::{Aggregator, DashboardData};
pub use images::{ImageKind, ImageProxy, ProxiedImage};
pub use routes::{router, AppState};
