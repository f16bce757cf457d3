//! Time-bounded road snapshot cache.
//!
//! The entry is replaced as a whole; readers never see a timestamp paired
//! with data from another refresh. Time is the only invalidation trigger.
//! A failed refresh is remembered for [`FAILURE_HOLD_SECS`] so callers
//! queued behind it do not hit the feed again.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::classifier::Classifier;
use crate::client::RoadIncidentSource;
use crate::clock::Clock;
use crate::types::RoadSnapshot;

/// How long a failed refresh is remembered before the feed is tried again
pub const FAILURE_HOLD_SECS: i64 = 30;

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: RoadSnapshot,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct RefreshFailure {
    at: DateTime<Utc>,
    detail: String,
}

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    /// Cleared by the next successful refresh
    failure: Option<RefreshFailure>,
}

pub struct RoadStatusCache<S, C> {
    source: S,
    classifier: Classifier,
    clock: C,
    window: Duration,
    state: Mutex<CacheState>,
}

impl<S: RoadIncidentSource, C: Clock> RoadStatusCache<S, C> {
    pub fn new(source: S, classifier: Classifier, clock: C, window: std::time::Duration) -> Self {
        let window = Duration::from_std(window).unwrap_or_else(|_| Duration::days(365));
        Self {
            source,
            classifier,
            clock,
            window,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Current road status.
    ///
    /// Served from the cache while younger than the window. Otherwise the
    /// feed is fetched and classified; the lock is held for the whole
    /// refresh so concurrent callers wait and then share its outcome.
    /// A failed refresh returns the previous snapshot marked stale, or
    /// per-segment failure entries when nothing was cached yet, and no
    /// new fetch is attempted until the failure hold has passed.
    pub async fn get_road_status(&self) -> RoadSnapshot {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        if let Some(cached) = state.entry.as_ref() {
            if now - cached.fetched_at < self.window {
                tracing::debug!(as_of = %cached.snapshot.as_of, "Road status cache hit");
                return cached.snapshot.clone();
            }
        }

        if let Some(failure) = state.failure.as_ref() {
            if now - failure.at < Duration::seconds(FAILURE_HOLD_SECS) {
                tracing::debug!(
                    failed_at = %failure.at,
                    "Recent road refresh failed, not refetching"
                );
                return self.degraded(&state, failure);
            }
        }

        match self.source.fetch_incidents().await {
            Ok(items) => {
                let snapshot = self.classifier.snapshot(&items, now);
                tracing::info!(
                    fetched = items.len(),
                    classified = snapshot.incident_count(),
                    "Road status refreshed"
                );
                state.entry = Some(CacheEntry {
                    snapshot: snapshot.clone(),
                    fetched_at: now,
                });
                state.failure = None;
                snapshot
            }
            Err(e) => {
                match state.entry.as_ref() {
                    Some(cached) => tracing::warn!(
                        error = %e,
                        as_of = %cached.snapshot.as_of,
                        "Road refresh failed, serving stale snapshot"
                    ),
                    None => tracing::warn!(error = %e, "Road refresh failed with nothing cached"),
                }
                let failure = RefreshFailure {
                    at: now,
                    detail: e.user_message(),
                };
                let snapshot = self.degraded(&state, &failure);
                state.failure = Some(failure);
                snapshot
            }
        }
    }

    fn degraded(&self, state: &CacheState, failure: &RefreshFailure) -> RoadSnapshot {
        match state.entry.as_ref() {
            Some(cached) => RoadSnapshot {
                stale: true,
                ..cached.snapshot.clone()
            },
            None => self.classifier.failure_snapshot(failure.at, &failure.detail),
        }
    }
}
