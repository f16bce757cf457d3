//! Combines every dataset into the dashboard response.

use serde::Serialize;
use std::sync::Arc;
use suhua_core::time::format_minute;
use suhua_core::{AppError, Config};
use suhua_road::{
    Classifier, Clock, RoadIncidentSource, RoadStatusCache, SegmentReport, SystemClock, Taxonomy,
    TdxRoadClient,
};
use suhua_weather::forecast::annotate;
use suhua_weather::{
    CwaClient, CwaProvider, EarthquakeEvent, EarthquakeFeed, ForecastFeed, RainFeed,
    RainObservation, TyphoonAdvisory, TyphoonFeed,
};

use crate::images::{typhoon_image_link, RADAR_IMAGE_PATH};

pub type SharedRoadSource = Arc<dyn RoadIncidentSource>;
pub type SharedClock = Arc<dyn Clock>;

/// Response body of `/api/dashboard-data`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub last_update: String,
    pub rain_info: Vec<RainObservation>,
    pub radar_img_url: String,
    pub earthquake_info: Vec<EarthquakeEvent>,
    pub road_info: Vec<SegmentReport>,
    pub road_as_of: String,
    pub road_stale: bool,
    pub typhoon_info: Option<TyphoonAdvisory>,
}

pub struct Aggregator {
    provider: CwaProvider,
    rain: RainFeed,
    forecast: ForecastFeed,
    earthquake: EarthquakeFeed,
    typhoon: TyphoonFeed,
    road: RoadStatusCache<SharedRoadSource, SharedClock>,
    clock: SharedClock,
}

impl Aggregator {
    pub fn new(
        config: &Config,
        road_source: SharedRoadSource,
        clock: SharedClock,
    ) -> Result<Self, AppError> {
        let client = CwaClient::new(&config.cwa).map_err(|e| AppError::Provider(e.to_string()))?;

        let classifier = match &config.road.taxonomy_path {
            Some(path) => Taxonomy::load(path),
            None => Ok(Taxonomy::default()),
        }
        .and_then(Classifier::new)
        .map_err(|e| AppError::Provider(e.to_string()))?;

        let stations = config.cwa.stations.clone();
        let counties = stations.iter().map(|s| s.county.clone()).collect::<Vec<_>>();

        Ok(Self {
            provider: CwaProvider::new(client),
            rain: RainFeed::new(stations),
            forecast: ForecastFeed::new(counties),
            earthquake: EarthquakeFeed::new(&config.cwa.earthquake),
            typhoon: TyphoonFeed::new(&typhoon_image_link(&config.server, &config.cwa)),
            road: RoadStatusCache::new(
                road_source,
                classifier,
                clock.clone(),
                config.road.cache_window(),
            ),
            clock,
        })
    }

    /// Production wiring: TDX road feed and the system clock
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let road_source = TdxRoadClient::new(&config.road)
            .map_err(|e| AppError::Provider(e.to_string()))?;
        if !config.cwa.is_configured() {
            tracing::warn!("CWA API key not set, weather sections will show as unavailable");
        }
        Self::new(config, Arc::new(road_source), Arc::new(SystemClock))
    }

    /// Every dataset is fetched concurrently and degrades on its own;
    /// this never fails.
    pub async fn dashboard(&self) -> DashboardData {
        let now = self.clock.now();

        let (mut rain, forecasts, earthquakes, typhoon, road) = tokio::join!(
            self.provider.load(&self.rain, now),
            self.provider.load(&self.forecast, now),
            self.provider.load(&self.earthquake, now),
            self.provider.load(&self.typhoon, now),
            self.road.get_road_status(),
        );
        annotate(&mut rain, &forecasts);

        DashboardData {
            last_update: format_minute(now),
            rain_info: rain,
            radar_img_url: RADAR_IMAGE_PATH.to_string(),
            earthquake_info: earthquakes,
            road_info: road.segments,
            road_as_of: road.as_of,
            road_stale: road.stale,
            typhoon_info: typhoon,
        }
    }
}
