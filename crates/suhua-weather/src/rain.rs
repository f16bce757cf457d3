//! Rain gauge observations (O-A0002-001).

use chrono::{DateTime, Utc};
use serde_json::Value;
use suhua_core::time::{format_clock, parse_timestamp};
use suhua_core::StationConfig;

use crate::client::{lenient_f64, str_at, RawPayload, SourceConfig};
use crate::feed::{Feed, FeedKind};
use crate::types::{RainAmount, RainLevel, RainObservation, WeatherError};

pub const DATASET: &str = "O-A0002-001";

#[derive(Debug, Clone)]
pub struct RainFeed {
    stations: Vec<StationConfig>,
}

impl RainFeed {
    pub fn new(stations: Vec<StationConfig>) -> Self {
        Self { stations }
    }

    fn observe(station: &StationConfig, record: Option<&Value>) -> RainObservation {
        let Some(record) = record else {
            return RainObservation::new(
                &station.name,
                &station.county,
                RainAmount::Unavailable,
                RainLevel::NoData,
                String::new(),
            );
        };

        let rainfall = record.get("RainfallElement");
        let reading = |period: &str| {
            rainfall
                .and_then(|r| r.get(period))
                .and_then(|p| lenient_f64(p.get("Precipitation")))
        };

        let daily = RainAmount::from_reading(reading("Past24hr").or_else(|| reading("Now")));
        let hourly = RainAmount::from_reading(reading("Past1hr"));
        let time = str_at(record, "/ObsTime/DateTime")
            .and_then(parse_timestamp)
            .map(format_clock)
            .unwrap_or_default();

        RainObservation::new(
            &station.name,
            &station.county,
            daily,
            RainLevel::classify(daily, hourly),
            time,
        )
    }
}

impl Feed for RainFeed {
    type Output = Vec<RainObservation>;

    fn kind(&self) -> FeedKind {
        FeedKind::Rain
    }

    fn source(&self) -> SourceConfig {
        SourceConfig::dataset(DATASET)
    }

    /// One observation per configured station, in configured order.
    /// Stations absent from the payload are reported as "no data".
    fn parse(&self, raw: &RawPayload, _now: DateTime<Utc>) -> Result<Self::Output, WeatherError> {
        let records = raw
            .records()?
            .get("Station")
            .and_then(Value::as_array)
            .ok_or_else(|| WeatherError::Parse(format!("{}: missing Station list", DATASET)))?;

        Ok(self
            .stations
            .iter()
            .map(|station| {
                let record = records
                    .iter()
                    .find(|r| str_at(r, "/StationName") == Some(station.station.as_str()));
                if record.is_none() {
                    tracing::debug!(station = %station.station, "Station missing from rain payload");
                }
                Self::observe(station, record)
            })
            .collect())
    }

    fn unavailable(&self) -> Self::Output {
        self.stations
            .iter()
            .map(|s| {
                RainObservation::new(
                    &s.name,
                    &s.county,
                    RainAmount::Unavailable,
                    RainLevel::ReadFailure,
                    String::new(),
                )
            })
            .collect()
    }
}
