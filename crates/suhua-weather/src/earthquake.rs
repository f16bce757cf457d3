//! Felt earthquake reports (E-A0015-001).

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use suhua_core::time::{format_clock, format_minute, parse_timestamp};
use suhua_core::EarthquakeConfig;

use crate::client::{lenient_f64, str_at, RawPayload, SourceConfig};
use crate::feed::{Feed, FeedKind};
use crate::types::{EarthquakeEvent, Intensity, WeatherError};

pub const DATASET: &str = "E-A0015-001";

#[derive(Debug, Clone)]
pub struct EarthquakeFeed {
    window: Duration,
    min_intensity: Intensity,
    areas: [String; 2],
}

impl EarthquakeFeed {
    pub fn new(config: &EarthquakeConfig) -> Self {
        let min_intensity = Intensity::parse(&config.min_intensity).unwrap_or_else(|| {
            tracing::warn!(
                value = %config.min_intensity,
                "Unrecognised earthquake min_intensity, using 1"
            );
            Intensity::One
        });
        let area = |i: usize| config.areas.get(i).cloned().unwrap_or_default();

        Self {
            window: Duration::days(i64::from(config.window_days)),
            min_intensity,
            areas: [area(0), area(1)],
        }
    }

    /// Strongest intensity reported for a county across all shaking areas.
    /// `CountyName` may list several counties joined by "、".
    fn area_intensity(report: &Value, county: &str) -> Intensity {
        if county.is_empty() {
            return Intensity::Zero;
        }
        report
            .pointer("/Intensity/ShakingArea")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|area| {
                str_at(area, "/CountyName")
                    .map(|names| names.split('、').any(|n| n.trim() == county))
                    .unwrap_or(false)
            })
            .filter_map(|area| str_at(area, "/AreaIntensity").and_then(Intensity::parse))
            .max()
            .unwrap_or_default()
    }

    fn event(&self, report: &Value, now: DateTime<Utc>) -> Option<EarthquakeEvent> {
        let info = report.get("EarthquakeInfo")?;
        let origin = str_at(info, "/OriginTime").and_then(parse_timestamp)?;

        if origin > now || now - origin > self.window {
            return None;
        }

        let hualien = Self::area_intensity(report, &self.areas[0]);
        let yilan = Self::area_intensity(report, &self.areas[1]);
        if hualien.max(yilan) < self.min_intensity {
            return None;
        }

        Some(EarthquakeEvent {
            time: format_minute(origin),
            location: str_at(info, "/Epicenter/Location").unwrap_or_default().to_string(),
            magnitude: lenient_f64(info.pointer("/EarthquakeMagnitude/MagnitudeValue"))
                .unwrap_or_default(),
            depth: lenient_f64(info.get("FocalDepth")).unwrap_or_default(),
            hualien_level: hualien,
            yilan_level: yilan,
            data_time: format_clock(now),
        })
    }
}

impl Feed for EarthquakeFeed {
    type Output = Vec<EarthquakeEvent>;

    fn kind(&self) -> FeedKind {
        FeedKind::Earthquake
    }

    fn source(&self) -> SourceConfig {
        SourceConfig::dataset(DATASET)
    }

    /// Reports inside the rolling window that reached the minimum
    /// intensity in either reference area, newest first as published.
    fn parse(&self, raw: &RawPayload, now: DateTime<Utc>) -> Result<Self::Output, WeatherError> {
        let reports = raw
            .records()?
            .get("Earthquake")
            .and_then(Value::as_array)
            .ok_or_else(|| WeatherError::Parse(format!("{}: missing Earthquake list", DATASET)))?;

        Ok(reports.iter().filter_map(|r| self.event(r, now)).collect())
    }

    fn unavailable(&self) -> Self::Output {
        Vec::new()
    }
}
