//! 36-hour county forecast (F-C0032-001), used to annotate rain gauges.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::client::{str_at, RawPayload, SourceConfig};
use crate::feed::{Feed, FeedKind};
use crate::types::{RainObservation, WeatherError};

pub const DATASET: &str = "F-C0032-001";

/// County name -> forecast text for the first forecast period
pub type CountyForecasts = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct ForecastFeed {
    counties: Vec<String>,
}

impl ForecastFeed {
    pub fn new(counties: impl IntoIterator<Item = String>) -> Self {
        let mut counties: Vec<String> = counties.into_iter().collect();
        counties.sort();
        counties.dedup();
        Self { counties }
    }

    fn first_parameter<'a>(location: &'a Value, element: &str) -> Option<&'a str> {
        location
            .get("weatherElement")?
            .as_array()?
            .iter()
            .find(|e| str_at(e, "/elementName") == Some(element))
            .and_then(|e| str_at(e, "/time/0/parameter/parameterName"))
    }
}

impl Feed for ForecastFeed {
    type Output = CountyForecasts;

    fn kind(&self) -> FeedKind {
        FeedKind::Forecast
    }

    fn source(&self) -> SourceConfig {
        SourceConfig::dataset(DATASET)
    }

    fn parse(&self, raw: &RawPayload, _now: DateTime<Utc>) -> Result<Self::Output, WeatherError> {
        let locations = raw
            .records()?
            .get("location")
            .and_then(Value::as_array)
            .ok_or_else(|| WeatherError::Parse(format!("{}: missing location list", DATASET)))?;

        let mut forecasts = CountyForecasts::new();
        for location in locations {
            let Some(name) = str_at(location, "/locationName") else {
                continue;
            };
            if !self.counties.iter().any(|c| c == name) {
                continue;
            }

            let text = match (
                Self::first_parameter(location, "Wx"),
                Self::first_parameter(location, "PoP"),
            ) {
                (Some(wx), Some(pop)) => format!("{}，降雨機率 {}%", wx, pop),
                (Some(wx), None) => wx.to_string(),
                (None, Some(pop)) => format!("降雨機率 {}%", pop),
                (None, None) => continue,
            };
            forecasts.insert(name.to_string(), text);
        }

        Ok(forecasts)
    }

    fn unavailable(&self) -> Self::Output {
        CountyForecasts::new()
    }
}

/// Attach forecast text to each observation by county
pub fn annotate(observations: &mut [RainObservation], forecasts: &CountyForecasts) {
    for obs in observations {
        obs.forecast = forecasts.get(&obs.county).cloned();
    }
}
