//! Tropical cyclone track (W-C0034-005).

use chrono::{DateTime, Utc};
use serde_json::Value;
use suhua_core::time::{format_minute, parse_timestamp};

use crate::client::{lenient_f64, str_at, RawPayload, SourceConfig};
use crate::feed::{Feed, FeedKind};
use crate::types::{TyphoonAdvisory, WeatherError};

pub const DATASET: &str = "W-C0034-005";

/// Below this sustained wind (m/s) the system is a tropical depression
const TYPHOON_WIND_MS: f64 = 17.2;

#[derive(Debug, Clone)]
pub struct TyphoonFeed {
    img_url: String,
}

impl TyphoonFeed {
    /// `img_url` is what the dashboard should load for the track chart
    pub fn new(img_url: &str) -> Self {
        Self {
            img_url: img_url.to_string(),
        }
    }

    fn advisory(&self, cyclone: &Value) -> Result<TyphoonAdvisory, WeatherError> {
        let fix = cyclone
            .pointer("/analysisData/fix")
            .and_then(Value::as_array)
            .and_then(|fixes| fixes.last())
            .ok_or_else(|| WeatherError::Parse(format!("{}: cyclone without fixes", DATASET)))?;

        let name = match (
            str_at(cyclone, "/cwaTyphoonName"),
            str_at(cyclone, "/typhoonName"),
        ) {
            (Some(zh), Some(en)) if !en.is_empty() => format!("{} ({})", zh, en),
            (Some(zh), _) => zh.to_string(),
            (None, Some(en)) => en.to_string(),
            (None, None) => "熱帶性低氣壓".to_string(),
        };

        let wind = lenient_f64(fix.get("maxWindSpeed"));
        let warning_type = match wind {
            Some(w) if w >= TYPHOON_WIND_MS => "颱風",
            _ => "熱帶性低氣壓",
        };

        let location = str_at(fix, "/coordinate")
            .and_then(parse_coordinate)
            .map(|(lon, lat)| format!("北緯 {:.1} 度，東經 {:.1} 度", lat, lon))
            .unwrap_or_default();

        let status = match (
            str_at(fix, "/movingDirection").map(compass_zh),
            lenient_f64(fix.get("movingSpeed")),
        ) {
            (Some(dir), Some(speed)) => format!("向{}移動，時速 {} 公里", dir, speed),
            (Some(dir), None) => format!("向{}移動", dir),
            _ => "滯留".to_string(),
        };

        Ok(TyphoonAdvisory {
            name,
            warning_type: warning_type.to_string(),
            update_time: str_at(fix, "/fixTime")
                .and_then(parse_timestamp)
                .map(format_minute)
                .unwrap_or_default(),
            location,
            wind_speed: wind.map(|w| format!("{} 公尺/秒", w)).unwrap_or_default(),
            status,
            img_url: self.img_url.clone(),
        })
    }
}

impl Feed for TyphoonFeed {
    type Output = Option<TyphoonAdvisory>;

    fn kind(&self) -> FeedKind {
        FeedKind::Typhoon
    }

    fn source(&self) -> SourceConfig {
        SourceConfig::dataset(DATASET)
    }

    /// No active cyclone is a normal answer (`Ok(None)`), not an error
    fn parse(&self, raw: &RawPayload, _now: DateTime<Utc>) -> Result<Self::Output, WeatherError> {
        let cyclones = raw
            .records()?
            .pointer("/tropicalCyclones/tropicalCyclone")
            .and_then(Value::as_array);

        match cyclones.and_then(|c| c.first()) {
            Some(cyclone) => self.advisory(cyclone).map(Some),
            None => Ok(None),
        }
    }

    fn unavailable(&self) -> Self::Output {
        None
    }
}

/// "121.5,22.3" -> (lon, lat)
fn parse_coordinate(raw: &str) -> Option<(f64, f64)> {
    let (lon, lat) = raw.split_once(',')?;
    Some((lon.trim().parse().ok()?, lat.trim().parse().ok()?))
}

fn compass_zh(code: &str) -> &str {
    match code {
        "N" => "北",
        "NNE" => "北北東",
        "NE" => "東北",
        "ENE" => "東北東",
        "E" => "東",
        "ESE" => "東南東",
        "SE" => "東南",
        "SSE" => "南南東",
        "S" => "南",
        "SSW" => "南南西",
        "SW" => "西南",
        "WSW" => "西南西",
        "W" => "西",
        "WNW" => "西北西",
        "NW" => "西北",
        "NNW" => "北北西",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(cyclones: Value) -> RawPayload {
        RawPayload::new(
            DATASET,
            serde_json::json!({
                "records": { "tropicalCyclones": { "tropicalCyclone": cyclones } }
            }),
        )
    }

    #[test]
    fn test_parse_latest_fix() {
        let raw = payload(serde_json::json!([{
            "year": 2025,
            "typhoonName": "WIPHA",
            "cwaTyphoonName": "韋帕",
            "analysisData": { "fix": [
                { "fixTime": "2025-07-19T08:00:00+08:00", "coordinate": "125.0,18.0",
                  "maxWindSpeed": "18", "movingSpeed": "15", "movingDirection": "W" },
                { "fixTime": "2025-07-20T08:00:00+08:00", "coordinate": "121.5,20.3",
                  "maxWindSpeed": "33", "movingSpeed": "20", "movingDirection": "WNW" }
            ]}
        }]));

        let advisory = TyphoonFeed::new("https://suhua.example.org/api/typhoon-image")
            .parse(&raw, Utc::now())
            .unwrap()
            .unwrap();

        assert_eq!(advisory.name, "韋帕 (WIPHA)");
        assert_eq!(advisory.warning_type, "颱風");
        assert_eq!(advisory.update_time, "2025-07-20 08:00");
        assert_eq!(advisory.location, "北緯 20.3 度，東經 121.5 度");
        assert_eq!(advisory.wind_speed, "33 公尺/秒");
        assert_eq!(advisory.status, "向西北西移動，時速 20 公里");
        assert_eq!(advisory.img_url, "https://suhua.example.org/api/typhoon-image");
    }

    #[test]
    fn test_weak_system_is_depression() {
        let raw = payload(serde_json::json!([{
            "analysisData": { "fix": [
                { "fixTime": "2025-07-20T08:00:00+08:00", "coordinate": "121.5,20.3", "maxWindSpeed": 15 }
            ]}
        }]));

        let advisory = TyphoonFeed::new("x").parse(&raw, Utc::now()).unwrap().unwrap();
        assert_eq!(advisory.warning_type, "熱帶性低氣壓");
        assert_eq!(advisory.status, "滯留");
    }

    #[test]
    fn test_no_active_cyclone_is_none() {
        let feed = TyphoonFeed::new("x");
        assert!(feed.parse(&payload(serde_json::json!([])), Utc::now()).unwrap().is_none());

        let empty = RawPayload::new(DATASET, serde_json::json!({ "records": {} }));
        assert!(feed.parse(&empty, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn test_cyclone_without_fix_is_error() {
        let raw = payload(serde_json::json!([{ "typhoonName": "X" }]));
        assert!(TyphoonFeed::new("x").parse(&raw, Utc::now()).is_err());
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("121.5, 20.3"), Some((121.5, 20.3)));
        assert_eq!(parse_coordinate("bad"), None);
    }
}
