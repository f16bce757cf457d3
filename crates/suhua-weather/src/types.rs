use serde::{Serialize, Serializer};
use suhua_core::{NetworkError, ReqwestErrorExt};

/// Rainfall reading; negative CWA sentinels and missing stations are `Unavailable`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RainAmount {
    Measured(f64),
    Unavailable,
}

impl RainAmount {
    /// CWA publishes -998 / -999 style sentinels for "no reading"
    pub fn from_reading(value: Option<f64>) -> Self {
        match value {
            Some(v) if v >= 0.0 && v.is_finite() => Self::Measured(v),
            _ => Self::Unavailable,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Measured(v) => Some(*v),
            Self::Unavailable => None,
        }
    }
}

impl Serialize for RainAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Measured(v) => serializer.serialize_f64(*v),
            Self::Unavailable => serializer.serialize_str("--"),
        }
    }
}

/// Display classes understood by the dashboard stylesheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RainClass {
    #[serde(rename = "rain-green")]
    Green,
    #[serde(rename = "rain-blue")]
    Blue,
    #[serde(rename = "rain-yellow")]
    Yellow,
    #[serde(rename = "rain-orange")]
    Orange,
    #[serde(rename = "rain-red")]
    Red,
    #[serde(rename = "rain-purple")]
    Purple,
    #[serde(rename = "rain-gray")]
    Gray,
}

/// CWA heavy-rain categories plus the two "no value" states
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RainLevel {
    NoRain,
    Rain,
    Heavy,
    Torrential,
    ExtremelyTorrential,
    Extraordinary,
    NoData,
    ReadFailure,
}

impl RainLevel {
    /// Thresholds in millimetres of 24-hour accumulation, highest first
    const DAILY_THRESHOLDS: [(f64, RainLevel); 4] = [
        (500.0, RainLevel::Extraordinary),
        (350.0, RainLevel::ExtremelyTorrential),
        (200.0, RainLevel::Torrential),
        (80.0, RainLevel::Heavy),
    ];

    /// One hour at this rate is already a heavy-rain event
    const HOURLY_HEAVY_MM: f64 = 40.0;

    pub fn classify(daily: RainAmount, hourly: RainAmount) -> Self {
        let Some(mm) = daily.value() else {
            return Self::NoData;
        };

        let by_daily = Self::DAILY_THRESHOLDS
            .iter()
            .find(|(threshold, _)| mm >= *threshold)
            .map(|(_, level)| *level)
            .unwrap_or(if mm > 0.0 { Self::Rain } else { Self::NoRain });

        match hourly.value() {
            Some(h) if h >= Self::HOURLY_HEAVY_MM && by_daily < Self::Heavy => Self::Heavy,
            _ => by_daily,
        }
    }

    pub fn class(&self) -> RainClass {
        match self {
            Self::NoRain => RainClass::Green,
            Self::Rain => RainClass::Blue,
            Self::Heavy => RainClass::Yellow,
            Self::Torrential => RainClass::Orange,
            Self::ExtremelyTorrential => RainClass::Red,
            Self::Extraordinary => RainClass::Purple,
            Self::NoData | Self::ReadFailure => RainClass::Gray,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NoRain => "🟩 無降雨",
            Self::Rain => "🟦 降雨",
            Self::Heavy => "🟨 大雨",
            Self::Torrential => "🟧 豪雨",
            Self::ExtremelyTorrential => "🟥 大豪雨",
            Self::Extraordinary => "🟪 超大豪雨",
            Self::NoData => "無資料",
            Self::ReadFailure => "資料讀取失敗",
        }
    }
}

/// One rain gauge on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RainObservation {
    pub location: String,
    pub mm: RainAmount,
    pub class: RainClass,
    pub level: String,
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<String>,
    /// County used to attach the forecast text
    #[serde(skip)]
    pub county: String,
}

impl RainObservation {
    pub fn new(location: &str, county: &str, mm: RainAmount, level: RainLevel, time: String) -> Self {
        Self {
            location: location.to_string(),
            mm,
            class: level.class(),
            level: level.label().to_string(),
            time,
            forecast: None,
            county: county.to_string(),
        }
    }
}

/// Seismic intensity on the CWA scale (0-7, with 5 and 6 split weak/strong)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Intensity {
    #[default]
    Zero,
    One,
    Two,
    Three,
    Four,
    FiveLower,
    FiveUpper,
    SixLower,
    SixUpper,
    Seven,
}

impl Intensity {
    /// Accepts "4級", "5弱", "5強", "6-", "3" and similar
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim().trim_end_matches('級');
        let level = match s {
            "0" => Self::Zero,
            "1" => Self::One,
            "2" => Self::Two,
            "3" => Self::Three,
            "4" => Self::Four,
            "5" | "5弱" | "5-" => Self::FiveLower,
            "5強" | "5+" => Self::FiveUpper,
            "6" | "6弱" | "6-" => Self::SixLower,
            "6強" | "6+" => Self::SixUpper,
            "7" => Self::Seven,
            _ => return None,
        };
        Some(level)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Zero => "0",
            Self::One => "1",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::FiveLower => "5弱",
            Self::FiveUpper => "5強",
            Self::SixLower => "6弱",
            Self::SixUpper => "6強",
            Self::Seven => "7",
        }
    }
}

impl Serialize for Intensity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// A felt earthquake near the corridor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthquakeEvent {
    /// Origin time, "YYYY-MM-DD HH:MM" Taipei time
    pub time: String,
    pub location: String,
    pub magnitude: f64,
    /// Focal depth in km
    pub depth: f64,
    pub hualien_level: Intensity,
    pub yilan_level: Intensity,
    /// When the report was read
    pub data_time: String,
}

/// Active tropical cyclone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TyphoonAdvisory {
    pub name: String,
    pub warning_type: String,
    pub update_time: String,
    pub location: String,
    pub wind_speed: String,
    pub status: String,
    pub img_url: String,
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Dataset {dataset} returned HTTP {status}")]
    Status { dataset: String, status: u16 },
    #[error("Dataset {0} reported an unsuccessful response")]
    Rejected(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("CWA API key not configured")]
    MissingApiKey,
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.into_network_error())
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
