use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Incident text as delivered by the feed, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIncident {
    pub text: String,
    pub time: Option<DateTime<Utc>>,
    pub link: Option<String>,
}

impl RawIncident {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            time: None,
            link: None,
        }
    }
}

/// Ordered from least to most severe so `max()` yields the worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Info,
    Unavailable,
    Mid,
    Partial,
    High,
}

impl SeverityTier {
    pub fn class(&self) -> RoadClass {
        match self {
            Self::High => RoadClass::Red,
            Self::Partial => RoadClass::Orange,
            Self::Mid => RoadClass::Yellow,
            Self::Info => RoadClass::Green,
            Self::Unavailable => RoadClass::Gray,
        }
    }
}

/// Display classes understood by the dashboard stylesheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoadClass {
    #[serde(rename = "road-red")]
    Red,
    #[serde(rename = "road-orange")]
    Orange,
    #[serde(rename = "road-yellow")]
    Yellow,
    #[serde(rename = "road-green")]
    Green,
    #[serde(rename = "road-gray")]
    Gray,
}

/// Which alignment of the corridor an incident is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoadGeneration {
    /// The improvement-project tunnels (蘇花改)
    #[serde(rename = "new")]
    Current,
    /// The old coastal road (台9丁)
    #[serde(rename = "old")]
    Legacy,
    #[serde(rename = "unknown")]
    Unknown,
}

impl RoadGeneration {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Current => "蘇花改",
            Self::Legacy => "舊蘇花",
            Self::Unknown => "未判定",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadIncident {
    pub section: String,
    pub status: String,
    pub class: RoadClass,
    pub tier: SeverityTier,
    pub road: RoadGeneration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    pub desc: String,
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// All incidents of one segment plus its headline status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    pub section: String,
    pub status: String,
    pub class: RoadClass,
    /// Text of the headline incident; empty when the segment is clear
    pub desc: String,
    pub time: String,
    pub incidents: Vec<RoadIncident>,
}

/// One complete classification result; replaced as a whole on refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadSnapshot {
    pub segments: Vec<SegmentReport>,
    pub fetched_at: DateTime<Utc>,
    /// `fetched_at` in Taipei time, for display
    pub as_of: String,
    /// Set when a refresh failed and this is the last good result
    pub stale: bool,
}

impl RoadSnapshot {
    pub fn incident_count(&self) -> usize {
        self.segments.iter().map(|s| s.incidents.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worst_tier_ordering() {
        let tiers = [SeverityTier::Mid, SeverityTier::High, SeverityTier::Info];
        assert_eq!(tiers.iter().max(), Some(&SeverityTier::High));
        assert!(SeverityTier::Partial > SeverityTier::Mid);
        assert!(SeverityTier::Unavailable > SeverityTier::Info);
    }

    #[test]
    fn test_class_serialization() {
        assert_eq!(
            serde_json::to_string(&SeverityTier::Partial.class()).unwrap(),
            "\"road-orange\""
        );
        assert_eq!(serde_json::to_string(&SeverityTier::High).unwrap(), "\"high\"");
    }

    #[test]
    fn test_generation_serialization() {
        assert_eq!(serde_json::to_string(&RoadGeneration::Current).unwrap(), "\"new\"");
        assert_eq!(serde_json::to_string(&RoadGeneration::Legacy).unwrap(), "\"old\"");
        assert_eq!(RoadGeneration::Legacy.label(), "舊蘇花");
    }
}
