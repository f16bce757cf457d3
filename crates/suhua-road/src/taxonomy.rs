//! Keyword taxonomy for incident classification.
//!
//! Shipped as `config/taxonomy.toml`; the built-in default is identical.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use suhua_core::ValidationResult;

use crate::error::RoadError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
    /// Tokens naming the monitored highway; texts without any are skipped
    pub route_keywords: Vec<String>,
    /// Bucket for route incidents that match no segment
    pub fallback_segment: String,
    /// Tunnel names only found on the current alignment
    pub current_landmarks: Vec<String>,
    pub legacy_markers: Vec<String>,
    pub segments: Vec<SegmentKeywords>,
    pub severity: SeverityKeywords,
    pub current_km_ranges: Vec<KmRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentKeywords {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityKeywords {
    pub high: Vec<String>,
    pub mid: Vec<String>,
    /// Traffic still possible on part of the road
    pub degree: Vec<String>,
    /// Detour or escorted passage available
    pub downgrade: Vec<String>,
    pub degree_label: String,
    pub downgrade_label: String,
    pub info_label: String,
    pub normal_label: String,
    pub failure_label: String,
}

/// Inclusive kilometre range on Highway 9
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KmRange {
    pub start: f64,
    pub end: f64,
}

impl KmRange {
    pub fn contains(&self, km: f64) -> bool {
        km >= self.start && km <= self.end
    }
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for SeverityKeywords {
    fn default() -> Self {
        Self {
            high: strings(&["封閉", "坍方", "中斷", "土石流", "路基流失", "禁止通行"]),
            mid: strings(&["落石", "施工", "管制", "事故", "濃霧", "壅塞", "車多"]),
            degree: strings(&["單線", "單向", "一車道"]),
            downgrade: strings(&["改道", "替代道路", "戒護", "疏導"]),
            degree_label: "單線通行".to_string(),
            downgrade_label: "替代道路通行".to_string(),
            info_label: "路況資訊".to_string(),
            normal_label: "正常通行".to_string(),
            failure_label: "資料讀取失敗".to_string(),
        }
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            route_keywords: strings(&["台9", "臺9", "蘇花"]),
            fallback_segment: "其他路段".to_string(),
            current_landmarks: strings(&[
                "蘇花改",
                "新澳隧道",
                "東澳隧道",
                "觀音隧道",
                "谷風隧道",
                "仁水隧道",
                "中仁隧道",
            ]),
            legacy_markers: strings(&["台9丁", "臺9丁", "舊蘇花"]),
            segments: vec![
                SegmentKeywords {
                    name: "蘇澳-南澳".to_string(),
                    keywords: strings(&["蘇澳", "東澳", "永樂", "東岳", "粉鳥林"]),
                },
                SegmentKeywords {
                    name: "南澳-和平".to_string(),
                    keywords: strings(&["南澳", "武塔", "漢本", "澳花", "觀音", "谷風"]),
                },
                SegmentKeywords {
                    name: "和平-秀林".to_string(),
                    keywords: strings(&[
                        "和平", "和中", "和仁", "仁水", "大清水", "匯德", "崇德", "秀林",
                    ]),
                },
            ],
            severity: SeverityKeywords::default(),
            current_km_ranges: vec![
                KmRange { start: 106.0, end: 114.5 },
                KmRange { start: 124.0, end: 145.0 },
                KmRange { start: 156.0, end: 167.5 },
            ],
        }
    }
}

impl Taxonomy {
    pub fn from_toml_str(contents: &str) -> Result<Self, RoadError> {
        toml::from_str(contents).map_err(|e| RoadError::Taxonomy(e.to_string()))
    }

    /// Load from a TOML file. Unlike the main config, a missing file is an
    /// error: an explicitly configured taxonomy must exist.
    pub fn load(path: &Path) -> Result<Self, RoadError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RoadError::Taxonomy(format!("{}: {}", path.display(), e)))?;
        let taxonomy = Self::from_toml_str(&contents)?;
        tracing::info!(path = %path.display(), segments = taxonomy.segments.len(), "Loaded road taxonomy");
        Ok(taxonomy)
    }

    pub fn segment_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.name.as_str())
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.route_keywords.iter().all(|k| k.is_empty()) {
            result.add_error("route_keywords", "At least one route keyword is required");
        }

        if self.segments.is_empty() {
            result.add_error("segments", "At least one segment is required");
        }

        let mut seen = HashSet::new();
        for (i, segment) in self.segments.iter().enumerate() {
            let field = format!("segments[{}]", i);
            if segment.name.is_empty() {
                result.add_error(&field, "Segment name is empty");
            } else if !seen.insert(segment.name.as_str()) {
                result.add_error(&field, format!("Duplicate segment name '{}'", segment.name));
            }
            if segment.keywords.iter().all(|k| k.is_empty()) {
                result.add_error(&field, format!("Segment '{}' has no keywords", segment.name));
            }
        }

        if self.fallback_segment.is_empty() {
            result.add_error("fallback_segment", "Fallback segment name is empty");
        } else if seen.contains(self.fallback_segment.as_str()) {
            result.add_error(
                "fallback_segment",
                format!("'{}' is also a configured segment", self.fallback_segment),
            );
        }

        for (i, range) in self.current_km_ranges.iter().enumerate() {
            if !(range.start.is_finite() && range.end.is_finite()) || range.start > range.end {
                result.add_error(
                    format!("current_km_ranges[{}]", i),
                    format!("Range {}..{} is not well ordered", range.start, range.end),
                );
            }
        }

        let labels = [
            ("severity.degree_label", &self.severity.degree_label),
            ("severity.downgrade_label", &self.severity.downgrade_label),
            ("severity.info_label", &self.severity.info_label),
            ("severity.normal_label", &self.severity.normal_label),
            ("severity.failure_label", &self.severity.failure_label),
        ];
        for (field, label) in labels {
            if label.is_empty() {
                result.add_error(field, "Label is empty");
            }
        }

        if self.severity.high.is_empty() && self.severity.mid.is_empty() {
            result.add_warning("severity", "No severity keywords; every incident is informational");
        }

        result
    }
}
