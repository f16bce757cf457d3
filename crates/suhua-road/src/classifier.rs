//! Incident classifier: route filter, severity, road generation, segment.

use chrono::{DateTime, Utc};
use regex::Regex;
use suhua_core::time::format_minute;

use crate::error::RoadError;
use crate::matcher::{contains_any, evaluate, KeywordRule};
use crate::taxonomy::Taxonomy;
use crate::types::{
    RawIncident, RoadClass, RoadGeneration, RoadIncident, RoadSnapshot, SegmentReport,
    SeverityTier,
};

/// Kilometre marker such as `112K`, `112.3K` or `112K+500`
const KM_PATTERN: &str = r"(\d+(?:\.\d+)?)[Kk](?:\+(\d+))?";

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub section: String,
    pub tier: SeverityTier,
    pub status: String,
    /// Keyword that fixed the severity, if any
    pub keyword: Option<String>,
    pub road: RoadGeneration,
}

impl Classification {
    pub fn class(&self) -> RoadClass {
        self.tier.class()
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    taxonomy: Taxonomy,
    severity_rules: Vec<KeywordRule<SeverityTier>>,
    segment_rules: Vec<KeywordRule<String>>,
    km_marker: Regex,
}

impl Classifier {
    pub fn new(taxonomy: Taxonomy) -> Result<Self, RoadError> {
        let validation = taxonomy.validate();
        if !validation.is_valid() {
            return Err(RoadError::Taxonomy(validation.error_summary()));
        }
        for warning in &validation.warnings {
            tracing::warn!(%warning, "Road taxonomy warning");
        }

        let severity_rules = vec![
            KeywordRule::new(SeverityTier::High, taxonomy.severity.high.clone()),
            KeywordRule::new(SeverityTier::Mid, taxonomy.severity.mid.clone()),
        ];
        let segment_rules = taxonomy
            .segments
            .iter()
            .map(|s| KeywordRule::new(s.name.clone(), s.keywords.clone()))
            .collect();
        let km_marker =
            Regex::new(KM_PATTERN).map_err(|e| RoadError::Taxonomy(e.to_string()))?;

        Ok(Self {
            taxonomy,
            severity_rules,
            segment_rules,
            km_marker,
        })
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// `None` when the text does not name the monitored highway.
    pub fn classify(&self, text: &str) -> Option<Classification> {
        if !contains_any(&self.taxonomy.route_keywords, text) {
            return None;
        }

        let (tier, status, keyword) = self.severity(text);
        let section = evaluate(&self.segment_rules, text)
            .map(|m| m.outcome.clone())
            .unwrap_or_else(|| self.taxonomy.fallback_segment.clone());

        Some(Classification {
            section,
            tier,
            status,
            keyword,
            road: self.generation(text),
        })
    }

    fn severity(&self, text: &str) -> (SeverityTier, String, Option<String>) {
        let labels = &self.taxonomy.severity;
        let Some(hit) = evaluate(&self.severity_rules, text) else {
            return (SeverityTier::Info, labels.info_label.clone(), None);
        };

        let keyword = Some(hit.keyword.to_string());
        if *hit.outcome != SeverityTier::High {
            return (*hit.outcome, hit.keyword.to_string(), keyword);
        }

        if contains_any(&labels.degree, text) {
            (SeverityTier::Partial, labels.degree_label.clone(), keyword)
        } else if contains_any(&labels.downgrade, text) {
            (SeverityTier::Partial, labels.downgrade_label.clone(), keyword)
        } else {
            (SeverityTier::High, hit.keyword.to_string(), keyword)
        }
    }

    fn generation(&self, text: &str) -> RoadGeneration {
        if contains_any(&self.taxonomy.current_landmarks, text) {
            return RoadGeneration::Current;
        }

        let on_current_km = self.kilometres(text).any(|km| {
            self.taxonomy
                .current_km_ranges
                .iter()
                .any(|range| range.contains(km))
        });
        if on_current_km {
            return RoadGeneration::Current;
        }

        if contains_any(&self.taxonomy.legacy_markers, text) {
            RoadGeneration::Legacy
        } else {
            RoadGeneration::Unknown
        }
    }

    /// Every kilometre marker in the text; `+m` adds metres
    fn kilometres<'t>(&'t self, text: &'t str) -> impl Iterator<Item = f64> + 't {
        self.km_marker.captures_iter(text).filter_map(|caps| {
            let km: f64 = caps.get(1)?.as_str().parse().ok()?;
            let metres: f64 = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0.0);
            Some(km + metres / 1000.0)
        })
    }

    /// Classify feed items, dropping those off the monitored route
    pub fn classify_all(&self, items: &[RawIncident]) -> Vec<RoadIncident> {
        items
            .iter()
            .filter_map(|item| {
                let c = self.classify(&item.text)?;
                Some(RoadIncident {
                    class: c.class(),
                    section: c.section,
                    status: c.status,
                    tier: c.tier,
                    road: c.road,
                    keyword: c.keyword,
                    desc: item.text.clone(),
                    time: item.time.map(format_minute).unwrap_or_default(),
                    link: item.link.clone(),
                })
            })
            .collect()
    }

    /// One report per configured segment in declaration order, plus the
    /// fallback bucket when it holds anything. Incidents inside a report
    /// are ordered worst first.
    pub fn group_by_segment(&self, incidents: Vec<RoadIncident>) -> Vec<SegmentReport> {
        let mut reports: Vec<SegmentReport> = self
            .taxonomy
            .segment_names()
            .map(|name| self.empty_report(name))
            .collect();
        let mut fallback = self.empty_report(&self.taxonomy.fallback_segment);

        for incident in incidents {
            match reports.iter_mut().find(|r| r.section == incident.section) {
                Some(report) => report.incidents.push(incident),
                None => fallback.incidents.push(incident),
            }
        }
        if !fallback.incidents.is_empty() {
            reports.push(fallback);
        }

        for report in &mut reports {
            report.incidents.sort_by(|a, b| b.tier.cmp(&a.tier));
            if let Some(worst) = report.incidents.first() {
                report.status = worst.status.clone();
                report.class = worst.class;
                report.time = worst.time.clone();
                report.desc = headline_desc(worst);
            }
        }
        reports
    }

    fn empty_report(&self, section: &str) -> SegmentReport {
        SegmentReport {
            section: section.to_string(),
            status: self.taxonomy.severity.normal_label.clone(),
            class: SeverityTier::Info.class(),
            desc: String::new(),
            time: String::new(),
            incidents: Vec::new(),
        }
    }

    /// One synthetic read-failure entry per configured segment; `detail`
    /// becomes the description shown next to the failure label
    pub fn failure_reports(&self, now: DateTime<Utc>, detail: &str) -> Vec<SegmentReport> {
        let label = &self.taxonomy.severity.failure_label;
        let time = format_minute(now);
        let tier = SeverityTier::Unavailable;

        self.taxonomy
            .segment_names()
            .map(|name| SegmentReport {
                section: name.to_string(),
                status: label.clone(),
                class: tier.class(),
                desc: detail.to_string(),
                time: time.clone(),
                incidents: vec![RoadIncident {
                    section: name.to_string(),
                    status: label.clone(),
                    class: tier.class(),
                    tier,
                    road: RoadGeneration::Unknown,
                    keyword: None,
                    desc: detail.to_string(),
                    time: time.clone(),
                    link: None,
                }],
            })
            .collect()
    }

    pub fn snapshot(&self, items: &[RawIncident], now: DateTime<Utc>) -> RoadSnapshot {
        RoadSnapshot {
            segments: self.group_by_segment(self.classify_all(items)),
            fetched_at: now,
            as_of: format_minute(now),
            stale: false,
        }
    }

    pub fn failure_snapshot(&self, now: DateTime<Utc>, detail: &str) -> RoadSnapshot {
        RoadSnapshot {
            segments: self.failure_reports(now, detail),
            fetched_at: now,
            as_of: format_minute(now),
            stale: false,
        }
    }
}

/// Feed text of the headline incident, tagged with its alignment when known
fn headline_desc(incident: &RoadIncident) -> String {
    match incident.road {
        RoadGeneration::Unknown => incident.desc.clone(),
        road => format!("[{}] {}", road.label(), incident.desc),
    }
}
