//! Aggregate compliance views.
//!
//! Every function rescans the full record set it is handed. Nothing is
//! cached or maintained incrementally, so cost grows linearly with the
//! ledger.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use chrono::{Datelike, Local, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::classifier::{Framework, ValidationStatus};
use crate::record::LogRecord;

/// Label used when a record carries no severity.
pub const UNKNOWN_SEVERITY: &str = "Unknown";

/// Ordering of trend buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendOrder {
    /// Order in which buckets are first encountered while scanning.
    #[default]
    FirstSeen,
    /// Sorted by bucket start.
    Chronological,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Stats.violations counts records with riskScore strictly above this.
    /// Scores are 0-100 while the default of 7 reads like a 0-10 scale; the
    /// value is kept as the ledger has always reported it.
    pub violation_threshold: f64,
    pub trend_order: TrendOrder,
    pub recent_limit: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            violation_threshold: 7.0,
            trend_order: TrendOrder::FirstSeen,
            recent_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeverityCount {
    pub severity: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameworkCount {
    pub framework: Framework,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_logs: usize,
    pub validated_logs: usize,
    pub violations: usize,
    pub severity_distribution: Vec<SeverityCount>,
    pub framework_coverage: Vec<FrameworkCount>,
    pub agents: usize,
    pub active_nodes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub time: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownEntry {
    pub name: Framework,
    pub value: usize,
}

/// Counts keyed in first-seen order.
struct OrderedCounter<K> {
    order: Vec<K>,
    counts: HashMap<K, usize>,
}

impl<K: Eq + Hash + Clone> OrderedCounter<K> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            counts: HashMap::new(),
        }
    }

    fn add(&mut self, key: K) {
        match self.counts.get_mut(&key) {
            Some(count) => *count += 1,
            None => {
                self.order.push(key.clone());
                self.counts.insert(key, 1);
            }
        }
    }

    fn into_pairs(self) -> Vec<(K, usize)> {
        let OrderedCounter { order, mut counts } = self;
        order
            .into_iter()
            .map(|k| {
                let n = counts.remove(&k).unwrap_or(0);
                (k, n)
            })
            .collect()
    }
}

pub fn stats(records: &[LogRecord], config: &AggregationConfig) -> Stats {
    let mut severities = OrderedCounter::new();
    let mut frameworks = OrderedCounter::new();
    let mut agents: HashSet<&str> = HashSet::new();
    let mut active_nodes: HashSet<&str> = HashSet::new();
    let mut validated_logs = 0;
    let mut violations = 0;

    for record in records {
        if record.validated == Some(ValidationStatus::Verified) {
            validated_logs += 1;
        }
        if f64::from(record.risk_score) > config.violation_threshold {
            violations += 1;
        }

        let severity = if record.severity.is_empty() {
            UNKNOWN_SEVERITY.to_string()
        } else {
            record.severity.clone()
        };
        severities.add(severity);
        frameworks.add(record.framework);

        if !record.source.is_empty() {
            agents.insert(record.source.as_str());
        }
        // Every stored record has a timestamp, so this is the agents set plus
        // the empty source when one occurs.
        active_nodes.insert(record.source.as_str());
    }

    Stats {
        total_logs: records.len(),
        validated_logs,
        violations,
        severity_distribution: severities
            .into_pairs()
            .into_iter()
            .map(|(severity, count)| SeverityCount { severity, count })
            .collect(),
        framework_coverage: frameworks
            .into_pairs()
            .into_iter()
            .map(|(framework, count)| FrameworkCount { framework, count })
            .collect(),
        agents: agents.len(),
        active_nodes: active_nodes.len(),
    }
}

/// Hourly buckets in server local time.
pub fn trends(records: &[LogRecord], order: TrendOrder) -> Vec<TrendPoint> {
    trends_in(records, &Local, order)
}

/// Hourly buckets in the given time zone, labelled `Y-M-D H:00` without
/// zero padding.
pub fn trends_in<Tz: TimeZone>(records: &[LogRecord], tz: &Tz, order: TrendOrder) -> Vec<TrendPoint> {
    let mut buckets: OrderedCounter<(NaiveDateTime, String)> = OrderedCounter::new();
    for record in records {
        let local = record.timestamp.with_timezone(tz);
        let label = format!(
            "{}-{}-{} {}:00",
            local.year(),
            local.month(),
            local.day(),
            local.hour()
        );
        let start = local
            .date_naive()
            .and_hms_opt(local.hour(), 0, 0)
            .unwrap_or_else(|| local.naive_local());
        buckets.add((start, label));
    }

    let mut pairs = buckets.into_pairs();
    if order == TrendOrder::Chronological {
        pairs.sort_by_key(|((start, _), _)| *start);
    }
    pairs
        .into_iter()
        .map(|((_, time), count)| TrendPoint { time, count })
        .collect()
}

/// Counts per framework over every record, regardless of validation status.
pub fn violation_breakdown(records: &[LogRecord]) -> Vec<BreakdownEntry> {
    let mut frameworks = OrderedCounter::new();
    for record in records {
        frameworks.add(record.framework);
    }
    frameworks
        .into_pairs()
        .into_iter()
        .map(|(name, value)| BreakdownEntry { name, value })
        .collect()
}

/// Records with no validation status, newest first, at most `limit`.
pub fn recent_violations(records: &[LogRecord], limit: usize) -> Vec<LogRecord> {
    let mut unvalidated: Vec<LogRecord> = records
        .iter()
        .filter(|r| r.validated.is_none())
        .cloned()
        .collect();
    unvalidated.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    unvalidated.truncate(limit);
    unvalidated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::record::IngestRequest;
    use chrono::{DateTime, Duration, FixedOffset, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 7, hour, minute, 0).unwrap()
    }

    fn record(id: &str, message: &str, severity: &str, source: &str, ts: DateTime<Utc>) -> LogRecord {
        let req = IngestRequest {
            message: message.into(),
            user: "alice".into(),
            severity: severity.into(),
            access_role: None,
            source: source.into(),
        };
        let c = Classifier::default().classify(message);
        LogRecord::assemble(req, id.into(), ts, c)
    }

    fn dataset() -> Vec<LogRecord> {
        vec![
            record("1", "User login success", "low", "SIEM", at(10, 5)),
            record("2", "Firewall disabled on host", "high", "Firewall", at(9, 30)),
            record("3", "backup finished with success", "low", "SIEM", at(10, 40)),
            record("4", "routine system check", "", "Endpoint", at(11, 0)),
            record("5", "Credit card info leaked", "critical", "DLP", at(9, 59)),
        ]
    }

    #[test]
    fn stats_over_classifier_output() {
        let s = stats(&dataset(), &AggregationConfig::default());
        assert_eq!(s.total_logs, 5);
        // Only record 3 reaches the "login success" rule's Verified outcome.
        assert_eq!(s.validated_logs, 1);
        assert_eq!(s.agents, 4);
        assert_eq!(
            s.severity_distribution,
            vec![
                SeverityCount { severity: "low".into(), count: 2 },
                SeverityCount { severity: "high".into(), count: 1 },
                SeverityCount { severity: UNKNOWN_SEVERITY.into(), count: 1 },
                SeverityCount { severity: "critical".into(), count: 1 },
            ]
        );
        assert_eq!(
            s.framework_coverage,
            vec![
                FrameworkCount { framework: Framework::Iso27001, count: 2 },
                FrameworkCount { framework: Framework::NistCsf, count: 1 },
                FrameworkCount { framework: Framework::Unknown, count: 1 },
                FrameworkCount { framework: Framework::PciDss, count: 1 },
            ]
        );
    }

    #[test]
    fn blank_severity_keeps_its_label() {
        let records = vec![
            record("1", "a", " ", "SIEM", at(10, 0)),
            record("2", "b", "", "SIEM", at(10, 1)),
        ];
        let s = stats(&records, &AggregationConfig::default());
        assert_eq!(
            s.severity_distribution,
            vec![
                SeverityCount { severity: " ".into(), count: 1 },
                SeverityCount { severity: UNKNOWN_SEVERITY.into(), count: 1 },
            ]
        );
    }

    #[test]
    fn distribution_counts_sum_to_total() {
        let records = dataset();
        let s = stats(&records, &AggregationConfig::default());
        let severity_sum: usize = s.severity_distribution.iter().map(|c| c.count).sum();
        let framework_sum: usize = s.framework_coverage.iter().map(|c| c.count).sum();
        assert_eq!(severity_sum, s.total_logs);
        assert_eq!(framework_sum, s.total_logs);

        let empty = stats(&[], &AggregationConfig::default());
        assert_eq!(empty.total_logs, 0);
        assert!(empty.severity_distribution.is_empty());
    }

    #[test]
    fn violation_threshold_compares_percent_scores_against_seven() {
        // Scores are 0-100 but the default threshold is 7, so every record
        // whose score exceeds 7 counts, including the Verified one at 10.
        let s = stats(&dataset(), &AggregationConfig::default());
        assert_eq!(s.violations, 5);

        let scaled = AggregationConfig {
            violation_threshold: 70.0,
            ..AggregationConfig::default()
        };
        // 75 (firewall) and 90 (credit card); 70 is not strictly above.
        assert_eq!(stats(&dataset(), &scaled).violations, 2);
    }

    #[test]
    fn active_nodes_duplicates_agents() {
        let s = stats(&dataset(), &AggregationConfig::default());
        assert_eq!(s.active_nodes, s.agents);

        let mut records = dataset();
        records[0].source.clear();
        let s = stats(&records, &AggregationConfig::default());
        // SIEM is still present via record 3; the empty source only counts
        // towards activeNodes.
        assert_eq!(s.agents, 4);
        assert_eq!(s.active_nodes, 5);
    }

    #[test]
    fn trends_keep_first_seen_order_by_default() {
        let points = trends_in(&dataset(), &Utc, TrendOrder::FirstSeen);
        assert_eq!(
            points,
            vec![
                TrendPoint { time: "2025-3-7 10:00".into(), count: 2 },
                TrendPoint { time: "2025-3-7 9:00".into(), count: 2 },
                TrendPoint { time: "2025-3-7 11:00".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn trends_can_be_sorted_chronologically() {
        let points = trends_in(&dataset(), &Utc, TrendOrder::Chronological);
        let labels: Vec<_> = points.iter().map(|p| p.time.as_str()).collect();
        assert_eq!(labels, vec!["2025-3-7 9:00", "2025-3-7 10:00", "2025-3-7 11:00"]);
    }

    #[test]
    fn trend_labels_follow_the_given_zone() {
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let points = trends_in(&[record("x", "m", "low", "S", at(23, 45))], &ist, TrendOrder::FirstSeen);
        assert_eq!(points[0].time, "2025-3-8 5:00");
    }

    #[test]
    fn breakdown_covers_all_records() {
        let records = dataset();
        let breakdown = violation_breakdown(&records);
        let total: usize = breakdown.iter().map(|b| b.value).sum();
        assert_eq!(total, records.len());
        // Verified records are counted too; the breakdown is not limited to
        // the thresholded violations of `stats`.
        assert_eq!(breakdown[0], BreakdownEntry { name: Framework::Iso27001, value: 2 });
    }

    #[test]
    fn recent_violations_empty_for_classifier_output() {
        assert!(recent_violations(&dataset(), 10).is_empty());
    }

    #[test]
    fn recent_violations_picks_unvalidated_newest_first() {
        let mut records: Vec<LogRecord> = (0..12)
            .map(|i| {
                let mut r = record(&format!("r{i}"), "m", "low", "S", at(0, 0) + Duration::minutes(i));
                r.validated = None;
                r
            })
            .collect();
        records.push(record("validated", "m", "low", "S", at(23, 0)));

        let recent = recent_violations(&records, 10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].log_id, "r11");
        assert_eq!(recent[9].log_id, "r2");
        assert!(recent.iter().all(|r| r.validated.is_none()));
    }
}
