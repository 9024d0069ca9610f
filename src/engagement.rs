//! Achievements, insights and alerts derived from metric snapshots.
//!
//! Every rule is evaluated on its own; ids are `rule-slug(metric title)` so a
//! regenerated record replaces the previous one in [`EngagementStore`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::metric::{MetricRegistry, PerformanceLevel};
use crate::models::MetricSnapshot;

const RISING_STAR_TREND: f64 = 10.0;
const CONSISTENCY_NORMALIZED: f64 = 80.0;
const TREND_INSIGHT_MIN: f64 = 5.0;
const TREND_IMPACT_HIGH: f64 = 15.0;
const TREND_IMPACT_MEDIUM: f64 = 10.0;
const OPPORTUNITY_RANGE: std::ops::Range<f64> = 70.0..90.0;
const DECLINE_ALERT_TREND: f64 = -10.0;
const TARGET_MET_DISMISS_MS: u64 = 8000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub metric: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Trend,
    Warning,
    Opportunity,
    Achievement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub confidence: u8,
    pub impact: Impact,
    pub metric: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Error,
    Warning,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub metric: String,
    pub auto_dismiss_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngagementSet {
    pub achievements: Vec<Achievement>,
    pub insights: Vec<Insight>,
    pub alerts: Vec<Alert>,
}

impl EngagementSet {
    pub fn extend(&mut self, other: EngagementSet) {
        self.achievements.extend(other.achievements);
        self.insights.extend(other.insights);
        self.alerts.extend(other.alerts);
    }
}

/// Lowercase alphanumeric runs joined by single dashes.
pub fn slugify(title: &str) -> String {
    title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

fn record_id(rule: &str, title: &str) -> String {
    format!("{rule}-{}", slugify(title))
}

pub fn generate_for_metric(metric: &MetricSnapshot, registry: &MetricRegistry) -> EngagementSet {
    let family = metric.kind.family();
    let level = registry.performance_level(metric.current_score, family);
    let normalized = registry.normalize_score(metric.current_score, family);
    let trend = metric.trend;
    let target_met = metric.current_score >= metric.target;
    let title = metric.title.as_str();

    let mut set = EngagementSet::default();

    let achievement = |rule: &str, name: &str, description: String| Achievement {
        id: record_id(rule, title),
        title: name.to_string(),
        description,
        metric: title.to_string(),
    };

    if target_met {
        set.achievements.push(achievement(
            "target-crusher",
            "Target Crusher",
            format!(
                "{title} reached {:.1} against a target of {:.1}",
                metric.current_score, metric.target
            ),
        ));
    }
    if level == PerformanceLevel::Excellent {
        set.achievements.push(achievement(
            "excellence-award",
            "Excellence Award",
            format!("{title} is performing at an excellent level"),
        ));
    }
    if trend > RISING_STAR_TREND {
        set.achievements.push(achievement(
            "rising-star",
            "Rising Star",
            format!("{title} improved {trend:.1}% month over month"),
        ));
    }
    if normalized > CONSISTENCY_NORMALIZED && trend > 0.0 {
        set.achievements.push(achievement(
            "consistency-champion",
            "Consistency Champion",
            format!("{title} is above {CONSISTENCY_NORMALIZED:.0}% and still climbing"),
        ));
    }

    if trend.abs() > TREND_INSIGHT_MIN {
        let impact = if trend.abs() > TREND_IMPACT_HIGH {
            Impact::High
        } else if trend.abs() > TREND_IMPACT_MEDIUM {
            Impact::Medium
        } else {
            Impact::Low
        };
        let direction = if trend > 0.0 { "up" } else { "down" };
        set.insights.push(Insight {
            id: record_id("trend", title),
            kind: InsightKind::Trend,
            title: format!("{title} trending {direction}"),
            description: format!("{title} moved {trend:+.1}% since the previous month"),
            confidence: 85,
            impact,
            metric: title.to_string(),
        });
    }
    if matches!(level, PerformanceLevel::Critical | PerformanceLevel::Warning) {
        set.insights.push(Insight {
            id: record_id("warning", title),
            kind: InsightKind::Warning,
            title: format!("{title} needs attention"),
            description: format!(
                "{title} is at {:.1}, in the {} tier",
                metric.current_score,
                level.as_str()
            ),
            confidence: if metric.is_real_data { 90 } else { 50 },
            impact: if level == PerformanceLevel::Critical {
                Impact::High
            } else {
                Impact::Medium
            },
            metric: title.to_string(),
        });
    }
    if OPPORTUNITY_RANGE.contains(&normalized) && trend > 0.0 {
        set.insights.push(Insight {
            id: record_id("opportunity", title),
            kind: InsightKind::Opportunity,
            title: format!("{title} is close to top tier"),
            description: format!(
                "{title} sits at {normalized:.0}% of scale with positive momentum"
            ),
            confidence: 75,
            impact: Impact::Medium,
            metric: title.to_string(),
        });
    }
    if target_met && trend > 0.0 {
        set.insights.push(Insight {
            id: record_id("achievement", title),
            kind: InsightKind::Achievement,
            title: format!("{title} target exceeded"),
            description: format!("{title} is above target and still improving"),
            confidence: 95,
            impact: Impact::Low,
            metric: title.to_string(),
        });
    }

    if level == PerformanceLevel::Critical {
        set.alerts.push(Alert {
            id: record_id("critical", title),
            kind: AlertKind::Error,
            severity: AlertSeverity::Critical,
            title: format!("{title} is critical"),
            message: format!(
                "{title} dropped to {:.1}, below the critical threshold",
                metric.current_score
            ),
            metric: title.to_string(),
            auto_dismiss_ms: None,
        });
    }
    if trend < DECLINE_ALERT_TREND {
        set.alerts.push(Alert {
            id: record_id("decline", title),
            kind: AlertKind::Warning,
            severity: AlertSeverity::High,
            title: format!("{title} declining"),
            message: format!("{title} fell {:.1}% since the previous month", trend.abs()),
            metric: title.to_string(),
            auto_dismiss_ms: None,
        });
    }
    if target_met && trend > 0.0 {
        set.alerts.push(Alert {
            id: record_id("target-met", title),
            kind: AlertKind::Success,
            severity: AlertSeverity::Low,
            title: format!("{title} target met"),
            message: format!(
                "{title} reached {:.1} (target {:.1})",
                metric.current_score, metric.target
            ),
            metric: title.to_string(),
            auto_dismiss_ms: Some(TARGET_MET_DISMISS_MS),
        });
    }

    set
}

pub fn generate(metrics: &[MetricSnapshot], registry: &MetricRegistry) -> EngagementSet {
    let mut set = EngagementSet::default();
    for metric in metrics {
        set.extend(generate_for_metric(metric, registry));
    }
    set
}

#[derive(Debug, Clone)]
struct StoredAlert {
    alert: Alert,
    raised_at: DateTime<Utc>,
}

/// Id-keyed engagement records; absorbing a regenerated set overwrites.
#[derive(Debug, Clone, Default)]
pub struct EngagementStore {
    achievements: BTreeMap<String, Achievement>,
    insights: BTreeMap<String, Insight>,
    alerts: BTreeMap<String, StoredAlert>,
    dismissed: BTreeSet<String>,
}

impl EngagementStore {
    pub fn absorb(&mut self, set: EngagementSet, now: DateTime<Utc>) {
        for achievement in set.achievements {
            self.achievements.insert(achievement.id.clone(), achievement);
        }
        for insight in set.insights {
            self.insights.insert(insight.id.clone(), insight);
        }
        for alert in set.alerts {
            if self.dismissed.contains(&alert.id) {
                continue;
            }
            let raised_at = self
                .alerts
                .get(&alert.id)
                .map(|stored| stored.raised_at)
                .unwrap_or(now);
            self.alerts
                .insert(alert.id.clone(), StoredAlert { alert, raised_at });
        }
    }

    /// Replaces insights and alerts with the latest set. Achievements stay
    /// unlocked, alerts keep their original raise time, and a dismissed
    /// alert stays hidden until its condition clears.
    pub fn refresh(&mut self, set: EngagementSet, now: DateTime<Utc>) {
        let active: BTreeSet<&str> = set.alerts.iter().map(|alert| alert.id.as_str()).collect();
        self.dismissed.retain(|id| active.contains(id.as_str()));
        self.alerts.retain(|id, _| active.contains(id.as_str()));
        self.insights.clear();
        self.absorb(set, now);
    }

    pub fn dismiss(&mut self, id: &str) -> bool {
        let removed = self.alerts.remove(id).is_some();
        if removed {
            self.dismissed.insert(id.to_string());
        }
        removed
    }

    /// Dismisses auto-dismissing alerts whose deadline has passed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .alerts
            .iter()
            .filter(|(_, stored)| match stored.alert.auto_dismiss_ms {
                Some(ms) => stored.raised_at + Duration::milliseconds(ms as i64) <= now,
                None => false,
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.dismiss(id);
        }
        expired.len()
    }

    pub fn achievements(&self) -> impl Iterator<Item = &Achievement> {
        self.achievements.values()
    }

    pub fn insights(&self) -> impl Iterator<Item = &Insight> {
        self.insights.values()
    }

    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.values().map(|stored| &stored.alert)
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricKind;

    fn snapshot(kind: MetricKind, current: f64, target: f64, trend: f64) -> MetricSnapshot {
        MetricSnapshot {
            kind,
            title: kind.title().to_string(),
            current_score: current,
            target,
            max_score: 100.0,
            trend,
            is_real_data: true,
        }
    }

    fn count<T>(items: &[T], pred: impl Fn(&T) -> bool) -> usize {
        items.iter().filter(|item| pred(item)).count()
    }

    #[test]
    fn slugs_collapse_punctuation() {
        assert_eq!(slugify("Net Promoter Score"), "net-promoter-score");
        assert_eq!(slugify("Ad-hoc  Feedback!"), "ad-hoc-feedback");
    }

    #[test]
    fn target_hit_with_strong_trend() {
        let registry = MetricRegistry::default();
        let metric = snapshot(MetricKind::Nps, 30.0, 30.0, 12.0);
        let set = generate_for_metric(&metric, &registry);

        assert_eq!(count(&set.achievements, |a| a.title == "Target Crusher"), 1);
        assert_eq!(count(&set.achievements, |a| a.title == "Rising Star"), 1);
        assert_eq!(count(&set.achievements, |a| a.title == "Consistency Champion"), 0);
        assert!(set
            .achievements
            .iter()
            .any(|a| a.id == "target-crusher-net-promoter-score"));
        assert!(set
            .achievements
            .iter()
            .any(|a| a.id == "rising-star-net-promoter-score"));

        let trend: Vec<_> = set
            .insights
            .iter()
            .filter(|i| i.kind == InsightKind::Trend)
            .collect();
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].impact, Impact::Medium);
        assert_eq!(trend[0].confidence, 85);
        assert_eq!(trend[0].id, "trend-net-promoter-score");

        let target_met: Vec<_> = set
            .alerts
            .iter()
            .filter(|a| a.id == "target-met-net-promoter-score")
            .collect();
        assert_eq!(target_met.len(), 1);
        assert_eq!(target_met[0].kind, AlertKind::Success);
        assert_eq!(target_met[0].severity, AlertSeverity::Low);
        assert_eq!(target_met[0].auto_dismiss_ms, Some(8000));

        let mut ids: Vec<_> = set.achievements.iter().map(|a| a.id.clone()).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn critical_metric_raises_warning_and_alert() {
        let registry = MetricRegistry::default();
        let metric = snapshot(MetricKind::Ticket, 2.0, 4.0, -20.0);
        let set = generate_for_metric(&metric, &registry);

        assert!(set.achievements.is_empty());
        let warning = set
            .insights
            .iter()
            .find(|i| i.kind == InsightKind::Warning)
            .expect("warning insight");
        assert_eq!(warning.confidence, 90);
        assert_eq!(warning.impact, Impact::High);

        let critical = set
            .alerts
            .iter()
            .find(|a| a.id == "critical-ticket-satisfaction")
            .expect("critical alert");
        assert_eq!(critical.kind, AlertKind::Error);
        assert_eq!(critical.severity, AlertSeverity::Critical);
        assert_eq!(critical.auto_dismiss_ms, None);

        let decline = set
            .alerts
            .iter()
            .find(|a| a.id == "decline-ticket-satisfaction")
            .expect("decline alert");
        assert_eq!(decline.severity, AlertSeverity::High);

        let trend = set
            .insights
            .iter()
            .find(|i| i.kind == InsightKind::Trend)
            .expect("trend insight");
        assert_eq!(trend.impact, Impact::High);
    }

    #[test]
    fn demo_data_lowers_warning_confidence() {
        let registry = MetricRegistry::default();
        let mut metric = snapshot(MetricKind::Project, 3.0, 4.0, 0.0);
        metric.is_real_data = false;
        let set = generate_for_metric(&metric, &registry);
        let warning = set
            .insights
            .iter()
            .find(|i| i.kind == InsightKind::Warning)
            .expect("warning insight");
        assert_eq!(warning.confidence, 50);
        assert_eq!(warning.impact, Impact::Medium);
        assert!(set.alerts.is_empty());
    }

    #[test]
    fn opportunity_and_consistency_windows() {
        let registry = MetricRegistry::default();
        let near_top = snapshot(MetricKind::Adhoc, 4.2, 4.5, 2.0);
        let set = generate_for_metric(&near_top, &registry);
        assert!(set.insights.iter().any(|i| i.kind == InsightKind::Opportunity));
        assert!(set
            .achievements
            .iter()
            .any(|a| a.title == "Consistency Champion"));
        assert!(set.insights.iter().all(|i| i.kind != InsightKind::Trend));

        let flat = snapshot(MetricKind::Adhoc, 4.2, 4.5, 0.0);
        let set = generate_for_metric(&flat, &registry);
        assert!(set.insights.iter().all(|i| i.kind != InsightKind::Opportunity));
    }

    #[test]
    fn store_deduplicates_regenerated_records() {
        let registry = MetricRegistry::default();
        let metrics = vec![snapshot(MetricKind::Nps, 30.0, 30.0, 12.0)];
        let now = Utc::now();
        let mut store = EngagementStore::default();
        store.absorb(generate(&metrics, &registry), now);
        let first = store.achievements().count();
        store.absorb(generate(&metrics, &registry), now);
        assert_eq!(store.achievements().count(), first);
        assert_eq!(store.alert_count(), 1);
    }

    #[test]
    fn auto_dismiss_alerts_expire() {
        let registry = MetricRegistry::default();
        let metrics = vec![
            snapshot(MetricKind::Nps, 30.0, 30.0, 12.0),
            snapshot(MetricKind::Ticket, 2.0, 4.0, 0.0),
        ];
        let now = Utc::now();
        let mut store = EngagementStore::default();
        store.absorb(generate(&metrics, &registry), now);
        assert_eq!(store.alert_count(), 2);

        assert_eq!(store.expire(now + Duration::milliseconds(7999)), 0);
        assert_eq!(store.expire(now + Duration::milliseconds(8000)), 1);
        assert!(store.alerts().all(|a| a.auto_dismiss_ms.is_none()));
        assert!(store.dismiss("critical-ticket-satisfaction"));
        assert_eq!(store.alert_count(), 0);
    }

    #[test]
    fn refresh_keeps_dismissed_alerts_hidden_while_condition_holds() {
        let registry = MetricRegistry::default();
        let critical = vec![snapshot(MetricKind::Ticket, 2.0, 4.0, 0.0)];
        let now = Utc::now();
        let mut store = EngagementStore::default();
        store.refresh(generate(&critical, &registry), now);
        assert!(store.dismiss("critical-ticket-satisfaction"));

        store.refresh(generate(&critical, &registry), now);
        assert_eq!(store.alert_count(), 0);
        assert!(store.insights().any(|i| i.kind == InsightKind::Warning));

        let recovered = vec![snapshot(MetricKind::Ticket, 4.4, 4.0, 0.0)];
        store.refresh(generate(&recovered, &registry), now);
        assert!(store.insights().all(|i| i.kind != InsightKind::Warning));

        store.refresh(generate(&critical, &registry), now);
        assert_eq!(store.alert_count(), 1);
    }

    #[test]
    fn refresh_preserves_original_raise_time() {
        let registry = MetricRegistry::default();
        let metrics = vec![snapshot(MetricKind::Nps, 30.0, 30.0, 12.0)];
        let start = Utc::now();
        let mut store = EngagementStore::default();
        store.refresh(generate(&metrics, &registry), start);
        store.refresh(
            generate(&metrics, &registry),
            start + Duration::milliseconds(5000),
        );
        assert_eq!(store.expire(start + Duration::milliseconds(8000)), 1);
        assert_eq!(store.alert_count(), 0);
    }
}
