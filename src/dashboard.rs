use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::Targets;
use crate::engagement::{self, EngagementStore};
use crate::metric::{MetricRegistry, PerformanceLevel};
use crate::models::{DashboardBundle, MetricKind, MetricSnapshot};
use crate::trend;
use crate::upload::ParsedUpload;

/// A snapshot with its derived values resolved against a registry.
#[derive(Debug, Clone)]
pub struct MetricView {
    pub snapshot: MetricSnapshot,
    pub normalized: f64,
    pub level: PerformanceLevel,
    pub trend_change: Option<f64>,
}

/// Mutable dashboard context owned by the command loop. Every mutation goes
/// through `recompute`, which rebuilds all derived values.
#[derive(Debug)]
pub struct DashboardState {
    bundle: DashboardBundle,
    views: Vec<MetricView>,
    performance_score: i64,
    engagement: EngagementStore,
}

impl DashboardState {
    pub fn new(bundle: DashboardBundle, registry: &MetricRegistry, now: DateTime<Utc>) -> Self {
        let mut state = Self {
            bundle,
            views: Vec::new(),
            performance_score: 0,
            engagement: EngagementStore::default(),
        };
        state.recompute(registry, now);
        state
    }

    pub fn bundle(&self) -> &DashboardBundle {
        &self.bundle
    }

    pub fn views(&self) -> &[MetricView] {
        &self.views
    }

    pub fn performance_score(&self) -> i64 {
        self.performance_score
    }

    pub fn engagement(&self) -> &EngagementStore {
        &self.engagement
    }

    pub fn engagement_mut(&mut self) -> &mut EngagementStore {
        &mut self.engagement
    }

    /// Replaces the series with uploaded data and marks snapshots as real.
    pub fn apply_upload(
        &mut self,
        upload: ParsedUpload,
        registry: &MetricRegistry,
        targets: &Targets,
        now: DateTime<Utc>,
    ) {
        self.bundle.nps_data = upload.nps;
        self.bundle.jira_data = upload.jira;
        self.bundle.satisfaction_data = upload.project;
        self.bundle.adhoc_data = upload.adhoc;
        self.bundle.comments = upload.comments;
        self.bundle.metrics = snapshots_from_series(&self.bundle, registry, targets, true);
        self.recompute(registry, now);
    }

    /// Swaps in a freshly fetched bundle, keeping engagement history.
    pub fn replace_bundle(
        &mut self,
        bundle: DashboardBundle,
        registry: &MetricRegistry,
        now: DateTime<Utc>,
    ) {
        self.bundle = bundle;
        self.recompute(registry, now);
    }

    pub fn reset(&mut self, defaults: DashboardBundle, registry: &MetricRegistry, now: DateTime<Utc>) {
        self.engagement = EngagementStore::default();
        self.replace_bundle(defaults, registry, now);
    }

    pub fn recompute(&mut self, registry: &MetricRegistry, now: DateTime<Utc>) {
        self.views = metric_views(&self.bundle, registry);
        self.performance_score = performance_score(&self.bundle.metrics, registry);
        self.engagement
            .refresh(engagement::generate(&self.bundle.metrics, registry), now);
        debug!(
            metrics = self.views.len(),
            performance_score = self.performance_score,
            alerts = self.engagement.alert_count(),
            "dashboard recomputed"
        );
    }
}

pub fn metric_views(bundle: &DashboardBundle, registry: &MetricRegistry) -> Vec<MetricView> {
    bundle
        .metrics
        .iter()
        .map(|snapshot| {
            let family = snapshot.kind.family();
            MetricView {
                normalized: registry.normalize_score(snapshot.current_score, family),
                level: registry.performance_level(snapshot.current_score, family),
                trend_change: trend::trend_change(bundle.series(snapshot.kind)),
                snapshot: snapshot.clone(),
            }
        })
        .collect()
}

/// Rounded mean of the normalized scores; 0 without metrics.
pub fn performance_score(metrics: &[MetricSnapshot], registry: &MetricRegistry) -> i64 {
    if metrics.is_empty() {
        return 0;
    }

    let total: f64 = metrics
        .iter()
        .map(|metric| registry.normalize_score(metric.current_score, metric.kind.family()))
        .sum();
    (total / metrics.len() as f64).round() as i64
}

/// One snapshot per metric kind with a non-empty series. The current score
/// is the latest point.
pub fn snapshots_from_series(
    bundle: &DashboardBundle,
    registry: &MetricRegistry,
    targets: &Targets,
    is_real_data: bool,
) -> Vec<MetricSnapshot> {
    MetricKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let series = bundle.series(kind);
            let latest = series.last()?;
            Some(MetricSnapshot {
                kind,
                title: kind.title().to_string(),
                current_score: latest.score,
                target: targets.target(kind),
                max_score: registry.max_score(kind.family()),
                trend: trend::calculate_trend(series),
                is_real_data,
            })
        })
        .collect()
}
