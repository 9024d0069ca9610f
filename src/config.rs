use std::path::Path;

use anyhow::{ensure, Context};
use serde::Deserialize;
use tracing::info;

use crate::metric::{MetricRegistry, MetricType};
use crate::models::MetricKind;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Targets {
    pub nps: f64,
    pub ticket: f64,
    pub project: f64,
    pub adhoc: f64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            nps: 40.0,
            ticket: 4.2,
            project: 4.0,
            adhoc: 4.3,
        }
    }
}

impl Targets {
    pub fn target(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Nps => self.nps,
            MetricKind::Ticket => self.ticket,
            MetricKind::Project => self.project,
            MetricKind::Adhoc => self.adhoc,
        }
    }
}

/// Analytics settings, read from an optional JSON file. Missing fields keep
/// their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub clamp_normalized: bool,
    pub metric_types: Vec<MetricType>,
    pub targets: Targets,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            clamp_normalized: false,
            metric_types: vec![MetricType::nps(), MetricType::satisfaction()],
            targets: Targets::default(),
        }
    }
}

impl AnalyticsConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_json(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        info!(path = %path.display(), "loaded analytics config");
        Ok(config)
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for metric_type in &self.metric_types {
            ensure!(
                metric_type.scale.max > metric_type.scale.min,
                "{:?} scale max must exceed min",
                metric_type.family
            );
            let t = &metric_type.thresholds;
            ensure!(
                t.critical <= t.warning && t.warning <= t.good && t.good <= t.excellent,
                "{:?} thresholds must be ascending",
                metric_type.family
            );
        }
        Ok(())
    }

    pub fn registry(&self) -> MetricRegistry {
        MetricRegistry::new(self.metric_types.clone(), self.clamp_normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricFamily;

    #[test]
    fn empty_object_uses_defaults() {
        let config = AnalyticsConfig::from_json("{}").expect("config");
        assert!(!config.clamp_normalized);
        assert_eq!(config.metric_types.len(), 2);
        assert_eq!(config.targets, Targets::default());
    }

    #[test]
    fn overrides_targets_and_clamping() {
        let config =
            AnalyticsConfig::from_json(r#"{"clamp_normalized": true, "targets": {"nps": 55}}"#)
                .expect("config");
        assert_eq!(config.targets.nps, 55.0);
        assert_eq!(config.targets.ticket, 4.2);
        let registry = config.registry();
        assert_eq!(registry.normalize_score(150.0, MetricFamily::Nps), 100.0);
    }

    #[test]
    fn rejects_degenerate_scale() {
        let raw = r#"{"metric_types": [{
            "family": "satisfaction",
            "scale": {"min": 5, "max": 5},
            "thresholds": {"critical": 1, "warning": 2, "good": 3, "excellent": 4}
        }]}"#;
        assert!(AnalyticsConfig::from_json(raw).is_err());
    }

    #[test]
    fn rejects_descending_thresholds() {
        let raw = r#"{"metric_types": [{
            "family": "nps",
            "scale": {"min": -100, "max": 100},
            "thresholds": {"critical": 50, "warning": 0, "good": 30, "excellent": 60}
        }]}"#;
        assert!(AnalyticsConfig::from_json(raw).is_err());
    }
}
