use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFamily {
    Nps,
    Satisfaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub min: f64,
    pub max: f64,
}

/// Ascending raw-score boundaries for the performance tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub critical: f64,
    pub warning: f64,
    pub good: f64,
    pub excellent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricType {
    pub family: MetricFamily,
    pub scale: Scale,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Critical,
    Warning,
    Good,
    Excellent,
}

impl PerformanceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceLevel::Critical => "critical",
            PerformanceLevel::Warning => "warning",
            PerformanceLevel::Good => "good",
            PerformanceLevel::Excellent => "excellent",
        }
    }
}

impl MetricType {
    pub fn nps() -> Self {
        Self {
            family: MetricFamily::Nps,
            scale: Scale {
                min: -100.0,
                max: 100.0,
            },
            thresholds: Thresholds {
                critical: -50.0,
                warning: 0.0,
                good: 30.0,
                excellent: 50.0,
            },
        }
    }

    pub fn satisfaction() -> Self {
        Self {
            family: MetricFamily::Satisfaction,
            scale: Scale { min: 0.0, max: 5.0 },
            thresholds: Thresholds {
                critical: 2.5,
                warning: 3.5,
                good: 4.0,
                excellent: 4.5,
            },
        }
    }

    /// Position of `score` within the scale as a percentage. Out-of-scale
    /// scores land outside 0..=100.
    pub fn normalize(&self, score: f64) -> f64 {
        let span = self.scale.max - self.scale.min;
        if span == 0.0 {
            return 0.0;
        }
        ((score - self.scale.min) / span) * 100.0
    }

    /// Tier of the raw (not normalized) score. `thresholds.excellent` is
    /// informational; anything at or above `good` is excellent.
    pub fn level(&self, score: f64) -> PerformanceLevel {
        let t = &self.thresholds;
        if score < t.critical {
            PerformanceLevel::Critical
        } else if score < t.warning {
            PerformanceLevel::Warning
        } else if score < t.good {
            PerformanceLevel::Good
        } else {
            PerformanceLevel::Excellent
        }
    }
}

/// Metric types by family, plus the clamping policy for normalized scores.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    types: HashMap<MetricFamily, MetricType>,
    clamp: bool,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new(vec![MetricType::nps(), MetricType::satisfaction()], false)
    }
}

impl MetricRegistry {
    pub fn new(types: Vec<MetricType>, clamp: bool) -> Self {
        let types = types.into_iter().map(|t| (t.family, t)).collect();
        Self { types, clamp }
    }

    pub fn get(&self, family: MetricFamily) -> Option<&MetricType> {
        self.types.get(&family)
    }

    /// Unregistered families pass the raw score through as a percentage.
    pub fn normalize_score(&self, score: f64, family: MetricFamily) -> f64 {
        match self.get(family) {
            Some(metric_type) => {
                let pct = metric_type.normalize(score);
                if self.clamp {
                    pct.clamp(0.0, 100.0)
                } else {
                    pct
                }
            }
            None => score,
        }
    }

    pub fn performance_level(&self, score: f64, family: MetricFamily) -> PerformanceLevel {
        self.get(family)
            .map(|metric_type| metric_type.level(score))
            .unwrap_or(PerformanceLevel::Good)
    }

    pub fn max_score(&self, family: MetricFamily) -> f64 {
        self.get(family).map(|t| t.scale.max).unwrap_or(100.0)
    }
}
