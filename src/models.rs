use serde::{Deserialize, Serialize};

use crate::metric::MetricFamily;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Nps,
    Ticket,
    Project,
    Adhoc,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Nps,
        MetricKind::Ticket,
        MetricKind::Project,
        MetricKind::Adhoc,
    ];

    pub fn family(&self) -> MetricFamily {
        match self {
            MetricKind::Nps => MetricFamily::Nps,
            MetricKind::Ticket | MetricKind::Project | MetricKind::Adhoc => {
                MetricFamily::Satisfaction
            }
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MetricKind::Nps => "Net Promoter Score",
            MetricKind::Ticket => "Ticket Satisfaction",
            MetricKind::Project => "Project Satisfaction",
            MetricKind::Adhoc => "Ad-hoc Feedback",
        }
    }

    /// Key used for the persisted series and snapshot rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Nps => "nps",
            MetricKind::Ticket => "jira",
            MetricKind::Project => "satisfaction",
            MetricKind::Adhoc => "adhoc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub month: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respondents: Option<i32>,
}

impl TimeSeriesPoint {
    pub fn new(month: impl Into<String>, score: f64) -> Self {
        Self {
            month: month.into(),
            score,
            respondents: None,
        }
    }

    pub fn with_respondents(mut self, respondents: i32) -> Self {
        self.respondents = Some(respondents);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub kind: MetricKind,
    pub title: String,
    pub current_score: f64,
    pub target: f64,
    pub max_score: f64,
    pub trend: f64,
    pub is_real_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyComment {
    pub month: String,
    pub comment: String,
}

/// Everything persisted for one user's dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardBundle {
    pub metrics: Vec<MetricSnapshot>,
    pub nps_data: Vec<TimeSeriesPoint>,
    pub jira_data: Vec<TimeSeriesPoint>,
    pub satisfaction_data: Vec<TimeSeriesPoint>,
    pub adhoc_data: Vec<TimeSeriesPoint>,
    #[serde(default)]
    pub comments: Vec<MonthlyComment>,
}

impl DashboardBundle {
    pub fn series(&self, kind: MetricKind) -> &[TimeSeriesPoint] {
        match kind {
            MetricKind::Nps => &self.nps_data,
            MetricKind::Ticket => &self.jira_data,
            MetricKind::Project => &self.satisfaction_data,
            MetricKind::Adhoc => &self.adhoc_data,
        }
    }

    pub fn series_mut(&mut self, kind: MetricKind) -> &mut Vec<TimeSeriesPoint> {
        match kind {
            MetricKind::Nps => &mut self.nps_data,
            MetricKind::Ticket => &mut self.jira_data,
            MetricKind::Project => &mut self.satisfaction_data,
            MetricKind::Adhoc => &mut self.adhoc_data,
        }
    }

    pub fn snapshot(&self, kind: MetricKind) -> Option<&MetricSnapshot> {
        self.metrics.iter().find(|metric| metric.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesPlan {
    pub annual_target: f64,
    pub monthly_actuals: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YtdAnalysis {
    pub annual_target: f64,
    pub months_completed: usize,
    pub months_remaining: usize,
    pub ytd_actual: f64,
    pub ytd_expected: f64,
    pub ytd_achievement: f64,
    pub avg_monthly_actual: f64,
    pub projected_year_end: f64,
    pub projected_achievement: f64,
    pub required_monthly_average: f64,
    pub gap: f64,
    pub is_on_track: bool,
}
