use crate::config::Targets;
use crate::dashboard::snapshots_from_series;
use crate::metric::MetricRegistry;
use crate::models::{DashboardBundle, MonthlyComment, SalesPlan, TimeSeriesPoint};

const DEMO_MONTHS: [&str; 6] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun"];

fn demo_series(scores: [f64; 6], respondents: [i32; 6]) -> Vec<TimeSeriesPoint> {
    DEMO_MONTHS
        .iter()
        .zip(scores)
        .zip(respondents)
        .map(|((month, score), count)| TimeSeriesPoint::new(*month, score).with_respondents(count))
        .collect()
}

/// Demo bundle shown before any upload, after a failed read and on reset.
pub fn demo_bundle(registry: &MetricRegistry, targets: &Targets) -> DashboardBundle {
    let mut bundle = DashboardBundle {
        metrics: Vec::new(),
        nps_data: demo_series(
            [32.0, 35.0, 31.0, 38.0, 42.0, 45.0],
            [118, 124, 109, 131, 140, 152],
        ),
        jira_data: demo_series([4.1, 4.0, 4.2, 4.3, 4.1, 4.4], [86, 92, 77, 95, 101, 99]),
        satisfaction_data: demo_series([3.9, 4.0, 4.1, 3.8, 4.0, 4.2], [18, 21, 19, 22, 20, 24]),
        adhoc_data: demo_series([4.3, 4.2, 4.4, 4.5, 4.3, 4.6], [34, 29, 41, 38, 36, 44]),
        comments: vec![MonthlyComment {
            month: "Jun".to_string(),
            comment: "Demo data - upload a spreadsheet to replace".to_string(),
        }],
    };
    bundle.metrics = snapshots_from_series(&bundle, registry, targets, false);
    bundle
}

pub fn demo_sales_plan() -> SalesPlan {
    SalesPlan {
        annual_target: 1_200_000.0,
        monthly_actuals: vec![92_000.0, 97_500.0, 104_000.0, 99_000.0, 108_500.0, 112_000.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricKind;

    #[test]
    fn demo_bundle_has_every_metric_marked_as_demo() {
        let bundle = demo_bundle(&MetricRegistry::default(), &Targets::default());
        assert_eq!(bundle.metrics.len(), MetricKind::ALL.len());
        assert!(bundle.metrics.iter().all(|metric| !metric.is_real_data));

        let nps = bundle.snapshot(MetricKind::Nps).expect("nps snapshot");
        assert_eq!(nps.current_score, 45.0);
        assert_eq!(nps.max_score, 100.0);
    }
}
