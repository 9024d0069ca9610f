use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::dashboard::DashboardState;
use crate::engagement::{AlertSeverity, Impact};
use crate::models::YtdAnalysis;

fn format_trend(trend: Option<f64>) -> String {
    match trend {
        Some(value) => format!("{value:+.1}%"),
        None => "n/a".to_string(),
    }
}

fn impact_label(impact: Impact) -> &'static str {
    match impact {
        Impact::Low => "low",
        Impact::Medium => "medium",
        Impact::High => "high",
    }
}

fn severity_label(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Low => "low",
        AlertSeverity::High => "high",
        AlertSeverity::Critical => "critical",
    }
}

pub fn build_report(
    owner: &str,
    generated_at: DateTime<Utc>,
    state: &DashboardState,
    ytd: Option<&YtdAnalysis>,
) -> String {
    let mut output = String::new();
    let bundle = state.bundle();
    let is_demo = bundle.metrics.iter().all(|metric| !metric.is_real_data);

    let _ = writeln!(output, "# Satisfaction Pulse Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        owner,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    if is_demo {
        let _ = writeln!(output, "_Showing demo data; upload a spreadsheet to replace it._");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "Overall performance score: {}", state.performance_score());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Metrics");

    if state.views().is_empty() {
        let _ = writeln!(output, "No metrics recorded yet.");
    } else {
        for view in state.views() {
            let snapshot = &view.snapshot;
            let _ = writeln!(
                output,
                "- {}: {:.1} / {:.0} (target {:.1}, {:.0}% of scale, {}, trend {})",
                snapshot.title,
                snapshot.current_score,
                snapshot.max_score,
                snapshot.target,
                view.normalized,
                view.level.as_str(),
                format_trend(view.trend_change)
            );
        }
    }

    if let Some(ytd) = ytd {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Sales Year to Date");
        let _ = writeln!(
            output,
            "- {} of 12 months: {:.0} actual vs {:.0} expected ({:.1}%)",
            ytd.months_completed, ytd.ytd_actual, ytd.ytd_expected, ytd.ytd_achievement
        );
        let _ = writeln!(
            output,
            "- Projected year end {:.0} against target {:.0} ({:.1}%)",
            ytd.projected_year_end, ytd.annual_target, ytd.projected_achievement
        );
        let _ = writeln!(
            output,
            "- Required monthly average for the remaining {} months: {:.0}",
            ytd.months_remaining, ytd.required_monthly_average
        );
        let _ = writeln!(
            output,
            "- Status: {}",
            if ytd.is_on_track { "on track" } else { "behind plan" }
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Alerts");
    let mut alerts: Vec<_> = state.engagement().alerts().collect();
    alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
    if alerts.is_empty() {
        let _ = writeln!(output, "No active alerts.");
    } else {
        for alert in alerts {
            let _ = writeln!(
                output,
                "- [{}] {}: {}",
                severity_label(alert.severity),
                alert.title,
                alert.message
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Insights");
    let insights: Vec<_> = state.engagement().insights().collect();
    if insights.is_empty() {
        let _ = writeln!(output, "No insights for the current data.");
    } else {
        for insight in insights {
            let _ = writeln!(
                output,
                "- {} ({} impact, {}% confidence): {}",
                insight.title,
                impact_label(insight.impact),
                insight.confidence,
                insight.description
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Achievements");
    let achievements: Vec<_> = state.engagement().achievements().collect();
    if achievements.is_empty() {
        let _ = writeln!(output, "No achievements unlocked yet.");
    } else {
        for achievement in achievements {
            let _ = writeln!(output, "- {}: {}", achievement.title, achievement.description);
        }
    }

    if !bundle.comments.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Comments");
        for comment in bundle.comments.iter().rev().take(5) {
            let _ = writeln!(output, "- {}: {}", comment.month, comment.comment);
        }
    }

    output
}
