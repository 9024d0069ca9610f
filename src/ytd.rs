use crate::models::YtdAnalysis;

const MONTHS_PER_YEAR: usize = 12;
const ON_TRACK_ACHIEVEMENT: f64 = 95.0;

/// Year-to-date position and straight-line year-end projection.
///
/// `current_month` caps how many actuals count as completed; it never
/// extends past the actuals supplied.
pub fn calculate_ytd_analysis(
    monthly_actuals: &[f64],
    annual_target: f64,
    current_month: Option<usize>,
) -> YtdAnalysis {
    let months_completed = current_month
        .unwrap_or(monthly_actuals.len())
        .min(monthly_actuals.len());
    let months_remaining = MONTHS_PER_YEAR.saturating_sub(months_completed);

    let ytd_actual: f64 = monthly_actuals[..months_completed].iter().sum();
    let ytd_expected = annual_target / MONTHS_PER_YEAR as f64 * months_completed as f64;
    let ytd_achievement = if ytd_expected > 0.0 {
        ytd_actual / ytd_expected * 100.0
    } else {
        0.0
    };

    let avg_monthly_actual = if months_completed > 0 {
        ytd_actual / months_completed as f64
    } else {
        0.0
    };
    let projected_year_end = ytd_actual + avg_monthly_actual * months_remaining as f64;

    let required_monthly_average = if months_remaining > 0 {
        (annual_target - ytd_actual).max(0.0) / months_remaining as f64
    } else {
        0.0
    };

    let projected_achievement = if annual_target > 0.0 {
        projected_year_end / annual_target * 100.0
    } else {
        0.0
    };

    YtdAnalysis {
        annual_target,
        months_completed,
        months_remaining,
        ytd_actual,
        ytd_expected,
        ytd_achievement,
        avg_monthly_actual,
        projected_year_end,
        projected_achievement,
        required_monthly_average,
        gap: annual_target - projected_year_end,
        is_on_track: ytd_achievement >= ON_TRACK_ACHIEVEMENT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_on_plan() {
        let analysis = calculate_ytd_analysis(&[100.0, 100.0, 100.0], 1200.0, None);
        assert_eq!(analysis.months_completed, 3);
        assert_eq!(analysis.months_remaining, 9);
        assert_eq!(analysis.ytd_actual, 300.0);
        assert_eq!(analysis.ytd_expected, 300.0);
        assert_eq!(analysis.ytd_achievement, 100.0);
        assert_eq!(analysis.required_monthly_average, 100.0);
        assert_eq!(analysis.projected_year_end, 1200.0);
        assert_eq!(analysis.gap, 0.0);
        assert!(analysis.is_on_track);
    }

    #[test]
    fn current_month_limits_completed_months() {
        let analysis = calculate_ytd_analysis(&[100.0, 50.0, 200.0], 1200.0, Some(2));
        assert_eq!(analysis.months_completed, 2);
        assert_eq!(analysis.ytd_actual, 150.0);
        assert_eq!(analysis.ytd_achievement, 75.0);
        assert!(!analysis.is_on_track);
        assert_eq!(analysis.required_monthly_average, 105.0);
    }

    #[test]
    fn current_month_never_exceeds_supplied_actuals() {
        let analysis = calculate_ytd_analysis(&[100.0], 1200.0, Some(6));
        assert_eq!(analysis.months_completed, 1);
        assert_eq!(analysis.months_remaining, 11);
    }

    #[test]
    fn no_actuals_yields_zeroes() {
        let analysis = calculate_ytd_analysis(&[], 1200.0, None);
        assert_eq!(analysis.ytd_achievement, 0.0);
        assert_eq!(analysis.projected_year_end, 0.0);
        assert_eq!(analysis.required_monthly_average, 100.0);
        assert!(!analysis.is_on_track);
    }

    #[test]
    fn exceeded_target_needs_nothing_more() {
        let analysis = calculate_ytd_analysis(&[700.0, 700.0], 1200.0, None);
        assert_eq!(analysis.required_monthly_average, 0.0);
        assert!(analysis.is_on_track);
    }

    #[test]
    fn full_year_has_no_remaining_months() {
        let actuals = vec![100.0; 12];
        let analysis = calculate_ytd_analysis(&actuals, 1000.0, None);
        assert_eq!(analysis.months_remaining, 0);
        assert_eq!(analysis.required_monthly_average, 0.0);
        assert_eq!(analysis.projected_year_end, 1200.0);
    }
}
