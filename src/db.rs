use anyhow::{bail, Context};
use sqlx::postgres::PgListener;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{DashboardBundle, MetricKind, MetricSnapshot, MonthlyComment, SalesPlan, TimeSeriesPoint};

pub const CHANGE_CHANNEL: &str = "satisfaction_pulse_changes";

/// One stored point of a metric series. `position` keeps insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRow {
    pub metric_kind: String,
    pub position: i32,
    pub month: String,
    pub score: f64,
    pub respondents: Option<i32>,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub fn series_rows(bundle: &DashboardBundle) -> Vec<SeriesRow> {
    MetricKind::ALL
        .into_iter()
        .flat_map(|kind| {
            bundle
                .series(kind)
                .iter()
                .enumerate()
                .map(move |(position, point)| SeriesRow {
                    metric_kind: kind.as_str().to_string(),
                    position: position as i32,
                    month: point.month.clone(),
                    score: point.score,
                    respondents: point.respondents,
                })
        })
        .collect()
}

/// Rebuilds a bundle from stored rows. Series rows must arrive ordered by
/// position within each metric kind; snapshots come back in `MetricKind`
/// order.
pub fn assemble_bundle(
    mut metrics: Vec<MetricSnapshot>,
    rows: Vec<SeriesRow>,
    comments: Vec<MonthlyComment>,
) -> anyhow::Result<DashboardBundle> {
    metrics.sort_by_key(|metric| metric.kind);
    let mut bundle = DashboardBundle {
        metrics,
        comments,
        ..DashboardBundle::default()
    };

    for row in rows {
        let Some(kind) = MetricKind::parse(&row.metric_kind) else {
            bail!("unknown metric kind {:?} in stored series", row.metric_kind);
        };
        bundle.series_mut(kind).push(TimeSeriesPoint {
            month: row.month,
            score: row.score,
            respondents: row.respondents,
        });
    }

    Ok(bundle)
}

/// Replaces everything stored for the user in one transaction.
pub async fn save_bundle(pool: &PgPool, user_id: Uuid, bundle: &DashboardBundle) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO satisfaction_pulse.dashboards (user_id, updated_at)
        VALUES ($1, now())
        ON CONFLICT (user_id) DO UPDATE SET updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    for table in ["metric_snapshots", "series_points", "monthly_comments"] {
        sqlx::query(&format!(
            "DELETE FROM satisfaction_pulse.{table} WHERE user_id = $1"
        ))
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    for metric in &bundle.metrics {
        sqlx::query(
            r#"
            INSERT INTO satisfaction_pulse.metric_snapshots
            (user_id, metric_kind, title, current_score, target, max_score, trend, is_real_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user_id)
        .bind(metric.kind.as_str())
        .bind(&metric.title)
        .bind(metric.current_score)
        .bind(metric.target)
        .bind(metric.max_score)
        .bind(metric.trend)
        .bind(metric.is_real_data)
        .execute(&mut *tx)
        .await?;
    }

    let rows = series_rows(bundle);
    for row in &rows {
        sqlx::query(
            r#"
            INSERT INTO satisfaction_pulse.series_points
            (user_id, metric_kind, position, month, score, respondents)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user_id)
        .bind(&row.metric_kind)
        .bind(row.position)
        .bind(&row.month)
        .bind(row.score)
        .bind(row.respondents)
        .execute(&mut *tx)
        .await?;
    }

    for (position, comment) in bundle.comments.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO satisfaction_pulse.monthly_comments (user_id, position, month, comment)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(position as i32)
        .bind(&comment.month)
        .bind(&comment.comment)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    debug!(%user_id, metrics = bundle.metrics.len(), points = rows.len(), "bundle saved");
    Ok(())
}

/// `None` when nothing has been stored for the user yet.
pub async fn load_bundle(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<DashboardBundle>> {
    let exists = sqlx::query("SELECT 1 FROM satisfaction_pulse.dashboards WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .is_some();
    if !exists {
        return Ok(None);
    }

    let snapshot_rows = sqlx::query(
        r#"
        SELECT metric_kind, title, current_score, target, max_score, trend, is_real_data
        FROM satisfaction_pulse.metric_snapshots
        WHERE user_id = $1
        ORDER BY metric_kind
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut metrics = Vec::new();
    for row in snapshot_rows {
        let key: String = row.get("metric_kind");
        let kind = MetricKind::parse(&key)
            .with_context(|| format!("unknown metric kind {key:?} in stored snapshots"))?;
        metrics.push(MetricSnapshot {
            kind,
            title: row.get("title"),
            current_score: row.get("current_score"),
            target: row.get("target"),
            max_score: row.get("max_score"),
            trend: row.get("trend"),
            is_real_data: row.get("is_real_data"),
        });
    }

    let series = sqlx::query(
        r#"
        SELECT metric_kind, position, month, score, respondents
        FROM satisfaction_pulse.series_points
        WHERE user_id = $1
        ORDER BY metric_kind, position
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| SeriesRow {
        metric_kind: row.get("metric_kind"),
        position: row.get("position"),
        month: row.get("month"),
        score: row.get("score"),
        respondents: row.get("respondents"),
    })
    .collect();

    let comments = sqlx::query(
        r#"
        SELECT month, comment
        FROM satisfaction_pulse.monthly_comments
        WHERE user_id = $1
        ORDER BY position
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| MonthlyComment {
        month: row.get("month"),
        comment: row.get("comment"),
    })
    .collect();

    assemble_bundle(metrics, series, comments).map(Some)
}

pub async fn save_sales_plan(pool: &PgPool, user_id: Uuid, plan: &SalesPlan) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO satisfaction_pulse.sales_plans (user_id, annual_target, monthly_actuals, updated_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (user_id) DO UPDATE
        SET annual_target = EXCLUDED.annual_target,
            monthly_actuals = EXCLUDED.monthly_actuals,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(user_id)
    .bind(plan.annual_target)
    .bind(&plan.monthly_actuals)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_sales_plan(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<SalesPlan>> {
    let row = sqlx::query(
        "SELECT annual_target, monthly_actuals FROM satisfaction_pulse.sales_plans WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| SalesPlan {
        annual_target: row.get("annual_target"),
        monthly_actuals: row.get("monthly_actuals"),
    }))
}

pub async fn seed(pool: &PgPool, user_id: Uuid, bundle: &DashboardBundle, plan: &SalesPlan) -> anyhow::Result<()> {
    save_bundle(pool, user_id, bundle).await?;
    save_sales_plan(pool, user_id, plan).await?;
    info!(%user_id, "seeded demo dashboard");
    Ok(())
}

pub async fn change_listener(pool: &PgPool) -> anyhow::Result<PgListener> {
    let mut listener = PgListener::connect_with(pool)
        .await
        .context("failed to open change listener")?;
    listener.listen(CHANGE_CHANNEL).await?;
    Ok(listener)
}
