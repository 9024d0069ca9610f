use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

mod config;
mod dashboard;
mod db;
mod defaults;
mod engagement;
mod metric;
mod models;
mod report;
mod trend;
mod upload;
mod ytd;

use config::AnalyticsConfig;
use dashboard::DashboardState;
use metric::MetricRegistry;
use models::{DashboardBundle, SalesPlan};

#[derive(Parser)]
#[command(name = "satisfaction-pulse")]
#[command(about = "Customer satisfaction and sales analytics for Group Scholar", long_about = None)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,
    /// JSON file overriding metric scales, thresholds and targets
    #[arg(long, env = "PULSE_CONFIG", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Store the demo dashboard and sales plan for a user
    Seed {
        #[arg(long)]
        user: Uuid,
    },
    /// Upload a spreadsheet (CSV export) of monthly scores
    Import {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        file: PathBuf,
    },
    /// Write an empty upload template
    Template {
        #[arg(long, default_value = "satisfaction-template.csv")]
        out: PathBuf,
    },
    /// Show metric scores, tiers and alerts
    #[command(group(
        ArgGroup::new("source")
            .args(["user", "file"])
            .multiple(false)
    ))]
    Score {
        #[arg(long)]
        user: Option<Uuid>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Generate a markdown report
    #[command(group(
        ArgGroup::new("source")
            .args(["user", "file"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        user: Option<Uuid>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Replace a user's dashboard with demo data
    Reset {
        #[arg(long)]
        user: Uuid,
    },
    /// Update and analyze a user's sales plan
    Sales {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        target: Option<f64>,
        #[arg(long, value_delimiter = ',')]
        actuals: Option<Vec<f64>>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=12))]
        current_month: Option<u8>,
    },
    /// Recompute the dashboard whenever a user's data changes
    Watch {
        #[arg(long)]
        user: Uuid,
    },
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sqlx=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn connect(database_url: Option<&str>) -> anyhow::Result<PgPool> {
    let database_url =
        database_url.context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Falls back to demo data when nothing is stored or the read fails.
async fn load_bundle_or_demo(
    pool: &PgPool,
    user: Uuid,
    registry: &MetricRegistry,
    config: &AnalyticsConfig,
) -> DashboardBundle {
    match db::load_bundle(pool, user).await {
        Ok(Some(bundle)) => bundle,
        Ok(None) => {
            info!(%user, "no stored dashboard, showing demo data");
            defaults::demo_bundle(registry, &config.targets)
        }
        Err(err) => {
            warn!(%user, error = %err, "failed to load dashboard, showing demo data");
            defaults::demo_bundle(registry, &config.targets)
        }
    }
}

async fn load_sales_analysis(pool: &PgPool, user: Uuid) -> Option<models::YtdAnalysis> {
    match db::load_sales_plan(pool, user).await {
        Ok(plan) => plan.map(|plan| ytd::calculate_ytd_analysis(&plan.monthly_actuals, plan.annual_target, None)),
        Err(err) => {
            warn!(%user, error = %err, "failed to load sales plan");
            None
        }
    }
}

fn print_scores(state: &DashboardState) {
    println!("Overall performance score: {}", state.performance_score());
    for view in state.views() {
        let trend = view
            .trend_change
            .map(|value| format!("{value:+.1}%"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "- {}: {:.1} ({:.0}% of scale, {}) trend {}",
            view.snapshot.title,
            view.snapshot.current_score,
            view.normalized,
            view.level.as_str(),
            trend
        );
    }

    let alerts: Vec<_> = state.engagement().alerts().collect();
    if !alerts.is_empty() {
        println!("Alerts:");
        for alert in alerts {
            println!("- {}: {}", alert.title, alert.message);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AnalyticsConfig::load(cli.config.as_deref())?;
    let registry = config.registry();
    let database_url = cli.database_url.as_deref();

    match cli.command {
        Commands::InitDb => {
            let pool = connect(database_url).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { user } => {
            let pool = connect(database_url).await?;
            let bundle = defaults::demo_bundle(&registry, &config.targets);
            db::seed(&pool, user, &bundle, &defaults::demo_sales_plan()).await?;
            println!("Demo data stored for {user}.");
        }
        Commands::Import { user, file } => {
            let upload = upload::parse_file(&file)
                .with_context(|| format!("failed to import {}", file.display()))?;
            let months = upload.month_count();
            let skipped = upload.skipped_rows;

            let pool = connect(database_url).await?;
            let bundle = load_bundle_or_demo(&pool, user, &registry, &config).await;
            let mut state = DashboardState::new(bundle, &registry, Utc::now());
            state.apply_upload(upload, &registry, &config.targets, Utc::now());

            if let Err(err) = db::save_bundle(&pool, user, state.bundle()).await {
                error!(%user, error = %err, "failed to save uploaded data");
                return Err(err.context("upload parsed but could not be saved"));
            }
            println!(
                "Imported {months} months from {} ({skipped} rows skipped).",
                file.display()
            );
            print_scores(&state);
        }
        Commands::Template { out } => {
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            upload::write_template(file)?;
            println!("Template written to {}.", out.display());
        }
        Commands::Score { user, file } => {
            let state = match (user, file) {
                (_, Some(file)) => {
                    let mut state = DashboardState::new(DashboardBundle::default(), &registry, Utc::now());
                    state.apply_upload(upload::parse_file(&file)?, &registry, &config.targets, Utc::now());
                    state
                }
                (Some(user), None) => {
                    let pool = connect(database_url).await?;
                    let bundle = load_bundle_or_demo(&pool, user, &registry, &config).await;
                    DashboardState::new(bundle, &registry, Utc::now())
                }
                (None, None) => DashboardState::new(
                    defaults::demo_bundle(&registry, &config.targets),
                    &registry,
                    Utc::now(),
                ),
            };
            print_scores(&state);
        }
        Commands::Report { user, file, out } => {
            let (owner, state, ytd) = match (user, file) {
                (_, Some(file)) => {
                    let mut state = DashboardState::new(DashboardBundle::default(), &registry, Utc::now());
                    state.apply_upload(upload::parse_file(&file)?, &registry, &config.targets, Utc::now());
                    (file.display().to_string(), state, None)
                }
                (Some(user), None) => {
                    let pool = connect(database_url).await?;
                    let bundle = load_bundle_or_demo(&pool, user, &registry, &config).await;
                    let ytd = load_sales_analysis(&pool, user).await;
                    (
                        user.to_string(),
                        DashboardState::new(bundle, &registry, Utc::now()),
                        ytd,
                    )
                }
                (None, None) => {
                    let plan = defaults::demo_sales_plan();
                    (
                        "demo".to_string(),
                        DashboardState::new(
                            defaults::demo_bundle(&registry, &config.targets),
                            &registry,
                            Utc::now(),
                        ),
                        Some(ytd::calculate_ytd_analysis(&plan.monthly_actuals, plan.annual_target, None)),
                    )
                }
            };
            let report = report::build_report(&owner, Utc::now(), &state, ytd.as_ref());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Reset { user } => {
            let pool = connect(database_url).await?;
            let bundle = load_bundle_or_demo(&pool, user, &registry, &config).await;
            let mut state = DashboardState::new(bundle, &registry, Utc::now());
            state.reset(
                defaults::demo_bundle(&registry, &config.targets),
                &registry,
                Utc::now(),
            );
            if let Err(err) = db::save_bundle(&pool, user, state.bundle()).await {
                error!(%user, error = %err, "failed to save reset dashboard");
                return Err(err.context("dashboard reset could not be saved"));
            }
            println!("Dashboard for {user} reset to demo data.");
        }
        Commands::Sales {
            user,
            target,
            actuals,
            current_month,
        } => {
            let pool = connect(database_url).await?;
            let stored = db::load_sales_plan(&pool, user).await?;

            let plan = match (stored, target, actuals) {
                (stored, Some(annual_target), Some(monthly_actuals)) => {
                    let plan = SalesPlan {
                        annual_target,
                        monthly_actuals,
                    };
                    if stored.as_ref() != Some(&plan) {
                        db::save_sales_plan(&pool, user, &plan).await?;
                    }
                    plan
                }
                (Some(mut plan), target, actuals) => {
                    if let Some(annual_target) = target {
                        plan.annual_target = annual_target;
                    }
                    if let Some(monthly_actuals) = actuals {
                        plan.monthly_actuals = monthly_actuals;
                    }
                    db::save_sales_plan(&pool, user, &plan).await?;
                    plan
                }
                (None, _, _) => {
                    anyhow::bail!("no sales plan stored for {user}; pass --target and --actuals")
                }
            };

            let analysis = ytd::calculate_ytd_analysis(
                &plan.monthly_actuals,
                plan.annual_target,
                current_month.map(usize::from),
            );
            println!(
                "YTD {:.0} of {:.0} expected ({:.1}%), {} months remaining.",
                analysis.ytd_actual,
                analysis.ytd_expected,
                analysis.ytd_achievement,
                analysis.months_remaining
            );
            println!(
                "Projected year end {:.0} vs target {:.0}; need {:.0}/month. {}",
                analysis.projected_year_end,
                analysis.annual_target,
                analysis.required_monthly_average,
                if analysis.is_on_track { "On track." } else { "Behind plan." }
            );
        }
        Commands::Watch { user } => {
            let pool = connect(database_url).await?;
            let mut listener = db::change_listener(&pool).await?;
            let bundle = load_bundle_or_demo(&pool, user, &registry, &config).await;
            let mut state = DashboardState::new(bundle, &registry, Utc::now());
            print_scores(&state);
            info!(%user, channel = db::CHANGE_CHANNEL, "watching for changes");

            loop {
                let notification = listener.recv().await?;
                if notification.payload() != user.to_string() {
                    continue;
                }

                let bundle = load_bundle_or_demo(&pool, user, &registry, &config).await;
                state.replace_bundle(bundle, &registry, Utc::now());
                let expired = state.engagement_mut().expire(Utc::now());
                info!(%user, expired, "dashboard refreshed");
                print_scores(&state);
            }
        }
    }

    Ok(())
}
