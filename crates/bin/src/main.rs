//! Ankara CLI binary.
//!
//! Imports fund data, runs the risk and performance batches and reads the
//! stored results back.

mod integration;

use ankara::data::{
    FundPerformanceMetric, PortfolioId, PortfolioRiskScore, ResultsStore, SqliteStore,
};
use ankara::performance::PerformanceBatch;
use ankara::risk::RiskBatch;
use ankara::{AnalyticsConfig, Pipeline};
use ankara_output::{ExportFormat, Exporter, PerformanceRecord, RiskScoreRecord};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use integration::ingest::{ImportSummary, import_labels, import_portfolios, import_prices};
use integration::store_location::{open_store, resolve_database_path};
use integration::tasks::join_engines;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "ankara=info";

#[derive(Parser)]
#[command(name = "ankara")]
#[command(about = "Ankara: portfolio risk scoring and fund peer performance", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite database (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Configuration file (defaults to ./ankara.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import input files into the database
    Import {
        #[command(subcommand)]
        source: ImportSource,
    },

    /// Score every active portfolio
    Risk {
        /// Calculation date (defaults to the latest price date)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Evaluate every fund against its peers
    Performance {
        /// Calculation date (defaults to the latest price date)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run both engines concurrently
    Run {
        /// Calculation date (defaults to the latest price date)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show current alerts
    Alerts {
        #[command(subcommand)]
        kind: AlertKind,

        /// Output format
        #[arg(long, value_enum, default_value = "text", global = true)]
        format: OutputFormat,
    },

    /// Show the latest risk score of a portfolio
    PortfolioRisk {
        /// Portfolio id
        id: i64,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Export stored rows of one date
    Export {
        /// Which rows to export
        #[arg(value_enum)]
        table: ExportTable,

        /// Calculation date (defaults to the latest stored date)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// csv, json or pretty-json
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Output file (defaults to stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Delete price observations outside the retention window
    Prune {
        /// Cutoff date (defaults to latest price date minus retention days)
        #[arg(long)]
        before: Option<NaiveDate>,
    },

    /// Show database contents and freshness
    Status {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum ImportSource {
    /// Price CSV: date,code,price,market_cap,number_of_investors
    Prices {
        /// CSV file
        path: PathBuf,
    },
    /// Label CSV: code,category,main_category
    Labels {
        /// CSV file
        path: PathBuf,
    },
    /// Portfolio registry JSON
    Portfolios {
        /// JSON file
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum AlertKind {
    /// Portfolios whose latest score is HIGH
    Portfolios,
    /// Funds whose latest evaluation is flagged
    Funds,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExportTable {
    Risk,
    Performance,
}

#[derive(Debug, Clone, Copy)]
struct Engines {
    risk: bool,
    performance: bool,
}

/// Resolved configuration and database location.
struct Context {
    config: AnalyticsConfig,
    database: PathBuf,
}

impl Context {
    fn from_cli(cli: &Cli) -> Result<Self, Box<dyn std::error::Error>> {
        let config = AnalyticsConfig::load(cli.config.as_deref())?;
        let database = resolve_database_path(cli.db.as_deref(), config.database.as_deref());
        Ok(Self { config, database })
    }

    fn open_store(&self) -> Result<SqliteStore, Box<dyn std::error::Error>> {
        Ok(open_store(&self.database)?)
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;
    let cli = Cli::parse();
    let ctx = Context::from_cli(&cli)?;

    match cli.command {
        Commands::Import { source } => import(&ctx, source)?,
        Commands::Risk { date, format } => {
            let engines = Engines {
                risk: true,
                performance: false,
            };
            run_engines(&ctx, date, engines, format).await?;
        }
        Commands::Performance { date, format } => {
            let engines = Engines {
                risk: false,
                performance: true,
            };
            run_engines(&ctx, date, engines, format).await?;
        }
        Commands::Run { date, format } => {
            let engines = Engines {
                risk: true,
                performance: true,
            };
            run_engines(&ctx, date, engines, format).await?;
        }
        Commands::Alerts { kind, format } => show_alerts(&ctx, kind, format)?,
        Commands::PortfolioRisk { id, format } => show_portfolio_risk(&ctx, id, format)?,
        Commands::Export {
            table,
            date,
            format,
            output,
        } => export(&ctx, table, date, format, output)?,
        Commands::Prune { before } => prune(&ctx, before)?,
        Commands::Status { format } => show_status(&ctx, format)?,
    }

    Ok(())
}

fn progress_bar(message: &'static str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(StdDuration::from_millis(100));
    pb.set_message(message);
    Ok(pb)
}

fn import(ctx: &Context, source: ImportSource) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;

    let (what, summary): (&str, ImportSummary) = match source {
        ImportSource::Prices { path } => {
            let pb = progress_bar("Reading prices...")?;
            let result = import_prices(&store, &path, Some(&pb));
            pb.finish_and_clear();
            ("funds", result?)
        }
        ImportSource::Labels { path } => ("labelled funds", import_labels(&store, &path)?),
        ImportSource::Portfolios { path } => {
            let pb = progress_bar("Reading portfolios...")?;
            let result = import_portfolios(&store, &path, Some(&pb));
            pb.finish_and_clear();
            ("portfolios", result?)
        }
    };

    println!(
        "Imported {} rows ({} {}) into {}",
        summary.rows,
        summary.entities,
        what,
        ctx.database.display()
    );
    Ok(())
}

/// Calculation date: explicit, else the latest price date, else today.
fn resolve_date(
    store: &SqliteStore,
    date: Option<NaiveDate>,
) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    match date {
        Some(date) => Ok(date),
        None => Ok(store
            .latest_price_date()?
            .unwrap_or_else(|| Utc::now().date_naive())),
    }
}

async fn run_engines(
    ctx: &Context,
    date: Option<NaiveDate>,
    engines: Engines,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Arc::new(Pipeline::new(ctx.config.clone())?);

    let (date, snapshot) = {
        let store = ctx.open_store()?;
        let date = resolve_date(&store, date)?;
        let snapshot = pipeline.load_snapshot(&store, &store, date)?;
        (date, Arc::new(snapshot))
    };

    // Each task writes through its own connection.
    let risk_task = engines.risk.then(|| {
        let pipeline = Arc::clone(&pipeline);
        let snapshot = Arc::clone(&snapshot);
        let path = ctx.database.clone();
        task::spawn_blocking(move || -> ankara::Result<RiskBatch> {
            let store = open_store(&path)?;
            pipeline.run_risk(&snapshot, &store)
        })
    });
    let performance_task = engines.performance.then(|| {
        let pipeline = Arc::clone(&pipeline);
        let snapshot = Arc::clone(&snapshot);
        let path = ctx.database.clone();
        task::spawn_blocking(move || -> ankara::Result<PerformanceBatch> {
            let store = open_store(&path)?;
            pipeline.run_performance(&snapshot, &store)
        })
    });

    let (risk, performance) = join_engines(risk_task, performance_task).await?;

    let report = Pipeline::report(date, risk.as_ref(), performance.as_ref());
    match format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(())
}

fn show_alerts(
    ctx: &Context,
    kind: AlertKind,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;

    match kind {
        AlertKind::Portfolios => {
            let rows = store.high_risk_portfolios()?;
            match format {
                OutputFormat::Text => {
                    println!("High-risk portfolios: {}\n", rows.len());
                    print_risk_rows(&rows);
                }
                OutputFormat::Json => {
                    println!("{}", rows.export_to_string(ExportFormat::PrettyJson)?)
                }
            }
        }
        AlertKind::Funds => {
            let rows = store.poor_performers()?;
            match format {
                OutputFormat::Text => {
                    println!("Poor performers: {}\n", rows.len());
                    print_performance_rows(&rows);
                }
                OutputFormat::Json => {
                    println!("{}", rows.export_to_string(ExportFormat::PrettyJson)?)
                }
            }
        }
    }
    Ok(())
}

fn show_portfolio_risk(
    ctx: &Context,
    id: i64,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;
    let Some(row) = store.latest_risk(PortfolioId::from(id))? else {
        println!("No risk score computed yet for portfolio {}", id);
        return Ok(());
    };

    match format {
        OutputFormat::Text => {
            println!("Portfolio {} as of {}", id, row.date);
            println!("{}", "=".repeat(40));
            println!("  Risk:           {}", row.classification);
            println!("  Score:          {:.4}", row.risk_score);
            println!(
                "  Volatility:     {:.6}  (pct {:.3})",
                row.components.volatility, row.percentiles.volatility
            );
            println!(
                "  Concentration:  {:.4}    (pct {:.3})",
                row.components.concentration, row.percentiles.concentration
            );
            println!(
                "  Max drawdown:   {:.4}    (pct {:.3})",
                row.components.max_drawdown, row.percentiles.max_drawdown
            );
            println!(
                "  Liquidity:      {:.4}    (pct {:.3})",
                row.components.liquidity_penalty, row.percentiles.liquidity_penalty
            );
        }
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&RiskScoreRecord::from(&row))?
        ),
    }
    Ok(())
}

fn export(
    ctx: &Context,
    table: ExportTable,
    date: Option<NaiveDate>,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;

    let latest = match table {
        ExportTable::Risk => store.latest_risk_date()?,
        ExportTable::Performance => store.latest_performance_date()?,
    };
    let Some(date) = date.or(latest) else {
        return Err("nothing has been computed yet".into());
    };

    let (count, content) = match table {
        ExportTable::Risk => {
            let rows = store.risk_scores_on(date)?;
            (rows.len(), rows.export_to_string(format)?)
        }
        ExportTable::Performance => {
            let rows = store.performance_metrics_on(date)?;
            (rows.len(), rows.export_to_string(format)?)
        }
    };

    match output {
        Some(path) => {
            std::fs::write(&path, content)?;
            info!(rows = count, date = %date, path = %path.display(), "exported");
            println!("Exported {} rows for {} to {}", count, date, path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn prune(ctx: &Context, before: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;

    let cutoff = match before {
        Some(date) => date,
        None => match store.latest_price_date()? {
            Some(latest) => latest - Duration::days(i64::from(ctx.config.retention_days)),
            None => {
                println!("No prices stored");
                return Ok(());
            }
        },
    };

    let removed = store.prune_prices_before(cutoff)?;
    println!("Removed {} price observations before {}", removed, cutoff);
    Ok(())
}

fn show_status(ctx: &Context, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;
    let stats = store.get_stats()?;

    match format {
        OutputFormat::Text => {
            let date = |d: Option<NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
            println!("Database: {}", ctx.database.display());
            println!("  Price observations:  {}", stats.observation_count);
            println!("  Funds:               {}", stats.fund_count);
            println!("  Labelled funds:      {}", stats.labelled_fund_count);
            println!("  Portfolios:          {}", stats.portfolio_count);
            println!("  Risk rows:           {}", stats.risk_row_count);
            println!("  Performance rows:    {}", stats.performance_row_count);
            println!("  Latest prices:       {}", date(stats.latest_price_date));
            println!("  Latest risk run:     {}", date(stats.latest_risk_date));
            println!("  Latest perf run:     {}", date(stats.latest_performance_date));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
    }
    Ok(())
}

fn print_risk_rows(rows: &[PortfolioRiskScore]) {
    println!(
        "{:>10}  {:<10}  {:<6}  {:>6}  {:>10}  {:>6}  {:>6}  {:>6}",
        "Portfolio", "Date", "Risk", "Score", "Volatility", "HHI", "MaxDD", "Liq"
    );
    for row in rows {
        println!(
            "{:>10}  {:<10}  {:<6}  {:>6.3}  {:>10.6}  {:>6.3}  {:>6.3}  {:>6.3}",
            row.portfolio_id.get(),
            row.date.to_string(),
            row.classification.to_string(),
            row.risk_score,
            row.components.volatility,
            row.components.concentration,
            row.components.max_drawdown,
            row.components.liquidity_penalty
        );
    }
}

fn print_performance_rows(rows: &[FundPerformanceMetric]) {
    println!(
        "{:<8}  {:<10}  {:<24}  {:>6}  {:>7}  {:>10}",
        "Fund", "Date", "Peer group", "Pct", "Z", "Confidence"
    );
    for row in rows {
        let record = PerformanceRecord::from(row);
        println!(
            "{:<8}  {:<10}  {:<24}  {:>6.3}  {:>7.2}  {:>10.2}",
            record.fund_code,
            record.date.to_string(),
            record.peer_category,
            record.performance_score,
            record.robust_z,
            record.confidence.unwrap_or(0.0)
        );
    }
}
