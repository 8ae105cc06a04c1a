//! `site-scheduler` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`  : start the API server.
//! - `migrate`: run pending database migrations.
//! - `check`  : report trade conflicts in a schedule JSON file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use db::pool::PoolConfig;
use db::{MemoryStore, PgStore, ScheduleStore};
use engine::{EngineConfig, ScheduleEngine, ScheduleItem, ScheduleRules, SystemClock};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "site-scheduler",
    about = "Construction schedule recalculation engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, env = "SCHEDULER_BIND", default_value = "0.0.0.0:8080")]
        bind: String,
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
        /// Keep all state in process memory instead of Postgres.
        #[arg(long)]
        memory: bool,
        /// JSON rule bundle replacing the built-in tables.
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Check a schedule JSON file (an array of schedule items) for trade conflicts.
    Check {
        path: PathBuf,
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

fn load_rules(path: Option<&Path>) -> Result<ScheduleRules> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read rules file {}", path.display()))?;
            let rules = ScheduleRules::from_json_str(&content)?;
            info!("Loaded schedule rules from {}", path.display());
            Ok(rules)
        }
        None => Ok(ScheduleRules::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind, database_url, memory, rules } => {
            let rules = Arc::new(load_rules(rules.as_deref())?);
            let store: Arc<dyn ScheduleStore> = match (memory, database_url) {
                (true, _) => {
                    warn!("Using in-memory store; state is lost on exit");
                    Arc::new(MemoryStore::new())
                }
                (false, Some(url)) => {
                    let pool = db::pool::create_pool(&url, &PoolConfig::default())
                        .await
                        .context("failed to connect to database")?;
                    Arc::new(PgStore::new(pool))
                }
                (false, None) => bail!("DATABASE_URL is not set; pass --database-url or --memory"),
            };

            let engine =
                ScheduleEngine::new(store, rules, EngineConfig::default(), Arc::new(SystemClock));
            info!("Starting API server on {bind}");
            api::serve(&bind, api::AppState::new(engine)).await?;
        }
        Command::Migrate { database_url } => {
            info!("Running migrations");
            let config = PoolConfig {
                max_connections: 2,
                ..Default::default()
            };
            let pool = db::pool::create_pool(&database_url, &config)
                .await
                .context("failed to connect to database")?;
            db::pool::run_migrations(&pool).await.context("migration failed")?;
            info!("Migrations applied successfully");
        }
        Command::Check { path, rules } => {
            let rules = load_rules(rules.as_deref())?;
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read file {}", path.display()))?;
            let schedules: Vec<ScheduleItem> =
                serde_json::from_str(&content).context("invalid schedule JSON")?;

            let reports = engine::conflicts::check_conflicts(&schedules, &rules);
            if reports.is_empty() {
                println!("No trade conflicts in {} step(s)", schedules.len());
                return Ok(());
            }
            for report in &reports {
                println!(
                    "{}  trades: {}  steps: {}",
                    report.date,
                    report.trades.join(", "),
                    report.step_ids.join(", ")
                );
            }
            eprintln!("{} conflicting day(s)", reports.len());
            std::process::exit(1);
        }
    }

    Ok(())
}
