//! Casework daemon
//!
//! Runs the escalation sweeper, re-assignment and zone-risk recomputation on
//! a schedule, and exposes one-shot commands for operators.
//!
//! # Usage
//!
//! ```bash
//! # Scheduler (stops on Ctrl-C)
//! casework-daemon --config casework.toml run
//!
//! # One escalation pass, JSON summary on stdout
//! casework-daemon --config casework.toml sweep
//!
//! # Submit a report from the command line
//! casework-daemon --config casework.toml submit --reporter citizen@example.org \
//!     --category lake --lat 12.91 --lon 77.51 --image photo.jpg
//! ```

mod config;
mod scheduler;
mod seed;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use casework::assignment::StoreDirectory;
use casework::classify::{HttpClassifier, NoClassifier};
use casework::external::{Directory, Evidence, ViolationClassifier};
use casework::geo::PolygonBoundaries;
use casework::notify::{Notifier, TracingSink};
use casework::reporting::{self, RiskRecalculator};
use casework::{
    CaseService, ComplaintPipeline, ComplaintReport, EscalationEngine, EscalationSweeper,
    MemoryStore, SharedRepository, WaterBodyKind,
};
use clap::{Parser, Subcommand};
use config::DaemonConfig;
use scheduler::Scheduler;
use tracing::info;
use uuid::Uuid;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the daemon TOML configuration
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the periodic sweep, re-assignment and risk jobs until Ctrl-C
    Run,
    /// Run one escalation pass and print its summary
    Sweep,
    /// Recompute zone risk and print the ranking
    Risk,
    /// Submit a complaint report
    Submit {
        /// Email of a configured reporter
        #[arg(long)]
        reporter: String,
        #[arg(long)]
        category: WaterBodyKind,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        address: Option<String>,
        /// Evidence image
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Print the public dashboard: statistics, heatmap, water bodies,
    /// recent critical complaints and risk zones
    Stats {
        /// Number of critical alerts to include
        #[arg(long, default_value_t = 10)]
        alerts: usize,
    },
    /// List a user's notifications, optionally marking them read
    Notifications {
        /// Email of a configured user
        #[arg(long)]
        user: String,
        /// Mark this notification read
        #[arg(long, conflicts_with = "all")]
        read: Option<Uuid>,
        /// Mark every unread notification read
        #[arg(long)]
        all: bool,
    },
}

/// Everything the commands need, wired from one configuration
struct Services {
    repo: SharedRepository,
    pipeline: ComplaintPipeline,
    cases: CaseService,
    sweeper: EscalationSweeper,
    risk: RiskRecalculator,
}

async fn open_store(config: &DaemonConfig) -> Result<SharedRepository> {
    match &config.database_url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let store = casework::store::PgStore::connect(url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            store.migrate().await.context("Failed to apply schema")?;
            info!("Using PostgreSQL store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => anyhow::bail!("database_url is set but this build lacks the postgres feature"),
        None => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn build_services(config: &DaemonConfig) -> Result<Services> {
    let repo = open_store(config).await?;
    let boundaries = Arc::new(PolygonBoundaries::new());
    seed::apply(config, &repo, &boundaries).await?;

    let classifier: Arc<dyn ViolationClassifier> = match &config.classifier_endpoint {
        Some(endpoint) => Arc::new(
            HttpClassifier::new(endpoint.clone(), config.classifier_timeout())
                .context("Failed to build classifier client")?,
        ),
        None => Arc::new(NoClassifier),
    };
    let directory: Arc<dyn Directory> = Arc::new(StoreDirectory::new(repo.clone()));
    let notifier = Notifier::new(
        repo.clone(),
        Arc::new(TracingSink),
        config.engine.notify.clone(),
    );
    let engine = Arc::new(config.engine.clone());

    Ok(Services {
        pipeline: ComplaintPipeline::new(
            repo.clone(),
            boundaries,
            classifier,
            directory.clone(),
            notifier.clone(),
            engine.clone(),
        ),
        cases: CaseService::new(repo.clone(), directory.clone(), notifier.clone()),
        sweeper: EscalationSweeper::new(
            repo.clone(),
            directory,
            notifier,
            EscalationEngine::with_config(engine.escalation.clone()),
        ),
        risk: RiskRecalculator::new(repo.clone(), engine.risk.clone()),
        repo,
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = DaemonConfig::load(args.config.as_deref())?;
    let services = build_services(&config).await?;

    match args.command {
        Command::Run => {
            let scheduler = Scheduler::new(
                services.sweeper,
                services.cases,
                services.risk,
                config.sweep_interval(),
                config.risk_interval(),
            );
            scheduler.run().await;
        }
        Command::Sweep => {
            let summary = services.sweeper.run_once().await?;
            print_json(&summary)?;
        }
        Command::Risk => {
            let ranking = services.risk.recalculate_all().await?;
            print_json(&ranking)?;
        }
        Command::Submit {
            reporter,
            category,
            lat,
            lon,
            description,
            address,
            image,
        } => {
            let reporter_id = config
                .user_by_email(&reporter)
                .with_context(|| format!("No configured user with email {}", reporter))?
                .resolved_id();
            let evidence = match image {
                Some(path) => Some(read_evidence(&path)?),
                None => None,
            };
            let outcome = services
                .pipeline
                .submit(ComplaintReport {
                    reporter_id,
                    category,
                    latitude: lat,
                    longitude: lon,
                    description,
                    address,
                    evidence,
                })
                .await?;
            print_json(&outcome)?;
        }
        Command::Stats { alerts } => {
            let dashboard = reporting::public_dashboard(&services.repo, alerts).await?;
            print_json(&dashboard)?;
        }
        Command::Notifications { user, read, all } => {
            let user_id = config
                .user_by_email(&user)
                .with_context(|| format!("No configured user with email {}", user))?
                .resolved_id();
            if let Some(id) = read {
                services.cases.mark_notification_read(user_id, id).await?;
            }
            if all {
                let marked = services.cases.mark_all_read(user_id).await?;
                info!(user = %user, marked, "Notifications marked read");
            }
            let inbox = services.cases.notifications_for(user_id).await?;
            print_json(&inbox)?;
        }
    }

    Ok(())
}

fn read_evidence(path: &std::path::Path) -> Result<Evidence> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };
    Ok(Evidence {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        content_type: content_type.to_string(),
        bytes,
    })
}
