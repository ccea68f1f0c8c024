use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;

use config::ShelfscanConfig;
use shelfscan_core::{
    validate, ExpiryResolver, OrchestratorConfig, ProductKnowledgeBase, ScanOrchestrator,
};
use shelfscan_memory::{CorrectionLedger, InventoryStore, JsonInventoryStore};
use shelfscan_provider::{create_extractor, create_recognizer, RecognizerConfig, RecognizerKind};
use shelfscan_schema::ResolutionSource;

#[derive(Parser)]
#[command(name = "shelfscan", version, about = "grocery photo to inventory-ready expiry records")]
struct Cli {
    #[arg(
        long,
        default_value = "~/.shelfscan",
        help = "Config root directory (contains config/, data/ and logs/)"
    )]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Scan a grocery photo, resolve expiry dates and store the items")]
    Scan {
        #[arg(long, help = "Image URI or path to scan")]
        image: String,
    },
    #[command(about = "Suggest an expiration date for an item name")]
    Suggest {
        item: String,
        #[arg(long)]
        brand: Option<String>,
    },
    #[command(about = "Record a corrected expiration date for an item")]
    Correct {
        item: String,
        #[arg(long, help = "Corrected date, YYYY-MM-DD")]
        date: NaiveDate,
        #[arg(long, help = "The date we originally produced, YYYY-MM-DD")]
        original: Option<NaiveDate>,
        #[arg(long, default_value = "ai", help = "Source of the original date: ocr, ai or manual")]
        source: String,
    },
    #[command(about = "Print storage recommendations for an item")]
    Storage { item: String },
    #[command(about = "Scan an image and report signal quality issues without storing anything")]
    Check {
        #[arg(long, help = "Image URI or path to scan")]
        image: String,
    },
}

struct App {
    orchestrator: ScanOrchestrator,
    resolver: Arc<ExpiryResolver>,
}

async fn build_app(config_root: &PathBuf) -> Result<App> {
    let config = ShelfscanConfig::load(config_root)?;
    let data_dir = config_root.join("data");

    let mut knowledge = ProductKnowledgeBase::builtin();
    if let Some(overlay) = &config.knowledge_overlay {
        let merged = knowledge.merge_overlay_file(overlay)?;
        tracing::info!("merged {merged} knowledge overlay entries");
    }

    let ledger = Arc::new(CorrectionLedger::open(data_dir.join("corrections.json")).await?);
    let resolver = Arc::new(ExpiryResolver::new(Arc::new(knowledge), ledger));

    let recognizer = match &config.recognizer {
        Some(cfg) => create_recognizer(cfg)?,
        None => {
            tracing::info!("no recognizer endpoint configured, using static sample");
            create_recognizer(&RecognizerConfig::new("offline", RecognizerKind::Static))?
        }
    };
    let extractor = match &config.extractor {
        Some(cfg) => create_extractor(cfg)?,
        None => create_extractor(&RecognizerConfig::new("offline", RecognizerKind::Static))?,
    };
    let inventory: Arc<dyn InventoryStore> = Arc::new(JsonInventoryStore::new(&data_dir));

    let orchestrator = ScanOrchestrator::new(
        recognizer,
        extractor,
        inventory,
        resolver.clone(),
        OrchestratorConfig {
            call_timeout: Duration::from_secs(config.call_timeout_secs),
        },
    );

    Ok(App {
        orchestrator,
        resolver,
    })
}

fn parse_source(source: &str) -> Result<ResolutionSource> {
    match source {
        "ocr" => Ok(ResolutionSource::Ocr),
        "ai" => Ok(ResolutionSource::Ai),
        "manual" => Ok(ResolutionSource::Manual),
        other => Err(anyhow!("unknown source: {other} (expected ocr, ai or manual)")),
    }
}

async fn run_scan(app: &App, image: &str) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let outcome = app
        .orchestrator
        .scan_with_progress(image, &cancel, |progress| {
            println!("[{:>3}%] {}", progress.percent_complete, progress.message);
        })
        .await?;

    if !outcome.scan_result.success {
        println!(
            "scan failed: {}",
            outcome.scan_result.error.as_deref().unwrap_or("unknown")
        );
        return Ok(());
    }

    println!();
    for resolution in &outcome.resolved_items {
        match resolution.final_date {
            Some(date) => println!(
                "{}: expires {date} ({}, {:?} confidence)",
                resolution.item_name,
                resolution.source.as_str(),
                resolution.confidence
            ),
            None => println!("{}: needs a date from you", resolution.item_name),
        }
        if let Some(reasoning) = &resolution.reasoning {
            println!("  {reasoning}");
        }
    }
    println!(
        "\nstored {} of {} items in {} ms",
        outcome.stored_items.len(),
        outcome.resolved_items.len(),
        outcome.total_processing_time_ms
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Expand ~ to home directory
    if cli.config_root.starts_with("~") {
        if let Some(home) = std::env::var_os("HOME") {
            cli.config_root = PathBuf::from(home).join(
                cli.config_root
                    .strip_prefix("~")
                    .unwrap_or(&cli.config_root),
            );
        }
    }

    let log_dir = cli.config_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "shelfscan.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let app = build_app(&cli.config_root).await?;

    match cli.command {
        Commands::Scan { image } => run_scan(&app, &image).await?,
        Commands::Suggest { item, brand } => {
            let suggestion = app.resolver.suggest(&item, brand.as_deref()).await?;
            println!(
                "{item}: {} (confidence {:.2})",
                suggestion.date, suggestion.confidence
            );
            println!("  {}", suggestion.reasoning);
            if !suggestion.storage_conditions.is_empty() {
                println!("  store: {}", suggestion.storage_conditions.join(", "));
            }
        }
        Commands::Correct {
            item,
            date,
            original,
            source,
        } => {
            let source = parse_source(&source)?;
            app.resolver
                .record_correction(&item, original, date, source)
                .await?;
            println!("recorded correction for {item}: {date}");
        }
        Commands::Storage { item } => {
            for condition in app.resolver.storage_recommendations(&item) {
                println!("{condition}");
            }
        }
        Commands::Check { image } => {
            let result = app
                .orchestrator
                .scan(&image, &CancellationToken::new())
                .await;
            let report = validate(&result);
            if report.is_valid {
                println!(
                    "ok: {} products, {} dates",
                    result.products.len(),
                    result.dates.len()
                );
            } else {
                for issue in &report.issues {
                    println!("issue: {issue}");
                }
            }
        }
    }

    Ok(())
}
