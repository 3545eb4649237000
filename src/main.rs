//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `chain_status` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use chain_status::config::cli::{Cli, Command};
use chain_status::initialization::{init_logger_with, init_policies, init_registry};
use chain_status::{AddUrlRequest, SubmitReport, UrlRecord, Verifier};

/// Cancels the returned token on Ctrl-C. Hosts already stored are kept.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing stored hosts and skipping the rest");
            token.cancel();
        }
    });
    cancel
}

fn print_report(report: &SubmitReport) {
    println!(
        "✅ Stored {} host{}{}",
        report.inserted,
        if report.inserted == 1 { "" } else { "s" },
        if report.cancelled > 0 {
            format!(" ({} cancelled)", report.cancelled)
        } else {
            String::new()
        }
    );
    for failure in &report.failures {
        println!("❌ {} [{}] {}", failure.input, failure.kind, failure.message);
    }
}

fn print_record(record: &UrlRecord) {
    println!(
        "{:<40} tls={:<5} trust={} firefox={} chrome={} edge={}",
        record.host,
        record.tls,
        record.trust,
        record.trust_firefox,
        record.trust_chrome,
        record.trust_edge
    );
}

async fn run(cli: Cli) -> Result<bool> {
    let config = cli.to_config();

    match cli.command {
        Command::Check { hosts, .. } => {
            let verifier = Verifier::from_config(&config).await?;
            let report = verifier.submit(&hosts, &cancel_on_ctrl_c()).await?;
            print_report(&report);
            Ok(!report.had_errors)
        }
        Command::AddFile { file, .. } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let verifier = Verifier::from_config(&config).await?;
            let request = AddUrlRequest {
                host_or_url: None,
                hosts_or_urls_file: Some(content),
            };
            let report = verifier.add_url(request, &cancel_on_ctrl_c()).await?;
            print_report(&report);
            Ok(!report.had_errors)
        }
        Command::List { json } => {
            let registry = init_registry(&config)
                .await
                .context("Failed to open registry")?;
            let records = registry.get_all().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    print_record(record);
                }
                println!("{} record(s)", records.len());
            }
            Ok(true)
        }
        Command::Clear => {
            let registry = init_registry(&config)
                .await
                .context("Failed to open registry")?;
            let count = registry.delete_all().await?;
            println!("Deleted {count} record(s)");
            Ok(true)
        }
        Command::Roots { vendor, .. } => {
            let policies = init_policies(&config).context("Failed to load trust policies")?;
            let roots = policies.get(vendor).root_store().info();
            for root in &roots {
                println!(
                    "{}  {}  {} .. {}",
                    root.fingerprint,
                    root.name,
                    root.valid_from.format("%Y-%m-%d"),
                    root.valid_to.format("%Y-%m-%d")
                );
            }
            println!("{}: {} root(s)", vendor, roots.len());
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists), either in the
    // current directory or next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();
    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    match run(cli).await {
        Ok(true) => Ok(()),
        // Results are stored; signal the per-host failures through the exit code
        Ok(false) => process::exit(2),
        Err(e) => {
            eprintln!("chain_status error: {:#}", e);
            process::exit(1);
        }
    }
}
