use anyhow::Context;
use clap::Parser;
use std::fs;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloudsweep::config::{CommandLineArgs, Config};
use cloudsweep::engine::Scanner;
use cloudsweep::pricing::PricingCatalog;
use cloudsweep::providers::aws::StaticCredentials;
use cloudsweep::providers::AwsProvider;
use cloudsweep::rules::{RuleOverrides, RuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CommandLineArgs::parse();
    let mut config = Config::load(args.config.as_deref())?;
    config.apply_args(&args);

    // File logging keeps its guard alive for the whole run.
    let _log_guard = init_logging(&config)?;

    let overrides = match &args.rules {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading rule overrides from {path}"))?;
            serde_json::from_str::<RuleOverrides>(&raw)
                .with_context(|| format!("parsing rule overrides from {path}"))?
        }
        None => RuleOverrides::new(),
    };

    let credentials = match (&args.access_key_id, &args.secret_access_key) {
        (Some(key), Some(secret)) => Some(StaticCredentials {
            access_key_id: key.clone(),
            secret_access_key: secret.clone(),
            session_token: None,
        }),
        (None, None) => None,
        _ => anyhow::bail!("provide both --access-key-id and --secret-access-key, or neither"),
    };

    let regions: Vec<String> = args
        .regions
        .as_deref()
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let provider = AwsProvider::connect(credentials, config.provider.adapter_config()).await;
    let scanner = Scanner::new(
        Arc::new(provider),
        RuleRegistry::built_in(),
        PricingCatalog::new(),
        config.scan.scan_config(),
    );

    let report = scanner.scan(&regions, &overrides).await?;

    match args.output.as_str() {
        "summary" => print_summary(&report),
        _ => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn init_logging(config: &Config) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match &config.logging.file {
        Some(path) => {
            let appender = tracing_appender::rolling::never(".", path);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
            Ok(None)
        }
    }
}

fn print_summary(report: &cloudsweep::models::ScanReport) {
    println!(
        "scan {} — account {} — {} region(s), {} finding(s), ${:.2}/month flagged",
        report.scan_id,
        report.account.account_id,
        report.scanned_regions.len(),
        report.findings.len(),
        report.total_monthly_waste()
    );
    for finding in &report.findings {
        println!(
            "  [{}] {} {} {} — ${:.2}/month — {}",
            finding.metadata.confidence,
            finding.region,
            finding.resource_type,
            finding.resource_id,
            finding.estimated_monthly_cost,
            finding.metadata.orphan_reason
        );
    }
    for error in &report.region_errors {
        println!("  ! {}: {}", error.region, error.error);
    }
    for skipped in &report.skipped_scenarios {
        println!(
            "  ~ skipped {} in {} ({}): {}",
            skipped.orphan_type.as_deref().unwrap_or("all scenarios"),
            skipped.region,
            skipped.resource_type,
            skipped.reason
        );
    }
}
