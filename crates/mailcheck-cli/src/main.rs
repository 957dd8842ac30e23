//! MailCheck - mail domain DNS auditor

mod args;
mod output;

use anyhow::{Context, Result};
use args::Cli;
use chrono::Local;
use clap::Parser;
use mailcheck_common::config::{Config, LoggingConfig};
use mailcheck_common::FindingStatus;
use mailcheck_core::{AuditReport, Collector, DnsResolver, NetworkResolver, RuleEngine};
use std::io::Write;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    init_logging(&config.logging);

    let resolver: Arc<dyn DnsResolver> = Arc::new(NetworkResolver::new());
    let collector = Collector::from_config(resolver, &config);
    let engine = RuleEngine::from_config(&config.rules);

    let profile = collector.collect(&cli.domain).await;
    let report = AuditReport::new(profile, &engine);
    info!(
        "Audit of {} finished with {} findings ({} failed)",
        report.profile.domain,
        report.findings.len(),
        report.count(FindingStatus::Fail)
    );

    if !cli.json {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        output::render_console(&mut out, &report)?;
        out.flush()?;
        return Ok(());
    }

    let json = report.to_json_pretty()?;
    if let Some(dir) = &config.output.directory {
        let path = output::write_json_report(
            dir,
            &report.profile.domain,
            &json,
            Local::now().naive_local(),
        )?;
        println!("Results saved to: {}", path.display());
    }
    println!("{}", json);

    Ok(())
}

/// Initialize logging on stderr; RUST_LOG overrides the configured level
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
