//! # scalelog — BLE weight-scale reader
//!
//! Composition root that wires the adapters together behind a small CLI.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars, CLI flags)
//! - Initialise logging
//! - Construct the btleplug transport and the CSV recorder (adapters)
//! - Resolve `--prefix` to an address through the scanner port
//! - Run one connection session until its deadline or Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod cli;
mod config;

use anyhow::Context as _;
use clap::Parser as _;
use tracing_subscriber::EnvFilter;

use scalelog_adapter_ble::BtleplugTransport;
use scalelog_adapter_csv::CsvRecorder;
use scalelog_app::address;
use scalelog_app::inspect;
use scalelog_app::ports::Scanner;
use scalelog_app::selector::CharacteristicSelector;
use scalelog_app::session::{ConnectionSession, SessionOutcome};
use scalelog_domain::decoder::PayloadDecoder;

use crate::cli::{Cli, Command, Target};
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config).context("failed to load configuration")?;
    cli.command.apply(&mut config);
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();
    tracing::debug!(?config, "configuration loaded");

    let transport = BtleplugTransport::new(config.ble.clone())
        .await
        .context("failed to initialise BLE")?;

    match &cli.command {
        Command::Read(args) => read(transport, &config, &args.target).await,
        Command::Scan(_) => scan(&transport, &config).await,
        Command::Inspect(args) => inspect_device(&transport, &config, &args.target).await,
    }
}

async fn resolve_target(
    transport: &BtleplugTransport,
    config: &Config,
    target: &Target,
) -> anyhow::Result<String> {
    match (&target.address, &target.prefix) {
        (Some(address), _) => Ok(address.clone()),
        (None, Some(prefix)) => Ok(address::resolve(transport, prefix, config.scan_timeout()).await?),
        (None, None) => anyhow::bail!("either --address or --prefix is required"),
    }
}

async fn read(transport: BtleplugTransport, config: &Config, target: &Target) -> anyhow::Result<()> {
    let address = resolve_target(&transport, config, target).await?;
    let recorder = CsvRecorder::open(&config.recorder.path, config.recorder.layout())?;
    let output = recorder.path().display().to_string();

    let session = ConnectionSession::new(transport, recorder, config.session_config(address))
        .with_selector(CharacteristicSelector::new(&config.selector));
    let report = session.run(shutdown_signal()).await?;

    let verb = match report.outcome {
        SessionOutcome::Completed => "completed",
        SessionOutcome::Cancelled => "cancelled",
    };
    println!(
        "session {verb}: {} reading(s) written to {output} over {} connection attempt(s)",
        report.frames_recorded,
        report.connection_attempts,
    );
    Ok(())
}

async fn scan(transport: &BtleplugTransport, config: &Config) -> anyhow::Result<()> {
    let results = Scanner::discover(transport, config.scan_timeout()).await?;
    if results.is_empty() {
        println!("no devices found");
    }
    for result in results {
        let rssi = result
            .rssi
            .map_or_else(|| "-".to_string(), |rssi| format!("{rssi} dBm"));
        println!(
            "{:<20} {:>8}  {}",
            result.address,
            rssi,
            result.name.as_deref().unwrap_or("(unnamed)")
        );
    }
    Ok(())
}

async fn inspect_device(
    transport: &BtleplugTransport,
    config: &Config,
    target: &Target,
) -> anyhow::Result<()> {
    let address = resolve_target(transport, config, target).await?;
    let reports = inspect::inspect(transport, &address).await?;
    let decoder = PayloadDecoder::default();

    let mut service = None;
    for report in &reports {
        if service != Some(report.descriptor.service) {
            service = Some(report.descriptor.service);
            println!("Service {}", report.descriptor.service);
        }
        println!(
            "  Char {} ({})",
            report.descriptor.characteristic, report.descriptor.capabilities
        );
        match &report.value {
            None => {}
            Some(Err(err)) => println!("    read failed: {err}"),
            Some(Ok(_)) => {
                if let Some(hex) = report.hex() {
                    println!("    hex:  {hex}");
                }
                if let Some(text) = report.text() {
                    println!("    text: {text}");
                }
                if let Some(decoded) = report.decode(&decoder)
                    && let Some(weight) = decoded.weight
                {
                    println!("    weight: {weight} ({})", decoded.method);
                }
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Ctrl-C received, stopping session");
}
