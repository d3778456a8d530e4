//! Command-line front end for USGS imports.

mod cli;

use anyhow::Context;
use clap::Parser;
use hydrolink_core::progress::ProgressEvent;
use hydrolink_pipeline::{ImportDriver, ImportProgress, WriteServerClient};
use hydrolink_usgs::UsgsApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, RunArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hydrolink_import=info,hydrolink_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Stations { state, variety } => {
            let stations = UsgsApi::new()
                .fetch_stations_by_state(&state, variety)
                .await
                .with_context(|| format!("Failed to list stations for {state}"))?;

            println!("{:<16} {:<40} LOCATION", "ID", "NAME");
            println!("{}", "-".repeat(72));
            for station in &stations {
                println!("{:<16} {:<40} {}", station.id, station.name, station.location);
            }
            tracing::info!(count = stations.len(), state = %state, "Stations listed");
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let request = args.to_request();
    tracing::info!(
        server = %args.server,
        project = %request.labels.project,
        stations = request.stations.len(),
        format = ?request.data_format,
        "Starting import",
    );

    let driver = ImportDriver::new(UsgsApi::new(), WriteServerClient::new(args.server.clone()));
    let mut view = ImportProgress::new();
    let mut last_line = String::new();

    let result = driver
        .run(&request, |event| {
            view.apply(event);
            let line = render(&view, event);
            if line != last_line {
                tracing::info!("{line}");
                last_line = line;
            }
        })
        .await;

    if let Some(summary) = &view.summary {
        println!(
            "Stations: {} with data, {} without data, {} failed",
            summary.with_data_count, summary.no_data_count, summary.failed_count
        );
        if !summary.failed_ids.is_empty() {
            println!("Failed: {}", summary.failed_ids.join(", "));
        }
        if !summary.no_data_ids.is_empty() {
            println!("No data: {}", summary.no_data_ids.join(", "));
        }
    }

    let outcome = result.context("Import failed")?;
    if outcome.nothing_to_import {
        println!("Nothing to import");
    } else {
        println!("Imported {} series", outcome.written);
    }
    Ok(())
}

/// One status line for the phase `event` belongs to.
fn render(view: &ImportProgress, event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Query { .. } => format!("[query {:>3}%] {}", view.query_percent, view.query_label),
        ProgressEvent::Download { .. } => {
            format!("[download {:>3}%] {}", view.download_percent, view.download_label)
        }
        ProgressEvent::Write { .. } => format!("[write {:>3}%] {}", view.write_percent, view.write_label),
        ProgressEvent::Done { error: Some(e), .. } => format!("[done] {e}"),
        ProgressEvent::Done { .. } => "[done]".to_string(),
    }
}
