// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Timeline CLI
//!
//! Updates the local Strava activity cache, or exports the cache, the
//! timeline spreadsheet, or both merged, as CSV on stdout.

use clap::Parser;
use strava_timeline::{
    config::Config,
    db::SqliteDb,
    error::AppError,
    export,
    models::{timeline::events_from_rows, TimelineEvent},
    services::{ConsolePrompt, GoogleSheetClient, StravaClient, SyncService},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "strava-timeline", about = "Cache Strava activities and export them with timeline events")]
struct Args {
    /// Update the Strava activities cache.
    #[arg(short, long)]
    update: bool,

    /// Print timeline events from the spreadsheet instead of activities.
    #[arg(short, long, conflicts_with = "merged")]
    timeline: bool,

    /// Print activities merged with timeline events, ordered by time.
    #[arg(short, long)]
    merged: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Local account id.
    #[arg(short, long, env = "DEFAULT_ACCOUNT_ID")]
    id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::from_env()?;

    if args.timeline {
        let events = read_timeline(&config).await?;
        print!("{}", export::timeline_csv(events));
        return Ok(());
    }

    let user_id = config.account_id(args.id)?;
    let db = SqliteDb::open(&config.storage_db, config.storage_schema_file.as_deref()).await?;

    if args.update {
        update_activities(&config, db, &user_id).await?;
    } else if args.merged {
        let events = read_timeline(&config).await?;
        print!("{}", export::merged_csv(&db, &user_id, events).await?);
    } else {
        print!("{}", export::activities_csv(&db, &user_id).await?);
    }

    Ok(())
}

async fn update_activities(config: &Config, db: SqliteDb, user_id: &str) -> Result<(), AppError> {
    let (client_id, client_secret) = config.strava_credentials()?;
    let client = StravaClient::new(client_id.to_string(), client_secret.to_string());
    let sync = SyncService::new(
        client,
        db,
        Box::new(ConsolePrompt),
        config.strava_redirect_uri.clone(),
    );

    let report = sync.sync(user_id).await?;

    let athlete = serde_json::to_string_pretty(&report.athlete)?;
    println!("Here is your athlete:\n{}", athlete);
    println!("Refreshing activities. These are your new activities:");
    for activity in &report.new_activities {
        println!("'{}' ({})", activity.name, activity.id);
    }
    Ok(())
}

async fn read_timeline(config: &Config) -> Result<Vec<TimelineEvent>, AppError> {
    let mut sheets = GoogleSheetClient::new(
        config.google_token_file.clone(),
        config.google_creds_file.clone(),
        Box::new(ConsolePrompt),
    );
    sheets.authenticate().await?;

    let rows = sheets
        .read_from_sheet(config.spreadsheet_id()?, &config.google_sheet_range)
        .await?;
    Ok(events_from_rows(rows).collect())
}

/// Initialize logging on stderr; stdout carries the CSV export.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("strava_timeline={},warn", default_level))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
