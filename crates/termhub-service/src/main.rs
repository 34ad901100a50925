//! TermHub command-line entry point.
//!
//! Loads and cleans the dataset, then optionally scores the selection given
//! in `TERMHUB_CODESET_IDS` and prints the hierarchy response as JSON.

use termhub_service::{parse_codeset_ids, ServiceConfig, TermhubService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServiceConfig::from_env();
    let service = TermhubService::load(&config)?;

    let snapshot = service.snapshot();
    tracing::info!(
        "Loaded {} concepts, {} relationships, {} codesets",
        snapshot.concept_count(),
        snapshot.edge_count(),
        snapshot.all_csets().len()
    );

    let Some(ids) = config.codeset_ids.as_deref() else {
        tracing::info!("No selection given; set TERMHUB_CODESET_IDS to score codesets");
        return Ok(());
    };

    let codeset_ids = parse_codeset_ids(ids)?;
    tracing::info!("Scoring selection: {:?}", codeset_ids);

    let response = service.cr_hierarchy(&codeset_ids)?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
