use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::cli::{Cli, ScrapeArgs};
use crate::error::CliError;

pub async fn run(cli: &Cli, args: &ScrapeArgs) -> Result<Value, CliError> {
    let populations = super::populations(&args.populations)?;
    let mut pipeline = super::pipeline(cli, populations);
    if !cli.no_store {
        pipeline = pipeline.with_store(Arc::new(super::open_warehouse(cli)?));
    }

    let record = pipeline
        .run_until(args.url.as_str(), args.name.as_str(), interrupted())
        .await?;
    Ok(serde_json::to_value(record)?)
}

// Ctrl-C stops pagination; pages already fetched are still processed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("ctrl-c handler unavailable, scrape cannot be interrupted");
        std::future::pending::<()>().await;
    }
}
