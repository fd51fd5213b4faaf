mod cards;
mod save;
mod scrape;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use slabprice_core::{
    parse_population_entries, FetchConfig, Pipeline, ReqwestHttpClient, SalesClient, Warehouse,
    WarehouseConfig,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    match &cli.command {
        Command::Scrape(args) => scrape::run(cli, args).await,
        Command::Save(args) => save::run(cli, args).await,
        Command::Cards(args) => cards::run(cli, args),
    }
}

fn fetch_config(cli: &Cli) -> FetchConfig {
    FetchConfig::default()
        .with_page_size(cli.page_size)
        .with_max_pages(cli.max_pages)
        .with_request_timeout(Duration::from_millis(cli.timeout_ms.max(1)))
        .with_page_delay(Duration::from_millis(cli.page_delay_ms))
}

fn open_warehouse(cli: &Cli) -> Result<Warehouse, CliError> {
    let mut config = WarehouseConfig::default();
    if let Some(db_path) = &cli.db_path {
        config = config.with_db_path(db_path.clone());
    }
    Ok(Warehouse::open(config)?)
}

fn populations(entries: &[String]) -> Result<HashMap<String, u64>, CliError> {
    Ok(parse_population_entries(entries)?)
}

fn pipeline(cli: &Cli, populations: HashMap<String, u64>) -> Pipeline {
    let client = SalesClient::new(Arc::new(ReqwestHttpClient::new()), fetch_config(cli));
    Pipeline::new(Arc::new(client)).with_populations(populations)
}
