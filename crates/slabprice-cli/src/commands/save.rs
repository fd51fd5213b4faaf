use std::sync::Arc;

use serde_json::Value;
use slabprice_core::CardRecord;
use tokio::io::AsyncReadExt;

use crate::cli::{Cli, SaveArgs};
use crate::error::CliError;

pub async fn run(cli: &Cli, args: &SaveArgs) -> Result<Value, CliError> {
    let document = read_input(args.input.as_str()).await?;
    let record: CardRecord = serde_json::from_str(&document)?;

    let populations = super::populations(&args.populations)?;
    let pipeline =
        super::pipeline(cli, populations).with_store(Arc::new(super::open_warehouse(cli)?));
    let saved = pipeline.save(&record)?;
    Ok(serde_json::to_value(saved)?)
}

async fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut document = String::new();
        tokio::io::stdin().read_to_string(&mut document).await?;
        return Ok(document);
    }
    Ok(tokio::fs::read_to_string(input).await?)
}
