use serde_json::{json, Value};
use slabprice_core::card_record;

use crate::cli::{CardsArgs, CardsCommand, Cli};
use crate::error::CliError;

pub fn run(cli: &Cli, args: &CardsArgs) -> Result<Value, CliError> {
    let warehouse = super::open_warehouse(cli)?;
    match &args.command {
        CardsCommand::List => {
            let cards = warehouse.list_cards()?;
            Ok(json!({ "cards": cards }))
        }
        CardsCommand::Show(show) => {
            let stored = warehouse.load_card(show.id.as_str())?;
            Ok(json!({
                "id": stored.id,
                "record": card_record(&stored.card),
            }))
        }
    }
}
