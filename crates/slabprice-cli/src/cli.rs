//! CLI argument definitions for slabprice.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scrape` | Fetch a card's sale history and compute grade metrics |
//! | `save` | Store a card record read from a JSON file or stdin |
//! | `cards` | Inspect cards in the local warehouse |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-ms` | `10000` | Per-page request timeout |
//! | `--page-size` | `50` | Records requested per page |
//! | `--max-pages` | `5` | Pages fetched after the first |
//! | `--page-delay-ms` | `2000` | Pause before every page after the first |
//! | `--db-path` | `$SLABPRICE_HOME/warehouse.duckdb` | Warehouse location |
//! | `--no-store` | `false` | Skip writing scraped cards to the warehouse |
//! | `--log-level` | `RUST_LOG` or `warn` | Log filter for stderr |
//!
//! # Examples
//!
//! ```bash
//! slabprice scrape \
//!   https://www.psacard.com/auctionprices/baseball-cards/1952-topps/mickey-mantle/values/544 \
//!   --name "1952 Topps Mickey Mantle" --population "PSA 8=1200" --pretty
//!
//! slabprice cards list
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Graded card sale history and market metrics.
#[derive(Debug, Parser)]
#[command(
    name = "slabprice",
    author,
    version,
    about = "Graded card sale history and market metrics"
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Per-page request timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Records requested per page.
    #[arg(long, global = true, default_value_t = 50)]
    pub page_size: usize,

    /// Maximum number of pages fetched after the first.
    #[arg(long, global = true, default_value_t = 5)]
    pub max_pages: usize,

    /// Delay before every page after the first, in milliseconds.
    #[arg(long, global = true, default_value_t = 2_000)]
    pub page_delay_ms: u64,

    /// Warehouse database file.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Do not persist scraped cards.
    #[arg(long, global = true, default_value_t = false)]
    pub no_store: bool,

    /// Log filter directive, e.g. `info` or `slabprice_core=debug`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch every recorded sale of a card and compute per-grade metrics.
    ///
    /// # Examples
    ///
    ///   slabprice scrape <URL> --name "1986 Fleer Michael Jordan"
    ///   slabprice scrape <URL> --name "..." --population "PSA 10=312" --no-store
    Scrape(ScrapeArgs),

    /// Validate, recompute and store a card record JSON document.
    ///
    /// Reads from the given file, or from stdin when the path is `-`.
    Save(SaveArgs),

    /// Inspect stored cards.
    Cards(CardsArgs),
}

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Auction-prices page of the card; its last path segment is the item id.
    pub url: String,

    /// Display name stored with the card.
    #[arg(long)]
    pub name: String,

    /// Population of a grade as `GRADE=COUNT`. Repeatable.
    #[arg(long = "population", value_name = "GRADE=COUNT")]
    pub populations: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SaveArgs {
    /// Card record JSON file, or `-` for stdin.
    pub input: String,

    /// Population of a grade as `GRADE=COUNT`. Repeatable.
    #[arg(long = "population", value_name = "GRADE=COUNT")]
    pub populations: Vec<String>,
}

#[derive(Debug, Args)]
pub struct CardsArgs {
    #[command(subcommand)]
    pub command: CardsCommand,
}

#[derive(Debug, Subcommand)]
pub enum CardsCommand {
    /// List stored cards with grade and sale counts.
    List,

    /// Show one stored card with its grades and auctions.
    Show(CardsShowArgs),
}

#[derive(Debug, Args)]
pub struct CardsShowArgs {
    /// Card id as printed by `cards list`.
    pub id: String,
}
