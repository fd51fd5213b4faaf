//! # Slabprice Core
//!
//! Sale-history retrieval and market metrics for graded trading cards.
//!
//! A run takes a card's auction-prices URL, pulls every recorded sale from the
//! upstream lots endpoint, groups the sales by grade and derives per-grade
//! prices, market cap and trailing sale volume.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`locator`] | Item id extraction from a source URL |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`fetch`] | Paginated, paced sale-history client |
//! | [`normalize`] | Grade bucketing of raw sale records |
//! | [`metrics`] | Market cap and volume windows |
//! | [`pipeline`] | End-to-end orchestration |
//! | [`store`] | Persistence seam backed by the warehouse |
//! | [`domain`] | Sale, grade bucket and card types |
//! | [`error`] | Error types |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use slabprice_core::{FetchConfig, Pipeline, ReqwestHttpClient, SalesClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SalesClient::new(Arc::new(ReqwestHttpClient::new()), FetchConfig::default());
//!     let pipeline = Pipeline::new(Arc::new(client));
//!
//!     let card = pipeline
//!         .run(
//!             "https://www.psacard.com/auctionprices/baseball-cards/1952-topps/mickey-mantle/values/544",
//!             "1952 Topps Mickey Mantle",
//!         )
//!         .await?;
//!
//!     for grade in &card.grades {
//!         println!("{}: {:?}", grade.grade, grade.recent_price);
//!     }
//!     Ok(())
//! }
//! ```

pub mod domain;
pub mod error;
pub mod fetch;
pub mod http_client;
pub mod locator;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod store;

pub use domain::{
    parse_population_entries, parse_price, AuctionSale, CardRecord, GradeBucket, RawSale,
    RawSaleRecord, SaleDate, UtcDateTime, VolumeMetrics,
};
pub use error::{FetchFailure, PipelineError, ValidationError};
pub use fetch::{CancelSignal, FetchConfig, SaleHistorySource, SalesClient, DEFAULT_ENDPOINT};
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};
pub use locator::{extract_item_id, ItemId};
pub use metrics::{compute_metrics, compute_metrics_at, market_cap, volume_metrics};
pub use normalize::normalize;
pub use pipeline::{Pipeline, PipelineConfig, SavedCard, DEFAULT_URL_FRAGMENT};
pub use store::{card_record, card_row, CardStore};

pub use slabprice_warehouse::{
    CardSummary, StoredCard, Warehouse, WarehouseConfig, WarehouseError,
};
