//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RawSaleRecord`] | One untrusted element of an upstream `data` array |
//! | [`AuctionSale`] | Normalized sale with defaulted fields |
//! | [`SaleDate`] | Parsed timestamp or explicit unparseable marker |
//! | [`GradeBucket`] | Sales of one grade with derived prices and metrics |
//! | [`CardRecord`] | Aggregate root: item name, source URL, grade buckets |
//! | [`VolumeMetrics`] | Trailing-window sale volume sums |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! A [`CardRecord`] owns its buckets and each bucket owns its sales; nothing
//! is shared between records.

mod card;
mod sale;
mod timestamp;

pub use card::{parse_population_entries, CardRecord, GradeBucket, VolumeMetrics};
pub use sale::{parse_price, AuctionSale, RawSale, RawSaleRecord, SaleDate};
pub use timestamp::UtcDateTime;
