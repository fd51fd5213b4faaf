//! Persistence seam between the pipeline and the warehouse.

use slabprice_warehouse::{AuctionRow, CardRow, GradeRow, VolumeRow, Warehouse};

use crate::domain::{AuctionSale, CardRecord, GradeBucket, SaleDate, UtcDateTime, VolumeMetrics};
use crate::PipelineError;

/// Destination for finished card records.
pub trait CardStore: Send + Sync {
    /// Inserts or updates `record` and returns its stored id.
    fn upsert(&self, record: &CardRecord) -> Result<String, PipelineError>;
}

impl CardStore for Warehouse {
    fn upsert(&self, record: &CardRecord) -> Result<String, PipelineError> {
        self.upsert_card(&card_row(record))
            .map_err(|error| PipelineError::Persistence(error.to_string()))
    }
}

pub fn card_row(record: &CardRecord) -> CardRow {
    CardRow {
        name: record.name.clone(),
        source_url: record.source_url.clone(),
        grades: record.grades.iter().map(grade_row).collect(),
    }
}

fn grade_row(bucket: &GradeBucket) -> GradeRow {
    GradeRow {
        grade: bucket.grade.clone(),
        recent_price: bucket.recent_price,
        average_price: bucket.average_price,
        population: bucket.population,
        market_cap: bucket.market_cap,
        auctions: bucket.auctions.iter().map(auction_row).collect(),
        volume: bucket.volume_metrics.map(|metrics| VolumeRow {
            total_volume: metrics.total_volume,
            volume_10y: metrics.volume_10y,
            volume_5y: metrics.volume_5y,
            annual_volume: metrics.annual_volume,
            monthly_volume: metrics.monthly_volume,
        }),
    }
}

fn auction_row(sale: &AuctionSale) -> AuctionRow {
    let (sale_date, date_raw) = match &sale.date {
        SaleDate::Parsed(timestamp) => (Some(timestamp.format_rfc3339()), None),
        SaleDate::Unparseable(raw) => (None, Some(raw.clone())),
    };
    AuctionRow {
        sale_date,
        date_raw,
        auction_house: sale.auction_house.clone(),
        sale_type: sale.sale_type.clone(),
        certification: sale.certification.clone(),
        price: sale.price,
    }
}

/// Rebuilds a domain record from stored rows.
pub fn card_record(row: &CardRow) -> CardRecord {
    CardRecord {
        name: row.name.clone(),
        source_url: row.source_url.clone(),
        grades: row
            .grades
            .iter()
            .map(|grade| GradeBucket {
                grade: grade.grade.clone(),
                auctions: grade.auctions.iter().map(auction_sale).collect(),
                recent_price: grade.recent_price,
                average_price: grade.average_price,
                population: grade.population,
                market_cap: grade.market_cap,
                volume_metrics: grade.volume.map(|volume| VolumeMetrics {
                    total_volume: volume.total_volume,
                    volume_10y: volume.volume_10y,
                    volume_5y: volume.volume_5y,
                    annual_volume: volume.annual_volume,
                    monthly_volume: volume.monthly_volume,
                }),
            })
            .collect(),
    }
}

fn auction_sale(row: &AuctionRow) -> AuctionSale {
    let date = match row.sale_date.as_deref().and_then(UtcDateTime::parse_rfc3339) {
        Some(timestamp) => SaleDate::Parsed(timestamp),
        None => SaleDate::Unparseable(
            row.date_raw
                .clone()
                .or_else(|| row.sale_date.clone())
                .unwrap_or_default(),
        ),
    };
    AuctionSale {
        date,
        auction_house: row.auction_house.clone(),
        sale_type: row.sale_type.clone(),
        certification: row.certification.clone(),
        price: row.price,
    }
}
