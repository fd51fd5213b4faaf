//! Market cap and trailing sale-volume metrics.

use crate::domain::{AuctionSale, CardRecord, GradeBucket, UtcDateTime, VolumeMetrics};

/// `population * average_price` when both are known.
pub fn market_cap(population: Option<u64>, average_price: Option<f64>) -> Option<f64> {
    match (population, average_price) {
        (Some(population), Some(average_price)) => Some(population as f64 * average_price),
        _ => None,
    }
}

/// Sum of every sale price. Unparseable dates are included.
pub fn total_volume(auctions: &[AuctionSale]) -> f64 {
    auctions.iter().map(|sale| sale.price).sum()
}

/// Sum of sale prices dated at or after `since`. Unparseable dates are excluded.
pub fn volume_since(auctions: &[AuctionSale], since: UtcDateTime) -> f64 {
    auctions
        .iter()
        .filter(|sale| sale.timestamp().is_some_and(|timestamp| timestamp >= since))
        .map(|sale| sale.price)
        .sum()
}

/// All five windows relative to `now`.
pub fn volume_metrics(auctions: &[AuctionSale], now: UtcDateTime) -> VolumeMetrics {
    if auctions.is_empty() {
        return VolumeMetrics::default();
    }

    VolumeMetrics {
        total_volume: total_volume(auctions),
        volume_10y: volume_since(auctions, now.years_before(10)),
        volume_5y: volume_since(auctions, now.years_before(5)),
        annual_volume: volume_since(auctions, now.years_before(1)),
        monthly_volume: volume_since(auctions, now.months_before(1)),
    }
}

/// Returns a copy of `record` with market cap and volume metrics filled in, measured from now.
pub fn compute_metrics(record: &CardRecord) -> CardRecord {
    compute_metrics_at(record, UtcDateTime::now())
}

/// Same as [`compute_metrics`] against a fixed reference time.
pub fn compute_metrics_at(record: &CardRecord, now: UtcDateTime) -> CardRecord {
    CardRecord {
        name: record.name.clone(),
        source_url: record.source_url.clone(),
        grades: record
            .grades
            .iter()
            .map(|bucket| GradeBucket {
                market_cap: market_cap(bucket.population, bucket.average_price),
                volume_metrics: Some(volume_metrics(&bucket.auctions, now)),
                ..bucket.clone()
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawSale, SaleDate};

    fn now() -> UtcDateTime {
        UtcDateTime::parse_rfc3339("2025-03-15T12:00:00Z").expect("valid")
    }

    fn sale(date: &str, price: f64) -> AuctionSale {
        AuctionSale {
            date: SaleDate::parse(Some(date)),
            auction_house: String::from("Unknown"),
            sale_type: String::from("Unknown"),
            certification: String::new(),
            price,
        }
    }

    fn bucket(auctions: Vec<AuctionSale>, population: Option<u64>) -> GradeBucket {
        let mut bucket = GradeBucket::new("PSA 9");
        bucket.auctions = auctions;
        bucket.population = population;
        bucket.finalize();
        bucket
    }

    #[test]
    fn market_cap_needs_both_inputs() {
        assert_eq!(market_cap(Some(10), Some(2.5)), Some(25.0));
        assert_eq!(market_cap(None, Some(2.5)), None);
        assert_eq!(market_cap(Some(10), None), None);
    }

    #[test]
    fn windows_nest_and_bound_by_total() {
        let auctions = vec![
            sale("2025-03-01", 1.0),   // within a month
            sale("2024-06-01", 10.0),  // within a year
            sale("2021-01-01", 100.0), // within five years
            sale("2016-01-01", 1000.0), // within ten years
            sale("1999-01-01", 10000.0),
            sale("unknown", 100000.0),
        ];

        let metrics = volume_metrics(&auctions, now());
        assert_eq!(metrics.monthly_volume, 1.0);
        assert_eq!(metrics.annual_volume, 11.0);
        assert_eq!(metrics.volume_5y, 111.0);
        assert_eq!(metrics.volume_10y, 1111.0);
        assert_eq!(metrics.total_volume, 111111.0);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let boundary = sale("2024-03-15T12:00:00Z", 5.0);
        let metrics = volume_metrics(&[boundary], now());
        assert_eq!(metrics.annual_volume, 5.0);
        assert_eq!(metrics.monthly_volume, 0.0);
    }

    #[test]
    fn empty_bucket_yields_zero_volumes_and_no_cap() {
        let record = CardRecord {
            name: String::from("x"),
            source_url: String::from("y"),
            grades: vec![bucket(Vec::new(), Some(40))],
        };

        let computed = compute_metrics_at(&record, now());
        let grade = &computed.grades[0];
        assert_eq!(grade.volume_metrics, Some(VolumeMetrics::default()));
        assert_eq!(grade.market_cap, None);
    }

    #[test]
    fn computing_twice_is_identical() {
        let record = CardRecord {
            name: String::from("x"),
            source_url: String::from("y"),
            grades: vec![bucket(
                vec![sale("01/01/2024", 1000.0), sale("01/01/2020", 500.0)],
                Some(3),
            )],
        };

        let once = compute_metrics_at(&record, now());
        let twice = compute_metrics_at(&once, now());
        assert_eq!(once, twice);
        assert_eq!(once.grades[0].market_cap, Some(2250.0));
        assert_eq!(
            once.grades[0].volume_metrics.map(|metrics| metrics.total_volume),
            Some(1500.0)
        );
    }

    #[test]
    fn raw_sales_flow_through_unchanged() {
        let record = CardRecord {
            name: String::from("x"),
            source_url: String::from("y"),
            grades: vec![bucket(
                vec![AuctionSale::from_raw(&RawSale::default().with_sale_price("$12"))],
                None,
            )],
        };
        let computed = compute_metrics_at(&record, now());
        assert_eq!(computed.grades[0].auctions, record.grades[0].auctions);
    }
}
