//! Grade bucketing of raw sale records.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{AuctionSale, CardRecord, GradeBucket, RawSaleRecord};
use crate::PipelineError;

const UNKNOWN_GRADE: &str = "Unknown";

/// Groups `sales` into per-grade buckets, in first-seen grade order.
///
/// Non-object records are skipped. Every other record lands in a bucket even
/// when its price or date is unusable; see [`AuctionSale::from_raw`].
///
/// # Errors
///
/// [`PipelineError::NoUsableRecords`] when no bucket could be formed.
pub fn normalize(
    sales: &[RawSaleRecord],
    item_name: &str,
    source_url: &str,
) -> Result<CardRecord, PipelineError> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<GradeBucket> = Vec::new();
    let mut skipped = 0usize;

    for record in sales {
        let raw = match record {
            RawSaleRecord::Sale(raw) => raw,
            RawSaleRecord::Malformed(_) => {
                skipped += 1;
                continue;
            }
        };

        // Labels are kept verbatim; only an absent or empty one is defaulted.
        let grade = match raw.grade.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => UNKNOWN_GRADE,
        };

        let position = *positions.entry(grade.to_owned()).or_insert_with(|| {
            buckets.push(GradeBucket::new(grade));
            buckets.len() - 1
        });
        buckets[position].auctions.push(AuctionSale::from_raw(raw));
    }

    if skipped > 0 {
        debug!(skipped, "skipped malformed sale records");
    }

    if buckets.is_empty() {
        return Err(PipelineError::NoUsableRecords);
    }

    for bucket in &mut buckets {
        bucket.finalize();
    }

    Ok(CardRecord {
        name: item_name.to_owned(),
        source_url: source_url.to_owned(),
        grades: buckets,
    })
}
