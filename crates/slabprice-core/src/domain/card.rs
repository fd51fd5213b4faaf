use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::AuctionSale;
use crate::ValidationError;

/// Summed sale prices over trailing windows ending at the calculation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeMetrics {
    pub total_volume: f64,
    pub volume_10y: f64,
    pub volume_5y: f64,
    pub annual_volume: f64,
    pub monthly_volume: f64,
}

/// Sales of one grade plus the figures derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBucket {
    pub grade: String,
    #[serde(default)]
    pub auctions: Vec<AuctionSale>,
    pub recent_price: Option<f64>,
    pub average_price: Option<f64>,
    pub population: Option<u64>,
    pub market_cap: Option<f64>,
    pub volume_metrics: Option<VolumeMetrics>,
}

impl GradeBucket {
    pub fn new(grade: impl Into<String>) -> Self {
        Self {
            grade: grade.into(),
            auctions: Vec::new(),
            recent_price: None,
            average_price: None,
            population: None,
            market_cap: None,
            volume_metrics: None,
        }
    }

    /// Sorts sales most-recent-first and refreshes `recent_price` and `average_price`.
    pub fn finalize(&mut self) {
        self.auctions
            .sort_by(|left, right| left.date.cmp_recent_first(&right.date));
        self.recent_price = self.auctions.first().map(|sale| sale.price);
        self.average_price = if self.auctions.is_empty() {
            None
        } else {
            let total: f64 = self.auctions.iter().map(|sale| sale.price).sum();
            Some(total / self.auctions.len() as f64)
        };
    }
}

/// Aggregate root for one collectible item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub name: String,
    pub source_url: String,
    pub grades: Vec<GradeBucket>,
}

impl CardRecord {
    pub fn grade(&self, label: &str) -> Option<&GradeBucket> {
        self.grades.iter().find(|bucket| bucket.grade == label)
    }

    pub fn sale_count(&self) -> usize {
        self.grades.iter().map(|bucket| bucket.auctions.len()).sum()
    }

    /// Sets `population` on every bucket whose grade label is a key of `populations`.
    pub fn apply_population(&mut self, populations: &HashMap<String, u64>) {
        for bucket in &mut self.grades {
            if let Some(population) = populations.get(&bucket.grade) {
                bucket.population = Some(*population);
            }
        }
    }

    /// Checks the shape a caller-supplied record must have before it is saved.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyCardName);
        }
        if self.source_url.trim().is_empty() {
            return Err(ValidationError::EmptySourceUrl);
        }
        if self.grades.is_empty() {
            return Err(ValidationError::NoGrades);
        }
        let mut seen = HashSet::with_capacity(self.grades.len());
        if let Some(bucket) = self.grades.iter().find(|bucket| !seen.insert(&bucket.grade)) {
            return Err(ValidationError::DuplicateGrade {
                grade: bucket.grade.clone(),
            });
        }
        Ok(())
    }
}

/// Parses `GRADE=COUNT` entries such as `PSA 10=1234`.
pub fn parse_population_entries<I, S>(entries: I) -> Result<HashMap<String, u64>, ValidationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut populations = HashMap::new();
    for entry in entries {
        let entry = entry.as_ref();
        let invalid = || ValidationError::InvalidPopulationEntry {
            value: entry.to_owned(),
        };
        let (grade, count) = entry.rsplit_once('=').ok_or_else(invalid)?;
        let grade = grade.trim();
        if grade.is_empty() {
            return Err(invalid());
        }
        let count = count.trim().replace(',', "").parse::<u64>().map_err(|_| invalid())?;
        populations.insert(grade.to_owned(), count);
    }
    Ok(populations)
}
