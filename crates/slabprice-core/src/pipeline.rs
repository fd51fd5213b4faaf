//! Scrape orchestration: locator, fetch, normalize, metrics, persistence.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::CardRecord;
use crate::fetch::SaleHistorySource;
use crate::locator::{extract_item_id, ItemId};
use crate::metrics::compute_metrics;
use crate::normalize::normalize;
use crate::store::CardStore;
use crate::PipelineError;

pub const DEFAULT_URL_FRAGMENT: &str = "psacard.com/auctionprices";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Substring every source URL must contain. `None` accepts any locator.
    pub required_url_fragment: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            required_url_fragment: Some(String::from(DEFAULT_URL_FRAGMENT)),
        }
    }
}

impl PipelineConfig {
    pub fn any_locator() -> Self {
        Self {
            required_url_fragment: None,
        }
    }
}

/// A record together with the id the store assigned it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedCard {
    pub id: String,
    pub record: CardRecord,
}

/// Runs one item through the full pipeline. Holds no per-run state.
#[derive(Clone)]
pub struct Pipeline {
    source: Arc<dyn SaleHistorySource>,
    store: Option<Arc<dyn CardStore>>,
    populations: HashMap<String, u64>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(source: Arc<dyn SaleHistorySource>) -> Self {
        Self {
            source,
            store: None,
            populations: HashMap::new(),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn CardStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Population counts by grade label, applied before metrics are computed.
    pub fn with_populations(mut self, populations: HashMap<String, u64>) -> Self {
        self.populations = populations;
        self
    }

    pub async fn run(&self, source_url: &str, item_name: &str) -> Result<CardRecord, PipelineError> {
        self.run_until(source_url, item_name, std::future::pending::<()>())
            .await
    }

    /// Like [`Pipeline::run`], handing `cancel` to the fetch stage.
    pub async fn run_until<F>(
        &self,
        source_url: &str,
        item_name: &str,
        cancel: F,
    ) -> Result<CardRecord, PipelineError>
    where
        F: Future<Output = ()> + Send,
    {
        info!(source_url, item_name, "starting scrape");
        let item_id = self.resolve_item_id(source_url)?;
        info!(item_id = %item_id, "extracted item id");

        let sales = self.source.fetch_sales(item_id, Box::pin(cancel)).await?;
        info!(item_id = %item_id, records = sales.len(), "fetched sale history");

        let mut record = normalize(&sales, item_name, source_url)?;
        record.apply_population(&self.populations);
        let record = compute_metrics(&record);
        info!(
            item_id = %item_id,
            grades = record.grades.len(),
            sales = record.sale_count(),
            "computed card metrics"
        );

        if let Some(store) = &self.store {
            let card_id = store.upsert(&record).inspect_err(|error| {
                warn!(item_id = %item_id, %error, "failed to persist card");
            })?;
            info!(item_id = %item_id, card_id = %card_id, "persisted card");
        }

        Ok(record)
    }

    /// Validates a caller-supplied record, recomputes its derived fields and stores it.
    pub fn save(&self, record: &CardRecord) -> Result<SavedCard, PipelineError> {
        record.validate()?;
        let Some(store) = &self.store else {
            return Err(PipelineError::Persistence(String::from(
                "no card store configured",
            )));
        };

        let mut record = record.clone();
        for bucket in &mut record.grades {
            bucket.finalize();
        }
        record.apply_population(&self.populations);
        let record = compute_metrics(&record);
        let id = store.upsert(&record)?;
        info!(card_id = %id, name = %record.name, grades = record.grades.len(), "saved card");
        Ok(SavedCard { id, record })
    }

    fn resolve_item_id(&self, source_url: &str) -> Result<ItemId, PipelineError> {
        if let Some(fragment) = &self.config.required_url_fragment {
            if !source_url.contains(fragment.as_str()) {
                return Err(PipelineError::invalid_locator(
                    source_url,
                    format!("expected a URL containing '{fragment}'"),
                ));
            }
        }
        extract_item_id(source_url)
    }
}
