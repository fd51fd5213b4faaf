//! Paginated sale-history client.
//!
//! Pages are requested strictly one after another with a fixed courtesy delay
//! before every page after the first. The first page must succeed; any later
//! failure ends pagination and keeps what was already collected.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::RawSaleRecord;
use crate::error::{FetchFailure, PipelineError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::locator::ItemId;

pub const DEFAULT_ENDPOINT: &str = "https://www.psacard.com/auctionprices/GetItemLots";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Pagination, pacing and timeout settings for [`SalesClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub endpoint: String,
    /// Records requested per page.
    pub page_size: usize,
    /// Upper bound on pages fetched after the first one.
    pub max_pages: usize,
    pub request_timeout: Duration,
    /// Pause inserted before every page after the first.
    pub page_delay: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from(DEFAULT_ENDPOINT),
            page_size: 50,
            max_pages: 5,
            request_timeout: Duration::from_secs(10),
            page_delay: Duration::from_secs(2),
            user_agent: String::from(BROWSER_USER_AGENT),
        }
    }
}

impl FetchConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Pages to request after the first, given the upstream's `recordsTotal`.
    pub fn additional_pages(&self, records_total: usize) -> usize {
        let page_size = self.page_size.max(1);
        if records_total <= page_size {
            return 0;
        }
        (records_total - page_size)
            .div_ceil(page_size)
            .min(self.max_pages)
    }
}

/// Future used as a cancellation signal; it fires by completing.
pub type CancelSignal<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Anything able to produce the raw sale history of one item.
pub trait SaleHistorySource: Send + Sync {
    /// Fetches every available sale, stopping early when `cancel` completes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::FetchFailed`] only when nothing could be collected.
    fn fetch_sales<'a>(
        &'a self,
        item_id: ItemId,
        cancel: CancelSignal<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawSaleRecord>, PipelineError>> + Send + 'a>>;
}

#[derive(Debug)]
struct SalesPage {
    records: Vec<RawSaleRecord>,
    records_total: Option<usize>,
}

/// Sale-history client for the form-encoded `GetItemLots` style endpoint.
#[derive(Clone)]
pub struct SalesClient {
    http_client: Arc<dyn HttpClient>,
    config: FetchConfig,
}

impl SalesClient {
    pub fn new(http_client: Arc<dyn HttpClient>, config: FetchConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches all pages without an external cancellation signal.
    pub async fn fetch_all_sales(&self, item_id: ItemId) -> Result<Vec<RawSaleRecord>, PipelineError> {
        self.fetch_all_sales_until(item_id, std::future::pending::<()>())
            .await
    }

    /// Fetches all pages until done or until `cancel` completes.
    ///
    /// Cancellation during the first page is a [`FetchFailure::Cancelled`];
    /// afterwards it returns the pages already collected.
    pub async fn fetch_all_sales_until<F>(
        &self,
        item_id: ItemId,
        cancel: F,
    ) -> Result<Vec<RawSaleRecord>, PipelineError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        let page_size = self.config.page_size.max(1);

        let first = tokio::select! {
            biased;
            () = &mut cancel => Err(FetchFailure::Cancelled),
            page = self.fetch_page(item_id, 1, 0) => page,
        };
        let first = first.map_err(|failure| {
            warn!(item_id = %item_id, %failure, "first sale-history page failed");
            PipelineError::FetchFailed(failure)
        })?;

        let records_total = first.records_total.unwrap_or(first.records.len());
        let additional_pages = self.config.additional_pages(records_total);
        info!(
            item_id = %item_id,
            records_total,
            first_page = first.records.len(),
            additional_pages,
            "fetched first sale-history page"
        );

        let mut sales = first.records;
        for index in 1..=additional_pages {
            let draw = index + 1;
            let start = index * page_size;

            let outcome = tokio::select! {
                biased;
                () = &mut cancel => None,
                page = async {
                    tokio::time::sleep(self.config.page_delay).await;
                    self.fetch_page(item_id, draw, start).await
                } => Some(page),
            };

            match outcome {
                Some(Ok(page)) => {
                    debug!(item_id = %item_id, draw, records = page.records.len(), "fetched page");
                    sales.extend(page.records);
                }
                Some(Err(failure)) => {
                    warn!(
                        item_id = %item_id,
                        draw,
                        %failure,
                        collected = sales.len(),
                        "stopping pagination early, keeping partial results"
                    );
                    break;
                }
                None => {
                    warn!(
                        item_id = %item_id,
                        draw,
                        collected = sales.len(),
                        "fetch cancelled, keeping partial results"
                    );
                    break;
                }
            }
        }

        Ok(sales)
    }

    async fn fetch_page(
        &self,
        item_id: ItemId,
        draw: usize,
        start: usize,
    ) -> Result<SalesPage, FetchFailure> {
        let timeout_ms = u64::try_from(self.config.request_timeout.as_millis()).unwrap_or(u64::MAX);
        let request = HttpRequest::post(self.config.endpoint.as_str())
            .with_header("user-agent", self.config.user_agent.as_str())
            .with_form(&[
                ("specID", item_id.to_string()),
                ("draw", draw.to_string()),
                ("start", start.to_string()),
                ("length", self.config.page_size.to_string()),
            ])
            .with_timeout_ms(timeout_ms);

        let response = tokio::time::timeout(
            self.config.request_timeout,
            self.http_client.execute(request),
        )
        .await
        .map_err(|_| FetchFailure::Timeout)?
        .map_err(|error| {
            if error.is_timeout() {
                FetchFailure::Timeout
            } else {
                FetchFailure::Transport(error.message().to_owned())
            }
        })?;

        if !response.is_success() {
            return Err(FetchFailure::Status(response.status));
        }

        parse_page(&response.body)
    }
}

impl SaleHistorySource for SalesClient {
    fn fetch_sales<'a>(
        &'a self,
        item_id: ItemId,
        cancel: CancelSignal<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawSaleRecord>, PipelineError>> + Send + 'a>> {
        Box::pin(self.fetch_all_sales_until(item_id, cancel))
    }
}

fn parse_page(body: &str) -> Result<SalesPage, FetchFailure> {
    let mut payload: Value = serde_json::from_str(body)
        .map_err(|error| FetchFailure::MalformedBody(format!("response is not JSON: {error}")))?;

    let records: Vec<RawSaleRecord> = match payload.get_mut("data").map(Value::take) {
        Some(Value::Array(items)) => items.into_iter().map(RawSaleRecord::from_value).collect(),
        _ => {
            return Err(FetchFailure::MalformedBody(String::from(
                "no data array in response",
            )))
        }
    };

    let records_total = payload.get("recordsTotal").and_then(|value| match value {
        Value::Number(number) => number.as_u64().and_then(|total| usize::try_from(total).ok()),
        Value::String(text) => text.trim().parse::<usize>().ok(),
        _ => None,
    });

    Ok(SalesPage {
        records,
        records_total,
    })
}
