//! Behavior tests for a complete scrape: locator in, card record out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use slabprice_core::{
    FetchConfig, FetchFailure, HttpError, HttpResponse, Pipeline, PipelineError, SaleDate,
    SalesClient, ScriptedHttpClient, Warehouse, WarehouseConfig,
};
use tempfile::tempdir;

const MANTLE_URL: &str =
    "https://www.psacard.com/auctionprices/baseball-cards/1952-topps/mickey-mantle/values/544";

fn body(records: Value, records_total: usize) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::ok_json(
        json!({"data": records, "recordsTotal": records_total}).to_string(),
    ))
}

fn pipeline_over(http: Arc<ScriptedHttpClient>, page_size: usize) -> Pipeline {
    let config = FetchConfig::default()
        .with_page_size(page_size)
        .with_page_delay(Duration::ZERO);
    Pipeline::new(Arc::new(SalesClient::new(http, config)))
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn scrape_buckets_sales_and_derives_prices() {
    // Given: two PSA 10 sales, the newer one for $1,000
    let http = Arc::new(ScriptedHttpClient::new([body(
        json!([
            {"GradeString": "PSA 10", "SalePrice": "$1,000.00", "EndDate": "01/01/2024"},
            {"GradeString": "PSA 10", "SalePrice": "$500", "EndDate": "01/01/2020"}
        ]),
        2,
    )]));
    let pipeline = pipeline_over(http, 50);

    // When: the card is scraped
    let card = pipeline
        .run(MANTLE_URL, "1952 Topps Mickey Mantle")
        .await
        .expect("scrape succeeds");

    // Then: one bucket carries the recency, mean and total volume
    assert_eq!(card.name, "1952 Topps Mickey Mantle");
    assert_eq!(card.source_url, MANTLE_URL);
    assert_eq!(card.grades.len(), 1);
    let bucket = card.grade("PSA 10").expect("PSA 10 bucket");
    assert_eq!(bucket.recent_price, Some(1000.0));
    assert_eq!(bucket.average_price, Some(750.0));
    let volume = bucket.volume_metrics.expect("volume metrics");
    assert_eq!(volume.total_volume, 1500.0);
    assert!(volume.total_volume >= volume.volume_10y);
    assert!(volume.volume_10y >= volume.volume_5y);
    assert!(volume.volume_5y >= volume.annual_volume);
    assert!(volume.annual_volume >= volume.monthly_volume);
    // And: without a population there is no market cap
    assert_eq!(bucket.market_cap, None);
}

#[tokio::test]
async fn supplied_population_yields_market_cap() {
    let http = Arc::new(ScriptedHttpClient::new([body(
        json!([
            {"GradeString": "PSA 8", "SalePrice": "$200", "EndDate": "05/05/2023"},
            {"GradeString": "PSA 8", "SalePrice": "$100", "EndDate": "05/05/2022"}
        ]),
        2,
    )]));
    let pipeline = pipeline_over(http, 50)
        .with_populations(HashMap::from([(String::from("PSA 8"), 40)]));

    let card = pipeline.run(MANTLE_URL, "Mantle").await.expect("scrape");

    let bucket = card.grade("PSA 8").expect("bucket");
    assert_eq!(bucket.population, Some(40));
    assert_eq!(bucket.market_cap, Some(6000.0));
}

#[tokio::test]
async fn unusable_fields_are_defaulted_not_fatal() {
    // Given: a sale with no usable price, date, house or grade
    let http = Arc::new(ScriptedHttpClient::new([body(
        json!([
            {"SalePrice": "N/A", "EndDate": "n/a", "Name": ""},
            "not an object",
            {"GradeString": "PSA 4", "SalePrice": "$12.50", "EndDate": "2023-07-04"}
        ]),
        3,
    )]));
    let pipeline = pipeline_over(http, 50);

    // When: the card is scraped
    let card = pipeline.run(MANTLE_URL, "Mantle").await.expect("scrape");

    // Then: the record still counts, with every field defaulted
    let unknown = card.grade("Unknown").expect("Unknown bucket");
    assert_eq!(unknown.auctions.len(), 1);
    let sale = &unknown.auctions[0];
    assert_eq!(sale.price, 0.0);
    assert_eq!(sale.auction_house, "Unknown");
    assert_eq!(sale.sale_type, "Unknown");
    assert_eq!(sale.certification, "");
    assert_eq!(sale.date, SaleDate::Unparseable(String::from("n/a")));
    // And: the non-object entry was dropped silently
    assert_eq!(card.sale_count(), 2);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn first_page_500_fails_the_run() {
    let http = Arc::new(ScriptedHttpClient::new([Ok(HttpResponse::with_status(
        500, "",
    ))]));
    let pipeline = pipeline_over(http, 50);

    let error = pipeline.run(MANTLE_URL, "Mantle").await.expect_err("fails");

    assert_eq!(error, PipelineError::FetchFailed(FetchFailure::Status(500)));
    assert_eq!(error.code(), "pipeline.fetch_failed");
    assert_eq!(error.http_status(), 500);
}

#[tokio::test]
async fn second_of_three_pages_failing_keeps_first_page() {
    // Given: three pages of two, the second page times out
    let http = Arc::new(ScriptedHttpClient::new([
        body(
            json!([
                {"GradeString": "PSA 9", "SalePrice": "$300", "EndDate": "01/01/2024"},
                {"GradeString": "PSA 9", "SalePrice": "$100", "EndDate": "01/01/2023"}
            ]),
            6,
        ),
        Err(HttpError::timeout("timed out")),
    ]));
    let pipeline = pipeline_over(http.clone(), 2);

    // When: the card is scraped
    let card = pipeline.run(MANTLE_URL, "Mantle").await.expect("partial success");

    // Then: only the first page is in the card
    assert_eq!(card.sale_count(), 2);
    assert_eq!(card.grade("PSA 9").and_then(|b| b.average_price), Some(200.0));
    assert_eq!(http.requests().len(), 2);
}

#[tokio::test]
async fn empty_upstream_result_is_no_usable_records() {
    let http = Arc::new(ScriptedHttpClient::new([body(json!([]), 0)]));
    let pipeline = pipeline_over(http, 50);

    let error = pipeline.run(MANTLE_URL, "Mantle").await.expect_err("empty");
    assert_eq!(error, PipelineError::NoUsableRecords);
    assert_eq!(error.http_status(), 400);
}

#[tokio::test]
async fn non_numeric_locator_fails_without_network() {
    let http = Arc::new(ScriptedHttpClient::default());
    let pipeline = pipeline_over(http.clone(), 50);

    for url in [
        "https://www.psacard.com/auctionprices/baseball-cards/1952-topps/mickey-mantle/values/",
        "https://www.psacard.com/auctionprices/baseball-cards/1952-topps/mickey-mantle",
        "https://www.psacard.com/auctionprices/x/values/12ab",
        "https://www.ebay.com/itm/544",
    ] {
        let error = pipeline.run(url, "Mantle").await.expect_err(url);
        assert!(
            matches!(error, PipelineError::InvalidLocator { .. }),
            "{url}: {error:?}"
        );
        assert_eq!(error.http_status(), 400);
    }
    assert!(http.requests().is_empty());
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn repeated_scrapes_update_one_stored_card() {
    // Given: a warehouse and two scrapes of the same card with different sales
    let temp = tempdir().expect("tempdir");
    let warehouse = Arc::new(
        Warehouse::open(WarehouseConfig::default().with_db_path(temp.path().join("w.duckdb")))
            .expect("warehouse"),
    );
    let http = Arc::new(ScriptedHttpClient::new([
        body(
            json!([{"GradeString": "PSA 7", "SalePrice": "$70", "EndDate": "01/01/2021"}]),
            1,
        ),
        body(
            json!([
                {"GradeString": "PSA 7", "SalePrice": "$75", "EndDate": "01/01/2022"},
                {"GradeString": "PSA 7", "SalePrice": "$80", "EndDate": "01/01/2023"}
            ]),
            2,
        ),
    ]));
    let pipeline = pipeline_over(http, 50).with_store(warehouse.clone());

    // When: the card is scraped twice
    pipeline.run(MANTLE_URL, "Mantle").await.expect("first scrape");
    let latest = pipeline.run(MANTLE_URL, "Mantle").await.expect("second scrape");

    // Then: one card is stored, holding only the latest auctions
    let cards = warehouse.list_cards().expect("list");
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].sale_count, 2);

    let stored = warehouse.load_card(&cards[0].id).expect("load");
    let prices: Vec<f64> = stored.card.grades[0]
        .auctions
        .iter()
        .map(|auction| auction.price)
        .collect();
    assert_eq!(prices, vec![80.0, 75.0]);
    assert_eq!(stored.card.grades[0].recent_price, latest.grades[0].recent_price);
}
