//! Behavior tests for storing and reading back card records.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use slabprice_core::{
    card_record, CardRecord, FetchConfig, Pipeline, PipelineError, SalesClient,
    ScriptedHttpClient, ValidationError, Warehouse, WarehouseConfig, WarehouseError,
};
use tempfile::{tempdir, TempDir};

fn warehouse(temp: &TempDir) -> Arc<Warehouse> {
    let config = WarehouseConfig::default().with_db_path(temp.path().join("cards.duckdb"));
    Arc::new(Warehouse::open(config).expect("warehouse opens"))
}

fn saving_pipeline(store: Arc<Warehouse>) -> Pipeline {
    let offline = SalesClient::new(Arc::new(ScriptedHttpClient::default()), FetchConfig::default());
    Pipeline::new(Arc::new(offline)).with_store(store)
}

fn submitted_card() -> CardRecord {
    serde_json::from_value(json!({
        "name": "1986 Fleer Michael Jordan",
        "source_url": "https://www.psacard.com/auctionprices/basketball-cards/1986-fleer/michael-jordan/values/1001",
        "grades": [
            {
                "grade": "PSA 9",
                "population": 10,
                "auctions": [
                    {"date": "2020-02-01T00:00:00Z", "auction_house": "Goldin", "sale_type": "Auction", "certification": "111", "price": 4000.0},
                    {"date": {"unparseable": "sometime in 2019"}, "auction_house": "eBay", "sale_type": "BIN", "price": 1000.0},
                    {"date": "2023-02-01T00:00:00Z", "auction_house": "Heritage", "sale_type": "Auction", "certification": "222", "price": 7000.0}
                ]
            },
            {"grade": "PSA 10", "auctions": []}
        ]
    }))
    .expect("valid card document")
}

#[tokio::test]
async fn saved_card_is_recomputed_and_reads_back_identically() {
    // Given: a submitted card whose sales are out of order and lack derived fields
    let temp = tempdir().expect("tempdir");
    let store = warehouse(&temp);
    let pipeline = saving_pipeline(store.clone());

    // When: it is saved
    let saved = pipeline.save(&submitted_card()).expect("save");

    // Then: derived fields were recomputed before storing
    let psa9 = saved.record.grade("PSA 9").expect("PSA 9");
    assert_eq!(psa9.recent_price, Some(7000.0));
    assert_eq!(psa9.average_price, Some(4000.0));
    assert_eq!(psa9.market_cap, Some(40_000.0));
    assert_eq!(
        psa9.volume_metrics.map(|volume| volume.total_volume),
        Some(12_000.0)
    );
    let psa10 = saved.record.grade("PSA 10").expect("PSA 10");
    assert_eq!(psa10.recent_price, None);
    assert_eq!(psa10.average_price, None);
    assert_eq!(
        psa10.volume_metrics.map(|volume| volume.total_volume),
        Some(0.0)
    );

    // And: loading it back yields the same record, unparseable date included
    let stored = store.load_card(&saved.id).expect("load");
    assert_eq!(card_record(&stored.card), saved.record);
    assert_eq!(
        stored.card.grades[0].auctions[2].date_raw.as_deref(),
        Some("sometime in 2019")
    );
}

#[tokio::test]
async fn saving_again_keeps_the_card_identity_and_drops_missing_grades() {
    let temp = tempdir().expect("tempdir");
    let store = warehouse(&temp);
    let pipeline = saving_pipeline(store.clone());

    let first = pipeline.save(&submitted_card()).expect("first save");

    let mut revised = submitted_card();
    revised.grades.retain(|bucket| bucket.grade == "PSA 9");
    let second = pipeline.save(&revised).expect("second save");

    assert_eq!(first.id, second.id);
    let summaries = store.list_cards().expect("list");
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].grade_count, 1);
    assert_eq!(summaries[0].sale_count, 3);
    assert_eq!(
        store
            .find_card_id(&revised.name, &revised.source_url)
            .expect("lookup"),
        Some(first.id)
    );
}

#[tokio::test]
async fn population_flag_overrides_submitted_population() {
    let temp = tempdir().expect("tempdir");
    let store = warehouse(&temp);
    let pipeline = saving_pipeline(store)
        .with_populations(HashMap::from([(String::from("PSA 9"), 2)]));

    let saved = pipeline.save(&submitted_card()).expect("save");

    let psa9 = saved.record.grade("PSA 9").expect("PSA 9");
    assert_eq!(psa9.population, Some(2));
    assert_eq!(psa9.market_cap, Some(8000.0));
}

#[tokio::test]
async fn incomplete_cards_are_rejected_before_storage() {
    let temp = tempdir().expect("tempdir");
    let store = warehouse(&temp);
    let pipeline = saving_pipeline(store.clone());

    let mut nameless = submitted_card();
    nameless.name.clear();
    let mut gradeless = submitted_card();
    gradeless.grades.clear();

    assert_eq!(
        pipeline.save(&nameless),
        Err(PipelineError::Validation(ValidationError::EmptyCardName))
    );
    assert_eq!(
        pipeline.save(&gradeless),
        Err(PipelineError::Validation(ValidationError::NoGrades))
    );
    assert!(store.list_cards().expect("list").is_empty());
}

#[tokio::test]
async fn repeated_grade_labels_are_rejected_before_storage() {
    // Given: a submitted card with two buckets both labelled PSA 9
    let temp = tempdir().expect("tempdir");
    let store = warehouse(&temp);
    let pipeline = saving_pipeline(store.clone());
    let mut repeated = submitted_card();
    let mut copy = repeated.grades[0].clone();
    copy.auctions.truncate(1);
    repeated.grades.push(copy);

    // When: it is saved
    let result = pipeline.save(&repeated);

    // Then: the save fails instead of merging the buckets' sales
    assert_eq!(
        result,
        Err(PipelineError::Validation(ValidationError::DuplicateGrade {
            grade: String::from("PSA 9")
        }))
    );
    assert!(result.unwrap_err().is_client_error());
    // And: nothing was written
    assert!(store.list_cards().expect("list").is_empty());
}

#[tokio::test]
async fn unknown_card_id_is_reported_as_not_found() {
    let temp = tempdir().expect("tempdir");
    let store = warehouse(&temp);

    let error = store.load_card("00000000-0000-0000-0000-000000000000").expect_err("absent");
    assert!(matches!(error, WarehouseError::RecordNotFound(_)));
}
