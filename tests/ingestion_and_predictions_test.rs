/// Ingestion and prediction-store behavior exercised through the public
/// library API with the in-memory stores.
///
/// - Idempotent re-import by date
/// - Volume absence vs zero
/// - Derived and undefined change percent
/// - Row isolation within a batch
/// - Owner scoping under interleaved and concurrent writes
/// - No persistence on validation failure

use std::collections::BTreeMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use futures::future::join_all;
use uuid::Uuid;

use goldcast_backend::auth::Identity;
use goldcast_backend::config::ScoreBounds;
use goldcast_backend::errors::AppError;
use goldcast_backend::models::{
    ChangeOrigin, Owner, PredictionInput, RawRow, RowIssue, SentimentInput, TimeframeInput,
};
use goldcast_backend::services::{prediction_service, price_import_service};
use goldcast_backend::store::{MemoryPredictionStore, MemoryPriceStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<BTreeMap<_, _>>()
}

fn date(d: u32, m: u32, y: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn user(handle: &str) -> Identity {
    Identity::Authenticated(Owner {
        user_id: Uuid::new_v4(),
        handle: handle.to_string(),
    })
}

fn owner_id(identity: &Identity) -> Uuid {
    identity.require_owner().unwrap().user_id
}

fn timeframe(label: &str) -> TimeframeInput {
    TimeframeInput {
        timeframe: Some(label.to_string()),
        trend: Some("bearish".to_string()),
        open: Some(2301.0),
        close: Some(2288.4),
        high: Some(2310.9),
        low: Some(2280.0),
        sentiment: Some(SentimentInput {
            score: Some(-0.2),
            category: Some("negative".to_string()),
            reasons: vec!["Strong dollar".to_string(), "Rising yields".to_string()],
        }),
    }
}

fn prediction_at(timestamp: &str) -> PredictionInput {
    PredictionInput {
        timestamp: Some(timestamp.to_string()),
        sentiment_score: Some(-0.25),
        sentiment_label: Some("Bearish".to_string()),
        price_prediction: Some("Pullback toward 2280 support".to_string()),
        short_term: Some(timeframe("24h")),
        long_term: Some(timeframe("30d")),
    }
}

// ---------------------------------------------------------------------------
// Price ingestion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reingesting_a_row_keeps_one_record_with_latest_values() {
    let store = MemoryPriceStore::new();
    let first = row(&[("Date", "15-01-2024"), ("Price", "2,030.10"), ("Open", "2,050.00")]);
    let second = row(&[("Date", "15-01-2024"), ("Price", "2,041.70"), ("Open", "2,030.10")]);

    price_import_service::ingest_rows(&store, vec![first]).await.unwrap();
    price_import_service::ingest_rows(&store, vec![second]).await.unwrap();

    assert_eq!(store.len(), 1);
    let stored = store.get(date(15, 1, 2024)).unwrap();
    assert_eq!(stored.close_price, BigDecimal::from_str("2041.70").unwrap());
    assert_eq!(stored.open_price, BigDecimal::from_str("2030.10").unwrap());
}

#[tokio::test]
async fn blank_volume_is_absent_and_zero_volume_is_zero() {
    let store = MemoryPriceStore::new();
    let rows = vec![
        row(&[("Date", "01-01-2024"), ("Price", "2063"), ("Volume", "")]),
        row(&[("Date", "02-01-2024"), ("Price", "2059"), ("Volume", "0")]),
    ];

    price_import_service::ingest_rows(&store, rows).await.unwrap();

    assert_eq!(store.get(date(1, 1, 2024)).unwrap().volume, None);
    assert_eq!(store.get(date(2, 1, 2024)).unwrap().volume, Some(0));
}

#[tokio::test]
async fn derived_change_from_open_and_close() {
    let store = MemoryPriceStore::new();
    price_import_service::ingest_rows(&store, vec![row(&[("Date", "03-01-2024"), ("Open", "100"), ("Price", "110")])])
        .await
        .unwrap();

    let record = store.get(date(3, 1, 2024)).unwrap();
    assert_eq!(record.change_amount, BigDecimal::from(10));
    assert_eq!(record.change_percent, Some(BigDecimal::from_str("10.0").unwrap()));
    assert_eq!(record.change_origin, ChangeOrigin::Derived);
}

#[tokio::test]
async fn zero_open_flags_division_undefined() {
    let store = MemoryPriceStore::new();
    let report = price_import_service::ingest_rows(
        &store,
        vec![row(&[("Date", "04-01-2024"), ("Open", "0"), ("Price", "50")])],
    )
    .await
    .unwrap();

    assert_eq!(report.flagged.len(), 1);
    assert_eq!(report.flagged[0].issue, RowIssue::DivisionUndefined);
    assert_eq!(report.flagged[0].date, date(4, 1, 2024));

    let record = store.get(date(4, 1, 2024)).unwrap();
    assert_eq!(record.change_percent, None);
    assert_eq!(record.change_origin, ChangeOrigin::Undefined);
}

#[tokio::test]
async fn invalid_date_in_middle_of_batch_is_isolated() {
    let store = MemoryPriceStore::new();
    let rows = vec![
        row(&[("Date", "29-02-2024"), ("Price", "2044.50")]),
        row(&[("Date", "31-02-2024"), ("Price", "2050.00")]),
        row(&[("Date", "01-03-2024"), ("Price", "2082.90")]),
    ];

    let report = price_import_service::ingest_rows(&store, rows).await.unwrap();

    assert_eq!(report.imported_count, 2);
    assert_eq!(report.error_count, 1);
    assert_eq!(report.errors[0].row_index, 1);
    assert!(store.get(date(29, 2, 2024)).is_some());
    assert!(store.get(date(1, 3, 2024)).is_some());
}

#[tokio::test]
async fn concurrent_batches_on_same_date_leave_one_complete_record() {
    let store = MemoryPriceStore::new();

    let batches = (0..16).map(|i| {
        let store = store.clone();
        let close = format!("{}", 2000 + i);
        async move {
            let rows = vec![row(&[
                ("Date", "10-01-2024"),
                ("Price", close.as_str()),
                ("Open", close.as_str()),
                ("Vol.", "1K"),
            ])];
            price_import_service::ingest_rows(&store, rows).await.unwrap()
        }
    });
    let reports = join_all(batches).await;

    assert!(reports.iter().all(|r| r.imported_count == 1));
    assert_eq!(store.len(), 1);
    let record = store.get(date(10, 1, 2024)).unwrap();
    // Whichever batch won, its fields were written together
    assert_eq!(record.close_price, record.open_price);
    assert_eq!(record.volume, Some(1000));
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_for_user_never_returns_another_users_prediction() {
    let store = MemoryPredictionStore::new();
    let bounds = ScoreBounds::default();
    let users = [user("a"), user("b"), user("c")];

    for i in 0..12 {
        let who = &users[i % users.len()];
        let ts = format!("2024-05-{:02}T12:00:00Z", i + 1);
        prediction_service::create_prediction(&store, who, &prediction_at(&ts), &bounds)
            .await
            .unwrap();
    }

    for who in &users {
        let mine = prediction_service::list_for_user(&store, who).await.unwrap();
        assert_eq!(mine.len(), 4);
        assert!(mine.iter().all(|p| p.user_id == owner_id(who)));
        assert!(mine.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }
}

#[tokio::test]
async fn concurrent_creations_stay_scoped_to_owner() {
    let store = MemoryPredictionStore::new();
    let bounds = ScoreBounds::default();
    let alice = user("alice");
    let bob = user("bob");

    let creations = (0..20).map(|i| {
        let store = store.clone();
        let who = if i % 2 == 0 { alice.clone() } else { bob.clone() };
        async move {
            let ts = format!("2024-06-01T00:{:02}:00Z", i);
            prediction_service::create_prediction(&store, &who, &prediction_at(&ts), &bounds).await
        }
    });
    let results = join_all(creations).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let alices = prediction_service::list_for_user(&store, &alice).await.unwrap();
    let bobs = prediction_service::list_for_user(&store, &bob).await.unwrap();
    assert_eq!(alices.len(), 10);
    assert_eq!(bobs.len(), 10);
    assert!(alices.iter().all(|p| p.user_id == owner_id(&alice)));
    assert!(bobs.iter().all(|p| p.user_id == owner_id(&bob)));

    let all = prediction_service::list_all(&store).await.unwrap();
    assert_eq!(all.len(), 20);
    assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[tokio::test]
async fn short_term_only_prediction_is_rejected_and_not_stored() {
    let store = MemoryPredictionStore::new();
    let mut input = prediction_at("2024-06-02T09:00:00Z");
    input.long_term = None;

    let before = store.len();
    let result = prediction_service::create_prediction(&store, &user("a"), &input, &ScoreBounds::default()).await;

    match result {
        Err(AppError::Validation { field, .. }) => assert_eq!(field, "longTerm"),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(store.len(), before);
}
