use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{DailyPriceRecord, Prediction, PublicPrediction};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryPredictionStore, MemoryPriceStore};
pub use postgres::{PgPredictionStore, PgPriceStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::Persistence(value.to_string())
    }
}

/// Durable daily price series keyed by calendar date.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Insert or fully overwrite the record for `record.date`. Atomic per date.
    async fn upsert(&self, record: &DailyPriceRecord) -> Result<(), StoreError>;

    /// Records within the inclusive range, oldest first.
    async fn fetch_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailyPriceRecord>, StoreError>;

    async fn fetch_latest(&self) -> Result<Option<DailyPriceRecord>, StoreError>;
}

/// Append-only prediction history.
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Persist a new prediction in one write and return it as stored.
    async fn insert(&self, prediction: &Prediction) -> Result<Prediction, StoreError>;

    /// Predictions owned by `user_id`, newest timestamp first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Prediction>, StoreError>;

    /// Public projection of every prediction, newest timestamp first.
    async fn list_public(&self) -> Result<Vec<PublicPrediction>, StoreError>;
}
