use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{prediction_queries, price_queries};
use crate::models::{DailyPriceRecord, Prediction, PublicPrediction};
use crate::store::{PredictionStore, PriceStore, StoreError};

#[derive(Clone)]
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    async fn upsert(&self, record: &DailyPriceRecord) -> Result<(), StoreError> {
        price_queries::upsert(&self.pool, record).await?;
        Ok(())
    }

    async fn fetch_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailyPriceRecord>, StoreError> {
        price_queries::fetch_range(&self.pool, from, to)
            .await?
            .into_iter()
            .map(|row| DailyPriceRecord::try_from(row).map_err(StoreError::Corrupt))
            .collect()
    }

    async fn fetch_latest(&self) -> Result<Option<DailyPriceRecord>, StoreError> {
        price_queries::fetch_latest(&self.pool)
            .await?
            .map(|row| DailyPriceRecord::try_from(row).map_err(StoreError::Corrupt))
            .transpose()
    }
}

#[derive(Clone)]
pub struct PgPredictionStore {
    pool: PgPool,
}

impl PgPredictionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PredictionStore for PgPredictionStore {
    async fn insert(&self, prediction: &Prediction) -> Result<Prediction, StoreError> {
        let row = prediction_queries::insert(&self.pool, prediction).await?;
        Ok(row.into())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Prediction>, StoreError> {
        let rows = prediction_queries::fetch_for_user(&self.pool, user_id).await?;
        Ok(rows.into_iter().map(Prediction::from).collect())
    }

    async fn list_public(&self) -> Result<Vec<PublicPrediction>, StoreError> {
        Ok(prediction_queries::fetch_public(&self.pool).await?)
    }
}
