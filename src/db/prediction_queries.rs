use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Prediction, PublicPrediction, Timeframe};

#[derive(Debug, sqlx::FromRow)]
pub struct PredictionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub owner_handle: String,
    pub timestamp: DateTime<Utc>,
    pub sentiment_score: f64,
    pub sentiment_label: String,
    pub price_prediction: String,
    pub short_term: Json<Timeframe>,
    pub long_term: Json<Timeframe>,
    pub created_at: DateTime<Utc>,
}

impl From<PredictionRow> for Prediction {
    fn from(row: PredictionRow) -> Self {
        Prediction {
            id: row.id,
            user_id: row.user_id,
            owner_handle: row.owner_handle,
            timestamp: row.timestamp,
            sentiment_score: row.sentiment_score,
            sentiment_label: row.sentiment_label,
            price_prediction: row.price_prediction,
            short_term: row.short_term.0,
            long_term: row.long_term.0,
            created_at: row.created_at,
        }
    }
}

/// Single-statement insert; the row is either fully written or not at all.
pub async fn insert(pool: &PgPool, prediction: &Prediction) -> Result<PredictionRow, sqlx::Error> {
    sqlx::query_as::<_, PredictionRow>(
        r#"
        INSERT INTO predictions (
            id, user_id, owner_handle, timestamp, sentiment_score, sentiment_label,
            price_prediction, short_term, long_term, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(prediction.id)
    .bind(prediction.user_id)
    .bind(&prediction.owner_handle)
    .bind(prediction.timestamp)
    .bind(prediction.sentiment_score)
    .bind(&prediction.sentiment_label)
    .bind(&prediction.price_prediction)
    .bind(Json(&prediction.short_term))
    .bind(Json(&prediction.long_term))
    .bind(prediction.created_at)
    .fetch_one(pool)
    .await
}

pub async fn fetch_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<PredictionRow>, sqlx::Error> {
    sqlx::query_as::<_, PredictionRow>(
        r#"
        SELECT * FROM predictions
        WHERE user_id = $1
        ORDER BY timestamp DESC, created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Explore listing. Only the projected columns leave the database.
pub async fn fetch_public(pool: &PgPool) -> Result<Vec<PublicPrediction>, sqlx::Error> {
    sqlx::query_as::<_, PublicPrediction>(
        r#"
        SELECT id,
               owner_handle,
               timestamp,
               sentiment_label,
               sentiment_score,
               price_prediction,
               short_term->>'timeframe' AS short_term_timeframe,
               short_term->>'trend' AS short_term_trend,
               long_term->>'timeframe' AS long_term_timeframe,
               long_term->>'trend' AS long_term_trend
        FROM predictions
        ORDER BY timestamp DESC, created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}
