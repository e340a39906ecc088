use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::error;

use crate::models::{ChangeOrigin, DailyPriceRecord};

#[derive(Debug, sqlx::FromRow)]
pub struct DailyPriceRow {
    pub date: NaiveDate,
    pub open_price: BigDecimal,
    pub high_price: BigDecimal,
    pub low_price: BigDecimal,
    pub close_price: BigDecimal,
    pub volume: Option<i64>,
    pub change_amount: BigDecimal,
    pub change_percent: Option<BigDecimal>,
    pub change_origin: String,
    #[allow(dead_code)]
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DailyPriceRow> for DailyPriceRecord {
    type Error = String;

    fn try_from(row: DailyPriceRow) -> Result<Self, Self::Error> {
        Ok(DailyPriceRecord {
            date: row.date,
            open_price: row.open_price,
            high_price: row.high_price,
            low_price: row.low_price,
            close_price: row.close_price,
            volume: row.volume,
            change_amount: row.change_amount,
            change_percent: row.change_percent,
            change_origin: row.change_origin.parse::<ChangeOrigin>()?,
        })
    }
}

/// Insert or fully overwrite the record for one date.
pub async fn upsert(pool: &PgPool, record: &DailyPriceRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO daily_prices (
            date, open_price, high_price, low_price, close_price,
            volume, change_amount, change_percent, change_origin, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
        ON CONFLICT (date) DO UPDATE SET
            open_price = EXCLUDED.open_price,
            high_price = EXCLUDED.high_price,
            low_price = EXCLUDED.low_price,
            close_price = EXCLUDED.close_price,
            volume = EXCLUDED.volume,
            change_amount = EXCLUDED.change_amount,
            change_percent = EXCLUDED.change_percent,
            change_origin = EXCLUDED.change_origin,
            updated_at = NOW()
        "#,
    )
    .bind(record.date)
    .bind(&record.open_price)
    .bind(&record.high_price)
    .bind(&record.low_price)
    .bind(&record.close_price)
    .bind(record.volume)
    .bind(&record.change_amount)
    .bind(&record.change_percent)
    .bind(record.change_origin.as_str())
    .execute(pool)
    .await
    .map_err(|e| {
        error!("Failed to upsert daily price for {}: {}", record.date, e);
        e
    })?;

    Ok(())
}

/// Inclusive date range, oldest first. Open bounds are unbounded.
pub async fn fetch_range(
    pool: &PgPool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<DailyPriceRow>, sqlx::Error> {
    sqlx::query_as::<_, DailyPriceRow>(
        r#"
        SELECT date, open_price, high_price, low_price, close_price,
               volume, change_amount, change_percent, change_origin, updated_at
        FROM daily_prices
        WHERE ($1::DATE IS NULL OR date >= $1)
          AND ($2::DATE IS NULL OR date <= $2)
        ORDER BY date ASC
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

pub async fn fetch_latest(pool: &PgPool) -> Result<Option<DailyPriceRow>, sqlx::Error> {
    sqlx::query_as::<_, DailyPriceRow>(
        r#"
        SELECT date, open_price, high_price, low_price, close_price,
               volume, change_amount, change_percent, change_origin, updated_at
        FROM daily_prices
        ORDER BY date DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
}
