use tracing::error;

use crate::errors::AppError;
use crate::models::{DailyPriceRecord, PriceRangeParams};
use crate::store::PriceStore;

pub async fn get_history(
    store: &dyn PriceStore,
    params: &PriceRangeParams,
) -> Result<Vec<DailyPriceRecord>, AppError> {
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if from > to {
            return Err(AppError::validation("from", "must not be after 'to'"));
        }
    }

    store.fetch_range(params.from, params.to).await.map_err(|e| {
        error!("Failed to fetch price history: {}", e);
        AppError::from(e)
    })
}

pub async fn get_latest(store: &dyn PriceStore) -> Result<DailyPriceRecord, AppError> {
    store
        .fetch_latest()
        .await
        .map_err(|e| {
            error!("Failed to fetch latest price: {}", e);
            AppError::from(e)
        })?
        .ok_or_else(|| AppError::NotFound("No price data imported yet".to_string()))
}
