use tracing::{error, info, warn};

use crate::auth::Identity;
use crate::config::ScoreBounds;
use crate::errors::AppError;
use crate::models::{Prediction, PredictionInput, PublicPrediction};
use crate::services::prediction_validator::validate_prediction;
use crate::store::PredictionStore;

/// Validate and persist a prediction owned by the caller.
///
/// Nothing is written unless the caller is authenticated and the whole input
/// validates.
pub async fn create_prediction(
    store: &dyn PredictionStore,
    identity: &Identity,
    input: &PredictionInput,
    bounds: &ScoreBounds,
) -> Result<Prediction, AppError> {
    let owner = identity.require_owner().map_err(|e| {
        warn!("Prediction create refused: caller is not authenticated");
        e
    })?;

    let validated = validate_prediction(input, bounds).map_err(|e| {
        warn!("Prediction from {} failed validation: {}", owner.user_id, e);
        e
    })?;

    let prediction = Prediction::new(validated, owner);
    let stored = store.insert(&prediction).await.map_err(|e| {
        error!("Failed to store prediction for {}: {}", owner.user_id, e);
        AppError::from(e)
    })?;

    info!("Stored prediction {} for {}", stored.id, owner.user_id);
    Ok(stored)
}

/// The caller's own predictions, newest first.
pub async fn list_for_user(store: &dyn PredictionStore, identity: &Identity) -> Result<Vec<Prediction>, AppError> {
    let owner = identity.require_owner()?;

    let predictions = store.list_for_user(owner.user_id).await.map_err(|e| {
        error!("Failed to list predictions for {}: {}", owner.user_id, e);
        AppError::from(e)
    })?;

    // Ownership is enforced by the store query; never let a foreign row through
    if let Some(foreign) = predictions.iter().find(|p| p.user_id != owner.user_id) {
        error!("Store returned prediction {} owned by another user", foreign.id);
        return Err(AppError::Persistence("ownership filter violated".to_string()));
    }

    Ok(predictions)
}

/// Public explore listing, newest first.
pub async fn list_all(store: &dyn PredictionStore) -> Result<Vec<PublicPrediction>, AppError> {
    store.list_public().await.map_err(|e| {
        error!("Failed to list public predictions: {}", e);
        AppError::from(e)
    })
}
