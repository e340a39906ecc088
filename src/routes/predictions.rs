use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::models::{Prediction, PredictionInput, PublicPrediction};
use crate::services::prediction_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_prediction))
        .route("/mine", get(list_my_predictions))
        .route("/explore", get(explore_predictions))
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub prediction: Prediction,
}

#[derive(Debug, Serialize)]
pub struct PredictionListResponse<T> {
    pub success: bool,
    pub predictions: Vec<T>,
}

pub async fn create_prediction(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<PredictionInput>, JsonRejection>,
) -> Result<(StatusCode, Json<PredictionResponse>), AppError> {
    info!("POST /predictions - Creating prediction");
    let Json(input) = payload?;
    let prediction = prediction_service::create_prediction(
        state.predictions.as_ref(),
        &identity,
        &input,
        &state.sentiment_bounds,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(PredictionResponse { success: true, prediction }),
    ))
}

pub async fn list_my_predictions(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<PredictionListResponse<Prediction>>, AppError> {
    info!("GET /predictions/mine - Listing caller's predictions");
    let predictions = prediction_service::list_for_user(state.predictions.as_ref(), &identity).await?;
    Ok(Json(PredictionListResponse { success: true, predictions }))
}

pub async fn explore_predictions(
    State(state): State<AppState>,
) -> Result<Json<PredictionListResponse<PublicPrediction>>, AppError> {
    info!("GET /predictions/explore - Listing all predictions");
    let predictions = prediction_service::list_all(state.predictions.as_ref()).await?;
    Ok(Json(PredictionListResponse { success: true, predictions }))
}
