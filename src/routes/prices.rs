use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::auth::Identity;
use crate::errors::AppError;
use crate::models::{DailyPriceRecord, ImportReport, PriceRangeParams, RawRow};
use crate::services::price_import_service::{self, CsvFileInfo};
use crate::services::price_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_prices))
        .route("/latest", get(get_latest_price))
        .route("/import", post(import_rows))
        .route("/import/csv", post(import_csv_body))
        .route("/import/files", get(list_import_files).post(import_file))
}

#[derive(Debug, Deserialize)]
pub struct ImportRowsRequest {
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFileRequest {
    pub file_name: String,
}

pub async fn get_prices(
    State(state): State<AppState>,
    Query(params): Query<PriceRangeParams>,
) -> Result<Json<Vec<DailyPriceRecord>>, AppError> {
    info!("GET /prices - from {:?} to {:?}", params.from, params.to);
    let prices = price_service::get_history(state.prices.as_ref(), &params).await?;
    Ok(Json(prices))
}

pub async fn get_latest_price(State(state): State<AppState>) -> Result<Json<DailyPriceRecord>, AppError> {
    info!("GET /prices/latest - Getting latest price");
    let price = price_service::get_latest(state.prices.as_ref()).await?;
    Ok(Json(price))
}

/// Import routes are for signed-in callers only.
fn require_importer(identity: &Identity, route: &str) -> Result<(), AppError> {
    let owner = identity.require_owner().map_err(|e| {
        warn!("{} refused for anonymous caller", route);
        e
    })?;
    info!("{} by {}", route, owner.handle);
    Ok(())
}

pub async fn import_rows(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<ImportRowsRequest>, JsonRejection>,
) -> Result<Json<ImportReport>, AppError> {
    require_importer(&identity, "POST /prices/import")?;
    let Json(request) = payload?;
    info!("POST /prices/import - {} rows", request.rows.len());
    let report = price_import_service::ingest_rows(state.prices.as_ref(), request.rows)
        .await
        .map_err(|e| {
            error!("Price import rejected: {}", e);
            e
        })?;
    Ok(Json(report))
}

pub async fn import_csv_body(
    State(state): State<AppState>,
    identity: Identity,
    body: String,
) -> Result<Json<ImportReport>, AppError> {
    require_importer(&identity, "POST /prices/import/csv")?;
    info!("POST /prices/import/csv - {} bytes", body.len());
    let table = price_import_service::read_csv_table(body.as_bytes())
        .map_err(|e| AppError::Import(format!("{:#}", e)))?;
    let report = price_import_service::ingest_table(state.prices.as_ref(), table).await?;
    Ok(Json(report))
}

pub async fn list_import_files(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<CsvFileInfo>>, AppError> {
    require_importer(&identity, "GET /prices/import/files")?;
    info!("GET /prices/import/files - Listing CSV files in {:?}", state.import_data_dir);
    let data_dir = state.import_data_dir.clone();
    let files = tokio::task::spawn_blocking(move || price_import_service::list_csv_files(&data_dir))
        .await
        .map_err(|e| AppError::Import(format!("Listing task failed: {}", e)))?
        .map_err(|e| {
            error!("Failed to list import files: {:#}", e);
            AppError::Import(format!("{:#}", e))
        })?;
    Ok(Json(files))
}

pub async fn import_file(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<ImportFileRequest>, JsonRejection>,
) -> Result<Json<ImportReport>, AppError> {
    require_importer(&identity, "POST /prices/import/files")?;
    let Json(request) = payload?;
    info!("POST /prices/import/files - Importing {}", request.file_name);
    let report = price_import_service::import_csv_file(
        state.prices.as_ref(),
        &state.import_data_dir,
        &request.file_name,
    )
    .await
    .map_err(|e| {
        error!("Failed to import {}: {}", request.file_name, e);
        e
    })?;
    Ok(Json(report))
}
