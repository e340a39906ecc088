use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{ChangeOrigin, ImportReport, RawRow, RowIssue};
use crate::services::record_normalizer::{normalize_row, resolve_columns};
use crate::store::PriceStore;

/// Parsed CSV input: headers in source order plus the rows keyed by them.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Ingest a batch of raw rows into the price store.
///
/// Headers are taken from the first row's keys, which a `RawRow` keeps in
/// name order. Use [`ingest_table`] when the source column order is known.
pub async fn ingest_rows(store: &dyn PriceStore, rows: Vec<RawRow>) -> Result<ImportReport, AppError> {
    let headers: Vec<String> = rows
        .first()
        .map(|first| first.keys().cloned().collect())
        .unwrap_or_default();
    ingest_table(store, CsvTable { headers, rows }).await
}

/// Ingest a batch with explicit headers.
///
/// The column mapping is resolved once from the headers; failure to resolve
/// the date or close column rejects the whole batch. After that each row
/// stands alone: a row that fails to normalize or to store is recorded in the
/// report and the batch carries on. Rows are upserted by date, so
/// re-importing the same data is idempotent and later rows win.
pub async fn ingest_table(store: &dyn PriceStore, table: CsvTable) -> Result<ImportReport, AppError> {
    let mut report = ImportReport::default();
    let CsvTable { headers, rows } = table;

    if rows.is_empty() {
        info!("Empty price batch, nothing to import");
        return Ok(report);
    }

    let mapping = resolve_columns(headers.iter())?;
    info!("Importing {} price rows with column mapping {:?}", rows.len(), mapping);

    for (row_index, row) in rows.into_iter().enumerate() {
        let record = match normalize_row(&row, &mapping) {
            Ok(record) => record,
            Err(e) => {
                warn!("Row {} rejected: {}", row_index, e);
                report.record_error(row_index, row, AppError::from(e));
                continue;
            }
        };

        if let Err(e) = store.upsert(&record).await {
            warn!("Row {} ({}) could not be stored: {}", row_index, record.date, e);
            report.record_error(row_index, row, AppError::from(e));
            continue;
        }

        if record.change_origin == ChangeOrigin::Undefined {
            warn!("Row {} ({}) has zero open price, change percent undefined", row_index, record.date);
            report.record_flag(row_index, record.date, RowIssue::DivisionUndefined);
        }
        report.record_imported();
    }

    info!(
        "Price import finished: {} imported, {} errors, {} flagged",
        report.imported_count,
        report.error_count,
        report.flagged.len()
    );
    Ok(report)
}

/// Read CSV text into raw rows keyed by header.
pub fn read_csv_table<R: Read>(reader: R) -> Result<CsvTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (line_num, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to parse CSV line {}", line_num + 2))?;
        let row: RawRow = headers
            .iter()
            .cloned()
            .zip(record.iter().map(|v| v.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(CsvTable { headers, rows })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvFileInfo {
    pub name: String,
    pub size_bytes: u64,
}

/// Importable CSV files in the data directory, sorted by name.
pub fn list_csv_files(data_dir: &Path) -> Result<Vec<CsvFileInfo>> {
    if !data_dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(data_dir)
        .with_context(|| format!("Failed to read data directory {:?}", data_dir))?
    {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.to_lowercase().ends_with(".csv") {
                files.push(CsvFileInfo {
                    name: name.to_string(),
                    size_bytes: entry.metadata().map(|m| m.len()).unwrap_or(0),
                });
            }
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Resolve a plain `*.csv` file name inside `data_dir`. Anything with a path
/// component is refused.
pub fn resolve_data_file(data_dir: &Path, file_name: &str) -> Result<PathBuf, AppError> {
    let candidate = Path::new(file_name);
    let is_plain_name = candidate.components().count() == 1
        && candidate.file_name().map(|n| n == candidate.as_os_str()).unwrap_or(false);

    if !is_plain_name || !file_name.to_lowercase().ends_with(".csv") {
        return Err(AppError::Import(format!("Invalid import file name: {}", file_name)));
    }
    Ok(data_dir.join(candidate))
}

/// Import one CSV file from the data directory.
pub async fn import_csv_file(
    store: &dyn PriceStore,
    data_dir: &Path,
    file_name: &str,
) -> Result<ImportReport, AppError> {
    let path = resolve_data_file(data_dir, file_name)?;
    let table = read_csv_file(path.clone()).await?;

    info!("Read {} rows from {:?}", table.rows.len(), path);
    ingest_table(store, table).await
}

/// Open and parse a CSV file on the blocking pool.
async fn read_csv_file(path: PathBuf) -> Result<CsvTable, AppError> {
    tokio::task::spawn_blocking(move || -> Result<CsvTable> {
        let file = std::fs::File::open(&path).with_context(|| format!("Failed to open {:?}", path))?;
        read_csv_table(file).with_context(|| format!("Failed to read {:?}", path))
    })
    .await
    .map_err(|e| AppError::Import(format!("CSV reader task failed: {}", e)))?
    .map_err(|e| AppError::Import(format!("{:#}", e)))
}
