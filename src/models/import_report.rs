use chrono::NaiveDate;
use serde::Serialize;

use crate::models::RawRow;

/// A row that could not be stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row_index: usize,
    pub row: RawRow,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowIssue {
    /// Change percent could not be derived because the open price is zero.
    DivisionUndefined,
}

/// A row that was stored but carries a data-quality flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFlag {
    pub row_index: usize,
    pub date: NaiveDate,
    pub issue: RowIssue,
}

/// Outcome of one ingestion batch.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported_count: usize,
    pub error_count: usize,
    pub errors: Vec<RowError>,
    pub flagged: Vec<RowFlag>,
}

impl ImportReport {
    pub fn record_imported(&mut self) {
        self.imported_count += 1;
    }

    pub fn record_error(&mut self, row_index: usize, row: RawRow, error: impl ToString) {
        self.error_count += 1;
        self.errors.push(RowError {
            row_index,
            row,
            error: error.to_string(),
        });
    }

    pub fn record_flag(&mut self, row_index: usize, date: NaiveDate, issue: RowIssue) {
        self.flagged.push(RowFlag { row_index, date, issue });
    }
}
