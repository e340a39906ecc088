mod price_record;
mod import_report;
pub mod prediction;

pub use price_record::{ChangeOrigin, DailyPriceRecord, PriceRangeParams, RawRow};
pub use import_report::{ImportReport, RowError, RowFlag, RowIssue};
pub use prediction::{
    Owner, Prediction, PredictionInput, PublicPrediction, SentimentInput, Timeframe,
    TimeframeInput, TimeframeSentiment, ValidatedPrediction,
};
