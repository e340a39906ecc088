use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// Inbound shape (produced by the prediction model, not yet trusted)
// ==============================================================================

/// Sentiment triple attached to one timeframe, as received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentInput {
    pub score: Option<f64>,
    pub category: Option<String>,
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// One prediction horizon, as received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeInput {
    pub timeframe: Option<String>,
    pub trend: Option<String>,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub sentiment: Option<SentimentInput>,
}

/// Request body for creating a prediction. Every field is optional on the
/// wire so that missing fields surface as validation errors naming the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInput {
    pub timestamp: Option<String>,
    pub sentiment_score: Option<f64>,
    pub sentiment_label: Option<String>,
    pub price_prediction: Option<String>,
    pub short_term: Option<TimeframeInput>,
    pub long_term: Option<TimeframeInput>,
}

// ==============================================================================
// Validated / stored shape
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeSentiment {
    pub score: f64,
    pub category: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeframe {
    pub timeframe: String, // e.g. "24h", "7d"
    pub trend: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub sentiment: TimeframeSentiment,
}

/// A prediction that passed validation. Only the validator constructs these.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPrediction {
    pub timestamp: DateTime<Utc>,
    pub sentiment_score: f64,
    pub sentiment_label: String,
    pub price_prediction: String,
    pub short_term: Timeframe,
    pub long_term: Timeframe,
}

/// Owning user of a prediction, as resolved by the access gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub user_id: Uuid,
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub owner_handle: String,
    pub timestamp: DateTime<Utc>,
    pub sentiment_score: f64,
    pub sentiment_label: String,
    pub price_prediction: String,
    pub short_term: Timeframe,
    pub long_term: Timeframe,
    pub created_at: DateTime<Utc>,
}

impl Prediction {
    pub fn new(validated: ValidatedPrediction, owner: &Owner) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: owner.user_id,
            owner_handle: owner.handle.clone(),
            timestamp: validated.timestamp,
            sentiment_score: validated.sentiment_score,
            sentiment_label: validated.sentiment_label,
            price_prediction: validated.price_prediction,
            short_term: validated.short_term,
            long_term: validated.long_term,
            created_at: Utc::now(),
        }
    }

    /// Projection used by the public explore listing. OHLC values and
    /// sentiment reasons are not part of it.
    pub fn to_public(&self) -> PublicPrediction {
        PublicPrediction {
            id: self.id,
            owner_handle: self.owner_handle.clone(),
            timestamp: self.timestamp,
            sentiment_label: self.sentiment_label.clone(),
            sentiment_score: self.sentiment_score,
            price_prediction: self.price_prediction.clone(),
            short_term_timeframe: self.short_term.timeframe.clone(),
            short_term_trend: self.short_term.trend.clone(),
            long_term_timeframe: self.long_term.timeframe.clone(),
            long_term_trend: self.long_term.trend.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicPrediction {
    pub id: Uuid,
    pub owner_handle: String,
    pub timestamp: DateTime<Utc>,
    pub sentiment_label: String,
    pub sentiment_score: f64,
    pub price_prediction: String,
    pub short_term_timeframe: String,
    pub short_term_trend: String,
    pub long_term_timeframe: String,
    pub long_term_trend: String,
}
