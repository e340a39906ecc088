use chrono::{DateTime, Utc};

use crate::config::ScoreBounds;
use crate::errors::AppError;
use crate::models::{PredictionInput, Timeframe, TimeframeInput, TimeframeSentiment, ValidatedPrediction};

/// Check an inbound prediction and convert it to its validated form.
///
/// Fails fast: the error names the first offending field, checked in this
/// order: timestamp, sentimentScore, sentimentLabel, pricePrediction,
/// shortTerm.*, longTerm.*.
pub fn validate_prediction(input: &PredictionInput, bounds: &ScoreBounds) -> Result<ValidatedPrediction, AppError> {
    let timestamp = parse_timestamp(input.timestamp.as_deref())?;
    let sentiment_score = bounded_score("sentimentScore", input.sentiment_score, bounds)?;
    let sentiment_label = required_text("sentimentLabel", input.sentiment_label.as_deref())?;
    let price_prediction = required_text("pricePrediction", input.price_prediction.as_deref())?;
    let short_term = validate_timeframe("shortTerm", input.short_term.as_ref(), bounds)?;
    let long_term = validate_timeframe("longTerm", input.long_term.as_ref(), bounds)?;

    Ok(ValidatedPrediction {
        timestamp,
        sentiment_score,
        sentiment_label,
        price_prediction,
        short_term,
        long_term,
    })
}

fn parse_timestamp(raw: Option<&str>) -> Result<DateTime<Utc>, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("timestamp", "is required"))?;

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::validation("timestamp", format!("'{}' is not an RFC 3339 instant: {}", raw, e)))
}

fn validate_timeframe(
    prefix: &str,
    input: Option<&TimeframeInput>,
    bounds: &ScoreBounds,
) -> Result<Timeframe, AppError> {
    let tf = input.ok_or_else(|| AppError::validation(prefix, "is required"))?;
    let field = |name: &str| format!("{}.{}", prefix, name);

    let timeframe = required_text(&field("timeframe"), tf.timeframe.as_deref())?;
    let trend = required_text(&field("trend"), tf.trend.as_deref())?;
    let open = finite(&field("open"), tf.open)?;
    let close = finite(&field("close"), tf.close)?;
    let high = finite(&field("high"), tf.high)?;
    let low = finite(&field("low"), tf.low)?;

    let sentiment = tf
        .sentiment
        .as_ref()
        .ok_or_else(|| AppError::validation(field("sentiment"), "is required"))?;
    let sentiment = TimeframeSentiment {
        score: bounded_score(&field("sentiment.score"), sentiment.score, bounds)?,
        category: required_text(&field("sentiment.category"), sentiment.category.as_deref())?,
        reasons: sentiment.reasons.clone(),
    };

    Ok(Timeframe {
        timeframe,
        trend,
        open,
        close,
        high,
        low,
        sentiment,
    })
}

fn finite(field: &str, value: Option<f64>) -> Result<f64, AppError> {
    match value {
        None => Err(AppError::validation(field, "is required")),
        Some(v) if !v.is_finite() => Err(AppError::validation(field, "must be a finite number")),
        Some(v) => Ok(v),
    }
}

fn bounded_score(field: &str, value: Option<f64>, bounds: &ScoreBounds) -> Result<f64, AppError> {
    let v = finite(field, value)?;
    if !bounds.contains(v) {
        return Err(AppError::validation(
            field,
            format!("{} is outside [{}, {}]", v, bounds.min, bounds.max),
        ));
    }
    Ok(v)
}

fn required_text(field: &str, value: Option<&str>) -> Result<String, AppError> {
    match value.map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(AppError::validation(field, "must be a non-empty string")),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::SentimentInput;

    pub(crate) fn timeframe(label: &str) -> TimeframeInput {
        TimeframeInput {
            timeframe: Some(label.to_string()),
            trend: Some("bullish".to_string()),
            open: Some(2350.0),
            close: Some(2372.5),
            high: Some(2380.0),
            low: Some(2341.2),
            sentiment: Some(SentimentInput {
                score: Some(0.42),
                category: Some("positive".to_string()),
                reasons: vec!["Fed dovish tone".to_string()],
            }),
        }
    }

    pub(crate) fn valid_input() -> PredictionInput {
        PredictionInput {
            timestamp: Some("2024-04-10T08:30:00+02:00".to_string()),
            sentiment_score: Some(0.35),
            sentiment_label: Some("Bullish".to_string()),
            price_prediction: Some("Gold likely to test resistance near 2380".to_string()),
            short_term: Some(timeframe("24h")),
            long_term: Some(timeframe("7d")),
        }
    }

    fn field_of(err: AppError) -> String {
        match err {
            AppError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_accepts_complete_prediction() {
        let validated = validate_prediction(&valid_input(), &ScoreBounds::default()).unwrap();
        assert_eq!(validated.timestamp.to_rfc3339(), "2024-04-10T06:30:00+00:00");
        assert_eq!(validated.short_term.timeframe, "24h");
        assert_eq!(validated.long_term.sentiment.reasons.len(), 1);
    }

    #[test]
    fn test_missing_long_term_is_rejected() {
        let mut input = valid_input();
        input.long_term = None;
        let err = validate_prediction(&input, &ScoreBounds::default()).unwrap_err();
        assert_eq!(field_of(err), "longTerm");
    }

    #[test]
    fn test_non_finite_price_names_field() {
        let mut input = valid_input();
        input.short_term.as_mut().unwrap().high = Some(f64::NAN);
        let err = validate_prediction(&input, &ScoreBounds::default()).unwrap_err();
        assert_eq!(field_of(err), "shortTerm.high");

        let mut input = valid_input();
        input.long_term.as_mut().unwrap().low = Some(f64::INFINITY);
        let err = validate_prediction(&input, &ScoreBounds::default()).unwrap_err();
        assert_eq!(field_of(err), "longTerm.low");
    }

    #[test]
    fn test_score_bounds_are_configurable() {
        let mut input = valid_input();
        input.sentiment_score = Some(42.0);
        let err = validate_prediction(&input, &ScoreBounds::default()).unwrap_err();
        assert_eq!(field_of(err), "sentimentScore");

        let wide = ScoreBounds { min: 0.0, max: 100.0 };
        let mut input = valid_input();
        input.sentiment_score = Some(42.0);
        input.short_term.as_mut().unwrap().sentiment.as_mut().unwrap().score = Some(55.0);
        input.long_term.as_mut().unwrap().sentiment.as_mut().unwrap().score = Some(60.0);
        assert!(validate_prediction(&input, &wide).is_ok());
    }

    #[test]
    fn test_bad_timestamp_is_rejected_first() {
        let mut input = valid_input();
        input.timestamp = Some("yesterday".to_string());
        input.sentiment_score = None;
        let err = validate_prediction(&input, &ScoreBounds::default()).unwrap_err();
        assert_eq!(field_of(err), "timestamp");
    }

    #[test]
    fn test_blank_labels_are_rejected() {
        let mut input = valid_input();
        input.short_term.as_mut().unwrap().trend = Some("   ".to_string());
        let err = validate_prediction(&input, &ScoreBounds::default()).unwrap_err();
        assert_eq!(field_of(err), "shortTerm.trend");

        let mut input = valid_input();
        input.long_term.as_mut().unwrap().sentiment = None;
        let err = validate_prediction(&input, &ScoreBounds::default()).unwrap_err();
        assert_eq!(field_of(err), "longTerm.sentiment");
    }
}
