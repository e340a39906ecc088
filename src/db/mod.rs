pub mod prediction_queries;
pub mod price_queries;
