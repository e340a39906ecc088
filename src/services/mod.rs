pub mod prediction_service;
pub mod prediction_validator;
pub mod price_import_service;
pub mod price_service;
pub mod record_normalizer;
