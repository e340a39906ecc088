use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::ScoreBounds;
use crate::store::{PredictionStore, PriceStore};

#[derive(Clone)]
pub struct AppState {
    pub prices: Arc<dyn PriceStore>,
    pub predictions: Arc<dyn PredictionStore>,
    pub tokens: Arc<TokenVerifier>,
    pub sentiment_bounds: ScoreBounds,
    pub import_data_dir: PathBuf,
}
