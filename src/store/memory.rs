use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::{DailyPriceRecord, Prediction, PublicPrediction};
use crate::store::{PredictionStore, PriceStore, StoreError};

/// In-process price store. Each date is a single map entry, so an upsert
/// replaces the whole record atomically.
#[derive(Clone, Default)]
pub struct MemoryPriceStore {
    records: Arc<DashMap<NaiveDate, DailyPriceRecord>>,
    failing_dates: Arc<Mutex<HashSet<NaiveDate>>>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make upserts for `date` fail, to exercise per-row storage errors.
    pub fn fail_on(&self, date: NaiveDate) {
        self.failing_dates.lock().insert(date);
    }

    pub fn get(&self, date: NaiveDate) -> Option<DailyPriceRecord> {
        self.records.get(&date).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn upsert(&self, record: &DailyPriceRecord) -> Result<(), StoreError> {
        if self.failing_dates.lock().contains(&record.date) {
            return Err(StoreError::Unavailable(format!("write rejected for {}", record.date)));
        }
        self.records.insert(record.date, record.clone());
        Ok(())
    }

    async fn fetch_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailyPriceRecord>, StoreError> {
        let mut records: Vec<DailyPriceRecord> = self
            .records
            .iter()
            .filter(|entry| from.map_or(true, |f| *entry.key() >= f))
            .filter(|entry| to.map_or(true, |t| *entry.key() <= t))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    async fn fetch_latest(&self) -> Result<Option<DailyPriceRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .max_by_key(|entry| *entry.key())
            .map(|entry| entry.value().clone()))
    }
}

/// In-process prediction store.
#[derive(Clone, Default)]
pub struct MemoryPredictionStore {
    predictions: Arc<RwLock<Vec<Prediction>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated storage outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.predictions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.read().is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("prediction store offline".to_string()));
        }
        Ok(())
    }

    fn newest_first(mut predictions: Vec<Prediction>) -> Vec<Prediction> {
        predictions.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        predictions
    }
}

#[async_trait]
impl PredictionStore for MemoryPredictionStore {
    async fn insert(&self, prediction: &Prediction) -> Result<Prediction, StoreError> {
        self.check_available()?;
        let mut guard = self.predictions.write();
        if guard.iter().any(|p| p.id == prediction.id) {
            return Err(StoreError::Corrupt(format!("duplicate prediction id {}", prediction.id)));
        }
        guard.push(prediction.clone());
        Ok(prediction.clone())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Prediction>, StoreError> {
        self.check_available()?;
        let owned = self
            .predictions
            .read()
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(owned))
    }

    async fn list_public(&self) -> Result<Vec<PublicPrediction>, StoreError> {
        self.check_available()?;
        let all = self.predictions.read().clone();
        Ok(Self::newest_first(all).iter().map(Prediction::to_public).collect())
    }
}
