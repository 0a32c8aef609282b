//! In-memory `LedgerStore` used by the scoring and leaderboard tests.
//!
//! Mirrors the MongoDB store's atomicity by holding the map lock across each
//! whole operation, so the engine's concurrency properties can be exercised
//! without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bson::DateTime;

use crate::challenges::store::LedgerStore;
use crate::db::schemas::{LeaderboardDoc, SolvedChallenge};
use crate::types::{ApiError, Result};

pub(crate) struct MemoryLedgerStore {
    records: Mutex<HashMap<String, LeaderboardDoc>>,
    failing: AtomicBool,
}

impl MemoryLedgerStore {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail with a Database error
    pub(crate) fn fail_next_ops(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub(crate) fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    /// Seed a record directly, bypassing the scoring flow (for leaderboard
    /// fixtures that need controlled creation times)
    pub(crate) fn insert_record(&self, record: LeaderboardDoc) {
        self.records
            .lock()
            .unwrap()
            .insert(record.user_id.clone(), record);
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::Database("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get(&self, user_id: &str) -> Result<Option<LeaderboardDoc>> {
        self.check_available()?;
        Ok(self.records.lock().unwrap().get(user_id).cloned())
    }

    async fn create_if_absent(&self, user_id: &str, username: &str) -> Result<LeaderboardDoc> {
        self.check_available()?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(user_id.to_string())
            .or_insert_with(|| LeaderboardDoc::new(user_id.to_string(), username.to_string()));
        Ok(record.clone())
    }

    async fn append_solve_and_increment(
        &self,
        user_id: &str,
        entry: SolvedChallenge,
    ) -> Result<Option<LeaderboardDoc>> {
        self.check_available()?;
        let mut records = self.records.lock().unwrap();

        let record = match records.get_mut(user_id) {
            Some(record) => record,
            None => return Ok(None),
        };

        if record.has_solved(&entry.challenge_id, entry.category) {
            return Ok(None);
        }

        record.total_score += entry.points;
        record.solved_challenges.push(entry);
        record.last_updated = DateTime::now();
        record.metadata.updated_at = Some(record.last_updated);

        Ok(Some(record.clone()))
    }

    async fn list_sorted_by_score(&self, limit: i64) -> Result<Vec<LeaderboardDoc>> {
        self.check_available()?;
        let records = self.records.lock().unwrap();

        let mut sorted: Vec<LeaderboardDoc> = records.values().cloned().collect();
        sorted.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then(a.metadata.created_at.cmp(&b.metadata.created_at))
        });
        sorted.truncate(limit.max(0) as usize);

        Ok(sorted)
    }
}
