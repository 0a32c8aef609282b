//! Score ledger persistence
//!
//! The `LedgerStore` trait is the seam between the scoring logic and
//! MongoDB. Correctness under concurrent submissions comes entirely from the
//! store's single-document atomic operations; there is no application-level
//! locking, so the service can run horizontally scaled.

use async_trait::async_trait;
use bson::{doc, DateTime};
use futures_util::StreamExt;
use mongodb::options::{FindOptions, ReturnDocument};
use tracing::warn;

use crate::db::schemas::{LeaderboardDoc, SolvedChallenge, LEADERBOARD_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{ApiError, Result};

/// Persistence operations for leaderboard records.
///
/// `append_solve_and_increment` is the atomic compound operation at the heart
/// of the subsystem: the duplicate check, the history append, and the score
/// increment must happen as one unit relative to other writers for the same
/// user.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fetch a user's record, if one exists
    async fn get(&self, user_id: &str) -> Result<Option<LeaderboardDoc>>;

    /// Get the user's record, creating a zero-score one if absent.
    ///
    /// Must be an atomic upsert: two concurrent first-time submissions for
    /// the same user yield exactly one record.
    async fn create_if_absent(&self, user_id: &str, username: &str) -> Result<LeaderboardDoc>;

    /// Append a solve and increment the score, unless an entry with the same
    /// `(challenge_id, category)` already exists.
    ///
    /// Returns the updated record on success, or `None` when the duplicate
    /// guard rejected the append. The caller must have ensured the record
    /// exists.
    async fn append_solve_and_increment(
        &self,
        user_id: &str,
        entry: SolvedChallenge,
    ) -> Result<Option<LeaderboardDoc>>;

    /// Records sorted by `(total_score desc, creation time asc)`, at most
    /// `limit` of them
    async fn list_sorted_by_score(&self, limit: i64) -> Result<Vec<LeaderboardDoc>>;
}

/// MongoDB-backed ledger store
pub struct MongoLedgerStore {
    collection: MongoCollection<LeaderboardDoc>,
}

impl MongoLedgerStore {
    /// Open the leaderboard collection (applies its indexes)
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let collection = mongo
            .collection::<LeaderboardDoc>(LEADERBOARD_COLLECTION)
            .await?;

        Ok(Self { collection })
    }
}

#[async_trait]
impl LedgerStore for MongoLedgerStore {
    async fn get(&self, user_id: &str) -> Result<Option<LeaderboardDoc>> {
        self.collection.find_one(doc! { "user_id": user_id }).await
    }

    async fn create_if_absent(&self, user_id: &str, username: &str) -> Result<LeaderboardDoc> {
        let now = DateTime::now();

        // Single atomic upsert: $setOnInsert leaves an existing record
        // untouched, so concurrent first-time submissions cannot create
        // duplicate records (the unique user_id index backs this up).
        let update = doc! {
            "$setOnInsert": {
                "user_id": user_id,
                "username": username,
                "total_score": 0_i64,
                "solved_challenges": [],
                "last_updated": now,
                "metadata": { "created_at": now, "updated_at": now },
            }
        };

        self.collection
            .inner()
            .find_one_and_update(doc! { "user_id": user_id }, update)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| ApiError::Database(format!("Upsert failed: {}", e)))?
            .ok_or_else(|| {
                ApiError::Database("Upsert returned no document".to_string())
            })
    }

    async fn append_solve_and_increment(
        &self,
        user_id: &str,
        entry: SolvedChallenge,
    ) -> Result<Option<LeaderboardDoc>> {
        let now = DateTime::now();

        let entry_bson = bson::to_bson(&entry)
            .map_err(|e| ApiError::Internal(format!("Failed to encode solve entry: {}", e)))?;

        // The filter only matches when no entry with this
        // (challenge_id, category) pair exists yet, so the duplicate check
        // and the append+increment are one server-side atomic operation.
        // Two concurrent submissions of the same challenge cannot both match.
        let filter = doc! {
            "user_id": user_id,
            "solved_challenges": {
                "$not": {
                    "$elemMatch": {
                        "challenge_id": &entry.challenge_id,
                        "category": entry.category.as_str(),
                    }
                }
            },
        };

        let update = doc! {
            "$push": { "solved_challenges": entry_bson },
            "$inc": { "total_score": entry.points },
            "$set": { "last_updated": now, "metadata.updated_at": now },
        };

        self.collection
            .inner()
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| ApiError::Database(format!("Score update failed: {}", e)))
    }

    async fn list_sorted_by_score(&self, limit: i64) -> Result<Vec<LeaderboardDoc>> {
        let options = FindOptions::builder()
            .sort(doc! { "total_score": -1, "metadata.created_at": 1 })
            .limit(limit)
            .build();

        let mut cursor = self
            .collection
            .inner()
            .find(doc! {})
            .with_options(options)
            .await
            .map_err(|e| ApiError::Database(format!("Leaderboard query failed: {}", e)))?;

        let mut records = Vec::new();
        while let Some(result) = cursor.next().await {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Error reading leaderboard record: {}", e);
                    return Err(ApiError::Database(format!(
                        "Leaderboard read failed: {}",
                        e
                    )));
                }
            }
        }

        Ok(records)
    }
}
