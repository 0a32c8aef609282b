//! Scoring engine
//!
//! Decides whether a validated submission earns credit and applies the
//! award through the ledger store's atomic operations. The duplicate-solve
//! guard lives in the store's conditional update, so concurrent submissions
//! of the same challenge resolve to exactly one award no matter how many
//! server instances are running.

use std::sync::Arc;

use tracing::info;

use crate::challenges::store::LedgerStore;
use crate::challenges::submission::NormalizedSubmission;
use crate::db::schemas::SolvedChallenge;
use crate::types::{ApiError, Result};

/// Result of processing a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The answer was wrong; nothing was written
    Rejected,
    /// This `(challenge, category)` pair was already credited for this user
    AlreadySolved { total_score: i64 },
    /// Points were awarded and the ledger updated
    Awarded { points_earned: i64, total_score: i64 },
}

/// The core state-transition logic for challenge credit
#[derive(Clone)]
pub struct ScoringEngine {
    store: Arc<dyn LedgerStore>,
}

impl ScoringEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Process a validated submission for an authenticated user.
    ///
    /// Incorrect answers return `Rejected` without touching the store.
    /// Correct answers get-or-create the user's ledger record, then attempt
    /// the atomic append-and-increment; if the duplicate guard fires the
    /// outcome is `AlreadySolved` with zero credit.
    pub async fn submit(
        &self,
        user_id: &str,
        username: &str,
        submission: &NormalizedSubmission,
    ) -> Result<SubmissionOutcome> {
        if !submission.is_correct {
            return Ok(SubmissionOutcome::Rejected);
        }

        self.store.create_if_absent(user_id, username).await?;

        let entry = SolvedChallenge::new(
            submission.challenge_id.clone(),
            submission.category,
            submission.difficulty,
        );
        let points = entry.points;

        match self
            .store
            .append_solve_and_increment(user_id, entry)
            .await?
        {
            Some(record) => {
                info!(
                    "{} earned {} points for {} ({}) challenge #{} - total: {}",
                    username,
                    points,
                    submission.category,
                    submission.difficulty,
                    submission.challenge_id,
                    record.total_score
                );

                Ok(SubmissionOutcome::Awarded {
                    points_earned: points,
                    total_score: record.total_score,
                })
            }
            None => {
                // Guard fired: fetch the unchanged record for the current score
                let record = self.store.get(user_id).await?.ok_or_else(|| {
                    ApiError::Internal("Ledger record missing after upsert".to_string())
                })?;

                info!(
                    "{} already solved {} challenge #{}",
                    username, submission.category, submission.challenge_id
                );

                Ok(SubmissionOutcome::AlreadySolved {
                    total_score: record.total_score,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenges::submission::{validate, SubmitRequest};
    use crate::challenges::testing::MemoryLedgerStore;
    use crate::db::schemas::{Category, Difficulty};

    fn submission(
        challenge_id: &str,
        category: Category,
        difficulty: Difficulty,
        is_correct: bool,
    ) -> NormalizedSubmission {
        NormalizedSubmission {
            challenge_id: challenge_id.to_string(),
            category,
            difficulty,
            is_correct,
        }
    }

    fn engine() -> (ScoringEngine, Arc<MemoryLedgerStore>) {
        let store = Arc::new(MemoryLedgerStore::new());
        (ScoringEngine::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_first_correct_solve_awards_points() {
        let (engine, store) = engine();

        let outcome = engine
            .submit(
                "u1",
                "alice",
                &submission("1", Category::Web, Difficulty::Easy, true),
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SubmissionOutcome::Awarded {
                points_earned: 10,
                total_score: 10,
            }
        );

        let record = store.get("u1").await.unwrap().unwrap();
        assert_eq!(record.total_score, 10);
        assert_eq!(record.solved_challenges.len(), 1);
        assert_eq!(record.username, "alice");
    }

    #[tokio::test]
    async fn test_resubmission_is_idempotent() {
        let (engine, store) = engine();
        let sub = submission("1", Category::Web, Difficulty::Easy, true);

        engine.submit("u1", "alice", &sub).await.unwrap();
        let outcome = engine.submit("u1", "alice", &sub).await.unwrap();

        assert_eq!(outcome, SubmissionOutcome::AlreadySolved { total_score: 10 });

        // Score and history unchanged
        let record = store.get("u1").await.unwrap().unwrap();
        assert_eq!(record.total_score, 10);
        assert_eq!(record.solved_challenges.len(), 1);
    }

    #[tokio::test]
    async fn test_same_id_in_other_category_is_a_new_challenge() {
        let (engine, _store) = engine();

        engine
            .submit(
                "u1",
                "alice",
                &submission("1", Category::Web, Difficulty::Easy, true),
            )
            .await
            .unwrap();

        let outcome = engine
            .submit(
                "u1",
                "alice",
                &submission("1", Category::Osint, Difficulty::Advanced, true),
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SubmissionOutcome::Awarded {
                points_earned: 50,
                total_score: 60,
            }
        );
    }

    #[tokio::test]
    async fn test_incorrect_answer_leaves_no_trace() {
        let (engine, store) = engine();

        let outcome = engine
            .submit(
                "u1",
                "alice",
                &submission("1", Category::Web, Difficulty::Easy, false),
            )
            .await
            .unwrap();

        assert_eq!(outcome, SubmissionOutcome::Rejected);
        // No record was created at all
        assert!(store.get("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scores_accumulate_across_challenges() {
        let (engine, _store) = engine();

        // Scenario from the product flow: Easy then Advanced
        let first = engine
            .submit(
                "u1",
                "alice",
                &submission("1", Category::Web, Difficulty::Easy, true),
            )
            .await
            .unwrap();
        assert_eq!(
            first,
            SubmissionOutcome::Awarded {
                points_earned: 10,
                total_score: 10,
            }
        );

        let second = engine
            .submit(
                "u1",
                "alice",
                &submission("2", Category::Osint, Difficulty::Advanced, true),
            )
            .await
            .unwrap();
        assert_eq!(
            second,
            SubmissionOutcome::Awarded {
                points_earned: 50,
                total_score: 60,
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_submissions_award_once() {
        let (engine, store) = engine();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .submit(
                        "u1",
                        "alice",
                        &submission("1", Category::Forensics, Difficulty::Hard, true),
                    )
                    .await
                    .unwrap()
            }));
        }

        let mut awarded = 0;
        let mut already_solved = 0;
        for handle in handles {
            match handle.await.unwrap() {
                SubmissionOutcome::Awarded { .. } => awarded += 1,
                SubmissionOutcome::AlreadySolved { .. } => already_solved += 1,
                SubmissionOutcome::Rejected => panic!("correct submission rejected"),
            }
        }

        assert_eq!(awarded, 1);
        assert_eq!(already_solved, 7);

        let record = store.get("u1").await.unwrap().unwrap();
        assert_eq!(record.total_score, 50);
        assert_eq!(record.solved_challenges.len(), 1);
    }

    #[tokio::test]
    async fn test_total_score_matches_entry_sum() {
        let (engine, store) = engine();

        let submissions = [
            submission("1", Category::Web, Difficulty::Easy, true),
            submission("2", Category::Quiz, Difficulty::Medium, true),
            submission("3", Category::Password, Difficulty::Hard, true),
            submission("1", Category::Web, Difficulty::Easy, true), // duplicate
            submission("4", Category::Steganography, Difficulty::Advanced, false),
        ];

        for sub in &submissions {
            engine.submit("u1", "alice", sub).await.unwrap();
        }

        let record = store.get("u1").await.unwrap().unwrap();
        let entry_sum: i64 = record.solved_challenges.iter().map(|c| c.points).sum();
        assert_eq!(record.total_score, entry_sum);
        assert_eq!(record.total_score, 85);
    }

    #[tokio::test]
    async fn test_validated_request_flows_through() {
        let (engine, _store) = engine();

        // End to end through the validator with the original wire strings
        let request = SubmitRequest {
            challenge_id: "3".to_string(),
            category: "Hack The Hacker".to_string(),
            difficulty: "Medium".to_string(),
            is_correct: true,
        };
        let normalized = validate(&request).unwrap();

        let outcome = engine.submit("u1", "alice", &normalized).await.unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Awarded {
                points_earned: 25,
                total_score: 25,
            }
        );
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let (engine, store) = engine();
        store.fail_next_ops();

        let result = engine
            .submit(
                "u1",
                "alice",
                &submission("1", Category::Web, Difficulty::Easy, true),
            )
            .await;

        assert!(matches!(result, Err(ApiError::Database(_))));
        // No partial state once the store recovers
        store.recover();
        assert!(store.get("u1").await.unwrap().is_none());
    }
}
