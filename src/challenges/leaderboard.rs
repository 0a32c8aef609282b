//! Leaderboard and progress views
//!
//! Read-time projections over the score ledger. Ranks are never persisted:
//! every read sorts by `(total_score desc, creation time asc)` and numbers
//! the result, so any score change reshuffles everyone on the next read.

use std::collections::BTreeMap;
use std::sync::Arc;

use bson::DateTime;
use chrono::SecondsFormat;
use serde::Serialize;

use crate::challenges::store::LedgerStore;
use crate::db::schemas::{Category, Difficulty, LeaderboardDoc, SolvedChallenge};
use crate::types::Result;

/// Rows returned when no limit is given
pub const DEFAULT_LIMIT: i64 = 100;
/// Hard cap on requested rows; the collection is unbounded
pub const MAX_LIMIT: i64 = 1000;

/// One leaderboard row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    /// 1-based position, recomputed on every read
    pub rank: usize,
    pub username: String,
    pub score: i64,
    pub challenges_solved: usize,
    /// Timestamp of the most recent solve; null for a zero-solve record
    pub last_solved: Option<String>,
}

/// One solve in the recent-activity list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSolve {
    pub challenge_id: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub points: i64,
    pub solved_at: String,
}

/// Count/points pair for one statistics bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatBucket {
    pub count: u32,
    pub points: i64,
}

/// Per-difficulty statistics; all four buckets are always present
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DifficultyStats {
    #[serde(rename = "Easy")]
    pub easy: StatBucket,
    #[serde(rename = "Medium")]
    pub medium: StatBucket,
    #[serde(rename = "Hard")]
    pub hard: StatBucket,
    #[serde(rename = "Advanced")]
    pub advanced: StatBucket,
}

/// A user's progress summary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub username: String,
    pub total_score: i64,
    pub total_challenges_solved: usize,
    pub stats_by_difficulty: DifficultyStats,
    /// Only categories with at least one solve appear
    pub stats_by_category: BTreeMap<String, StatBucket>,
    /// Last 5 solves, most recent first
    pub recent_solves: Vec<RecentSolve>,
}

/// Read-side projections over the ledger store
#[derive(Clone)]
pub struct LeaderboardReader {
    store: Arc<dyn LedgerStore>,
}

impl LeaderboardReader {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// The top `limit` records (default 100, capped), ranked.
    ///
    /// Each call is independent; repeated reads of an unchanged data set
    /// produce identical rankings.
    pub async fn top(&self, limit: Option<i64>) -> Result<Vec<RankedEntry>> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let records = self.store.list_sorted_by_score(limit).await?;
        Ok(assign_ranks(&records))
    }

    /// Progress statistics for one user, creating their record if absent
    pub async fn progress(&self, user_id: &str, username: &str) -> Result<ProgressReport> {
        let record = self.store.create_if_absent(user_id, username).await?;
        Ok(build_progress(&record))
    }
}

/// Number a pre-sorted record list into leaderboard rows
fn assign_ranks(records: &[LeaderboardDoc]) -> Vec<RankedEntry> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| RankedEntry {
            rank: index + 1,
            username: record.username.clone(),
            score: record.total_score,
            challenges_solved: record.solved_challenges.len(),
            last_solved: record
                .solved_challenges
                .last()
                .map(|entry| to_rfc3339(entry.solved_at)),
        })
        .collect()
}

/// Derive the progress summary from one ledger record
fn build_progress(record: &LeaderboardDoc) -> ProgressReport {
    let mut by_difficulty = DifficultyStats::default();
    let mut by_category: BTreeMap<String, StatBucket> = BTreeMap::new();

    for entry in &record.solved_challenges {
        let bucket = match entry.difficulty {
            Difficulty::Easy => &mut by_difficulty.easy,
            Difficulty::Medium => &mut by_difficulty.medium,
            Difficulty::Hard => &mut by_difficulty.hard,
            Difficulty::Advanced => &mut by_difficulty.advanced,
        };
        bucket.count += 1;
        bucket.points += entry.points;

        let category_bucket = by_category.entry(entry.category.to_string()).or_default();
        category_bucket.count += 1;
        category_bucket.points += entry.points;
    }

    let recent_solves = record
        .solved_challenges
        .iter()
        .rev()
        .take(5)
        .map(to_recent_solve)
        .collect();

    ProgressReport {
        username: record.username.clone(),
        total_score: record.total_score,
        total_challenges_solved: record.solved_challenges.len(),
        stats_by_difficulty: by_difficulty,
        stats_by_category: by_category,
        recent_solves,
    }
}

fn to_recent_solve(entry: &SolvedChallenge) -> RecentSolve {
    RecentSolve {
        challenge_id: entry.challenge_id.clone(),
        category: entry.category,
        difficulty: entry.difficulty,
        points: entry.points,
        solved_at: to_rfc3339(entry.solved_at),
    }
}

fn to_rfc3339(timestamp: DateTime) -> String {
    timestamp
        .to_chrono()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenges::testing::MemoryLedgerStore;

    /// A record with explicit score, creation time, and solve history
    fn record(
        user_id: &str,
        username: &str,
        created_at_millis: i64,
        solves: Vec<SolvedChallenge>,
    ) -> LeaderboardDoc {
        let mut record = LeaderboardDoc::new(user_id.to_string(), username.to_string());
        record.metadata.created_at = Some(DateTime::from_millis(created_at_millis));
        record.total_score = solves.iter().map(|s| s.points).sum();
        record.solved_challenges = solves;
        record
    }

    fn solve(challenge_id: &str, category: Category, difficulty: Difficulty) -> SolvedChallenge {
        SolvedChallenge::new(challenge_id.to_string(), category, difficulty)
    }

    fn reader_with(records: Vec<LeaderboardDoc>) -> LeaderboardReader {
        let store = Arc::new(MemoryLedgerStore::new());
        for r in records {
            store.insert_record(r);
        }
        LeaderboardReader::new(store)
    }

    #[tokio::test]
    async fn test_ties_break_by_earlier_creation() {
        // Two users at 60 points; the older record wins the tie
        let reader = reader_with(vec![
            record(
                "u-late",
                "late",
                2_000,
                vec![
                    solve("1", Category::Web, Difficulty::Easy),
                    solve("2", Category::Osint, Difficulty::Advanced),
                ],
            ),
            record(
                "u-early",
                "early",
                1_000,
                vec![
                    solve("1", Category::Quiz, Difficulty::Easy),
                    solve("2", Category::Forensics, Difficulty::Advanced),
                ],
            ),
            record(
                "u-third",
                "third",
                500,
                vec![solve("1", Category::Password, Difficulty::Medium)],
            ),
        ]);

        let board = reader.top(None).await.unwrap();

        assert_eq!(board.len(), 3);
        assert_eq!(board[0].username, "early");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].score, 60);
        assert_eq!(board[1].username, "late");
        assert_eq!(board[1].rank, 2);
        assert_eq!(board[1].score, 60);
        assert_eq!(board[2].username, "third");
        assert_eq!(board[2].rank, 3);
        assert_eq!(board[2].score, 25);
    }

    #[tokio::test]
    async fn test_repeated_reads_are_identical() {
        let reader = reader_with(vec![
            record(
                "u1",
                "alice",
                1_000,
                vec![solve("1", Category::Web, Difficulty::Hard)],
            ),
            record(
                "u2",
                "bob",
                2_000,
                vec![solve("1", Category::Quiz, Difficulty::Hard)],
            ),
        ]);

        let first = reader.top(None).await.unwrap();
        let second = reader.top(None).await.unwrap();

        let names = |board: &[RankedEntry]| {
            board
                .iter()
                .map(|e| (e.rank, e.username.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&first), names(&second));
    }

    #[tokio::test]
    async fn test_limit_is_applied() {
        let records = (0..10i64)
            .map(|i| {
                record(
                    &format!("u{}", i),
                    &format!("user{}", i),
                    1_000 + i,
                    vec![solve("1", Category::Web, Difficulty::Easy)],
                )
            })
            .collect();
        let reader = reader_with(records);

        let board = reader.top(Some(3)).await.unwrap();
        assert_eq!(board.len(), 3);

        // Out-of-range limits are clamped rather than rejected
        let board = reader.top(Some(0)).await.unwrap();
        assert_eq!(board.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_solve_record_has_null_last_solved() {
        let reader = reader_with(vec![record("u1", "alice", 1_000, vec![])]);

        let board = reader.top(None).await.unwrap();
        assert_eq!(board[0].challenges_solved, 0);
        assert_eq!(board[0].last_solved, None);
        assert_eq!(board[0].score, 0);
    }

    #[tokio::test]
    async fn test_progress_groups_by_difficulty_and_category() {
        let reader = reader_with(vec![record(
            "u1",
            "alice",
            1_000,
            vec![
                solve("1", Category::Web, Difficulty::Easy),
                solve("2", Category::Web, Difficulty::Hard),
                solve("3", Category::Osint, Difficulty::Easy),
            ],
        )]);

        let progress = reader.progress("u1", "alice").await.unwrap();

        assert_eq!(progress.username, "alice");
        assert_eq!(progress.total_score, 70);
        assert_eq!(progress.total_challenges_solved, 3);

        assert_eq!(
            progress.stats_by_difficulty.easy,
            StatBucket {
                count: 2,
                points: 20
            }
        );
        assert_eq!(
            progress.stats_by_difficulty.hard,
            StatBucket {
                count: 1,
                points: 50
            }
        );
        // Untouched difficulties report zero rather than disappearing
        assert_eq!(progress.stats_by_difficulty.medium, StatBucket::default());
        assert_eq!(progress.stats_by_difficulty.advanced, StatBucket::default());

        assert_eq!(
            progress.stats_by_category.get("Web"),
            Some(&StatBucket {
                count: 2,
                points: 60
            })
        );
        assert_eq!(
            progress.stats_by_category.get("OSINT"),
            Some(&StatBucket {
                count: 1,
                points: 10
            })
        );
        assert!(!progress.stats_by_category.contains_key("Forensics"));
    }

    #[tokio::test]
    async fn test_recent_solves_newest_first_capped_at_five() {
        let solves = (1..=7)
            .map(|i| solve(&i.to_string(), Category::Quiz, Difficulty::Easy))
            .collect();
        let reader = reader_with(vec![record("u1", "alice", 1_000, solves)]);

        let progress = reader.progress("u1", "alice").await.unwrap();

        let ids: Vec<&str> = progress
            .recent_solves
            .iter()
            .map(|s| s.challenge_id.as_str())
            .collect();
        assert_eq!(ids, vec!["7", "6", "5", "4", "3"]);
    }

    #[tokio::test]
    async fn test_progress_creates_record_for_new_user() {
        let reader = reader_with(vec![]);

        let progress = reader.progress("u-new", "newcomer").await.unwrap();

        assert_eq!(progress.username, "newcomer");
        assert_eq!(progress.total_score, 0);
        assert_eq!(progress.total_challenges_solved, 0);
        assert!(progress.recent_solves.is_empty());
        assert!(progress.stats_by_category.is_empty());
    }
}
