//! Leaderboard document schema
//!
//! One document per user holding the cumulative score and the append-only
//! history of solved challenges. The duplicate-solve guard and the score
//! increment both operate on this document atomically, so `total_score` is
//! always the sum of `points` over `solved_challenges`.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;

/// Collection name for leaderboard records
pub const LEADERBOARD_COLLECTION: &str = "leaderboard";

/// Challenge categories offered by the platform.
///
/// Closed set; wire strings match what the frontend sends (several contain
/// spaces). Unknown strings are rejected at the validation boundary and can
/// never reach the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Web,
    #[serde(rename = "OSINT")]
    Osint,
    Steganography,
    Forensics,
    Quiz,
    Password,
    #[serde(rename = "Attack Simulator")]
    AttackSimulator,
    #[serde(rename = "Hack The Hacker")]
    HackTheHacker,
    #[serde(rename = "Cyber Escape Room")]
    CyberEscapeRoom,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Web,
        Category::Osint,
        Category::Steganography,
        Category::Forensics,
        Category::Quiz,
        Category::Password,
        Category::AttackSimulator,
        Category::HackTheHacker,
        Category::CyberEscapeRoom,
    ];

    /// Wire name, identical to the serde rename
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Web => "Web",
            Category::Osint => "OSINT",
            Category::Steganography => "Steganography",
            Category::Forensics => "Forensics",
            Category::Quiz => "Quiz",
            Category::Password => "Password",
            Category::AttackSimulator => "Attack Simulator",
            Category::HackTheHacker => "Hack The Hacker",
            Category::CyberEscapeRoom => "Cyber Escape Room",
        }
    }

    /// Parse a wire name; returns None for anything outside the set
    pub fn parse(s: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Challenge difficulty, which determines the point award.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Advanced,
    ];

    /// Points awarded for a solve at this difficulty.
    ///
    /// Advanced is priced the same as Hard; the product scores them equally.
    pub fn points(&self) -> i64 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 25,
            Difficulty::Hard => 50,
            Difficulty::Advanced => 50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Advanced => "Advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Difficulty> {
        Difficulty::ALL.iter().copied().find(|d| d.as_str() == s)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One credited solve. Immutable once appended; `points` is a snapshot of
/// the award at solve time and is not recomputed if the points table changes.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SolvedChallenge {
    pub challenge_id: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub points: i64,
    pub solved_at: DateTime,
}

impl SolvedChallenge {
    /// Create an entry stamped with the current time
    pub fn new(challenge_id: String, category: Category, difficulty: Difficulty) -> Self {
        Self {
            challenge_id,
            category,
            difficulty,
            points: difficulty.points(),
            solved_at: DateTime::now(),
        }
    }
}

/// Leaderboard document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LeaderboardDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at is the rank tie-break key)
    #[serde(default)]
    pub metadata: Metadata,

    /// User identifier from the auth service; unique, immutable
    pub user_id: String,

    /// Display name, copied at creation time (may drift from the auth
    /// service's current value)
    pub username: String,

    /// Cumulative score; never decremented
    #[serde(default)]
    pub total_score: i64,

    /// Append-only solve history, insertion order = solve order
    #[serde(default)]
    pub solved_challenges: Vec<SolvedChallenge>,

    /// Timestamp of the most recent mutation
    pub last_updated: DateTime,
}

impl LeaderboardDoc {
    /// Create a fresh record with zero score
    pub fn new(user_id: String, username: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            username,
            total_score: 0,
            solved_challenges: Vec::new(),
            last_updated: DateTime::now(),
        }
    }

    /// Whether a `(challenge_id, category)` pair has already been credited
    pub fn has_solved(&self, challenge_id: &str, category: Category) -> bool {
        self.solved_challenges
            .iter()
            .any(|c| c.challenge_id == challenge_id && c.category == category)
    }
}

impl IntoIndexes for LeaderboardDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on user_id (one record per user)
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
            // Compound index for leaderboard reads: score desc, creation asc
            // (ties go to whoever reached the score first)
            (
                doc! { "total_score": -1, "metadata.created_at": 1 },
                Some(
                    IndexOptions::builder()
                        .name("score_rank_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
