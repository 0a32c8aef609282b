//! Database schemas
//!
//! Defines the MongoDB document structures for the score ledger.

mod leaderboard;
mod metadata;

pub use leaderboard::{
    Category, Difficulty, LeaderboardDoc, SolvedChallenge, LEADERBOARD_COLLECTION,
};
pub use metadata::Metadata;
