//! Shared types for the ThinkSecure API

mod error;

pub use error::{ApiError, Result};
