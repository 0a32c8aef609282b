//! Authentication for the ThinkSecure API
//!
//! Verifies the JWT bearer tokens issued by the auth service. Every
//! authenticated route resolves a token to a verified `(id, username)` pair
//! before touching the scoring subsystem.

pub mod jwt;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
