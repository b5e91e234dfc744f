//! Feed error types.
//!
//! Decode failures never leave the router; they are turned into
//! diagnostics there.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing required fields: {0:?}")]
    MissingFields(Vec<&'static str>),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
