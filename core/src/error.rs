//! Errors for the synchronous core.

use thiserror::Error;

/// Error decoding a stored tag override.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The record is not a JSON object.
    #[error("override record is not an object")]
    NotAnObject,
    /// The packed flag string is missing or not a string.
    #[error("override record has no flag string")]
    MissingFlags,
    /// The length field is missing.
    #[error("override record has no length")]
    MissingLength,
    /// The length field could not be read as a non-negative integer.
    #[error("invalid length: {0}")]
    InvalidLength(String),
}
