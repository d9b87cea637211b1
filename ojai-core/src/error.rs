//! Error types and result types for document and expression building.
//!
//! Every fallible operation in this crate returns [`OjaiResult<T>`]. Errors are raised
//! synchronously at the call that caused them; nothing is retried or deferred.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur while building documents,
/// mutations, conditions and queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OjaiError {
    /// An `_id` was set or derived from an empty string or empty byte sequence.
    #[error("Empty identity: {0}")]
    EmptyIdentity(String),
    /// A field path could not be parsed, or it navigates through a value that is not a container.
    #[error("Malformed field path: {0}")]
    MalformedPath(String),
    /// An increment or decrement was given a magnitude that is not strictly positive.
    #[error("Invalid magnitude: {0}")]
    InvalidMagnitude(String),
    /// A negative offset or limit, or an invalid page number.
    #[error("Invalid range: {0}")]
    InvalidRange(String),
    /// A query was given an empty filtering condition.
    #[error("Empty condition: {0}")]
    EmptyCondition(String),
    /// Logical blocks of a condition are not properly opened and closed.
    #[error("Unbalanced condition: {0}")]
    UnbalancedCondition(String),
    /// A tagged wire value could not be converted to its native type.
    #[error("Type translation error: {0}")]
    TypeTranslation(String),
    /// A value cannot be represented in the value model or on the wire.
    #[error("Unsupported value type: {0}")]
    UnsupportedValueType(String),
    /// A condition or query was used before it was built.
    #[error("Not built: {0}")]
    NotBuilt(String),
    /// A condition was built again after more calls were queued on it.
    #[error("Already built: {0}")]
    AlreadyBuilt(String),
    /// JSON text could not be parsed or produced.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A specialized `Result` type for document and expression building.
pub type OjaiResult<T> = Result<T, OjaiError>;

impl From<SerdeJsonError> for OjaiError {
    fn from(err: SerdeJsonError) -> Self {
        OjaiError::Serialization(err.to_string())
    }
}
