//! Snapshot validation errors.

use thiserror::Error;

/// Errors raised while structuring raw DLMM snapshots into typed entities.
///
/// A missing required field is always a construction-time failure naming the
/// field; values are never silently defaulted (the one documented exception,
/// `feeOwner`, is handled in [`crate::position::PositionData::from_raw`]).
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A field the downstream computation requires was absent.
    #[error("missing required field `{0}` in snapshot")]
    MissingField(&'static str),
    /// A field was present but could not be interpreted.
    #[error("invalid value for field `{field}`: {reason}")]
    InvalidField {
        /// Snapshot field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// A fee/reward counter was not valid base-16.
    #[error("invalid hex counter `{0}`")]
    InvalidCounter(String),
}
