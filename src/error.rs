//! Error types for the collaborator seams.
//!
//! Only the [`crate::backends`] traits surface these. Everything above that
//! seam is fail-soft: aggregation collapses errors to zero values, and the
//! facade never hands an error to its caller (see the crate docs).

use thiserror::Error;

/// Failures reported by a [`crate::backends::HealthStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The device has no health store capability at all.
    #[error("health store unavailable on this device")]
    Unavailable,

    /// The authorization request itself failed (distinct from the user
    /// denying individual permissions, which the store does not reveal).
    #[error("authorization request failed: {0}")]
    Authorization(String),

    /// A query could not be executed or returned malformed data.
    #[error("store query failed: {0}")]
    Query(String),

    /// A sample write was rejected.
    #[error("sample write failed: {0}")]
    Write(String),
}

/// Failures reported by a [`crate::backends::MotionSensor`] implementation.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The device has no motion co-processor.
    #[error("motion sensor unavailable on this device")]
    Unavailable,

    /// The sensor query failed.
    #[error("sensor query failed: {0}")]
    Query(String),
}
