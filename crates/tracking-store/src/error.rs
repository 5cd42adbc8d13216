use thiserror::Error;

use common::{TrackingCode, WaybillId};

/// Errors that can occur when interacting with the tracking store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The tracking code is already in use by another waybill.
    #[error("Tracking code already in use: {0}")]
    DuplicateTrackingCode(TrackingCode),

    /// The waybill was not found in the store.
    #[error("Waybill not found: {0}")]
    WaybillNotFound(WaybillId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for tracking store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
