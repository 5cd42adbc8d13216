//! Domain error types.

use thiserror::Error;
use tracking_store::StoreError;

use common::{TrackingCode, WaybillId, WaybillStatus};

/// Errors that can occur during waybill operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The requested status edge does not exist in the lifecycle graph.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: WaybillStatus,
        to: WaybillStatus,
    },

    /// The actor's role does not permit this operation.
    #[error("Actor is not permitted to {action} for waybill {waybill_id}")]
    Forbidden {
        waybill_id: WaybillId,
        action: String,
    },

    /// The waybill id could not be resolved.
    #[error("Waybill not found: {0}")]
    WaybillNotFound(WaybillId),

    /// The tracking code could not be resolved.
    #[error("No waybill for tracking code: {0}")]
    TrackingCodeNotFound(TrackingCode),

    /// The waybill already has a driver and cannot be reassigned.
    #[error("Waybill {0} already has a driver assigned")]
    DriverAlreadyAssigned(WaybillId),

    /// A delivery rating outside the 1-5 range.
    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    /// An error occurred in the tracking store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
