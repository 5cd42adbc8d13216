use thiserror::Error;

use common::{WaybillId, WaybillStatus};
use domain::DomainError;

/// Why one waybill in an assignment batch could not be assigned.
#[derive(Debug, Error)]
pub enum AssignmentError {
    /// The waybill id could not be resolved.
    #[error("Waybill not found: {0}")]
    NotFound(WaybillId),

    /// Another admin already claimed this waybill for a driver.
    #[error("Waybill {0} already has a driver assigned")]
    AlreadyAssigned(WaybillId),

    /// The waybill is past the point where a route can be assigned.
    #[error("Waybill {0} is not assignable from status {1}")]
    NotAssignable(WaybillId, WaybillStatus),

    /// Any other domain failure (authorization, storage).
    #[error("Assignment failed: {0}")]
    Domain(#[from] DomainError),
}
