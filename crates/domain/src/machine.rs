//! The waybill status state machine: edge validation and role authorization.

use chrono::{DateTime, Utc};

use common::WaybillStatus;
use tracking_store::Waybill;

use crate::actor::Actor;
use crate::error::{DomainError, Result};

/// Validates that `actor` may move `waybill` to `target`.
///
/// A repeat of the current status is accepted as an audit no-op; genuine
/// edges must exist in the lifecycle graph. Edge checks run before role
/// checks, so an impossible edge is always `InvalidTransition` regardless of
/// who asks.
pub fn check_transition(waybill: &Waybill, target: WaybillStatus, actor: &Actor) -> Result<()> {
    if target != waybill.status && !waybill.status.can_transition_to(target) {
        return Err(DomainError::InvalidTransition {
            from: waybill.status,
            to: target,
        });
    }

    let permitted = match actor {
        Actor::Admin(_) => true,
        Actor::Sender(_) => false,
        Actor::Driver(id) => match target {
            WaybillStatus::InTransit
            | WaybillStatus::OutForDelivery
            | WaybillStatus::Delivered
            | WaybillStatus::Failed => waybill.driver == Some(*id),
            WaybillStatus::Pending | WaybillStatus::Approved | WaybillStatus::Cancelled => false,
        },
        // Self-confirmation: possession of the tracking code lets the
        // receiver close out an in-transit delivery, nothing else.
        Actor::Receiver(code) => {
            code == &waybill.tracking_code
                && waybill.status == WaybillStatus::InTransit
                && target == WaybillStatus::Delivered
        }
    };

    if !permitted {
        return Err(DomainError::Forbidden {
            waybill_id: waybill.id,
            action: format!("transition to {target}"),
        });
    }

    Ok(())
}

/// Applies a validated transition to the cached waybill row.
///
/// Sets `delivered_at` exactly once, on the first arrival at `Delivered`;
/// later no-op transitions to `Delivered` leave it untouched.
pub fn apply_transition(waybill: &mut Waybill, target: WaybillStatus, at: DateTime<Utc>) {
    waybill.status = target;
    waybill.updated_at = at;
    if target == WaybillStatus::Delivered && waybill.delivered_at.is_none() {
        waybill.delivered_at = Some(at);
    }
}
