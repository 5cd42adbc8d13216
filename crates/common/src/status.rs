//! Waybill status and the lifecycle transition graph.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing an unknown status or delivery type name.
#[derive(Debug, Clone, Error)]
#[error("Unknown value: {0}")]
pub struct UnknownVariant(pub String);

/// The status of a waybill in its lifecycle.
///
/// Transitions:
/// ```text
/// Pending ──► Approved ──► InTransit ──► OutForDelivery ──► Delivered
///    │            │            │    └─────────┐│
///    └────────────┴──► Cancelled└────────────►Failed
/// ```
/// `Delivered`, `Cancelled`, and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WaybillStatus {
    /// Created by the sender, awaiting administrator review.
    #[default]
    Pending,

    /// Accepted by an administrator, awaiting driver assignment.
    Approved,

    /// A driver is carrying the parcel.
    InTransit,

    /// The parcel is on the final leg to the receiver.
    OutForDelivery,

    /// Delivery confirmed (terminal).
    Delivered,

    /// Rejected or withdrawn before pickup (terminal).
    Cancelled,

    /// Delivery attempt failed (terminal).
    Failed,
}

impl WaybillStatus {
    /// All statuses, for exhaustive transition-matrix checks.
    pub const ALL: [WaybillStatus; 7] = [
        WaybillStatus::Pending,
        WaybillStatus::Approved,
        WaybillStatus::InTransit,
        WaybillStatus::OutForDelivery,
        WaybillStatus::Delivered,
        WaybillStatus::Cancelled,
        WaybillStatus::Failed,
    ];

    /// Returns true if this status permits a transition to `target`.
    ///
    /// Covers only genuine edges; a repeat of the current status is handled
    /// separately as an audit no-op by the service layer.
    pub fn can_transition_to(&self, target: WaybillStatus) -> bool {
        use WaybillStatus::*;
        matches!(
            (self, target),
            (Pending, Approved)
                | (Pending, Cancelled)
                | (Approved, InTransit)
                | (Approved, Cancelled)
                | (InTransit, OutForDelivery)
                | (InTransit, Delivered)
                | (InTransit, Failed)
                | (OutForDelivery, Delivered)
                | (OutForDelivery, Failed)
        )
    }

    /// Returns true if this is a terminal status (no outgoing transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WaybillStatus::Delivered | WaybillStatus::Cancelled | WaybillStatus::Failed
        )
    }

    /// Returns the wire/display name for the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            WaybillStatus::Pending => "pending",
            WaybillStatus::Approved => "approved",
            WaybillStatus::InTransit => "in-transit",
            WaybillStatus::OutForDelivery => "out-for-delivery",
            WaybillStatus::Delivered => "delivered",
            WaybillStatus::Cancelled => "cancelled",
            WaybillStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for WaybillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WaybillStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WaybillStatus::Pending),
            "approved" => Ok(WaybillStatus::Approved),
            "in-transit" => Ok(WaybillStatus::InTransit),
            "out-for-delivery" => Ok(WaybillStatus::OutForDelivery),
            "delivered" => Ok(WaybillStatus::Delivered),
            "cancelled" => Ok(WaybillStatus::Cancelled),
            "failed" => Ok(WaybillStatus::Failed),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Requested delivery speed for a waybill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryType {
    #[default]
    Standard,
    Express,
    SameDay,
}

impl DeliveryType {
    /// Returns the wire/display name for the delivery type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::Standard => "standard",
            DeliveryType::Express => "express",
            DeliveryType::SameDay => "same-day",
        }
    }
}

impl std::fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(DeliveryType::Standard),
            "express" => Ok(DeliveryType::Express),
            "same-day" => Ok(DeliveryType::SameDay),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED: [(WaybillStatus, WaybillStatus); 9] = [
        (WaybillStatus::Pending, WaybillStatus::Approved),
        (WaybillStatus::Pending, WaybillStatus::Cancelled),
        (WaybillStatus::Approved, WaybillStatus::InTransit),
        (WaybillStatus::Approved, WaybillStatus::Cancelled),
        (WaybillStatus::InTransit, WaybillStatus::OutForDelivery),
        (WaybillStatus::InTransit, WaybillStatus::Delivered),
        (WaybillStatus::InTransit, WaybillStatus::Failed),
        (WaybillStatus::OutForDelivery, WaybillStatus::Delivered),
        (WaybillStatus::OutForDelivery, WaybillStatus::Failed),
    ];

    #[test]
    fn transition_graph_is_exactly_the_allowed_set() {
        for from in WaybillStatus::ALL {
            for to in WaybillStatus::ALL {
                let expected = ALLOWED.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "edge {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_edges() {
        for from in WaybillStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in WaybillStatus::ALL {
                assert!(!from.can_transition_to(to), "edge {from} -> {to}");
            }
        }
    }

    #[test]
    fn terminal_set() {
        assert!(WaybillStatus::Delivered.is_terminal());
        assert!(WaybillStatus::Cancelled.is_terminal());
        assert!(WaybillStatus::Failed.is_terminal());
        assert!(!WaybillStatus::Pending.is_terminal());
        assert!(!WaybillStatus::Approved.is_terminal());
        assert!(!WaybillStatus::InTransit.is_terminal());
        assert!(!WaybillStatus::OutForDelivery.is_terminal());
    }

    #[test]
    fn status_serializes_to_kebab_case() {
        let json = serde_json::to_string(&WaybillStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out-for-delivery\"");
        let back: WaybillStatus = serde_json::from_str("\"in-transit\"").unwrap();
        assert_eq!(back, WaybillStatus::InTransit);
    }

    #[test]
    fn delivery_type_serializes_to_kebab_case() {
        let json = serde_json::to_string(&DeliveryType::SameDay).unwrap();
        assert_eq!(json, "\"same-day\"");
    }

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(WaybillStatus::InTransit.to_string(), "in-transit");
        assert_eq!(DeliveryType::Express.to_string(), "express");
    }

    #[test]
    fn from_str_roundtrips_every_status() {
        for status in WaybillStatus::ALL {
            let parsed: WaybillStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("shipped".parse::<WaybillStatus>().is_err());
    }
}
