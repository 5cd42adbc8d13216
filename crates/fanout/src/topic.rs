use common::WaybillId;
use serde::{Deserialize, Serialize};

use crate::notice::ChangeNotice;

/// Scope of a subscription.
///
/// `Waybills` covers every waybill mutation (dashboards, admin maps);
/// `Waybill(id)` covers a single shipment (the public tracker view).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// All waybill and tracking-event mutations.
    Waybills,

    /// Mutations touching one specific waybill.
    Waybill(WaybillId),
}

impl Topic {
    /// Returns true if a notice falls within this topic's scope.
    pub fn matches(&self, notice: &ChangeNotice) -> bool {
        match self {
            Topic::Waybills => true,
            Topic::Waybill(id) => *id == notice.waybill_id,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Waybills => write!(f, "waybills"),
            Topic::Waybill(id) => write!(f, "waybill:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::ChangeKind;

    #[test]
    fn class_topic_matches_everything() {
        let notice = ChangeNotice::new(ChangeKind::EventAppended, WaybillId::new(), 1);
        assert!(Topic::Waybills.matches(&notice));
    }

    #[test]
    fn waybill_topic_matches_only_its_id() {
        let mine = WaybillId::new();
        let other = WaybillId::new();
        let notice = ChangeNotice::new(ChangeKind::WaybillUpdated, mine, 1);

        assert!(Topic::Waybill(mine).matches(&notice));
        assert!(!Topic::Waybill(other).matches(&notice));
    }

    #[test]
    fn display_names() {
        let id = WaybillId::new();
        assert_eq!(Topic::Waybills.to_string(), "waybills");
        assert_eq!(Topic::Waybill(id).to_string(), format!("waybill:{id}"));
    }
}
