use common::WaybillId;
use serde::{Deserialize, Serialize};

/// What kind of mutation was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A new waybill row was inserted.
    WaybillCreated,

    /// Cached waybill fields changed (status, driver, proof url).
    WaybillUpdated,

    /// A tracking event was appended to the waybill's history.
    EventAppended,
}

/// Invalidation signal published once per committed store mutation.
///
/// Carries no payload; `seq` is the store's commit sequence, so a consumer
/// can detect reordering within one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub kind: ChangeKind,
    pub waybill_id: WaybillId,
    pub seq: u64,
}

impl ChangeNotice {
    /// Creates a new notice.
    pub fn new(kind: ChangeKind, waybill_id: WaybillId, seq: u64) -> Self {
        Self {
            kind,
            waybill_id,
            seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_serialization_roundtrip() {
        let notice = ChangeNotice::new(ChangeKind::WaybillCreated, WaybillId::new(), 7);
        let json = serde_json::to_string(&notice).unwrap();
        let back: ChangeNotice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, notice);
    }

    #[test]
    fn kind_uses_snake_case() {
        let json = serde_json::to_string(&ChangeKind::EventAppended).unwrap();
        assert_eq!(json, "\"event_appended\"");
    }
}
