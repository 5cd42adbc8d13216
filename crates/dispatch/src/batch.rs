use common::{UserId, WaybillId};

use crate::error::AssignmentError;

/// A transient request to hand a set of waybills to one driver.
///
/// Exists only for the duration of the assignment call; never persisted.
#[derive(Debug, Clone)]
pub struct AssignmentBatch {
    driver: UserId,
    waybill_ids: Vec<WaybillId>,
}

impl AssignmentBatch {
    /// Creates a batch. Returns None for an empty waybill set.
    pub fn new(driver: UserId, waybill_ids: Vec<WaybillId>) -> Option<Self> {
        if waybill_ids.is_empty() {
            return None;
        }
        Some(Self {
            driver,
            waybill_ids,
        })
    }

    /// The driver receiving the route.
    pub fn driver(&self) -> UserId {
        self.driver
    }

    /// The waybills to assign, in request order.
    pub fn waybill_ids(&self) -> &[WaybillId] {
        &self.waybill_ids
    }

    /// Number of waybills in the batch.
    pub fn len(&self) -> usize {
        self.waybill_ids.len()
    }

    /// Always false; empty batches cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.waybill_ids.is_empty()
    }
}

/// Outcome for one waybill in a batch.
#[derive(Debug)]
pub struct AssignmentOutcome {
    pub waybill_id: WaybillId,
    pub result: Result<(), AssignmentError>,
}

/// Per-item results of a batch assignment.
///
/// The batch is not transactional: successes stand even when other items
/// fail, so callers retry only the failed subset.
#[derive(Debug, Default)]
pub struct AssignmentResult {
    pub outcomes: Vec<AssignmentOutcome>,
}

impl AssignmentResult {
    /// Ids that were assigned successfully.
    pub fn succeeded(&self) -> Vec<WaybillId> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.waybill_id)
            .collect()
    }

    /// Ids that failed, with their reasons.
    pub fn failed(&self) -> Vec<(WaybillId, &AssignmentError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.waybill_id, e)))
            .collect()
    }

    /// True when every item in the batch was assigned.
    pub fn is_complete_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batches_cannot_be_built() {
        assert!(AssignmentBatch::new(UserId::new(), vec![]).is_none());
    }

    #[test]
    fn batch_preserves_request_order() {
        let ids = vec![WaybillId::new(), WaybillId::new(), WaybillId::new()];
        let batch = AssignmentBatch::new(UserId::new(), ids.clone()).unwrap();
        assert_eq!(batch.waybill_ids(), ids.as_slice());
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn result_partitions_outcomes() {
        let ok_id = WaybillId::new();
        let bad_id = WaybillId::new();
        let result = AssignmentResult {
            outcomes: vec![
                AssignmentOutcome {
                    waybill_id: ok_id,
                    result: Ok(()),
                },
                AssignmentOutcome {
                    waybill_id: bad_id,
                    result: Err(AssignmentError::AlreadyAssigned(bad_id)),
                },
            ],
        };

        assert_eq!(result.succeeded(), vec![ok_id]);
        assert_eq!(result.failed().len(), 1);
        assert_eq!(result.failed()[0].0, bad_id);
        assert!(!result.is_complete_success());
    }
}
