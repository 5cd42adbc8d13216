//! Best-effort batch assignment of waybills to a driver.

use std::sync::Arc;

use tracing::{info, warn};

use common::{UserId, WaybillId};
use domain::{Actor, DomainError, WaybillService};
use tracking_store::TrackingStore;

use crate::batch::{AssignmentBatch, AssignmentOutcome, AssignmentResult};
use crate::error::AssignmentError;

/// Assigns batches of waybills to one driver, one waybill at a time.
///
/// Each item is attempted independently: a stale or already-claimed waybill
/// fails on its own without rolling back assignments already committed for
/// the rest of the batch.
pub struct AssignmentCoordinator<S: TrackingStore> {
    service: Arc<WaybillService<S>>,
}

impl<S: TrackingStore> AssignmentCoordinator<S> {
    /// Creates a coordinator over the given service.
    pub fn new(service: Arc<WaybillService<S>>) -> Self {
        Self { service }
    }

    /// Assigns every waybill in the batch to the batch's driver.
    ///
    /// Never fails as a whole; the result carries a per-item outcome so the
    /// caller can retry only the failed subset.
    #[tracing::instrument(skip(self, batch, actor), fields(driver = %batch.driver(), count = batch.len()))]
    pub async fn assign(&self, batch: AssignmentBatch, actor: &Actor) -> AssignmentResult {
        let driver = batch.driver();
        let mut outcomes = Vec::with_capacity(batch.len());

        for &waybill_id in batch.waybill_ids() {
            let result = self.assign_one(waybill_id, driver, actor).await;
            match &result {
                Ok(()) => info!(%waybill_id, "waybill assigned"),
                Err(e) => warn!(%waybill_id, error = %e, "assignment failed"),
            }
            outcomes.push(AssignmentOutcome { waybill_id, result });
        }

        let result = AssignmentResult { outcomes };
        metrics::counter!("assignment_batches_total").increment(1);
        metrics::counter!("assignment_items_failed_total")
            .increment(result.failed().len() as u64);
        result
    }

    async fn assign_one(
        &self,
        waybill_id: WaybillId,
        driver: UserId,
        actor: &Actor,
    ) -> Result<(), AssignmentError> {
        match self.service.assign_driver(waybill_id, driver, actor).await {
            Ok(_) => Ok(()),
            Err(DomainError::WaybillNotFound(id)) => Err(AssignmentError::NotFound(id)),
            Err(DomainError::DriverAlreadyAssigned(id)) => {
                Err(AssignmentError::AlreadyAssigned(id))
            }
            Err(DomainError::InvalidTransition { from, .. }) => {
                Err(AssignmentError::NotAssignable(waybill_id, from))
            }
            Err(e) => Err(AssignmentError::Domain(e)),
        }
    }
}
