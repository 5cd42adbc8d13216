//! Batch route assignment endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use dispatch::AssignmentBatch;
use domain::Actor;
use serde::{Deserialize, Serialize};
use tracking_store::TrackingStore;

use crate::error::ApiError;
use crate::routes::waybills::{AppState, parse_user_id, parse_waybill_id};

#[derive(Deserialize)]
pub struct AssignmentRequest {
    pub actor: Actor,
    pub driver_id: String,
    pub waybill_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct FailedAssignment {
    pub waybill_id: String,
    pub error: String,
}

#[derive(Serialize)]
pub struct AssignmentResponse {
    pub driver_id: String,
    pub assigned: Vec<String>,
    pub failed: Vec<FailedAssignment>,
}

/// POST /assignments — assign a batch of waybills to one driver.
///
/// Best-effort per item: the response reports which waybills were assigned
/// and which failed, and successes stand regardless of other failures.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: TrackingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AssignmentRequest>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let driver = parse_user_id(&req.driver_id)?;
    let waybill_ids = req
        .waybill_ids
        .iter()
        .map(|id| parse_waybill_id(id))
        .collect::<Result<Vec<_>, _>>()?;

    let batch = AssignmentBatch::new(driver, waybill_ids)
        .ok_or_else(|| ApiError::BadRequest("waybill_ids must not be empty".to_string()))?;

    let result = state.coordinator.assign(batch, &req.actor).await;

    Ok(Json(AssignmentResponse {
        driver_id: driver.to_string(),
        assigned: result.succeeded().iter().map(|id| id.to_string()).collect(),
        failed: result
            .failed()
            .iter()
            .map(|(id, e)| FailedAssignment {
                waybill_id: id.to_string(),
                error: e.to_string(),
            })
            .collect(),
    }))
}
