//! Public tracking endpoints keyed by tracking code.
//!
//! These routes require no account. Possession of a valid tracking code is
//! the only credential, so a malformed or unknown code is reported uniformly
//! as not found.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{DeliveryType, TrackingCode, WaybillStatus};
use domain::{Actor, TransitionWaybill};
use serde::{Deserialize, Serialize};
use tracking_store::TrackingStore;

use crate::error::ApiError;
use crate::routes::waybills::{AppState, EventResponse};

#[derive(Serialize)]
pub struct TrackResponse {
    pub tracking_code: String,
    pub status: WaybillStatus,
    pub delivery_type: DeliveryType,
    pub receiver_name: String,
    pub created_at: String,
    pub delivered_at: Option<String>,
    pub history: Vec<EventResponse>,
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub rating: u8,
    pub comment: String,
}

/// GET /track/:code — public tracking lookup: status and full history.
#[tracing::instrument(skip(state))]
pub async fn get<S: TrackingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
) -> Result<Json<TrackResponse>, ApiError> {
    let code = parse_code(&code)?;
    let (waybill, events) = state.service.track(&code).await?;

    Ok(Json(TrackResponse {
        tracking_code: waybill.tracking_code.to_string(),
        status: waybill.status,
        delivery_type: waybill.delivery_type,
        receiver_name: waybill.receiver_name.clone(),
        created_at: waybill.created_at.to_rfc3339(),
        delivered_at: waybill.delivered_at.map(|d| d.to_rfc3339()),
        history: events.iter().map(EventResponse::from_event).collect(),
    }))
}

/// POST /track/:code/confirm — the receiver confirms delivery.
///
/// Only valid while the waybill is in transit.
#[tracing::instrument(skip(state))]
pub async fn confirm<S: TrackingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
) -> Result<Json<TrackResponse>, ApiError> {
    let code = parse_code(&code)?;
    let (waybill, _) = state.service.track(&code).await?;

    let actor = Actor::Receiver(code.clone());
    state
        .service
        .transition(
            TransitionWaybill::new(waybill.id, WaybillStatus::Delivered),
            &actor,
        )
        .await?;

    let (waybill, events) = state.service.track(&code).await?;
    Ok(Json(TrackResponse {
        tracking_code: waybill.tracking_code.to_string(),
        status: waybill.status,
        delivery_type: waybill.delivery_type,
        receiver_name: waybill.receiver_name.clone(),
        created_at: waybill.created_at.to_rfc3339(),
        delivered_at: waybill.delivered_at.map(|d| d.to_rfc3339()),
        history: events.iter().map(EventResponse::from_event).collect(),
    }))
}

/// POST /track/:code/feedback — the receiver rates the delivery.
#[tracing::instrument(skip(state, req))]
pub async fn feedback<S: TrackingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
    Json(req): Json<FeedbackRequest>,
) -> Result<(axum::http::StatusCode, Json<EventResponse>), ApiError> {
    let code = parse_code(&code)?;
    let event = state
        .service
        .record_feedback(&code, req.rating, &req.comment)
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(EventResponse::from_event(&event)),
    ))
}

fn parse_code(input: &str) -> Result<TrackingCode, ApiError> {
    TrackingCode::parse(input)
        .map_err(|_| ApiError::NotFound(format!("No waybill for tracking code: {input}")))
}
