//! Waybill CRUD, transition, and proof-of-delivery endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{DeliveryType, UserId, WaybillId, WaybillStatus};
use dispatch::AssignmentCoordinator;
use domain::{Actor, CreateWaybill, TransitionWaybill, WaybillService};
use serde::{Deserialize, Serialize};
use tracking_store::{TrackingEvent, TrackingStore, Waybill};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: TrackingStore> {
    pub service: Arc<WaybillService<S>>,
    pub coordinator: AssignmentCoordinator<S>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateWaybillRequest {
    pub sender_id: String,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub receiver_address: String,
    pub package_details: String,
    pub package_weight: Option<String>,
    pub delivery_type: Option<DeliveryType>,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub actor: Actor,
    pub target: WaybillStatus,
    pub location: Option<String>,
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct ProofRequest {
    pub actor: Actor,
    pub extension: String,
    pub content_type: String,
    pub data: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct WaybillCreatedResponse {
    pub waybill_id: String,
    pub tracking_code: String,
    pub status: WaybillStatus,
}

#[derive(Serialize)]
pub struct WaybillResponse {
    pub id: String,
    pub tracking_code: String,
    pub sender_id: String,
    pub driver_id: Option<String>,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub receiver_address: String,
    pub package_details: String,
    pub package_weight: Option<String>,
    pub delivery_type: DeliveryType,
    pub status: WaybillStatus,
    pub proof_of_delivery_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub delivered_at: Option<String>,
}

impl WaybillResponse {
    pub(crate) fn from_waybill(waybill: &Waybill) -> Self {
        Self {
            id: waybill.id.to_string(),
            tracking_code: waybill.tracking_code.to_string(),
            sender_id: waybill.sender.to_string(),
            driver_id: waybill.driver.map(|d| d.to_string()),
            receiver_name: waybill.receiver_name.clone(),
            receiver_phone: waybill.receiver_phone.clone(),
            receiver_address: waybill.receiver_address.clone(),
            package_details: waybill.package_details.clone(),
            package_weight: waybill.package_weight.clone(),
            delivery_type: waybill.delivery_type,
            status: waybill.status,
            proof_of_delivery_url: waybill.proof_of_delivery_url.clone(),
            created_at: waybill.created_at.to_rfc3339(),
            updated_at: waybill.updated_at.to_rfc3339(),
            delivered_at: waybill.delivered_at.map(|d| d.to_rfc3339()),
        }
    }
}

#[derive(Serialize)]
pub struct PositionResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,
}

#[derive(Serialize)]
pub struct EventResponse {
    pub event_id: String,
    pub status: WaybillStatus,
    pub location: Option<String>,
    pub position: Option<PositionResponse>,
    pub note: Option<String>,
    pub recorded_at: String,
    pub seq: i64,
}

impl EventResponse {
    pub(crate) fn from_event(event: &TrackingEvent) -> Self {
        Self {
            event_id: event.id.to_string(),
            status: event.status,
            location: event.location.clone(),
            position: event.position.map(|p| PositionResponse {
                latitude: p.latitude,
                longitude: p.longitude,
                accuracy_m: p.accuracy_m,
            }),
            note: event.note.clone(),
            recorded_at: event.recorded_at.to_rfc3339(),
            seq: event.seq,
        }
    }
}

#[derive(Serialize)]
pub struct ProofResponse {
    pub url: String,
}

// -- Handlers --

/// POST /waybills — create a new waybill.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: TrackingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateWaybillRequest>,
) -> Result<(axum::http::StatusCode, Json<WaybillCreatedResponse>), ApiError> {
    let sender = parse_user_id(&req.sender_id)?;

    let waybill = state
        .service
        .create_waybill(CreateWaybill {
            sender,
            receiver_name: req.receiver_name,
            receiver_phone: req.receiver_phone,
            receiver_address: req.receiver_address,
            package_details: req.package_details,
            package_weight: req.package_weight,
            delivery_type: req.delivery_type.unwrap_or_default(),
        })
        .await?;

    let response = WaybillCreatedResponse {
        waybill_id: waybill.id.to_string(),
        tracking_code: waybill.tracking_code.to_string(),
        status: waybill.status,
    };

    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

/// GET /waybills — list all waybills, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: TrackingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<WaybillResponse>>, ApiError> {
    let waybills = state.service.list_waybills().await?;
    Ok(Json(
        waybills.iter().map(WaybillResponse::from_waybill).collect(),
    ))
}

/// GET /waybills/:id — load a waybill by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: TrackingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<WaybillResponse>, ApiError> {
    let waybill_id = parse_waybill_id(&id)?;
    let waybill = state.service.waybill(waybill_id).await?;
    Ok(Json(WaybillResponse::from_waybill(&waybill)))
}

/// GET /waybills/:id/events — a waybill's tracking history, newest first.
#[tracing::instrument(skip(state))]
pub async fn events<S: TrackingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let waybill_id = parse_waybill_id(&id)?;
    let events = state.service.events(waybill_id).await?;
    Ok(Json(events.iter().map(EventResponse::from_event).collect()))
}

/// POST /waybills/:id/status — move a waybill along one status edge.
#[tracing::instrument(skip(state, req))]
pub async fn transition<S: TrackingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<WaybillResponse>, ApiError> {
    let waybill_id = parse_waybill_id(&id)?;

    let mut cmd = TransitionWaybill::new(waybill_id, req.target);
    if let Some(location) = req.location {
        cmd = cmd.location(location);
    }
    if let Some(note) = req.note {
        cmd = cmd.note(note);
    }
    state.service.transition(cmd, &req.actor).await?;

    let waybill = state.service.waybill(waybill_id).await?;
    Ok(Json(WaybillResponse::from_waybill(&waybill)))
}

/// POST /waybills/:id/proof — upload a proof-of-delivery photo.
#[tracing::instrument(skip(state, req))]
pub async fn attach_proof<S: TrackingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ProofRequest>,
) -> Result<(axum::http::StatusCode, Json<ProofResponse>), ApiError> {
    let waybill_id = parse_waybill_id(&id)?;

    let url = state
        .service
        .attach_proof(
            waybill_id,
            &req.actor,
            &req.extension,
            &req.content_type,
            req.data.into_bytes(),
        )
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(ProofResponse { url }),
    ))
}

/// GET /drivers/:id/waybills — waybills assigned to one driver.
#[tracing::instrument(skip(state))]
pub async fn for_driver<S: TrackingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<WaybillResponse>>, ApiError> {
    let driver = parse_user_id(&id)?;
    let waybills = state.service.waybills_for_driver(driver).await?;
    Ok(Json(
        waybills.iter().map(WaybillResponse::from_waybill).collect(),
    ))
}

/// GET /senders/:id/waybills — waybills created by one sender.
#[tracing::instrument(skip(state))]
pub async fn for_sender<S: TrackingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<WaybillResponse>>, ApiError> {
    let sender = parse_user_id(&id)?;
    let waybills = state.service.waybills_for_sender(sender).await?;
    Ok(Json(
        waybills.iter().map(WaybillResponse::from_waybill).collect(),
    ))
}

pub(crate) fn parse_waybill_id(id: &str) -> Result<WaybillId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid waybill id: {e}")))?;
    Ok(WaybillId::from_uuid(uuid))
}

pub(crate) fn parse_user_id(id: &str) -> Result<UserId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user id: {e}")))?;
    Ok(UserId::from_uuid(uuid))
}
