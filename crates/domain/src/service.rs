//! Waybill service providing the high-level API for lifecycle operations.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use common::{DeliveryType, TrackingCode, UserId, WaybillId, WaybillStatus};
use tracking_store::{
    GeoPoint, NewTrackingEvent, ProofStore, StoreError, TrackingEvent, TrackingStore, Waybill,
    proof_key,
};

use crate::error::{DomainError, Result};
use crate::machine::{apply_transition, check_transition};
use crate::notify::{Notification, NotificationKind, NotificationSink};
use crate::Actor;

/// How many fresh tracking codes to try before giving up on a collision.
const CODE_RETRY_LIMIT: usize = 5;

/// Request to create a new waybill.
#[derive(Debug, Clone)]
pub struct CreateWaybill {
    pub sender: UserId,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub receiver_address: String,
    pub package_details: String,
    pub package_weight: Option<String>,
    pub delivery_type: DeliveryType,
}

/// Request to move a waybill along one status edge.
#[derive(Debug, Clone)]
pub struct TransitionWaybill {
    pub waybill_id: WaybillId,
    pub target: WaybillStatus,
    pub location: Option<String>,
    pub note: Option<String>,
}

impl TransitionWaybill {
    /// Creates a plain transition request with no annotations.
    pub fn new(waybill_id: WaybillId, target: WaybillStatus) -> Self {
        Self {
            waybill_id,
            target,
            location: None,
            note: None,
        }
    }

    /// Attaches a free-text location label.
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Attaches an audit note.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Service for managing waybills.
///
/// Wraps the tracking store with the state machine's validation, keeps the
/// cached status in lock-step with the event history, and fans out sender
/// notifications.
pub struct WaybillService<S: TrackingStore> {
    store: S,
    notifications: Arc<dyn NotificationSink>,
    proof: Arc<dyn ProofStore>,
}

impl<S: TrackingStore> WaybillService<S> {
    /// Creates a new waybill service.
    pub fn new(
        store: S,
        notifications: Arc<dyn NotificationSink>,
        proof: Arc<dyn ProofStore>,
    ) -> Self {
        Self {
            store,
            notifications,
            proof,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a new waybill at `pending` with its first audit event.
    ///
    /// Tracking codes are generated here; a unique-constraint collision is
    /// retried with a fresh code.
    #[tracing::instrument(skip(self, cmd), fields(sender = %cmd.sender))]
    pub async fn create_waybill(&self, cmd: CreateWaybill) -> Result<Waybill> {
        let mut attempts = 0;

        loop {
            attempts += 1;
            let mut builder = Waybill::builder()
                .tracking_code(TrackingCode::generate())
                .sender(cmd.sender)
                .receiver_name(cmd.receiver_name.clone())
                .receiver_phone(cmd.receiver_phone.clone())
                .receiver_address(cmd.receiver_address.clone())
                .package_details(cmd.package_details.clone())
                .delivery_type(cmd.delivery_type);
            if let Some(ref weight) = cmd.package_weight {
                builder = builder.package_weight(weight.clone());
            }
            let waybill = builder.build();

            let first_event = NewTrackingEvent::builder()
                .waybill_id(waybill.id)
                .status(WaybillStatus::Pending)
                .note("Waybill created")
                .recorded_at(waybill.created_at)
                .build();

            match self.store.create(&waybill, first_event).await {
                Ok(_) => {
                    metrics::counter!("waybills_created_total").increment(1);
                    self.notify(
                        waybill.sender,
                        format!(
                            "Waybill {} created successfully",
                            waybill.tracking_code
                        ),
                        waybill.id,
                        NotificationKind::WaybillCreated,
                    )
                    .await;
                    return Ok(waybill);
                }
                Err(StoreError::DuplicateTrackingCode(code)) if attempts < CODE_RETRY_LIMIT => {
                    warn!(%code, "tracking code collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Moves a waybill along one status edge on behalf of `actor`.
    ///
    /// A repeat of the current status is accepted as an audit no-op append.
    /// On success the cached row, the event history, and the sender's
    /// notification feed all reflect the new status.
    #[tracing::instrument(skip(self, cmd), fields(waybill_id = %cmd.waybill_id, target = %cmd.target))]
    pub async fn transition(
        &self,
        cmd: TransitionWaybill,
        actor: &Actor,
    ) -> Result<TrackingEvent> {
        let mut waybill = self.require_waybill(cmd.waybill_id).await?;
        check_transition(&waybill, cmd.target, actor)?;

        let event = self
            .commit(&mut waybill, cmd.target, cmd.location, None, cmd.note)
            .await?;
        metrics::counter!("waybill_transitions_total", "target" => cmd.target.as_str())
            .increment(1);

        self.notify(
            waybill.sender,
            format!(
                "Waybill #{} status updated to: {}",
                waybill.tracking_code, cmd.target
            ),
            waybill.id,
            NotificationKind::StatusUpdate,
        )
        .await;

        Ok(event)
    }

    /// Assigns a driver and moves the waybill to `in-transit`.
    ///
    /// A `pending` waybill is approved first as part of the same assignment.
    /// Fails if a driver is already assigned.
    #[tracing::instrument(skip(self), fields(%waybill_id, %driver))]
    pub async fn assign_driver(
        &self,
        waybill_id: WaybillId,
        driver: UserId,
        actor: &Actor,
    ) -> Result<Waybill> {
        let mut waybill = self.require_waybill(waybill_id).await?;
        if waybill.driver.is_some() {
            return Err(DomainError::DriverAlreadyAssigned(waybill_id));
        }

        if waybill.status == WaybillStatus::Pending {
            check_transition(&waybill, WaybillStatus::Approved, actor)?;
            self.commit(&mut waybill, WaybillStatus::Approved, None, None, None)
                .await?;
        }

        check_transition(&waybill, WaybillStatus::InTransit, actor)?;
        waybill.driver = Some(driver);
        self.commit(
            &mut waybill,
            WaybillStatus::InTransit,
            None,
            None,
            Some("Route assigned by admin - optimized delivery sequence".to_string()),
        )
        .await?;

        metrics::counter!("waybill_assignments_total").increment(1);
        self.notify(
            waybill.sender,
            format!(
                "Waybill #{} status updated to: {}",
                waybill.tracking_code,
                WaybillStatus::InTransit
            ),
            waybill.id,
            NotificationKind::StatusUpdate,
        )
        .await;

        Ok(waybill)
    }

    /// Records a throttled GPS fix from the assigned driver's device.
    ///
    /// The fix lands as an `in-transit` event carrying the coordinate; an
    /// `approved` waybill is moved to `in-transit` by its first fix.
    #[tracing::instrument(skip(self, position), fields(%waybill_id))]
    pub async fn record_location_fix(
        &self,
        waybill_id: WaybillId,
        driver: UserId,
        position: GeoPoint,
    ) -> Result<TrackingEvent> {
        let mut waybill = self.require_waybill(waybill_id).await?;
        let actor = Actor::Driver(driver);
        check_transition(&waybill, WaybillStatus::InTransit, &actor)?;

        let note = match position.accuracy_m {
            Some(accuracy) => format!("GPS update - accuracy: {}m", accuracy.round() as i64),
            None => "GPS update".to_string(),
        };

        let event = self
            .commit(
                &mut waybill,
                WaybillStatus::InTransit,
                None,
                Some(position),
                Some(note),
            )
            .await?;
        metrics::counter!("location_fixes_recorded_total").increment(1);
        Ok(event)
    }

    /// Records delivery feedback from the receiver as an audit event.
    ///
    /// The event repeats the waybill's current status so the history stays
    /// consistent with the cached row.
    #[tracing::instrument(skip(self, comment))]
    pub async fn record_feedback(
        &self,
        code: &TrackingCode,
        rating: u8,
        comment: &str,
    ) -> Result<TrackingEvent> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::InvalidRating(rating));
        }

        let mut waybill = self
            .store
            .waybill_by_code(code)
            .await?
            .ok_or_else(|| DomainError::TrackingCodeNotFound(code.clone()))?;

        let status = waybill.status;
        let note = format!("Rating: {rating}/5 - {comment}");
        let event = self
            .commit(&mut waybill, status, None, None, Some(note))
            .await?;
        Ok(event)
    }

    /// Stores a proof-of-delivery photo and records its key on the waybill.
    ///
    /// Permitted for an administrator or the assigned driver.
    #[tracing::instrument(skip(self, bytes), fields(%waybill_id))]
    pub async fn attach_proof(
        &self,
        waybill_id: WaybillId,
        actor: &Actor,
        ext: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let mut waybill = self.require_waybill(waybill_id).await?;

        let permitted = match actor {
            Actor::Admin(_) => true,
            Actor::Driver(id) => waybill.driver == Some(*id),
            _ => false,
        };
        if !permitted {
            return Err(DomainError::Forbidden {
                waybill_id,
                action: "attach proof of delivery".to_string(),
            });
        }

        let now = Utc::now();
        let key = proof_key(waybill.id, now, ext);
        let url = self.proof.put(&key, content_type, bytes).await?;

        waybill.proof_of_delivery_url = Some(url.clone());
        waybill.updated_at = now;
        self.store.update_waybill(&waybill).await?;

        Ok(url)
    }

    /// Public tracking lookup by code: the waybill and its full history,
    /// newest first.
    #[tracing::instrument(skip(self))]
    pub async fn track(&self, code: &TrackingCode) -> Result<(Waybill, Vec<TrackingEvent>)> {
        let waybill = self
            .store
            .waybill_by_code(code)
            .await?
            .ok_or_else(|| DomainError::TrackingCodeNotFound(code.clone()))?;
        let events = self.store.events_for_waybill(waybill.id).await?;
        Ok((waybill, events))
    }

    /// Loads a waybill by id.
    pub async fn waybill(&self, id: WaybillId) -> Result<Waybill> {
        self.require_waybill(id).await
    }

    /// Loads a waybill's event history, newest first.
    pub async fn events(&self, id: WaybillId) -> Result<Vec<TrackingEvent>> {
        self.require_waybill(id).await?;
        Ok(self.store.events_for_waybill(id).await?)
    }

    /// All waybills, newest first.
    pub async fn list_waybills(&self) -> Result<Vec<Waybill>> {
        Ok(self.store.list_waybills().await?)
    }

    /// Waybills assigned to one driver, newest first.
    pub async fn waybills_for_driver(&self, driver: UserId) -> Result<Vec<Waybill>> {
        Ok(self.store.waybills_for_driver(driver).await?)
    }

    /// Waybills created by one sender, newest first.
    pub async fn waybills_for_sender(&self, sender: UserId) -> Result<Vec<Waybill>> {
        Ok(self.store.waybills_for_sender(sender).await?)
    }

    async fn require_waybill(&self, id: WaybillId) -> Result<Waybill> {
        self.store
            .waybill(id)
            .await?
            .ok_or(DomainError::WaybillNotFound(id))
    }

    /// Applies an already-validated transition: projects the row, appends the
    /// event, and persists both in one commit.
    async fn commit(
        &self,
        waybill: &mut Waybill,
        target: WaybillStatus,
        location: Option<String>,
        position: Option<GeoPoint>,
        note: Option<String>,
    ) -> Result<TrackingEvent> {
        let now = Utc::now();
        apply_transition(waybill, target, now);

        let mut builder = NewTrackingEvent::builder()
            .waybill_id(waybill.id)
            .status(target)
            .recorded_at(now);
        if let Some(location) = location {
            builder = builder.location(location);
        }
        if let Some(position) = position {
            builder = builder.position(position);
        }
        if let Some(note) = note {
            builder = builder.note(note);
        }

        Ok(self
            .store
            .record_transition(waybill, builder.build())
            .await?)
    }

    async fn notify(
        &self,
        recipient: UserId,
        message: String,
        waybill_id: WaybillId,
        kind: NotificationKind,
    ) {
        let notification = Notification {
            recipient,
            message,
            waybill_id,
            kind,
        };
        if let Err(e) = self.notifications.deliver(notification).await {
            warn!(%waybill_id, error = %e, "notification delivery failed");
        }
    }
}
