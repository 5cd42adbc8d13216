use async_trait::async_trait;

use common::{TrackingCode, UserId, WaybillId};
use fanout::ChangeBus;

use crate::{
    Result,
    event::{NewTrackingEvent, TrackingEvent},
    waybill::Waybill,
};

/// Core trait for tracking store implementations.
///
/// A tracking store persists waybill rows alongside their append-only event
/// history and publishes one change notice per committed mutation. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Inserts a new waybill together with its first tracking event.
    ///
    /// Row and event are committed atomically. Fails with
    /// `DuplicateTrackingCode` if the code is already in use.
    async fn create(&self, waybill: &Waybill, first_event: NewTrackingEvent)
    -> Result<TrackingEvent>;

    /// Persists an updated waybill row and appends a tracking event in one
    /// atomic commit.
    ///
    /// The row is written exactly as given; the caller is responsible for
    /// keeping `waybill.status` equal to `event.status`.
    async fn record_transition(
        &self,
        waybill: &Waybill,
        event: NewTrackingEvent,
    ) -> Result<TrackingEvent>;

    /// Persists an updated waybill row without touching the event history.
    ///
    /// Used for row-only changes such as attaching a proof-of-delivery key.
    async fn update_waybill(&self, waybill: &Waybill) -> Result<()>;

    /// Retrieves a waybill by ID.
    async fn waybill(&self, id: WaybillId) -> Result<Option<Waybill>>;

    /// Retrieves a waybill by its public tracking code.
    async fn waybill_by_code(&self, code: &TrackingCode) -> Result<Option<Waybill>>;

    /// Retrieves all waybills, newest first.
    async fn list_waybills(&self) -> Result<Vec<Waybill>>;

    /// Retrieves the waybills assigned to a driver, newest first.
    async fn waybills_for_driver(&self, driver: UserId) -> Result<Vec<Waybill>>;

    /// Retrieves the waybills created by a sender, newest first.
    async fn waybills_for_sender(&self, sender: UserId) -> Result<Vec<Waybill>>;

    /// Retrieves a waybill's full event history, newest first.
    async fn events_for_waybill(&self, id: WaybillId) -> Result<Vec<TrackingEvent>>;

    /// Retrieves the newest event for a waybill.
    ///
    /// Returns None if the waybill has no events.
    async fn latest_event(&self, id: WaybillId) -> Result<Option<TrackingEvent>>;

    /// The change bus this store publishes to.
    fn bus(&self) -> &ChangeBus;
}
