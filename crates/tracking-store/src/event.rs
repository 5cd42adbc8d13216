use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{WaybillId, WaybillStatus};

/// Unique identifier for a tracking event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<EventId> for Uuid {
    fn from(id: EventId) -> Self {
        id.0
    }
}

/// A GPS coordinate attached to a tracking event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,

    /// Reported fix accuracy in meters, if the source provides one.
    pub accuracy_m: Option<f64>,
}

impl GeoPoint {
    /// Creates a point without an accuracy estimate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: None,
        }
    }

    /// Creates a point with a reported accuracy in meters.
    pub fn with_accuracy(latitude: f64, longitude: f64, accuracy_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: Some(accuracy_m),
        }
    }
}

/// One entry in a waybill's append-only tracking history.
///
/// Events are never updated or deleted. `seq` is assigned by the store at
/// commit time, starts at 1 per waybill, and increments by 1 per event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Unique identifier for this event.
    pub id: EventId,

    /// The waybill this event belongs to.
    pub waybill_id: WaybillId,

    /// The waybill's status as of this event.
    pub status: WaybillStatus,

    /// Free-text place name (e.g. "Sorting facility, Nairobi").
    pub location: Option<String>,

    /// GPS coordinate, when the event came from a location fix.
    pub position: Option<GeoPoint>,

    /// Human-readable annotation for the audit trail.
    pub note: Option<String>,

    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,

    /// Per-waybill sequence number assigned by the store.
    pub seq: i64,
}

/// A tracking event awaiting its store-assigned identity and sequence.
#[derive(Debug, Clone)]
pub struct NewTrackingEvent {
    pub waybill_id: WaybillId,
    pub status: WaybillStatus,
    pub location: Option<String>,
    pub position: Option<GeoPoint>,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl NewTrackingEvent {
    /// Creates a new event builder.
    pub fn builder() -> NewTrackingEventBuilder {
        NewTrackingEventBuilder::default()
    }
}

/// Builder for constructing tracking events.
#[derive(Debug, Default)]
pub struct NewTrackingEventBuilder {
    waybill_id: Option<WaybillId>,
    status: Option<WaybillStatus>,
    location: Option<String>,
    position: Option<GeoPoint>,
    note: Option<String>,
    recorded_at: Option<DateTime<Utc>>,
}

impl NewTrackingEventBuilder {
    /// Sets the waybill this event belongs to.
    pub fn waybill_id(mut self, id: WaybillId) -> Self {
        self.waybill_id = Some(id);
        self
    }

    /// Sets the status recorded by this event.
    pub fn status(mut self, status: WaybillStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the free-text place name.
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the GPS coordinate.
    pub fn position(mut self, position: GeoPoint) -> Self {
        self.position = Some(position);
        self
    }

    /// Sets the audit note.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Sets the recording time. If not set, the current time will be used.
    pub fn recorded_at(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(at);
        self
    }

    /// Builds the event.
    ///
    /// # Panics
    ///
    /// Panics if `waybill_id` or `status` are not set.
    pub fn build(self) -> NewTrackingEvent {
        NewTrackingEvent {
            waybill_id: self.waybill_id.expect("waybill_id is required"),
            status: self.status.expect("status is required"),
            location: self.location,
            position: self.position,
            note: self.note,
            recorded_at: self.recorded_at.unwrap_or_else(Utc::now),
        }
    }

    /// Tries to build the event, returning None if required fields are missing.
    pub fn try_build(self) -> Option<NewTrackingEvent> {
        Some(NewTrackingEvent {
            waybill_id: self.waybill_id?,
            status: self.status?,
            location: self.location,
            position: self.position,
            note: self.note,
            recorded_at: self.recorded_at.unwrap_or_else(Utc::now),
        })
    }
}
