use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique internal identifier for a waybill.
///
/// Wraps a UUID to provide type safety and prevent mixing up
/// waybill ids with other UUID-based identifiers. This is the
/// opaque id; the human-facing identifier is [`crate::TrackingCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaybillId(Uuid);

impl WaybillId {
    /// Creates a new random waybill ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a waybill ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for WaybillId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WaybillId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for WaybillId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<WaybillId> for Uuid {
    fn from(id: WaybillId) -> Self {
        id.0
    }
}

/// Identifier for an account holder (sender, driver, or administrator).
///
/// Receivers have no account and are identified only by possession of a
/// tracking code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
