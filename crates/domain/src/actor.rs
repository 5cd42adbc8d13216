use serde::{Deserialize, Serialize};

use common::{TrackingCode, UserId};

/// Who is attempting an operation.
///
/// Receivers have no account; they authenticate purely by possession of the
/// waybill's tracking code. On the wire an actor is `{"role": ..., "id": ...}`
/// where `id` is a user id, or the tracking code for receivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Admin(UserId),
    Sender(UserId),
    Driver(UserId),
    Receiver(TrackingCode),
}

impl Actor {
    /// Returns the account id behind this actor, if it has one.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Actor::Admin(id) | Actor::Sender(id) | Actor::Driver(id) => Some(*id),
            Actor::Receiver(_) => None,
        }
    }

    /// Returns true for administrator actors.
    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin(_))
    }
}
