//! Change fan-out bus for the waybill platform.
//!
//! Whenever the tracking store commits a mutation it publishes one
//! [`ChangeNotice`] here. The bus delivers the notice to every live
//! subscription whose [`Topic`] matches. A notice is an invalidation signal,
//! not the payload: consumers re-fetch authoritative state from the store.
//!
//! Guarantees: at-least-once delivery to live subscribers, per-topic order
//! equal to commit order, no replay for subscribers that were offline at
//! publish time (they must re-fetch on reconnect). Unsubscribing is
//! idempotent.

pub mod bus;
pub mod notice;
pub mod topic;

pub use bus::{ChangeBus, ChangeListener, SubscriptionHandle};
pub use notice::{ChangeKind, ChangeNotice};
pub use topic::Topic;
