//! Waybill lifecycle domain: the status state machine, role authorization,
//! and the service API that keeps the cached row consistent with the
//! append-only event history.

pub mod actor;
pub mod error;
pub mod machine;
pub mod notify;
pub mod service;

pub use actor::Actor;
pub use error::{DomainError, Result};
pub use machine::{apply_transition, check_transition};
pub use notify::{
    InMemoryNotificationSink, Notification, NotificationKind, NotificationSink, NotifyError,
};
pub use service::{CreateWaybill, TransitionWaybill, WaybillService};
