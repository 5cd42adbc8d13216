pub mod status;
pub mod tracking_code;
pub mod types;

pub use status::{DeliveryType, UnknownVariant, WaybillStatus};
pub use tracking_code::{InvalidTrackingCode, TrackingCode};
pub use types::{UserId, WaybillId};
