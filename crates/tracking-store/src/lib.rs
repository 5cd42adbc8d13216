pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod proof;
pub mod store;
pub mod waybill;

pub use error::{Result, StoreError};
pub use event::{EventId, GeoPoint, NewTrackingEvent, NewTrackingEventBuilder, TrackingEvent};
pub use memory::InMemoryTrackingStore;
pub use postgres::PostgresTrackingStore;
pub use proof::{InMemoryProofStore, ProofStore, proof_key};
pub use store::TrackingStore;
pub use waybill::{Waybill, WaybillBuilder};
