//! Batch route assignment: hand a set of approved or pending waybills to
//! one driver, best-effort per item, with no batch-level rollback.

pub mod batch;
pub mod coordinator;
pub mod error;

pub use batch::{AssignmentBatch, AssignmentOutcome, AssignmentResult};
pub use coordinator::AssignmentCoordinator;
pub use error::AssignmentError;
