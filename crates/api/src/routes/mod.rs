//! HTTP route handlers.

pub mod assignments;
pub mod health;
pub mod metrics;
pub mod track;
pub mod waybills;
