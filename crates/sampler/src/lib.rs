//! GPS sampling pipeline for driver devices.
//!
//! A [`LocationSampler`] owns one logical device watch at a time, throttles
//! incoming fixes to a minimum interval, and forwards accepted fixes into
//! the waybill's event history as `in-transit` tracking events.

pub mod sampler;
pub mod source;

pub use sampler::{
    DEFAULT_MIN_INTERVAL_SECS, LocationSampler, SamplerState, ThrottleGate,
};
pub use source::{
    FixError, LocationSample, PermissionState, PositionSource, PositionWatch,
    SimulatedPositionSource,
};
