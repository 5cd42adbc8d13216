//! The location sampler: one logical device track feeding throttled GPS
//! fixes into a waybill's event history.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use common::{UserId, WaybillId};
use domain::WaybillService;
use tracking_store::{GeoPoint, TrackingStore};

use crate::source::{FixError, PermissionState, PositionSource};

/// Minimum spacing between persisted fixes.
pub const DEFAULT_MIN_INTERVAL_SECS: i64 = 30;

/// Drops fixes that arrive faster than the minimum interval.
///
/// Rejected fixes are discarded, never queued, so write volume stays
/// bounded no matter how chatty the device is.
#[derive(Debug)]
pub struct ThrottleGate {
    min_interval: Duration,
    last_accepted: Option<DateTime<Utc>>,
}

impl ThrottleGate {
    /// Creates a gate with the given minimum spacing.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: None,
        }
    }

    /// Returns true if a fix captured at `at` should be persisted.
    pub fn accept(&mut self, at: DateTime<Utc>) -> bool {
        match self.last_accepted {
            Some(last) if at - last < self.min_interval => false,
            _ => {
                self.last_accepted = Some(at);
                true
            }
        }
    }
}

/// Where the sampler currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Watching(WaybillId),
}

struct ActiveWatch {
    waybill_id: WaybillId,
    task: JoinHandle<()>,
}

/// Pulls continuous position fixes from a device and forwards the accepted
/// ones into the tracking store via the domain service.
///
/// One logical track at a time: starting a new watch stops the previous one
/// first. Device errors while watching are recorded as the last error and do
/// not stop the watch; stopping (or dropping the sampler) releases the
/// device subscription.
pub struct LocationSampler<S: TrackingStore + 'static> {
    service: Arc<WaybillService<S>>,
    source: Arc<dyn PositionSource>,
    min_interval: Duration,
    active: Mutex<Option<ActiveWatch>>,
    last_error: Arc<std::sync::Mutex<Option<FixError>>>,
}

impl<S: TrackingStore + 'static> LocationSampler<S> {
    /// Creates a sampler with the default 30 second minimum interval.
    pub fn new(service: Arc<WaybillService<S>>, source: Arc<dyn PositionSource>) -> Self {
        Self::with_min_interval(service, source, Duration::seconds(DEFAULT_MIN_INTERVAL_SECS))
    }

    /// Creates a sampler with a custom minimum interval.
    pub fn with_min_interval(
        service: Arc<WaybillService<S>>,
        source: Arc<dyn PositionSource>,
        min_interval: Duration,
    ) -> Self {
        Self {
            service,
            source,
            min_interval,
            active: Mutex::new(None),
            last_error: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    /// Starts watching for `waybill_id` on behalf of `driver`.
    ///
    /// Requires granted location permission; a denial keeps the sampler
    /// idle and is recoverable by calling `start` again after re-prompting.
    /// Any previous watch is stopped first.
    pub async fn start(&self, waybill_id: WaybillId, driver: UserId) -> Result<(), FixError> {
        if self.source.permission().await != PermissionState::Granted {
            self.set_last_error(Some(FixError::PermissionDenied));
            return Err(FixError::PermissionDenied);
        }

        self.stop().await;

        let mut watch = self.source.watch().await?;
        self.set_last_error(None);

        let service = Arc::clone(&self.service);
        let last_error = Arc::clone(&self.last_error);
        let mut gate = ThrottleGate::new(self.min_interval);

        let task = tokio::spawn(async move {
            while let Some(fix) = watch.next().await {
                match fix {
                    Ok(sample) => {
                        if !gate.accept(sample.captured_at) {
                            metrics::counter!("location_fixes_throttled_total").increment(1);
                            debug!(%waybill_id, "fix dropped by throttle");
                            continue;
                        }

                        let position = GeoPoint {
                            latitude: sample.latitude,
                            longitude: sample.longitude,
                            accuracy_m: sample.accuracy_m,
                        };
                        if let Err(e) = service
                            .record_location_fix(waybill_id, driver, position)
                            .await
                        {
                            warn!(%waybill_id, error = %e, "failed to record location fix");
                        }
                    }
                    Err(e) => {
                        // Device hiccups are visible but non-fatal; keep
                        // waiting for the next fix.
                        metrics::counter!("location_fix_errors_total").increment(1);
                        warn!(%waybill_id, error = %e, "device fix error");
                        *last_error.lock().unwrap() = Some(e);
                    }
                }
            }
        });

        *self.active.lock().await = Some(ActiveWatch { waybill_id, task });
        Ok(())
    }

    /// Stops the current watch and releases the device subscription.
    ///
    /// Safe to call when already idle.
    pub async fn stop(&self) {
        if let Some(active) = self.active.lock().await.take() {
            active.task.abort();
            debug!(waybill_id = %active.waybill_id, "watch stopped");
        }
    }

    /// The sampler's current state.
    pub async fn state(&self) -> SamplerState {
        match self.active.lock().await.as_ref() {
            Some(active) if !active.task.is_finished() => {
                SamplerState::Watching(active.waybill_id)
            }
            _ => SamplerState::Idle,
        }
    }

    /// The most recent non-fatal device error, if any.
    pub fn last_error(&self) -> Option<FixError> {
        self.last_error.lock().unwrap().clone()
    }

    fn set_last_error(&self, error: Option<FixError>) {
        *self.last_error.lock().unwrap() = error;
    }
}

impl<S: TrackingStore + 'static> Drop for LocationSampler<S> {
    fn drop(&mut self) {
        // Releases the device watch even if the caller forgot to stop.
        if let Some(active) = self.active.get_mut().take() {
            active.task.abort();
        }
    }
}
