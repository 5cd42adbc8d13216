//! Device geolocation as an injected capability.
//!
//! The sampler never touches a global location API; it consumes a
//! [`PositionSource`], so tests substitute a simulated device.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{RwLock, mpsc};

/// One raw GPS reading from the device, before throttling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

/// Result of querying the device's location permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
}

/// Non-fatal errors surfaced by the device while watching.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FixError {
    /// Location access was refused by the user or platform.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The device cannot determine a position right now.
    #[error("Position unavailable")]
    Unavailable,

    /// The device did not produce a fix in time.
    #[error("Position fix timed out")]
    Timeout,
}

/// A live device watch. Dropping it releases the device's location
/// subscription.
pub struct PositionWatch {
    rx: mpsc::Receiver<Result<LocationSample, FixError>>,
}

impl PositionWatch {
    /// Creates a watch from a raw channel receiver.
    pub fn new(rx: mpsc::Receiver<Result<LocationSample, FixError>>) -> Self {
        Self { rx }
    }

    /// Waits for the next fix or device error. Returns None once the
    /// device stops reporting.
    pub async fn next(&mut self) -> Option<Result<LocationSample, FixError>> {
        self.rx.recv().await
    }
}

/// A continuous position provider (the device geolocation API).
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Queries (and may prompt for) location permission.
    async fn permission(&self) -> PermissionState;

    /// Opens a continuous watch. Fixes are pushed by the device; the watch
    /// is released by dropping the returned handle.
    async fn watch(&self) -> Result<PositionWatch, FixError>;
}

/// Scriptable position source for testing.
///
/// `push` feeds fixes into the currently open watch; `watch_released`
/// observes whether the sampler dropped its handle.
#[derive(Clone)]
pub struct SimulatedPositionSource {
    permission: PermissionState,
    feed: Arc<RwLock<Option<mpsc::Sender<Result<LocationSample, FixError>>>>>,
}

impl SimulatedPositionSource {
    /// Creates a source with the given permission answer.
    pub fn new(permission: PermissionState) -> Self {
        Self {
            permission,
            feed: Arc::new(RwLock::new(None)),
        }
    }

    /// Pushes a fix (or device error) into the open watch.
    ///
    /// Returns false if no watch is open or the watch was dropped.
    pub async fn push(&self, fix: Result<LocationSample, FixError>) -> bool {
        let feed = self.feed.read().await;
        match feed.as_ref() {
            Some(tx) => tx.send(fix).await.is_ok(),
            None => false,
        }
    }

    /// Returns true once the sampler has dropped its watch handle.
    pub async fn watch_released(&self) -> bool {
        let feed = self.feed.read().await;
        match feed.as_ref() {
            Some(tx) => tx.is_closed(),
            None => true,
        }
    }
}

#[async_trait]
impl PositionSource for SimulatedPositionSource {
    async fn permission(&self) -> PermissionState {
        self.permission
    }

    async fn watch(&self) -> Result<PositionWatch, FixError> {
        if self.permission != PermissionState::Granted {
            return Err(FixError::PermissionDenied);
        }
        let (tx, rx) = mpsc::channel(16);
        *self.feed.write().await = Some(tx);
        Ok(PositionWatch::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn denied_source_refuses_to_watch() {
        let source = SimulatedPositionSource::new(PermissionState::Denied);
        assert_eq!(source.permission().await, PermissionState::Denied);
        assert!(matches!(
            source.watch().await,
            Err(FixError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn dropping_the_watch_releases_the_subscription() {
        let source = SimulatedPositionSource::new(PermissionState::Granted);
        let watch = source.watch().await.unwrap();
        assert!(!source.watch_released().await);

        drop(watch);
        assert!(source.watch_released().await);
    }

    #[tokio::test]
    async fn pushed_fixes_arrive_in_order() {
        let source = SimulatedPositionSource::new(PermissionState::Granted);
        let mut watch = source.watch().await.unwrap();

        let sample = LocationSample {
            latitude: -1.2921,
            longitude: 36.8219,
            accuracy_m: Some(9.0),
            captured_at: Utc::now(),
        };
        assert!(source.push(Ok(sample)).await);
        assert!(source.push(Err(FixError::Timeout)).await);

        assert_eq!(watch.next().await, Some(Ok(sample)));
        assert_eq!(watch.next().await, Some(Err(FixError::Timeout)));
    }
}
