//! Sampler tests against the in-memory store and a simulated device.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use common::{DeliveryType, UserId, WaybillId};
use domain::{Actor, CreateWaybill, InMemoryNotificationSink, WaybillService};
use sampler::{
    FixError, LocationSample, LocationSampler, PermissionState, SamplerState,
    SimulatedPositionSource,
};
use tracking_store::{InMemoryProofStore, InMemoryTrackingStore, Waybill};

fn make_service() -> Arc<WaybillService<InMemoryTrackingStore>> {
    Arc::new(WaybillService::new(
        InMemoryTrackingStore::new(),
        Arc::new(InMemoryNotificationSink::new()),
        Arc::new(InMemoryProofStore::new()),
    ))
}

async fn assigned_waybill(
    service: &WaybillService<InMemoryTrackingStore>,
    driver: UserId,
) -> Waybill {
    let waybill = service
        .create_waybill(CreateWaybill {
            sender: UserId::new(),
            receiver_name: "Jane Wanjiku".to_string(),
            receiver_phone: "+254700000000".to_string(),
            receiver_address: "12 Riverside Drive, Nairobi".to_string(),
            package_details: "Documents".to_string(),
            package_weight: None,
            delivery_type: DeliveryType::Standard,
        })
        .await
        .unwrap();
    service
        .assign_driver(waybill.id, driver, &Actor::Admin(UserId::new()))
        .await
        .unwrap()
}

fn sample_at(at: DateTime<Utc>) -> LocationSample {
    LocationSample {
        latitude: -1.2921,
        longitude: 36.8219,
        accuracy_m: Some(10.0),
        captured_at: at,
    }
}

async fn gps_event_count(
    service: &WaybillService<InMemoryTrackingStore>,
    waybill_id: WaybillId,
) -> usize {
    service
        .events(waybill_id)
        .await
        .unwrap()
        .iter()
        .filter(|e| e.position.is_some())
        .count()
}

async fn wait_for_gps_events(
    service: &WaybillService<InMemoryTrackingStore>,
    waybill_id: WaybillId,
    expected: usize,
) {
    for _ in 0..100 {
        if gps_event_count(service, waybill_id).await >= expected {
            return;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("expected {expected} GPS events for {waybill_id}");
}

#[tokio::test]
async fn throttle_drops_the_middle_fix() {
    let service = make_service();
    let driver = UserId::new();
    let waybill = assigned_waybill(&service, driver).await;

    let source = SimulatedPositionSource::new(PermissionState::Granted);
    let sampler = LocationSampler::new(service.clone(), Arc::new(source.clone()));
    sampler.start(waybill.id, driver).await.unwrap();

    let t0 = Utc::now();
    source.push(Ok(sample_at(t0))).await;
    source.push(Ok(sample_at(t0 + Duration::seconds(10)))).await;
    source.push(Ok(sample_at(t0 + Duration::seconds(35)))).await;

    wait_for_gps_events(&service, waybill.id, 2).await;
    // Give the dropped fix a chance to (wrongly) land
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert_eq!(gps_event_count(&service, waybill.id).await, 2);

    sampler.stop().await;
}

#[tokio::test]
async fn permission_denied_keeps_the_sampler_idle() {
    let service = make_service();
    let driver = UserId::new();
    let waybill = assigned_waybill(&service, driver).await;

    let source = SimulatedPositionSource::new(PermissionState::Denied);
    let sampler = LocationSampler::new(service.clone(), Arc::new(source));

    let result = sampler.start(waybill.id, driver).await;
    assert_eq!(result, Err(FixError::PermissionDenied));
    assert_eq!(sampler.state().await, SamplerState::Idle);
    assert_eq!(sampler.last_error(), Some(FixError::PermissionDenied));
}

#[tokio::test]
async fn device_errors_do_not_stop_the_watch() {
    let service = make_service();
    let driver = UserId::new();
    let waybill = assigned_waybill(&service, driver).await;

    let source = SimulatedPositionSource::new(PermissionState::Granted);
    let sampler = LocationSampler::new(service.clone(), Arc::new(source.clone()));
    sampler.start(waybill.id, driver).await.unwrap();

    source.push(Err(FixError::Timeout)).await;
    let t0 = Utc::now();
    source.push(Ok(sample_at(t0))).await;

    wait_for_gps_events(&service, waybill.id, 1).await;
    assert_eq!(sampler.state().await, SamplerState::Watching(waybill.id));
    assert_eq!(sampler.last_error(), Some(FixError::Timeout));

    sampler.stop().await;
}

#[tokio::test]
async fn stop_releases_the_device_watch() {
    let service = make_service();
    let driver = UserId::new();
    let waybill = assigned_waybill(&service, driver).await;

    let source = SimulatedPositionSource::new(PermissionState::Granted);
    let sampler = LocationSampler::new(service.clone(), Arc::new(source.clone()));
    sampler.start(waybill.id, driver).await.unwrap();
    assert_eq!(sampler.state().await, SamplerState::Watching(waybill.id));

    sampler.stop().await;
    assert_eq!(sampler.state().await, SamplerState::Idle);

    for _ in 0..100 {
        if source.watch_released().await {
            return;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("watch handle was not released");
}

#[tokio::test]
async fn starting_again_replaces_the_previous_watch() {
    let service = make_service();
    let driver = UserId::new();
    let first = assigned_waybill(&service, driver).await;
    let second = assigned_waybill(&service, driver).await;

    let source = SimulatedPositionSource::new(PermissionState::Granted);
    let sampler = LocationSampler::new(service.clone(), Arc::new(source.clone()));

    sampler.start(first.id, driver).await.unwrap();
    sampler.start(second.id, driver).await.unwrap();
    assert_eq!(sampler.state().await, SamplerState::Watching(second.id));

    // Fixes pushed now land on the second waybill only
    let t0 = Utc::now();
    source.push(Ok(sample_at(t0))).await;
    wait_for_gps_events(&service, second.id, 1).await;
    assert_eq!(gps_event_count(&service, first.id).await, 0);

    sampler.stop().await;
}

#[tokio::test]
async fn dropping_the_sampler_releases_the_watch() {
    let service = make_service();
    let driver = UserId::new();
    let waybill = assigned_waybill(&service, driver).await;

    let source = SimulatedPositionSource::new(PermissionState::Granted);
    {
        let sampler = LocationSampler::new(service.clone(), Arc::new(source.clone()));
        sampler.start(waybill.id, driver).await.unwrap();
    }

    for _ in 0..100 {
        if source.watch_released().await {
            return;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("watch handle was not released on drop");
}
