//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency and run
//! serially because each one truncates the shared tables.

use std::sync::Arc;

use common::{TrackingCode, UserId, WaybillStatus};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use tracking_store::{
    GeoPoint, NewTrackingEvent, PostgresTrackingStore, StoreError, TrackingStore, Waybill,
};

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_waybills_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresTrackingStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE waybills, tracking_events")
        .execute(&pool)
        .await
        .unwrap();

    PostgresTrackingStore::new(pool)
}

fn test_waybill() -> Waybill {
    Waybill::builder()
        .tracking_code(TrackingCode::generate())
        .sender(UserId::new())
        .receiver_name("Jane Wanjiku")
        .receiver_phone("+254700000000")
        .receiver_address("12 Riverside Drive, Nairobi")
        .package_details("Documents")
        .build()
}

fn initial_event(waybill: &Waybill) -> NewTrackingEvent {
    NewTrackingEvent::builder()
        .waybill_id(waybill.id)
        .status(WaybillStatus::Pending)
        .note("Waybill created")
        .build()
}

#[tokio::test]
#[serial]
async fn create_and_retrieve_waybill() {
    let store = get_test_store().await;
    let waybill = test_waybill();

    let event = store
        .create(&waybill, initial_event(&waybill))
        .await
        .unwrap();
    assert_eq!(event.seq, 1);

    let fetched = store.waybill(waybill.id).await.unwrap().unwrap();
    assert_eq!(fetched.tracking_code, waybill.tracking_code);
    assert_eq!(fetched.status, WaybillStatus::Pending);
    assert_eq!(fetched.sender, waybill.sender);
    assert!(fetched.delivered_at.is_none());
}

#[tokio::test]
#[serial]
async fn duplicate_tracking_code_is_rejected() {
    let store = get_test_store().await;
    let first = test_waybill();
    store
        .create(&first, initial_event(&first))
        .await
        .unwrap();

    let mut clash = test_waybill();
    clash.tracking_code = first.tracking_code.clone();
    let result = store.create(&clash, initial_event(&clash)).await;

    assert!(matches!(
        result,
        Err(StoreError::DuplicateTrackingCode(_))
    ));

    // The failed create must not leave a partial event behind
    let events = store.events_for_waybill(clash.id).await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
#[serial]
async fn lookup_by_tracking_code() {
    let store = get_test_store().await;
    let waybill = test_waybill();
    store
        .create(&waybill, initial_event(&waybill))
        .await
        .unwrap();

    let found = store
        .waybill_by_code(&waybill.tracking_code)
        .await
        .unwrap();
    assert_eq!(found.unwrap().id, waybill.id);

    let missing = store
        .waybill_by_code(&TrackingCode::generate())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
#[serial]
async fn record_transition_is_atomic_and_ordered() {
    let store = get_test_store().await;
    let mut waybill = test_waybill();
    store
        .create(&waybill, initial_event(&waybill))
        .await
        .unwrap();

    for status in [
        WaybillStatus::Approved,
        WaybillStatus::InTransit,
        WaybillStatus::OutForDelivery,
    ] {
        waybill.status = status;
        store
            .record_transition(
                &waybill,
                NewTrackingEvent::builder()
                    .waybill_id(waybill.id)
                    .status(status)
                    .build(),
            )
            .await
            .unwrap();
    }

    let row = store.waybill(waybill.id).await.unwrap().unwrap();
    assert_eq!(row.status, WaybillStatus::OutForDelivery);

    let events = store.events_for_waybill(waybill.id).await.unwrap();
    let seqs: Vec<i64> = events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![4, 3, 2, 1]);

    let latest = store.latest_event(waybill.id).await.unwrap().unwrap();
    assert_eq!(latest.status, row.status);
}

#[tokio::test]
#[serial]
async fn record_transition_on_unknown_waybill_fails() {
    let store = get_test_store().await;
    let waybill = test_waybill();

    let result = store
        .record_transition(&waybill, initial_event(&waybill))
        .await;
    assert!(matches!(result, Err(StoreError::WaybillNotFound(_))));
}

#[tokio::test]
#[serial]
async fn geo_position_roundtrips() {
    let store = get_test_store().await;
    let waybill = test_waybill();
    store
        .create(&waybill, initial_event(&waybill))
        .await
        .unwrap();

    let mut moving = waybill.clone();
    moving.status = WaybillStatus::InTransit;
    store
        .record_transition(
            &moving,
            NewTrackingEvent::builder()
                .waybill_id(waybill.id)
                .status(WaybillStatus::InTransit)
                .position(GeoPoint::with_accuracy(-1.2921, 36.8219, 15.0))
                .note("GPS update - accuracy: 15m")
                .build(),
        )
        .await
        .unwrap();

    let latest = store.latest_event(waybill.id).await.unwrap().unwrap();
    let position = latest.position.unwrap();
    assert_eq!(position.latitude, -1.2921);
    assert_eq!(position.longitude, 36.8219);
    assert_eq!(position.accuracy_m, Some(15.0));
    assert_eq!(latest.note.as_deref(), Some("GPS update - accuracy: 15m"));
}

#[tokio::test]
#[serial]
async fn update_waybill_persists_row_only_changes() {
    let store = get_test_store().await;
    let mut waybill = test_waybill();
    store
        .create(&waybill, initial_event(&waybill))
        .await
        .unwrap();

    waybill.proof_of_delivery_url = Some(format!("{}/1700000000000.jpg", waybill.id));
    store.update_waybill(&waybill).await.unwrap();

    let fetched = store.waybill(waybill.id).await.unwrap().unwrap();
    assert_eq!(
        fetched.proof_of_delivery_url,
        waybill.proof_of_delivery_url
    );

    // Event history untouched
    let events = store.events_for_waybill(waybill.id).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
#[serial]
async fn driver_and_sender_filters() {
    let store = get_test_store().await;
    let driver = UserId::new();

    let mut assigned = test_waybill();
    assigned.driver = Some(driver);
    store
        .create(&assigned, initial_event(&assigned))
        .await
        .unwrap();

    let other = test_waybill();
    store
        .create(&other, initial_event(&other))
        .await
        .unwrap();

    let for_driver = store.waybills_for_driver(driver).await.unwrap();
    assert_eq!(for_driver.len(), 1);
    assert_eq!(for_driver[0].id, assigned.id);

    let for_sender = store.waybills_for_sender(other.sender).await.unwrap();
    assert_eq!(for_sender.len(), 1);
    assert_eq!(for_sender[0].id, other.id);

    assert_eq!(store.list_waybills().await.unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn delivered_at_roundtrips() {
    let store = get_test_store().await;
    let mut waybill = test_waybill();
    store
        .create(&waybill, initial_event(&waybill))
        .await
        .unwrap();

    let delivered_at = chrono::Utc::now();
    waybill.status = WaybillStatus::Delivered;
    waybill.delivered_at = Some(delivered_at);
    store.update_waybill(&waybill).await.unwrap();

    let fetched = store.waybill(waybill.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, WaybillStatus::Delivered);
    let stored_at = fetched.delivered_at.unwrap();
    assert!((stored_at - delivered_at).num_milliseconds().abs() < 5);
}
