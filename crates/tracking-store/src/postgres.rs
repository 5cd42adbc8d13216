use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{DeliveryType, TrackingCode, UserId, WaybillId, WaybillStatus};
use fanout::{ChangeBus, ChangeKind, ChangeNotice};

use crate::{
    Result, StoreError,
    event::{EventId, GeoPoint, NewTrackingEvent, TrackingEvent},
    store::TrackingStore,
    waybill::Waybill,
};

const WAYBILL_COLUMNS: &str = "id, tracking_code, sender, driver, receiver_name, receiver_phone, \
     receiver_address, package_details, package_weight, delivery_type, status, \
     proof_of_delivery_url, created_at, updated_at, delivered_at";

const EVENT_COLUMNS: &str =
    "id, waybill_id, status, location, latitude, longitude, accuracy_m, note, recorded_at, seq";

/// PostgreSQL-backed tracking store implementation.
#[derive(Clone)]
pub struct PostgresTrackingStore {
    pool: PgPool,
    bus: ChangeBus,
    commit_seq: Arc<AtomicU64>,
}

impl PostgresTrackingStore {
    /// Creates a new PostgreSQL tracking store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            bus: ChangeBus::new(),
            commit_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn next_commit(&self) -> u64 {
        self.commit_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn decode<T: std::str::FromStr>(column: &'static str, raw: &str) -> Result<T>
    where
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        raw.parse().map_err(|e: T::Err| {
            StoreError::Database(sqlx::Error::ColumnDecode {
                index: column.to_string(),
                source: Box::new(e),
            })
        })
    }

    fn row_to_waybill(row: PgRow) -> Result<Waybill> {
        let status: String = row.try_get("status")?;
        let delivery_type: String = row.try_get("delivery_type")?;
        let tracking_code: String = row.try_get("tracking_code")?;

        Ok(Waybill {
            id: WaybillId::from_uuid(row.try_get::<Uuid, _>("id")?),
            tracking_code: Self::decode::<TrackingCode>("tracking_code", &tracking_code)?,
            sender: UserId::from_uuid(row.try_get::<Uuid, _>("sender")?),
            driver: row
                .try_get::<Option<Uuid>, _>("driver")?
                .map(UserId::from_uuid),
            receiver_name: row.try_get("receiver_name")?,
            receiver_phone: row.try_get("receiver_phone")?,
            receiver_address: row.try_get("receiver_address")?,
            package_details: row.try_get("package_details")?,
            package_weight: row.try_get("package_weight")?,
            delivery_type: Self::decode::<DeliveryType>("delivery_type", &delivery_type)?,
            status: Self::decode::<WaybillStatus>("status", &status)?,
            proof_of_delivery_url: row.try_get("proof_of_delivery_url")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            delivered_at: row.try_get("delivered_at")?,
        })
    }

    fn row_to_event(row: PgRow) -> Result<TrackingEvent> {
        let status: String = row.try_get("status")?;
        let latitude: Option<f64> = row.try_get("latitude")?;
        let longitude: Option<f64> = row.try_get("longitude")?;
        let accuracy_m: Option<f64> = row.try_get("accuracy_m")?;

        let position = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
                accuracy_m,
            }),
            _ => None,
        };

        Ok(TrackingEvent {
            id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            waybill_id: WaybillId::from_uuid(row.try_get::<Uuid, _>("waybill_id")?),
            status: Self::decode::<WaybillStatus>("status", &status)?,
            location: row.try_get("location")?,
            position,
            note: row.try_get("note")?,
            recorded_at: row.try_get("recorded_at")?,
            seq: row.try_get("seq")?,
        })
    }

    async fn insert_waybill_row<'e, E>(executor: E, waybill: &Waybill) -> Result<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO waybills (id, tracking_code, sender, driver, receiver_name, receiver_phone,
                receiver_address, package_details, package_weight, delivery_type, status,
                proof_of_delivery_url, created_at, updated_at, delivered_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(waybill.id.as_uuid())
        .bind(waybill.tracking_code.as_str())
        .bind(waybill.sender.as_uuid())
        .bind(waybill.driver.map(|d| d.as_uuid()))
        .bind(&waybill.receiver_name)
        .bind(&waybill.receiver_phone)
        .bind(&waybill.receiver_address)
        .bind(&waybill.package_details)
        .bind(&waybill.package_weight)
        .bind(waybill.delivery_type.as_str())
        .bind(waybill.status.as_str())
        .bind(&waybill.proof_of_delivery_url)
        .bind(waybill.created_at)
        .bind(waybill.updated_at)
        .bind(waybill.delivered_at)
        .execute(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("waybills_tracking_code_key")
            {
                return StoreError::DuplicateTrackingCode(waybill.tracking_code.clone());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn update_waybill_row<'e, E>(executor: E, waybill: &Waybill) -> Result<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE waybills
            SET driver = $2, receiver_name = $3, receiver_phone = $4, receiver_address = $5,
                package_details = $6, package_weight = $7, delivery_type = $8, status = $9,
                proof_of_delivery_url = $10, updated_at = $11, delivered_at = $12
            WHERE id = $1
            "#,
        )
        .bind(waybill.id.as_uuid())
        .bind(waybill.driver.map(|d| d.as_uuid()))
        .bind(&waybill.receiver_name)
        .bind(&waybill.receiver_phone)
        .bind(&waybill.receiver_address)
        .bind(&waybill.package_details)
        .bind(&waybill.package_weight)
        .bind(waybill.delivery_type.as_str())
        .bind(waybill.status.as_str())
        .bind(&waybill.proof_of_delivery_url)
        .bind(waybill.updated_at)
        .bind(waybill.delivered_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::WaybillNotFound(waybill.id));
        }
        Ok(())
    }

    async fn insert_event(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event: NewTrackingEvent,
    ) -> Result<TrackingEvent> {
        let id = EventId::new();

        // seq is computed inside the transaction; the (waybill_id, seq) unique
        // index turns a lost race into a retryable database error.
        let seq: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM tracking_events WHERE waybill_id = $1",
        )
        .bind(event.waybill_id.as_uuid())
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO tracking_events (id, waybill_id, status, location, latitude, longitude,
                accuracy_m, note, recorded_at, seq)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id.as_uuid())
        .bind(event.waybill_id.as_uuid())
        .bind(event.status.as_str())
        .bind(&event.location)
        .bind(event.position.map(|p| p.latitude))
        .bind(event.position.map(|p| p.longitude))
        .bind(event.position.and_then(|p| p.accuracy_m))
        .bind(&event.note)
        .bind(event.recorded_at)
        .bind(seq)
        .execute(&mut **tx)
        .await?;

        Ok(TrackingEvent {
            id,
            waybill_id: event.waybill_id,
            status: event.status,
            location: event.location,
            position: event.position,
            note: event.note,
            recorded_at: event.recorded_at,
            seq,
        })
    }
}

#[async_trait]
impl TrackingStore for PostgresTrackingStore {
    async fn create(
        &self,
        waybill: &Waybill,
        first_event: NewTrackingEvent,
    ) -> Result<TrackingEvent> {
        let mut tx = self.pool.begin().await?;
        Self::insert_waybill_row(&mut *tx, waybill).await?;
        let event = Self::insert_event(&mut tx, first_event).await?;
        tx.commit().await?;

        self.bus
            .publish(ChangeNotice::new(
                ChangeKind::WaybillCreated,
                waybill.id,
                self.next_commit(),
            ))
            .await;

        Ok(event)
    }

    async fn record_transition(
        &self,
        waybill: &Waybill,
        event: NewTrackingEvent,
    ) -> Result<TrackingEvent> {
        let mut tx = self.pool.begin().await?;
        Self::update_waybill_row(&mut *tx, waybill).await?;
        let event = Self::insert_event(&mut tx, event).await?;
        tx.commit().await?;

        self.bus
            .publish(ChangeNotice::new(
                ChangeKind::EventAppended,
                waybill.id,
                self.next_commit(),
            ))
            .await;

        Ok(event)
    }

    async fn update_waybill(&self, waybill: &Waybill) -> Result<()> {
        Self::update_waybill_row(&self.pool, waybill).await?;

        self.bus
            .publish(ChangeNotice::new(
                ChangeKind::WaybillUpdated,
                waybill.id,
                self.next_commit(),
            ))
            .await;

        Ok(())
    }

    async fn waybill(&self, id: WaybillId) -> Result<Option<Waybill>> {
        let row = sqlx::query(&format!(
            "SELECT {WAYBILL_COLUMNS} FROM waybills WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_waybill).transpose()
    }

    async fn waybill_by_code(&self, code: &TrackingCode) -> Result<Option<Waybill>> {
        let row = sqlx::query(&format!(
            "SELECT {WAYBILL_COLUMNS} FROM waybills WHERE tracking_code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_waybill).transpose()
    }

    async fn list_waybills(&self) -> Result<Vec<Waybill>> {
        let rows = sqlx::query(&format!(
            "SELECT {WAYBILL_COLUMNS} FROM waybills ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_waybill).collect()
    }

    async fn waybills_for_driver(&self, driver: UserId) -> Result<Vec<Waybill>> {
        let rows = sqlx::query(&format!(
            "SELECT {WAYBILL_COLUMNS} FROM waybills WHERE driver = $1 ORDER BY created_at DESC"
        ))
        .bind(driver.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_waybill).collect()
    }

    async fn waybills_for_sender(&self, sender: UserId) -> Result<Vec<Waybill>> {
        let rows = sqlx::query(&format!(
            "SELECT {WAYBILL_COLUMNS} FROM waybills WHERE sender = $1 ORDER BY created_at DESC"
        ))
        .bind(sender.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_waybill).collect()
    }

    async fn events_for_waybill(&self, id: WaybillId) -> Result<Vec<TrackingEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM tracking_events WHERE waybill_id = $1 ORDER BY seq DESC"
        ))
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn latest_event(&self, id: WaybillId) -> Result<Option<TrackingEvent>> {
        let row = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM tracking_events WHERE waybill_id = $1 \
             ORDER BY seq DESC LIMIT 1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_event).transpose()
    }

    fn bus(&self) -> &ChangeBus {
        &self.bus
    }
}
