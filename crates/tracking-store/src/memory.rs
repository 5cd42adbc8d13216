use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::{TrackingCode, UserId, WaybillId};
use fanout::{ChangeBus, ChangeKind, ChangeNotice};

use crate::{
    Result, StoreError,
    event::{EventId, NewTrackingEvent, TrackingEvent},
    store::TrackingStore,
    waybill::Waybill,
};

/// In-memory tracking store implementation for testing.
///
/// This implementation stores all rows and events in memory and provides
/// the same interface as the PostgreSQL implementation, including change
/// notices on the bus.
#[derive(Clone, Default)]
pub struct InMemoryTrackingStore {
    waybills: Arc<RwLock<HashMap<WaybillId, Waybill>>>,
    events: Arc<RwLock<Vec<TrackingEvent>>>,
    bus: ChangeBus,
    commit_seq: Arc<AtomicU64>,
}

impl InMemoryTrackingStore {
    /// Creates a new empty in-memory tracking store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clears all waybills and events.
    pub async fn clear(&self) {
        self.waybills.write().await.clear();
        self.events.write().await.clear();
    }

    fn next_commit(&self) -> u64 {
        self.commit_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn materialize(event: NewTrackingEvent, seq: i64) -> TrackingEvent {
        TrackingEvent {
            id: EventId::new(),
            waybill_id: event.waybill_id,
            status: event.status,
            location: event.location,
            position: event.position,
            note: event.note,
            recorded_at: event.recorded_at,
            seq,
        }
    }

    fn next_event_seq(events: &[TrackingEvent], waybill_id: WaybillId) -> i64 {
        events
            .iter()
            .filter(|e| e.waybill_id == waybill_id)
            .map(|e| e.seq)
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[async_trait]
impl TrackingStore for InMemoryTrackingStore {
    async fn create(
        &self,
        waybill: &Waybill,
        first_event: NewTrackingEvent,
    ) -> Result<TrackingEvent> {
        let stored = {
            let mut waybills = self.waybills.write().await;
            if waybills
                .values()
                .any(|w| w.tracking_code == waybill.tracking_code)
            {
                return Err(StoreError::DuplicateTrackingCode(
                    waybill.tracking_code.clone(),
                ));
            }

            let event = Self::materialize(first_event, 1);
            waybills.insert(waybill.id, waybill.clone());
            self.events.write().await.push(event.clone());
            event
        };

        self.bus
            .publish(ChangeNotice::new(
                ChangeKind::WaybillCreated,
                waybill.id,
                self.next_commit(),
            ))
            .await;

        Ok(stored)
    }

    async fn record_transition(
        &self,
        waybill: &Waybill,
        event: NewTrackingEvent,
    ) -> Result<TrackingEvent> {
        let stored = {
            let mut waybills = self.waybills.write().await;
            if !waybills.contains_key(&waybill.id) {
                return Err(StoreError::WaybillNotFound(waybill.id));
            }

            let mut events = self.events.write().await;
            let seq = Self::next_event_seq(&events, waybill.id);
            let event = Self::materialize(event, seq);
            waybills.insert(waybill.id, waybill.clone());
            events.push(event.clone());
            event
        };

        self.bus
            .publish(ChangeNotice::new(
                ChangeKind::EventAppended,
                waybill.id,
                self.next_commit(),
            ))
            .await;

        Ok(stored)
    }

    async fn update_waybill(&self, waybill: &Waybill) -> Result<()> {
        {
            let mut waybills = self.waybills.write().await;
            if !waybills.contains_key(&waybill.id) {
                return Err(StoreError::WaybillNotFound(waybill.id));
            }
            waybills.insert(waybill.id, waybill.clone());
        }

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
        Ok(self.waybills.read().await.get(&id).cloned())
    }

    async fn waybill_by_code(&self, code: &TrackingCode) -> Result<Option<Waybill>> {
        let waybills = self.waybills.read().await;
        Ok(waybills
            .values()
            .find(|w| &w.tracking_code == code)
            .cloned())
    }

    async fn list_waybills(&self) -> Result<Vec<Waybill>> {
        let waybills = self.waybills.read().await;
        let mut all: Vec<_> = waybills.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn waybills_for_driver(&self, driver: UserId) -> Result<Vec<Waybill>> {
        let waybills = self.waybills.read().await;
        let mut matched: Vec<_> = waybills
            .values()
            .filter(|w| w.driver == Some(driver))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn waybills_for_sender(&self, sender: UserId) -> Result<Vec<Waybill>> {
        let waybills = self.waybills.read().await;
        let mut matched: Vec<_> = waybills
            .values()
            .filter(|w| w.sender == sender)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn events_for_waybill(&self, id: WaybillId) -> Result<Vec<TrackingEvent>> {
        let events = self.events.read().await;
        let mut matched: Vec<_> = events
            .iter()
            .filter(|e| e.waybill_id == id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(matched)
    }

    async fn latest_event(&self, id: WaybillId) -> Result<Option<TrackingEvent>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.waybill_id == id)
            .max_by_key(|e| e.seq)
            .cloned())
    }

    fn bus(&self) -> &ChangeBus {
        &self.bus
    }
}
