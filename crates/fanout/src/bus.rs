use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::notice::ChangeNotice;
use crate::topic::Topic;

/// A consumer of change notices.
///
/// `on_change` is awaited in commit order; implementations that do slow work
/// should hand the notice off to their own task instead of blocking the bus.
#[async_trait]
pub trait ChangeListener: Send + Sync {
    async fn on_change(&self, notice: &ChangeNotice);
}

/// Opaque ticket returned by [`ChangeBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

struct Subscription {
    topic: Topic,
    listener: Arc<dyn ChangeListener>,
}

/// In-process fan-out bus.
///
/// Publishing walks the live subscriptions, delivering the notice to every
/// listener whose topic matches. Delivery within one `publish` call is
/// sequential, so a single-threaded publisher observes per-topic commit order.
#[derive(Clone, Default)]
pub struct ChangeBus {
    subscriptions: Arc<RwLock<HashMap<u64, Subscription>>>,
    next_id: Arc<AtomicU64>,
}

impl ChangeBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for all notices matching `topic`.
    pub async fn subscribe(
        &self,
        topic: Topic,
        listener: Arc<dyn ChangeListener>,
    ) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscriptions
            .write()
            .await
            .insert(id, Subscription { topic, listener });

        metrics::counter!("fanout_subscriptions_opened_total").increment(1);
        debug!(%topic, subscription_id = id, "subscription opened");

        SubscriptionHandle(id)
    }

    /// Removes a subscription. Unknown or already-removed handles are a no-op.
    pub async fn unsubscribe(&self, handle: SubscriptionHandle) {
        if self
            .subscriptions
            .write()
            .await
            .remove(&handle.0)
            .is_some()
        {
            metrics::counter!("fanout_subscriptions_closed_total").increment(1);
            debug!(subscription_id = handle.0, "subscription closed");
        }
    }

    /// Number of live subscriptions.
    pub async fn subscriber_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    /// Delivers `notice` to every matching live subscriber.
    ///
    /// Listeners are collected under the read lock and awaited after it is
    /// released, so a listener may subscribe or unsubscribe from its callback.
    pub async fn publish(&self, notice: ChangeNotice) {
        let listeners: Vec<Arc<dyn ChangeListener>> = {
            let subs = self.subscriptions.read().await;
            subs.values()
                .filter(|s| s.topic.matches(&notice))
                .map(|s| Arc::clone(&s.listener))
                .collect()
        };

        let delivered = listeners.len();
        for listener in listeners {
            listener.on_change(&notice).await;
        }

        metrics::counter!("fanout_notices_published_total").increment(1);
        metrics::counter!("fanout_notices_delivered_total").increment(delivered as u64);
        debug!(
            waybill_id = %notice.waybill_id,
            seq = notice.seq,
            delivered,
            "notice published"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::ChangeKind;
    use common::WaybillId;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<ChangeNotice>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<ChangeNotice> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChangeListener for Recorder {
        async fn on_change(&self, notice: &ChangeNotice) {
            self.seen.lock().unwrap().push(*notice);
        }
    }

    #[tokio::test]
    async fn delivers_only_to_matching_topic() {
        let bus = ChangeBus::new();
        let watched = WaybillId::new();
        let other = WaybillId::new();

        let recorder = Recorder::new();
        bus.subscribe(Topic::Waybill(watched), recorder.clone())
            .await;

        bus.publish(ChangeNotice::new(ChangeKind::EventAppended, watched, 1))
            .await;
        bus.publish(ChangeNotice::new(ChangeKind::EventAppended, other, 2))
            .await;
        bus.publish(ChangeNotice::new(ChangeKind::WaybillUpdated, watched, 3))
            .await;

        let seen = recorder.seen();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|n| n.waybill_id == watched));
    }

    #[tokio::test]
    async fn class_subscription_sees_all_waybills() {
        let bus = ChangeBus::new();
        let recorder = Recorder::new();
        bus.subscribe(Topic::Waybills, recorder.clone()).await;

        bus.publish(ChangeNotice::new(
            ChangeKind::WaybillCreated,
            WaybillId::new(),
            1,
        ))
        .await;
        bus.publish(ChangeNotice::new(
            ChangeKind::WaybillCreated,
            WaybillId::new(),
            2,
        ))
        .await;

        assert_eq!(recorder.seen().len(), 2);
    }

    #[tokio::test]
    async fn preserves_publish_order_within_a_topic() {
        let bus = ChangeBus::new();
        let id = WaybillId::new();
        let recorder = Recorder::new();
        bus.subscribe(Topic::Waybill(id), recorder.clone()).await;

        for seq in 1..=5 {
            bus.publish(ChangeNotice::new(ChangeKind::EventAppended, id, seq))
                .await;
        }

        let seqs: Vec<u64> = recorder.seen().iter().map(|n| n.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn unsubscribed_listener_stops_receiving() {
        let bus = ChangeBus::new();
        let id = WaybillId::new();
        let recorder = Recorder::new();
        let handle = bus.subscribe(Topic::Waybill(id), recorder.clone()).await;

        bus.publish(ChangeNotice::new(ChangeKind::EventAppended, id, 1))
            .await;
        bus.unsubscribe(handle).await;
        bus.publish(ChangeNotice::new(ChangeKind::EventAppended, id, 2))
            .await;

        assert_eq!(recorder.seen().len(), 1);
        assert_eq!(bus.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let bus = ChangeBus::new();
        let recorder = Recorder::new();
        let handle = bus.subscribe(Topic::Waybills, recorder).await;

        bus.unsubscribe(handle).await;
        bus.unsubscribe(handle).await;
        assert_eq!(bus.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn no_replay_for_late_subscribers() {
        let bus = ChangeBus::new();
        let id = WaybillId::new();

        bus.publish(ChangeNotice::new(ChangeKind::WaybillCreated, id, 1))
            .await;

        let recorder = Recorder::new();
        bus.subscribe(Topic::Waybill(id), recorder.clone()).await;
        assert!(recorder.seen().is_empty());
    }
}
