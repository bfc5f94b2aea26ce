//! # Broadcast Mediator
//!
//! The single ingress point for published block items.
//!
//! ## Delivery Model
//!
//! ```text
//!   publish(item) ──► [lock: seq += 1] ──┬──► queue ──► worker ──► persistence router
//!                                         ├──► queue ──► worker ──► verification router
//!                                         └──► queue ──► worker ──► consumer (× N)
//! ```
//!
//! One lock serializes sequence assignment, queue hand-off, subscribe and
//! unsubscribe, so every subscriber sees one total order and a new
//! subscriber only sees items published after it joined. Each subscriber
//! has its own bounded queue and delivery worker, so a slow subscriber
//! delays nobody but itself until its queue fills. `publish` then waits at
//! most `publish_timeout` for room before evicting that consumer.
//!
//! Routers are never evicted: a full router queue holds `publish` back
//! until it drains. A router whose worker stops is removed and reported
//! through the escalation handler, since no block can finalize without it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use bn_telemetry::BlockNodeMetrics;
use shared_types::{AckHandler, BlockItem, EndOfStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::events::{EventPayload, MediatorEvent};
use crate::subscriber::{run_delivery, HandlerKind, SubscriberId, SubscriptionHandler};
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Mediator tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediatorConfig {
    /// Per-subscriber queue capacity.
    pub queue_capacity: usize,
    /// Longest a publish waits on one saturated consumer. Also bounds the
    /// wait for room for a consumer's end-of-stream notice.
    pub publish_timeout: Duration,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_CHANNEL_CAPACITY,
            publish_timeout: Duration::from_millis(500),
        }
    }
}

struct SubscriberSlot {
    kind: HandlerKind,
    sender: mpsc::Sender<Arc<MediatorEvent>>,
    active: Arc<AtomicBool>,
}

#[derive(Default)]
struct Registry {
    next_sequence: u64,
    subscribers: HashMap<SubscriberId, SubscriberSlot>,
}

/// Fans the ordered item stream out to a dynamic set of subscribers.
pub struct BroadcastMediator {
    registry: Mutex<Registry>,
    config: MediatorConfig,
    metrics: Arc<BlockNodeMetrics>,
    escalation: OnceLock<Arc<dyn AckHandler>>,
}

impl BroadcastMediator {
    pub fn new(config: MediatorConfig, metrics: Arc<BlockNodeMetrics>) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            config,
            metrics,
            escalation: OnceLock::new(),
        }
    }

    /// Where a lost router is reported. Only the first call takes effect.
    pub fn set_escalation(&self, handler: Arc<dyn AckHandler>) {
        if self.escalation.set(handler).is_err() {
            warn!("Escalation handler already set");
        }
    }

    /// Add a subscriber and start its delivery worker.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn subscribe(&self, handler: Arc<dyn SubscriptionHandler>) -> SubscriberId {
        let id = SubscriberId::new();
        let kind = handler.kind();
        let (sender, queue) = mpsc::channel(self.config.queue_capacity.max(1));
        let active = Arc::new(AtomicBool::new(true));

        let mut registry = self.registry.lock().await;
        tokio::spawn(run_delivery(id, handler, queue, Arc::clone(&active)));
        registry.subscribers.insert(
            id,
            SubscriberSlot {
                kind,
                sender,
                active,
            },
        );
        self.metrics.subscribers.set(registry.subscribers.len() as i64);

        info!(
            subscriber = %id,
            kind = %kind,
            from_sequence = registry.next_sequence,
            "Subscriber added"
        );
        id
    }

    /// Remove a subscriber. Items still queued for it are discarded.
    ///
    /// Returns `false` if it was not subscribed.
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut registry = self.registry.lock().await;
        let removed = Self::remove(&mut registry, id);
        self.metrics.subscribers.set(registry.subscribers.len() as i64);
        if removed {
            info!(subscriber = %id, "Subscriber removed");
        }
        removed
    }

    pub async fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.registry
            .lock()
            .await
            .subscribers
            .get(&id)
            .is_some_and(|slot| slot.active.load(Ordering::Acquire))
    }

    pub async fn subscriber_count(&self) -> usize {
        self.registry.lock().await.subscribers.len()
    }

    /// Append an item to the global sequence and hand it to every subscriber.
    ///
    /// Returns the item's sequence number.
    pub async fn publish(&self, item: BlockItem) -> u64 {
        let mut registry = self.registry.lock().await;
        let sequence = self.deliver(&mut registry, EventPayload::Item(item)).await;
        self.metrics.items_published.inc();
        sequence
    }

    /// Publish several items as one uninterrupted run of the sequence.
    ///
    /// Returns the sequence number of the last item, or `None` if empty.
    pub async fn publish_batch(&self, items: Vec<BlockItem>) -> Option<u64> {
        let mut registry = self.registry.lock().await;
        let mut last = None;
        for item in items {
            last = Some(self.deliver(&mut registry, EventPayload::Item(item)).await);
            self.metrics.items_published.inc();
        }
        last
    }

    /// Send `notice` to every consumer, then close them.
    ///
    /// Consumers drain what is already queued, including the notice, and
    /// their workers stop once the queue is empty. Routing handlers are not
    /// affected. Returns the number of consumers closed.
    pub async fn close_consumers(&self, notice: EndOfStream) -> usize {
        let mut registry = self.registry.lock().await;
        let sequence = registry.next_sequence;
        registry.next_sequence += 1;
        let event = Arc::new(MediatorEvent {
            sequence,
            payload: EventPayload::EndOfStream(notice),
        });

        let consumers: Vec<SubscriberId> = registry
            .subscribers
            .iter()
            .filter(|(_, slot)| slot.kind == HandlerKind::Consumer)
            .map(|(id, _)| *id)
            .collect();

        for id in &consumers {
            let Some(slot) = registry.subscribers.remove(id) else {
                continue;
            };
            // Dropping the sender afterwards lets the worker drain and exit.
            match tokio::time::timeout(
                self.config.publish_timeout,
                slot.sender.send(Arc::clone(&event)),
            )
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(_)) => debug!(subscriber = %id, "Consumer worker gone before end-of-stream"),
                Err(_) => {
                    warn!(
                        subscriber = %id,
                        timeout = ?self.config.publish_timeout,
                        "Consumer did not make room for end-of-stream, dropping it"
                    );
                    slot.active.store(false, Ordering::Release);
                }
            }
        }
        self.metrics.subscribers.set(registry.subscribers.len() as i64);

        info!(
            consumers = consumers.len(),
            code = ?notice.code,
            "Closed live consumers"
        );
        consumers.len()
    }

    /// Remove every subscriber.
    pub async fn unsubscribe_all(&self) {
        let mut registry = self.registry.lock().await;
        let ids: Vec<SubscriberId> = registry.subscribers.keys().copied().collect();
        for id in ids {
            Self::remove(&mut registry, id);
        }
        self.metrics.subscribers.set(0);
        info!("All subscribers removed");
    }

    async fn deliver(&self, registry: &mut Registry, payload: EventPayload) -> u64 {
        let sequence = registry.next_sequence;
        registry.next_sequence += 1;
        let event = Arc::new(MediatorEvent { sequence, payload });

        let mut evicted = Vec::new();
        let mut lost = Vec::new();
        for (id, slot) in &registry.subscribers {
            if slot.kind.is_router() {
                let delivered = slot.active.load(Ordering::Acquire)
                    && slot.sender.send(Arc::clone(&event)).await.is_ok();
                if !delivered {
                    lost.push((*id, slot.kind));
                }
                continue;
            }
            if !slot.active.load(Ordering::Acquire) {
                evicted.push(*id);
                continue;
            }
            match tokio::time::timeout(
                self.config.publish_timeout,
                slot.sender.send(Arc::clone(&event)),
            )
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    debug!(subscriber = %id, sequence, "Subscriber worker gone");
                    evicted.push(*id);
                }
                Err(_) => {
                    warn!(
                        subscriber = %id,
                        kind = %slot.kind,
                        sequence,
                        timeout = ?self.config.publish_timeout,
                        "Subscriber queue saturated, evicting"
                    );
                    evicted.push(*id);
                }
            }
        }

        for id in evicted {
            if Self::remove(registry, id) {
                self.metrics.subscribers_evicted.inc();
            }
        }
        for (id, kind) in lost {
            if Self::remove(registry, id) {
                self.escalate_lost_router(id, kind, sequence);
            }
        }
        self.metrics.subscribers.set(registry.subscribers.len() as i64);
        sequence
    }

    fn escalate_lost_router(&self, id: SubscriberId, kind: HandlerKind, sequence: u64) {
        error!(subscriber = %id, kind = %kind, sequence, "Router stopped, pipeline cannot finalize");
        let reason = format!("{kind} router stopped at sequence {sequence}");
        match self.escalation.get() {
            Some(handler) => {
                let handler = Arc::clone(handler);
                tokio::spawn(async move { handler.unrecoverable_error(reason).await });
            }
            None => warn!(subscriber = %id, "No escalation handler set"),
        }
    }

    fn remove(registry: &mut Registry, id: SubscriberId) -> bool {
        match registry.subscribers.remove(&id) {
            Some(slot) => {
                slot.active.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }
}
