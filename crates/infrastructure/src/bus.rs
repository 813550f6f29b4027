use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use domain::channel::{
    Channel, ChannelId, ChannelProvider, ChannelWrite, SubscriptionId, Value, ValueListener,
};
use domain::error::{DomainError, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process channel with synchronous listener delivery.
///
/// Deliveries are serialized by a dispatch lock, so listeners of one channel
/// never run concurrently and see values in publish order. Writes are not
/// delivered locally; they go to the bus's write sink and come back as
/// published feedback once the device has applied them.
pub struct LocalChannel {
    id: ChannelId,
    latest: RwLock<Option<Value>>,
    listeners: Mutex<Vec<(SubscriptionId, ValueListener)>>,
    dispatch: Mutex<()>,
    next_subscription: Arc<AtomicU64>,
    writes: mpsc::UnboundedSender<ChannelWrite>,
}

impl LocalChannel {
    fn new(
        id: ChannelId,
        next_subscription: Arc<AtomicU64>,
        writes: mpsc::UnboundedSender<ChannelWrite>,
    ) -> Self {
        Self {
            id,
            latest: RwLock::new(None),
            listeners: Mutex::new(Vec::new()),
            dispatch: Mutex::new(()),
            next_subscription,
            writes,
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }
}

impl Channel for LocalChannel {
    fn id(&self) -> &ChannelId {
        &self.id
    }

    fn latest(&self) -> Option<Value> {
        *self.latest.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self, listener: ValueListener) -> SubscriptionId {
        let subscription =
            SubscriptionId::new(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).push((subscription, listener));
        trace!(channel = %self.id, subscription = subscription.as_u64(), "Listener registered");
        subscription
    }

    fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        let removed = {
            let mut listeners = lock(&self.listeners);
            let before = listeners.len();
            listeners.retain(|(id, _)| *id != subscription);
            listeners.len() != before
        };
        // Wait out a delivery that may still hold a snapshot with the removed listener.
        drop(lock(&self.dispatch));
        removed
    }

    fn write(&self, value: Value) {
        let write = ChannelWrite {
            channel: self.id.clone(),
            value,
        };
        if self.writes.send(write).is_err() {
            debug!(channel = %self.id, "No write consumer, write dropped");
        }
    }

    fn publish(&self, value: Value) {
        let _dispatch = lock(&self.dispatch);
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
        let listeners: Vec<ValueListener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&value);
        }
    }
}

/// Registry of the installation's declared channels.
pub struct ChannelBus {
    channels: DashMap<ChannelId, Arc<LocalChannel>>,
    next_subscription: Arc<AtomicU64>,
    writes: mpsc::UnboundedSender<ChannelWrite>,
}

impl ChannelBus {
    /// Create an empty bus and the receiving end of its write sink.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChannelWrite>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bus = Self {
            channels: DashMap::new(),
            next_subscription: Arc::new(AtomicU64::new(1)),
            writes: tx,
        };
        (bus, rx)
    }

    /// Declare a channel. Declaring an existing id returns the existing channel.
    pub fn declare(&self, id: ChannelId) -> Arc<LocalChannel> {
        self.channels
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(channel = %id, "Channel declared");
                Arc::new(LocalChannel::new(
                    id,
                    self.next_subscription.clone(),
                    self.writes.clone(),
                ))
            })
            .clone()
    }

    pub fn get(&self, id: &ChannelId) -> Option<Arc<LocalChannel>> {
        self.channels.get(id).map(|c| c.clone())
    }

    /// Publish a sample on a declared channel.
    pub fn publish(&self, id: &ChannelId, value: Value) -> Result<()> {
        let channel = self
            .get(id)
            .ok_or_else(|| DomainError::MissingChannel(id.to_string()))?;
        channel.publish(value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl ChannelProvider for ChannelBus {
    fn channel(&self, id: &ChannelId) -> Option<Arc<dyn Channel>> {
        self.get(id).map(|c| c as Arc<dyn Channel>)
    }
}
