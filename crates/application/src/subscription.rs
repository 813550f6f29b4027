use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::trace;

use domain::channel::{Channel, SubscriptionId, Value, ValueListener};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wrap a handler so the listener only holds a weak reference to the
/// controller state. A listener that outlives its controller does nothing.
pub fn bind<T, F>(target: &Arc<T>, handler: F) -> ValueListener
where
    T: Send + Sync + 'static,
    F: Fn(&T, &Value) + Send + Sync + 'static,
{
    let weak: Weak<T> = Arc::downgrade(target);
    Arc::new(move |value: &Value| {
        if let Some(target) = weak.upgrade() {
            handler(&target, value);
        }
    })
}

/// Listener registrations owned by one controller.
///
/// Released in reverse registration order, either explicitly on
/// deactivation or when dropped.
#[derive(Default)]
pub struct Subscriptions {
    entries: Mutex<Vec<(Arc<dyn Channel>, SubscriptionId)>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, channel: &Arc<dyn Channel>, listener: ValueListener) {
        let subscription = channel.subscribe(listener);
        trace!(channel = %channel.id(), subscription = subscription.as_u64(), "Subscribed");
        lock(&self.entries).push((Arc::clone(channel), subscription));
    }

    /// Unsubscribe everything. Once this returns no listener registered
    /// here is called again. Returns the number of listeners removed.
    pub fn release(&self) -> usize {
        let entries: Vec<_> = lock(&self.entries).drain(..).collect();
        entries
            .into_iter()
            .rev()
            .filter(|(channel, subscription)| channel.unsubscribe(*subscription))
            .count()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.release();
    }
}
