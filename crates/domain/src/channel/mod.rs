//! Channels are the platform's publish/subscribe value streams.
//!
//! The engine never owns a channel; it only holds references for the
//! lifetime of a controller's activation.

mod batch;
mod channel_id;
mod value;

pub use batch::WriteBatch;
pub use channel_id::ChannelId;
pub use value::{Payload, Value};

use std::sync::Arc;

use crate::error::{DomainError, Result};

/// Callback invoked for every value delivered on a channel.
pub type ValueListener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by [`Channel::subscribe`], used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// A write that left the engine and is on its way to the device.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelWrite {
    pub channel: ChannelId,
    pub value: Value,
}

/// A named stream of values.
///
/// Implementations deliver values to listeners in publish order and never
/// invoke two listeners of the same channel concurrently. After
/// `unsubscribe` returns, the removed listener is never called again.
#[cfg_attr(test, mockall::automock)]
pub trait Channel: Send + Sync {
    fn id(&self) -> &ChannelId;

    /// Most recent value, `None` before the first sample.
    fn latest(&self) -> Option<Value>;

    fn subscribe(&self, listener: ValueListener) -> SubscriptionId;

    /// Returns `false` if the handle was not registered.
    ///
    /// Must not be called from a listener of the same channel.
    fn unsubscribe(&self, subscription: SubscriptionId) -> bool;

    /// Fire-and-forget write towards the device behind the channel.
    fn write(&self, value: Value);

    /// Set the latest value locally and notify listeners.
    ///
    /// Must not be called from a listener of the same channel.
    fn publish(&self, value: Value);
}

/// Resolves configured channel bindings.
pub trait ChannelProvider: Send + Sync {
    fn channel(&self, id: &ChannelId) -> Option<Arc<dyn Channel>>;

    /// Like [`ChannelProvider::channel`], but a missing binding is a configuration error.
    fn require(&self, id: &ChannelId) -> Result<Arc<dyn Channel>> {
        self.channel(id)
            .ok_or_else(|| DomainError::MissingChannel(id.to_string()))
    }
}
