use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use domain::channel::{Channel, Value, WriteBatch};
use domain::error::Result;

/// Something a two-point controller can switch on and off.
pub trait Switchable: Send + Sync {
    fn id(&self) -> &str;

    /// Switch on. Implementations may reject the start, leaving the target off.
    fn start(&self, at: DateTime<Utc>) -> Result<()>;

    fn stop(&self, at: DateTime<Utc>) -> Result<()>;
}

/// A plain boolean relay channel.
pub struct RelaySwitch {
    channel: Arc<dyn Channel>,
}

impl RelaySwitch {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self { channel }
    }

    fn set(&self, on: bool, at: DateTime<Utc>) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.add(&self.channel, Value::boolean(on, at));
        batch.commit();
        info!(relay = %self.channel.id(), on, "Relay switched");
        Ok(())
    }
}

impl Switchable for RelaySwitch {
    fn id(&self) -> &str {
        self.channel.id().as_str()
    }

    fn start(&self, at: DateTime<Utc>) -> Result<()> {
        self.set(true, at)
    }

    fn stop(&self, at: DateTime<Utc>) -> Result<()> {
        self.set(false, at)
    }
}
