use async_trait::async_trait;

use crate::channel::{ChannelId, Value};
use super::ConnectionState;
use crate::error::DomainError;

/// Device I/O behind a set of channels
#[async_trait]
pub trait ChannelDriver: Send + Sync {
    /// Establish connection to the device
    async fn connect(&mut self) -> Result<(), DomainError>;

    /// Disconnect from the device
    async fn disconnect(&mut self) -> Result<(), DomainError>;

    /// Check if currently connected
    fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    fn connection_state(&self) -> ConnectionState;

    /// Read the current sample of every channel the driver serves.
    async fn poll(&mut self) -> Result<Vec<(ChannelId, Value)>, DomainError>;

    /// Apply a write to the device.
    ///
    /// Returns the value the device reports back, if it echoes writes
    /// (e.g. a relay's state feedback).
    async fn write(
        &mut self,
        channel: &ChannelId,
        value: Value,
    ) -> Result<Option<Value>, DomainError>;

    /// Get driver type identifier
    fn driver_type(&self) -> &str;
}
