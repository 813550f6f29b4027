use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use domain::channel::{ChannelId, Value};
use domain::driver::{ChannelDriver, ConnectionState};
use domain::error::DomainError;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimulatorConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub channels: Vec<SimulatedChannel>,
}

fn default_interval_ms() -> u64 {
    1000
}

impl SimulatorConfig {
    pub fn channel_ids(&self) -> impl Iterator<Item = &ChannelId> {
        self.channels.iter().map(|c| &c.channel)
    }
}

/// A channel fed by a sine wave between `min_value` and `max_value`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimulatedChannel {
    pub channel: ChannelId,
    pub min_value: f64,
    pub max_value: f64,
    #[serde(default = "default_period_secs")]
    pub period_secs: f64,
}

fn default_period_secs() -> f64 {
    60.0
}

impl SimulatedChannel {
    fn sample_at(&self, elapsed_secs: f64) -> f64 {
        let range = self.max_value - self.min_value;
        let midpoint = self.min_value + (range / 2.0);
        let amplitude = range / 2.0;

        let frequency = 1.0 / self.period_secs.max(f64::EPSILON);
        let raw =
            midpoint + amplitude * (elapsed_secs * frequency * 2.0 * std::f64::consts::PI).sin();
        (raw * 100.0).round() / 100.0
    }
}

/// Simulated installation.
///
/// Every poll stamps all samples with the same instant, like a device read
/// in one cycle. Writes are echoed back as feedback, so relay state channels
/// behave like a loopback.
pub struct SimulatorDriver {
    config: SimulatorConfig,
    start_time: Instant,
    state: ConnectionState,
    written: HashMap<ChannelId, Value>,
}

impl SimulatorDriver {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            state: ConnectionState::Disconnected,
            written: HashMap::new(),
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.config.interval_ms
    }

    /// Last value written to a channel, if any.
    pub fn written(&self, channel: &ChannelId) -> Option<&Value> {
        self.written.get(channel)
    }
}

#[async_trait]
impl ChannelDriver for SimulatorDriver {
    async fn connect(&mut self) -> Result<(), DomainError> {
        tracing::info!(channels = self.config.channels.len(), "Simulator connected");
        self.state = ConnectionState::Connected;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DomainError> {
        tracing::info!("Simulator disconnected");
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn connection_state(&self) -> ConnectionState {
        self.state
    }

    async fn poll(&mut self) -> Result<Vec<(ChannelId, Value)>, DomainError> {
        if !self.state.is_connected() {
            return Err(DomainError::DriverError("Simulator not connected".to_string()));
        }
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let now = Utc::now();

        Ok(self
            .config
            .channels
            .iter()
            .map(|c| (c.channel.clone(), Value::number(c.sample_at(elapsed), now)))
            .collect())
    }

    async fn write(
        &mut self,
        channel: &ChannelId,
        value: Value,
    ) -> Result<Option<Value>, DomainError> {
        if !self.state.is_connected() {
            return Err(DomainError::DriverError("Simulator not connected".to_string()));
        }
        tracing::debug!(channel = %channel, value = ?value.payload, "Simulator received write");
        self.written.insert(channel.clone(), value);
        Ok(Some(Value::new(value.payload, Utc::now())))
    }

    fn driver_type(&self) -> &str {
        "Simulator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> SimulatorConfig {
        SimulatorConfig {
            interval_ms: 100,
            channels: vec![
                SimulatedChannel {
                    channel: ChannelId::new("circ/out").unwrap(),
                    min_value: 30.0,
                    max_value: 50.0,
                    period_secs: 60.0,
                },
                SimulatedChannel {
                    channel: ChannelId::new("circ/in").unwrap(),
                    min_value: 25.0,
                    max_value: 35.0,
                    period_secs: 90.0,
                },
            ],
        }
    }

    #[test]
    fn test_sine_stays_within_range() {
        let channel = &config().channels[0];
        for step in 0..240 {
            let v = channel.sample_at(step as f64 * 0.5);
            assert!((30.0..=50.0).contains(&v), "sample {} out of range", v);
        }
        assert_eq!(channel.sample_at(0.0), 40.0);
    }

    #[tokio::test]
    async fn test_poll_requires_connection() {
        let mut driver = SimulatorDriver::new(config());
        assert!(driver.poll().await.is_err());

        driver.connect().await.unwrap();
        assert!(driver.is_connected());
        assert_eq!(driver.driver_type(), "Simulator");
    }

    #[tokio::test]
    async fn test_poll_stamps_samples_coincident() {
        let mut driver = SimulatorDriver::new(config());
        driver.connect().await.unwrap();

        let samples = driver.poll().await.unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples[0].1.is_coincident(&samples[1].1));
    }

    #[tokio::test]
    async fn test_write_is_echoed() {
        let mut driver = SimulatorDriver::new(config());
        driver.connect().await.unwrap();

        let relay = ChannelId::new("hp/state").unwrap();
        let written = Value::boolean(true, Utc.timestamp_millis_opt(0).unwrap());
        let echo = driver.write(&relay, written).await.unwrap().unwrap();

        assert!(echo.as_bool());
        assert_eq!(driver.written(&relay), Some(&written));

        driver.disconnect().await.unwrap();
        assert_eq!(driver.connection_state(), ConnectionState::Disconnected);
    }
}
